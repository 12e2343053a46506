use std::fmt;

use crate::ErrorCode;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// The kind of patch-graph node a diagnostic points at.
///
/// Violations are never hardcoded to expression indices; any node in the
/// compilation can carry one.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NodeKind {
    Block,
    Edge,
    Port,
    Domain,
    Adapter,
    Expr,
    Slot,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Block => write!(f, "block"),
            NodeKind::Edge => write!(f, "edge"),
            NodeKind::Port => write!(f, "port"),
            NodeKind::Domain => write!(f, "domain"),
            NodeKind::Adapter => write!(f, "adapter"),
            NodeKind::Expr => write!(f, "expr"),
            NodeKind::Slot => write!(f, "slot"),
        }
    }
}

/// Locator for a diagnostic: a node kind plus its dense index.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub index: u32,
}

impl NodeRef {
    pub const fn new(kind: NodeKind, index: u32) -> Self {
        NodeRef { kind, index }
    }

    pub const fn block(index: u32) -> Self {
        NodeRef::new(NodeKind::Block, index)
    }

    pub const fn edge(index: u32) -> Self {
        NodeRef::new(NodeKind::Edge, index)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.index)
    }
}

/// Structured remedy for mismatches the compiler refuses to repair itself.
///
/// The solver reports these alongside binding mismatches; it never adapts the
/// binding axis on the author's behalf.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Remedy {
    /// Break the edge with a state write/read pair.
    InsertStateOp,
    /// Insert a continuity operator to re-seat bound state.
    InsertContinuityOp,
    /// Rewire the edge to a compatible port.
    Rewire,
}

impl fmt::Display for Remedy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remedy::InsertStateOp => write!(f, "insert a state operation"),
            Remedy::InsertContinuityOp => write!(f, "insert a continuity operation"),
            Remedy::Rewire => write!(f, "rewire the edge"),
        }
    }
}

/// A structured diagnostic record.
///
/// Carries a code, a graph locator, a human-readable message, and
/// kind-specific payload (notes with rendered expected/actual types, a remedy
/// where one applies).
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub node: Option<NodeRef>,
    pub notes: Vec<String>,
    pub remedy: Option<Remedy>,
}

impl Diagnostic {
    /// Create an error diagnostic with the given code.
    pub fn error(code: ErrorCode) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message: String::new(),
            node: None,
            notes: Vec::new(),
            remedy: None,
        }
    }

    /// Create a warning diagnostic with the given code.
    pub fn warning(code: ErrorCode) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(code)
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_node(mut self, node: NodeRef) -> Self {
        self.node = Some(node);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    #[must_use]
    pub fn with_remedy(mut self, remedy: Remedy) -> Self {
        self.remedy = Some(remedy);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(node) = self.node {
            write!(f, " (at {node})")?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        if let Some(remedy) = self.remedy {
            write!(f, "\n  help: {remedy}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_payload() {
        let diag = Diagnostic::error(ErrorCode::E2005)
            .with_message("binding mismatch")
            .with_node(NodeRef::edge(3))
            .with_note("expected `unbound`, found `bound`")
            .with_remedy(Remedy::InsertStateOp);

        assert!(diag.is_error());
        assert_eq!(diag.node, Some(NodeRef::new(NodeKind::Edge, 3)));
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.remedy, Some(Remedy::InsertStateOp));
    }

    #[test]
    fn display_includes_locator_and_remedy() {
        let diag = Diagnostic::error(ErrorCode::E2005)
            .with_message("binding mismatch")
            .with_node(NodeRef::edge(3))
            .with_remedy(Remedy::InsertStateOp);
        let rendered = diag.to_string();
        assert!(rendered.contains("E2005"));
        assert!(rendered.contains("edge#3"));
        assert!(rendered.contains("insert a state operation"));
    }
}
