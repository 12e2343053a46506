//! Error codes for all compiler diagnostics.
//!
//! Each error code is a unique identifier (e.g. `E2002`) with the first digit
//! indicating the pipeline phase. Used for `lux explain` lookups and
//! documentation.

use std::fmt;

/// Error codes for all compiler diagnostics.
///
/// Format: E#### where the first digit indicates the phase:
/// - E1xxx: Normalizer errors
/// - E2xxx: Solver errors
/// - E3xxx: Axis validator errors
/// - E4xxx: IR builder errors
/// - E5xxx: Backend errors
/// - E6xxx: Runtime errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Normalizer Errors (E1xxx)
    /// Edge types require an adapter that is not registered
    E1001,
    /// Cycle in the patch graph without a state read/write break
    E1002,
    /// Edge references a port that does not exist in the block's schema
    E1003,
    /// Block type is not registered
    E1004,

    // Solver Errors (E2xxx)
    /// Two distinct concrete cardinalities merged into one group
    E2001,
    /// Two distinct instance refs in one `many` group
    E2002,
    /// Structurally distinct units merged
    E2003,
    /// A group has no concrete value after propagation
    E2004,
    /// Binding-axis mismatch (carries a structured remedy)
    E2005,
    /// Two distinct concrete payloads merged into one group
    E2006,
    /// Two distinct concrete temporalities merged into one group
    E2007,

    // Axis Validator Errors (E3xxx)
    /// A port type still carries an axis variable
    E3001,
    /// A `many` cardinality references an instance absent from the patch
    E3002,
    /// Forbidden axis combination
    E3003,
    /// `cameraProjection` payload outside a camera block output
    E3004,
    /// Event-read output deviates from `signal float scalar`
    E3005,

    // IR Builder Errors (E4xxx)
    /// Const value kind does not match the declared payload
    E4001,
    /// Expression variant's kind disagrees with its derived kind
    E4002,
    /// Input expression id is not in the arena
    E4003,

    // Backend Errors (E5xxx)
    /// `derive_kind` reached a variable axis after validation (a bug)
    E5001,
    /// Backend invoked on a typed patch that is not backend-ready
    E5002,
    /// Lowering found no expression for a connected input port
    E5003,

    // Runtime Errors (E6xxx)
    /// Step referenced a slot outside the allocated state
    E6001,
    /// Frame input is missing an external channel the schedule reads
    E6002,
}

/// Pipeline phase an error code belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Phase {
    Normalizer,
    Solver,
    Validator,
    Builder,
    Backend,
    Runtime,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Normalizer => write!(f, "normalizer"),
            Phase::Solver => write!(f, "solver"),
            Phase::Validator => write!(f, "validator"),
            Phase::Builder => write!(f, "builder"),
            Phase::Backend => write!(f, "backend"),
            Phase::Runtime => write!(f, "runtime"),
        }
    }
}

impl ErrorCode {
    /// The phase that raises this code.
    pub fn phase(self) -> Phase {
        match self.as_str().as_bytes()[1] {
            b'1' => Phase::Normalizer,
            b'2' => Phase::Solver,
            b'3' => Phase::Validator,
            b'4' => Phase::Builder,
            b'5' => Phase::Backend,
            _ => Phase::Runtime,
        }
    }

    /// The canonical `E####` string for this code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E3003 => "E3003",
            ErrorCode::E3004 => "E3004",
            ErrorCode::E3005 => "E3005",
            ErrorCode::E4001 => "E4001",
            ErrorCode::E4002 => "E4002",
            ErrorCode::E4003 => "E4003",
            ErrorCode::E5001 => "E5001",
            ErrorCode::E5002 => "E5002",
            ErrorCode::E5003 => "E5003",
            ErrorCode::E6001 => "E6001",
            ErrorCode::E6002 => "E6002",
        }
    }

    /// One-line description for `lux explain`.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::E1001 => "edge types require an adapter that is not registered",
            ErrorCode::E1002 => "cycle in the patch graph without a state read/write break",
            ErrorCode::E1003 => "edge references a port missing from the block's schema",
            ErrorCode::E1004 => "block type is not registered",
            ErrorCode::E2001 => "two distinct concrete cardinalities merged into one group",
            ErrorCode::E2002 => "two distinct instances merged into one `many` group",
            ErrorCode::E2003 => "structurally distinct units merged into one group",
            ErrorCode::E2004 => "an axis group has no concrete value after propagation",
            ErrorCode::E2005 => "binding-axis mismatch; the patch must be repaired by hand",
            ErrorCode::E2006 => "two distinct concrete payloads merged into one group",
            ErrorCode::E2007 => "two distinct concrete temporalities merged into one group",
            ErrorCode::E3001 => "a port type still carries an axis variable",
            ErrorCode::E3002 => "a `many` cardinality references an unknown instance",
            ErrorCode::E3003 => "forbidden axis combination",
            ErrorCode::E3004 => "cameraProjection payload outside a camera block output",
            ErrorCode::E3005 => "event-read output must be `signal float scalar`",
            ErrorCode::E4001 => "const value kind does not match the declared payload",
            ErrorCode::E4002 => "expression variant disagrees with its derived kind",
            ErrorCode::E4003 => "input expression id is not in the arena",
            ErrorCode::E5001 => "derive_kind reached a variable axis after validation",
            ErrorCode::E5002 => "backend invoked on a patch that is not backend-ready",
            ErrorCode::E5003 => "lowering found no expression for a connected input",
            ErrorCode::E6001 => "step referenced a slot outside the allocated state",
            ErrorCode::E6002 => "frame input is missing an external channel",
        }
    }

    /// Parse an `E####` string back into a code.
    pub fn parse(s: &str) -> Option<Self> {
        const ALL: &[ErrorCode] = &[
            ErrorCode::E1001,
            ErrorCode::E1002,
            ErrorCode::E1003,
            ErrorCode::E1004,
            ErrorCode::E2001,
            ErrorCode::E2002,
            ErrorCode::E2003,
            ErrorCode::E2004,
            ErrorCode::E2005,
            ErrorCode::E2006,
            ErrorCode::E2007,
            ErrorCode::E3001,
            ErrorCode::E3002,
            ErrorCode::E3003,
            ErrorCode::E3004,
            ErrorCode::E3005,
            ErrorCode::E4001,
            ErrorCode::E4002,
            ErrorCode::E4003,
            ErrorCode::E5001,
            ErrorCode::E5002,
            ErrorCode::E5003,
            ErrorCode::E6001,
            ErrorCode::E6002,
        ];
        ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_from_first_digit() {
        assert_eq!(ErrorCode::E1001.phase(), Phase::Normalizer);
        assert_eq!(ErrorCode::E2002.phase(), Phase::Solver);
        assert_eq!(ErrorCode::E3003.phase(), Phase::Validator);
        assert_eq!(ErrorCode::E4002.phase(), Phase::Builder);
        assert_eq!(ErrorCode::E5001.phase(), Phase::Backend);
        assert_eq!(ErrorCode::E6001.phase(), Phase::Runtime);
    }

    #[test]
    fn parse_round_trips() {
        assert_eq!(ErrorCode::parse("E2005"), Some(ErrorCode::E2005));
        assert_eq!(ErrorCode::parse("E9999"), None);
        assert_eq!(ErrorCode::parse(ErrorCode::E4003.as_str()), Some(ErrorCode::E4003));
    }
}
