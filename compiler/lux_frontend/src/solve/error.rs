//! Structured solver errors.
//!
//! The solver accumulates these and converts them into diagnostics; nothing
//! here halts the pass, so one run surfaces as many constraint problems as
//! the patch has.

use lux_diagnostic::{Diagnostic, ErrorCode, NodeRef, Remedy};
use lux_types::{Binding, InstanceRef, PayloadType, Unit};

/// Shape of a cardinality group value (instance identity is tracked in its
/// own table).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CardShape {
    Zero,
    One,
    Many,
}

impl std::fmt::Display for CardShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardShape::Zero => write!(f, "zero"),
            CardShape::One => write!(f, "one"),
            CardShape::Many => write!(f, "many"),
        }
    }
}

/// A constraint failure with its location.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum SolveError {
    /// Two concrete cardinalities merged into one group.
    CardinalityConflict {
        left: CardShape,
        right: CardShape,
        location: NodeRef,
    },
    /// Two distinct instance refs in one `many` group.
    InstanceConflict {
        left: InstanceRef,
        right: InstanceRef,
        location: NodeRef,
    },
    /// Structurally distinct units merged.
    UnitConflict {
        left: Unit,
        right: Unit,
        location: NodeRef,
    },
    /// Two distinct concrete payloads merged.
    PayloadConflict {
        left: PayloadType,
        right: PayloadType,
        location: NodeRef,
    },
    /// Distinct values on the temporality (or another closed) axis.
    AxisValueConflict {
        axis: &'static str,
        left: String,
        right: String,
        location: NodeRef,
    },
    /// A group has no concrete value after propagation.
    UnresolvedAxis {
        axis: &'static str,
        location: NodeRef,
    },
    /// Binding-axis mismatch. Never auto-adapted: the author must apply the
    /// remedy.
    BindingMismatch {
        left: Binding,
        right: Binding,
        location: NodeRef,
        remedy: Remedy,
    },
}

fn render_binding(binding: &Binding) -> String {
    match binding {
        Binding::Unbound => "unbound".to_owned(),
        Binding::Bound(target) => format!("bound(#{})", target.0),
    }
}

impl SolveError {
    /// Convert into a diagnostic record.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            SolveError::CardinalityConflict {
                left,
                right,
                location,
            } => Diagnostic::error(ErrorCode::E2001)
                .with_message(format!(
                    "cardinality conflict: `{left}` vs `{right}`"
                ))
                .with_node(*location),
            SolveError::InstanceConflict {
                left,
                right,
                location,
            } => Diagnostic::error(ErrorCode::E2002)
                .with_message(format!(
                    "instance conflict: `{left}` vs `{right}` in one `many` group"
                ))
                .with_node(*location),
            SolveError::UnitConflict {
                left,
                right,
                location,
            } => {
                let mut diag = Diagnostic::error(ErrorCode::E2003)
                    .with_message(format!("unit conflict: `{left}` vs `{right}`"))
                    .with_node(*location);
                if Unit::is_convertible(*left, *right) {
                    diag = diag.with_note(format!(
                        "`{left}` converts to `{right}`; route the edge through a unit \
                         conversion adapter"
                    ));
                }
                diag
            }
            SolveError::PayloadConflict {
                left,
                right,
                location,
            } => Diagnostic::error(ErrorCode::E2006)
                .with_message(format!("payload conflict: `{left}` vs `{right}`"))
                .with_node(*location),
            SolveError::AxisValueConflict {
                axis,
                left,
                right,
                location,
            } => Diagnostic::error(ErrorCode::E2007)
                .with_message(format!("{axis} conflict: `{left}` vs `{right}`"))
                .with_node(*location),
            SolveError::UnresolvedAxis { axis, location } => {
                Diagnostic::error(ErrorCode::E2004)
                    .with_message(format!(
                        "{axis} could not be resolved; nothing constrains it"
                    ))
                    .with_node(*location)
            }
            SolveError::BindingMismatch {
                left,
                right,
                location,
                remedy,
            } => Diagnostic::error(ErrorCode::E2005)
                .with_message(format!(
                    "binding mismatch: `{}` vs `{}`",
                    render_binding(left),
                    render_binding(right)
                ))
                .with_node(*location)
                .with_remedy(*remedy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_types::BindingTarget;

    #[test]
    fn binding_mismatch_carries_remedy() {
        let err = SolveError::BindingMismatch {
            left: Binding::Bound(BindingTarget(3)),
            right: Binding::Unbound,
            location: NodeRef::edge(1),
            remedy: Remedy::InsertStateOp,
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, ErrorCode::E2005);
        assert_eq!(diag.remedy, Some(Remedy::InsertStateOp));
        assert!(diag.message.contains("bound(#3)"));
    }

    #[test]
    fn convertible_unit_conflict_suggests_adapter() {
        let err = SolveError::UnitConflict {
            left: Unit::Angle(lux_types::AngleUnit::Radians),
            right: Unit::Angle(lux_types::AngleUnit::Degrees),
            location: NodeRef::edge(0),
        };
        let diag = err.to_diagnostic();
        assert!(!diag.notes.is_empty());
    }
}
