use lux_ir::{SlotId, ValueExprId};
use thiserror::Error;

/// Runtime faults. Correctly used — against the schedule's own slot plan —
/// none of these fire; they exist so a bad host integration fails loudly
/// instead of corrupting state.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum RuntimeError {
    #[error("step referenced slot {slot:?} outside the allocated state")]
    SlotOutOfRange { slot: SlotId },

    #[error("frame input is missing external channel {channel}")]
    MissingChannel { channel: u32 },

    #[error("expression {expr:?} is not in the schedule's arena")]
    MissingExpr { expr: ValueExprId },

    #[error("render step for slot {slot:?} ran before its materialize step")]
    NotMaterialized { slot: SlotId },

    #[error("discrete evaluation reached an unsupported expression {expr:?}")]
    UnsupportedDiscrete { expr: ValueExprId },

    #[error("state was allocated from a different slot plan (len {actual}, plan {expected})")]
    StateShapeMismatch { expected: u32, actual: u32 },

    #[error("schedule mentions an instance with no recorded lane count")]
    UnknownInstance,
}
