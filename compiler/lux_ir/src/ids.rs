//! Dense indices for the IR and the runtime state.

use lux_types::define_id;

define_id! {
    /// Index into the expression arena.
    ///
    /// Stable and dense: after dead-code elimination the arena compacts and
    /// hands back a remap table; ids are never reused within one arena
    /// generation.
    ValueExprId
}

define_id! {
    /// A fixed location in the runtime's flat value array.
    ///
    /// Field-typed slots own a contiguous lane range; the slot plan records
    /// the layout.
    SlotId
}

define_id! {
    /// Index into the runtime's event-flag buffer.
    ///
    /// Event flags are one-shot per frame: set by a pulse write, cleared by
    /// the runtime on the frame boundary.
    EventFlagId
}
