//! The runtime's externally owned state.

use lux_backend::SlotPlan;
use lux_ir::SlotId;

use crate::error::RuntimeError;

/// The flat numeric state the schedule reads and writes: one `f64` array
/// keyed by slot layout, plus the event-flag buffer. Owned exclusively by
/// the runtime; the compiler never touches it.
#[derive(Debug, Clone)]
pub struct RuntimeState {
    pub(crate) values: Vec<f64>,
    pub(crate) flags: Vec<bool>,
    /// Buffered state writes, applied on the frame boundary.
    pub(crate) pending: Vec<(u32, f64)>,
}

impl RuntimeState {
    /// Pre-allocate from a slot plan. Values start at zero, flags clear.
    pub fn from_plan(plan: &SlotPlan) -> Self {
        RuntimeState {
            values: vec![0.0; plan.value_len() as usize],
            flags: vec![false; plan.flag_count() as usize],
            pending: Vec::new(),
        }
    }

    /// All lanes of a slot, for hosts reading observed or state slots
    /// between frames.
    pub fn slot_values<'a>(
        &'a self,
        plan: &SlotPlan,
        slot: SlotId,
    ) -> Result<&'a [f64], RuntimeError> {
        let desc = plan.get(slot).ok_or(RuntimeError::SlotOutOfRange { slot })?;
        let start = desc.offset as usize;
        let end = start + desc.len() as usize;
        self.values
            .get(start..end)
            .ok_or(RuntimeError::SlotOutOfRange { slot })
    }

    pub(crate) fn check_shape(&self, plan: &SlotPlan) -> Result<(), RuntimeError> {
        let actual = u32::try_from(self.values.len()).unwrap_or(u32::MAX);
        if actual != plan.value_len() {
            return Err(RuntimeError::StateShapeMismatch {
                expected: plan.value_len(),
                actual,
            });
        }
        Ok(())
    }

    pub(crate) fn write(&mut self, offset: u32, value: f64) -> Result<(), RuntimeError> {
        let cell = self.values.get_mut(offset as usize).ok_or(
            RuntimeError::SlotOutOfRange {
                slot: SlotId::new(offset),
            },
        )?;
        *cell = value;
        Ok(())
    }

    pub(crate) fn read(&self, offset: u32) -> Result<f64, RuntimeError> {
        self.values
            .get(offset as usize)
            .copied()
            .ok_or(RuntimeError::SlotOutOfRange {
                slot: SlotId::new(offset),
            })
    }

    /// Apply buffered state writes; called on the frame boundary.
    pub(crate) fn sink_pending(&mut self) -> Result<(), RuntimeError> {
        let pending = std::mem::take(&mut self.pending);
        for (offset, value) in pending {
            self.write(offset, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_backend::SlotAllocator;

    #[test]
    fn allocation_matches_plan() {
        let mut alloc = SlotAllocator::new();
        let a = alloc.allocate(2, 10, false, None, None);
        let _b = alloc.allocate(1, 1, true, None, None);
        let plan = alloc.into_plan();

        let state = RuntimeState::from_plan(&plan);
        assert_eq!(state.values.len(), 21);
        assert_eq!(state.flags.len(), 1);
        let lanes = state.slot_values(&plan, a);
        assert_eq!(lanes.map(<[f64]>::len), Ok(20));
    }

    #[test]
    fn pending_writes_apply_at_sink() {
        let mut alloc = SlotAllocator::new();
        let slot = alloc.allocate(1, 1, false, None, None);
        let plan = alloc.into_plan();

        let mut state = RuntimeState::from_plan(&plan);
        state.pending.push((0, 4.5));
        assert_eq!(state.slot_values(&plan, slot).map(|v| v[0]), Ok(0.0));
        assert!(state.sink_pending().is_ok());
        assert_eq!(state.slot_values(&plan, slot).map(|v| v[0]), Ok(4.5));
    }
}
