//! Slot allocation and the slot plan.
//!
//! Slots are indices into the runtime's flat value array. Field-typed slots
//! own a contiguous lane range `[offset, offset + lanes · stride)`. All lane
//! math lives in [`SlotDesc::len`] and [`SlotPlan::lane_offset`] so a future
//! per-lane identity map can replace those two methods without reshaping any
//! step.

use lux_ir::{EventFlagId, SlotId, ValueExprId};

use lux_types::define_id;

define_id! {
    /// Stable identity of a state slot across compilations.
    ///
    /// Keyed on the state channel a read/write pair shares; the separately
    /// specified state-migration table keys on these.
    StateKey
}

/// Layout of one slot.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotDesc {
    pub slot: SlotId,
    /// Offset into the flat value array.
    pub offset: u32,
    /// Scalar lanes per element, from the payload.
    pub stride: u32,
    /// Elements: the instance count for fields, 1 otherwise.
    pub lanes: u32,
    /// Event flag for discrete slots.
    pub flag: Option<EventFlagId>,
    /// Present on state slots.
    pub state_key: Option<StateKey>,
    /// The expression evaluated into this slot, absent for state slots.
    pub expr: Option<ValueExprId>,
    /// Host-observed (a display sink reads it between frames).
    pub observed: bool,
}

impl SlotDesc {
    /// Total scalar length of this slot's range.
    pub fn len(&self) -> u32 {
        self.stride * self.lanes
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The slot plan: every slot's layout, the total value-array length, and the
/// event-flag count. The runtime pre-allocates from this and nothing else.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotPlan {
    descs: Vec<SlotDesc>,
    value_len: u32,
    flag_count: u32,
}

impl SlotPlan {
    pub fn get(&self, slot: SlotId) -> Option<&SlotDesc> {
        self.descs.get(slot.index())
    }

    /// Offset of one lane of a slot.
    pub fn lane_offset(&self, slot: SlotId, lane: u32) -> Option<u32> {
        let desc = self.get(slot)?;
        if lane >= desc.lanes {
            return None;
        }
        Some(desc.offset + lane * desc.stride)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotDesc> {
        self.descs.iter()
    }

    /// Total scalar length of the value array.
    pub fn value_len(&self) -> u32 {
        self.value_len
    }

    /// Number of event flags.
    pub fn flag_count(&self) -> u32 {
        self.flag_count
    }

    pub fn slot_count(&self) -> usize {
        self.descs.len()
    }

    /// The slot of a state key, if allocated.
    pub fn state_slot(&self, key: StateKey) -> Option<SlotId> {
        self.descs
            .iter()
            .find(|desc| desc.state_key == Some(key))
            .map(|desc| desc.slot)
    }
}

/// Sequentially allocates slots and computes the layout.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    descs: Vec<SlotDesc>,
    offset: u32,
    flags: u32,
}

impl SlotAllocator {
    pub fn new() -> Self {
        SlotAllocator::default()
    }

    /// Allocate a slot; `discrete` slots also get an event flag.
    pub fn allocate(
        &mut self,
        stride: u32,
        lanes: u32,
        discrete: bool,
        state_key: Option<StateKey>,
        expr: Option<ValueExprId>,
    ) -> SlotId {
        let slot = SlotId::new(u32::try_from(self.descs.len()).unwrap_or(u32::MAX));
        let flag = if discrete {
            let flag = EventFlagId::new(self.flags);
            self.flags += 1;
            Some(flag)
        } else {
            None
        };
        self.descs.push(SlotDesc {
            slot,
            offset: self.offset,
            stride,
            lanes,
            flag,
            state_key,
            expr,
            observed: false,
        });
        self.offset += stride * lanes;
        slot
    }

    /// Mark a slot as host-observed.
    pub fn observe(&mut self, slot: SlotId) {
        if let Some(desc) = self.descs.get_mut(slot.index()) {
            desc.observed = true;
        }
    }

    pub fn into_plan(self) -> SlotPlan {
        SlotPlan {
            descs: self.descs,
            value_len: self.offset,
            flag_count: self.flags,
        }
    }
}
