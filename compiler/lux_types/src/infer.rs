//! Inference-side type forms.
//!
//! Port schemas and the solver carry types whose payload and unit may still
//! be variables. These forms never escape the frontend: lowering into a
//! [`CanonicalType`] requires both to be instantiated, which is how the
//! no-payload-variable invariant is enforced at the type level.

use crate::axis::{Axis, AxisMask, PayloadVar, UnitVar};
use crate::canonical::CanonicalType;
use crate::extent::Extent;
use crate::payload::PayloadType;
use crate::unit::Unit;

/// A payload that may still be a variable.
pub type InferencePayload = Axis<PayloadType, PayloadVar>;

/// A unit that may still be a variable.
pub type InferenceUnit = Axis<Unit, UnitVar>;

/// The solver's working type: payload, unit, and every extent axis may be
/// variables.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct InferenceCanonicalType {
    pub payload: InferencePayload,
    pub unit: InferenceUnit,
    pub extent: Extent,
}

impl InferenceCanonicalType {
    pub const fn new(payload: InferencePayload, unit: InferenceUnit, extent: Extent) -> Self {
        InferenceCanonicalType {
            payload,
            unit,
            extent,
        }
    }

    /// Wrap an already-canonical type.
    pub const fn from_canonical(ty: CanonicalType) -> Self {
        InferenceCanonicalType {
            payload: Axis::Inst(ty.payload),
            unit: Axis::Inst(ty.unit),
            extent: ty.extent,
        }
    }

    /// Fully concrete payload and unit with the given extent.
    pub const fn concrete(payload: PayloadType, unit: Unit, extent: Extent) -> Self {
        InferenceCanonicalType {
            payload: Axis::Inst(payload),
            unit: Axis::Inst(unit),
            extent,
        }
    }

    /// Which components are still variables, including payload and unit.
    pub fn var_mask(&self) -> AxisMask {
        let mut mask = self.extent.var_mask();
        if self.payload.is_var() {
            mask |= AxisMask::PAYLOAD;
        }
        if self.unit.is_var() {
            mask |= AxisMask::UNIT;
        }
        mask
    }

    /// Lower into a canonical type. `None` while payload or unit is still a
    /// variable — extent variables are allowed through and left for the axis
    /// validator.
    pub fn into_canonical(self) -> Option<CanonicalType> {
        match (self.payload, self.unit) {
            (Axis::Inst(payload), Axis::Inst(unit)) => {
                Some(CanonicalType::new(payload, unit, self.extent))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_round_trip() {
        let ty = CanonicalType::signal(PayloadType::Vec2, Unit::Scalar);
        let inference = InferenceCanonicalType::from_canonical(ty);
        assert_eq!(inference.var_mask(), AxisMask::empty());
        assert_eq!(inference.into_canonical(), Some(ty));
    }

    #[test]
    fn payload_variable_blocks_lowering() {
        let inference = InferenceCanonicalType::new(
            Axis::Var(PayloadVar::new(0)),
            Axis::Inst(Unit::Scalar),
            Extent::one(),
        );
        assert!(inference.var_mask().contains(AxisMask::PAYLOAD));
        assert_eq!(inference.into_canonical(), None);
    }

    #[test]
    fn unit_variable_blocks_lowering() {
        let inference = InferenceCanonicalType::new(
            Axis::Inst(PayloadType::Float),
            Axis::Var(UnitVar::new(0)),
            Extent::one(),
        );
        assert!(inference.var_mask().contains(AxisMask::UNIT));
        assert_eq!(inference.into_canonical(), None);
    }
}
