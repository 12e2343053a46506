//! Derived kind: const / signal / field / event.
//!
//! Kind is never stored; it is computed from temporality and cardinality.
//! The frontend uses the partial form during inference, the backend uses only
//! the total form — reaching a variable axis there is a bug, not a user
//! error.

use thiserror::Error;

use crate::axis::AxisMask;
use crate::canonical::CanonicalType;
use crate::extent::{Cardinality, Temporality};

/// The derived kind of a fully instantiated type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    Const,
    Signal,
    Field,
    Event,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Const => write!(f, "const"),
            ValueKind::Signal => write!(f, "signal"),
            ValueKind::Field => write!(f, "field"),
            ValueKind::Event => write!(f, "event"),
        }
    }
}

/// Errors from type-algebra operations.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum TypeError {
    /// `derive_kind` (or another total operation) reached a variable axis.
    #[error("axis not instantiated: {mask:?}")]
    AxisNotInstantiated { mask: AxisMask },

    /// `require_many_instance` on a type that is not a resolved `many`.
    #[error("type is not a `many` with a concrete instance")]
    NotManyInstance,
}

/// Derive the kind of a fully instantiated type.
///
/// Total over instantiated types; fails with [`TypeError::AxisNotInstantiated`]
/// if any axis (including a `many` instance) is still a variable.
///
/// Precedence: discrete temporality ⇒ event; zero cardinality ⇒ const; many
/// cardinality ⇒ field; otherwise signal.
pub fn derive_kind(ty: &CanonicalType) -> Result<ValueKind, TypeError> {
    let mask = ty.var_mask();
    if !mask.is_empty() {
        return Err(TypeError::AxisNotInstantiated { mask });
    }
    // var_mask is empty, so both axes are Inst.
    let temporality = ty.extent.temporality.inst_copied();
    let cardinality = ty.extent.cardinality.inst_copied();
    match (temporality, cardinality) {
        (Some(Temporality::Discrete), _) => Ok(ValueKind::Event),
        (Some(Temporality::Continuous), Some(Cardinality::Zero)) => Ok(ValueKind::Const),
        (Some(Temporality::Continuous), Some(Cardinality::Many(_))) => Ok(ValueKind::Field),
        (Some(Temporality::Continuous), Some(Cardinality::One)) => Ok(ValueKind::Signal),
        _ => Err(TypeError::AxisNotInstantiated { mask }),
    }
}

/// Partial variant of [`derive_kind`]: `None` whenever any axis is a
/// variable. The frontend uses this during inference.
pub fn try_derive_kind(ty: &CanonicalType) -> Option<ValueKind> {
    derive_kind(ty).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{Axis, CardinalityVar};
    use crate::extent::{DomainId, InstanceId, InstanceRef};
    use crate::payload::PayloadType;
    use crate::unit::Unit;

    fn inst() -> InstanceRef {
        InstanceRef::new(DomainId::new(0), InstanceId::new(0))
    }

    #[test]
    fn kind_round_trips_through_constructors() {
        let signal = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
        let field = CanonicalType::field(PayloadType::Vec2, Unit::Scalar, inst());
        let event = CanonicalType::event(PayloadType::Float, Unit::Scalar);
        let constant = CanonicalType::constant(PayloadType::Float, Unit::Scalar);

        assert_eq!(derive_kind(&signal), Ok(ValueKind::Signal));
        assert_eq!(derive_kind(&field), Ok(ValueKind::Field));
        assert_eq!(derive_kind(&event), Ok(ValueKind::Event));
        assert_eq!(derive_kind(&constant), Ok(ValueKind::Const));
    }

    #[test]
    fn variable_axis_fails_total_form() {
        let mut ty = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
        ty.extent.cardinality = Axis::Var(CardinalityVar::new(0));

        assert!(matches!(
            derive_kind(&ty),
            Err(TypeError::AxisNotInstantiated { mask }) if mask == AxisMask::CARDINALITY
        ));
        assert_eq!(try_derive_kind(&ty), None);
    }

    #[test]
    fn discrete_wins_over_cardinality() {
        let mut ty = CanonicalType::event(PayloadType::Float, Unit::Scalar);
        ty.extent.cardinality = Axis::Inst(crate::Cardinality::many(inst()));
        // A discrete field-shaped value is still an event by precedence.
        assert_eq!(derive_kind(&ty), Ok(ValueKind::Event));
    }
}

#[cfg(test)]
mod prop_tests {
    use proptest::prelude::*;

    use super::*;
    use crate::extent::{DomainId, InstanceId, InstanceRef};
    use crate::payload::PayloadType;
    use crate::unit::{AngleUnit, TimeUnit, Unit};

    fn any_payload() -> impl Strategy<Value = PayloadType> {
        prop_oneof![
            Just(PayloadType::Float),
            Just(PayloadType::Int),
            Just(PayloadType::Bool),
            Just(PayloadType::Vec2),
            Just(PayloadType::Vec3),
            Just(PayloadType::Color),
        ]
    }

    fn any_unit() -> impl Strategy<Value = Unit> {
        prop_oneof![
            Just(Unit::None),
            Just(Unit::Scalar),
            Just(Unit::Norm01),
            Just(Unit::Count),
            Just(Unit::Angle(AngleUnit::Radians)),
            Just(Unit::Angle(AngleUnit::Degrees)),
            Just(Unit::Time(TimeUnit::Seconds)),
        ]
    }

    proptest! {
        /// Constructors and `derive_kind` agree for every payload/unit.
        #[test]
        fn constructor_kind_round_trip(payload in any_payload(), unit in any_unit()) {
            let instance = InstanceRef::new(DomainId::new(0), InstanceId::new(0));
            prop_assert_eq!(
                derive_kind(&CanonicalType::signal(payload, unit)),
                Ok(ValueKind::Signal)
            );
            prop_assert_eq!(
                derive_kind(&CanonicalType::field(payload, unit, instance)),
                Ok(ValueKind::Field)
            );
            prop_assert_eq!(
                derive_kind(&CanonicalType::event(payload, unit)),
                Ok(ValueKind::Event)
            );
            prop_assert_eq!(
                derive_kind(&CanonicalType::constant(payload, unit)),
                Ok(ValueKind::Const)
            );
        }

        /// Structural equality is reflexive over constructed types.
        #[test]
        fn type_equality_is_reflexive(payload in any_payload(), unit in any_unit()) {
            let ty = CanonicalType::signal(payload, unit);
            prop_assert_eq!(ty, ty);
        }
    }
}
