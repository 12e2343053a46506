//! The authoritative canonical type.

use std::fmt;

use crate::axis::{Axis, AxisMask};
use crate::extent::{Cardinality, Extent, InstanceRef};
use crate::kind::TypeError;
use crate::payload::PayloadType;
use crate::unit::Unit;

/// The canonical type: payload lane, structured unit, five-axis extent.
///
/// Payload and unit are concrete by construction — a payload variable cannot
/// be embedded here; the variable-bearing forms live in
/// [`crate::InferenceCanonicalType`] and are used only by port schemas and
/// the solver. Extent axes may carry variables until the frontend resolves
/// them; the axis validator guarantees none survive into the backend.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct CanonicalType {
    pub payload: PayloadType,
    pub unit: Unit,
    pub extent: Extent,
}

impl CanonicalType {
    pub const fn new(payload: PayloadType, unit: Unit, extent: Extent) -> Self {
        CanonicalType {
            payload,
            unit,
            extent,
        }
    }

    /// A signal: `one`, continuous, unbound.
    pub const fn signal(payload: PayloadType, unit: Unit) -> Self {
        CanonicalType::new(payload, unit, Extent::one())
    }

    /// A field over the given instance: `many(instance)`, continuous.
    pub const fn field(payload: PayloadType, unit: Unit, instance: InstanceRef) -> Self {
        CanonicalType::new(payload, unit, Extent::many(instance))
    }

    /// An event: `one`, discrete.
    pub const fn event(payload: PayloadType, unit: Unit) -> Self {
        CanonicalType::new(payload, unit, Extent::event())
    }

    /// A constant: `zero`, continuous.
    pub const fn constant(payload: PayloadType, unit: Unit) -> Self {
        CanonicalType::new(payload, unit, Extent::zero())
    }

    /// Which components are still variables. Payload and unit are concrete
    /// here by construction, so this is the extent's mask.
    pub fn var_mask(&self) -> AxisMask {
        self.extent.var_mask()
    }

    pub fn is_fully_instantiated(&self) -> bool {
        self.extent.is_fully_instantiated()
    }

    /// Attach a concrete instance to this type's `many` cardinality.
    ///
    /// Frontend-only: the backend never mutates types, and an enforcement
    /// test keeps this name out of the backend tree.
    #[must_use]
    pub fn with_instance(mut self, instance: InstanceRef) -> Self {
        self.extent.cardinality = Axis::Inst(Cardinality::many(instance));
        self
    }

    /// The concrete instance of a resolved `many` type.
    pub fn require_many_instance(&self) -> Result<InstanceRef, TypeError> {
        self.extent
            .cardinality
            .inst()
            .and_then(Cardinality::instance)
            .ok_or(TypeError::NotManyInstance)
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.extent.cardinality {
            Axis::Inst(card) => write!(f, "{card} {} {}", self.payload, self.unit),
            Axis::Var(v) => write!(f, "?c{} {} {}", v.raw(), self.payload, self.unit),
        }
    }
}

/// Pure structural compatibility between two types.
///
/// Two-argument, no registry lookups, no block names: payload and unit must
/// match exactly, and each extent axis must either match or have a variable
/// on at least one side. Adapters handle everything this rejects.
pub fn is_type_compatible(a: &CanonicalType, b: &CanonicalType) -> bool {
    if a.payload != b.payload || a.unit != b.unit {
        return false;
    }
    fn axis_compatible<V: PartialEq, I>(a: &Axis<V, I>, b: &Axis<V, I>) -> bool {
        match (a, b) {
            (Axis::Inst(x), Axis::Inst(y)) => x == y,
            _ => true,
        }
    }
    axis_compatible(&a.extent.cardinality, &b.extent.cardinality)
        && axis_compatible(&a.extent.temporality, &b.extent.temporality)
        && axis_compatible(&a.extent.binding, &b.extent.binding)
        && axis_compatible(&a.extent.perspective, &b.extent.perspective)
        && axis_compatible(&a.extent.branch, &b.extent.branch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::CardinalityVar;
    use crate::extent::{DomainId, InstanceId};

    fn inst(n: u32) -> InstanceRef {
        InstanceRef::new(DomainId::new(0), InstanceId::new(n))
    }

    #[test]
    fn equality_is_structural() {
        let a = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
        let b = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
        assert_eq!(a, b);

        let c = CanonicalType::signal(PayloadType::Float, Unit::Norm01);
        assert_ne!(a, c);
    }

    #[test]
    fn with_instance_resolves_many() {
        let ty = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
        let field = ty.with_instance(inst(2));
        assert_eq!(field.require_many_instance(), Ok(inst(2)));
        assert!(matches!(
            ty.require_many_instance(),
            Err(TypeError::NotManyInstance)
        ));
    }

    #[test]
    fn compatibility_requires_exact_payload_and_unit() {
        let a = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
        let b = CanonicalType::signal(PayloadType::Int, Unit::Scalar);
        assert!(!is_type_compatible(&a, &b));

        let c = CanonicalType::signal(PayloadType::Float, Unit::Norm01);
        assert!(!is_type_compatible(&a, &c));
    }

    #[test]
    fn variable_axes_are_compatible_with_anything() {
        let concrete = CanonicalType::field(PayloadType::Float, Unit::Scalar, inst(0));
        let mut open = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
        open.extent.cardinality = Axis::Var(CardinalityVar::new(0));
        assert!(is_type_compatible(&concrete, &open));
        assert!(is_type_compatible(&open, &concrete));
    }

    #[test]
    fn distinct_instances_are_incompatible() {
        let a = CanonicalType::field(PayloadType::Float, Unit::Scalar, inst(0));
        let b = CanonicalType::field(PayloadType::Float, Unit::Scalar, inst(1));
        assert!(!is_type_compatible(&a, &b));
    }

    #[test]
    fn display_is_compact() {
        let ty = CanonicalType::field(PayloadType::Vec2, Unit::Scalar, inst(3));
        assert_eq!(ty.to_string(), "many(inst(0,3)) vec2 scalar");
    }
}
