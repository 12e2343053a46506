//! Axis value domains and the five-axis extent.

use std::fmt;

use crate::axis::{
    Axis, AxisMask, BindingVar, BranchVar, CardinalityVar, InstanceVar, PerspectiveVar,
    TemporalityVar,
};
use crate::define_id;

define_id! {
    /// A domain of instances (e.g. the circle-array domain).
    DomainId
}
define_id! {
    /// One instantiation of a domain.
    InstanceId
}

/// Identity of a specific instantiation of a domain.
///
/// This is the only carrier of instance identity in the type system: no
/// expression variant stores an instance id of its own.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceRef {
    pub domain: DomainId,
    pub instance: InstanceId,
}

impl InstanceRef {
    pub const fn new(domain: DomainId, instance: InstanceId) -> Self {
        InstanceRef { domain, instance }
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inst({},{})", self.domain.raw(), self.instance.raw())
    }
}

/// Opaque handle to a binding target (e.g. a material slot), assigned by the
/// host.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct BindingTarget(pub u32);

/// Cardinality axis value: how many lanes a value has.
///
/// The instance inside `Many` is itself axis-shaped: mid-frontend a type can
/// be known to be `many` before its instance is resolved.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Cardinality {
    Zero,
    One,
    Many(Axis<InstanceRef, InstanceVar>),
}

impl Cardinality {
    /// A `many` with a concrete instance.
    pub const fn many(instance: InstanceRef) -> Self {
        Cardinality::Many(Axis::Inst(instance))
    }

    /// A `many` whose instance is still a variable.
    pub const fn many_var(var: InstanceVar) -> Self {
        Cardinality::Many(Axis::Var(var))
    }

    pub const fn is_many(&self) -> bool {
        matches!(self, Cardinality::Many(_))
    }

    /// The concrete instance, if this is a resolved `many`.
    pub fn instance(&self) -> Option<InstanceRef> {
        match self {
            Cardinality::Many(axis) => axis.inst_copied(),
            _ => None,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Zero => write!(f, "zero"),
            Cardinality::One => write!(f, "one"),
            Cardinality::Many(Axis::Inst(i)) => write!(f, "many({i})"),
            Cardinality::Many(Axis::Var(v)) => write!(f, "many(?{})", v.raw()),
        }
    }
}

/// Temporality axis value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Temporality {
    Continuous,
    Discrete,
}

/// Binding axis value: whether a value is attached to a host target.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Binding {
    Unbound,
    Bound(BindingTarget),
}

/// Perspective axis value. Closed in v0; future variants extend the enum and
/// nothing else — the solver handles this axis generically.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Perspective {
    #[default]
    Default,
}

/// Branch axis value. Closed in v0, same extension rule as [`Perspective`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Branch {
    #[default]
    Default,
}

/// The five-axis product inside a type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Extent {
    pub cardinality: Axis<Cardinality, CardinalityVar>,
    pub temporality: Axis<Temporality, TemporalityVar>,
    pub binding: Axis<Binding, BindingVar>,
    pub perspective: Axis<Perspective, PerspectiveVar>,
    pub branch: Axis<Branch, BranchVar>,
}

impl Extent {
    /// Fully instantiated extent with the given cardinality and temporality,
    /// unbound, default perspective and branch.
    pub const fn resolved(cardinality: Cardinality, temporality: Temporality) -> Self {
        Extent {
            cardinality: Axis::Inst(cardinality),
            temporality: Axis::Inst(temporality),
            binding: Axis::Inst(Binding::Unbound),
            perspective: Axis::Inst(Perspective::Default),
            branch: Axis::Inst(Branch::Default),
        }
    }

    /// `one`, continuous: a signal's extent.
    pub const fn one() -> Self {
        Extent::resolved(Cardinality::One, Temporality::Continuous)
    }

    /// `zero`, continuous: a constant's extent.
    pub const fn zero() -> Self {
        Extent::resolved(Cardinality::Zero, Temporality::Continuous)
    }

    /// `many(instance)`, continuous: a field's extent.
    pub const fn many(instance: InstanceRef) -> Self {
        Extent::resolved(Cardinality::many(instance), Temporality::Continuous)
    }

    /// `one`, discrete: an event's extent.
    pub const fn event() -> Self {
        Extent::resolved(Cardinality::One, Temporality::Discrete)
    }

    /// Which axes are still variables.
    pub fn var_mask(&self) -> AxisMask {
        let mut mask = AxisMask::empty();
        match &self.cardinality {
            Axis::Var(_) => mask |= AxisMask::CARDINALITY,
            Axis::Inst(Cardinality::Many(inner)) if inner.is_var() => {
                mask |= AxisMask::INSTANCE;
            }
            Axis::Inst(_) => {}
        }
        if self.temporality.is_var() {
            mask |= AxisMask::TEMPORALITY;
        }
        if self.binding.is_var() {
            mask |= AxisMask::BINDING;
        }
        if self.perspective.is_var() {
            mask |= AxisMask::PERSPECTIVE;
        }
        if self.branch.is_var() {
            mask |= AxisMask::BRANCH;
        }
        mask
    }

    /// Whether every axis (including a `many` instance) is instantiated.
    pub fn is_fully_instantiated(&self) -> bool {
        self.var_mask().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst() -> InstanceRef {
        InstanceRef::new(DomainId::new(0), InstanceId::new(1))
    }

    #[test]
    fn resolved_extents_are_fully_instantiated() {
        assert!(Extent::one().is_fully_instantiated());
        assert!(Extent::zero().is_fully_instantiated());
        assert!(Extent::event().is_fully_instantiated());
        assert!(Extent::many(inst()).is_fully_instantiated());
    }

    #[test]
    fn var_mask_reports_each_axis() {
        let mut extent = Extent::one();
        extent.cardinality = Axis::Var(CardinalityVar::new(0));
        extent.binding = Axis::Var(BindingVar::new(1));
        assert_eq!(
            extent.var_mask(),
            AxisMask::CARDINALITY | AxisMask::BINDING
        );
        assert!(!extent.is_fully_instantiated());
    }

    #[test]
    fn many_with_variable_instance_is_not_instantiated() {
        let mut extent = Extent::one();
        extent.cardinality = Axis::Inst(Cardinality::many_var(InstanceVar::new(3)));
        assert_eq!(extent.var_mask(), AxisMask::INSTANCE);
    }

    #[test]
    fn cardinality_instance_accessor() {
        assert_eq!(Cardinality::many(inst()).instance(), Some(inst()));
        assert_eq!(Cardinality::many_var(InstanceVar::new(0)).instance(), None);
        assert_eq!(Cardinality::One.instance(), None);
        assert!(Cardinality::many(inst()).is_many());
    }
}
