//! Axis shape and typed variable ids.
//!
//! Every axis of a type has the shape `Var(id) | Inst(value)`. Variable ids
//! are typed per axis domain so a cardinality variable can never be confused
//! with a unit variable; each is a 32-bit dense index.

use bitflags::bitflags;

/// Define a dense 32-bit id newtype.
///
/// Ids are Copy, O(1) to compare, and index into whatever table allocated
/// them. Exported because the graph and IR crates define their ids the same
/// way.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_id! {
    /// Variable on the cardinality axis.
    CardinalityVar
}
define_id! {
    /// Variable standing for the instance inside a `many` cardinality.
    InstanceVar
}
define_id! {
    /// Variable on the temporality axis.
    TemporalityVar
}
define_id! {
    /// Variable on the binding axis.
    BindingVar
}
define_id! {
    /// Variable on the perspective axis.
    PerspectiveVar
}
define_id! {
    /// Variable on the branch axis.
    BranchVar
}
define_id! {
    /// Variable standing for an unresolved unit (inference form only).
    UnitVar
}
define_id! {
    /// Variable standing for an unresolved payload (inference form only).
    PayloadVar
}

/// One axis of a type: either an unresolved variable or an instantiated
/// value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis<V, I> {
    /// Unresolved; the solver owns the variable.
    Var(I),
    /// Instantiated to a concrete value.
    Inst(V),
}

impl<V, I> Axis<V, I> {
    #[inline]
    pub const fn is_var(&self) -> bool {
        matches!(self, Axis::Var(_))
    }

    #[inline]
    pub const fn is_inst(&self) -> bool {
        matches!(self, Axis::Inst(_))
    }

    /// The instantiated value, if any.
    #[inline]
    pub const fn inst(&self) -> Option<&V> {
        match self {
            Axis::Inst(value) => Some(value),
            Axis::Var(_) => None,
        }
    }

    /// The variable id, if any.
    pub fn var(&self) -> Option<&I> {
        match self {
            Axis::Var(id) => Some(id),
            Axis::Inst(_) => None,
        }
    }
}

impl<V: Copy, I> Axis<V, I> {
    /// Copy out the instantiated value, if any.
    #[inline]
    pub fn inst_copied(&self) -> Option<V> {
        self.inst().copied()
    }
}

bitflags! {
    /// The components of a type that are still variables.
    ///
    /// Computed on demand; used by the validator and by
    /// `AxisNotInstantiated` errors to say exactly which parts are unsolved.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct AxisMask: u8 {
        const CARDINALITY = 1 << 0;
        /// The instance inside a `many` cardinality.
        const INSTANCE = 1 << 1;
        const TEMPORALITY = 1 << 2;
        const BINDING = 1 << 3;
        const PERSPECTIVE = 1 << 4;
        const BRANCH = 1 << 5;
        const UNIT = 1 << 6;
        const PAYLOAD = 1 << 7;
    }
}

// Ids must stay pointer-width-independent 4-byte values.
const _: () = assert!(std::mem::size_of::<CardinalityVar>() == 4);
const _: () = assert!(std::mem::size_of::<UnitVar>() == 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_accessors() {
        let var: Axis<u32, CardinalityVar> = Axis::Var(CardinalityVar::new(7));
        let inst: Axis<u32, CardinalityVar> = Axis::Inst(3);

        assert!(var.is_var());
        assert!(!var.is_inst());
        assert_eq!(var.var(), Some(&CardinalityVar::new(7)));
        assert_eq!(var.inst(), None);

        assert!(inst.is_inst());
        assert_eq!(inst.inst_copied(), Some(3));
    }

    #[test]
    fn ids_compare_by_raw_value() {
        assert_eq!(InstanceVar::new(4), InstanceVar::new(4));
        assert_ne!(InstanceVar::new(4), InstanceVar::new(5));
        assert_eq!(InstanceVar::new(9).index(), 9);
    }

    #[test]
    fn mask_is_a_set() {
        let mask = AxisMask::CARDINALITY | AxisMask::UNIT;
        assert!(mask.contains(AxisMask::CARDINALITY));
        assert!(!mask.contains(AxisMask::PAYLOAD));
        assert!(AxisMask::empty().is_empty());
    }
}
