//! Contiguous storage for value expressions.
//!
//! All expressions live in one flat vector referenced by [`ValueExprId`]
//! indices. A dedup map keyed on full structural equality gives canonical
//! uniqueness: interning the same expression twice returns the same id and
//! does not grow the arena.

use rustc_hash::FxHashMap;

use crate::expr::ValueExpr;
use crate::ids::ValueExprId;

/// The expression arena: insertion-ordered storage plus the hash-cons map.
#[derive(Default, Debug)]
pub struct ExprArena {
    exprs: Vec<ValueExpr>,
    interned: FxHashMap<ValueExpr, ValueExprId>,
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena::default()
    }

    /// Intern an expression, returning the existing id when a structurally
    /// equal expression is already present.
    pub(crate) fn intern(&mut self, expr: ValueExpr) -> ValueExprId {
        if let Some(&id) = self.interned.get(&expr) {
            return id;
        }
        let id = ValueExprId::new(u32::try_from(self.exprs.len()).unwrap_or(u32::MAX));
        self.exprs.push(expr.clone());
        self.interned.insert(expr, id);
        id
    }

    /// Whether `id` refers to an expression in this arena.
    #[inline]
    pub fn contains(&self, id: ValueExprId) -> bool {
        id.index() < self.exprs.len()
    }

    /// Look up an expression.
    #[inline]
    pub fn get(&self, id: ValueExprId) -> Option<&ValueExpr> {
        self.exprs.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Iterate expressions in insertion order with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ValueExprId, &ValueExpr)> {
        self.exprs
            .iter()
            .enumerate()
            .map(|(i, e)| (ValueExprId::new(u32::try_from(i).unwrap_or(u32::MAX)), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::TimeBase;
    use lux_types::{CanonicalType, PayloadType, Unit};

    fn time_expr() -> ValueExpr {
        ValueExpr::Time {
            base: TimeBase::Seconds,
            ty: CanonicalType::signal(PayloadType::Float, Unit::Scalar),
        }
    }

    #[test]
    fn interning_is_idempotent() {
        let mut arena = ExprArena::new();
        let a = arena.intern(time_expr());
        let b = arena.intern(time_expr());
        assert_eq!(a, b);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn distinct_expressions_get_distinct_ids() {
        let mut arena = ExprArena::new();
        let a = arena.intern(time_expr());
        let b = arena.intern(ValueExpr::Time {
            base: TimeBase::Frames,
            ty: CanonicalType::signal(PayloadType::Float, Unit::Count),
        });
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert!(arena.contains(a));
        assert!(arena.contains(b));
        assert!(!arena.contains(crate::ValueExprId::new(2)));
    }
}
