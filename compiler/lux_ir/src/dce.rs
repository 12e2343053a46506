//! Dead-code elimination over the expression arena.
//!
//! After lowering, a mark-sweep from the sink set (state writes, render
//! inputs, external observables) prunes unreachable entries. The arena
//! compacts ids and the caller remaps its references through the returned
//! table in a single pass.

use crate::arena::ExprArena;
use crate::expr::ValueExpr;
use crate::ids::ValueExprId;

/// Old-id → new-id table produced by a sweep.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExprRemap {
    table: Vec<Option<ValueExprId>>,
}

impl ExprRemap {
    /// The compacted id for `old`, or `None` if it was swept.
    #[inline]
    pub fn get(&self, old: ValueExprId) -> Option<ValueExprId> {
        self.table.get(old.index()).copied().flatten()
    }

    /// Number of entries that survived.
    pub fn live_count(&self) -> usize {
        self.table.iter().filter(|e| e.is_some()).count()
    }
}

/// Mark-sweep the arena from `sinks`, compacting ids.
///
/// Returns the compacted arena and the remap table. Reachability follows
/// kernel inputs only — every other variant is a leaf. Insertion order of
/// surviving expressions is preserved, so ids stay dense and deterministic.
pub fn sweep(arena: &ExprArena, sinks: &[ValueExprId]) -> (ExprArena, ExprRemap) {
    let mut live = vec![false; arena.len()];

    // Mark. Inputs always precede their users, so one reverse pass after
    // seeding would do; an explicit stack keeps the order question out of it.
    let mut stack: Vec<ValueExprId> = sinks
        .iter()
        .copied()
        .filter(|id| arena.contains(*id))
        .collect();
    while let Some(id) = stack.pop() {
        if live[id.index()] {
            continue;
        }
        live[id.index()] = true;
        if let Some(expr) = arena.get(id) {
            stack.extend_from_slice(expr.inputs());
        }
    }

    // Sweep: rebuild in insertion order, remapping kernel inputs as we go.
    let mut compacted = ExprArena::new();
    let mut table: Vec<Option<ValueExprId>> = vec![None; arena.len()];
    for (old_id, expr) in arena.iter() {
        if !live[old_id.index()] {
            continue;
        }
        let rebuilt = match expr {
            ValueExpr::Kernel { op, inputs, ty } => {
                let remapped = inputs
                    .iter()
                    .filter_map(|input| table.get(input.index()).copied().flatten())
                    .collect();
                ValueExpr::Kernel {
                    op: *op,
                    inputs: remapped,
                    ty: *ty,
                }
            }
            other => other.clone(),
        };
        table[old_id.index()] = Some(compacted.intern(rebuilt));
    }

    (compacted, ExprRemap { table })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::ExprBuilder;
    use crate::expr::{TimeBase, ZipFn};
    use lux_types::{ConstValue, PayloadType, Unit};

    fn id(r: Result<ValueExprId, crate::BuildError>) -> ValueExprId {
        match r {
            Ok(id) => id,
            Err(e) => panic!("build failed: {e}"),
        }
    }

    #[test]
    fn unreachable_expressions_are_pruned() {
        let mut b = ExprBuilder::new();
        let t = id(b.time(TimeBase::Seconds));
        let dead = id(b.constant(PayloadType::Float, Unit::Scalar, ConstValue::Float(9.0)));
        let two = id(b.constant(PayloadType::Float, Unit::Scalar, ConstValue::Float(2.0)));
        let live = id(b.zip(ZipFn::Mul, t, two));

        let (compacted, remap) = sweep(b.arena(), &[live]);
        assert_eq!(compacted.len(), 3);
        assert_eq!(remap.live_count(), 3);
        assert_eq!(remap.get(dead), None);
        assert!(remap.get(t).is_some());
        assert!(remap.get(live).is_some());
    }

    #[test]
    fn remapped_inputs_stay_consistent() {
        let mut b = ExprBuilder::new();
        let dead = id(b.constant(PayloadType::Float, Unit::Scalar, ConstValue::Float(1.0)));
        let t = id(b.time(TimeBase::Seconds));
        let two = id(b.constant(PayloadType::Float, Unit::Scalar, ConstValue::Float(2.0)));
        let prod = id(b.zip(ZipFn::Mul, t, two));

        let (compacted, remap) = sweep(b.arena(), &[prod]);
        let _ = dead;
        let new_prod = match remap.get(prod) {
            Some(id) => id,
            None => panic!("sink swept"),
        };
        let expr = match compacted.get(new_prod) {
            Some(e) => e,
            None => panic!("missing sink"),
        };
        for input in expr.inputs() {
            assert!(compacted.contains(*input));
            assert!(input.index() < new_prod.index());
        }
    }

    #[test]
    fn sweep_of_everything_preserves_arena() {
        let mut b = ExprBuilder::new();
        let t = id(b.time(TimeBase::Seconds));
        let f = id(b.time(TimeBase::Frames));
        let (compacted, remap) = sweep(b.arena(), &[t, f]);
        assert_eq!(compacted.len(), 2);
        assert_eq!(remap.get(t), Some(t));
        assert_eq!(remap.get(f), Some(f));
    }
}
