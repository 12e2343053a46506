//! Backend for Lux: lowering and scheduling.
//!
//! [`compile_backend`] turns a backend-ready [`TypedPatch`] into a
//! [`Schedule`]: blocks lower in topological order into the hash-consed
//! expression arena, dead expressions are swept, slots are allocated, and
//! steps are emitted with a pre-resolved [`Strategy`] per evaluation. The
//! schedule is a total function of (topological order, insertion order); no
//! wall-clock input influences it.
//!
//! The backend reads types and never mutates them. Errors here are bug
//! classes, not author errors: correctly used — after a frontend run with
//! `backend_ready` — none of them fire.

mod lower;
mod schedule;
mod slots;

pub use schedule::{strategy_for, Schedule, Step, Strategy};
pub use slots::{SlotAllocator, SlotDesc, SlotPlan, StateKey};

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::debug;

use lux_frontend::TypedPatch;
use lux_ir::{sweep, BuildError, ExprArena, KernelOp, SlotId, ValueExpr, ValueExprId};
use lux_patch::{BlockId, BlockRegistry, Name};
use lux_types::{derive_kind, TypeError, ValueKind};

use lower::{Lowerer, StepRequest};

/// Backend failures. All are fatal: the current compilation stops.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum BackendError {
    /// The frontend did not sign off on this patch.
    #[error("typed patch is not backend-ready")]
    NotReady,

    /// A connected input had no lowered expression.
    #[error("no expression for input port of block #{block:?}")]
    MissingInput { block: BlockId, port: Name },

    /// Builder misuse while lowering.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// `derive_kind` reached a variable axis after validation.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// An impossible state; indicates a compiler bug.
    #[error("internal: {0}")]
    Internal(String),
}

/// The backend's output: the schedule and the (swept) expression arena.
///
/// There is no diagnostics list here: backend failures are bug classes and
/// surface as [`BackendError`], never as accumulated records.
#[derive(Debug)]
pub struct BackendOutput {
    pub schedule: Schedule,
    pub exprs: ExprArena,
}

/// Lower a typed patch into a schedule.
pub fn compile_backend(
    typed: &TypedPatch,
    registry: &BlockRegistry,
) -> Result<BackendOutput, BackendError> {
    if !typed.backend_ready {
        return Err(BackendError::NotReady);
    }

    // === Lowering, in topological order ===

    let mut lowerer = Lowerer::new(typed, registry);
    for &block_id in &typed.order {
        lowerer.lower_block(block_id)?;
    }
    let Lowerer {
        builder,
        mut alloc,
        sinks,
        requests,
        ..
    } = lowerer;

    // === Dead-code elimination from the sink set ===

    let arena = builder.into_arena();
    let before = arena.len();
    let (arena, remap) = sweep(&arena, &sinks);
    debug!(before, after = arena.len(), "swept expression arena");

    let live_sinks: FxHashSet<ValueExprId> =
        sinks.iter().filter_map(|&sink| remap.get(sink)).collect();

    // === Slot allocation ===
    //
    // A slot goes to every expression with observable downstream use: the
    // sink-referenced ones, plus the stateful evaluations (events latch a
    // flag, holds latch a value across frames). Everything else evaluates
    // inline.

    let mut expr_slots: FxHashMap<ValueExprId, SlotId> = FxHashMap::default();
    for (id, expr) in arena.iter() {
        let kind = derive_kind(expr.ty())?;
        let is_hold = matches!(
            expr,
            ValueExpr::Kernel {
                op: KernelOp::Hold,
                ..
            }
        );
        if !(live_sinks.contains(&id) || kind == ValueKind::Event || is_hold) {
            continue;
        }
        let lanes = match expr.ty().require_many_instance() {
            Ok(instance) => typed.instances.count_of(instance).ok_or_else(|| {
                BackendError::Internal(format!("instance {instance} missing from the table"))
            })?,
            Err(_) => 1,
        };
        let slot = alloc.allocate(
            expr.ty().payload.stride(),
            lanes,
            kind == ValueKind::Event,
            None,
            Some(id),
        );
        expr_slots.insert(id, slot);
    }

    // === Step emission ===

    let mut steps = Vec::new();
    for (id, expr) in arena.iter() {
        if let Some(&target) = expr_slots.get(&id) {
            steps.push(Step::EvalValue {
                expr: id,
                target,
                strategy: strategy_for(expr.ty())?,
            });
        }
    }

    let slot_of = |source: ValueExprId,
                   expr_slots: &FxHashMap<ValueExprId, SlotId>|
     -> Result<SlotId, BackendError> {
        let live = remap
            .get(source)
            .ok_or_else(|| BackendError::Internal("sink expression was swept".to_owned()))?;
        expr_slots
            .get(&live)
            .copied()
            .ok_or_else(|| BackendError::Internal("sink expression has no slot".to_owned()))
    };

    for request in requests {
        match request {
            StepRequest::StateWrite {
                target,
                source,
                stride,
            } => {
                let source = slot_of(source, &expr_slots)?;
                if stride > 1 {
                    steps.push(Step::SlotWriteStrided {
                        target,
                        source,
                        stride,
                    });
                } else {
                    steps.push(Step::StateWrite { target, source });
                }
            }
            StepRequest::FieldStateWrite {
                target,
                source,
                lanes,
                stride,
            } => {
                let source = slot_of(source, &expr_slots)?;
                steps.push(Step::FieldStateWrite {
                    target,
                    source,
                    lanes,
                    stride,
                });
            }
            StepRequest::ContinuityMapBuild { instance } => {
                steps.push(Step::ContinuityMapBuild { instance });
            }
            StepRequest::ContinuityApply { instance, target } => {
                steps.push(Step::ContinuityApply { instance, target });
            }
            StepRequest::Materialize {
                source,
                instance,
                lanes,
                stride,
            } => {
                let source = slot_of(source, &expr_slots)?;
                steps.push(Step::Materialize {
                    source,
                    instance,
                    lanes,
                    stride,
                });
            }
            StepRequest::Render {
                source,
                instance,
                lanes,
                stride,
            } => {
                let source = slot_of(source, &expr_slots)?;
                steps.push(Step::Render {
                    source,
                    instance,
                    lanes,
                    stride,
                });
            }
            StepRequest::Observe { source } => {
                let slot = slot_of(source, &expr_slots)?;
                alloc.observe(slot);
            }
        }
    }

    let slot_plan = alloc.into_plan();
    debug!(
        steps = steps.len(),
        slots = slot_plan.slot_count(),
        "schedule emitted"
    );

    let instance_counts = typed
        .instances
        .iter()
        .map(|info| (info.instance, info.count))
        .collect();

    Ok(BackendOutput {
        schedule: Schedule {
            steps,
            slot_plan,
            instance_counts,
        },
        exprs: arena,
    })
}
