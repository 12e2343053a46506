//! Per-frame execution of a schedule.

use rustc_hash::FxHashMap;
use tracing::trace;

use lux_backend::{Schedule, SlotDesc, StateKey, Step, Strategy};
use lux_ir::{
    ExprArena, ExternalSource, IntrinsicKind, KernelOp, MapFn, ReduceFn, SlotId, StatePhase,
    TimeBase, ValueExpr, ValueExprId, ZipFn,
};
use lux_types::{Axis, Cardinality, InstanceRef};

use crate::error::RuntimeError;
use crate::state::RuntimeState;

/// Host-supplied inputs for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    pub time_seconds: f64,
    pub frame_index: u64,
    /// External signal channels.
    pub channels: FxHashMap<u32, f64>,
    /// Pulses to inject this frame: `(state channel, payload)`.
    pub events: Vec<(u32, f64)>,
}

impl FrameInput {
    pub fn at(time_seconds: f64, frame_index: u64) -> Self {
        FrameInput {
            time_seconds,
            frame_index,
            ..FrameInput::default()
        }
    }
}

/// One draw emitted by a render step: the materialized lanes of a field.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub instance: InstanceRef,
    pub count: u32,
    pub stride: u32,
    pub data: Vec<f64>,
}

/// Everything a frame produced for the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    pub draws: Vec<DrawItem>,
}

/// Scalar components of one evaluated element; lanes past the payload
/// stride stay zero.
type Comps = [f64; 4];

/// Execute one frame: clear event flags, inject host pulses, walk the step
/// list in order, sink buffered state writes, emit the render frame.
pub fn run_frame(
    schedule: &Schedule,
    exprs: &ExprArena,
    state: &mut RuntimeState,
    input: &FrameInput,
) -> Result<RenderFrame, RuntimeError> {
    state.check_shape(&schedule.slot_plan)?;

    // Event flags are one-shot: whatever fired last frame clears now.
    state.flags.iter_mut().for_each(|flag| *flag = false);

    // Host-injected pulses land in their event state slots before any step
    // runs.
    for &(channel, value) in &input.events {
        let desc = schedule
            .slot_plan
            .iter()
            .find(|desc| desc.state_key == Some(StateKey::new(channel)) && desc.flag.is_some());
        match desc {
            Some(desc) => {
                if let Some(flag) = desc.flag {
                    state.flags[flag.index()] = true;
                }
                state.write(desc.offset, value)?;
            }
            None => trace!(channel, "pulse injected into unknown channel"),
        }
    }

    let eval = FrameEval::new(schedule, exprs, input);
    let mut staging: FxHashMap<SlotId, Vec<f64>> = FxHashMap::default();
    let mut frame = RenderFrame::default();

    for step in &schedule.steps {
        match *step {
            Step::EvalValue {
                expr,
                target,
                strategy,
            } => eval.eval_step(state, expr, target, strategy)?,

            Step::StateWrite { target, source } => {
                let value = state.read(offset_of(schedule, source)?)?;
                state.pending.push((offset_of(schedule, target)?, value));
            }

            Step::SlotWriteStrided {
                target,
                source,
                stride,
            } => {
                let from = offset_of(schedule, source)?;
                let to = offset_of(schedule, target)?;
                for component in 0..stride {
                    let value = state.read(from + component)?;
                    state.pending.push((to + component, value));
                }
            }

            Step::FieldStateWrite {
                target,
                source,
                lanes,
                stride,
            } => {
                let from = offset_of(schedule, source)?;
                let to = offset_of(schedule, target)?;
                for i in 0..lanes * stride {
                    let value = state.read(from + i)?;
                    state.pending.push((to + i, value));
                }
            }

            Step::Materialize {
                source,
                lanes,
                stride,
                ..
            } => {
                let from = offset_of(schedule, source)?;
                let mut data = Vec::with_capacity((lanes * stride) as usize);
                for i in 0..lanes * stride {
                    data.push(state.read(from + i)?);
                }
                staging.insert(source, data);
            }

            Step::Render {
                source,
                instance,
                lanes,
                stride,
            } => {
                let data = staging
                    .get(&source)
                    .cloned()
                    .ok_or(RuntimeError::NotMaterialized { slot: source })?;
                frame.draws.push(DrawItem {
                    instance,
                    count: lanes,
                    stride,
                    data,
                });
            }

            Step::ContinuityMapBuild { instance } => {
                trace!(%instance, "continuity map build (identity in this runtime)");
            }
            Step::ContinuityApply { instance, .. } => {
                trace!(%instance, "continuity apply (identity in this runtime)");
            }
        }
    }

    // Frame boundary: writers become visible to next frame's readers.
    state.sink_pending()?;
    Ok(frame)
}

fn offset_of(schedule: &Schedule, slot: SlotId) -> Result<u32, RuntimeError> {
    schedule
        .slot_plan
        .get(slot)
        .map(|desc| desc.offset)
        .ok_or(RuntimeError::SlotOutOfRange { slot })
}

/// Expression evaluator for one frame.
///
/// Slotted sub-expressions read their (already evaluated) slots; everything
/// else evaluates inline, recursively. Step order guarantees a slotted
/// expression's `EvalValue` runs before any reader.
struct FrameEval<'a> {
    exprs: &'a ExprArena,
    plan: &'a lux_backend::SlotPlan,
    input: &'a FrameInput,
    counts: FxHashMap<InstanceRef, u32>,
    slot_by_expr: FxHashMap<ValueExprId, &'a SlotDesc>,
}

impl<'a> FrameEval<'a> {
    fn new(schedule: &'a Schedule, exprs: &'a ExprArena, input: &'a FrameInput) -> Self {
        let counts = schedule.instance_counts.iter().copied().collect();
        let slot_by_expr = schedule
            .slot_plan
            .iter()
            .filter_map(|desc| desc.expr.map(|expr| (expr, desc)))
            .collect();
        FrameEval {
            exprs,
            plan: &schedule.slot_plan,
            input,
            counts,
            slot_by_expr,
        }
    }

    fn expr(&self, id: ValueExprId) -> Result<&'a ValueExpr, RuntimeError> {
        self.exprs.get(id).ok_or(RuntimeError::MissingExpr { expr: id })
    }

    fn count_of(&self, instance: InstanceRef) -> Result<u32, RuntimeError> {
        self.counts
            .get(&instance)
            .copied()
            .ok_or(RuntimeError::UnknownInstance)
    }

    fn instance_count_of_ty(&self, ty: &lux_types::CanonicalType) -> Result<u32, RuntimeError> {
        match ty.extent.cardinality {
            Axis::Inst(Cardinality::Many(Axis::Inst(instance))) => self.count_of(instance),
            _ => Ok(1),
        }
    }

    /// Execute one `EvalValue` step.
    fn eval_step(
        &self,
        state: &mut RuntimeState,
        expr_id: ValueExprId,
        target: SlotId,
        strategy: Strategy,
    ) -> Result<(), RuntimeError> {
        let desc = *self
            .plan
            .get(target)
            .ok_or(RuntimeError::SlotOutOfRange { slot: target })?;
        let expr = self.expr(expr_id)?;

        match strategy {
            Strategy::ContinuousOne => {
                // Sample-and-hold latches: no event this frame leaves the
                // previous value in the slot.
                if let ValueExpr::Kernel {
                    op: KernelOp::Hold,
                    inputs,
                    ..
                } = expr
                {
                    let fired = match inputs.first() {
                        Some(&event) => self.eval_discrete(state, event, 0)?,
                        None => None,
                    };
                    if let Some(comps) = fired {
                        write_comps(state, desc.offset, desc.stride, comps)?;
                    }
                    return Ok(());
                }
                let comps = self.eval_node(state, expr_id, 0)?;
                write_comps(state, desc.offset, desc.stride, comps)?;
            }
            Strategy::ContinuousMany => {
                for lane in 0..desc.lanes {
                    let comps = self.eval_node(state, expr_id, lane)?;
                    write_comps(state, desc.offset + lane * desc.stride, desc.stride, comps)?;
                }
            }
            Strategy::DiscreteOne => {
                if let Some(comps) = self.eval_discrete_node(state, expr_id, 0)? {
                    write_comps(state, desc.offset, desc.stride, comps)?;
                    if let Some(flag) = desc.flag {
                        state.flags[flag.index()] = true;
                    }
                }
            }
            Strategy::DiscreteMany => {
                let mut any = false;
                for lane in 0..desc.lanes {
                    if let Some(comps) = self.eval_discrete_node(state, expr_id, lane)? {
                        any = true;
                        write_comps(
                            state,
                            desc.offset + lane * desc.stride,
                            desc.stride,
                            comps,
                        )?;
                    }
                }
                if any {
                    if let Some(flag) = desc.flag {
                        state.flags[flag.index()] = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// Continuous evaluation, preferring a slotted sub-expression's slot.
    fn eval(
        &self,
        state: &RuntimeState,
        id: ValueExprId,
        lane: u32,
    ) -> Result<Comps, RuntimeError> {
        if let Some(desc) = self.slot_by_expr.get(&id) {
            let lane = if desc.lanes > 1 { lane.min(desc.lanes - 1) } else { 0 };
            return read_comps(state, desc.offset + lane * desc.stride, desc.stride);
        }
        self.eval_node(state, id, lane)
    }

    /// Evaluate the expression itself (never through its own slot).
    fn eval_node(
        &self,
        state: &RuntimeState,
        id: ValueExprId,
        lane: u32,
    ) -> Result<Comps, RuntimeError> {
        let expr = self.expr(id)?;
        match expr {
            ValueExpr::Const { value, .. } => {
                let mut comps = [0.0; 4];
                for (i, comp) in comps.iter_mut().enumerate() {
                    *comp = value.lane(i);
                }
                Ok(comps)
            }

            ValueExpr::External { source, .. } => {
                let value = match source {
                    #[allow(clippy::cast_precision_loss)]
                    ExternalSource::FrameIndex => self.input.frame_index as f64,
                    ExternalSource::Channel(channel) => self
                        .input
                        .channels
                        .get(channel)
                        .copied()
                        .ok_or(RuntimeError::MissingChannel { channel: *channel })?,
                };
                Ok([value, 0.0, 0.0, 0.0])
            }

            ValueExpr::Intrinsic { kind, instance, .. } => {
                let count = self.count_of(*instance)?.max(1);
                let comps = match kind {
                    IntrinsicKind::Position => {
                        // Row layout across NDC x, centered lanes.
                        let x = -1.0 + 2.0 * (f64::from(lane) + 0.5) / f64::from(count);
                        [x, 0.0, 0.0, 0.0]
                    }
                    IntrinsicKind::Index => [f64::from(lane), 0.0, 0.0, 0.0],
                    IntrinsicKind::Count => [f64::from(count), 0.0, 0.0, 0.0],
                };
                Ok(comps)
            }

            ValueExpr::Kernel { op, inputs, ty } => match op {
                KernelOp::Map(f) => {
                    let a = self.eval(state, input_at(inputs, 0, id)?, lane)?;
                    Ok(apply_map(*f, a))
                }
                KernelOp::Zip(f) => {
                    let a = self.eval(state, input_at(inputs, 0, id)?, lane)?;
                    let b = self.eval(state, input_at(inputs, 1, id)?, lane)?;
                    Ok(apply_zip(*f, a, b))
                }
                KernelOp::ZipSignal(f) => {
                    let lhs_id = input_at(inputs, 0, id)?;
                    let rhs_id = input_at(inputs, 1, id)?;
                    let lhs_many = self.is_field(lhs_id)?;
                    let a = self.eval(state, lhs_id, if lhs_many { lane } else { 0 })?;
                    let b = self.eval(state, rhs_id, if lhs_many { 0 } else { lane })?;
                    Ok(apply_zip(*f, a, b))
                }
                KernelOp::Reduce(f) => {
                    let child = input_at(inputs, 0, id)?;
                    let lanes = self.instance_count_of_ty(self.expr(child)?.ty())?;
                    let mut acc: Option<Comps> = None;
                    for i in 0..lanes {
                        let value = self.eval(state, child, i)?;
                        acc = Some(match acc {
                            None => value,
                            Some(prev) => fold_reduce(*f, prev, value),
                        });
                    }
                    let mut out = acc.unwrap_or([0.0; 4]);
                    if *f == ReduceFn::Mean && lanes > 0 {
                        for comp in &mut out {
                            *comp /= f64::from(lanes);
                        }
                    }
                    Ok(out)
                }
                KernelOp::Broadcast => self.eval(state, input_at(inputs, 0, id)?, 0),
                KernelOp::Combine(_) => {
                    let mut comps = [0.0; 4];
                    for (i, comp) in comps.iter_mut().enumerate().take(inputs.len()) {
                        *comp = self.eval(state, input_at(inputs, i, id)?, lane)?[0];
                    }
                    Ok(comps)
                }
                KernelOp::Wrap => {
                    let a = self.eval(state, input_at(inputs, 0, id)?, lane)?;
                    Ok(a.map(|v| v.rem_euclid(1.0)))
                }
                KernelOp::Hold => {
                    // Holds are always slotted; an inline hold has nowhere
                    // to latch.
                    Err(RuntimeError::UnsupportedDiscrete { expr: id })
                }
                KernelOp::PathDerivative => {
                    let child = input_at(inputs, 0, id)?;
                    let lanes = self.instance_count_of_ty(ty)?.max(1);
                    let here = self.eval(state, child, lane)?;
                    let next = self.eval(state, child, (lane + 1) % lanes)?;
                    Ok(apply_zip(ZipFn::Sub, next, here))
                }
            },

            ValueExpr::State { slot, phase, .. } => match phase {
                StatePhase::Read => {
                    let desc = self
                        .plan
                        .get(*slot)
                        .ok_or(RuntimeError::SlotOutOfRange { slot: *slot })?;
                    let lane = if desc.lanes > 1 { lane.min(desc.lanes - 1) } else { 0 };
                    read_comps(state, desc.offset + lane * desc.stride, desc.stride)
                }
                StatePhase::Pulse => Err(RuntimeError::UnsupportedDiscrete { expr: id }),
            },

            ValueExpr::Time { base, .. } => {
                let value = match base {
                    TimeBase::Seconds => self.input.time_seconds,
                    TimeBase::Millis => self.input.time_seconds * 1e3,
                    #[allow(clippy::cast_precision_loss)]
                    TimeBase::Frames => self.input.frame_index as f64,
                };
                Ok([value, 0.0, 0.0, 0.0])
            }
        }
    }

    /// Discrete evaluation through a slotted expression's flag.
    fn eval_discrete(
        &self,
        state: &RuntimeState,
        id: ValueExprId,
        lane: u32,
    ) -> Result<Option<Comps>, RuntimeError> {
        if let Some(desc) = self.slot_by_expr.get(&id) {
            if let Some(flag) = desc.flag {
                if !state.flags[flag.index()] {
                    return Ok(None);
                }
                let lane = if desc.lanes > 1 { lane.min(desc.lanes - 1) } else { 0 };
                return read_comps(state, desc.offset + lane * desc.stride, desc.stride)
                    .map(Some);
            }
        }
        self.eval_discrete_node(state, id, lane)
    }

    /// Discrete evaluation of the expression itself.
    fn eval_discrete_node(
        &self,
        state: &RuntimeState,
        id: ValueExprId,
        lane: u32,
    ) -> Result<Option<Comps>, RuntimeError> {
        let expr = self.expr(id)?;
        match expr {
            ValueExpr::State {
                slot,
                phase: StatePhase::Pulse,
                ..
            } => {
                let desc = self
                    .plan
                    .get(*slot)
                    .ok_or(RuntimeError::SlotOutOfRange { slot: *slot })?;
                let fired = desc
                    .flag
                    .map(|flag| state.flags[flag.index()])
                    .unwrap_or(false);
                if !fired {
                    return Ok(None);
                }
                read_comps(state, desc.offset, desc.stride).map(Some)
            }

            // Events pass through lane-wise kernels: fire iff the source
            // fired.
            ValueExpr::Kernel {
                op: KernelOp::Map(f),
                inputs,
                ..
            } => {
                let fired = self.eval_discrete(state, input_at(inputs, 0, id)?, lane)?;
                Ok(fired.map(|comps| apply_map(*f, comps)))
            }

            _ => Err(RuntimeError::UnsupportedDiscrete { expr: id }),
        }
    }

    fn is_field(&self, id: ValueExprId) -> Result<bool, RuntimeError> {
        let ty = self.expr(id)?.ty();
        Ok(matches!(
            ty.extent.cardinality,
            Axis::Inst(Cardinality::Many(_))
        ))
    }
}

fn input_at(
    inputs: &[ValueExprId],
    index: usize,
    of: ValueExprId,
) -> Result<ValueExprId, RuntimeError> {
    inputs
        .get(index)
        .copied()
        .ok_or(RuntimeError::MissingExpr { expr: of })
}

fn read_comps(state: &RuntimeState, offset: u32, stride: u32) -> Result<Comps, RuntimeError> {
    let mut comps = [0.0; 4];
    for (i, comp) in comps.iter_mut().enumerate().take(stride as usize) {
        *comp = state.read(offset + u32::try_from(i).unwrap_or(0))?;
    }
    Ok(comps)
}

fn write_comps(
    state: &mut RuntimeState,
    offset: u32,
    stride: u32,
    comps: Comps,
) -> Result<(), RuntimeError> {
    for (i, comp) in comps.iter().enumerate().take(stride as usize) {
        state.write(offset + u32::try_from(i).unwrap_or(0), *comp)?;
    }
    Ok(())
}

fn apply_map(f: MapFn, a: Comps) -> Comps {
    let apply = |v: f64| match f {
        MapFn::Sin => v.sin(),
        MapFn::Cos => v.cos(),
        MapFn::Abs => v.abs(),
        MapFn::Neg => -v,
        MapFn::Sqrt => v.sqrt(),
        MapFn::Fract => v.fract(),
        MapFn::Scale(factor) => v * factor.get(),
    };
    a.map(apply)
}

fn apply_zip(f: ZipFn, a: Comps, b: Comps) -> Comps {
    let mut out = [0.0; 4];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = match f {
            ZipFn::Add => a[i] + b[i],
            ZipFn::Sub => a[i] - b[i],
            ZipFn::Mul => a[i] * b[i],
            ZipFn::Div => a[i] / b[i],
            ZipFn::Min => a[i].min(b[i]),
            ZipFn::Max => a[i].max(b[i]),
        };
    }
    out
}

fn fold_reduce(f: ReduceFn, acc: Comps, value: Comps) -> Comps {
    let mut out = [0.0; 4];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = match f {
            ReduceFn::Sum | ReduceFn::Mean => acc[i] + value[i],
            ReduceFn::Min => acc[i].min(value[i]),
            ReduceFn::Max => acc[i].max(value[i]),
        };
    }
    out
}
