//! Lowering: typed patch → value expressions + step requests.
//!
//! Blocks lower in topological order. Dispatch is over the closed
//! [`BlockOp`] sum — a new block kind is a new match arm, checked for
//! exhaustiveness at compile time. The lowering context is read-only with
//! respect to types: the backend never calls a type mutator, it only reads
//! the types the frontend resolved.

use rustc_hash::FxHashMap;

use lux_ir::{
    ExprBuilder, ExternalSource, IntrinsicKind, MapFn, ScaleFactor, SlotId, ValueExprId,
};
use lux_patch::{
    BlockId, BlockOp, BlockRegistry, BlockSettings, BlockSpec, Name, PortDir,
};
use lux_types::{
    derive_kind, CameraProjection, CanonicalType, ConstValue, InstanceRef, Unit, ValueKind,
};

use crate::slots::{SlotAllocator, StateKey};
use crate::BackendError;

/// A domain step requested by a block's lowering, recorded with pre-DCE
/// expression ids; the scheduler remaps and emits them after sweep.
#[derive(Copy, Clone, Debug)]
pub(crate) enum StepRequest {
    StateWrite {
        target: SlotId,
        source: ValueExprId,
        stride: u32,
    },
    FieldStateWrite {
        target: SlotId,
        source: ValueExprId,
        lanes: u32,
        stride: u32,
    },
    ContinuityMapBuild {
        instance: InstanceRef,
    },
    ContinuityApply {
        instance: InstanceRef,
        target: SlotId,
    },
    Materialize {
        source: ValueExprId,
        instance: InstanceRef,
        lanes: u32,
        stride: u32,
    },
    Render {
        source: ValueExprId,
        instance: InstanceRef,
        lanes: u32,
        stride: u32,
    },
    Observe {
        source: ValueExprId,
    },
}

/// Read-only view a block's lowering works from.
struct LowerCtx {
    block: BlockId,
    settings: BlockSettings,
    /// Resolved input expressions, in schema order.
    inputs: Vec<ValueExprId>,
    /// Resolved input types, in schema order.
    input_types: Vec<CanonicalType>,
    /// Resolved output types, in schema order.
    output_types: Vec<CanonicalType>,
}

impl LowerCtx {
    fn input(&self, index: usize) -> Result<ValueExprId, BackendError> {
        self.inputs.get(index).copied().ok_or_else(|| {
            BackendError::Internal(format!(
                "block #{} lowering read input {index} past its schema",
                self.block.raw()
            ))
        })
    }

    fn input_type(&self, index: usize) -> Result<CanonicalType, BackendError> {
        self.input_types.get(index).copied().ok_or_else(|| {
            BackendError::Internal(format!(
                "block #{} lowering read input type {index} past its schema",
                self.block.raw()
            ))
        })
    }

    fn output_type(&self, index: usize) -> Result<CanonicalType, BackendError> {
        self.output_types.get(index).copied().ok_or_else(|| {
            BackendError::Internal(format!(
                "block #{} lowering read output type {index} past its schema",
                self.block.raw()
            ))
        })
    }
}

pub(crate) struct Lowerer<'a> {
    pub(crate) typed: &'a lux_frontend::TypedPatch,
    pub(crate) registry: &'a BlockRegistry,
    pub(crate) builder: ExprBuilder,
    pub(crate) alloc: SlotAllocator,
    pub(crate) outputs: FxHashMap<(BlockId, Name), ValueExprId>,
    pub(crate) state_slots: FxHashMap<StateKey, SlotId>,
    pub(crate) sinks: Vec<ValueExprId>,
    pub(crate) requests: Vec<StepRequest>,
}

impl<'a> Lowerer<'a> {
    pub(crate) fn new(typed: &'a lux_frontend::TypedPatch, registry: &'a BlockRegistry) -> Self {
        Lowerer {
            typed,
            registry,
            builder: ExprBuilder::new(),
            alloc: SlotAllocator::new(),
            outputs: FxHashMap::default(),
            state_slots: FxHashMap::default(),
            sinks: Vec::new(),
            requests: Vec::new(),
        }
    }

    pub(crate) fn lower_block(&mut self, block_id: BlockId) -> Result<(), BackendError> {
        let block = self
            .typed
            .block(block_id)
            .copied()
            .ok_or_else(|| BackendError::Internal(format!("unknown block #{}", block_id.raw())))?;
        let spec = self
            .registry
            .get(block.type_name)
            .ok_or_else(|| BackendError::Internal(format!("unregistered block #{}", block_id.raw())))?;

        let ctx = self.make_ctx(block_id, &spec, block.settings)?;

        let outputs: Vec<ValueExprId> = match spec.op {
            BlockOp::Time(base) => vec![self.builder.time(base)?],

            BlockOp::Constant => {
                let out_ty = ctx.output_type(0)?;
                let value = match ctx.settings {
                    BlockSettings::Value(value) => value,
                    _ => {
                        return Err(BackendError::Internal(format!(
                            "constant block #{} has no value",
                            block_id.raw()
                        )))
                    }
                };
                vec![self
                    .builder
                    .constant(out_ty.payload, out_ty.unit, value)?]
            }

            BlockOp::External => {
                let out_ty = ctx.output_type(0)?;
                let channel = match ctx.settings {
                    BlockSettings::Channel(channel) => channel,
                    _ => 0,
                };
                vec![self.builder.external(
                    ExternalSource::Channel(channel),
                    out_ty.payload,
                    out_ty.unit,
                )?]
            }

            BlockOp::UnaryMath(op) => {
                let out_ty = ctx.output_type(0)?;
                vec![self.builder.map(op, ctx.input(0)?, out_ty.unit)?]
            }

            BlockOp::BinaryMath(op) => {
                let lhs = ctx.input(0)?;
                let rhs = ctx.input(1)?;
                let lhs_field = derive_kind(&ctx.input_type(0)?)? == ValueKind::Field;
                let rhs_field = derive_kind(&ctx.input_type(1)?)? == ValueKind::Field;
                let out = if lhs_field != rhs_field {
                    self.builder.zip_signal(op, lhs, rhs)?
                } else {
                    self.builder.zip(op, lhs, rhs)?
                };
                vec![out]
            }

            BlockOp::Reduce(op) => vec![self.builder.reduce(op, ctx.input(0)?)?],

            BlockOp::Combine(op) => {
                let inputs: Vec<ValueExprId> = (0..ctx.inputs.len())
                    .map(|i| ctx.input(i))
                    .collect::<Result<_, _>>()?;
                vec![self.builder.combine(op, &inputs)?]
            }

            BlockOp::Wrap => vec![self.builder.wrap(ctx.input(0)?)?],

            BlockOp::PathDerivative => {
                vec![self.builder.path_derivative(ctx.input(0)?)?]
            }

            BlockOp::ArrayDomain => {
                let instance = self.instance_of(block_id)?;
                self.requests
                    .push(StepRequest::ContinuityMapBuild { instance });
                vec![self.builder.intrinsic_index(instance)?]
            }

            BlockOp::Intrinsic(kind) => {
                let instance = ctx.input_type(0)?.require_many_instance()?;
                match kind {
                    IntrinsicKind::Position => {
                        let out_ty = ctx.output_type(0)?;
                        vec![self.builder.intrinsic_position(
                            instance,
                            out_ty.payload,
                            out_ty.unit,
                        )?]
                    }
                    IntrinsicKind::Index => vec![self.builder.intrinsic_index(instance)?],
                    IntrinsicKind::Count => vec![self.builder.intrinsic_count(instance)?],
                }
            }

            BlockOp::Camera => {
                let out_ty = ctx.output_type(0)?;
                let projection = match ctx.settings {
                    BlockSettings::Value(ConstValue::CameraProjection(projection)) => projection,
                    _ => CameraProjection::Orthographic,
                };
                vec![self.builder.constant(
                    out_ty.payload,
                    out_ty.unit,
                    ConstValue::CameraProjection(projection),
                )?]
            }

            BlockOp::StateRead => {
                let out_ty = ctx.output_type(0)?;
                let slot = self.state_slot(ctx.settings, &out_ty)?;
                vec![self.builder.state_read(slot, out_ty)?]
            }

            BlockOp::StateWrite => {
                let source = ctx.input(0)?;
                let in_ty = ctx.input_type(0)?;
                let slot = self.state_slot(ctx.settings, &in_ty)?;
                let stride = in_ty.payload.stride();
                self.sinks.push(source);
                if derive_kind(&in_ty)? == ValueKind::Field {
                    let instance = in_ty.require_many_instance()?;
                    let lanes = self.count_of(instance)?;
                    self.requests
                        .push(StepRequest::ContinuityApply {
                            instance,
                            target: slot,
                        });
                    self.requests.push(StepRequest::FieldStateWrite {
                        target: slot,
                        source,
                        lanes,
                        stride,
                    });
                } else {
                    self.requests.push(StepRequest::StateWrite {
                        target: slot,
                        source,
                        stride,
                    });
                }
                Vec::new()
            }

            BlockOp::Pulse => {
                let out_ty = ctx.output_type(0)?;
                let slot = self.state_slot(ctx.settings, &out_ty)?;
                vec![self
                    .builder
                    .state_pulse(slot, out_ty.payload, out_ty.unit)?]
            }

            BlockOp::SampleAndHold | BlockOp::AdapterHold => {
                vec![self.builder.event_read(ctx.input(0)?)?]
            }

            BlockOp::Render => {
                let source = ctx.input(0)?;
                let in_ty = ctx.input_type(0)?;
                let instance = in_ty.require_many_instance()?;
                let lanes = self.count_of(instance)?;
                let stride = in_ty.payload.stride();
                self.sinks.push(source);
                self.requests.push(StepRequest::Materialize {
                    source,
                    instance,
                    lanes,
                    stride,
                });
                self.requests.push(StepRequest::Render {
                    source,
                    instance,
                    lanes,
                    stride,
                });
                Vec::new()
            }

            BlockOp::Display => {
                let source = ctx.input(0)?;
                self.sinks.push(source);
                self.requests.push(StepRequest::Observe { source });
                Vec::new()
            }

            BlockOp::AdapterUnitConvert => {
                let in_ty = ctx.input_type(0)?;
                let out_ty = ctx.output_type(0)?;
                let factor = Unit::conversion_factor(in_ty.unit, out_ty.unit).ok_or_else(|| {
                    BackendError::Internal(format!(
                        "unit adapter #{} bridges inconvertible units `{}` → `{}`",
                        block_id.raw(),
                        in_ty.unit,
                        out_ty.unit
                    ))
                })?;
                vec![self.builder.map(
                    MapFn::Scale(ScaleFactor::new(factor)),
                    ctx.input(0)?,
                    out_ty.unit,
                )?]
            }

            BlockOp::AdapterBroadcast => {
                let out_ty = ctx.output_type(0)?;
                let instance = out_ty.require_many_instance()?;
                vec![self.builder.broadcast(ctx.input(0)?, instance)?]
            }
        };

        for (schema, expr) in spec.outputs.iter().zip(outputs) {
            self.outputs.insert((block_id, schema.name), expr);
        }
        Ok(())
    }

    /// Assemble the read-only lowering view for one block.
    fn make_ctx(
        &self,
        block_id: BlockId,
        spec: &BlockSpec,
        settings: BlockSettings,
    ) -> Result<LowerCtx, BackendError> {
        let mut inputs = Vec::with_capacity(spec.inputs.len());
        let mut input_types = Vec::with_capacity(spec.inputs.len());
        for schema in &spec.inputs {
            let source = self
                .typed
                .input_source(block_id, schema.name)
                .ok_or(BackendError::MissingInput {
                    block: block_id,
                    port: schema.name,
                })?;
            let expr = self
                .outputs
                .get(&(source.block, source.port))
                .copied()
                .ok_or(BackendError::MissingInput {
                    block: block_id,
                    port: schema.name,
                })?;
            inputs.push(expr);
            input_types.push(self.port_type(block_id, schema.name, PortDir::Input)?);
        }
        let mut output_types = Vec::with_capacity(spec.outputs.len());
        for schema in &spec.outputs {
            output_types.push(self.port_type(block_id, schema.name, PortDir::Output)?);
        }
        Ok(LowerCtx {
            block: block_id,
            settings,
            inputs,
            input_types,
            output_types,
        })
    }

    fn port_type(
        &self,
        block: BlockId,
        port: Name,
        dir: PortDir,
    ) -> Result<CanonicalType, BackendError> {
        self.typed
            .port_type(block, port, dir)
            .copied()
            .ok_or_else(|| {
                BackendError::Internal(format!(
                    "no resolved type for port of block #{}",
                    block.raw()
                ))
            })
    }

    /// The state slot for a read/write pair's channel, allocating on first
    /// use. Field state owns the instance's full lane range; event state
    /// gets an event flag.
    fn state_slot(
        &mut self,
        settings: BlockSettings,
        ty: &CanonicalType,
    ) -> Result<SlotId, BackendError> {
        let channel = match settings {
            BlockSettings::Channel(channel) => channel,
            _ => 0,
        };
        let key = StateKey::new(channel);
        if let Some(&slot) = self.state_slots.get(&key) {
            return Ok(slot);
        }
        let kind = derive_kind(ty)?;
        let lanes = match kind {
            ValueKind::Field => {
                let instance = ty.require_many_instance()?;
                self.count_of(instance)?
            }
            _ => 1,
        };
        let slot = self.alloc.allocate(
            ty.payload.stride(),
            lanes,
            kind == ValueKind::Event,
            Some(key),
            None,
        );
        self.state_slots.insert(key, slot);
        Ok(slot)
    }

    fn instance_of(&self, block_id: BlockId) -> Result<InstanceRef, BackendError> {
        self.typed
            .instances
            .iter()
            .find(|info| info.origin == block_id)
            .map(|info| info.instance)
            .ok_or_else(|| {
                BackendError::Internal(format!(
                    "domain block #{} registered no instance",
                    block_id.raw()
                ))
            })
    }

    fn count_of(&self, instance: InstanceRef) -> Result<u32, BackendError> {
        self.typed.instances.count_of(instance).ok_or_else(|| {
            BackendError::Internal(format!("instance {instance} missing from the table"))
        })
    }
}
