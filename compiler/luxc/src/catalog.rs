//! The standard block catalog.
//!
//! The compiler core never consults this module — it reads registration
//! metadata through the registry interface and nothing else. The catalog is
//! the in-repo collaborator that supplies the standard blocks; hosts with
//! their own block sets register against the same interface.
//!
//! Schema conventions: variable ids inside a schema are block-local and
//! shared ids link ports (a payload `Var(0)` on an input and an output means
//! "same payload"). Extent constructors default every axis concrete; blocks
//! that relate cardinalities across ports punch those axes back open with
//! local variables.

use lux_ir::{CombineFn, IntrinsicKind, MapFn, ReduceFn, TimeBase, ZipFn};
use lux_patch::{
    BlockOp, BlockRegistry, BlockSpec, BroadcastPolicy, CardinalityMode, LaneCoupling, Names,
    PortSchema, RegistryError,
};
use lux_types::{
    Axis, Cardinality, CardinalityVar, Extent, InferenceCanonicalType, InstanceVar, PayloadType,
    PayloadVar, SpaceDims, SpaceFrame, TimeUnit, Unit, UnitVar,
};

/// Register every standard block. Call once per registry, before freezing.
pub fn register_standard_blocks(registry: &BlockRegistry) -> Result<(), RegistryError> {
    let names = registry.names().clone();
    let b = Builder { names };

    // Sources
    registry.register(b.time())?;
    registry.register(b.external())?;
    registry.register(b.constant())?;
    registry.register(b.pulse())?;
    registry.register(b.camera())?;

    // Math
    registry.register(b.unary("Sin", MapFn::Sin, Some(Unit::Scalar)))?;
    registry.register(b.unary("Cos", MapFn::Cos, Some(Unit::Scalar)))?;
    registry.register(b.unary("Abs", MapFn::Abs, None))?;
    registry.register(b.unary("Neg", MapFn::Neg, None))?;
    registry.register(b.unary("Sqrt", MapFn::Sqrt, None))?;
    registry.register(b.unary("Fract", MapFn::Fract, None))?;
    registry.register(b.binary("Add", ZipFn::Add))?;
    registry.register(b.binary("Sub", ZipFn::Sub))?;
    registry.register(b.binary("Mul", ZipFn::Mul))?;
    registry.register(b.binary("Div", ZipFn::Div))?;
    registry.register(b.binary("Min", ZipFn::Min))?;
    registry.register(b.binary("Max", ZipFn::Max))?;
    registry.register(b.reduce("Sum", ReduceFn::Sum))?;
    registry.register(b.reduce("Mean", ReduceFn::Mean))?;
    registry.register(b.combine2("Vec2", CombineFn::Vec2))?;
    registry.register(b.wrap())?;
    registry.register(b.path_derivative())?;

    // Domains and per-instance context
    registry.register(b.array())?;
    registry.register(b.position_xy())?;
    registry.register(b.index())?;
    registry.register(b.count_of())?;

    // State and events
    registry.register(b.state_read())?;
    registry.register(b.state_write())?;
    registry.register(b.state_write_field())?;
    registry.register(b.sample_and_hold())?;

    // Sinks
    registry.register(b.render())?;
    registry.register(b.display())?;

    Ok(())
}

struct Builder {
    names: Names,
}

impl Builder {
    fn port(&self, name: &str, ty: InferenceCanonicalType) -> PortSchema {
        PortSchema::new(self.names.intern(name), ty)
    }

    fn spec(
        &self,
        type_name: &str,
        inputs: Vec<PortSchema>,
        outputs: Vec<PortSchema>,
        cardinality_mode: CardinalityMode,
        broadcast_policy: BroadcastPolicy,
        op: BlockOp,
    ) -> BlockSpec {
        BlockSpec {
            type_name: self.names.intern(type_name),
            inputs,
            outputs,
            cardinality_mode,
            lane_coupling: LaneCoupling::LaneLocal,
            broadcast_policy,
            instance_domain: None,
            op,
        }
    }

    // === Sources ===

    fn time(&self) -> BlockSpec {
        self.spec(
            "Time",
            Vec::new(),
            vec![self.port(
                "out",
                InferenceCanonicalType::concrete(
                    PayloadType::Float,
                    Unit::Time(TimeUnit::Seconds),
                    Extent::one(),
                ),
            )],
            CardinalityMode::SignalOnly,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::Time(TimeBase::Seconds),
        )
    }

    fn external(&self) -> BlockSpec {
        self.spec(
            "External",
            Vec::new(),
            vec![self.port(
                "out",
                InferenceCanonicalType::concrete(PayloadType::Float, Unit::Scalar, Extent::one()),
            )],
            CardinalityMode::SignalOnly,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::External,
        )
    }

    /// Literal. Payload and unit resolve from whatever the constant feeds;
    /// the cardinality is `zero` by construction.
    fn constant(&self) -> BlockSpec {
        self.spec(
            "Const",
            Vec::new(),
            vec![self.port(
                "out",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    Axis::Var(UnitVar::new(0)),
                    Extent::zero(),
                ),
            )],
            CardinalityMode::Transform,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::Constant,
        )
    }

    fn pulse(&self) -> BlockSpec {
        self.spec(
            "Pulse",
            Vec::new(),
            vec![self.port(
                "out",
                InferenceCanonicalType::concrete(
                    PayloadType::Float,
                    Unit::Scalar,
                    Extent::event(),
                ),
            )],
            CardinalityMode::SignalOnly,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::Pulse,
        )
    }

    fn camera(&self) -> BlockSpec {
        self.spec(
            "Camera",
            Vec::new(),
            vec![self.port(
                "out",
                InferenceCanonicalType::concrete(
                    PayloadType::CameraProjection,
                    Unit::None,
                    Extent::zero(),
                ),
            )],
            CardinalityMode::Transform,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::Camera,
        )
    }

    // === Math ===

    /// Lane-wise unary math over signals and fields alike. `out_unit` is
    /// `Some` for unit-collapsing functions (sin of anything is a scalar)
    /// and `None` for unit-preserving ones.
    fn unary(&self, name: &str, f: MapFn, out_unit: Option<Unit>) -> BlockSpec {
        let in_unit = Axis::Var(UnitVar::new(0));
        let out_unit = match out_unit {
            Some(unit) => Axis::Inst(unit),
            None => in_unit,
        };
        self.spec(
            name,
            vec![self.port(
                "in",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    in_unit,
                    open_cardinality(0),
                ),
            )],
            vec![self.port(
                "out",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    out_unit,
                    open_cardinality(0),
                ),
            )],
            CardinalityMode::Preserve,
            BroadcastPolicy::AllowZipSig,
            BlockOp::UnaryMath(f),
        )
    }

    /// Lane-wise binary math. Same payload and unit on both sides and the
    /// output; cardinalities are independent so a field zips with a signal
    /// under the zip-broadcast relaxation.
    fn binary(&self, name: &str, f: ZipFn) -> BlockSpec {
        let ty = |card: u32| {
            InferenceCanonicalType::new(
                Axis::Var(PayloadVar::new(0)),
                Axis::Var(UnitVar::new(0)),
                open_cardinality(card),
            )
        };
        self.spec(
            name,
            vec![self.port("a", ty(0)), self.port("b", ty(1))],
            vec![self.port("out", ty(2))],
            CardinalityMode::Preserve,
            BroadcastPolicy::AllowZipSig,
            BlockOp::BinaryMath(f),
        )
    }

    fn reduce(&self, name: &str, f: ReduceFn) -> BlockSpec {
        let mut spec = self.spec(
            name,
            vec![self.port(
                "in",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    Axis::Var(UnitVar::new(0)),
                    many_cardinality(0),
                ),
            )],
            vec![self.port(
                "out",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    Axis::Var(UnitVar::new(0)),
                    Extent::one(),
                ),
            )],
            CardinalityMode::Transform,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::Reduce(f),
        );
        spec.lane_coupling = LaneCoupling::LaneCoupled;
        spec
    }

    fn path_derivative(&self) -> BlockSpec {
        let field = InferenceCanonicalType::new(
            Axis::Var(PayloadVar::new(0)),
            Axis::Var(UnitVar::new(0)),
            many_cardinality(0),
        );
        let mut spec = self.spec(
            "PathDerivative",
            vec![self.port("in", field)],
            vec![self.port("out", field)],
            CardinalityMode::FieldOnly,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::PathDerivative,
        );
        spec.lane_coupling = LaneCoupling::LaneCoupled;
        spec
    }

    fn combine2(&self, name: &str, f: CombineFn) -> BlockSpec {
        let scalar_in = |card: u32| {
            InferenceCanonicalType::new(
                Axis::Inst(PayloadType::Float),
                Axis::Inst(Unit::Scalar),
                open_cardinality(card),
            )
        };
        self.spec(
            name,
            vec![self.port("x", scalar_in(0)), self.port("y", scalar_in(1))],
            vec![self.port(
                "out",
                InferenceCanonicalType::new(
                    Axis::Inst(PayloadType::Vec2),
                    Axis::Inst(Unit::Scalar),
                    open_cardinality(2),
                ),
            )],
            CardinalityMode::Preserve,
            BroadcastPolicy::AllowZipSig,
            BlockOp::Combine(f),
        )
    }

    fn wrap(&self) -> BlockSpec {
        self.spec(
            "Wrap",
            vec![self.port(
                "in",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    Axis::Var(UnitVar::new(0)),
                    open_cardinality(0),
                ),
            )],
            vec![self.port(
                "out",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    Axis::Inst(Unit::Norm01),
                    open_cardinality(0),
                ),
            )],
            CardinalityMode::Preserve,
            BroadcastPolicy::AllowZipSig,
            BlockOp::Wrap,
        )
    }

    // === Domains and per-instance context ===

    fn array(&self) -> BlockSpec {
        let mut spec = self.spec(
            "Array",
            Vec::new(),
            vec![self.port(
                "elements",
                InferenceCanonicalType::new(
                    Axis::Inst(PayloadType::Float),
                    Axis::Inst(Unit::Count),
                    many_cardinality(0),
                ),
            )],
            CardinalityMode::Transform,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::ArrayDomain,
        );
        spec.instance_domain = Some(self.names.intern("array"));
        spec
    }

    fn position_xy(&self) -> BlockSpec {
        self.spec(
            "PositionXY",
            vec![self.port(
                "source",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    Axis::Var(UnitVar::new(0)),
                    many_cardinality(0),
                ),
            )],
            vec![self.port(
                "pos",
                InferenceCanonicalType::new(
                    Axis::Inst(PayloadType::Vec2),
                    Axis::Inst(Unit::Space {
                        frame: SpaceFrame::Ndc,
                        dims: SpaceDims::Two,
                    }),
                    many_cardinality(0),
                ),
            )],
            CardinalityMode::FieldOnly,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::Intrinsic(IntrinsicKind::Position),
        )
    }

    fn index(&self) -> BlockSpec {
        self.spec(
            "Index",
            vec![self.port(
                "source",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    Axis::Var(UnitVar::new(0)),
                    many_cardinality(0),
                ),
            )],
            vec![self.port(
                "out",
                InferenceCanonicalType::new(
                    Axis::Inst(PayloadType::Float),
                    Axis::Inst(Unit::Count),
                    many_cardinality(0),
                ),
            )],
            CardinalityMode::FieldOnly,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::Intrinsic(IntrinsicKind::Index),
        )
    }

    fn count_of(&self) -> BlockSpec {
        self.spec(
            "Count",
            vec![self.port(
                "source",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    Axis::Var(UnitVar::new(0)),
                    many_cardinality(0),
                ),
            )],
            vec![self.port(
                "out",
                InferenceCanonicalType::concrete(PayloadType::Float, Unit::Count, Extent::one()),
            )],
            CardinalityMode::Transform,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::Intrinsic(IntrinsicKind::Count),
        )
    }

    // === State and events ===

    fn state_read(&self) -> BlockSpec {
        self.spec(
            "StateRead",
            Vec::new(),
            vec![self.port(
                "out",
                InferenceCanonicalType::concrete(PayloadType::Float, Unit::Scalar, Extent::one()),
            )],
            CardinalityMode::SignalOnly,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::StateRead,
        )
    }

    fn state_write(&self) -> BlockSpec {
        self.spec(
            "StateWrite",
            vec![self.port(
                "in",
                InferenceCanonicalType::new(
                    Axis::Inst(PayloadType::Float),
                    Axis::Var(UnitVar::new(0)),
                    Extent::one(),
                ),
            )],
            Vec::new(),
            CardinalityMode::SignalOnly,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::StateWrite,
        )
    }

    fn state_write_field(&self) -> BlockSpec {
        self.spec(
            "StateWriteField",
            vec![self.port(
                "in",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    Axis::Var(UnitVar::new(0)),
                    many_cardinality(0),
                ),
            )],
            Vec::new(),
            CardinalityMode::FieldOnly,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::StateWrite,
        )
    }

    fn sample_and_hold(&self) -> BlockSpec {
        self.spec(
            "SampleAndHold",
            vec![self.port(
                "in",
                InferenceCanonicalType::new(
                    Axis::Inst(PayloadType::Float),
                    Axis::Var(UnitVar::new(0)),
                    Extent::event(),
                ),
            )],
            vec![self.port(
                "out",
                InferenceCanonicalType::concrete(PayloadType::Float, Unit::Scalar, Extent::one()),
            )],
            CardinalityMode::Preserve,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::SampleAndHold,
        )
    }

    // === Sinks ===

    fn render(&self) -> BlockSpec {
        self.spec(
            "Render",
            vec![self.port(
                "pos",
                InferenceCanonicalType::new(
                    Axis::Inst(PayloadType::Vec2),
                    Axis::Var(UnitVar::new(0)),
                    many_cardinality(0),
                ),
            )],
            Vec::new(),
            CardinalityMode::FieldOnly,
            BroadcastPolicy::DisallowSignalMix,
            BlockOp::Render,
        )
    }

    fn display(&self) -> BlockSpec {
        self.spec(
            "Display",
            vec![self.port(
                "in",
                InferenceCanonicalType::new(
                    Axis::Var(PayloadVar::new(0)),
                    Axis::Var(UnitVar::new(0)),
                    open_cardinality(0),
                ),
            )],
            Vec::new(),
            CardinalityMode::Preserve,
            BroadcastPolicy::AllowZipSig,
            BlockOp::Display,
        )
    }
}

/// Continuous, unbound extent with a block-local cardinality variable.
fn open_cardinality(local: u32) -> Extent {
    Extent {
        cardinality: Axis::Var(CardinalityVar::new(local)),
        ..Extent::one()
    }
}

/// Continuous, unbound extent pinned to `many` with a block-local instance
/// variable.
fn many_cardinality(local: u32) -> Extent {
    Extent {
        cardinality: Axis::Inst(Cardinality::many_var(InstanceVar::new(local))),
        ..Extent::one()
    }
}
