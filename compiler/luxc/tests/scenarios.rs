//! End-to-end pipeline scenarios: patch in, schedule and frames out.

mod common;

use common::{compile_ready, diags_with, ok, patch, registry};

use lux_backend::{Step, Strategy};
use lux_diagnostic::{ErrorCode, NodeKind, Remedy};
use lux_ir::{KernelOp, MapFn, ValueExpr};
use lux_patch::{
    BlockOp, BlockSettings, BlockSpec, BroadcastPolicy, CardinalityMode, LaneCoupling,
    PortSchema,
};
use lux_runtime::{run_frame, FrameInput, RuntimeState};
use lux_types::{
    derive_kind, AngleUnit, Axis, Binding, BindingTarget, Extent, InferenceCanonicalType,
    PayloadType, Unit, ValueKind,
};

/// Time → Sin → StateWrite: a pure signal chain with no adapters.
#[test]
fn signal_only_chain() {
    let registry = registry();
    let mut p = patch(&registry);
    let time = p.add_block("Time", BlockSettings::None);
    let sin = p.add_block("Sin", BlockSettings::None);
    let write = p.add_block("StateWrite", BlockSettings::Channel(0));
    ok(p.connect(time, "out", sin, "in"));
    ok(p.connect(sin, "out", write, "in"));

    let outcome = compile_ready(&p, &registry);
    assert!(outcome.frontend.typed.adapters.is_empty());

    let backend = match outcome.backend {
        Some(backend) => backend,
        None => panic!("backend did not run"),
    };
    // Time and the sin kernel; nothing else survives the sweep.
    assert_eq!(backend.exprs.len(), 2);

    let evals: Vec<&Step> = backend.schedule.eval_steps().collect();
    assert_eq!(evals.len(), 1);
    assert!(matches!(
        evals[0],
        Step::EvalValue {
            strategy: Strategy::ContinuousOne,
            ..
        }
    ));
    let state_writes = backend
        .schedule
        .steps
        .iter()
        .filter(|step| matches!(step, Step::StateWrite { .. }))
        .count();
    assert_eq!(state_writes, 1);

    // The write sinks at frame end: after one frame the state slot holds
    // sin(t).
    let mut state = RuntimeState::from_plan(&backend.schedule.slot_plan);
    ok(run_frame(
        &backend.schedule,
        &backend.exprs,
        &mut state,
        &FrameInput::at(0.25, 0),
    ));
    let slot = match backend.schedule.slot_plan.state_slot(lux_backend::StateKey::new(0)) {
        Some(slot) => slot,
        None => panic!("no state slot for channel 0"),
    };
    let values = ok(state.slot_values(&backend.schedule.slot_plan, slot));
    assert!((values[0] - 0.25f64.sin()).abs() < 1e-12);
}

/// Array(10) → PositionXY → Mul(field, const) → Render: the zip-broadcast
/// relaxation resolves the mix with no explicit Broadcast adapter.
#[test]
fn field_broadcast() {
    let registry = registry();
    let mut p = patch(&registry);
    let array = p.add_block("Array", BlockSettings::Count(10));
    let position = p.add_block("PositionXY", BlockSettings::None);
    let constant = p.add_block(
        "Const",
        BlockSettings::Value(lux_types::ConstValue::Vec2([2.0, 2.0])),
    );
    let mul = p.add_block("Mul", BlockSettings::None);
    let render = p.add_block("Render", BlockSettings::None);
    ok(p.connect(array, "elements", position, "source"));
    ok(p.connect(position, "pos", mul, "a"));
    ok(p.connect(constant, "out", mul, "b"));
    ok(p.connect(mul, "out", render, "pos"));

    let outcome = compile_ready(&p, &registry);
    assert!(outcome.frontend.typed.adapters.is_empty());

    // Mul's output resolved to the array's instance.
    let out_name = registry.names().intern("out");
    let mul_out = match outcome
        .frontend
        .typed
        .port_type(mul, out_name, lux_patch::PortDir::Output)
    {
        Some(ty) => *ty,
        None => panic!("mul output untyped"),
    };
    let instance = ok(mul_out.require_many_instance());
    assert!(outcome.frontend.typed.instances.contains(instance));
    assert_eq!(
        outcome.frontend.typed.instances.count_of(instance),
        Some(10)
    );

    let backend = match outcome.backend {
        Some(backend) => backend,
        None => panic!("backend did not run"),
    };
    let evals: Vec<&Step> = backend.schedule.eval_steps().collect();
    assert_eq!(evals.len(), 1);
    assert!(matches!(
        evals[0],
        Step::EvalValue {
            strategy: Strategy::ContinuousMany,
            ..
        }
    ));
    let ordered_kinds: Vec<u8> = backend
        .schedule
        .steps
        .iter()
        .filter_map(|step| match step {
            Step::EvalValue { .. } => Some(0),
            Step::Materialize { .. } => Some(1),
            Step::Render { .. } => Some(2),
            _ => None,
        })
        .collect();
    assert_eq!(ordered_kinds, vec![0, 1, 2]);

    // One frame: ten doubled row positions.
    let mut state = RuntimeState::from_plan(&backend.schedule.slot_plan);
    let frame = ok(run_frame(
        &backend.schedule,
        &backend.exprs,
        &mut state,
        &FrameInput::at(0.0, 0),
    ));
    assert_eq!(frame.draws.len(), 1);
    let draw = &frame.draws[0];
    assert_eq!(draw.count, 10);
    assert_eq!(draw.stride, 2);
    assert!((draw.data[0] - (-0.9 * 2.0)).abs() < 1e-12);
    assert!((draw.data[1]).abs() < 1e-12);
}

/// Two distinct arrays feeding one Mul: an instance conflict at the Mul
/// block.
#[test]
fn instance_conflict() {
    let registry = registry();
    let mut p = patch(&registry);
    let array_a = p.add_block("Array", BlockSettings::Count(4));
    let array_b = p.add_block("Array", BlockSettings::Count(6));
    let index_a = p.add_block("Index", BlockSettings::None);
    let index_b = p.add_block("Index", BlockSettings::None);
    let mul = p.add_block("Mul", BlockSettings::None);
    let write = p.add_block("StateWriteField", BlockSettings::Channel(0));
    ok(p.connect(array_a, "elements", index_a, "source"));
    ok(p.connect(array_b, "elements", index_b, "source"));
    ok(p.connect(index_a, "out", mul, "a"));
    ok(p.connect(index_b, "out", mul, "b"));
    ok(p.connect(mul, "out", write, "in"));

    let outcome = ok(luxc::compile(&p, &registry));
    assert!(!outcome.frontend.backend_ready);
    assert!(outcome.backend.is_none());

    let conflicts = diags_with(&outcome.frontend.diagnostics, ErrorCode::E2002);
    assert!(!conflicts.is_empty());
    let at_mul = conflicts
        .iter()
        .any(|d| d.node.is_some_and(|n| n.kind == NodeKind::Block && n.index == mul.raw()));
    assert!(at_mul, "conflict should reference the Mul block: {conflicts:#?}");
}

/// Radians output into a degrees input: a conversion adapter with factor
/// 180/π is inserted and the solver succeeds.
#[test]
fn unit_adapter() {
    let registry = registry();
    let names = registry.names().clone();

    // Oscillator: an external signal declared in radians.
    ok(registry.register(BlockSpec {
        type_name: names.intern("Osc"),
        inputs: Vec::new(),
        outputs: vec![PortSchema::new(
            names.intern("out"),
            InferenceCanonicalType::concrete(
                PayloadType::Float,
                Unit::Angle(AngleUnit::Radians),
                Extent::one(),
            ),
        )],
        cardinality_mode: CardinalityMode::SignalOnly,
        lane_coupling: LaneCoupling::LaneLocal,
        broadcast_policy: BroadcastPolicy::DisallowSignalMix,
        instance_domain: None,
        op: BlockOp::External,
    }));
    // Gauge: observes degrees.
    ok(registry.register(BlockSpec {
        type_name: names.intern("Gauge"),
        inputs: vec![PortSchema::new(
            names.intern("in"),
            InferenceCanonicalType::concrete(
                PayloadType::Float,
                Unit::Angle(AngleUnit::Degrees),
                Extent::one(),
            ),
        )],
        outputs: Vec::new(),
        cardinality_mode: CardinalityMode::SignalOnly,
        lane_coupling: LaneCoupling::LaneLocal,
        broadcast_policy: BroadcastPolicy::DisallowSignalMix,
        instance_domain: None,
        op: BlockOp::Display,
    }));

    let mut p = patch(&registry);
    let osc = p.add_block("Osc", BlockSettings::None);
    let gauge = p.add_block("Gauge", BlockSettings::None);
    ok(p.connect(osc, "out", gauge, "in"));

    let outcome = compile_ready(&p, &registry);
    assert_eq!(outcome.frontend.typed.adapters.len(), 1);

    let backend = match outcome.backend {
        Some(backend) => backend,
        None => panic!("backend did not run"),
    };
    let expected = 180.0 / std::f64::consts::PI;
    let has_scale = backend.exprs.iter().any(|(_, expr)| {
        matches!(
            expr,
            ValueExpr::Kernel {
                op: KernelOp::Map(MapFn::Scale(factor)),
                ..
            } if (factor.get() - expected).abs() < 1e-12
        )
    });
    assert!(has_scale, "expected a scale kernel with factor 180/π");

    // π radians in, 180 degrees observed.
    let mut state = RuntimeState::from_plan(&backend.schedule.slot_plan);
    let mut input = FrameInput::at(0.0, 0);
    input.channels.insert(0, std::f64::consts::PI);
    ok(run_frame(
        &backend.schedule,
        &backend.exprs,
        &mut state,
        &input,
    ));
    let observed: Vec<f64> = backend
        .schedule
        .slot_plan
        .iter()
        .filter(|desc| desc.observed)
        .flat_map(|desc| {
            ok(state.slot_values(&backend.schedule.slot_plan, desc.slot)).to_vec()
        })
        .collect();
    assert_eq!(observed.len(), 1);
    assert!((observed[0] - 180.0).abs() < 1e-9);
}

/// A bound output into an unbound input: a structured binding mismatch with
/// a remedy, never an auto-inserted adapter.
#[test]
fn binding_mismatch() {
    let registry = registry();
    let names = registry.names().clone();

    ok(registry.register(BlockSpec {
        type_name: names.intern("BoundSrc"),
        inputs: Vec::new(),
        outputs: vec![PortSchema::new(
            names.intern("out"),
            InferenceCanonicalType::concrete(
                PayloadType::Float,
                Unit::Scalar,
                Extent {
                    binding: Axis::Inst(Binding::Bound(BindingTarget(7))),
                    ..Extent::one()
                },
            ),
        )],
        cardinality_mode: CardinalityMode::SignalOnly,
        lane_coupling: LaneCoupling::LaneLocal,
        broadcast_policy: BroadcastPolicy::DisallowSignalMix,
        instance_domain: None,
        op: BlockOp::External,
    }));

    let mut p = patch(&registry);
    let src = p.add_block("BoundSrc", BlockSettings::None);
    let sink = p.add_block("Display", BlockSettings::None);
    ok(p.connect(src, "out", sink, "in"));

    let outcome = ok(luxc::compile(&p, &registry));
    assert!(!outcome.frontend.backend_ready);
    assert!(outcome.frontend.typed.adapters.is_empty());

    let mismatches = diags_with(&outcome.frontend.diagnostics, ErrorCode::E2005);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].remedy, Some(Remedy::InsertStateOp));
}

/// Pulse → SampleAndHold → Display: discrete then continuous evaluation,
/// with the event auto-clearing on the frame boundary and the hold
/// latching.
#[test]
fn event_to_signal() {
    let registry = registry();
    let mut p = patch(&registry);
    let pulse = p.add_block("Pulse", BlockSettings::Channel(3));
    let hold = p.add_block("SampleAndHold", BlockSettings::None);
    let display = p.add_block("Display", BlockSettings::None);
    ok(p.connect(pulse, "out", hold, "in"));
    ok(p.connect(hold, "out", display, "in"));

    let outcome = compile_ready(&p, &registry);
    let backend = match outcome.backend {
        Some(backend) => backend,
        None => panic!("backend did not run"),
    };

    // Expression kinds along the chain: event, then signal.
    let kinds: Vec<ValueKind> = backend
        .exprs
        .iter()
        .map(|(_, expr)| ok(derive_kind(expr.ty())))
        .collect();
    assert!(kinds.contains(&ValueKind::Event));
    assert!(kinds.contains(&ValueKind::Signal));

    let strategies: Vec<Strategy> = backend
        .schedule
        .steps
        .iter()
        .filter_map(|step| match step {
            Step::EvalValue { strategy, .. } => Some(*strategy),
            _ => None,
        })
        .collect();
    assert_eq!(
        strategies,
        vec![Strategy::DiscreteOne, Strategy::ContinuousOne]
    );

    let mut state = RuntimeState::from_plan(&backend.schedule.slot_plan);

    // Frame 0: inject a pulse; the hold latches its payload.
    let mut input = FrameInput::at(0.0, 0);
    input.events.push((3, 42.0));
    ok(run_frame(&backend.schedule, &backend.exprs, &mut state, &input));
    assert_eq!(observed_scalar(&backend, &state), 42.0);

    // Frame 1: no event — the flag auto-cleared and the hold keeps its
    // value.
    ok(run_frame(
        &backend.schedule,
        &backend.exprs,
        &mut state,
        &FrameInput::at(1.0 / 60.0, 1),
    ));
    assert_eq!(observed_scalar(&backend, &state), 42.0);
}

fn observed_scalar(backend: &luxc::BackendOutput, state: &RuntimeState) -> f64 {
    let desc = backend
        .schedule
        .slot_plan
        .iter()
        .find(|desc| desc.observed);
    match desc {
        Some(desc) => ok(state.slot_values(&backend.schedule.slot_plan, desc.slot))[0],
        None => panic!("no observed slot"),
    }
}
