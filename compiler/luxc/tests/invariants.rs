//! Universal invariants and round-trip laws over the whole pipeline.

mod common;

use common::{compile_ready, ok, patch, registry};

use lux_ir::{ExprBuilder, TimeBase, ZipFn};
use lux_patch::BlockSettings;
use lux_types::{
    derive_kind, is_type_compatible, try_derive_kind, Axis, CanonicalType, CardinalityVar,
    ConstValue, DomainId, InstanceId, InstanceRef, PayloadType, Unit, ValueKind,
};

fn sample_patch(p: &mut lux_patch::Patch) {
    let time = p.add_block("Time", BlockSettings::None);
    let sin = p.add_block("Sin", BlockSettings::None);
    let write = p.add_block("StateWrite", BlockSettings::Channel(0));
    ok(p.connect(time, "out", sin, "in"));
    ok(p.connect(sin, "out", write, "in"));

    let array = p.add_block("Array", BlockSettings::Count(5));
    let index = p.add_block("Index", BlockSettings::None);
    let mul = p.add_block("Mul", BlockSettings::None);
    let constant = p.add_block("Const", BlockSettings::Value(ConstValue::Float(2.0)));
    let field_write = p.add_block("StateWriteField", BlockSettings::Channel(1));
    ok(p.connect(array, "elements", index, "source"));
    ok(p.connect(index, "out", mul, "a"));
    ok(p.connect(constant, "out", mul, "b"));
    ok(p.connect(mul, "out", field_write, "in"));
}

/// Canonical uniqueness: equal construction sequences share one id and the
/// arena does not grow on replays.
#[test]
fn hash_cons_idempotence() {
    let mut builder = ExprBuilder::new();
    let t1 = ok(builder.time(TimeBase::Seconds));
    let c1 = ok(builder.constant(PayloadType::Float, Unit::Scalar, ConstValue::Float(2.0)));
    let k1 = ok(builder.zip(ZipFn::Mul, t1, c1));
    let len = builder.arena().len();

    let t2 = ok(builder.time(TimeBase::Seconds));
    let c2 = ok(builder.constant(PayloadType::Float, Unit::Scalar, ConstValue::Float(2.0)));
    let k2 = ok(builder.zip(ZipFn::Mul, t2, c2));

    assert_eq!(t1, t2);
    assert_eq!(c1, c2);
    assert_eq!(k1, k2);
    assert_eq!(builder.arena().len(), len);
}

/// Derived-kind round trips through every constructor.
#[test]
fn derived_kind_round_trip() {
    let instance = InstanceRef::new(DomainId::new(0), InstanceId::new(0));
    assert_eq!(
        derive_kind(&CanonicalType::signal(PayloadType::Float, Unit::Scalar)),
        Ok(ValueKind::Signal)
    );
    assert_eq!(
        derive_kind(&CanonicalType::field(PayloadType::Vec2, Unit::Scalar, instance)),
        Ok(ValueKind::Field)
    );
    assert_eq!(
        derive_kind(&CanonicalType::event(PayloadType::Float, Unit::Scalar)),
        Ok(ValueKind::Event)
    );
    assert_eq!(
        derive_kind(&CanonicalType::constant(PayloadType::Float, Unit::Scalar)),
        Ok(ValueKind::Const)
    );
}

/// `derive_kind` on a variable axis fails; `try_derive_kind` is `None`.
#[test]
fn variable_axes_have_no_kind() {
    let mut ty = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
    ty.extent.cardinality = Axis::Var(CardinalityVar::new(0));
    assert!(derive_kind(&ty).is_err());
    assert_eq!(try_derive_kind(&ty), None);
}

/// Frontend totality: with `backend_ready`, every port type is fully
/// instantiated.
#[test]
fn frontend_totality() {
    let registry = registry();
    let mut p = patch(&registry);
    sample_patch(&mut p);
    let outcome = compile_ready(&p, &registry);

    for ty in outcome.frontend.typed.port_types.values() {
        assert!(
            ty.is_fully_instantiated(),
            "residual variables in `{ty}` after backend_ready"
        );
    }
}

/// Derived-kind agreement: every expression the backend built has a total
/// derived kind, and const expressions really have cardinality zero.
#[test]
fn expression_kinds_are_total() {
    let registry = registry();
    let mut p = patch(&registry);
    sample_patch(&mut p);
    let outcome = compile_ready(&p, &registry);
    let backend = match outcome.backend {
        Some(backend) => backend,
        None => panic!("backend did not run"),
    };

    for (_, expr) in backend.exprs.iter() {
        let kind = ok(derive_kind(expr.ty()));
        if matches!(expr, lux_ir::ValueExpr::Const { .. }) {
            assert_eq!(kind, ValueKind::Const);
        }
    }
}

/// Stride is computed, never stored, and exhaustive per payload.
#[test]
fn stride_authority() {
    assert_eq!(PayloadType::Float.stride(), 1);
    assert_eq!(PayloadType::Int.stride(), 1);
    assert_eq!(PayloadType::Bool.stride(), 1);
    assert_eq!(PayloadType::Vec2.stride(), 2);
    assert_eq!(PayloadType::Vec3.stride(), 3);
    assert_eq!(PayloadType::Color.stride(), 4);
    assert_eq!(PayloadType::CameraProjection.stride(), 1);
}

/// Type compatibility is a pure two-argument relation.
#[test]
fn type_compatibility_is_structural() {
    let a = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
    let b = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
    let c = CanonicalType::signal(PayloadType::Int, Unit::Scalar);
    assert!(is_type_compatible(&a, &b));
    assert!(is_type_compatible(&b, &a));
    assert!(!is_type_compatible(&a, &c));
}

/// Adapter insertion stability: normalizing the same patch twice produces
/// identical insertions.
#[test]
fn adapter_insertion_stability() {
    let registry = registry();
    let mut p = patch(&registry);
    // Pulse feeding a continuous input forces a sample-hold adapter.
    let pulse = p.add_block("Pulse", BlockSettings::Channel(0));
    let display = p.add_block("Display", BlockSettings::None);
    ok(p.connect(pulse, "out", display, "in"));

    let first = luxc::compile_frontend(&p, &registry);
    let second = luxc::compile_frontend(&p, &registry);
    assert!(!first.typed.adapters.is_empty());
    assert_eq!(first.typed.adapters, second.typed.adapters);
}

/// Schedules are deterministic: two compilations of one patch agree step
/// for step.
#[test]
fn schedule_determinism() {
    let registry = registry();
    let mut p = patch(&registry);
    sample_patch(&mut p);

    let first = compile_ready(&p, &registry);
    let second = compile_ready(&p, &registry);
    let (Some(a), Some(b)) = (first.backend, second.backend) else {
        panic!("backend did not run");
    };
    assert_eq!(a.schedule.steps, b.schedule.steps);
    assert_eq!(a.exprs.len(), b.exprs.len());
}
