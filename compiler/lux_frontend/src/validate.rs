//! Axis validation of the typed patch.
//!
//! Runs after the solver and is the last gate before the backend: no
//! residual variables, every `many` instance known to the instance table, no
//! forbidden axis combinations, `cameraProjection` only on camera outputs,
//! and event-read outputs locked to `signal float scalar`. Any violation
//! clears `backend_ready`.

use tracing::debug;

use lux_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode, NodeRef};
use lux_patch::{BlockOp, BlockRegistry, PortDir};
use lux_types::{
    Axis, CanonicalType, Cardinality, PayloadType, Temporality, Unit,
};

use crate::typed::TypedPatch;

pub(crate) fn validate(
    typed: &TypedPatch,
    registry: &BlockRegistry,
    queue: &mut DiagnosticQueue,
) {
    let names = &typed.names;
    for (index, block) in typed.blocks.iter().enumerate() {
        let Some(spec) = registry.get(block.type_name) else {
            continue;
        };
        let block_ref = NodeRef::block(u32::try_from(index).unwrap_or(u32::MAX));
        let block_id = lux_patch::BlockId::new(u32::try_from(index).unwrap_or(u32::MAX));

        for (schema, dir) in spec
            .inputs
            .iter()
            .map(|s| (s, PortDir::Input))
            .chain(spec.outputs.iter().map(|s| (s, PortDir::Output)))
        {
            let Some(ty) = typed.port_type(block_id, schema.name, dir) else {
                // The solver could not type this port and has already said
                // why.
                continue;
            };
            let port = names.lookup(schema.name);

            // Residual variables.
            let mask = ty.var_mask();
            if !mask.is_empty() {
                queue.push(
                    Diagnostic::error(ErrorCode::E3001)
                        .with_message(format!(
                            "port `{port}` still carries axis variables: {mask:?}"
                        ))
                        .with_node(block_ref),
                );
            }

            // `many` must name an instance the patch knows.
            if let Some(instance) = ty.extent.cardinality.inst().and_then(Cardinality::instance)
            {
                if !typed.instances.contains(instance) {
                    queue.push(
                        Diagnostic::error(ErrorCode::E3002)
                            .with_message(format!(
                                "port `{port}` references unknown instance {instance}"
                            ))
                            .with_node(block_ref),
                    );
                }
            }

            forbidden_combinations(ty, &port, block_ref, queue);

            // cameraProjection only flows out of camera blocks.
            if ty.payload == PayloadType::CameraProjection
                && !(dir == PortDir::Output && spec.op == BlockOp::Camera)
            {
                queue.push(
                    Diagnostic::error(ErrorCode::E3004)
                        .with_message(format!(
                            "port `{port}` carries `cameraProjection` outside a camera \
                             block output"
                        ))
                        .with_node(block_ref),
                );
            }

            // Event-read outputs are locked to `signal float scalar`.
            if dir == PortDir::Output
                && matches!(spec.op, BlockOp::SampleAndHold | BlockOp::AdapterHold)
                && *ty != CanonicalType::signal(PayloadType::Float, Unit::Scalar)
            {
                queue.push(
                    Diagnostic::error(ErrorCode::E3005)
                        .with_message(format!(
                            "event-read output `{port}` must be `signal float scalar`, \
                             got `{ty}`"
                        ))
                        .with_node(block_ref),
                );
            }
        }
    }
    debug!(errors = queue.error_count(), "axis validation finished");
}

fn forbidden_combinations(
    ty: &CanonicalType,
    port: &str,
    block_ref: NodeRef,
    queue: &mut DiagnosticQueue,
) {
    let temporality = ty.extent.temporality.inst_copied();
    match ty.extent.cardinality {
        // Discrete `many` without a concrete instance has no lane layout.
        Axis::Inst(Cardinality::Many(Axis::Var(_)))
            if temporality == Some(Temporality::Discrete) =>
        {
            queue.push(
                Diagnostic::error(ErrorCode::E3003)
                    .with_message(format!(
                        "port `{port}` is a discrete `many` without an instance"
                    ))
                    .with_node(block_ref),
            );
        }
        // Constants have no frame behavior to be discrete about.
        Axis::Inst(Cardinality::Zero)
            if temporality.is_some() && temporality != Some(Temporality::Continuous) =>
        {
            queue.push(
                Diagnostic::error(ErrorCode::E3003)
                    .with_message(format!(
                        "port `{port}` has `zero` cardinality with non-continuous \
                         temporality"
                    ))
                    .with_node(block_ref),
            );
        }
        _ => {}
    }
}
