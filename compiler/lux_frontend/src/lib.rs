//! Frontend pipeline for Lux: normalize → solve → validate.
//!
//! [`compile_frontend`] takes a patch and a block registry and produces a
//! [`TypedPatch`] in which every port carries a canonical type, plus the
//! accumulated diagnostics. `backend_ready` is true only when every type is
//! fully instantiated and the axis validator found nothing — the backend
//! refuses to run otherwise.
//!
//! No stage mutates its input: the normalizer copies the patch, the solver
//! works on its own variable tables, and the typed patch is immutable once
//! built.

mod normalize;
mod solve;
mod typed;
mod validate;

pub use normalize::{
    default_adapter_registry, normalize, register_adapter_blocks, AdapterInstance,
    AdapterRegistry, AdapterSpec, AdapterSpecId, CardinalityPattern, ExtentPattern,
    NormalizedPatch, UnitRelation,
};
pub use solve::{CardShape, SolveError, SolveOutput, VarKey, VarTable};
pub use typed::{PortKey, TypedPatch};

use tracing::debug;

use lux_diagnostic::{Diagnostic, DiagnosticQueue};
use lux_patch::{BlockRegistry, Patch};

/// Everything the frontend hands to callers.
#[derive(Debug)]
pub struct FrontendOutput {
    pub typed: TypedPatch,
    pub diagnostics: Vec<Diagnostic>,
    /// False if any error surfaced anywhere in the frontend.
    pub backend_ready: bool,
}

/// Compile a patch's frontend with the standard adapter set.
pub fn compile_frontend(patch: &Patch, registry: &BlockRegistry) -> FrontendOutput {
    let adapters = default_adapter_registry(patch.names());
    compile_frontend_with(patch, registry, &adapters)
}

/// Compile a patch's frontend with an explicit adapter registry.
pub fn compile_frontend_with(
    patch: &Patch,
    registry: &BlockRegistry,
    adapters: &AdapterRegistry,
) -> FrontendOutput {
    // The registry freezes before compilation; the core's own adapter block
    // types ride along right before the freeze.
    if !registry.is_frozen() {
        register_adapter_blocks(registry);
        registry.freeze();
    }

    let mut queue = DiagnosticQueue::default();

    let norm = normalize::normalize(patch, registry, adapters, &mut queue);
    debug!(
        blocks = norm.blocks.len(),
        adapters = norm.adapters.len(),
        "normalization finished"
    );

    let solved = solve::solve(&norm, patch.names(), registry, &mut queue);

    let mut typed = TypedPatch {
        names: patch.names().clone(),
        blocks: norm.blocks,
        edges: norm.edges,
        order: norm.order,
        port_types: solved.port_types,
        instances: solved.instances,
        adapters: norm.adapters,
        backend_ready: false,
    };

    validate::validate(&typed, registry, &mut queue);

    let backend_ready = !queue.has_errors();
    typed.backend_ready = backend_ready;

    FrontendOutput {
        typed,
        diagnostics: queue.take(),
        backend_ready,
    }
}
