//! Lux compiler driver.
//!
//! Glues the pipeline together: `compile` runs the frontend and, when it
//! signs off, the backend. The standard block catalog and the demo patch
//! live here — the core crates never depend on either.

pub mod catalog;
pub mod demo;
pub mod tracing_setup;

pub use lux_backend::{compile_backend, BackendError, BackendOutput};
pub use lux_diagnostic::{Diagnostic, ErrorCode};
pub use lux_frontend::{compile_frontend, FrontendOutput};
pub use lux_patch::{BlockRegistry, Names, Patch, RegistryError};

/// Frontend output plus, when it was ready, the backend's.
#[derive(Debug)]
pub struct CompileOutcome {
    pub frontend: FrontendOutput,
    /// `None` when the frontend reported errors.
    pub backend: Option<BackendOutput>,
}

/// Compile a patch end to end against a registry.
///
/// Frontend problems are diagnostics inside the outcome; backend errors are
/// bug-class failures and surface as `Err`.
pub fn compile(patch: &Patch, registry: &BlockRegistry) -> Result<CompileOutcome, BackendError> {
    let frontend = compile_frontend(patch, registry);
    let backend = if frontend.backend_ready {
        Some(compile_backend(&frontend.typed, registry)?)
    } else {
        None
    };
    Ok(CompileOutcome { frontend, backend })
}

/// A fresh registry loaded with the standard catalog.
pub fn standard_registry() -> Result<BlockRegistry, RegistryError> {
    let registry = BlockRegistry::new(Names::new());
    catalog::register_standard_blocks(&registry)?;
    Ok(registry)
}
