//! Shared helpers for the integration suites.

// Each integration binary compiles this module independently and uses a
// different subset of it.
#![allow(dead_code)]

use lux_diagnostic::{Diagnostic, ErrorCode};
use lux_patch::{BlockRegistry, Patch};
use luxc::CompileOutcome;

/// Unwrap a result with a readable panic; keeps `unwrap` out of the tests.
pub fn ok<T, E: std::fmt::Display>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => panic!("unexpected error: {error}"),
    }
}

/// A fresh registry with the standard catalog loaded.
pub fn registry() -> BlockRegistry {
    ok(luxc::standard_registry())
}

/// An empty patch sharing the registry's names.
pub fn patch(registry: &BlockRegistry) -> Patch {
    Patch::new(registry.names().clone())
}

/// Compile and require the backend to have run.
pub fn compile_ready(patch: &Patch, registry: &BlockRegistry) -> CompileOutcome {
    let outcome = ok(luxc::compile(patch, registry));
    assert!(
        outcome.frontend.backend_ready,
        "expected backend-ready, got diagnostics: {:#?}",
        outcome.frontend.diagnostics
    );
    assert!(outcome.backend.is_some());
    outcome
}

/// Diagnostics with the given code.
pub fn diags_with<'a>(
    diagnostics: &'a [Diagnostic],
    code: ErrorCode,
) -> Vec<&'a Diagnostic> {
    diagnostics.iter().filter(|d| d.code == code).collect()
}
