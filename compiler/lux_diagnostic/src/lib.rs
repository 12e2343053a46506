//! Diagnostics for the Lux compiler.
//!
//! Every failure in the compilation pipeline is *surfaced* rather than
//! thrown-through: accumulating passes (normalizer, solver, validator) push
//! structured [`Diagnostic`] records into a [`DiagnosticQueue`] so authors see
//! multiple problems per run. Diagnostics locate errors by patch-graph node
//! ([`NodeRef`]), not by source span — a patch is a graph, not text.

mod diagnostic;
mod error_code;
mod queue;

pub use diagnostic::{Diagnostic, NodeKind, NodeRef, Remedy, Severity};
pub use error_code::{ErrorCode, Phase};
pub use queue::{DiagnosticConfig, DiagnosticQueue};
