//! Value-expression IR for Lux.
//!
//! A single unified expression union ([`ValueExpr`]) carries canonical types
//! and is hash-consed into a value graph: structurally equal expressions get
//! one [`ValueExprId`] no matter how or in what order they are built. Ids are
//! dense indices, never pointers — cycles are impossible by construction
//! because each expression references only previously built ones.
//!
//! The [`ExprBuilder`] is the only way to grow the arena. Every method
//! validates input references, computes the result type from the operator and
//! input types, asserts derived-kind agreement, and interns.

mod arena;
mod build;
mod dce;
mod expr;
mod ids;

pub use arena::ExprArena;
pub use build::{BuildError, ExprBuilder};
pub use dce::{sweep, ExprRemap};
pub use expr::{
    CombineFn, ExternalSource, IntrinsicKind, KernelOp, MapFn, ReduceFn, ScaleFactor, StatePhase,
    TimeBase, ValueExpr, ZipFn,
};
pub use ids::{EventFlagId, SlotId, ValueExprId};
