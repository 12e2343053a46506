//! Canonical type algebra for Lux.
//!
//! One authoritative type. One way to derive kind. One way to compute stride.
//! A [`CanonicalType`] is the product of five orthogonal axes (cardinality,
//! temporality, binding, perspective, branch) plus a payload lane and a
//! structured unit. Types are value semantics: structurally compared, freely
//! copied, never mutated in place.
//!
//! # Two parallel forms
//!
//! `CanonicalType` cannot embed a payload or unit variable — the fields are
//! the concrete enums, so the invariant holds at the type level. The solver
//! works on [`InferenceCanonicalType`], whose payload and unit are
//! [`Axis`]-wrapped and may still be variables. Extent axes can carry
//! variables in both forms until the frontend resolves them; only fully
//! instantiated types may flow past the axis validator.

mod axis;
mod canonical;
mod extent;
mod infer;
mod kind;
mod payload;
mod unit;

pub use axis::{
    Axis, AxisMask, BindingVar, BranchVar, CardinalityVar, InstanceVar, PayloadVar,
    PerspectiveVar, TemporalityVar, UnitVar,
};
pub use canonical::{is_type_compatible, CanonicalType};
pub use extent::{
    Binding, BindingTarget, Branch, Cardinality, DomainId, Extent, InstanceId, InstanceRef,
    Perspective, Temporality,
};
pub use infer::{InferenceCanonicalType, InferencePayload, InferenceUnit};
pub use kind::{derive_kind, try_derive_kind, TypeError, ValueKind};
pub use payload::{const_value_matches_payload, CameraProjection, ConstValue, PayloadType};
pub use unit::{AngleUnit, ColorSpace, SpaceDims, SpaceFrame, TimeUnit, Unit};
