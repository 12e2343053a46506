//! The expression builder.
//!
//! A single builder instance owns the arena and the hash-cons map. Every
//! method:
//!
//! 1. validates input references against the arena,
//! 2. computes the result type from the operator and input types — a caller
//!    may only supply what cannot be derived (a unit the operator changes, a
//!    state slot's declared type),
//! 3. asserts agreement between the variant's semantic role and
//!    `derive_kind` of the computed type,
//! 4. interns.
//!
//! These are programmer-error checks: they fail fast instead of accumulating.

use smallvec::SmallVec;
use thiserror::Error;

use lux_types::{
    const_value_matches_payload, derive_kind, Axis, CanonicalType, Cardinality, ConstValue,
    Extent, InstanceRef, PayloadType, Temporality, TypeError, Unit, ValueKind,
};

use crate::arena::ExprArena;
use crate::expr::{
    CombineFn, ExternalSource, IntrinsicKind, KernelOp, MapFn, ReduceFn, StatePhase, TimeBase,
    ValueExpr, ZipFn,
};
use crate::ids::{SlotId, ValueExprId};

/// Eager builder failures. These indicate misuse of the builder, not author
/// errors in the patch.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum BuildError {
    /// Const value kind does not match the declared payload.
    #[error("const value {value:?} does not inhabit payload `{payload}`")]
    ConstPayloadMismatch {
        payload: PayloadType,
        value: ConstValue,
    },

    /// Variant's expected kind disagrees with the derived kind of its type,
    /// or input types cannot produce a result type for the operator.
    #[error("kind agreement violated in {role}: {detail}")]
    KindAgreement { role: &'static str, detail: String },

    /// An input id is not in the arena.
    #[error("input {input:?} is not in the arena (len {len})")]
    ReferentialIntegrity { input: ValueExprId, len: usize },

    /// A type operation failed (variable axis where an instantiated one is
    /// required).
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Builds and interns value expressions.
#[derive(Default, Debug)]
pub struct ExprBuilder {
    arena: ExprArena,
}

impl ExprBuilder {
    pub fn new() -> Self {
        ExprBuilder::default()
    }

    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    /// Finish building and take the arena.
    pub fn into_arena(self) -> ExprArena {
        self.arena
    }

    /// The type of an already-built expression.
    pub fn ty(&self, id: ValueExprId) -> Result<&CanonicalType, BuildError> {
        self.check_ref(id).map(ValueExpr::ty)
    }

    // === Leaves ===

    /// A literal constant. The type gets cardinality `zero`.
    pub fn constant(
        &mut self,
        payload: PayloadType,
        unit: Unit,
        value: ConstValue,
    ) -> Result<ValueExprId, BuildError> {
        if !const_value_matches_payload(payload, &value) {
            return Err(BuildError::ConstPayloadMismatch { payload, value });
        }
        let ty = CanonicalType::constant(payload, unit);
        self.intern_checked("const", ValueKind::Const, ValueExpr::Const { value, ty })
    }

    /// Frame index or an externally supplied signal channel.
    pub fn external(
        &mut self,
        source: ExternalSource,
        payload: PayloadType,
        unit: Unit,
    ) -> Result<ValueExprId, BuildError> {
        let ty = CanonicalType::signal(payload, unit);
        self.intern_checked(
            "external",
            ValueKind::Signal,
            ValueExpr::External { source, ty },
        )
    }

    /// Per-instance layout position.
    pub fn intrinsic_position(
        &mut self,
        instance: InstanceRef,
        payload: PayloadType,
        unit: Unit,
    ) -> Result<ValueExprId, BuildError> {
        let ty = CanonicalType::field(payload, unit, instance);
        self.intern_checked(
            "intrinsic.position",
            ValueKind::Field,
            ValueExpr::Intrinsic {
                kind: IntrinsicKind::Position,
                instance,
                ty,
            },
        )
    }

    /// Per-instance lane index. Output is locked to `field float count`.
    pub fn intrinsic_index(&mut self, instance: InstanceRef) -> Result<ValueExprId, BuildError> {
        let ty = CanonicalType::field(PayloadType::Float, Unit::Count, instance);
        self.intern_checked(
            "intrinsic.index",
            ValueKind::Field,
            ValueExpr::Intrinsic {
                kind: IntrinsicKind::Index,
                instance,
                ty,
            },
        )
    }

    /// Instance count of a domain. Output is locked to `signal float count`.
    pub fn intrinsic_count(&mut self, instance: InstanceRef) -> Result<ValueExprId, BuildError> {
        let ty = CanonicalType::signal(PayloadType::Float, Unit::Count);
        self.intern_checked(
            "intrinsic.count",
            ValueKind::Signal,
            ValueExpr::Intrinsic {
                kind: IntrinsicKind::Count,
                instance,
                ty,
            },
        )
    }

    /// Clock reading. The type is locked per base.
    pub fn time(&mut self, base: TimeBase) -> Result<ValueExprId, BuildError> {
        let ty = match base {
            TimeBase::Seconds => {
                CanonicalType::signal(PayloadType::Float, Unit::Time(lux_types::TimeUnit::Seconds))
            }
            TimeBase::Millis => {
                CanonicalType::signal(PayloadType::Float, Unit::Time(lux_types::TimeUnit::Ms))
            }
            TimeBase::Frames => CanonicalType::signal(PayloadType::Float, Unit::Count),
        };
        self.intern_checked("time", ValueKind::Signal, ValueExpr::Time { base, ty })
    }

    /// Continuous read of a state slot. The slot's declared type is not
    /// derivable from inputs, so the caller supplies it; it must be signal-
    /// or field-kinded.
    pub fn state_read(
        &mut self,
        slot: SlotId,
        ty: CanonicalType,
    ) -> Result<ValueExprId, BuildError> {
        let kind = derive_kind(&ty)?;
        if kind != ValueKind::Signal && kind != ValueKind::Field {
            return Err(BuildError::KindAgreement {
                role: "state.read",
                detail: format!("state reads are continuous; got `{kind}`"),
            });
        }
        self.intern_checked(
            "state.read",
            kind,
            ValueExpr::State {
                slot,
                phase: StatePhase::Read,
                ty,
            },
        )
    }

    /// Discrete read of an event slot: fires on frames where the slot's
    /// event flag is set.
    pub fn state_pulse(
        &mut self,
        slot: SlotId,
        payload: PayloadType,
        unit: Unit,
    ) -> Result<ValueExprId, BuildError> {
        let ty = CanonicalType::event(payload, unit);
        self.intern_checked(
            "state.pulse",
            ValueKind::Event,
            ValueExpr::State {
                slot,
                phase: StatePhase::Pulse,
                ty,
            },
        )
    }

    // === Kernels ===

    /// Lane-wise unary function. Extent and payload are the input's; the
    /// result unit is operator-dependent and supplied by the caller.
    pub fn map(
        &mut self,
        op: MapFn,
        input: ValueExprId,
        result_unit: Unit,
    ) -> Result<ValueExprId, BuildError> {
        let in_ty = *self.ty(input)?;
        let ty = CanonicalType::new(in_ty.payload, result_unit, in_ty.extent);
        let kind = derive_kind(&ty)?;
        self.kernel(KernelOp::Map(op), &[input], ty, "kernel.map", kind)
    }

    /// Lane-wise binary function over equal-cardinality continuous inputs.
    /// `zero`-cardinality (const) inputs join with anything; a `many`/`one`
    /// mix is rejected here — that is what [`Self::zip_signal`] and
    /// [`Self::broadcast`] are for.
    pub fn zip(
        &mut self,
        op: ZipFn,
        lhs: ValueExprId,
        rhs: ValueExprId,
    ) -> Result<ValueExprId, BuildError> {
        let lhs_ty = *self.ty(lhs)?;
        let rhs_ty = *self.ty(rhs)?;
        let payload = join_payloads("kernel.zip", lhs_ty.payload, rhs_ty.payload)?;
        let unit = join_units("kernel.zip", lhs_ty.unit, rhs_ty.unit)?;
        require_continuous("kernel.zip", &lhs_ty)?;
        require_continuous("kernel.zip", &rhs_ty)?;

        let lhs_card = instantiated_cardinality("kernel.zip", &lhs_ty)?;
        let rhs_card = instantiated_cardinality("kernel.zip", &rhs_ty)?;
        let cardinality = match (lhs_card, rhs_card) {
            (Cardinality::Zero, other) | (other, Cardinality::Zero) => other,
            (Cardinality::One, Cardinality::One) => Cardinality::One,
            (Cardinality::Many(a), Cardinality::Many(b)) if a == b => Cardinality::Many(a),
            (a, b) => {
                return Err(BuildError::KindAgreement {
                    role: "kernel.zip",
                    detail: format!("cannot zip cardinalities `{a}` and `{b}`"),
                })
            }
        };

        let ty = CanonicalType::new(
            payload,
            unit,
            Extent::resolved(cardinality, Temporality::Continuous),
        );
        let kind = derive_kind(&ty)?;
        self.kernel(KernelOp::Zip(op), &[lhs, rhs], ty, "kernel.zip", kind)
    }

    /// Binary function zipping a field with a broadcast signal (or const).
    ///
    /// Operand order is preserved — exactly one side must be `many`, the
    /// other `one` or `zero`.
    pub fn zip_signal(
        &mut self,
        op: ZipFn,
        lhs: ValueExprId,
        rhs: ValueExprId,
    ) -> Result<ValueExprId, BuildError> {
        let lhs_ty = *self.ty(lhs)?;
        let rhs_ty = *self.ty(rhs)?;
        let payload = join_payloads("kernel.zipSignal", lhs_ty.payload, rhs_ty.payload)?;
        let unit = join_units("kernel.zipSignal", lhs_ty.unit, rhs_ty.unit)?;
        require_continuous("kernel.zipSignal", &lhs_ty)?;
        require_continuous("kernel.zipSignal", &rhs_ty)?;

        let lhs_card = instantiated_cardinality("kernel.zipSignal", &lhs_ty)?;
        let rhs_card = instantiated_cardinality("kernel.zipSignal", &rhs_ty)?;
        let instance = match (lhs_card, rhs_card) {
            (Cardinality::Many(_), Cardinality::One | Cardinality::Zero) => {
                lhs_ty.require_many_instance()?
            }
            (Cardinality::One | Cardinality::Zero, Cardinality::Many(_)) => {
                rhs_ty.require_many_instance()?
            }
            (a, b) => {
                return Err(BuildError::KindAgreement {
                    role: "kernel.zipSignal",
                    detail: format!(
                        "exactly one side must be `many`; got `{a}` and `{b}`"
                    ),
                })
            }
        };

        let ty = CanonicalType::field(payload, unit, instance);
        self.kernel(
            KernelOp::ZipSignal(op),
            &[lhs, rhs],
            ty,
            "kernel.zipSignal",
            ValueKind::Field,
        )
    }

    /// Collapse a field into a signal.
    pub fn reduce(
        &mut self,
        op: ReduceFn,
        field: ValueExprId,
    ) -> Result<ValueExprId, BuildError> {
        let field_ty = *self.ty(field)?;
        field_ty.require_many_instance()?;
        require_continuous("kernel.reduce", &field_ty)?;
        let ty = CanonicalType::signal(field_ty.payload, field_ty.unit);
        self.kernel(
            KernelOp::Reduce(op),
            &[field],
            ty,
            "kernel.reduce",
            ValueKind::Signal,
        )
    }

    /// Replicate a signal across an instance's lanes.
    pub fn broadcast(
        &mut self,
        input: ValueExprId,
        instance: InstanceRef,
    ) -> Result<ValueExprId, BuildError> {
        let in_ty = *self.ty(input)?;
        require_continuous("kernel.broadcast", &in_ty)?;
        match instantiated_cardinality("kernel.broadcast", &in_ty)? {
            Cardinality::One | Cardinality::Zero => {}
            other => {
                return Err(BuildError::KindAgreement {
                    role: "kernel.broadcast",
                    detail: format!("broadcast input must be `one` or `zero`, got `{other}`"),
                })
            }
        }
        let ty = CanonicalType::field(in_ty.payload, in_ty.unit, instance);
        self.kernel(
            KernelOp::Broadcast,
            &[input],
            ty,
            "kernel.broadcast",
            ValueKind::Field,
        )
    }

    /// Assemble float scalars into a vector payload.
    pub fn combine(
        &mut self,
        op: CombineFn,
        inputs: &[ValueExprId],
    ) -> Result<ValueExprId, BuildError> {
        let (payload, arity) = match op {
            CombineFn::Vec2 => (PayloadType::Vec2, 2),
            CombineFn::Vec3 => (PayloadType::Vec3, 3),
            CombineFn::Color => (PayloadType::Color, 4),
        };
        if inputs.len() != arity {
            return Err(BuildError::KindAgreement {
                role: "kernel.combine",
                detail: format!("expected {arity} inputs, got {}", inputs.len()),
            });
        }
        let mut cardinality = Cardinality::Zero;
        for &input in inputs {
            let in_ty = *self.ty(input)?;
            require_continuous("kernel.combine", &in_ty)?;
            if in_ty.payload != PayloadType::Float {
                return Err(BuildError::KindAgreement {
                    role: "kernel.combine",
                    detail: format!("combine inputs must be float, got `{}`", in_ty.payload),
                });
            }
            let card = instantiated_cardinality("kernel.combine", &in_ty)?;
            cardinality = match (cardinality, card) {
                (Cardinality::Zero, other) | (other, Cardinality::Zero) => other,
                (Cardinality::One, Cardinality::One) => Cardinality::One,
                (Cardinality::Many(a), Cardinality::Many(b)) if a == b => Cardinality::Many(a),
                (a, b) => {
                    return Err(BuildError::KindAgreement {
                        role: "kernel.combine",
                        detail: format!("cannot combine cardinalities `{a}` and `{b}`"),
                    })
                }
            };
        }
        let unit = match op {
            CombineFn::Color => Unit::Color(lux_types::ColorSpace::Rgba01),
            _ => Unit::Scalar,
        };
        let ty = CanonicalType::new(
            payload,
            unit,
            Extent::resolved(cardinality, Temporality::Continuous),
        );
        let kind = derive_kind(&ty)?;
        self.kernel(KernelOp::Combine(op), inputs, ty, "kernel.combine", kind)
    }

    /// Wrap into `[0, 1)`. Payload and extent are the input's; the unit
    /// becomes `norm01`.
    pub fn wrap(&mut self, input: ValueExprId) -> Result<ValueExprId, BuildError> {
        let in_ty = *self.ty(input)?;
        require_continuous("kernel.wrap", &in_ty)?;
        let ty = CanonicalType::new(in_ty.payload, Unit::Norm01, in_ty.extent);
        let kind = derive_kind(&ty)?;
        self.kernel(KernelOp::Wrap, &[input], ty, "kernel.wrap", kind)
    }

    /// Sample-and-hold read of an event.
    ///
    /// The output type is unconditionally `signal float scalar`, locked here
    /// regardless of any caller hint.
    pub fn event_read(&mut self, event: ValueExprId) -> Result<ValueExprId, BuildError> {
        let in_ty = *self.ty(event)?;
        if derive_kind(&in_ty)? != ValueKind::Event {
            return Err(BuildError::KindAgreement {
                role: "kernel.eventRead",
                detail: format!("input must be an event, got `{in_ty}`"),
            });
        }
        let ty = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
        self.kernel(
            KernelOp::Hold,
            &[event],
            ty,
            "kernel.eventRead",
            ValueKind::Signal,
        )
    }

    /// Lane-coupled finite difference along a field.
    pub fn path_derivative(&mut self, field: ValueExprId) -> Result<ValueExprId, BuildError> {
        let in_ty = *self.ty(field)?;
        in_ty.require_many_instance()?;
        require_continuous("kernel.pathDerivative", &in_ty)?;
        self.kernel(
            KernelOp::PathDerivative,
            &[field],
            in_ty,
            "kernel.pathDerivative",
            ValueKind::Field,
        )
    }

    // === Internals ===

    fn check_ref(&self, id: ValueExprId) -> Result<&ValueExpr, BuildError> {
        self.arena.get(id).ok_or(BuildError::ReferentialIntegrity {
            input: id,
            len: self.arena.len(),
        })
    }

    fn kernel(
        &mut self,
        op: KernelOp,
        inputs: &[ValueExprId],
        ty: CanonicalType,
        role: &'static str,
        expected: ValueKind,
    ) -> Result<ValueExprId, BuildError> {
        for &input in inputs {
            self.check_ref(input)?;
        }
        self.intern_checked(
            role,
            expected,
            ValueExpr::Kernel {
                op,
                inputs: SmallVec::from_slice(inputs),
                ty,
            },
        )
    }

    fn intern_checked(
        &mut self,
        role: &'static str,
        expected: ValueKind,
        expr: ValueExpr,
    ) -> Result<ValueExprId, BuildError> {
        let actual = derive_kind(expr.ty())?;
        if actual != expected {
            return Err(BuildError::KindAgreement {
                role,
                detail: format!("expected `{expected}`, derived `{actual}`"),
            });
        }
        Ok(self.arena.intern(expr))
    }
}

fn require_continuous(role: &'static str, ty: &CanonicalType) -> Result<(), BuildError> {
    match ty.extent.temporality {
        Axis::Inst(Temporality::Continuous) => Ok(()),
        _ => Err(BuildError::KindAgreement {
            role,
            detail: format!("input must be continuous, got `{ty}`"),
        }),
    }
}

fn instantiated_cardinality(
    role: &'static str,
    ty: &CanonicalType,
) -> Result<Cardinality, BuildError> {
    match ty.extent.cardinality {
        Axis::Inst(card) => Ok(card),
        Axis::Var(_) => Err(BuildError::KindAgreement {
            role,
            detail: format!("cardinality not instantiated in `{ty}`"),
        }),
    }
}

fn join_payloads(
    role: &'static str,
    a: PayloadType,
    b: PayloadType,
) -> Result<PayloadType, BuildError> {
    if a == b {
        Ok(a)
    } else {
        Err(BuildError::KindAgreement {
            role,
            detail: format!("payload mismatch: `{a}` vs `{b}`"),
        })
    }
}

/// Join units of a binary kernel: equal units pass through, `scalar`/`none`
/// are neutral, anything else is a misuse (adapters convert units before
/// expressions meet).
fn join_units(role: &'static str, a: Unit, b: Unit) -> Result<Unit, BuildError> {
    match (a, b) {
        _ if a == b => Ok(a),
        (Unit::Scalar | Unit::None, other) => Ok(other),
        (other, Unit::Scalar | Unit::None) => Ok(other),
        _ => Err(BuildError::KindAgreement {
            role,
            detail: format!("unit mismatch: `{a}` vs `{b}`"),
        }),
    }
}


#[cfg(test)]
mod prop_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        /// Interning the same constant never grows the arena, whatever the
        /// bit pattern.
        #[test]
        fn const_interning_is_idempotent(value in proptest::num::f64::ANY) {
            let mut b = ExprBuilder::new();
            let first = b.constant(PayloadType::Float, Unit::Scalar, ConstValue::Float(value));
            let second = b.constant(PayloadType::Float, Unit::Scalar, ConstValue::Float(value));
            prop_assert_eq!(first.ok(), second.ok());
            prop_assert_eq!(b.arena().len(), 1);
        }

        /// Structurally distinct constants always get distinct ids.
        #[test]
        fn distinct_constants_do_not_collide(a in proptest::num::f64::ANY, c in proptest::num::f64::ANY) {
            prop_assume!(a.to_bits() != c.to_bits());
            let mut b = ExprBuilder::new();
            let first = b.constant(PayloadType::Float, Unit::Scalar, ConstValue::Float(a));
            let second = b.constant(PayloadType::Float, Unit::Scalar, ConstValue::Float(c));
            prop_assert_ne!(first.ok(), second.ok());
            prop_assert_eq!(b.arena().len(), 2);
        }
    }
}
