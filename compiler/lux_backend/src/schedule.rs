//! The schedule: a linear list of steps the runtime walks once per frame.

use lux_ir::{SlotId, ValueExprId};
use lux_types::{
    Axis, CanonicalType, Cardinality, InstanceRef, Temporality, TypeError,
};

use crate::slots::SlotPlan;

/// Pre-resolved dispatch key on every expression-evaluation step.
///
/// Derived once at schedule construction from the expression type's
/// (temporality, cardinality); the runtime never re-inspects types.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Strategy {
    ContinuousOne,
    ContinuousMany,
    DiscreteOne,
    DiscreteMany,
}

/// Derive the strategy for an expression type.
///
/// `zero` cardinality evaluates like `one` — a slotted constant occupies a
/// single lane group. Fails only on variable axes, which the validator has
/// already excluded; hitting that here is a bug, not a user error.
pub fn strategy_for(ty: &CanonicalType) -> Result<Strategy, TypeError> {
    let mask = ty.var_mask();
    if !mask.is_empty() {
        return Err(TypeError::AxisNotInstantiated { mask });
    }
    let discrete = ty.extent.temporality == Axis::Inst(Temporality::Discrete);
    let many = matches!(
        ty.extent.cardinality,
        Axis::Inst(Cardinality::Many(_))
    );
    Ok(match (discrete, many) {
        (false, false) => Strategy::ContinuousOne,
        (false, true) => Strategy::ContinuousMany,
        (true, false) => Strategy::DiscreteOne,
        (true, true) => Strategy::DiscreteMany,
    })
}

/// One step of the per-frame program.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Step {
    /// Evaluate an expression into its slot. The only
    /// expression-evaluation step.
    EvalValue {
        expr: ValueExprId,
        target: SlotId,
        strategy: Strategy,
    },
    /// Copy a multi-lane signal value into its target slot.
    SlotWriteStrided {
        target: SlotId,
        source: SlotId,
        stride: u32,
    },
    /// Stage a field's lanes for rendering.
    Materialize {
        source: SlotId,
        instance: InstanceRef,
        lanes: u32,
        stride: u32,
    },
    /// Emit a draw item from the staged lanes.
    Render {
        source: SlotId,
        instance: InstanceRef,
        lanes: u32,
        stride: u32,
    },
    /// Sink a scalar signal into a state slot at frame end.
    StateWrite { target: SlotId, source: SlotId },
    /// Sink a field into a field-state slot at frame end.
    FieldStateWrite {
        target: SlotId,
        source: SlotId,
        lanes: u32,
        stride: u32,
    },
    /// Build the lane continuity map for an instance.
    ContinuityMapBuild { instance: InstanceRef },
    /// Re-seat field state through the continuity map.
    ContinuityApply {
        instance: InstanceRef,
        target: SlotId,
    },
}

/// The backend's output program: steps in execution order, the slot plan
/// the runtime pre-allocates from, and the lane count of every instance the
/// steps mention.
#[derive(Debug)]
pub struct Schedule {
    pub steps: Vec<Step>,
    pub slot_plan: SlotPlan,
    pub instance_counts: Vec<(InstanceRef, u32)>,
}

impl Schedule {
    pub fn eval_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps
            .iter()
            .filter(|step| matches!(step, Step::EvalValue { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_types::{DomainId, InstanceId, PayloadType, Unit};

    fn inst() -> InstanceRef {
        InstanceRef::new(DomainId::new(0), InstanceId::new(0))
    }

    #[test]
    fn strategy_follows_temporality_and_cardinality() {
        let signal = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
        let field = CanonicalType::field(PayloadType::Float, Unit::Scalar, inst());
        let event = CanonicalType::event(PayloadType::Float, Unit::Scalar);
        let constant = CanonicalType::constant(PayloadType::Float, Unit::Scalar);

        assert_eq!(strategy_for(&signal), Ok(Strategy::ContinuousOne));
        assert_eq!(strategy_for(&field), Ok(Strategy::ContinuousMany));
        assert_eq!(strategy_for(&event), Ok(Strategy::DiscreteOne));
        assert_eq!(strategy_for(&constant), Ok(Strategy::ContinuousOne));
    }

    #[test]
    fn strategy_refuses_variable_axes() {
        let mut ty = CanonicalType::signal(PayloadType::Float, Unit::Scalar);
        ty.extent.cardinality = Axis::Var(lux_types::CardinalityVar::new(0));
        assert!(strategy_for(&ty).is_err());
    }
}
