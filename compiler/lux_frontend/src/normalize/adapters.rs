//! Adapter specs and the adapter registry.
//!
//! An adapter bridges two otherwise incompatible port types on an edge. Specs
//! are matched by per-axis extent patterns plus a unit relation — never by
//! block-name string comparison — and insertion is deterministic: given equal
//! candidates, the earliest-registered spec wins.

use lux_patch::{
    BlockId, BlockOp, BlockRegistry, BlockSpec, BroadcastPolicy, CardinalityMode, EdgeId,
    LaneCoupling, Name, Names, PortSchema,
};
use lux_types::{
    Axis, Cardinality, CardinalityVar, Extent, InferenceCanonicalType, InstanceVar, PayloadType,
    PayloadVar, Temporality, Unit, UnitVar,
};

use lux_types::define_id;

define_id! {
    /// Id of a registered adapter spec, assigned in registration order.
    AdapterSpecId
}

/// Shape-only cardinality pattern (instance identity is the solver's job).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CardinalityPattern {
    Zero,
    One,
    Many,
}

impl CardinalityPattern {
    fn matches(self, axis: &Axis<Cardinality, CardinalityVar>) -> bool {
        match (self, axis) {
            (CardinalityPattern::Zero, Axis::Inst(Cardinality::Zero))
            | (CardinalityPattern::One, Axis::Inst(Cardinality::One))
            | (CardinalityPattern::Many, Axis::Inst(Cardinality::Many(_))) => true,
            _ => false,
        }
    }
}

/// Per-axis optional pattern over one side of an edge. `None` matches
/// anything, including variables; `Some` requires a matching concrete value.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct ExtentPattern {
    pub cardinality: Option<CardinalityPattern>,
    pub temporality: Option<Temporality>,
}

impl ExtentPattern {
    fn matches(&self, ty: &InferenceCanonicalType) -> bool {
        if let Some(card) = self.cardinality {
            if !card.matches(&ty.extent.cardinality) {
                return false;
            }
        }
        if let Some(temporality) = self.temporality {
            if ty.extent.temporality != Axis::Inst(temporality) {
                return false;
            }
        }
        true
    }
}

/// Required relation between the two sides' units.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum UnitRelation {
    /// No requirement.
    Any,
    /// Both concrete, distinct, and numerically convertible.
    Convertible,
}

impl UnitRelation {
    fn matches(self, from: &InferenceCanonicalType, to: &InferenceCanonicalType) -> bool {
        match self {
            UnitRelation::Any => true,
            UnitRelation::Convertible => match (from.unit, to.unit) {
                (Axis::Inst(a), Axis::Inst(b)) => Unit::is_convertible(a, b),
                _ => false,
            },
        }
    }
}

/// One registered adapter.
#[derive(Clone, Debug)]
pub struct AdapterSpec {
    pub id: AdapterSpecId,
    /// The block type the normalizer instantiates when this spec fires.
    pub block_type: Name,
    pub source: ExtentPattern,
    pub target: ExtentPattern,
    pub unit: UnitRelation,
}

impl AdapterSpec {
    fn matches(&self, from: &InferenceCanonicalType, to: &InferenceCanonicalType) -> bool {
        self.source.matches(from) && self.target.matches(to) && self.unit.matches(from, to)
    }
}

/// Record of an adapter the normalizer spliced into an edge.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct AdapterInstance {
    pub spec: AdapterSpecId,
    /// The synthesized block in the normalized patch.
    pub block: BlockId,
    /// The original edge the adapter bridged.
    pub on_edge: EdgeId,
}

/// All registered adapter specs, in registration order.
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    specs: Vec<AdapterSpec>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        AdapterRegistry::default()
    }

    pub fn register(
        &mut self,
        block_type: Name,
        source: ExtentPattern,
        target: ExtentPattern,
        unit: UnitRelation,
    ) -> AdapterSpecId {
        let id = AdapterSpecId::new(u32::try_from(self.specs.len()).unwrap_or(u32::MAX));
        self.specs.push(AdapterSpec {
            id,
            block_type,
            source,
            target,
            unit,
        });
        id
    }

    /// The earliest-registered spec matching this edge, if any.
    pub fn find_match(
        &self,
        from: &InferenceCanonicalType,
        to: &InferenceCanonicalType,
    ) -> Option<&AdapterSpec> {
        self.specs.iter().find(|spec| spec.matches(from, to))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// The standard adapter set: unit conversion, event-to-signal hold, and
/// signal-to-field broadcast.
pub fn default_adapter_registry(names: &Names) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(
        names.intern("adapter.unitConvert"),
        ExtentPattern {
            cardinality: None,
            temporality: Some(Temporality::Continuous),
        },
        ExtentPattern {
            cardinality: None,
            temporality: Some(Temporality::Continuous),
        },
        UnitRelation::Convertible,
    );
    registry.register(
        names.intern("adapter.sampleHold"),
        ExtentPattern {
            cardinality: None,
            temporality: Some(Temporality::Discrete),
        },
        ExtentPattern {
            cardinality: None,
            temporality: Some(Temporality::Continuous),
        },
        UnitRelation::Any,
    );
    registry.register(
        names.intern("adapter.broadcast"),
        ExtentPattern {
            cardinality: Some(CardinalityPattern::One),
            temporality: Some(Temporality::Continuous),
        },
        ExtentPattern {
            cardinality: Some(CardinalityPattern::Many),
            temporality: Some(Temporality::Continuous),
        },
        UnitRelation::Any,
    );
    registry
}

/// Register the adapter block types themselves.
///
/// Adapter blocks are core machinery, not catalog: any registry a compilation
/// runs against must know them, so the frontend owns their specs. Safe to
/// call on a registry that already has them.
pub fn register_adapter_blocks(registry: &BlockRegistry) {
    let names = registry.names().clone();
    let port_in = names.intern("in");
    let port_out = names.intern("out");

    // Unit conversion: payload and cardinality flow through untouched
    // (block-local vars shared between the ports); the units are left
    // independent so each side unifies with its own edge.
    let convert = BlockSpec {
        type_name: names.intern("adapter.unitConvert"),
        inputs: vec![PortSchema::new(
            port_in,
            InferenceCanonicalType::new(
                Axis::Var(PayloadVar::new(0)),
                Axis::Var(UnitVar::new(0)),
                continuous_extent(Axis::Var(CardinalityVar::new(0))),
            ),
        )],
        outputs: vec![PortSchema::new(
            port_out,
            InferenceCanonicalType::new(
                Axis::Var(PayloadVar::new(0)),
                Axis::Var(UnitVar::new(1)),
                continuous_extent(Axis::Var(CardinalityVar::new(0))),
            ),
        )],
        cardinality_mode: CardinalityMode::Preserve,
        lane_coupling: LaneCoupling::LaneLocal,
        broadcast_policy: BroadcastPolicy::AllowZipSig,
        instance_domain: None,
        op: BlockOp::AdapterUnitConvert,
    };

    // Sample-and-hold: event in, `signal float scalar` out (the event-read
    // signature, locked again at builder time).
    let hold = BlockSpec {
        type_name: names.intern("adapter.sampleHold"),
        inputs: vec![PortSchema::new(
            port_in,
            InferenceCanonicalType::new(
                Axis::Inst(PayloadType::Float),
                Axis::Var(UnitVar::new(0)),
                Extent::resolved(Cardinality::One, Temporality::Discrete),
            ),
        )],
        outputs: vec![PortSchema::new(
            port_out,
            InferenceCanonicalType::concrete(PayloadType::Float, Unit::Scalar, Extent::one()),
        )],
        cardinality_mode: CardinalityMode::Preserve,
        lane_coupling: LaneCoupling::LaneLocal,
        broadcast_policy: BroadcastPolicy::DisallowSignalMix,
        instance_domain: None,
        op: BlockOp::AdapterHold,
    };

    // Broadcast: `one` in, `many` out; the output instance resolves through
    // the downstream edge.
    let broadcast = BlockSpec {
        type_name: names.intern("adapter.broadcast"),
        inputs: vec![PortSchema::new(
            port_in,
            InferenceCanonicalType::new(
                Axis::Var(PayloadVar::new(0)),
                Axis::Var(UnitVar::new(0)),
                Extent::resolved(Cardinality::One, Temporality::Continuous),
            ),
        )],
        outputs: vec![PortSchema::new(
            port_out,
            InferenceCanonicalType::new(
                Axis::Var(PayloadVar::new(0)),
                Axis::Var(UnitVar::new(0)),
                Extent::resolved(
                    Cardinality::many_var(InstanceVar::new(0)),
                    Temporality::Continuous,
                ),
            ),
        )],
        cardinality_mode: CardinalityMode::Transform,
        lane_coupling: LaneCoupling::LaneLocal,
        broadcast_policy: BroadcastPolicy::DisallowSignalMix,
        instance_domain: None,
        op: BlockOp::AdapterBroadcast,
    };

    for spec in [convert, hold, broadcast] {
        // Ignore duplicates: a catalog may have registered these already.
        let _ = registry.register(spec);
    }
}

fn continuous_extent(
    cardinality: Axis<Cardinality, CardinalityVar>,
) -> Extent {
    Extent {
        cardinality,
        ..Extent::one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_types::AngleUnit;

    fn names() -> Names {
        Names::new()
    }

    #[test]
    fn earliest_registered_spec_wins() {
        let names = names();
        let mut registry = AdapterRegistry::new();
        let first = registry.register(
            names.intern("a"),
            ExtentPattern::default(),
            ExtentPattern::default(),
            UnitRelation::Any,
        );
        let _second = registry.register(
            names.intern("b"),
            ExtentPattern::default(),
            ExtentPattern::default(),
            UnitRelation::Any,
        );

        let ty = InferenceCanonicalType::concrete(PayloadType::Float, Unit::Scalar, Extent::one());
        let found = registry.find_match(&ty, &ty).map(|s| s.id);
        assert_eq!(found, Some(first));
    }

    #[test]
    fn unit_conversion_matches_convertible_pairs_only() {
        let names = names();
        let registry = default_adapter_registry(&names);

        let radians = InferenceCanonicalType::concrete(
            PayloadType::Float,
            Unit::Angle(AngleUnit::Radians),
            Extent::one(),
        );
        let degrees = InferenceCanonicalType::concrete(
            PayloadType::Float,
            Unit::Angle(AngleUnit::Degrees),
            Extent::one(),
        );
        let scalar =
            InferenceCanonicalType::concrete(PayloadType::Float, Unit::Scalar, Extent::one());

        assert!(registry.find_match(&radians, &degrees).is_some());
        assert!(registry.find_match(&radians, &scalar).is_none());
    }

    #[test]
    fn hold_matches_discrete_to_continuous() {
        let names = names();
        let registry = default_adapter_registry(&names);
        let event =
            InferenceCanonicalType::concrete(PayloadType::Float, Unit::Scalar, Extent::event());
        let signal =
            InferenceCanonicalType::concrete(PayloadType::Float, Unit::Scalar, Extent::one());

        let found = registry.find_match(&event, &signal);
        assert!(found.is_some());
        assert!(registry.find_match(&signal, &event).is_none());
    }
}
