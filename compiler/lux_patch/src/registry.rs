//! Block registry adaptor.
//!
//! The core consumes block metadata through this narrow read-only interface:
//! port schemas (whose types may carry block-local variables), cardinality
//! metadata, and the closed [`BlockOp`] operator tag. Lowering dispatches on
//! the operator sum — never on block-name strings and never through
//! open-world callbacks, so exhaustiveness checks survive and plugins cannot
//! defeat the type invariants.
//!
//! The registry is frozen before compilation; registering after the freeze is
//! an error. Tests use ephemeral registries to avoid cross-test
//! contamination.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use lux_ir::{CombineFn, IntrinsicKind, MapFn, ReduceFn, TimeBase, ZipFn};
use lux_types::InferenceCanonicalType;

use crate::name::{Name, Names};

/// How a block relates its ports' cardinalities.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum CardinalityMode {
    /// All inputs and outputs share one cardinality group.
    Preserve,
    /// Outputs take their schema cardinality, decoupled from inputs
    /// (instance-creating and cardinality-collapsing blocks).
    Transform,
    /// Every port is pinned to `one`.
    SignalOnly,
    /// Every port must be `many`.
    FieldOnly,
}

/// Whether a kernel may read lanes other than its own.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum LaneCoupling {
    LaneLocal,
    LaneCoupled,
}

/// How a `preserve` block treats mixed field/signal inputs.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BroadcastPolicy {
    /// Signals zip against one field; the solver inserts broadcasts.
    AllowZipSig,
    /// Mixing requires an explicit Broadcast block in the patch.
    RequireBroadcastExpr,
    /// Mixed cardinalities are rejected outright.
    DisallowSignalMix,
}

/// The closed operator sum the backend lowers on.
///
/// Adding a block kind means adding a variant here and a lowering arm; a
/// missing arm is a compile error.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockOp {
    /// Clock source.
    Time(TimeBase),
    /// Literal from `BlockSettings::Value`.
    Constant,
    /// Host signal from `BlockSettings::Channel`.
    External,
    /// Lane-wise unary math.
    UnaryMath(MapFn),
    /// Lane-wise binary math.
    BinaryMath(ZipFn),
    /// Field → signal reduction.
    Reduce(ReduceFn),
    /// Scalars → vector payload.
    Combine(CombineFn),
    /// Wrap into `[0, 1)`.
    Wrap,
    /// Lane-coupled finite difference along a field.
    PathDerivative,
    /// Instance-creating domain block (`BlockSettings::Count` lanes).
    ArrayDomain,
    /// Per-instance context read.
    Intrinsic(IntrinsicKind),
    /// Camera projection source; the only sanctioned origin of the
    /// `cameraProjection` payload.
    Camera,
    /// Continuous read of a state slot.
    StateRead,
    /// Sink: write a value into a state slot at frame end.
    StateWrite,
    /// Event source from a host channel (`BlockSettings::Channel`).
    Pulse,
    /// Event → signal sample-and-hold.
    SampleAndHold,
    /// Sink: materialize a field and emit a draw.
    Render,
    /// Sink: observe a signal.
    Display,
    /// Inserted adapter: multiply by the unit conversion factor.
    AdapterUnitConvert,
    /// Inserted adapter: replicate a signal across an instance.
    AdapterBroadcast,
    /// Inserted adapter: latch an event into a signal.
    AdapterHold,
}

/// One port in a block's schema. The type may carry variables; variable ids
/// are block-local and re-numbered per block instance by the solver.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PortSchema {
    pub name: Name,
    pub ty: InferenceCanonicalType,
}

impl PortSchema {
    pub const fn new(name: Name, ty: InferenceCanonicalType) -> Self {
        PortSchema { name, ty }
    }
}

/// Registration metadata for one block type.
#[derive(Clone, Debug)]
pub struct BlockSpec {
    pub type_name: Name,
    pub inputs: Vec<PortSchema>,
    pub outputs: Vec<PortSchema>,
    pub cardinality_mode: CardinalityMode,
    pub lane_coupling: LaneCoupling,
    pub broadcast_policy: BroadcastPolicy,
    /// Domain this block instantiates, for `Transform` blocks that create
    /// instances.
    pub instance_domain: Option<Name>,
    pub op: BlockOp,
}

impl BlockSpec {
    /// Schema of a port by name and direction.
    pub fn port(&self, name: Name, dir: crate::PortDir) -> Option<&PortSchema> {
        let ports = match dir {
            crate::PortDir::Input => &self.inputs,
            crate::PortDir::Output => &self.outputs,
        };
        ports.iter().find(|p| p.name == name)
    }
}

/// Errors from registry mutation.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum RegistryError {
    #[error("registry is frozen; cannot register `{0}`")]
    Frozen(String),
    #[error("block type `{0}` is already registered")]
    Duplicate(String),
}

#[derive(Default)]
struct RegistryInner {
    specs: Vec<BlockSpec>,
    by_name: FxHashMap<Name, usize>,
    frozen: bool,
}

/// The block registry: read-only once frozen.
pub struct BlockRegistry {
    names: Names,
    inner: RwLock<RegistryInner>,
}

impl BlockRegistry {
    /// An empty registry sharing the given name table.
    pub fn new(names: Names) -> Self {
        BlockRegistry {
            names,
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    pub fn names(&self) -> &Names {
        &self.names
    }

    /// Register a block type. Fails once the registry is frozen or if the
    /// name is taken.
    pub fn register(&self, spec: BlockSpec) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        if inner.frozen {
            return Err(RegistryError::Frozen(self.names.lookup(spec.type_name)));
        }
        if inner.by_name.contains_key(&spec.type_name) {
            return Err(RegistryError::Duplicate(self.names.lookup(spec.type_name)));
        }
        let index = inner.specs.len();
        inner.by_name.insert(spec.type_name, index);
        inner.specs.push(spec);
        Ok(())
    }

    /// Freeze the registry. Compilation entry points call this; it is
    /// idempotent.
    pub fn freeze(&self) {
        self.inner.write().frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.read().frozen
    }

    /// Metadata for a block type, cloned out of the table.
    pub fn get(&self, type_name: Name) -> Option<BlockSpec> {
        let inner = self.inner.read();
        inner
            .by_name
            .get(&type_name)
            .map(|&index| inner.specs[index].clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_types::{Extent, PayloadType, Unit};
    use pretty_assertions::assert_eq;

    fn spec(names: &Names, name: &str) -> BlockSpec {
        BlockSpec {
            type_name: names.intern(name),
            inputs: Vec::new(),
            outputs: vec![PortSchema::new(
                names.intern("out"),
                InferenceCanonicalType::concrete(PayloadType::Float, Unit::Scalar, Extent::one()),
            )],
            cardinality_mode: CardinalityMode::SignalOnly,
            lane_coupling: LaneCoupling::LaneLocal,
            broadcast_policy: BroadcastPolicy::AllowZipSig,
            instance_domain: None,
            op: BlockOp::Time(TimeBase::Seconds),
        }
    }

    #[test]
    fn registration_then_lookup() {
        let names = Names::new();
        let registry = BlockRegistry::new(names.clone());
        assert!(registry.register(spec(&names, "Time")).is_ok());
        let found = registry.get(names.intern("Time"));
        assert!(found.is_some());
        assert!(registry.get(names.intern("Missing")).is_none());
    }

    #[test]
    fn duplicate_registration_fails() {
        let names = Names::new();
        let registry = BlockRegistry::new(names.clone());
        assert!(registry.register(spec(&names, "Time")).is_ok());
        assert_eq!(
            registry.register(spec(&names, "Time")),
            Err(RegistryError::Duplicate("Time".to_owned()))
        );
    }

    #[test]
    fn frozen_registry_rejects_registration() {
        let names = Names::new();
        let registry = BlockRegistry::new(names.clone());
        registry.freeze();
        assert!(registry.is_frozen());
        assert_eq!(
            registry.register(spec(&names, "Time")),
            Err(RegistryError::Frozen("Time".to_owned()))
        );
    }
}
