//! The typed patch: the frontend's output artifact.

use rustc_hash::FxHashMap;

use lux_patch::{Block, BlockId, Edge, EdgeId, InstanceTable, Name, Names, PortDir, PortRef};
use lux_types::CanonicalType;

use crate::normalize::AdapterInstance;

/// Key of one port in the typed patch.
pub type PortKey = (BlockId, Name, PortDir);

/// A patch in which every port carries a canonical type.
///
/// Produced by `compile_frontend`; immutable afterwards. When
/// `backend_ready` is true every type is fully instantiated and every `many`
/// cardinality names an instance present in `instances` — the backend relies
/// on this and never re-checks.
#[derive(Debug)]
pub struct TypedPatch {
    pub names: Names,
    /// Patch blocks plus synthesized adapter blocks.
    pub blocks: Vec<Block>,
    /// Edges after adapter splicing.
    pub edges: Vec<Edge>,
    /// Topological block order.
    pub order: Vec<BlockId>,
    pub port_types: FxHashMap<PortKey, CanonicalType>,
    pub instances: InstanceTable,
    pub adapters: Vec<AdapterInstance>,
    pub backend_ready: bool,
}

impl TypedPatch {
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    /// The resolved type of a port.
    pub fn port_type(&self, block: BlockId, port: Name, dir: PortDir) -> Option<&CanonicalType> {
        self.port_types.get(&(block, port, dir))
    }

    /// The output port feeding an input port, if connected.
    pub fn input_source(&self, block: BlockId, port: Name) -> Option<PortRef> {
        self.edges
            .iter()
            .find(|edge| edge.to.block == block && edge.to.port == port)
            .map(|edge| edge.from)
    }

    /// The original edge index an adapter was spliced into, if `block` is an
    /// adapter.
    pub fn adapter_origin(&self, block: BlockId) -> Option<EdgeId> {
        self.adapters
            .iter()
            .find(|adapter| adapter.block == block)
            .map(|adapter| adapter.on_edge)
    }
}
