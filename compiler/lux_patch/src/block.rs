//! Blocks, edges, and the patch graph.

use thiserror::Error;

use lux_types::{define_id, ConstValue};

use crate::name::{Name, Names};

define_id! {
    /// Stable id of a block within one patch. Dense: blocks index the
    /// patch's block vector in insertion order.
    BlockId
}

define_id! {
    /// Stable id of an edge within one patch.
    EdgeId
}

/// Which side of a block a port sits on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum PortDir {
    Input,
    Output,
}

/// A port on a specific block.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PortRef {
    pub block: BlockId,
    pub port: Name,
}

/// Per-block data that varies per instance of a block type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockSettings {
    #[default]
    None,
    /// Lane count for instance-creating blocks.
    Count(u32),
    /// Literal for constant blocks.
    Value(ConstValue),
    /// Host channel for external-input and pulse blocks.
    Channel(u32),
}

/// A node in the patch: a registry key plus per-block settings.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    pub type_name: Name,
    pub settings: BlockSettings,
}

/// A directed connection `(from block, from port) → (to block, to port)`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub from: PortRef,
    pub to: PortRef,
}

/// Errors from patch construction.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum PatchError {
    #[error("block {0:?} does not exist")]
    UnknownBlock(BlockId),
}

/// The user-authored graph of blocks and edges.
///
/// Block ids and edges keep insertion order; semantic ordering is derived
/// topologically by the normalizer. The patch never changes once compilation
/// starts — adapter insertion happens on the frontend's own copy.
#[derive(Debug, Default)]
pub struct Patch {
    names: Names,
    blocks: Vec<Block>,
    edges: Vec<Edge>,
}

impl Patch {
    /// An empty patch with its own name table.
    pub fn new(names: Names) -> Self {
        Patch {
            names,
            blocks: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn names(&self) -> &Names {
        &self.names
    }

    /// Add a block of the given registered type.
    pub fn add_block(&mut self, type_name: &str, settings: BlockSettings) -> BlockId {
        let id = BlockId::new(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
        self.blocks.push(Block {
            type_name: self.names.intern(type_name),
            settings,
        });
        id
    }

    /// Connect an output port to an input port.
    pub fn connect(
        &mut self,
        from: BlockId,
        from_port: &str,
        to: BlockId,
        to_port: &str,
    ) -> Result<EdgeId, PatchError> {
        if from.index() >= self.blocks.len() {
            return Err(PatchError::UnknownBlock(from));
        }
        if to.index() >= self.blocks.len() {
            return Err(PatchError::UnknownBlock(to));
        }
        let id = EdgeId::new(u32::try_from(self.edges.len()).unwrap_or(u32::MAX));
        self.edges.push(Edge {
            from: PortRef {
                block: from,
                port: self.names.intern(from_port),
            },
            to: PortRef {
                block: to,
                port: self.names.intern(to_port),
            },
        });
        Ok(id)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}
