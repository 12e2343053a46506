//! Patch graph and block registry adaptor for Lux.
//!
//! A patch is the user-authored directed graph of typed blocks and edges.
//! The compiler core consumes block metadata through the narrow read-only
//! [`BlockRegistry`] interface: port schemas (possibly variable-bearing),
//! cardinality metadata, and a closed [`BlockOp`] operator tag the backend
//! dispatches on. The registry freezes before compilation; the solver
//! translates its metadata into constraints once, and no later pass
//! re-consults it for compatibility decisions.

mod block;
mod instance;
mod name;
mod registry;

pub use block::{Block, BlockId, BlockSettings, Edge, EdgeId, Patch, PatchError, PortDir, PortRef};
pub use instance::{InstanceInfo, InstanceTable};
pub use name::{Name, NameInterner, Names};
pub use registry::{
    BlockOp, BlockRegistry, BlockSpec, BroadcastPolicy, CardinalityMode, LaneCoupling,
    PortSchema, RegistryError,
};
