//! Graph normalization: topological order and adapter insertion.
//!
//! The normalizer never mutates the input patch. It copies the block list,
//! validates edges against the registry's schemas, splices adapter blocks
//! into edges whose schema types are concretely incompatible but bridgeable,
//! and derives a deterministic topological order. Unbridgeable mismatches
//! emit `MissingAdapter` and the pass continues so the solver can report
//! further problems in the same run.

mod adapters;

pub use adapters::{
    default_adapter_registry, register_adapter_blocks, AdapterInstance, AdapterRegistry,
    AdapterSpec, AdapterSpecId, CardinalityPattern, ExtentPattern, UnitRelation,
};

use tracing::debug;

use lux_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode, NodeRef};
use lux_patch::{
    Block, BlockId, BlockRegistry, BlockSettings, Edge, EdgeId, Patch, PortDir, PortRef,
};
use lux_types::{Axis, Cardinality, InferenceCanonicalType};

/// The normalizer's output: an augmented copy of the patch.
#[derive(Debug)]
pub struct NormalizedPatch {
    pub blocks: Vec<Block>,
    pub edges: Vec<Edge>,
    pub order: Vec<BlockId>,
    pub adapters: Vec<AdapterInstance>,
}

/// Normalize a patch against a frozen registry.
pub fn normalize(
    patch: &Patch,
    registry: &BlockRegistry,
    adapter_registry: &AdapterRegistry,
    queue: &mut DiagnosticQueue,
) -> NormalizedPatch {
    let names = patch.names();
    let mut blocks: Vec<Block> = patch.blocks().to_vec();

    // Unknown block types surface once per block; their edges are dropped.
    let mut known = vec![false; blocks.len()];
    for (index, block) in blocks.iter().enumerate() {
        if registry.get(block.type_name).is_some() {
            known[index] = true;
        } else {
            queue.push(
                Diagnostic::error(ErrorCode::E1004)
                    .with_message(format!(
                        "block type `{}` is not registered",
                        names.lookup(block.type_name)
                    ))
                    .with_node(NodeRef::block(index_u32(index))),
            );
        }
    }

    // Validate edge endpoints against schemas; keep the survivors.
    let mut edges: Vec<Edge> = Vec::with_capacity(patch.edges().len());
    let mut adapter_records = Vec::new();
    for (edge_index, edge) in patch.edges().iter().enumerate() {
        let edge_ref = NodeRef::edge(index_u32(edge_index));
        if !known
            .get(edge.from.block.index())
            .copied()
            .unwrap_or(false)
            || !known.get(edge.to.block.index()).copied().unwrap_or(false)
        {
            continue;
        }
        let from_ty = port_schema_type(registry, &blocks, edge.from, PortDir::Output);
        let to_ty = port_schema_type(registry, &blocks, edge.to, PortDir::Input);
        let (from_ty, to_ty) = match (from_ty, to_ty) {
            (Some(f), Some(t)) => (f, t),
            _ => {
                queue.push(
                    Diagnostic::error(ErrorCode::E1003)
                        .with_message(format!(
                            "edge references a port missing from its block's schema \
                             (`{}` → `{}`)",
                            names.lookup(edge.from.port),
                            names.lookup(edge.to.port)
                        ))
                        .with_node(edge_ref),
                );
                continue;
            }
        };

        if !needs_bridge(&from_ty, &to_ty) {
            edges.push(*edge);
            continue;
        }

        match adapter_registry.find_match(&from_ty, &to_ty) {
            Some(spec) => {
                let Some(adapter_spec) = registry.get(spec.block_type) else {
                    queue.push(missing_adapter(names, edge, edge_ref));
                    edges.push(*edge);
                    continue;
                };
                let (Some(in_port), Some(out_port)) = (
                    adapter_spec.inputs.first().map(|p| p.name),
                    adapter_spec.outputs.first().map(|p| p.name),
                ) else {
                    queue.push(missing_adapter(names, edge, edge_ref));
                    edges.push(*edge);
                    continue;
                };

                let adapter_id = BlockId::new(index_u32(blocks.len()));
                blocks.push(Block {
                    type_name: spec.block_type,
                    settings: BlockSettings::None,
                });
                adapter_records.push(AdapterInstance {
                    spec: spec.id,
                    block: adapter_id,
                    on_edge: EdgeId::new(index_u32(edge_index)),
                });
                debug!(
                    adapter = %names.lookup(spec.block_type),
                    edge = edge_index,
                    "inserted adapter"
                );
                edges.push(Edge {
                    from: edge.from,
                    to: PortRef {
                        block: adapter_id,
                        port: in_port,
                    },
                });
                edges.push(Edge {
                    from: PortRef {
                        block: adapter_id,
                        port: out_port,
                    },
                    to: edge.to,
                });
            }
            None => {
                queue.push(missing_adapter(names, edge, edge_ref));
                edges.push(*edge);
            }
        }
    }

    let order = topological_order(&blocks, &edges, queue);

    NormalizedPatch {
        blocks,
        edges,
        order,
        adapters: adapter_records,
    }
}

fn missing_adapter(names: &lux_patch::Names, edge: &Edge, edge_ref: NodeRef) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1001)
        .with_message(format!(
            "no adapter bridges `{}` → `{}`",
            names.lookup(edge.from.port),
            names.lookup(edge.to.port)
        ))
        .with_node(edge_ref)
}

fn port_schema_type(
    registry: &BlockRegistry,
    blocks: &[Block],
    port: PortRef,
    dir: PortDir,
) -> Option<InferenceCanonicalType> {
    let block = blocks.get(port.block.index())?;
    let spec = registry.get(block.type_name)?;
    spec.port(port.port, dir).map(|schema| schema.ty)
}

/// Whether the schemas alone prove the edge needs an adapter.
///
/// Variable-bearing components are left for the solver; only
/// concretely-known mismatches are bridged here, which is what makes
/// insertion deterministic and repeatable.
fn needs_bridge(from: &InferenceCanonicalType, to: &InferenceCanonicalType) -> bool {
    if let (Axis::Inst(a), Axis::Inst(b)) = (from.unit, to.unit) {
        if a != b {
            return true;
        }
    }
    if let (Axis::Inst(a), Axis::Inst(b)) = (from.extent.temporality, to.extent.temporality) {
        if a != b {
            return true;
        }
    }
    if let (Axis::Inst(a), Axis::Inst(b)) = (from.extent.cardinality, to.extent.cardinality) {
        // A `one` output into a `many`-shaped input is a broadcast; other
        // shape mismatches have no adapter and fall through to the solver.
        if a == Cardinality::One && matches!(b, Cardinality::Many(_)) {
            return true;
        }
    }
    false
}

/// Kahn's algorithm, smallest block id first, so the order is a total
/// function of the graph. Cycles emit one diagnostic and the remaining
/// blocks are appended in id order so later passes still see every block.
fn topological_order(
    blocks: &[Block],
    edges: &[Edge],
    queue: &mut DiagnosticQueue,
) -> Vec<BlockId> {
    let count = blocks.len();
    let mut in_degree = vec![0usize; count];
    for edge in edges {
        in_degree[edge.to.block.index()] += 1;
    }

    let mut emitted = vec![false; count];
    let mut order = Vec::with_capacity(count);
    loop {
        let next = (0..count).find(|&i| !emitted[i] && in_degree[i] == 0);
        let Some(next) = next else { break };
        emitted[next] = true;
        order.push(BlockId::new(index_u32(next)));
        for edge in edges {
            if edge.from.block.index() == next {
                in_degree[edge.to.block.index()] -= 1;
            }
        }
    }

    if order.len() < count {
        let first_stuck = (0..count).find(|&i| !emitted[i]).unwrap_or(0);
        queue.push(
            Diagnostic::error(ErrorCode::E1002)
                .with_message("cycle in the patch graph; break it with a state read/write pair")
                .with_node(NodeRef::block(index_u32(first_stuck))),
        );
        for i in 0..count {
            if !emitted[i] {
                order.push(BlockId::new(index_u32(i)));
            }
        }
    }

    order
}

fn index_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_diagnostic::ErrorCode;
    use lux_patch::{
        BlockRegistry, BlockSpec, BroadcastPolicy, CardinalityMode, LaneCoupling, Names,
        PortSchema,
    };
    use lux_types::{Extent, InferenceCanonicalType, PayloadType, Unit};

    fn scalar_one() -> InferenceCanonicalType {
        InferenceCanonicalType::concrete(PayloadType::Float, Unit::Scalar, Extent::one())
    }

    /// A block with one input and one output, both `signal float scalar`.
    fn passthrough(names: &Names, name: &str) -> BlockSpec {
        BlockSpec {
            type_name: names.intern(name),
            inputs: vec![PortSchema::new(names.intern("in"), scalar_one())],
            outputs: vec![PortSchema::new(names.intern("out"), scalar_one())],
            cardinality_mode: CardinalityMode::SignalOnly,
            lane_coupling: LaneCoupling::LaneLocal,
            broadcast_policy: BroadcastPolicy::DisallowSignalMix,
            instance_domain: None,
            op: lux_patch::BlockOp::Display,
        }
    }

    fn setup() -> (BlockRegistry, Patch) {
        let names = Names::new();
        let registry = BlockRegistry::new(names.clone());
        let _ = registry.register(passthrough(&names, "Pass"));
        (registry, Patch::new(names))
    }

    fn run(patch: &Patch, registry: &BlockRegistry) -> (NormalizedPatch, Vec<lux_diagnostic::Diagnostic>) {
        let adapters = super::default_adapter_registry(patch.names());
        let mut queue = DiagnosticQueue::default();
        let norm = normalize(patch, registry, &adapters, &mut queue);
        (norm, queue.take())
    }

    #[test]
    fn order_is_topological_and_stable() {
        let (registry, mut patch) = setup();
        // Wire c ← b ← a but insert them shuffled.
        let c = patch.add_block("Pass", BlockSettings::None);
        let a = patch.add_block("Pass", BlockSettings::None);
        let b = patch.add_block("Pass", BlockSettings::None);
        let _ = patch.connect(a, "out", b, "in");
        let _ = patch.connect(b, "out", c, "in");

        let (norm, diagnostics) = run(&patch, &registry);
        assert!(diagnostics.is_empty());
        assert_eq!(norm.order, vec![a, b, c]);

        let (again, _) = run(&patch, &registry);
        assert_eq!(norm.order, again.order);
    }

    #[test]
    fn unknown_block_type_is_reported() {
        let (registry, mut patch) = setup();
        patch.add_block("Mystery", BlockSettings::None);
        let (_, diagnostics) = run(&patch, &registry);
        assert!(diagnostics.iter().any(|d| d.code == ErrorCode::E1004));
    }

    #[test]
    fn unknown_port_is_reported_and_edge_dropped() {
        let (registry, mut patch) = setup();
        let a = patch.add_block("Pass", BlockSettings::None);
        let b = patch.add_block("Pass", BlockSettings::None);
        let _ = patch.connect(a, "bogus", b, "in");

        let (norm, diagnostics) = run(&patch, &registry);
        assert!(diagnostics.iter().any(|d| d.code == ErrorCode::E1003));
        assert!(norm.edges.is_empty());
    }

    #[test]
    fn cycle_is_reported_once() {
        let (registry, mut patch) = setup();
        let a = patch.add_block("Pass", BlockSettings::None);
        let b = patch.add_block("Pass", BlockSettings::None);
        let _ = patch.connect(a, "out", b, "in");
        let _ = patch.connect(b, "out", a, "in");

        let (norm, diagnostics) = run(&patch, &registry);
        let cycles: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code == ErrorCode::E1002)
            .collect();
        assert_eq!(cycles.len(), 1);
        // Every block still appears in the order for later passes.
        assert_eq!(norm.order.len(), 2);
    }
}
