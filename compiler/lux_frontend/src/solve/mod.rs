//! The constraint solver.
//!
//! Union-find over axis variables plus edge-driven propagation, producing a
//! fully typed port map. The pass is deterministic and single-pass: seed
//! schema values, merge along edges, emit block constraints in topological
//! order (so zip-broadcast groups see resolved upstream cardinalities), then
//! walk every port once to materialize canonical types. No backtracking.
//!
//! The registry's metadata is translated into constraints here, once; no
//! later pass re-consults it for compatibility decisions.

mod error;
mod table;

pub use error::{CardShape, SolveError};
pub use table::{VarKey, VarTable};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use lux_diagnostic::{DiagnosticQueue, NodeRef, Remedy};
use lux_patch::{
    BlockId, BlockRegistry, BlockSettings, BlockSpec, BroadcastPolicy, CardinalityMode,
    InstanceTable, Name, Names, PortDir,
};
use lux_types::{
    Axis, Binding, BindingVar, Branch, BranchVar, CanonicalType, Cardinality, CardinalityVar,
    InferenceCanonicalType, InstanceRef, InstanceVar, PayloadType, PayloadVar, Perspective,
    PerspectiveVar, Temporality, TemporalityVar, Unit, UnitVar,
};

use crate::normalize::NormalizedPatch;
use crate::typed::PortKey;

/// Resolved port types plus the instance table built during solving.
#[derive(Debug)]
pub struct SolveOutput {
    pub port_types: FxHashMap<PortKey, CanonicalType>,
    pub instances: InstanceTable,
}

/// One global variable per component of every port.
#[derive(Copy, Clone, Debug)]
struct PortVars {
    card: CardinalityVar,
    instance: InstanceVar,
    temporality: TemporalityVar,
    binding: BindingVar,
    perspective: PerspectiveVar,
    branch: BranchVar,
    unit: UnitVar,
    payload: PayloadVar,
}

#[derive(Default)]
struct Tables {
    card: VarTable<CardinalityVar, CardShape>,
    instance: VarTable<InstanceVar, InstanceRef>,
    temporality: VarTable<TemporalityVar, Temporality>,
    binding: VarTable<BindingVar, Binding>,
    perspective: VarTable<PerspectiveVar, Perspective>,
    branch: VarTable<BranchVar, Branch>,
    unit: VarTable<UnitVar, Unit>,
    payload: VarTable<PayloadVar, PayloadType>,
}

impl Tables {
    fn fresh_port_vars(&mut self) -> PortVars {
        PortVars {
            card: self.card.fresh(),
            instance: self.instance.fresh(),
            temporality: self.temporality.fresh(),
            binding: self.binding.fresh(),
            perspective: self.perspective.fresh(),
            branch: self.branch.fresh(),
            unit: self.unit.fresh(),
            payload: self.payload.fresh(),
        }
    }
}

/// Block-local variable groups, one namespace per axis domain. Schema types
/// number their variables block-locally; sharing a local id means sharing a
/// group.
#[derive(Default)]
struct Locals {
    card: FxHashMap<u32, CardinalityVar>,
    instance: FxHashMap<u32, InstanceVar>,
    temporality: FxHashMap<u32, TemporalityVar>,
    binding: FxHashMap<u32, BindingVar>,
    perspective: FxHashMap<u32, PerspectiveVar>,
    branch: FxHashMap<u32, BranchVar>,
    unit: FxHashMap<u32, UnitVar>,
    payload: FxHashMap<u32, PayloadVar>,
}

pub(crate) fn solve(
    norm: &NormalizedPatch,
    names: &Names,
    registry: &BlockRegistry,
    queue: &mut DiagnosticQueue,
) -> SolveOutput {
    let mut tables = Tables::default();
    let mut port_vars: FxHashMap<PortKey, PortVars> = FxHashMap::default();
    let mut instances = InstanceTable::new();

    // Specs are fetched once, in block order.
    let specs: Vec<Option<BlockSpec>> = norm
        .blocks
        .iter()
        .map(|block| registry.get(block.type_name))
        .collect();

    // === Seeding: allocate variables, merge schema values ===

    for (index, spec) in specs.iter().enumerate() {
        let Some(spec) = spec else { continue };
        let block_id = BlockId::new(index_u32(index));
        let block_ref = NodeRef::block(index_u32(index));
        let mut locals = Locals::default();
        for (schema, dir) in spec
            .inputs
            .iter()
            .map(|s| (s, PortDir::Input))
            .chain(spec.outputs.iter().map(|s| (s, PortDir::Output)))
        {
            let vars = tables.fresh_port_vars();
            seed_port(&mut tables, &mut locals, vars, &schema.ty, block_ref, queue);
            port_vars.insert((block_id, schema.name, dir), vars);
        }
    }

    // === Edge propagation: merge source and target groups on every axis ===

    for (edge_index, edge) in norm.edges.iter().enumerate() {
        let from = port_vars.get(&(edge.from.block, edge.from.port, PortDir::Output));
        let to = port_vars.get(&(edge.to.block, edge.to.port, PortDir::Input));
        let (Some(&from), Some(&to)) = (from, to) else {
            continue;
        };
        let location = NodeRef::edge(index_u32(edge_index));
        merge_ports(&mut tables, from, to, location, queue);
    }

    // === Block constraints, in topological order ===

    for &block_id in &norm.order {
        let Some(Some(spec)) = specs.get(block_id.index()) else {
            continue;
        };
        let block = norm.blocks[block_id.index()];
        let block_ref = NodeRef::block(block_id.raw());
        let vars_of = |name: Name, dir: PortDir| port_vars.get(&(block_id, name, dir)).copied();

        match spec.cardinality_mode {
            CardinalityMode::SignalOnly => {
                for (schema, dir) in all_ports(spec) {
                    if let Some(vars) = vars_of(schema.name, dir) {
                        assign_card(&mut tables, vars.card, CardShape::One, block_ref, queue);
                    }
                }
            }
            CardinalityMode::FieldOnly => {
                for (schema, dir) in all_ports(spec) {
                    if let Some(vars) = vars_of(schema.name, dir) {
                        assign_card(&mut tables, vars.card, CardShape::Many, block_ref, queue);
                    }
                }
            }
            CardinalityMode::Transform => {
                // Outputs take their schema cardinality; instance-creating
                // blocks pin their context instance onto `many` outputs.
                let context = spec.instance_domain.map(|domain| {
                    let count = match block.settings {
                        BlockSettings::Count(count) => count,
                        _ => 1,
                    };
                    instances.register(domain, count, block_id)
                });
                if let Some(instance) = context {
                    debug!(block = block_id.raw(), %instance, "registered instance");
                    for schema in &spec.outputs {
                        let Some(vars) = vars_of(schema.name, PortDir::Output) else {
                            continue;
                        };
                        if tables.card.value(vars.card) == Some(CardShape::Many) {
                            if let Err((left, right)) =
                                tables.instance.assign(vars.instance, instance)
                            {
                                queue.push(
                                    SolveError::InstanceConflict {
                                        left,
                                        right,
                                        location: block_ref,
                                    }
                                    .to_diagnostic(),
                                );
                            }
                        }
                    }
                }
            }
            CardinalityMode::Preserve => match spec.broadcast_policy {
                BroadcastPolicy::AllowZipSig => {
                    zip_broadcast(&mut tables, spec, &vars_of, block_ref, queue);
                }
                BroadcastPolicy::DisallowSignalMix | BroadcastPolicy::RequireBroadcastExpr => {
                    let mut anchor: Option<PortVars> = None;
                    for (schema, dir) in all_ports(spec) {
                        let Some(vars) = vars_of(schema.name, dir) else {
                            continue;
                        };
                        match anchor {
                            None => anchor = Some(vars),
                            Some(first) => {
                                if let Err((left, right)) = tables.card.union(first.card, vars.card)
                                {
                                    queue.push(
                                        SolveError::CardinalityConflict {
                                            left,
                                            right,
                                            location: block_ref,
                                        }
                                        .to_diagnostic(),
                                    );
                                }
                                if let Err((left, right)) =
                                    tables.instance.union(first.instance, vars.instance)
                                {
                                    queue.push(
                                        SolveError::InstanceConflict {
                                            left,
                                            right,
                                            location: block_ref,
                                        }
                                        .to_diagnostic(),
                                    );
                                }
                            }
                        }
                    }
                }
            },
        }
    }

    // === Resolution: materialize a canonical type per port ===

    let mut reported_unresolved: FxHashSet<(&'static str, u32)> = FxHashSet::default();
    let mut port_types = FxHashMap::default();

    for (index, spec) in specs.iter().enumerate() {
        let Some(spec) = spec else { continue };
        let block_id = BlockId::new(index_u32(index));
        for (schema, dir) in all_ports(spec) {
            let Some(&vars) = port_vars.get(&(block_id, schema.name, dir)) else {
                continue;
            };
            let port_note = format!(
                "port `{}` of block #{index}",
                names.lookup(schema.name)
            );
            let location = NodeRef::block(index_u32(index));
            let mut unresolved = |axis: &'static str, root: u32| {
                if reported_unresolved.insert((axis, root)) {
                    queue.push(
                        SolveError::UnresolvedAxis { axis, location }
                            .to_diagnostic()
                            .with_note(port_note.clone()),
                    );
                }
            };

            let payload = match tables.payload.value(vars.payload) {
                Some(value) => value,
                None => {
                    let root = tables.payload.root(vars.payload);
                    unresolved("payload", root);
                    continue;
                }
            };
            let unit = match tables.unit.value(vars.unit) {
                Some(value) => value,
                None => {
                    let root = tables.unit.root(vars.unit);
                    unresolved("unit", root);
                    continue;
                }
            };

            let cardinality = match tables.card.value(vars.card) {
                Some(CardShape::Zero) => Axis::Inst(Cardinality::Zero),
                Some(CardShape::One) => Axis::Inst(Cardinality::One),
                Some(CardShape::Many) => match tables.instance.value(vars.instance) {
                    Some(instance) => Axis::Inst(Cardinality::many(instance)),
                    None => {
                        let root = tables.instance.root(vars.instance);
                        unresolved("instance", root);
                        Axis::Inst(Cardinality::many_var(vars.instance))
                    }
                },
                None => {
                    let root = tables.card.root(vars.card);
                    unresolved("cardinality", root);
                    Axis::Var(vars.card)
                }
            };
            let temporality = match tables.temporality.value(vars.temporality) {
                Some(value) => Axis::Inst(value),
                None => {
                    let root = tables.temporality.root(vars.temporality);
                    unresolved("temporality", root);
                    Axis::Var(vars.temporality)
                }
            };
            let binding = match tables.binding.value(vars.binding) {
                Some(value) => Axis::Inst(value),
                None => {
                    let root = tables.binding.root(vars.binding);
                    unresolved("binding", root);
                    Axis::Var(vars.binding)
                }
            };
            let perspective = match tables.perspective.value(vars.perspective) {
                Some(value) => Axis::Inst(value),
                None => {
                    let root = tables.perspective.root(vars.perspective);
                    unresolved("perspective", root);
                    Axis::Var(vars.perspective)
                }
            };
            let branch = match tables.branch.value(vars.branch) {
                Some(value) => Axis::Inst(value),
                None => {
                    let root = tables.branch.root(vars.branch);
                    unresolved("branch", root);
                    Axis::Var(vars.branch)
                }
            };

            port_types.insert(
                (block_id, schema.name, dir),
                CanonicalType::new(
                    payload,
                    unit,
                    lux_types::Extent {
                        cardinality,
                        temporality,
                        binding,
                        perspective,
                        branch,
                    },
                ),
            );
        }
    }

    SolveOutput {
        port_types,
        instances,
    }
}

fn all_ports(spec: &BlockSpec) -> impl Iterator<Item = (&lux_patch::PortSchema, PortDir)> {
    spec.inputs
        .iter()
        .map(|s| (s, PortDir::Input))
        .chain(spec.outputs.iter().map(|s| (s, PortDir::Output)))
}

/// Merge schema values and block-local variable groups into a port's fresh
/// variables.
fn seed_port(
    tables: &mut Tables,
    locals: &mut Locals,
    vars: PortVars,
    schema: &InferenceCanonicalType,
    block_ref: NodeRef,
    queue: &mut DiagnosticQueue,
) {
    match schema.payload {
        Axis::Inst(payload) => {
            if let Err((left, right)) = tables.payload.assign(vars.payload, payload) {
                queue.push(
                    SolveError::PayloadConflict {
                        left,
                        right,
                        location: block_ref,
                    }
                    .to_diagnostic(),
                );
            }
        }
        Axis::Var(local) => {
            let global = *locals
                .payload
                .entry(local.raw())
                .or_insert_with(|| tables.payload.fresh());
            let _ = tables.payload.union(vars.payload, global);
        }
    }

    match schema.unit {
        Axis::Inst(unit) => {
            if let Err((left, right)) = tables.unit.assign(vars.unit, unit) {
                queue.push(
                    SolveError::UnitConflict {
                        left,
                        right,
                        location: block_ref,
                    }
                    .to_diagnostic(),
                );
            }
        }
        Axis::Var(local) => {
            let global = *locals
                .unit
                .entry(local.raw())
                .or_insert_with(|| tables.unit.fresh());
            let _ = tables.unit.union(vars.unit, global);
        }
    }

    match schema.extent.cardinality {
        Axis::Inst(Cardinality::Zero) => {
            let _ = tables.card.assign(vars.card, CardShape::Zero);
        }
        Axis::Inst(Cardinality::One) => {
            let _ = tables.card.assign(vars.card, CardShape::One);
        }
        Axis::Inst(Cardinality::Many(inner)) => {
            let _ = tables.card.assign(vars.card, CardShape::Many);
            match inner {
                Axis::Inst(instance) => {
                    let _ = tables.instance.assign(vars.instance, instance);
                }
                Axis::Var(local) => {
                    let global = *locals
                        .instance
                        .entry(local.raw())
                        .or_insert_with(|| tables.instance.fresh());
                    let _ = tables.instance.union(vars.instance, global);
                }
            }
        }
        Axis::Var(local) => {
            let global = *locals
                .card
                .entry(local.raw())
                .or_insert_with(|| tables.card.fresh());
            let _ = tables.card.union(vars.card, global);
        }
    }

    match schema.extent.temporality {
        Axis::Inst(value) => {
            let _ = tables.temporality.assign(vars.temporality, value);
        }
        Axis::Var(local) => {
            let global = *locals
                .temporality
                .entry(local.raw())
                .or_insert_with(|| tables.temporality.fresh());
            let _ = tables.temporality.union(vars.temporality, global);
        }
    }

    match schema.extent.binding {
        Axis::Inst(value) => {
            let _ = tables.binding.assign(vars.binding, value);
        }
        Axis::Var(local) => {
            let global = *locals
                .binding
                .entry(local.raw())
                .or_insert_with(|| tables.binding.fresh());
            let _ = tables.binding.union(vars.binding, global);
        }
    }

    match schema.extent.perspective {
        Axis::Inst(value) => {
            let _ = tables.perspective.assign(vars.perspective, value);
        }
        Axis::Var(local) => {
            let global = *locals
                .perspective
                .entry(local.raw())
                .or_insert_with(|| tables.perspective.fresh());
            let _ = tables.perspective.union(vars.perspective, global);
        }
    }

    match schema.extent.branch {
        Axis::Inst(value) => {
            let _ = tables.branch.assign(vars.branch, value);
        }
        Axis::Var(local) => {
            let global = *locals
                .branch
                .entry(local.raw())
                .or_insert_with(|| tables.branch.fresh());
            let _ = tables.branch.union(vars.branch, global);
        }
    }
}

/// Merge two ports' groups on every axis, reporting conflicts at `location`.
fn merge_ports(
    tables: &mut Tables,
    from: PortVars,
    to: PortVars,
    location: NodeRef,
    queue: &mut DiagnosticQueue,
) {
    if let Err((left, right)) = tables.card.union(from.card, to.card) {
        queue.push(
            SolveError::CardinalityConflict {
                left,
                right,
                location,
            }
            .to_diagnostic(),
        );
    }
    if let Err((left, right)) = tables.instance.union(from.instance, to.instance) {
        queue.push(
            SolveError::InstanceConflict {
                left,
                right,
                location,
            }
            .to_diagnostic(),
        );
    }
    if let Err((left, right)) = tables.temporality.union(from.temporality, to.temporality) {
        queue.push(
            SolveError::AxisValueConflict {
                axis: "temporality",
                left: format!("{left:?}"),
                right: format!("{right:?}"),
                location,
            }
            .to_diagnostic(),
        );
    }
    if let Err((left, right)) = tables.binding.union(from.binding, to.binding) {
        let remedy = match (&left, &right) {
            (Binding::Bound(_), Binding::Bound(_)) => Remedy::InsertContinuityOp,
            _ => Remedy::InsertStateOp,
        };
        queue.push(
            SolveError::BindingMismatch {
                left,
                right,
                location,
                remedy,
            }
            .to_diagnostic(),
        );
    }
    if let Err((left, right)) = tables.perspective.union(from.perspective, to.perspective) {
        queue.push(
            SolveError::AxisValueConflict {
                axis: "perspective",
                left: format!("{left:?}"),
                right: format!("{right:?}"),
                location,
            }
            .to_diagnostic(),
        );
    }
    if let Err((left, right)) = tables.branch.union(from.branch, to.branch) {
        queue.push(
            SolveError::AxisValueConflict {
                axis: "branch",
                left: format!("{left:?}"),
                right: format!("{right:?}"),
                location,
            }
            .to_diagnostic(),
        );
    }
    if let Err((left, right)) = tables.unit.union(from.unit, to.unit) {
        queue.push(
            SolveError::UnitConflict {
                left,
                right,
                location,
            }
            .to_diagnostic(),
        );
    }
    if let Err((left, right)) = tables.payload.union(from.payload, to.payload) {
        queue.push(
            SolveError::PayloadConflict {
                left,
                right,
                location,
            }
            .to_diagnostic(),
        );
    }
}

fn assign_card(
    tables: &mut Tables,
    var: CardinalityVar,
    shape: CardShape,
    location: NodeRef,
    queue: &mut DiagnosticQueue,
) {
    if let Err((left, right)) = tables.card.assign(var, shape) {
        queue.push(
            SolveError::CardinalityConflict {
                left,
                right,
                location,
            }
            .to_diagnostic(),
        );
    }
}

/// The zip-broadcast relaxation for `preserve` + `allowZipSig` blocks.
///
/// A group accepts one `many(I)` member plus any number of `one`/`zero`
/// members; the `one` members zip against the field at lowering time, so no
/// adapter block is inserted. Two distinct `many` instances collide as an
/// instance conflict at this block.
fn zip_broadcast(
    tables: &mut Tables,
    spec: &BlockSpec,
    vars_of: &dyn Fn(Name, PortDir) -> Option<PortVars>,
    block_ref: NodeRef,
    queue: &mut DiagnosticQueue,
) {
    let mut many_anchor: Option<PortVars> = None;
    let mut saw_one = false;
    let mut saw_any = false;
    let mut all_resolved = true;

    for schema in &spec.inputs {
        let Some(vars) = vars_of(schema.name, PortDir::Input) else {
            continue;
        };
        saw_any = true;
        match tables.card.value(vars.card) {
            Some(CardShape::Many) => match many_anchor {
                None => many_anchor = Some(vars),
                Some(anchor) => {
                    if let Err((left, right)) =
                        tables.instance.union(anchor.instance, vars.instance)
                    {
                        queue.push(
                            SolveError::InstanceConflict {
                                left,
                                right,
                                location: block_ref,
                            }
                            .to_diagnostic(),
                        );
                    }
                }
            },
            Some(CardShape::One) => saw_one = true,
            Some(CardShape::Zero) => {}
            None => all_resolved = false,
        }
    }

    if !saw_any || !all_resolved {
        // Unconnected or unresolved inputs: the final walk reports them.
        return;
    }

    let shape = if many_anchor.is_some() {
        CardShape::Many
    } else if saw_one {
        CardShape::One
    } else {
        CardShape::Zero
    };

    for schema in &spec.outputs {
        let Some(vars) = vars_of(schema.name, PortDir::Output) else {
            continue;
        };
        assign_card(tables, vars.card, shape, block_ref, queue);
        if let Some(anchor) = many_anchor {
            if let Err((left, right)) = tables.instance.union(anchor.instance, vars.instance) {
                queue.push(
                    SolveError::InstanceConflict {
                        left,
                        right,
                        location: block_ref,
                    }
                    .to_diagnostic(),
                );
            }
        }
    }
}

fn index_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
