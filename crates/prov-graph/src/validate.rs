//! Static checks run over module descriptors before anything is scheduled.

use std::collections::{BTreeMap, BTreeSet};

use prov_core::errors::{ErrorInfo, ProvError};
use prov_core::{Identifier, ModuleId, ParameterRegistry};

use crate::descriptor::ModuleDescriptor;
use crate::graph::DependencyGraph;

fn join<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items.into_iter().collect::<Vec<_>>().join(",")
}

/// Rejects duplicate module ids, modules without outputs and outputs declared ESTABLISHED.
///
/// Expects `descriptors` sorted by module id.
pub fn check_descriptors(descriptors: &[ModuleDescriptor]) -> Result<(), ProvError> {
    for pair in descriptors.windows(2) {
        if pair[0].module_id() == pair[1].module_id() {
            return Err(ProvError::DuplicateModule(
                ErrorInfo::new("prov.duplicate_module", "module id registered twice")
                    .with_context("module", pair[0].module_id().as_str()),
            ));
        }
    }
    for descriptor in descriptors {
        if descriptor.writes().is_empty() {
            return Err(ProvError::InvalidDescriptor(
                ErrorInfo::new("prov.no_outputs", "module declares no outputs")
                    .with_context("module", descriptor.module_id().as_str()),
            ));
        }
        if let Some((id, _)) = descriptor
            .writes()
            .iter()
            .find(|(_, class)| !class.is_computed())
        {
            return Err(ProvError::InvalidDescriptor(
                ErrorInfo::new(
                    "prov.established_output",
                    "modules may only declare DERIVED or PREDICTED outputs",
                )
                .with_context("module", descriptor.module_id().as_str())
                .with_context("id", id.as_str()),
            ));
        }
    }
    Ok(())
}

/// Rejects a module that reads an identifier it also writes.
pub fn check_self_loops(descriptors: &[ModuleDescriptor]) -> Result<(), ProvError> {
    for descriptor in descriptors {
        if descriptor.reads().iter().any(|id| descriptor.produces(id)) {
            let module = descriptor.module_id().clone();
            return Err(ProvError::cycle(vec![module.clone(), module]));
        }
    }
    Ok(())
}

/// Maps every written identifier to its single producer.
pub fn collect_producers(
    descriptors: &[ModuleDescriptor],
    established: &BTreeSet<Identifier>,
) -> Result<BTreeMap<Identifier, ModuleId>, ProvError> {
    let mut claimants: BTreeMap<&Identifier, Vec<&ModuleId>> = BTreeMap::new();
    for descriptor in descriptors {
        for id in descriptor.writes().keys() {
            claimants.entry(id).or_default().push(descriptor.module_id());
        }
    }

    let mut producers = BTreeMap::new();
    for (id, modules) in claimants {
        if modules.len() > 1 {
            return Err(ProvError::AmbiguousProducer(
                ErrorInfo::new("prov.ambiguous_producer", "identifier written by several modules")
                    .with_context("id", id.as_str())
                    .with_context("claimants", join(modules.iter().map(|m| m.as_str()))),
            ));
        }
        let module = modules[0];
        if established.contains(id) {
            return Err(ProvError::override_violation(
                "prov.writes_established",
                id,
                module,
                "module declares an output that is established",
            ));
        }
        producers.insert(id.clone(), module.clone());
    }
    Ok(producers)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    NotVisited,
    Visiting,
    Visited,
}

/// Three-colour depth-first search over `producer -> consumers` adjacency.
///
/// Returns the first cycle found, as ordered module ids with the entry module
/// repeated at the end. Nodes and neighbours are visited in ascending order.
pub fn find_cycle(adjacency: &BTreeMap<ModuleId, BTreeSet<ModuleId>>) -> Option<Vec<ModuleId>> {
    let mut states: BTreeMap<&ModuleId, VisitState> = BTreeMap::new();
    for (node, neighbours) in adjacency {
        states.insert(node, VisitState::NotVisited);
        for neighbour in neighbours {
            states.entry(neighbour).or_insert(VisitState::NotVisited);
        }
    }
    let nodes: Vec<&ModuleId> = states.keys().copied().collect();
    let mut stack = Vec::new();
    for node in nodes {
        if let Some(cycle) = dfs(node, adjacency, &mut states, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

fn dfs<'a>(
    node: &'a ModuleId,
    adjacency: &'a BTreeMap<ModuleId, BTreeSet<ModuleId>>,
    states: &mut BTreeMap<&'a ModuleId, VisitState>,
    stack: &mut Vec<&'a ModuleId>,
) -> Option<Vec<ModuleId>> {
    match states.get(node).copied().unwrap_or(VisitState::NotVisited) {
        VisitState::Visiting => {
            let start = stack.iter().position(|entry| *entry == node)?;
            let mut cycle: Vec<ModuleId> = stack[start..].iter().map(|m| (*m).clone()).collect();
            cycle.push(node.clone());
            Some(cycle)
        }
        VisitState::Visited => None,
        VisitState::NotVisited => {
            states.insert(node, VisitState::Visiting);
            stack.push(node);
            if let Some(neighbours) = adjacency.get(node) {
                for neighbour in neighbours {
                    if let Some(cycle) = dfs(neighbour, adjacency, states, stack) {
                        return Some(cycle);
                    }
                }
            }
            stack.pop();
            states.insert(node, VisitState::Visited);
            None
        }
    }
}

/// Every read identifier must be established or written by exactly one module.
pub fn check_completeness(
    descriptors: &[ModuleDescriptor],
    producers: &BTreeMap<Identifier, ModuleId>,
    established: &BTreeSet<Identifier>,
) -> Result<(), ProvError> {
    for descriptor in descriptors {
        for id in descriptor.reads() {
            if !established.contains(id) && !producers.contains_key(id) {
                return Err(ProvError::MissingProducer(
                    ErrorInfo::new(
                        "prov.missing_producer",
                        "input is neither established nor produced by any module",
                    )
                    .with_context("id", id.as_str())
                    .with_context("module", descriptor.module_id().as_str())
                    .with_hint("declare the value as established or register its producer"),
                ));
            }
        }
    }
    Ok(())
}

/// Rejects a module claiming an identifier whose record another module owns.
pub fn check_ownership(
    graph: &DependencyGraph,
    registry: &ParameterRegistry,
) -> Result<(), ProvError> {
    for (id, module) in graph.producers() {
        if registry.is_established(id) {
            return Err(ProvError::override_violation(
                "prov.writes_established",
                id,
                module,
                "module declares an output that is established",
            ));
        }
        if let Some(owner) = registry.owner(id) {
            if owner != module {
                return Err(ProvError::OverrideViolation(
                    ErrorInfo::new(
                        "prov.ownership_changed",
                        "identifier already owned by a different module",
                    )
                    .with_context("id", id.as_str())
                    .with_context("module", module.as_str())
                    .with_context("owner", owner.as_str())
                    .with_hint("release the identifier to reassign it explicitly"),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacency(edges: &[(&str, &str)]) -> BTreeMap<ModuleId, BTreeSet<ModuleId>> {
        let mut map: BTreeMap<ModuleId, BTreeSet<ModuleId>> = BTreeMap::new();
        for (from, to) in edges {
            map.entry(ModuleId::from(*from))
                .or_default()
                .insert(ModuleId::from(*to));
        }
        map
    }

    fn ids(path: &[&str]) -> Vec<ModuleId> {
        path.iter().map(|id| ModuleId::from(*id)).collect()
    }

    #[test]
    fn acyclic_adjacency_has_no_cycle() {
        let graph = adjacency(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert_eq!(find_cycle(&graph), None);
    }

    #[test]
    fn cycle_path_excludes_the_approach() {
        let graph = adjacency(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "b")]);
        assert_eq!(find_cycle(&graph), Some(ids(&["b", "c", "d", "b"])));
    }

    #[test]
    fn self_edge_is_a_cycle() {
        let graph = adjacency(&[("x", "x")]);
        assert_eq!(find_cycle(&graph), Some(ids(&["x", "x"])));
    }
}
