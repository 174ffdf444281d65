//! Producer/consumer dependency graph and its scheduling waves.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use prov_core::{Identifier, ModuleId, ProvError};
use tracing::debug;

use crate::descriptor::ModuleDescriptor;
use crate::validate;

/// Directed graph over module ids with an edge `producer -> consumer` wherever
/// the consumer reads something the producer writes.
///
/// Construction runs every static check, so a built graph is always acyclic,
/// unambiguous and complete with respect to the supplied established set.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    modules: BTreeMap<ModuleId, ModuleDescriptor>,
    producers: BTreeMap<Identifier, ModuleId>,
    established: BTreeSet<Identifier>,
    downstream: BTreeMap<ModuleId, BTreeSet<ModuleId>>,
    upstream: BTreeMap<ModuleId, BTreeSet<ModuleId>>,
}

impl DependencyGraph {
    /// Validates the descriptors and builds the graph.
    pub fn build<I>(descriptors: I, established: &BTreeSet<Identifier>) -> Result<Self, ProvError>
    where
        I: IntoIterator<Item = ModuleDescriptor>,
    {
        let mut descriptors: Vec<ModuleDescriptor> = descriptors.into_iter().collect();
        descriptors.sort_by(|a, b| a.module_id().cmp(b.module_id()));

        validate::check_descriptors(&descriptors)?;
        validate::check_self_loops(&descriptors)?;
        let producers = validate::collect_producers(&descriptors, established)?;

        let mut downstream: BTreeMap<ModuleId, BTreeSet<ModuleId>> = BTreeMap::new();
        let mut upstream: BTreeMap<ModuleId, BTreeSet<ModuleId>> = BTreeMap::new();
        for descriptor in &descriptors {
            let consumer = descriptor.module_id();
            downstream.entry(consumer.clone()).or_default();
            let entry = upstream.entry(consumer.clone()).or_default();
            for id in descriptor.reads() {
                if let Some(producer) = producers.get(id) {
                    entry.insert(producer.clone());
                }
            }
        }
        for (consumer, producers_of) in &upstream {
            for producer in producers_of {
                downstream
                    .entry(producer.clone())
                    .or_default()
                    .insert(consumer.clone());
            }
        }

        if let Some(path) = validate::find_cycle(&downstream) {
            return Err(ProvError::cycle(path));
        }
        validate::check_completeness(&descriptors, &producers, established)?;

        debug!(
            modules = descriptors.len(),
            outputs = producers.len(),
            established = established.len(),
            "dependency graph built"
        );
        Ok(Self {
            modules: descriptors
                .into_iter()
                .map(|descriptor| (descriptor.module_id().clone(), descriptor))
                .collect(),
            producers,
            established: established.clone(),
            downstream,
            upstream,
        })
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the graph has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Descriptors in ascending module id order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    /// Descriptor for `module`.
    pub fn descriptor(&self, module: &ModuleId) -> Option<&ModuleDescriptor> {
        self.modules.get(module)
    }

    /// Output identifier to producing module.
    pub fn producers(&self) -> &BTreeMap<Identifier, ModuleId> {
        &self.producers
    }

    /// Module producing `id`, if any.
    pub fn producer_of(&self, id: &Identifier) -> Option<&ModuleId> {
        self.producers.get(id)
    }

    /// Established identifiers the graph was validated against.
    pub fn established(&self) -> &BTreeSet<Identifier> {
        &self.established
    }

    /// Every identifier read by some module.
    pub fn referenced_identifiers(&self) -> BTreeSet<&Identifier> {
        self.modules
            .values()
            .flat_map(|descriptor| descriptor.reads().iter())
            .collect()
    }

    /// Modules that directly consume an output of `module`.
    pub fn dependents(&self, module: &ModuleId) -> impl Iterator<Item = &ModuleId> {
        self.downstream.get(module).into_iter().flatten()
    }

    /// Modules whose outputs `module` consumes directly.
    pub fn dependencies(&self, module: &ModuleId) -> impl Iterator<Item = &ModuleId> {
        self.upstream.get(module).into_iter().flatten()
    }

    /// Every module reachable downstream of `module`, excluding itself.
    pub fn transitive_dependents(&self, module: &ModuleId) -> BTreeSet<ModuleId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&ModuleId> = self.dependents(module).collect();
        while let Some(next) = queue.pop_front() {
            if seen.insert(next.clone()) {
                queue.extend(self.dependents(next));
            }
        }
        seen
    }

    /// Number of distinct upstream producers per module.
    pub fn in_degrees(&self) -> BTreeMap<ModuleId, usize> {
        self.modules
            .keys()
            .map(|module| (module.clone(), self.dependencies(module).count()))
            .collect()
    }

    /// Kahn levels: each wave holds the modules that become eligible once every
    /// earlier wave has run, in ascending id order.
    pub fn waves(&self) -> Vec<Vec<ModuleId>> {
        let mut in_degree = self.in_degrees();
        let mut current: Vec<ModuleId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(module, _)| module.clone())
            .collect();
        let mut waves = Vec::new();
        while !current.is_empty() {
            current.sort();
            let mut next = Vec::new();
            for module in &current {
                for dependent in self.dependents(module) {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(dependent.clone());
                        }
                    }
                }
            }
            waves.push(current);
            current = next;
        }
        waves
    }

    /// Concatenation of [`DependencyGraph::waves`].
    pub fn topological_order(&self) -> Vec<ModuleId> {
        self.waves().into_iter().flatten().collect()
    }
}
