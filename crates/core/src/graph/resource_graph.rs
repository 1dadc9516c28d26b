use std::collections::{BTreeSet, HashMap};

use super::policy::{policy_document, Action, ResourceArn, RoleGrant};
use super::tokens::reference;
use super::{LogicalId, ResourceDescriptor, ResourceKind};
use crate::error::GraphError;

/// The in-progress resource graph of one synthesis pass.
///
/// Descriptors can only depend on descriptors added before them, so the
/// insertion order is always a valid build order. Nothing is mutated once
/// added.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    descriptors: Vec<ResourceDescriptor>,
    index: HashMap<LogicalId, usize>,
    grants: HashMap<LogicalId, BTreeSet<(ResourceArn, Action)>>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor after checking its id is free and every dependency exists.
    pub fn add(&mut self, descriptor: ResourceDescriptor) -> Result<LogicalId, GraphError> {
        if self.index.contains_key(&descriptor.logical_id) {
            return Err(GraphError::DuplicateLogicalId(
                descriptor.logical_id.to_string(),
            ));
        }

        for dependency in descriptor.dependencies() {
            if !self.index.contains_key(&dependency) {
                return Err(GraphError::UnknownDependency {
                    descriptor: descriptor.logical_id.to_string(),
                    dependency: dependency.to_string(),
                });
            }
        }

        let id = descriptor.logical_id.clone();
        self.index.insert(id.clone(), self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(id)
    }

    /// Records a grant on a role.
    ///
    /// Pairs the role already holds are skipped. If anything new remains, a
    /// policy descriptor named `policy_id` carrying just those pairs is added
    /// and its id returned; otherwise nothing is added and `None` is returned.
    pub fn grant(
        &mut self,
        policy_id: &str,
        grant: RoleGrant,
    ) -> Result<Option<LogicalId>, GraphError> {
        match self.get(&grant.principal) {
            None => return Err(GraphError::UnknownPrincipal(grant.principal.to_string())),
            Some(d) if d.kind != ResourceKind::Role => {
                return Err(GraphError::NotARole(grant.principal.to_string()))
            }
            Some(_) => {}
        }

        for target in grant.resources.iter().filter_map(ResourceArn::target) {
            if !self.contains(target) {
                return Err(GraphError::UnknownDependency {
                    descriptor: policy_id.to_string(),
                    dependency: target.to_string(),
                });
            }
        }

        let held = self.grants.get(&grant.principal);
        let fresh: BTreeSet<(ResourceArn, Action)> = grant
            .pairs()
            .filter(|pair| held.is_none_or(|held| !held.contains(pair)))
            .collect();

        if fresh.is_empty() {
            return Ok(None);
        }

        let policy = ResourceDescriptor::new(policy_id, ResourceKind::Policy)
            .property("PolicyName", policy_id)
            .property("Roles", vec![reference(&grant.principal)])
            .property("PolicyDocument", policy_document(&fresh));
        let id = self.add(policy)?;

        self.grants
            .entry(grant.principal)
            .or_default()
            .extend(fresh);

        Ok(Some(id))
    }

    /// Every `(resource, action)` pair granted to `principal` so far.
    pub fn grants_for(&self, principal: &LogicalId) -> BTreeSet<(ResourceArn, Action)> {
        self.grants.get(principal).cloned().unwrap_or_default()
    }

    pub fn get(&self, id: &LogicalId) -> Option<&ResourceDescriptor> {
        self.index.get(id).map(|&i| &self.descriptors[i])
    }

    pub fn contains(&self, id: &LogicalId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.descriptors.iter()
    }

    /// Descriptors of one kind, in insertion order.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceDescriptor> {
        self.descriptors.iter().filter(move |d| d.kind == kind)
    }

    /// Kahn's algorithm over dependency edges. Ties keep insertion order.
    pub fn topological_order(&self) -> Result<Vec<&LogicalId>, GraphError> {
        let count = self.descriptors.len();
        let mut in_degree = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (i, descriptor) in self.descriptors.iter().enumerate() {
            for dependency in descriptor.dependencies() {
                let Some(&j) = self.index.get(&dependency) else {
                    return Err(GraphError::UnknownDependency {
                        descriptor: descriptor.logical_id.to_string(),
                        dependency: dependency.to_string(),
                    });
                };
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }

        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(i) = ready.pop_first() {
            order.push(&self.descriptors[i].logical_id);
            for &k in &dependents[i] {
                in_degree[k] -= 1;
                if in_degree[k] == 0 {
                    ready.insert(k);
                }
            }
        }

        if order.len() != count {
            let stuck = (0..count)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.descriptors[i].logical_id.to_string())
                .collect();
            return Err(GraphError::Cycle(stuck));
        }

        Ok(order)
    }
}
