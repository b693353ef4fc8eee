//! Dependency declarations and the dependency graph of loaded plugins.
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

/// Parses a comma-separated dependency string such as `"settings, window"`.
///
/// Surrounding whitespace is trimmed and empty entries are ignored, so an
/// empty string declares no dependencies.
pub fn parse_dependency_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Error that can occur when resolving dependencies
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DependencyError {
    /// Dependency cycle detected
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// A plugin listing itself as a dependency
    #[error("Plugin '{0}' depends on itself")]
    SelfDependency(String),
}

/// Dependency edges between loaded plugins.
///
/// Every node keeps its dependencies in declaration order; the reverse
/// edges (dependents) are kept sorted so iteration is deterministic.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    dependencies: BTreeMap<String, Vec<String>>,
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` with its declared dependencies. Re-adding a node replaces its edges.
    pub fn add_node(&mut self, name: &str, dependencies: &[String]) -> Result<(), DependencyError> {
        if dependencies.iter().any(|dep| dep == name) {
            return Err(DependencyError::SelfDependency(name.to_string()));
        }
        self.remove_node(name);

        for dep in dependencies {
            self.dependents.entry(dep.clone()).or_default().insert(name.to_string());
        }
        self.dependencies.insert(name.to_string(), dependencies.to_vec());
        self.dependents.entry(name.to_string()).or_default();
        Ok(())
    }

    /// Removes `name` and its outgoing edges. Edges pointing at it from
    /// other nodes are left for the caller to have checked first.
    pub fn remove_node(&mut self, name: &str) {
        if let Some(deps) = self.dependencies.remove(name) {
            for dep in deps {
                if let Some(set) = self.dependents.get_mut(&dep) {
                    set.remove(name);
                }
            }
        }
        if self.dependents.get(name).is_some_and(BTreeSet::is_empty) {
            self.dependents.remove(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.dependencies.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Plugins in the graph that declared `name` as a dependency, sorted
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.dependents
            .get(name)
            .map(|set| set.iter().filter(|d| self.contains(d)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_dependents(&self, name: &str) -> bool {
        self.dependents
            .get(name)
            .is_some_and(|set| set.iter().any(|d| self.contains(d)))
    }

    /// Kahn's algorithm over the graph: a node is emitted once nothing left
    /// in the queue depends on it, so dependents come before their dependencies.
    pub fn teardown_order(&self) -> Result<Vec<String>, DependencyError> {
        let mut in_degree: BTreeMap<&str, usize> = self.dependencies.keys().map(|id| (id.as_str(), 0)).collect();
        for deps in self.dependencies.values() {
            for dep in deps {
                if let Some(degree) = in_degree.get_mut(dep.as_str()) {
                    *degree += 1;
                }
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.dependencies.len());

        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            for dep in self.dependencies_of(id).iter().rev() {
                if let Some(degree) = in_degree.get_mut(dep.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dep.as_str());
                    }
                }
            }
        }

        if order.len() == self.dependencies.len() {
            Ok(order)
        } else {
            let cycle_nodes = self
                .dependencies
                .keys()
                .filter(|id| !order.contains(*id))
                .cloned()
                .collect();
            Err(DependencyError::CyclicDependency(cycle_nodes))
        }
    }

    /// Dependencies before dependents
    pub fn load_order(&self) -> Result<Vec<String>, DependencyError> {
        let mut order = self.teardown_order()?;
        order.reverse();
        Ok(order)
    }
}
