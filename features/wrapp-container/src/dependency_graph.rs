use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};

/// Runtime dependency edges between components
///
/// Used to order teardown: everything depending on a component is destroyed before it.
/// Edges are only ever added, until the component they belong to is destroyed.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// dependee -> components depending on it
    dependents: IndexMap<String, IndexSet<String>>,
    /// dependent -> components it depends on
    dependencies: IndexMap<String, IndexSet<String>>,
    /// outer -> inner components living inside it
    contained: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    /// Records that `dependent` depends on `dependee`
    ///
    /// Returns false if the edge was already known
    pub fn record_dependency(&mut self, dependee: &str, dependent: &str) -> bool {
        if !self
            .dependents
            .entry(dependee.to_string())
            .or_default()
            .insert(dependent.to_string())
        {
            return false;
        }

        self.dependencies
            .entry(dependent.to_string())
            .or_default()
            .insert(dependee.to_string());
        true
    }

    /// Records that `inner` only exists nested inside `outer`
    ///
    /// The outer component is registered as dependent on the inner one,
    /// so the outer component is torn down first and takes the inner one with it.
    pub fn record_containment(&mut self, inner: &str, outer: &str) -> bool {
        if !self
            .contained
            .entry(outer.to_string())
            .or_default()
            .insert(inner.to_string())
        {
            return false;
        }

        self.record_dependency(inner, outer);
        true
    }

    /// Is `dependent` reachable from `name` over dependents edges
    pub fn is_dependent(&self, name: &str, dependent: &str) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![name];

        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(dependents) = self.dependents.get(current) else {
                continue;
            };
            if dependents.contains(dependent) {
                return true;
            }
            stack.extend(dependents.iter().map(String::as_str));
        }

        false
    }

    pub fn has_dependents(&self, name: &str) -> bool {
        self.dependents.contains_key(name)
    }

    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        collect(self.dependents.get(name))
    }

    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        collect(self.dependencies.get(name))
    }

    pub fn contained_in(&self, outer: &str) -> Vec<String> {
        collect(self.contained.get(outer))
    }

    pub(crate) fn dependents_set(&self, name: &str) -> IndexSet<String> {
        self.dependents.get(name).cloned().unwrap_or_default()
    }

    pub(crate) fn take_dependents(&mut self, name: &str) -> IndexSet<String> {
        self.dependents.shift_remove(name).unwrap_or_default()
    }

    pub(crate) fn take_contained(&mut self, name: &str) -> IndexSet<String> {
        self.contained.shift_remove(name).unwrap_or_default()
    }

    /// Strips a destroyed component out of every record
    pub(crate) fn remove_component(&mut self, name: &str) {
        self.dependents.retain(|_, dependents| {
            dependents.shift_remove(name);
            !dependents.is_empty()
        });
        self.dependencies.retain(|_, dependencies| {
            dependencies.shift_remove(name);
            !dependencies.is_empty()
        });
        self.contained.retain(|_, contained| {
            contained.shift_remove(name);
            !contained.is_empty()
        });
        self.dependents.shift_remove(name);
        self.dependencies.shift_remove(name);
        self.contained.shift_remove(name);
    }

    /// Drops the edges `name` recorded as a dependent, keeping the ones pointing at it
    pub(crate) fn remove_dependencies_of(&mut self, name: &str) {
        for dependee in self.dependencies.shift_remove(name).unwrap_or_default() {
            if let Some(dependents) = self.dependents.get_mut(&dependee) {
                dependents.shift_remove(name);
                if dependents.is_empty() {
                    self.dependents.shift_remove(&dependee);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
        self.dependencies.clear();
        self.contained.clear();
    }
}

fn collect(set: Option<&IndexSet<String>>) -> Vec<String> {
    set.map(|set| set.iter().cloned().collect())
        .unwrap_or_default()
}
