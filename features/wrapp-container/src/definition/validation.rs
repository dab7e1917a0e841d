use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::{aliases::AliasRegistry, definition::DefinitionStore};

/// Declared depends-on graph of all definitions
/// Used to check for missing and circular initialization order before anything is built
pub struct DefinitionGraph {
    map: BTreeMap<String, Vec<String>>,
    prebuilt: HashSet<String>,
}
impl DefinitionGraph {
    pub fn new(
        store: &dyn DefinitionStore,
        aliases: &AliasRegistry,
        prebuilt: impl IntoIterator<Item = String>,
    ) -> Self {
        let map = store
            .names()
            .into_iter()
            .filter_map(|name| {
                let definition = store.definition(&name)?;
                let depends_on = definition
                    .depends_on
                    .iter()
                    .map(|dependency| aliases.canonical_name(dependency))
                    .collect();
                Some((name, depends_on))
            })
            .collect();

        Self {
            map,
            prebuilt: prebuilt.into_iter().collect(),
        }
    }

    /// Validate the graph
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();
        for name in self.map.keys() {
            let mut dependency_chain = Vec::new();
            check_recurse(self, &mut checked, &mut errors, &mut dependency_chain, name);
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn check_recurse<'a>(
            graph: &'a DefinitionGraph,
            checked: &mut HashSet<&'a str>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<&'a str>,
            name: &'a str,
        ) {
            // Circular Dependency Check
            if let Some(start) = dependency_chain.iter().position(|entry| *entry == name) {
                let mut chain: Vec<String> = dependency_chain[start..]
                    .iter()
                    .map(|entry| entry.to_string())
                    .collect();
                chain.push(name.to_string()); // Add current so chain is complete

                errors.push(DependencyGraphError::CircularDependency {
                    from: chain[0].clone(),
                    to: dependency_chain[dependency_chain.len() - 1].to_string(),
                    chain,
                });
                return;
            }

            // Skip other checks if already checked
            if !checked.insert(name) {
                return;
            };

            let Some(dependencies) = graph.map.get(name) else {
                return;
            };

            dependency_chain.push(name);
            for dependency in dependencies {
                if !graph.map.contains_key(dependency) {
                    if !graph.prebuilt.contains(dependency) {
                        errors.push(DependencyGraphError::MissingDependency {
                            dependency: dependency.clone(),
                            required_by: name.to_string(),
                        });
                    }
                    continue;
                }

                check_recurse(graph, checked, errors, dependency_chain, dependency);
            }
            dependency_chain.pop();
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyGraphError {
    #[error("A component has been defined twice: '{0}'")]
    Duplicate(String),
    #[error("'{required_by}' depends on '{dependency}' but it is missing")]
    MissingDependency {
        dependency: String,
        required_by: String,
    },
    #[error("A circular depends-on relationship exists between '{from}' and '{to}' through {chain:?}")]
    CircularDependency {
        from: String,
        to: String,
        chain: Vec<String>,
    },
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The component definitions had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}
