use indexmap::IndexMap;

use crate::errors::AliasError;

/// Alternative names of components
///
/// Aliases may point to other aliases, [AliasRegistry::canonical_name] follows the chain.
#[derive(Default, Clone, Debug)]
pub struct AliasRegistry {
    /// alias -> name
    aliases: IndexMap<String, String>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `alias` for `name`
    ///
    /// An alias equal to its name is removed. Re-pointing an existing alias is allowed.
    pub fn register_alias(&mut self, name: &str, alias: &str) -> Result<(), AliasError> {
        if name == alias {
            if self.aliases.shift_remove(alias).is_some() {
                tracing::debug!("Alias '{alias}' equals its name, removed it");
            }
            return Ok(());
        }

        if let Some(existing) = self.aliases.get(alias) {
            if existing == name {
                return Ok(());
            }
            tracing::debug!("Overriding alias '{alias}': '{existing}' -> '{name}'");
        }

        if self.resolves_to(name, alias) {
            return Err(AliasError::Circular {
                name: name.to_string(),
                alias: alias.to_string(),
            });
        }

        self.aliases.insert(alias.to_string(), name.to_string());
        tracing::trace!("Registered alias '{alias}' for '{name}'");
        Ok(())
    }

    pub fn remove_alias(&mut self, alias: &str) -> Result<(), AliasError> {
        match self.aliases.shift_remove(alias) {
            Some(_) => Ok(()),
            None => Err(AliasError::NotRegistered(alias.to_string())),
        }
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// All aliases of `name`, including aliases of aliases
    pub fn aliases(&self, name: &str) -> Vec<String> {
        let mut found = Vec::new();
        self.collect_aliases(name, &mut found);
        found
    }

    fn collect_aliases(&self, name: &str, found: &mut Vec<String>) {
        for (alias, target) in &self.aliases {
            if target == name && !found.contains(alias) {
                found.push(alias.clone());
                self.collect_aliases(alias, found);
            }
        }
    }

    /// Follows the alias chain down to the real name
    pub fn canonical_name(&self, name: &str) -> String {
        let mut current = name;
        while let Some(target) = self.aliases.get(current) {
            current = target;
        }
        current.to_string()
    }

    /// Does following the chain from `start` reach `target`
    fn resolves_to(&self, start: &str, target: &str) -> bool {
        let mut current = start;
        while let Some(next) = self.aliases.get(current) {
            if next == target {
                return true;
            }
            current = next;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_resolve_to_the_real_name() {
        let mut aliases = AliasRegistry::new();
        aliases.register_alias("dataSource", "db").unwrap();
        aliases.register_alias("db", "primary").unwrap();

        assert_eq!(aliases.canonical_name("primary"), "dataSource");
        assert_eq!(aliases.canonical_name("dataSource"), "dataSource");
        assert_eq!(aliases.aliases("dataSource"), vec!["db", "primary"]);
        assert!(aliases.is_alias("db"));
        assert!(!aliases.is_alias("dataSource"));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut aliases = AliasRegistry::new();
        aliases.register_alias("a", "b").unwrap();
        aliases.register_alias("b", "c").unwrap();

        let err = aliases.register_alias("c", "a").unwrap_err();

        assert_eq!(
            err,
            AliasError::Circular {
                name: "c".to_string(),
                alias: "a".to_string()
            }
        );
        assert_eq!(aliases.canonical_name("c"), "a");
    }

    #[test]
    fn alias_equal_to_name_removes_it() {
        let mut aliases = AliasRegistry::new();
        aliases.register_alias("a", "b").unwrap();

        aliases.register_alias("b", "b").unwrap();

        assert!(!aliases.is_alias("b"));
        assert_eq!(
            aliases.remove_alias("b").unwrap_err(),
            AliasError::NotRegistered("b".to_string())
        );
    }

    #[test]
    fn aliases_can_be_repointed() {
        let mut aliases = AliasRegistry::new();
        aliases.register_alias("a", "current").unwrap();

        aliases.register_alias("b", "current").unwrap();

        assert_eq!(aliases.canonical_name("current"), "b");
        assert!(aliases.aliases("a").is_empty());
    }
}
