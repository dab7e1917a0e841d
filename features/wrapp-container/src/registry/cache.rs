use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::Instance;

/// Deferred producer of an early reference
pub type EarlyFactory = Box<dyn FnOnce() -> Instance + Send + Sync>;

/// Construction progress of a singleton
///
/// Finished, Early and Factory are mutually exclusive, a name holds at most one of them.
pub(crate) enum SingletonEntry {
    /// Allocated and in creation, the early reference was not requested yet
    Factory(EarlyFactory),
    /// In creation, the early reference has been handed out
    Early(Instance),
    /// Fully populated and initialized
    Finished(Instance),
}

/// Three tier singleton store
///
/// Reads of finished instances only take the read lock.
/// All writes happen while the owning registry holds its creation lock.
#[derive(Default)]
pub(crate) struct ObjectCache {
    tiers: RwLock<HashMap<String, SingletonEntry>>,
}

impl ObjectCache {
    pub fn finished(&self, name: &str) -> Option<Instance> {
        match self.tiers.read().get(name) {
            Some(SingletonEntry::Finished(instance)) => Some(instance.clone()),
            _ => None,
        }
    }

    pub fn has_finished(&self, name: &str) -> bool {
        matches!(self.tiers.read().get(name), Some(SingletonEntry::Finished(_)))
    }

    pub fn early(&self, name: &str) -> Option<Instance> {
        match self.tiers.read().get(name) {
            Some(SingletonEntry::Early(instance)) => Some(instance.clone()),
            _ => None,
        }
    }

    /// Publishes a finished instance, dropping any early state for the name
    pub fn set_finished(&self, name: &str, instance: Instance) {
        self.tiers
            .write()
            .insert(name.to_string(), SingletonEntry::Finished(instance));
    }

    /// Registers an early factory unless the name is already finished
    ///
    /// Returns false if the factory was ignored
    pub fn set_factory(&self, name: &str, factory: EarlyFactory) -> bool {
        let mut tiers = self.tiers.write();
        if matches!(tiers.get(name), Some(SingletonEntry::Finished(_))) {
            return false;
        }
        tiers.insert(name.to_string(), SingletonEntry::Factory(factory));
        true
    }

    /// Removes and returns the early factory, leaving the name without an entry
    pub fn take_factory(&self, name: &str) -> Option<EarlyFactory> {
        let mut tiers = self.tiers.write();
        if !matches!(tiers.get(name), Some(SingletonEntry::Factory(_))) {
            return None;
        }
        match tiers.remove(name) {
            Some(SingletonEntry::Factory(factory)) => Some(factory),
            _ => None,
        }
    }

    pub fn set_early(&self, name: &str, instance: Instance) {
        self.tiers
            .write()
            .insert(name.to_string(), SingletonEntry::Early(instance));
    }

    /// Removes the name from every tier
    pub fn remove(&self, name: &str) -> bool {
        self.tiers.write().remove(name).is_some()
    }

    pub fn clear(&self) {
        self.tiers.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_is_replaced_by_finished() {
        let cache = ObjectCache::default();
        assert!(cache.set_factory("a", Box::new(|| Instance::new(1_u8))));

        cache.set_finished("a", Instance::new(2_u8));

        assert!(cache.take_factory("a").is_none());
        assert!(cache.early("a").is_none());
        assert_eq!(*cache.finished("a").unwrap().downcast::<u8>().unwrap(), 2);
    }

    #[test]
    fn factory_is_ignored_once_finished() {
        let cache = ObjectCache::default();
        cache.set_finished("a", Instance::new(1_u8));

        assert!(!cache.set_factory("a", Box::new(|| Instance::new(2_u8))));
        assert!(cache.has_finished("a"));
    }

    #[test]
    fn take_factory_consumes_the_entry() {
        let cache = ObjectCache::default();
        cache.set_factory("a", Box::new(|| Instance::new(1_u8)));

        let factory = cache.take_factory("a").unwrap();
        assert!(cache.take_factory("a").is_none());

        cache.set_early("a", factory());
        assert!(cache.early("a").is_some());
        assert!(!cache.has_finished("a"));

        assert!(cache.remove("a"));
        assert!(cache.early("a").is_none());
    }
}
