use std::panic::{catch_unwind, AssertUnwindSafe};

use indexmap::IndexSet;

use crate::{registry::SingletonRegistry, types::DynError};

/// Teardown of a single component, invoked at most once
pub type DisposeHandle = Box<dyn FnOnce() -> Result<(), DynError> + Send>;

/// Lifecycle of a registry - only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Destroying,
    Destroyed,
}

impl SingletonRegistry {
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.with_state(|state| state.lifecycle)
    }

    /// Registers the teardown of `name`
    ///
    /// Handles run in reverse registration order on shutdown.
    pub fn register_disposable(
        &self,
        name: &str,
        handle: impl FnOnce() -> Result<(), DynError> + Send + 'static,
    ) {
        self.with_state(|state| {
            state
                .disposables
                .insert(name.to_string(), Box::new(handle))
        });
    }

    /// Destroys every registered component and clears the registry
    ///
    /// Teardown failures are logged and never abort the shutdown.
    /// Calling shutdown again is a no-op.
    pub fn shutdown(&self) {
        let names = self.with_state(|state| {
            if state.lifecycle != LifecycleState::Active {
                return None;
            }
            state.lifecycle = LifecycleState::Destroying;
            Some(state.disposables.keys().cloned().collect::<Vec<_>>())
        });
        let Some(names) = names else {
            tracing::debug!("Registry is already shut down");
            return;
        };

        tracing::info!("Destroying {} disposable components", names.len());
        for name in names.iter().rev() {
            self.destroy_singleton(name);
        }

        let _creation = self.state.lock();
        self.cache.clear();
        self.with_state(|state| {
            state.registered.clear();
            state.graph.clear();
            state.disposables.clear();
            // Dropping the senders releases waiters with a shutdown error
            state.waiters.clear();
            state.lifecycle = LifecycleState::Destroyed;
        });
        tracing::info!("Registry shut down");
    }

    /// Destroys `name`, everything depending on it first
    pub fn destroy_singleton(&self, name: &str) {
        let handle = self.take_disposable(name);
        let dependents = self.with_state(|state| state.graph.take_dependents(name));
        self.destroy_component(name, dependents, handle);
        self.with_state(|state| state.graph.remove_component(name));
    }

    /// Tears down what a failed creation of `name` left behind
    ///
    /// Only dependents that are not in `known_dependents` are destroyed,
    /// components depending on `name` from before keep their edges.
    pub(crate) fn discard_failed(&self, name: &str, known_dependents: &IndexSet<String>) {
        let handle = self.take_disposable(name);
        let fresh = self.with_state(|state| {
            let mut fresh = state.graph.dependents_set(name);
            fresh.retain(|dependent| !known_dependents.contains(dependent));
            fresh
        });
        self.destroy_component(name, fresh, handle);
        self.with_state(|state| state.graph.remove_dependencies_of(name));
    }

    fn take_disposable(&self, name: &str) -> Option<DisposeHandle> {
        let _creation = self.state.lock();
        self.cache.remove(name);
        self.with_state(|state| {
            state.registered.shift_remove(name);
            state.disposables.shift_remove(name)
        })
    }

    fn destroy_component(
        &self,
        name: &str,
        dependents: IndexSet<String>,
        handle: Option<DisposeHandle>,
    ) {
        if !dependents.is_empty() {
            tracing::trace!("Destroying dependents of '{name}': {dependents:?}");
        }
        for dependent in &dependents {
            self.destroy_singleton(dependent);
        }

        if let Some(handle) = handle {
            tracing::debug!("Invoking teardown of '{name}'");
            match catch_unwind(AssertUnwindSafe(handle)) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => tracing::warn!("Teardown of '{name}' failed: {error}"),
                Err(_) => tracing::warn!("Teardown of '{name}' panicked"),
            }
        }

        let contained = self.with_state(|state| state.graph.take_contained(name));
        for inner in &contained {
            self.destroy_singleton(inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{errors::RegistryError, types::Instance};

    fn recording(registry: &SingletonRegistry, log: &Arc<Mutex<Vec<String>>>, name: &str) {
        registry.register_singleton(name, Instance::new(name.to_string())).unwrap();
        let log = log.clone();
        let owned = name.to_string();
        registry.register_disposable(name, move || {
            log.lock().unwrap().push(owned);
            Ok(())
        });
    }

    #[test]
    fn teardown_runs_in_reverse_registration_order() {
        let registry = SingletonRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["a", "b", "c"] {
            recording(&registry, &log, name);
        }

        registry.shutdown();

        assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
        assert_eq!(registry.lifecycle_state(), LifecycleState::Destroyed);
        assert_eq!(registry.singleton_count(), 0);
    }

    #[test]
    fn dependents_are_destroyed_first() {
        let registry = SingletonRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recording(&registry, &log, "d");
        recording(&registry, &log, "e");
        registry.record_dependency("e", "d");

        registry.destroy_singleton("e");

        assert_eq!(*log.lock().unwrap(), vec!["d", "e"]);
        assert!(!registry.contains_singleton("d"));
        assert!(registry.dependencies_of("d").is_empty());
    }

    #[test]
    fn outer_container_takes_its_inner_component_along() {
        let registry = SingletonRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recording(&registry, &log, "inner");
        recording(&registry, &log, "outer");
        recording(&registry, &log, "bystander");
        registry.record_containment("inner", "outer");

        registry.destroy_singleton("outer");

        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
        assert!(registry.contains_singleton("bystander"));
    }

    #[test]
    fn failing_teardown_does_not_stop_shutdown() {
        let registry = SingletonRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recording(&registry, &log, "first");
        registry.register_disposable("failing", || Err("socket already closed".into()));
        registry.register_disposable("panicking", || panic!("teardown bug"));
        recording(&registry, &log, "last");

        registry.shutdown();

        assert_eq!(*log.lock().unwrap(), vec!["last", "first"]);
        assert_eq!(registry.lifecycle_state(), LifecycleState::Destroyed);
    }

    #[test]
    fn teardown_cannot_create_components() {
        let registry = Arc::new(SingletonRegistry::new());
        let observed = Arc::new(Mutex::new(None));
        {
            let registry_handle = registry.clone();
            let observed = observed.clone();
            registry.register_disposable("a", move || {
                let attempt = registry_handle.get_or_create("late", || Ok(Instance::new("late")));
                *observed.lock().unwrap() = Some(attempt.map(|_| ()));
                Ok(())
            });
        }

        registry.shutdown();

        let attempt = observed.lock().unwrap().take().unwrap();
        assert!(matches!(attempt, Err(RegistryError::CreationDuringShutdown { .. })));
    }

    #[test]
    fn handles_are_invoked_at_most_once() {
        let registry = SingletonRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recording(&registry, &log, "a");

        registry.destroy_singleton("a");
        registry.shutdown();
        registry.shutdown();

        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }
}
