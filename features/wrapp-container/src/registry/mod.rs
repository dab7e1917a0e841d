//! Registry of shared component instances
//!
//! The registry owns the three cache tiers, the set of names in creation,
//! the dependency edges and the teardown handles. Every mutation goes through
//! one reentrant creation lock, so a thread creating a component can recursively
//! create its dependencies while other threads wait.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
};

use futures::{future::BoxFuture, FutureExt};
use futures_channel::oneshot;
use indexmap::{IndexMap, IndexSet};
use parking_lot::ReentrantMutex;

use crate::{
    dependency_graph::DependencyGraph,
    errors::{RegistryError, WaitError},
    types::{DynError, Instance},
};

pub mod cache;
mod creation;
mod disposal;

pub use cache::EarlyFactory;
pub(crate) use creation::creation_failed;
pub use disposal::{DisposeHandle, LifecycleState};

use cache::ObjectCache;

type ReadySender = oneshot::Sender<Result<Instance, WaitError>>;

/// Registry of shared component instances
pub struct SingletonRegistry {
    cache: ObjectCache,
    state: ReentrantMutex<RefCell<RegistryState>>,
}

struct RegistryState {
    /// Names with a finished instance or an exposed early reference, in registration order
    registered: IndexSet<String>,
    in_creation: HashSet<String>,
    in_creation_exclusions: HashSet<String>,
    /// Collects swallowed errors while an outermost creation runs
    suppressed: Option<Vec<DynError>>,
    lifecycle: LifecycleState,
    graph: DependencyGraph,
    disposables: IndexMap<String, DisposeHandle>,
    waiters: HashMap<String, Vec<ReadySender>>,
}

impl Default for SingletonRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SingletonRegistry {
    pub fn new() -> Self {
        SingletonRegistry {
            cache: ObjectCache::default(),
            state: ReentrantMutex::new(RefCell::new(RegistryState {
                registered: IndexSet::new(),
                in_creation: HashSet::new(),
                in_creation_exclusions: HashSet::new(),
                suppressed: None,
                lifecycle: LifecycleState::Active,
                graph: DependencyGraph::default(),
                disposables: IndexMap::new(),
                waiters: HashMap::new(),
            })),
        }
    }

    /// Runs `f` on the locked state
    ///
    /// `f` must not call back into user code, the state stays borrowed while it runs.
    fn with_state<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Looks up a singleton
    ///
    /// Finished instances are always returned. Early references are only returned with
    /// `allow_early` while the name is in creation; a pending early factory is invoked
    /// at most once and its result cached.
    pub fn lookup(&self, name: &str, allow_early: bool) -> Option<Instance> {
        if let Some(instance) = self.cache.finished(name) {
            return Some(instance);
        }
        if !allow_early {
            return None;
        }

        let _creation = self.state.lock();
        if let Some(instance) = self.cache.finished(name) {
            return Some(instance);
        }
        if !self.is_singleton_currently_in_creation(name) {
            return None;
        }
        if let Some(instance) = self.cache.early(name) {
            return Some(instance);
        }

        let factory = self.cache.take_factory(name)?;
        let early = factory();
        tracing::trace!("Exposed early reference of '{name}'");
        self.cache.set_early(name, early.clone());
        Some(early)
    }

    /// Early reference of a name in creation, without invoking a pending factory
    pub(crate) fn early_reference(&self, name: &str) -> Option<Instance> {
        let _creation = self.state.lock();
        self.cache.early(name)
    }

    /// Registers a prebuilt instance
    ///
    /// Fails if any instance is already finished under the name.
    pub fn register_singleton(&self, name: &str, instance: Instance) -> Result<(), RegistryError> {
        let _creation = self.state.lock();
        if self.cache.has_finished(name) {
            return Err(RegistryError::DuplicateRegistration {
                name: name.to_string(),
            });
        }
        self.add_finished(name, instance)
    }

    /// Promotes an instance to the finished tier and informs waiters
    ///
    /// Re-publishing the identical instance is tolerated.
    pub(crate) fn add_finished(&self, name: &str, instance: Instance) -> Result<(), RegistryError> {
        let _creation = self.state.lock();
        if let Some(existing) = self.cache.finished(name) {
            if !existing.same(&instance) {
                return Err(RegistryError::DuplicateRegistration {
                    name: name.to_string(),
                });
            }
        }

        self.cache.set_finished(name, instance.clone());
        let waiters = self.with_state(|state| {
            state.registered.insert(name.to_string());
            state.waiters.remove(name).unwrap_or_default()
        });
        for waiter in waiters {
            // Receiver dropped - nobody is waiting anymore
            let _ = waiter.send(Ok(instance.clone()));
        }
        Ok(())
    }

    /// Registers a producer of the early reference for a name in creation
    ///
    /// Ignored if the name has already been finished.
    pub fn register_factory(
        &self,
        name: &str,
        factory: impl FnOnce() -> Instance + Send + Sync + 'static,
    ) {
        let _creation = self.state.lock();
        if self.cache.set_factory(name, Box::new(factory)) {
            tracing::trace!("Registered early factory for '{name}'");
            self.with_state(|state| state.registered.insert(name.to_string()));
        } else {
            tracing::debug!("Ignored early factory for '{name}', it is already finished");
        }
    }

    /// Removes the name from every cache tier
    pub fn evict(&self, name: &str) {
        let _creation = self.state.lock();
        self.cache.remove(name);
        self.with_state(|state| state.registered.shift_remove(name));
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.cache.has_finished(name)
    }

    /// Registered names in registration order
    pub fn singleton_names(&self) -> Vec<String> {
        self.with_state(|state| state.registered.iter().cloned().collect())
    }

    pub fn singleton_count(&self) -> usize {
        self.with_state(|state| state.registered.len())
    }

    /// Resolves once `name` is finished
    ///
    /// Fails if the current creation of `name` fails, or the registry shuts down first.
    pub fn await_singleton(&self, name: &str) -> BoxFuture<'static, Result<Instance, WaitError>> {
        let _creation = self.state.lock();
        if let Some(instance) = self.cache.finished(name) {
            return futures::future::ready(Ok(instance)).boxed();
        }

        let receiver = self.with_state(|state| {
            if state.lifecycle != LifecycleState::Active {
                return None;
            }
            let (sender, receiver) = oneshot::channel();
            state
                .waiters
                .entry(name.to_string())
                .or_default()
                .push(sender);
            Some(receiver)
        });

        match receiver {
            Some(receiver) => {
                async move { receiver.await.unwrap_or(Err(WaitError::Shutdown)) }.boxed()
            }
            None => futures::future::ready(Err(WaitError::Shutdown)).boxed(),
        }
    }

    fn notify_failed(&self, name: &str) {
        let waiters = self.with_state(|state| state.waiters.remove(name).unwrap_or_default());
        for waiter in waiters {
            let _ = waiter.send(Err(WaitError::CreationFailed(name.to_string())));
        }
    }
}

// Dependency edges
impl SingletonRegistry {
    /// Records that `dependent` depends on `dependee`
    pub fn record_dependency(&self, dependee: &str, dependent: &str) {
        if self.with_state(|state| state.graph.record_dependency(dependee, dependent)) {
            tracing::trace!("Recorded '{dependent}' as dependent of '{dependee}'");
        }
    }

    /// Records that `inner` exists nested inside `outer`
    pub fn record_containment(&self, inner: &str, outer: &str) {
        if self.with_state(|state| state.graph.record_containment(inner, outer)) {
            tracing::trace!("Recorded '{inner}' as contained in '{outer}'");
        }
    }

    /// Does `dependent` depend on `name`, directly or transitively
    pub fn is_dependent(&self, name: &str, dependent: &str) -> bool {
        self.with_state(|state| state.graph.is_dependent(name, dependent))
    }

    pub fn has_dependents(&self, name: &str) -> bool {
        self.with_state(|state| state.graph.has_dependents(name))
    }

    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.with_state(|state| state.graph.dependents_of(name))
    }

    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.with_state(|state| state.graph.dependencies_of(name))
    }
}
