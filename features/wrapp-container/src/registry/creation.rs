use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
};

use indexmap::IndexSet;

use crate::{
    errors::{registry_error_of, ProduceError, RegistryError},
    registry::{LifecycleState, SingletonRegistry},
    types::{DynError, Instance},
};

impl SingletonRegistry {
    /// Returns the finished instance of `name`, creating it with `producer` if needed
    ///
    /// The producer runs at most once per successful creation, while holding the
    /// creation lock. To take part in circular references it has to call
    /// [SingletonRegistry::register_factory] before it resolves its own dependencies.
    ///
    /// On failure the name is evicted from every tier, a later call starts from scratch.
    /// Components that started depending on it during the failed creation are destroyed.
    /// A panicking producer fails the creation like an error would.
    pub fn get_or_create<F>(&self, name: &str, producer: F) -> Result<Instance, RegistryError>
    where
        F: FnOnce() -> Result<Instance, ProduceError>,
    {
        if let Some(instance) = self.cache.finished(name) {
            return Ok(instance);
        }

        let _creation = self.state.lock();
        if let Some(instance) = self.cache.finished(name) {
            return Ok(instance);
        }
        if self.lifecycle_state() != LifecycleState::Active {
            return Err(RegistryError::CreationDuringShutdown {
                name: name.to_string(),
            });
        }

        tracing::debug!("Creating shared instance of '{name}'");
        self.before_creation(name)?;
        let records_suppressed = self.with_state(|state| {
            if state.suppressed.is_some() {
                return false;
            }
            state.suppressed = Some(Vec::new());
            true
        });

        let known_dependents = self.with_state(|state| state.graph.dependents_set(name));
        let produced = catch_unwind(AssertUnwindSafe(producer))
            .unwrap_or_else(|payload| Err(ProduceError::Failed(panicked(name, payload))));

        let suppressed = match records_suppressed {
            true => self
                .with_state(|state| state.suppressed.take())
                .unwrap_or_default(),
            false => Vec::new(),
        };
        let unmarked = self.after_creation(name);

        let instance = match produced {
            Ok(instance) => instance,
            Err(ProduceError::AlreadyAppeared(reason)) => match self.cache.finished(name) {
                Some(existing) => {
                    tracing::debug!("'{name}' appeared while it was being created, using it");
                    unmarked?;
                    return Ok(existing);
                }
                None => {
                    self.abort_creation(name, &known_dependents);
                    let error: DynError = Box::new(ProduceError::AlreadyAppeared(reason));
                    return Err(creation_failed(name, error, suppressed));
                }
            },
            Err(ProduceError::Failed(error)) => {
                self.abort_creation(name, &known_dependents);
                return Err(creation_failed(name, error, suppressed));
            }
        };

        if let Err(error) = unmarked.and_then(|()| self.add_finished(name, instance.clone())) {
            self.abort_creation(name, &known_dependents);
            return Err(error);
        }

        tracing::debug!("Created shared instance of '{name}'");
        Ok(instance)
    }

    fn before_creation(&self, name: &str) -> Result<(), RegistryError> {
        self.with_state(|state| {
            if !state.in_creation_exclusions.contains(name)
                && !state.in_creation.insert(name.to_string())
            {
                return Err(RegistryError::CircularConstructorDependency {
                    name: name.to_string(),
                });
            }
            Ok(())
        })
    }

    fn after_creation(&self, name: &str) -> Result<(), RegistryError> {
        self.with_state(|state| {
            if !state.in_creation_exclusions.contains(name) && !state.in_creation.remove(name) {
                return Err(RegistryError::NotInCreation {
                    name: name.to_string(),
                });
            }
            Ok(())
        })
    }

    /// Rolls back a failed creation
    ///
    /// Dependents recorded before the creation started are kept.
    fn abort_creation(&self, name: &str, known_dependents: &IndexSet<String>) {
        tracing::debug!("Creation of '{name}' failed, evicting it");
        self.discard_failed(name, known_dependents);
        self.notify_failed(name);
    }

    /// Excludes `name` from re-entrance checks, or includes it again
    pub fn set_currently_in_creation(&self, name: &str, in_creation: bool) {
        self.with_state(|state| match in_creation {
            true => state.in_creation_exclusions.remove(name),
            false => state.in_creation_exclusions.insert(name.to_string()),
        });
    }

    /// Is `name` in creation and not excluded from re-entrance checks
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        self.with_state(|state| {
            !state.in_creation_exclusions.contains(name) && state.in_creation.contains(name)
        })
    }

    pub fn is_singleton_currently_in_creation(&self, name: &str) -> bool {
        self.with_state(|state| state.in_creation.contains(name))
    }

    /// Records an error that was swallowed during the running creation chain
    ///
    /// Attached to the error if the outermost creation fails, dropped otherwise.
    pub fn on_suppressed_error(&self, error: DynError) {
        self.with_state(|state| match state.suppressed.as_mut() {
            Some(suppressed) => suppressed.push(error),
            None => tracing::trace!("Dropped suppressed error outside of creation: {error}"),
        });
    }
}

/// Converts a producer failure into the error surfaced to the caller
///
/// Circular references pass through unwrapped, so the caller learns where the loop closed.
pub(crate) fn creation_failed(
    name: &str,
    error: DynError,
    suppressed: Vec<DynError>,
) -> RegistryError {
    if let Some(RegistryError::CircularConstructorDependency { name: looped }) =
        registry_error_of(&error).map(RegistryError::root_cause)
    {
        return RegistryError::CircularConstructorDependency {
            name: looped.clone(),
        };
    }

    RegistryError::ComponentCreationFailed {
        name: name.to_string(),
        source: error,
        suppressed,
    }
}

fn panicked(name: &str, payload: Box<dyn Any + Send>) -> DynError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!("Creation of '{name}' panicked: {message}");
    format!("creation of '{name}' panicked: {message}").into()
}
