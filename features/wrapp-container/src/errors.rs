use thiserror::Error;

use crate::{definition::validation::DependencyGraphErrors, types::DynError};

/// Errors raised by the singleton registry and the creation protocol
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A different instance is already registered under the name
    #[error("Could not register '{name}': there is already an instance bound to that name")]
    DuplicateRegistration { name: String },
    /// Re-entrant creation of a name that never exposed an early reference
    #[error("'{name}' is currently in creation: is there an unresolvable circular reference?")]
    CircularConstructorDependency { name: String },
    /// The producer or one of the post processors failed
    #[error("Creating '{name}' failed - error: {source}")]
    ComponentCreationFailed {
        name: String,
        source: DynError,
        /// Errors swallowed while the failed creation chain was running
        suppressed: Vec<DynError>,
    },
    /// Creation was requested after shutdown started
    #[error("Creation of '{name}' is not allowed while the registry is shutting down")]
    CreationDuringShutdown { name: String },
    /// No definition and no registered instance exists for the name
    #[error("No component named '{name}' is defined")]
    NoSuchComponent { name: String },
    /// Declared initialization order loops back onto itself
    #[error("Circular depends-on relationship between '{name}' and '{dependency}'")]
    CircularDependsOn { name: String, dependency: String },
    /// The early reference was handed out, but the final instance got substituted
    #[error("'{name}' has been injected into {dependents:?} in its raw version as part of a circular reference, but has eventually been wrapped")]
    RawReferenceInjected {
        name: String,
        dependents: Vec<String>,
    },
    /// Creation bookkeeping was lost for the name
    #[error("'{name}' isn't currently in creation")]
    NotInCreation { name: String },
}

impl RegistryError {
    /// Errors suppressed during the failed creation, if any
    pub fn suppressed(&self) -> &[DynError] {
        match self {
            RegistryError::ComponentCreationFailed { suppressed, .. } => suppressed,
            _ => &[],
        }
    }

    /// Walks nested creation failures down to the innermost registry error
    pub fn root_cause(&self) -> &RegistryError {
        let mut current = self;
        while let RegistryError::ComponentCreationFailed { source, .. } = current {
            match registry_error_of(source) {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }
}

/// Finds a registry error carried by a boxed factory error
pub(crate) fn registry_error_of(error: &DynError) -> Option<&RegistryError> {
    if let Some(error) = error.downcast_ref::<RegistryError>() {
        return Some(error);
    }
    match error.downcast_ref::<InjectError>() {
        Some(InjectError::Registry(error)) => Some(error),
        _ => None,
    }
}

/// Outcome of a producer handed to the creation coordinator
#[derive(Error, Debug)]
pub enum ProduceError {
    /// The component was registered by someone else while the producer ran
    #[error("'{0}' appeared in the registry while it was being produced")]
    AlreadyAppeared(String),
    /// The producer failed
    #[error("{0}")]
    Failed(#[from] DynError),
}
impl ProduceError {
    pub fn failed(error: impl Into<DynError>) -> Self {
        Self::Failed(error.into())
    }
}

/// Errors when resolving a typed dependency
#[derive(Error, Debug)]
pub enum InjectError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Failed to downcast '{name}', required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        name: String,
        required_type: &'static str,
        actual_type: &'static str,
    },
    #[error(transparent)]
    Wait(#[from] WaitError),
    /// The container backing a lazy dependency is gone
    #[error("The container was dropped, did you try using a Lazy after shutdown?")]
    ContainerDropped,
    /// Generic error during injection
    #[error("Error during injection: {0}")]
    Other(DynError),
}

/// Errors delivered to readiness waiters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    #[error("Creation of '{0}' failed")]
    CreationFailed(String),
    #[error("The registry shut down before the component was ready")]
    Shutdown,
}

/// Errors when registering aliases
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AliasError {
    #[error("Cannot register alias '{alias}' for '{name}': '{name}' is already a direct or indirect alias for '{alias}'")]
    Circular { name: String, alias: String },
    #[error("No alias '{0}' is registered")]
    NotRegistered(String),
}

/// Errors while building the container
#[derive(Error, Debug)]
pub enum InitError {
    /// The declared definitions have issues
    #[error(transparent)]
    DependencyGraph(#[from] DependencyGraphErrors),
    #[error(transparent)]
    Alias(#[from] AliasError),
    /// Registering a prebuilt instance or eager creation failed
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
