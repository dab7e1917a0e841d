/// Errors when trying to aquire a config
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GetConfigError {
    /// The required Config is not known
    #[error("The required Config type '{0}' is not known")]
    Missing(&'static str),
    /// A config is registered for the type, but it could not be downcast
    #[error("The Config registered for '{0}' has a different type")]
    DowncastFailed(&'static str),
}

/// Errors when trying to register a config
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterConfigError {
    /// The required Config is already registered
    #[error("The Config type '{0}' is already registered")]
    AlreadyRegistered(&'static str),
}
