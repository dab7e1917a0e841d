use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
};

use wrapp_container::ContainerBuilder;

use crate::errors::{GetConfigError, RegisterConfigError};

/// A provider to register all configs.
///
/// Configs can be registered and retrieved based on type.
#[derive(Default)]
pub struct ConfigProvider {
    configs: HashMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync + 'static>)>,
}

impl ConfigProvider {
    /// Name the provider is registered under in a container
    pub const COMPONENT_NAME: &'static str = "configProvider";

    /// Initializes an empty Config Provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a config with specified type.
    ///
    /// Returns `Ok(None)` if no config of the type is registered
    pub fn get_config<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, GetConfigError> {
        self.configs
            .get(&TypeId::of::<T>())
            .map(|(_, entry)| entry.clone().downcast())
            .transpose()
            .map_err(|_| GetConfigError::DowncastFailed(type_name::<T>()))
    }

    /// Add a config to the registry.
    ///
    /// If the config type is already registered, it will return a
    /// [`RegisterConfigError`]
    pub fn add_config<T: Send + Sync + 'static>(
        &mut self,
        config: T,
    ) -> Result<&mut Self, RegisterConfigError> {
        let type_id = TypeId::of::<T>();

        if self.configs.contains_key(&type_id) {
            return Err(RegisterConfigError::AlreadyRegistered(type_name::<T>()));
        }

        tracing::debug!("Registered config '{}'", type_name::<T>());
        self.configs
            .insert(type_id, (type_name::<T>(), Arc::new(config)));
        Ok(self)
    }

    /// Can optionally add a config to the registry.
    ///
    /// If the config provided is `Some(T)`, it will be the same as calling
    /// [`ConfigProvider::add_config`]
    /// If the config provided is `None`, then the function just returns `Ok(self)` for chaining
    pub fn maybe_add_config<T: Send + Sync + 'static>(
        &mut self,
        config: Option<T>,
    ) -> Result<&mut Self, RegisterConfigError> {
        match config {
            Some(c) => self.add_config(c),
            None => Ok(self),
        }
    }
}

impl Debug for ConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.configs.values().map(|(name, _)| name))
            .finish()
    }
}

/// Registers a [ConfigProvider] on a container under [ConfigProvider::COMPONENT_NAME]
pub trait WithConfigProvider {
    fn config_provider(self, provider: ConfigProvider) -> Self;
}

impl WithConfigProvider for ContainerBuilder {
    fn config_provider(self, provider: ConfigProvider) -> Self {
        self.singleton_instance(ConfigProvider::COMPONENT_NAME, provider)
    }
}
