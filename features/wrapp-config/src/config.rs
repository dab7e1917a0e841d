use std::{any::type_name, ops::Deref, sync::Arc};

use wrapp_container::{CreationContext, InjectError, Injectable, Resolve};

use crate::{errors::GetConfigError, provider::ConfigProvider};

/// A wrapper type to allow for config injections
///
/// This provides a simple way to retrieve configs from the config registry,
/// and inject them into a component factory as a dependency.
/// The name passed to [Resolve::resolve] is the name of the [ConfigProvider] component.
///
/// # Example
/// ```rust
/// use wrapp_config::{config::Config, provider::{ConfigProvider, WithConfigProvider}};
/// use wrapp_container::{ComponentDefinition, ContainerBuilder, FnFactory, Instance};
///
/// pub struct ServerConfig {
///     port: u16,
/// }
/// pub struct Server {
///     port: u16,
/// }
///
/// let mut config_provider = ConfigProvider::new();
/// config_provider.add_config(ServerConfig { port: 8080 }).unwrap();
///
/// let container = ContainerBuilder::new()
///     .config_provider(config_provider)
///     .definition(
///         "server",
///         ComponentDefinition::singleton(FnFactory::new(|ctx| {
///             let config = Config::<ServerConfig>::from_context(ctx)?;
///             Ok(Instance::new(Server { port: config.port }))
///         })),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(container.get_typed::<Server>("server").unwrap().port, 8080);
/// ```
pub struct Config<T> {
    inner: Arc<T>,
}
impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T> Config<T> {
    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}
impl<T: Injectable> Config<T> {
    /// Resolves the config from the provider registered under [ConfigProvider::COMPONENT_NAME]
    pub fn from_context(ctx: &CreationContext<'_>) -> Result<Self, InjectError> {
        Self::resolve(ctx, ConfigProvider::COMPONENT_NAME)
    }
}

impl<T: Injectable> Resolve for Config<T> {
    fn resolve(ctx: &CreationContext<'_>, name: &str) -> Result<Self, InjectError> {
        let config_provider = ctx.get_typed::<ConfigProvider>(name)?;

        let config: Arc<T> = config_provider
            .get_config()
            .map_err(|e| InjectError::Other(Box::new(e)))?
            .ok_or_else(|| {
                InjectError::Other(Box::new(GetConfigError::Missing(type_name::<T>())))
            })?;

        Ok(Config { inner: config })
    }
}
