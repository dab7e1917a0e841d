//! Wrapp Config provides a global registry of configs that can be injected in the rest of the
//! components.
//!
//! Wrapp Config is split into two major parts:
//! 1. ConfigProvider: Used to create the registry of all configs
//! 2. Config<T>: A wrapper type to be able to resolve and retrieve configs
//!
//! # Examples
//!
//! ```rust
//! use wrapp_config::provider::ConfigProvider;
//!
//! #[derive(Clone)]
//! struct AppConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! let app_config = AppConfig {
//!     host: "localhost".to_string(),
//!     port: 8080_u16,
//! };
//!
//! let mut config_provider = ConfigProvider::new();
//! config_provider.add_config(app_config.clone()).unwrap();
//!
//! let retrieved_config = config_provider
//!     .get_config::<AppConfig>()
//!     .unwrap()
//!     .expect("AppConfig was registered");
//!
//! assert_eq!(app_config.host, retrieved_config.host);
//! assert_eq!(app_config.port, retrieved_config.port);
//! ```
//!
//! Wrapp Config consists of the following components:
//!
//! 1. Config - for resolving configs inside component factories
//! 2. Provider - for creating a registry of configs, adding and retrieving configs
//! 3. Errors - for config errors

pub mod config;
pub mod errors;
pub mod provider;
