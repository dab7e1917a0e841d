//! Wrapp Container manages the lifecycle of named components.
//!
//! Components are declared as [ComponentDefinition]s and created on first request,
//! or eagerly while the container is built. Shared components are created at most once,
//! even when requested from many threads at the same time. Circular references between
//! components resolve through early references, and on shutdown every component is
//! torn down after everything depending on it.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use wrapp_container::{ComponentDefinition, ContainerBuilder, FnFactory, Instance};
//!
//! struct Database {
//!     url: String,
//! }
//! struct Repository {
//!     db: Arc<Database>,
//! }
//!
//! let container = ContainerBuilder::new()
//!     .singleton_instance("url", String::from("postgres://localhost"))
//!     .definition(
//!         "database",
//!         ComponentDefinition::singleton(FnFactory::new(|ctx| {
//!             let url = ctx.get_typed::<String>("url")?;
//!             Ok(Instance::new(Database { url: url.to_string() }))
//!         })),
//!     )
//!     .definition(
//!         "repository",
//!         ComponentDefinition::singleton(FnFactory::new(|ctx| {
//!             Ok(Instance::new(Repository {
//!                 db: ctx.get_typed("database")?,
//!             }))
//!         })),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let repository = container.get_typed::<Repository>("repository").unwrap();
//! assert_eq!(repository.db.url, "postgres://localhost");
//!
//! container.shutdown();
//! ```
//!
//! The container consists of the following parts:
//!
//! 1. [registry] - the shared instances, their creation protocol and teardown
//! 2. [definition] - recipes components are created from
//! 3. [post_processor] - hooks around the initialization of every component
//! 4. [container] and [builder] - the facade tying it together
//! 5. [resolver] - typed resolution of dependencies

pub mod aliases;
pub mod builder;
pub mod container;
pub mod definition;
pub mod dependency_graph;
pub mod errors;
pub mod post_processor;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod types;

pub use builder::ContainerBuilder;
pub use container::{Container, CreationContext};
pub use definition::{
    ComponentDefinition, ComponentFactory, DefinitionRegistry, DefinitionStore, FnFactory,
    LifecycleCallback, Scope,
};
pub use errors::{InitError, InjectError, ProduceError, RegistryError, WaitError};
pub use post_processor::{PostProcessor, PostProcessorPipeline};
pub use registry::{LifecycleState, SingletonRegistry};
pub use resolver::{lazy::Lazy, Resolve};
pub use settings::ContainerSettings;
pub use types::{DynError, Injectable, Instance};
