//! Declarative recipes the container builds components from

use std::{any::type_name, fmt::Debug, sync::Arc};

use indexmap::IndexMap;

use crate::{
    container::CreationContext,
    types::{DynError, Injectable, Instance},
};

pub mod validation;

use validation::DependencyGraphError;

/// How instances of a definition are shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// One shared instance per container
    #[default]
    Singleton,
    /// A new instance on every request
    Prototype,
}

/// Constructs component instances
pub trait ComponentFactory: Send + Sync {
    /// Allocates the instance
    ///
    /// Dependencies resolved here are required at construction time,
    /// a cycle through them cannot be resolved.
    fn instantiate(&self, ctx: &CreationContext<'_>) -> Result<Instance, DynError>;

    /// Populates settable dependencies on the allocated instance
    ///
    /// Runs after the early reference has been exposed, so cycles through here resolve.
    fn populate(&self, instance: &Instance, ctx: &CreationContext<'_>) -> Result<(), DynError> {
        let _ = (instance, ctx);
        Ok(())
    }
}

type InstantiateFn = Box<dyn Fn(&CreationContext<'_>) -> Result<Instance, DynError> + Send + Sync>;
type PopulateFn =
    Box<dyn Fn(&Instance, &CreationContext<'_>) -> Result<(), DynError> + Send + Sync>;

/// [ComponentFactory] built from closures
pub struct FnFactory {
    instantiate: InstantiateFn,
    populate: Option<PopulateFn>,
}

impl FnFactory {
    pub fn new(
        instantiate: impl Fn(&CreationContext<'_>) -> Result<Instance, DynError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            instantiate: Box::new(instantiate),
            populate: None,
        }
    }

    pub fn with_populate(
        mut self,
        populate: impl Fn(&Instance, &CreationContext<'_>) -> Result<(), DynError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.populate = Some(Box::new(populate));
        self
    }
}

impl ComponentFactory for FnFactory {
    fn instantiate(&self, ctx: &CreationContext<'_>) -> Result<Instance, DynError> {
        (self.instantiate)(ctx)
    }

    fn populate(&self, instance: &Instance, ctx: &CreationContext<'_>) -> Result<(), DynError> {
        match &self.populate {
            Some(populate) => populate(instance, ctx),
            None => Ok(()),
        }
    }
}

/// Named init or destroy callback of a component
#[derive(Clone)]
pub struct LifecycleCallback {
    pub name: String,
    hook: Arc<dyn Fn(&Instance) -> Result<(), DynError> + Send + Sync>,
}

impl LifecycleCallback {
    pub fn new(
        name: impl Into<String>,
        hook: impl Fn(&Instance) -> Result<(), DynError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            hook: Arc::new(hook),
        }
    }

    /// Callback on a concrete component type
    pub fn typed<T: Injectable>(
        name: impl Into<String>,
        hook: impl Fn(&T) -> Result<(), DynError> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let callback_name = name.clone();
        Self::new(name, move |instance| {
            let component = instance.downcast::<T>().map_err(|actual_type| {
                format!(
                    "Callback '{callback_name}' expects '{}' but got '{actual_type}'",
                    type_name::<T>()
                )
            })?;
            hook(&component)
        })
    }

    pub fn invoke(&self, instance: &Instance) -> Result<(), DynError> {
        (self.hook)(instance)
    }
}

impl Debug for LifecycleCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LifecycleCallback").field(&self.name).finish()
    }
}

/// Recipe of a single component
///
/// The container only ever reads definitions.
#[derive(Clone)]
pub struct ComponentDefinition {
    pub scope: Scope,
    pub factory: Arc<dyn ComponentFactory>,
    /// Components which have to be created before this one
    pub depends_on: Vec<String>,
    pub init: Option<LifecycleCallback>,
    pub destroy: Option<LifecycleCallback>,
    /// Skip eager creation when the container is built
    pub lazy_init: bool,
    /// Run the post processor pipeline - only prototypes may opt out
    pub post_process: bool,
}

impl ComponentDefinition {
    pub fn singleton(factory: impl ComponentFactory + 'static) -> Self {
        Self::with_scope(Scope::Singleton, factory)
    }

    pub fn prototype(factory: impl ComponentFactory + 'static) -> Self {
        Self::with_scope(Scope::Prototype, factory)
    }

    pub fn with_scope(scope: Scope, factory: impl ComponentFactory + 'static) -> Self {
        Self {
            scope,
            factory: Arc::new(factory),
            depends_on: Vec::new(),
            init: None,
            destroy: None,
            lazy_init: false,
            post_process: true,
        }
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn init_callback(mut self, callback: LifecycleCallback) -> Self {
        self.init = Some(callback);
        self
    }

    pub fn destroy_callback(mut self, callback: LifecycleCallback) -> Self {
        self.destroy = Some(callback);
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy_init = true;
        self
    }

    pub fn skip_post_processing(mut self) -> Self {
        self.post_process = false;
        self
    }

    pub fn is_singleton(&self) -> bool {
        self.scope == Scope::Singleton
    }

    /// Prototypes may opt out of post processing, singletons always run it
    pub fn runs_post_processors(&self) -> bool {
        self.post_process || self.is_singleton()
    }
}

impl Debug for ComponentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("scope", &self.scope)
            .field("depends_on", &self.depends_on)
            .field("init", &self.init)
            .field("destroy", &self.destroy)
            .field("lazy_init", &self.lazy_init)
            .field("post_process", &self.post_process)
            .finish_non_exhaustive()
    }
}

/// Source of component definitions
pub trait DefinitionStore: Send + Sync {
    fn definition(&self, name: &str) -> Option<Arc<ComponentDefinition>>;

    /// All defined names, in definition order
    fn names(&self) -> Vec<String>;
}

/// In memory [DefinitionStore]
#[derive(Default, Clone, Debug)]
pub struct DefinitionRegistry {
    definitions: IndexMap<String, Arc<ComponentDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        definition: ComponentDefinition,
    ) -> Result<(), DependencyGraphError> {
        let name = name.into();
        if self.definitions.contains_key(&name) {
            return Err(DependencyGraphError::Duplicate(name));
        }
        self.definitions.insert(name, Arc::new(definition));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl DefinitionStore for DefinitionRegistry {
    fn definition(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.definitions.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }
}

/// Local definitions first, then an optional external store
#[derive(Clone, Default)]
pub(crate) struct LayeredDefinitions {
    pub local: DefinitionRegistry,
    pub external: Option<Arc<dyn DefinitionStore>>,
}

impl DefinitionStore for LayeredDefinitions {
    fn definition(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.local
            .definition(name)
            .or_else(|| self.external.as_ref()?.definition(name))
    }

    fn names(&self) -> Vec<String> {
        let mut names = self.local.names();
        if let Some(external) = &self.external {
            for name in external.names() {
                if !self.local.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}
