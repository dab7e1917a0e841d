use std::{
    any::type_name,
    fmt::Debug,
    sync::{Arc, Weak},
};

use futures::future::BoxFuture;

use crate::{
    aliases::AliasRegistry,
    definition::{ComponentDefinition, DefinitionStore, LayeredDefinitions, Scope},
    errors::{InjectError, ProduceError, RegistryError, WaitError},
    post_processor::PostProcessorPipeline,
    registry::{creation_failed, SingletonRegistry},
    resolver::Resolve,
    settings::ContainerSettings,
    types::{DynError, Injectable, Instance},
};

/// Container managing the lifecycle of all defined components
#[derive(Clone)]
pub struct Container(pub(crate) Arc<ContainerInner>);
pub(crate) struct ContainerInner {
    registry: SingletonRegistry,
    definitions: LayeredDefinitions,
    aliases: AliasRegistry,
    pipeline: PostProcessorPipeline,
    settings: ContainerSettings,
}
impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("Container");
        for name in self.0.definitions.names() {
            let state = if self.0.registry.contains_singleton(&name) {
                "created"
            } else if self.0.registry.is_singleton_currently_in_creation(&name) {
                "in creation"
            } else {
                "defined"
            };
            map.field(&name, &state);
        }
        map.finish()
    }
}

/// A created component before it is published
struct Created {
    raw: Instance,
    exposed: Instance,
    early_exposed: bool,
}

impl Container {
    pub(crate) fn new(
        definitions: LayeredDefinitions,
        aliases: AliasRegistry,
        pipeline: PostProcessorPipeline,
        settings: ContainerSettings,
    ) -> Self {
        Self(Arc::new(ContainerInner {
            registry: SingletonRegistry::new(),
            definitions,
            aliases,
            pipeline,
            settings,
        }))
    }

    pub(crate) fn downgrade(&self) -> Weak<ContainerInner> {
        Arc::downgrade(&self.0)
    }

    /// Returns the component bound to `name`, creating it if required
    pub fn get(&self, name: &str) -> Result<Instance, RegistryError> {
        self.get_component(name, None)
    }

    /// Attempts to get the component as `T`
    pub fn get_typed<T: Injectable>(&self, name: &str) -> Result<Arc<T>, InjectError> {
        let instance = self.get(name)?;
        downcast(name, &instance)
    }

    /// Resolves `name` with custom resolution behaviour, e.g. `Option<Arc<T>>`
    pub fn resolve<R: Resolve>(&self, name: &str) -> Result<R, InjectError> {
        R::resolve(&CreationContext::root(self), name)
    }

    /// Is a definition or an instance bound to `name`
    pub fn contains(&self, name: &str) -> bool {
        let name = self.canonical_name(name);
        self.0.registry.contains_singleton(&name) || self.0.definitions.definition(&name).is_some()
    }

    pub fn is_singleton(&self, name: &str) -> Result<bool, RegistryError> {
        let name = self.canonical_name(name);
        if self.0.registry.contains_singleton(&name) {
            return Ok(true);
        }
        match self.0.definitions.definition(&name) {
            Some(definition) => Ok(definition.is_singleton()),
            None => Err(RegistryError::NoSuchComponent { name }),
        }
    }

    pub fn definition(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.0.definitions.definition(&self.canonical_name(name))
    }

    /// Names of all definitions, in definition order
    pub fn component_names(&self) -> Vec<String> {
        self.0.definitions.names()
    }

    pub fn canonical_name(&self, name: &str) -> String {
        self.0.aliases.canonical_name(name)
    }

    pub fn aliases(&self, name: &str) -> Vec<String> {
        self.0.aliases.aliases(name)
    }

    pub fn registry(&self) -> &SingletonRegistry {
        &self.0.registry
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.0.settings
    }

    /// Destroys the singleton and everything depending on it
    pub fn destroy_component(&self, name: &str) {
        self.0.registry.destroy_singleton(&self.canonical_name(name));
    }

    /// Destroys all singletons, see [SingletonRegistry::shutdown]
    pub fn shutdown(&self) {
        self.0.registry.shutdown();
    }

    /// Resolves once the singleton `name` has been fully created
    ///
    /// Does not trigger the creation itself.
    pub fn await_component(&self, name: &str) -> BoxFuture<'static, Result<Instance, WaitError>> {
        self.0.registry.await_singleton(&self.canonical_name(name))
    }

    /// Creates every singleton which is not marked as lazy
    pub fn preinstantiate_singletons(&self) -> Result<(), RegistryError> {
        let names = self.0.definitions.names();
        tracing::debug!("Pre-instantiating singletons of {} definitions", names.len());

        for name in names {
            let Some(definition) = self.0.definitions.definition(&name) else {
                continue;
            };
            if definition.is_singleton() && !definition.lazy_init {
                self.get(&name)?;
            }
        }
        Ok(())
    }
}

// Creation
impl Container {
    fn get_component(
        &self,
        name: &str,
        parent: Option<&CreationContext<'_>>,
    ) -> Result<Instance, RegistryError> {
        let name = self.canonical_name(name);
        if let Some(instance) = self.0.registry.lookup(&name, true) {
            if self.0.registry.is_singleton_currently_in_creation(&name) {
                tracing::trace!(
                    "Returning early reference of '{name}', it is not fully initialized yet"
                );
            }
            return Ok(instance);
        }

        let definition = self
            .0
            .definitions
            .definition(&name)
            .ok_or_else(|| RegistryError::NoSuchComponent { name: name.clone() })?;

        self.create_dependencies(&name, &definition, parent)?;

        match definition.scope {
            Scope::Singleton => self.0.registry.get_or_create(&name, || {
                let ctx = CreationContext::new(self, &name, Scope::Singleton, parent);
                self.create_singleton(&name, &definition, &ctx)
            }),
            Scope::Prototype => {
                if parent.is_some_and(|parent| parent.is_prototype_in_creation(&name)) {
                    return Err(RegistryError::CircularConstructorDependency { name });
                }
                let ctx = CreationContext::new(self, &name, Scope::Prototype, parent);
                self.create_instance(&name, &definition, &ctx)
                    .map(|created| created.exposed)
                    .map_err(|error| creation_failed(&name, error, Vec::new()))
            }
        }
    }

    /// Creates the declared depends-on components first
    fn create_dependencies(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        parent: Option<&CreationContext<'_>>,
    ) -> Result<(), RegistryError> {
        for dependency in &definition.depends_on {
            let dependency = self.canonical_name(dependency);
            if self.0.registry.is_dependent(name, &dependency) {
                return Err(RegistryError::CircularDependsOn {
                    name: name.to_string(),
                    dependency,
                });
            }
            self.0.registry.record_dependency(&dependency, name);

            if let Err(error) = self.get_component(&dependency, parent) {
                return Err(creation_failed(name, Box::new(error), Vec::new()));
            }
        }
        Ok(())
    }

    fn create_singleton(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        ctx: &CreationContext<'_>,
    ) -> Result<Instance, ProduceError> {
        let Created {
            raw,
            mut exposed,
            early_exposed,
        } = self.create_instance(name, definition, ctx)?;

        if early_exposed {
            if let Some(early) = self.0.registry.early_reference(name) {
                if exposed.same(&raw) {
                    exposed = early;
                } else if !self.0.settings.allow_raw_injection_despite_wrapping
                    && self.0.registry.has_dependents(name)
                {
                    return Err(ProduceError::failed(RegistryError::RawReferenceInjected {
                        name: name.to_string(),
                        dependents: self.0.registry.dependents_of(name),
                    }));
                }
            }
        }

        if let Some(existing) = self.0.registry.lookup(name, false) {
            if !existing.same(&exposed) {
                return Err(ProduceError::AlreadyAppeared(name.to_string()));
            }
        }

        if let Some(destroy) = definition.destroy.clone() {
            self.0
                .registry
                .register_disposable(name, move || destroy.invoke(&raw));
        }
        Ok(exposed)
    }

    fn create_instance(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        ctx: &CreationContext<'_>,
    ) -> Result<Created, DynError> {
        let raw = definition.factory.instantiate(ctx)?;
        tracing::trace!("Instantiated '{name}' as '{}'", raw.type_name);

        let early_exposed = definition.is_singleton()
            && self.0.settings.allow_circular_references
            && self.0.registry.is_singleton_currently_in_creation(name);
        if early_exposed {
            let pipeline = self.0.pipeline.clone();
            let early = raw.clone();
            let owned_name = name.to_string();
            self.0.registry.register_factory(name, move || {
                pipeline.apply_early_reference(early, &owned_name)
            });
        }

        definition.factory.populate(&raw, ctx)?;

        let post_process = definition.runs_post_processors();
        let mut exposed = raw.clone();
        if post_process {
            exposed = self.0.pipeline.apply_before_init(exposed, name)?;
        }
        if let Some(init) = &definition.init {
            tracing::debug!("Invoking init callback '{}' of '{name}'", init.name);
            init.invoke(&exposed)?;
        }
        if post_process {
            exposed = self.0.pipeline.apply_after_init(exposed, name)?;
        }

        Ok(Created {
            raw,
            exposed,
            early_exposed,
        })
    }
}

/// Handle given to factories while a component is created
///
/// Dependencies resolved through the context are recorded as dependencies
/// of the component in creation, which orders their teardown.
pub struct CreationContext<'a> {
    container: &'a Container,
    component: Option<&'a str>,
    scope: Scope,
    parent: Option<&'a CreationContext<'a>>,
}

impl<'a> CreationContext<'a> {
    fn root(container: &'a Container) -> Self {
        Self {
            container,
            component: None,
            scope: Scope::Singleton,
            parent: None,
        }
    }

    fn new(
        container: &'a Container,
        component: &'a str,
        scope: Scope,
        parent: Option<&'a CreationContext<'a>>,
    ) -> Self {
        Self {
            container,
            component: Some(component),
            scope,
            parent,
        }
    }

    pub fn container(&self) -> &Container {
        self.container
    }

    /// Name of the component in creation, `None` outside of creation
    pub fn component(&self) -> Option<&str> {
        self.component
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn get(&self, name: &str) -> Result<Instance, RegistryError> {
        let instance = self.container.get_component(name, Some(self))?;
        self.record_dependency(name);
        Ok(instance)
    }

    pub fn get_typed<T: Injectable>(&self, name: &str) -> Result<Arc<T>, InjectError> {
        let instance = self.get(name)?;
        downcast(name, &instance)
    }

    pub fn resolve<R: Resolve>(&self, name: &str) -> Result<R, InjectError> {
        R::resolve(self, name)
    }

    /// Gets a component that lives nested inside the one in creation
    ///
    /// The nested component is destroyed together with its outer component.
    pub fn get_contained(&self, name: &str) -> Result<Instance, RegistryError> {
        let instance = self.container.get_component(name, Some(self))?;
        if let Some(outer) = self.component {
            self.container
                .0
                .registry
                .record_containment(&self.container.canonical_name(name), outer);
        }
        Ok(instance)
    }

    /// Records an error the factory recovered from
    ///
    /// It is reported alongside the failure if the creation fails later on.
    pub fn suppress(&self, error: impl Into<DynError>) {
        self.container.0.registry.on_suppressed_error(error.into());
    }

    pub(crate) fn record_dependency(&self, name: &str) {
        if let Some(component) = self.component {
            self.container
                .0
                .registry
                .record_dependency(&self.container.canonical_name(name), component);
        }
    }

    fn is_prototype_in_creation(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if ctx.scope == Scope::Prototype && ctx.component == Some(name) {
                return true;
            }
            current = ctx.parent;
        }
        false
    }
}

impl Debug for CreationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreationContext")
            .field("component", &self.component)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

pub(crate) fn downcast<T: Injectable>(
    name: &str,
    instance: &Instance,
) -> Result<Arc<T>, InjectError> {
    instance
        .downcast::<T>()
        .map_err(|actual_type| InjectError::DowncastFailed {
            name: name.to_string(),
            required_type: type_name::<T>(),
            actual_type,
        })
}
