use std::sync::Arc;

use crate::{
    aliases::AliasRegistry,
    container::Container,
    definition::{
        validation::{DefinitionGraph, DependencyGraphError, DependencyGraphErrors},
        ComponentDefinition, DefinitionStore, LayeredDefinitions,
    },
    errors::InitError,
    post_processor::{PostProcessor, PostProcessorPipeline},
    settings::ContainerSettings,
    types::{Injectable, Instance},
};

/// Collects definitions, instances and post processors of a [Container]
///
/// Nothing is validated until [ContainerBuilder::build] is called,
/// which reports every issue with the declared definitions at once.
pub struct ContainerBuilder {
    definitions: Vec<(String, ComponentDefinition)>,
    external: Option<Arc<dyn DefinitionStore>>,
    aliases: Vec<(String, String)>,
    post_processors: Vec<Arc<dyn PostProcessor>>,
    /// Already created instances
    singletons: Vec<(String, Instance)>,
    settings: ContainerSettings,
}
impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        ContainerBuilder {
            definitions: Vec::new(),
            external: None,
            aliases: Vec::new(),
            post_processors: Vec::new(),
            singletons: Vec::new(),
            settings: ContainerSettings::default(),
        }
    }
}
impl ContainerBuilder {
    pub fn definition(mut self, name: impl Into<String>, definition: ComponentDefinition) -> Self {
        self.definitions.push((name.into(), definition));
        self
    }

    /// Consults `store` for every name without a local definition
    pub fn definition_store(mut self, store: Arc<dyn DefinitionStore>) -> Self {
        self.external = Some(store);
        self
    }

    pub fn alias(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases.push((name.into(), alias.into()));
        self
    }

    /// Appends a post processor, they run in the order they were added
    pub fn post_processor(mut self, processor: impl PostProcessor + 'static) -> Self {
        self.post_processors.push(Arc::new(processor));
        self
    }

    pub fn singleton(mut self, name: impl Into<String>, instance: Instance) -> Self {
        self.singletons.push((name.into(), instance));
        self
    }

    pub fn singleton_instance<T: Injectable>(self, name: impl Into<String>, instance: T) -> Self {
        self.singleton(name, Instance::new(instance))
    }

    pub fn settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validates the definitions and creates the container
    ///
    /// Unless disabled in the settings, all non lazy singletons are created here.
    /// If that fails, everything created so far is destroyed again.
    pub fn build(self) -> Result<Container, InitError> {
        let ContainerBuilder {
            definitions,
            external,
            aliases,
            post_processors,
            singletons,
            settings,
        } = self;

        tracing::debug!(
            "Building container with {} definitions, {} instances and {} post processors",
            definitions.len(),
            singletons.len(),
            post_processors.len()
        );

        let mut alias_registry = AliasRegistry::new();
        for (name, alias) in &aliases {
            alias_registry.register_alias(name, alias)?;
        }

        let mut layered = LayeredDefinitions {
            external,
            ..Default::default()
        };
        let mut errors = Vec::new();
        for (name, definition) in definitions {
            if let Err(e) = layered.local.register(name, definition) {
                errors.push(e);
            }
        }
        for (name, _) in &singletons {
            if layered.definition(name).is_some() {
                errors.push(DependencyGraphError::Duplicate(name.clone()));
            }
        }

        let prebuilt = singletons.iter().map(|(name, _)| name.clone());
        let graph = DefinitionGraph::new(&layered, &alias_registry, prebuilt);
        if let Err(graph_errors) = graph.check() {
            errors.extend(graph_errors.errors);
        }
        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors }.into());
        }

        let container = Container::new(
            layered,
            alias_registry,
            PostProcessorPipeline::new(post_processors),
            settings,
        );
        for (name, instance) in singletons {
            container.registry().register_singleton(&name, instance)?;
        }

        if settings.eager_init {
            if let Err(e) = container.preinstantiate_singletons() {
                tracing::warn!(
                    "Creating singletons failed, destroying the ones created so far: {e}"
                );
                container.shutdown();
                return Err(e.into());
            }
        }

        tracing::debug!("Container built");
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        definition::FnFactory,
        errors::{AliasError, RegistryError},
        registry::LifecycleState,
    };

    fn unit() -> ComponentDefinition {
        ComponentDefinition::singleton(FnFactory::new(|_| Ok(Instance::new(()))))
    }

    #[test]
    fn all_definition_issues_are_reported_together() {
        let result = ContainerBuilder::new()
            .definition("a", unit().depends_on("missing"))
            .definition("a", unit())
            .definition("b", unit())
            .singleton_instance("b", 1_u8)
            .build();

        let Err(InitError::DependencyGraph(errors)) = result else {
            panic!("Expected dependency graph errors");
        };
        assert_eq!(
            errors.errors,
            vec![
                DependencyGraphError::Duplicate("a".to_string()),
                DependencyGraphError::Duplicate("b".to_string()),
                DependencyGraphError::MissingDependency {
                    dependency: "missing".to_string(),
                    required_by: "a".to_string(),
                },
            ]
        );
    }

    #[test]
    fn circular_aliases_fail_the_build() {
        let result = ContainerBuilder::new()
            .alias("a", "b")
            .alias("b", "a")
            .build();

        assert!(matches!(result, Err(InitError::Alias(AliasError::Circular { .. }))));
    }

    #[test]
    fn eager_init_failure_destroys_created_singletons() {
        let result = ContainerBuilder::new()
            .definition("fine", unit())
            .definition(
                "broken",
                ComponentDefinition::singleton(FnFactory::new(|_| Err("no connection".into()))),
            )
            .build();

        assert!(matches!(
            result,
            Err(InitError::Registry(RegistryError::ComponentCreationFailed { ref name, .. }))
                if name == "broken"
        ));
    }

    #[test]
    fn lazy_and_disabled_eager_init_create_nothing() {
        let container = ContainerBuilder::new()
            .definition("lazy", unit().lazy())
            .definition("eager", unit())
            .settings(ContainerSettings {
                eager_init: false,
                ..Default::default()
            })
            .build()
            .unwrap();

        assert_eq!(container.registry().singleton_count(), 0);
        container.preinstantiate_singletons().unwrap();
        assert_eq!(container.registry().singleton_names(), vec!["eager"]);
        assert_eq!(container.registry().lifecycle_state(), LifecycleState::Active);
    }
}
