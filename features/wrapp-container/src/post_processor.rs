use std::sync::Arc;

use crate::types::{DynError, Instance};

/// Extension hook around the initialization of components
///
/// Either hook may return a different instance, e.g. a wrapper around the original.
/// Returning `None` skips the remaining processors of that phase and keeps the current instance.
pub trait PostProcessor: Send + Sync {
    /// Called when the early reference of a singleton in creation is requested
    ///
    /// A processor wrapping components should wrap here too, otherwise dependents
    /// in a circular reference keep the raw instance.
    fn early_reference(&self, instance: Instance, name: &str) -> Instance {
        let _ = name;
        instance
    }

    /// Called after population, before the init callback
    fn before_init(&self, instance: Instance, name: &str) -> Result<Option<Instance>, DynError> {
        let _ = name;
        Ok(Some(instance))
    }

    /// Called after the init callback - the conventional place to wrap instances
    fn after_init(&self, instance: Instance, name: &str) -> Result<Option<Instance>, DynError> {
        let _ = name;
        Ok(Some(instance))
    }
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    BeforeInit,
    AfterInit,
}

/// Ordered, frozen chain of post processors
#[derive(Clone, Default)]
pub struct PostProcessorPipeline {
    processors: Arc<[Arc<dyn PostProcessor>]>,
}

impl PostProcessorPipeline {
    pub fn new(processors: Vec<Arc<dyn PostProcessor>>) -> Self {
        Self {
            processors: processors.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn apply_early_reference(&self, instance: Instance, name: &str) -> Instance {
        self.processors
            .iter()
            .fold(instance, |current, processor| processor.early_reference(current, name))
    }

    pub fn apply_before_init(&self, instance: Instance, name: &str) -> Result<Instance, DynError> {
        self.apply(instance, name, Phase::BeforeInit)
    }

    pub fn apply_after_init(&self, instance: Instance, name: &str) -> Result<Instance, DynError> {
        self.apply(instance, name, Phase::AfterInit)
    }

    fn apply(&self, instance: Instance, name: &str, phase: Phase) -> Result<Instance, DynError> {
        let mut current = instance;
        for processor in self.processors.iter() {
            let next = match phase {
                Phase::BeforeInit => processor.before_init(current.clone(), name)?,
                Phase::AfterInit => processor.after_init(current.clone(), name)?,
            };
            match next {
                Some(next) => current = next,
                None => {
                    tracing::trace!("Post processing of '{name}' stopped early in {phase:?}");
                    break;
                }
            }
        }
        Ok(current)
    }
}
