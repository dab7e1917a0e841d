use std::{
    fmt::Debug,
    ops::Deref,
    sync::{Arc, OnceLock, Weak},
};

use crate::{
    container::{downcast, Container, ContainerInner, CreationContext},
    errors::{InjectError, RegistryError},
    resolver::Resolve,
    types::Injectable,
};

/// Lazily resolved dependency
///
/// The component is looked up on first access, so it does not have to exist
/// while the component holding the Lazy is constructed.
/// This breaks circular references between constructors.
///
/// ### Panics
///
/// Dereferencing panics if the component cannot be resolved, see [Lazy::get]
pub struct Lazy<T: Injectable>(Arc<LazyInner<T>>);
impl<T: Injectable + Debug> Debug for Lazy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Lazy")
            .field(&self.0.name)
            .field(&self.0.once.get())
            .finish()
    }
}
impl<T: Injectable> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
struct LazyInner<T: Injectable> {
    container: Weak<ContainerInner>,
    name: String,
    once: OnceLock<Arc<T>>,
}
impl<T: Injectable> Deref for Lazy<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}
impl<T: Injectable> Resolve for Lazy<T> {
    fn resolve(ctx: &CreationContext<'_>, name: &str) -> Result<Self, InjectError> {
        let container = ctx.container();
        let name = container.canonical_name(name);
        if !container.contains(&name) {
            return Err(RegistryError::NoSuchComponent { name }.into());
        }
        ctx.record_dependency(&name);

        Ok(Lazy(Arc::new(LazyInner {
            container: container.downgrade(),
            name,
            once: OnceLock::new(),
        })))
    }
}
impl<T: Injectable> Lazy<T> {
    /// Name of the referenced component
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Accesses the Lazy Dependency
    ///
    /// # Panics
    /// - When accessed while the component is still in creation on this thread
    /// - When the component fails to resolve, e.g. after the container was dropped
    pub fn get(&self) -> &Arc<T> {
        match self.try_get() {
            Some(Ok(resolved)) => resolved,
            Some(Err(err)) => panic!("Lazy '{}' failed to resolve: {err}", self.0.name),
            None => panic!("Lazy '{}' accessed while it is still in creation", self.0.name),
        }
    }

    /// Try to access the lazy dependency
    ///
    /// Creates the component if required.
    /// Returns `None` while the component is in creation on the current thread.
    /// Failures are not cached, a later access tries again.
    pub fn try_get(&self) -> Option<Result<&Arc<T>, InjectError>> {
        if let Some(resolved) = self.0.once.get() {
            return Some(Ok(resolved));
        }

        let Some(inner) = self.0.container.upgrade() else {
            return Some(Err(InjectError::ContainerDropped));
        };
        let container = Container(inner);

        // Another thread creating it blocks here until it is done
        if container
            .registry()
            .is_singleton_currently_in_creation(&self.0.name)
        {
            return None;
        }

        let resolved = container
            .get(&self.0.name)
            .map_err(InjectError::from)
            .and_then(|instance| downcast::<T>(&self.0.name, &instance));
        Some(resolved.map(|resolved| self.0.once.get_or_init(|| resolved)))
    }

    /// Resolves as soon as the lazy is available
    ///
    /// Must not be awaited inside a factory of the referenced component.
    pub async fn wait_result(&self) -> Result<&Arc<T>, InjectError> {
        if let Some(result) = self.try_get() {
            return result;
        }

        let waiting = {
            let inner = self
                .0
                .container
                .upgrade()
                .ok_or(InjectError::ContainerDropped)?;
            Container(inner).await_component(&self.0.name)
        };
        let instance = waiting.await?;
        let resolved = downcast::<T>(&self.0.name, &instance)?;
        Ok(self.0.once.get_or_init(|| resolved))
    }
}
