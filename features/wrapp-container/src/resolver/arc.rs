use std::sync::Arc;

use crate::{
    container::CreationContext,
    errors::{InjectError, RegistryError},
    resolver::Resolve,
    types::Injectable,
};

impl<T: Injectable> Resolve for Arc<T> {
    fn resolve(ctx: &CreationContext<'_>, name: &str) -> Result<Self, InjectError> {
        ctx.get_typed(name)
    }
}

impl<Resolvable: Resolve> Resolve for Option<Resolvable> {
    fn resolve(ctx: &CreationContext<'_>, name: &str) -> Result<Self, InjectError> {
        match Resolvable::resolve(ctx, name) {
            Ok(resolved) => Ok(Some(resolved)),
            // Only a missing component is optional, failures of existing ones are not
            Err(InjectError::Registry(RegistryError::NoSuchComponent { name: missing }))
                if ctx.container().canonical_name(name) == missing =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
