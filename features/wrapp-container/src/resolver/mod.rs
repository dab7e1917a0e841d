use crate::{container::CreationContext, errors::InjectError};

pub mod arc;
pub mod lazy;

/// Allows custom behaviour on injection
///
/// Resolving through the context records `name` as a dependency of the component in creation.
pub trait Resolve {
    fn resolve(ctx: &CreationContext<'_>, name: &str) -> Result<Self, InjectError>
    where
        Self: Sized;
}
