use std::{
    any::{type_name, Any},
    fmt::Debug,
    sync::Arc,
};

/// Errors crossing the boundary into user supplied factories and hooks
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Components are shared between threads
/// So anything managed by the container needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Shared, type erased handle to a component instance
///
/// Cloning an [Instance] clones the handle, never the component.
#[derive(Clone)]
pub struct Instance {
    pub type_name: &'static str,
    pub value: Arc<dyn Any + Send + Sync + 'static>,
}

impl Instance {
    pub fn new<T: Injectable>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an existing allocation without copying it
    pub fn from_arc<T: Injectable>(value: Arc<T>) -> Self {
        Instance {
            type_name: type_name::<T>(),
            value,
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.value.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.type_name),
        }
    }

    /// Identity check - two handles are the same if they point to the same allocation
    pub fn same(&self, other: &Instance) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(&other.value))
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .field("address", &Arc::as_ptr(&self.value).cast::<()>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_reports_actual_type() {
        let instance = Instance::new(42_u32);

        assert_eq!(*instance.downcast::<u32>().unwrap(), 42);
        assert_eq!(instance.downcast::<String>().unwrap_err(), "u32");
    }

    #[test]
    fn identity_follows_the_allocation() {
        let shared = Arc::new(String::from("shared"));
        let first = Instance::from_arc(shared.clone());
        let second = Instance::from_arc(shared);
        let other = Instance::new(String::from("shared"));

        assert!(first.same(&second));
        assert!(first.same(&first.clone()));
        assert!(!first.same(&other));
    }
}
