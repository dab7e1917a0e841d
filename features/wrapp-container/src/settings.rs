/// Behaviour switches of a [crate::Container]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSettings {
    /// Expose early references of singletons in creation, so circular references resolve
    pub allow_circular_references: bool,
    /// Accept that a dependent holds the raw early reference while the final instance
    /// got substituted by a post processor
    pub allow_raw_injection_despite_wrapping: bool,
    /// Create all non lazy singletons while building the container
    pub eager_init: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            allow_circular_references: true,
            allow_raw_injection_despite_wrapping: false,
            eager_init: true,
        }
    }
}
