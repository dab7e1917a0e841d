mod common;

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, OnceLock,
    },
};

use common::{holder, init_tracing, Holder};
use wrapp_container::{
    ComponentDefinition, ContainerBuilder, ContainerSettings, DynError, FnFactory, Instance,
    PostProcessor, RegistryError,
};

struct Left {
    right: OnceLock<Arc<Right>>,
}
struct Right {
    left: OnceLock<Arc<Left>>,
}

#[test]
fn settable_cycle_resolves_to_the_same_instances() {
    init_tracing();
    let left_calls = Arc::new(AtomicUsize::new(0));
    let right_calls = Arc::new(AtomicUsize::new(0));

    let left_counter = left_calls.clone();
    let right_counter = right_calls.clone();
    let container = ContainerBuilder::new()
        .definition(
            "left",
            ComponentDefinition::singleton(
                FnFactory::new(move |_| {
                    left_counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Instance::new(Left {
                        right: OnceLock::new(),
                    }))
                })
                .with_populate(|instance, ctx| {
                    let left = instance.downcast::<Left>()?;
                    let right = ctx.get_typed::<Right>("right")?;
                    left.right.set(right).map_err(|_| "right populated twice")?;
                    Ok(())
                }),
            ),
        )
        .definition(
            "right",
            ComponentDefinition::singleton(
                FnFactory::new(move |_| {
                    right_counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Instance::new(Right {
                        left: OnceLock::new(),
                    }))
                })
                .with_populate(|instance, ctx| {
                    let right = instance.downcast::<Right>()?;
                    let left = ctx.get_typed::<Left>("left")?;
                    right.left.set(left).map_err(|_| "left populated twice")?;
                    Ok(())
                }),
            ),
        )
        .build()
        .unwrap();

    let left = container.get_typed::<Left>("left").unwrap();
    let right = container.get_typed::<Right>("right").unwrap();

    assert!(Arc::ptr_eq(left.right.get().unwrap(), &right));
    assert!(Arc::ptr_eq(right.left.get().unwrap(), &left));
    assert_eq!(left_calls.load(Ordering::SeqCst), 1);
    assert_eq!(right_calls.load(Ordering::SeqCst), 1);
    assert!(container.registry().is_dependent("left", "right"));
    assert!(container.registry().is_dependent("right", "left"));
}

#[test]
fn constructor_cycle_cannot_be_resolved() {
    init_tracing();
    let constructor_of = |dependency: &'static str| {
        ComponentDefinition::singleton(FnFactory::new(move |ctx| {
            ctx.get(dependency)?;
            Ok(Instance::new(()))
        }))
    };

    let result = ContainerBuilder::new()
        .definition("a", constructor_of("b"))
        .definition("b", constructor_of("a"))
        .settings(ContainerSettings {
            eager_init: false,
            ..Default::default()
        })
        .build()
        .unwrap()
        .get("a");

    assert!(matches!(
        result,
        Err(RegistryError::CircularConstructorDependency { name }) if name == "a"
    ));
}

#[test]
fn settable_cycle_fails_without_early_references() {
    init_tracing();
    let container = ContainerBuilder::new()
        .definition("service", holder("service", "client"))
        .definition("client", holder("client", "service"))
        .settings(ContainerSettings {
            allow_circular_references: false,
            eager_init: false,
            ..Default::default()
        })
        .build()
        .unwrap();

    let err = container.get("service").unwrap_err();

    assert!(matches!(
        err,
        RegistryError::CircularConstructorDependency { name } if name == "service"
    ));
    assert_eq!(container.registry().singleton_count(), 0);
}

/// Stand in for a wrapper around a component, e.g. one that traces every call
struct Proxied {
    target: Instance,
}

/// Wraps "service" after its initialization
struct ProxyAfterInit;
impl PostProcessor for ProxyAfterInit {
    fn after_init(&self, instance: Instance, name: &str) -> Result<Option<Instance>, DynError> {
        if name != "service" {
            return Ok(Some(instance));
        }
        Ok(Some(Instance::new(Proxied { target: instance })))
    }
}

/// Wraps "service" as soon as its early reference is requested, and never twice
#[derive(Default)]
struct EarlyAwareProxy {
    wrapped_early: Mutex<HashSet<String>>,
}
impl PostProcessor for EarlyAwareProxy {
    fn early_reference(&self, instance: Instance, name: &str) -> Instance {
        if name != "service" {
            return instance;
        }
        self.wrapped_early.lock().unwrap().insert(name.to_string());
        Instance::new(Proxied { target: instance })
    }

    fn after_init(&self, instance: Instance, name: &str) -> Result<Option<Instance>, DynError> {
        if name != "service" || self.wrapped_early.lock().unwrap().contains(name) {
            return Ok(Some(instance));
        }
        Ok(Some(Instance::new(Proxied { target: instance })))
    }
}

fn service_and_client() -> ContainerBuilder {
    ContainerBuilder::new()
        .definition("service", holder("service", "client"))
        .definition("client", holder("client", "service"))
}

#[test]
fn wrapping_after_raw_injection_fails() {
    init_tracing();
    let result = service_and_client().post_processor(ProxyAfterInit).build();

    let Err(wrapp_container::InitError::Registry(err)) = result else {
        panic!("Expected the eager creation to fail");
    };
    assert!(matches!(
        err.root_cause(),
        RegistryError::RawReferenceInjected { name, dependents }
            if name == "service" && dependents == &vec!["client".to_string()]
    ));
}

#[test]
fn wrapping_after_raw_injection_can_be_allowed() {
    init_tracing();
    let container = service_and_client()
        .post_processor(ProxyAfterInit)
        .settings(ContainerSettings {
            allow_raw_injection_despite_wrapping: true,
            ..Default::default()
        })
        .build()
        .unwrap();

    let service = container.get_typed::<Proxied>("service").unwrap();
    let client = container.get_typed::<Holder>("client").unwrap();

    let injected = client.peer.get().unwrap();
    assert!(injected.same(&service.target));
    assert_eq!(injected.downcast::<Holder>().unwrap().name, "service");
}

#[test]
fn early_wrapping_keeps_references_consistent() {
    init_tracing();
    let container = service_and_client()
        .post_processor(EarlyAwareProxy::default())
        .build()
        .unwrap();

    let service = container.get("service").unwrap();
    let client = container.get_typed::<Holder>("client").unwrap();

    assert!(client.peer.get().unwrap().same(&service));
    assert!(service.downcast::<Proxied>().is_ok());
}

#[test]
fn failed_creation_destroys_dependents_holding_the_early_reference() {
    init_tracing();
    let container = ContainerBuilder::new()
        .definition(
            "service",
            ComponentDefinition::singleton(
                FnFactory::new(|_| Ok(Instance::new(())))
                    .with_populate(|_, ctx| {
                        ctx.get("client")?;
                        Err("service failed after its client was created".into())
                    }),
            )
            .lazy(),
        )
        .definition("client", holder("client", "service").lazy())
        .build()
        .unwrap();

    let err = container.get("service").unwrap_err();

    assert!(matches!(
        err,
        RegistryError::ComponentCreationFailed { ref name, .. } if name == "service"
    ));
    assert!(!container.registry().contains_singleton("client"));
    assert!(!container.registry().contains_singleton("service"));
    assert!(container.registry().singleton_names().is_empty());
}
