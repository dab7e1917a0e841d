#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::EnvFilter;
use wrapp_container::{ComponentDefinition, DynError, FnFactory, Instance, LifecycleCallback};

/// Routes container logs into the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Component holding a settable reference to a peer
pub struct Holder {
    pub name: &'static str,
    pub peer: OnceLock<Instance>,
}

/// Singleton whose peer is populated after the early reference is exposed
pub fn holder(name: &'static str, peer: &'static str) -> ComponentDefinition {
    ComponentDefinition::singleton(
        FnFactory::new(move |_| {
            Ok(Instance::new(Holder {
                name,
                peer: OnceLock::new(),
            }))
        })
        .with_populate(move |instance, ctx| {
            let holder = instance.downcast::<Holder>()?;
            let peer = ctx.get(peer)?;
            holder
                .peer
                .set(peer)
                .map_err(|_| DynError::from("peer populated twice"))
        }),
    )
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn callback(&self, event: &str) -> LifecycleCallback {
        let log = self.clone();
        let event = event.to_string();
        LifecycleCallback::new(event.clone(), move |_| {
            log.push(event.clone());
            Ok(())
        })
    }

    /// Singleton that logs its creation, init and destroy
    pub fn component(&self, name: &str) -> ComponentDefinition {
        let log = self.clone();
        let created = format!("create {name}");
        ComponentDefinition::singleton(FnFactory::new(move |_| {
            log.push(created.clone());
            Ok(Instance::new(()))
        }))
        .init_callback(self.callback(&format!("init {name}")))
        .destroy_callback(self.callback(&format!("destroy {name}")))
    }
}
