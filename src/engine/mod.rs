//! The in-process media engine.
//!
//! Process-wide state is created once by [`init`] and never torn down. It
//! carries the configuration, the factory table and the instance-name
//! counters; every pipeline then runs its own streaming thread.

pub mod bus;
pub mod caps;
pub mod factory;
pub mod message;
pub(crate) mod streaming;

use crate::config::BridgeConfig;
use crate::dispatch::registry::HandleRegistry;
use crate::error::{BridgeError, Result};
use crate::sync::lock;
use factory::FactoryRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

static ENGINE: OnceLock<Engine> = OnceLock::new();

pub struct Engine {
    config: BridgeConfig,
    factories: FactoryRegistry,
    instance_counters: Mutex<HashMap<&'static str, u32>>,
}

impl Engine {
    fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            factories: FactoryRegistry::builtin(),
            instance_counters: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    pub fn registry(&self) -> Arc<HandleRegistry> {
        HandleRegistry::global()
    }

    /// `<prefix><n>`, counting separately per prefix.
    pub fn next_instance_name(&self, prefix: &'static str) -> String {
        let mut counters = lock(&self.instance_counters);
        let counter = counters.entry(prefix).or_insert(0);
        let name = format!("{}{}", prefix, counter);
        *counter += 1;
        name
    }
}

/// Start the engine. Later calls are no-ops, and their config is ignored.
pub fn init(config: BridgeConfig) -> &'static Engine {
    let mut fresh = false;
    let engine = ENGINE.get_or_init(|| {
        fresh = true;
        Engine::new(config)
    });
    if fresh {
        tracing::info!(
            "Engine initialized with {} node kinds",
            engine.factories.kinds().len()
        );
    } else {
        tracing::debug!("Engine already initialized");
    }
    engine
}

pub fn get() -> Result<&'static Engine> {
    ENGINE.get().ok_or(BridgeError::NotInitialized)
}

pub fn is_initialized() -> bool {
    ENGINE.get().is_some()
}
