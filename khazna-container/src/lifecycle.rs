//! Ordered startup and teardown of a container's instances.
//!
//! Instances are visited in the order they entered the registry. Startup
//! stops at the first failing `on_init`; teardown always visits everyone.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::HookError;
use crate::provider::ManagedProvider;
use crate::registry::Registry;

/// Runs the register / shutdown sequences of one container.
///
/// A gate serializes the two sequences so hooks of one container never
/// overlap, even if callers race.
pub(crate) struct Lifecycle {
    registry: Arc<Registry>,
    gate: Mutex<()>,
}

impl Lifecycle {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            gate: Mutex::new(()),
        }
    }

    #[instrument(skip(self), name = "container_register", fields(container = %self.registry.container()))]
    pub async fn register(&self) -> Result<(), HookError> {
        let _gate = self.gate.lock().await;

        for instance in self.registry.managed_instances() {
            info!(provider = %instance.name(), "Init provider: {}", instance.name());
            instance.register().await?;
        }

        debug!("Container registered");
        Ok(())
    }

    #[instrument(skip(self), name = "container_shutdown", fields(container = %self.registry.container()))]
    pub async fn shutdown(&self) {
        let _gate = self.gate.lock().await;

        for instance in self.registry.managed_instances() {
            debug!(provider = %instance.name(), "Shutting down provider");
            instance.shutdown().await;
        }

        debug!("Container shut down");
    }
}
