//! # The Container: heart of Khazna
//!
//! Declaring a container merges the registries of the containers it
//! composes, adds its own providers and values, then builds every provider
//! that has no instance yet.
//!
//! # Architecture
//! ```text
//! ContainerParams ──declare_container()──> ContainerBuilder
//!                                               │
//!                         merge sub-containers, add providers + values,
//!                               instantiate through the Resolver
//!                                               │
//!                                               ▼
//!                                           Container ──register()──> on_init × N
//!                                                     ──shutdown()──> shutdown × N
//! ```
//!
//! # Examples
//! ```rust
//! use khazna_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Logger;
//!
//! impl Provider for Logger {
//!     fn construct(_: Resolver) -> Self {
//!         Logger
//!     }
//! }
//!
//! struct UserService {
//!     deps: Resolver,
//! }
//!
//! impl Provider for UserService {
//!     fn construct(deps: Resolver) -> Self {
//!         Self { deps }
//!     }
//! }
//!
//! impl UserService {
//!     fn logger(&self) -> Option<Arc<Logger>> {
//!         self.deps.get("logger")
//!     }
//! }
//!
//! struct App;
//!
//! let catalog = Catalog::new();
//! catalog.declare_provider::<Logger>().unwrap();
//! catalog.declare_provider::<UserService>().unwrap();
//!
//! let app = catalog
//!     .declare_container::<App>(ContainerParams::new().provider::<Logger>().provider::<UserService>())
//!     .expect("Failed to declare container");
//!
//! let service = app.resolve_provider::<UserService>().unwrap();
//! let logger = app.resolve_provider::<Logger>().unwrap();
//! assert!(Arc::ptr_eq(&service.logger().unwrap(), &logger));
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::catalog::Catalog;
use crate::error::{
    ConfigurationError, DuplicateProviderError, NameCollisionError, Result,
};
use crate::lifecycle::Lifecycle;
use crate::name::ProviderName;
use crate::provider::Provider;
use crate::registry::{Registry, Value};

// ============================================================
// ContainerParams
// ============================================================

/// A named constant injected into a container.
#[derive(Clone)]
pub struct InjectableValue {
    pub name: ProviderName,
    pub value: Value,
}

impl InjectableValue {
    pub fn new<T: Any + Send + Sync>(name: impl Into<ProviderName>, value: T) -> Self {
        Self::shared(name, Arc::new(value))
    }

    /// Injects an already shared value; lookups hand out this same `Arc`.
    pub fn shared(name: impl Into<ProviderName>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl fmt::Debug for InjectableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectableValue")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
struct ClassRef {
    type_id: TypeId,
    type_name: &'static str,
}

impl ClassRef {
    fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    fn short_name(&self) -> String {
        khazna_support::rendering::shorten_type_name(self.type_name)
    }
}

/// What a container is made of. Every part is optional.
///
/// Types are referenced by identity; each must have been declared in the
/// same catalog (providers with `declare_provider`, containers with
/// `declare_container`) before this container is declared.
///
/// ```rust,ignore
/// ContainerParams::new()
///     .container::<UserContainer>()
///     .provider::<MainService>()
///     .value("apiUrl", String::from("https://example.org"))
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContainerParams {
    providers: Vec<ClassRef>,
    containers: Vec<ClassRef>,
    values: Vec<InjectableValue>,
}

impl ContainerParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider owned by this container.
    pub fn provider<P: 'static>(mut self) -> Self {
        self.providers.push(ClassRef::of::<P>());
        self
    }

    /// Composes another container; its instances are shared, not rebuilt.
    pub fn container<C: 'static>(mut self) -> Self {
        self.containers.push(ClassRef::of::<C>());
        self
    }

    /// Injects a constant under `name`.
    pub fn value<T: Any + Send + Sync>(mut self, name: impl Into<ProviderName>, value: T) -> Self {
        self.values.push(InjectableValue::new(name, value));
        self
    }

    pub fn values(mut self, values: impl IntoIterator<Item = InjectableValue>) -> Self {
        self.values.extend(values);
        self
    }
}

// ============================================================
// ContainerBuilder
// ============================================================

/// Runs one container declaration against a catalog.
pub(crate) struct ContainerBuilder<'a> {
    catalog: &'a Catalog,
    name: String,
    registry: Arc<Registry>,
}

impl<'a> ContainerBuilder<'a> {
    pub(crate) fn new(catalog: &'a Catalog, name: String) -> Self {
        Self {
            catalog,
            registry: Arc::new(Registry::new(name.clone())),
            name,
        }
    }

    #[instrument(skip_all, name = "container_build", fields(container = %self.name))]
    pub(crate) fn build(self, params: ContainerParams) -> Result<Container> {
        self.merge_containers(&params.containers)?;
        self.add_providers(&params.providers)?;
        self.add_values(params.values)?;

        for class in self.registry.pending() {
            self.registry.instantiate(&class);
        }

        info!(
            instances = self.registry.instance_names().len(),
            values = self.registry.value_names().len(),
            "Container declared"
        );
        Ok(Container::new(self.name, self.registry))
    }

    fn merge_containers(&self, containers: &[ClassRef]) -> Result<()> {
        for class in containers {
            let child = self.catalog.container_of(class.type_id).ok_or_else(|| {
                ConfigurationError::NotAContainer {
                    type_name: class.short_name(),
                    context: self.name.clone(),
                }
            })?;

            let stats = self.registry.absorb(&child.inner.registry);
            debug!(
                from = child.name(),
                instances = stats.instances,
                providers = stats.providers,
                values = stats.values,
                "Merged container"
            );
        }
        Ok(())
    }

    fn add_providers(&self, providers: &[ClassRef]) -> Result<()> {
        for class in providers {
            let provider = self.catalog.provider_class(class.type_id).ok_or_else(|| {
                ConfigurationError::NotAProvider {
                    type_name: class.short_name(),
                    container: self.name.clone(),
                }
            })?;

            if self.registry.has_provider(provider.name().as_str()) {
                return Err(ConfigurationError::DuplicateProvider(DuplicateProviderError {
                    name: provider.name().clone(),
                    container: self.name.clone(),
                })
                .into());
            }

            self.registry.add_provider(provider);
        }
        Ok(())
    }

    fn add_values(&self, values: Vec<InjectableValue>) -> Result<()> {
        for InjectableValue { name, value } in values {
            if self.registry.has_name(name.as_str()) {
                return Err(ConfigurationError::NameCollision(NameCollisionError {
                    name,
                    container: self.name.clone(),
                })
                .into());
            }

            self.registry.add_value(name, value);
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

struct ContainerMeta {
    name: String,
    registry: Arc<Registry>,
    lifecycle: Lifecycle,
}

/// A declared container: its merged registry plus the lifecycle sequences.
///
/// Cloning is cheap; clones share the same registry and instances.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerMeta>,
}

impl Container {
    fn new(name: String, registry: Arc<Registry>) -> Self {
        Self {
            inner: Arc::new(ContainerMeta {
                name,
                lifecycle: Lifecycle::new(registry.clone()),
                registry,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of instances held, including those shared from sub-containers.
    pub fn len(&self) -> usize {
        self.inner.registry.instance_names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Instance names in registration order.
    pub fn instance_names(&self) -> Vec<ProviderName> {
        self.inner.registry.instance_names()
    }

    pub fn value_names(&self) -> Vec<ProviderName> {
        self.inner.registry.value_names()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.registry.has_name(name)
    }

    /// The singleton `P` of this container, if it holds one.
    pub fn resolve_provider<P: Provider>(&self) -> Option<Arc<P>> {
        let name = ProviderName::of::<P>();
        self.inner.registry.instance(name.as_str())?.downcast::<P>().ok()
    }

    /// Looks `name` up the same way a provider's resolver does.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        self.inner.registry.resolve(name)
    }

    /// Runs every `on_init` hook in registration order; stops at the first error.
    ///
    /// Register and shutdown share one non-reentrant gate that is held while
    /// hooks run. A hook that calls `register` or `shutdown` on its own
    /// container (directly or through the catalog) deadlocks.
    pub async fn register(&self) -> Result<()> {
        self.inner.lifecycle.register().await?;
        Ok(())
    }

    /// Runs every `shutdown` hook in registration order; errors are logged.
    ///
    /// Holds the same gate as [`Container::register`]; calling either from
    /// inside a hook of this container never returns.
    pub async fn shutdown(&self) {
        self.inner.lifecycle.shutdown().await;
    }

    /// Shared instance handles, for identity checks in tests.
    #[cfg(test)]
    fn managed(&self, name: &str) -> Option<Arc<dyn crate::provider::ManagedProvider>> {
        use crate::provider::ManagedProvider as _;

        self.inner
            .registry
            .managed_instances()
            .into_iter()
            .find(|m| m.name().as_str() == name)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.inner.name)
            .field("instances", &self.inner.registry.instance_names())
            .field("values", &self.inner.registry.value_names())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerParams, InjectableValue};
    pub use crate::catalog::{
        Catalog, declare_container, declare_provider, register_container, resolve_provider,
        shutdown_container,
    };
    pub use crate::error::{HookResult, KhaznaError, Result};
    pub use crate::name::ProviderName;
    pub use crate::provider::Provider;
    pub use crate::resolver::Resolver;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
