//! The lazy resolver handed to provider constructors.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::{Arc, Weak};

use tracing::warn;

use crate::registry::{Registry, Value};

/// On-demand lookup of a container's dependencies by name.
///
/// Every provider receives one in [`Provider::construct`](crate::provider::Provider::construct).
/// Lookups never fail: anything that cannot be resolved comes back as `None`.
///
/// Resolution order for a name:
/// 1. an injected value with that name, even an "empty" one;
/// 2. `None` if that provider is still being constructed (cycle guard);
/// 3. the already-built instance;
/// 4. the provider registered under that name, built now and cached;
/// 5. otherwise `None`.
///
/// The resolver holds the registry weakly. Once the owning container is
/// gone every lookup returns `None`.
#[derive(Clone)]
pub struct Resolver {
    registry: Weak<Registry>,
}

impl Resolver {
    pub(crate) fn new(registry: Weak<Registry>) -> Self {
        Self { registry }
    }

    /// A resolver bound to no container. Useful to build a provider by hand
    /// in tests; every lookup returns `None`.
    pub fn detached() -> Self {
        Self {
            registry: Weak::new(),
        }
    }

    /// Resolves `name` to a type-erased dependency.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        self.registry.upgrade()?.resolve(name)
    }

    /// Resolves `name` and downcasts it to `T`.
    ///
    /// Providers are stored as `Arc<P>`, values as `Arc<T>` of the type they
    /// were injected with. A type mismatch resolves to `None`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self.resolve(name)?.downcast::<T>() {
            Ok(dependency) => Some(dependency),
            Err(_) => {
                warn!(
                    dependency = name,
                    expected = type_name::<T>(),
                    "Dependency has a different type than requested"
                );
                None
            }
        }
    }

    /// Whether the owning container is still alive.
    pub fn is_attached(&self) -> bool {
        self.registry.strong_count() > 0
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.registry.upgrade() {
            Some(registry) => f
                .debug_struct("Resolver")
                .field("container", &registry.container())
                .finish(),
            None => f.debug_struct("Resolver").field("container", &None::<&str>).finish(),
        }
    }
}
