//! Providers and their lifecycle wrapper.
//!
//! A provider is a singleton service. It is built once per container from a
//! [`Resolver`] and may implement two async hooks that the container runs on
//! startup and teardown.
//!
//! # Examples
//! ```rust,ignore
//! struct Database {
//!     deps: Resolver,
//! }
//!
//! #[async_trait]
//! impl Provider for Database {
//!     fn construct(deps: Resolver) -> Self {
//!         Self { deps }
//!     }
//!
//!     async fn on_init(&self) -> HookResult {
//!         let url: Arc<String> = self.deps.get("databaseUrl").ok_or("missing databaseUrl")?;
//!         connect(&url).await?;
//!         Ok(())
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::{HookError, HookPhase, HookResult};
use crate::name::ProviderName;
use crate::resolver::Resolver;

type ConstructFn = fn(ProviderName, Resolver) -> Arc<dyn ManagedProvider>;

/// A singleton service managed by a container.
///
/// `construct` receives the container's [`Resolver`]. Keep it and look up
/// dependencies when they are needed, usually from `on_init` or later:
/// during construction a dependency that is itself still being built
/// resolves to `None`.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Builds the provider. Called once per container that owns it.
    fn construct(resolver: Resolver) -> Self
    where
        Self: Sized;

    /// Runs once when the owning container is registered.
    async fn on_init(&self) -> HookResult {
        Ok(())
    }

    /// Runs once when the owning container is shut down.
    async fn shutdown(&self) -> HookResult {
        Ok(())
    }
}

/// Object-safe view of a provider instance as the container sees it.
#[async_trait]
pub(crate) trait ManagedProvider: Send + Sync {
    fn name(&self) -> &ProviderName;

    /// The provider instance itself, type-erased.
    fn instance(&self) -> Arc<dyn Any + Send + Sync>;

    /// Runs `on_init` unless it already ran.
    async fn register(&self) -> Result<(), HookError>;

    /// Runs `shutdown` unless it already ran. Errors are logged, not returned.
    async fn shutdown(&self);
}

/// Wraps a provider with the two "already ran" flags.
pub(crate) struct Managed<P> {
    name: ProviderName,
    instance: Arc<P>,
    registered: AtomicBool,
    shut_down: AtomicBool,
}

impl<P: Provider> Managed<P> {
    pub(crate) fn new(name: ProviderName, instance: P) -> Self {
        Self {
            name,
            instance: Arc::new(instance),
            registered: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl<P: Provider> ManagedProvider for Managed<P> {
    fn name(&self) -> &ProviderName {
        &self.name
    }

    fn instance(&self) -> Arc<dyn Any + Send + Sync> {
        self.instance.clone()
    }

    async fn register(&self) -> Result<(), HookError> {
        // The flag flips before the hook runs: a failed init is not retried.
        if self.registered.swap(true, Ordering::AcqRel) {
            debug!(provider = %self.name, "Provider already registered, skipping");
            return Ok(());
        }

        self.instance.on_init().await.map_err(|source| HookError {
            provider: self.name.clone(),
            phase: HookPhase::Init,
            source,
        })
    }

    async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            debug!(provider = %self.name, "Provider already shut down, skipping");
            return;
        }

        if let Err(source) = Provider::shutdown(&*self.instance).await {
            let err = HookError {
                provider: self.name.clone(),
                phase: HookPhase::Shutdown,
                source,
            };
            error!(provider = %err.provider, error = %err, "Shutdown error");
        }
    }
}

impl<P> fmt::Debug for Managed<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Managed")
            .field("name", &self.name)
            .field("registered", &self.registered.load(Ordering::Acquire))
            .field("shut_down", &self.shut_down.load(Ordering::Acquire))
            .finish()
    }
}

/// Descriptor of a provider type: its name and how to build it.
///
/// This is what the catalog stores for a declared provider and what a
/// container's registry keeps for providers it has not built yet.
#[derive(Clone)]
pub struct ProviderClass {
    type_id: TypeId,
    type_name: &'static str,
    name: ProviderName,
    construct: ConstructFn,
}

impl ProviderClass {
    /// Describes provider type `P`.
    pub fn of<P: Provider>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            name: ProviderName::of::<P>(),
            construct: construct_managed::<P>,
        }
    }

    #[inline]
    pub fn name(&self) -> &ProviderName {
        &self.name
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn construct(&self, resolver: Resolver) -> Arc<dyn ManagedProvider> {
        (self.construct)(self.name.clone(), resolver)
    }
}

impl fmt::Debug for ProviderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClass")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish()
    }
}

fn construct_managed<P: Provider>(name: ProviderName, resolver: Resolver) -> Arc<dyn ManagedProvider> {
    Arc::new(Managed::new(name, P::construct(resolver)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Counting {
        inits: AtomicU32,
        shutdowns: AtomicU32,
        fail_init: bool,
        fail_shutdown: bool,
    }

    #[async_trait]
    impl Provider for Counting {
        fn construct(_: Resolver) -> Self {
            Self::default()
        }

        async fn on_init(&self) -> HookResult {
            self.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                return Err("init exploded".into());
            }
            Ok(())
        }

        async fn shutdown(&self) -> HookResult {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            if self.fail_shutdown {
                return Err("shutdown exploded".into());
            }
            Ok(())
        }
    }

    fn managed(provider: Counting) -> Managed<Counting> {
        Managed::new(ProviderName::new("counting"), provider)
    }

    #[tokio::test]
    async fn register_runs_on_init_once() {
        let m = managed(Counting::default());

        m.register().await.unwrap();
        m.register().await.unwrap();

        assert_eq!(m.instance.inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_init_is_reported_and_not_retried() {
        let m = managed(Counting {
            fail_init: true,
            ..Default::default()
        });

        let err = m.register().await.unwrap_err();
        assert_eq!(err.phase, HookPhase::Init);
        assert_eq!(err.provider.as_str(), "counting");

        assert!(m.register().await.is_ok());
        assert_eq!(m.instance.inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_runs_once() {
        let m = managed(Counting::default());

        ManagedProvider::shutdown(&m).await;
        ManagedProvider::shutdown(&m).await;

        assert_eq!(m.instance.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn shutdown_error_is_logged_not_returned() {
        let m = managed(Counting {
            fail_shutdown: true,
            ..Default::default()
        });

        ManagedProvider::shutdown(&m).await;

        assert_eq!(m.instance.shutdowns.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Shutdown error"));
        assert!(logs_contain("shutdown exploded"));
        assert!(logs_contain("failed in shutdown"));
    }

    #[tokio::test]
    async fn default_hooks_are_noops() {
        struct Plain;

        impl Provider for Plain {
            fn construct(_: Resolver) -> Self {
                Plain
            }
        }

        let m = Managed::new(ProviderName::new("plain"), Plain);
        assert!(m.register().await.is_ok());
        ManagedProvider::shutdown(&m).await;
        assert!(format!("{m:?}").contains("shut_down: true"));
    }

    #[test]
    fn provider_class_describes_type() {
        let class = ProviderClass::of::<Counting>();
        assert_eq!(class.name().as_str(), "counting");
        assert_eq!(class.type_id(), TypeId::of::<Counting>());
        assert!(class.type_name().ends_with("Counting"));
        assert!(format!("{class:?}").contains("counting"));
    }

    #[test]
    fn provider_class_builds_wrapped_instance() {
        let class = ProviderClass::of::<Counting>();
        let managed = class.construct(Resolver::detached());
        assert_eq!(managed.name().as_str(), "counting");
        assert!(managed.instance().downcast::<Counting>().is_ok());
    }

    #[test]
    fn instance_downcasts_to_provider_type() {
        let m = managed(Counting::default());
        let any = m.instance();
        assert!(any.downcast::<Counting>().is_ok());
    }
}
