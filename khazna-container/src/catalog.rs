//! The catalog: a side-table of declared providers and containers.
//!
//! Declaring a type stores its descriptor under the type's [`TypeId`], once.
//! Container declarations read the catalog to find the providers and
//! sub-containers they list; lifecycle calls and provider lookups read it to
//! find the container they address.
//!
//! Most applications use the process-wide [`Catalog::global()`] through the
//! free functions at the bottom of this module. Separate catalogs are handy
//! in tests.

use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use khazna_support::rendering::shorten_type_name;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::container::{Container, ContainerBuilder, ContainerParams};
use crate::error::{ConfigurationError, Result};
use crate::provider::{Provider, ProviderClass};

static GLOBAL: Lazy<Catalog> = Lazy::new(Catalog::new);

#[derive(Clone)]
enum ClassDescriptor {
    Provider(ProviderClass),
    Container(Container),
}

impl ClassDescriptor {
    fn kind(&self) -> &'static str {
        match self {
            ClassDescriptor::Provider(_) => "provider",
            ClassDescriptor::Container(_) => "container",
        }
    }
}

/// Side-table of provider and container descriptors keyed by type.
#[derive(Default)]
pub struct Catalog {
    classes: DashMap<TypeId, ClassDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide catalog used by the free functions of this module.
    pub fn global() -> &'static Catalog {
        &GLOBAL
    }

    /// Marks `P` as a provider.
    ///
    /// # Errors
    /// [`ConfigurationError::AlreadyDeclared`] if `P` was declared before.
    pub fn declare_provider<P: Provider>(&self) -> Result<ProviderClass> {
        let class = ProviderClass::of::<P>();

        match self.classes.entry(TypeId::of::<P>()) {
            Entry::Occupied(existing) => Err(already_declared::<P>(existing.get().kind())),
            Entry::Vacant(slot) => {
                debug!(provider = %class.name(), "Provider declared");
                slot.insert(ClassDescriptor::Provider(class.clone()));
                Ok(class)
            }
        }
    }

    /// Builds container `C` from `params` and records it.
    ///
    /// Every provider of the merged registry is instantiated before this
    /// returns.
    ///
    /// # Errors
    /// Any [`ConfigurationError`]: `C` already declared, a listed type that
    /// is not a declared provider or container, a duplicate provider name,
    /// or a value name collision. Nothing is instantiated when the
    /// declaration is rejected.
    pub fn declare_container<C: 'static>(&self, params: ContainerParams) -> Result<Container> {
        let type_id = TypeId::of::<C>();

        let existing = self.classes.get(&type_id).map(|d| d.kind());
        if let Some(kind) = existing {
            return Err(already_declared::<C>(kind));
        }

        let container = ContainerBuilder::new(self, shorten_type_name(type_name::<C>())).build(params)?;

        match self.classes.entry(type_id) {
            Entry::Occupied(existing) => Err(already_declared::<C>(existing.get().kind())),
            Entry::Vacant(slot) => {
                slot.insert(ClassDescriptor::Container(container.clone()));
                Ok(container)
            }
        }
    }

    /// The declared container `C`.
    pub fn container<C: 'static>(&self) -> Result<Container> {
        self.require_container::<C>("container lookup")
    }

    pub fn is_provider<T: 'static>(&self) -> bool {
        self.provider_class(TypeId::of::<T>()).is_some()
    }

    pub fn is_container<T: 'static>(&self) -> bool {
        self.container_of(TypeId::of::<T>()).is_some()
    }

    /// Runs every `on_init` hook of container `C`, in order.
    ///
    /// # Errors
    /// [`ConfigurationError::NotAContainer`] if `C` was not declared, or the
    /// first hook error, which aborts the remaining hooks.
    pub async fn register_container<C: 'static>(&self) -> Result<()> {
        let container = self.require_container::<C>("register_container")?;
        container.register().await
    }

    /// Runs every `shutdown` hook of container `C`. Hook errors are logged.
    ///
    /// # Errors
    /// [`ConfigurationError::NotAContainer`] if `C` was not declared.
    pub async fn shutdown_container<C: 'static>(&self) -> Result<()> {
        let container = self.require_container::<C>("shutdown_container")?;
        container.shutdown().await;
        Ok(())
    }

    /// The singleton `P` held by container `C`.
    ///
    /// `None` if `P` is not a declared provider, `C` is not a declared
    /// container, or `C` does not hold a `P`.
    pub fn resolve_provider<C: 'static, P: Provider>(&self) -> Option<Arc<P>> {
        if !self.is_provider::<P>() {
            debug!(provider = type_name::<P>(), "Not a declared provider");
            return None;
        }

        let container = self.container_of(TypeId::of::<C>());
        if container.is_none() {
            debug!(container = type_name::<C>(), "Not a declared container");
        }
        container?.resolve_provider::<P>()
    }

    pub(crate) fn provider_class(&self, type_id: TypeId) -> Option<ProviderClass> {
        match self.classes.get(&type_id)?.value() {
            ClassDescriptor::Provider(class) => Some(class.clone()),
            ClassDescriptor::Container(_) => None,
        }
    }

    pub(crate) fn container_of(&self, type_id: TypeId) -> Option<Container> {
        match self.classes.get(&type_id)?.value() {
            ClassDescriptor::Container(container) => Some(container.clone()),
            ClassDescriptor::Provider(_) => None,
        }
    }

    fn require_container<C: 'static>(&self, context: &str) -> Result<Container> {
        self.container_of(TypeId::of::<C>()).ok_or_else(|| {
            ConfigurationError::NotAContainer {
                type_name: shorten_type_name(type_name::<C>()),
                context: context.to_string(),
            }
            .into()
        })
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mut providers, mut containers) = (0, 0);
        for entry in self.classes.iter() {
            match entry.value() {
                ClassDescriptor::Provider(_) => providers += 1,
                ClassDescriptor::Container(_) => containers += 1,
            }
        }
        f.debug_struct("Catalog")
            .field("providers", &providers)
            .field("containers", &containers)
            .finish()
    }
}

fn already_declared<T: ?Sized>(kind: &'static str) -> crate::error::KhaznaError {
    ConfigurationError::AlreadyDeclared {
        type_name: shorten_type_name(type_name::<T>()),
        kind,
    }
    .into()
}

// ═══════════════════════════════════════════
// Free functions over the global catalog
// ═══════════════════════════════════════════

/// Declares provider `P` in the global catalog.
pub fn declare_provider<P: Provider>() -> Result<ProviderClass> {
    Catalog::global().declare_provider::<P>()
}

/// Declares container `C` in the global catalog.
pub fn declare_container<C: 'static>(params: ContainerParams) -> Result<Container> {
    Catalog::global().declare_container::<C>(params)
}

/// Runs the startup hooks of global container `C`.
pub async fn register_container<C: 'static>() -> Result<()> {
    Catalog::global().register_container::<C>().await
}

/// Runs the teardown hooks of global container `C`.
pub async fn shutdown_container<C: 'static>() -> Result<()> {
    Catalog::global().shutdown_container::<C>().await
}

/// Looks up singleton `P` in global container `C`.
pub fn resolve_provider<C: 'static, P: Provider>() -> Option<Arc<P>> {
    Catalog::global().resolve_provider::<C, P>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KhaznaError;
    use crate::resolver::Resolver;

    struct Clock;
    impl Provider for Clock {
        fn construct(_: Resolver) -> Self {
            Clock
        }
    }

    struct Stranger;
    impl Provider for Stranger {
        fn construct(_: Resolver) -> Self {
            Stranger
        }
    }

    struct App;
    struct Undeclared;

    #[test]
    fn provider_declared_once() {
        let catalog = Catalog::new();
        let class = catalog.declare_provider::<Clock>().unwrap();
        assert_eq!(class.name().as_str(), "clock");
        assert!(catalog.is_provider::<Clock>());
        assert!(!catalog.is_container::<Clock>());

        match catalog.declare_provider::<Clock>() {
            Err(KhaznaError::Configuration(ConfigurationError::AlreadyDeclared { kind, .. })) => {
                assert_eq!(kind, "provider");
            }
            other => panic!("Expected AlreadyDeclared, got: {other:?}"),
        }
    }

    #[test]
    fn container_declared_once() {
        let catalog = Catalog::new();
        catalog.declare_container::<App>(ContainerParams::new()).unwrap();
        assert!(catalog.is_container::<App>());
        assert!(catalog.container::<App>().is_ok());

        let err = catalog.declare_container::<App>(ContainerParams::new()).unwrap_err();
        assert!(err.to_string().contains("App is already declared as a container"));
    }

    #[tokio::test]
    async fn lifecycle_calls_need_a_container() {
        let catalog = Catalog::new();
        catalog.declare_provider::<Clock>().unwrap();

        for err in [
            catalog.register_container::<Undeclared>().await.unwrap_err(),
            catalog.shutdown_container::<Clock>().await.unwrap_err(),
        ] {
            assert!(matches!(
                err,
                KhaznaError::Configuration(ConfigurationError::NotAContainer { .. })
            ));
        }
    }

    #[test]
    fn resolve_provider_answers_absent_for_unknowns() {
        let catalog = Catalog::new();
        catalog.declare_provider::<Clock>().unwrap();
        catalog.declare_provider::<Stranger>().unwrap();
        catalog
            .declare_container::<App>(ContainerParams::new().provider::<Clock>())
            .unwrap();

        assert!(catalog.resolve_provider::<App, Clock>().is_some());
        assert!(catalog.resolve_provider::<App, Stranger>().is_none());
        assert!(catalog.resolve_provider::<Undeclared, Clock>().is_none());
    }

    #[test]
    fn catalogs_are_independent() {
        let one = Catalog::new();
        let two = Catalog::new();
        one.declare_provider::<Clock>().unwrap();

        assert!(two.declare_provider::<Clock>().is_ok());
        assert!(format!("{one:?}").contains("providers: 1"));
    }
}
