//! Core container implementation for Khazna DI.

pub mod catalog;
pub mod container;
pub mod error;
pub mod name;
pub mod provider;
pub mod registry;
pub mod resolver;

mod lifecycle;

pub use catalog::{
    Catalog, declare_container, declare_provider, register_container, resolve_provider,
    shutdown_container,
};
pub use container::{Container, ContainerParams, InjectableValue, prelude};
pub use error::{BoxError, ConfigurationError, HookError, HookPhase, HookResult, KhaznaError, Result};
pub use name::ProviderName;
pub use provider::{Provider, ProviderClass};
pub use registry::Value;
pub use resolver::Resolver;
