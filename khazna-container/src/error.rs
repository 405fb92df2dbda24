//! Error types for Khazna container operations.
//!
//! Two kinds of failure exist: configuration mistakes, which surface while a
//! container is being declared, and errors returned by a provider's own
//! `on_init` hook. Unresolved dependencies are never errors.

use std::fmt;

use crate::name::ProviderName;

/// Boxed error returned by provider hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a provider's `on_init` / `shutdown` hook.
pub type HookResult = std::result::Result<(), BoxError>;

/// Main error type for all Khazna operations.
#[derive(Debug, thiserror::Error)]
pub enum KhaznaError {
    /// The catalog or a container declaration is misconfigured.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A provider's `on_init` hook failed; startup was aborted.
    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Mistakes detected while declaring or addressing containers.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A type used as a container was never declared as one.
    #[error(
        "{type_name} is not a declared container (used by {context})\n  Hint: Call declare_container::<{type_name}>() first"
    )]
    NotAContainer {
        type_name: String,
        context: String,
    },

    /// A type listed as a provider was never declared as one.
    #[error(
        "{type_name} is not a declared provider (listed in {container})\n  Hint: Call declare_provider::<{type_name}>() before declaring the container"
    )]
    NotAProvider {
        type_name: String,
        container: String,
    },

    /// Two providers of one container map to the same name.
    #[error("{}", .0)]
    DuplicateProvider(DuplicateProviderError),

    /// A value name is already taken by a provider, instance or value.
    #[error("{}", .0)]
    NameCollision(NameCollisionError),

    /// The type already carries provider or container metadata.
    #[error("{type_name} is already declared as a {kind}")]
    AlreadyDeclared {
        type_name: String,
        kind: &'static str,
    },
}

/// A provider name that is already present in the container being declared.
#[derive(Debug)]
pub struct DuplicateProviderError {
    pub name: ProviderName,
    pub container: String,
}

impl fmt::Display for DuplicateProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Provider '{}' already exists in container {}",
            self.name, self.container
        )?;
        write!(
            f,
            "\n  Hint: List each provider once; providers of composed containers are already included"
        )
    }
}

/// A value whose name is already used inside the container.
#[derive(Debug)]
pub struct NameCollisionError {
    pub name: ProviderName,
    pub container: String,
}

impl fmt::Display for NameCollisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Value name '{}' is already injected in container {}",
            self.name, self.container
        )?;
        write!(f, "\n  Hint: Use another name for the value")
    }
}

/// Which lifecycle hook produced a [`HookError`].
///
/// `on_init` errors are returned to the caller. `Shutdown` errors are only
/// logged, since teardown keeps going past them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Init,
    Shutdown,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Init => write!(f, "on_init"),
            HookPhase::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Error returned by a provider hook, tagged with the provider it came from.
#[derive(Debug, thiserror::Error)]
#[error("Provider '{provider}' failed in {phase}: {source}")]
pub struct HookError {
    pub provider: ProviderName,
    pub phase: HookPhase,
    #[source]
    pub source: BoxError,
}

/// Convenient Result type for Khazna operations.
pub type Result<T> = std::result::Result<T, KhaznaError>;
