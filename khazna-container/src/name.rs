//! Provider names.
//!
//! [`ProviderName`] is the only key the container uses for lookup. Providers,
//! values and instances of one container all share a single namespace.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use khazna_support::naming::provider_name;

/// Identifies a provider or value inside a container.
///
/// For providers the name is derived from the Rust type: the module path is
/// dropped and the first character is lower-cased.
///
/// # Examples
/// ```
/// use khazna_container::name::ProviderName;
///
/// struct UserService;
///
/// assert_eq!(ProviderName::of::<UserService>().as_str(), "userService");
/// assert_eq!(ProviderName::new("apiUrl").as_str(), "apiUrl");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderName(Arc<str>);

impl ProviderName {
    /// Wraps `name` verbatim.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Derives the provider name of type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::from_type_name(std::any::type_name::<T>())
    }

    /// Derives a provider name from a fully qualified type name.
    pub fn from_type_name(type_name: &str) -> Self {
        Self(Arc::from(provider_name(type_name)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ProviderName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProviderName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ProviderName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Debug for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderName({:?})", &*self.0)
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
