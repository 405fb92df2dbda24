//! Provider-name derivation.
//!
//! Every provider in a container is addressed by one string: its type name
//! without the module path, with the first character lower-cased.

use crate::rendering::shorten_type_name;

/// Lower-cases the first character of `name`, leaving the rest untouched.
///
/// ```
/// use khazna_support::naming::lower_first;
///
/// assert_eq!(lower_first("UserService"), "userService");
/// assert_eq!(lower_first("HTTPClient"), "hTTPClient");
/// assert_eq!(lower_first(""), "");
/// ```
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derives the provider name for a fully qualified Rust type name.
///
/// ```
/// use khazna_support::naming::provider_name;
///
/// assert_eq!(provider_name("my_app::users::UserService"), "userService");
/// assert_eq!(provider_name("Logger"), "logger");
/// ```
pub fn provider_name(type_name: &str) -> String {
    lower_first(shorten_type_name(type_name).trim())
}
