//! # Khazna: singleton DI container with lazy by-name wiring
//!
//! Declare providers and containers once, let the container build every
//! singleton, then drive the ordered async startup and teardown.
//!
//! ```rust
//! use khazna::prelude::*;
//! use std::sync::Arc;
//!
//! struct Clock;
//!
//! impl Provider for Clock {
//!     fn construct(_: Resolver) -> Self {
//!         Clock
//!     }
//! }
//!
//! struct App;
//!
//! let catalog = Catalog::new();
//! catalog.declare_provider::<Clock>()?;
//! catalog.declare_container::<App>(ContainerParams::new().provider::<Clock>())?;
//!
//! let clock: Option<Arc<Clock>> = catalog.resolve_provider::<App, Clock>();
//! assert!(clock.is_some());
//! # Ok::<(), KhaznaError>(())
//! ```

pub use async_trait::async_trait;
pub use khazna_container::*;
pub use khazna_support::*;
