//! Shared plumbing for the Herald buses
//!
//! This crate holds the pieces every bus is built from:
//!
//! - **[`TypeRegistry`]** - concurrent key to handlers mapping with fan-out
//!   (`append`) and single-handler (`replace`) registration
//! - **[`TypeKey`]** - routing key for commands and queries, derived from the
//!   message's Rust type
//! - **[`EnvLoader`]** - `HERALD_*` environment variable loading for bus
//!   configuration
//! - **[`catch_panic`]** - converts a panicking handler into an error value
//!
//! ## Type keys
//!
//! ```rust
//! use herald_core::TypeKey;
//!
//! mod billing { pub struct Register; }
//! mod accounts { pub struct Register; }
//!
//! let a = TypeKey::of::<billing::Register>();
//! let b = TypeKey::of::<accounts::Register>();
//!
//! // Same short name, different routing identity
//! assert_eq!(a.short_name(), b.short_name());
//! assert_ne!(a, b);
//! ```
//!
//! ## Registries
//!
//! ```rust
//! use herald_core::TypeRegistry;
//!
//! let registry = TypeRegistry::new();
//! registry.append("user_registered", "audit");
//! registry.append("user_registered", "mailer");
//! assert_eq!(registry.lookup(&"user_registered"), vec!["audit", "mailer"]);
//!
//! registry.replace("user_registered", "only");
//! assert_eq!(registry.lookup(&"user_registered"), vec!["only"]);
//! ```

pub mod env;
pub mod error;
pub mod key;
pub mod panic;
pub mod registry;

pub use env::{EnvLoader, ENV_PREFIX};
pub use error::{ConfigError, Result};
pub use key::TypeKey;
pub use panic::{catch_panic, panic_message};
pub use registry::TypeRegistry;
