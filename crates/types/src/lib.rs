//! Shared types for the deployment configuration resolver
//!
//! This crate contains the domain types that do not depend on how the
//! configuration is loaded: errors, connection descriptors, the query
//! filter hook contract and the locale formatting tables.

pub mod connection;
pub mod error;
pub mod locale;
pub mod query;
pub mod utils;

// Re-export commonly used types
pub use connection::ConnectionDescriptor;
pub use error::{ConfigError, Result};
pub use locale::{NumberFormat, TimeFormat, PREVIEW_VALUE};
pub use query::{FilterableQuery, Predicate, QueryFilterHook};
