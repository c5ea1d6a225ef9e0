//! Deployment configuration for the analytics web application
//!
//! Resolution reads the connection variables from the environment, builds
//! the literal defaults, then merges the first override file found on the
//! search path. Validation is a separate, advisory pass.

pub mod env;
pub mod loader;
pub mod overrides;
pub mod schema;
pub mod validation;

pub use env::{EnvSettings, Environment, ProcessEnv, RedisSettings, CONSUMED_VARIABLES};
pub use loader::{ConfigLoader, ResolutionState, Resolved, SearchPath, SEARCH_PATH_ENV};
pub use overrides::{merge, ConfigOverrides};
pub use schema::*;
pub use validation::*;
