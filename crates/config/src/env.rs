//! Environment variable reading
//!
//! The resolver reads a fixed list of variables. Absent variables never
//! fail here: required connection fields stay `None`, optional cache
//! selectors fall back to their literal defaults.

use std::collections::HashMap;
use types::ConnectionDescriptor;

pub const DATABASE_DIALECT: &str = "DATABASE_DIALECT";
pub const DATABASE_USER: &str = "DATABASE_USER";
pub const DATABASE_PASSWORD: &str = "DATABASE_PASSWORD";
pub const DATABASE_HOST: &str = "DATABASE_HOST";
pub const DATABASE_PORT: &str = "DATABASE_PORT";
pub const DATABASE_DB: &str = "DATABASE_DB";

pub const EXAMPLES_USER: &str = "EXAMPLES_USER";
pub const EXAMPLES_PASSWORD: &str = "EXAMPLES_PASSWORD";
pub const EXAMPLES_HOST: &str = "EXAMPLES_HOST";
pub const EXAMPLES_PORT: &str = "EXAMPLES_PORT";
pub const EXAMPLES_DB: &str = "EXAMPLES_DB";

pub const REDIS_HOST: &str = "REDIS_HOST";
pub const REDIS_PORT: &str = "REDIS_PORT";
pub const REDIS_CELERY_DB: &str = "REDIS_CELERY_DB";
pub const REDIS_RESULTS_DB: &str = "REDIS_RESULTS_DB";

pub const SECRET_KEY: &str = "SECRET_KEY";

/// Every variable the resolver consults
pub const CONSUMED_VARIABLES: [&str; 16] = [
    DATABASE_DIALECT,
    DATABASE_USER,
    DATABASE_PASSWORD,
    DATABASE_HOST,
    DATABASE_PORT,
    DATABASE_DB,
    EXAMPLES_USER,
    EXAMPLES_PASSWORD,
    EXAMPLES_HOST,
    EXAMPLES_PORT,
    EXAMPLES_DB,
    REDIS_HOST,
    REDIS_PORT,
    REDIS_CELERY_DB,
    REDIS_RESULTS_DB,
    SECRET_KEY,
];

pub const DEFAULT_REDIS_HOST: &str = "redis";
pub const DEFAULT_REDIS_PORT: &str = "6379";
pub const DEFAULT_REDIS_CELERY_DB: &str = "0";
pub const DEFAULT_REDIS_RESULTS_DB: &str = "1";

/// Source of environment variables
pub trait Environment {
    /// Value of `key`, or `None` when unset or not valid unicode
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Redis endpoint selectors shared by the task queue and the caches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub host: String,
    pub port: String,
    /// Database index used by the task queue broker
    pub celery_db: String,
    /// Database index used by results and the general cache
    pub results_db: String,
}

impl RedisSettings {
    /// `redis://host:port/db`
    pub fn url(&self, db: &str) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, db)
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_REDIS_HOST.to_string(),
            port: DEFAULT_REDIS_PORT.to_string(),
            celery_db: DEFAULT_REDIS_CELERY_DB.to_string(),
            results_db: DEFAULT_REDIS_RESULTS_DB.to_string(),
        }
    }
}

/// Everything read from the environment, before any derivation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSettings {
    pub database: ConnectionDescriptor,
    /// Shares the dialect of the primary database
    pub examples: ConnectionDescriptor,
    pub redis: RedisSettings,
    pub secret_key: Option<String>,
}

impl EnvSettings {
    /// Read all consumed variables from `env`
    pub fn read<E: Environment + ?Sized>(env: &E) -> Self {
        let dialect = env.var(DATABASE_DIALECT);
        let or_default = |key: &str, default: &str| env.var(key).unwrap_or_else(|| default.to_string());

        Self {
            database: ConnectionDescriptor {
                dialect: dialect.clone(),
                user: env.var(DATABASE_USER),
                password: env.var(DATABASE_PASSWORD),
                host: env.var(DATABASE_HOST),
                port: env.var(DATABASE_PORT),
                database: env.var(DATABASE_DB),
            },
            examples: ConnectionDescriptor {
                dialect,
                user: env.var(EXAMPLES_USER),
                password: env.var(EXAMPLES_PASSWORD),
                host: env.var(EXAMPLES_HOST),
                port: env.var(EXAMPLES_PORT),
                database: env.var(EXAMPLES_DB),
            },
            redis: RedisSettings {
                host: or_default(REDIS_HOST, DEFAULT_REDIS_HOST),
                port: or_default(REDIS_PORT, DEFAULT_REDIS_PORT),
                celery_db: or_default(REDIS_CELERY_DB, DEFAULT_REDIS_CELERY_DB),
                results_db: or_default(REDIS_RESULTS_DB, DEFAULT_REDIS_RESULTS_DB),
            },
            secret_key: env.var(SECRET_KEY),
        }
    }
}
