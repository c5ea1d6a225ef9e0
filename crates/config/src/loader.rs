//! Configuration loader implementation

use crate::env::{EnvSettings, Environment, ProcessEnv};
use crate::overrides::{merge, ConfigOverrides};
use crate::schema::ConfigurationSet;
use anyhow::Context;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use types::{ConfigError, ConnectionDescriptor, Result};

/// File name probed on each search path entry, without extension
pub const OVERRIDE_FILE_STEM: &str = "superset_config_docker";

/// Accepted override file extensions, in probe order
pub const OVERRIDE_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Variable holding a platform path list that replaces the default search path
pub const SEARCH_PATH_ENV: &str = "SUPERSET_CONFIG_SEARCH_PATH";

/// Ordered directories probed for the override file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a `:`-separated (`;` on Windows) path list; empty entries are skipped
    pub fn parse(list: impl AsRef<OsStr>) -> Self {
        Self {
            dirs: std::env::split_paths(list.as_ref())
                .filter(|dir| !dir.as_os_str().is_empty())
                .collect(),
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First override file found, walking the directories in order
    pub fn find_override(&self) -> Option<PathBuf> {
        self.dirs.iter().find_map(|dir| {
            OVERRIDE_EXTENSIONS.iter().find_map(|ext| {
                let candidate = dir.join(format!("{}.{}", OVERRIDE_FILE_STEM, ext));
                debug!("Probing for override file at {}", candidate.display());
                candidate.is_file().then_some(candidate)
            })
        })
    }
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::new([".", "/app/pythonpath"])
    }
}

/// Terminal state of a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    /// No override file was found
    DefaultsLoaded,
    /// An override file was found and merged
    OverridesMerged {
        source: PathBuf,
        /// Keys the file declared
        keys: Vec<String>,
    },
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config: ConfigurationSet,
    pub state: ResolutionState,
    /// Connection fields the primary URI was built from
    pub database: ConnectionDescriptor,
    /// Connection fields the examples URI was built from
    pub examples: ConnectionDescriptor,
}

/// Configuration loader that assembles defaults, environment and overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    search_path: SearchPath,
}

impl ConfigLoader {
    pub fn new(search_path: SearchPath) -> Self {
        Self { search_path }
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Resolve against the process environment
    pub fn resolve(&self) -> Result<Resolved> {
        self.resolve_with(&ProcessEnv)
    }

    /// Resolve against an arbitrary environment
    ///
    /// Missing variables never fail. The only error is an override file
    /// that exists but cannot be loaded.
    pub fn resolve_with<E: Environment + ?Sized>(&self, env: &E) -> Result<Resolved> {
        let settings = EnvSettings::read(env);
        let defaults = ConfigurationSet::defaults(&settings);
        debug!(
            database = %settings.database.redacted_uri(),
            examples = %settings.examples.redacted_uri(),
            "Derived connection URIs"
        );

        let (config, state) = match self.search_path.find_override() {
            Some(path) => {
                let overrides = Self::load_overrides(&path)?;
                let keys = overrides.keys();
                info!("Loaded your Docker configuration at [{}]", path.display());
                if overrides.is_empty() {
                    debug!("Override file declares no keys");
                } else {
                    debug!(keys = ?keys, "Override keys merged");
                }
                (
                    merge(defaults, overrides),
                    ResolutionState::OverridesMerged { source: path, keys },
                )
            }
            None => {
                info!("Using default Docker config...");
                (defaults, ResolutionState::DefaultsLoaded)
            }
        };

        Ok(Resolved {
            config,
            state,
            database: settings.database,
            examples: settings.examples,
        })
    }

    /// Load an override file
    pub fn load_overrides<P: AsRef<Path>>(path: P) -> Result<ConfigOverrides> {
        let path = path.as_ref();
        Figment::new()
            .merge(Yaml::file_exact(path))
            .extract()
            .map_err(|e| invalid_override(path, e))
    }

    /// Load overrides from a string (for testing)
    pub fn load_overrides_from_str(yaml_content: &str) -> Result<ConfigOverrides> {
        Figment::new()
            .merge(Yaml::string(yaml_content))
            .extract()
            .map_err(|e| invalid_override(Path::new("<string>"), e))
    }

    /// Create an example override file pre-filled with the defaults
    ///
    /// Secrets and connection URIs are left out so the file can be shared.
    pub fn create_example<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
        let mut overrides = ConfigOverrides::from(ConfigurationSet::defaults(&EnvSettings::default()));
        overrides.secret_key = None;
        overrides.mapbox_api_key = None;
        overrides.sqlalchemy_database_uri = None;
        overrides.sqlalchemy_examples_uri = None;

        let yaml_content = serde_yaml::to_string(&overrides)
            .context("Failed to serialize default configuration")?;

        std::fs::write(path.as_ref(), yaml_content)
            .context("Failed to write example configuration file")?;

        Ok(())
    }
}

fn invalid_override(path: &Path, error: figment::Error) -> ConfigError {
    let mut message = error.to_string();
    if matches!(error.kind, figment::error::Kind::UnknownField(..)) {
        message.push_str(
            "; only the keys and feature flags written by `superset-config example` are accepted",
        );
    }
    ConfigError::InvalidOverride {
        path: path.to_path_buf(),
        message,
    }
}
