//! Configuration validation utilities
//!
//! Validation is advisory. Resolution never calls it, so a configuration
//! with empty connection fields still resolves; the report only tells the
//! operator what is likely to fail once the framework starts connecting.

use crate::loader::Resolved;
use crate::schema::{CacheConfig, ConfigurationSet};
use tracing::{error, warn};
use types::utils::{is_currency_code, is_decimal, redact_uri_password};
use types::{ConfigError, ConnectionDescriptor};

/// Minimum secret key length that does not trigger a warning
const MIN_SECRET_KEY_LEN: usize = 32;

/// Placeholder keys shipped with sample docker setups
const PLACEHOLDER_SECRET_KEYS: [&str; 2] = ["TEST_NON_DEV_SECRET", "YOUR_OWN_RANDOM_GENERATED_SECRET_KEY"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a resolved configuration
    pub fn validate(resolved: &Resolved) -> ValidationReport {
        let mut report = ValidationReport::new();
        let config = &resolved.config;

        Self::validate_connection("DATABASE", &resolved.database, &mut report);
        Self::validate_connection("EXAMPLES", &resolved.examples, &mut report);
        Self::validate_secret_key(config, &mut report);
        Self::validate_redis(config, &mut report);
        Self::validate_cache("CACHE_CONFIG", &config.cache_config, &mut report);
        Self::validate_cache("DATA_CACHE_CONFIG", &config.data_cache_config, &mut report);
        Self::validate_cache("THUMBNAIL_CACHE_CONFIG", &config.thumbnail_cache_config, &mut report);
        Self::validate_results_backend(config, &mut report);
        Self::validate_task_queue(config, &mut report);
        Self::validate_branding(config, &mut report);
        Self::validate_locale(config, &mut report);
        Self::validate_security(config, &mut report);

        for issue in &report.errors {
            error!(field = %issue.field, "{}", issue.message);
        }
        for issue in &report.warnings {
            warn!(field = %issue.field, "{}", issue.message);
        }

        report
    }

    fn validate_connection(prefix: &str, descriptor: &ConnectionDescriptor, report: &mut ValidationReport) {
        for field in descriptor.missing_fields() {
            report.add_warning(
                &format!("{}.{}", prefix, field),
                "Not set; the connection URI will contain an empty segment",
            );
        }

        if descriptor.has_reserved_credentials() {
            report.add_warning(
                &format!("{}.credentials", prefix),
                "User or password contains URI-reserved characters and is not escaped",
            );
        }

        if let Some(port) = descriptor.port.as_deref() {
            if !port.is_empty() && !is_decimal(port) {
                report.add_warning(&format!("{}.port", prefix), &format!("Port '{}' is not numeric", port));
            }
        }
    }

    fn validate_secret_key(config: &ConfigurationSet, report: &mut ValidationReport) {
        match config.secret_key.as_deref() {
            None | Some("") => {
                report.add_warning("SECRET_KEY", "No secret key configured; sessions cannot be signed");
            }
            Some(key) if PLACEHOLDER_SECRET_KEYS.contains(&key) => {
                report.add_warning("SECRET_KEY", "Secret key is a published placeholder");
            }
            Some(key) if key.len() < MIN_SECRET_KEY_LEN => {
                report.add_warning(
                    "SECRET_KEY",
                    &format!("Secret key is short, consider at least {} characters", MIN_SECRET_KEY_LEN),
                );
            }
            Some(_) => {}
        }
    }

    fn validate_redis(config: &ConfigurationSet, report: &mut ValidationReport) {
        if config.redis_host.is_empty() {
            report.add_warning("REDIS_HOST", "Redis host is empty");
        }

        for (field, value) in [
            ("REDIS_PORT", &config.redis_port),
            ("REDIS_CELERY_DB", &config.redis_celery_db),
            ("REDIS_RESULTS_DB", &config.redis_results_db),
        ] {
            if !is_decimal(value) {
                report.add_warning(field, &format!("Value '{}' is not numeric", value));
            }
        }

        if config.redis_celery_db == config.redis_results_db {
            report.add_warning(
                "REDIS_CELERY_DB",
                "Task queue broker and results share one redis database",
            );
        }
    }

    fn validate_cache(field: &str, cache: &CacheConfig, report: &mut ValidationReport) {
        if cache.cache_default_timeout == Some(0) {
            report.add_error(
                &format!("{}.CACHE_DEFAULT_TIMEOUT", field),
                "Cache timeout cannot be 0",
            );
        }

        if cache.cache_key_prefix.as_deref() == Some("") {
            report.add_error(&format!("{}.CACHE_KEY_PREFIX", field), "Cache key prefix cannot be empty");
        }

        if cache.is_redis() && cache.cache_redis_url.is_none() && cache.cache_redis_host.is_none() {
            report.add_error(
                &format!("{}.CACHE_REDIS_HOST", field),
                "Redis cache needs either a host or a URL",
            );
        }

        if let Some(port) = cache.cache_redis_port.as_deref() {
            if !is_decimal(port) {
                report.add_warning(
                    &format!("{}.CACHE_REDIS_PORT", field),
                    &format!("Port '{}' is not numeric", port),
                );
            }
        }
    }

    fn validate_results_backend(config: &ConfigurationSet, report: &mut ValidationReport) {
        let backend = &config.results_backend;
        if backend.cache_dir.is_none() && !backend.is_redis() {
            report.add_warning("RESULTS_BACKEND", "No directory configured for the results backend");
        }
    }

    fn validate_task_queue(config: &ConfigurationSet, report: &mut ValidationReport) {
        let celery = &config.celery_config;

        if celery.broker_url.is_empty() {
            report.add_error("CELERY_CONFIG.broker_url", "Broker URL cannot be empty");
        }

        if celery.worker_prefetch_multiplier == 0 {
            report.add_warning(
                "CELERY_CONFIG.worker_prefetch_multiplier",
                "A prefetch multiplier of 0 lets workers prefetch without limit",
            );
        }

        for (name, entry) in &celery.beat_schedule {
            if entry.task.is_empty() {
                report.add_error(&format!("CELERY_CONFIG.beat_schedule.{}", name), "Task name cannot be empty");
            }
            if entry.schedule.fields().iter().any(|field| field.is_empty()) {
                report.add_error(
                    &format!("CELERY_CONFIG.beat_schedule.{}", name),
                    &format!("Incomplete schedule '{}'", entry.schedule),
                );
            }
        }
    }

    fn validate_branding(config: &ConfigurationSet, report: &mut ValidationReport) {
        if config.app_name.trim().is_empty() {
            report.add_error("APP_NAME", "Application name cannot be empty");
        }

        if !config.logo_target_path.starts_with('/') {
            report.add_warning("LOGO_TARGET_PATH", "Logo target should be an absolute route");
        }

        for (field, url) in [
            ("WEBDRIVER_BASEURL", &config.webdriver_baseurl),
            ("WEBDRIVER_BASEURL_USER_FRIENDLY", &config.webdriver_baseurl_user_friendly),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                report.add_error(field, "URL must start with http:// or https://");
            }
        }
    }

    fn validate_locale(config: &ConfigurationSet, report: &mut ValidationReport) {
        if config.currencies.is_empty() {
            report.add_error("CURRENCIES", "At least one currency must be allowed");
        }

        for code in &config.currencies {
            if !is_currency_code(code) {
                report.add_warning("CURRENCIES", &format!("'{}' is not an ISO 4217 code", code));
            }
        }

        if config.d3_format.grouping.contains(&0) {
            report.add_error("D3_FORMAT.grouping", "Group sizes must be greater than 0");
        }

        if config.d3_format.decimal == config.d3_format.thousands {
            report.add_error("D3_FORMAT", "Decimal and group separators must differ");
        }
    }

    fn validate_security(config: &ConfigurationSet, report: &mut ValidationReport) {
        if !config.html_sanitization {
            report.add_warning("HTML_SANITIZATION", "HTML sanitization is disabled");
        }

        if config.mapbox_api_key.as_deref().map_or(true, str::is_empty) {
            report.add_warning("MAPBOX_API_KEY", "No map tile key configured; map charts render without tiles");
        }

        if !config.talisman_enabled {
            report.add_warning("TALISMAN_ENABLED", "Security headers are disabled");
        }

        if let Some(uri) = [&config.sqlalchemy_database_uri, &config.sqlalchemy_examples_uri]
            .into_iter()
            .find(|uri| uri.starts_with("://"))
        {
            report.add_warning(
                "SQLALCHEMY",
                &format!("Connection URI has no dialect: '{}'", redact_uri_password(uri)),
            );
        }
    }
}

/// Validation report containing errors and warnings
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// A validation issue (error or warning)
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn summary(&self) -> String {
        format!("Validation: {} errors, {} warnings", self.errors.len(), self.warnings.len())
    }

    /// First error as a [`ConfigError`], if any
    pub fn into_result(self) -> types::Result<Vec<ValidationIssue>> {
        match self.errors.into_iter().next() {
            Some(issue) => Err(ConfigError::ValidationError {
                field: issue.field,
                message: issue.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::tests::env_of;
    use crate::env::*;
    use crate::loader::{ConfigLoader, SearchPath};
    use tempfile::TempDir;

    fn resolve(pairs: &[(&str, &str)]) -> Resolved {
        let dir = TempDir::new().unwrap();
        ConfigLoader::new(SearchPath::new([dir.path()]))
            .resolve_with(&env_of(pairs))
            .unwrap()
    }

    fn has_warning(report: &ValidationReport, field: &str) -> bool {
        report.warnings.iter().any(|issue| issue.field == field)
    }

    #[test]
    fn test_empty_environment_only_warns() {
        let report = ConfigValidator::validate(&resolve(&[]));
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(has_warning(&report, "DATABASE.dialect"));
        assert!(has_warning(&report, "EXAMPLES.password"));
        assert!(has_warning(&report, "SECRET_KEY"));
        assert!(has_warning(&report, "SQLALCHEMY"));
    }

    #[test]
    fn test_complete_environment_has_no_connection_warnings() {
        let resolved = resolve(&[
            (DATABASE_DIALECT, "postgresql"),
            (DATABASE_USER, "superset"),
            (DATABASE_PASSWORD, "superset"),
            (DATABASE_HOST, "db"),
            (DATABASE_PORT, "5432"),
            (DATABASE_DB, "superset"),
            (SECRET_KEY, "0123456789abcdef0123456789abcdef"),
        ]);
        let report = ConfigValidator::validate(&resolved);
        assert!(!report.warnings.iter().any(|issue| issue.field.starts_with("DATABASE.")));
        assert!(!has_warning(&report, "SECRET_KEY"));
    }

    #[test]
    fn test_reserved_characters_and_bad_ports_warn() {
        let resolved = resolve(&[(DATABASE_PASSWORD, "p@ss/word"), (DATABASE_PORT, "54x2"), (REDIS_PORT, "redis")]);
        let report = ConfigValidator::validate(&resolved);
        assert!(has_warning(&report, "DATABASE.credentials"));
        assert!(has_warning(&report, "DATABASE.port"));
        assert!(has_warning(&report, "REDIS_PORT"));
        assert!(has_warning(&report, "CACHE_CONFIG.CACHE_REDIS_PORT"));
    }

    #[test]
    fn test_broken_overrides_produce_errors() {
        let mut resolved = resolve(&[]);
        resolved.config.cache_config.cache_default_timeout = Some(0);
        resolved.config.currencies.clear();
        resolved.config.d3_format.grouping = vec![3, 0];
        resolved.config.webdriver_baseurl = "superset:8088".to_string();

        let report = ConfigValidator::validate(&resolved);
        let fields: Vec<_> = report.errors.iter().map(|issue| issue.field.as_str()).collect();
        assert!(fields.contains(&"CACHE_CONFIG.CACHE_DEFAULT_TIMEOUT"));
        assert!(fields.contains(&"CURRENCIES"));
        assert!(fields.contains(&"D3_FORMAT.grouping"));
        assert!(fields.contains(&"WEBDRIVER_BASEURL"));

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_placeholder_secret_key_warns() {
        let report = ConfigValidator::validate(&resolve(&[(SECRET_KEY, "TEST_NON_DEV_SECRET")]));
        let issue = report.warnings.iter().find(|issue| issue.field == "SECRET_KEY").unwrap();
        assert!(issue.message.contains("placeholder"));
    }

    #[test]
    fn test_missing_map_key_warns() {
        let mut resolved = resolve(&[]);
        assert!(has_warning(&ConfigValidator::validate(&resolved), "MAPBOX_API_KEY"));

        resolved.config.mapbox_api_key = Some("pk.test".to_string());
        assert!(!has_warning(&ConfigValidator::validate(&resolved), "MAPBOX_API_KEY"));
    }

    #[test]
    fn test_report_summary() {
        let mut report = ValidationReport::new();
        report.add_error("A", "broken");
        report.add_warning("B", "odd");
        assert_eq!(report.summary(), "Validation: 1 errors, 1 warnings");
        assert!(report.has_warnings());
        assert!(!report.is_valid());
    }
}
