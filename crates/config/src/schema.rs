//! Configuration schema definitions
//!
//! Field names serialize to the keys the web framework reads, so a
//! serialized [`ConfigurationSet`] can be handed over as-is.

use crate::env::EnvSettings;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use types::{ConfigError, NumberFormat, QueryFilterHook, Result, TimeFormat};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ConfigurationSet {
    /// Session signing key
    pub secret_key: Option<String>,
    /// Metadata database
    pub sqlalchemy_database_uri: String,
    /// Examples database
    pub sqlalchemy_examples_uri: String,

    /// Security manager class, as a `module.Class` path
    pub custom_security_manager: Option<String>,

    pub redis_host: String,
    #[serde(deserialize_with = "text_or_number")]
    pub redis_port: String,
    #[serde(deserialize_with = "text_or_number")]
    pub redis_celery_db: String,
    #[serde(deserialize_with = "text_or_number")]
    pub redis_results_db: String,

    /// Storage for SQL Lab query results
    pub results_backend: CacheConfig,

    // Branding
    pub app_name: String,
    pub app_icon: String,
    /// Route opened when the logo is clicked
    pub logo_target_path: String,
    pub logo_tooltip: String,
    pub logo_right_text: String,
    pub favicons: Vec<Favicon>,

    /// General application cache
    pub cache_config: CacheConfig,
    /// Chart data cache
    pub data_cache_config: CacheConfig,
    /// Dashboard and chart thumbnail cache
    pub thumbnail_cache_config: CacheConfig,

    pub mapbox_api_key: Option<String>,

    /// Task queue settings
    pub celery_config: CeleryConfig,

    pub babel_default_locale: String,

    pub html_sanitization: bool,
    pub html_sanitization_schema_extensions: SanitizationSchemaExtensions,
    pub content_security_policy_warning: bool,
    pub talisman_enabled: bool,
    pub enable_template_remove_filters: bool,

    pub feature_flags: FeatureFlags,

    pub thumbnail_selenium_user: String,
    pub thumbnail_execute_as: Vec<ExecutorType>,

    /// Number formatting rules
    pub d3_format: NumberFormat,
    /// Date formatting rules
    pub d3_time_format: TimeFormat,
    /// Currency codes offered in the chart editor
    pub currencies: Vec<String>,

    /// Hooks applied to related-field queries, keyed by related model
    pub extra_related_query_filters: BTreeMap<String, QueryFilterHook>,

    pub alert_reports_notification_dry_run: bool,
    pub webdriver_baseurl: String,
    /// Base URL used in report e-mail links
    pub webdriver_baseurl_user_friendly: String,
    pub sqllab_ctas_no_limit: bool,
}

/// Cache backend kinds understood by the caching layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheType {
    RedisCache,
    /// Legacy alias of [`CacheType::RedisCache`]
    #[serde(rename = "redis")]
    Redis,
    FileSystemCache,
    SimpleCache,
    NullCache,
}

/// Cache backend descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CacheConfig {
    pub cache_type: CacheType,
    /// Default entry lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_default_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_redis_host: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub cache_redis_port: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub cache_redis_db: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_redis_url: Option<String>,
    /// Directory for [`CacheType::FileSystemCache`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl CacheConfig {
    fn empty(cache_type: CacheType) -> Self {
        Self {
            cache_type,
            cache_default_timeout: None,
            cache_key_prefix: None,
            cache_redis_host: None,
            cache_redis_port: None,
            cache_redis_db: None,
            cache_redis_url: None,
            cache_dir: None,
        }
    }

    /// Filesystem cache rooted at `dir`
    pub fn filesystem(dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: Some(dir.into()),
            ..Self::empty(CacheType::FileSystemCache)
        }
    }

    /// Whether this backend talks to redis
    pub fn is_redis(&self) -> bool {
        matches!(self.cache_type, CacheType::RedisCache | CacheType::Redis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favicon {
    pub href: String,
}

/// Task queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeleryConfig {
    pub broker_url: String,
    /// Modules the workers import at startup
    pub imports: Vec<String>,
    pub result_backend: String,
    pub worker_prefetch_multiplier: u32,
    pub task_acks_late: bool,
    pub beat_schedule: BTreeMap<String, BeatTask>,
}

/// Periodic task entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatTask {
    pub task: String,
    pub schedule: Crontab,
}

/// Cron-style schedule; omitted fields mean "every"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crontab {
    #[serde(default = "every")]
    pub minute: String,
    #[serde(default = "every")]
    pub hour: String,
    #[serde(default = "every")]
    pub day_of_month: String,
    #[serde(default = "every")]
    pub month_of_year: String,
    #[serde(default = "every")]
    pub day_of_week: String,
}

impl Crontab {
    pub fn at(minute: &str, hour: &str) -> Self {
        Self {
            minute: minute.to_string(),
            hour: hour.to_string(),
            day_of_month: every(),
            month_of_year: every(),
            day_of_week: every(),
        }
    }

    /// Fields in cron order
    pub fn fields(&self) -> [&str; 5] {
        [
            self.minute.as_str(),
            self.hour.as_str(),
            self.day_of_month.as_str(),
            self.month_of_year.as_str(),
            self.day_of_week.as_str(),
        ]
    }
}

impl fmt::Display for Crontab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields().join(" "))
    }
}

/// Extra attributes and tags allowed through HTML sanitization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizationSchemaExtensions {
    /// Attribute names allowed per tag; `*` applies to every tag
    pub attributes: BTreeMap<String, Vec<String>>,
    pub tag_names: Vec<String>,
}

/// Identity used when rendering thumbnails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutorType {
    Selenium,
    Creator,
    CreatorOwner,
    CurrentUser,
    Owner,
}

/// Feature toggles
///
/// A flag missing from a deserialized table is off, so an override table
/// replaces the built-in one instead of extending it. Only the flags below
/// are accepted; any other name, even one the web framework knows, fails
/// the override file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default, deny_unknown_fields)]
pub struct FeatureFlags {
    pub alert_reports: bool,
    pub dashboard_cross_filters: bool,
    pub dashboard_rbac: bool,
    pub generic_chart_axes: bool,
    pub listviews_default_card_view: bool,
    pub enable_template_processing: bool,
    pub enable_template_remove_filters: bool,
    pub dashboard_cache: bool,
    pub ux_beta: bool,
    pub tagging_system: bool,
    pub global_async_queries: bool,
    pub dashboard_native_filters_set: bool,
    pub dashboard_filters_experimental: bool,
    pub rls_in_sqllab: bool,
    pub drill_to_detail: bool,
    pub allow_adhoc_subquery: bool,
    pub horizontal_filter_bar: bool,
    pub rls_form_query_rel_fields: bool,
    pub dashboard_edit_chart_in_new_tab: bool,
    pub drill_by: bool,
    pub cache_query_by_user: bool,
}

impl FeatureFlags {
    /// Flags enabled for this deployment
    pub fn deployment() -> Self {
        Self {
            alert_reports: true,
            dashboard_cross_filters: true,
            dashboard_rbac: true,
            generic_chart_axes: true,
            listviews_default_card_view: false,
            enable_template_processing: true,
            enable_template_remove_filters: true,
            dashboard_cache: true,
            ux_beta: true,
            tagging_system: true,
            global_async_queries: false,
            dashboard_native_filters_set: true,
            dashboard_filters_experimental: true,
            rls_in_sqllab: true,
            drill_to_detail: true,
            allow_adhoc_subquery: true,
            horizontal_filter_bar: true,
            rls_form_query_rel_fields: true,
            dashboard_edit_chart_in_new_tab: true,
            drill_by: true,
            cache_query_by_user: true,
        }
    }

    /// Flag name to state, keyed by the framework's flag names
    pub fn as_map(&self) -> BTreeMap<String, bool> {
        serde_json::to_value(self)
            .ok()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    /// Names of the enabled flags
    pub fn enabled(&self) -> Vec<String> {
        self.as_map()
            .into_iter()
            .filter_map(|(name, on)| on.then_some(name))
            .collect()
    }
}

/// Ports and db indexes, written either as `6379` or `"6379"`
#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl From<TextOrNumber> for String {
    fn from(value: TextOrNumber) -> Self {
        match value {
            TextOrNumber::Text(text) => text,
            TextOrNumber::Unsigned(n) => n.to_string(),
            TextOrNumber::Signed(n) => n.to_string(),
        }
    }
}

pub(crate) fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    TextOrNumber::deserialize(deserializer).map(String::from)
}

pub(crate) fn optional_text_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Option::<TextOrNumber>::deserialize(deserializer).map(|value| value.map(String::from))
}

// Default value functions
fn every() -> String {
    "*".to_string()
}

fn default_app_name() -> String {
    "Платформа аналитики ЦРЦЭ".to_string()
}

fn default_app_icon() -> String {
    "/static/assets/images/logo.png".to_string()
}

fn default_webdriver_baseurl() -> String {
    "http://superset:8088/".to_string()
}

fn default_currencies() -> Vec<String> {
    ["USD", "EUR", "GBP", "INR", "MXN", "JPY", "CNY", "KZT"]
        .into_iter()
        .map(String::from)
        .collect()
}

const DEFAULT_CACHE_TIMEOUT_SECONDS: u64 = 300;
const THUMBNAIL_CACHE_TIMEOUT_SECONDS: u64 = 7 * 24 * 60 * 60;
const RESULTS_BACKEND_DIR: &str = "/app/superset_home/sqllab";
const SECURITY_MANAGER_CLASS: &str = "security.CustomSecurityManager";

impl ConfigurationSet {
    /// Literal defaults plus the values derived from `env`
    pub fn defaults(env: &EnvSettings) -> Self {
        let redis = &env.redis;

        let cache_config = CacheConfig {
            cache_default_timeout: Some(DEFAULT_CACHE_TIMEOUT_SECONDS),
            cache_key_prefix: Some("superset_".to_string()),
            cache_redis_host: Some(redis.host.clone()),
            cache_redis_port: Some(redis.port.clone()),
            cache_redis_db: Some(redis.results_db.clone()),
            ..CacheConfig::empty(CacheType::RedisCache)
        };

        // Not derived from REDIS_*; the thumbnail cache always targets the compose service.
        let thumbnail_cache_config = CacheConfig {
            cache_default_timeout: Some(THUMBNAIL_CACHE_TIMEOUT_SECONDS),
            cache_key_prefix: Some("thumbnail_".to_string()),
            cache_redis_url: Some("redis://redis:6379/1".to_string()),
            ..CacheConfig::empty(CacheType::Redis)
        };

        let beat_schedule = BTreeMap::from([
            (
                "reports.scheduler".to_string(),
                BeatTask {
                    task: "reports.scheduler".to_string(),
                    schedule: Crontab::at("*", "*"),
                },
            ),
            (
                "reports.prune_log".to_string(),
                BeatTask {
                    task: "reports.prune_log".to_string(),
                    schedule: Crontab::at("10", "0"),
                },
            ),
        ]);

        Self {
            secret_key: env.secret_key.clone(),
            sqlalchemy_database_uri: env.database.uri(),
            sqlalchemy_examples_uri: env.examples.uri(),
            custom_security_manager: Some(SECURITY_MANAGER_CLASS.to_string()),
            redis_host: redis.host.clone(),
            redis_port: redis.port.clone(),
            redis_celery_db: redis.celery_db.clone(),
            redis_results_db: redis.results_db.clone(),
            results_backend: CacheConfig::filesystem(RESULTS_BACKEND_DIR),
            app_name: default_app_name(),
            app_icon: default_app_icon(),
            logo_target_path: "/dashboard/list/".to_string(),
            logo_tooltip: "Центр развития цифровой экономики".to_string(),
            logo_right_text: "Аналитическая Платформа".to_string(),
            favicons: vec![Favicon { href: default_app_icon() }],
            data_cache_config: cache_config.clone(),
            cache_config,
            thumbnail_cache_config,
            mapbox_api_key: None,
            celery_config: CeleryConfig {
                broker_url: redis.url(&redis.celery_db),
                imports: vec![
                    "superset.sql_lab".to_string(),
                    "superset.tasks.thumbnails".to_string(),
                ],
                result_backend: redis.url(&redis.results_db),
                worker_prefetch_multiplier: 1,
                task_acks_late: false,
                beat_schedule,
            },
            babel_default_locale: "ru".to_string(),
            html_sanitization: false,
            html_sanitization_schema_extensions: SanitizationSchemaExtensions {
                attributes: BTreeMap::from([(
                    "*".to_string(),
                    vec!["style".to_string(), "className".to_string()],
                )]),
                tag_names: vec!["style".to_string()],
            },
            content_security_policy_warning: false,
            talisman_enabled: false,
            enable_template_remove_filters: true,
            feature_flags: FeatureFlags::deployment(),
            thumbnail_selenium_user: "admin".to_string(),
            thumbnail_execute_as: vec![ExecutorType::Selenium],
            d3_format: NumberFormat::default(),
            d3_time_format: TimeFormat::default(),
            currencies: default_currencies(),
            extra_related_query_filters: BTreeMap::from([(
                "user".to_string(),
                QueryFilterHook::HideAll,
            )]),
            alert_reports_notification_dry_run: true,
            webdriver_baseurl: default_webdriver_baseurl(),
            webdriver_baseurl_user_friendly: default_webdriver_baseurl(),
            sqllab_ctas_no_limit: true,
        }
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.secret_key = copy.secret_key.as_deref().map(types::utils::sanitize_for_logging);
        copy.mapbox_api_key = copy.mapbox_api_key.as_deref().map(types::utils::sanitize_for_logging);
        copy.sqlalchemy_database_uri = types::utils::redact_uri_password(&copy.sqlalchemy_database_uri);
        copy.sqlalchemy_examples_uri = types::utils::redact_uri_password(&copy.sqlalchemy_examples_uri);
        copy
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::tests::env_of;
    use crate::env::*;

    fn full_env() -> EnvSettings {
        EnvSettings::read(&env_of(&[
            (DATABASE_DIALECT, "postgresql"),
            (DATABASE_USER, "superset"),
            (DATABASE_PASSWORD, "superset"),
            (DATABASE_HOST, "db"),
            (DATABASE_PORT, "5432"),
            (DATABASE_DB, "superset"),
            (EXAMPLES_USER, "examples"),
            (EXAMPLES_PASSWORD, "examples"),
            (EXAMPLES_HOST, "db"),
            (EXAMPLES_PORT, "5432"),
            (EXAMPLES_DB, "examples"),
            (SECRET_KEY, "a-long-enough-secret-key"),
        ]))
    }

    #[test]
    fn test_derived_connection_uris() {
        let config = ConfigurationSet::defaults(&full_env());
        assert_eq!(config.sqlalchemy_database_uri, "postgresql://superset:superset@db:5432/superset");
        assert_eq!(config.sqlalchemy_examples_uri, "postgresql://examples:examples@db:5432/examples");
    }

    #[test]
    fn test_cache_and_task_queue_defaults() {
        let config = ConfigurationSet::defaults(&EnvSettings::default());
        assert_eq!(config.cache_config.cache_redis_host.as_deref(), Some("redis"));
        assert_eq!(config.cache_config.cache_redis_port.as_deref(), Some("6379"));
        assert_eq!(config.cache_config.cache_redis_db.as_deref(), Some("1"));
        assert_eq!(config.cache_config.cache_default_timeout, Some(300));
        assert_eq!(config.data_cache_config, config.cache_config);
        assert_eq!(config.thumbnail_cache_config.cache_default_timeout, Some(604_800));
        assert_eq!(config.celery_config.broker_url, "redis://redis:6379/0");
        assert_eq!(config.celery_config.result_backend, "redis://redis:6379/1");
        assert_eq!(config.celery_config.beat_schedule["reports.prune_log"].schedule.to_string(), "10 0 * * *");
    }

    #[test]
    fn test_redis_env_flows_into_caches() {
        let env = EnvSettings::read(&env_of(&[(REDIS_HOST, "cache.internal"), (REDIS_RESULTS_DB, "4")]));
        let config = ConfigurationSet::defaults(&env);
        assert_eq!(config.cache_config.cache_redis_host.as_deref(), Some("cache.internal"));
        assert_eq!(config.cache_config.cache_redis_db.as_deref(), Some("4"));
        assert_eq!(config.celery_config.result_backend, "redis://cache.internal:6379/4");
        // thumbnail cache keeps its fixed URL
        assert_eq!(
            config.thumbnail_cache_config.cache_redis_url.as_deref(),
            Some("redis://redis:6379/1")
        );
    }

    #[test]
    fn test_feature_flags() {
        let flags = FeatureFlags::deployment();
        let enabled = flags.enabled();
        assert_eq!(enabled.len(), 19);
        assert!(enabled.contains(&"DRILL_BY".to_string()));
        assert!(!enabled.contains(&"GLOBAL_ASYNC_QUERIES".to_string()));
        assert_eq!(flags.as_map().len(), 21);
        assert!(FeatureFlags::default().enabled().is_empty());
    }

    #[test]
    fn test_serialized_keys_match_framework_names() {
        let config = ConfigurationSet::defaults(&full_env());
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["FEATURE_FLAGS"]["RLS_IN_SQLLAB"], true);
        assert_eq!(value["CACHE_CONFIG"]["CACHE_TYPE"], "RedisCache");
        assert_eq!(value["THUMBNAIL_CACHE_CONFIG"]["CACHE_TYPE"], "redis");
        assert_eq!(value["RESULTS_BACKEND"]["CACHE_DIR"], "/app/superset_home/sqllab");
        assert_eq!(value["THUMBNAIL_EXECUTE_AS"][0], "SELENIUM");
        assert_eq!(value["EXTRA_RELATED_QUERY_FILTERS"]["user"], "hide_all");
        assert_eq!(value["HTML_SANITIZATION_SCHEMA_EXTENSIONS"]["tagNames"][0], "style");
        assert_eq!(value["D3_FORMAT"]["currency"][1], "\u{a0}\u{20b8}");
        assert_eq!(value["CELERY_CONFIG"]["worker_prefetch_multiplier"], 1);
    }

    #[test]
    fn test_ports_accept_numbers() {
        let cache: CacheConfig = serde_json::from_str(
            r#"{"CACHE_TYPE": "RedisCache", "CACHE_REDIS_PORT": 6380, "CACHE_REDIS_DB": "2"}"#,
        )
        .unwrap();
        assert_eq!(cache.cache_redis_port.as_deref(), Some("6380"));
        assert_eq!(cache.cache_redis_db.as_deref(), Some("2"));

        let cache: CacheConfig = serde_json::from_str(r#"{"CACHE_TYPE": "NullCache"}"#).unwrap();
        assert!(cache.cache_redis_port.is_none());

        let result: std::result::Result<CacheConfig, _> =
            serde_json::from_str(r#"{"CACHE_TYPE": "RedisCache", "CACHE_REDIS_PORT": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_security_manager_default() {
        let config = ConfigurationSet::defaults(&EnvSettings::default());
        assert_eq!(config.custom_security_manager.as_deref(), Some("security.CustomSecurityManager"));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["CUSTOM_SECURITY_MANAGER"], "security.CustomSecurityManager");
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let config = ConfigurationSet::defaults(&full_env()).redacted();
        assert_eq!(config.sqlalchemy_database_uri, "postgresql://superset:***@db:5432/superset");
        assert_eq!(config.secret_key.as_deref(), Some("a-lo***"));
        assert!(!config.to_yaml().unwrap().contains("a-long-enough-secret-key"));
    }

    #[test]
    fn test_yaml_round_trip_preserves_defaults() {
        let config = ConfigurationSet::defaults(&full_env());
        let parsed: ConfigurationSet = serde_yaml::from_str(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
