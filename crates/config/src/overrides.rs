//! Operator overrides and the layered merge
//!
//! An override file declares any subset of the [`ConfigurationSet`] keys.
//! Each declared key replaces the default value as a whole; nested tables
//! such as `FEATURE_FLAGS` are not merged entry by entry. Keys that are not
//! part of the schema are rejected when the file is parsed.

use crate::schema::{
    optional_text_or_number, CacheConfig, CeleryConfig, ConfigurationSet, ExecutorType, Favicon,
    FeatureFlags, SanitizationSchemaExtensions,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use types::{NumberFormat, QueryFilterHook, TimeFormat};

/// Partial configuration; every field is optional
///
/// Keys that the framework accepts as null (`SECRET_KEY`, `MAPBOX_API_KEY`,
/// `CUSTOM_SECURITY_MANAGER`) are doubly optional: `None` means the file
/// does not declare the key, `Some(None)` means it declares an explicit null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(default, deserialize_with = "declared", skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlalchemy_database_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlalchemy_examples_uri: Option<String>,
    #[serde(default, deserialize_with = "declared", skip_serializing_if = "Option::is_none")]
    pub custom_security_manager: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_host: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub redis_port: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub redis_celery_db: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub redis_results_db: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_backend: Option<CacheConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_target_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_tooltip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_right_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicons: Option<Vec<Favicon>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_config: Option<CacheConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_cache_config: Option<CacheConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_cache_config: Option<CacheConfig>,
    #[serde(default, deserialize_with = "declared", skip_serializing_if = "Option::is_none")]
    pub mapbox_api_key: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celery_config: Option<CeleryConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub babel_default_locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_sanitization: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_sanitization_schema_extensions: Option<SanitizationSchemaExtensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_security_policy_warning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talisman_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_template_remove_filters: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_flags: Option<FeatureFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_selenium_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_execute_as: Option<Vec<ExecutorType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d3_format: Option<NumberFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d3_time_format: Option<TimeFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currencies: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_related_query_filters: Option<BTreeMap<String, QueryFilterHook>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_reports_notification_dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webdriver_baseurl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webdriver_baseurl_user_friendly: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqllab_ctas_no_limit: Option<bool>,
}

/// Keeps an explicit null apart from an absent key
fn declared<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ConfigOverrides {
    /// Keys declared by this override, using the framework's names
    ///
    /// Explicit nulls count as declared.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().map(|(key, _)| key).collect(),
            _ => Vec::new(),
        };
        keys.sort();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Destructures the overrides so that adding a field without merging it
/// fails to compile.
macro_rules! overlay {
    ($merged:ident, $overrides:expr, [$($field:ident),* $(,)?]) => {{
        let ConfigOverrides { $($field,)* } = $overrides;
        $(
            if let Some(value) = $field {
                $merged.$field = value;
            }
        )*
    }};
}

/// Layer `overrides` on top of `defaults`; declared keys win
pub fn merge(defaults: ConfigurationSet, overrides: ConfigOverrides) -> ConfigurationSet {
    let mut merged = defaults;
    overlay!(
        merged,
        overrides,
        [
            secret_key,
            sqlalchemy_database_uri,
            sqlalchemy_examples_uri,
            custom_security_manager,
            redis_host,
            redis_port,
            redis_celery_db,
            redis_results_db,
            results_backend,
            app_name,
            app_icon,
            logo_target_path,
            logo_tooltip,
            logo_right_text,
            favicons,
            cache_config,
            data_cache_config,
            thumbnail_cache_config,
            celery_config,
            babel_default_locale,
            html_sanitization,
            html_sanitization_schema_extensions,
            content_security_policy_warning,
            talisman_enabled,
            enable_template_remove_filters,
            feature_flags,
            thumbnail_selenium_user,
            thumbnail_execute_as,
            d3_format,
            d3_time_format,
            currencies,
            extra_related_query_filters,
            alert_reports_notification_dry_run,
            webdriver_baseurl,
            webdriver_baseurl_user_friendly,
            mapbox_api_key,
            sqllab_ctas_no_limit,
        ]
    );
    merged
}

impl From<ConfigurationSet> for ConfigOverrides {
    fn from(config: ConfigurationSet) -> Self {
        Self {
            secret_key: Some(config.secret_key),
            sqlalchemy_database_uri: Some(config.sqlalchemy_database_uri),
            sqlalchemy_examples_uri: Some(config.sqlalchemy_examples_uri),
            custom_security_manager: Some(config.custom_security_manager),
            redis_host: Some(config.redis_host),
            redis_port: Some(config.redis_port),
            redis_celery_db: Some(config.redis_celery_db),
            redis_results_db: Some(config.redis_results_db),
            results_backend: Some(config.results_backend),
            app_name: Some(config.app_name),
            app_icon: Some(config.app_icon),
            logo_target_path: Some(config.logo_target_path),
            logo_tooltip: Some(config.logo_tooltip),
            logo_right_text: Some(config.logo_right_text),
            favicons: Some(config.favicons),
            cache_config: Some(config.cache_config),
            data_cache_config: Some(config.data_cache_config),
            thumbnail_cache_config: Some(config.thumbnail_cache_config),
            mapbox_api_key: Some(config.mapbox_api_key),
            celery_config: Some(config.celery_config),
            babel_default_locale: Some(config.babel_default_locale),
            html_sanitization: Some(config.html_sanitization),
            html_sanitization_schema_extensions: Some(config.html_sanitization_schema_extensions),
            content_security_policy_warning: Some(config.content_security_policy_warning),
            talisman_enabled: Some(config.talisman_enabled),
            enable_template_remove_filters: Some(config.enable_template_remove_filters),
            feature_flags: Some(config.feature_flags),
            thumbnail_selenium_user: Some(config.thumbnail_selenium_user),
            thumbnail_execute_as: Some(config.thumbnail_execute_as),
            d3_format: Some(config.d3_format),
            d3_time_format: Some(config.d3_time_format),
            currencies: Some(config.currencies),
            extra_related_query_filters: Some(config.extra_related_query_filters),
            alert_reports_notification_dry_run: Some(config.alert_reports_notification_dry_run),
            webdriver_baseurl: Some(config.webdriver_baseurl),
            webdriver_baseurl_user_friendly: Some(config.webdriver_baseurl_user_friendly),
            sqllab_ctas_no_limit: Some(config.sqllab_ctas_no_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvSettings;

    fn defaults() -> ConfigurationSet {
        ConfigurationSet::defaults(&EnvSettings::default())
    }

    #[test]
    fn test_empty_overrides_keep_defaults() {
        let overrides = ConfigOverrides::default();
        assert!(overrides.is_empty());
        assert!(overrides.keys().is_empty());
        assert_eq!(merge(defaults(), overrides), defaults());
    }

    #[test]
    fn test_declared_keys_win() {
        let overrides = ConfigOverrides {
            app_name: Some("Analytics".to_string()),
            secret_key: Some(Some("from-override".to_string())),
            talisman_enabled: Some(true),
            ..Default::default()
        };
        assert_eq!(overrides.keys(), vec!["APP_NAME", "SECRET_KEY", "TALISMAN_ENABLED"]);

        let merged = merge(defaults(), overrides);
        assert_eq!(merged.app_name, "Analytics");
        assert_eq!(merged.secret_key.as_deref(), Some("from-override"));
        assert!(merged.talisman_enabled);
        assert_eq!(merged.logo_tooltip, defaults().logo_tooltip);
    }

    #[test]
    fn test_explicit_null_clears_value() {
        let mut base = defaults();
        base.secret_key = Some("from-env".to_string());
        let overrides = ConfigOverrides {
            secret_key: Some(None),
            custom_security_manager: Some(None),
            ..Default::default()
        };
        assert!(!overrides.is_empty());
        assert_eq!(overrides.keys(), vec!["CUSTOM_SECURITY_MANAGER", "SECRET_KEY"]);

        let merged = merge(base, overrides);
        assert!(merged.secret_key.is_none());
        assert!(merged.custom_security_manager.is_none());
    }

    #[test]
    fn test_feature_flags_are_replaced_wholesale() {
        let overrides = ConfigOverrides {
            feature_flags: Some(FeatureFlags {
                global_async_queries: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(defaults(), overrides);
        assert_eq!(merged.feature_flags.enabled(), vec!["GLOBAL_ASYNC_QUERIES"]);
    }

    #[test]
    fn test_overriding_redis_host_does_not_rewrite_derived_values() {
        let overrides = ConfigOverrides {
            redis_host: Some("elsewhere".to_string()),
            ..Default::default()
        };
        let merged = merge(defaults(), overrides);
        assert_eq!(merged.redis_host, "elsewhere");
        assert_eq!(merged.celery_config.broker_url, "redis://redis:6379/0");
    }

    #[test]
    fn test_full_overrides_reproduce_source() {
        let mut source = defaults();
        source.app_name = "Other".to_string();
        source.mapbox_api_key = Some("pk.test".to_string());
        let merged = merge(defaults(), ConfigOverrides::from(source.clone()));
        assert_eq!(merged, source);
    }
}
