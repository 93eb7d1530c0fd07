//! Provider configuration
//!
//! Values are resolved once per run with this precedence: explicit
//! provider attributes, then `MGC_*` environment variables, then defaults
//! (`prod` environment, `br-se1` region).

use mgc_core::diagnostic::Diagnostic;
use mgc_core::resource::Attributes;
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use mgc_sdk::{DEFAULT_ENV, DEFAULT_REGION};

use crate::tfutil::{ConfigValue, MergeFromLookup, attributes_lookup, merge_field, object};

pub const PROVIDER_NAME: &str = "mgc";

/// Environments with their own endpoint tables
pub const KNOWN_ENVS: &[&str] = &["prod", "pre-prod", "dev-qa"];

/// Field tag → environment variable
const ENV_VARS: &[(&str, &str)] = &[
    ("api_key", "MGC_API_KEY"),
    ("env", "MGC_ENV"),
    ("region", "MGC_REGION"),
    ("key_id", "MGC_OBJ_KEY_ID"),
    ("key_secret", "MGC_OBJ_KEY_SECRET"),
    ("server_url", "MGC_SERVER_URL"),
    ("max_retries", "MGC_MAX_RETRIES"),
];

#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub region: String,
    pub env: String,
    /// Object storage key pair
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
    /// Replaces the regional endpoint table
    pub server_url: Option<String>,
    pub max_retries: Option<i64>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("region", &self.region)
            .field("env", &self.env)
            .field("key_id", &self.key_id)
            .field("server_url", &self.server_url)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            region: DEFAULT_REGION.to_string(),
            env: DEFAULT_ENV.to_string(),
            key_id: None,
            key_secret: None,
            server_url: None,
            max_retries: None,
        }
    }
}

impl MergeFromLookup for ProviderConfig {
    fn merge_from(&mut self, lookup: &dyn Fn(&str) -> Option<ConfigValue>) {
        merge_field(&mut self.api_key, "api_key", lookup);
        merge_field(&mut self.region, "region", lookup);
        merge_field(&mut self.env, "env", lookup);
        merge_field(&mut self.key_id, "key_id", lookup);
        merge_field(&mut self.key_secret, "key_secret", lookup);
        merge_field(&mut self.server_url, "server_url", lookup);
        merge_field(&mut self.max_retries, "max_retries", lookup);
    }
}

/// Lookup over the process environment
///
/// Integer fields are parsed; unparsable values are offered as strings and
/// then skipped by the integer field.
pub fn env_lookup(tag: &str) -> Option<ConfigValue> {
    let (_, var) = ENV_VARS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(tag))?;
    let value = std::env::var(var).ok()?;
    if tag.eq_ignore_ascii_case("max_retries")
        && let Ok(n) = value.trim().parse::<i64>()
    {
        return Some(ConfigValue::Int(n));
    }
    Some(ConfigValue::String(value))
}

impl ProviderConfig {
    /// Resolve the configuration from explicit attributes and the environment
    pub fn resolve(explicit: &Attributes) -> Result<Self, Diagnostic> {
        Self::resolve_with(explicit, &env_lookup)
    }

    /// Resolve against an arbitrary environment lookup
    pub fn resolve_with(
        explicit: &Attributes,
        env: &dyn Fn(&str) -> Option<ConfigValue>,
    ) -> Result<Self, Diagnostic> {
        if let Err(errors) = provider_schema().validate(explicit) {
            let detail = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Diagnostic::error("Invalid provider configuration", detail));
        }

        let mut config = ProviderConfig::default();
        config.merge_from(env);
        config.merge_from(&attributes_lookup(explicit));
        if let Some(key_pair) = object(explicit, "key_pair") {
            config.merge_from(&attributes_lookup(key_pair));
        }

        if config.api_key.is_empty() {
            return Err(Diagnostic::error(
                "Missing API Key",
                "Set the provider 'api_key' attribute or the MGC_API_KEY environment variable",
            ));
        }
        if !KNOWN_ENVS.contains(&config.env.as_str()) {
            log::warn!(
                "unknown environment '{}', endpoints resolve as '{}'",
                config.env,
                DEFAULT_ENV
            );
        }
        if matches!(config.max_retries, Some(n) if n < 0) {
            return Err(Diagnostic::error(
                "Invalid provider configuration",
                "max_retries must not be negative",
            ));
        }
        Ok(config)
    }

    /// Object storage key pair, when both halves are set
    pub fn object_storage_keys(&self) -> Option<(&str, &str)> {
        Some((self.key_id.as_deref()?, self.key_secret.as_deref()?))
    }
}

/// Schema of the provider block
pub fn provider_schema() -> ResourceSchema {
    ResourceSchema::new(PROVIDER_NAME)
        .with_description("Magalu Cloud provider configuration")
        .attribute(
            AttributeSchema::new("api_key", AttributeType::String)
                .sensitive()
                .with_description("API key; falls back to MGC_API_KEY"),
        )
        .attribute(
            AttributeSchema::new("region", AttributeType::String)
                .with_description("Region (br-se1, br-ne1, ...); falls back to MGC_REGION"),
        )
        .attribute(
            AttributeSchema::new("env", AttributeType::String).with_description(
                "Environment (prod, pre-prod, dev-qa); falls back to MGC_ENV. \
                 Unknown values resolve endpoints as prod",
            ),
        )
        .attribute(
            AttributeSchema::new("server_url", AttributeType::String)
                .with_description("Overrides the regional API endpoint"),
        )
        .attribute(
            AttributeSchema::new("max_retries", AttributeType::Int)
                .with_description("Retries for throttled or unavailable responses"),
        )
        .attribute(
            AttributeSchema::new(
                "key_pair",
                AttributeType::Object(vec![
                    AttributeSchema::new("key_id", AttributeType::String).required(),
                    AttributeSchema::new("key_secret", AttributeType::String)
                        .required()
                        .sensitive(),
                ]),
            )
            .with_description("Object storage key pair"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tfutil::attributes;
    use mgc_core::resource::Value;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<ConfigValue> {
        None
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let explicit = attributes([("api_key", Value::from("k"))]);
        let config = ProviderConfig::resolve_with(&explicit, &no_env).unwrap();
        assert_eq!(config.region, "br-se1");
        assert_eq!(config.env, "prod");
        assert_eq!(config.object_storage_keys(), None);
    }

    #[test]
    fn explicit_wins_over_env_which_wins_over_default() {
        temp_env::with_vars(
            [
                ("MGC_API_KEY", Some("env-key")),
                ("MGC_REGION", Some("br-ne1")),
                ("MGC_ENV", Some("pre-prod")),
                ("MGC_MAX_RETRIES", Some("5")),
            ],
            || {
                let explicit = attributes([("region", Value::from("br-mgl1"))]);
                let config = ProviderConfig::resolve(&explicit).unwrap();
                assert_eq!(config.api_key, "env-key");
                assert_eq!(config.region, "br-mgl1");
                assert_eq!(config.env, "pre-prod");
                assert_eq!(config.max_retries, Some(5));
            },
        );
    }

    #[test]
    fn key_pair_block_sets_object_storage_keys() {
        temp_env::with_vars(
            [
                ("MGC_API_KEY", Some("k")),
                ("MGC_OBJ_KEY_ID", Some("env-id")),
                ("MGC_OBJ_KEY_SECRET", None),
            ],
            || {
                let mut key_pair = HashMap::new();
                key_pair.insert("key_id".to_string(), Value::from("id"));
                key_pair.insert("key_secret".to_string(), Value::from("secret"));
                let explicit = attributes([("key_pair", Value::Map(key_pair))]);

                let config = ProviderConfig::resolve(&explicit).unwrap();
                assert_eq!(config.object_storage_keys(), Some(("id", "secret")));
            },
        );
    }

    #[test]
    fn unknown_env_resolves_the_same_from_either_source() {
        fn staging_env(tag: &str) -> Option<ConfigValue> {
            match tag {
                "api_key" => Some(ConfigValue::String("k".into())),
                "env" => Some(ConfigValue::String("staging".into())),
                _ => None,
            }
        }

        let explicit = attributes([
            ("api_key", Value::from("k")),
            ("env", Value::from("staging")),
        ]);
        let from_attribute = ProviderConfig::resolve_with(&explicit, &no_env).unwrap();
        let from_env = ProviderConfig::resolve_with(&Attributes::new(), &staging_env).unwrap();

        assert_eq!(from_attribute, from_env);
        assert_eq!(from_attribute.env, "staging");
        assert_eq!(
            mgc_sdk::region_to_url(&from_attribute.region, &from_attribute.env),
            mgc_sdk::region_to_url("br-se1", "prod")
        );
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = ProviderConfig::resolve_with(&Attributes::new(), &no_env).unwrap_err();
        assert_eq!(err.summary, "Missing API Key");
        assert!(err.is_error());
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let explicit = attributes([("api_key", Value::from("k")), ("zone", Value::from("x"))]);
        let err = ProviderConfig::resolve_with(&explicit, &no_env).unwrap_err();
        assert_eq!(err.summary, "Invalid provider configuration");
        assert!(err.detail.contains("zone"));
    }

    #[test]
    fn debug_hides_secrets() {
        let config = ProviderConfig {
            api_key: "super-secret".into(),
            key_secret: Some("hidden".into()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("hidden"));
    }
}
