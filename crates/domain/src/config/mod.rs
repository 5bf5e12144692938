mod billing;
mod database;
mod llm;
mod providers;
mod retrieval;
mod server;
mod telephony;

pub use billing::*;
pub use database::*;
pub use llm::*;
pub use providers::*;
pub use retrieval::*;
pub use server::*;
pub use telephony::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub stt: SttConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub telephony: TelephonyConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admin
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Environment variable holding the admin bearer token.
    /// If the env var is unset, admin endpoints are **disabled** (403).
    #[serde(default = "d_admin_token_env")]
    pub token_env: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            token_env: d_admin_token_env(),
        }
    }
}

fn d_admin_token_env() -> String {
    "ADMIN_TOKEN".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. An empty vec
    /// means everything looks good; the caller fails fast on any `Error`.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.llm.providers.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.providers".into(),
                message: "no LLM providers configured; turns will use the inline fallback generator".into(),
            });
        }

        let mut seen_ids: HashSet<&str> = HashSet::new();
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: "provider base_url must not be empty".into(),
                });
            }
            if !provider.base_url.is_empty()
                && !provider.base_url.starts_with("http://")
                && !provider.base_url.starts_with("https://")
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: format!(
                        "base_url must start with http:// or https:// (got \"{}\")",
                        provider.base_url
                    ),
                });
            }
            if !provider.id.is_empty() && !seen_ids.insert(&provider.id) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("llm.providers[{i}].id"),
                    message: format!(
                        "duplicate provider id \"{}\" — later provider will shadow earlier one",
                        provider.id
                    ),
                });
            }

            let needs_credentials = matches!(provider.auth.mode, AuthMode::ApiKey | AuthMode::QueryParam);
            if needs_credentials {
                let has_env = provider.auth.env.as_ref().is_some_and(|v| !v.is_empty());
                let has_key = provider.auth.key.as_ref().is_some_and(|v| !v.is_empty());
                let has_keys = !provider.auth.keys.is_empty();
                if !has_env && !has_key && !has_keys {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Error,
                        field: format!("llm.providers[{i}].auth"),
                        message: format!(
                            "provider \"{}\" uses {:?} auth mode but has no auth.env, auth.key, or auth.keys configured",
                            provider.id, provider.auth.mode
                        ),
                    });
                }
            }
        }

        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*" {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)".into(),
            });
        }

        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.requests_per_second".into(),
                    message: "requests_per_second must be greater than 0".into(),
                });
            }
            if rl.burst_size == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.burst_size".into(),
                    message: "burst_size must be greater than 0".into(),
                });
            }
        }

        if self.retrieval.similarity_floor < 0.0 || self.retrieval.similarity_floor > 1.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "retrieval.similarity_floor".into(),
                message: "similarity_floor must be within [0, 1]".into(),
            });
        }
        if self.retrieval.limit == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "retrieval.limit".into(),
                message: "limit must be greater than 0".into(),
            });
        }

        if std::env::var(&self.database.url_env).is_err() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "database.url_env".into(),
                message: format!(
                    "environment variable \"{}\" is not set",
                    self.database.url_env
                ),
            });
        }
        if std::env::var(&self.database.redis_url_env).is_err() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "database.redis_url_env".into(),
                message: format!(
                    "environment variable \"{}\" is not set",
                    self.database.redis_url_env
                ),
            });
        }
        if std::env::var(&self.telephony.auth_token_env).is_err() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "telephony.auth_token_env".into(),
                message: format!(
                    "environment variable \"{}\" is not set; webhook signature checks will reject everything",
                    self.telephony.auth_token_env
                ),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        std::env::set_var("TEST_DATABASE_URL", "postgres://localhost/test");
        std::env::set_var("TEST_REDIS_URL", "redis://localhost");
        std::env::set_var("TEST_TELEPHONY_TOKEN", "tok");
        Config {
            server: ServerConfig {
                port: 3210,
                host: "0.0.0.0".into(),
                ..ServerConfig::default()
            },
            database: DatabaseConfig {
                url_env: "TEST_DATABASE_URL".into(),
                redis_url_env: "TEST_REDIS_URL".into(),
                ..DatabaseConfig::default()
            },
            telephony: TelephonyConfig {
                auth_token_env: "TEST_TELEPHONY_TOKEN".into(),
                ..TelephonyConfig::default()
            },
            llm: LlmConfig {
                providers: vec![ProviderConfig {
                    id: "openai".into(),
                    kind: ProviderKind::OpenaiCompat,
                    base_url: "https://api.openai.com/v1".into(),
                    auth: AuthConfig {
                        mode: AuthMode::ApiKey,
                        env: Some("OPENAI_API_KEY".into()),
                        ..AuthConfig::default()
                    },
                    default_model: None,
                }],
                ..LlmConfig::default()
            },
            ..Config::default()
        }
    }

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn valid_config_passes() {
        let issues = valid_config().validate();
        let errors: Vec<_> = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn server_port_zero_is_error() {
        let mut cfg = valid_config();
        cfg.server.port = 0;
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "server.port").unwrap().severity, ConfigSeverity::Error);
    }

    #[test]
    fn missing_database_url_env_is_error() {
        let mut cfg = valid_config();
        cfg.database.url_env = "DEFINITELY_UNSET_VAR_XYZ".into();
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "database.url_env").unwrap().severity, ConfigSeverity::Error);
    }

    #[test]
    fn similarity_floor_out_of_range_is_error() {
        let mut cfg = valid_config();
        cfg.retrieval.similarity_floor = 1.5;
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "retrieval.similarity_floor").unwrap().severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn no_providers_is_warning() {
        let mut cfg = valid_config();
        cfg.llm.providers.clear();
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "llm.providers").unwrap().severity, ConfigSeverity::Warning);
    }

    #[test]
    fn duplicate_provider_ids_is_warning() {
        let mut cfg = valid_config();
        let mut second = cfg.llm.providers[0].clone();
        second.auth.env = Some("OPENAI_API_KEY_2".into());
        cfg.llm.providers.push(second);
        let issues = cfg.validate();
        let dup: Vec<_> = issues.iter().filter(|e| e.message.contains("duplicate provider id")).collect();
        assert_eq!(dup.len(), 1);
        assert_eq!(dup[0].severity, ConfigSeverity::Warning);
    }

    #[test]
    fn config_error_display_format() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "server.port".into(),
            message: "port must be greater than 0".into(),
        };
        assert_eq!(format!("{err}"), "[ERROR] server.port: port must be greater than 0");
    }
}
