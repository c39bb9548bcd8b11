//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Catch placeholder secrets before a production deployment runs with them
//! - Validate value ranges (ports, TTLs, byte sizes)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: AppConfig -> Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use crate::config::bytes::parse_byte_size;
use crate::config::schema::AppConfig;

/// A single configuration violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn violation(field: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        message: message.into(),
    }
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.port == 0 {
        errors.push(violation("port", "must be non-zero"));
    }

    if config.session_secret.is_empty() {
        errors.push(violation("session_secret", "must not be empty"));
    } else if !config.debug && config.session_secret == AppConfig::default().session_secret {
        errors.push(violation(
            "session_secret",
            "default secret is not allowed in production",
        ));
    }

    if config.session_ttl_secs == 0 {
        errors.push(violation("session_ttl_secs", "must be non-zero"));
    }

    if config.redis.host.is_empty() {
        errors.push(violation("redis.host", "must not be empty"));
    }

    if parse_byte_size(&config.file_limit).is_none() {
        errors.push(violation(
            "file_limit",
            format!("'{}' is not a valid byte size", config.file_limit),
        ));
    }

    if !config.debug {
        if config.github.client_id.is_empty() || config.github.client_secret.is_empty() {
            errors.push(violation(
                "github",
                "oauth credentials are required in production",
            ));
        }
        if config.mini_assets && config.assets_manifest.as_os_str().is_empty() {
            errors.push(violation(
                "assets_manifest",
                "must point at the built manifest when mini_assets is set",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production_config() -> AppConfig {
        AppConfig {
            debug: false,
            session_secret: "long-random-production-secret".to_string(),
            github: crate::config::schema::GithubOauthConfig {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                callback_url: "https://cnodejs.org/auth/github/callback".to_string(),
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_defaults_are_valid_in_debug() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_production_config_is_valid() {
        assert!(validate_config(&production_config()).is_ok());
    }

    #[test]
    fn test_default_secret_rejected_in_production() {
        let config = AppConfig {
            session_secret: AppConfig::default().session_secret,
            ..production_config()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "session_secret"));
    }

    #[test]
    fn test_collects_all_errors() {
        let config = AppConfig {
            port: 0,
            file_limit: "lots".to_string(),
            session_ttl_secs: 0,
            ..AppConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_missing_oauth_rejected_in_production() {
        let mut config = production_config();
        config.github.client_secret.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "github"));
    }
}
