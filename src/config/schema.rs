//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pipeline::Profile;

/// Root configuration for the forum gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Debug mode. Selects the debug pipeline profile (render timing,
    /// on-demand stylesheets, full error detail, no CSRF guard).
    pub debug: bool,

    /// Site branding exposed to the rendering layer.
    pub site: SiteConfig,

    /// Public base URL of the deployment. The canonical hostname used by the
    /// loopback guard redirect is derived from it.
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Secret used to sign the session cookie and verify signed cookies.
    pub session_secret: String,

    /// Name of the session cookie.
    pub session_cookie_name: String,

    /// Session time-to-live in the cache store, in seconds.
    pub session_ttl_secs: u64,

    /// Session cache connection settings.
    pub redis: RedisConfig,

    /// Maximum multipart upload size as a human-readable byte size
    /// (e.g. "5mb").
    pub file_limit: String,

    /// Use the pre-built, minified asset manifest. Requires the manifest
    /// file to exist at startup; a missing manifest is fatal.
    pub mini_assets: bool,

    /// Path to the asset manifest produced by the asset build.
    pub assets_manifest: PathBuf,

    /// Directory served under the `/public` prefix.
    pub public_dir: PathBuf,

    /// Address of the internal data-access handler reached via `/agent`.
    pub agent_upstream: String,

    /// GitHub OAuth application credentials.
    pub github: GithubOauthConfig,

    /// Logins rejected with a fixed response by the auth stage.
    pub blocked_users: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: true,
            site: SiteConfig::default(),
            host: "https://cnodejs.org".to_string(),
            port: 8000,
            session_secret: "forum_gateway".to_string(),
            session_cookie_name: "forum.sid".to_string(),
            session_ttl_secs: 86_400,
            redis: RedisConfig::default(),
            file_limit: "5mb".to_string(),
            mini_assets: false,
            assets_manifest: PathBuf::from("assets.json"),
            public_dir: PathBuf::from("public"),
            agent_upstream: "127.0.0.1:3100".to_string(),
            github: GithubOauthConfig::default(),
            blocked_users: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Pipeline profile selected by this configuration.
    pub fn profile(&self) -> Profile {
        if self.debug {
            Profile::Debug
        } else {
            Profile::Production
        }
    }

    /// Canonical hostname derived from the configured public base URL.
    /// Falls back to the raw `host` value when it is not a parsable URL.
    pub fn hostname(&self) -> String {
        url::Url::parse(&self.host)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.host.clone())
    }
}

/// Site branding.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub description: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Node Club".to_string(),
            description: "A community forum".to_string(),
        }
    }
}

/// Session cache connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: u32,
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
        }
    }
}

impl RedisConfig {
    /// Connection URL understood by the redis client.
    pub fn url(&self) -> String {
        match &self.password {
            Some(pass) => format!("redis://:{}@{}:{}/{}", pass, self.host, self.port, self.db),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// GitHub OAuth application credentials.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GithubOauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_from_url() {
        let config = AppConfig::default();
        assert_eq!(config.hostname(), "cnodejs.org");

        let config = AppConfig {
            host: "http://127.0.0.1:8000".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.hostname(), "127.0.0.1");
    }

    #[test]
    fn test_redis_url() {
        let redis = RedisConfig::default();
        assert_eq!(redis.url(), "redis://127.0.0.1:6379/0");

        let redis = RedisConfig {
            password: Some("hunter2".to_string()),
            db: 3,
            ..RedisConfig::default()
        };
        assert_eq!(redis.url(), "redis://:hunter2@127.0.0.1:6379/3");
    }

    #[test]
    fn test_profile_follows_debug_flag() {
        let mut config = AppConfig::default();
        assert_eq!(config.profile(), Profile::Debug);
        config.debug = false;
        assert_eq!(config.profile(), Profile::Production);
    }
}
