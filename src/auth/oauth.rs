//! GitHub OAuth handshake machinery.
//!
//! # Responsibilities
//! - Build the authorize URL the login route redirects to
//! - Exchange a callback code for an identity
//!
//! # Design Decisions
//! - Constructed once at pipeline build time; the oauth-init stage attaches
//!   it to each request for the (external) callback route to use
//! - No token persistence: the resulting identity is stored whole in the
//!   session record

use serde::Deserialize;
use url::Url;

use crate::auth::Identity;
use crate::config::schema::GithubOauthConfig;

const AUTHORIZE_ENDPOINT: &str = "https://github.com/login/oauth/authorize";
const TOKEN_ENDPOINT: &str = "https://github.com/login/oauth/access_token";
const USER_ENDPOINT: &str = "https://api.github.com/user";
const USER_AGENT: &str = concat!("forum-gateway/", env!("CARGO_PKG_VERSION"));

/// Error type for the OAuth handshake.
#[derive(Debug, thiserror::Error)]
pub enum OauthError {
    #[error("invalid oauth endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider rejected the code: {0}")]
    Denied(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
}

/// GitHub OAuth client.
pub struct GitHubOauth {
    client_id: String,
    client_secret: String,
    callback_url: String,
    authorize_endpoint: Url,
    http: reqwest::Client,
}

impl GitHubOauth {
    pub fn new(config: &GithubOauthConfig) -> Result<Self, OauthError> {
        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            callback_url: config.callback_url.clone(),
            authorize_endpoint: Url::parse(AUTHORIZE_ENDPOINT)?,
            http: reqwest::Client::new(),
        })
    }

    /// URL the login route redirects the browser to.
    pub fn authorize_url(&self, state: &str) -> Url {
        let mut url = self.authorize_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.callback_url)
            .append_pair("state", state);
        url
    }

    /// Exchange the callback code for the user's identity.
    pub async fn exchange_code(&self, code: &str) -> Result<Identity, OauthError> {
        let token: TokenResponse = self
            .http
            .post(TOKEN_ENDPOINT)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let access_token = token.access_token.ok_or_else(|| {
            OauthError::Denied(
                token
                    .error_description
                    .unwrap_or_else(|| "no access token granted".to_string()),
            )
        })?;

        let user: GithubUser = self
            .http
            .get(USER_ENDPOINT)
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(Identity {
            id: user.id,
            login: user.login,
            name: user.name,
            avatar_url: user.avatar_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_carries_credentials_and_state() {
        let oauth = GitHubOauth::new(&GithubOauthConfig {
            client_id: "abc".to_string(),
            client_secret: "shh".to_string(),
            callback_url: "https://cnodejs.org/auth/github/callback".to_string(),
        })
        .unwrap();

        let url = oauth.authorize_url("xyzzy");
        assert_eq!(url.host_str(), Some("github.com"));
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("client_id".to_string(), "abc".to_string())));
        assert!(query.contains(&("state".to_string(), "xyzzy".to_string())));
        // The client secret never appears in the browser-visible URL.
        assert!(!url.as_str().contains("shh"));
    }
}
