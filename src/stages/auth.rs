//! OAuth initialization and the session/auth gate.
//!
//! # Responsibilities
//! - Attach the OAuth handshake machinery to the request
//! - Resolve the authenticated user from session state
//! - Enforce the block-list, strictly after resolution
//!
//! # Design Decisions
//! - The two auth sub-steps are sequential inside one stage: a blocked
//!   user must first be recognized as that user
//! - The block response is fixed and terminal; nothing downstream runs

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};

use crate::auth::GitHubOauth;
use crate::context::RequestContext;
use crate::pipeline::{text_response, PipelineError, Stage, StageFlow};

/// Fixed response body for blocked accounts.
pub const BLOCK_MESSAGE: &str = "your account has been locked, contact the administrators";

/// Prepares the identity-provider handshake machinery. The identity
/// serializes as itself into the session; there is no lookup here.
pub struct OauthInitStage {
    oauth: Arc<GitHubOauth>,
}

impl OauthInitStage {
    pub fn new(oauth: Arc<GitHubOauth>) -> Self {
        Self { oauth }
    }
}

#[async_trait]
impl Stage for OauthInitStage {
    fn name(&self) -> &'static str {
        "oauth_init"
    }

    async fn before(
        &self,
        mut req: Request<Body>,
        _ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        req.extensions_mut().insert(self.oauth.clone());
        Ok(StageFlow::Next(req))
    }
}

/// Resolves the request's user from session state, then enforces the
/// block-list.
pub struct AuthStage {
    blocked: HashSet<String>,
}

impl AuthStage {
    pub fn new(blocked: impl IntoIterator<Item = String>) -> Self {
        Self {
            blocked: blocked.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Stage for AuthStage {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn before(
        &self,
        mut req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        // Sub-step 1: resolve the user from the session gate.
        ctx.identity = ctx.session.user().await;

        // Sub-step 2: enforce the block-list.
        if let Some(identity) = &ctx.identity {
            if self.blocked.contains(&identity.login) {
                tracing::warn!(user = %identity.login, "blocked user rejected");
                return Ok(StageFlow::Respond(text_response(
                    StatusCode::FORBIDDEN,
                    BLOCK_MESSAGE,
                )));
            }
            req.extensions_mut().insert(identity.clone());
        }

        Ok(StageFlow::Next(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::session::SessionData;

    async fn ctx_with_user(login: &str) -> (Request<Body>, RequestContext) {
        let req = Request::new(Body::empty());
        let mut ctx = RequestContext::new("127.0.0.1:1".parse().unwrap(), &req);
        ctx.session
            .resolve_active(
                "sid".to_string(),
                SessionData {
                    user: Some(Identity::new(1, login)),
                    csrf_secret: None,
                },
            )
            .await;
        (req, ctx)
    }

    #[tokio::test]
    async fn test_identity_resolved_and_attached() {
        let (req, mut ctx) = ctx_with_user("alice").await;
        let stage = AuthStage::new(Vec::new());

        match stage.before(req, &mut ctx).await.unwrap() {
            StageFlow::Next(req) => {
                assert!(req.extensions().get::<Identity>().is_some());
            }
            StageFlow::Respond(_) => panic!("expected pass"),
        }
        assert_eq!(ctx.identity.as_ref().unwrap().login, "alice");
    }

    #[tokio::test]
    async fn test_blocked_user_gets_fixed_response() {
        let (req, mut ctx) = ctx_with_user("troll").await;
        let stage = AuthStage::new(vec!["troll".to_string()]);

        match stage.before(req, &mut ctx).await.unwrap() {
            StageFlow::Respond(res) => {
                assert_eq!(res.status(), StatusCode::FORBIDDEN);
                let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
                assert_eq!(&body[..], BLOCK_MESSAGE.as_bytes());
            }
            StageFlow::Next(_) => panic!("expected block"),
        }
    }

    #[tokio::test]
    async fn test_anonymous_request_passes() {
        let req = Request::new(Body::empty());
        let mut ctx = RequestContext::new("127.0.0.1:1".parse().unwrap(), &req);
        ctx.session.resolve_anonymous().await;

        let stage = AuthStage::new(vec!["troll".to_string()]);
        match stage.before(req, &mut ctx).await.unwrap() {
            StageFlow::Next(_) => assert!(ctx.identity.is_none()),
            StageFlow::Respond(_) => panic!("expected pass"),
        }
    }
}
