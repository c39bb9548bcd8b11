//! CSRF guard stage (production profile only).
//!
//! # Responsibilities
//! - Validate the per-session token on state-changing verbs
//! - Exempt API-prefixed paths, which authenticate with access tokens
//!
//! # Design Decisions
//! - Runs after method override so overridden verbs are classified as
//!   state-changing
//! - A missing session means there is no token to match: the request is
//!   rejected, not trusted
//! - Token comparison is constant-time over equal-length strings

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};

use crate::context::RequestContext;
use crate::pipeline::{text_response, PipelineError, Stage, StageFlow};

const TOKEN_HEADER: &str = "x-csrf-token";
const TOKEN_FIELD: &str = "_csrf";

pub struct CsrfGuardStage;

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    )
}

/// API paths are exempt; the literal "/api" path itself is not an API
/// mount and stays guarded.
fn is_exempt(path: &str) -> bool {
    path != "/api" && path.contains("/api")
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn presented_token(req: &Request<Body>, ctx: &RequestContext) -> Option<String> {
    if let Some(token) = req.headers().get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(token.to_string());
    }
    if let Some(token) = ctx.body.field(TOKEN_FIELD) {
        return Some(token.to_string());
    }
    req.uri().query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == TOKEN_FIELD)
            .map(|(_, value)| value.into_owned())
    })
}

#[async_trait]
impl Stage for CsrfGuardStage {
    fn name(&self) -> &'static str {
        "csrf_guard"
    }

    async fn before(
        &self,
        req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        if !is_state_changing(req.method()) || is_exempt(req.uri().path()) {
            return Ok(StageFlow::Next(req));
        }

        let secret = ctx.session.csrf_secret().await;
        let token = presented_token(&req, ctx);

        match (secret, token) {
            (Some(secret), Some(token)) if constant_time_eq(&secret, &token) => {
                Ok(StageFlow::Next(req))
            }
            _ => Ok(StageFlow::Respond(text_response(
                StatusCode::FORBIDDEN,
                "invalid csrf token",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionData;

    async fn ctx_with_secret(req: &Request<Body>, secret: Option<&str>) -> RequestContext {
        let mut ctx = RequestContext::new("127.0.0.1:1".parse().unwrap(), req);
        ctx.session
            .resolve_active(
                "sid".to_string(),
                SessionData {
                    user: None,
                    csrf_secret: secret.map(str::to_string),
                },
            )
            .await;
        ctx
    }

    #[tokio::test]
    async fn test_get_requests_pass_without_token() {
        let req = Request::builder().uri("/topic/1").body(Body::empty()).unwrap();
        let mut ctx = ctx_with_secret(&req, None).await;
        assert!(matches!(
            CsrfGuardStage.before(req, &mut ctx).await.unwrap(),
            StageFlow::Next(_)
        ));
    }

    #[tokio::test]
    async fn test_post_without_token_rejected() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/topic/create")
            .body(Body::empty())
            .unwrap();
        let mut ctx = ctx_with_secret(&req, Some("secret-token")).await;
        match CsrfGuardStage.before(req, &mut ctx).await.unwrap() {
            StageFlow::Respond(res) => assert_eq!(res.status(), StatusCode::FORBIDDEN),
            StageFlow::Next(_) => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn test_matching_header_token_passes() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/topic/create")
            .header(TOKEN_HEADER, "secret-token")
            .body(Body::empty())
            .unwrap();
        let mut ctx = ctx_with_secret(&req, Some("secret-token")).await;
        assert!(matches!(
            CsrfGuardStage.before(req, &mut ctx).await.unwrap(),
            StageFlow::Next(_)
        ));
    }

    #[tokio::test]
    async fn test_query_token_accepted() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/topic/create?_csrf=secret-token")
            .body(Body::empty())
            .unwrap();
        let mut ctx = ctx_with_secret(&req, Some("secret-token")).await;
        assert!(matches!(
            CsrfGuardStage.before(req, &mut ctx).await.unwrap(),
            StageFlow::Next(_)
        ));
    }

    #[tokio::test]
    async fn test_api_paths_exempt_but_literal_api_guarded() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/topics")
            .body(Body::empty())
            .unwrap();
        let mut ctx = ctx_with_secret(&req, None).await;
        assert!(matches!(
            CsrfGuardStage.before(req, &mut ctx).await.unwrap(),
            StageFlow::Next(_)
        ));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api")
            .body(Body::empty())
            .unwrap();
        let mut ctx = ctx_with_secret(&req, None).await;
        assert!(matches!(
            CsrfGuardStage.before(req, &mut ctx).await.unwrap(),
            StageFlow::Respond(_)
        ));
    }

    #[tokio::test]
    async fn test_anonymous_state_change_rejected() {
        let req = Request::builder()
            .method(Method::DELETE)
            .uri("/topic/1")
            .header(TOKEN_HEADER, "anything")
            .body(Body::empty())
            .unwrap();
        let mut ctx = RequestContext::new("127.0.0.1:1".parse().unwrap(), &req);
        ctx.session.resolve_anonymous().await;
        assert!(matches!(
            CsrfGuardStage.before(req, &mut ctx).await.unwrap(),
            StageFlow::Respond(_)
        ));
    }
}
