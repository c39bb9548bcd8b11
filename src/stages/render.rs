//! Rendering-context stages: view cache hint, locals injection, error
//! pages.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;

use crate::context::{RenderLocals, RequestContext};
use crate::pipeline::{PipelineError, Stage, StageFlow};

/// Production-only rendering-layer cache hint. Not a security control.
pub struct ViewCacheStage;

#[async_trait]
impl Stage for ViewCacheStage {
    fn name(&self) -> &'static str {
        "view_cache"
    }

    async fn before(
        &self,
        req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        ctx.view_cache = true;
        Ok(StageFlow::Next(req))
    }
}

/// Injects the rendering locals: the static site/asset table computed once
/// at build time, plus the per-request CSRF token accessor.
pub struct LocalsStage {
    statics: Arc<serde_json::Map<String, serde_json::Value>>,
    /// Whether the CSRF guard is part of this profile; without it there is
    /// no token to expose.
    csrf_enabled: bool,
}

impl LocalsStage {
    pub fn new(
        statics: Arc<serde_json::Map<String, serde_json::Value>>,
        csrf_enabled: bool,
    ) -> Self {
        Self {
            statics,
            csrf_enabled,
        }
    }
}

#[async_trait]
impl Stage for LocalsStage {
    fn name(&self) -> &'static str {
        "locals"
    }

    async fn before(
        &self,
        mut req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        ctx.locals.extend(self.statics.as_ref().clone());
        ctx.locals
            .insert("view_cache".to_string(), ctx.view_cache.into());

        let csrf = if self.csrf_enabled {
            ctx.session
                .get_or_create_csrf_secret()
                .await
                .unwrap_or_default()
        } else {
            String::new()
        };
        ctx.locals.insert("csrf".to_string(), csrf.into());

        req.extensions_mut()
            .insert(RenderLocals(ctx.locals.clone()));
        Ok(StageFlow::Next(req))
    }
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Rewrites plain-text error responses into the forum's HTML error page
/// for clients that accept HTML.
pub struct ErrorPageStage;

#[async_trait]
impl Stage for ErrorPageStage {
    fn name(&self) -> &'static str {
        "error_page"
    }

    async fn after(&self, res: Response, ctx: &mut RequestContext) -> Response {
        let status = res.status();
        let is_error = status.is_client_error() || status.is_server_error();
        if !is_error || !ctx.accept_html {
            return res;
        }
        let is_plain = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/plain"))
            .unwrap_or(true);
        if !is_plain {
            return res;
        }

        let (mut parts, body) = res.into_parts();
        let bytes = match axum::body::to_bytes(body, 64 * 1024).await {
            Ok(bytes) => bytes,
            Err(_) => return Response::from_parts(parts, Body::empty()),
        };
        let message = html_escape(&String::from_utf8_lossy(&bytes));
        let page = format!(
            "<!DOCTYPE html><html><head><title>{status}</title></head>\
             <body><div class=\"error-page\"><h1>{status}</h1><pre>{message}</pre></div></body></html>"
        );

        parts.headers.remove(header::CONTENT_LENGTH);
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        Response::from_parts(parts, Body::from(page))
    }
}
