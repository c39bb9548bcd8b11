//! Request logging and debug render timing.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;

use crate::context::RequestContext;
use crate::pipeline::{PipelineError, Stage, StageFlow};

/// Records the entry event for every request. Pure side effect, never
/// short-circuits.
pub struct RequestLogStage;

#[async_trait]
impl Stage for RequestLogStage {
    fn name(&self) -> &'static str {
        "request_log"
    }

    async fn before(
        &self,
        req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        tracing::info!(
            method = %req.method(),
            path = %req.uri().path(),
            remote = %ctx.remote_addr,
            "request received"
        );
        Ok(StageFlow::Next(req))
    }
}

/// Debug-only: logs how long an HTML response took to produce. Absent in
/// production for performance.
pub struct RenderTimerStage;

#[async_trait]
impl Stage for RenderTimerStage {
    fn name(&self) -> &'static str {
        "render_timer"
    }

    async fn after(&self, res: Response, ctx: &mut RequestContext) -> Response {
        let is_html = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/html"))
            .unwrap_or(false);
        if is_html {
            tracing::debug!(
                elapsed_ms = ctx.started.elapsed().as_millis() as u64,
                "render finished"
            );
        }
        res
    }
}
