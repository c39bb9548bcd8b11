//! Loopback guard stage.
//!
//! The process is designed to sit behind a trusted reverse proxy that
//! rewrites the remote address to loopback. Direct traffic is permanently
//! redirected to the canonical public hostname with the original path
//! preserved. The trust relationship is assumed, not verified; see
//! DESIGN.md.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::Response;

use crate::context::RequestContext;
use crate::pipeline::{PipelineError, Stage, StageFlow};

pub struct LoopbackGuardStage {
    canonical_host: String,
}

impl LoopbackGuardStage {
    pub fn new(canonical_host: String) -> Self {
        Self { canonical_host }
    }
}

#[async_trait]
impl Stage for LoopbackGuardStage {
    fn name(&self) -> &'static str {
        "loopback_guard"
    }

    async fn before(
        &self,
        req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        if ctx.remote_addr.ip().is_loopback() {
            return Ok(StageFlow::Next(req));
        }

        let original = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target = format!("https://{}{}", self.canonical_host, original);

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::MOVED_PERMANENTLY;
        if let Ok(value) = HeaderValue::from_str(&target) {
            res.headers_mut().insert(header::LOCATION, value);
        }
        Ok(StageFlow::Respond(res))
    }
}
