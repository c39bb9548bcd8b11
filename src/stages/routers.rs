//! Route table mount stages.
//!
//! # Responsibilities
//! - Mount the API route table at its path prefix, wrapped in permissive
//!   cross-origin headers, with the prefix stripped
//! - Mount the web route table at the root; it handles everything left
//! - Surface `RouteError` markers from opaque handlers to the terminal
//!   error handler
//!
//! # Design Decisions
//! - Route tables are opaque boxed services; the pipeline never looks
//!   inside them
//! - Both stages are terminal: they always respond

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use axum::response::Response;
use tower::ServiceExt;

use crate::context::RequestContext;
use crate::pipeline::{text_response, HttpHandler, PipelineError, RouteError, Stage, StageFlow};

const API_PREFIX: &str = "/api/v1";

async fn invoke(handler: &HttpHandler, req: Request<Body>) -> Result<Response, PipelineError> {
    let res = match handler.clone().oneshot(req).await {
        Ok(res) => res,
        Err(err) => match err {},
    };
    if let Some(RouteError(message)) = res.extensions().get::<RouteError>() {
        return Err(PipelineError::Route(message.clone()));
    }
    Ok(res)
}

/// API route table mounted at `/api/v1`.
pub struct ApiRouterStage {
    handler: HttpHandler,
}

impl ApiRouterStage {
    pub fn new(handler: HttpHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Stage for ApiRouterStage {
    fn name(&self) -> &'static str {
        "api_router"
    }

    async fn before(
        &self,
        req: Request<Body>,
        _ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        let path = req.uri().path();
        let rest = match path.strip_prefix(API_PREFIX) {
            Some("") => "/".to_string(),
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => return Ok(StageFlow::Next(req)),
        };

        let (mut parts, body) = req.into_parts();
        let path_and_query = match parts.uri.query() {
            Some(query) => format!("{rest}?{query}"),
            None => rest,
        };
        match path_and_query.parse::<Uri>() {
            Ok(uri) => parts.uri = uri,
            Err(_) => {
                return Ok(StageFlow::Respond(text_response(
                    StatusCode::NOT_FOUND,
                    "404 not found",
                )))
            }
        }

        let res = invoke(&self.handler, Request::from_parts(parts, body)).await?;
        Ok(StageFlow::Respond(res))
    }
}

/// Web route table mounted at the root. Terminal: always responds.
pub struct WebRouterStage {
    handler: HttpHandler,
}

impl WebRouterStage {
    pub fn new(handler: HttpHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Stage for WebRouterStage {
    fn name(&self) -> &'static str {
        "web_router"
    }

    async fn before(
        &self,
        req: Request<Body>,
        _ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        let res = invoke(&self.handler, req).await?;
        Ok(StageFlow::Respond(res))
    }
}
