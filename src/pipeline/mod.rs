//! Request processing pipeline.
//!
//! # Responsibilities
//! - Define the handle-or-pass stage contract
//! - Walk the ordered stage chain for every request
//! - Route stage failures into the terminal error handler
//!
//! # Design Decisions
//! - The stage order is a data structure (a `Vec` built from a profile),
//!   not an implicit call sequence; tests assert it by inspection
//! - Response hooks run in reverse over the stages that were entered, so a
//!   stage's response treatment applies only to responses produced
//!   downstream of it (static files are never compressed, for example)
//! - The web router always responds, so the chain cannot fall off the end
//!   in a correctly built pipeline; a defensive 404 covers hand-built ones

pub mod builder;
pub mod error;
pub mod profile;

use std::convert::Infallible;
use std::net::SocketAddr;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::Response;
use tower::util::BoxCloneSyncService;

use crate::context::RequestContext;

pub use builder::{BuildError, PipelineBuilder};
pub use error::{ErrorHandler, PipelineError, RouteError};
pub use profile::{Profile, StageKind};

/// Boxed handler type for mounted route tables.
pub type HttpHandler = BoxCloneSyncService<Request<Body>, Response, Infallible>;

/// What a stage decided to do with the request.
pub enum StageFlow {
    /// Pass control to the next stage.
    Next(Request<Body>),
    /// Short-circuit with a response; later stages never run.
    Respond(Response),
}

/// One unit of the request pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable name, used for order inspection and logging.
    fn name(&self) -> &'static str;

    /// Request hook. Default: pass through unchanged.
    async fn before(
        &self,
        req: Request<Body>,
        _ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        Ok(StageFlow::Next(req))
    }

    /// Response hook, applied in reverse stage order on the way out.
    async fn after(&self, res: Response, _ctx: &mut RequestContext) -> Response {
        res
    }
}

/// The assembled stage chain.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    errors: ErrorHandler,
}

impl Pipeline {
    pub(crate) fn new(stages: Vec<Box<dyn Stage>>, errors: ErrorHandler) -> Self {
        Self { stages, errors }
    }

    /// Ordered stage names, including the terminal error handler.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.errors.name()))
            .collect()
    }

    /// Entry operation: run one request through the chain.
    pub async fn handle(&self, req: Request<Body>, remote: SocketAddr) -> Response {
        let mut ctx = RequestContext::new(remote, &req);

        let mut current = req;
        let mut produced: Option<(usize, Response)> = None;
        for (idx, stage) in self.stages.iter().enumerate() {
            match stage.before(current, &mut ctx).await {
                Ok(StageFlow::Next(req)) => current = req,
                Ok(StageFlow::Respond(res)) => {
                    produced = Some((idx, res));
                    break;
                }
                Err(err) => {
                    produced = Some((idx, self.errors.render(&err)));
                    break;
                }
            }
        }

        let (entered, mut response) = match produced {
            Some((idx, res)) => (idx + 1, res),
            None => (
                self.stages.len(),
                text_response(StatusCode::NOT_FOUND, "404 not found"),
            ),
        };

        for stage in self.stages[..entered].iter().rev() {
            response = stage.after(response, &mut ctx).await;
        }

        response
    }
}

/// Plain-text response with an explicit status.
pub(crate) fn text_response(status: StatusCode, body: &'static str) -> Response {
    let mut res = Response::new(Body::from(body));
    *res.status_mut() = status;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res
}
