//! Pipeline error taxonomy and the terminal error handler.
//!
//! Client input errors (oversized bodies, CSRF mismatches) are handled
//! inline by the owning stage and never reach this module. Everything that
//! lands here is an unexpected runtime failure.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use crate::session::StoreError;

/// Unexpected runtime failure raised by a stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("session cache failure: {0}")]
    Session(#[from] StoreError),

    #[error("route handler failure: {0}")]
    Route(String),
}

/// Marker a route handler attaches to its response to surface an internal
/// error to the terminal handler instead of rendering it itself.
#[derive(Debug, Clone)]
pub struct RouteError(pub String);

/// Terminal error handler.
///
/// Debug mode renders the full error to the client for diagnosability;
/// production logs it server-side exactly once and returns an opaque body.
pub struct ErrorHandler {
    debug: bool,
}

impl ErrorHandler {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn name(&self) -> &'static str {
        "terminal_error"
    }

    pub fn render(&self, err: &PipelineError) -> Response {
        let body = if self.debug {
            format!("Internal Server Error\n\n{err}\n\n{err:?}")
        } else {
            tracing::error!(error = %err, "request failed");
            "500 status".to_string()
        };

        let mut res = Response::new(Body::from(body));
        *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        res
    }
}
