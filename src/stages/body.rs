//! Body handling stages: parsing, method override, multipart limits.
//!
//! # Responsibilities
//! - Parse JSON and urlencoded bodies up to a fixed 1 MB ceiling
//! - Let clients that cannot issue PUT/DELETE override the effective verb
//! - Cap multipart uploads at the configured file limit
//!
//! # Design Decisions
//! - Oversized or malformed bodies are client errors handled inline (413 /
//!   400); they never reach the terminal handler
//! - The raw bytes are replayed into the request so route tables can still
//!   consume the body
//! - Method override runs before the CSRF guard so overridden verbs are
//!   classified as state-changing

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use http_body_util::Limited;

use crate::context::{ParsedBody, RequestContext};
use crate::pipeline::{text_response, PipelineError, Stage, StageFlow};

/// Fixed ceiling for JSON and urlencoded bodies.
pub const BODY_LIMIT: usize = 1024 * 1024;

const OVERRIDE_HEADER: &str = "x-http-method-override";

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Parses JSON and urlencoded request bodies.
pub struct BodyParserStage;

#[async_trait]
impl Stage for BodyParserStage {
    fn name(&self) -> &'static str {
        "body_parser"
    }

    async fn before(
        &self,
        req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        let content_type = content_type(req.headers());
        let is_json = content_type.starts_with("application/json");
        let is_form = content_type.starts_with("application/x-www-form-urlencoded");
        if !is_json && !is_form {
            return Ok(StageFlow::Next(req));
        }

        if content_length(req.headers()).is_some_and(|len| len > BODY_LIMIT as u64) {
            return Ok(StageFlow::Respond(text_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request entity too large",
            )));
        }

        let (parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, BODY_LIMIT).await {
            Ok(bytes) => bytes,
            // Chunked bodies without a length land here when they overrun.
            Err(_) => {
                return Ok(StageFlow::Respond(text_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "request entity too large",
                )))
            }
        };

        if is_json {
            if !bytes.is_empty() {
                match serde_json::from_slice(&bytes) {
                    Ok(value) => ctx.body = ParsedBody::Json(value),
                    Err(_) => {
                        return Ok(StageFlow::Respond(text_response(
                            StatusCode::BAD_REQUEST,
                            "invalid json body",
                        )))
                    }
                }
            }
        } else {
            let pairs = url::form_urlencoded::parse(&bytes).into_owned().collect();
            ctx.body = ParsedBody::Form(pairs);
        }

        Ok(StageFlow::Next(Request::from_parts(
            parts,
            Body::from(bytes),
        )))
    }
}

/// Upgrades a POST to the verb named by the override header or `_method`
/// form field.
pub struct MethodOverrideStage;

#[async_trait]
impl Stage for MethodOverrideStage {
    fn name(&self) -> &'static str {
        "method_override"
    }

    async fn before(
        &self,
        mut req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        if req.method() != Method::POST {
            return Ok(StageFlow::Next(req));
        }

        let requested = req
            .headers()
            .get(OVERRIDE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| ctx.body.field("_method").map(str::to_string));

        if let Some(verb) = requested {
            match verb.to_ascii_uppercase().as_str() {
                "PUT" => *req.method_mut() = Method::PUT,
                "DELETE" => *req.method_mut() = Method::DELETE,
                "PATCH" => *req.method_mut() = Method::PATCH,
                // Anything else (GET included) is not a legitimate upgrade.
                _ => {}
            }
        }
        Ok(StageFlow::Next(req))
    }
}

/// Caps multipart/form-data uploads at the configured limit.
pub struct MultipartStage {
    limit: u64,
}

impl MultipartStage {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

#[async_trait]
impl Stage for MultipartStage {
    fn name(&self) -> &'static str {
        "multipart"
    }

    async fn before(
        &self,
        req: Request<Body>,
        _ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        if !content_type(req.headers()).starts_with("multipart/form-data") {
            return Ok(StageFlow::Next(req));
        }

        if content_length(req.headers()).is_some_and(|len| len > self.limit) {
            return Ok(StageFlow::Respond(text_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "upload too large",
            )));
        }

        // Declared length is fine (or absent); enforce the cap on the
        // stream itself for whoever consumes it.
        let (parts, body) = req.into_parts();
        let limited = Limited::new(body, self.limit as usize);
        Ok(StageFlow::Next(Request::from_parts(
            parts,
            Body::new(limited),
        )))
    }
}
