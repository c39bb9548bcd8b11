//! Per-request context.
//!
//! # Responsibilities
//! - Carry everything stages attach additively (cookies, session gate,
//!   identity, parsed body, render locals)
//! - Snapshot the request facts the response-phase hooks need after the
//!   request value has been consumed by a route table
//!
//! # Design Decisions
//! - Explicit value threaded through the stage chain instead of ambient
//!   request mutation; optional fields model "not attached yet"
//! - The session gate lives in a shared cell so opaque route tables can
//!   write through it via a request extension

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use axum::http::{header, HeaderValue, Request};

use crate::auth::Identity;
use crate::session::SessionCell;

/// Cookies parsed from the request, split into raw values and values whose
/// signature verified against the server secret.
#[derive(Debug, Default, Clone)]
pub struct CookieJar {
    pub plain: HashMap<String, String>,
    pub signed: HashMap<String, String>,
}

/// Request body after the body-parser stage ran.
#[derive(Debug, Clone, Default)]
pub enum ParsedBody {
    /// Body was not a type the parser owns (or there was no body).
    #[default]
    Untouched,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

impl ParsedBody {
    /// Look up a form field by name. JSON bodies resolve string values.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            ParsedBody::Untouched => None,
            ParsedBody::Json(value) => value.get(name).and_then(|v| v.as_str()),
            ParsedBody::Form(pairs) => pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
        }
    }
}

/// Render-context values injected by the locals stage, made visible to the
/// route tables through a request extension.
#[derive(Debug, Clone)]
pub struct RenderLocals(pub serde_json::Map<String, serde_json::Value>);

/// Context value threaded through the stage chain for one request.
pub struct RequestContext {
    pub remote_addr: SocketAddr,
    pub started: Instant,
    /// Whether the client accepts an HTML response body.
    pub accept_html: bool,
    /// Accept-Encoding snapshot for the compression response hook.
    pub accept_encoding: Option<HeaderValue>,
    pub cookies: CookieJar,
    pub session: SessionCell,
    pub identity: Option<Identity>,
    pub body: ParsedBody,
    pub locals: serde_json::Map<String, serde_json::Value>,
    /// Rendering-layer cache hint, enabled by the view-cache stage.
    pub view_cache: bool,
}

impl RequestContext {
    pub fn new<B>(remote_addr: SocketAddr, req: &Request<B>) -> Self {
        let accept_html = req
            .headers()
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/html") || v.contains("*/*"))
            .unwrap_or(false);
        let accept_encoding = req.headers().get(header::ACCEPT_ENCODING).cloned();

        Self {
            remote_addr,
            started: Instant::now(),
            accept_html,
            accept_encoding,
            cookies: CookieJar::default(),
            session: SessionCell::unresolved(),
            identity: None,
            body: ParsedBody::default(),
            locals: serde_json::Map::new(),
            view_cache: false,
        }
    }
}
