//! Static asset stages.
//!
//! # Responsibilities
//! - Debug: serve stylesheet sources on demand, uncached, so edits show up
//!   without an asset build
//! - Serve files under the public prefix straight from disk
//!
//! # Design Decisions
//! - Both stages short-circuit: `/public` requests never reach the route
//!   tables, with content or with a 404
//! - Disk serving is delegated to tower-http's ServeDir after stripping the
//!   mount prefix

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, StatusCode, Uri};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::context::RequestContext;
use crate::pipeline::{text_response, PipelineError, Stage, StageFlow};

const PUBLIC_PREFIX: &str = "/public";

/// Strip the public mount prefix from a request path. `None` when the
/// request is outside the mount.
fn strip_public_prefix(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(PUBLIC_PREFIX)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        // "/publicfoo" is not under the mount.
        None
    }
}

/// Rebuild a request with the mount prefix removed.
fn strip_request_prefix(req: Request<Body>, rest: &str) -> Result<Request<Body>, Response> {
    let (mut parts, body) = req.into_parts();
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{rest}?{query}"),
        None => rest.to_string(),
    };
    match path_and_query.parse::<Uri>() {
        Ok(uri) => {
            parts.uri = uri;
            Ok(Request::from_parts(parts, body))
        }
        Err(_) => Err(text_response(StatusCode::NOT_FOUND, "404 not found")),
    }
}

/// Debug-only on-demand stylesheet serving. Production assets are
/// pre-built; this stage lets stylesheet edits show up immediately during
/// development by serving the sources uncached, ahead of the static file
/// server.
pub struct AssetCompilerStage {
    public_dir: PathBuf,
}

impl AssetCompilerStage {
    pub fn new(public_dir: PathBuf) -> Self {
        Self { public_dir }
    }
}

#[async_trait]
impl Stage for AssetCompilerStage {
    fn name(&self) -> &'static str {
        "asset_compiler"
    }

    async fn before(
        &self,
        req: Request<Body>,
        _ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        let path = req.uri().path();
        let is_stylesheet = req.method() == Method::GET
            && path.starts_with("/public/stylesheets/")
            && path.ends_with(".css");
        if !is_stylesheet {
            return Ok(StageFlow::Next(req));
        }

        let rel = Path::new(path.trim_start_matches("/public/"));
        if rel.components().any(|c| matches!(c, Component::ParentDir)) {
            return Ok(StageFlow::Respond(text_response(
                StatusCode::FORBIDDEN,
                "forbidden",
            )));
        }

        match tokio::fs::read(self.public_dir.join(rel)).await {
            Ok(bytes) => {
                let mut res = Response::new(Body::from(bytes));
                res.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/css; charset=utf-8"),
                );
                res.headers_mut()
                    .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
                Ok(StageFlow::Respond(res))
            }
            // Missing source falls through to the static file server's 404.
            Err(_) => Ok(StageFlow::Next(req)),
        }
    }
}

/// Serves `/public/*` from disk, short-circuiting with the file content or
/// a 404.
pub struct StaticFilesStage {
    files: ServeDir,
}

impl StaticFilesStage {
    pub fn new(public_dir: PathBuf) -> Self {
        Self {
            files: ServeDir::new(public_dir),
        }
    }
}

#[async_trait]
impl Stage for StaticFilesStage {
    fn name(&self) -> &'static str {
        "static_files"
    }

    async fn before(
        &self,
        req: Request<Body>,
        _ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        let Some(rest) = strip_public_prefix(req.uri().path()) else {
            return Ok(StageFlow::Next(req));
        };
        let rest = rest.to_string();

        let stripped = match strip_request_prefix(req, &rest) {
            Ok(req) => req,
            Err(res) => return Ok(StageFlow::Respond(res)),
        };

        let res = match self.files.clone().oneshot(stripped).await {
            Ok(res) => res.map(Body::new),
            Err(err) => match err {},
        };
        Ok(StageFlow::Respond(res))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_public_prefix() {
        assert_eq!(strip_public_prefix("/public/app.css"), Some("/app.css"));
        assert_eq!(strip_public_prefix("/public"), Some("/"));
        assert_eq!(strip_public_prefix("/publicity"), None);
        assert_eq!(strip_public_prefix("/topic/1"), None);
    }

    #[tokio::test]
    async fn test_serves_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.css"), "body{}").unwrap();

        let stage = StaticFilesStage::new(dir.path().to_path_buf());
        let req = Request::builder()
            .uri("/public/app.css")
            .body(Body::empty())
            .unwrap();
        let mut ctx = RequestContext::new("127.0.0.1:1".parse().unwrap(), &req);

        match stage.before(req, &mut ctx).await.unwrap() {
            StageFlow::Respond(res) => assert_eq!(res.status(), StatusCode::OK),
            StageFlow::Next(_) => panic!("expected short-circuit"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_short_circuits_with_404() {
        let dir = tempfile::tempdir().unwrap();
        let stage = StaticFilesStage::new(dir.path().to_path_buf());
        let req = Request::builder()
            .uri("/public/missing.css")
            .body(Body::empty())
            .unwrap();
        let mut ctx = RequestContext::new("127.0.0.1:1".parse().unwrap(), &req);

        match stage.before(req, &mut ctx).await.unwrap() {
            StageFlow::Respond(res) => assert_eq!(res.status(), StatusCode::NOT_FOUND),
            StageFlow::Next(_) => panic!("expected short-circuit"),
        }
    }

    #[tokio::test]
    async fn test_asset_compiler_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let stage = AssetCompilerStage::new(dir.path().to_path_buf());
        let req = Request::builder()
            .uri("/public/stylesheets/../../etc/passwd.css")
            .body(Body::empty())
            .unwrap();
        let mut ctx = RequestContext::new("127.0.0.1:1".parse().unwrap(), &req);

        match stage.before(req, &mut ctx).await.unwrap() {
            StageFlow::Respond(res) => assert_eq!(res.status(), StatusCode::FORBIDDEN),
            StageFlow::Next(_) => panic!("expected rejection"),
        }
    }
}
