//! Response compression stage.
//!
//! Negotiates gzip/deflate from the request's Accept-Encoding snapshot and
//! applies it on the way out. Because response hooks only run for stages
//! that were entered, responses produced earlier in the chain (static
//! files, the agent proxy) are emitted untouched, matching the mount order.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use tower::{service_fn, ServiceExt};
use tower_http::compression::Compression;

use crate::context::RequestContext;
use crate::pipeline::Stage;

pub struct CompressionStage;

#[async_trait]
impl Stage for CompressionStage {
    fn name(&self) -> &'static str {
        "compression"
    }

    async fn after(&self, res: Response, ctx: &mut RequestContext) -> Response {
        let Some(accept) = ctx.accept_encoding.clone() else {
            return res;
        };

        // Replay the negotiation against a probe request carrying the
        // original Accept-Encoding.
        let mut probe = Request::new(Body::empty());
        probe.headers_mut().insert(header::ACCEPT_ENCODING, accept);

        let mut slot = Some(res);
        let inner = service_fn(move |_req: Request<Body>| {
            let res = slot.take();
            async move {
                Ok::<_, Infallible>(match res {
                    Some(res) => res,
                    None => Response::new(Body::empty()),
                })
            }
        });

        match Compression::new(inner).oneshot(probe).await {
            Ok(res) => res.map(Body::new),
            Err(err) => match err {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_gzip_applied_when_accepted() {
        let req = Request::builder()
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap();
        let mut ctx = RequestContext::new("127.0.0.1:1".parse().unwrap(), &req);

        let mut res = Response::new(Body::from("x".repeat(4096)));
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );

        let res = CompressionStage.after(res, &mut ctx).await;
        assert_eq!(res.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
    }

    #[tokio::test]
    async fn test_untouched_without_accept_encoding() {
        let req = Request::new(Body::empty());
        let mut ctx = RequestContext::new("127.0.0.1:1".parse().unwrap(), &req);

        let res = CompressionStage
            .after(Response::new(Body::from("hello")), &mut ctx)
            .await;
        assert!(res.headers().get(header::CONTENT_ENCODING).is_none());
    }
}
