//! Response header stages.

use async_trait::async_trait;
use axum::http::HeaderValue;
use axum::response::Response;

use crate::context::RequestContext;
use crate::pipeline::Stage;

/// Adds total handling latency as an `X-Response-Time` header.
pub struct ResponseTimeStage;

#[async_trait]
impl Stage for ResponseTimeStage {
    fn name(&self) -> &'static str {
        "response_time"
    }

    async fn after(&self, mut res: Response, ctx: &mut RequestContext) -> Response {
        let elapsed = format!("{}ms", ctx.started.elapsed().as_millis());
        if let Ok(value) = HeaderValue::from_str(&elapsed) {
            res.headers_mut().insert("x-response-time", value);
        }
        res
    }
}

/// Restricts frame embedding to same-origin pages.
pub struct SecurityHeadersStage;

#[async_trait]
impl Stage for SecurityHeadersStage {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    async fn after(&self, mut res: Response, _ctx: &mut RequestContext) -> Response {
        res.headers_mut()
            .entry("x-frame-options")
            .or_insert(HeaderValue::from_static("SAMEORIGIN"));
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn ctx() -> RequestContext {
        let req = Request::new(Body::empty());
        RequestContext::new("127.0.0.1:1".parse().unwrap(), &req)
    }

    #[tokio::test]
    async fn test_response_time_header_added() {
        let res = ResponseTimeStage
            .after(Response::new(Body::empty()), &mut ctx())
            .await;
        let value = res.headers().get("x-response-time").unwrap();
        assert!(value.to_str().unwrap().ends_with("ms"));
    }

    #[tokio::test]
    async fn test_frameguard_does_not_override_explicit_header() {
        let mut res = Response::new(Body::empty());
        res.headers_mut()
            .insert("x-frame-options", HeaderValue::from_static("DENY"));
        let res = SecurityHeadersStage.after(res, &mut ctx()).await;
        assert_eq!(res.headers().get("x-frame-options").unwrap(), "DENY");

        let res = SecurityHeadersStage
            .after(Response::new(Body::empty()), &mut ctx())
            .await;
        assert_eq!(res.headers().get("x-frame-options").unwrap(), "SAMEORIGIN");
    }
}
