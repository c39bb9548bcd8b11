//! Cookie parsing stage.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};

use crate::context::{CookieJar, RequestContext};
use crate::pipeline::{PipelineError, Stage, StageFlow};
use crate::session::cookie;

/// Parses the Cookie header into a keyed mapping; values carrying a valid
/// signature under the server secret also land in the signed map.
pub struct CookieParserStage {
    secret: String,
}

impl CookieParserStage {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl Stage for CookieParserStage {
    fn name(&self) -> &'static str {
        "cookie_parser"
    }

    async fn before(
        &self,
        req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        let mut jar = CookieJar::default();
        if let Some(raw) = req.headers().get(header::COOKIE).and_then(|v| v.to_str().ok()) {
            for (name, value) in cookie::parse_cookie_header(raw) {
                if let Some(verified) = cookie::verify(&value, &self.secret) {
                    jar.signed.insert(name.clone(), verified);
                }
                jar.plain.insert(name, value);
            }
        }
        ctx.cookies = jar;
        Ok(StageFlow::Next(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_splits_signed_from_plain_cookies() {
        let signed = cookie::sign("sid-1", "secret");
        let header_value = format!("theme=dark; forum.sid={signed}; forged=sid-2.bad");
        let req = Request::builder()
            .header(header::COOKIE, header_value)
            .body(Body::empty())
            .unwrap();
        let mut ctx = RequestContext::new("127.0.0.1:1".parse().unwrap(), &req);

        let stage = CookieParserStage::new("secret".to_string());
        stage.before(req, &mut ctx).await.unwrap();

        assert_eq!(ctx.cookies.plain.get("theme").unwrap(), "dark");
        assert_eq!(ctx.cookies.signed.get("forum.sid").unwrap(), "sid-1");
        assert!(ctx.cookies.signed.get("forged").is_none());
        assert!(ctx.cookies.plain.contains_key("forged"));
    }
}
