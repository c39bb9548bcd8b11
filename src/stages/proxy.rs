//! Internal agent proxy stage.
//!
//! Serves the `/agent` prefix by forwarding to the internal data-access
//! handler. Short-circuits; an unreachable upstream is a 502 handled
//! inline, not a terminal error.

use std::str::FromStr;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{Request, StatusCode, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::context::RequestContext;
use crate::pipeline::{text_response, PipelineError, Stage, StageFlow};

const AGENT_PREFIX: &str = "/agent";

pub struct AgentProxyStage {
    client: Client<HttpConnector, Body>,
    upstream: String,
}

impl AgentProxyStage {
    pub fn new(upstream: String) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, upstream }
    }

    fn upstream_uri(&self, uri: &Uri, rest: &str) -> Option<Uri> {
        let path_and_query = match uri.query() {
            Some(query) => format!("{rest}?{query}"),
            None => rest.to_string(),
        };
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Authority::from_str(&self.upstream).ok();
        parts.path_and_query = path_and_query.parse().ok();
        Uri::from_parts(parts).ok()
    }
}

#[async_trait]
impl Stage for AgentProxyStage {
    fn name(&self) -> &'static str {
        "agent_proxy"
    }

    async fn before(
        &self,
        req: Request<Body>,
        _ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        let path = req.uri().path();
        let rest = match path.strip_prefix(AGENT_PREFIX) {
            Some("") => "/".to_string(),
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => return Ok(StageFlow::Next(req)),
        };

        let (parts, body) = req.into_parts();
        let Some(uri) = self.upstream_uri(&parts.uri, &rest) else {
            tracing::error!(upstream = %self.upstream, "invalid agent upstream address");
            return Ok(StageFlow::Respond(text_response(
                StatusCode::BAD_GATEWAY,
                "agent upstream unavailable",
            )));
        };

        let mut builder = Request::builder()
            .method(parts.method.clone())
            .uri(uri)
            .version(parts.version);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in parts.headers.iter() {
                headers.insert(name.clone(), value.clone());
            }
        }
        let forwarded = match builder.body(body) {
            Ok(req) => req,
            Err(err) => {
                tracing::error!(error = %err, "failed to build agent request");
                return Ok(StageFlow::Respond(text_response(
                    StatusCode::BAD_GATEWAY,
                    "agent upstream unavailable",
                )));
            }
        };

        match self.client.request(forwarded).await {
            Ok(res) => Ok(StageFlow::Respond(res.map(Body::new))),
            Err(err) => {
                tracing::error!(error = %err, upstream = %self.upstream, "agent upstream error");
                Ok(StageFlow::Respond(text_response(
                    StatusCode::BAD_GATEWAY,
                    "agent upstream unavailable",
                )))
            }
        }
    }
}
