//! Session middleware stage.
//!
//! # Responsibilities
//! - Resolve the signed session cookie to a record in the cache store
//! - Attach the gate to the context and, as an extension, to the request
//!   so route tables can write through it
//! - Persist on the way out only when the record changed; issue the cookie
//!   only for sessions created during this request
//!
//! # Design Decisions
//! - A stale cookie (record expired from the cache) resolves to the
//!   explicit anonymous marker, not an error
//! - A cache failure during resolution is a terminal error: running
//!   without session state would silently log everyone out
//! - A cache failure during persistence is logged but does not replace the
//!   already-produced response

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;

use crate::context::RequestContext;
use crate::pipeline::{PipelineError, Stage, StageFlow};
use crate::session::cookie;
use crate::session::{SessionOutcome, SessionStore};

pub struct SessionStage {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
    secret: String,
    ttl: Duration,
}

impl SessionStage {
    pub fn new(
        store: Arc<dyn SessionStore>,
        cookie_name: String,
        secret: String,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            cookie_name,
            secret,
            ttl,
        }
    }
}

#[async_trait]
impl Stage for SessionStage {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn before(
        &self,
        mut req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> Result<StageFlow, PipelineError> {
        let mut resolved = false;
        if let Some(id) = ctx.cookies.signed.get(&self.cookie_name) {
            if let Some(data) = self.store.load(id).await? {
                ctx.session.resolve_active(id.clone(), data).await;
                resolved = true;
            }
        }
        if !resolved {
            ctx.session.resolve_anonymous().await;
        }

        req.extensions_mut().insert(ctx.session.clone());
        Ok(StageFlow::Next(req))
    }

    async fn after(&self, mut res: Response, ctx: &mut RequestContext) -> Response {
        match ctx.session.outcome().await {
            SessionOutcome::Nothing => {}
            SessionOutcome::Persist { id, data, fresh } => {
                if let Err(err) = self.store.save(&id, &data, self.ttl).await {
                    tracing::error!(error = %err, "failed to persist session");
                    return res;
                }
                if fresh {
                    let signed = cookie::sign(&id, &self.secret);
                    let set_cookie =
                        cookie::build_set_cookie(&self.cookie_name, &signed, self.ttl.as_secs());
                    if let Ok(value) = HeaderValue::from_str(&set_cookie) {
                        res.headers_mut().append(header::SET_COOKIE, value);
                    }
                }
            }
            SessionOutcome::Destroy { id } => {
                if let Err(err) = self.store.destroy(&id).await {
                    tracing::error!(error = %err, "failed to destroy session");
                }
                let clear = cookie::build_clear_cookie(&self.cookie_name);
                if let Ok(value) = HeaderValue::from_str(&clear) {
                    res.headers_mut().append(header::SET_COOKIE, value);
                }
            }
        }
        res
    }
}
