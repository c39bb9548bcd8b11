//! Placeholder route tables for the binary.
//!
//! The real forum mounts its page and API controllers here. These handlers
//! exist so the gateway runs standalone and so the request extensions the
//! pipeline publishes (session cell, identity, render locals, OAuth client)
//! have a consumer to demonstrate the contract against.

use std::sync::Arc;

use axum::{
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{GitHubOauth, Identity};
use crate::context::RenderLocals;
use crate::pipeline::RouteError;
use crate::session::SessionCell;

/// Web route table mounted at the root.
pub fn web_router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/signin", get(signin))
        .route("/signout", get(signout))
}

/// API route table mounted at the API prefix. The prefix arrives already
/// stripped.
pub fn api_router() -> Router {
    Router::new().route("/topics", get(api_topics))
}

async fn home(
    Extension(locals): Extension<RenderLocals>,
    identity: Option<Extension<Identity>>,
) -> Html<String> {
    let site_name = locals
        .0
        .get("site_name")
        .and_then(|v| v.as_str())
        .unwrap_or("forum");
    let greeting = match identity {
        Some(Extension(user)) => format!("signed in as {}", user.login),
        None => "anonymous".to_string(),
    };
    Html(format!(
        "<!DOCTYPE html><html><head><title>{site_name}</title></head>\
         <body><h1>{site_name}</h1><p>{greeting}</p></body></html>"
    ))
}

#[derive(Deserialize)]
struct SigninQuery {
    #[serde(default)]
    code: Option<String>,
}

/// Start the OAuth handshake, or finish it when the provider redirects
/// back with a code.
async fn signin(
    Extension(oauth): Extension<Arc<GitHubOauth>>,
    Extension(session): Extension<SessionCell>,
    Query(query): Query<SigninQuery>,
) -> Response {
    let Some(code) = query.code else {
        let state = Uuid::new_v4().simple().to_string();
        return Redirect::to(oauth.authorize_url(&state).as_str()).into_response();
    };

    match oauth.exchange_code(&code).await {
        Ok(identity) => {
            session
                .update(|data| data.user = Some(identity))
                .await;
            Redirect::to("/").into_response()
        }
        Err(err) => {
            let mut res = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            res.extensions_mut()
                .insert(RouteError(format!("oauth exchange failed: {err}")));
            res
        }
    }
}

async fn signout(Extension(session): Extension<SessionCell>) -> Redirect {
    session.destroy().await;
    Redirect::to("/")
}

async fn api_topics() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "topics": [] }))
}
