//! HTTP server setup.
//!
//! # Responsibilities
//! - Bind the Axum fallback handler that feeds every request into the
//!   pipeline
//! - Carry the peer address through connect info so the loopback guard
//!   can see it
//! - Serve with graceful shutdown on Ctrl+C
//!
//! # Design Decisions
//! - No routes are registered on the Axum router itself; the pipeline owns
//!   dispatch, including the route table mounts

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;

use crate::pipeline::Pipeline;

/// HTTP server wrapping the assembled pipeline.
pub struct GatewayServer {
    pipeline: Arc<Pipeline>,
}

impl GatewayServer {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            stages = self.pipeline.stage_names().len(),
            "HTTP server starting"
        );

        let app = Router::new()
            .fallback(dispatch)
            .with_state(self.pipeline)
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback handler: every request enters the pipeline here.
async fn dispatch(
    State(pipeline): State<Arc<Pipeline>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    pipeline.handle(request, remote).await
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
