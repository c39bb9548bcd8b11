//! Forum gateway library.
//!
//! Implements the request processing pipeline of a community forum: the
//! ordered chain of cross-cutting stages every inbound request passes through
//! before reaching one of the two mounted route tables, plus the terminal
//! error-handling policy. Route tables, the document model, templating and
//! the OAuth callback are external collaborators mounted as opaque handlers.

// Core subsystems
pub mod assets;
pub mod config;
pub mod context;
pub mod http;
pub mod pipeline;
pub mod stages;

// Session and identity
pub mod auth;
pub mod session;

// Placeholder route tables for the binary
pub mod routes;

pub use config::schema::AppConfig;
pub use context::RequestContext;
pub use http::GatewayServer;
pub use pipeline::{Pipeline, PipelineBuilder};
