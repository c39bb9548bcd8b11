//! HTTP entry subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, connect info)
//!     → pipeline (ordered stage chain)
//!     → mounted route tables (opaque handlers)
//!     → pipeline response hooks (reverse order)
//!     → Send to client
//! ```

pub mod server;

pub use server::GatewayServer;
