//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TcpListener
//!     → server.rs (router, tower layers, graceful shutdown)
//!     → middleware.rs (HTTPS redirect, signatures, content type)
//!     → handlers.rs (validate, record/query events, access checks)
//!     → response.rs (JSON envelopes)
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
