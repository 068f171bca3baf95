//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the conversion service.

mod auth;
mod handlers;
mod metrics;
mod server;

pub use auth::API_KEY_HEADER;
pub use server::{HttpServer, ServerSettings};
