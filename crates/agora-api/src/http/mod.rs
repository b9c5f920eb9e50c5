//! HTTP and WebSocket layer for Agora.
//!
//! Axum-based surface: read-only history endpoints under `/api/` and the
//! realtime WebSocket at `/ws`, with CORS and request tracing.

pub mod error;
pub mod handlers;
pub mod router;
