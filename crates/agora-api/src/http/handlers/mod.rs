//! HTTP request handlers.

pub mod channel;
pub mod message;
pub mod ws;

use axum::Json;
use serde_json::{Value, json};

/// Service banner at `/`.
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Agora community chat API" }))
}
