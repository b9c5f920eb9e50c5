//! Channel message history handler.

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agora_core::repository::{ChannelRepository, MessageRepository};
use agora_types::message::{AuthorKind, ChatMessage};

use crate::http::error::AppError;
use crate::state::AppState;

const DEFAULT_MESSAGE_LIMIT: u32 = 100;

fn default_limit() -> u32 {
    DEFAULT_MESSAGE_LIMIT
}

/// Pagination query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

/// Message as exposed over HTTP (camelCase field names).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_type: AuthorKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_own_message: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for MessageResponse {
    fn from(msg: ChatMessage) -> Self {
        MessageResponse {
            id: msg.id,
            channel_id: msg.channel_id,
            user_id: msg.user_id,
            user_name: msg.user_name,
            user_type: msg.user_type,
            content: msg.content,
            timestamp: msg.timestamp,
            is_own_message: msg.is_own_message,
            created_at: msg.created_at,
        }
    }
}

/// Response body for `GET /api/channels/{id}/messages`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesListResponse {
    pub messages: Vec<MessageResponse>,
    pub total: u64,
    pub has_more: bool,
}

/// `GET /api/channels/{id}/messages?limit&offset`
///
/// A page of history, newest-first pagination with each page returned
/// oldest -> newest. 404 when the channel does not exist.
pub async fn channel_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessagesListResponse>, AppError> {
    if state.channel_repo.get_channel(&channel_id).await?.is_none() {
        return Err(AppError::NotFound("channel not found".to_string()));
    }

    let messages = state
        .message_repo
        .channel_messages(&channel_id, query.offset, query.limit)
        .await?;
    let total = state.message_repo.count_messages(&channel_id).await?;
    let has_more = u64::from(query.offset) + u64::from(query.limit) < total;

    Ok(Json(MessagesListResponse {
        messages: messages.into_iter().map(Into::into).collect(),
        total,
        has_more,
    }))
}
