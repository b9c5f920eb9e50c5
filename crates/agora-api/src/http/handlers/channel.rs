//! Channel listing handler.

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use agora_core::repository::ChannelRepository;
use agora_types::message::Channel;

use crate::http::error::AppError;
use crate::state::AppState;

/// Channel as exposed over HTTP (camelCase field names).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Channel> for ChannelResponse {
    fn from(channel: Channel) -> Self {
        ChannelResponse {
            id: channel.id,
            name: channel.name,
            description: channel.description,
            created_at: channel.created_at,
        }
    }
}

/// `GET /api/channels`
pub async fn list_channels(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChannelResponse>>, AppError> {
    let channels = state.channel_repo.list_channels().await?;
    Ok(Json(channels.into_iter().map(Into::into).collect()))
}
