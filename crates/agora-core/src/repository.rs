//! Repository trait definitions.
//!
//! Defines the storage interface for chat messages and channels. The
//! infrastructure layer (agora-infra) implements these traits with SQLite
//! persistence.
//!
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

use agora_types::error::RepositoryError;
use agora_types::message::{Channel, ChatMessage, NewMessage};

/// Repository trait for chat message persistence.
pub trait MessageRepository: Send + Sync {
    /// Persist a message transactionally and return the stored row.
    ///
    /// The returned [`ChatMessage`] carries the authoritative persisted
    /// timestamp (`created_at`); acknowledgments and broadcasts must use
    /// these values, not the client-supplied ones. A duplicate id yields
    /// `RepositoryError::Conflict`.
    fn save_message(
        &self,
        msg: &NewMessage,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// The newest `limit` messages in a channel, returned oldest -> newest.
    fn recent_messages(
        &self,
        channel_id: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// The single most recent message in a channel, if any.
    fn latest_message(
        &self,
        channel_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    /// A history page for the HTTP listing endpoint: newest-first
    /// pagination, each page returned oldest -> newest.
    fn channel_messages(
        &self,
        channel_id: &str,
        offset: u32,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Total number of messages in a channel.
    fn count_messages(
        &self,
        channel_id: &str,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}

/// Repository trait for chat channels.
pub trait ChannelRepository: Send + Sync {
    /// List all channels, ordered by id.
    fn list_channels(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Channel>, RepositoryError>> + Send;

    /// Look up a channel by id.
    fn get_channel(
        &self,
        channel_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Channel>, RepositoryError>> + Send;

    /// Insert the given channels if absent (startup seeding). Existing
    /// rows are left untouched.
    fn seed_channels(
        &self,
        channels: &[Channel],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
