//! Shared test doubles for the core crate's unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;

use agora_types::error::{LlmError, RepositoryError};
use agora_types::message::{AuthorKind, Channel, ChatMessage, NewMessage};

use crate::llm::{CompletionRequest, LlmProvider};
use crate::repository::{ChannelRepository, MessageRepository};

/// In-memory `MessageRepository` that preserves insertion order.
#[derive(Default)]
pub(crate) struct MemoryRepo {
    messages: Mutex<Vec<ChatMessage>>,
    fail_saves: AtomicBool,
}

impl MemoryRepo {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save_message` fail.
    pub(crate) fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    /// Insert a fully-formed row, bypassing `save_message` (for seeding
    /// history with explicit persisted timestamps).
    pub(crate) fn push_raw(&self, msg: ChatMessage) {
        self.messages.lock().unwrap().push(msg);
    }

    pub(crate) fn all(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }
}

impl MessageRepository for MemoryRepo {
    async fn save_message(&self, msg: &NewMessage) -> Result<ChatMessage, RepositoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("simulated save failure".to_string()));
        }
        let mut messages = self.messages.lock().unwrap();
        if messages.iter().any(|m| m.id == msg.id) {
            return Err(RepositoryError::Conflict(format!(
                "message '{}' already exists",
                msg.id
            )));
        }
        let stored = ChatMessage {
            id: msg.id.clone(),
            channel_id: msg.channel_id.clone(),
            user_id: msg.user_id.clone(),
            user_name: msg.user_name.clone(),
            user_type: msg.user_type,
            content: msg.content.clone(),
            timestamp: msg.timestamp,
            is_own_message: msg.is_own_message,
            created_at: Utc::now(),
        };
        messages.push(stored.clone());
        Ok(stored)
    }

    async fn recent_messages(
        &self,
        channel_id: &str,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let messages = self.messages.lock().unwrap();
        let in_channel: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect();
        let skip = in_channel.len().saturating_sub(limit as usize);
        Ok(in_channel.into_iter().skip(skip).collect())
    }

    async fn latest_message(
        &self,
        channel_id: &str,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .next_back()
            .cloned())
    }

    async fn channel_messages(
        &self,
        channel_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let messages = self.messages.lock().unwrap();
        let mut in_channel: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect();
        in_channel.reverse();
        let mut page: Vec<ChatMessage> = in_channel
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        page.reverse();
        Ok(page)
    }

    async fn count_messages(&self, channel_id: &str) -> Result<u64, RepositoryError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages.iter().filter(|m| m.channel_id == channel_id).count() as u64)
    }
}

impl ChannelRepository for MemoryRepo {
    async fn list_channels(&self) -> Result<Vec<Channel>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn get_channel(&self, _channel_id: &str) -> Result<Option<Channel>, RepositoryError> {
        Ok(None)
    }

    async fn seed_channels(&self, _channels: &[Channel]) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// `LlmProvider` that replays a scripted sequence of outcomes, then keeps
/// answering with a canned reply.
pub(crate) struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fail_all: bool,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new(script: Vec<Result<String, LlmError>>) -> Self {
        ScriptedProvider {
            script: Mutex::new(script.into()),
            fail_all: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider that always succeeds with `reply`.
    pub(crate) fn always(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    /// A provider that fails every attempt with a transient error.
    pub(crate) fn always_failing() -> Self {
        let mut provider = Self::new(Vec::new());
        provider.fail_all = true;
        provider
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(LlmError::Provider {
                message: "simulated transient failure".to_string(),
            });
        }
        match self.script.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok("scripted reply".to_string()),
        }
    }
}

/// A human-authored `NewMessage` for a channel.
pub(crate) fn human_message(channel_id: &str, content: &str) -> NewMessage {
    NewMessage {
        id: format!("m-{}", uuid::Uuid::now_v7().simple()),
        channel_id: channel_id.to_string(),
        user_id: "user-7".to_string(),
        user_name: "kana".to_string(),
        user_type: AuthorKind::Human,
        content: content.to_string(),
        timestamp: Utc::now(),
        is_own_message: true,
    }
}

/// A persisted row with an explicit `created_at`, for seeding history.
pub(crate) fn persisted_message(
    channel_id: &str,
    user_id: &str,
    user_type: AuthorKind,
    content: &str,
    created_at: chrono::DateTime<Utc>,
) -> ChatMessage {
    ChatMessage {
        id: format!("m-{}", uuid::Uuid::now_v7().simple()),
        channel_id: channel_id.to_string(),
        user_id: user_id.to_string(),
        user_name: user_id.to_string(),
        user_type,
        content: content.to_string(),
        timestamp: created_at,
        is_own_message: false,
        created_at,
    }
}

/// A temp persona directory with the given `(file_name, body)` profiles.
pub(crate) fn persona_dir(
    profiles: &[(&str, &str)],
) -> (tempfile::TempDir, crate::personas::PersonaDirectory) {
    let tmp = tempfile::tempdir().unwrap();
    for (file_name, body) in profiles {
        std::fs::write(tmp.path().join(file_name), body).unwrap();
    }
    let dir = crate::personas::PersonaDirectory::load(tmp.path());
    (tmp, dir)
}
