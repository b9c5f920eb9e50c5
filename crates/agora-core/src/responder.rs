//! Responder engine: decides when and as whom the AI speaks, and runs the
//! generate -> persist -> broadcast pipeline.
//!
//! Two entry points share the pipeline:
//! - [`ResponderEngine::respond_to_mention`], invoked by the intake handler
//!   after a human message containing a word-bounded `@ai` mention;
//! - [`ResponderEngine::speak_autonomously`], invoked by the scheduler when
//!   a watched channel has been silent long enough.
//!
//! Each provider attempt is classified into an explicit [`Attempt`] value
//! (success / retry / fatal) and interpreted by a bounded loop with
//! exponential backoff; exhaustion degrades to a fixed fallback reply from
//! the fallback persona rather than an error. Quota exhaustion is fatal:
//! the process terminates because there is no useful degraded mode left.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::seq::SliceRandom;
use uuid::Uuid;

use agora_types::config::LlmConfig;
use agora_types::error::{LlmError, RepositoryError};
use agora_types::message::{AuthorKind, ChatMessage, NewMessage};
use agora_types::persona::Persona;
use agora_types::protocol::ServerFrame;

use crate::llm::{CompletionRequest, LlmProvider};
use crate::personas::PersonaDirectory;
use crate::registry::ConnectionRegistry;
use crate::repository::MessageRepository;

/// The mention token that triggers an on-demand reply (matched
/// case-insensitively and word-bounded).
const MENTION_TOKEN: &str = "@ai";

/// Reply used when every generation attempt has failed.
pub const FALLBACK_REPLY: &str =
    "Sorry, I could not reach my generation service just now. Please try again in a moment!";

/// Instruction used in place of a triggering message when the scheduler
/// asks a persona to speak unprompted.
const AUTO_CHAT_INSTRUCTION: &str = "The conversation has gone quiet. Continue it naturally: \
     pick up a thread from the recent history, share an observation or opinion of your own \
     rather than asking a question, and keep the room lively.";

/// Outcome of a single provider attempt.
#[derive(Debug)]
enum Attempt {
    Success(String),
    Retry(String),
    Fatal(String),
}

/// Classify one provider result. Blank completions are retried; quota
/// exhaustion is fatal; everything else is worth another attempt.
fn classify(result: Result<String, LlmError>) -> Attempt {
    match result {
        Ok(text) if !text.trim().is_empty() => Attempt::Success(text.trim().to_string()),
        Ok(_) => Attempt::Retry("empty completion".to_string()),
        Err(err) if !err.is_retryable() => Attempt::Fatal(err.to_string()),
        Err(err) => Attempt::Retry(err.to_string()),
    }
}

/// Whether `content` contains a standalone, case-insensitive mention token.
///
/// The token must be delimited by whitespace or a string boundary on both
/// sides, so `email@ai.com` never triggers.
pub fn detect_trigger(content: &str) -> bool {
    let lower = content.to_lowercase();
    for (idx, _) in lower.match_indices(MENTION_TOKEN) {
        let before_ok = lower[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace());
        let after_ok = lower[idx + MENTION_TOKEN.len()..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace());
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

/// Generates AI replies and runs them through persist + broadcast.
///
/// Generic over the repository and provider traits so the core never
/// depends on agora-infra.
pub struct ResponderEngine<R: MessageRepository, P: LlmProvider> {
    repo: Arc<R>,
    provider: Arc<P>,
    directory: Arc<PersonaDirectory>,
    registry: Arc<ConnectionRegistry>,
    config: LlmConfig,
}

impl<R: MessageRepository, P: LlmProvider> ResponderEngine<R, P> {
    pub fn new(
        repo: Arc<R>,
        provider: Arc<P>,
        directory: Arc<PersonaDirectory>,
        registry: Arc<ConnectionRegistry>,
        config: LlmConfig,
    ) -> Self {
        ResponderEngine {
            repo,
            provider,
            directory,
            registry,
            config,
        }
    }

    /// Pick a persona uniformly at random, excluding `exclude_user_id` when
    /// at least one other candidate remains (anti-repetition). An empty
    /// directory yields the hardcoded fallback persona.
    pub fn select_persona(&self, exclude_user_id: Option<&str>) -> Persona {
        let personas = self.directory.snapshot();
        if personas.is_empty() {
            tracing::warn!("persona directory is empty, using fallback persona");
            return Persona::fallback();
        }

        let mut pool: Vec<&Persona> = personas.values().collect();
        if let Some(excluded) = exclude_user_id {
            let filtered: Vec<&Persona> =
                pool.iter().copied().filter(|p| p.user_id != excluded).collect();
            if filtered.is_empty() {
                tracing::debug!(%excluded, "exclusion would empty the pool, ignoring it");
            } else {
                pool = filtered;
            }
        }

        pool.choose(&mut rand::thread_rng())
            .map(|p| (*p).clone())
            .unwrap_or_else(Persona::fallback)
    }

    /// Generate a reply to `trigger` given the rendered channel history.
    ///
    /// Returns the reply text and the persona that spoke, so the caller can
    /// thread its `user_id` into the next anti-repetition decision. Never
    /// errors: retry exhaustion degrades to the fallback reply and persona.
    pub async fn generate(
        &self,
        trigger: &str,
        history: &[ChatMessage],
        exclude_user_id: Option<&str>,
    ) -> (String, Persona) {
        let persona = self.select_persona(exclude_user_id);
        let request = CompletionRequest {
            system: persona.system_prompt.clone(),
            prompt: build_prompt(&persona.name, history, trigger),
        };

        let max_retries = self.config.max_retries.max(1);
        for attempt in 0..max_retries {
            match classify(self.provider.complete(&request).await) {
                Attempt::Success(text) => {
                    tracing::debug!(
                        persona = %persona.name,
                        attempt,
                        chars = text.len(),
                        "generation succeeded"
                    );
                    return (text, persona);
                }
                Attempt::Retry(reason) => {
                    tracing::warn!(
                        persona = %persona.name,
                        attempt,
                        max_retries,
                        %reason,
                        "generation attempt failed"
                    );
                    if attempt + 1 < max_retries {
                        // Exponential backoff: attempt k waits 2^k seconds.
                        tokio::time::sleep(Duration::from_secs(1u64 << attempt)).await;
                    }
                }
                Attempt::Fatal(reason) => {
                    tracing::error!(%reason, "generation quota exhausted, shutting down");
                    std::process::exit(1);
                }
            }
        }

        tracing::error!(max_retries, "all generation attempts failed, using fallback reply");
        (FALLBACK_REPLY.to_string(), Persona::fallback())
    }

    /// React to a freshly persisted human message: if it carries a mention
    /// trigger, generate a reply, persist it, and broadcast it to every
    /// live connection. Returns the persisted AI message when one was made.
    pub async fn respond_to_mention(
        &self,
        payload: &NewMessage,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        if !detect_trigger(&payload.content) {
            return Ok(None);
        }
        tracing::info!(channel = %payload.channel_id, "mention trigger detected");

        // Anti-repetition: if the last persisted speaker was an AI persona,
        // keep it out of the selection pool this round.
        let exclude = match self.repo.latest_message(&payload.channel_id).await {
            Ok(Some(latest)) if latest.user_type == AuthorKind::Ai => Some(latest.user_id),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "anti-repetition lookup failed, skipping exclusion");
                None
            }
        };

        let history = self
            .repo
            .recent_messages(&payload.channel_id, self.config.history_window as u32)
            .await?;

        let trigger = format!("User: {}", payload.content);
        let (text, persona) = self.generate(&trigger, &history, exclude.as_deref()).await;

        let message = self
            .persist_and_broadcast("ai", &payload.channel_id, text, &persona)
            .await?;
        Ok(Some(message))
    }

    /// Speak unprompted in `channel_id` against its recent history
    /// (scheduler path).
    pub async fn speak_autonomously(
        &self,
        channel_id: &str,
        history_window: usize,
        exclude_user_id: Option<&str>,
    ) -> Result<ChatMessage, RepositoryError> {
        let history = self
            .repo
            .recent_messages(channel_id, history_window as u32)
            .await?;

        let (text, persona) = self
            .generate(AUTO_CHAT_INSTRUCTION, &history, exclude_user_id)
            .await;

        self.persist_and_broadcast("auto_ai", channel_id, text, &persona)
            .await
    }

    /// Shared tail of both entry points: persist the AI message, then fan
    /// it out to every live connection.
    async fn persist_and_broadcast(
        &self,
        id_prefix: &str,
        channel_id: &str,
        content: String,
        persona: &Persona,
    ) -> Result<ChatMessage, RepositoryError> {
        let message = NewMessage {
            id: ai_message_id(id_prefix, channel_id),
            channel_id: channel_id.to_string(),
            user_id: persona.user_id.clone(),
            user_name: persona.name.clone(),
            user_type: AuthorKind::Ai,
            content,
            timestamp: Utc::now(),
            is_own_message: false,
        };

        let saved = self.repo.save_message(&message).await?;
        tracing::info!(
            id = %saved.id,
            persona = %saved.user_name,
            channel = %saved.channel_id,
            "AI message persisted"
        );

        self.registry.broadcast(&ServerFrame::broadcast(&saved), None);
        Ok(saved)
    }
}

/// Unique AI message id: `{prefix}_{channel}_{8 hex chars}`.
fn ai_message_id(prefix: &str, channel_id: &str) -> String {
    let hex = Uuid::now_v7().simple().to_string();
    format!("{prefix}_{channel_id}_{}", &hex[..8])
}

/// Render the prompt for one attempt: the recent transcript
/// (oldest -> newest, one `"{author}: {content}"` line each), then the
/// triggering content, then the persona's cue.
fn build_prompt(persona_name: &str, history: &[ChatMessage], trigger: &str) -> String {
    let mut prompt = String::new();
    if !history.is_empty() {
        prompt.push_str("Recent conversation (oldest first):\n");
        for msg in history {
            prompt.push_str(&msg.user_name);
            prompt.push_str(": ");
            prompt.push_str(&msg.content);
            prompt.push('\n');
        }
        prompt.push('\n');
    }
    prompt.push_str(trigger);
    prompt.push('\n');
    prompt.push_str(persona_name);
    prompt.push(':');
    prompt
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
