//! Autonomous chat scheduler.
//!
//! Polls the watched channel on a fixed interval and asks the responder to
//! speak when the channel has been silent past the configured threshold.
//! One loop per scheduler; `start` is idempotent and `stop` cancels via a
//! [`CancellationToken`] that only interrupts the inter-tick sleep, so an
//! in-flight tick always completes before shutdown.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use agora_types::config::AutoChatConfig;
use agora_types::message::AuthorKind;

use crate::llm::LlmProvider;
use crate::repository::MessageRepository;
use crate::responder::ResponderEngine;

struct RunningLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives unprompted AI messages into a silent channel.
pub struct AutoChatScheduler<R: MessageRepository, P: LlmProvider> {
    repo: Arc<R>,
    responder: Arc<ResponderEngine<R, P>>,
    config: AutoChatConfig,
    running: Mutex<Option<RunningLoop>>,
}

impl<R, P> AutoChatScheduler<R, P>
where
    R: MessageRepository + 'static,
    P: LlmProvider + 'static,
{
    pub fn new(
        repo: Arc<R>,
        responder: Arc<ResponderEngine<R, P>>,
        config: AutoChatConfig,
    ) -> Self {
        AutoChatScheduler {
            repo,
            responder,
            config,
            running: Mutex::new(None),
        }
    }

    /// Spawn the polling loop. A no-op when auto chat is disabled or the
    /// loop is already running.
    pub async fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            tracing::debug!("auto chat is disabled, scheduler not started");
            return;
        }

        let mut running = self.running.lock().await;
        if running.is_some() {
            tracing::debug!("auto chat scheduler already running");
            return;
        }

        let token = CancellationToken::new();
        let loop_token = token.clone();
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tracing::info!(
                channel = %scheduler.config.target_channel_id,
                silence_threshold_secs = scheduler.config.silence_threshold_secs,
                poll_interval_secs = scheduler.config.poll_interval_secs,
                "auto chat scheduler started"
            );
            loop {
                scheduler.tick().await;
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = tokio::time::sleep(scheduler.config.poll_interval()) => {}
                }
            }
            tracing::info!("auto chat scheduler stopped");
        });

        *running = Some(RunningLoop { token, handle });
    }

    /// Cancel the loop and wait for the in-flight tick to finish.
    /// Idempotent; safe to call when the loop never started.
    pub async fn stop(&self) {
        let stopped = self.running.lock().await.take();
        if let Some(running) = stopped {
            running.token.cancel();
            if let Err(err) = running.handle.await {
                tracing::warn!(error = %err, "auto chat loop ended abnormally");
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// One poll: speak if the watched channel has been silent long enough.
    /// Errors are logged and swallowed so a bad tick never kills the loop.
    async fn tick(&self) {
        let channel_id = &self.config.target_channel_id;

        let latest = match self.repo.latest_message(channel_id).await {
            Ok(latest) => latest,
            Err(err) => {
                tracing::warn!(channel = %channel_id, error = %err, "silence check failed");
                return;
            }
        };
        let Some(latest) = latest else {
            tracing::debug!(channel = %channel_id, "channel has no messages yet");
            return;
        };

        // Silence is measured from the persisted timestamp of the newest
        // message. A non-positive elapsed (clock skew) counts as no silence.
        let elapsed = match (Utc::now() - latest.created_at).to_std() {
            Ok(elapsed) => elapsed,
            Err(_) => return,
        };
        if elapsed < self.config.silence_threshold() {
            return;
        }

        let exclude = if latest.user_type == AuthorKind::Ai {
            if self.config.skip_if_last_speaker_ai {
                tracing::debug!(channel = %channel_id, "last speaker was AI, skipping tick");
                return;
            }
            Some(latest.user_id)
        } else {
            None
        };

        tracing::info!(
            channel = %channel_id,
            silent_for_secs = elapsed.as_secs(),
            "silence threshold crossed, speaking autonomously"
        );
        if let Err(err) = self
            .responder
            .speak_autonomously(channel_id, self.config.history_window, exclude.as_deref())
            .await
        {
            tracing::error!(channel = %channel_id, error = %err, "autonomous message failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
