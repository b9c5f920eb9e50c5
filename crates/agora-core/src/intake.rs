//! Message intake: the per-frame pipeline behind the WebSocket handler.
//!
//! Every inbound text frame runs the same stages:
//!
//! 1. parse the envelope (malformed JSON is rejected with a null id);
//! 2. match the frame kind (anything but `message:send` is rejected by name);
//! 3. decode and validate the payload;
//! 4. persist, then ack the sender and broadcast to everyone else;
//! 5. hand the payload to the responder for a possible AI reply.
//!
//! Stage 5 runs even when persistence failed: the sender already received a
//! structured error, and an AI reply to the attempted content is still more
//! useful than silence.

use std::sync::Arc;

use agora_types::error::IntakeError;
use agora_types::message::NewMessage;
use agora_types::protocol::{ClientEnvelope, KIND_SEND, ServerFrame};

use crate::llm::LlmProvider;
use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::repository::MessageRepository;
use crate::responder::ResponderEngine;

/// Notice sent to the sender when the AI reply pipeline fails outright.
const AI_ERROR_NOTICE: &str = "AI response generation failed";

/// Runs the intake pipeline for one connection's frames.
pub struct MessageIntake<R: MessageRepository, P: LlmProvider> {
    repo: Arc<R>,
    responder: Arc<ResponderEngine<R, P>>,
    registry: Arc<ConnectionRegistry>,
}

impl<R: MessageRepository, P: LlmProvider> MessageIntake<R, P> {
    pub fn new(
        repo: Arc<R>,
        responder: Arc<ResponderEngine<R, P>>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        MessageIntake {
            repo,
            responder,
            registry,
        }
    }

    /// Process one raw text frame from `sender`.
    ///
    /// Never returns an error: every failure mode ends as a structured
    /// frame back to the sender, and the connection stays open.
    pub async fn handle_frame(&self, raw: &str, sender: ConnectionId) {
        let envelope: ClientEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(%sender, error = %err, "malformed inbound frame");
                self.reject(sender, None, IntakeError::Validation(err.to_string()));
                return;
            }
        };

        if envelope.kind != KIND_SEND {
            let echo = envelope.data.as_ref().and_then(extract_id);
            self.reject(sender, echo, IntakeError::UnsupportedKind(envelope.kind));
            return;
        }

        let Some(data) = envelope.data else {
            self.reject(
                sender,
                None,
                IntakeError::Validation("missing data payload".to_string()),
            );
            return;
        };

        let echo = extract_id(&data);
        let message: NewMessage = match serde_json::from_value(data) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(%sender, error = %err, "undecodable message payload");
                self.reject(sender, echo, IntakeError::Validation(err.to_string()));
                return;
            }
        };

        if let Err(reason) = message.validate() {
            tracing::warn!(%sender, id = %message.id, %reason, "message failed validation");
            self.reject(
                sender,
                Some(message.id.clone()),
                IntakeError::Validation(reason),
            );
            return;
        }

        match self.repo.save_message(&message).await {
            Ok(saved) => {
                tracing::debug!(%sender, id = %saved.id, channel = %saved.channel_id, "message persisted");
                self.registry.unicast(sender, &ServerFrame::saved(saved.id.clone()));
                self.registry
                    .broadcast(&ServerFrame::broadcast(&saved), Some(sender));
            }
            Err(err) => {
                tracing::error!(%sender, id = %message.id, error = %err, "failed to persist message");
                self.reject(sender, Some(message.id.clone()), IntakeError::from(err));
                // Fall through: the AI stage still sees the attempted content.
            }
        }

        if let Err(err) = self.responder.respond_to_mention(&message).await {
            tracing::error!(%sender, error = %err, "AI reply pipeline failed");
            self.registry.unicast(
                sender,
                &ServerFrame::AiError {
                    message: AI_ERROR_NOTICE.to_string(),
                },
            );
        }
    }

    fn reject(&self, sender: ConnectionId, echo_id: Option<String>, err: IntakeError) {
        self.registry
            .unicast(sender, &ServerFrame::error(echo_id, err.wire_code()));
    }
}

/// Pull a string `id` out of an undecoded payload so rejections can echo it.
fn extract_id(data: &serde_json::Value) -> Option<String> {
    data.get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryRepo, ScriptedProvider};
    use agora_types::config::LlmConfig;
    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    struct Harness {
        intake: MessageIntake<MemoryRepo, ScriptedProvider>,
        repo: Arc<MemoryRepo>,
        provider: Arc<ScriptedProvider>,
        registry: Arc<ConnectionRegistry>,
        _personas: tempfile::TempDir,
    }

    fn harness(provider: ScriptedProvider) -> Harness {
        let (tmp, directory) = crate::testutil::persona_dir(&[(
            "001_Luna.md",
            "You are Luna, a curious stargazer.",
        )]);
        let repo = Arc::new(MemoryRepo::new());
        let provider = Arc::new(provider);
        let registry = Arc::new(ConnectionRegistry::new());
        let responder = Arc::new(ResponderEngine::new(
            repo.clone(),
            provider.clone(),
            Arc::new(directory),
            registry.clone(),
            LlmConfig::default(),
        ));
        let intake = MessageIntake::new(repo.clone(), responder, registry.clone());
        Harness {
            intake,
            repo,
            provider,
            registry,
            _personas: tmp,
        }
    }

    fn connect(registry: &ConnectionRegistry) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (registry.register(tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            frames.push(serde_json::from_str(&raw).unwrap());
        }
        frames
    }

    fn send_frame(id: &str, content: &str) -> String {
        json!({
            "type": "message:send",
            "data": {
                "id": id,
                "channel_id": "1",
                "user_id": "user-7",
                "user_name": "kana",
                "user_type": "user",
                "content": content,
                "timestamp": "2026-08-30T12:00:00Z",
                "is_own_message": true,
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_valid_send_acks_sender_and_broadcasts_to_others() {
        let h = harness(ScriptedProvider::always("unused"));
        let (sender, mut sender_rx) = connect(&h.registry);
        let (_other, mut other_rx) = connect(&h.registry);

        h.intake.handle_frame(&send_frame("m-1", "hello room"), sender).await;

        let sender_frames = drain(&mut sender_rx);
        assert_eq!(sender_frames.len(), 1);
        assert_eq!(sender_frames[0]["type"], "message:saved");
        assert_eq!(sender_frames[0]["data"]["id"], "m-1");
        assert_eq!(sender_frames[0]["data"]["success"], true);

        let other_frames = drain(&mut other_rx);
        assert_eq!(other_frames.len(), 1);
        assert_eq!(other_frames[0]["type"], "message:broadcast");
        assert_eq!(other_frames[0]["data"]["id"], "m-1");
        assert_eq!(other_frames[0]["data"]["is_own_message"], false);

        assert_eq!(h.repo.all().len(), 1);
        // No mention, so the provider was never consulted.
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_rejected_with_null_id() {
        let h = harness(ScriptedProvider::always("unused"));
        let (sender, mut rx) = connect(&h.registry);

        h.intake.handle_frame("this is not json", sender).await;

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "message:error");
        assert_eq!(frames[0]["data"]["id"], Value::Null);
        assert_eq!(frames[0]["data"]["error"], "invalid message data");
        assert!(h.repo.all().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_kind_named_in_rejection() {
        let h = harness(ScriptedProvider::always("unused"));
        let (sender, mut rx) = connect(&h.registry);

        let raw = json!({"type": "message:edit", "data": {"id": "m-9"}}).to_string();
        h.intake.handle_frame(&raw, sender).await;

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["data"]["id"], "m-9");
        assert_eq!(
            frames[0]["data"]["error"],
            "unsupported message type: message:edit"
        );
        assert!(h.repo.all().is_empty());
    }

    #[tokio::test]
    async fn test_blank_content_rejected_with_echoed_id() {
        let h = harness(ScriptedProvider::always("unused"));
        let (sender, mut rx) = connect(&h.registry);

        h.intake.handle_frame(&send_frame("m-2", "   "), sender).await;

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "message:error");
        assert_eq!(frames[0]["data"]["id"], "m-2");
        assert_eq!(frames[0]["data"]["error"], "invalid message data");
        assert!(h.repo.all().is_empty());
    }

    #[tokio::test]
    async fn test_missing_data_payload_rejected() {
        let h = harness(ScriptedProvider::always("unused"));
        let (sender, mut rx) = connect(&h.registry);

        let raw = json!({"type": "message:send"}).to_string();
        h.intake.handle_frame(&raw, sender).await;

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["data"]["error"], "invalid message data");
    }

    #[tokio::test]
    async fn test_mention_produces_ai_broadcast_for_everyone() {
        let h = harness(ScriptedProvider::new(vec![Ok("hello from Luna".into())]));
        let (sender, mut sender_rx) = connect(&h.registry);
        let (_other, mut other_rx) = connect(&h.registry);

        h.intake
            .handle_frame(&send_frame("m-3", "@ai what do you think?"), sender)
            .await;

        // Sender: ack, then the AI broadcast (AI replies go to everyone).
        let sender_frames = drain(&mut sender_rx);
        assert_eq!(sender_frames.len(), 2);
        assert_eq!(sender_frames[0]["type"], "message:saved");
        assert_eq!(sender_frames[1]["type"], "message:broadcast");
        assert_eq!(sender_frames[1]["data"]["user_type"], "ai");
        assert_eq!(sender_frames[1]["data"]["content"], "hello from Luna");

        // Other: the human broadcast, then the AI broadcast.
        let other_frames = drain(&mut other_rx);
        assert_eq!(other_frames.len(), 2);
        assert_eq!(other_frames[0]["data"]["id"], "m-3");
        assert_eq!(other_frames[1]["data"]["user_type"], "ai");

        assert_eq!(h.repo.all().len(), 2);
    }

    #[tokio::test]
    async fn test_persist_failure_still_runs_ai_stage() {
        let h = harness(ScriptedProvider::always("hello from Luna"));
        h.repo.fail_saves();
        let (sender, mut rx) = connect(&h.registry);

        h.intake.handle_frame(&send_frame("m-4", "@ai hello"), sender).await;

        // The provider was consulted even though the save failed.
        assert_eq!(h.provider.call_count(), 1);

        // The sender saw the persistence rejection, then the AI-pipeline
        // failure notice (the AI reply itself could not be persisted either).
        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["type"], "message:error");
        assert_eq!(frames[0]["data"]["id"], "m-4");
        assert_eq!(frames[0]["data"]["error"], "failed to save message");
        assert_eq!(frames[1]["type"], "ai:error");
        assert_eq!(frames[1]["data"]["message"], AI_ERROR_NOTICE);
    }
}
