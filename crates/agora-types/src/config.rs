//! Configuration types for Agora.
//!
//! Deserialized from `{data_dir}/config.toml` by `agora-infra`, with
//! environment variable overrides applied on top. Read-only after startup;
//! a reload produces a fresh value rather than mutating in place.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgoraConfig {
    /// Autonomous conversation scheduler settings.
    pub auto_chat: AutoChatConfig,
    /// Generation settings.
    pub llm: LlmConfig,
}

/// Policy for the silence-driven autonomous conversation scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoChatConfig {
    /// Master switch for the scheduler.
    pub enabled: bool,
    /// Seconds of channel silence before a persona speaks unprompted.
    pub silence_threshold_secs: u64,
    /// The single channel the scheduler watches.
    pub target_channel_id: String,
    /// How many recent messages feed the generation prompt.
    pub history_window: usize,
    /// Poll cadence in seconds. Kept much shorter than the silence
    /// threshold so triggering stays accurate and `stop()` responsive.
    pub poll_interval_secs: u64,
    /// When the last speaker was an AI persona: `true` skips the tick,
    /// `false` proceeds but excludes that persona from selection.
    pub skip_if_last_speaker_ai: bool,
}

impl Default for AutoChatConfig {
    fn default() -> Self {
        AutoChatConfig {
            enabled: true,
            silence_threshold_secs: 60,
            target_channel_id: "1".to_string(),
            history_window: 10,
            poll_interval_secs: 15,
            skip_if_last_speaker_ai: false,
        }
    }
}

impl AutoChatConfig {
    /// Silence threshold as a [`Duration`].
    pub fn silence_threshold(&self) -> Duration {
        Duration::from_secs(self.silence_threshold_secs)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Generation settings for the responder engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Maximum output tokens per completion.
    pub max_output_tokens: u32,
    /// Bounded retry attempts per generation.
    pub max_retries: u32,
    /// How many recent messages feed an on-demand (mention) prompt.
    pub history_window: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            model: "gemini-1.5-flash".to_string(),
            max_output_tokens: 2_048,
            max_retries: 3,
            history_window: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AgoraConfig::default();
        assert!(cfg.auto_chat.enabled);
        assert_eq!(cfg.auto_chat.silence_threshold(), Duration::from_secs(60));
        assert_eq!(cfg.auto_chat.poll_interval(), Duration::from_secs(15));
        assert!(!cfg.auto_chat.skip_if_last_speaker_ai);
        assert_eq!(cfg.llm.max_retries, 3);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AgoraConfig = toml::from_str(
            r#"
            [auto_chat]
            silence_threshold_secs = 300
            target_channel_id = "lounge"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.auto_chat.silence_threshold_secs, 300);
        assert_eq!(cfg.auto_chat.target_channel_id, "lounge");
        // Unspecified fields keep their defaults.
        assert_eq!(cfg.auto_chat.poll_interval_secs, 15);
        assert_eq!(cfg.llm.model, "gemini-1.5-flash");
    }
}
