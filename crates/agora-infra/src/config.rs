//! Configuration loader for Agora.
//!
//! Reads `config.toml` from the data directory (`~/.agora/` in production)
//! and deserializes it into [`AgoraConfig`]. Falls back to defaults when
//! the file is missing or malformed, then applies `AGORA_*` environment
//! variable overrides on top.

use std::path::Path;

use agora_types::config::AgoraConfig;

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`AgoraConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Environment overrides are applied in both cases.
pub async fn load_config(data_dir: &Path) -> AgoraConfig {
    let config_path = data_dir.join("config.toml");

    let mut config = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => match toml::from_str::<AgoraConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    "Failed to parse {}: {err}, using defaults",
                    config_path.display()
                );
                AgoraConfig::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No config.toml found at {}, using defaults",
                config_path.display()
            );
            AgoraConfig::default()
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            AgoraConfig::default()
        }
    };

    apply_env_overrides(&mut config);
    config
}

/// Apply `AGORA_*` environment variable overrides. Unparsable values are
/// logged and ignored.
fn apply_env_overrides(config: &mut AgoraConfig) {
    if let Ok(value) = std::env::var("AGORA_AUTO_CHAT_ENABLED") {
        match value.parse() {
            Ok(enabled) => config.auto_chat.enabled = enabled,
            Err(_) => tracing::warn!("ignoring invalid AGORA_AUTO_CHAT_ENABLED: {value}"),
        }
    }
    if let Ok(value) = std::env::var("AGORA_SILENCE_THRESHOLD_SECS") {
        match value.parse() {
            Ok(secs) => config.auto_chat.silence_threshold_secs = secs,
            Err(_) => tracing::warn!("ignoring invalid AGORA_SILENCE_THRESHOLD_SECS: {value}"),
        }
    }
    if let Ok(value) = std::env::var("AGORA_TARGET_CHANNEL_ID") {
        config.auto_chat.target_channel_id = value;
    }
    if let Ok(value) = std::env::var("AGORA_LLM_MODEL") {
        config.llm.model = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert!(config.auto_chat.enabled);
        assert_eq!(config.llm.model, "gemini-1.5-flash");
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[auto_chat]
silence_threshold_secs = 300
target_channel_id = "lounge"

[llm]
max_retries = 5
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.auto_chat.silence_threshold_secs, 300);
        assert_eq!(config.auto_chat.target_channel_id, "lounge");
        assert_eq!(config.llm.max_retries, 5);
        // Unspecified fields keep their defaults.
        assert_eq!(config.auto_chat.poll_interval_secs, 15);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.auto_chat.silence_threshold_secs, 60);
    }
}
