//! GeminiProvider, the concrete [`LlmProvider`] for Google's Generative
//! Language API.
//!
//! Sends non-streaming `generateContent` requests with the API key in the
//! `x-goog-api-key` header (never in the URL, which would leak it into
//! request logs). The key is wrapped in [`secrecy::SecretString`] and is
//! never logged or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use agora_core::llm::{CompletionRequest, LlmProvider};
use agora_types::config::LlmConfig;
use agora_types::error::LlmError;

use super::types::{GeminiContent, GeminiRequest, GeminiResponse, GenerationConfig};

/// Google Gemini LLM provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_output_tokens: u32,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    ///
    /// Fails only when the HTTP client cannot be constructed.
    pub fn new(api_key: SecretString, config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// The model this provider generates with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Override the base URL (useful for testing or proxies).
    #[allow(dead_code)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn to_gemini_request(&self, request: &CompletionRequest) -> GeminiRequest {
        GeminiRequest {
            system_instruction: Some(GeminiContent::text(None, &request.system)),
            contents: vec![GeminiContent::text(Some("user"), &request.prompt)],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

/// Map a non-success HTTP response to an [`LlmError`].
///
/// HTTP 429 and a `RESOURCE_EXHAUSTED` status in the error body both mean
/// the daily quota is gone, which callers treat as fatal.
fn map_http_failure(status: u16, body: &str) -> LlmError {
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        return LlmError::QuotaExceeded;
    }
    LlmError::Provider {
        message: format!("HTTP {status}: {body}"),
    }
}

// GeminiProvider intentionally does NOT derive Debug so the API key can
// never be printed, even indirectly.

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = self.to_gemini_request(request);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_http_failure(status.as_u16(), &error_body));
        }

        let gemini_resp: GeminiResponse = response.json().await.map_err(|e| LlmError::Provider {
            message: format!("failed to parse response: {e}"),
        })?;

        gemini_resp.first_text().ok_or(LlmError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new("test-key".to_string().into(), &LlmConfig::default()).unwrap()
    }

    #[test]
    fn test_url_embeds_model() {
        let url = provider().url();
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_carries_system_and_prompt() {
        let request = provider().to_gemini_request(&CompletionRequest {
            system: "You are Luna.".to_string(),
            prompt: "User: hello\nLuna:".to_string(),
        });

        let system = request.system_instruction.unwrap();
        assert_eq!(system.parts[0].text, "You are Luna.");
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].role.as_deref(), Some("user"));
        assert_eq!(request.generation_config.max_output_tokens, 2_048);
    }

    #[test]
    fn test_quota_detection() {
        assert!(matches!(
            map_http_failure(429, "slow down"),
            LlmError::QuotaExceeded
        ));
        assert!(matches!(
            map_http_failure(403, r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#),
            LlmError::QuotaExceeded
        ));
        assert!(matches!(
            map_http_failure(500, "internal"),
            LlmError::Provider { .. }
        ));
    }
}
