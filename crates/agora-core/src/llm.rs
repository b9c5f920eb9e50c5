//! LlmProvider trait definition.
//!
//! The abstraction the responder engine generates through. Implementations
//! live in agora-infra (e.g. `GeminiProvider`); tests supply mocks.

use agora_types::error::LlmError;

/// A single completion request.
///
/// The responder engine builds one of these per attempt: the persona's
/// system prompt plus a rendered conversation prompt. The provider owns
/// model selection and token limits.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Persona system prompt.
    pub system: String,
    /// Rendered conversation prompt (transcript + trigger).
    pub prompt: String,
}

/// Trait for generative text backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). Providers
/// are async HTTP clients, so a slow generation only suspends its caller.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate a completion. Returns the raw text; the caller enforces
    /// non-blank output and retry policy.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;
}
