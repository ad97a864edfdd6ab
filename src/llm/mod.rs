//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities; clone them freely.
//! The mind holds an `Option<LlmProvider>`; `None` is offline (mock) mode.

pub mod providers;

use serde_json::Value;
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("could not decode provider output: {0}")]
    Decode(String),
}

// ── Response types ────────────────────────────────────────────────────────────

/// Token accounting reported by the backend, when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_input_tokens: u64,
}

/// A single text completion.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Option<LlmUsage>,
}

/// A generated image as base64 text, already validated to decode.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub base64: String,
    pub mime_type: String,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new arms below.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    Gemini(providers::gemini::GeminiProvider),
}

impl LlmProvider {
    /// Short backend name for logs and the health endpoint.
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::Gemini(_) => "gemini",
        }
    }

    /// Send `content` as the user turn, with `system` as the system instruction.
    pub async fn complete(
        &self,
        content: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(content, system).await,
            LlmProvider::Gemini(p) => p.complete(content, system).await,
        }
    }

    /// Ask for a JSON document constrained by `schema`. The returned text is
    /// the raw JSON; decoding it is the caller's job.
    pub async fn complete_json(
        &self,
        content: &str,
        schema: &Value,
    ) -> Result<LlmResponse, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete_json(content, schema).await,
            LlmProvider::Gemini(p) => p.complete_json(content, schema).await,
        }
    }

    /// Generate one square PNG for `prompt`.
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.generate_image(prompt).await,
            LlmProvider::Gemini(p) => p.generate_image(prompt).await,
        }
    }
}
