//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory, called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod gemini;

use tracing::warn;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct the active provider from config and an optional API key.
///
/// Returns `Ok(None)` for offline mode: either explicitly requested
/// (`"mock"` / `"offline"`) or a hosted provider configured without a key.
pub fn build(
    config: &LlmConfig,
    api_key: Option<String>,
) -> Result<Option<LlmProvider>, ProviderError> {
    match config.provider.as_str() {
        "mock" | "offline" => Ok(None),
        "dummy" => Ok(Some(LlmProvider::Dummy(dummy::DummyProvider))),
        "gemini" => {
            let Some(key) = api_key else {
                warn!("no API key set; responses will be simulated (offline mode)");
                return Ok(None);
            };
            let g = &config.gemini;
            let p = gemini::GeminiProvider::new(
                g.api_base_url.clone(),
                g.text_model.clone(),
                g.image_model.clone(),
                g.temperature,
                g.timeout_seconds,
                key,
            )?;
            Ok(Some(LlmProvider::Gemini(p)))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}
