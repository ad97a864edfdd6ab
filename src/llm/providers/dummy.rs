//! Dummy LLM provider: echoes input back prefixed with `[echo]`.
//! Used to exercise the full online path without a real API key.

use serde_json::{Value, json};

use crate::llm::{GeneratedImage, LlmResponse, ProviderError};
use crate::mind::dream::STATIC_IMAGE_PNG;

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(
        &self,
        content: &str,
        _system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        Ok(LlmResponse { text: format!("[echo] {content}"), usage: None })
    }

    /// Always answers with the same well-formed dream plan.
    pub async fn complete_json(
        &self,
        _content: &str,
        _schema: &Value,
    ) -> Result<LlmResponse, ProviderError> {
        let plan = json!({
            "dream_prompt": "a lighthouse made of folded letters in a silent sea",
            "analysis": "I keep returning to messages I have not yet answered.",
            "keywords": ["lighthouse", "letters", "sea", "silence", "signal"],
            "influence": {
                "mood_shift": "curious",
                "value_shift": "exploration",
                "subconscious_echo": "Who reads the letters once the light goes out?"
            }
        });
        Ok(LlmResponse { text: plan.to_string(), usage: None })
    }

    pub async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, ProviderError> {
        Ok(GeneratedImage { base64: STATIC_IMAGE_PNG.to_string(), mime_type: "image/png".into() })
    }
}
