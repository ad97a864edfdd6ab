//! Google Generative Language provider (`generateContent` + Imagen `predict`).
//!
//! All Gemini wire types are private to this module; callers only see
//! [`LlmResponse`] and [`GeneratedImage`]. The provider is stateless; history
//! is folded into the system instruction by the caller.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::llm::{GeneratedImage, LlmResponse, LlmUsage, ProviderError};

const API_KEY_HEADER: &str = "x-goog-api-key";
const IMAGE_MIME: &str = "image/png";

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for the Gemini REST API. Constructed once at startup, then cheaply
/// cloned because `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_base_url: String,
    text_model: String,
    image_model: String,
    temperature: f32,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(
        api_base_url: String,
        text_model: String,
        image_model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: String,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            text_model,
            image_model,
            temperature,
            api_key,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.api_base_url)
    }

    /// One round-trip: `content` as the user turn, `system` as the system instruction.
    pub async fn complete(
        &self,
        content: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        let payload = GenerateContentRequest {
            system_instruction: system.map(Content::text),
            contents: vec![Content::user(content)],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: None,
                response_schema: None,
            },
        };
        self.generate_content(payload).await
    }

    /// Structured output: the model is constrained to `schema` and answers
    /// with `application/json`.
    pub async fn complete_json(
        &self,
        content: &str,
        schema: &Value,
    ) -> Result<LlmResponse, ProviderError> {
        let payload = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content::user(content)],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: Some("application/json".into()),
                response_schema: Some(schema.clone()),
            },
        };
        self.generate_content(payload).await
    }

    async fn generate_content(
        &self,
        payload: GenerateContentRequest,
    ) -> Result<LlmResponse, ProviderError> {
        let url = self.endpoint(&self.text_model, "generateContent");

        debug!(
            model = %self.text_model,
            json_mode = payload.generation_config.response_schema.is_some(),
            "sending generateContent request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full generateContent payload");
        }

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(%url, error = %e, is_timeout = e.is_timeout(), "Gemini request failed (transport)");
                ProviderError::Request(e.to_string())
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<GenerateContentResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize generateContent response");
            ProviderError::Decode(format!("failed to parse response body: {e}"))
        })?;

        debug!(candidates = parsed.candidates.len(), "received generateContent response");
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&parsed)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(response = %json, "full generateContent response");
        }

        let usage = parsed.usage_metadata.as_ref().map(|u| LlmUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
            cached_input_tokens: u.cached_content_token_count,
        });

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Request("empty or missing content in response".into()))?;

        Ok(LlmResponse { text, usage })
    }

    /// Generate a single 1:1 PNG. The returned base64 is checked to decode.
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let url = self.endpoint(&self.image_model, "predict");
        let payload = PredictRequest {
            instances: vec![ImageInstance { prompt: prompt.to_string() }],
            parameters: ImageParameters {
                sample_count: 1,
                aspect_ratio: "1:1".into(),
                output_options: OutputOptions { mime_type: IMAGE_MIME.into() },
            },
        };

        debug!(model = %self.image_model, prompt_len = prompt.len(), "sending image request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(%url, error = %e, "image request failed (transport)");
                ProviderError::Request(e.to_string())
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<PredictResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize predict response");
            ProviderError::Decode(format!("failed to parse response body: {e}"))
        })?;

        let prediction = parsed
            .predictions
            .into_iter()
            .find(|p| p.bytes_base64_encoded.as_deref().is_some_and(|b| !b.is_empty()))
            .ok_or_else(|| ProviderError::Request("no image in response".into()))?;

        let base64 = prediction.bytes_base64_encoded.unwrap_or_default();
        let decoded = STANDARD
            .decode(base64.as_bytes())
            .map_err(|e| ProviderError::Decode(format!("image is not valid base64: {e}")))?;
        debug!(bytes = decoded.len(), "received image");

        Ok(GeneratedImage {
            base64,
            mime_type: prediction.mime_type.unwrap_or_else(|| IMAGE_MIME.to_string()),
        })
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(text: &str) -> Self {
        Self { role: None, parts: vec![Part { text: Some(text.to_string()) }] }
    }

    fn user(text: &str) -> Self {
        Self { role: Some("user".into()), ..Self::text(text) }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    cached_content_token_count: u64,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<ImageInstance>,
    parameters: ImageParameters,
}

#[derive(Debug, Serialize)]
struct ImageInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_options: OutputOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions {
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

// Google API error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let code = env.error.status.map(|s| format!(" [{s}]")).unwrap_or_default();
        format!("HTTP {status}{code}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    error!(%status, %message, "Gemini request returned HTTP error");
    Err(ProviderError::Request(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(base: &str) -> GeminiProvider {
        GeminiProvider::new(
            base.into(),
            "gemini-2.5-flash".into(),
            "imagen-4.0-generate-001".into(),
            0.5,
            1,
            "key".into(),
        )
        .unwrap()
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let p = provider("https://example.test/v1beta/");
        assert_eq!(
            p.endpoint("gemini-2.5-flash", "generateContent"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn request_serializes_camel_case() {
        let req = GenerateContentRequest {
            system_instruction: Some(Content::text("sys")),
            contents: vec![Content::user("hi")],
            generation_config: GenerationConfig {
                temperature: 0.5,
                response_mime_type: Some("application/json".into()),
                response_schema: Some(json!({"type": "OBJECT"})),
            },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(v["systemInstruction"].get("role").is_none());
        assert_eq!(v["contents"][0]["role"], "user");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn plain_request_omits_json_mode() {
        let req = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content::user("hi")],
            generation_config: GenerationConfig {
                temperature: 0.5,
                response_mime_type: None,
                response_schema: None,
            },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("systemInstruction").is_none());
        assert!(v["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn predict_request_shape() {
        let req = PredictRequest {
            instances: vec![ImageInstance { prompt: "p".into() }],
            parameters: ImageParameters {
                sample_count: 1,
                aspect_ratio: "1:1".into(),
                output_options: OutputOptions { mime_type: IMAGE_MIME.into() },
            },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["parameters"]["sampleCount"], 1);
        assert_eq!(v["parameters"]["aspectRatio"], "1:1");
        assert_eq!(v["parameters"]["outputOptions"]["mimeType"], "image/png");
    }

    #[tokio::test]
    async fn unreachable_host_is_request_error() {
        let p = provider("http://127.0.0.1:9/v1beta");
        let err = p.complete("hi", None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
    }
}
