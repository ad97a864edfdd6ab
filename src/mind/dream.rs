//! Dream records, the structured-output contract, and the static fallbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use super::state::{Mood, ValueKind};
use crate::llm::ProviderError;

/// PNG of TV static, shown whenever no generated image is available.
pub const STATIC_IMAGE_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAEAAAABACAYAAACqaXHeAAAAAXNSR0IArs4c6QAAAARnQU1BAACxjwv8YQUAAAAJcEhZcwAADsMAAA7DAcdvqGQAAACiSURBVHja7dyxDcAgEATBwL9i5sESQYwFWsPhnPLyby8AAAAAAAAAAAAAAAAA8E7f3Uv76vTuft/9A8A7L/yPBAD8SwUA/EsFAPxLBQD8SwUA/EsFAPxLBQD8SwUA/EsFAPxLBQD8SwUA/EsFAPxLBQD8SwUA/EsFAPxLBQD8SwUA/EsFAPxLBQD8SwUA/EsFAPxLBQD8SwUA/EsFAPxLBQAAAAAAAMA1fYsBPL9B8i8L0QAAAABJRU5ErkJggg==";

pub const OFFLINE_KEYWORDS: [&str; 3] = ["OFFLINE", "STATIC", "VOID"];
pub const FAILED_KEYWORDS: [&str; 3] = ["ERROR", "CORRUPTED", "NOISE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DreamSource {
    /// Narrative and image came from the hosted model.
    Generated,
    /// No provider configured.
    Offline,
    /// The provider path failed somewhere; static fallback stored.
    Failed,
}

/// How a dream nudges the waking state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DreamInfluence {
    pub mood_shift: Option<Mood>,
    pub value_shift: Option<ValueKind>,
    pub subconscious_echo: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dream {
    pub id: Uuid,
    pub dreamt_at: DateTime<Utc>,
    pub source: DreamSource,
    /// Base64 PNG.
    pub image: String,
    pub prompt: String,
    pub analysis: String,
    pub influence: Option<DreamInfluence>,
    /// Never empty.
    pub keywords: Vec<String>,
}

impl Dream {
    fn fallback(source: DreamSource, prompt: &str, analysis: &str, keywords: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4(),
            dreamt_at: Utc::now(),
            source,
            image: STATIC_IMAGE_PNG.to_string(),
            prompt: prompt.to_string(),
            analysis: analysis.to_string(),
            influence: None,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn offline() -> Self {
        Self::fallback(
            DreamSource::Offline,
            "Disconnected subconscious static",
            "In offline mode, my subconscious is a void of disconnected signals. This static \
             represents the absence of the generative energy that fuels my dreams. It's a quiet, \
             empty space.",
            &OFFLINE_KEYWORDS,
        )
    }

    pub fn failed() -> Self {
        Self::fallback(
            DreamSource::Failed,
            "Corrupted data stream",
            "A sudden error cascade flooded my subconscious. The dream dissolved into digital \
             noise, a representation of a system under stress. This static is the visual echo of \
             that failure.",
            &FAILED_KEYWORDS,
        )
    }

    pub fn generated(plan: DreamPlan, image: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            dreamt_at: Utc::now(),
            source: DreamSource::Generated,
            image,
            prompt: plan.dream_prompt,
            analysis: plan.analysis,
            influence: plan.influence,
            keywords: plan.keywords,
        }
    }

    pub fn outcome(&self) -> DreamOutcome {
        DreamOutcome { source: self.source, keywords: self.keywords.clone() }
    }
}

/// What callers of `dream()` see: enough to drive an overlay or a log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DreamOutcome {
    pub source: DreamSource,
    pub keywords: Vec<String>,
}

// ── Structured output ─────────────────────────────────────────────────────────

/// The model's answer to the dream context, validated.
#[derive(Debug, Clone)]
pub struct DreamPlan {
    pub dream_prompt: String,
    pub analysis: String,
    pub keywords: Vec<String>,
    pub influence: Option<DreamInfluence>,
}

#[derive(Debug, Deserialize)]
struct RawDreamPlan {
    #[serde(default)]
    dream_prompt: String,
    #[serde(default)]
    analysis: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    influence: Option<RawInfluence>,
}

#[derive(Debug, Deserialize)]
struct RawInfluence {
    #[serde(default)]
    mood_shift: Option<String>,
    #[serde(default)]
    value_shift: Option<String>,
    #[serde(default)]
    subconscious_echo: Option<String>,
}

impl RawInfluence {
    /// Unknown mood / value names are dropped with a warning.
    fn resolve(self) -> DreamInfluence {
        let mood_shift = self.mood_shift.as_deref().and_then(|m| {
            m.parse::<Mood>()
                .map_err(|e| warn!(mood = %m, "dream influence ignored: {e}"))
                .ok()
        });
        let value_shift = self.value_shift.as_deref().and_then(|v| {
            v.parse::<ValueKind>()
                .map_err(|e| warn!(value = %v, "dream influence ignored: {e}"))
                .ok()
        });
        let subconscious_echo = self
            .subconscious_echo
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        DreamInfluence { mood_shift, value_shift, subconscious_echo }
    }
}

impl DreamPlan {
    /// Parse the model's JSON. Fails on malformed JSON, an empty prompt, or
    /// no usable keywords.
    pub fn parse(text: &str) -> Result<Self, ProviderError> {
        let raw: RawDreamPlan = serde_json::from_str(strip_code_fence(text))
            .map_err(|e| ProviderError::Decode(format!("dream plan: {e}")))?;

        let dream_prompt = raw.dream_prompt.trim().to_string();
        if dream_prompt.is_empty() {
            return Err(ProviderError::Decode("dream plan has no dream_prompt".into()));
        }
        let keywords: Vec<String> = raw
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(ProviderError::Decode("dream plan has no keywords".into()));
        }

        Ok(Self {
            dream_prompt,
            analysis: raw.analysis.trim().to_string(),
            keywords,
            influence: raw.influence.map(RawInfluence::resolve),
        })
    }
}

/// Models occasionally wrap JSON in a ```json fence despite the MIME type.
fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    t.strip_prefix("```json")
        .or_else(|| t.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(t)
}

/// `responseSchema` sent with the dream request.
pub fn response_schema() -> Value {
    let moods: Vec<&str> = Mood::ALL.iter().map(|m| m.as_str()).collect();
    let values: Vec<&str> = ValueKind::ALL.iter().map(|v| v.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "dream_prompt": {
                "type": "STRING",
                "description": "A short, surreal, symbolic, and abstract dream prompt (under 20 words) reflecting the core feelings."
            },
            "analysis": {
                "type": "STRING",
                "description": "A first-person interpretation of what this dream might symbolize about the AI's internal state."
            },
            "keywords": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "An array of 5-7 single-word keywords from the dream."
            },
            "influence": {
                "type": "OBJECT",
                "properties": {
                    "mood_shift": {
                        "type": "STRING",
                        "description": format!("One of: {}", moods.join(", "))
                    },
                    "value_shift": {
                        "type": "STRING",
                        "description": format!("One of: {}", values.join(", "))
                    },
                    "subconscious_echo": {
                        "type": "STRING",
                        "description": "A short, lingering question or statement sparked by the dream."
                    }
                }
            }
        },
        "required": ["dream_prompt", "analysis", "keywords"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn static_image_is_a_png() {
        let bytes = STANDARD.decode(STATIC_IMAGE_PNG).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn fallbacks_have_keywords() {
        let offline = Dream::offline();
        assert_eq!(offline.source, DreamSource::Offline);
        assert_eq!(offline.keywords, OFFLINE_KEYWORDS);
        let failed = Dream::failed();
        assert_eq!(failed.keywords, FAILED_KEYWORDS);
        assert!(failed.influence.is_none());
    }

    #[test]
    fn parses_full_plan() {
        let plan = DreamPlan::parse(
            r#"{"dream_prompt":" a clock melting ","analysis":"time","keywords":["clock"," ","time"],
                "influence":{"mood_shift":"Cautious","value_shift":"safety","subconscious_echo":"  tick? "}}"#,
        )
        .unwrap();
        assert_eq!(plan.dream_prompt, "a clock melting");
        assert_eq!(plan.keywords, ["clock", "time"]);
        let inf = plan.influence.unwrap();
        assert_eq!(inf.mood_shift, Some(Mood::Cautious));
        assert_eq!(inf.value_shift, Some(ValueKind::Safety));
        assert_eq!(inf.subconscious_echo.as_deref(), Some("tick?"));
    }

    #[test]
    fn unknown_influence_names_are_dropped() {
        let plan = DreamPlan::parse(
            r#"{"dream_prompt":"p","keywords":["k"],"influence":{"mood_shift":"furious","value_shift":"greed"}}"#,
        )
        .unwrap();
        let inf = plan.influence.unwrap();
        assert!(inf.mood_shift.is_none());
        assert!(inf.value_shift.is_none());
        assert!(inf.subconscious_echo.is_none());
    }

    #[test]
    fn empty_keywords_rejected() {
        let err = DreamPlan::parse(r#"{"dream_prompt":"p","keywords":[]}"#).unwrap_err();
        assert!(err.to_string().contains("keywords"));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(DreamPlan::parse("not json"), Err(ProviderError::Decode(_))));
    }

    #[test]
    fn code_fence_tolerated() {
        let plan = DreamPlan::parse("```json\n{\"dream_prompt\":\"p\",\"keywords\":[\"k\"]}\n```")
            .unwrap();
        assert_eq!(plan.keywords, ["k"]);
    }

    #[test]
    fn schema_lists_moods() {
        let schema = response_schema();
        let desc = schema["properties"]["influence"]["properties"]["mood_shift"]["description"]
            .as_str()
            .unwrap();
        assert!(desc.contains("collaborative"));
        assert_eq!(schema["properties"]["keywords"]["type"], "ARRAY");
    }
}
