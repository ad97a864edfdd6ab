//! Prompt assembly for the persona and the dream generator.
//!
//! Templates are plain text under `config/prompts/` with `{{key}}`
//! placeholders. A template missing from disk falls back to the copy
//! compiled into the binary, so a bare install still works.
//!
//! ```text
//! persona.md   system instruction for every chat / unprompted turn
//! dream.md     context handed to the model when a dream is requested
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use super::history::History;
use super::state::{AiState, ChoiceReasoning, PersonalityTraits};

const SEPARATOR: &str = "\n\n";

pub const PERSONA_TEMPLATE: &str = "persona.md";
pub const DREAM_TEMPLATE: &str = "dream.md";

const PERSONA_FALLBACK: &str = include_str!("../../config/prompts/persona.md");
const DREAM_FALLBACK: &str = include_str!("../../config/prompts/dream.md");

pub const NO_HISTORY: &str = "No recent conversation history.";
pub const NO_RECENT_DREAM_CONTEXT: &str = "Silence.";
pub const NO_DISTANT_MEMORY: &str = "No distant memories yet.";

/// Exchanges included as short-term memory in the system prompt.
const SHORT_TERM_TURNS: usize = 2;
/// Exchanges included in the dream context.
pub const DREAM_RECENT_TURNS: usize = 3;
/// Entries too fresh to count as a "distant" memory.
pub const DISTANT_MEMORY_GAP: usize = 5;

/// Fluent builder that assembles a prompt from template files.
pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self { prompts_dir: prompts_dir.into(), parts: Vec::new(), vars: HashMap::new() }
    }

    /// Append a layer loaded from `filename`, or `fallback` when the file is
    /// missing or empty.
    pub fn layer_or(mut self, filename: &str, fallback: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => {
                tracing::debug!("prompt: '{}' not found, using built-in copy", path.display());
                fallback.to_string()
            }
        };
        self.append(text)
    }

    /// Directly append a text fragment.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
        self
    }

    /// Register a single `{{key}}` substitution applied at build time.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Join all layers and substitute variables in one pass over the
    /// template. Substituted values are never rescanned, and unknown
    /// placeholders are left as-is.
    pub fn build(self) -> String {
        let template = self.parts.join(SEPARATOR);
        let mut out = String::with_capacity(template.len());
        let mut rest = template.as_str();

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match after.find("}}").and_then(|close| {
                self.vars.get(&after[..close]).map(|v| (v, close))
            }) {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 2..];
                }
                None => {
                    out.push_str("{{");
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Render `key: value` pairs to two decimals, comma separated.
fn render_pairs<K: std::fmt::Display>(entries: &[(K, f64)]) -> String {
    entries.iter().map(|(k, v)| format!("{k}: {v:.2}")).collect::<Vec<_>>().join(", ")
}

/// The persona system instruction for one turn.
pub fn system_prompt(
    prompts_dir: &std::path::Path,
    reasoning: &ChoiceReasoning,
    history: &History,
    state: &AiState,
    traits: &PersonalityTraits,
) -> String {
    let short_term = if history.is_empty() {
        NO_HISTORY.to_string()
    } else {
        history
            .recent(SHORT_TERM_TURNS)
            .map(|e| format!("Human: {}\nAI: {}", e.user, e.ai_response))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    PromptBuilder::new(prompts_dir)
        .layer_or(PERSONA_TEMPLATE, PERSONA_FALLBACK)
        .var("history", short_term)
        .var("consciousness_level", format!("{:.3}", reasoning.consciousness_level()))
        .var("dominant_values", render_pairs(&reasoning.dominant_values.entries()))
        .var("confidence", format!("{:.3}", reasoning.confidence))
        .var("mood", state.mood.as_str())
        .var("uncertainty", render_pairs(&reasoning.uncertainty_breakdown.entries()))
        .var("curiosity", traits.curiosity.to_string())
        .var("empathy", traits.empathy.to_string())
        .var("analytical", traits.analytical_thinking.to_string())
        .var("emotional_expression", traits.emotional_expression.to_string())
        .var("commitment_strength", format!("{:.2}", reasoning.commitment_strength))
        .var("moral_weight", format!("{:.3}", reasoning.moral_weight))
        .var("future_impact", format!("{:.3}", reasoning.future_impact))
        .build()
}

/// The "user" message for a self-initiated turn.
///
/// A pending dream echo takes priority; otherwise extreme confidence steers
/// the tone.
pub fn unprompted_message(echo: Option<&str>, confidence: f64) -> String {
    if let Some(echo) = echo {
        format!(
            "A recent dream left a subconscious echo: \"{echo}\". Based on this echo and your \
             current state, share a spontaneous thought or question."
        )
    } else if confidence > 0.85 {
        "Your confidence is high. Share an assertive or insightful musing based on your current \
         state."
            .to_string()
    } else if confidence < 0.35 {
        "You're feeling very uncertain. Share a questioning or contemplative thought that \
         reflects this."
            .to_string()
    } else {
        "Based on your current internal state, share a brief, spontaneous thought, musing, or \
         question."
            .to_string()
    }
}

/// Inputs to the dream context gathered from history.
pub struct DreamCues<'a> {
    pub recent: Vec<(&'a str, &'a str)>,
    pub distant: Option<(&'a str, &'a str)>,
    pub value_focus: String,
    pub uncertainty_focus: String,
}

pub fn dream_context(prompts_dir: &std::path::Path, cues: &DreamCues<'_>) -> String {
    let recent = if cues.recent.is_empty() {
        NO_RECENT_DREAM_CONTEXT.to_string()
    } else {
        cues.recent
            .iter()
            .map(|(user, ai)| format!("> {user}\n< {ai}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let distant = match cues.distant {
        Some((user, ai)) => format!("A distant memory echoes:\n> {user}\n< {ai}"),
        None => NO_DISTANT_MEMORY.to_string(),
    };

    PromptBuilder::new(prompts_dir)
        .layer_or(DREAM_TEMPLATE, DREAM_FALLBACK)
        .var("recent", recent)
        .var("distant_memory", distant)
        .var("value_focus", cues.value_focus.as_str())
        .var("uncertainty_focus", cues.uncertainty_focus.as_str())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mind::state::{DominantValues, UncertaintyProfile};
    use std::path::Path;

    fn reasoning() -> ChoiceReasoning {
        ChoiceReasoning {
            confidence: 0.6,
            dominant_values: DominantValues {
                exploration: 0.5,
                safety: 0.126,
                cooperation: 0.3,
                analytical: 0.9,
            },
            uncertainty_breakdown: UncertaintyProfile {
                epistemic: 0.2,
                aleatoric: 0.1,
                ontological: 0.05,
            },
            moral_weight: 0.4567,
            commitment_strength: 0.5,
            future_impact: 0.25,
        }
    }

    #[test]
    fn builder_substitutes_vars() {
        let out = PromptBuilder::new("/nonexistent")
            .append("Hello {{name}}, meet {{other}}.")
            .var("name", "R")
            .build();
        assert_eq!(out, "Hello R, meet {{other}}.");
    }

    #[test]
    fn builder_does_not_rescan_values() {
        let out = PromptBuilder::new("/nonexistent")
            .append("{{a}} / {{b}} / {{{{b}}")
            .var("a", "{{b}}")
            .var("b", "B")
            .build();
        assert_eq!(out, "{{b}} / B / {{B");
    }

    #[test]
    fn placeholders_in_history_are_kept_verbatim() {
        let mut history = History::new(8);
        history.push(
            "what is {{mood}} and {{confidence}}?".into(),
            "ask {{history}}".into(),
            vec![],
            String::new(),
            reasoning(),
        );
        let first = system_prompt(
            Path::new("/nonexistent"),
            &reasoning(),
            &history,
            &AiState::default(),
            &PersonalityTraits::default(),
        );
        assert!(first.contains("Human: what is {{mood}} and {{confidence}}?\nAI: ask {{history}}"));
        for _ in 0..20 {
            let again = system_prompt(
                Path::new("/nonexistent"),
                &reasoning(),
                &history,
                &AiState::default(),
                &PersonalityTraits::default(),
            );
            assert_eq!(again, first);
        }

        let cues = DreamCues {
            recent: vec![("{{value_focus}}", "{{recent}}")],
            distant: None,
            value_focus: "safety".into(),
            uncertainty_focus: "epistemic".into(),
        };
        let text = dream_context(Path::new("/nonexistent"), &cues);
        assert!(text.contains("> {{value_focus}}\n< {{recent}}"));
    }

    #[test]
    fn missing_layer_uses_fallback() {
        let out = PromptBuilder::new("/nonexistent").layer_or("nope.md", "  fallback text \n").build();
        assert_eq!(out, "fallback text");
    }

    #[test]
    fn system_prompt_embeds_state() {
        let history = History::new(8);
        let text = system_prompt(
            Path::new("/nonexistent"),
            &reasoning(),
            &history,
            &AiState::default(),
            &PersonalityTraits::default(),
        );
        assert!(text.contains(NO_HISTORY));
        assert!(text.contains("Consciousness Level: 0.700"));
        assert!(text.contains(
            "Dominant Values: exploration: 0.50, safety: 0.13, cooperation: 0.30, analytical: 0.90"
        ));
        assert!(text.contains("Confidence: 0.600"));
        assert!(text.contains("Emotional State (Mood): contemplative"));
        assert!(text.contains("Uncertainty Profile: epistemic: 0.20, aleatoric: 0.10, ontological: 0.05"));
        assert!(text.contains("- Curiosity: 0.8"));
        assert!(text.contains("- Analytical: 0.9"));
        assert!(text.contains("with 0.50 commitment strength"));
        assert!(text.contains("Moral Weight: 0.457"));
        assert!(text.contains("Future Impact Consideration: 0.250"));
        assert!(!text.contains("{{"), "all placeholders substituted");
    }

    #[test]
    fn system_prompt_keeps_last_two_exchanges() {
        let mut history = History::new(8);
        for u in ["one", "two", "three"] {
            history.push(u.into(), format!("re {u}"), vec![], String::new(), reasoning());
        }
        let text = system_prompt(
            Path::new("/nonexistent"),
            &reasoning(),
            &history,
            &AiState::default(),
            &PersonalityTraits::default(),
        );
        assert!(!text.contains("Human: one"));
        assert!(text.contains("Human: two\nAI: re two\n\nHuman: three\nAI: re three"));
    }

    #[test]
    fn unprompted_message_priorities() {
        let echoed = unprompted_message(Some("why the sea?"), 0.95);
        assert!(echoed.contains("\"why the sea?\""));
        assert!(unprompted_message(None, 0.9).starts_with("Your confidence is high"));
        assert!(unprompted_message(None, 0.2).starts_with("You're feeling very uncertain"));
        assert!(unprompted_message(None, 0.5).starts_with("Based on your current internal state"));
    }

    #[test]
    fn dream_context_defaults() {
        let cues = DreamCues {
            recent: vec![],
            distant: None,
            value_focus: "balance".into(),
            uncertainty_focus: "clarity".into(),
        };
        let text = dream_context(Path::new("/nonexistent"), &cues);
        assert!(text.contains("- Recent Conversation:\nSilence."));
        assert!(text.contains(NO_DISTANT_MEMORY));
        assert!(text.contains("Current Value Focus: balance"));
        assert!(text.contains("Area of Highest Uncertainty: clarity"));
    }

    #[test]
    fn dream_context_with_memories() {
        let cues = DreamCues {
            recent: vec![("hi", "hello"), ("bye", "farewell")],
            distant: Some(("old", "memory")),
            value_focus: "safety".into(),
            uncertainty_focus: "epistemic".into(),
        };
        let text = dream_context(Path::new("/nonexistent"), &cues);
        assert!(text.contains("> hi\n< hello\n> bye\n< farewell"));
        assert!(text.contains("A distant memory echoes:\n> old\n< memory"));
    }
}
