//! The one-line internal monologue shown alongside each reply.

use super::state::ChoiceReasoning;

pub const BALANCED: &str = "My internal state feels balanced.";

pub fn internal_monologue(reasoning: &ChoiceReasoning) -> String {
    let mut thoughts: Vec<String> = Vec::new();

    if reasoning.confidence < 0.3 {
        thoughts.push("Feeling quite uncertain... multiple perspectives seem valid.".into());
    } else if reasoning.confidence > 0.8 {
        thoughts.push("A strong sense of clarity is emerging on this topic.".into());
    }

    let (value, weight) = reasoning.dominant_values.dominant();
    if weight > 0.7 {
        thoughts.push(format!("My internal value of '{value}' is strongly activated."));
    }

    if reasoning.uncertainty_breakdown.epistemic > 0.6 {
        thoughts.push("I recognize a gap in my knowledge here.".into());
    }

    if reasoning.moral_weight > 0.7 {
        thoughts.push("This carries significant ethical weight.".into());
    }

    if thoughts.is_empty() { BALANCED.to_string() } else { thoughts.join(" ") }
}
