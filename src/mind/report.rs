//! Snapshot of the mind for display.

use serde::Serialize;

use super::dream::Dream;
use super::history::History;
use super::sampler::magnitude;
use super::state::{AiState, DominantValues, PersonalityTraits, UncertaintyProfile};

/// Mood label reported before the first turn.
pub const NASCENT_MOOD: &str = "nascent";
pub const AWAITING_FIRST_INTERACTION: &str = "Awaiting first interaction...";
/// Thoughts shown in a report, newest first.
pub const RECENT_THOUGHTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateSample {
    pub turn: u64,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsciousnessReport {
    pub consciousness_level: f64,
    /// One of the five moods, or `"nascent"` before any turn.
    pub current_mood: String,
    pub confidence: f64,
    pub dominant_values: DominantValues,
    pub uncertainty_profile: UncertaintyProfile,
    pub recent_thoughts: Vec<String>,
    pub conversation_count: u64,
    pub personality_traits: PersonalityTraits,
    pub internal_state_history: Vec<StateSample>,
    pub latest_dream: Option<Dream>,
}

impl ConsciousnessReport {
    fn nascent(traits: PersonalityTraits, latest_dream: Option<Dream>) -> Self {
        Self {
            consciousness_level: 0.5,
            current_mood: NASCENT_MOOD.to_string(),
            confidence: 0.5,
            dominant_values: DominantValues::uniform(0.5),
            uncertainty_profile: UncertaintyProfile::uniform(0.5),
            recent_thoughts: vec![AWAITING_FIRST_INTERACTION.to_string()],
            conversation_count: 0,
            personality_traits: traits,
            internal_state_history: Vec::new(),
            latest_dream,
        }
    }

    /// Build a report. `monologue` is oldest first.
    pub fn build<'a>(
        history: &History,
        monologue: impl DoubleEndedIterator<Item = &'a String>,
        state: &AiState,
        traits: PersonalityTraits,
        latest_dream: Option<Dream>,
    ) -> Self {
        let Some(latest) = history.latest() else {
            return Self::nascent(traits, latest_dream);
        };
        let reasoning = &latest.choice_reasoning;

        Self {
            consciousness_level: reasoning.consciousness_level(),
            current_mood: state.mood.as_str().to_string(),
            confidence: state.confidence,
            dominant_values: reasoning.dominant_values,
            uncertainty_profile: reasoning.uncertainty_breakdown,
            recent_thoughts: monologue.rev().take(RECENT_THOUGHTS).cloned().collect(),
            conversation_count: history.turns(),
            personality_traits: traits,
            internal_state_history: history
                .iter()
                .map(|e| StateSample { turn: e.turn, magnitude: magnitude(&e.internal_state) })
                .collect(),
            latest_dream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mind::state::{ChoiceReasoning, Mood};

    fn reasoning(confidence: f64, epistemic: f64) -> ChoiceReasoning {
        ChoiceReasoning {
            confidence,
            dominant_values: DominantValues::uniform(0.4),
            uncertainty_breakdown: UncertaintyProfile { epistemic, aleatoric: 0.1, ontological: 0.1 },
            moral_weight: 0.2,
            commitment_strength: 0.5,
            future_impact: 0.5,
        }
    }

    #[test]
    fn empty_history_gives_nascent_snapshot() {
        let report = ConsciousnessReport::build(
            &History::new(4),
            std::iter::empty(),
            &AiState::default(),
            PersonalityTraits::default(),
            None,
        );
        assert_eq!(report.current_mood, NASCENT_MOOD);
        assert_eq!(report.consciousness_level, 0.5);
        assert_eq!(report.confidence, 0.5);
        assert_eq!(report.dominant_values, DominantValues::uniform(0.5));
        assert_eq!(report.recent_thoughts, [AWAITING_FIRST_INTERACTION]);
        assert_eq!(report.conversation_count, 0);
        assert!(report.internal_state_history.is_empty());
        assert!(report.latest_dream.is_none());
    }

    #[test]
    fn derives_from_latest_entry() {
        let mut history = History::new(2);
        for i in 0..3 {
            history.push(format!("u{i}"), "a".into(), vec![0.5, -0.5], String::new(), reasoning(0.8, 0.4));
        }
        let thoughts: Vec<String> = (1..=7).map(|i| format!("t{i}")).collect();
        let state = AiState { mood: Mood::Curious, confidence: 0.8 };

        let report = ConsciousnessReport::build(
            &history,
            thoughts.iter(),
            &state,
            PersonalityTraits::default(),
            None,
        );
        assert!((report.consciousness_level - 0.7).abs() < 1e-9);
        assert_eq!(report.current_mood, "curious");
        assert_eq!(report.recent_thoughts, ["t7", "t6", "t5", "t4", "t3"]);
        assert_eq!(report.conversation_count, 3);
        let turns: Vec<u64> = report.internal_state_history.iter().map(|s| s.turn).collect();
        assert_eq!(turns, [2, 3]);
        assert_eq!(report.internal_state_history[0].magnitude, 0.5);
    }
}
