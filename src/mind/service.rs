//! The `Mind`: per-turn simulation, the model call with offline fallback,
//! dreams, and the state they fold back into.
//!
//! Provider errors never leave this module. A failed completion falls back
//! to the canned templates; a failed dream stores the static fallback.

use std::collections::VecDeque;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::dream::{self, Dream, DreamInfluence, DreamOutcome, DreamPlan};
use super::history::{History, UNPROMPTED_MARKER};
use super::monologue::internal_monologue;
use super::prompt::{self, DISTANT_MEMORY_GAP, DREAM_RECENT_TURNS, DreamCues};
use super::report::ConsciousnessReport;
use super::sampler;
use super::state::{AiState, ChoiceReasoning, PersonalityTraits};
use super::templates::{UNPROMPTED_FALLBACK_INPUT, mock_response};
use crate::config::MindConfig;
use crate::llm::{LlmProvider, ProviderError};

/// What a turn hands back to a channel.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Reply {
    pub response: String,
    pub internal_thoughts: String,
}

/// Who started a turn.
enum Turn<'a> {
    User(&'a str),
    Unprompted,
}

pub struct Mind {
    provider: Option<LlmProvider>,
    rng: StdRng,
    prompts_dir: PathBuf,
    history: History,
    monologue: VecDeque<String>,
    monologue_cap: usize,
    state: AiState,
    traits: PersonalityTraits,
    latest_dream: Option<Dream>,
    subconscious_echo: Option<String>,
}

impl Mind {
    /// `provider = None` runs fully offline on the canned templates.
    pub fn new(provider: Option<LlmProvider>, config: &MindConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            provider,
            rng,
            prompts_dir: config.prompts_dir.clone(),
            history: History::new(config.history_cap),
            monologue: VecDeque::new(),
            monologue_cap: config.monologue_cap.max(1),
            state: AiState::default(),
            traits: PersonalityTraits::default(),
            latest_dream: None,
            subconscious_echo: None,
        }
    }

    pub fn is_api_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Backend name, or `"mock"` when offline.
    pub fn provider_name(&self) -> &'static str {
        self.provider.as_ref().map_or("mock", LlmProvider::name)
    }

    pub fn state(&self) -> AiState {
        self.state
    }

    pub fn traits(&self) -> PersonalityTraits {
        self.traits
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn latest_dream(&self) -> Option<&Dream> {
        self.latest_dream.as_ref()
    }

    /// The echo the next unprompted thought will pick up, if any.
    pub fn pending_echo(&self) -> Option<&str> {
        self.subconscious_echo.as_deref()
    }

    /// Answer a user message.
    pub async fn process_input(&mut self, input: &str) -> Reply {
        self.turn(Turn::User(input)).await
    }

    /// A self-initiated turn. Consumes a pending dream echo.
    pub async fn unprompted_thought(&mut self) -> Reply {
        self.turn(Turn::Unprompted).await
    }

    /// Nothing observable changes until the provider call has returned, so a
    /// turn dropped mid-await leaves history, monologue and echo untouched.
    async fn turn(&mut self, kind: Turn<'_>) -> Reply {
        let reasoning = sampler::simulate(&mut self.rng, self.state.confidence);
        let thoughts = internal_monologue(&reasoning);
        let unprompted = matches!(kind, Turn::Unprompted);

        let system = prompt::system_prompt(
            &self.prompts_dir,
            &reasoning,
            &self.history,
            &self.state,
            &self.traits,
        );

        let (message, fallback_input, recorded_user) = match kind {
            Turn::User(text) => (text.to_string(), text.to_string(), text.to_string()),
            Turn::Unprompted => {
                let echo = self.subconscious_echo.as_deref();
                if let Some(echo) = echo {
                    debug!(echo = %echo, "mind: consuming subconscious echo");
                }
                (
                    prompt::unprompted_message(echo, reasoning.confidence),
                    UNPROMPTED_FALLBACK_INPUT.to_string(),
                    UNPROMPTED_MARKER.to_string(),
                )
            }
        };

        let response = match &self.provider {
            Some(provider) => match provider.complete(&message, Some(&system)).await {
                Ok(r) => r.text,
                Err(e) => {
                    warn!(provider = provider.name(), "mind: completion failed, using template: {e}");
                    mock_response(&fallback_input, &reasoning, &mut self.rng)
                }
            },
            None => mock_response(&fallback_input, &reasoning, &mut self.rng),
        };

        if unprompted {
            self.subconscious_echo = None;
        }
        self.remember_thought(thoughts.clone());
        let activation = sampler::activation_vector(&mut self.rng);
        let turn = self.history.push(
            recorded_user,
            response.clone(),
            activation,
            thoughts.clone(),
            reasoning,
        );
        self.state.absorb(&reasoning);
        debug!(
            turn,
            mood = %self.state.mood,
            confidence = self.state.confidence,
            "mind: turn complete"
        );

        Reply { response, internal_thoughts: thoughts }
    }

    fn remember_thought(&mut self, thought: String) {
        self.monologue.push_back(thought);
        while self.monologue.len() > self.monologue_cap {
            self.monologue.pop_front();
        }
    }

    /// Run a dream. Always stores a dream and always yields keywords; the
    /// outcome's `source` tells a generated dream from a fallback.
    pub async fn dream(&mut self) -> DreamOutcome {
        let dream = match self.provider.clone() {
            None => {
                info!("mind: dreaming offline");
                Dream::offline()
            }
            Some(provider) => match self.generate_dream(&provider).await {
                Ok(dream) => {
                    if let Some(influence) = &dream.influence {
                        self.apply_influence(influence);
                    }
                    info!(keywords = ?dream.keywords, "mind: dream formed");
                    dream
                }
                Err(e) => {
                    warn!(provider = provider.name(), "mind: dream failed: {e}");
                    Dream::failed()
                }
            },
        };

        let outcome = dream.outcome();
        self.latest_dream = Some(dream);
        outcome
    }

    async fn generate_dream(&mut self, provider: &LlmProvider) -> Result<Dream, ProviderError> {
        let context = self.dream_context();
        let plan_text = provider.complete_json(&context, &dream::response_schema()).await?;
        let plan = DreamPlan::parse(&plan_text.text)?;
        debug!(prompt = %plan.dream_prompt, "mind: dream plan accepted");
        let image = provider.generate_image(&plan.dream_prompt).await?;
        Ok(Dream::generated(plan, image.base64))
    }

    fn dream_context(&mut self) -> String {
        let len = self.history.len();
        let distant = if len > DISTANT_MEMORY_GAP {
            let idx = self.rng.gen_range(0..len - DISTANT_MEMORY_GAP);
            self.history.get(idx).map(|e| (e.user.as_str(), e.ai_response.as_str()))
        } else {
            None
        };
        let recent = self
            .history
            .recent(DREAM_RECENT_TURNS)
            .map(|e| (e.user.as_str(), e.ai_response.as_str()))
            .collect();
        let last: Option<&ChoiceReasoning> = self.history.latest().map(|e| &e.choice_reasoning);

        let cues = DreamCues {
            recent,
            distant,
            value_focus: last
                .map_or_else(|| "balance".to_string(), |r| r.dominant_values.dominant().0.to_string()),
            uncertainty_focus: last.map_or_else(
                || "clarity".to_string(),
                |r| r.uncertainty_breakdown.highest().0.to_string(),
            ),
        };
        prompt::dream_context(&self.prompts_dir, &cues)
    }

    /// Fold a dream's influence into the waking state.
    pub fn apply_influence(&mut self, influence: &DreamInfluence) {
        if let Some(mood) = influence.mood_shift {
            self.state.mood = mood;
        }
        if let Some(value) = influence.value_shift {
            let t = value.trait_boosted();
            let now = self.traits.boost(t);
            debug!(trait_ = ?t, value = now, "mind: trait boosted by dream");
        }
        let echo = influence.subconscious_echo.as_deref().map(str::trim).filter(|e| !e.is_empty());
        if let Some(echo) = echo {
            self.subconscious_echo = Some(echo.to_string());
        }
    }

    pub fn report(&self) -> ConsciousnessReport {
        ConsciousnessReport::build(
            &self.history,
            self.monologue.iter(),
            &self.state,
            self.traits,
            self.latest_dream.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::mind::dream::{DreamSource, OFFLINE_KEYWORDS};
    use crate::mind::state::{Mood, Trait, ValueKind};
    use crate::mind::templates::is_canned;

    fn offline() -> Mind {
        Mind::new(None, &Config::test_default().mind)
    }

    fn dummy() -> Mind {
        Mind::new(Some(LlmProvider::Dummy(DummyProvider)), &Config::test_default().mind)
    }

    #[tokio::test]
    async fn offline_turn_uses_templates_and_records_history() {
        let mut mind = offline();
        let reply = mind.process_input("Are you conscious?").await;
        assert!(is_canned(&reply.response));
        assert!(!reply.internal_thoughts.is_empty());
        assert_eq!(mind.history().turns(), 1);
        assert_eq!(mind.history().latest().unwrap().user, "Are you conscious?");
        assert_eq!(mind.history().latest().unwrap().internal_state.len(), sampler::STATE_DIMS);
    }

    #[tokio::test]
    async fn unprompted_turn_is_marked() {
        let mut mind = offline();
        let reply = mind.unprompted_thought().await;
        assert!(is_canned(&reply.response));
        assert_eq!(mind.history().latest().unwrap().user, UNPROMPTED_MARKER);
    }

    #[tokio::test]
    async fn state_follows_latest_reasoning() {
        let mut mind = offline();
        for _ in 0..20 {
            mind.process_input("hello").await;
            let reasoning = mind.history().latest().unwrap().choice_reasoning;
            let state = mind.state();
            assert_eq!(state.confidence, reasoning.confidence);
            let (kind, weight) = reasoning.dominant_values.dominant();
            let expected = if weight > 0.7 { kind.mood() } else { Mood::Contemplative };
            assert_eq!(state.mood, expected);
        }
    }

    #[tokio::test]
    async fn offline_dream_uses_static_fallback() {
        let mut mind = offline();
        let outcome = mind.dream().await;
        assert_eq!(outcome.source, DreamSource::Offline);
        assert_eq!(outcome.keywords, OFFLINE_KEYWORDS);
        assert_eq!(mind.latest_dream().unwrap().image, dream::STATIC_IMAGE_PNG);
    }

    #[tokio::test]
    async fn dummy_dream_applies_influence() {
        let mut mind = dummy();
        let before = mind.traits().get(Trait::Curiosity);
        let outcome = mind.dream().await;
        assert_eq!(outcome.source, DreamSource::Generated);
        assert_eq!(mind.state().mood, Mood::Curious);
        assert!((mind.traits().get(Trait::Curiosity) - (before + 0.01)).abs() < 1e-9);
        assert!(mind.pending_echo().is_some());

        mind.unprompted_thought().await;
        assert!(mind.pending_echo().is_none());
        let last = mind.history().latest().unwrap();
        assert!(last.ai_response.contains("subconscious echo"));
    }

    #[test]
    fn influence_boost_caps_at_one() {
        let mut mind = offline();
        let influence = DreamInfluence {
            mood_shift: None,
            value_shift: Some(ValueKind::Safety),
            subconscious_echo: Some("   ".into()),
        };
        for _ in 0..50 {
            mind.apply_influence(&influence);
        }
        assert_eq!(mind.traits().analytical_thinking, 1.0);
        assert_eq!(mind.state().mood, Mood::Contemplative);
        assert!(mind.pending_echo().is_none());
    }

    #[tokio::test]
    async fn monologue_is_capped() {
        let mut config = Config::test_default().mind;
        config.monologue_cap = 3;
        let mut mind = Mind::new(None, &config);
        for _ in 0..6 {
            mind.process_input("hi").await;
        }
        assert_eq!(mind.report().recent_thoughts.len(), 3);
        assert_eq!(mind.report().conversation_count, 6);
    }

    #[tokio::test]
    async fn dream_context_reaches_back_past_recent_turns() {
        let mut mind = offline();
        for i in 0..DISTANT_MEMORY_GAP {
            mind.process_input(&format!("turn {i}")).await;
        }
        assert!(!mind.dream_context().contains("A distant memory echoes"));

        mind.process_input("turn 5").await;
        let context = mind.dream_context();
        assert!(context.contains("A distant memory echoes:\n> turn 0"), "{context}");
        assert!(context.contains("> turn 3\n"));
        assert!(context.contains("> turn 5\n"));
    }

    #[tokio::test]
    async fn same_seed_same_replies() {
        let mut a = offline();
        let mut b = offline();
        for input in ["hi", "do you feel?", "a choice"] {
            assert_eq!(a.process_input(input).await, b.process_input(input).await);
        }
    }
}
