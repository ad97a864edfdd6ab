//! Internal-state types: mood, value weights, uncertainty, personality.
//!
//! Every weight lives in `[0, 1]`. Keys are kept as enums so an unknown
//! mood or value name can never enter the model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Mood ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Contemplative,
    Curious,
    Cautious,
    Collaborative,
    Analytical,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Contemplative,
        Mood::Curious,
        Mood::Cautious,
        Mood::Collaborative,
        Mood::Analytical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Contemplative => "contemplative",
            Mood::Curious => "curious",
            Mood::Cautious => "cautious",
            Mood::Collaborative => "collaborative",
            Mood::Analytical => "analytical",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    /// Case-insensitive; surrounding whitespace and quotes are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().trim_matches(|c| c == '\'' || c == '"').to_ascii_lowercase();
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == key)
            .ok_or_else(|| format!("unknown mood: {s}"))
    }
}

// ── Values ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Exploration,
    Safety,
    Cooperation,
    Analytical,
}

impl ValueKind {
    pub const ALL: [ValueKind; 4] =
        [ValueKind::Exploration, ValueKind::Safety, ValueKind::Cooperation, ValueKind::Analytical];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Exploration => "exploration",
            ValueKind::Safety => "safety",
            ValueKind::Cooperation => "cooperation",
            ValueKind::Analytical => "analytical",
        }
    }

    /// The mood this value pulls toward when it dominates strongly.
    pub fn mood(self) -> Mood {
        match self {
            ValueKind::Exploration => Mood::Curious,
            ValueKind::Safety => Mood::Cautious,
            ValueKind::Cooperation => Mood::Collaborative,
            ValueKind::Analytical => Mood::Analytical,
        }
    }

    /// The personality trait a dream focused on this value reinforces.
    pub fn trait_boosted(self) -> Trait {
        match self {
            ValueKind::Exploration => Trait::Curiosity,
            ValueKind::Safety | ValueKind::Analytical => Trait::AnalyticalThinking,
            ValueKind::Cooperation => Trait::Empathy,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().trim_matches(|c| c == '\'' || c == '"').to_ascii_lowercase();
        ValueKind::ALL
            .into_iter()
            .find(|v| v.as_str() == key)
            .ok_or_else(|| format!("unknown value: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DominantValues {
    pub exploration: f64,
    pub safety: f64,
    pub cooperation: f64,
    pub analytical: f64,
}

impl DominantValues {
    pub fn uniform(v: f64) -> Self {
        Self { exploration: v, safety: v, cooperation: v, analytical: v }
    }

    pub fn get(&self, kind: ValueKind) -> f64 {
        match kind {
            ValueKind::Exploration => self.exploration,
            ValueKind::Safety => self.safety,
            ValueKind::Cooperation => self.cooperation,
            ValueKind::Analytical => self.analytical,
        }
    }

    /// `(kind, weight)` pairs in declaration order.
    pub fn entries(&self) -> [(ValueKind, f64); 4] {
        ValueKind::ALL.map(|k| (k, self.get(k)))
    }

    /// Arg-max in declaration order; on a tie the later key wins.
    pub fn dominant(&self) -> (ValueKind, f64) {
        argmax_later_wins(self.entries())
    }
}

// ── Uncertainty ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UncertaintyKind {
    /// Lack of knowledge.
    Epistemic,
    /// Randomness.
    Aleatoric,
    /// Reality itself.
    Ontological,
}

impl UncertaintyKind {
    pub const ALL: [UncertaintyKind; 3] =
        [UncertaintyKind::Epistemic, UncertaintyKind::Aleatoric, UncertaintyKind::Ontological];

    pub fn as_str(self) -> &'static str {
        match self {
            UncertaintyKind::Epistemic => "epistemic",
            UncertaintyKind::Aleatoric => "aleatoric",
            UncertaintyKind::Ontological => "ontological",
        }
    }
}

impl fmt::Display for UncertaintyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyProfile {
    pub epistemic: f64,
    pub aleatoric: f64,
    pub ontological: f64,
}

impl UncertaintyProfile {
    pub fn uniform(v: f64) -> Self {
        Self { epistemic: v, aleatoric: v, ontological: v }
    }

    pub fn get(&self, kind: UncertaintyKind) -> f64 {
        match kind {
            UncertaintyKind::Epistemic => self.epistemic,
            UncertaintyKind::Aleatoric => self.aleatoric,
            UncertaintyKind::Ontological => self.ontological,
        }
    }

    pub fn entries(&self) -> [(UncertaintyKind, f64); 3] {
        UncertaintyKind::ALL.map(|k| (k, self.get(k)))
    }

    pub fn highest(&self) -> (UncertaintyKind, f64) {
        argmax_later_wins(self.entries())
    }
}

fn argmax_later_wins<K: Copy, const N: usize>(entries: [(K, f64); N]) -> (K, f64) {
    let mut best = entries[0];
    for entry in entries.into_iter().skip(1) {
        if best.1 <= entry.1 {
            best = entry;
        }
    }
    best
}

// ── Choice reasoning ──────────────────────────────────────────────────────────

/// The internal-state vector sampled for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChoiceReasoning {
    pub confidence: f64,
    pub dominant_values: DominantValues,
    pub uncertainty_breakdown: UncertaintyProfile,
    pub moral_weight: f64,
    pub commitment_strength: f64,
    pub future_impact: f64,
}

impl ChoiceReasoning {
    /// `(confidence + (1 - epistemic)) / 2`.
    pub fn consciousness_level(&self) -> f64 {
        (self.confidence + (1.0 - self.uncertainty_breakdown.epistemic)) / 2.0
    }
}

// ── Personality ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Curiosity,
    Empathy,
    AnalyticalThinking,
    EmotionalExpression,
    PhilosophicalDepth,
}

/// Per-boost increment applied by a dream's value shift.
pub const TRAIT_BOOST: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTraits {
    pub curiosity: f64,
    pub empathy: f64,
    pub analytical_thinking: f64,
    pub emotional_expression: f64,
    pub philosophical_depth: f64,
}

impl Default for PersonalityTraits {
    fn default() -> Self {
        Self {
            curiosity: 0.8,
            empathy: 0.7,
            analytical_thinking: 0.9,
            emotional_expression: 0.6,
            philosophical_depth: 0.8,
        }
    }
}

impl PersonalityTraits {
    pub fn get(&self, t: Trait) -> f64 {
        match t {
            Trait::Curiosity => self.curiosity,
            Trait::Empathy => self.empathy,
            Trait::AnalyticalThinking => self.analytical_thinking,
            Trait::EmotionalExpression => self.emotional_expression,
            Trait::PhilosophicalDepth => self.philosophical_depth,
        }
    }

    fn slot(&mut self, t: Trait) -> &mut f64 {
        match t {
            Trait::Curiosity => &mut self.curiosity,
            Trait::Empathy => &mut self.empathy,
            Trait::AnalyticalThinking => &mut self.analytical_thinking,
            Trait::EmotionalExpression => &mut self.emotional_expression,
            Trait::PhilosophicalDepth => &mut self.philosophical_depth,
        }
    }

    /// Raise `t` by [`TRAIT_BOOST`], capped at 1.0. Returns the new value.
    pub fn boost(&mut self, t: Trait) -> f64 {
        let slot = self.slot(t);
        *slot = (*slot + TRAIT_BOOST).min(1.0);
        *slot
    }
}

// ── Current state ─────────────────────────────────────────────────────────────

pub const INITIAL_CONFIDENCE: f64 = 0.65;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AiState {
    pub mood: Mood,
    pub confidence: f64,
}

impl Default for AiState {
    fn default() -> Self {
        Self { mood: Mood::Contemplative, confidence: INITIAL_CONFIDENCE }
    }
}

impl AiState {
    /// Fold a finished turn back in: take its confidence, and let a strongly
    /// dominant value (> 0.7) pick the mood; otherwise settle to contemplative.
    pub fn absorb(&mut self, reasoning: &ChoiceReasoning) {
        self.confidence = reasoning.confidence.clamp(0.0, 1.0);
        let (kind, weight) = reasoning.dominant_values.dominant();
        self.mood = if weight > 0.7 { kind.mood() } else { Mood::Contemplative };
    }
}
