//! Rolling conversation history.
//!
//! Entries beyond `cap` are dropped from the front, but turn numbers stay
//! absolute so the report's turn axis never rewinds.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::ChoiceReasoning;

/// Marker stored in place of user text for self-initiated turns.
pub const UNPROMPTED_MARKER: &str = "[UNPROMPTED]";

#[derive(Debug, Clone, Serialize)]
pub struct ConversationEntry {
    /// 1-based, absolute across trimming.
    pub turn: u64,
    pub user: String,
    pub ai_response: String,
    pub internal_state: Vec<f64>,
    pub internal_thoughts: String,
    pub choice_reasoning: ChoiceReasoning,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct History {
    entries: VecDeque<ConversationEntry>,
    cap: usize,
    turns: u64,
}

impl History {
    pub fn new(cap: usize) -> Self {
        Self { entries: VecDeque::new(), cap: cap.max(1), turns: 0 }
    }

    /// Append a finished turn; returns its turn number.
    pub fn push(
        &mut self,
        user: String,
        ai_response: String,
        internal_state: Vec<f64>,
        internal_thoughts: String,
        choice_reasoning: ChoiceReasoning,
    ) -> u64 {
        self.turns += 1;
        self.entries.push_back(ConversationEntry {
            turn: self.turns,
            user,
            ai_response,
            internal_state,
            internal_thoughts,
            choice_reasoning,
            at: Utc::now(),
        });
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
        self.turns
    }

    /// Total turns ever recorded, including trimmed ones.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn latest(&self) -> Option<&ConversationEntry> {
        self.entries.back()
    }

    pub fn get(&self, index: usize) -> Option<&ConversationEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter()
    }

    /// The last `n` retained entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mind::state::{DominantValues, UncertaintyProfile};

    fn reasoning() -> ChoiceReasoning {
        ChoiceReasoning {
            confidence: 0.5,
            dominant_values: DominantValues::uniform(0.5),
            uncertainty_breakdown: UncertaintyProfile::uniform(0.5),
            moral_weight: 0.5,
            commitment_strength: 0.5,
            future_impact: 0.5,
        }
    }

    fn push(h: &mut History, user: &str) -> u64 {
        h.push(user.into(), format!("re: {user}"), vec![0.0; 4], "ok".into(), reasoning())
    }

    #[test]
    fn trims_oldest_and_keeps_absolute_turns() {
        let mut h = History::new(2);
        push(&mut h, "a");
        push(&mut h, "b");
        assert_eq!(push(&mut h, "c"), 3);
        assert_eq!(h.len(), 2);
        assert_eq!(h.turns(), 3);
        let users: Vec<_> = h.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(users, ["b", "c"]);
        assert_eq!(h.get(0).unwrap().turn, 2);
    }

    #[test]
    fn recent_returns_tail_oldest_first() {
        let mut h = History::new(10);
        for u in ["a", "b", "c", "d"] {
            push(&mut h, u);
        }
        let tail: Vec<_> = h.recent(2).map(|e| e.user.as_str()).collect();
        assert_eq!(tail, ["c", "d"]);
        assert_eq!(h.recent(10).count(), 4);
        assert_eq!(h.latest().unwrap().user, "d");
    }
}
