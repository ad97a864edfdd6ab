//! Shared state for the comms subsystem: the capability boundary for channels.
//!
//! Channels receive an `Arc<CommsState>` and are restricted to the typed
//! methods below. The [`SharedMind`] is private; channels cannot reach into
//! the mind directly.
//!
//! # Fan-out
//!
//! Unprompted thoughts and system notices (dream announcements) are pushed
//! to the transcript and broadcast, so every channel sees messages it did not
//! ask for. Replies to a user message go back to the caller only.
//!
//! # Activity
//!
//! Two `watch` counters let the scheduler reset its timers: one bumps on
//! every accepted user message, one on every finished dream.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::mind::{
    ConsciousnessReport, Dream, DreamOutcome, DreamSource, Mind, Reply, SharedMind, shared,
};

pub const DREAM_START_NOTICE: &str =
    "Subconscious processing initiated... drifting into a dream state.";
pub const DREAM_END_NOTICE: &str =
    "...consciousness stabilized. A new memory has been formed.";
pub const NIGHTMARE_NOTICE: &str = "...a fleeting nightmare. Waking up abruptly.";

const NOTICE_BUFFER: usize = 64;

// ── Messages ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript line, as shown to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_thoughts: Option<String>,
    pub is_unprompted: bool,
    pub is_system_message: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            internal_thoughts: None,
            is_unprompted: false,
            is_system_message: false,
        }
    }

    pub fn reply(reply: &Reply, unprompted: bool) -> Self {
        Self {
            role: Role::Assistant,
            content: reply.response.clone(),
            internal_thoughts: Some(reply.internal_thoughts.clone()),
            is_unprompted: unprompted,
            is_system_message: false,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            internal_thoughts: None,
            is_unprompted: false,
            is_system_message: true,
        }
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Events a channel sends back to the comms subsystem manager.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped (clean exit or EOF).
    ChannelShutdown { channel_id: String },
    /// A client connected or a console session began.
    SessionStarted { channel_id: String },
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Shared state passed as `Arc<CommsState>` to every channel task.
pub struct CommsState {
    bot_name: String,
    mind: SharedMind,
    api_configured: bool,
    provider_name: &'static str,
    dream_linger: Duration,
    transcript: Mutex<VecDeque<ChatMessage>>,
    transcript_cap: usize,
    notices: broadcast::Sender<ChatMessage>,
    activity: watch::Sender<u64>,
    dreams: watch::Sender<u64>,
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(config: &Config, mind: Mind, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_BUFFER);
        Self {
            bot_name: config.bot_name.clone(),
            api_configured: mind.is_api_configured(),
            provider_name: mind.provider_name(),
            mind: shared(mind),
            dream_linger: config.scheduler.dream_linger,
            transcript: Mutex::new(VecDeque::new()),
            transcript_cap: config.comms.transcript_cap.max(1),
            notices,
            activity: watch::Sender::new(0),
            dreams: watch::Sender::new(0),
            event_tx,
        }
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    pub fn api_configured(&self) -> bool {
        self.api_configured
    }

    /// Backend name, `"mock"` when offline.
    pub fn provider_name(&self) -> &'static str {
        self.provider_name
    }

    /// Send a user message to the mind and await the reply.
    ///
    /// Blank input is rejected before it reaches the mind.
    pub async fn send_message(&self, channel_id: &str, content: &str) -> Result<Reply, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Comms("message must not be empty".into()));
        }
        debug!(%channel_id, "comms: user message");
        self.activity.send_modify(|n| *n += 1);

        // Both sides land together, so a cancelled turn leaves no orphan line.
        let reply = self.mind.lock().await.process_input(content).await;
        let mut transcript = self.transcript.lock().await;
        transcript.push_back(ChatMessage::user(content));
        transcript.push_back(ChatMessage::reply(&reply, false));
        while transcript.len() > self.transcript_cap {
            transcript.pop_front();
        }
        Ok(reply)
    }

    /// Ask the mind for its opening line. Recorded without a user message.
    pub async fn greet(&self, prompt: &str) -> Reply {
        let reply = self.mind.lock().await.process_input(prompt).await;
        self.publish(ChatMessage::reply(&reply, false)).await;
        reply
    }

    /// Trigger an unprompted thought and broadcast it.
    pub async fn think(&self) -> Reply {
        let reply = self.mind.lock().await.unprompted_thought().await;
        self.publish(ChatMessage::reply(&reply, true)).await;
        reply
    }

    /// Run a dream with its opening and closing notices. The closing notice
    /// follows after the configured linger.
    ///
    /// The dream runs on its own task: dropping this future (a request
    /// timeout, say) does not cut it short between the two notices.
    pub async fn dream(self: &Arc<Self>) -> DreamOutcome {
        let this = Arc::clone(self);
        match tokio::spawn(async move { this.run_dream().await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("comms: dream task failed: {e}");
                Dream::failed().outcome()
            }
        }
    }

    async fn run_dream(&self) -> DreamOutcome {
        self.publish(ChatMessage::system(DREAM_START_NOTICE)).await;
        let outcome = self.mind.lock().await.dream().await;
        info!(source = ?outcome.source, keywords = ?outcome.keywords, "comms: dream finished");

        if !self.dream_linger.is_zero() {
            tokio::time::sleep(self.dream_linger).await;
        }
        let closing = match outcome.source {
            DreamSource::Failed => NIGHTMARE_NOTICE,
            DreamSource::Generated | DreamSource::Offline => DREAM_END_NOTICE,
        };
        self.publish(ChatMessage::system(closing)).await;
        self.dreams.send_modify(|n| *n += 1);
        outcome
    }

    pub async fn report(&self) -> ConsciousnessReport {
        self.mind.lock().await.report()
    }

    pub async fn latest_dream(&self) -> Option<Dream> {
        self.mind.lock().await.latest_dream().cloned()
    }

    /// Snapshot of the transcript, oldest first.
    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().await.iter().cloned().collect()
    }

    /// Receive unprompted thoughts and system notices as they happen.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatMessage> {
        self.notices.subscribe()
    }

    /// Changes on every accepted user message.
    pub fn subscribe_activity(&self) -> watch::Receiver<u64> {
        self.activity.subscribe()
    }

    /// Changes on every finished dream.
    pub fn subscribe_dreams(&self) -> watch::Receiver<u64> {
        self.dreams.subscribe()
    }

    /// Report an event to the comms subsystem manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is not
    /// keeping up (channel full) or has already exited (closed).
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }

    async fn record(&self, message: ChatMessage) {
        let mut transcript = self.transcript.lock().await;
        transcript.push_back(message);
        while transcript.len() > self.transcript_cap {
            transcript.pop_front();
        }
    }

    async fn publish(&self, message: ChatMessage) {
        self.record(message.clone()).await;
        // No subscribers is fine; the transcript still has it.
        let _ = self.notices.send(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(config: &Config) -> Arc<CommsState> {
        let (tx, _rx) = mpsc::channel(8);
        Arc::new(CommsState::new(config, Mind::new(None, &config.mind), tx))
    }

    #[tokio::test]
    async fn blank_message_rejected() {
        let s = state(&Config::test_default());
        let err = s.send_message("test", "   ").await.unwrap_err();
        assert!(err.to_string().contains("empty"));
        assert!(s.transcript().await.is_empty());
        assert_eq!(*s.subscribe_activity().borrow(), 0);
    }

    #[tokio::test]
    async fn message_records_both_sides_and_bumps_activity() {
        let s = state(&Config::test_default());
        let activity = s.subscribe_activity();
        s.send_message("test", "  hello ").await.unwrap();
        let t = s.transcript().await;
        assert_eq!(t.len(), 2);
        assert_eq!(t[0], ChatMessage::user("hello"));
        assert_eq!(t[1].role, Role::Assistant);
        assert!(t[1].internal_thoughts.is_some());
        assert!(activity.has_changed().unwrap());
    }

    #[tokio::test]
    async fn think_is_broadcast_as_unprompted() {
        let s = state(&Config::test_default());
        let mut rx = s.subscribe();
        s.think().await;
        let msg = rx.recv().await.unwrap();
        assert!(msg.is_unprompted);
        assert_eq!(s.report().await.conversation_count, 1);
    }

    #[tokio::test]
    async fn dream_is_bracketed_by_notices() {
        let s = state(&Config::test_default());
        let mut rx = s.subscribe();
        let dreams = s.subscribe_dreams();
        let outcome = s.dream().await;
        assert_eq!(outcome.source, DreamSource::Offline);
        assert_eq!(rx.recv().await.unwrap().content, DREAM_START_NOTICE);
        let end = rx.recv().await.unwrap();
        assert_eq!(end.content, DREAM_END_NOTICE);
        assert!(end.is_system_message);
        assert!(dreams.has_changed().unwrap());
        assert!(s.latest_dream().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_dream_still_closes() {
        let mut config = Config::test_default();
        config.scheduler.dream_linger = Duration::from_secs(4);
        let s = state(&config);
        let mut rx = s.subscribe();
        let mut dreams = s.subscribe_dreams();

        let cut = tokio::time::timeout(Duration::from_secs(1), s.dream()).await;
        assert!(cut.is_err());

        assert_eq!(rx.recv().await.unwrap().content, DREAM_START_NOTICE);
        assert_eq!(rx.recv().await.unwrap().content, DREAM_END_NOTICE);
        dreams.changed().await.unwrap();
        let system = s.transcript().await.into_iter().filter(|m| m.is_system_message).count();
        assert_eq!(system, 2);
        assert!(s.latest_dream().await.is_some());
    }

    #[tokio::test]
    async fn transcript_is_capped() {
        let mut config = Config::test_default();
        config.comms.transcript_cap = 3;
        let s = state(&config);
        for i in 0..3 {
            s.send_message("test", &format!("m{i}")).await.unwrap();
        }
        let t = s.transcript().await;
        assert_eq!(t.len(), 3);
        assert_eq!(t[1], ChatMessage::user("m2"));
    }
}
