//! PTY (console) comms channel. Reads lines from stdin, hands them to the
//! mind, prints replies and broadcast notices to stdout.
//!
//! Slash commands: `/report`, `/dream`, `/think`, `/help`, `/quit`.
//! Runs until the `shutdown` token is cancelled (Ctrl-C), stdin closes,
//! or the user types `/quit`.

use std::fmt::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{ChatMessage, CommsEvent, CommsState, Role};
use crate::error::AppError;
use crate::mind::ConsciousnessReport;
use crate::subsystems::runtime::{Component, ComponentFuture};

const HELP: &str = "\
  /report   show the consciousness report
  /think    ask for an unprompted thought
  /dream    dream now
  /help     this list
  /quit     leave";

const OFFLINE_BANNER: &str = "Offline mode: no API key configured. Replies come from built-in \
                              templates; dreams are static.";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Report,
    Dream,
    Think,
    Help,
    Quit,
    Unknown(&'a str),
    Say(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        match line {
            "/report" => Command::Report,
            "/dream" => Command::Dream,
            "/think" => Command::Think,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other if other.starts_with('/') => Command::Unknown(other),
            other => Command::Say(other),
        }
    }
}

// ── PtyChannel ───────────────────────────────────────────────────────────────

pub struct PtyChannel {
    channel_id: String,
    state: Arc<CommsState>,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), state }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_pty(self.channel_id, self.state, shutdown))
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn render(bot_name: &str, msg: &ChatMessage) -> String {
    match msg.role {
        Role::User => format!("you: {}", msg.content),
        Role::Assistant if msg.is_system_message => format!("  ~ {}", msg.content),
        Role::Assistant => {
            let mut out = String::new();
            if let Some(thoughts) = &msg.internal_thoughts {
                let _ = writeln!(out, "  ({thoughts})");
            }
            let tag = if msg.is_unprompted { " (unprompted)" } else { "" };
            let _ = write!(out, "{bot_name}{tag}: {}", msg.content);
            out
        }
    }
}

fn render_pairs<K: std::fmt::Display>(entries: &[(K, f64)]) -> String {
    entries.iter().map(|(k, v)| format!("{k} {v:.2}")).collect::<Vec<_>>().join("  ")
}

fn render_report(r: &ConsciousnessReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "consciousness {:.3}  mood {}  confidence {:.3}",
        r.consciousness_level, r.current_mood, r.confidence
    );
    let _ = writeln!(out, "values       {}", render_pairs(&r.dominant_values.entries()));
    let _ = writeln!(out, "uncertainty  {}", render_pairs(&r.uncertainty_profile.entries()));
    let t = &r.personality_traits;
    let _ = writeln!(
        out,
        "traits       curiosity {:.2}  empathy {:.2}  analytical {:.2}  expression {:.2}  depth {:.2}",
        t.curiosity, t.empathy, t.analytical_thinking, t.emotional_expression, t.philosophical_depth
    );
    let _ = writeln!(out, "turns        {}", r.conversation_count);
    if let Some(last) = r.internal_state_history.last() {
        let _ = writeln!(out, "activation   {:.3} (turn {})", last.magnitude, last.turn);
    }
    let _ = writeln!(out, "thoughts:");
    for thought in &r.recent_thoughts {
        let _ = writeln!(out, "  - {thought}");
    }
    match &r.latest_dream {
        Some(d) => {
            let _ = write!(out, "last dream   [{}] {}", d.keywords.join(", "), d.prompt);
        }
        None => {
            let _ = write!(out, "last dream   none");
        }
    }
    out
}

fn prompt() {
    use std::io::Write as _;
    print!("> ");
    let _ = std::io::stdout().flush();
}

// ── run_pty ──────────────────────────────────────────────────────────────────

async fn run_pty(
    channel_id: String,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    info!(%channel_id, "pty channel started");
    state.report_event(CommsEvent::SessionStarted { channel_id: channel_id.clone() });

    let bot = state.bot_name().to_string();
    println!("─────────────────────────────────");
    println!(" {bot} console  (/help, Ctrl-C to quit)");
    println!("─────────────────────────────────");
    if !state.api_configured() {
        println!("{OFFLINE_BANNER}");
    }
    for msg in state.transcript().await {
        println!("{}", render(&bot, &msg));
    }

    let mut notices = state.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt();
    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!("\n[pty] shutdown signal received, closing console");
                info!("pty channel shutting down");
                break;
            }

            notice = notices.recv() => {
                match notice {
                    Ok(msg) => {
                        println!("\n{}", render(&bot, &msg));
                        prompt();
                    }
                    Err(RecvError::Lagged(n)) => warn!(skipped = n, "pty fell behind broadcast"),
                    Err(RecvError::Closed) => break,
                }
            }

            line = lines.next_line() => {
                let input = match line {
                    Err(e) => {
                        warn!("pty read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => input,
                };
                let input = input.trim();
                if input.is_empty() {
                    prompt();
                    continue;
                }
                debug!(input = %input, "pty received line");

                match Command::parse(input) {
                    Command::Quit => break,
                    Command::Help => println!("{HELP}"),
                    Command::Report => println!("{}", render_report(&state.report().await)),
                    // Both broadcast; the notice arm prints them.
                    Command::Think => {
                        state.think().await;
                    }
                    Command::Dream => {
                        state.dream().await;
                    }
                    Command::Unknown(cmd) => println!("unknown command {cmd}, try /help"),
                    Command::Say(text) => match state.send_message(&channel_id, text).await {
                        Ok(reply) => {
                            let msg = ChatMessage::reply(&reply, false);
                            println!("{}", render(&bot, &msg));
                        }
                        Err(e) => warn!("send_message error: {e}"),
                    },
                }
                prompt();
            }
        }
    }

    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}
