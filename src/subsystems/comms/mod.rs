//! Comms subsystem: every way a person talks to the mind.
//!
//! Each channel (PTY, HTTP) implements [`Component`] and is spawned as an
//! independent task by [`start`]. Channels capture their shared
//! [`Arc<CommsState>`] at construction time.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (lifecycle events). It is drained in a short-lived
//! background task that dies when all senders are dropped.

mod state;
pub mod pty;
#[cfg(feature = "channel-axum")]
pub mod axum_channel;

pub use state::{
    ChatMessage, CommsEvent, CommsState, DREAM_END_NOTICE, DREAM_START_NOTICE, NIGHTMARE_NOTICE,
    Role,
};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::subsystems::runtime::{Component, SubsystemHandle, spawn_components};

pub const EVENT_BUFFER: usize = 32;

/// Spawn all configured comms channels and return a [`SubsystemHandle`].
///
/// If any channel exits with an error the shared `shutdown` token is
/// cancelled. With no channel configured the handle simply waits for
/// shutdown, so the scheduler keeps running headless.
///
/// Synchronous: returns as soon as the tasks are spawned.
pub fn start(
    config: &Config,
    state: Arc<CommsState>,
    event_rx: mpsc::Receiver<CommsEvent>,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    if config.comms_pty_should_load() {
        info!("loading pty channel");
        components.push(Box::new(pty::PtyChannel::new("pty0", state.clone())));
    }

    #[cfg(feature = "channel-axum")]
    if config.comms_http_should_load() {
        info!(bind = %config.comms.http.bind, "loading axum channel");
        components.push(Box::new(axum_channel::AxumChannel::new(
            "axum0",
            config.comms.http.bind.clone(),
            state.clone(),
        )));
    }
    #[cfg(not(feature = "channel-axum"))]
    if config.comms_http_should_load() {
        tracing::warn!(
            "config has [comms.http] enabled = true but this binary was compiled without \
             the `channel-axum` feature; set enabled = false or rebuild with it"
        );
    }

    drain_events(event_rx);

    if components.is_empty() {
        info!("no comms channels configured, waiting for shutdown");
        return SubsystemHandle::from_handle(tokio::spawn(async move {
            shutdown.cancelled().await;
            Ok(())
        }));
    }

    spawn_components(components, shutdown)
}

/// Monitoring only: consumes [`CommsEvent`]s until every sender is gone.
fn drain_events(mut rx: mpsc::Receiver<CommsEvent>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelShutdown { ref channel_id } => {
                    debug!(channel_id, "channel reported shutdown");
                }
                CommsEvent::SessionStarted { ref channel_id } => {
                    debug!(channel_id, "channel session started");
                }
            }
        }
    });
}
