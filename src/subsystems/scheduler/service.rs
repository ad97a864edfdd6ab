//! Idle-timer loop. Sleeps until the next deadline via
//! `tokio::time::sleep_until`; no polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::subsystems::comms::CommsState;

/// Confidence outside this band makes the mind think sooner.
const CALM_BAND: (f64, f64) = (0.35, 0.85);

pub struct SchedulerService {
    config: SchedulerConfig,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
}

impl SchedulerService {
    pub fn new(config: SchedulerConfig, state: Arc<CommsState>, shutdown: CancellationToken) -> Self {
        Self { config, state, shutdown }
    }

    async fn thought_delay(&self) -> Duration {
        let confidence = self.state.report().await.confidence;
        if confidence > CALM_BAND.1 || confidence < CALM_BAND.0 {
            self.config.agitated_thought_delay
        } else {
            self.config.thought_delay
        }
    }

    /// Run until shutdown.
    ///
    /// User activity re-arms both timers. A finished dream re-arms only the
    /// dream timer, and thoughts re-arm only the thought timer.
    pub async fn run(self) {
        let mut activity = self.state.subscribe_activity();
        let mut dreams = self.state.subscribe_dreams();

        let mut thought_at = Instant::now() + self.thought_delay().await;
        let mut dream_at = Instant::now() + self.config.dream_delay;

        info!("scheduler running");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("scheduler shutting down");
                    break;
                }

                changed = activity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    thought_at = Instant::now() + self.thought_delay().await;
                    dream_at = Instant::now() + self.config.dream_delay;
                    debug!("scheduler: user activity, timers re-armed");
                }

                changed = dreams.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    dream_at = Instant::now() + self.config.dream_delay;
                }

                _ = sleep_until(thought_at) => {
                    debug!("scheduler: unprompted thought due");
                    self.state.think().await;
                    thought_at = Instant::now() + self.thought_delay().await;
                }

                _ = sleep_until(dream_at) => {
                    debug!("scheduler: dream due");
                    self.state.dream().await;
                    dream_at = Instant::now() + self.config.dream_delay;
                }
            }
        }
    }
}
