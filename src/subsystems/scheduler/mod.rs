//! Scheduler subsystem: unprompted thoughts and dreams while the user is idle.
//!
//! A single [`SchedulerComponent`] drives [`service::SchedulerService`]. It
//! only talks to the mind through [`CommsState`], so its thoughts and dream
//! notices reach every channel the same way a `/think` would.

pub mod service;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::SchedulerConfig;
use crate::subsystems::comms::CommsState;
use crate::subsystems::runtime::{Component, ComponentFuture, SubsystemHandle, spawn_components};

pub struct SchedulerComponent {
    config: SchedulerConfig,
    state: Arc<CommsState>,
}

impl SchedulerComponent {
    pub fn new(config: SchedulerConfig, state: Arc<CommsState>) -> Self {
        Self { config, state }
    }
}

impl Component for SchedulerComponent {
    fn id(&self) -> &str {
        "scheduler"
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(async move {
            service::SchedulerService::new(self.config, self.state, shutdown).run().await;
            Ok(())
        })
    }
}

/// Spawn the scheduler when enabled. Returns `None` when disabled.
pub fn start(
    config: &SchedulerConfig,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Option<SubsystemHandle> {
    if !config.enabled {
        info!("scheduler disabled");
        return None;
    }
    info!(
        thought_secs = config.thought_delay.as_secs(),
        dream_secs = config.dream_delay.as_secs(),
        "starting scheduler"
    );
    Some(spawn_components(
        vec![Box::new(SchedulerComponent::new(config.clone(), state))],
        shutdown,
    ))
}
