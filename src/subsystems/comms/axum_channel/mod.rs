//! Axum-based HTTP channel exposing the mind as a JSON API.
//!
//! Implements [`Component`] so it slots into the comms subsystem lifecycle:
//! `run()` drives the axum event loop and the shared [`CancellationToken`]
//! is wired to axum's graceful shutdown.
//!
//! ## URL layout
//!
//! ```text
//! GET  /api/health
//! POST /api/message        {"message": "..."}
//! POST /api/thought
//! POST /api/dream
//! GET  /api/dream/latest
//! GET  /api/report
//! GET  /api/messages
//! ```

mod api;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::state::CommsState;
use crate::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};

/// Router state injected into every handler via [`axum::extract::State`].
#[derive(Clone)]
pub(crate) struct AxumState {
    pub channel_id: Arc<str>,
    pub comms: Arc<CommsState>,
}

// ── AxumChannel ───────────────────────────────────────────────────────────────

pub struct AxumChannel {
    channel_id: String,
    bind_addr: String,
    state: Arc<CommsState>,
}

impl AxumChannel {
    pub fn new(
        channel_id: impl Into<String>,
        bind_addr: impl Into<String>,
        state: Arc<CommsState>,
    ) -> Self {
        Self { channel_id: channel_id.into(), bind_addr: bind_addr.into(), state }
    }
}

impl Component for AxumChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_axum(self.channel_id, self.bind_addr, self.state, shutdown))
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

async fn run_axum(
    channel_id: String,
    bind_addr: String,
    comms: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let router = build_router(&channel_id, comms);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("axum bind failed on {bind_addr}: {e}")))?;

    info!(%channel_id, %bind_addr, "axum channel listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("axum server error: {e}")))?;

    info!(%channel_id, "axum channel shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(channel_id: &str, comms: Arc<CommsState>) -> Router {
    let state = AxumState { channel_id: Arc::from(channel_id), comms };
    Router::new()
        .route("/api/health",       get(api::health))
        .route("/api/message",      post(api::message))
        .route("/api/thought",      post(api::thought))
        .route("/api/dream",        post(api::dream))
        .route("/api/dream/latest", get(api::latest_dream))
        .route("/api/report",       get(api::report))
        .route("/api/messages",     get(api::messages))
        .with_state(state)
}
