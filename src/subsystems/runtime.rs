//! Shared scaffolding for long-running subsystems.
//!
//! # Component model
//!
//! A [`Component`] is an independently-runnable unit owned by a subsystem:
//! a comms channel (PTY, HTTP) or the idle scheduler. The subsystem builds
//! components with their shared state already captured inside them, then
//! hands them to [`spawn_components`].
//!
//! Any component error cancels the shared [`CancellationToken`] so sibling
//! components and `main` shut down together.

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::AppError;

// ── Component ─────────────────────────────────────────────────────────────────

/// A boxed, owned future returned by [`Component::run`].
pub type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A self-contained, concurrently-runnable unit owned by a subsystem.
///
/// Implementors capture all shared state (`Arc<CommsState>`, …) at
/// construction time. [`Component::run`] is called once by
/// [`spawn_components`] and should run until `shutdown` is cancelled or the
/// component's own work is done.
pub trait Component: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

// ── SubsystemHandle ───────────────────────────────────────────────────────────

/// Handle to a running subsystem task set. `.await` it via [`Self::join`].
pub struct SubsystemHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl SubsystemHandle {
    /// Wrap an existing `JoinHandle`, for subsystems that drive their own task.
    pub fn from_handle(handle: JoinHandle<Result<(), AppError>>) -> Self {
        Self { inner: handle }
    }

    /// Await all components and return the first error, if any.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Comms(format!("subsystem task panicked: {e}"))),
        }
    }
}

// ── spawn_components ──────────────────────────────────────────────────────────

/// Spawn each [`Component`] as its own Tokio task and return a
/// [`SubsystemHandle`] that resolves when all of them have exited.
///
/// If any component returns `Err` or panics, `shutdown` is cancelled and the
/// first error is returned once the rest have drained.
pub fn spawn_components(
    components: Vec<Box<dyn Component>>,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        for component in components {
            let id = component.id().to_string();
            debug!(component = %id, "spawning component");
            set.spawn(component.run(shutdown.clone()));
        }

        let mut first_err: Option<AppError> = None;

        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("component panicked: {e}");
                    shutdown.cancel();
                    first_err
                        .get_or_insert_with(|| AppError::Comms(format!("component panicked: {e}")));
                }
                Ok(Err(e)) => {
                    error!("component error: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });

    SubsystemHandle { inner: handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quick {
        fail: bool,
    }

    impl Component for Quick {
        fn id(&self) -> &str {
            "quick"
        }

        fn run(self: Box<Self>, _shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async move {
                if self.fail { Err(AppError::Comms("boom".into())) } else { Ok(()) }
            })
        }
    }

    struct Waiter;

    impl Component for Waiter {
        fn id(&self) -> &str {
            "waiter"
        }

        fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async move {
                shutdown.cancelled().await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn clean_components_join_ok() {
        let handle = spawn_components(vec![Box::new(Quick { fail: false })], CancellationToken::new());
        assert!(handle.join().await.is_ok());
    }

    #[tokio::test]
    async fn failure_cancels_siblings() {
        let token = CancellationToken::new();
        let handle = spawn_components(
            vec![Box::new(Waiter), Box::new(Quick { fail: true })],
            token.clone(),
        );
        let err = handle.join().await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(token.is_cancelled());
    }
}
