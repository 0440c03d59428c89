//! Component runtime: spawns independently-runnable units (comms channels)
//! and ties their lifetimes to one shutdown token.
//!
//! A [`Component`] captures its shared state at construction and exposes a
//! single `run` future. [`spawn_components`] runs them concurrently; the
//! first component error cancels the token so siblings stop too, and the
//! returned [`SubsystemHandle`] resolves to that error.

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::AppError;

// ── Component ─────────────────────────────────────────────────────────────────

pub type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

pub trait Component: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    /// Run until `shutdown` is cancelled or the component's work is done.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

// ── SubsystemHandle ───────────────────────────────────────────────────────────

pub struct SubsystemHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl SubsystemHandle {
    /// Await all components and return the first error, if any.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Comms(format!("component supervisor panicked: {e}"))),
        }
    }
}

// ── spawn_components ──────────────────────────────────────────────────────────

pub fn spawn_components(components: Vec<Box<dyn Component>>, shutdown: CancellationToken) -> SubsystemHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        if components.is_empty() {
            info!("no components configured; waiting for shutdown");
            shutdown.cancelled().await;
            return Ok(());
        }

        for component in components {
            debug!(component = %component.id(), "spawning component");
            set.spawn(component.run(shutdown.clone()));
        }

        let mut first_err: Option<AppError> = None;
        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("component panicked: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert_with(|| AppError::Comms(format!("component panicked: {e}")));
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
