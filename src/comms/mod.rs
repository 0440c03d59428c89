//! Comms: the external channels users talk through.
//!
//! Each channel (PTY console, axum HTTP) implements [`Component`] and is
//! spawned by [`start`] via [`spawn_components`]. Channels capture their
//! shared [`Arc<CommsState>`] at construction time.

mod state;
#[cfg(feature = "channel-pty")]
pub mod pty;
#[cfg(feature = "channel-axum")]
pub mod axum_channel;

pub use state::{ActionsView, ChatReply, CommsState, SessionSnapshot};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::runtime::{Component, SubsystemHandle, spawn_components};

/// Spawn all configured channels and return immediately.
///
/// If any channel exits with an error the shared `shutdown` token is
/// cancelled so siblings stop cooperatively.
pub fn start(config: &Config, state: Arc<CommsState>, shutdown: CancellationToken) -> SubsystemHandle {
    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    if config.comms_pty_should_load() {
        info!("loading pty channel");
        components.push(Box::new(pty::PtyChannel::new("pty0", state.clone())));
    }
    #[cfg(not(feature = "channel-pty"))]
    if config.comms_pty_should_load() {
        tracing::warn!("[comms.pty] is enabled but this binary was built without the `channel-pty` feature");
    }

    #[cfg(feature = "channel-axum")]
    if config.comms_axum_should_load() {
        info!(bind = %config.comms.axum_channel.bind, "loading axum channel");
        components.push(Box::new(axum_channel::AxumChannel::new(
            "axum0",
            config.comms.axum_channel.bind.clone(),
            state.clone(),
        )));
    }
    #[cfg(not(feature = "channel-axum"))]
    if config.comms_axum_should_load() {
        tracing::warn!("[comms.axum_channel] is enabled but this binary was built without the `channel-axum` feature");
    }

    spawn_components(components, shutdown)
}
