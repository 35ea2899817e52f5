//! Process-wide entry points
//!
//! Most hosts want one dispatcher for the whole process. It is created on
//! first use with default settings, or explicitly and exactly once through
//! [`configure`], [`configure_user_agent`] or [`configure_user_agent_raw`]
//! at startup. Configuring after the dispatcher exists returns
//! [`Error::AlreadyConfigured`].
//!
//! The process dispatcher is never dropped, so detached sends still in flight
//! when `main` returns would die with the process. Keep the [`DispatchGuard`]
//! returned by the `configure*` functions alive until the end of `main`, or
//! call [`flush`] before exiting.

use std::sync::OnceLock;
use std::time::Duration;

use crate::config::Config;
use crate::dispatch::{Dispatcher, Event, TrackOutcome};
use crate::error::{Error, Result};
use crate::identity::{IdentityRecord, IdentityStore};
use crate::user_agent::UserAgent;

static DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();

/// Waits for in-flight sends of the process dispatcher when dropped
///
/// Each send gets at most the configured default timeout.
#[must_use = "pending events are only waited for while the guard is alive"]
pub struct DispatchGuard {
    dispatcher: &'static Dispatcher,
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        self.dispatcher.flush(self.dispatcher.config().timeout());
    }
}

/// Install the process dispatcher from a full configuration
pub fn configure(config: &Config) -> Result<DispatchGuard> {
    if DISPATCHER.get().is_some() {
        return Err(Error::AlreadyConfigured);
    }
    let store = IdentityStore::with_path(config.identity.resolved_path());
    install(Dispatcher::new(config.dispatch.clone(), store)?)
}

/// Install the process dispatcher with a user agent composed from
/// `app`, `version` and the current platform
pub fn configure_user_agent(app: &str, version: Option<&str>) -> Result<DispatchGuard> {
    install_with_user_agent(UserAgent::for_app(app, version))
}

/// Install the process dispatcher with a complete user-agent string
pub fn configure_user_agent_raw(agent: &str) -> Result<DispatchGuard> {
    install_with_user_agent(UserAgent::raw(agent))
}

/// Wait up to `timeout` for detached sends of the process dispatcher
///
/// Returns true when nothing is left in flight, including when no
/// dispatcher was ever created.
pub fn flush(timeout: Duration) -> bool {
    DISPATCHER
        .get()
        .map_or(true, |dispatcher| dispatcher.flush(timeout))
}

/// The process dispatcher, created with defaults if nothing was configured
pub fn dispatcher() -> Result<&'static Dispatcher> {
    if let Some(dispatcher) = DISPATCHER.get() {
        return Ok(dispatcher);
    }

    let dispatcher = Dispatcher::new(Default::default(), IdentityStore::new())?;
    Ok(DISPATCHER.get_or_init(move || dispatcher))
}

/// Track an event with the process dispatcher
pub fn track_event(event: &Event) -> Result<TrackOutcome> {
    dispatcher()?.track_event(event)
}

/// Permanently opt this installation out of tracking
pub fn opt_out() -> Result<IdentityRecord> {
    identity_store().opt_out()
}

/// Opt back in; keeps the current uid if tracking is already enabled
pub fn opt_in() -> Result<IdentityRecord> {
    identity_store().opt_in()
}

/// Rotate the installation uid and re-enable tracking
pub fn reset_identity() -> Result<IdentityRecord> {
    identity_store().reset_identity()
}

fn install_with_user_agent(user_agent: UserAgent) -> Result<DispatchGuard> {
    if DISPATCHER.get().is_some() {
        return Err(Error::AlreadyConfigured);
    }
    install(Dispatcher::with_user_agent(
        Default::default(),
        IdentityStore::new(),
        user_agent,
    )?)
}

fn install(dispatcher: Dispatcher) -> Result<DispatchGuard> {
    DISPATCHER
        .set(dispatcher)
        .map_err(|_| Error::AlreadyConfigured)?;
    let dispatcher = DISPATCHER.get().ok_or(Error::AlreadyConfigured)?;
    Ok(DispatchGuard { dispatcher })
}

/// Identity operations do not need a dispatcher; use its store when one exists
fn identity_store() -> IdentityStore {
    DISPATCHER
        .get()
        .map(|dispatcher| dispatcher.store().clone())
        .unwrap_or_default()
}
