//! Event dispatcher
//!
//! Resolves the installation identity, builds the payload and sends it
//! either inline or on a background task pool owned by the dispatcher.
//! Network failures are absorbed here and never reach the caller; only
//! identity-store errors do.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Handle, Runtime};
use tokio_util::task::TaskTracker;

use crate::config::DispatchConfig;
use crate::error::{Result, TransportError};
use crate::identity::IdentityStore;
use crate::user_agent::UserAgent;

use super::client::CollectorClient;
use super::event::{DispatchMode, Event, EventPayload};

/// What happened to a tracked event, as far as the caller can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Tracking is disabled or no uid is available; nothing was sent
    Skipped,
    /// Handed to a background task; the result is not observable
    Detached,
    /// The collector accepted the event
    Delivered { status: u16 },
    /// The send failed or timed out and the event was lost
    Dropped,
}

impl TrackOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, TrackOutcome::Delivered { .. })
    }
}

/// Result of one finished send, passed to the completion hook
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub category: String,
    pub action: String,
    pub result: std::result::Result<u16, TransportError>,
}

/// Callback run after every send completes, on the dispatch pool
pub type CompletionHook = Arc<dyn Fn(&DispatchReport) + Send + Sync>;

/// Sends events to the collector on behalf of the host application
pub struct Dispatcher {
    config: DispatchConfig,
    client: CollectorClient,
    user_agent: UserAgent,
    store: IdentityStore,
    handle: Handle,
    /// Every send spawned on the pool, so exit can wait for them
    tracker: TaskTracker,
    /// Taken on drop to shut the pool down
    runtime: Option<Runtime>,
    on_complete: Option<CompletionHook>,
}

impl Dispatcher {
    /// Create a dispatcher whose user agent comes from `config`
    pub fn new(config: DispatchConfig, store: IdentityStore) -> Result<Self> {
        let user_agent = UserAgent::from_config(&config);
        Self::with_user_agent(config, store, user_agent)
    }

    /// Create a dispatcher with an explicit user agent
    pub fn with_user_agent(
        config: DispatchConfig,
        store: IdentityStore,
        user_agent: UserAgent,
    ) -> Result<Self> {
        let client = CollectorClient::new(&config, &user_agent)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name("tally-dispatch")
            .enable_all()
            .build()?;

        tracing::debug!(
            endpoint = %client.endpoint(),
            user_agent = %user_agent,
            workers = config.worker_threads,
            "Dispatcher started"
        );

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            tracker: TaskTracker::new(),
            config,
            client,
            user_agent,
            store,
            on_complete: None,
        })
    }

    /// Install a hook called with the result of every send
    ///
    /// Detached sends still return [`TrackOutcome::Detached`]; the hook only
    /// lets the host (or a test) observe what happened afterwards.
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DispatchReport) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    /// Track one event
    ///
    /// Returns `Err` only when the identity file cannot be read. Opted-out
    /// installations yield [`TrackOutcome::Skipped`]; network problems yield
    /// [`TrackOutcome::Dropped`] in blocking mode and are invisible in
    /// detached mode.
    pub fn track_event(&self, event: &Event) -> Result<TrackOutcome> {
        let Some(uid) = self.resolve_uid(event)? else {
            tracing::debug!(
                category = %event.category,
                action = %event.action,
                "Tracking disabled, skipping event"
            );
            return Ok(TrackOutcome::Skipped);
        };

        let payload = event.payload(&uid);
        let timeout = self.timeout_for(event);

        match event.mode {
            DispatchMode::Detached => {
                self.spawn_send(payload, timeout, None);
                Ok(TrackOutcome::Detached)
            }
            DispatchMode::Blocking => {
                let (tx, rx) = mpsc::channel();
                self.spawn_send(payload, timeout, Some(tx));
                let result = rx.recv().unwrap_or(Err(TransportError::Aborted));
                Ok(outcome(result))
            }
        }
    }

    /// Track one event from async code, waiting for the collector
    ///
    /// Runs on the caller's runtime. The event's dispatch mode is ignored.
    pub async fn track_event_async(&self, event: &Event) -> Result<TrackOutcome> {
        let Some(uid) = self.resolve_uid(event)? else {
            return Ok(TrackOutcome::Skipped);
        };

        let payload = event.payload(&uid);
        let result = self.client.send(&payload, self.timeout_for(event)).await;
        complete(self.on_complete.as_ref(), &payload, &result);
        Ok(outcome(result))
    }

    /// Wait up to `timeout` for every in-flight send to finish
    ///
    /// Returns true when nothing is left in flight. Blocks the calling
    /// thread; sends keep running on the dispatch pool meanwhile. Sends
    /// tracked while the flush waits are waited for as well.
    pub fn flush(&self, timeout: Duration) -> bool {
        if self.tracker.is_empty() {
            return true;
        }

        let (tx, rx) = mpsc::channel();
        let tracker = self.tracker.clone();
        tracker.close();
        self.handle.spawn(async move {
            tracker.wait().await;
            let _ = tx.send(());
        });

        let drained = rx.recv_timeout(timeout).is_ok();
        self.tracker.reopen();

        if !drained {
            tracing::debug!(
                in_flight = self.tracker.len(),
                "Flush timed out, abandoning pending events"
            );
        }
        drained
    }

    /// Number of sends that have not finished yet
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Identity store consulted for events without an explicit uid
    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    pub fn user_agent(&self) -> &UserAgent {
        &self.user_agent
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// An explicit uid bypasses the identity file entirely
    fn resolve_uid(&self, event: &Event) -> Result<Option<String>> {
        match &event.uid {
            Some(uid) => Ok((!uid.is_empty()).then(|| uid.clone())),
            None => self.store.active_uid(),
        }
    }

    fn timeout_for(&self, event: &Event) -> Duration {
        event.timeout.unwrap_or_else(|| self.config.timeout())
    }

    fn spawn_send(
        &self,
        payload: EventPayload,
        timeout: Duration,
        reply: Option<mpsc::Sender<std::result::Result<u16, TransportError>>>,
    ) {
        let client = self.client.clone();
        let hook = self.on_complete.clone();

        self.tracker.spawn_on(
            async move {
                let result = client.send(&payload, timeout).await;
                complete(hook.as_ref(), &payload, &result);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            },
            &self.handle,
        );
    }
}

impl Drop for Dispatcher {
    /// In-flight sends get up to the default timeout to finish, unless the
    /// dispatcher is dropped from async code where blocking is not allowed.
    fn drop(&mut self) {
        if Handle::try_current().is_err() {
            self.flush(self.config.timeout());
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn outcome(result: std::result::Result<u16, TransportError>) -> TrackOutcome {
    match result {
        Ok(status) => TrackOutcome::Delivered { status },
        Err(_) => TrackOutcome::Dropped,
    }
}

fn complete(
    hook: Option<&CompletionHook>,
    payload: &EventPayload,
    result: &std::result::Result<u16, TransportError>,
) {
    match result {
        Ok(status) => tracing::debug!(
            category = %payload.category,
            action = %payload.action,
            status = *status,
            "Event delivered"
        ),
        Err(e) => tracing::debug!(
            category = %payload.category,
            action = %payload.action,
            error = %e,
            "Event dropped"
        ),
    }

    if let Some(hook) = hook {
        hook(&DispatchReport {
            category: payload.category.clone(),
            action: payload.action.clone(),
            result: result.clone(),
        });
    }
}
