//! Event dispatch to the analytics collector
//!
//! Telemetry must never get in the host application's way:
//! - Events are sent best-effort, with no retries, batching or queuing
//! - Detached sends run on a background pool and report nothing back
//! - Transport failures are swallowed and at most logged at debug level
//! - Opted-out installations never touch the network
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tally_core::{DispatchConfig, Dispatcher, Event, IdentityStore};
//!
//! let dispatcher = Dispatcher::new(DispatchConfig::default(), IdentityStore::new())
//!     .expect("failed to start dispatcher");
//!
//! // Fire and forget
//! dispatcher
//!     .track_event(&Event::new("UA-12345-6", "cli", "start").software_version("1.4.0"))
//!     .expect("identity file is corrupt");
//! ```

mod client;
mod dispatcher;
mod event;

pub use client::CollectorClient;
pub use dispatcher::{CompletionHook, DispatchReport, Dispatcher, TrackOutcome};
pub use event::{DispatchMode, Event, EventPayload, HIT_TYPE_EVENT, PROTOCOL_VERSION};
