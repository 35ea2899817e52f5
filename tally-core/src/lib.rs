//! # tally-core
//!
//! Opt-in usage analytics for command-line tools and libraries.
//!
//! This library provides:
//! - A per-installation identity persisted in `~/.tally`
//! - Opt-out, opt-in and identity reset
//! - Best-effort event pings to an analytics collector, sent inline or on a
//!   background pool
//! - Configuration and logging infrastructure
//!
//! Tracking never raises network errors into the host. The only failure a
//! host sees is a corrupt identity file.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tally_core::Event;
//!
//! // Once, at startup; keep the guard until `main` returns so pending
//! // events are not lost on exit
//! let _tally = tally_core::configure_user_agent("myapp", Some("1.4.0"))
//!     .expect("configured twice");
//!
//! // Anywhere; returns immediately
//! tally_core::track_event(&Event::new("UA-12345-6", "cli", "start"))
//!     .expect("identity file is corrupt");
//!
//! // Honour a user's `--no-telemetry`
//! tally_core::opt_out().expect("failed to write identity file");
//! ```

// Re-export commonly used items at the crate root
pub use config::{Config, DispatchConfig};
pub use dispatch::{DispatchMode, DispatchReport, Dispatcher, Event, TrackOutcome};
pub use error::{Error, Result, TransportError};
pub use global::{
    configure, configure_user_agent, configure_user_agent_raw, dispatcher, flush, opt_in,
    opt_out, reset_identity, track_event, DispatchGuard,
};
pub use identity::{IdentityRecord, IdentityStore};
pub use user_agent::UserAgent;

// Public modules
pub mod config;
pub mod dispatch;
pub mod error;
pub mod global;
pub mod identity;
pub mod logging;
pub mod user_agent;
