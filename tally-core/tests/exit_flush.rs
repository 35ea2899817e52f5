//! Detached events tracked right before a process exits must still reach the
//! collector. The process dispatcher lives in a static and is never dropped,
//! so this runs a fresh copy of the test binary as the exiting host.

mod common;

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tally_core::config::IdentityConfig;
use tally_core::{Config, DispatchConfig, Event, TrackOutcome};
use tempfile::TempDir;

use common::StubCollector;

const ENDPOINT_VAR: &str = "TALLY_EXIT_CHILD_ENDPOINT";
const IDENTITY_VAR: &str = "TALLY_EXIT_CHILD_IDENTITY";

/// Host side: runs only when spawned by the test below
#[test]
fn child_process_tracks_then_exits() {
    let (Ok(endpoint), Ok(identity)) = (std::env::var(ENDPOINT_VAR), std::env::var(IDENTITY_VAR))
    else {
        return;
    };

    let config = Config {
        dispatch: DispatchConfig {
            endpoint,
            timeout_secs: 2.0,
            app_name: "exittest".to_string(),
            ..Default::default()
        },
        identity: IdentityConfig {
            path: Some(PathBuf::from(identity)),
        },
        ..Default::default()
    };
    let guard = tally_core::configure(&config).expect("first configuration must succeed");

    let outcome = tally_core::track_event(&Event::new("UA-1", "cli", "start").uid("U1")).unwrap();
    assert_eq!(outcome, TrackOutcome::Detached);

    // Same as leaving `main` with the guard in scope
    drop(guard);
    assert_eq!(tally_core::dispatcher().unwrap().in_flight(), 0);
}

#[test]
fn test_detached_event_survives_process_exit() {
    let collector = StubCollector::start(200, Duration::from_millis(500));
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let status = Command::new(std::env::current_exe().unwrap())
        .args([
            "--exact",
            "child_process_tracks_then_exits",
            "--test-threads=1",
            "--nocapture",
        ])
        .env(ENDPOINT_VAR, collector.endpoint())
        .env(IDENTITY_VAR, temp_dir.path().join(".tally"))
        .status()
        .expect("failed to run child process");

    assert!(status.success(), "child exited with {}", status);
    let request = collector.next_request();
    assert!(request.body.contains("cid=U1"));
    assert!(request.body.contains("ea=start"));
}
