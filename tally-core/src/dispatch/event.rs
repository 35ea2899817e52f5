//! Events and their wire payload
//!
//! An [`Event`] is what the host describes; an [`EventPayload`] is the fixed
//! form-encoded field set the collector receives:
//!
//! | field | meaning                          |
//! |-------|----------------------------------|
//! | `v`   | protocol version, always `1`     |
//! | `tid` | tracking destination id          |
//! | `cid` | client id (installation uid)     |
//! | `t`   | hit type, always `event`         |
//! | `ec`  | event category                   |
//! | `ea`  | event action                     |
//! | `el`  | event label (omitted when unset) |
//! | `ev`  | event value                      |
//! | `av`  | app version (omitted when unset) |

use std::time::Duration;

use serde::Serialize;

/// Protocol version understood by the collector
pub const PROTOCOL_VERSION: &str = "1";

/// Hit type for every payload this crate sends
pub const HIT_TYPE_EVENT: &str = "event";

/// How the dispatcher sends an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Hand the send to a background task and return immediately
    #[default]
    Detached,
    /// Send inline and report whether the collector accepted it
    Blocking,
}

/// One usage event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub tracking_id: String,
    pub category: String,
    pub action: String,
    pub label: Option<String>,
    pub value: i64,
    /// Version of the host software, reported as the app version
    pub software_version: Option<String>,
    /// Explicit client id; when set the identity file is not consulted
    pub uid: Option<String>,
    /// Per-event timeout; the dispatcher default applies when unset
    pub timeout: Option<Duration>,
    pub mode: DispatchMode,
}

impl Event {
    pub fn new(
        tracking_id: impl Into<String>,
        category: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            tracking_id: tracking_id.into(),
            category: category.into(),
            action: action.into(),
            label: None,
            value: 0,
            software_version: None,
            uid: None,
            timeout: None,
            mode: DispatchMode::default(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    pub fn software_version(mut self, version: impl Into<String>) -> Self {
        self.software_version = Some(version.into());
        self
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `mode(DispatchMode::Blocking)`
    pub fn blocking(self) -> Self {
        self.mode(DispatchMode::Blocking)
    }

    /// Build the wire payload for this event on behalf of `uid`
    pub fn payload(&self, uid: &str) -> EventPayload {
        EventPayload {
            protocol_version: PROTOCOL_VERSION.to_string(),
            tracking_id: self.tracking_id.clone(),
            client_id: uid.to_string(),
            hit_type: HIT_TYPE_EVENT.to_string(),
            category: self.category.clone(),
            action: self.action.clone(),
            label: self.label.clone(),
            value: self.value,
            app_version: self.software_version.clone(),
        }
    }
}

/// Form body POSTed to the collector
///
/// Field order is the order on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventPayload {
    #[serde(rename = "v")]
    pub protocol_version: String,
    #[serde(rename = "tid")]
    pub tracking_id: String,
    #[serde(rename = "cid")]
    pub client_id: String,
    #[serde(rename = "t")]
    pub hit_type: String,
    #[serde(rename = "ec")]
    pub category: String,
    #[serde(rename = "ea")]
    pub action: String,
    #[serde(rename = "el", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "ev")]
    pub value: i64,
    #[serde(rename = "av", skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}
