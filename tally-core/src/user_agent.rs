//! User-agent composition
//!
//! The collector only sees the user agent, so it carries the host app name,
//! its version and a coarse description of the platform, e.g.
//! `myapp/1.4.0 (X11; Linux 6.8.0; x86_64)`.
//!
//! Only Linux reports a kernel release. macOS and Windows strings stop at
//! `Macintosh; Intel Mac OS X` and `Windows NT; x64` without an OS version,
//! since reading one there needs platform APIs this crate does not link.

use std::fmt;

use crate::config::{DispatchConfig, APP_NAME};

/// User-agent header value sent with every event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgent(String);

impl UserAgent {
    /// Compose `app[/version] (platform)`
    ///
    /// When `app` is this library's own name and no version is given, the
    /// library version is used.
    pub fn for_app(app: &str, version: Option<&str>) -> Self {
        let version = match version {
            Some(v) => Some(v),
            None if app == APP_NAME => Some(env!("CARGO_PKG_VERSION")),
            None => None,
        };

        let mut agent = app.to_string();
        if let Some(version) = version {
            agent.push('/');
            agent.push_str(version);
        }
        agent.push_str(" (");
        agent.push_str(&platform());
        agent.push(')');

        tracing::debug!(user_agent = %agent, "Composed user agent");
        Self(agent)
    }

    /// Use a complete user-agent string verbatim
    pub fn raw(agent: impl Into<String>) -> Self {
        Self(agent.into())
    }

    /// Build from dispatch configuration; `user_agent` wins over `app_name`
    pub fn from_config(config: &DispatchConfig) -> Self {
        match &config.user_agent {
            Some(raw) => Self::raw(raw.clone()),
            None => Self::for_app(&config.app_name, config.app_version.as_deref()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserAgent {
    fn default() -> Self {
        Self::for_app(APP_NAME, None)
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse OS/version/architecture description
fn platform() -> String {
    platform_for(std::env::consts::OS, std::env::consts::ARCH, kernel_release)
}

fn platform_for(os: &str, arch: &str, kernel_release: fn() -> Option<String>) -> String {
    match os {
        "macos" => "Macintosh; Intel Mac OS X".to_string(),
        "windows" => {
            let arch = if arch == "x86_64" || arch == "aarch64" {
                "x64"
            } else {
                "x86"
            };
            format!("Windows NT; {}", arch)
        }
        "linux" => match kernel_release() {
            Some(release) => format!("X11; Linux {}; {}", release, arch),
            None => format!("X11; Linux; {}", arch),
        },
        other => format!("{}; {}", other, arch),
    }
}

/// Kernel release without the distribution suffix (`6.8.0-45-generic` → `6.8.0`)
fn kernel_release() -> Option<String> {
    let release = std::fs::read_to_string("/proc/sys/kernel/osrelease").ok()?;
    let release = release.trim();
    let base = release.split(['-', '+']).next().unwrap_or(release);
    (!base.is_empty()).then(|| base.to_string())
}
