//! Installation identity
//!
//! A single TOML file (`~/.tally` by default) records who this installation
//! is and whether it wants to be tracked:
//!
//! ```toml
//! [user]
//! uid = "5f0c6a3b9d8e4f2a8c1b7e6d5a4f3e2d"
//! track = true
//! ```
//!
//! The file is created lazily on first access and rewritten whole on every
//! change. First creation is atomic and never clobbers a record another
//! process managed to write first; the loser of such a race adopts the
//! winner's record.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};

/// The persisted `{uid, track}` pair for one installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Opaque installation id, sent as the analytics client id
    pub uid: String,

    /// When false, every dispatch is a no-op
    #[serde(rename = "track", deserialize_with = "deserialize_flag")]
    pub track_enabled: bool,
}

impl IdentityRecord {
    /// A fresh record with a random uid and tracking enabled
    pub fn generate() -> Self {
        Self {
            uid: Uuid::new_v4().simple().to_string(),
            track_enabled: true,
        }
    }

    /// The uid to report, or `None` when the user opted out
    pub fn active_uid(&self) -> Option<&str> {
        self.track_enabled.then_some(self.uid.as_str())
    }
}

#[derive(Serialize, Deserialize)]
struct IdentityFile {
    user: IdentityRecord,
}

/// Hand-edited files may carry `"True"`, `"no"`, `1` and friends
#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Int(1) => Ok(true),
        Flag::Int(0) => Ok(false),
        Flag::Int(n) => Err(de::Error::custom(format!("invalid track flag: {}", n))),
        Flag::Text(text) => parse_flag(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid track flag: {:?}", text))),
    }
}

/// Reads and writes the identity file
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore {
    /// Store backed by the default path, `~/.tally`
    pub fn new() -> Self {
        Self::with_path(Config::identity_path())
    }

    /// Store backed by an explicit file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the persisted record, creating it on first use
    ///
    /// Fails with [`Error::ConfigCorrupt`] when the file exists but cannot be
    /// parsed.
    pub fn load_or_create(&self) -> Result<IdentityRecord> {
        match self.read()? {
            Some(record) => Ok(record),
            None => self.create(),
        }
    }

    /// Set the tracking flag, creating the record if needed
    pub fn set_track_enabled(&self, enabled: bool) -> Result<IdentityRecord> {
        let mut record = self.load_or_create()?;
        record.track_enabled = enabled;
        self.write(&record)?;

        tracing::info!(path = %self.path.display(), enabled, "Updated tracking flag");
        Ok(record)
    }

    /// Permanently stop tracking until [`reset_identity`](Self::reset_identity)
    pub fn opt_out(&self) -> Result<IdentityRecord> {
        self.set_track_enabled(false)
    }

    /// Resume tracking; an installation that is already tracked keeps its uid
    pub fn opt_in(&self) -> Result<IdentityRecord> {
        let record = self.load_or_create()?;
        if record.track_enabled {
            return Ok(record);
        }
        self.reset_identity()
    }

    /// Rotate the uid and re-enable tracking
    ///
    /// The previous file is replaced without being read, so this also
    /// recovers from a corrupt identity file.
    pub fn reset_identity(&self) -> Result<IdentityRecord> {
        let record = IdentityRecord::generate();
        self.write(&record)?;

        tracing::info!(path = %self.path.display(), "Reset installation identity");
        Ok(record)
    }

    /// The uid to report, or `None` when tracking is disabled
    pub fn active_uid(&self) -> Result<Option<String>> {
        let record = self.load_or_create()?;
        Ok(record.active_uid().map(str::to_string))
    }

    fn read(&self) -> Result<Option<IdentityRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(self.corrupt(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let file: IdentityFile = toml::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;
        if file.user.uid.trim().is_empty() {
            return Err(self.corrupt("uid is empty".to_string()));
        }
        Ok(Some(file.user))
    }

    fn create(&self) -> Result<IdentityRecord> {
        let record = IdentityRecord::generate();
        let temp = self.write_temp(&record)?;

        match temp.persist_noclobber(&self.path) {
            Ok(_) => {
                tracing::info!(path = %self.path.display(), "Created installation identity");
                Ok(record)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(
                    path = %self.path.display(),
                    "Identity file appeared concurrently, adopting it"
                );
                self.read()?.ok_or(Error::Io(e.error))
            }
            Err(e) => Err(e.error.into()),
        }
    }

    fn write(&self, record: &IdentityRecord) -> Result<()> {
        let temp = self.write_temp(record)?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn write_temp(&self, record: &IdentityRecord) -> Result<NamedTempFile> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let content = toml::to_string(&IdentityFile {
            user: record.clone(),
        })
        .map_err(|e| Error::Config(format!("failed to serialize identity: {}", e)))?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        Ok(temp)
    }

    fn corrupt(&self, message: String) -> Error {
        Error::ConfigCorrupt {
            path: self.path.clone(),
            message,
        }
    }
}
