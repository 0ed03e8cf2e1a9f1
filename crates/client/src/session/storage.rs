// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session persistence: a single JSON record under a fixed location.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::session::UserProfile;

/// Persisted session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// Durable key-value slot holding the session record.
///
/// Implementations report failures; the session logs them and keeps going
/// with its in-memory state.
pub trait SessionStorage: Send + Sync {
    /// Read the record. `Ok(None)` means nothing was stored.
    fn load(&self) -> anyhow::Result<Option<PersistedSession>>;
    fn save(&self, record: &PersistedSession) -> anyhow::Result<()>;
    /// Remove the record. Removing an absent record succeeds.
    fn clear(&self) -> anyhow::Result<()>;
}

/// JSON file storage with atomic writes (write tmp + rename).
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> anyhow::Result<Option<PersistedSession>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: PersistedSession = serde_json::from_str(&contents)?;
        Ok(Some(record))
    }

    /// Uses a unique temp filename (PID + counter) so concurrent saves never
    /// share a `.tmp` file.
    fn save(&self, record: &PersistedSession) -> anyhow::Result<()> {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(record)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        write_private(&tmp_path, json.as_bytes())?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `bytes` to a new file readable only by the owner: the record holds
/// bearer credentials.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// In-process storage. Holds the raw serialized record so tests can plant
/// corrupt data.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    raw: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with a raw (possibly malformed) record.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self { raw: Mutex::new(Some(raw.into())), fail_writes: AtomicBool::new(false) }
    }

    /// Make every subsequent `save`/`clear` fail (e.g. quota exceeded).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// The raw record currently stored.
    pub fn raw(&self) -> Option<String> {
        self.raw.lock().clone()
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            anyhow::bail!("storage unavailable");
        }
        Ok(())
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> anyhow::Result<Option<PersistedSession>> {
        match self.raw.lock().as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, record: &PersistedSession) -> anyhow::Result<()> {
        self.check_writable()?;
        let json = serde_json::to_string(record)?;
        *self.raw.lock() = Some(json);
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.check_writable()?;
        *self.raw.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
