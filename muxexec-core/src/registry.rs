//! Per-session mutual exclusion
//!
//! An invocation holds its session from before the idle check until the watch
//! ends. Inside one process the [`SessionRegistry`] serialises callers; across
//! processes on the same controller host an advisory lock file does the same.
//! Neither covers two different controller hosts driving one remote session.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use fs2::FileExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use muxexec_utils::{ensure_dir, MuxexecError, Result};

use crate::session::SessionId;

/// Advisory lock file for one session
#[derive(Debug)]
pub struct SessionLock {
    file: File,
    path: PathBuf,
}

impl SessionLock {
    /// Take the lock without blocking; `Locked` if another process holds it
    pub fn try_acquire(dir: &Path, session: &SessionId) -> Result<Self> {
        ensure_dir(dir)?;
        let path = dir.join(format!("{}.lock", session.key()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| MuxexecError::FileWrite {
                path: path.clone(),
                source: e,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(session = %session, path = %path.display(), "Session lock acquired");
                Ok(Self { file, path })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Err(MuxexecError::Locked {
                session: session.to_string(),
            }),
            Err(e) => Err(MuxexecError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release session lock");
        }
    }
}

/// Held for the lifetime of one invocation
#[derive(Debug)]
pub struct SessionGuard {
    _local: OwnedMutexGuard<()>,
    _file: Option<SessionLock>,
}

/// Session identity to lock
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Mutex<()>>>,
    lock_dir: Option<PathBuf>,
}

impl SessionRegistry {
    /// In-process exclusion only
    pub fn new() -> Self {
        Self::default()
    }

    /// In-process exclusion plus lock files under `lock_dir`
    pub fn with_lock_dir(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions: DashMap::new(),
            lock_dir: Some(lock_dir.into()),
        }
    }

    /// Claim `session`, failing fast if anyone else holds it
    pub fn try_acquire(&self, session: &SessionId) -> Result<SessionGuard> {
        let mutex = self
            .sessions
            .entry(session.clone())
            .or_default()
            .value()
            .clone();

        let local = mutex.try_lock_owned().map_err(|_| MuxexecError::Busy {
            session: session.to_string(),
        })?;

        let file = match &self.lock_dir {
            Some(dir) => Some(SessionLock::try_acquire(dir, session)?),
            None => None,
        };

        Ok(SessionGuard {
            _local: local,
            _file: file,
        })
    }
}
