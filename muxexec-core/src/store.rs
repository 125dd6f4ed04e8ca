//! Last-invocation records, one JSON file per session
//!
//! Continue mode takes only a session, so the marker of the invocation it
//! resumes has to outlive the process that dispatched it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use muxexec_utils::{ensure_dir, MuxexecError, Result};

use crate::invocation::{Invocation, InvocationKind};
use crate::session::SessionId;
use crate::stream::Status;

/// What is remembered about a session's most recent invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub session: SessionId,
    pub marker: String,
    pub kind: InvocationKind,
    pub command: String,
    pub dispatched_at: DateTime<Utc>,
    #[serde(default)]
    pub last_watched_at: Option<DateTime<Utc>>,
    /// Absolute output lines shown by the most recent watch
    #[serde(default)]
    pub printed_lines: usize,
    #[serde(default)]
    pub last_status: Option<Status>,
}

impl InvocationRecord {
    /// Record for a just-dispatched invocation
    pub fn dispatched(session: &SessionId, invocation: &Invocation) -> Self {
        Self {
            session: session.clone(),
            marker: invocation.marker.clone(),
            kind: invocation.kind,
            command: invocation.command.clone(),
            dispatched_at: Utc::now(),
            last_watched_at: None,
            printed_lines: 0,
            last_status: None,
        }
    }

    pub fn invocation(&self) -> Invocation {
        Invocation::resumed(self.marker.clone(), self.kind, self.command.clone())
    }
}

/// Directory of invocation records
#[derive(Debug, Clone)]
pub struct InvocationStore {
    dir: PathBuf,
}

impl InvocationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.json", session.key()))
    }

    /// Write `record`, replacing any previous one for its session
    pub fn save(&self, record: &InvocationRecord) -> Result<()> {
        ensure_dir(&self.dir)?;
        let path = self.path_for(&record.session);
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| MuxexecError::persistence(format!("Failed to encode record: {}", e)))?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path).map_err(|e| MuxexecError::FileWrite {
                path: temp_path.clone(),
                source: e,
            })?;
            file.write_all(&json)
                .and_then(|_| file.sync_all())
                .map_err(|e| MuxexecError::FileWrite {
                    path: temp_path.clone(),
                    source: e,
                })?;
        }
        fs::rename(&temp_path, &path).map_err(|e| MuxexecError::FileWrite {
            path: path.clone(),
            source: e,
        })?;

        debug!(session = %record.session, path = %path.display(), "Saved invocation record");
        Ok(())
    }

    /// The most recent record for `session`, if any
    ///
    /// A record that no longer parses is treated as missing.
    pub fn load(&self, session: &SessionId) -> Result<Option<InvocationRecord>> {
        let path = self.path_for(session);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(MuxexecError::FileRead { path, source: e }),
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable invocation record");
                Ok(None)
            }
        }
    }

    /// Remember how the latest watch of `session` ended
    pub fn record_watch(&self, session: &SessionId, printed_lines: usize, status: Status) -> Result<()> {
        let Some(mut record) = self.load(session)? else {
            return Err(MuxexecError::NoInvocation {
                session: session.to_string(),
            });
        };
        record.printed_lines = printed_lines;
        record.last_status = Some(status);
        record.last_watched_at = Some(Utc::now());
        self.save(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, InvocationStore, SessionId) {
        let dir = TempDir::new().unwrap();
        let store = InvocationStore::new(dir.path().join("invocations"));
        (dir, store, SessionId::remote("build-box", "ci").unwrap())
    }

    #[test]
    fn test_load_missing_is_none() {
        let (_dir, store, session) = setup();
        assert!(store.load(&session).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let (_dir, store, session) = setup();
        let inv = Invocation::new("make test\nmake lint").unwrap();
        let record = InvocationRecord::dispatched(&session, &inv);
        store.save(&record).unwrap();

        let loaded = store.load(&session).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.invocation(), inv);
    }

    #[test]
    fn test_save_replaces_previous() {
        let (_dir, store, session) = setup();
        let first = Invocation::new("ls").unwrap();
        let second = Invocation::new("pwd").unwrap();
        store.save(&InvocationRecord::dispatched(&session, &first)).unwrap();
        store.save(&InvocationRecord::dispatched(&session, &second)).unwrap();
        assert_eq!(store.load(&session).unwrap().unwrap().marker, second.marker);
        // No temp file left behind
        let entries = fs::read_dir(store.dir()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_record_watch_updates_progress() {
        let (_dir, store, session) = setup();
        let inv = Invocation::new("sleep 100").unwrap();
        store.save(&InvocationRecord::dispatched(&session, &inv)).unwrap();

        store.record_watch(&session, 16, Status::TimedOut).unwrap();
        let record = store.load(&session).unwrap().unwrap();
        assert_eq!(record.printed_lines, 16);
        assert_eq!(record.last_status, Some(Status::TimedOut));
        assert!(record.last_watched_at.is_some());
    }

    #[test]
    fn test_record_watch_without_record() {
        let (_dir, store, session) = setup();
        let err = store.record_watch(&session, 1, Status::Completed).unwrap_err();
        assert!(matches!(err, MuxexecError::NoInvocation { .. }));
    }

    #[test]
    fn test_corrupt_record_is_ignored() {
        let (_dir, store, session) = setup();
        ensure_dir(store.dir()).unwrap();
        fs::write(store.dir().join(format!("{}.json", session.key())), b"{not json").unwrap();
        assert!(store.load(&session).unwrap().is_none());
    }

    #[test]
    fn test_sessions_do_not_share_records() {
        let (_dir, store, session) = setup();
        let other = SessionId::local("ci").unwrap();
        let inv = Invocation::new("ls").unwrap();
        store.save(&InvocationRecord::dispatched(&session, &inv)).unwrap();
        assert!(store.load(&other).unwrap().is_none());
        assert!(store.load(&session).unwrap().is_some());
    }
}
