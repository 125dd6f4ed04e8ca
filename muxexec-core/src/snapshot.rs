//! Atomic (idle, text) snapshots
//!
//! The busy probe, cursor position and capture travel in the same round
//! trip: splitting them would let output committed between the calls be
//! miscounted.

use tokio::time::Instant;
use tracing::trace;

use muxexec_utils::{MuxexecError, Result};

use crate::extract::CapturedText;
use crate::session::SessionId;
use crate::transport::{Primitive, Transport, BUSY_LINE, IDLE_LINE};

/// One captured state of a session
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// No child process under the session's shell
    pub idle: bool,
    /// Full history plus visible area
    pub text: String,
    /// Visible rows below the one holding the cursor
    pub rows_below_cursor: usize,
    /// When the round trip returned
    pub taken_at: Instant,
}

impl Snapshot {
    /// Parse the output of a `[ProbeBusy, CursorPosition, Capture]` batch
    pub fn from_output(raw: &str, taken_at: Instant) -> Result<Self> {
        let (flag, rest) = raw.split_once('\n').unwrap_or((raw, ""));
        let idle = parse_flag(flag)?;
        let (cursor, text) = rest.split_once('\n').unwrap_or((rest, ""));
        let rows_below_cursor = parse_cursor(cursor)?;
        Ok(Self {
            idle,
            text: text.to_string(),
            rows_below_cursor,
            taken_at,
        })
    }

    /// Whether the cursor has moved past the last line of text
    ///
    /// Every row below the cursor is blank, so the cursor's own row is blank
    /// exactly when the capture ends in more blank rows than that. A line
    /// that still holds the cursor may be partially written.
    pub fn cursor_on_blank_row(&self) -> bool {
        CapturedText::parse(&self.text).trailing_blank_rows() > self.rows_below_cursor
    }
}

/// Take one snapshot of `session`
pub async fn take<T: Transport + ?Sized>(transport: &T, session: &SessionId) -> Result<Snapshot> {
    let raw = transport
        .run(
            session,
            &[Primitive::ProbeBusy, Primitive::CursorPosition, Primitive::Capture],
        )
        .await?;
    let snapshot = Snapshot::from_output(&raw, Instant::now())?;
    trace!(session = %session, idle = snapshot.idle, bytes = snapshot.text.len(), "Snapshot");
    Ok(snapshot)
}

/// Whether `session`'s shell currently has a child process
pub async fn probe_busy<T: Transport + ?Sized>(transport: &T, session: &SessionId) -> Result<bool> {
    let raw = transport.run(session, &[Primitive::ProbeBusy]).await?;
    let flag = raw.lines().next().unwrap_or_default();
    parse_flag(flag).map(|idle| !idle)
}

/// `true` for idle
fn parse_flag(line: &str) -> Result<bool> {
    match line.trim() {
        IDLE_LINE => Ok(true),
        BUSY_LINE => Ok(false),
        other => Err(MuxexecError::transport(format!(
            "unexpected busy probe output: {:?}",
            other
        ))),
    }
}

/// Rows below the cursor from `<cursor_y> <pane_height>`
fn parse_cursor(line: &str) -> Result<usize> {
    let invalid = || MuxexecError::transport(format!("unexpected cursor position: {:?}", line));
    let (y, height) = line.trim().split_once(' ').ok_or_else(invalid)?;
    let y: usize = y.parse().map_err(|_| invalid())?;
    let height: usize = height.parse().map_err(|_| invalid())?;
    Ok(height.saturating_sub(y + 1))
}
