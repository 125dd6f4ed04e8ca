//! Continue controller
//!
//! Re-attaches to a previously dispatched invocation by its stored marker.
//! The first emission repeats a few trailing lines as context, so the caller
//! can line the resumed stream up with what it saw before the timeout.

use tracing::{info, warn};

use muxexec_utils::{MuxexecError, Result};

use crate::extract::extract;
use crate::session::SessionId;
use crate::snapshot::Snapshot;
use crate::store::InvocationRecord;
use crate::stream::{StreamController, StreamSettings};

/// Absolute line a resumed watch starts emitting from
pub fn seed_line(available: usize, context_lines: usize) -> usize {
    available.saturating_sub(context_lines)
}

/// Build a controller for `record` measured against `snapshot`
///
/// The same snapshot should then be fed to the controller first. Fails with
/// `MarkerNotFound` when the marker is no longer in the pane.
pub fn prepare(
    session: &SessionId,
    record: &InvocationRecord,
    snapshot: &Snapshot,
    settings: StreamSettings,
    context_lines: usize,
) -> Result<StreamController> {
    let invocation = record.invocation();
    let rule = invocation.extract_rule(settings.prompt_lines);
    let extraction = extract(&snapshot.text, &invocation.marker, rule, snapshot.idle);
    if !extraction.marker_found {
        return Err(MuxexecError::MarkerNotFound {
            session: session.to_string(),
        });
    }

    let available = extraction.lines.len();
    let seed = seed_line(available, context_lines);
    if seed > record.printed_lines {
        warn!(
            session = %session,
            marker = %invocation.marker,
            skipped = seed - record.printed_lines,
            "Resuming past lines that were never shown"
        );
    }

    info!(
        session = %session,
        marker = %invocation.marker,
        lines = available,
        seed = seed,
        "Resuming watch"
    );
    Ok(StreamController::resume_at(&invocation, settings, seed))
}
