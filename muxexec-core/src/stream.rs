//! Stream controller
//!
//! A pure state machine fed one snapshot at a time. Each [`Tick`] says what
//! to emit and when the next snapshot is due, so the controller itself never
//! sleeps; [`drive`] is the async loop that takes snapshots and honours the
//! schedule.
//!
//! ```text
//! Streaming --idle + output after marker--> Flushing --grace snapshot--> Done(Completed)
//! Streaming --poll budget spent-----------> Done(TimedOut)
//! Streaming --marker missing too long-----> Done(Degraded)
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use muxexec_utils::Result;

use crate::config::AppConfig;
use crate::extract::{extract, render_lines, ExtractRule};
use crate::invocation::Invocation;
use crate::peek::degraded_output;
use crate::sentinel::{self, push_line};
use crate::session::SessionId;
use crate::sink::OutputSink;
use crate::snapshot::{self, Snapshot};
use crate::transport::Transport;
use crate::truncate::{Budget, Truncator};

/// How a watch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The shell returned to its prompt and all output was collected
    Completed,
    /// The watch window elapsed; the command is presumed still running
    TimedOut,
    /// The session was occupied; nothing was dispatched
    Busy,
    /// The marker was lost; a tail of the pane was shown instead
    Degraded,
}

impl Status {
    /// Process exit code for this status
    ///
    /// A timeout is distinct from both success and failure so that callers
    /// can tell "still running" apart from "could not run".
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::TimedOut => 124,
            Self::Busy => 2,
            Self::Degraded => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Busy => "busy",
            Self::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing and budget for one watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub poll_interval: Duration,
    pub flush_grace: Duration,
    pub timeout: Duration,
    pub prompt_lines: usize,
    pub marker_grace_polls: u32,
    pub budget: Budget,
    pub degraded_tail_chars: usize,
}

impl StreamSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.general.poll_interval(),
            flush_grace: config.general.flush_grace(),
            timeout: config.general.timeout(),
            prompt_lines: config.general.prompt_lines,
            marker_grace_polls: config.general.marker_grace_polls,
            budget: Budget::new(config.truncation.head_chars, config.truncation.tail_chars),
            degraded_tail_chars: config.truncation.degraded_tail_chars,
        }
    }

    /// Polls allowed before giving up: `ceil(timeout / interval)`, at least one
    pub fn max_polls(&self) -> u32 {
        let interval = self.poll_interval.as_millis().max(1);
        let polls = self.timeout.as_millis().div_ceil(interval);
        u32::try_from(polls).unwrap_or(u32::MAX).max(1)
    }

    /// Characters of pane tail shown in degraded mode
    pub fn degraded_limit(&self) -> usize {
        if self.budget.is_disabled() {
            self.degraded_tail_chars
        } else {
            self.budget.total()
        }
    }
}

/// What the driver should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Take the next snapshot at this instant
    PollAt(Instant),
    /// The watch is over
    Finished(Status),
}

/// Result of feeding one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub emit: String,
    pub next: Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    Flushing,
    Done(Status),
}

/// Incremental extraction state for one invocation
#[derive(Debug)]
pub struct StreamController {
    marker: String,
    rule: ExtractRule,
    settings: StreamSettings,
    truncator: Truncator,
    phase: Phase,
    /// First output line this watch is responsible for
    base_line: usize,
    /// Absolute count of output lines already handed to the truncator
    printed_lines: usize,
    /// Output lines from the most recent snapshot that had the marker
    latest: Vec<String>,
    polls: u32,
    max_polls: u32,
    missing_polls: u32,
    at_line_start: bool,
    emitted: String,
}

impl StreamController {
    /// Watch a freshly dispatched invocation from its first output line
    pub fn new(invocation: &Invocation, settings: StreamSettings) -> Self {
        Self::resume_at(invocation, settings, 0)
    }

    /// Watch an invocation whose output before `base_line` was already shown
    pub fn resume_at(invocation: &Invocation, settings: StreamSettings, base_line: usize) -> Self {
        Self {
            marker: invocation.marker.clone(),
            rule: invocation.extract_rule(settings.prompt_lines),
            truncator: Truncator::new(settings.budget),
            max_polls: settings.max_polls(),
            settings,
            phase: Phase::Streaming,
            base_line,
            printed_lines: base_line,
            latest: Vec::new(),
            polls: 0,
            missing_polls: 0,
            at_line_start: true,
            emitted: String::new(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Absolute number of output lines shown, context lines included
    pub fn printed_lines(&self) -> usize {
        self.printed_lines
    }

    /// Everything emitted so far
    pub fn output(&self) -> &str {
        &self.emitted
    }

    pub fn status(&self) -> Option<Status> {
        match self.phase {
            Phase::Done(status) => Some(status),
            _ => None,
        }
    }

    /// Advance on one snapshot
    pub fn on_snapshot(&mut self, snapshot: &Snapshot) -> Tick {
        let mut out = String::new();
        let next = match self.phase {
            Phase::Streaming => {
                self.polls += 1;
                self.stream(snapshot, &mut out)
            }
            Phase::Flushing => {
                self.polls += 1;
                self.flush(snapshot, &mut out)
            }
            Phase::Done(status) => Next::Finished(status),
        };
        self.emitted.push_str(&out);
        Tick { emit: out, next }
    }

    fn stream(&mut self, snapshot: &Snapshot, out: &mut String) -> Next {
        let extraction = extract(&snapshot.text, &self.marker, self.rule, snapshot.idle);

        if !extraction.marker_found {
            // Only an idle shell has finished writing over the marker
            if snapshot.idle {
                self.missing_polls += 1;
            }
            debug!(marker = %self.marker, missing = self.missing_polls, idle = snapshot.idle, "Marker not in capture");
            if self.missing_polls >= self.settings.marker_grace_polls {
                return self.degrade(snapshot, out);
            }
            return self.schedule_or_timeout(snapshot, out);
        }
        self.missing_polls = 0;
        self.latest = extraction.lines;

        // Idle before anything follows the echoed input means the shell has not
        // read the line yet, or ran a builtin that has not printed its prompt
        let complete = snapshot.idle && extraction.after_marker > self.rule.skip_top;

        // While busy a last line still holding the cursor may grow
        let visible = if snapshot.idle || snapshot.cursor_on_blank_row() {
            self.latest.len()
        } else {
            self.latest.len().saturating_sub(1)
        };
        self.emit_lines_through(visible, out);

        if complete {
            info!(marker = %self.marker, polls = self.polls, lines = self.printed_lines, "Session idle, flushing");
            self.phase = Phase::Flushing;
            return Next::PollAt(snapshot.taken_at + self.settings.flush_grace);
        }
        self.schedule_or_timeout(snapshot, out)
    }

    fn flush(&mut self, snapshot: &Snapshot, out: &mut String) -> Next {
        let extraction = extract(&snapshot.text, &self.marker, self.rule, true);
        if extraction.marker_found {
            self.latest = extraction.lines;
        } else {
            warn!(marker = %self.marker, "Marker evicted during flush, using previous capture");
        }
        self.finish_output(out);
        self.finish(Status::Completed)
    }

    fn schedule_or_timeout(&mut self, snapshot: &Snapshot, out: &mut String) -> Next {
        if self.polls < self.max_polls {
            return Next::PollAt(snapshot.taken_at + self.settings.poll_interval);
        }

        self.finish_output(out);
        let at_line_start = self.line_start(out);
        push_line(out, at_line_start, &sentinel::timeout(self.settings.timeout));
        self.at_line_start = true;
        info!(marker = %self.marker, polls = self.polls, lines = self.printed_lines, "Watch timed out");
        self.finish(Status::TimedOut)
    }

    fn degrade(&mut self, snapshot: &Snapshot, out: &mut String) -> Next {
        let limit = self.settings.degraded_limit();
        warn!(marker = %self.marker, polls = self.polls, "Marker lost, falling back to pane tail");
        if !self.line_start(out) {
            out.push('\n');
        }
        out.push_str(&degraded_output(
            "marker not found in scrollback",
            &snapshot.text,
            limit,
        ));
        self.at_line_start = true;
        self.finish(Status::Degraded)
    }

    fn emit_lines_through(&mut self, end: usize, out: &mut String) {
        let end = end.min(self.latest.len());
        if end <= self.printed_lines {
            return;
        }
        let chunk = render_lines(&self.latest[self.printed_lines..end]);
        debug!(marker = %self.marker, from = self.printed_lines, to = end, "New output lines");
        self.printed_lines = end;
        let text = self.truncator.push(&chunk);
        self.push_text(&text, out);
    }

    /// Final emission: the remaining output, or the corrected tail
    fn finish_output(&mut self, out: &mut String) {
        let start = self.base_line.min(self.latest.len());
        let full = render_lines(&self.latest[start..]);
        self.printed_lines = self.printed_lines.max(self.latest.len());
        let text = self.truncator.finish(&full);
        self.push_text(&text, out);
    }

    fn push_text(&mut self, text: &str, out: &mut String) {
        if text.is_empty() {
            return;
        }
        out.push_str(text);
        self.at_line_start = text.ends_with('\n');
    }

    fn line_start(&self, out: &str) -> bool {
        if out.is_empty() {
            self.at_line_start
        } else {
            out.ends_with('\n')
        }
    }

    fn finish(&mut self, status: Status) -> Next {
        self.phase = Phase::Done(status);
        Next::Finished(status)
    }
}

/// Run `controller` against `session` until it finishes
///
/// `first` is fed before any new snapshot is taken (resume measures the
/// output with the same snapshot it then streams from).
pub async fn drive<T, S>(
    controller: &mut StreamController,
    transport: &T,
    session: &SessionId,
    sink: &mut S,
    first: Option<Snapshot>,
) -> Result<Status>
where
    T: Transport + ?Sized,
    S: OutputSink + ?Sized,
{
    let mut pending = first;
    loop {
        let snap = match pending.take() {
            Some(snap) => snap,
            None => snapshot::take(transport, session).await?,
        };

        let tick = controller.on_snapshot(&snap);
        if !tick.emit.is_empty() {
            sink.emit(&tick.emit)?;
        }

        match tick.next {
            Next::PollAt(at) => tokio::time::sleep_until(at).await,
            Next::Finished(status) => return Ok(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel::TRUNCATED;

    const INTERVAL: Duration = Duration::from_millis(200);

    fn settings() -> StreamSettings {
        StreamSettings {
            poll_interval: INTERVAL,
            flush_grace: Duration::from_millis(300),
            timeout: Duration::from_secs(1),
            prompt_lines: 1,
            marker_grace_polls: 3,
            budget: Budget::disabled(),
            degraded_tail_chars: 50,
        }
    }

    fn invocation(command: &str) -> Invocation {
        Invocation::resumed(
            "__MUXEXEC_test__".into(),
            crate::invocation::InvocationKind::for_command(command),
            command.into(),
        )
    }

    fn pane(marker: &str, output: &[&str], idle: bool) -> Snapshot {
        let mut text = format!("$ old\n$ cmd # {}\n", marker);
        for line in output {
            text.push_str(line);
            text.push('\n');
        }
        if idle {
            text.push_str("$ \n");
        }
        text.push_str("\n\n");
        // Cursor at the end of the last output line, two blank rows below
        Snapshot {
            idle,
            text,
            rows_below_cursor: 2,
            taken_at: Instant::now(),
        }
    }

    /// Same pane with the cursor moved down onto the first blank row
    fn on_fresh_row(mut snapshot: Snapshot) -> Snapshot {
        snapshot.rows_below_cursor = 1;
        snapshot
    }

    // ==================== Status Tests ====================

    #[test]
    fn test_status_exit_codes_are_distinct() {
        let codes = [
            Status::Completed.exit_code(),
            Status::TimedOut.exit_code(),
            Status::Busy.exit_code(),
            Status::Degraded.exit_code(),
        ];
        assert_eq!(codes, [0, 124, 2, 3]);
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&Status::TimedOut).unwrap(), "\"timed_out\"");
        assert_eq!(Status::Degraded.to_string(), "degraded");
    }

    #[test]
    fn test_max_polls_rounds_up() {
        let mut s = settings();
        s.timeout = Duration::from_secs(5);
        s.poll_interval = Duration::from_millis(300);
        assert_eq!(s.max_polls(), 17);
        s.timeout = Duration::ZERO;
        assert_eq!(s.max_polls(), 1);
    }

    #[test]
    fn test_degraded_limit() {
        let mut s = settings();
        assert_eq!(s.degraded_limit(), 50);
        s.budget = Budget::new(10, 20);
        assert_eq!(s.degraded_limit(), 30);
    }

    // ==================== Streaming Tests ====================

    #[test]
    fn test_streams_new_lines_holding_cursor_line() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());

        let tick = c.on_snapshot(&pane(&inv.marker, &["a", "b"], false));
        assert_eq!(tick.emit, "a\n");
        assert!(matches!(tick.next, Next::PollAt(_)));

        let tick = c.on_snapshot(&pane(&inv.marker, &["a", "b", "c"], false));
        assert_eq!(tick.emit, "b\n");
        assert_eq!(c.printed_lines(), 2);
    }

    #[test]
    fn test_finished_line_streams_while_busy() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());

        let tick = c.on_snapshot(&on_fresh_row(pane(&inv.marker, &["Compiling..."], false)));
        assert_eq!(tick.emit, "Compiling...\n");
        assert!(matches!(tick.next, Next::PollAt(_)));

        // Nothing new while the command works silently
        for _ in 0..3 {
            let tick = c.on_snapshot(&on_fresh_row(pane(&inv.marker, &["Compiling..."], false)));
            assert_eq!(tick.emit, "");
        }
        assert_eq!(c.output(), "Compiling...\n");
    }

    #[test]
    fn test_partial_line_waits_for_cursor_to_move() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());
        assert_eq!(c.on_snapshot(&pane(&inv.marker, &["Compil"], false)).emit, "");
        let tick = c.on_snapshot(&on_fresh_row(pane(&inv.marker, &["Compiling..."], false)));
        assert_eq!(tick.emit, "Compiling...\n");
    }

    #[test]
    fn test_idle_flushes_then_completes() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());

        let first = pane(&inv.marker, &["a", "b", "c"], true);
        let tick = c.on_snapshot(&first);
        assert_eq!(tick.emit, "a\nb\nc\n");
        assert_eq!(tick.next, Next::PollAt(first.taken_at + Duration::from_millis(300)));

        let tick = c.on_snapshot(&pane(&inv.marker, &["a", "b", "c"], true));
        assert_eq!(tick.emit, "");
        assert_eq!(tick.next, Next::Finished(Status::Completed));
        assert_eq!(c.output(), "a\nb\nc\n");
    }

    #[test]
    fn test_flush_picks_up_late_output() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());
        c.on_snapshot(&pane(&inv.marker, &["a"], true));
        let tick = c.on_snapshot(&pane(&inv.marker, &["a", "late"], true));
        assert_eq!(tick.emit, "late\n");
        assert_eq!(c.status(), Some(Status::Completed));
    }

    #[test]
    fn test_idle_without_prompt_keeps_polling() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());
        // Pasted but not yet read by the shell: marker is the last line
        let snap = Snapshot {
            idle: true,
            text: format!("$ cmd # {}\n", inv.marker),
            rows_below_cursor: 0,
            taken_at: Instant::now(),
        };
        let tick = c.on_snapshot(&snap);
        assert_eq!(tick.next, Next::PollAt(snap.taken_at + INTERVAL));
    }

    #[test]
    fn test_batch_echo_is_skipped() {
        let inv = invocation("echo a\necho b");
        let mut c = StreamController::new(&inv, settings());
        let snap = Snapshot {
            idle: true,
            text: format!(
                "$ {{ # {}\n> echo a\n> echo b\n> }}\na\nb\n$ \n",
                inv.marker
            ),
            rows_below_cursor: 0,
            taken_at: Instant::now(),
        };
        assert_eq!(c.on_snapshot(&snap).emit, "a\nb\n");
    }

    #[test]
    fn test_ignores_stale_markers() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());
        let snap = Snapshot {
            idle: true,
            text: "$ x # __MUXEXEC_other__\nstale\n$ \n".into(),
            rows_below_cursor: 0,
            taken_at: Instant::now(),
        };
        let tick = c.on_snapshot(&snap);
        assert_eq!(tick.emit, "");
        assert!(matches!(tick.next, Next::PollAt(_)));
    }

    // ==================== Timeout Tests ====================

    #[test]
    fn test_timeout_after_poll_budget() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());
        let mut output = vec!["l1"];
        let mut last = None;
        for i in 0..5 {
            let snap = pane(&inv.marker, &output, false);
            let tick = c.on_snapshot(&snap);
            last = Some(tick);
            if i < 4 {
                assert!(matches!(last.as_ref().unwrap().next, Next::PollAt(_)));
            }
            output.push("more");
        }
        let tick = last.unwrap();
        assert_eq!(tick.next, Next::Finished(Status::TimedOut));
        // The held cursor line goes out before the sentinel
        assert!(tick.emit.ends_with("more\n[TIMEOUT after 1s]\n"));
        assert_eq!(c.printed_lines(), 5);
    }

    #[test]
    fn test_timeout_with_truncation_emits_current_tail() {
        let mut s = settings();
        s.budget = Budget::new(4, 4);
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, s);
        let lines: Vec<String> = (0..20).map(|i| format!("{:03}", i)).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut tick = None;
        for n in [5usize, 10, 15, 18, 20] {
            tick = Some(c.on_snapshot(&pane(&inv.marker, &refs[..n], false)));
        }
        let tick = tick.unwrap();
        assert_eq!(tick.next, Next::Finished(Status::TimedOut));
        assert!(tick.emit.starts_with("019\n"));
        assert_eq!(c.output().matches(TRUNCATED).count(), 1);
        assert!(c.output().starts_with("000\n"));
    }

    // ==================== Degraded Tests ====================

    #[test]
    fn test_marker_missing_degrades_after_grace() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());
        let snap = Snapshot {
            idle: true,
            text: "flood line\n$ \n".into(),
            rows_below_cursor: 0,
            taken_at: Instant::now(),
        };
        assert!(matches!(c.on_snapshot(&snap).next, Next::PollAt(_)));
        assert!(matches!(c.on_snapshot(&snap).next, Next::PollAt(_)));
        let tick = c.on_snapshot(&snap);
        assert_eq!(tick.next, Next::Finished(Status::Degraded));
        assert!(tick.emit.starts_with("[WARNING: marker not found"));
        assert!(tick.emit.ends_with("flood line\n$ \n"));
    }

    #[test]
    fn test_busy_polls_without_marker_keep_watching() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());
        let busy = Snapshot {
            idle: false,
            text: "flood line\n".into(),
            rows_below_cursor: 0,
            taken_at: Instant::now(),
        };
        for _ in 0..4 {
            assert!(matches!(c.on_snapshot(&busy).next, Next::PollAt(_)));
        }
        let tick = c.on_snapshot(&busy);
        assert_eq!(tick.next, Next::Finished(Status::TimedOut));
    }

    #[test]
    fn test_degraded_tail_is_bounded() {
        let mut s = settings();
        s.marker_grace_polls = 1;
        s.budget = Budget::new(5, 5);
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, s);
        let snap = Snapshot {
            idle: true,
            text: "x".repeat(500),
            rows_below_cursor: 0,
            taken_at: Instant::now(),
        };
        let tick = c.on_snapshot(&snap);
        let (_, tail) = tick.emit.split_once("]\n").unwrap();
        assert_eq!(tail, format!("{}\n", "x".repeat(10)));
    }

    // ==================== Resume Tests ====================

    #[test]
    fn test_resume_at_streams_from_base_line() {
        let inv = invocation("cmd");
        let mut c = StreamController::resume_at(&inv, settings(), 3);
        let tick = c.on_snapshot(&pane(&inv.marker, &["1", "2", "3", "4", "5"], true));
        assert_eq!(tick.emit, "4\n5\n");
        c.on_snapshot(&pane(&inv.marker, &["1", "2", "3", "4", "5"], true));
        assert_eq!(c.output(), "4\n5\n");
        assert_eq!(c.printed_lines(), 5);
    }

    // ==================== Done State ====================

    #[test]
    fn test_done_ignores_further_snapshots() {
        let inv = invocation("cmd");
        let mut c = StreamController::new(&inv, settings());
        c.on_snapshot(&pane(&inv.marker, &["a"], true));
        c.on_snapshot(&pane(&inv.marker, &["a"], true));
        let tick = c.on_snapshot(&pane(&inv.marker, &["a", "b"], true));
        assert_eq!(tick.emit, "");
        assert_eq!(tick.next, Next::Finished(Status::Completed));
        assert_eq!(c.polls(), 2);
    }
}
