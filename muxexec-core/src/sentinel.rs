//! Sentinel lines inserted into emitted output

use std::time::Duration;

/// Marks the cut between the emitted head and tail
pub const TRUNCATED: &str = "[...truncated...]";

/// Emitted when the watch window elapses before the shell is idle
pub fn timeout(after: Duration) -> String {
    format!("[TIMEOUT after {}]", format_secs(after))
}

/// Precedes a pane tail shown in place of marker-delimited output
pub fn degraded(reason: &str, chars: usize) -> String {
    format!(
        "[WARNING: {}; showing last {} characters of the pane]",
        reason, chars
    )
}

/// `5s`, or `2.5s` for fractional durations
fn format_secs(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Append `line` to `out`, starting a new line first if needed
pub fn push_line(out: &mut String, at_line_start: bool, line: &str) {
    if !at_line_start {
        out.push('\n');
    }
    out.push_str(line);
    out.push('\n');
}
