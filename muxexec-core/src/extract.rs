//! Isolating one invocation's output from captured pane text
//!
//! Captured text is treated as an ordered sequence of logical lines with
//! 0-based indexing. Wrapped display lines are already rejoined by the
//! capture (`capture-pane -J`); parsing only normalises line endings and
//! drops the blank rows tmux pads below the cursor, remembering how many
//! there were.

/// Captured pane text as logical lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedText {
    lines: Vec<String>,
    trailing_blank_rows: usize,
}

impl CapturedText {
    /// Split raw capture output into lines
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        let mut lines: Vec<String> = raw
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();

        // The final newline terminates the last row
        if raw.ends_with('\n') {
            lines.pop();
        }

        let mut trailing_blank_rows = 0;
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
            trailing_blank_rows += 1;
        }

        Self {
            lines,
            trailing_blank_rows,
        }
    }

    /// Blank rows dropped after the last non-blank line
    pub fn trailing_blank_rows(&self) -> usize {
        self.trailing_blank_rows
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the last line containing `needle`
    pub fn last_line_containing(&self, needle: &str) -> Option<usize> {
        self.lines.iter().rposition(|line| line.contains(needle))
    }

    /// The trailing `count` characters of the text, newline-joined
    pub fn tail_chars(&self, count: usize) -> String {
        let joined = self.lines.join("\n");
        last_chars(&joined, count).to_string()
    }
}

/// Which lines around the output are noise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractRule {
    /// Lines right after the marker that echo the submitted input
    pub skip_top: usize,
    /// Lines of re-displayed prompt to drop once the shell is idle
    pub prompt_lines: usize,
}

/// Result of slicing one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Whether the marker occurs anywhere in the captured text
    pub marker_found: bool,
    /// Line count strictly after the marker line, before any skipping
    pub after_marker: usize,
    /// The invocation's output lines
    pub lines: Vec<String>,
}

/// Slice out the lines following the last occurrence of `marker`
///
/// Earlier invocations may have left their own markers in history, so only
/// the last occurrence counts. A missing marker is not an error: it yields
/// an empty extraction with `marker_found == false`, the scrollback eviction
/// case that callers surface as degraded output.
pub fn extract(text: &str, marker: &str, rule: ExtractRule, idle: bool) -> Extraction {
    let captured = CapturedText::parse(text);
    let Some(marker_line) = captured.last_line_containing(marker) else {
        return Extraction::default();
    };

    let after = &captured.lines()[marker_line + 1..];
    let mut start = rule.skip_top.min(after.len());
    let mut end = after.len();
    if idle {
        end = end.saturating_sub(rule.prompt_lines);
    }
    if end < start {
        start = end;
    }

    Extraction {
        marker_found: true,
        after_marker: after.len(),
        lines: after[start..end].to_vec(),
    }
}

/// Render lines as emitted text: every line newline-terminated
pub fn render_lines(lines: &[String]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Character count (not bytes)
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The first `count` characters of `text`
pub fn first_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `text` without its first `count` characters
pub fn skip_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// The last `count` characters of `text`
pub fn last_chars(text: &str, count: usize) -> &str {
    let total = char_len(text);
    skip_chars(text, total.saturating_sub(count))
}
