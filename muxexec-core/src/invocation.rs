//! Invocations and their markers
//!
//! Every dispatched command carries a high-entropy marker as a shell comment.
//! The comment is inert to execution but shows up in the pane's echo of the
//! input line, which is the only boundary the extractor can anchor on.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use muxexec_utils::{MuxexecError, Result};

use crate::extract::ExtractRule;

/// Prefix shared by all markers
pub const MARKER_PREFIX: &str = "__MUXEXEC_";

/// Generate a fresh marker token
pub fn new_marker() -> String {
    format!("{}{}__", MARKER_PREFIX, Uuid::new_v4().simple())
}

/// How the command text is injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvocationKind {
    /// One input line: `<command> # <marker>`
    Single,
    /// Multi-line body wrapped in `{ # <marker>` ... `}`
    Batch { body_lines: usize },
}

impl InvocationKind {
    /// Classify command text
    pub fn for_command(command: &str) -> Self {
        let body = normalize(command);
        if body.contains('\n') {
            Self::Batch {
                body_lines: body.split('\n').count(),
            }
        } else {
            Self::Single
        }
    }

    /// Echoed input lines that follow the marker line
    ///
    /// For a batch the shell echoes every body line on a continuation prompt,
    /// then the closing brace on one more.
    pub fn skip_top(&self) -> usize {
        match self {
            Self::Single => 0,
            Self::Batch { body_lines } => body_lines + 1,
        }
    }
}

/// One tagged command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub marker: String,
    pub kind: InvocationKind,
    pub command: String,
}

impl Invocation {
    /// Tag `command` with a fresh marker
    pub fn new(command: &str) -> Result<Self> {
        let body = normalize(command);
        if body.trim().is_empty() {
            return Err(MuxexecError::InvalidCommand("empty command".into()));
        }
        Ok(Self {
            marker: new_marker(),
            kind: InvocationKind::for_command(command),
            command: body.to_string(),
        })
    }

    /// Rebuild a previously dispatched invocation
    pub fn resumed(marker: String, kind: InvocationKind, command: String) -> Self {
        Self {
            marker,
            kind,
            command,
        }
    }

    /// Text pasted into the session (the submit key is sent separately)
    pub fn payload(&self) -> String {
        match self.kind {
            InvocationKind::Single => format!("{} # {}", self.command, self.marker),
            InvocationKind::Batch { .. } => {
                format!("{{ # {}\n{}\n}}", self.marker, self.command)
            }
        }
    }

    pub fn skip_top(&self) -> usize {
        self.kind.skip_top()
    }

    /// Extraction rule for this invocation's output
    pub fn extract_rule(&self, prompt_lines: usize) -> ExtractRule {
        ExtractRule {
            skip_top: self.skip_top(),
            prompt_lines,
        }
    }
}

/// Unix line endings, no trailing newlines
fn normalize(command: &str) -> String {
    command
        .replace("\r\n", "\n")
        .trim_end_matches(['\n', '\r'])
        .to_string()
}
