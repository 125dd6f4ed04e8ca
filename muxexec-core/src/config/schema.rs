//! Configuration schema structs

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub truncation: TruncationConfig,
    pub transport: TransportConfig,
    pub locking: LockingConfig,
    pub resume: ResumeConfig,
}

/// Polling and completion-detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Watch window before giving up with a timeout status (default: 15)
    pub timeout_secs: u64,
    /// Delay between snapshots while the command runs (default: 200)
    pub poll_interval_ms: u64,
    /// Delay between observing idle and the final flush snapshot (default: 300)
    pub flush_grace_ms: u64,
    /// Number of trailing prompt lines dropped once idle (default: 1)
    pub prompt_lines: usize,
    /// Consecutive idle polls without the marker before degrading (default: 3)
    pub marker_grace_polls: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            poll_interval_ms: 200,
            flush_grace_ms: 300,
            prompt_lines: 1,
            marker_grace_polls: 3,
        }
    }
}

impl GeneralConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn flush_grace(&self) -> Duration {
        Duration::from_millis(self.flush_grace_ms)
    }
}

/// Output size budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruncationConfig {
    /// Characters kept from the start of the output (default: 2000)
    pub head_chars: usize,
    /// Characters kept from the end of the output (default: 2000)
    pub tail_chars: usize,
    /// Characters shown from the pane tail when the marker is lost and
    /// truncation is disabled (default: 2000)
    pub degraded_tail_chars: usize,
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            head_chars: 2000,
            tail_chars: 2000,
            degraded_tail_chars: 2000,
        }
    }
}

/// How primitives reach tmux
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// tmux executable on the target host
    pub tmux_binary: String,
    /// ssh executable on the controller host
    pub ssh_binary: String,
    /// Extra arguments placed before the ssh destination (e.g. ["-i", "key"])
    pub ssh_args: Vec<String>,
    /// Optional tmux server socket (`tmux -S`)
    pub socket: Option<String>,
    /// Prefix for the tmux paste buffer name
    pub buffer_prefix: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tmux_binary: "tmux".into(),
            ssh_binary: "ssh".into(),
            ssh_args: Vec::new(),
            socket: None,
            buffer_prefix: "muxexec".into(),
        }
    }
}

/// Session mutual exclusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockingConfig {
    /// Take a cross-process lock file for the whole invocation lifecycle
    pub enabled: bool,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Continue-mode settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeConfig {
    /// Trailing lines re-emitted as context when resuming (default: 5)
    pub context_lines: usize,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self { context_lines: 5 }
    }
}
