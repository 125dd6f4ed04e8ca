//! Default configuration values
//!
//! These are embedded in the binary and used when no config file exists.

/// Default configuration as TOML (for reference/documentation)
pub const DEFAULT_CONFIG_TOML: &str = r##"
# muxexec configuration

[general]
timeout_secs = 15
poll_interval_ms = 200
flush_grace_ms = 300
# Lines of re-displayed prompt to drop once the shell is idle
prompt_lines = 1
# Idle polls without the marker before falling back to a degraded tail
marker_grace_polls = 3

[truncation]
# 0 for both disables truncation
head_chars = 2000
tail_chars = 2000
degraded_tail_chars = 2000

[transport]
tmux_binary = "tmux"
ssh_binary = "ssh"
ssh_args = []
# socket = "/tmp/tmux-1000/default"
buffer_prefix = "muxexec"

[locking]
enabled = true

[resume]
context_lines = 5
"##;
