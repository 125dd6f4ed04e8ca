//! CLI argument parsing

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use muxexec_core::{AppConfig, Budget, ExecOptions};
use muxexec_utils::LogConfig;

/// Run commands in tmux sessions and collect exactly their output
#[derive(Parser, Debug)]
#[command(name = "muxexec")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/muxexec/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Reach the tmux server on this host over ssh
    #[arg(long, global = true, env = "MUXEXEC_HOST")]
    pub host: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to $XDG_STATE_HOME/muxexec/log/muxexec.log instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command in a session and stream its output
    Exec {
        /// Target session
        #[arg(short = 't', long = "target")]
        target: String,

        #[command(flatten)]
        watch: WatchArgs,

        /// Command to run: one shell line, or words quoted as given; read
        /// from stdin when omitted
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Resume watching the last command run in a session
    Continue {
        /// Target session
        #[arg(short = 't', long = "target")]
        target: String,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Print the end of a session's pane, ignoring any running command
    Peek {
        /// Target session
        #[arg(short = 't', long = "target")]
        target: String,

        /// Number of trailing characters
        #[arg(short = 'n', long, default_value_t = 2000)]
        chars: usize,
    },

    /// Show whether a session is busy and its last invocation
    Status {
        /// Target session
        #[arg(short = 't', long = "target")]
        target: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send keys to a session (e.g. Ctrl+C, Enter, Escape)
    #[command(name = "send-keys")]
    SendKeys {
        /// Target session
        #[arg(short = 't', long = "target")]
        target: String,

        /// Keys to send
        #[arg(trailing_var_arg = true, required = true)]
        keys: Vec<String>,
    },
}

/// Watch window and output budget
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchArgs {
    /// Seconds to watch before reporting a timeout
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Characters kept from the start of the output
    #[arg(long)]
    pub head: Option<usize>,

    /// Characters kept from the end of the output
    #[arg(long)]
    pub tail: Option<usize>,

    /// Total character budget, split evenly between head and tail (0 = unlimited)
    #[arg(long, conflicts_with_all = ["head", "tail"])]
    pub budget: Option<usize>,

    /// Print the outcome as JSON instead of streaming output
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Logging setup selected by `--verbose` and `--log-file`
    pub fn log_config(&self) -> LogConfig {
        let config = if self.verbose {
            LogConfig::development()
        } else {
            LogConfig::cli()
        };
        if self.log_file {
            config.file_output()
        } else {
            config
        }
    }
}

impl WatchArgs {
    /// Overrides on top of `config`
    pub fn options(&self, config: &AppConfig) -> ExecOptions {
        let budget = match (self.budget, self.head, self.tail) {
            (Some(total), _, _) => Some(Budget::split(total)),
            (None, None, None) => None,
            (None, head, tail) => Some(Budget::new(
                head.unwrap_or(config.truncation.head_chars),
                tail.unwrap_or(config.truncation.tail_chars),
            )),
        };
        ExecOptions {
            timeout: self.timeout.map(Duration::from_secs),
            budget,
        }
    }
}
