//! muxexec: run a command in a tmux session and print exactly its output
//!
//! Exit codes: 0 completed, 124 timed out (still running, resume with
//! `muxexec continue`), 2 session busy, 3 degraded capture, 1 error.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use muxexec_utils::init_logging_with_config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs never reach stdout, which carries command output only
    if let Err(e) = init_logging_with_config(cli.log_config()) {
        eprintln!("muxexec: failed to initialize logging: {}", e);
    }

    let exit_code = match commands::execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("muxexec: {}", e);
            1
        }
    };

    std::process::exit(exit_code);
}
