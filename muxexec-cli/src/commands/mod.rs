//! Command implementations

mod exec;
mod pane;

use muxexec_core::{ConfigLoader, Executor, SessionId, TmuxTransport};
use muxexec_utils::Result;
use tracing::debug;

use crate::cli::{Cli, Command};

/// Execute a CLI command, returning the process exit code
pub async fn execute(cli: Cli) -> Result<i32> {
    let config = ConfigLoader::load_and_validate(cli.config.as_deref())?;
    let transport = TmuxTransport::new(config.transport.clone());
    let executor = Executor::new(transport, config);
    let host = cli.host.as_deref();

    match cli.command {
        Command::Exec {
            target,
            watch,
            command,
        } => {
            let session = session(&target, host)?;
            exec::exec(&executor, &session, command, &watch).await
        }

        Command::Continue { target, watch } => {
            let session = session(&target, host)?;
            exec::resume(&executor, &session, &watch).await
        }

        Command::Peek { target, chars } => pane::peek(&executor, &session(&target, host)?, chars).await,

        Command::Status { target, json } => {
            pane::status(&executor, &session(&target, host)?, json).await
        }

        Command::SendKeys { target, keys } => {
            pane::send_keys(&executor, &session(&target, host)?, &keys).await
        }
    }
}

fn session(target: &str, host: Option<&str>) -> Result<SessionId> {
    let session = SessionId::from_parts(target, host)?;
    debug!(session = %session, "Resolved target");
    Ok(session)
}
