//! tmux transport: local `sh` or remote `ssh ... sh`

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use muxexec_utils::{MuxexecError, Result};

use crate::config::TransportConfig;
use crate::session::{SessionId, Target};

use super::{compile, Primitive, Transport, BUSY_EXIT_CODE};

/// Runs primitive batches through the tmux CLI
#[derive(Debug, Clone)]
pub struct TmuxTransport {
    config: TransportConfig,
}

impl TmuxTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Program and arguments that execute a script read from stdin
    fn shell_command(&self, session: &SessionId) -> Command {
        match &session.target {
            Target::Local => {
                let mut cmd = Command::new("sh");
                cmd.arg("-s");
                cmd
            }
            Target::Remote { host } => {
                let mut cmd = Command::new(&self.config.ssh_binary);
                cmd.args(&self.config.ssh_args);
                cmd.arg("-T").arg(host).arg("sh -s");
                cmd
            }
        }
    }

    fn program(&self, session: &SessionId) -> String {
        match session.target {
            Target::Local => "sh".into(),
            Target::Remote { .. } => self.config.ssh_binary.clone(),
        }
    }
}

#[async_trait]
impl Transport for TmuxTransport {
    async fn run(&self, session: &SessionId, ops: &[Primitive]) -> Result<String> {
        let script = compile(&self.config, session, ops);
        trace!(session = %session, script = %script, "Running transport script");

        let program = self.program(session);
        let mut child = self
            .shell_command(session)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MuxexecError::TransportSpawn {
                program: program.clone(),
                source: e,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .await
                .map_err(|e| MuxexecError::transport(format!("failed to write script: {}", e)))?;
            // Dropping stdin closes it so `sh -s` sees EOF
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| MuxexecError::transport(format!("failed to wait for {}: {}", program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        match output.status.code() {
            Some(0) => {
                debug!(session = %session, ops = ops.len(), bytes = stdout.len(), "Transport round trip");
                Ok(stdout)
            }
            Some(BUSY_EXIT_CODE) => Err(MuxexecError::Busy {
                session: session.to_string(),
            }),
            code => Err(MuxexecError::TransportExit {
                code: code.unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn describe(&self) -> String {
        match &self.config.socket {
            Some(socket) => format!("{} -S {}", self.config.tmux_binary, socket),
            None => self.config.tmux_binary.clone(),
        }
    }
}
