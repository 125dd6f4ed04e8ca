//! Execute-and-wait, continue, peek
//!
//! [`Executor`] is the entry point callers use. It owns the session locks and
//! the invocation store around the dispatch/stream protocol, and turns the
//! non-fatal error paths (busy sessions, lost markers) into outcomes.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use muxexec_utils::{invocations_dir, lock_dir, MuxexecError, Result};

use crate::config::AppConfig;
use crate::dispatch::dispatch;
use crate::peek::{self, degraded_output};
use crate::registry::{SessionGuard, SessionRegistry};
use crate::resume;
use crate::session::SessionId;
use crate::sink::OutputSink;
use crate::snapshot::{self, Snapshot};
use crate::store::{InvocationRecord, InvocationStore};
use crate::stream::{self, Status, StreamController, StreamSettings};
use crate::transport::{keys, Primitive, Transport};
use crate::truncate::Budget;

/// Per-call overrides of the configured defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    pub timeout: Option<Duration>,
    pub budget: Option<Budget>,
}

/// Result of one execute or continue call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecOutcome {
    pub status: Status,
    /// Everything emitted to the sink, sentinels included
    pub output: String,
    pub marker: Option<String>,
    /// Absolute output lines shown so far
    pub lines_seen: usize,
    pub polls: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecOutcome {
    fn busy(err: &MuxexecError) -> Self {
        Self {
            status: Status::Busy,
            output: String::new(),
            marker: None,
            lines_seen: 0,
            polls: 0,
            message: Some(err.to_string()),
        }
    }

    fn from_controller(controller: &StreamController, status: Status) -> Self {
        Self {
            status,
            output: controller.output().to_string(),
            marker: Some(controller.marker().to_string()),
            lines_seen: controller.printed_lines(),
            polls: controller.polls(),
            message: None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

/// Dispatches commands and watches their output
pub struct Executor<T: Transport> {
    transport: T,
    config: AppConfig,
    registry: SessionRegistry,
    store: InvocationStore,
}

impl<T: Transport> Executor<T> {
    /// Executor keeping state in the standard XDG locations
    pub fn new(transport: T, config: AppConfig) -> Self {
        Self::with_dirs(transport, config, &invocations_dir(), &lock_dir())
    }

    /// Executor keeping records and locks under `dir`
    pub fn with_state_dir(transport: T, config: AppConfig, dir: &Path) -> Self {
        Self::with_dirs(transport, config, &dir.join("invocations"), &dir.join("locks"))
    }

    fn with_dirs(transport: T, config: AppConfig, records: &Path, locks: &Path) -> Self {
        let registry = if config.locking.enabled {
            SessionRegistry::with_lock_dir(locks)
        } else {
            SessionRegistry::new()
        };
        Self {
            transport,
            config,
            registry,
            store: InvocationStore::new(records),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Effective stream settings for one call
    pub fn settings(&self, opts: &ExecOptions) -> StreamSettings {
        let mut settings = StreamSettings::from_config(&self.config);
        if let Some(timeout) = opts.timeout {
            settings.timeout = timeout;
        }
        if let Some(budget) = opts.budget {
            settings.budget = budget;
        }
        settings
    }

    /// Dispatch `command` into `session` and stream its output to `sink`
    ///
    /// Busy sessions yield a `Busy` outcome; unreachable targets are errors.
    pub async fn execute<S: OutputSink + ?Sized>(
        &self,
        session: &SessionId,
        command: &str,
        opts: &ExecOptions,
        sink: &mut S,
    ) -> Result<ExecOutcome> {
        let _guard = match self.claim(session) {
            Ok(guard) => guard,
            Err(outcome) => return outcome,
        };

        let invocation = match dispatch(
            &self.transport,
            &self.config.transport.buffer_prefix,
            session,
            command,
        )
        .await
        {
            Ok(invocation) => invocation,
            Err(e) if e.is_busy() => {
                info!(session = %session, "Session busy, nothing dispatched");
                return Ok(ExecOutcome::busy(&e));
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.store.save(&InvocationRecord::dispatched(session, &invocation)) {
            warn!(session = %session, error = %e, "Failed to save invocation record");
        }

        let mut controller = StreamController::new(&invocation, self.settings(opts));
        let status = stream::drive(&mut controller, &self.transport, session, sink, None).await?;
        Ok(self.finish_watch(session, &controller, status))
    }

    /// Resume watching the last invocation dispatched into `session`
    pub async fn resume<S: OutputSink + ?Sized>(
        &self,
        session: &SessionId,
        opts: &ExecOptions,
        sink: &mut S,
    ) -> Result<ExecOutcome> {
        let _guard = match self.claim(session) {
            Ok(guard) => guard,
            Err(outcome) => return outcome,
        };

        let settings = self.settings(opts);
        let record = self.store.load(session)?;
        let snap = snapshot::take(&self.transport, session).await?;

        let Some(record) = record else {
            let err = MuxexecError::NoInvocation {
                session: session.to_string(),
            };
            return self.degraded(&err, None, &snap, &settings, sink);
        };

        let mut controller = match resume::prepare(
            session,
            &record,
            &snap,
            settings.clone(),
            self.config.resume.context_lines,
        ) {
            Ok(controller) => controller,
            Err(e) if !e.is_fatal() => {
                return self.degraded(&e, Some(record.marker), &snap, &settings, sink)
            }
            Err(e) => return Err(e),
        };

        let status =
            stream::drive(&mut controller, &self.transport, session, sink, Some(snap)).await?;
        Ok(self.finish_watch(session, &controller, status))
    }

    /// The trailing `chars` characters of the pane, no protocol involved
    pub async fn peek(&self, session: &SessionId, chars: usize) -> Result<String> {
        peek::peek(&self.transport, session, chars).await
    }

    /// Whether `session`'s shell currently runs a child process
    pub async fn probe(&self, session: &SessionId) -> Result<bool> {
        snapshot::probe_busy(&self.transport, session).await
    }

    /// Send named keys (`Ctrl+C`, `Enter`, tmux names) to `session`
    pub async fn send_keys(&self, session: &SessionId, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Err(MuxexecError::InvalidCommand("no keys given".into()));
        }
        let keys = keys::tmux_key_names(names);
        info!(session = %session, keys = ?keys, "Sending keys");
        self.transport
            .run(session, &[Primitive::SendKeys(keys)])
            .await
            .map(|_| ())
    }

    /// Stored record of the last invocation in `session`
    pub fn last_invocation(&self, session: &SessionId) -> Result<Option<InvocationRecord>> {
        self.store.load(session)
    }

    /// Take the session lock, or the outcome to return instead
    fn claim(&self, session: &SessionId) -> std::result::Result<SessionGuard, Result<ExecOutcome>> {
        match self.registry.try_acquire(session) {
            Ok(guard) => Ok(guard),
            Err(e) if e.is_busy() => {
                info!(session = %session, error = %e, "Session already claimed");
                Err(Ok(ExecOutcome::busy(&e)))
            }
            Err(e) => Err(Err(e)),
        }
    }

    fn finish_watch(&self, session: &SessionId, controller: &StreamController, status: Status) -> ExecOutcome {
        if let Err(e) = self
            .store
            .record_watch(session, controller.printed_lines(), status)
        {
            warn!(session = %session, error = %e, "Failed to update invocation record");
        }
        info!(
            session = %session,
            status = %status,
            polls = controller.polls(),
            lines = controller.printed_lines(),
            "Watch finished"
        );
        ExecOutcome::from_controller(controller, status)
    }

    fn degraded<S: OutputSink + ?Sized>(
        &self,
        err: &MuxexecError,
        marker: Option<String>,
        snap: &Snapshot,
        settings: &StreamSettings,
        sink: &mut S,
    ) -> Result<ExecOutcome> {
        warn!(error = %err, "Showing pane tail instead of invocation output");
        let reason = match err {
            MuxexecError::NoInvocation { .. } => "no previous invocation recorded",
            _ => "marker not found in scrollback",
        };
        let output = degraded_output(reason, &snap.text, settings.degraded_limit());
        sink.emit(&output)?;
        Ok(ExecOutcome {
            status: Status::Degraded,
            output,
            marker,
            lines_seen: 0,
            polls: 1,
            message: Some(err.to_string()),
        })
    }
}
