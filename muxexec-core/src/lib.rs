//! muxexec-core: Marker-tagged command dispatch into tmux sessions
//!
//! A command is pasted into a session with a unique marker as a trailing shell
//! comment, then the pane is polled: each snapshot pairs the shell's busy flag
//! with the full scrollback, the output after the last marker occurrence is
//! sliced out, new lines are streamed through a head/tail budget, and the
//! watch ends once the shell is idle again (or the timeout elapses, in which
//! case the invocation can be resumed later by its marker).

pub mod config;
pub mod dispatch;
pub mod exec;
pub mod extract;
pub mod invocation;
pub mod peek;
pub mod registry;
pub mod resume;
pub mod sentinel;
pub mod session;
pub mod sink;
pub mod snapshot;
pub mod store;
pub mod stream;
pub mod transport;
pub mod truncate;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, ConfigLoader};
pub use exec::{ExecOptions, ExecOutcome, Executor};
pub use invocation::{Invocation, InvocationKind};
pub use session::{SessionId, Target};
pub use sink::{CollectSink, NullSink, OutputSink, StdoutSink};
pub use store::InvocationRecord;
pub use stream::Status;
pub use transport::{TmuxTransport, Transport};
pub use truncate::Budget;
