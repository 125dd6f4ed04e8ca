//! Transport seam between the dispatch protocol and a tmux server
//!
//! The protocol only needs a handful of primitives. A [`Transport`] runs any
//! sequence of them as a single round trip, which is what lets the idle
//! check and the text injection observe the same session state.

pub mod keys;
mod script;
mod tmux;

use async_trait::async_trait;

use muxexec_utils::Result;

use crate::session::SessionId;

pub use script::{compile, BUSY_EXIT_CODE};
pub use tmux::TmuxTransport;

/// Line printed by [`Primitive::ProbeBusy`] when the shell has children
pub const BUSY_LINE: &str = "busy";
/// Line printed by [`Primitive::ProbeBusy`] when the shell is at its prompt
pub const IDLE_LINE: &str = "idle";

/// One operation against a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    /// Abort the whole batch with [`muxexec_utils::MuxexecError::Busy`]
    /// unless the session's shell has no child processes
    RequireIdle,
    /// Print [`BUSY_LINE`] or [`IDLE_LINE`]
    ProbeBusy,
    /// Print `<cursor_y> <pane_height>` for the pane on one line
    CursorPosition,
    /// Print the full history plus visible area, wrapped lines rejoined
    Capture,
    /// Store bytes in a named paste buffer, uninterpreted
    LoadBuffer { name: String, bytes: Vec<u8> },
    /// Type a named paste buffer into the session verbatim
    PasteBuffer { name: String, delete: bool },
    /// Press the submit key
    Submit,
    /// Send named keys (tmux key names), fire-and-forget
    SendKeys(Vec<String>),
}

/// Executes primitive batches against a session
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run `ops` in order as one round trip, returning their combined stdout
    ///
    /// Fails with `Busy` when a [`Primitive::RequireIdle`] check fails (no
    /// later primitive runs), and with a transport error when the target is
    /// unreachable or any primitive fails.
    async fn run(&self, session: &SessionId, ops: &[Primitive]) -> Result<String>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn run(&self, session: &SessionId, ops: &[Primitive]) -> Result<String> {
        (**self).run(session, ops).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
