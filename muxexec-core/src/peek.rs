//! Unconditioned reads of a session's pane
//!
//! Peek ignores markers and busy state entirely. The same tail read backs
//! the degraded fallback used when an invocation's marker is gone.

use tracing::debug;

use muxexec_utils::Result;

use crate::extract::CapturedText;
use crate::sentinel;
use crate::session::SessionId;
use crate::transport::{Primitive, Transport};

/// The trailing `chars` characters of `session`'s pane
pub async fn peek<T: Transport + ?Sized>(
    transport: &T,
    session: &SessionId,
    chars: usize,
) -> Result<String> {
    let raw = transport.run(session, &[Primitive::Capture]).await?;
    let tail = CapturedText::parse(&raw).tail_chars(chars);
    debug!(session = %session, requested = chars, returned = tail.chars().count(), "Peek");
    Ok(tail)
}

/// Warning sentinel followed by the last `limit` characters of `text`
pub fn degraded_output(reason: &str, text: &str, limit: usize) -> String {
    let mut out = String::new();
    sentinel::push_line(&mut out, true, &sentinel::degraded(reason, limit));
    let tail = CapturedText::parse(text).tail_chars(limit);
    if !tail.is_empty() {
        out.push_str(&tail);
        out.push('\n');
    }
    out
}
