//! Dispatcher: idle check, injection and submit in one round trip

use tracing::{debug, info};

use muxexec_utils::Result;

use crate::invocation::Invocation;
use crate::session::SessionId;
use crate::transport::{Primitive, Transport};

/// Name of the paste buffer used for `session`
pub fn buffer_name(prefix: &str, session: &SessionId) -> String {
    format!("{}-{}", prefix, session.key())
}

/// Primitive batch that injects `invocation` into `session`
///
/// The idle check comes first so that a busy session aborts the batch before
/// anything is typed into it.
pub fn dispatch_ops(buffer_prefix: &str, session: &SessionId, invocation: &Invocation) -> Vec<Primitive> {
    let name = buffer_name(buffer_prefix, session);
    vec![
        Primitive::RequireIdle,
        Primitive::LoadBuffer {
            name: name.clone(),
            bytes: invocation.payload().into_bytes(),
        },
        Primitive::PasteBuffer { name, delete: true },
        Primitive::Submit,
    ]
}

/// Tag `command` with a fresh marker and submit it to `session`
///
/// Fails with `Busy` when the session's shell has a child process; nothing is
/// injected in that case.
pub async fn dispatch<T: Transport + ?Sized>(
    transport: &T,
    buffer_prefix: &str,
    session: &SessionId,
    command: &str,
) -> Result<Invocation> {
    let invocation = Invocation::new(command)?;
    debug!(
        session = %session,
        marker = %invocation.marker,
        skip_top = invocation.skip_top(),
        "Dispatching"
    );

    transport
        .run(session, &dispatch_ops(buffer_prefix, session, &invocation))
        .await?;

    info!(session = %session, marker = %invocation.marker, "Command submitted");
    Ok(invocation)
}
