//! peek / status / send-keys

use muxexec_core::{Executor, SessionId, Transport};
use muxexec_utils::{MuxexecError, Result};

/// Print the trailing `chars` characters of the pane
pub async fn peek<T: Transport>(executor: &Executor<T>, session: &SessionId, chars: usize) -> Result<i32> {
    let tail = executor.peek(session, chars).await?;
    if tail.ends_with('\n') || tail.is_empty() {
        print!("{}", tail);
    } else {
        println!("{}", tail);
    }
    Ok(0)
}

/// Print busy state and the last invocation record
pub async fn status<T: Transport>(executor: &Executor<T>, session: &SessionId, json: bool) -> Result<i32> {
    let busy = executor.probe(session).await?;
    let record = executor.last_invocation(session)?;

    if json {
        let value = serde_json::json!({
            "session": session.to_string(),
            "busy": busy,
            "last_invocation": record,
        });
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| MuxexecError::internal(format!("Failed to encode status: {}", e)))?;
        println!("{}", text);
        return Ok(0);
    }

    println!("{}: {}", session, if busy { "busy" } else { "idle" });
    match record {
        Some(record) => {
            let status = record
                .last_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "never watched".into());
            println!("last marker: {}", record.marker);
            println!("dispatched:  {}", record.dispatched_at.to_rfc3339());
            println!("status:      {} ({} lines shown)", status, record.printed_lines);
            println!("command:     {}", record.command.lines().next().unwrap_or_default());
        }
        None => println!("no recorded invocation"),
    }
    Ok(0)
}

pub async fn send_keys<T: Transport>(executor: &Executor<T>, session: &SessionId, keys: &[String]) -> Result<i32> {
    executor.send_keys(session, keys).await?;
    Ok(0)
}
