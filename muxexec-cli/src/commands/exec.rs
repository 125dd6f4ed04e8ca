//! exec / continue

use muxexec_core::{ExecOutcome, Executor, NullSink, OutputSink, SessionId, StdoutSink, Transport};
use muxexec_utils::{MuxexecError, Result};
use tokio::io::AsyncReadExt;

use crate::cli::WatchArgs;

/// Run `words` (or stdin) in `session`
pub async fn exec<T: Transport>(
    executor: &Executor<T>,
    session: &SessionId,
    words: Vec<String>,
    watch: &WatchArgs,
) -> Result<i32> {
    let command = if words.is_empty() {
        read_stdin().await?
    } else {
        command_line(&words)
    };

    let opts = watch.options(executor.config());
    let mut sink = sink_for(watch);
    let outcome = executor
        .execute(session, &command, &opts, sink.as_mut())
        .await?;
    report(&outcome, watch.json)
}

/// Resume the last command in `session`
pub async fn resume<T: Transport>(
    executor: &Executor<T>,
    session: &SessionId,
    watch: &WatchArgs,
) -> Result<i32> {
    let opts = watch.options(executor.config());
    let mut sink = sink_for(watch);
    let outcome = executor.resume(session, &opts, sink.as_mut()).await?;
    report(&outcome, watch.json)
}

/// Shell text for the command words
///
/// A single word is taken as a complete command line (`muxexec exec -t s
/// 'make && make test'`); several words are quoted so that each one reaches
/// the program as the same argument it was given here.
fn command_line(words: &[String]) -> String {
    match words {
        [line] => line.clone(),
        _ => shell_words::join(words),
    }
}

/// Stream to stdout unless the whole outcome is printed as JSON at the end
fn sink_for(watch: &WatchArgs) -> Box<dyn OutputSink> {
    if watch.json {
        Box::new(NullSink)
    } else {
        Box::new(StdoutSink)
    }
}

fn report(outcome: &ExecOutcome, json: bool) -> Result<i32> {
    if json {
        let text = serde_json::to_string_pretty(outcome)
            .map_err(|e| MuxexecError::internal(format!("Failed to encode outcome: {}", e)))?;
        println!("{}", text);
    } else if let Some(message) = &outcome.message {
        eprintln!("muxexec: {}", message);
    }
    Ok(outcome.exit_code())
}

async fn read_stdin() -> Result<String> {
    let mut command = String::new();
    tokio::io::stdin().read_to_string(&mut command).await?;
    if command.trim().is_empty() {
        return Err(MuxexecError::InvalidCommand(
            "no command given on the command line or stdin".into(),
        ));
    }
    Ok(command)
}
