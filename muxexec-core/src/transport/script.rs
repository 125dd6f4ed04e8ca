//! Compile primitive batches into one POSIX `sh` script
//!
//! The script is fed on stdin to `sh -s`, locally or through ssh, so the
//! whole batch costs one process spawn and one round trip. Buffer contents
//! travel base64-encoded and are decoded straight into `tmux load-buffer`,
//! so command text never passes through shell word splitting or quoting.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::TransportConfig;
use crate::session::SessionId;

use super::{Primitive, BUSY_LINE, IDLE_LINE};

/// Exit status the script uses when a `RequireIdle` check fails
pub const BUSY_EXIT_CODE: i32 = 75;

/// Render `ops` as a script addressed at `session`
pub fn compile(config: &TransportConfig, session: &SessionId, ops: &[Primitive]) -> String {
    let tmux = tmux_prefix(config);
    let target = shell_words::quote(&session.name).into_owned();

    let mut script = String::new();
    for op in ops {
        match op {
            Primitive::RequireIdle => {
                push_busy_probe(&mut script, &tmux, &target);
                script.push_str(&format!(
                    "if [ \"$muxexec_busy\" = 1 ]; then echo 'session busy' >&2; exit {}; fi\n",
                    BUSY_EXIT_CODE
                ));
            }
            Primitive::ProbeBusy => {
                push_busy_probe(&mut script, &tmux, &target);
                script.push_str(&format!(
                    "if [ \"$muxexec_busy\" = 1 ]; then echo {}; else echo {}; fi\n",
                    BUSY_LINE, IDLE_LINE
                ));
            }
            Primitive::CursorPosition => {
                script.push_str(&format!(
                    "{} display-message -p -t {} '#{{cursor_y}} #{{pane_height}}' || exit 1\n",
                    tmux, target
                ));
            }
            Primitive::Capture => {
                script.push_str(&format!(
                    "{} capture-pane -p -J -S - -E - -t {} || exit 1\n",
                    tmux, target
                ));
            }
            Primitive::LoadBuffer { name, bytes } => {
                script.push_str(&format!(
                    "printf '%s' '{}' | base64 -d | {} load-buffer -b {} - || exit 1\n",
                    STANDARD.encode(bytes),
                    tmux,
                    shell_words::quote(name)
                ));
            }
            Primitive::PasteBuffer { name, delete } => {
                let delete_flag = if *delete { " -d" } else { "" };
                script.push_str(&format!(
                    "{} paste-buffer{} -b {} -t {} || exit 1\n",
                    tmux,
                    delete_flag,
                    shell_words::quote(name),
                    target
                ));
            }
            Primitive::Submit => {
                script.push_str(&format!("{} send-keys -t {} Enter || exit 1\n", tmux, target));
            }
            Primitive::SendKeys(keys) => {
                if keys.is_empty() {
                    continue;
                }
                script.push_str(&format!(
                    "{} send-keys -t {} {} || exit 1\n",
                    tmux,
                    target,
                    shell_words::join(keys)
                ));
            }
        }
    }
    script
}

/// `tmux [-S socket]`, quoted
fn tmux_prefix(config: &TransportConfig) -> String {
    let mut words = vec![config.tmux_binary.as_str()];
    if let Some(socket) = config.socket.as_deref() {
        words.push("-S");
        words.push(socket);
    }
    shell_words::join(words)
}

/// Set `muxexec_busy` to 1 when the pane's shell has any child process
///
/// Children of the shell are checked instead of `pane_current_command`,
/// which keeps reporting a stale name for orphans left on a reused pane.
fn push_busy_probe(script: &mut String, tmux: &str, target: &str) {
    script.push_str(&format!(
        "muxexec_pid=$({} display-message -p -t {} '#{{pane_pid}}') || exit 1\n",
        tmux, target
    ));
    script.push_str(
        "if pgrep -P \"$muxexec_pid\" >/dev/null 2>&1; then muxexec_busy=1; else muxexec_busy=0; fi\n",
    );
}
