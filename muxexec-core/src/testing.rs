//! In-memory stand-in for a tmux pane
//!
//! Simulates just enough of a shell for the protocol: a `$ ` prompt, input
//! echo with `> ` continuation lines, commands that print on a schedule
//! (driven by tokio's clock, so paused-time tests are deterministic), a
//! bounded history, and the child-process busy signal.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use muxexec_utils::{MuxexecError, Result};

use crate::invocation::MARKER_PREFIX;
use crate::session::SessionId;
use crate::transport::{Primitive, Transport, BUSY_LINE, IDLE_LINE};

const PROMPT: &str = "$ ";
const CONTINUATION: &str = "> ";
/// Blank rows shown below the last history line
const PADDING_ROWS: usize = 2;

/// What a submitted command does
#[derive(Debug, Clone)]
pub struct FakeRun {
    lines: Vec<String>,
    per_line: Duration,
}

impl FakeRun {
    /// Prints everything at once and exits
    pub fn immediate(lines: Vec<String>) -> Self {
        Self {
            lines,
            per_line: Duration::ZERO,
        }
    }

    /// Prints one line every `per_line`, exiting with the last one
    pub fn paced(lines: Vec<String>, per_line: Duration) -> Self {
        Self { lines, per_line }
    }
}

type Responder = Box<dyn Fn(&str) -> FakeRun + Send + Sync>;

#[derive(Debug)]
struct Running {
    lines: Vec<String>,
    per_line: Duration,
    started: Instant,
    shown: usize,
}

#[derive(Debug)]
struct Pane {
    history: VecDeque<String>,
    capacity: usize,
    running: Option<Running>,
    buffers: HashMap<String, Vec<u8>>,
    input: String,
    sent_keys: Vec<Vec<String>>,
    round_trips: usize,
    unreachable: bool,
}

impl Pane {
    fn push_line(&mut self, line: String) {
        self.history.push_back(line);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// Reveal output that is due and return to the prompt when done
    fn advance(&mut self) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        let elapsed = Instant::now().saturating_duration_since(running.started);
        let total = running.lines.len();
        let due = if running.per_line.is_zero() {
            total
        } else {
            let due = elapsed.as_nanos() / running.per_line.as_nanos();
            usize::try_from(due).unwrap_or(usize::MAX).min(total)
        };
        let finished = due == total && elapsed >= running.per_line * total as u32;

        let new_lines: Vec<String> = running.lines[running.shown..due].to_vec();
        running.shown = due;
        for line in new_lines {
            self.push_line(line);
        }
        if finished {
            self.running = None;
            self.push_line(PROMPT.to_string());
        }
    }

    fn capture(&self) -> String {
        let mut text = self.history.iter().cloned().collect::<Vec<_>>().join("\n");
        text.push('\n');
        text.push_str(&"\n".repeat(PADDING_ROWS));
        text
    }

    /// `<cursor_y> <pane_height>`: a running command's output leaves the
    /// cursor on the first blank row, an idle shell keeps it on the prompt
    fn cursor_position(&self) -> String {
        let height = self.history.len() + PADDING_ROWS;
        let row = if self.running.is_some() {
            self.history.len()
        } else {
            self.history.len().saturating_sub(1)
        };
        format!("{} {}\n", row, height)
    }

    fn interrupt(&mut self) {
        if self.running.take().is_some() {
            self.push_line("^C".to_string());
            self.push_line(PROMPT.to_string());
        }
    }
}

/// Fake transport over one simulated pane
pub struct FakeTransport {
    pane: Mutex<Pane>,
    responder: Responder,
}

impl FakeTransport {
    /// Shell that only understands `echo`
    pub fn new() -> Self {
        Self::with_responder(echo_responder)
    }

    pub fn with_responder(responder: impl Fn(&str) -> FakeRun + Send + Sync + 'static) -> Self {
        Self {
            pane: Mutex::new(Pane {
                history: VecDeque::from([PROMPT.to_string()]),
                capacity: 10_000,
                running: None,
                buffers: HashMap::new(),
                input: String::new(),
                sent_keys: Vec::new(),
                round_trips: 0,
                unreachable: false,
            }),
            responder: Box::new(responder),
        }
    }

    /// Pane already showing `lines` above the prompt
    pub fn with_history(lines: &[&str]) -> Self {
        let fake = Self::new();
        {
            let mut pane = fake.pane.lock().unwrap();
            pane.history.clear();
            for line in lines {
                pane.push_line(line.to_string());
            }
            pane.push_line(PROMPT.to_string());
        }
        fake
    }

    /// Limit retained history to `lines`
    pub fn capacity(self, lines: usize) -> Self {
        self.pane.lock().unwrap().capacity = lines;
        self
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.pane.lock().unwrap().unreachable = unreachable;
    }

    pub fn round_trips(&self) -> usize {
        self.pane.lock().unwrap().round_trips
    }

    pub fn sent_keys(&self) -> Vec<Vec<String>> {
        self.pane.lock().unwrap().sent_keys.clone()
    }

    /// Current pane contents as a capture would return them
    pub fn pane_text(&self) -> String {
        let mut pane = self.pane.lock().unwrap();
        pane.advance();
        pane.capture()
    }

    /// Someone else typing a command directly into the pane
    pub fn type_and_submit(&self, text: &str) {
        let mut pane = self.pane.lock().unwrap();
        pane.advance();
        pane.input.push_str(text);
        self.submit(&mut pane);
    }

    /// Ctrl-C on whatever is running
    pub fn interrupt(&self) {
        let mut pane = self.pane.lock().unwrap();
        pane.advance();
        pane.interrupt();
    }

    fn submit(&self, pane: &mut Pane) {
        let text = std::mem::take(&mut pane.input);
        let mut lines = text.split('\n');
        let first = lines.next().unwrap_or_default();
        match pane.history.back_mut() {
            Some(current) => current.push_str(first),
            None => pane.push_line(format!("{}{}", PROMPT, first)),
        }
        for line in lines {
            pane.push_line(format!("{}{}", CONTINUATION, line));
        }

        let run = (self.responder)(&text);
        pane.running = Some(Running {
            lines: run.lines,
            per_line: run.per_line,
            started: Instant::now(),
            shown: 0,
        });
        pane.advance();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn run(&self, session: &SessionId, ops: &[Primitive]) -> Result<String> {
        let mut pane = self.pane.lock().unwrap();
        pane.round_trips += 1;
        if pane.unreachable {
            return Err(MuxexecError::TransportExit {
                code: 255,
                stderr: "ssh: connect to host: Connection refused".into(),
            });
        }
        pane.advance();

        let mut out = String::new();
        for op in ops {
            match op {
                Primitive::RequireIdle => {
                    if pane.running.is_some() {
                        return Err(MuxexecError::Busy {
                            session: session.to_string(),
                        });
                    }
                }
                Primitive::ProbeBusy => {
                    let line = if pane.running.is_some() { BUSY_LINE } else { IDLE_LINE };
                    out.push_str(line);
                    out.push('\n');
                }
                Primitive::CursorPosition => out.push_str(&pane.cursor_position()),
                Primitive::Capture => out.push_str(&pane.capture()),
                Primitive::LoadBuffer { name, bytes } => {
                    pane.buffers.insert(name.clone(), bytes.clone());
                }
                Primitive::PasteBuffer { name, delete } => {
                    let Some(bytes) = pane.buffers.get(name).cloned() else {
                        return Err(MuxexecError::TransportExit {
                            code: 1,
                            stderr: format!("no buffer {}", name),
                        });
                    };
                    pane.input.push_str(&String::from_utf8_lossy(&bytes));
                    if *delete {
                        pane.buffers.remove(name);
                    }
                }
                Primitive::Submit => self.submit(&mut pane),
                Primitive::SendKeys(keys) => {
                    pane.sent_keys.push(keys.clone());
                    for key in keys {
                        match key.as_str() {
                            "C-c" => pane.interrupt(),
                            "Enter" => self.submit(&mut pane),
                            _ => {}
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn describe(&self) -> String {
        "fake".into()
    }
}

/// Prints the arguments of every `echo` in the submitted text
fn echo_responder(text: &str) -> FakeRun {
    let mut output = Vec::new();
    for line in text.split('\n') {
        let code = match line.find(&format!("# {}", MARKER_PREFIX)) {
            Some(idx) => &line[..idx],
            None => line,
        };
        for statement in code.split(';') {
            if let Some(arg) = statement.trim().strip_prefix("echo ") {
                output.push(arg.trim().to_string());
            }
        }
    }
    FakeRun::immediate(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_responder() {
        let run = echo_responder("echo A; echo B # __MUXEXEC_x__");
        assert_eq!(run.lines, vec!["A", "B"]);
        let run = echo_responder("{ # __MUXEXEC_x__\necho a\nls\necho b\n}");
        assert_eq!(run.lines, vec!["a", "b"]);
    }

    #[test]
    fn test_submit_echoes_input() {
        let fake = FakeTransport::new();
        fake.type_and_submit("echo hi");
        assert_eq!(fake.pane_text(), "$ echo hi\nhi\n$ \n\n\n");
    }

    #[test]
    fn test_history_capacity() {
        let fake = FakeTransport::with_responder(|_| {
            FakeRun::immediate((0..10).map(|i| i.to_string()).collect())
        })
        .capacity(4);
        fake.type_and_submit("x");
        assert_eq!(fake.pane_text(), "7\n8\n9\n$ \n\n\n");
    }

    #[test]
    fn test_cursor_follows_shell_state() {
        let fake = FakeTransport::with_responder(|_| {
            FakeRun::paced(vec!["a".into()], Duration::from_secs(60))
        });
        assert_eq!(fake.pane.lock().unwrap().cursor_position(), "0 3\n");
        fake.type_and_submit("job");
        assert_eq!(fake.pane.lock().unwrap().cursor_position(), "1 3\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_output_follows_clock() {
        let fake = FakeTransport::with_responder(|_| {
            FakeRun::paced(vec!["a".into(), "b".into()], Duration::from_secs(1))
        });
        fake.type_and_submit("job");
        assert_eq!(fake.pane_text(), "$ job\n\n\n");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fake.pane_text(), "$ job\na\n\n\n");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fake.pane_text(), "$ job\na\nb\n$ \n\n\n");
    }
}
