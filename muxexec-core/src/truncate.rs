//! Head + tail output budget
//!
//! Streaming emits output verbatim up to the head budget. Past that point
//! output is held back; once it is known to exceed head + tail the sentinel is
//! emitted and nothing more is streamed. The tail is only derived when the
//! watch ends, from the final output, so it reflects where the command really
//! stopped. Output that fits the whole budget never shows a sentinel.
//!
//! All counts are in characters.

use serde::{Deserialize, Serialize};

use crate::extract::{char_len, first_chars, last_chars, skip_chars};
use crate::sentinel::{push_line, TRUNCATED};

/// Characters kept from the start and end of the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Budget {
    pub head: usize,
    pub tail: usize,
}

impl Budget {
    pub const fn new(head: usize, tail: usize) -> Self {
        Self { head, tail }
    }

    /// Emit everything
    pub const fn disabled() -> Self {
        Self { head: 0, tail: 0 }
    }

    /// Split a total budget between head and tail
    pub const fn split(total: usize) -> Self {
        let head = total / 2;
        Self {
            head,
            tail: total - head,
        }
    }

    pub const fn total(&self) -> usize {
        self.head + self.tail
    }

    pub const fn is_disabled(&self) -> bool {
        self.total() == 0
    }
}

/// Per-invocation truncation bookkeeping
#[derive(Debug, Clone)]
pub struct Truncator {
    budget: Budget,
    /// Output characters seen so far
    consumed: usize,
    /// Output characters emitted verbatim from the start
    emitted: usize,
    truncated: bool,
    finished: bool,
    at_line_start: bool,
}

impl Truncator {
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            consumed: 0,
            emitted: 0,
            truncated: false,
            finished: false,
            at_line_start: true,
        }
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Whether the last emitted character was a newline
    pub fn at_line_start(&self) -> bool {
        self.at_line_start
    }

    /// Feed newly observed output, returning what to emit now
    pub fn push(&mut self, chunk: &str) -> String {
        let mut out = String::new();
        if self.finished || chunk.is_empty() {
            return out;
        }

        let len = char_len(chunk);
        self.consumed += len;

        if self.budget.is_disabled() {
            self.emitted += len;
            self.append(&mut out, chunk);
            return out;
        }
        if self.truncated {
            return out;
        }

        // Below the head budget every earlier chunk went out whole
        if self.emitted < self.budget.head {
            let take = (self.budget.head - self.emitted).min(len);
            self.append(&mut out, first_chars(chunk, take));
            self.emitted += take;
        }

        if self.consumed > self.budget.total() {
            self.append_sentinel(&mut out);
        }
        out
    }

    /// Close out with the complete output, returning the final emission
    ///
    /// Emits whatever of the head is still owed, the sentinel if it has not
    /// appeared yet and the output exceeds the budget, then the last `tail`
    /// characters of `full`. Later calls emit nothing.
    pub fn finish(&mut self, full: &str) -> String {
        let mut out = String::new();
        if self.finished {
            return out;
        }
        self.finished = true;

        let total = char_len(full);
        if self.budget.is_disabled() || (!self.truncated && total <= self.budget.total()) {
            self.append(&mut out, skip_chars(full, self.emitted));
            self.emitted = self.emitted.max(total);
            return out;
        }

        if self.emitted < self.budget.head {
            let owed = self.budget.head - self.emitted;
            self.append(&mut out, first_chars(skip_chars(full, self.emitted), owed));
            self.emitted = self.budget.head;
        }
        if !self.truncated {
            self.append_sentinel(&mut out);
        }
        self.append(&mut out, last_chars(full, self.budget.tail));
        out
    }

    fn append(&mut self, out: &mut String, text: &str) {
        if text.is_empty() {
            return;
        }
        out.push_str(text);
        self.at_line_start = text.ends_with('\n');
    }

    fn append_sentinel(&mut self, out: &mut String) {
        push_line(out, self.at_line_start, TRUNCATED);
        self.at_line_start = true;
        self.truncated = true;
    }
}
