//! Destinations for incrementally emitted output

use std::io::Write;

use muxexec_utils::Result;

/// Receives output chunks as soon as they are emitted
pub trait OutputSink: Send {
    fn emit(&mut self, chunk: &str) -> Result<()>;
}

/// Writes straight to stdout, flushing after every chunk
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, chunk: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(chunk.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

/// Accumulates chunks in memory
#[derive(Debug, Default)]
pub struct CollectSink {
    chunks: Vec<String>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// All chunks concatenated
    pub fn text(&self) -> String {
        self.chunks.concat()
    }
}

impl OutputSink for CollectSink {
    fn emit(&mut self, chunk: &str) -> Result<()> {
        self.chunks.push(chunk.to_string());
        Ok(())
    }
}

/// Discards everything; used when only the final outcome matters
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _chunk: &str) -> Result<()> {
        Ok(())
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn emit(&mut self, chunk: &str) -> Result<()> {
        (**self).emit(chunk)
    }
}
