//! Protocol output.
//!
//! Replies come from the command loop and from the background worker, so
//! every write goes through one shared, line-buffered writer.

use std::backtrace::BacktraceStatus;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// A cloneable handle to the protocol output stream.
#[derive(Clone)]
pub struct UciOutput {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl UciOutput {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        UciOutput {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// An output that records everything written to it.
    #[must_use]
    pub fn buffer() -> (Self, OutputBuffer) {
        let buffer = OutputBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Write one line and flush.
    pub fn line(&self, text: impl AsRef<str>) {
        self.lines([text]);
    }

    /// Write several lines without interleaving output from other threads.
    pub fn lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut writer = self.writer.lock();
        let result = lines
            .into_iter()
            .try_for_each(|line| {
                log::trace!("< {}", line.as_ref());
                writeln!(writer, "{}", line.as_ref())
            })
            .and_then(|()| writer.flush());
        if let Err(e) = result {
            log::error!("failed to write protocol output: {e}");
        }
    }
}

/// In-memory sink created by [`UciOutput::buffer`].
#[derive(Clone, Default)]
pub struct OutputBuffer(Arc<Mutex<Vec<u8>>>);

impl OutputBuffer {
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Render an unexpected error as `info string` lines: the message, the
/// backtrace when one was captured, then every cause one level deeper
/// than the previous.
#[must_use]
pub fn fault_dump(err: &anyhow::Error) -> Vec<String> {
    let mut lines = vec![format!("info string {err}")];
    let backtrace = err.backtrace();
    if backtrace.status() == BacktraceStatus::Captured {
        lines.extend(
            backtrace
                .to_string()
                .lines()
                .map(|frame| format!("info string     {}", frame.trim())),
        );
    }
    for (level, cause) in err.chain().skip(1).enumerate() {
        lines.push(format!(
            "info string {}caused by: {cause}",
            "  ".repeat(level + 1)
        ));
    }
    lines
}
