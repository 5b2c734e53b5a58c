//! Log output that cooperates with indicatif progress bars.
//!
//! Each formatted log line is buffered and written while the bars are
//! suspended, so the line lands above the bar instead of inside it.

use std::io::{self, Write};

use indicatif::MultiProgress;
use tracing_subscriber::fmt::MakeWriter;

/// Where finished log lines go.
pub trait LineSink {
    fn write_line(&self, buf: &[u8]);
}

impl<F, W> LineSink for F
where
    F: Fn() -> W,
    W: Write,
{
    fn write_line(&self, buf: &[u8]) {
        let mut out = self();
        let _ = out.write_all(buf);
        let _ = out.flush();
    }
}

pub struct BarAwareWriter<S> {
    multi: MultiProgress,
    sink: S,
}

impl BarAwareWriter<fn() -> io::Stderr> {
    pub fn stderr(multi: MultiProgress) -> Self {
        Self {
            multi,
            sink: io::stderr,
        }
    }
}

impl<S: LineSink> BarAwareWriter<S> {
    pub fn with_sink(multi: MultiProgress, sink: S) -> Self {
        Self { multi, sink }
    }
}

/// One buffered log record, written out on drop.
pub struct BufferedLine<'a, S: LineSink> {
    owner: &'a BarAwareWriter<S>,
    buf: Vec<u8>,
}

impl<S: LineSink> Write for BufferedLine<'_, S> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: LineSink> Drop for BufferedLine<'_, S> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        let owner = self.owner;
        owner.multi.suspend(|| owner.sink.write_line(&buf));
    }
}

impl<'a, S: LineSink + 'a> MakeWriter<'a> for BarAwareWriter<S> {
    type Writer = BufferedLine<'a, S>;

    fn make_writer(&'a self) -> Self::Writer {
        BufferedLine {
            owner: self,
            buf: Vec::new(),
        }
    }
}
