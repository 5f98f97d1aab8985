use jwlmerge_merge::{MergeEvent, MessageSink};
use std::fmt::Display;
use std::io::{self, Stdout, Write};

/// Line-oriented progress output.
///
/// Receives both the merge engine's events and the steps around them
/// (extracting, packaging). Write failures are ignored: progress is
/// informational.
pub struct Console<W: Write> {
    out: W,
}

impl Console<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn step(&mut self, message: impl Display) {
        let _ = writeln!(self.out, "{message}");
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MessageSink for Console<W> {
    fn notify(&mut self, event: &MergeEvent) {
        self.step(event);
    }
}
