use crate::outcome::SnapshotSummary;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Progress notifications emitted while a merge runs.
///
/// Events are informational only. For each snapshot, either
/// [`SnapshotStarted`](Self::SnapshotStarted) is followed by
/// [`SnapshotFinished`](Self::SnapshotFinished) (or [`Failed`](Self::Failed)
/// if the run aborts), or a single [`SnapshotSkipped`](Self::SnapshotSkipped)
/// is emitted instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeEvent {
    SnapshotStarted { label: String },
    SnapshotFinished { summary: SnapshotSummary },
    SnapshotSkipped { label: String, reason: String },
    /// The run hit a fatal error and is about to stop.
    Failed { message: String },
}

impl Display for MergeEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MergeEvent::SnapshotStarted { label } => write!(f, "Merging {label}"),
            MergeEvent::SnapshotFinished { summary } => write!(f, "Merged {summary}"),
            MergeEvent::SnapshotSkipped { label, reason } => write!(f, "Skipped {label}: {reason}"),
            MergeEvent::Failed { message } => write!(f, "Merge failed: {message}"),
        }
    }
}

/// Receives [`MergeEvent`]s.
///
/// Implemented for any `FnMut(&MergeEvent)`, so a closure will do:
///
/// ```
/// use jwlmerge_merge::{MergeEvent, MessageSink};
///
/// let mut seen = Vec::new();
/// let mut sink = |event: &MergeEvent| seen.push(event.to_string());
/// sink.notify(&MergeEvent::SnapshotStarted { label: "a.jwlibrary".into() });
/// assert_eq!(seen, vec!["Merging a.jwlibrary"]);
/// ```
pub trait MessageSink {
    fn notify(&mut self, event: &MergeEvent);
}

impl<F: FnMut(&MergeEvent)> MessageSink for F {
    fn notify(&mut self, event: &MergeEvent) {
        self(event)
    }
}

/// A sink that drops every event.
pub struct Discard;

impl MessageSink for Discard {
    fn notify(&mut self, _event: &MergeEvent) {}
}
