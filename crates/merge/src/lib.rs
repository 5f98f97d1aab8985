//! Merge engine for JW Library user data snapshots.
//!
//! [`MergeEngine`] copies every row of every source snapshot into one
//! destination, in [`EntityGraph`](jwlmerge_model::EntityGraph) order:
//! - surrogate ids are reassigned by the destination, and foreign keys are
//!   rewritten through per-snapshot id maps ([`MergeContext`]);
//! - Location and Tag rows already present in the destination are reused
//!   rather than duplicated ([`DeduplicationMatcher`]);
//! - problems with a single row are reported as [`RowOutcome::Skipped`] and
//!   the pass carries on, while storage failures abort the run.

mod dedup;
mod engine;
pub mod error;
mod event;
mod outcome;
mod remap;

pub use crate::dedup::{DeduplicationMatcher, Match};
pub use crate::engine::MergeEngine;
pub use crate::event::{Discard, MergeEvent, MessageSink};
pub use crate::outcome::{MergeReport, RowOutcome, SkipReason, SkippedSnapshot, SnapshotSummary, TypeSummary};
pub use crate::remap::{BrokenReference, BrokenReferencePolicy, IdMap, MergeContext};
