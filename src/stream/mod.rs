//! Sample stream reconstruction.
//!
//! - [`merge`] partitions a drained batch into contiguous sample runs
//! - [`event`] tracks the pending marker event
//! - [`reconstruct`] scales rows, aligns events and clocks the output

pub mod event;
pub mod merge;
pub mod reconstruct;

pub use event::EventState;
pub use merge::{BatchItem, SampleRun, merge_runs};
pub use reconstruct::{DEFAULT_SCALE_TO_UV, Reconstructor, RunOutcome, StreamState};
