//! Run merging over a drained batch of records
//!
//! Consecutive `data/samples` records whose index ranges touch
//! (`next.start_index == previous.end_index`) are folded into one
//! [`SampleRun`]. Any other record, or a sample record that fails to decode,
//! is a boundary: the contiguity tracker is reset so the following sample
//! record always opens a new run.

use tracing::trace;

use crate::codec::SampleRecord;
use crate::types::{MessageRecord, topics};
use crate::BridgeError;

/// A maximal contiguous run of decoded samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRun {
    pub start_index: u32,
    pub end_index: u32,
    pub channel_count: usize,
    /// Raw values, channel-major within each row
    pub samples: Vec<i32>,
    /// Number of records merged into this run
    pub record_count: usize,
}

impl SampleRun {
    fn from_record(record: &SampleRecord<'_>) -> Self {
        let mut samples = Vec::new();
        record.extend_into(&mut samples);
        Self {
            start_index: record.start_index,
            end_index: record.end_index,
            channel_count: record.channel_count,
            samples,
            record_count: 1,
        }
    }

    fn append(&mut self, record: &SampleRecord<'_>) {
        record.extend_into(&mut self.samples);
        self.end_index = record.end_index;
        self.record_count += 1;
    }

    /// Rows declared by the index range.
    pub fn row_count(&self) -> usize {
        self.end_index.wrapping_sub(self.start_index) as usize
    }
}

/// One element of a partitioned batch, in batch order.
#[derive(Debug)]
pub enum BatchItem<'a> {
    /// Merged sample data
    Samples(SampleRun),
    /// Any non-sample record
    Message(&'a MessageRecord),
    /// A sample record that could not be decoded
    Rejected { record: &'a MessageRecord, error: BridgeError },
}

/// Fold accumulator: the items so far plus the contiguity tracker.
#[derive(Default)]
struct Merge<'a> {
    items: Vec<BatchItem<'a>>,
    previous_end: Option<u32>,
    previous_channels: usize,
}

impl<'a> Merge<'a> {
    fn push(mut self, record: &'a MessageRecord) -> Self {
        if !record.is_topic(topics::DATA_SAMPLES) {
            self.reset();
            self.items.push(BatchItem::Message(record));
            return self;
        }

        let decoded = match SampleRecord::decode(&record.payload) {
            Ok(decoded) => decoded,
            Err(error) => {
                self.reset();
                self.items.push(BatchItem::Rejected { record, error });
                return self;
            }
        };

        let contiguous = self.previous_end == Some(decoded.start_index)
            && self.previous_channels == decoded.channel_count;

        match self.items.last_mut() {
            Some(BatchItem::Samples(run)) if contiguous => {
                trace!(start = decoded.start_index, end = decoded.end_index, "Extending run");
                run.append(&decoded);
            }
            _ => self.items.push(BatchItem::Samples(SampleRun::from_record(&decoded))),
        }

        self.previous_end = Some(decoded.end_index);
        self.previous_channels = decoded.channel_count;
        self
    }

    fn reset(&mut self) {
        self.previous_end = None;
        self.previous_channels = 0;
    }
}

/// Partition a batch into merged sample runs and pass-through records.
pub fn merge_runs(batch: &[MessageRecord]) -> Vec<BatchItem<'_>> {
    batch.iter().fold(Merge::default(), Merge::push).items
}
