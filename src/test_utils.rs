//! Test helpers shared by unit tests, integration tests and benchmarks
//!
//! Builders for amplifier payloads plus in-memory stand-ins for the sample
//! sink and the publishing side of a session.

#![cfg(any(test, feature = "benchmark"))]

use bytes::Bytes;
use parking_lot::Mutex;

use crate::codec::encode_samples;
use crate::connection::Publisher;
use crate::types::{MessageRecord, OutputSample, topics};
use crate::{BridgeError, Result, SampleSink};

/// A received `data/samples` record carrying `rows` starting at device
/// position `start`.
pub fn sample_record(start: u32, rows: &[Vec<i32>]) -> MessageRecord {
    MessageRecord::received(topics::DATA_SAMPLES, encode_samples(start, rows))
}

/// A received `data/samples` record covering positions `start..end` with
/// `channels` values per row.
///
/// Values are deterministic: row `r`, channel `c` holds `r * 16 + c`.
pub fn sample_record_range(start: u32, end: u32, channels: usize) -> MessageRecord {
    sample_record(start, &sample_rows(start, end, channels))
}

/// Rows for positions `start..end`, matching [`sample_record_range`].
pub fn sample_rows(start: u32, end: u32, channels: usize) -> Vec<Vec<i32>> {
    (start..end).map(|r| (0..channels).map(|c| r as i32 * 16 + c as i32).collect()).collect()
}

/// A received `data/event` record.
pub fn event_record(kind: u32, position: u32) -> MessageRecord {
    MessageRecord::received(topics::DATA_EVENT, format!(r#"{{"kind": {kind}, "lower": {position}}}"#))
}

/// A received `state/device/info` record declaring `scale`.
pub fn device_info_record(scale: f32) -> MessageRecord {
    MessageRecord::received(topics::DEVICE_INFO, format!(r#"{{"scale_to_uV": {scale:?}}}"#))
}

/// Sink that keeps every sample it is given.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub samples: Vec<OutputSample>,
    fail_after: Option<usize>,
    accepted: usize,
}

impl CollectingSink {
    /// Accept `n` samples, then refuse every later one.
    pub fn failing_after(n: usize) -> Self {
        Self { fail_after: Some(n), ..Self::default() }
    }
}

impl SampleSink for CollectingSink {
    fn push_sample(&mut self, sample: &[f32], timestamp: f64) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.accepted >= limit) {
            return Err(BridgeError::sink_error("collecting sink is full"));
        }
        self.accepted += 1;
        self.samples.push(OutputSample { values: sample.to_vec(), timestamp });
        Ok(())
    }
}

/// Publisher that records instead of sending.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, Bytes)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, Bytes)> {
        self.published.lock().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.published.lock().iter().map(|(topic, _)| topic.clone()).collect()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.published.lock().push((topic.to_string(), payload));
        Ok(())
    }
}
