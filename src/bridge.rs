//! Foreground bridge: drain, merge, reconstruct, publish
//!
//! The [`Bridge`] runs on the caller's thread. Each poll drains the session
//! inbox, partitions the batch into sample runs and side-channel records,
//! and feeds the runs through the [`Reconstructor`] into a [`SampleSink`].
//! Device info triggers the sampling-start command once; battery topics
//! update [`BatteryStatus`]; everything else is reported on the console.

use bytes::Bytes;
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::BridgeTiming;
use crate::connection::{Connection, Publisher};
use crate::montage::Montage;
use crate::sink::SampleSink;
use crate::stream::{BatchItem, Reconstructor, StreamState, merge_runs};
use crate::Result;
use crate::types::{BatteryStatus, Direction, MessageRecord, topics};

/// Running counters for the status report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub samples_emitted: u64,
    pub runs_processed: u64,
    /// Undecodable sample records and unreadable events
    pub records_skipped: u64,
    pub channel_mismatches: u64,
    pub sink_errors: u64,
    pub critical_battery_warnings: u64,
}

/// Turns drained session traffic into a reconstructed sample stream.
pub struct Bridge<S> {
    montage: &'static Montage,
    reconstructor: Reconstructor,
    sink: S,
    battery: BatteryStatus,
    stats: BridgeStats,
    timing: BridgeTiming,
    last_critical_warning: Option<Instant>,
}

impl<S: SampleSink> Bridge<S> {
    pub fn new(montage: &'static Montage, sink: S) -> Self {
        Self {
            montage,
            reconstructor: Reconstructor::new(montage.channel_count(), montage.sampling_rate),
            sink,
            battery: BatteryStatus::default(),
            stats: BridgeStats::default(),
            timing: BridgeTiming::default(),
            last_critical_warning: None,
        }
    }

    pub fn with_timing(mut self, timing: BridgeTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Offset applied to every synthetic timestamp.
    pub fn with_timestamp_origin(mut self, origin: f64) -> Self {
        self.reconstructor = self.reconstructor.with_timestamp_origin(origin);
        self
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn battery(&self) -> BatteryStatus {
        self.battery
    }

    pub fn state(&self) -> StreamState {
        self.reconstructor.state()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Process one drained batch in order. Returns the number of samples emitted.
    pub fn process_batch(&mut self, records: &[MessageRecord], publisher: &dyn Publisher) -> usize {
        let mut emitted = 0;

        for item in merge_runs(records) {
            match item {
                BatchItem::Samples(run) => {
                    let outcome = self.reconstructor.process_run(&run, &mut self.sink);
                    self.stats.runs_processed += 1;
                    self.stats.samples_emitted += outcome.emitted as u64;
                    self.stats.sink_errors += outcome.sink_errors as u64;
                    if outcome.channel_mismatch {
                        self.stats.channel_mismatches += 1;
                    }
                    emitted += outcome.emitted;
                }
                BatchItem::Message(record) => self.dispatch(record, publisher),
                BatchItem::Rejected { record, error } => {
                    warn!(topic = %record.topic, bytes = record.payload.len(), "Skipping record: {}", error);
                    self.stats.records_skipped += 1;
                }
            }
        }

        if emitted > 0 {
            debug!(records = records.len(), emitted, "Batch processed");
        }
        emitted
    }

    fn dispatch(&mut self, record: &MessageRecord, publisher: &dyn Publisher) {
        if record.direction == Direction::Sent {
            debug!(topic = %record.topic, "Sent");
            return;
        }

        match record.topic.as_str() {
            topics::DEVICE_INFO => {
                if self.reconstructor.on_device_info(&record.payload) {
                    self.start_sampling(publisher);
                }
            }
            topics::DATA_EVENT => {
                if let Err(e) = self.reconstructor.on_event(&record.payload) {
                    warn!("Skipping event: {}", e);
                    self.stats.records_skipped += 1;
                }
            }
            topic => {
                let text = String::from_utf8_lossy(&record.payload);
                if self.battery.apply(topic, &text) {
                    trace!(topic, battery = %self.battery, "Battery update");
                    if self.battery.critical {
                        self.warn_critical_battery();
                    }
                } else {
                    info!("{}: {}", topic, text);
                }
            }
        }
    }

    fn start_sampling(&mut self, publisher: &dyn Publisher) {
        let payload = match self.montage.start_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Cannot build sampling-start command: {}", e);
                return;
            }
        };
        info!(montage = self.montage.name, channels = self.montage.channel_count(), "Starting sampling");
        if let Err(e) = publisher.publish(topics::SAMPLING_START, Bytes::from(payload)) {
            warn!("Failed to request sampling: {}", e);
        }
    }

    fn warn_critical_battery(&mut self) {
        let now = Instant::now();
        let due = self
            .last_critical_warning
            .is_none_or(|last| now.duration_since(last) >= self.timing.status_interval);
        if due {
            warn!(battery = %self.battery, "Amplifier battery critical");
            self.last_critical_warning = Some(now);
            self.stats.critical_battery_warnings += 1;
        }
    }

    /// Log the one-line status report.
    pub fn report_status(&self) {
        info!(
            samples = self.stats.samples_emitted,
            seconds = format_args!("{:.1}", self.reconstructor.elapsed_secs()),
            battery = %self.battery,
            "Status"
        );
    }

    /// Drain the connection once and process what it held.
    pub fn poll_once(&mut self, connection: &Connection) -> Result<usize> {
        let records = connection.drain()?;
        Ok(self.process_batch(&records, connection))
    }

    /// Poll until `shutdown` fires, then stop sampling and disconnect.
    ///
    /// Shutdown publishes an empty `action/sampling/stop`, waits the stop
    /// grace period, processes whatever arrived meanwhile and disconnects.
    pub async fn run(&mut self, connection: &mut Connection, shutdown: CancellationToken) -> Result<()> {
        let mut poll = tokio::time::interval(self.timing.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status = tokio::time::interval(self.timing.status_interval);
        status.set_missed_tick_behavior(MissedTickBehavior::Delay);
        status.tick().await;

        info!(montage = self.montage.id, "Bridge running");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = poll.tick() => {
                    self.poll_once(connection)?;
                }
                _ = status.tick() => self.report_status(),
            }
        }

        info!("Stopping sampling");
        if let Err(e) = connection.publish(topics::SAMPLING_STOP, Bytes::new()) {
            warn!("Failed to stop sampling: {}", e);
        }
        tokio::time::sleep(self.timing.stop_grace).await;

        if let Ok(records) = connection.drain() {
            self.process_batch(&records, &*connection);
        }
        self.report_status();
        connection.disconnect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        CollectingSink, RecordingPublisher, device_info_record, event_record, sample_record,
        sample_record_range,
    };
    use std::time::Duration;

    fn bridge() -> Bridge<CollectingSink> {
        Bridge::new(Montage::by_id(1).unwrap(), CollectingSink::default())
    }

    #[test]
    fn device_info_requests_sampling_once() {
        let mut bridge = bridge();
        let publisher = RecordingPublisher::new();

        bridge.process_batch(&[device_info_record(0.5), device_info_record(0.5)], &publisher);

        assert_eq!(publisher.topics(), [topics::SAMPLING_START]);
        let published = publisher.published();
        let body: serde_json::Value = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(body["channel_label"], serde_json::json!(["Fp2", "HR"]));
        assert_eq!(bridge.state(), StreamState::Streaming);
    }

    #[test]
    fn contiguous_records_become_one_run() {
        let mut bridge = bridge();
        let publisher = RecordingPublisher::new();
        let batch = [
            sample_record_range(0, 10, 2),
            sample_record_range(10, 25, 2),
            sample_record_range(30, 40, 2),
        ];

        let emitted = bridge.process_batch(&batch, &publisher);

        assert_eq!(emitted, 35);
        let stats = bridge.stats();
        assert_eq!(stats.runs_processed, 2);
        assert_eq!(stats.samples_emitted, 35);
        let indices: Vec<f32> = bridge.sink().samples.iter().map(|s| s.index().unwrap()).collect();
        assert_eq!(indices, (0..35).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn events_are_aligned_within_the_batch() {
        let mut bridge = bridge();
        let publisher = RecordingPublisher::new();
        let batch = [event_record(5, 3), sample_record_range(0, 6, 2)];

        bridge.process_batch(&batch, &publisher);

        let events: Vec<f32> = bridge.sink().samples.iter().map(|s| s.event().unwrap()).collect();
        assert_eq!(events, vec![0.0, 0.0, 0.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn bad_records_are_skipped_and_counted() {
        let mut bridge = bridge();
        let publisher = RecordingPublisher::new();
        let batch = [
            MessageRecord::received(topics::DATA_SAMPLES, vec![1u8, 2, 3]),
            MessageRecord::received(topics::DATA_EVENT, "not json"),
            sample_record(0, &[vec![1, 2, 3]]),
        ];

        bridge.process_batch(&batch, &publisher);

        let stats = bridge.stats();
        assert_eq!(stats.records_skipped, 2);
        assert_eq!(stats.channel_mismatches, 1);
        // three values read as one two-channel row
        assert_eq!(stats.samples_emitted, 1);
    }

    #[test]
    fn battery_topics_update_status() {
        let mut bridge = bridge();
        let publisher = RecordingPublisher::new();
        let batch = [
            MessageRecord::received(topics::BATTERY_CHARGE, "42"),
            MessageRecord::received(topics::BATTERY_VOLTAGE, "3.6"),
            MessageRecord::received(topics::BATTERY_CRITICAL, "false"),
        ];

        bridge.process_batch(&batch, &publisher);

        let battery = bridge.battery();
        assert_eq!(battery.charge_percent, Some(42));
        assert_eq!(battery.voltage, Some(3.6));
        assert!(!battery.critical);
        assert!(publisher.published().is_empty());
    }

    #[test]
    fn critical_battery_warnings_are_rate_limited() {
        let mut bridge = bridge().with_timing(BridgeTiming {
            status_interval: Duration::from_secs(3600),
            ..BridgeTiming::default()
        });
        let publisher = RecordingPublisher::new();
        let critical = MessageRecord::received(topics::BATTERY_CRITICAL, "true");

        bridge.process_batch(&[critical.clone(), critical.clone()], &publisher);
        bridge.process_batch(&[critical], &publisher);

        assert_eq!(bridge.stats().critical_battery_warnings, 1);
    }

    #[test]
    fn status_and_sent_records_do_not_disturb_the_stream() {
        let mut bridge = bridge();
        let publisher = RecordingPublisher::new();
        let batch = [
            sample_record_range(0, 4, 2),
            MessageRecord::status("Connection accepted"),
            MessageRecord::sent(topics::SAMPLING_STOP, "1"),
            sample_record_range(4, 8, 2),
        ];

        assert_eq!(bridge.process_batch(&batch, &publisher), 8);
        // the status record splits the runs
        assert_eq!(bridge.stats().runs_processed, 2);
    }

    #[test]
    fn timestamps_follow_the_montage_rate() {
        let mut bridge = bridge().with_timestamp_origin(10.0);
        let publisher = RecordingPublisher::new();
        bridge.process_batch(&[sample_record_range(0, 500, 2)], &publisher);

        let sink = bridge.into_sink();
        assert!((sink.samples[0].timestamp - 10.002).abs() < 1e-9);
        assert!((sink.samples[499].timestamp - 11.0).abs() < 1e-9);
    }
}
