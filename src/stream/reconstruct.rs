//! Stream reconstruction: merged runs in, evenly time-stamped samples out
//!
//! The reconstructor is strictly single-threaded. It owns the device scale
//! factor, the pending marker event and the synthetic clock, and turns each
//! decoded row into exactly one output sample.

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use super::event::EventState;
use super::merge::SampleRun;
use crate::sink::SampleSink;
use crate::{BridgeError, Result};

/// Scale factor used until the device declares its own.
pub const DEFAULT_SCALE_TO_UV: f32 = 0.5364;

/// Reconstructor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Waiting for device info before requesting sampling
    Idle,
    /// Sampling has been requested
    Streaming,
}

/// What one run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub emitted: usize,
    pub sink_errors: usize,
    pub channel_mismatch: bool,
}

/// Turns decoded sample runs into output samples.
#[derive(Debug)]
pub struct Reconstructor {
    channel_count: usize,
    sample_rate: f64,
    timestamp_origin: f64,
    scale: f32,
    state: StreamState,
    events: EventState,
    /// Samples emitted this session; also the trailing index slot
    emitted: u64,
    buffer: Vec<f32>,
}

impl Reconstructor {
    /// Create a reconstructor for `channel_count` physical channels at `sample_rate` Hz.
    ///
    /// # Panics
    ///
    /// Panics if `channel_count` is zero or `sample_rate` is not positive; both
    /// come from the static montage table.
    pub fn new(channel_count: usize, sample_rate: f64) -> Self {
        assert!(channel_count > 0, "montage must have at least one channel");
        assert!(sample_rate > 0.0, "sample rate must be positive");
        Self {
            channel_count,
            sample_rate,
            timestamp_origin: 0.0,
            scale: DEFAULT_SCALE_TO_UV,
            state: StreamState::Idle,
            events: EventState::default(),
            emitted: 0,
            buffer: vec![0.0; channel_count + 2],
        }
    }

    /// Offset added to every synthetic timestamp.
    pub fn with_timestamp_origin(mut self, origin: f64) -> Self {
        self.timestamp_origin = origin;
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn samples_emitted(&self) -> u64 {
        self.emitted
    }

    /// Seconds of signal emitted so far.
    pub fn elapsed_secs(&self) -> f64 {
        self.emitted as f64 / self.sample_rate
    }

    /// Handle a `state/device/info` message.
    ///
    /// Reads a floating-point `scale_to_uV` if present, otherwise keeps the
    /// current factor. Returns `true` on the idle to streaming transition, when
    /// the caller must send the sampling-start command.
    pub fn on_device_info(&mut self, payload: &[u8]) -> bool {
        match serde_json::from_slice::<Value>(payload) {
            Ok(info) => match info.get("scale_to_uV") {
                Some(Value::Number(n)) if n.is_f64() => {
                    self.scale = n.as_f64().unwrap_or(f64::from(DEFAULT_SCALE_TO_UV)) as f32;
                    info!(scale = self.scale, "Device scale factor");
                }
                Some(other) => warn!(value = %other, "Ignoring non-float scale_to_uV"),
                None => debug!(scale = self.scale, "Device info without scale_to_uV"),
            },
            Err(e) => warn!("Unreadable device info: {}", e),
        }

        match self.state {
            StreamState::Idle => {
                self.state = StreamState::Streaming;
                true
            }
            StreamState::Streaming => false,
        }
    }

    /// Handle a `data/event` message.
    pub fn on_event(&mut self, payload: &[u8]) -> Result<()> {
        self.events.apply(payload)
    }

    pub fn events(&self) -> &EventState {
        &self.events
    }

    /// Emit one sample per row of `run` into `sink`.
    ///
    /// A run whose channel count differs from the configured one is reported
    /// and decoded best-effort against the configured width; a trailing
    /// partial row is dropped. Sink failures are logged and counted, never
    /// propagated.
    pub fn process_run<S>(&mut self, run: &SampleRun, sink: &mut S) -> RunOutcome
    where
        S: SampleSink + ?Sized,
    {
        let width = self.channel_count;
        let mut outcome = RunOutcome::default();

        if run.channel_count != width {
            let mismatch = BridgeError::ChannelMismatch { expected: width, found: run.channel_count };
            warn!(start = run.start_index, end = run.end_index, "{}", mismatch);
            outcome.channel_mismatch = true;
        }

        let rows = run.samples.chunks_exact(width);
        if !rows.remainder().is_empty() {
            debug!(dropped = rows.remainder().len(), "Dropping partial trailing row");
        }

        for (offset, row) in rows.enumerate() {
            let position = run.start_index.wrapping_add(offset as u32);

            for (slot, raw) in self.buffer[..width].iter_mut().zip(row) {
                *slot = *raw as f32 * self.scale;
            }
            self.buffer[width] = self.events.resolve(position);
            self.buffer[width + 1] = self.emitted as f32;

            self.emitted += 1;
            let timestamp = self.timestamp_origin + self.emitted as f64 / self.sample_rate;

            if let Err(e) = sink.push_sample(&self.buffer, timestamp) {
                warn!(position, "Sink rejected sample: {}", e);
                outcome.sink_errors += 1;
            }
            outcome.emitted += 1;
        }

        trace!(
            start = run.start_index,
            end = run.end_index,
            emitted = outcome.emitted,
            "Run processed"
        );
        outcome
    }
}
