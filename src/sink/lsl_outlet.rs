//! Lab Streaming Layer outlet sink

use lsl::{ChannelFormat, ExPushable, StreamInfo, StreamOutlet};
use tracing::info;

use super::SampleSink;
use crate::montage::Montage;
use crate::{BridgeError, Result};

/// Pushes reconstructed samples to an LSL float32 outlet.
pub struct LslSink {
    outlet: StreamOutlet,
}

impl LslSink {
    /// Create the outlet for `montage`: its channels plus the event and index slots.
    pub fn new(name: &str, stream_type: &str, source_id: &str, montage: &Montage) -> Result<Self> {
        let width = montage.stream_width();
        let info = StreamInfo::new(
            name,
            stream_type,
            width as u32,
            montage.sampling_rate,
            ChannelFormat::Float32,
            source_id,
        )
        .map_err(|e| BridgeError::sink_error(format!("creating stream info: {e}")))?;

        let outlet = StreamOutlet::new(&info, 0, 360)
            .map_err(|e| BridgeError::sink_error(format!("creating outlet: {e}")))?;

        info!(
            name,
            stream_type,
            channels = width,
            rate = montage.sampling_rate,
            "LSL outlet created"
        );
        Ok(Self { outlet })
    }
}

impl SampleSink for LslSink {
    fn push_sample(&mut self, sample: &[f32], timestamp: f64) -> Result<()> {
        self.outlet
            .push_sample_ex(&sample.to_vec(), timestamp, true)
            .map_err(|e| BridgeError::sink_error(format!("push_sample: {e}")))
    }
}
