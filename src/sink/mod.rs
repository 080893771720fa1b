//! Downstream sample sinks
//!
//! The reconstructor pushes one sample at a time with its synthetic
//! timestamp. Sinks must not reorder; buffering is up to the endpoint.

#[cfg(feature = "lsl")]
mod lsl_outlet;

#[cfg(feature = "lsl")]
pub use lsl_outlet::LslSink;

use tracing::trace;

use crate::Result;

/// Consumer of reconstructed samples.
pub trait SampleSink {
    /// Push one sample (channels, event slot, index slot) at `timestamp` seconds.
    fn push_sample(&mut self, sample: &[f32], timestamp: f64) -> Result<()>;
}

impl<S: SampleSink + ?Sized> SampleSink for Box<S> {
    fn push_sample(&mut self, sample: &[f32], timestamp: f64) -> Result<()> {
        (**self).push_sample(sample, timestamp)
    }
}

/// Sink that logs every sample at trace level.
///
/// Used for dry runs and when no streaming layer is compiled in.
#[derive(Debug, Default)]
pub struct TracingSink {
    pushed: u64,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushed(&self) -> u64 {
        self.pushed
    }
}

impl SampleSink for TracingSink {
    fn push_sample(&mut self, sample: &[f32], timestamp: f64) -> Result<()> {
        self.pushed += 1;
        trace!(timestamp, ?sample, "Sample");
        Ok(())
    }
}
