//! Output samples produced by the stream reconstructor

/// One reconstructed multichannel sample.
///
/// Layout: one scaled value per physical channel, then the event slot, then
/// the running sample index.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSample {
    pub values: Vec<f32>,
    /// Synthetic timestamp in seconds
    pub timestamp: f64,
}

impl OutputSample {
    /// Number of physical channels (excludes the two trailing slots).
    pub fn channel_count(&self) -> usize {
        self.values.len().saturating_sub(2)
    }

    pub fn channels(&self) -> &[f32] {
        &self.values[..self.channel_count()]
    }

    /// Event slot, or `None` if `values` is too short to carry one.
    pub fn event(&self) -> Option<f32> {
        self.trailing_slots().map(|[event, _]| event)
    }

    /// Running sample index, or `None` if `values` is too short to carry one.
    pub fn index(&self) -> Option<f32> {
        self.trailing_slots().map(|[_, index]| index)
    }

    fn trailing_slots(&self) -> Option<[f32; 2]> {
        match &self.values[self.channel_count()..] {
            [event, index] => Some([*event, *index]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_follow_the_channels() {
        let sample = OutputSample { values: vec![1.5, -2.0, 7.0, 41.0], timestamp: 0.1 };
        assert_eq!(sample.channel_count(), 2);
        assert_eq!(sample.channels(), [1.5, -2.0]);
        assert_eq!(sample.event(), Some(7.0));
        assert_eq!(sample.index(), Some(41.0));
    }

    #[test]
    fn short_samples_have_no_slots() {
        for values in [vec![], vec![3.0]] {
            let sample = OutputSample { values, timestamp: 0.0 };
            assert_eq!(sample.channel_count(), 0);
            assert!(sample.channels().is_empty());
            assert_eq!(sample.event(), None);
            assert_eq!(sample.index(), None);
        }
    }
}
