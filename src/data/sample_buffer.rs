//! Growable, clearable sample history backing the plot and the readout.
use crate::core::Sample;

/// Ordered history of the samples received during a session.
///
/// Owned by the UI side. The acquisition pipeline never reads it back; it only
/// reaches it through the hand-off channel drained on each refresh tick.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
}

impl SampleBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one sample at the end.
    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Drops all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample, shown in the numeric readout.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.last().copied()
    }

    /// All samples in arrival order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// `[time, value]` pairs for plotting.
    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.samples.iter().map(Sample::to_point)
    }
}

impl Extend<Sample> for SampleBuffer {
    fn extend<I: IntoIterator<Item = Sample>>(&mut self, iter: I) {
        self.samples.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f64, value: f64) -> Sample {
        Sample::new(time, value).unwrap()
    }

    #[test]
    fn append_keeps_order_and_latest() {
        let mut buffer = SampleBuffer::new();
        assert!(buffer.latest().is_none());

        buffer.append(sample(0.0, 1.0));
        buffer.append(sample(0.5, 2.0));
        buffer.extend([sample(1.0, 3.0)]);

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.latest().unwrap().value(), 3.0);
        let points: Vec<_> = buffer.points().collect();
        assert_eq!(points, vec![[0.0, 1.0], [0.5, 2.0], [1.0, 3.0]]);
    }

    #[test]
    fn clear_empties_buffer() {
        let mut buffer = SampleBuffer::new();
        buffer.append(sample(0.0, 1.0));
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.samples().is_empty());
        assert!(buffer.latest().is_none());
    }
}
