//! Core data types shared by the acquisition pipeline.
use tokio::sync::broadcast;

/// A single `(time, value)` reading reported by the weighing instrument.
///
/// Both fields are always finite; the only way to build a `Sample` is through
/// [`Sample::new`], which rejects NaN and infinities. In particular a
/// `Sample` cannot be deserialized:
///
/// ```compile_fail
/// fn deserializable<T: serde::de::DeserializeOwned>() {}
/// deserializable::<weigh_monitor::core::Sample>();
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    time: f64,
    value: f64,
}

impl Sample {
    /// Creates a sample, or `None` if either field is not finite.
    pub fn new(time: f64, value: f64) -> Option<Self> {
        (time.is_finite() && value.is_finite()).then_some(Self { time, value })
    }

    /// Device timestamp in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Measured force.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The sample as a `[x, y]` plot point.
    pub fn to_point(&self) -> [f64; 2] {
        [self.time, self.value]
    }
}

/// Destination for samples produced by the acquisition worker.
///
/// `publish` is called from the acquisition thread and must never block for
/// long: a slow consumer has to drop data rather than stall the reader.
pub trait SamplePublisher: Send + 'static {
    /// Hands one sample to the consumer.
    fn publish(&self, sample: Sample);
}

impl<F> SamplePublisher for F
where
    F: Fn(Sample) + Send + 'static,
{
    fn publish(&self, sample: Sample) {
        self(sample)
    }
}

/// Publisher backed by a bounded broadcast channel.
///
/// When a receiver falls behind, the channel overwrites the oldest samples and
/// the receiver observes a `Lagged` error on its next receive.
#[derive(Clone, Debug)]
pub struct ChannelPublisher {
    sender: broadcast::Sender<Sample>,
}

impl ChannelPublisher {
    /// Wraps an existing sender.
    pub fn new(sender: broadcast::Sender<Sample>) -> Self {
        Self { sender }
    }
}

impl SamplePublisher for ChannelPublisher {
    fn publish(&self, sample: Sample) {
        // An error only means nobody is subscribed right now.
        if self.sender.send(sample).is_err() {
            tracing::trace!("sample dropped, no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn rejects_non_finite_fields() {
        assert!(Sample::new(f64::NAN, 1.0).is_none());
        assert!(Sample::new(1.0, f64::INFINITY).is_none());
        assert!(Sample::new(f64::NEG_INFINITY, f64::NAN).is_none());
        let sample = Sample::new(1.25, 3.7).unwrap();
        assert_eq!(sample.to_point(), [1.25, 3.7]);
    }

    #[test]
    fn closure_publisher_receives_samples() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let publisher = move |sample: Sample| sink.lock().unwrap().push(sample);

        publisher.publish(Sample::new(0.0, 1.0).unwrap());
        publisher.publish(Sample::new(1.0, 2.0).unwrap());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].value(), 2.0);
    }

    #[test]
    fn channel_publisher_drops_oldest_when_full() {
        let (tx, mut rx) = broadcast::channel(2);
        let publisher = ChannelPublisher::new(tx);
        for i in 0..4 {
            publisher.publish(Sample::new(i as f64, 0.0).unwrap());
        }

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(2))
        ));
        assert_eq!(rx.try_recv().unwrap().time(), 2.0);
        assert_eq!(rx.try_recv().unwrap().time(), 3.0);
    }

    #[test]
    fn channel_publisher_without_subscribers_is_silent() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        ChannelPublisher::new(tx).publish(Sample::new(0.0, 0.0).unwrap());
    }
}
