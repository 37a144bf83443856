use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Number of samples kept per series unless configured otherwise.
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(50).unwrap();

/// One observation of a measurement stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// How a fetched batch combines with the window it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Each sample is appended after the current tail.
    #[default]
    Append,
    /// The batch is the new window (history payloads resent every cycle).
    Replace,
}

/// Fixed-capacity window over the most recent samples of one series.
///
/// Timestamps never decrease from head to tail. Once the window is full
/// every accepted sample evicts the oldest one.
#[derive(Debug, Clone)]
pub struct RollingSeriesBuffer {
    capacity: NonZeroUsize,
    samples: VecDeque<Sample>,
}

impl RollingSeriesBuffer {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity.get()),
        }
    }

    /// Append a sample at the tail, evicting from the head when full.
    ///
    /// Returns `false` (and leaves the window untouched) when the value is
    /// not finite or the timestamp is older than the current tail. Samples
    /// sharing the tail's timestamp are kept.
    pub fn append(&mut self, sample: Sample) -> bool {
        if !sample.value.is_finite() {
            return false;
        }
        if self
            .samples
            .back()
            .is_some_and(|tail| sample.timestamp < tail.timestamp)
        {
            return false;
        }

        self.samples.push_back(sample);
        while self.samples.len() > self.capacity.get() {
            self.samples.pop_front();
        }
        true
    }

    /// Drop every sample. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Ordered copy of the current window.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// True until the first sample is accepted.
    ///
    /// Distinguishes a series that never reported from one reporting zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }
}

impl Default for RollingSeriesBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, value: f64) -> Sample {
        Sample::new(Utc.timestamp_opt(secs, 0).unwrap(), value)
    }

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn evicts_oldest_when_over_capacity() {
        let mut buffer = RollingSeriesBuffer::new(capacity(3));
        for (t, v) in [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)] {
            assert!(buffer.append(at(t, v)));
        }

        assert_eq!(
            buffer.snapshot(),
            vec![at(2, 20.0), at(3, 30.0), at(4, 40.0)]
        );
    }

    #[test]
    fn keeps_the_most_recent_samples_for_long_runs() {
        let mut buffer = RollingSeriesBuffer::new(capacity(7));
        for t in 0..100 {
            buffer.append(at(t, t as f64));
        }

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), 7);
        let times: Vec<i64> = snapshot.iter().map(|s| s.timestamp.timestamp()).collect();
        assert_eq!(times, (93..100).collect::<Vec<_>>());
    }

    #[test]
    fn empty_until_first_append() {
        let mut buffer = RollingSeriesBuffer::default();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);

        buffer.append(at(1, 0.0));
        assert!(!buffer.is_empty());
        assert_eq!(buffer.latest(), Some(&at(1, 0.0)));
    }

    #[test]
    fn skips_older_and_non_finite_samples() {
        let mut buffer = RollingSeriesBuffer::new(capacity(5));
        assert!(buffer.append(at(5, 1.0)));
        assert!(!buffer.append(at(4, 3.0)));
        assert!(!buffer.append(at(6, f64::NAN)));
        assert!(buffer.append(at(6, 4.0)));

        assert_eq!(buffer.snapshot(), vec![at(5, 1.0), at(6, 4.0)]);
    }

    #[test]
    fn keeps_samples_sharing_a_timestamp() {
        let mut buffer = RollingSeriesBuffer::new(capacity(3));
        assert!(buffer.append(at(10, 1.0)));
        assert!(buffer.append(at(10, 2.0)));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.snapshot(), vec![at(10, 1.0), at(10, 2.0)]);

        assert!(buffer.append(at(10, 3.0)));
        assert!(buffer.append(at(11, 4.0)));
        assert_eq!(
            buffer.snapshot(),
            vec![at(10, 2.0), at(10, 3.0), at(11, 4.0)]
        );
    }

    #[test]
    fn clear_empties_the_window() {
        let mut buffer = RollingSeriesBuffer::new(capacity(2));
        buffer.append(at(5, 1.0));
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.append(at(1, 2.0)));
        assert_eq!(buffer.capacity(), capacity(2));
    }

    #[test]
    fn snapshot_does_not_mutate() {
        let mut buffer = RollingSeriesBuffer::new(capacity(2));
        buffer.append(at(1, 1.0));
        let first = buffer.snapshot();
        let second = buffer.snapshot();
        assert_eq!(first, second);
        assert_eq!(buffer.len(), 1);
    }
}
