/// Time-ordered signal samples and the lookups used to align them.
///
/// Every query goes through an ordered search over the sample timestamps,
/// so a lookup costs O(log n) no matter how long the recording is.
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(time: DateTime<Utc>, value: f64) -> Self {
        Self { time, value }
    }
}

/// One decoded signal, sorted by timestamp and immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    samples: Vec<Sample>,
}

impl TimeSeries {
    /// Builds a series from samples in any order. The sort is stable, so
    /// samples sharing a timestamp keep the order they were decoded in.
    pub fn from_samples(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.time);
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Index of the first sample at or after `time`.
    fn insertion_point(&self, time: DateTime<Utc>) -> usize {
        self.samples.partition_point(|s| s.time < time)
    }

    /// Linear interpolation between the samples bracketing `time`.
    /// Clamps to the first/last value outside the recorded range.
    pub fn interpolate(&self, time: DateTime<Utc>) -> Option<f64> {
        let n = self.samples.len();
        if n == 0 {
            return None;
        }

        let i = self.insertion_point(time);
        if i == 0 {
            return Some(self.samples[0].value);
        }
        if i == n {
            return Some(self.samples[n - 1].value);
        }

        let before = self.samples[i - 1];
        let after = self.samples[i];
        let span = seconds_between(before.time, after.time);
        if span == 0.0 {
            return Some(before.value);
        }

        let factor = seconds_between(before.time, time) / span;
        Some(before.value + (after.value - before.value) * factor)
    }

    /// Value of the sample closest in time to `time`.
    /// An exact tie between two neighbours resolves to the earlier one.
    pub fn nearest(&self, time: DateTime<Utc>) -> Option<f64> {
        let n = self.samples.len();
        if n == 0 {
            return None;
        }

        let i = self.insertion_point(time);
        if i == 0 {
            return Some(self.samples[0].value);
        }
        if i == n {
            return Some(self.samples[n - 1].value);
        }

        let before = self.samples[i - 1];
        let after = self.samples[i];
        let before_gap = seconds_between(before.time, time).abs();
        let after_gap = seconds_between(time, after.time).abs();

        if after_gap < before_gap {
            Some(after.value)
        } else {
            Some(before.value)
        }
    }

    /// Mean of every sample within `[time - window/2, time + window/2]`.
    ///
    /// A window holding no samples falls back to the interpolated value at
    /// `time`, which is the sample's own value when `time` is a sample.
    pub fn windowed_average(&self, time: DateTime<Utc>, window: Duration) -> Option<f64> {
        let window = self.window(time, window);
        if window.is_empty() {
            return self.interpolate(time);
        }

        let sum: f64 = window.iter().map(|s| s.value).sum();
        Some(sum / window.len() as f64)
    }

    fn window(&self, time: DateTime<Utc>, window: Duration) -> &[Sample] {
        let half = window / 2;
        self.range_inclusive(time - half, time + half)
    }

    /// Latest sample whose timestamp is at or before `time`. When several
    /// samples share that timestamp, the first one decoded is returned.
    pub fn latest_at_or_before(&self, time: DateTime<Utc>) -> Option<Sample> {
        let end = self.samples.partition_point(|s| s.time <= time);
        let latest = self.samples[end.checked_sub(1)?].time;
        let first = self.insertion_point(latest);
        Some(self.samples[first])
    }

    /// Samples with `start <= time <= end`, found with two binary searches.
    pub fn range_inclusive(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> &[Sample] {
        let lo = self.samples.partition_point(|s| s.time < start);
        let hi = self.samples.partition_point(|s| s.time <= end);
        if lo >= hi {
            return &[];
        }
        &self.samples[lo..hi]
    }

    /// Centred moving average over a time window.
    ///
    /// Every output value is computed against this (unsmoothed) series, so
    /// the result has the same timestamps and length as the input.
    pub fn smoothed(&self, window: Duration) -> TimeSeries {
        let samples = self
            .samples
            .iter()
            .map(|s| {
                let value = self.windowed_average(s.time, window).unwrap_or(s.value);
                Sample::new(s.time, value)
            })
            .collect();

        TimeSeries { samples }
    }
}

/// Signed elapsed seconds from `from` to `to`, millisecond resolution.
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn series(points: &[(i64, f64)]) -> TimeSeries {
        TimeSeries::from_samples(points.iter().map(|&(t, v)| Sample::new(at(t), v)).collect())
    }

    #[test]
    fn test_from_samples_sorts_by_time() {
        let ts = series(&[(20, 2.0), (0, 0.0), (10, 1.0)]);
        let times: Vec<_> = ts.samples().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![at(0), at(10), at(20)]);
    }

    #[test]
    fn test_empty_series_has_no_values() {
        let ts = TimeSeries::default();
        assert_eq!(ts.interpolate(at(0)), None);
        assert_eq!(ts.nearest(at(0)), None);
        assert_eq!(ts.windowed_average(at(0), Duration::seconds(10)), None);
        assert!(ts.latest_at_or_before(at(0)).is_none());
    }

    #[test]
    fn test_interpolate_exact_sample_is_identity() {
        let ts = series(&[(0, 1.5), (10, 7.25), (20, -3.0)]);
        assert_eq!(ts.interpolate(at(0)), Some(1.5));
        assert_eq!(ts.interpolate(at(10)), Some(7.25));
        assert_eq!(ts.interpolate(at(20)), Some(-3.0));
    }

    #[test]
    fn test_interpolate_blends_by_elapsed_fraction() {
        let ts = series(&[(0, 10.0), (10, 20.0)]);
        let v = ts.interpolate(at(3)).unwrap();
        assert!((v - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_clamps_outside_range() {
        let ts = series(&[(10, 1.0), (20, 2.0)]);
        assert_eq!(ts.interpolate(at(0)), Some(1.0));
        assert_eq!(ts.interpolate(at(99)), Some(2.0));
    }

    #[test]
    fn test_interpolate_duplicate_timestamps_returns_earlier() {
        let ts = series(&[(0, 0.0), (10, 4.0), (10, 8.0), (20, 0.0)]);
        assert_eq!(ts.interpolate(at(10)), Some(4.0));
        let v = ts.interpolate(at(15)).unwrap();
        assert!((v - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_picks_closest_neighbour() {
        let ts = series(&[(0, 1.0), (10, 2.0)]);
        assert_eq!(ts.nearest(at(2)), Some(1.0));
        assert_eq!(ts.nearest(at(8)), Some(2.0));
    }

    #[test]
    fn test_nearest_tie_resolves_to_earlier() {
        let ts = series(&[(0, 1.0), (10, 2.0)]);
        assert_eq!(ts.nearest(at(5)), Some(1.0));
    }

    #[test]
    fn test_nearest_and_interpolate_agree_at_boundaries() {
        let ts = series(&[(10, 3.0), (20, 9.0)]);
        assert_eq!(ts.nearest(at(0)), ts.interpolate(at(0)));
        assert_eq!(ts.nearest(at(50)), ts.interpolate(at(50)));
    }

    #[test]
    fn test_windowed_average_single_point_is_unchanged() {
        let ts = series(&[(0, 1.0), (100, 42.0), (200, 3.0)]);
        assert_eq!(ts.windowed_average(at(100), Duration::seconds(10)), Some(42.0));
    }

    #[test]
    fn test_windowed_average_includes_both_bounds() {
        let ts = series(&[(0, 0.0), (5, 10.0), (10, 20.0)]);
        let v = ts.windowed_average(at(5), Duration::seconds(10)).unwrap();
        assert!((v - 10.0).abs() < 1e-9);
        let edge = ts.windowed_average(at(0), Duration::seconds(10)).unwrap();
        assert!((edge - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_windowed_average_empty_window_falls_back() {
        let ts = series(&[(0, 2.0), (100, 4.0)]);
        let v = ts.windowed_average(at(50), Duration::seconds(10)).unwrap();
        assert!((v - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_constant_series_is_invariant() {
        let ts = series(&[(0, 5.0), (1, 5.0), (2, 5.0)]);
        let smoothed = ts.smoothed(Duration::seconds(10));
        assert_eq!(smoothed.len(), 3);
        for s in smoothed.samples() {
            assert_eq!(s.value, 5.0);
        }
    }

    #[test]
    fn test_smoothing_reads_unsmoothed_values() {
        let ts = series(&[(0, 0.0), (4, 10.0), (8, 20.0)]);
        let smoothed = ts.smoothed(Duration::seconds(10));
        let values: Vec<f64> = smoothed.samples().iter().map(|s| s.value).collect();
        assert!((values[0] - 5.0).abs() < 1e-9);
        assert!((values[1] - 10.0).abs() < 1e-9);
        assert!((values[2] - 15.0).abs() < 1e-9);
        assert_eq!(smoothed.samples()[1].time, at(4));
    }

    #[test]
    fn test_latest_at_or_before() {
        let ts = series(&[(0, 1.0), (10, 2.0)]);
        assert!(ts.latest_at_or_before(at(-1)).is_none());
        assert_eq!(ts.latest_at_or_before(at(10)).map(|s| s.value), Some(2.0));
        assert_eq!(ts.latest_at_or_before(at(9)).map(|s| s.value), Some(1.0));
    }

    #[test]
    fn test_latest_at_or_before_prefers_first_of_equal_timestamps() {
        let ts = series(&[(0, 1.0), (10, 2.0), (10, 3.0), (10, 4.0), (20, 5.0)]);
        assert_eq!(ts.latest_at_or_before(at(10)).map(|s| s.value), Some(2.0));
        assert_eq!(ts.latest_at_or_before(at(15)).map(|s| s.value), Some(2.0));
        assert_eq!(ts.latest_at_or_before(at(25)).map(|s| s.value), Some(5.0));
    }

    #[test]
    fn test_range_inclusive() {
        let ts = series(&[(0, 0.0), (10, 1.0), (20, 2.0), (30, 3.0)]);
        let r = ts.range_inclusive(at(10), at(20));
        assert_eq!(r.len(), 2);
        assert!(ts.range_inclusive(at(21), at(29)).is_empty());
        assert!(ts.range_inclusive(at(30), at(0)).is_empty());
    }
}
