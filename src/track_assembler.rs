/// Track point assembly: every retained heart-rate sample pulls its position,
/// temperature and cadence from the other signals at the same instant.
///
/// Position is linearly interpolated on the smoothed GPS series. Temperature
/// takes the nearest sample with no age limit. Cadence takes the latest rate
/// at or before the instant, and only while it is younger than the cutoff.
use chrono::{DateTime, Duration, Utc};
use geo::{point, HaversineDistance};

use crate::activities::Activity;
use crate::time_series::{Sample, TimeSeries};

#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub heart_rate: u32,
    pub temperature: Option<f64>,
    pub cadence: Option<u32>,
}

/// The frozen signal set every activity is aligned against.
#[derive(Debug, Clone, Copy)]
pub struct AlignedSignals<'a> {
    pub latitude: &'a TimeSeries,
    pub longitude: &'a TimeSeries,
    pub temperature: Option<&'a TimeSeries>,
    pub cadence: Option<&'a TimeSeries>,
    pub cadence_max_age: Duration,
}

impl<'a> AlignedSignals<'a> {
    /// Builds the point for one heart-rate sample, or `None` when no
    /// position can be resolved for it.
    pub fn point_at(&self, sample: &Sample) -> Option<TrackPoint> {
        let latitude = self.latitude.interpolate(sample.time)?;
        let longitude = self.longitude.interpolate(sample.time)?;

        Some(TrackPoint {
            time: sample.time,
            latitude,
            longitude,
            heart_rate: sample.value as u32,
            temperature: self.temperature.and_then(|t| t.nearest(sample.time)),
            cadence: self.cadence_at(sample.time),
        })
    }

    fn cadence_at(&self, time: DateTime<Utc>) -> Option<u32> {
        let latest = self.cadence?.latest_at_or_before(time)?;
        if time - latest.time <= self.cadence_max_age {
            Some(latest.value as u32)
        } else {
            None
        }
    }

    /// Points for a window of heart-rate samples, in sample order.
    pub fn assemble(&self, heart_rate: &[Sample]) -> Vec<TrackPoint> {
        heart_rate.iter().filter_map(|s| self.point_at(s)).collect()
    }
}

/// An activity together with its assembled points.
#[derive(Debug, Clone)]
pub struct ActivityTrack {
    pub activity: Activity,
    pub points: Vec<TrackPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSummary {
    pub points: usize,
    pub with_temperature: usize,
    pub with_cadence: usize,
    pub distance_m: f64,
}

impl ActivityTrack {
    pub fn summary(&self) -> TrackSummary {
        let distance_m: f64 = self
            .points
            .windows(2)
            .map(|w| {
                let a = point!(x: w[0].longitude, y: w[0].latitude);
                let b = point!(x: w[1].longitude, y: w[1].latitude);
                a.haversine_distance(&b)
            })
            .sum();

        TrackSummary {
            points: self.points.len(),
            with_temperature: self.points.iter().filter(|p| p.temperature.is_some()).count(),
            with_cadence: self.points.iter().filter(|p| p.cadence.is_some()).count(),
            distance_m,
        }
    }
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

    struct Fixture {
        lat: TimeSeries,
        lon: TimeSeries,
        temp: TimeSeries,
        cad: TimeSeries,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                lat: series(&[(0, 48.0), (100, 49.0)]),
                lon: series(&[(0, 2.0), (100, 3.0)]),
                temp: series(&[(0, 36.5), (50, 37.5)]),
                cad: series(&[(10, 170.0)]),
            }
        }

        fn signals(&self) -> AlignedSignals<'_> {
            AlignedSignals {
                latitude: &self.lat,
                longitude: &self.lon,
                temperature: Some(&self.temp),
                cadence: Some(&self.cad),
                cadence_max_age: Duration::seconds(60),
            }
        }
    }

    #[test]
    fn test_point_interpolates_position_and_truncates_hr() {
        let f = Fixture::new();
        let p = f.signals().point_at(&Sample::new(at(50), 141.9)).unwrap();
        assert!((p.latitude - 48.5).abs() < 1e-9);
        assert!((p.longitude - 2.5).abs() < 1e-9);
        assert_eq!(p.heart_rate, 141);
        assert_eq!(p.temperature, Some(37.5));
    }

    #[test]
    fn test_cadence_staleness_cutoff() {
        let f = Fixture::new();
        let signals = f.signals();
        let fresh = signals.point_at(&Sample::new(at(10 + 59), 120.0)).unwrap();
        assert_eq!(fresh.cadence, Some(170));
        let edge = signals.point_at(&Sample::new(at(10 + 60), 120.0)).unwrap();
        assert_eq!(edge.cadence, Some(170));
        let stale = signals.point_at(&Sample::new(at(10 + 61), 120.0)).unwrap();
        assert_eq!(stale.cadence, None);
    }

    #[test]
    fn test_cadence_never_taken_from_the_future() {
        let f = Fixture::new();
        let p = f.signals().point_at(&Sample::new(at(5), 120.0)).unwrap();
        assert_eq!(p.cadence, None);
    }

    #[test]
    fn test_optional_signals_absent() {
        let f = Fixture::new();
        let signals = AlignedSignals {
            temperature: None,
            cadence: None,
            ..f.signals()
        };
        let p = signals.point_at(&Sample::new(at(20), 120.0)).unwrap();
        assert_eq!(p.temperature, None);
        assert_eq!(p.cadence, None);
    }

    #[test]
    fn test_no_position_drops_sample() {
        let f = Fixture::new();
        let empty = TimeSeries::default();
        let signals = AlignedSignals {
            latitude: &empty,
            ..f.signals()
        };
        let hr = [Sample::new(at(1), 100.0), Sample::new(at(2), 101.0)];
        assert!(signals.assemble(&hr).is_empty());
    }

    #[test]
    fn test_summary_counts_and_distance() {
        let f = Fixture::new();
        let hr = [Sample::new(at(0), 100.0), Sample::new(at(100), 110.0)];
        let track = ActivityTrack {
            activity: Activity {
                kind: "Run".to_string(),
                start: at(0),
                end: at(100),
            },
            points: f.signals().assemble(&hr),
        };
        let summary = track.summary();
        assert_eq!(summary.points, 2);
        assert_eq!(summary.with_temperature, 2);
        assert_eq!(summary.with_cadence, 0);
        // One degree of latitude plus one of longitude near 48N is well over 100 km.
        assert!(summary.distance_m > 100_000.0);
    }
}
