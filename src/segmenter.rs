use crate::activities::Activity;
use crate::time_series::{Sample, TimeSeries};

/// Heart-rate samples inside `[activity.start, activity.end]`, keeping only
/// the first sample of each whole second.
///
/// An empty result means the activity has nothing to export.
pub fn activity_samples(heart_rate: &TimeSeries, activity: &Activity) -> Vec<Sample> {
    let window = heart_rate.range_inclusive(activity.start, activity.end);

    let mut kept: Vec<Sample> = Vec::with_capacity(window.len());
    let mut last_second: Option<i64> = None;

    for sample in window {
        let second = sample.time.timestamp();
        if last_second == Some(second) {
            continue;
        }
        last_second = Some(second);
        kept.push(*sample);
    }

    kept
}
