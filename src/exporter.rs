/// Export run: load the raw signals once, then turn every selected activity
/// into a GPX file.
///
/// Only a missing or empty heart-rate/GPS file stops the run. Everything
/// else (bad rows, missing temperature or steps, activities with no heart
/// rate) is logged and skipped.
use std::path::{Path, PathBuf};

use csv::Writer;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::activities::{Activity, ActivityTable, DateRange, TypeSelection};
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::gpx_writer::{write_track_file, GpxOptions};
use crate::segmenter::activity_samples;
use crate::series_reader::{read_series, Signal};
use crate::time_series::TimeSeries;
use crate::track_assembler::{ActivityTrack, AlignedSignals, TrackSummary};

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub source_dir: PathBuf,
    /// Defaults to `<source_dir>/<output_subdir>`.
    pub output_dir: Option<PathBuf>,
    pub selection: TypeSelection,
    pub range: DateRange,
}

impl ExportRequest {
    pub fn output_dir(&self, config: &ExportConfig) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.source_dir.join(&config.output_subdir))
    }
}

/// Every decoded signal of one source directory.
#[derive(Debug, Clone)]
pub struct SignalSet {
    pub heart_rate: TimeSeries,
    pub latitude: TimeSeries,
    pub longitude: TimeSeries,
    pub temperature: Option<TimeSeries>,
    pub cadence: Option<TimeSeries>,
}

impl SignalSet {
    pub fn load(source_dir: &Path, config: &ExportConfig) -> Result<Self> {
        Ok(Self {
            latitude: load_required(&source_dir.join(&config.latitude_file), Signal::Latitude)?,
            longitude: load_required(&source_dir.join(&config.longitude_file), Signal::Longitude)?,
            heart_rate: load_required(&source_dir.join(&config.heart_rate_file), Signal::HeartRate)?,
            temperature: load_optional(&source_dir.join(&config.temperature_file), Signal::Temperature)?,
            cadence: load_optional(&source_dir.join(&config.steps_file), Signal::Steps)?,
        })
    }

    /// Copy with both position series smoothed; the other signals are untouched.
    pub fn with_smoothed_position(&self, config: &ExportConfig) -> Self {
        info!("Smoothing GPS ({} s window)", config.smoothing_window_secs);
        let window = config.smoothing_window();
        Self {
            latitude: self.latitude.smoothed(window),
            longitude: self.longitude.smoothed(window),
            ..self.clone()
        }
    }

    pub fn aligned(&self, config: &ExportConfig) -> AlignedSignals<'_> {
        AlignedSignals {
            latitude: &self.latitude,
            longitude: &self.longitude,
            temperature: self.temperature.as_ref(),
            cadence: self.cadence.as_ref(),
            cadence_max_age: config.cadence_max_age(),
        }
    }
}

fn load_required(path: &Path, signal: Signal) -> Result<TimeSeries> {
    match read_series(path, signal)? {
        None => Err(ExportError::MissingRequiredSeries(signal)),
        Some(series) if series.is_empty() => Err(ExportError::EmptyRequiredSeries(signal)),
        Some(series) => Ok(series),
    }
}

fn load_optional(path: &Path, signal: Signal) -> Result<Option<TimeSeries>> {
    let series = read_series(path, signal)?;
    if series.is_none() {
        warn!("No {} file found, the field is left out of the export", signal);
    }
    Ok(series)
}

/// A GPX file produced by the run.
#[derive(Debug, Clone)]
pub struct WrittenTrack {
    pub path: PathBuf,
    pub activity: Activity,
    pub summary: TrackSummary,
}

#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub output_dir: PathBuf,
    pub selected: usize,
    pub written: Vec<WrittenTrack>,
    /// Activities with no heart-rate sample inside their window.
    pub skipped: Vec<Activity>,
}

/// Segments and assembles every activity against the frozen signals.
/// `None` marks an activity with no heart rate in its window.
pub fn assemble_tracks(
    activities: &[Activity],
    signals: &SignalSet,
    config: &ExportConfig,
) -> Vec<Option<ActivityTrack>> {
    let aligned = signals.aligned(config);
    activities
        .par_iter()
        .map(|activity| {
            let samples = activity_samples(&signals.heart_rate, activity);
            if samples.is_empty() {
                return None;
            }
            Some(ActivityTrack {
                activity: activity.clone(),
                points: aligned.assemble(&samples),
            })
        })
        .collect()
}

pub fn run_export(request: &ExportRequest, config: &ExportConfig) -> Result<ExportReport> {
    let output_dir = request.output_dir(config);
    let table = ActivityTable::read(&request.source_dir.join(&config.activities_file), config)?;
    let activities = table.select(&request.selection, &request.range);

    let mut report = ExportReport {
        output_dir: output_dir.clone(),
        selected: activities.len(),
        ..ExportReport::default()
    };

    if activities.is_empty() {
        info!("No activity matches the selection");
        return Ok(report);
    }
    info!("{} activities selected", activities.len());

    let signals = SignalSet::load(&request.source_dir, config)?.with_smoothed_position(config);
    let options = GpxOptions::from(config);

    for (activity, track) in activities.iter().zip(assemble_tracks(&activities, &signals, config)) {
        let Some(track) = track else {
            warn!(
                "No heart-rate data for {} activity starting {}, skipped",
                activity.kind, activity.start
            );
            report.skipped.push(activity.clone());
            continue;
        };

        let path = write_track_file(&output_dir, &config.file_prefix, &track, &options)?;
        let summary = track.summary();
        info!(
            "   {} points, {:.2} km, temperature on {}, cadence on {}",
            summary.points,
            summary.distance_m / 1000.0,
            summary.with_temperature,
            summary.with_cadence
        );
        report.written.push(WrittenTrack {
            path,
            activity: track.activity,
            summary,
        });
    }

    if !report.written.is_empty() {
        let summary_path = output_dir.join(&config.summary_file);
        save_summary_csv(&report.written, &summary_path)?;
    }

    Ok(report)
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    file: String,
    activity_type: &'a str,
    start: String,
    end: String,
    points: usize,
    points_with_temperature: usize,
    points_with_cadence: usize,
    distance_km: f64,
}

fn save_summary_csv(written: &[WrittenTrack], path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path).map_err(|e| ExportError::csv(path, e))?;

    for track in written {
        let row = SummaryRow {
            file: track
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            activity_type: &track.activity.kind,
            start: track.activity.start.to_rfc3339(),
            end: track.activity.end.to_rfc3339(),
            points: track.summary.points,
            points_with_temperature: track.summary.with_temperature,
            points_with_cadence: track.summary.with_cadence,
            distance_km: (track.summary.distance_m / 10.0).round() / 100.0,
        };
        wtr.serialize(row).map_err(|e| ExportError::csv(path, e))?;
    }

    wtr.flush().map_err(|e| ExportError::io(path, e))?;
    info!("Export summary saved to: {}", path.display());
    Ok(())
}
