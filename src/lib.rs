//! Converts ScanWatch / Withings raw tracker exports into one GPX track per
//! activity, aligned on the heart-rate sampling grid.

pub mod activities;
pub mod config;
pub mod error;
pub mod exporter;
pub mod gpx_writer;
pub mod segmenter;
pub mod series_reader;
pub mod time_series;
pub mod track_assembler;

pub use activities::{Activity, ActivityTable, DateRange, TypeSelection};
pub use config::ExportConfig;
pub use error::{ExportError, Result};
pub use exporter::{run_export, ExportReport, ExportRequest, SignalSet};
pub use time_series::{Sample, TimeSeries};
pub use track_assembler::{ActivityTrack, TrackPoint};
