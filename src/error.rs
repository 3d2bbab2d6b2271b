use std::path::PathBuf;

use thiserror::Error;

use crate::series_reader::Signal;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("required {0} data file not found")]
    MissingRequiredSeries(Signal),
    #[error("required {0} data file contains no usable samples")]
    EmptyRequiredSeries(Signal),
    #[error("activities file not found: {}", .0.display())]
    MissingActivities(PathBuf),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("date range start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        ExportError::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
