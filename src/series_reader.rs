/// Reader for the run-length encoded raw signal exports.
///
/// Each row is `anchor timestamp, [d0,d1,...], [v0,v1,...]`: one value per
/// consecutive sub-interval starting at the anchor. Malformed rows are
/// skipped one at a time so a single bad line never costs the whole file.
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::error::{ExportError, Result};
use crate::time_series::{Sample, TimeSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    HeartRate,
    Latitude,
    Longitude,
    Temperature,
    Steps,
}

/// How interval values turn into samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Point measurement attributed to the start of its interval.
    Instantaneous,
    /// Count over the interval, converted to a per-minute rate at its end.
    Cumulative,
}

impl Signal {
    pub fn encoding(self) -> Encoding {
        match self {
            Signal::Steps => Encoding::Cumulative,
            _ => Encoding::Instantaneous,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::HeartRate => "heart rate",
            Signal::Latitude => "latitude",
            Signal::Longitude => "longitude",
            Signal::Temperature => "core temperature",
            Signal::Steps => "step count",
        };
        f.write_str(name)
    }
}

/// One parsed row of a raw signal file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub anchor: DateTime<Utc>,
    pub durations: Vec<i64>,
    pub values: Vec<f64>,
}

impl RawRecord {
    /// Parses `anchor, [durations], [values]`. Returns `None` for any row
    /// that does not fit that shape.
    pub fn parse(record: &StringRecord) -> Option<Self> {
        if record.len() != 3 {
            return None;
        }

        let anchor = parse_timestamp(&record[0])?;
        let durations: Vec<i64> = parse_list(&record[1])?;
        let values: Vec<f64> = parse_list(&record[2])?;

        if durations.iter().any(|&d| d < 0) || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        if durations.len() != values.len() {
            debug!(
                "row at {} has {} durations but {} values, using the shorter",
                anchor,
                durations.len(),
                values.len()
            );
        }

        Some(Self {
            anchor,
            durations,
            values,
        })
    }

    /// Walks the intervals from the anchor, emitting samples per `encoding`.
    ///
    /// Instantaneous values land on the start instant of their interval.
    /// Cumulative counts become steps per minute on the end instant, and
    /// zero-length intervals have no defined rate so they are left out.
    /// Returns `None` when an interval pushes the cursor out of range.
    pub fn expand(&self, encoding: Encoding) -> Option<Expansion> {
        let mut cursor = self.anchor;
        let mut samples = Vec::with_capacity(self.values.len());

        for (&duration, &value) in self.durations.iter().zip(&self.values) {
            let next = Duration::try_seconds(duration).and_then(|d| cursor.checked_add_signed(d))?;
            match encoding {
                Encoding::Instantaneous => samples.push(Sample::new(cursor, value)),
                Encoding::Cumulative if duration > 0 => {
                    samples.push(Sample::new(next, value / duration as f64 * 60.0))
                }
                Encoding::Cumulative => {}
            }
            cursor = next;
        }

        Some(Expansion {
            samples,
            end: cursor,
        })
    }
}

/// Samples decoded from one row and the cursor after its last interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub samples: Vec<Sample>,
    pub end: DateTime<Utc>,
}

/// Loads one signal file.
///
/// Returns `Ok(None)` when the file does not exist, which callers treat
/// differently from a file that exists but decodes to nothing.
pub fn read_series(path: &Path, signal: Signal) -> Result<Option<TimeSeries>> {
    if !path.is_file() {
        debug!("no {} file at {}", signal, path.display());
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| ExportError::io(path, e))?;
    let series = decode_series(file, signal.encoding());
    info!(
        "Loaded {} {} samples from {}",
        series.len(),
        signal,
        path.display()
    );
    Ok(Some(series))
}

/// Decodes a whole raw signal stream (header row included) into a sorted series.
pub fn decode_series<R: Read>(reader: R, encoding: Encoding) -> TimeSeries {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut samples = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                debug!("skipping unreadable row: {}", e);
                skipped += 1;
                continue;
            }
        };

        match RawRecord::parse(&record).and_then(|raw| raw.expand(encoding)) {
            Some(expansion) => samples.extend(expansion.samples),
            None => {
                debug!("skipping malformed row: {:?}", record);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        debug!("{} malformed rows skipped", skipped);
    }

    TimeSeries::from_samples(samples)
}

/// Parses an absolute timestamp. Offsets are honoured; a timestamp without
/// one is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Parses a bracket-delimited, comma-separated list such as `[60,60,30]`.
fn parse_list<T: FromStr>(raw: &str) -> Option<Vec<T>> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<T>().ok())
        .collect()
}
