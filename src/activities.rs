/// Activities table: one row per recorded workout with its type and bounds.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::series_reader::parse_timestamp;

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub kind: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSelection {
    All,
    Only(String),
}

impl TypeSelection {
    fn matches(&self, kind: &str) -> bool {
        match self {
            TypeSelection::All => true,
            TypeSelection::Only(wanted) => wanted == kind,
        }
    }
}

/// Inclusive calendar range, compared against the UTC date of an activity start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ExportError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn unbounded() -> Self {
        Self {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone)]
struct ActivityRow {
    kind: String,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityTable {
    rows: Vec<ActivityRow>,
}

/// Column positions resolved from whichever header spellings the file uses.
struct Columns {
    kind: Vec<usize>,
    start: Option<usize>,
    end: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, config: &ExportConfig) -> Self {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let position = |wanted: &String| names.iter().position(|n| *n == wanted.as_str());

        Self {
            kind: config
                .activity_type_headers
                .iter()
                .filter_map(position)
                .collect(),
            start: config.start_headers.iter().find_map(position),
            end: config.end_headers.iter().find_map(position),
        }
    }

    fn kind_of(&self, record: &StringRecord) -> String {
        self.kind
            .iter()
            .filter_map(|&i| record.get(i))
            .map(str::trim)
            .find(|k| !k.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

impl ActivityTable {
    pub fn read(path: &Path, config: &ExportConfig) -> Result<Self> {
        if !path.is_file() {
            return Err(ExportError::MissingActivities(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| ExportError::io(path, e))?;
        let table = Self::from_reader(file, config).map_err(|e| ExportError::csv(path, e))?;
        info!("Read {} activities from {}", table.rows.len(), path.display());
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R, config: &ExportConfig) -> csv::Result<Self> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns = Columns::resolve(rdr.headers()?, config);

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("skipping unreadable activity row: {}", e);
                    continue;
                }
            };
            let field = |col: Option<usize>| col.and_then(|i| record.get(i)).and_then(parse_timestamp);
            rows.push(ActivityRow {
                kind: columns.kind_of(&record),
                start: field(columns.start),
                end: field(columns.end),
            });
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct non-empty activity types, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .rows
            .iter()
            .filter(|r| !r.kind.is_empty())
            .map(|r| r.kind.clone())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Resolves a user-supplied type label: `all` (any case) or one of `types()`.
    pub fn selection(&self, label: &str) -> Result<TypeSelection> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("all") {
            return Ok(TypeSelection::All);
        }
        if self.rows.iter().any(|r| r.kind == label) {
            return Ok(TypeSelection::Only(label.to_string()));
        }
        Err(ExportError::InvalidSelection(format!(
            "unknown activity type '{}', expected one of: {}",
            label,
            self.types().join(", ")
        )))
    }

    /// Activities of the selected type whose start date falls in `range`.
    /// Rows with an unparseable start or end are left out.
    pub fn select(&self, selection: &TypeSelection, range: &DateRange) -> Vec<Activity> {
        self.rows
            .iter()
            .filter(|row| selection.matches(&row.kind))
            .filter_map(|row| match (row.start, row.end) {
                (Some(start), Some(end)) => Some(Activity {
                    kind: row.kind.clone(),
                    start,
                    end,
                }),
                _ => {
                    debug!("skipping activity '{}' without valid bounds", row.kind);
                    None
                }
            })
            .filter(|a| range.contains(a.start.date_naive()))
            .collect()
    }
}
