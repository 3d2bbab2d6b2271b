/// Source file layout and tunables for one export run.
use chrono::Duration;

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub activities_file: String,
    pub heart_rate_file: String,
    pub latitude_file: String,
    pub longitude_file: String,
    pub temperature_file: String,
    pub steps_file: String,

    /// Header spellings seen across export languages/versions.
    pub activity_type_headers: Vec<String>,
    pub start_headers: Vec<String>,
    pub end_headers: Vec<String>,

    pub smoothing_window_secs: i64,
    pub cadence_max_age_secs: i64,
    /// Multiplier applied to core temperature before it is written.
    pub temperature_scale: f64,

    pub output_subdir: String,
    pub summary_file: String,
    pub file_prefix: String,
    pub creator: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            activities_file: "activities.csv".to_string(),
            heart_rate_file: "raw_hr_hr.csv".to_string(),
            latitude_file: "raw_location_latitude.csv".to_string(),
            longitude_file: "raw_location_longitude.csv".to_string(),
            temperature_file: "raw_core_body_temperature_Core body temperature.csv".to_string(),
            steps_file: "raw_tracker_steps.csv".to_string(),
            activity_type_headers: vec![
                "Type d'activité".to_string(),
                "Type d' activité".to_string(),
                "Activity type".to_string(),
            ],
            start_headers: vec!["Début".to_string(), "Start".to_string()],
            end_headers: vec!["Fin".to_string(), "End".to_string()],
            smoothing_window_secs: 10,
            cadence_max_age_secs: 60,
            temperature_scale: 1.0,
            output_subdir: "export".to_string(),
            summary_file: "export_summary.csv".to_string(),
            file_prefix: "SW".to_string(),
            creator: "SCANWATCH 2".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn smoothing_window(&self) -> Duration {
        Duration::seconds(self.smoothing_window_secs)
    }

    pub fn cadence_max_age(&self) -> Duration {
        Duration::seconds(self.cadence_max_age_secs)
    }
}
