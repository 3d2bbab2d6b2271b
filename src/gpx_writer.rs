/// GPX 1.1 output with Garmin TrackPointExtension v2 (heart rate,
/// temperature, cadence), the flavour Strava and Garmin Connect import.
///
/// The `gpx` crate drops extension blocks on write, so the document is
/// emitted directly.
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::activities::Activity;
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::track_assembler::{ActivityTrack, TrackPoint};

const GPX_NS: &str = "http://www.topografix.com/GPX/1/1";
const TPX_NS: &str = "http://www.garmin.com/xmlschemas/TrackPointExtension/v2";

#[derive(Debug, Clone)]
pub struct GpxOptions {
    pub creator: String,
    pub temperature_scale: f64,
}

impl From<&ExportConfig> for GpxOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            creator: config.creator.clone(),
            temperature_scale: config.temperature_scale,
        }
    }
}

/// `<prefix>_<YYYYMMDD_HHMMSS>_<type slug>.gpx`
pub fn file_name(prefix: &str, activity: &Activity) -> String {
    format!(
        "{}_{}_{}.gpx",
        prefix,
        activity.start.format("%Y%m%d_%H%M%S"),
        slug(&activity.kind)
    )
}

/// Lower-cased activity type usable as part of a file name.
pub fn slug(kind: &str) -> String {
    let slug: String = kind
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '\'' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if slug.is_empty() {
        "activity".to_string()
    } else {
        slug
    }
}

pub fn track_name(activity: &Activity) -> String {
    let kind = if activity.kind.is_empty() {
        "Activity"
    } else {
        activity.kind.as_str()
    };
    format!("{} - {}", kind, activity.start.format("%Y-%m-%d"))
}

/// Writes one GPX file for `track` into `output_dir`, creating the directory
/// when needed. Returns the path written.
pub fn write_track_file(
    output_dir: &Path,
    prefix: &str,
    track: &ActivityTrack,
    options: &GpxOptions,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|e| ExportError::io(output_dir, e))?;

    let path = output_dir.join(file_name(prefix, &track.activity));
    let file = File::create(&path).map_err(|e| ExportError::io(&path, e))?;
    let mut writer = BufWriter::new(file);
    write_gpx(&mut writer, track, options)
        .and_then(|_| writer.flush())
        .map_err(|e| ExportError::io(&path, e))?;

    info!("GPX file written: {}", path.display());
    Ok(path)
}

pub fn write_gpx<W: Write>(out: &mut W, track: &ActivityTrack, options: &GpxOptions) -> io::Result<()> {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<gpx version="1.1" creator="{}" xmlns="{}" xmlns:gpxtpx="{}">"#,
        escape(&options.creator),
        GPX_NS,
        TPX_NS
    )?;
    writeln!(out, "  <trk>")?;
    writeln!(out, "    <name>{}</name>", escape(&track_name(&track.activity)))?;
    writeln!(out, "    <trkseg>")?;
    for point in &track.points {
        write_point(out, point, options)?;
    }
    writeln!(out, "    </trkseg>")?;
    writeln!(out, "  </trk>")?;
    writeln!(out, "</gpx>")
}

fn write_point<W: Write>(out: &mut W, point: &TrackPoint, options: &GpxOptions) -> io::Result<()> {
    writeln!(
        out,
        r#"      <trkpt lat="{}" lon="{}">"#,
        point.latitude, point.longitude
    )?;
    writeln!(
        out,
        "        <time>{}</time>",
        point.time.format("%Y-%m-%dT%H:%M:%SZ")
    )?;
    writeln!(out, "        <extensions>")?;
    writeln!(out, "          <gpxtpx:TrackPointExtension>")?;
    writeln!(out, "            <gpxtpx:hr>{}</gpxtpx:hr>", point.heart_rate)?;
    if let Some(temperature) = point.temperature {
        let scaled = round2(temperature * options.temperature_scale);
        writeln!(out, "            <gpxtpx:atemp>{}</gpxtpx:atemp>", scaled)?;
    }
    if let Some(cadence) = point.cadence {
        writeln!(out, "            <gpxtpx:cad>{}</gpxtpx:cad>", cadence)?;
    }
    writeln!(out, "          </gpxtpx:TrackPointExtension>")?;
    writeln!(out, "        </extensions>")?;
    writeln!(out, "      </trkpt>")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn activity(kind: &str) -> Activity {
        Activity {
            kind: kind.to_string(),
            start: Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 5).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap(),
        }
    }

    fn render(track: &ActivityTrack, scale: f64) -> String {
        let options = GpxOptions {
            creator: "SCANWATCH 2".to_string(),
            temperature_scale: scale,
        };
        let mut buf = Vec::new();
        write_gpx(&mut buf, track, &options).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            file_name("SW", &activity("Trail Running")),
            "SW_20240501_063005_trail_running.gpx"
        );
        assert_eq!(slug("Run/Walk"), "run_walk");
        assert_eq!(slug("  "), "activity");
    }

    #[test]
    fn test_point_extensions() {
        let track = ActivityTrack {
            activity: activity("Course & Trail"),
            points: vec![
                TrackPoint {
                    time: Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 5).unwrap(),
                    latitude: 48.8566,
                    longitude: 2.3522,
                    heart_rate: 142,
                    temperature: Some(37.456),
                    cadence: Some(168),
                },
                TrackPoint {
                    time: Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 6).unwrap(),
                    latitude: 48.8567,
                    longitude: 2.3523,
                    heart_rate: 143,
                    temperature: None,
                    cadence: None,
                },
            ],
        };

        let xml = render(&track, 1.0);
        assert!(xml.contains("<name>Course &amp; Trail - 2024-05-01</name>"));
        assert!(xml.contains(r#"<trkpt lat="48.8566" lon="2.3522">"#));
        assert!(xml.contains("<time>2024-05-01T06:30:05Z</time>"));
        assert!(xml.contains("<gpxtpx:hr>142</gpxtpx:hr>"));
        assert!(xml.contains("<gpxtpx:atemp>37.46</gpxtpx:atemp>"));
        assert!(xml.contains("<gpxtpx:cad>168</gpxtpx:cad>"));
        assert_eq!(xml.matches("<gpxtpx:hr>").count(), 2);
        assert_eq!(xml.matches("<gpxtpx:atemp>").count(), 1);
        assert_eq!(xml.matches("<gpxtpx:cad>").count(), 1);

        let scaled = render(&track, 100.0);
        assert!(scaled.contains("<gpxtpx:atemp>3745.6</gpxtpx:atemp>"));
    }
}
