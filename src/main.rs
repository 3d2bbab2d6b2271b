use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Parser};
use scanwatch_gpx::{run_export, ActivityTable, DateRange, ExportConfig, ExportRequest, TypeSelection};
use tracing_subscriber::EnvFilter;

/// Build Strava-ready GPX tracks from a ScanWatch raw data export.
///
/// Any selection left out on the command line is asked for interactively.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Export directory holding activities.csv and the raw_*.csv files
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Activity type to export, or "all"
    #[arg(short = 't', long = "type")]
    activity_type: Option<String>,

    /// First activity date to export (YYYY-MM-DD, inclusive)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last activity date to export (YYYY-MM-DD, inclusive)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Output directory (defaults to <source>/export)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// GPS moving-average window in seconds
    #[arg(long, default_value_t = 10)]
    smoothing_window: i64,

    /// Oldest cadence sample, in seconds, still attached to a point
    #[arg(long, default_value_t = 60)]
    cadence_max_age: i64,

    /// Factor applied to core temperature before writing
    #[arg(long, default_value_t = 1.0)]
    temperature_scale: f64,

    /// List the activity types found and exit
    #[arg(long, action = ArgAction::SetTrue)]
    list_types: bool,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = ExportConfig {
        smoothing_window_secs: cli.smoothing_window,
        cadence_max_age_secs: cli.cadence_max_age,
        temperature_scale: cli.temperature_scale,
        ..ExportConfig::default()
    };

    println!("=== ScanWatch GPX export ===");

    let source_dir = match &cli.source {
        Some(dir) if dir.is_dir() => dir.clone(),
        Some(dir) => bail!("source directory not found: {}", dir.display()),
        None => prompt_source_dir()?,
    };

    let activities_path = source_dir.join(&config.activities_file);
    let table = ActivityTable::read(&activities_path, &config)
        .with_context(|| format!("reading {}", activities_path.display()))?;
    let types = table.types();

    if cli.list_types {
        for kind in &types {
            println!("{}", kind);
        }
        return Ok(());
    }

    let selection = match cli.activity_type.as_deref() {
        Some(label) => table.selection(label)?,
        None => prompt_type(&types)?,
    };

    let range = match (cli.from, cli.to) {
        (Some(from), Some(to)) => DateRange::new(from, to)?,
        (from, to) => {
            let from = match from {
                Some(date) => date,
                None => prompt_date("Start date (YYYY-MM-DD): ")?,
            };
            let to = match to {
                Some(date) => date,
                None => prompt_date("End date   (YYYY-MM-DD): ")?,
            };
            DateRange::new(from, to)?
        }
    };

    let request = ExportRequest {
        source_dir,
        output_dir: cli.output,
        selection,
        range,
    };

    let report = run_export(&request, &config).context("export failed")?;

    if report.selected == 0 {
        println!("No activity found.");
        return Ok(());
    }
    for skipped in &report.skipped {
        println!("No heart-rate data for activity {} ({})", skipped.start, skipped.kind);
    }
    println!(
        "Done: {} of {} activities exported to {}",
        report.written.len(),
        report.selected,
        report.output_dir.display()
    );

    Ok(())
}

fn read_answer(question: &str) -> Result<String> {
    print!("{}", question);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input)? == 0 {
        bail!("no more input");
    }
    Ok(input.trim().to_string())
}

fn prompt_source_dir() -> Result<PathBuf> {
    loop {
        let dir = PathBuf::from(read_answer(
            "Source directory (with activities.csv and raw_*.csv): ",
        )?);
        if dir.is_dir() {
            return Ok(dir);
        }
        println!("Invalid directory.");
    }
}

fn prompt_type(types: &[String]) -> Result<TypeSelection> {
    println!("\nAvailable types:");
    println!(" 0. All");
    for (i, kind) in types.iter().enumerate() {
        println!(" {}. {}", i + 1, kind);
    }

    loop {
        match read_answer("Choice: ")?.parse::<usize>() {
            Ok(0) => return Ok(TypeSelection::All),
            Ok(n) if n <= types.len() => return Ok(TypeSelection::Only(types[n - 1].clone())),
            _ => println!("Pick a number between 0 and {}.", types.len()),
        }
    }
}

fn prompt_date(question: &str) -> Result<NaiveDate> {
    loop {
        match NaiveDate::parse_from_str(&read_answer(question)?, "%Y-%m-%d") {
            Ok(date) => return Ok(date),
            Err(_) => println!("Expected a date like 2024-05-01."),
        }
    }
}
