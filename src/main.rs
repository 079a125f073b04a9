use anyhow::{Context, Result};
use calendar_alignment::{
    compute_expected, render_json, render_text, write_correspondence_csv, CheckConfig,
    HarnessContext, NewestBar, RunReport, SnapshotFileAccessor, TzPolicy,
};
use clap::Parser;
use log::{error, info};
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code when the run aborts before producing a verdict
const EXIT_FATAL: u8 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "calendar-alignment",
    version,
    about = "Check that a rendered chart/calendar puts today's data under today's slot"
)]
struct Cli {
    /// Snapshot JSON files captured from the page (`-` or nothing reads a piped stdin)
    snapshots: Vec<String>,

    /// Check configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewer timezone: local, utc, or a fixed offset like +09:00
    #[arg(long)]
    tz: Option<TzPolicy>,

    /// Evaluate "now" at this Unix time in milliseconds instead of the live clock
    #[arg(long)]
    now_millis: Option<i64>,

    /// Capture index of the bar holding the newest data point
    #[arg(long)]
    newest_bar: Option<usize>,

    /// Directory for evidence artifacts
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Also write the bar → tick table as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let mut config = match &cli.config {
        Some(path) => CheckConfig::from_file(path)?,
        None => CheckConfig::default(),
    };
    if let Some(tz) = cli.tz {
        config.tz = tz;
    }
    if let Some(index) = cli.newest_bar {
        config.newest_bar = NewestBar::Designated(index);
    }

    // One clock reading per run
    let now_millis = cli
        .now_millis
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    let expected = compute_expected(now_millis, config.tz, config.weekday_locale)?;
    info!("{}", expected.summary());

    let targets = if cli.snapshots.is_empty() {
        vec!["-".to_string()]
    } else {
        cli.snapshots.clone()
    };

    let mut ctx = HarnessContext::new(SnapshotFileAccessor::new(), config, expected.clone());
    if let Some(dir) = &cli.results_dir {
        ctx = ctx.with_results_dir(dir);
    }

    let mut runs = Vec::with_capacity(targets.len());
    for target in &targets {
        let run = ctx
            .run(target)
            .with_context(|| format!("Verification of {} aborted", target))?;
        runs.push(run);
    }

    let report = RunReport::new(expected, runs);

    if let Some(path) = &cli.csv {
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
        write_correspondence_csv(file, &report.runs)?;
    }

    if cli.json {
        println!("{}", render_json(&report)?);
    } else {
        print!("{}", render_text(&report));
    }

    Ok(report.exit_code() as u8)
}
