//! Westgard: QC multi-rule evaluator CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use westgard::config::{build_ignore_set, default_config_json, load_config, Config, CONFIG_FILENAME};
use westgard::history::{file_digest, load_history, save_history, HistoryFile};
use westgard::pipeline::{ingest, Mode};
use westgard::reader::SheetReader;
use westgard::reporter::{ConsoleReporter, JsonReporter};
use westgard::series::MergeOutcome;
use westgard::{analyzer, SeriesEntry, SeriesKey, Severity};

/// Westgard: multi-rule evaluator for laboratory QC measurements
#[derive(Parser, Debug)]
#[command(name = "westgard")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Output format as JSON
    #[arg(long, short, global = true)]
    json: bool,

    /// Quiet mode (flagged series only)
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Verbose output (every point, debug logging)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Path to config file (default: search .westgardrc.json in current dir and parents)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// History file (overrides config)
    #[arg(long, global = true)]
    history: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Establish baselines (mean and SD per analyte and level) from QC exports
    Baseline {
        /// Sheet exports or directories (.csv, .json)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Replace an existing history
        #[arg(long)]
        force: bool,
    },

    /// Append QC runs to the tracked series and evaluate the Westgard rules
    Append {
        /// Sheet exports or directories (.csv, .json)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Append each file as its own run instead of one combined run
        #[arg(long)]
        each: bool,

        /// Append files even if they were ingested before
        #[arg(long)]
        reingest: bool,
    },

    /// Show the tracked series
    Show,

    /// Evaluate a series of averages: the first value is the baseline mean
    Evaluate {
        /// Baseline standard deviation
        #[arg(long)]
        sd: f64,

        /// Run averages, baseline mean first
        #[arg(required = true, allow_negative_numbers = true)]
        averages: Vec<f64>,
    },

    /// Create .westgardrc.json with sensible defaults
    Init {
        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    if let Commands::Init { dir } = &args.command {
        return run_init(dir.as_deref().unwrap_or(&cwd));
    }

    let config = load_config(&cwd, args.config.as_deref())?.merge_with_cli(args.history.clone());
    let history_path = config.history_path();

    match &args.command {
        Commands::Baseline { paths, force } => {
            run_baseline(&args, &config, &history_path, paths, *force)
        }
        Commands::Append {
            paths,
            each,
            reingest,
        } => run_append(&args, &config, &history_path, paths, *each, *reingest),
        Commands::Show => {
            let history = load_history(&history_path)?;
            report(&args, &config, "tracked series", &history.series, &[]);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Evaluate { sd, averages } => run_evaluate(&args, &config, *sd, averages),
        Commands::Init { .. } => Ok(ExitCode::SUCCESS),
    }
}

fn run_baseline(
    args: &Args,
    config: &Config,
    history_path: &Path,
    paths: &[PathBuf],
    force: bool,
) -> Result<ExitCode> {
    if history_path.exists() && !force {
        anyhow::bail!(
            "{} already exists; use --force to replace the tracked baselines",
            history_path.display()
        );
    }

    let reader = sheet_reader(paths.to_vec(), config)?;
    let files = reader.files()?;
    let ingestion = ingest(&reader, Vec::new(), Mode::Baseline)?;

    let mut history = HistoryFile::with_series(ingestion.series);
    for file in &files {
        history.record_ingested(file_digest(file)?, file);
    }
    save_history(history_path, &mut history)?;

    if !args.quiet && !args.json {
        eprintln!(
            "{}: {} baselines from {} files written to {}",
            "Info".blue(),
            history.series.len(),
            files.len(),
            history_path.display()
        );
    }
    report(args, config, "baselines", &history.series, &[]);
    Ok(ExitCode::SUCCESS)
}

fn run_append(
    args: &Args,
    config: &Config,
    history_path: &Path,
    paths: &[PathBuf],
    each: bool,
    reingest: bool,
) -> Result<ExitCode> {
    let mut history = load_history(history_path)?;
    if history.series.is_empty() {
        anyhow::bail!(
            "No tracked series in {}; run `westgard baseline` first",
            history_path.display()
        );
    }

    let mut files = Vec::new();
    for file in sheet_reader(paths.to_vec(), config)?.files()? {
        let digest = file_digest(&file)?;
        if !reingest && history.is_ingested(&digest) {
            log::warn!("{} was already ingested, skipping", file.display());
            continue;
        }
        files.push((file, digest));
    }

    if files.is_empty() {
        if !args.quiet && !args.json {
            eprintln!("{}: No new QC exports to append", "Info".blue());
        }
        return Ok(ExitCode::SUCCESS);
    }

    // One batch per run: either every file combined, or each file on its own
    let batches: Vec<Vec<PathBuf>> = if each {
        files.iter().map(|(f, _)| vec![f.clone()]).collect()
    } else {
        vec![files.iter().map(|(f, _)| f.clone()).collect()]
    };

    let mut series = std::mem::take(&mut history.series);
    let mut outcomes = Vec::new();
    for batch in batches {
        let reader = sheet_reader(batch.clone(), config)?;
        let ingestion = ingest(&reader, series, Mode::Append)
            .with_context(|| format!("appending {}", describe(&batch)))?;
        series = ingestion.series;
        outcomes.extend(ingestion.outcomes);
    }

    history.series = series;
    for (file, digest) in files {
        history.record_ingested(digest, &file);
    }
    save_history(history_path, &mut history)?;

    let appended = appended_keys(&outcomes);
    let touched: Vec<SeriesEntry> = history
        .series
        .iter()
        .filter(|entry| appended.contains(&entry.key()))
        .cloned()
        .collect();
    report(args, config, "appended runs", &touched, &outcomes);

    let rejected = outcomes.iter().any(|o| match o {
        MergeOutcome::Appended { warning, .. } => {
            config.severity_of(*warning) == Some(Severity::Error)
        }
        MergeOutcome::Untracked(_) => false,
    });
    if rejected {
        if !args.quiet && !args.json {
            eprintln!(
                "\n{}: Westgard rule violated, QC run rejected",
                "Failed".red().bold()
            );
        }
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_evaluate(args: &Args, config: &Config, sd: f64, averages: &[f64]) -> Result<ExitCode> {
    if !sd.is_finite() || sd < 0.0 {
        anyhow::bail!("--sd must be a finite, non-negative number");
    }
    let violation = analyzer::evaluate(averages, sd);
    let z: Vec<f64> = analyzer::deviations(averages)
        .map(|d| analyzer::standardize(d, sd))
        .collect();

    if args.json {
        let out = serde_json::json!({
            "violation": violation,
            "z": z.iter().map(|v| if v.is_finite() { Some(*v) } else { None }).collect::<Vec<_>>(),
        });
        println!("{}", out);
    } else {
        println!("{}", violation);
    }

    if config.severity_of(violation) == Some(Severity::Error) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_init(dir: &Path) -> Result<ExitCode> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() {
        eprintln!(
            "{}: {} already exists; use --dir to write elsewhere or remove it first",
            "Warning".yellow(),
            config_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let json = default_config_json()?;
    std::fs::write(&config_path, json + "\n")
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    eprintln!("{}: Created {}", "Info".blue(), config_path.display());
    Ok(ExitCode::SUCCESS)
}

fn sheet_reader(paths: Vec<PathBuf>, config: &Config) -> Result<SheetReader> {
    let reader = SheetReader::new(paths, config.reader.clone());
    if config.ignore.is_empty() {
        Ok(reader)
    } else {
        Ok(reader.with_ignore(build_ignore_set(&config.ignore)?))
    }
}

fn report(
    args: &Args,
    config: &Config,
    title: &str,
    series: &[SeriesEntry],
    outcomes: &[MergeOutcome],
) {
    if args.json {
        let reporter = JsonReporter::new().pretty();
        println!("{}", reporter.report_with_outcomes(series, outcomes, config));
    } else if args.quiet {
        ConsoleReporter::new().report_quiet(series, config);
    } else {
        let mut reporter = ConsoleReporter::new();
        if args.verbose {
            reporter = reporter.verbose();
        }
        if args.no_color {
            reporter = reporter.without_colors();
        }
        if outcomes.is_empty() {
            reporter.report(title, series, config);
        } else {
            reporter.report_append(series, outcomes, config);
        }
    }
}

fn appended_keys(outcomes: &[MergeOutcome]) -> Vec<SeriesKey> {
    outcomes
        .iter()
        .filter_map(|o| match o {
            MergeOutcome::Appended { key, .. } => Some(key.clone()),
            MergeOutcome::Untracked(_) => None,
        })
        .collect()
}

fn describe(files: &[PathBuf]) -> String {
    match files {
        [single] => single.display().to_string(),
        _ => format!("{} files", files.len()),
    }
}
