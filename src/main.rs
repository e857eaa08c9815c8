use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crashspot_cluster::{Granularity, HotspotReport, HotspotRequest, SearchStatus};
use crashspot_io::{AccidentDataset, AccidentReader, ExperimentName, ResultWriter, Settings};

#[derive(Parser)]
#[command(name = "crashspot")]
#[command(about = "Automatic detection and ranking of traffic-accident hotspots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the Hopkins statistic (overrides the settings file)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Inputs and outputs shared by both hotspot runs.
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Path to the settings JSON file
    #[arg(long)]
    settings: PathBuf,

    /// Path to the cleaned accident CSV (defaults to the settings' clean_dataset)
    #[arg(long)]
    data: Option<PathBuf>,

    /// City name or state code to analyse
    #[arg(long)]
    target: String,

    /// Accident cause to analyse
    #[arg(long)]
    cause: String,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Find hotspots in one city with a knee-bounded DBSCAN search
    City {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Find hotspots in one state with an OPTICS search
    State {
        #[command(flatten)]
        run: RunArgs,
    },

    /// List the cities present in the accident table
    Cities {
        /// Path to the cleaned accident CSV
        #[arg(long)]
        data: PathBuf,
    },

    /// List the states present in the accident table
    States {
        /// Path to the cleaned accident CSV
        #[arg(long)]
        data: PathBuf,
    },

    /// List the accident causes recorded in a city or a state
    Causes {
        /// Path to the cleaned accident CSV
        #[arg(long)]
        data: PathBuf,

        /// City to list causes for
        #[arg(long, conflicts_with = "state", required_unless_present = "state")]
        city: Option<String>,

        /// State to list causes for
        #[arg(long)]
        state: Option<String>,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct HotspotOutput {
    experiment: String,
    granularity: Granularity,
    target: String,
    cause: String,
    status: SearchStatus,
    n_records: usize,
    n_clusters: usize,
    hopkins: Option<f64>,
    max_eps_km: Option<f64>,
    path: PathBuf,
}

#[derive(Serialize)]
struct ListOutput {
    kind: &'static str,
    values: Vec<String>,
}

fn read_dataset(path: &Path) -> Result<AccidentDataset> {
    let dataset = AccidentReader::new(path)
        .read()
        .with_context(|| format!("failed to read accident table {}", path.display()))?;
    info!(n_records = dataset.len(), "dataset loaded");
    Ok(dataset)
}

/// Resolve the data path: the flag wins, else `clean_dataset` relative to the settings file.
fn data_path(run: &RunArgs, settings: &Settings) -> Result<PathBuf> {
    if let Some(data) = &run.data {
        return Ok(data.clone());
    }
    let Some(clean) = &settings.clean_dataset else {
        anyhow::bail!("no --data given and the settings file has no clean_dataset entry");
    };
    if clean.is_absolute() {
        return Ok(clean.clone());
    }
    let base = run.settings.parent().unwrap_or_else(|| Path::new("."));
    Ok(base.join(clean))
}

fn run_hotspots(granularity: Granularity, run: RunArgs, seed: Option<u64>) -> Result<()> {
    let experiment_name = ExperimentName::new(run.experiment.clone())?;
    let settings = Settings::load(&run.settings).context("failed to load settings")?;
    let dataset = read_dataset(&data_path(&run, &settings)?)?;

    let records = dataset.select(granularity, &run.target, &run.cause);
    info!(
        target = %run.target,
        cause = %run.cause,
        n_records = records.len(),
        "records selected"
    );

    let request = HotspotRequest::new(run.target.clone(), run.cause.clone());
    let report: HotspotReport = match granularity {
        Granularity::City => settings
            .city_config(seed)?
            .fit(&request, &records)
            .context("city hotspot search failed")?,
        Granularity::State => settings
            .state_config(seed)?
            .fit(&request, &records)
            .context("state hotspot search failed")?,
    };

    let writer = ResultWriter::new(&run.output_dir, experiment_name)?;
    let path = writer.write_hotspots(&report)?;

    let output = HotspotOutput {
        experiment: run.experiment,
        granularity,
        target: run.target,
        cause: run.cause,
        status: report.status,
        n_records: records.len(),
        n_clusters: report.n_clusters(),
        hopkins: report.details.as_ref().map(|d| d.hopkins),
        max_eps_km: report.details.as_ref().and_then(|d| d.epsilon.max_eps_km()),
        path,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_list(kind: &'static str, values: Vec<String>) -> Result<()> {
    let output = ListOutput { kind, values };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::City { run } => run_hotspots(Granularity::City, run, cli.seed),
        Command::State { run } => run_hotspots(Granularity::State, run, cli.seed),
        Command::Cities { data } => print_list("cities", read_dataset(&data)?.cities()),
        Command::States { data } => print_list("states", read_dataset(&data)?.states()),
        Command::Causes { data, city, state } => {
            let dataset = read_dataset(&data)?;
            match (city, state) {
                (Some(city), _) => print_list("causes", dataset.causes(Granularity::City, &city)),
                (None, Some(state)) => {
                    print_list("causes", dataset.causes(Granularity::State, &state))
                }
                (None, None) => anyhow::bail!("either --city or --state is required"),
            }
        }
    }
}
