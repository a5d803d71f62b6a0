//! evboot CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use eb_bootstrap::{EntropySeeds, FixedSeeds, SeedSource};
use eb_core::RunConfig;

mod events;

#[derive(Parser)]
#[command(name = "evboot")]
#[command(about = "evboot - bootstrap realizations of photon event lists")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write bootstrap realizations of one event file
    Bootstrap {
        /// Input event file (FITS)
        input: PathBuf,

        /// Number of realizations (overrides --config; default 1)
        realizations: Option<usize>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Bootstrap every event file listed in a manifest on a worker pool
    Batch {
        /// Number of concurrent workers
        jobs: usize,

        /// Manifest: whitespace-separated event file paths
        manifest: PathBuf,

        /// Number of realizations per file (overrides --config; default 1)
        realizations: Option<usize>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Write a synthetic event file (log-uniform energies, one GTI)
    GenerateEvents {
        /// Number of photons
        #[arg(long, default_value = "1000")]
        n_events: usize,

        /// Lowest energy (MeV)
        #[arg(long, default_value = "30.0")]
        emin: f64,

        /// Highest energy (MeV)
        #[arg(long, default_value = "500000.0")]
        emax: f64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output FITS path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Summarize the events table of a file (pretty JSON)
    Inspect {
        /// Input event file (FITS)
        input: PathBuf,

        /// Lower energy bound (MeV) for the eligible count
        #[arg(long, default_value = "100.0")]
        emin: f64,

        /// Upper energy bound (MeV) for the eligible count
        #[arg(long, default_value = "300000.0")]
        emax: f64,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

/// Options shared by `bootstrap` and `batch`.
#[derive(Args)]
struct RunArgs {
    /// Lower energy bound in MeV (default 100)
    #[arg(long)]
    emin: Option<f64>,

    /// Upper energy bound in MeV (default 300000)
    #[arg(long)]
    emax: Option<f64>,

    /// Base seed; realization r uses seed + r. Omit for fresh OS entropy.
    ///
    /// The same seeds apply to every file of a batch, so inputs with equal
    /// eligible counts get identical row draws.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON run config (`{"window": {"emin": .., "emax": ..}, "realizations": ..}`)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file for the run report (pretty JSON). Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RunArgs {
    /// Resolve flags over the config file over defaults.
    fn run_config(&self, realizations: Option<usize>) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => RunConfig::default(),
        };
        if let Some(n) = realizations {
            config.realizations = n;
        }
        if let Some(emin) = self.emin {
            config.window.emin = emin;
        }
        if let Some(emax) = self.emax {
            config.window.emax = emax;
        }
        config.validate()?;
        Ok(config)
    }

    fn seeds(&self) -> Box<dyn SeedSource> {
        match self.seed {
            Some(seed) => Box::new(FixedSeeds(seed)),
            None => Box::new(EntropySeeds),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Bootstrap { input, realizations, run } => {
            cmd_bootstrap(&input, realizations, &run)
        }
        Commands::Batch { jobs, manifest, realizations, run } => {
            cmd_batch(jobs, &manifest, realizations, &run)
        }
        Commands::GenerateEvents { n_events, emin, emax, seed, output } => {
            events::cmd_generate_events(n_events, emin, emax, seed, &output)
        }
        Commands::Inspect { input, emin, emax, output } => {
            events::cmd_inspect(&input, emin, emax, output.as_ref())
        }
        Commands::Version => {
            println!("evboot {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn cmd_bootstrap(input: &PathBuf, realizations: Option<usize>, run: &RunArgs) -> Result<()> {
    let config = run.run_config(realizations)?;
    let seeds = run.seeds();
    tracing::info!(
        path = %input.display(),
        realizations = config.realizations,
        emin = config.window.emin,
        emax = config.window.emax,
        "bootstrapping"
    );

    // An unreadable input is reported in the outcome, not as a failed run.
    let outcome = eb_bootstrap::generate(input, &config, seeds.as_ref());
    tracing::info!(
        status = ?outcome.status,
        n_eligible = outcome.n_eligible,
        written = outcome.outputs.len(),
        "bootstrap complete"
    );

    write_json(run.output.as_ref(), serde_json::to_value(&outcome)?)
}

fn cmd_batch(
    jobs: usize,
    manifest: &PathBuf,
    realizations: Option<usize>,
    run: &RunArgs,
) -> Result<()> {
    let config = run.run_config(realizations)?;
    let seeds = run.seeds();
    tracing::info!(path = %manifest.display(), jobs, realizations = config.realizations, "batch start");

    let report = eb_bootstrap::run_batch(manifest, jobs, &config, seeds.as_ref())
        .with_context(|| format!("batch over {} aborted", manifest.display()))?;
    tracing::info!(
        n_ok = report.n_ok,
        n_failed = report.n_failed,
        n_outputs = report.n_outputs,
        "batch complete"
    );

    write_json(run.output.as_ref(), serde_json::to_value(&report)?)
}

pub(crate) fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
