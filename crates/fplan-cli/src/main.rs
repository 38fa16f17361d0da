// Planner entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (stderr, so stdout carries only the report)
// 3. Load config, apply command-line overrides
// 4. Pick the data source (snapshot directory or live API)
// 5. Run the planner once and print the report

mod render;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use fplan_core::config::{self, Config, Overrides};
use fplan_core::planner::Planner;
use fplan_core::source::{CachedSource, DataSource, HttpSource, SnapshotSource};

/// Project expected points for a fantasy squad and suggest transfers.
#[derive(Debug, Parser)]
#[command(name = "fplan", version)]
#[command(about = "Expected-points projection and transfer planner")]
struct Cli {
    /// Entry (team) id to plan for
    #[arg(long)]
    team_id: Option<u32>,

    /// Number of gameweeks to project
    #[arg(long)]
    horizon: Option<usize>,

    /// Free transfers available this gameweek
    #[arg(long)]
    free_transfers: Option<usize>,

    /// Points deducted per transfer beyond the free ones
    #[arg(long)]
    hit_penalty: Option<f64>,

    /// How many of the best-projected candidates the search considers
    #[arg(long)]
    shortlist: Option<usize>,

    /// Read saved API responses from this directory instead of the network
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Directory holding defaults/ and config/
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            team_id: self.team_id,
            horizon: self.horizon,
            free_transfers: self.free_transfers,
            hit_penalty: self.hit_penalty,
            shortlist: self.shortlist,
            snapshot_dir: self.snapshot_dir.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let mut config =
        config::load_config(&cli.base_dir).context("failed to load configuration")?;
    config
        .apply_overrides(&cli.overrides())
        .context("invalid command-line override")?;
    info!(
        horizon = config.planner.horizon,
        free_transfers = config.transfers.free_transfers,
        "config loaded"
    );

    let source = CachedSource::new(open_source(&config)?);
    let report = Planner::new(&config, &source)
        .run()
        .context("planning run failed")?;
    info!(
        histories = source.cached_histories(),
        "run complete"
    );

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode report")?
        );
    } else {
        print!("{}", render::ReportView(&report));
    }
    Ok(())
}

fn open_source(config: &Config) -> anyhow::Result<Box<dyn DataSource>> {
    match &config.source.snapshot_dir {
        Some(dir) => {
            info!("reading snapshot from {}", dir.display());
            Ok(Box::new(SnapshotSource::new(dir.clone())))
        }
        None => {
            info!("fetching from {}", config.source.base_url);
            let http = HttpSource::new(&config.source, &config.credentials)
                .context("failed to build HTTP client")?;
            Ok(Box::new(http))
        }
    }
}

/// Initialize tracing to stderr, filtered by `RUST_LOG`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fplan_core=info,fplan=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
