mod build;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use clustergraph_core::db::{RetryPolicy, ScopeFilter};
use clustergraph_core::policy::NeighborPolicy;
use rusqlite::{Connection, OpenFlags};
use tracing_subscriber::EnvFilter;

use build::orchestrator;

/// Precomputes and persists the hierarchical pathfinding cluster graph.
#[derive(Parser, Debug)]
#[command(name = "clustergraph-builder", about = "Populate cluster entrances and connections (HPA*)")]
struct Args {
    /// Path to the local SQLite DB (worldReachableTiles.db).
    #[arg(long)]
    db_path: PathBuf,

    /// Comma-separated plane list (default: all).
    #[arg(long)]
    planes: Option<String>,

    /// Chunk range filter "x_min:x_max,z_min:z_max" (inclusive). Omit bounds to leave open.
    #[arg(long)]
    chunk_range: Option<String>,

    /// Recompute and overwrite existing rows where applicable.
    #[arg(long)]
    recompute: bool,

    /// Store intra-connection path blobs when available.
    #[arg(long)]
    store_paths: bool,

    /// Do not mutate the DB; open read-only and print summaries.
    #[arg(long)]
    dry_run: bool,

    /// Number of worker threads to partition the chunk list across.
    #[arg(long, default_value_t = 1)]
    workers: usize,

    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    log_level: String,
}

fn parse_planes(arg: &str) -> Result<Option<Vec<i32>>> {
    if arg.trim().is_empty() {
        return Ok(None);
    }
    let planes = arg
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<i32>().with_context(|| format!("--planes must be a comma-separated list of ints, got '{arg}'")))
        .collect::<Result<Vec<i32>>>()?;
    Ok(Some(planes))
}

#[derive(Debug, Default, Clone, Copy)]
struct ChunkRange {
    x_min: Option<i32>,
    x_max: Option<i32>,
    z_min: Option<i32>,
    z_max: Option<i32>,
}

impl ChunkRange {
    fn parse(s: &str) -> Result<Self> {
        let invalid = || anyhow::anyhow!("Invalid --chunk-range '{s}'. Expected 'x_min:x_max,z_min:z_max'");
        let (xpart, zpart) = s.split_once(',').ok_or_else(invalid)?;
        let (x_min, x_max) = xpart.split_once(':').ok_or_else(invalid)?;
        let (z_min, z_max) = zpart.split_once(':').ok_or_else(invalid)?;
        let to_opt = |v: &str| -> Result<Option<i32>> {
            let v = v.trim();
            if v.is_empty() {
                Ok(None)
            } else {
                Ok(Some(v.parse::<i32>().map_err(|_| invalid())?))
            }
        };
        Ok(Self { x_min: to_opt(x_min)?, x_max: to_opt(x_max)?, z_min: to_opt(z_min)?, z_max: to_opt(z_max)? })
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run(args: Args) -> Result<()> {
    init_logging(&args.log_level);

    let planes = args.planes.as_deref().map(parse_planes).transpose()?.flatten();
    let chunk_range = match &args.chunk_range {
        Some(s) => ChunkRange::parse(s)?,
        None => ChunkRange::default(),
    };

    tracing::info!(
        db_path = %args.db_path.display(),
        dry_run = args.dry_run,
        ?planes,
        recompute = args.recompute,
        store_paths = args.store_paths,
        workers = args.workers,
        "starting populate-clusters pipeline"
    );

    let scope = ScopeFilter {
        planes,
        chunk_x_min: chunk_range.x_min,
        chunk_x_max: chunk_range.x_max,
        chunk_z_min: chunk_range.z_min,
        chunk_z_max: chunk_range.z_max,
    };
    let policy_conn = Connection::open_with_flags(&args.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open '{}' to load the movement policy", args.db_path.display()))?;
    let policy = NeighborPolicy::load(&policy_conn).context("failed to load movement_policy")?;
    let retry = RetryPolicy::default();

    let summary = orchestrator::run(
        &args.db_path,
        &scope,
        &policy,
        args.recompute,
        args.dry_run,
        args.store_paths,
        args.workers,
        &retry,
    )
    .context("pipeline run failed")?;

    tracing::info!(
        entrances_created = summary.entrances.created,
        inter_created = summary.inter.created,
        intra_created = summary.intra.created,
        "summary"
    );
    if args.dry_run {
        tracing::info!("dry-run mode: no database changes were made");
    }
    tracing::info!("pipeline completed successfully");

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
