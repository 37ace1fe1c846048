//! Component H: composes Entrance Discovery, the Inter-Connector and the
//! Intra-Connector into a single run, partitioning the chunk list across
//! worker threads between phases.
//!
//! Each phase runs to completion over the whole scope before the next
//! starts: the Inter-Connector's opposing-entrance lookup can cross into a
//! neighbor chunk outside a worker's own slice, so Entrance Discovery must
//! be fully committed everywhere first.

use std::path::Path;
use std::thread;

use clustergraph_core::db::{ensure_output_schema, RetryPolicy, ScopeFilter, SqliteTileStore, TransactionGuard};
use clustergraph_core::policy::NeighborPolicy;
use clustergraph_core::Result;

use crate::build::entrance_discovery::{self, EntranceSummary};
use crate::build::inter_connector::{self, InterSummary};
use crate::build::intra_connector::{self, IntraSummary};

#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineSummary {
    pub entrances: EntranceSummary,
    pub inter: InterSummary,
    pub intra: IntraSummary,
}

impl PipelineSummary {
    fn add_entrance(&mut self, s: EntranceSummary) {
        self.entrances.created += s.created;
        self.entrances.chunks += s.chunks;
        self.entrances.tiles_border += s.tiles_border;
    }

    fn add_inter(&mut self, s: InterSummary) {
        self.inter.examined += s.examined;
        self.inter.created += s.created;
    }

    fn add_intra(&mut self, s: IntraSummary) {
        self.intra.pairs_total += s.pairs_total;
        self.intra.pairs_solved += s.pairs_solved;
        self.intra.created += s.created;
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    db_path: &Path,
    scope: &ScopeFilter,
    policy: &NeighborPolicy,
    recompute: bool,
    dry_run: bool,
    store_paths: bool,
    workers: usize,
    retry: &RetryPolicy,
) -> Result<PipelineSummary> {
    if !dry_run {
        let bootstrap = SqliteTileStore::open(db_path)?;
        ensure_output_schema(bootstrap.connection())?;
    }

    let probe =
        if dry_run { SqliteTileStore::open_read_only(db_path)? } else { SqliteTileStore::open(db_path)? };
    let chunk_xs = distinct_chunk_xs(&probe, scope)?;
    drop(probe);

    let groups = partition_chunk_x(&chunk_xs, workers.max(1));
    let mut summary = PipelineSummary::default();

    for r in run_phase(db_path, &groups, scope, dry_run, retry, |store, worker_scope| {
        entrance_discovery::run(store, worker_scope, recompute, dry_run, retry)
    })? {
        summary.add_entrance(r);
    }

    for r in run_phase(db_path, &groups, scope, dry_run, retry, |store, worker_scope| {
        inter_connector::run(store, worker_scope, recompute, dry_run, retry)
    })? {
        summary.add_inter(r);
    }

    for r in run_phase(db_path, &groups, scope, dry_run, retry, |store, worker_scope| {
        intra_connector::run(store, worker_scope, policy, recompute, dry_run, store_paths, retry)
    })? {
        summary.add_intra(r);
    }

    tracing::info!(
        entrances_created = summary.entrances.created,
        inter_created = summary.inter.created,
        intra_created = summary.intra.created,
        workers = groups.len(),
        dry_run,
        "pipeline complete"
    );

    Ok(summary)
}

fn distinct_chunk_xs(store: &SqliteTileStore, scope: &ScopeFilter) -> Result<Vec<i32>> {
    let chunks = store.list_chunks(scope)?;
    let mut xs: Vec<i32> = chunks.iter().map(|c| c.0).collect();
    xs.sort_unstable();
    xs.dedup();
    Ok(xs)
}

/// Count-balanced contiguous slices of `xs`, remainder distributed to the
/// first slices. Returns inclusive `(min, max)` chunk_x bounds per worker.
fn partition_chunk_x(xs: &[i32], workers: usize) -> Vec<(i32, i32)> {
    if xs.is_empty() {
        return Vec::new();
    }
    let workers = workers.min(xs.len()).max(1);
    let base = xs.len() / workers;
    let remainder = xs.len() % workers;
    let mut groups = Vec::with_capacity(workers);
    let mut idx = 0;
    for w in 0..workers {
        let size = base + usize::from(w < remainder);
        let slice = &xs[idx..idx + size];
        groups.push((slice[0], slice[slice.len() - 1]));
        idx += size;
    }
    groups
}

/// Runs `phase_fn` once per worker slice on its own connection, each inside
/// its own transaction (skipped for `dry_run`, which never mutates).
fn run_phase<T, F>(
    db_path: &Path,
    groups: &[(i32, i32)],
    base_scope: &ScopeFilter,
    dry_run: bool,
    retry: &RetryPolicy,
    phase_fn: F,
) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&SqliteTileStore, &ScopeFilter) -> Result<T> + Sync,
{
    if groups.is_empty() {
        return Ok(Vec::new());
    }

    let worker_scopes: Vec<ScopeFilter> = groups
        .iter()
        .map(|(lo, hi)| {
            let mut s = base_scope.clone();
            s.chunk_x_min = Some(*lo);
            s.chunk_x_max = Some(*hi);
            s
        })
        .collect();

    thread::scope(|scope_ctx| {
        let handles: Vec<_> = worker_scopes
            .iter()
            .map(|worker_scope| {
                let phase_fn = &phase_fn;
                scope_ctx.spawn(move || -> Result<T> {
                    let store = if dry_run {
                        SqliteTileStore::open_read_only(db_path)?
                    } else {
                        SqliteTileStore::open(db_path)?
                    };
                    if dry_run {
                        return phase_fn(&store, worker_scope);
                    }
                    let guard = TransactionGuard::begin(store.connection(), retry)?;
                    let result = phase_fn(&store, worker_scope)?;
                    guard.commit(retry)?;
                    Ok(result)
                })
            })
            .collect();

        let mut out = Vec::with_capacity(handles.len());
        for h in handles {
            out.push(h.join().expect("worker thread panicked")?);
        }
        Ok(out)
    })
}
