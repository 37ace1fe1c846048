//! Component D: selects walkable border tiles of each chunk whose adjacent
//! tile across the border is also walkable, and records the crossing
//! direction.

use std::collections::HashSet;

use clustergraph_core::crossing::can_cross;
use clustergraph_core::db::{with_retry, RetryPolicy, ScopeFilter, SqliteTileStore};
use clustergraph_core::movement::{Border, CANONICAL_BORDER_ORDER};
use clustergraph_core::tile::chunk_bounds;
use clustergraph_core::Result;
use rusqlite::params;

#[derive(Debug, Default, Clone, Copy)]
pub struct EntranceSummary {
    pub created: i64,
    pub chunks: i64,
    pub tiles_border: i64,
}

pub fn run(
    store: &SqliteTileStore,
    scope: &ScopeFilter,
    recompute: bool,
    dry_run: bool,
    retry: &RetryPolicy,
) -> Result<EntranceSummary> {
    let mut summary = EntranceSummary::default();
    let chunks = store.list_chunks(scope)?;

    for (chunk_x, chunk_z, chunk_size) in chunks {
        summary.chunks += 1;
        let planes = match &scope.planes {
            Some(p) => p.clone(),
            None => store.list_planes_in_chunk(chunk_x, chunk_z)?,
        };
        let bounds = chunk_bounds(chunk_x, chunk_z, chunk_size);

        for plane in planes {
            if recompute && !dry_run {
                delete_existing(store, chunk_x, chunk_z, plane, retry)?;
            }

            let border_tiles = store.list_border_walkable(chunk_x, chunk_z, plane, bounds)?;
            summary.tiles_border += border_tiles.len() as i64;

            for (x, y) in border_tiles {
                let borders = borders_of(x, y, bounds);
                let Some(dir) = winning_direction(store, x, y, plane, &borders)? else {
                    continue;
                };

                if dry_run {
                    summary.created += 1;
                    continue;
                }

                upsert_entrance(store, chunk_x, chunk_z, plane, x, y, dir, retry)?;
                summary.created += 1;
            }
        }
    }

    tracing::info!(
        chunks = summary.chunks,
        tiles_border = summary.tiles_border,
        entrances_created = summary.created,
        dry_run,
        "entrance discovery complete"
    );

    Ok(summary)
}

/// Which chunk borders `(x, y)` lies on, given `(x0, y0, x1, y1)` bounds.
/// Convention B: the south border is `y == y0`, the north border `y == y1`.
fn borders_of(x: i32, y: i32, bounds: (i32, i32, i32, i32)) -> HashSet<Border> {
    let (x0, y0, x1, y1) = bounds;
    let mut set = HashSet::new();
    if y == y0 {
        set.insert(Border::S);
    }
    if x == x1 {
        set.insert(Border::E);
    }
    if y == y1 {
        set.insert(Border::N);
    }
    if x == x0 {
        set.insert(Border::W);
    }
    set
}

fn winning_direction(
    store: &SqliteTileStore,
    x: i32,
    y: i32,
    plane: i32,
    borders: &HashSet<Border>,
) -> Result<Option<Border>> {
    let Some(here) = store.get_tile(x, y, plane)? else {
        return Ok(None);
    };
    for dir in CANONICAL_BORDER_ORDER {
        if !borders.contains(&dir) {
            continue;
        }
        let (dx, dy) = dir.delta();
        let (nx, ny) = (x + dx, y + dy);
        let Some(there) = store.get_tile(nx, ny, plane)? else {
            continue;
        };
        if there.is_walkable() && can_cross(here.walk_flags, there.walk_flags, dir) {
            return Ok(Some(dir));
        }
    }
    Ok(None)
}

fn delete_existing(
    store: &SqliteTileStore,
    chunk_x: i32,
    chunk_z: i32,
    plane: i32,
    retry: &RetryPolicy,
) -> Result<()> {
    let conn = store.connection();
    with_retry(retry, || {
        conn.execute(
            "DELETE FROM cluster_entrances WHERE chunk_x = ?1 AND chunk_z = ?2 AND plane = ?3",
            params![chunk_x, chunk_z, plane],
        )
    })?;
    Ok(())
}

fn upsert_entrance(
    store: &SqliteTileStore,
    chunk_x: i32,
    chunk_z: i32,
    plane: i32,
    x: i32,
    y: i32,
    dir: Border,
    retry: &RetryPolicy,
) -> Result<()> {
    let conn = store.connection();
    with_retry(retry, || {
        conn.execute(
            "INSERT INTO cluster_entrances (chunk_x, chunk_z, plane, x, y, neighbor_dir) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(chunk_x, chunk_z, plane, x, y) DO UPDATE SET neighbor_dir = excluded.neighbor_dir",
            params![chunk_x, chunk_z, plane, x, y, dir.as_str()],
        )
    })?;
    Ok(())
}
