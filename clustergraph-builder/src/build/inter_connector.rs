//! Component E: for each entrance, pairs it with its opposing entrance in
//! the neighbor chunk across the shared border and writes a symmetric
//! unit-cost edge.

use clustergraph_core::crossing::can_cross;
use clustergraph_core::db::{with_retry, RetryPolicy, ScopeFilter, SqliteTileStore};
use clustergraph_core::movement::Border;
use clustergraph_core::Result;
use rusqlite::params;

#[derive(Debug, Default, Clone, Copy)]
pub struct InterSummary {
    pub examined: i64,
    pub created: i64,
}

struct EntranceRow {
    id: i64,
    chunk_x: i32,
    chunk_z: i32,
    plane: i32,
    x: i32,
    y: i32,
    dir: Border,
}

pub fn run(
    store: &SqliteTileStore,
    scope: &ScopeFilter,
    recompute: bool,
    dry_run: bool,
    retry: &RetryPolicy,
) -> Result<InterSummary> {
    let mut summary = InterSummary::default();

    if recompute && !dry_run {
        delete_existing_for_scope(store, scope, retry)?;
    }

    let entrances = select_entrances(store, scope)?;

    for e in &entrances {
        summary.examined += 1;
        let opp_dir = e.dir.opposite();
        let (dx, dy) = e.dir.delta();
        let (nx, ny) = (e.x + dx, e.y + dy);

        let Some(here) = store.get_tile(e.x, e.y, e.plane)? else { continue };
        if !here.is_walkable() {
            continue;
        }
        let Some(there) = store.get_tile(nx, ny, e.plane)? else { continue };
        if !there.is_walkable() {
            continue;
        }
        if !can_cross(here.walk_flags, there.walk_flags, e.dir) {
            continue;
        }

        let (ncx, ncz) = neighbor_chunk(e.chunk_x, e.chunk_z, e.dir);
        let Some(opp_id) = find_opposing_entrance(store, nx, ny, e.plane, ncx, ncz, opp_dir)? else {
            continue;
        };

        if dry_run {
            summary.created += 2;
            continue;
        }

        upsert_edge(store, e.id, opp_id, retry)?;
        upsert_edge(store, opp_id, e.id, retry)?;
        summary.created += 2;
    }

    tracing::info!(
        entrances_examined = summary.examined,
        inter_edges_created = summary.created,
        dry_run,
        "inter-connector complete"
    );

    Ok(summary)
}

fn neighbor_chunk(chunk_x: i32, chunk_z: i32, dir: Border) -> (i32, i32) {
    match dir {
        Border::N => (chunk_x, chunk_z + 1),
        Border::S => (chunk_x, chunk_z - 1),
        Border::E => (chunk_x + 1, chunk_z),
        Border::W => (chunk_x - 1, chunk_z),
    }
}

fn select_entrances(store: &SqliteTileStore, scope: &ScopeFilter) -> Result<Vec<EntranceRow>> {
    let conn = store.connection();
    let mut conds = vec!["1=1".to_string()];
    let mut args: Vec<i32> = Vec::new();
    if let Some(v) = scope.chunk_x_min {
        conds.push("chunk_x >= ?".to_string());
        args.push(v);
    }
    if let Some(v) = scope.chunk_x_max {
        conds.push("chunk_x <= ?".to_string());
        args.push(v);
    }
    if let Some(v) = scope.chunk_z_min {
        conds.push("chunk_z >= ?".to_string());
        args.push(v);
    }
    if let Some(v) = scope.chunk_z_max {
        conds.push("chunk_z <= ?".to_string());
        args.push(v);
    }
    if let Some(planes) = &scope.planes {
        if !planes.is_empty() {
            let placeholders = vec!["?"; planes.len()].join(",");
            conds.push(format!("plane IN ({placeholders})"));
            args.extend(planes.iter().copied());
        }
    }
    let sql = format!(
        "SELECT entrance_id, chunk_x, chunk_z, plane, x, y, neighbor_dir FROM cluster_entrances \
         WHERE {} ORDER BY chunk_x, chunk_z, plane, entrance_id",
        conds.join(" AND ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(args), |r| {
        let dir_str: String = r.get(6)?;
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i32>(1)?,
            r.get::<_, i32>(2)?,
            r.get::<_, i32>(3)?,
            r.get::<_, i32>(4)?,
            r.get::<_, i32>(5)?,
            dir_str,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, chunk_x, chunk_z, plane, x, y, dir_str) = row?;
        let Some(dir) = Border::from_str(&dir_str) else { continue };
        out.push(EntranceRow { id, chunk_x, chunk_z, plane, x, y, dir });
    }
    Ok(out)
}

fn find_opposing_entrance(
    store: &SqliteTileStore,
    x: i32,
    y: i32,
    plane: i32,
    opp_chunk_x: i32,
    opp_chunk_z: i32,
    opp_dir: Border,
) -> Result<Option<i64>> {
    let conn = store.connection();
    let result = conn.query_row(
        "SELECT entrance_id FROM cluster_entrances \
         WHERE chunk_x = ?1 AND chunk_z = ?2 AND plane = ?3 AND x = ?4 AND y = ?5 AND neighbor_dir = ?6",
        params![opp_chunk_x, opp_chunk_z, plane, x, y, opp_dir.as_str()],
        |r| r.get::<_, i64>(0),
    );
    match result {
        Ok(id) => Ok(Some(id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn delete_existing_for_scope(store: &SqliteTileStore, scope: &ScopeFilter, retry: &RetryPolicy) -> Result<()> {
    let conn = store.connection();
    let mut conds = vec!["1=1".to_string()];
    let mut args: Vec<i32> = Vec::new();
    if let Some(v) = scope.chunk_x_min {
        conds.push("chunk_x >= ?".to_string());
        args.push(v);
    }
    if let Some(v) = scope.chunk_x_max {
        conds.push("chunk_x <= ?".to_string());
        args.push(v);
    }
    if let Some(v) = scope.chunk_z_min {
        conds.push("chunk_z >= ?".to_string());
        args.push(v);
    }
    if let Some(v) = scope.chunk_z_max {
        conds.push("chunk_z <= ?".to_string());
        args.push(v);
    }
    if let Some(planes) = &scope.planes {
        if !planes.is_empty() {
            let placeholders = vec!["?"; planes.len()].join(",");
            conds.push(format!("plane IN ({placeholders})"));
            args.extend(planes.iter().copied());
        }
    }
    let sql = format!(
        "DELETE FROM cluster_interconnections WHERE entrance_from IN \
         (SELECT entrance_id FROM cluster_entrances WHERE {})",
        conds.join(" AND ")
    );
    with_retry(retry, || conn.execute(&sql, rusqlite::params_from_iter(args.clone())))?;
    Ok(())
}

fn upsert_edge(store: &SqliteTileStore, from: i64, to: i64, retry: &RetryPolicy) -> Result<()> {
    let conn = store.connection();
    with_retry(retry, || {
        conn.execute(
            "INSERT INTO cluster_interconnections (entrance_from, entrance_to, cost) VALUES (?1, ?2, 1) \
             ON CONFLICT(entrance_from, entrance_to) \
             DO UPDATE SET cost = MIN(cluster_interconnections.cost, excluded.cost)",
            params![from, to],
        )
    })?;
    Ok(())
}
