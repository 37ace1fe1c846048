//! Component F, the hardest core: for each chunk+plane, runs A* (with JPS
//! expansion when available, restricted to chunk bounds) between every
//! pair of entrances; stores cost and optional compressed waypoints.

use clustergraph_core::astar::find_path;
use clustergraph_core::db::{with_retry, RetryPolicy, ScopeFilter, SqliteTileStore};
use clustergraph_core::jps::JpsAccelerator;
use clustergraph_core::policy::NeighborPolicy;
use clustergraph_core::tile::chunk_bounds;
use clustergraph_core::waypoints::{compress, encode_path_blob};
use clustergraph_core::Result;
use rusqlite::params;

#[derive(Debug, Default, Clone, Copy)]
pub struct IntraSummary {
    pub pairs_total: i64,
    pub pairs_solved: i64,
    pub created: i64,
}

struct EntranceRef {
    id: i64,
    x: i32,
    y: i32,
}

pub fn run(
    store: &SqliteTileStore,
    scope: &ScopeFilter,
    policy: &NeighborPolicy,
    recompute: bool,
    dry_run: bool,
    store_paths: bool,
    retry: &RetryPolicy,
) -> Result<IntraSummary> {
    let mut summary = IntraSummary::default();
    let accel = JpsAccelerator::new(store);
    let chunks = store.list_chunks(scope)?;

    for (chunk_x, chunk_z, chunk_size) in chunks {
        let bounds = chunk_bounds(chunk_x, chunk_z, chunk_size);
        let planes = match &scope.planes {
            Some(p) => p.clone(),
            None => store.list_planes_in_chunk(chunk_x, chunk_z)?,
        };

        for plane in planes {
            let entrances = list_entrances(store, chunk_x, chunk_z, plane)?;
            if entrances.is_empty() {
                continue;
            }

            let local_walkable = store.list_chunk_walkable(chunk_x, chunk_z, plane)?;

            if recompute && !dry_run {
                delete_existing_scope(store, chunk_x, chunk_z, plane, retry)?;
            }

            for i in 0..entrances.len() {
                for j in (i + 1)..entrances.len() {
                    let e1 = &entrances[i];
                    let e2 = &entrances[j];
                    if e1.x == e2.x && e1.y == e2.y {
                        continue;
                    }
                    summary.pairs_total += 1;

                    let mut is_walkable = |x: i32, y: i32, p: i32| -> bool {
                        if p != plane {
                            return store.is_walkable(x, y, p).unwrap_or(false);
                        }
                        if clustergraph_core::tile::in_bounds(x, y, bounds) {
                            local_walkable.contains(&(x, y))
                        } else {
                            store.is_walkable(x, y, p).unwrap_or(false)
                        }
                    };

                    let start = (e1.x, e1.y, plane);
                    let goal = (e2.x, e2.y, plane);
                    let found = find_path(start, goal, bounds, |node| {
                        accel
                            .expand(node.0, node.1, node.2, policy, &mut is_walkable)
                            .unwrap_or_default()
                    });

                    let Some(result) = found else { continue };
                    summary.pairs_solved += 1;

                    let path_blob = if store_paths {
                        Some(encode_path_blob(&compress(&result.path)))
                    } else {
                        None
                    };

                    if dry_run {
                        summary.created += 2;
                        continue;
                    }

                    upsert_edge(
                        store,
                        chunk_x,
                        chunk_z,
                        plane,
                        e1.id,
                        e2.id,
                        result.cost,
                        path_blob.as_deref(),
                        retry,
                    )?;
                    upsert_edge(
                        store,
                        chunk_x,
                        chunk_z,
                        plane,
                        e2.id,
                        e1.id,
                        result.cost,
                        path_blob.as_deref(),
                        retry,
                    )?;
                    summary.created += 2;
                }
            }
        }
    }

    tracing::info!(
        pairs_total = summary.pairs_total,
        pairs_solved = summary.pairs_solved,
        rows_created = summary.created,
        dry_run,
        "intra-connector complete"
    );

    Ok(summary)
}

fn list_entrances(
    store: &SqliteTileStore,
    chunk_x: i32,
    chunk_z: i32,
    plane: i32,
) -> Result<Vec<EntranceRef>> {
    let conn = store.connection();
    let mut stmt = conn.prepare(
        "SELECT entrance_id, x, y FROM cluster_entrances \
         WHERE chunk_x = ?1 AND chunk_z = ?2 AND plane = ?3 ORDER BY entrance_id ASC",
    )?;
    let rows = stmt.query_map(params![chunk_x, chunk_z, plane], |r| {
        Ok(EntranceRef { id: r.get(0)?, x: r.get(1)?, y: r.get(2)? })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

fn delete_existing_scope(
    store: &SqliteTileStore,
    chunk_x: i32,
    chunk_z: i32,
    plane: i32,
    retry: &RetryPolicy,
) -> Result<()> {
    let conn = store.connection();
    with_retry(retry, || {
        conn.execute(
            "DELETE FROM cluster_intraconnections WHERE chunk_x_from = ?1 AND chunk_z_from = ?2 AND plane_from = ?3",
            params![chunk_x, chunk_z, plane],
        )
    })?;
    Ok(())
}

fn upsert_edge(
    store: &SqliteTileStore,
    chunk_x: i32,
    chunk_z: i32,
    plane: i32,
    from: i64,
    to: i64,
    cost: i64,
    path_blob: Option<&[u8]>,
    retry: &RetryPolicy,
) -> Result<()> {
    let conn = store.connection();
    with_retry(retry, || {
        conn.execute(
            "INSERT INTO cluster_intraconnections \
             (chunk_x_from, chunk_z_from, plane_from, entrance_from, entrance_to, cost, path_blob) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(chunk_x_from, chunk_z_from, plane_from, entrance_from, entrance_to) DO UPDATE SET \
             cost = MIN(cluster_intraconnections.cost, excluded.cost), \
             path_blob = CASE WHEN excluded.path_blob IS NOT NULL THEN excluded.path_blob ELSE cluster_intraconnections.path_blob END",
            params![chunk_x, chunk_z, plane, from, to, cost, path_blob],
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustergraph_core::db::ensure_output_schema;
    use rusqlite::Connection;

    fn seed_3x3_chunk_with_two_entrances(conn: &Connection) {
        conn.execute_batch(
            r#"
            CREATE TABLE tiles (
                x INTEGER, y INTEGER, plane INTEGER, chunk_x INTEGER, chunk_z INTEGER,
                blocked INTEGER, walk_mask INTEGER, walk_data TEXT
            );
            CREATE TABLE chunks (chunk_x INTEGER, chunk_z INTEGER, chunk_size INTEGER, tile_count INTEGER);
            INSERT INTO chunks VALUES (0,0,4,16);
            "#,
        )
        .unwrap();
        for x in 0..4 {
            for y in 0..4 {
                conn.execute(
                    "INSERT INTO tiles (x,y,plane,chunk_x,chunk_z,blocked,walk_mask,walk_data) \
                     VALUES (?1,?2,0,0,0,0,255,NULL)",
                    params![x, y],
                )
                .unwrap();
            }
        }
        conn.execute(
            "INSERT INTO cluster_entrances (chunk_x,chunk_z,plane,x,y,neighbor_dir) VALUES (0,0,0,0,0,'W')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO cluster_entrances (chunk_x,chunk_z,plane,x,y,neighbor_dir) VALUES (0,0,0,3,3,'N')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn finds_bounded_intra_path_between_entrance_pair() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_output_schema(&conn).unwrap();
        seed_3x3_chunk_with_two_entrances(&conn);
        let store = SqliteTileStore::from_connection(conn);
        let policy = NeighborPolicy::new(true, true, 0);
        let scope = ScopeFilter::default();
        let retry = RetryPolicy::default();
        let summary = run(&store, &scope, &policy, false, false, true, &retry).unwrap();
        assert_eq!(summary.pairs_total, 1);
        assert_eq!(summary.pairs_solved, 1);
        assert_eq!(summary.created, 2);

        let conn = store.connection();
        let (cost, blob): (i64, Option<Vec<u8>>) = conn
            .query_row(
                "SELECT cost, path_blob FROM cluster_intraconnections WHERE entrance_from=1 AND entrance_to=2",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(cost, 3); // Chebyshev distance from (0,0) to (3,3)
        assert!(blob.is_some());
    }

    #[test]
    fn s4_isolated_region_yields_no_row() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_output_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE tiles (
                x INTEGER, y INTEGER, plane INTEGER, chunk_x INTEGER, chunk_z INTEGER,
                blocked INTEGER, walk_mask INTEGER, walk_data TEXT
            );
            CREATE TABLE chunks (chunk_x INTEGER, chunk_z INTEGER, chunk_size INTEGER, tile_count INTEGER);
            INSERT INTO chunks VALUES (0,0,3,9);
            "#,
        )
        .unwrap();
        // A 3x3 chunk split by a wall column at x=1, leaving (0,*) and (2,*) isolated.
        for x in 0..3 {
            for y in 0..3 {
                let (blocked, mask) = if x == 1 { (1, 0) } else { (0, 255) };
                conn.execute(
                    "INSERT INTO tiles (x,y,plane,chunk_x,chunk_z,blocked,walk_mask,walk_data) \
                     VALUES (?1,?2,0,0,0,?3,?4,NULL)",
                    params![x, y, blocked, mask],
                )
                .unwrap();
            }
        }
        conn.execute(
            "INSERT INTO cluster_entrances (chunk_x,chunk_z,plane,x,y,neighbor_dir) VALUES (0,0,0,0,0,'W')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO cluster_entrances (chunk_x,chunk_z,plane,x,y,neighbor_dir) VALUES (0,0,0,2,0,'E')",
            [],
        )
        .unwrap();
        let store = SqliteTileStore::from_connection(conn);
        let policy = NeighborPolicy::new(true, false, 0);
        let scope = ScopeFilter::default();
        let retry = RetryPolicy::default();
        let summary = run(&store, &scope, &policy, false, false, false, &retry).unwrap();
        assert_eq!(summary.pairs_total, 1);
        assert_eq!(summary.pairs_solved, 0);
        assert_eq!(summary.created, 0);
    }

    /// Blocked-corner scenario: a single obstacle at (1,1) in a 4x4 chunk
    /// with corner-cut disabled. The direct cardinal crossing through (1,1)
    /// is impossible, and every diagonal step adjacent to (1,1) shares it as
    /// one of its two corner-cut orthogonals, so both diagonal shortcuts
    /// around the obstacle are also forbidden — the shortest surviving path
    /// detours around the blocked tile entirely, at cost 4 (not the 2 a
    /// diagonal shortcut would give if corner-cutting were allowed).
    #[test]
    fn s2_blocked_corner_forbids_diagonal_shortcut() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_output_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE tiles (
                x INTEGER, y INTEGER, plane INTEGER, chunk_x INTEGER, chunk_z INTEGER,
                blocked INTEGER, walk_mask INTEGER, walk_data TEXT
            );
            CREATE TABLE chunks (chunk_x INTEGER, chunk_z INTEGER, chunk_size INTEGER, tile_count INTEGER);
            INSERT INTO chunks VALUES (0,0,4,16);
            "#,
        )
        .unwrap();
        for x in 0..4 {
            for y in 0..4 {
                let (blocked, mask) = if x == 1 && y == 1 { (1, 0) } else { (0, 255) };
                conn.execute(
                    "INSERT INTO tiles (x,y,plane,chunk_x,chunk_z,blocked,walk_mask,walk_data) \
                     VALUES (?1,?2,0,0,0,?3,?4,NULL)",
                    params![x, y, blocked, mask],
                )
                .unwrap();
            }
        }
        conn.execute(
            "INSERT INTO cluster_entrances (chunk_x,chunk_z,plane,x,y,neighbor_dir) VALUES (0,0,0,0,1,'W')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO cluster_entrances (chunk_x,chunk_z,plane,x,y,neighbor_dir) VALUES (0,0,0,2,1,'E')",
            [],
        )
        .unwrap();
        let store = SqliteTileStore::from_connection(conn);
        let policy = NeighborPolicy::new(true, false, 0);
        let scope = ScopeFilter::default();
        let retry = RetryPolicy::default();
        let summary = run(&store, &scope, &policy, false, false, false, &retry).unwrap();
        assert_eq!(summary.pairs_solved, 1);
        let cost: i64 = store
            .connection()
            .query_row(
                "SELECT cost FROM cluster_intraconnections WHERE entrance_from=1 AND entrance_to=2",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(cost, 4);
    }

    #[test]
    fn idempotent_rerun_same_row_count() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_output_schema(&conn).unwrap();
        seed_3x3_chunk_with_two_entrances(&conn);
        let store = SqliteTileStore::from_connection(conn);
        let policy = NeighborPolicy::new(true, true, 0);
        let scope = ScopeFilter::default();
        let retry = RetryPolicy::default();
        run(&store, &scope, &policy, false, false, false, &retry).unwrap();
        let first: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM cluster_intraconnections", [], |r| r.get(0))
            .unwrap();
        run(&store, &scope, &policy, false, false, false, &retry).unwrap();
        let second: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM cluster_intraconnections", [], |r| r.get(0))
            .unwrap();
        assert_eq!(first, second);
    }
}
