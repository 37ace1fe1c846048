//! Tile Store: the read-mostly contract over the persistent tile grid.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};

use crate::error::Result;
use crate::jps::JumpTableSource;
use crate::tile::WalkFlags;

/// Reads an integer-valued column that some upstream tooling stores with
/// REAL affinity. Integral floats coerce; a fractional value is rejected
/// rather than silently truncated (§9 design note).
fn read_int_column(value: ValueRef<'_>, column: &str) -> rusqlite::Result<Option<i64>> {
    match value {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(i) => Ok(Some(i)),
        ValueRef::Real(f) => {
            if f.fract() == 0.0 {
                Ok(Some(f as i64))
            } else {
                Err(rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Real,
                    format!("column `{column}` holds a non-integral value {f}").into(),
                ))
            }
        }
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            0,
            other.data_type(),
            format!("column `{column}` is not integer-coercible").into(),
        )),
    }
}

/// A tile row as read from the input store (§4.A contract).
#[derive(Copy, Clone, Debug)]
pub struct TileRecord {
    pub blocked: bool,
    pub walk_mask: u32,
    pub walk_flags: WalkFlags,
}

impl TileRecord {
    pub fn is_walkable(&self) -> bool {
        !self.blocked && self.walk_mask != 0
    }
}

/// Optional scope filter shared by all three build phases: a plane
/// allowlist (`None` = all planes) and an inclusive, open-ended chunk range.
#[derive(Clone, Debug, Default)]
pub struct ScopeFilter {
    pub planes: Option<Vec<i32>>,
    pub chunk_x_min: Option<i32>,
    pub chunk_x_max: Option<i32>,
    pub chunk_z_min: Option<i32>,
    pub chunk_z_max: Option<i32>,
}

impl ScopeFilter {
    fn chunk_conditions(&self, alias: &str) -> (Vec<String>, Vec<i32>) {
        let mut conds = Vec::new();
        let mut params = Vec::new();
        if let Some(v) = self.chunk_x_min {
            conds.push(format!("{alias}chunk_x >= ?"));
            params.push(v);
        }
        if let Some(v) = self.chunk_x_max {
            conds.push(format!("{alias}chunk_x <= ?"));
            params.push(v);
        }
        if let Some(v) = self.chunk_z_min {
            conds.push(format!("{alias}chunk_z >= ?"));
            params.push(v);
        }
        if let Some(v) = self.chunk_z_max {
            conds.push(format!("{alias}chunk_z <= ?"));
            params.push(v);
        }
        (conds, params)
    }
}

pub struct SqliteTileStore {
    conn: Connection,
}

impl SqliteTileStore {
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open read-write. Foreign keys are left off, matching the documented
    /// schema (entrance/interconnection/intraconnection rows are recomputed
    /// independently per phase; enforcing FKs would serialize a recompute's
    /// delete-then-reinsert across phases that don't need it).
    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = OFF", [])?;
        Ok(Self { conn })
    }

    /// Open strictly read-only, for `--dry-run`. Falls back gracefully if
    /// the platform doesn't support the stricter open flags.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        let path_ref = path.as_ref();
        let conn = match Connection::open_with_flags(
            path_ref,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        ) {
            Ok(c) => c,
            Err(_) => Connection::open_with_flags(path_ref, OpenFlags::SQLITE_OPEN_READ_ONLY)?,
        };
        let _ = conn.execute("PRAGMA query_only = ON", []);
        let _ = conn.execute("PRAGMA foreign_keys = OFF", []);
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn get_tile(&self, x: i32, y: i32, plane: i32) -> Result<Option<TileRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT blocked, walk_mask, walk_data FROM tiles WHERE x = ?1 AND y = ?2 AND plane = ?3",
                params![x, y, plane],
                |r| {
                    let blocked = read_int_column(r.get_ref(0)?, "blocked")?;
                    let walk_mask = read_int_column(r.get_ref(1)?, "walk_mask")?;
                    let walk_data: Option<String> = r.get(2)?;
                    Ok((blocked, walk_mask, walk_data))
                },
            )
            .map(Some)
            .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(e) })?;
        Ok(row.map(|(blocked, walk_mask, walk_data)| TileRecord {
            blocked: blocked.unwrap_or(1) != 0,
            walk_mask: walk_mask.unwrap_or(0) as u32,
            walk_flags: WalkFlags::from_json_str(walk_data.as_deref()),
        }))
    }

    pub fn is_walkable(&self, x: i32, y: i32, plane: i32) -> Result<bool> {
        Ok(self.get_tile(x, y, plane)?.map(|t| t.is_walkable()).unwrap_or(false))
    }

    /// Chunks in scope, ordered `(chunk_x ASC, chunk_z ASC)`.
    pub fn list_chunks(&self, scope: &ScopeFilter) -> rusqlite::Result<Vec<(i32, i32, i32)>> {
        let (conds, params) = scope.chunk_conditions("");
        let where_clause = if conds.is_empty() { "1=1".to_string() } else { conds.join(" AND ") };
        let sql = format!(
            "SELECT chunk_x, chunk_z, chunk_size FROM chunks WHERE {where_clause} ORDER BY chunk_x ASC, chunk_z ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |r| {
            Ok((r.get::<_, i32>(0)?, r.get::<_, i32>(1)?, r.get::<_, i32>(2)?))
        })?;
        rows.collect()
    }

    pub fn list_planes_in_chunk(&self, chunk_x: i32, chunk_z: i32) -> rusqlite::Result<Vec<i32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT plane FROM tiles WHERE chunk_x = ?1 AND chunk_z = ?2 ORDER BY plane")?;
        let rows = stmt.query_map(params![chunk_x, chunk_z], |r| r.get::<_, i32>(0))?;
        rows.collect()
    }

    /// Border tiles of `(chunk_x, chunk_z, plane)` that are themselves
    /// walkable.
    pub fn list_border_walkable(
        &self,
        chunk_x: i32,
        chunk_z: i32,
        plane: i32,
        bounds: (i32, i32, i32, i32),
    ) -> rusqlite::Result<Vec<(i32, i32)>> {
        let (x0, y0, x1, y1) = bounds;
        let mut stmt = self.conn.prepare(
            "SELECT x, y FROM tiles WHERE chunk_x = ?1 AND chunk_z = ?2 AND plane = ?3 \
             AND (x IN (?4, ?5) OR y IN (?6, ?7)) \
             AND COALESCE(blocked, 1) = 0 AND COALESCE(walk_mask, 0) != 0 \
             ORDER BY y, x",
        )?;
        let rows =
            stmt.query_map(params![chunk_x, chunk_z, plane, x0, x1, y0, y1], |r| Ok((r.get(0)?, r.get(1)?)))?;
        rows.collect()
    }

    /// Full chunk-local walkability set, used to prime the Intra-Connector's
    /// in-memory oracle before running A*.
    pub fn list_chunk_walkable(
        &self,
        chunk_x: i32,
        chunk_z: i32,
        plane: i32,
    ) -> rusqlite::Result<HashSet<(i32, i32)>> {
        let mut stmt = self.conn.prepare(
            "SELECT x, y, blocked, walk_mask FROM tiles WHERE chunk_x = ?1 AND chunk_z = ?2 AND plane = ?3",
        )?;
        let rows = stmt.query_map(params![chunk_x, chunk_z, plane], |r| {
            let x: i32 = r.get(0)?;
            let y: i32 = r.get(1)?;
            let blocked: Option<i64> = r.get(2)?;
            let walk_mask: Option<i64> = r.get(3)?;
            let walkable = blocked.unwrap_or(1) == 0 && walk_mask.unwrap_or(0) != 0;
            Ok((x, y, walkable))
        })?;
        let mut out = HashSet::new();
        for row in rows {
            let (x, y, walkable) = row?;
            if walkable {
                out.insert((x, y));
            }
        }
        Ok(out)
    }
}

impl JumpTableSource for SqliteTileStore {
    fn jps_tables_present(&self) -> rusqlite::Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('jps_jump','jps_spans')",
            [],
            |r| r.get(0),
        )?;
        Ok(count >= 1)
    }

    fn jump_targets(&self, x: i32, y: i32, plane: i32) -> rusqlite::Result<Vec<(i32, i32)>> {
        let mut stmt = self.conn.prepare(
            "SELECT next_x, next_y FROM jps_jump WHERE x = ?1 AND y = ?2 AND plane = ?3 \
             AND next_x IS NOT NULL AND next_y IS NOT NULL",
        )?;
        let rows = stmt.query_map(params![x, y, plane], |r| Ok((r.get(0)?, r.get(1)?)))?;
        rows.collect()
    }
}
