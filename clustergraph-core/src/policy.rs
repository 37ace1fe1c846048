//! Neighbor Policy: a pure function from a tile to its candidate neighbors.

use rusqlite::Connection;

use crate::error::{ClusterGraphError, Result};
use crate::movement::NEIGHBOR_ORDER;

/// Immutable movement configuration, loaded once from the `movement_policy`
/// singleton row. Unlike the Python original (a frozen dataclass carrying a
/// live DB handle), this value carries no connection — callers that need a
/// scoped walkability oracle pass one in at the call site instead of
/// rebinding the policy itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NeighborPolicy {
    pub allow_diagonals: bool,
    pub allow_corner_cut: bool,
    pub unit_radius_tiles: i32,
}

impl NeighborPolicy {
    pub fn new(allow_diagonals: bool, allow_corner_cut: bool, unit_radius_tiles: i32) -> Self {
        Self { allow_diagonals, allow_corner_cut, unit_radius_tiles }
    }

    /// Loads the singleton policy row (`policy_id = 1`) from `movement_policy`.
    /// A missing row is a fatal input error, matching `NeighborPolicy.from_db`
    /// in the original tooling, which raises rather than assuming a default.
    pub fn load(conn: &Connection) -> Result<Self> {
        conn.query_row(
            "SELECT allow_diagonals, allow_corner_cut, unit_radius_tiles FROM movement_policy WHERE policy_id = 1",
            [],
            |r| {
                let allow_diagonals: i64 = r.get(0)?;
                let allow_corner_cut: i64 = r.get(1)?;
                let unit_radius_tiles: i64 = r.get(2)?;
                Ok(Self::new(allow_diagonals != 0, allow_corner_cut != 0, unit_radius_tiles as i32))
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                ClusterGraphError::InputInvalid("movement_policy row with policy_id=1 not found".into())
            }
            other => ClusterGraphError::Sqlite(other),
        })
    }

    /// Candidate neighbors of `(x, y, plane)` in deterministic order
    /// (cardinals N,E,S,W then diagonals NE,SE,SW,NW), filtered by the
    /// supplied `is_walkable` oracle.
    pub fn neighbors(
        &self,
        x: i32,
        y: i32,
        plane: i32,
        is_walkable: &mut dyn FnMut(i32, i32, i32) -> bool,
    ) -> Vec<(i32, i32, i32)> {
        let mut out = Vec::with_capacity(8);
        for step in NEIGHBOR_ORDER {
            let (nx, ny) = (x + step.dx, y + step.dy);
            if step.diagonal {
                if !self.allow_diagonals {
                    continue;
                }
                if !self.allow_corner_cut
                    && !(is_walkable(x + step.dx, y, plane) && is_walkable(x, y + step.dy, plane))
                {
                    continue;
                }
            }
            if !is_walkable(nx, ny, plane) {
                continue;
            }
            if self.unit_radius_tiles > 0 && !self.chebyshev_square_walkable(nx, ny, plane, is_walkable) {
                continue;
            }
            out.push((nx, ny, plane));
        }
        out
    }

    fn chebyshev_square_walkable(
        &self,
        cx: i32,
        cy: i32,
        plane: i32,
        is_walkable: &mut dyn FnMut(i32, i32, i32) -> bool,
    ) -> bool {
        let r = self.unit_radius_tiles;
        for dy in -r..=r {
            for dx in -r..=r {
                if !is_walkable(cx + dx, cy + dy, plane) {
                    return false;
                }
            }
        }
        true
    }
}
