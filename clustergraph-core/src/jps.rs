//! JPS Accelerator: replaces step-by-step neighbor expansion with
//! precomputed jump targets when the optional `jps_jump`/`jps_spans` tables
//! are present, falling back to the Neighbor Policy otherwise.
//!
//! The "are the tables present" check is a one-time capability probe cached
//! on the accelerator instance — not process-wide state, per design note.

use std::cell::OnceCell;

use crate::policy::NeighborPolicy;

/// Read-side contract the accelerator needs from the Tile Store.
pub trait JumpTableSource {
    /// Whether `jps_jump`/`jps_spans` tables exist at all in this store.
    fn jps_tables_present(&self) -> rusqlite::Result<bool>;

    /// Non-null `(next_x, next_y)` jump targets recorded for this tile,
    /// across all directions.
    fn jump_targets(&self, x: i32, y: i32, plane: i32) -> rusqlite::Result<Vec<(i32, i32)>>;
}

pub struct JpsAccelerator<'a, S: JumpTableSource> {
    source: &'a S,
    present: OnceCell<bool>,
}

impl<'a, S: JumpTableSource> JpsAccelerator<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source, present: OnceCell::new() }
    }

    fn tables_present(&self) -> rusqlite::Result<bool> {
        if let Some(&v) = self.present.get() {
            return Ok(v);
        }
        let v = self.source.jps_tables_present()?;
        let _ = self.present.set(v);
        Ok(v)
    }

    /// Expand `(x, y, plane)`: precomputed jump targets when available and
    /// non-empty (deduplicated in insertion order, filtered by
    /// `is_walkable`), otherwise the Neighbor Policy's candidates.
    pub fn expand(
        &self,
        x: i32,
        y: i32,
        plane: i32,
        policy: &NeighborPolicy,
        is_walkable: &mut dyn FnMut(i32, i32, i32) -> bool,
    ) -> rusqlite::Result<Vec<(i32, i32, i32)>> {
        if self.tables_present()? {
            let raw = self.source.jump_targets(x, y, plane)?;
            let mut seen = std::collections::HashSet::new();
            let mut out = Vec::new();
            for (nx, ny) in raw {
                if seen.insert((nx, ny)) && is_walkable(nx, ny, plane) {
                    out.push((nx, ny, plane));
                }
            }
            if !out.is_empty() {
                return Ok(out);
            }
        }
        Ok(policy.neighbors(x, y, plane, is_walkable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTables {
        present: bool,
        jumps: std::collections::HashMap<(i32, i32), Vec<(i32, i32)>>,
    }

    impl JumpTableSource for FakeTables {
        fn jps_tables_present(&self) -> rusqlite::Result<bool> {
            Ok(self.present)
        }
        fn jump_targets(&self, x: i32, y: i32, _plane: i32) -> rusqlite::Result<Vec<(i32, i32)>> {
            Ok(self.jumps.get(&(x, y)).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn falls_back_to_policy_when_tables_absent() {
        let source = FakeTables { present: false, jumps: Default::default() };
        let accel = JpsAccelerator::new(&source);
        let policy = NeighborPolicy::new(false, false, 0);
        let mut cb = |_x: i32, _y: i32, _p: i32| true;
        let out = accel.expand(0, 0, 0, &policy, &mut cb).unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn uses_jump_targets_when_present_and_nonempty() {
        let mut jumps = std::collections::HashMap::new();
        jumps.insert((0, 0), vec![(5, 0), (5, 0), (0, 5)]);
        let source = FakeTables { present: true, jumps };
        let accel = JpsAccelerator::new(&source);
        let policy = NeighborPolicy::new(false, false, 0);
        let mut cb = |_x: i32, _y: i32, _p: i32| true;
        let out = accel.expand(0, 0, 0, &policy, &mut cb).unwrap();
        assert_eq!(out, vec![(5, 0, 0), (0, 5, 0)]);
    }

    #[test]
    fn falls_back_when_present_but_empty_for_tile() {
        let source = FakeTables { present: true, jumps: Default::default() };
        let accel = JpsAccelerator::new(&source);
        let policy = NeighborPolicy::new(false, false, 0);
        let mut cb = |_x: i32, _y: i32, _p: i32| true;
        let out = accel.expand(0, 0, 0, &policy, &mut cb).unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn capability_probe_called_once() {
        use std::cell::Cell;
        struct CountingSource {
            calls: Cell<u32>,
        }
        impl JumpTableSource for CountingSource {
            fn jps_tables_present(&self) -> rusqlite::Result<bool> {
                self.calls.set(self.calls.get() + 1);
                Ok(false)
            }
            fn jump_targets(&self, _x: i32, _y: i32, _plane: i32) -> rusqlite::Result<Vec<(i32, i32)>> {
                Ok(vec![])
            }
        }
        let source = CountingSource { calls: Cell::new(0) };
        let accel = JpsAccelerator::new(&source);
        let policy = NeighborPolicy::new(false, false, 0);
        let mut cb = |_x: i32, _y: i32, _p: i32| true;
        for _ in 0..5 {
            accel.expand(0, 0, 0, &policy, &mut cb).unwrap();
        }
        assert_eq!(source.calls.get(), 1);
    }
}
