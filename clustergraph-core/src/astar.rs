//! Bounded-region A* with Chebyshev cost/heuristic and deterministic
//! tie-breaking.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::tile::in_bounds;

pub type Coord = (i32, i32, i32);

pub fn chebyshev(a: Coord, b: Coord) -> i64 {
    (a.0 - b.0).unsigned_abs().max((a.1 - b.1).unsigned_abs()) as i64
}

#[derive(Copy, Clone, Eq, PartialEq)]
struct QueueNode {
    f: i64,
    seq: u64,
    node: Coord,
}

impl Ord for QueueNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap via reversed Ord: lower f first; among equal f, the node
        // inserted earlier (lower seq) pops first.
        other.f.cmp(&self.f).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Outcome of a bounded A* search: total cost and the full tile path,
/// start to goal inclusive.
pub struct PathResult {
    pub cost: i64,
    pub path: Vec<Coord>,
}

/// Run A* from `start` to `goal`, restricted to `bounds`. `expand` yields
/// raw neighbor candidates for a node (already walkability-filtered by the
/// caller's Neighbor Policy or JPS accelerator); this function filters them
/// to `bounds` and to the same plane as `start`/`goal`.
///
/// Returns `None` when the pair is unreachable — this is not an error.
pub fn find_path(
    start: Coord,
    goal: Coord,
    bounds: (i32, i32, i32, i32),
    mut expand: impl FnMut(Coord) -> Vec<Coord>,
) -> Option<PathResult> {
    if start.2 != goal.2 {
        return None;
    }
    if !in_bounds(start.0, start.1, bounds) || !in_bounds(goal.0, goal.1, bounds) {
        return None;
    }
    if start == goal {
        return Some(PathResult { cost: 0, path: vec![start] });
    }

    let mut seq_counter: u64 = 0;
    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<Coord, i64> = HashMap::new();
    let mut came_from: HashMap<Coord, Coord> = HashMap::new();
    let mut closed: std::collections::HashSet<Coord> = std::collections::HashSet::new();

    g_score.insert(start, 0);
    open.push(QueueNode { f: chebyshev(start, goal), seq: seq_counter, node: start });
    seq_counter += 1;

    while let Some(QueueNode { node: current, .. }) = open.pop() {
        if closed.contains(&current) {
            continue;
        }
        if current == goal {
            return Some(reconstruct(&came_from, current, g_score[&current]));
        }
        closed.insert(current);

        let plane = current.2;
        for next in expand(current) {
            if next.2 != plane || !in_bounds(next.0, next.1, bounds) || closed.contains(&next) {
                continue;
            }
            let step = chebyshev(current, next);
            if step <= 0 {
                continue;
            }
            let tentative = g_score[&current] + step;
            let better = match g_score.get(&next) {
                Some(&existing) => tentative < existing,
                None => true,
            };
            if better {
                came_from.insert(next, current);
                g_score.insert(next, tentative);
                let f = tentative + chebyshev(next, goal);
                open.push(QueueNode { f, seq: seq_counter, node: next });
                seq_counter += 1;
            }
        }
    }

    None
}

fn reconstruct(came_from: &HashMap<Coord, Coord>, goal: Coord, cost: i64) -> PathResult {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    PathResult { cost, path }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_expand(bounds: (i32, i32, i32, i32)) -> impl FnMut(Coord) -> Vec<Coord> {
        move |(x, y, p)| {
            let mut out = Vec::new();
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let c = (x + dx, y + dy, p);
                    if in_bounds(c.0, c.1, bounds) {
                        out.push(c);
                    }
                }
            }
            out
        }
    }

    #[test]
    fn finds_straight_path_with_chebyshev_cost() {
        let bounds = (0, 0, 9, 9);
        let result = find_path((0, 0, 0), (3, 0, 0), bounds, open_expand(bounds)).unwrap();
        assert_eq!(result.cost, 3);
        assert_eq!(result.path.first(), Some(&(0, 0, 0)));
        assert_eq!(result.path.last(), Some(&(3, 0, 0)));
    }

    #[test]
    fn diagonal_chebyshev_is_cheaper_than_manhattan() {
        let bounds = (0, 0, 9, 9);
        let result = find_path((0, 0, 0), (3, 3, 0), bounds, open_expand(bounds)).unwrap();
        assert_eq!(result.cost, 3);
    }

    #[test]
    fn unreachable_pair_returns_none() {
        let bounds = (0, 0, 9, 9);
        // goal outside bounds passed to expand (never reachable since expand clips)
        let result = find_path((0, 0, 0), (0, 0, 1), bounds, open_expand(bounds));
        assert!(result.is_none());
    }

    #[test]
    fn same_tile_is_zero_cost() {
        let bounds = (0, 0, 9, 9);
        let result = find_path((2, 2, 0), (2, 2, 0), bounds, open_expand(bounds)).unwrap();
        assert_eq!(result.cost, 0);
        assert_eq!(result.path, vec![(2, 2, 0)]);
    }

    #[test]
    fn respects_bounds() {
        let bounds = (0, 0, 2, 2);
        let result = find_path((0, 0, 0), (2, 2, 0), bounds, open_expand(bounds)).unwrap();
        for (x, y, _) in &result.path {
            assert!(in_bounds(*x, *y, bounds));
        }
    }
}
