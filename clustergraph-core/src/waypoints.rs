//! Waypoint compression: collapse a tile path to endpoints plus every point
//! where the step direction changes.

use crate::astar::Coord;

fn sign(v: i32) -> i32 {
    match v {
        0 => 0,
        v if v > 0 => 1,
        _ => -1,
    }
}

fn step_dir(a: Coord, b: Coord) -> (i32, i32, i32) {
    (sign(b.0 - a.0), sign(b.1 - a.1), sign(b.2 - a.2))
}

/// Compress `path` by keeping the first and last tile and every interior
/// tile at which the direction of travel changes. Collinear runs are
/// dropped.
pub fn compress(path: &[Coord]) -> Vec<Coord> {
    if path.len() <= 2 {
        return path.to_vec();
    }
    let mut out = Vec::with_capacity(path.len());
    out.push(path[0]);
    let mut prev_dir = step_dir(path[0], path[1]);
    for i in 1..path.len() - 1 {
        let dir = step_dir(path[i], path[i + 1]);
        if dir != prev_dir {
            out.push(path[i]);
            prev_dir = dir;
        }
    }
    out.push(*path.last().unwrap());
    out
}

/// Encode waypoints as the UTF-8 JSON `[[x,y], ...]` path-blob format
/// (plane is implicit — a path never crosses planes).
pub fn encode_path_blob(waypoints: &[Coord]) -> Vec<u8> {
    let packed: Vec<[i32; 2]> = waypoints.iter().map(|&(x, y, _)| [x, y]).collect();
    serde_json::to_vec(&packed).expect("array of [i32;2] always serializes")
}
