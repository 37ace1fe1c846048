//! Tile, chunk, and walk-mask primitives.
//!
//! Bit layout (matches the on-disk `walk_mask` column): bit 0 = left,
//! 1 = bottom, 2 = right, 3 = top, 4 = topleft, 5 = bottomleft,
//! 6 = bottomright, 7 = topright.

pub const LEFT: u32 = 1 << 0;
pub const BOTTOM: u32 = 1 << 1;
pub const RIGHT: u32 = 1 << 2;
pub const TOP: u32 = 1 << 3;
pub const TOPLEFT: u32 = 1 << 4;
pub const BOTTOMLEFT: u32 = 1 << 5;
pub const BOTTOMRIGHT: u32 = 1 << 6;
pub const TOPRIGHT: u32 = 1 << 7;

/// A world tile coordinate. Convention B: north is `y+1`, south is `y-1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
    pub plane: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }

    pub fn chunk_x(&self, chunk_size: i32) -> i32 {
        self.x.div_euclid(chunk_size)
    }

    pub fn chunk_z(&self, chunk_size: i32) -> i32 {
        self.y.div_euclid(chunk_size)
    }
}

/// Per-tile directional permeability flags, decoded from the `walk_data`
/// JSON column. Missing keys default to `true`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WalkFlags {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Default for WalkFlags {
    fn default() -> Self {
        Self { top: true, bottom: true, left: true, right: true }
    }
}

impl WalkFlags {
    /// Parse `walk_data` from its textual JSON-object form. A corrupt or
    /// absent payload is treated as an empty map (all defaults apply) — this
    /// is explicitly not an error.
    pub fn from_json_str(raw: Option<&str>) -> Self {
        let Some(raw) = raw else { return Self::default() };
        let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(raw)
        else {
            return Self::default();
        };
        let mut flags = Self::default();
        if let Some(v) = map.get("top").and_then(|v| v.as_bool()) {
            flags.top = v;
        }
        if let Some(v) = map.get("bottom").and_then(|v| v.as_bool()) {
            flags.bottom = v;
        }
        if let Some(v) = map.get("left").and_then(|v| v.as_bool()) {
            flags.left = v;
        }
        if let Some(v) = map.get("right").and_then(|v| v.as_bool()) {
            flags.right = v;
        }
        flags
    }
}

/// A tile row as read from the input store.
#[derive(Copy, Clone, Debug)]
pub struct Tile {
    pub coord: TileCoord,
    pub blocked: bool,
    pub walk_mask: u32,
}

impl Tile {
    /// A tile is walkable iff `blocked = false` and `walk_mask != 0`.
    pub fn is_walkable(&self) -> bool {
        !self.blocked && self.walk_mask != 0
    }
}

/// Inclusive tile-coordinate bounds of a chunk: `(x0, y0, x1, y1)`.
pub fn chunk_bounds(chunk_x: i32, chunk_z: i32, chunk_size: i32) -> (i32, i32, i32, i32) {
    let x0 = chunk_x * chunk_size;
    let y0 = chunk_z * chunk_size;
    (x0, y0, x0 + chunk_size - 1, y0 + chunk_size - 1)
}

pub fn in_bounds(x: i32, y: i32, bounds: (i32, i32, i32, i32)) -> bool {
    let (x0, y0, x1, y1) = bounds;
    (x0..=x1).contains(&x) && (y0..=y1).contains(&y)
}
