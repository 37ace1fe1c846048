//! The directional border-crossing test shared by Entrance Discovery and
//! the Inter-Connector (§4.D step 4 / §4.E step 2).

use crate::movement::Border;
use crate::tile::WalkFlags;

/// `a` is the flags of the tile on the near side, `b` the flags of the
/// tile one step across the border in direction `dir`.
///
/// The original source paired `a.bottom ∧ b.top` with the direction it
/// called "N" (`dy=-1` there). Convention B relabels `dy=+1` as N without
/// re-deriving the formula, which would leave a physically backwards
/// pairing — contradicted by the N-border door example, where a tile's
/// `top` flag must gate a `dy=+1` crossing. The physical pairing (the
/// near tile's far-side edge against the adjacent tile's near-side edge)
/// is preserved here; only the N/S labels moved.
pub fn can_cross(a: WalkFlags, b: WalkFlags, dir: Border) -> bool {
    match dir {
        Border::N => a.top && b.bottom,
        Border::S => a.bottom && b.top,
        Border::E => a.right && b.left,
        Border::W => a.left && b.right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn north_crossing_requires_near_top_and_far_bottom() {
        let open = WalkFlags::default();
        let mut closed_top = WalkFlags::default();
        closed_top.top = false;
        assert!(can_cross(open, open, Border::N));
        // a.top gates the dy=+1 crossing, not b.top.
        assert!(!can_cross(closed_top, open, Border::N));
        let mut closed_bottom = WalkFlags::default();
        closed_bottom.bottom = false;
        assert!(!can_cross(open, closed_bottom, Border::N));
    }

    #[test]
    fn south_crossing_requires_near_bottom_and_far_top() {
        let open = WalkFlags::default();
        let mut closed_bottom = WalkFlags::default();
        closed_bottom.bottom = false;
        assert!(!can_cross(closed_bottom, open, Border::S));
        let mut closed_top = WalkFlags::default();
        closed_top.top = false;
        assert!(!can_cross(open, closed_top, Border::S));
    }

    #[test]
    fn east_and_west_use_left_right() {
        let open = WalkFlags::default();
        let mut closed_left = WalkFlags::default();
        closed_left.left = false;
        assert!(!can_cross(open, closed_left, Border::E));
        // W: a.left && b.right — a=closed_left fails on a.left
        assert!(!can_cross(closed_left, open, Border::W));
    }
}
