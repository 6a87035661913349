//! Axis-aligned bounds and the brute-force pairwise overlap pass.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Axis-aligned rectangle in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square bounds centred on a point.
    pub fn centered(center: Vec2, half_extent: f32) -> Self {
        Self::new(
            center.x - half_extent,
            center.y - half_extent,
            half_extent * 2.0,
            half_extent * 2.0,
        )
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Strict overlap on both axes. Rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Point hit-test, inclusive of every edge.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

/// Test every unordered pair of `candidates` (indices into `items`) once.
///
/// `bounds_of` is queried per pair rather than snapshotted, so a handler that
/// moves an item is seen by later pairs in the same pass. `on_hit` is called
/// once per overlapping pair with the lower-index item first. Candidates must
/// be sorted ascending and free of duplicates.
///
/// Returns the number of overlapping pairs.
pub fn pairwise_pass<T, B, H>(
    items: &mut [T],
    candidates: &[usize],
    mut bounds_of: B,
    mut on_hit: H,
) -> Result<usize>
where
    B: FnMut(&T) -> Option<Bounds>,
    H: FnMut(&mut T, &mut T) -> Result<()>,
{
    let mut hits = 0;
    for (n, &i) in candidates.iter().enumerate() {
        for &j in &candidates[n + 1..] {
            debug_assert!(i < j, "collision candidates must be sorted");
            let (head, tail) = items.split_at_mut(j);
            let a = &mut head[i];
            let b = &mut tail[0];

            let (Some(ba), Some(bb)) = (bounds_of(a), bounds_of(b)) else {
                continue;
            };
            if ba.intersects(&bb) {
                hits += 1;
                on_hit(a, b)?;
            }
        }
    }
    Ok(hits)
}
