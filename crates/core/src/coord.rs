//! Coordinate and range algebra.
//!
//! Everything here is pure: positions, normalized rectangles and the
//! wrap-around arithmetic used by fill and paste tiling. No grid state.

use serde::{Deserialize, Serialize};

/// A cell position. Visible coordinates unless a caller says otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub r: usize,
    pub c: usize,
}

impl CellPos {
    pub const fn new(r: usize, c: usize) -> Self {
        Self { r, c }
    }

    /// Move by a signed delta, clamped into `[0, rows-1] x [0, cols-1]`.
    ///
    /// Returns `None` when the grid is empty in either dimension.
    pub fn offset_clamped(self, dr: isize, dc: isize, rows: usize, cols: usize) -> Option<Self> {
        if rows == 0 || cols == 0 {
            return None;
        }
        Some(Self {
            r: clamp_offset(self.r, dr, rows - 1),
            c: clamp_offset(self.c, dc, cols - 1),
        })
    }

    /// Clamp this position into a grid of the given size.
    pub fn clamped(self, rows: usize, cols: usize) -> Self {
        Self {
            r: self.r.min(rows.saturating_sub(1)),
            c: self.c.min(cols.saturating_sub(1)),
        }
    }
}

fn clamp_offset(base: usize, delta: isize, max: usize) -> usize {
    let moved = base as isize + delta;
    moved.clamp(0, max as isize) as usize
}

/// A normalized, inclusive rectangle: `r1 <= r2` and `c1 <= c2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub r1: usize,
    pub r2: usize,
    pub c1: usize,
    pub c2: usize,
}

impl Bounds {
    /// Build from two corners in any order.
    pub fn from_corners(a: CellPos, b: CellPos) -> Self {
        Self {
            r1: a.r.min(b.r),
            r2: a.r.max(b.r),
            c1: a.c.min(b.c),
            c2: a.c.max(b.c),
        }
    }

    pub fn single(pos: CellPos) -> Self {
        Self::from_corners(pos, pos)
    }

    pub fn top_left(&self) -> CellPos {
        CellPos::new(self.r1, self.c1)
    }

    pub fn height(&self) -> usize {
        self.r2 - self.r1 + 1
    }

    pub fn width(&self) -> usize {
        self.c2 - self.c1 + 1
    }

    pub fn cell_count(&self) -> usize {
        self.height() * self.width()
    }

    pub fn is_single(&self) -> bool {
        self.r1 == self.r2 && self.c1 == self.c2
    }

    pub fn contains(&self, r: usize, c: usize) -> bool {
        r >= self.r1 && r <= self.r2 && c >= self.c1 && c <= self.c2
    }

    /// True when `other` lies entirely inside this rectangle.
    pub fn covers(&self, other: &Bounds) -> bool {
        self.contains(other.r1, other.c1) && self.contains(other.r2, other.c2)
    }

    /// True when the rectangle fits inside a grid of `rows` x `cols`.
    pub fn fits(&self, rows: usize, cols: usize) -> bool {
        self.r2 < rows && self.c2 < cols
    }

    /// Iterate cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellPos> {
        let Bounds { r1, r2, c1, c2 } = *self;
        (r1..=r2).flat_map(move |r| (c1..=c2).map(move |c| CellPos::new(r, c)))
    }

    /// Map a cell of a larger destination back onto this source rectangle,
    /// wrapping the offset modulo the source's height and width.
    ///
    /// Works for destinations above or left of the source as well.
    pub fn wrap(&self, r: usize, c: usize) -> CellPos {
        let dr = (r as isize - self.r1 as isize).rem_euclid(self.height() as isize) as usize;
        let dc = (c as isize - self.c1 as isize).rem_euclid(self.width() as isize) as usize;
        CellPos::new(self.r1 + dr, self.c1 + dc)
    }
}
