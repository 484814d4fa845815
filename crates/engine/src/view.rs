//! Row projection: visible space <-> raw space.
//!
//! Key invariants:
//! - Interaction state (active cell, selection) uses visible rows
//! - Raw rows, error map and history use raw rows
//! - Conversion happens at the boundary only
//! - The visible -> raw map is strictly increasing (filtering never reorders)

/// Maps visible row index -> raw row index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowProjection {
    visible_rows: Vec<usize>,
    /// Raw row count the projection was built against.
    raw_count: usize,
}

impl RowProjection {
    /// Identity projection over `raw_count` rows
    pub fn identity(raw_count: usize) -> Self {
        Self {
            visible_rows: (0..raw_count).collect(),
            raw_count,
        }
    }

    /// Build from a visibility test evaluated per raw row
    pub fn build(raw_count: usize, mut visible: impl FnMut(usize) -> bool) -> Self {
        Self {
            visible_rows: (0..raw_count).filter(|&i| visible(i)).collect(),
            raw_count,
        }
    }

    /// Number of visible rows
    pub fn visible_count(&self) -> usize {
        self.visible_rows.len()
    }

    pub fn raw_count(&self) -> usize {
        self.raw_count
    }

    /// Map visible row to raw row
    pub fn to_raw(&self, visible_row: usize) -> Option<usize> {
        self.visible_rows.get(visible_row).copied()
    }

    /// Map raw row to visible row. `None` if hidden or out of range.
    pub fn to_visible(&self, raw_row: usize) -> Option<usize> {
        self.visible_rows.binary_search(&raw_row).ok()
    }

    /// Is any row hidden?
    pub fn is_filtered(&self) -> bool {
        self.visible_count() < self.raw_count
    }

    pub fn visible_rows(&self) -> &[usize] {
        &self.visible_rows
    }

    /// Append a freshly created raw row as the next visible row
    pub fn push_grown(&mut self, raw_row: usize) {
        debug_assert!(self.visible_rows.last().map_or(true, |&last| last < raw_row));
        self.visible_rows.push(raw_row);
        self.raw_count = self.raw_count.max(raw_row + 1);
    }
}
