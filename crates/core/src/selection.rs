use serde::{Deserialize, Serialize};

use crate::coord::{Bounds, CellPos};

/// Anchor/focus pair in visible coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub start: CellPos,
    pub end: CellPos,
}

impl SelectionRange {
    pub fn bounds(&self) -> Bounds {
        Bounds::from_corners(self.start, self.end)
    }
}

/// The range selection model: at most one anchor/focus range plus the
/// "pointer is down" flag.
///
/// Independent of the table model; callers re-check it against the current
/// row and column counts with [`RangeSelection::retain_within`].
#[derive(Debug, Clone, Default)]
pub struct RangeSelection {
    range: Option<SelectionRange>,
    selecting: bool,
}

impl RangeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor a new selection at `pos` and begin dragging.
    pub fn start(&mut self, pos: CellPos) {
        self.range = Some(SelectionRange { start: pos, end: pos });
        self.selecting = true;
    }

    /// Move the focus end. Ignored when nothing is selected.
    pub fn update(&mut self, pos: CellPos) {
        if let Some(range) = self.range.as_mut() {
            range.end = pos;
        }
    }

    /// End the drag. Called on any pointer release, inside the grid or not.
    pub fn stop(&mut self) {
        self.selecting = false;
    }

    pub fn clear(&mut self) {
        self.range = None;
        self.selecting = false;
    }

    /// Keyboard extension: anchor at `anchor` if nothing is selected yet,
    /// then move the focus to `pos`.
    pub fn extend_to(&mut self, anchor: CellPos, pos: CellPos) {
        let range = self.range.get_or_insert(SelectionRange { start: anchor, end: anchor });
        range.end = pos;
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    pub fn range(&self) -> Option<SelectionRange> {
        self.range
    }

    /// Normalized rectangle, or `None` without a selection.
    pub fn bounds(&self) -> Option<Bounds> {
        self.range.map(|r| r.bounds())
    }

    pub fn contains(&self, r: usize, c: usize) -> bool {
        self.bounds().is_some_and(|b| b.contains(r, c))
    }

    /// Drop the selection if it no longer fits the grid.
    pub fn retain_within(&mut self, rows: usize, cols: usize) {
        if self.bounds().is_some_and(|b| !b.fits(rows, cols)) {
            self.clear();
        }
    }
}
