//! Fill handle: drag a source cell or rectangle along one axis.
//!
//! The axis is decided from the drag delta (`|dc| >= |dr|` means columns).
//! The target rectangle extends the source to the pointer along that axis and
//! keeps the source's span on the other one. Destination cells take the
//! source value at the wrapped offset, so a multi-cell source tiles instead
//! of repeating its last row.

use celltable_core::{Bounds, CellPos, Gesture};

use crate::model::CellUpdate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillAxis {
    Rows,
    Cols,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FillDrag {
    start: CellPos,
    current: CellPos,
    source: Bounds,
}

impl FillDrag {
    fn axis(&self) -> FillAxis {
        let dr = self.current.r.abs_diff(self.start.r);
        let dc = self.current.c.abs_diff(self.start.c);
        if dc >= dr {
            FillAxis::Cols
        } else {
            FillAxis::Rows
        }
    }

    fn target(&self) -> Bounds {
        let s = self.source;
        let p = self.current;
        match self.axis() {
            FillAxis::Cols => Bounds { r1: s.r1, r2: s.r2, c1: s.c1.min(p.c), c2: s.c2.max(p.c) },
            FillAxis::Rows => Bounds { r1: s.r1.min(p.r), r2: s.r2.max(p.r), c1: s.c1, c2: s.c2 },
        }
    }
}

/// A released fill: what to copy and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillPlan {
    pub start: CellPos,
    pub source: Bounds,
    pub target: Bounds,
}

impl FillPlan {
    /// One update per target cell outside the source, valued by tiling.
    pub fn updates(&self, read: impl Fn(usize, usize) -> String) -> Vec<CellUpdate> {
        self.target
            .cells()
            .filter(|p| !self.source.contains(p.r, p.c))
            .map(|p| {
                let src = self.source.wrap(p.r, p.c);
                CellUpdate::new(p.r, p.c, read(src.r, src.c))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FillHandle {
    drag: Gesture<FillDrag>,
}

impl FillHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a drag from `pos`. `source` defaults to the single start cell.
    pub fn start(&mut self, pos: CellPos, source: Option<Bounds>) {
        let source = source.unwrap_or_else(|| Bounds::single(pos));
        self.drag.begin(FillDrag { start: pos, current: pos, source });
    }

    pub fn drag_to(&mut self, pos: CellPos) {
        self.drag.update(|d| d.current = pos);
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_active()
    }

    pub fn axis(&self) -> Option<FillAxis> {
        self.drag.state().map(FillDrag::axis)
    }

    /// Live target rectangle, source included.
    pub fn target(&self) -> Option<Bounds> {
        self.drag.state().map(FillDrag::target)
    }

    pub fn is_preview(&self, r: usize, c: usize) -> bool {
        self.target().is_some_and(|b| b.contains(r, c))
    }

    /// Finish the drag. `None` if nothing lies outside the source.
    pub fn release(&mut self) -> Option<FillPlan> {
        let drag = self.drag.end()?;
        let target = drag.target();
        if drag.source.covers(&target) {
            return None;
        }
        Some(FillPlan { start: drag.start, source: drag.source, target })
    }

    pub fn cancel(&mut self) {
        self.drag.end();
    }
}
