//! Table model: the single writer of row data.
//!
//! Owns the raw rows, the visible-row projection, the error map and the
//! undo/redo history. Everything the host or the other engines see is in
//! visible coordinates; everything stored here is in raw coordinates.
//!
//! Key invariants:
//! - `update_cells` is the only path that changes row values
//! - one call = one history step, pushed only if some value changed
//! - every commit runs row auto-provisioning, then notifies the host once
//! - undo/redo restore exact snapshots

use std::rc::Rc;

use celltable_config::GridSettings;
use celltable_core::CellPos;

use crate::autorows::RowProvisioner;
use crate::column::{ColumnDef, SelectOption};
use crate::events::{ChangeCallback, ChangeMeta, MutationKind};
use crate::history::History;
use crate::options::OptionResolver;
use crate::validation::{self, ErrorMap};
use crate::value::{CellValue, Row};
use crate::view::RowProjection;

/// Row visibility test supplied by the filter engine.
pub type RowFilter = Rc<dyn Fn(&Row) -> bool>;

/// One cell write in visible coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub r: usize,
    pub c: usize,
    pub value: CellValue,
}

impl CellUpdate {
    pub fn new(r: usize, c: usize, value: impl Into<CellValue>) -> Self {
        Self { r, c, value: value.into() }
    }
}

/// A column as laid out on screen. `raw` is `None` for the placeholder of a
/// collapsed group.
#[derive(Debug, Clone)]
pub struct VisibleColumn {
    pub def: ColumnDef,
    pub raw: Option<usize>,
}

/// An error as the status bar shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleError {
    pub pos: CellPos,
    pub label: String,
    pub message: String,
}

pub struct TableModel {
    schema: Vec<ColumnDef>,
    columns: Vec<VisibleColumn>,
    rows: Vec<Rc<Row>>,
    projection: RowProjection,
    row_filter: Option<RowFilter>,
    errors: ErrorMap,
    history: History<Vec<Rc<Row>>>,
    provisioner: RowProvisioner,
    options: OptionResolver,
    grow_rows: bool,
    active: CellPos,
    last_cell: CellPos,
    on_change: Option<ChangeCallback>,
}

impl TableModel {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>, settings: &GridSettings) -> Self {
        let provisioner = RowProvisioner::new(columns.clone(), settings.row_id_key.clone());
        let mut model = Self {
            columns: identity_columns(&columns),
            schema: columns,
            rows: Vec::new(),
            projection: RowProjection::default(),
            row_filter: None,
            errors: ErrorMap::new(),
            history: History::new(settings.history_limit),
            provisioner,
            options: OptionResolver::new(&settings.row_id_key),
            grow_rows: true,
            active: CellPos::default(),
            last_cell: CellPos::default(),
            on_change: None,
        };
        model.replace_rows(rows.into_iter().map(Rc::new).collect());
        model
    }

    // -------------------------------------------------------------------------
    // Wiring
    // -------------------------------------------------------------------------

    /// Register the host's change callback.
    pub fn on_change(&mut self, callback: impl FnMut(&[Rc<Row>], ChangeMeta) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// Share an option cache with the select menu.
    pub fn set_option_resolver(&mut self, options: OptionResolver) {
        self.options = options;
    }

    pub fn option_resolver(&self) -> &OptionResolver {
        &self.options
    }

    /// Allow or forbid creating rows when an update lands past the end.
    pub fn set_row_growth(&mut self, enabled: bool) {
        self.grow_rows = enabled;
    }

    /// Replace the whole row array. Starts a new history lifecycle.
    pub fn replace_rows(&mut self, rows: Vec<Rc<Row>>) {
        self.rows = self.provisioner.ensure_trailing_blank(&rows);
        self.history.clear();
        self.errors.clear();
        self.reproject();
        log::debug!("rows replaced ({} rows), history reset", self.rows.len());
    }

    /// New column schema: resets the layout to every column visible.
    pub fn set_schema(&mut self, columns: Vec<ColumnDef>) {
        self.provisioner.set_columns(columns.clone());
        self.columns = identity_columns(&columns);
        self.schema = columns;
        self.errors.clear();
        self.clamp_active();
    }

    /// Apply a column layout (after group collapse/expand).
    pub fn set_columns(&mut self, columns: Vec<VisibleColumn>) {
        self.columns = columns;
        self.clamp_active();
    }

    pub fn set_row_filter(&mut self, filter: Option<RowFilter>) {
        self.row_filter = filter;
        self.reproject();
    }

    /// Pin the row being edited so auto-provisioning never treats it as the
    /// trailing blank. Re-provisions without touching history.
    pub fn set_pinned_row(&mut self, row_id: Option<String>) {
        if self.provisioner.pinned() == row_id.as_deref() {
            return;
        }
        self.provisioner.set_pinned(row_id);
        self.rows = self.provisioner.ensure_trailing_blank(&self.rows);
        self.errors.truncate_rows(self.rows.len());
        self.reproject();
    }

    pub fn provisioner(&self) -> &RowProvisioner {
        &self.provisioner
    }

    fn reproject(&mut self) {
        let rows = &self.rows;
        self.projection = match &self.row_filter {
            Some(filter) => RowProjection::build(rows.len(), |i| filter(&rows[i])),
            None => RowProjection::identity(rows.len()),
        };
        self.clamp_active();
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn row_count(&self) -> usize {
        self.projection.visible_count()
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    pub fn schema(&self) -> &[ColumnDef] {
        &self.schema
    }

    pub fn columns(&self) -> &[VisibleColumn] {
        &self.columns
    }

    pub fn column(&self, c: usize) -> Option<&VisibleColumn> {
        self.columns.get(c)
    }

    /// Every row, filtered or not.
    pub fn raw_rows(&self) -> &[Rc<Row>] {
        &self.rows
    }

    /// Rows in visible order.
    pub fn visible_rows(&self) -> Vec<Rc<Row>> {
        self.projection
            .visible_rows()
            .iter()
            .map(|&i| Rc::clone(&self.rows[i]))
            .collect()
    }

    pub fn row(&self, r: usize) -> Option<&Rc<Row>> {
        self.projection.to_raw(r).map(|i| &self.rows[i])
    }

    pub fn raw_index(&self, r: usize) -> Option<usize> {
        self.projection.to_raw(r)
    }

    pub fn row_id(&self, r: usize) -> Option<String> {
        self.row(r)
            .map(|row| row.text(self.provisioner.id_key()))
            .filter(|id| !id.is_empty())
    }

    /// String-coerced value at a visible position; `""` for missing rows and
    /// collapsed-group placeholders.
    pub fn get_value(&self, r: usize, c: usize) -> String {
        match (self.row(r), self.columns.get(c)) {
            (Some(row), Some(col)) if col.raw.is_some() => row.text(&col.def.key),
            _ => String::new(),
        }
    }

    fn raw_cell(&self, r: usize, c: usize) -> Option<(usize, usize)> {
        let raw_row = self.projection.to_raw(r)?;
        let raw_col = self.columns.get(c)?.raw?;
        Some((raw_row, raw_col))
    }

    pub fn has_error(&self, r: usize, c: usize) -> bool {
        self.raw_cell(r, c).is_some_and(|(rr, rc)| self.errors.has(rr, rc))
    }

    pub fn get_error(&self, r: usize, c: usize) -> Option<&str> {
        let (rr, rc) = self.raw_cell(r, c)?;
        self.errors.get(rr, rc)
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    /// Errors on cells that are currently visible, for a status bar.
    pub fn visible_errors(&self) -> Vec<VisibleError> {
        self.errors
            .list()
            .into_iter()
            .filter_map(|e| {
                let r = self.projection.to_visible(e.row)?;
                let c = self.columns.iter().position(|col| col.raw == Some(e.col))?;
                Some(VisibleError {
                    pos: CellPos::new(r, c),
                    label: self.columns[c].def.label.clone(),
                    message: e.message,
                })
            })
            .collect()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // -------------------------------------------------------------------------
    // Active cell
    // -------------------------------------------------------------------------

    pub fn active(&self) -> CellPos {
        self.active
    }

    pub fn set_active(&mut self, pos: CellPos) {
        self.active = pos;
        self.clamp_active();
    }

    pub fn move_to(&mut self, r: usize, c: usize) {
        self.set_active(CellPos::new(r, c));
    }

    /// Move by a delta, clamped to the grid. No-op on an empty grid.
    pub fn move_active(&mut self, dr: isize, dc: isize) {
        if let Some(next) = self.active.offset_clamped(dr, dc, self.row_count(), self.col_count()) {
            self.active = next;
        }
    }

    /// Pull the active cell back inside the grid after it shrank.
    pub fn clamp_active(&mut self) {
        if self.row_count() > 0 && self.col_count() > 0 {
            self.active = self.active.clamped(self.row_count(), self.col_count());
        }
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    fn resolved_options(&self, row: &Row, col: &ColumnDef) -> Option<Vec<SelectOption>> {
        if col.behavior().uses_options {
            self.options.resolved(row, col)
        } else {
            None
        }
    }

    /// Apply a batch as one history step, reporting the first update's cell.
    pub fn update_cells(&mut self, updates: &[CellUpdate], kind: MutationKind) -> bool {
        let Some(first) = updates.first() else {
            return false;
        };
        let meta = ChangeMeta { kind, cell: CellPos::new(first.r, first.c) };
        self.update_cells_with(updates, meta)
    }

    /// Apply a batch as one history step.
    ///
    /// Updates past the last visible row grow the grid when row growth is on.
    /// Updates on missing columns, placeholders or read-only columns are
    /// dropped. Returns whether anything was committed.
    pub fn update_cells_with(&mut self, updates: &[CellUpdate], meta: ChangeMeta) -> bool {
        if updates.is_empty() {
            return false;
        }

        let prev = self.rows.clone();
        let mut next = self.rows.clone();
        let mut projection = self.projection.clone();
        let mut error_writes = Vec::with_capacity(updates.len());
        let mut changed = false;

        for u in updates {
            let Some(col) = self.columns.get(u.c) else {
                log::trace!("dropping update for missing column {}", u.c);
                continue;
            };
            let Some(raw_col) = col.raw else {
                continue;
            };
            if !col.def.editable {
                log::trace!("dropping update for read-only column {}", col.def.key);
                continue;
            }

            let raw_row = match projection.to_raw(u.r) {
                Some(i) => i,
                None if self.grow_rows => {
                    while projection.visible_count() <= u.r {
                        next.push(Rc::new(self.provisioner.create_row()));
                        projection.push_grown(next.len() - 1);
                    }
                    next.len() - 1
                }
                None => {
                    log::trace!("dropping update past the last row ({})", u.r);
                    continue;
                }
            };

            let mut row = Row::clone(&next[raw_row]);
            let before = row.get(&col.def.key).cloned();
            let options = self.resolved_options(&row, &col.def);
            let error = validation::apply_edit(&col.def, u.value.clone(), &mut row, options.as_deref());
            error_writes.push((raw_row, raw_col, error));

            if row.get(&col.def.key) != before.as_ref() {
                next[raw_row] = Rc::new(row);
                changed = true;
            }
            self.last_cell = CellPos::new(u.r, u.c);
        }

        for (r, c, error) in error_writes {
            self.errors.set(r, c, error);
        }

        if changed {
            self.history.record(prev);
            self.rows = self.provisioner.ensure_trailing_blank(&next);
            self.reproject();
            log::debug!("{:?}: committed {} update(s)", meta.kind, updates.len());
            self.notify(meta);
        }
        self.errors.truncate_rows(self.rows.len());
        changed
    }

    /// Step back one batch. No-op with an empty history.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(self.rows.clone()) else {
            return false;
        };
        self.restore(previous, MutationKind::Undo);
        true
    }

    /// Re-apply the last undone batch. No-op with nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(self.rows.clone()) else {
            return false;
        };
        self.restore(next, MutationKind::Redo);
        true
    }

    /// Swap in a snapshot. Snapshots taken while a row was pinned can carry an
    /// extra blank row, so the trailing blank is re-established.
    fn restore(&mut self, rows: Vec<Rc<Row>>, kind: MutationKind) {
        let rows = self.provisioner.ensure_trailing_blank(&rows);
        let current = std::mem::replace(&mut self.rows, rows);
        self.revalidate_changed(&current);
        self.reproject();
        log::debug!("{kind:?} to {} rows", self.rows.len());
        self.notify(ChangeMeta { kind, cell: self.last_cell });
    }

    /// Re-run validation on every cell whose value differs from `before`.
    fn revalidate_changed(&mut self, before: &[Rc<Row>]) {
        self.errors.truncate_rows(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let old = before.get(i);
            if old.is_some_and(|o| Rc::ptr_eq(o, row)) {
                continue;
            }
            for (c, col) in self.schema.iter().enumerate() {
                let value = row.get(&col.key).cloned().unwrap_or_default();
                let unchanged = old.is_some_and(|o| o.get(&col.key).cloned().unwrap_or_default() == value);
                if unchanged && !self.errors.has(i, c) {
                    continue;
                }
                let options = self.resolved_options(row, col);
                let error = validation::validate_cell(col, &value, row, options.as_deref());
                self.errors.set(i, c, error);
            }
        }
    }

    fn notify(&mut self, meta: ChangeMeta) {
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.rows, meta);
        }
    }
}

fn identity_columns(columns: &[ColumnDef]) -> Vec<VisibleColumn> {
    columns
        .iter()
        .enumerate()
        .map(|(i, def)| VisibleColumn { def: def.clone(), raw: Some(i) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnKind;
    use crate::events::ChangeLog;
    use std::cell::RefCell;

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("name", "Name"),
            ColumnDef::new("qty", "Qty").kind(ColumnKind::Number),
            ColumnDef::new("sku", "SKU").read_only(),
        ]
    }

    fn model() -> TableModel {
        TableModel::new(
            columns(),
            vec![
                Row::from_pairs([("id", "1"), ("name", "Rice"), ("qty", "2"), ("sku", "R-1")]),
                Row::from_pairs([("id", "2"), ("name", "Eggs"), ("qty", "12"), ("sku", "E-1")]),
            ],
            &GridSettings::default(),
        )
    }

    fn snapshot(m: &TableModel) -> Vec<Row> {
        m.raw_rows().iter().map(|r| Row::clone(r)).collect()
    }

    #[test]
    fn test_initial_rows_get_trailing_blank() {
        let m = model();
        assert_eq!(m.row_count(), 3);
        assert_eq!(m.get_value(0, 0), "Rice");
        assert_eq!(m.get_value(2, 0), "");
        assert_eq!(m.get_value(9, 0), "");
        assert!(!m.can_undo());
    }

    #[test]
    fn test_update_records_history_and_notifies() {
        let mut m = model();
        let log = Rc::new(RefCell::new(ChangeLog::new()));
        let sink = log.clone();
        m.on_change(move |rows, meta| sink.borrow_mut().push(rows, meta));

        assert!(m.update_cells(&[CellUpdate::new(0, 0, "Beans")], MutationKind::Edit));
        assert_eq!(m.get_value(0, 0), "Beans");
        assert!(m.can_undo());
        assert_eq!(log.borrow().kinds(), vec![MutationKind::Edit]);
        assert_eq!(log.borrow().last().unwrap().1.cell, CellPos::new(0, 0));
    }

    #[test]
    fn test_unchanged_value_does_not_commit() {
        let mut m = model();
        assert!(!m.update_cells(&[CellUpdate::new(0, 0, "Rice")], MutationKind::Edit));
        assert!(!m.can_undo());
    }

    #[test]
    fn test_read_only_and_missing_columns_are_dropped() {
        let mut m = model();
        let updates = [
            CellUpdate::new(0, 2, "X-9"),
            CellUpdate::new(0, 7, "nope"),
        ];
        assert!(!m.update_cells(&updates, MutationKind::Paste));
        assert_eq!(m.get_value(0, 2), "R-1");
    }

    #[test]
    fn test_undo_redo_exact_snapshots() {
        let mut m = model();
        let before = snapshot(&m);
        m.update_cells(
            &[CellUpdate::new(0, 0, "Beans"), CellUpdate::new(1, 1, "7")],
            MutationKind::Paste,
        );
        let after = snapshot(&m);

        assert!(m.undo());
        assert_eq!(snapshot(&m), before);
        assert!(m.redo());
        assert_eq!(snapshot(&m), after);
        assert!(!m.redo());
    }

    #[test]
    fn test_undo_after_pinned_edit_keeps_one_blank() {
        let mut m = TableModel::new(
            columns(),
            vec![Row::from_pairs([("id", "1"), ("name", "Rice")])],
            &GridSettings::default(),
        );
        let log = Rc::new(RefCell::new(ChangeLog::new()));
        let sink = log.clone();
        m.on_change(move |rows, meta| sink.borrow_mut().push(rows, meta));

        m.set_pinned_row(m.row_id(1));
        assert_eq!(m.row_count(), 3);
        assert!(m.update_cells(&[CellUpdate::new(1, 0, "Tea")], MutationKind::Edit));
        m.set_pinned_row(None);
        assert_eq!(m.row_count(), 3);

        assert!(m.undo());
        assert_eq!(m.row_count(), 2);
        assert_eq!(m.get_value(0, 0), "Rice");
        assert_eq!(m.get_value(1, 0), "");
        assert_eq!(log.borrow().last().unwrap().0.len(), 2);

        assert!(m.redo());
        assert_eq!(m.row_count(), 3);
        assert_eq!(m.get_value(1, 0), "Tea");
        assert_eq!(m.get_value(2, 0), "");
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut m = model();
        m.update_cells(&[CellUpdate::new(0, 0, "A")], MutationKind::Edit);
        m.undo();
        m.update_cells(&[CellUpdate::new(0, 0, "B")], MutationKind::Edit);
        assert!(!m.can_redo());
    }

    #[test]
    fn test_number_error_set_and_cleared() {
        let mut m = model();
        m.update_cells(&[CellUpdate::new(0, 1, "abc")], MutationKind::Edit);
        assert!(m.has_error(0, 1));
        assert_eq!(m.get_error(0, 1), Some("Must be a number"));
        m.update_cells(&[CellUpdate::new(0, 1, "5")], MutationKind::Edit);
        assert!(!m.has_error(0, 1));
    }

    #[test]
    fn test_undo_revalidates_restored_cells() {
        let mut m = model();
        m.update_cells(&[CellUpdate::new(0, 1, "abc")], MutationKind::Edit);
        assert!(m.has_error(0, 1));
        m.undo();
        assert!(!m.has_error(0, 1));
        m.redo();
        assert!(m.has_error(0, 1));
    }

    #[test]
    fn test_growth_past_the_end() {
        let mut m = model();
        // row 2 is the blank; row 4 does not exist yet
        m.update_cells(&[CellUpdate::new(4, 0, "Tea")], MutationKind::Paste);
        assert_eq!(m.get_value(4, 0), "Tea");
        assert_eq!(m.row_count(), 6);
        assert_eq!(m.get_value(5, 0), "");
    }

    #[test]
    fn test_no_growth_without_row_factory() {
        let mut m = model();
        m.set_row_growth(false);
        assert!(!m.update_cells(&[CellUpdate::new(4, 0, "Tea")], MutationKind::Paste));
        assert_eq!(m.row_count(), 3);
    }

    #[test]
    fn test_filter_maps_visible_to_raw() {
        let mut m = model();
        m.set_row_filter(Some(Rc::new(|row: &Row| row.text("name") != "Rice")));
        assert_eq!(m.row_count(), 2);
        assert_eq!(m.get_value(0, 0), "Eggs");

        m.update_cells(&[CellUpdate::new(0, 1, "x")], MutationKind::Edit);
        assert_eq!(m.raw_rows()[1].text("qty"), "x");
        assert!(m.errors().has(1, 1));
        assert!(m.has_error(0, 1));
    }

    #[test]
    fn test_move_active_clamps() {
        let mut m = model();
        m.move_active(10, 10);
        assert_eq!(m.active(), CellPos::new(2, 2));
        m.move_active(-1, -5);
        assert_eq!(m.active(), CellPos::new(1, 0));
    }

    #[test]
    fn test_placeholder_column_reads_blank() {
        let mut m = model();
        m.set_columns(vec![
            VisibleColumn { def: columns()[0].clone(), raw: Some(0) },
            VisibleColumn { def: ColumnDef::placeholder("g"), raw: None },
        ]);
        assert_eq!(m.get_value(0, 1), "");
        assert!(!m.update_cells(&[CellUpdate::new(0, 1, "x")], MutationKind::Edit));
    }

    #[test]
    fn test_replace_rows_resets_history() {
        let mut m = model();
        m.update_cells(&[CellUpdate::new(0, 1, "abc")], MutationKind::Edit);
        m.replace_rows(vec![Rc::new(Row::from_pairs([("id", "9"), ("name", "Milk")]))]);
        assert!(!m.can_undo());
        assert!(m.errors().is_empty());
        assert_eq!(m.row_count(), 2);
    }

    #[test]
    fn test_visible_errors_for_status_bar() {
        let mut m = model();
        m.update_cells(&[CellUpdate::new(1, 1, "abc")], MutationKind::Edit);
        let errors = m.visible_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].pos, CellPos::new(1, 1));
        assert_eq!(errors[0].label, "Qty");
    }
}
