//! Grid controller
//!
//! Composes the table model with selection, fill, clipboard, filters, column
//! layout, the option resolver and the cell editor. Hosts forward discrete
//! input calls here and poll the getters every render.
//!
//! Key invariants:
//! - all positions are visible coordinates
//! - read-only mode blocks every mutating entry point
//! - option loads started by an edit are queued; the host drains them with
//!   [`Grid::take_option_loads`] and spawns them on its local executor

use std::rc::Rc;

use celltable_config::GridSettings;
use celltable_core::{Bounds, CellPos, RangeSelection};

use crate::clipboard;
use crate::column::{ColumnDef, ColumnKind, SelectOption};
use crate::events::{ChangeMeta, MutationKind};
use crate::fill::FillHandle;
use crate::filter::ColumnFilters;
use crate::keymap::{self, EditorAction, GridCommand, KeyContext, KeyInput};
use crate::layout::{AutoFit, ColumnLayout, ColumnResize, GroupHeader};
use crate::model::{CellUpdate, TableModel, VisibleColumn, VisibleError};
use crate::options::{self, OptionLoad, OptionResolver};
use crate::value::{CellValue, Row};

/// The open cell editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub pos: CellPos,
    pub draft: String,
    /// Select the whole draft on open (false when seeded by a keystroke).
    pub select_all: bool,
}

pub struct Grid {
    model: TableModel,
    layout: ColumnLayout,
    filters: ColumnFilters,
    selection: RangeSelection,
    fill: FillHandle,
    resize: ColumnResize,
    auto_fit: AutoFit,
    options: OptionResolver,
    editor: Option<EditorState>,
    copied: Option<Bounds>,
    pending_loads: Vec<OptionLoad>,
    read_only: bool,
}

impl Grid {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>, settings: &GridSettings) -> Self {
        let layout = ColumnLayout::new(columns.clone(), settings);
        let mut model = TableModel::new(columns, rows, settings);
        model.set_columns(layout.visible_columns());
        let options = model.option_resolver().clone();
        Self {
            model,
            layout,
            filters: ColumnFilters::new(),
            selection: RangeSelection::new(),
            fill: FillHandle::new(),
            resize: ColumnResize::new(settings.min_column_width),
            auto_fit: AutoFit::from_settings(settings),
            options,
            editor: None,
            copied: None,
            pending_loads: Vec::new(),
            read_only: settings.read_only,
        }
    }

    // ========================================================================
    // Host wiring
    // ========================================================================

    pub fn on_change(&mut self, callback: impl FnMut(&[Rc<Row>], ChangeMeta) + 'static) {
        self.model.on_change(callback);
    }

    /// Replace the row array (new lifecycle: history and errors reset).
    pub fn replace_rows(&mut self, rows: Vec<Row>) {
        self.editor = None;
        self.model.set_pinned_row(None);
        self.model.replace_rows(rows.into_iter().map(Rc::new).collect());
        self.refresh_filter();
    }

    /// Replace the column schema. Widths survive when the count is unchanged.
    pub fn set_columns(&mut self, columns: Vec<ColumnDef>) {
        self.editor = None;
        self.layout.set_columns(columns.clone());
        self.model.set_schema(columns);
        self.sync_columns();
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
        if read_only {
            self.cancel_edit();
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn option_resolver(&self) -> &OptionResolver {
        &self.options
    }

    /// Option fetches started since the last call.
    pub fn take_option_loads(&mut self) -> Vec<OptionLoad> {
        std::mem::take(&mut self.pending_loads)
    }

    fn sync_columns(&mut self) {
        self.model.set_columns(self.layout.visible_columns());
        self.selection.retain_within(self.model.row_count(), self.model.col_count());
    }

    fn refresh_filter(&mut self) {
        self.model.set_row_filter(self.filters.predicate());
        self.selection.retain_within(self.model.row_count(), self.model.col_count());
    }

    /// Row counts can shrink after any write; drop a selection that no
    /// longer fits and pull the active cell back inside.
    fn after_mutation(&mut self, changed: bool) -> bool {
        self.selection.retain_within(self.model.row_count(), self.model.col_count());
        self.model.clamp_active();
        changed
    }

    // ========================================================================
    // Render feed
    // ========================================================================

    pub fn model(&self) -> &TableModel {
        &self.model
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn row_count(&self) -> usize {
        self.model.row_count()
    }

    pub fn col_count(&self) -> usize {
        self.model.col_count()
    }

    pub fn columns(&self) -> &[VisibleColumn] {
        self.model.columns()
    }

    pub fn get_value(&self, r: usize, c: usize) -> String {
        self.model.get_value(r, c)
    }

    pub fn has_error(&self, r: usize, c: usize) -> bool {
        self.model.has_error(r, c)
    }

    pub fn get_error(&self, r: usize, c: usize) -> Option<&str> {
        self.model.get_error(r, c)
    }

    /// Errors for a status bar, in visible coordinates.
    pub fn error_list(&self) -> Vec<VisibleError> {
        self.model.visible_errors()
    }

    pub fn active(&self) -> CellPos {
        self.model.active()
    }

    pub fn selection_bounds(&self) -> Option<Bounds> {
        self.selection.bounds()
    }

    pub fn is_selected(&self, r: usize, c: usize) -> bool {
        self.selection.contains(r, c)
    }

    pub fn is_preview(&self, r: usize, c: usize) -> bool {
        self.fill.is_preview(r, c)
    }

    /// Area marked by the last copy; cleared by the next click or key.
    pub fn copied_bounds(&self) -> Option<Bounds> {
        self.copied
    }

    pub fn col_width(&self, c: usize) -> f32 {
        self.layout.col_width(c)
    }

    pub fn group_headers(&self) -> Vec<GroupHeader> {
        self.layout.group_headers()
    }

    pub fn editor(&self) -> Option<&EditorState> {
        self.editor.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.model.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.model.can_redo()
    }

    // ========================================================================
    // Pointer input
    // ========================================================================

    /// Pointer down on a cell: activate it and anchor a new selection.
    pub fn click_cell(&mut self, r: usize, c: usize) {
        if self.editor.is_some() {
            self.commit_edit();
        }
        self.model.move_to(r, c);
        self.selection.start(self.model.active());
        self.copied = None;
        if self.filters.open_key().is_some() {
            self.close_filter();
        }
    }

    /// Pointer entered a cell while a button may be down.
    pub fn drag_enter(&mut self, r: usize, c: usize) {
        if self.selection.is_selecting() {
            self.selection.update(CellPos::new(r, c));
        }
        if self.fill.is_dragging() {
            self.fill.drag_to(CellPos::new(r, c));
        }
    }

    /// Pointer released anywhere: ends whatever gesture is running.
    pub fn pointer_released(&mut self) {
        self.selection.stop();
        if self.fill.is_dragging() {
            self.fill_release();
        }
        if self.resize.is_resizing() {
            self.resize.end();
        }
    }

    pub fn double_click(&mut self, r: usize, c: usize) {
        self.model.move_to(r, c);
        self.start_edit(None);
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Open the editor on the active cell. Pins the row so auto-provisioning
    /// leaves it alone, and starts loading select options if needed.
    pub fn start_edit(&mut self, initial: Option<String>) -> bool {
        if self.read_only || self.model.col_count() == 0 {
            return false;
        }
        let pos = self.model.active();
        self.model.set_pinned_row(self.model.row_id(pos.r));
        self.ensure_options_at(pos);

        let select_all = initial.is_none();
        let draft = initial.unwrap_or_else(|| self.model.get_value(pos.r, pos.c));
        self.editor = Some(EditorState { pos, draft, select_all });
        true
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        if let Some(editor) = self.editor.as_mut() {
            editor.draft = text.into();
        }
    }

    /// Write the draft through the validation pipeline and close the editor.
    pub fn commit_edit(&mut self) -> bool {
        let Some(editor) = self.editor.take() else {
            return false;
        };
        let update = CellUpdate::new(editor.pos.r, editor.pos.c, editor.draft);
        let meta = ChangeMeta { kind: MutationKind::Edit, cell: editor.pos };
        let changed = self.model.update_cells_with(&[update], meta);
        self.model.set_pinned_row(None);
        self.after_mutation(changed)
    }

    /// Pick a value from the select menu and commit it.
    pub fn commit_with(&mut self, value: impl Into<String>) -> bool {
        self.set_draft(value);
        self.commit_edit()
    }

    pub fn cancel_edit(&mut self) {
        if self.editor.take().is_some() {
            self.model.set_pinned_row(None);
            self.after_mutation(false);
        }
    }

    /// Key press while the editor is open. Returns whether it was consumed.
    pub fn editor_key(&mut self, input: KeyInput) -> bool {
        match keymap::editor_dispatch(input) {
            Some(EditorAction::Commit { dr, dc }) => {
                self.commit_edit();
                self.model.move_active(dr, dc);
                true
            }
            Some(EditorAction::Cancel) => {
                self.cancel_edit();
                true
            }
            None => false,
        }
    }

    /// Open the editor on a select cell from its dropdown affordance.
    pub fn open_select(&mut self, r: usize, c: usize) -> bool {
        if self.read_only {
            return false;
        }
        self.click_cell(r, c);
        self.selection.stop();
        self.start_edit(None)
    }

    pub fn toggle_checkbox(&mut self, r: usize, c: usize) -> bool {
        if self.read_only {
            return false;
        }
        let Some(col) = self.model.column(c) else {
            return false;
        };
        if col.def.kind != ColumnKind::Checkbox || col.raw.is_none() {
            return false;
        }
        let Some(row) = self.model.row(r) else {
            return false;
        };
        let checked = match row.get(&col.def.key) {
            Some(CellValue::Bool(b)) => *b,
            Some(CellValue::Text(s)) => s == "true",
            _ => false,
        };
        let update = CellUpdate::new(r, c, !checked);
        let changed = self.model.update_cells(&[update], MutationKind::Edit);
        self.after_mutation(changed)
    }

    /// Blank every cell of the selection (or the active cell).
    pub fn clear_range(&mut self) -> bool {
        if self.read_only {
            return false;
        }
        let active = self.model.active();
        let bounds = self.selection.bounds().unwrap_or_else(|| Bounds::single(active));
        let updates: Vec<CellUpdate> = bounds
            .cells()
            .filter_map(|p| {
                let col = self.model.column(p.c)?;
                Some(CellUpdate { r: p.r, c: p.c, value: (col.def.behavior().blank)() })
            })
            .collect();
        let changed = self.model.update_cells_with(&updates, ChangeMeta { kind: MutationKind::Edit, cell: active });
        self.after_mutation(changed)
    }

    pub fn undo(&mut self) -> bool {
        if self.read_only {
            return false;
        }
        let changed = self.model.undo();
        self.after_mutation(changed)
    }

    pub fn redo(&mut self) -> bool {
        if self.read_only {
            return false;
        }
        let changed = self.model.redo();
        self.after_mutation(changed)
    }

    // ========================================================================
    // Keyboard
    // ========================================================================

    /// Key press on the grid. Routed to the editor while one is open.
    pub fn handle_key(&mut self, input: KeyInput) -> bool {
        if self.editor.is_some() {
            return self.editor_key(input);
        }
        let ctx = KeyContext {
            active: self.model.active(),
            rows: self.model.row_count(),
            cols: self.model.col_count(),
        };
        let Some(command) = keymap::dispatch(input, ctx) else {
            self.copied = None;
            return false;
        };
        if command != GridCommand::MarkCopy {
            self.copied = None;
        }

        match command {
            GridCommand::Move { dr, dc } => {
                self.selection.clear();
                self.model.move_active(dr, dc);
            }
            GridCommand::MoveTo(pos) => {
                self.selection.clear();
                self.model.set_active(pos);
            }
            GridCommand::Extend { dr, dc } => {
                let anchor = self.model.active();
                if let Some(next) = anchor.offset_clamped(dr, dc, ctx.rows, ctx.cols) {
                    self.selection.extend_to(anchor, next);
                    self.model.set_active(next);
                }
            }
            GridCommand::StartEdit(initial) => {
                self.start_edit(initial);
            }
            GridCommand::Clear => {
                self.clear_range();
            }
            GridCommand::Undo => {
                self.undo();
            }
            GridCommand::Redo => {
                self.redo();
            }
            GridCommand::MarkCopy => self.mark_copied(),
        }
        true
    }

    // ========================================================================
    // Clipboard
    // ========================================================================

    fn mark_copied(&mut self) {
        let active = self.model.active();
        self.copied = Some(self.selection.bounds().unwrap_or_else(|| Bounds::single(active)));
    }

    /// Tab-separated text of the selection (or active cell). Marks it copied.
    pub fn copy(&mut self) -> Option<String> {
        if self.editor.is_some() {
            return None;
        }
        let block = clipboard::copy_block(&self.model, self.selection.bounds());
        self.mark_copied();
        Some(clipboard::to_tsv(&block))
    }

    /// Paste clipboard payloads as one history step.
    pub fn paste(&mut self, text: &str, html: Option<&str>) -> bool {
        if self.read_only || self.editor.is_some() {
            return false;
        }
        let Some(block) = clipboard::choose_block(text, html) else {
            return false;
        };
        let active = self.model.active();
        let updates = clipboard::plan_paste(&block, active, self.selection.bounds(), self.model.col_count());
        let changed = self.model.update_cells_with(&updates, ChangeMeta { kind: MutationKind::Paste, cell: active });
        self.after_mutation(changed)
    }

    // ========================================================================
    // Fill handle
    // ========================================================================

    /// Start dragging the fill handle at `(r, c)`. A selection containing the
    /// cell becomes the fill source.
    pub fn start_fill(&mut self, r: usize, c: usize) {
        if self.read_only {
            return;
        }
        let source = self.selection.bounds().filter(|b| b.contains(r, c));
        self.fill.start(CellPos::new(r, c), source);
    }

    pub fn fill_drag(&mut self, r: usize, c: usize) {
        self.fill.drag_to(CellPos::new(r, c));
    }

    /// Apply the fill as one history step and select the filled area.
    pub fn fill_release(&mut self) -> bool {
        let Some(plan) = self.fill.release() else {
            return false;
        };
        let updates = plan.updates(|r, c| self.model.get_value(r, c));
        let changed = self
            .model
            .update_cells_with(&updates, ChangeMeta { kind: MutationKind::Fill, cell: plan.start });
        self.after_mutation(changed);
        self.selection.start(plan.target.top_left());
        self.selection.update(CellPos::new(plan.target.r2, plan.target.c2));
        self.selection.stop();
        changed
    }

    pub fn cancel_fill(&mut self) {
        self.fill.cancel();
    }

    pub fn is_filling(&self) -> bool {
        self.fill.is_dragging()
    }

    // ========================================================================
    // Filters
    // ========================================================================

    pub fn filters(&self) -> &ColumnFilters {
        &self.filters
    }

    /// Values listed in a column's filter menu.
    pub fn filter_options(&self, key: &str) -> Vec<String> {
        self.filters.options_for(key, self.model.raw_rows())
    }

    pub fn is_filter_checked(&self, key: &str, value: &str) -> bool {
        self.filters.is_checked(key, value)
    }

    pub fn is_filter_all_checked(&self, key: &str) -> bool {
        self.filters.is_all_checked(key)
    }

    pub fn toggle_filter_value(&mut self, key: &str, value: &str) {
        self.filters.toggle_value(key, value, self.model.raw_rows());
        self.refresh_filter();
    }

    pub fn toggle_filter_all(&mut self, key: &str) {
        self.filters.toggle_all(key);
        self.refresh_filter();
    }

    pub fn open_filter(&mut self, key: &str) {
        self.filters.open(key);
        self.refresh_filter();
    }

    pub fn close_filter(&mut self) {
        self.filters.close();
        self.refresh_filter();
    }

    pub fn set_filter_search(&mut self, text: &str) {
        self.filters.set_search(text);
        self.refresh_filter();
    }

    // ========================================================================
    // Column groups and widths
    // ========================================================================

    pub fn toggle_group(&mut self, key: &str) {
        self.layout.toggle_group(key);
        self.sync_columns();
    }

    pub fn set_col_width(&mut self, c: usize, width: f32) {
        self.layout.set_col_width(c, width);
    }

    pub fn start_resize(&mut self, c: usize, x: f32) {
        self.resize.start(&self.layout, c, x);
    }

    pub fn resize_to(&mut self, x: f32) {
        self.resize.drag_to(&mut self.layout, x);
    }

    pub fn end_resize(&mut self) {
        self.resize.end();
    }

    pub fn is_resizing(&self) -> bool {
        self.resize.is_resizing()
    }

    /// Fit a column to its widest visible value. `measure` returns the
    /// rendered width of a string.
    pub fn auto_fit(&mut self, c: usize, measure: impl Fn(&str) -> f32) -> Option<f32> {
        let rows = self.model.visible_rows();
        self.auto_fit.fit(&mut self.layout, c, &rows, measure)
    }

    // ========================================================================
    // Select options
    // ========================================================================

    fn ensure_options_at(&mut self, pos: CellPos) {
        let (Some(row), Some(col)) = (self.model.row(pos.r), self.model.column(pos.c)) else {
            return;
        };
        if col.def.kind != ColumnKind::Select {
            return;
        }
        if let Some(load) = self.options.ensure(row, &col.def) {
            self.pending_loads.push(load);
        }
    }

    /// Options for the active cell's select column (empty until resolved).
    pub fn select_options_for_active(&self) -> Vec<SelectOption> {
        let pos = self.model.active();
        match (self.model.row(pos.r), self.model.column(pos.c)) {
            (Some(row), Some(col)) if col.def.kind == ColumnKind::Select => self.options.options(row, &col.def),
            _ => Vec::new(),
        }
    }

    /// Select menu entries narrowed by the editor draft.
    pub fn select_menu(&self) -> Vec<SelectOption> {
        let all = self.select_options_for_active();
        let query = self.editor.as_ref().map(|e| e.draft.as_str()).unwrap_or("");
        options::filter_options(&all, query).into_iter().cloned().collect()
    }

    pub fn is_loading_options(&self) -> bool {
        let pos = self.model.active();
        match (self.model.row(pos.r), self.model.column(pos.c)) {
            (Some(row), Some(col)) => self.options.is_loading(row, &col.def),
            _ => false,
        }
    }

    /// Jump to a cell listed in the error panel.
    pub fn focus_cell(&mut self, pos: CellPos) {
        self.model.set_active(pos);
        self.selection.clear();
    }
}
