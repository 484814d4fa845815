//! Per-cell validation
//!
//! Runs on every cell write, not only when an editor closes. The pipeline for
//! one value is:
//!
//! 1. coerce by column kind (checkbox text becomes a boolean)
//! 2. canonicalize select input: a typed label becomes its option value
//! 3. built-in kind rule (numbers, checkboxes)
//! 4. select membership against the resolved option list
//! 5. the column's custom validator, which sees the row after the edit
//!
//! ## Case Sensitivity
//!
//! Option matching is case-sensitive on both value and label. "Snacks"
//! matches the label "Snacks" but not "snacks"; the select menu's search box
//! is the case-insensitive part (see `options::filter_options`).
//!
//! Errors are stored in an [`ErrorMap`] keyed by raw row and raw column so
//! that filtering and group collapse never move them.

use rustc_hash::FxHashMap;

use crate::column::{ColumnDef, SelectOption};
use crate::value::{CellValue, Row};

pub const INVALID_OPTION: &str = "Invalid option";

// ============================================================================
// Pipeline
// ============================================================================

/// Find the option whose value or label equals `text` exactly.
pub fn match_option<'a>(options: &'a [SelectOption], text: &str) -> Option<&'a SelectOption> {
    options.iter().find(|o| o.value == text || o.label == text)
}

/// Steps 1-2: kind coercion and label -> value normalization.
///
/// `options` is `None` while a fetched list is still unknown; the value is
/// then left as typed.
pub fn canonicalize(col: &ColumnDef, value: CellValue, options: Option<&[SelectOption]>) -> CellValue {
    let value = (col.behavior().coerce)(value);
    if !col.behavior().uses_options {
        return value;
    }
    let Some(options) = options else {
        return value;
    };
    let text = value.to_string();
    match match_option(options, &text) {
        Some(option) => CellValue::Text(option.value.clone()),
        None => value,
    }
}

/// Steps 3-5: check `value` for `col` given the row after the edit.
pub fn validate_cell(
    col: &ColumnDef,
    value: &CellValue,
    row_after_edit: &Row,
    options: Option<&[SelectOption]>,
) -> Option<String> {
    if let Some(msg) = (col.behavior().check)(value) {
        return Some(msg.to_string());
    }

    let text = value.to_string();
    if col.behavior().uses_options {
        if let Some(options) = options {
            if !text.trim().is_empty() && match_option(options, &text).is_none() {
                return Some(INVALID_OPTION.to_string());
            }
        }
    }

    col.validator.as_ref().and_then(|f| f(&text, row_after_edit))
}

/// Run the whole pipeline for one write: canonicalize, store into `row`,
/// then validate against the updated row.
pub fn apply_edit(
    col: &ColumnDef,
    value: CellValue,
    row: &mut Row,
    options: Option<&[SelectOption]>,
) -> Option<String> {
    let value = canonicalize(col, value, options);
    row.set(&col.key, value.clone());
    validate_cell(col, &value, row, options)
}

// ============================================================================
// Error map
// ============================================================================

/// Sparse `(raw row, raw col) -> message`. Absence means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMap {
    errors: FxHashMap<(usize, usize), String>,
}

/// One entry of [`ErrorMap::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellError {
    pub row: usize,
    pub col: usize,
    pub message: String,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or clear the error for a cell.
    pub fn set(&mut self, row: usize, col: usize, error: Option<String>) {
        match error {
            Some(msg) => {
                self.errors.insert((row, col), msg);
            }
            None => {
                self.errors.remove(&(row, col));
            }
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.errors.get(&(row, col)).map(String::as_str)
    }

    pub fn has(&self, row: usize, col: usize) -> bool {
        self.errors.contains_key(&(row, col))
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Forget errors on rows that no longer exist.
    pub fn truncate_rows(&mut self, row_count: usize) {
        self.errors.retain(|&(r, _), _| r < row_count);
    }

    /// All errors, ordered by row then column.
    pub fn list(&self) -> Vec<CellError> {
        let mut out: Vec<CellError> = self
            .errors
            .iter()
            .map(|(&(row, col), message)| CellError { row, col, message: message.clone() })
            .collect();
        out.sort_by_key(|e| (e.row, e.col));
        out
    }
}
