//! Row auto-provisioning.
//!
//! Keeps exactly one blank row at the end of the data so that typing into it
//! grows the grid. A row is blank when every non-identity column is empty
//! (checkbox columns: not `true`). The row pinned for editing is never blank.

use std::cell::Cell;
use std::rc::Rc;

use crate::column::{ColumnDef, ColumnKind};
use crate::value::{CellValue, Row};

#[derive(Debug, Clone)]
pub struct RowProvisioner {
    columns: Vec<ColumnDef>,
    id_key: String,
    pinned: Option<String>,
    seq: Rc<Cell<u64>>,
}

impl RowProvisioner {
    pub fn new(columns: Vec<ColumnDef>, id_key: impl Into<String>) -> Self {
        Self {
            columns,
            id_key: id_key.into(),
            pinned: None,
            seq: Rc::default(),
        }
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnDef>) {
        self.columns = columns;
    }

    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    /// Pin (or unpin) a row by identity while it is being edited.
    pub fn set_pinned(&mut self, row_id: Option<String>) {
        self.pinned = row_id;
    }

    pub fn pinned(&self) -> Option<&str> {
        self.pinned.as_deref()
    }

    fn next_id(&self) -> String {
        let n = self.seq.get();
        self.seq.set(n + 1);
        format!("row_{}_{}", chrono::Utc::now().timestamp_millis(), n)
    }

    /// A fresh blank row with a new identity.
    pub fn create_row(&self) -> Row {
        let mut row = Row::new();
        for col in self.columns.iter().filter(|c| c.key != self.id_key) {
            row.set(&col.key, (col.behavior().blank)());
        }
        row.set(&self.id_key, CellValue::Text(self.next_id()));
        row
    }

    pub fn is_row_empty(&self, row: &Row) -> bool {
        if let Some(pinned) = &self.pinned {
            if row.text(&self.id_key) == *pinned {
                return false;
            }
        }
        self.columns
            .iter()
            .filter(|col| col.key != self.id_key)
            .all(|col| match (col.kind, row.get(&col.key)) {
                (ColumnKind::Checkbox, v) => !v.is_some_and(CellValue::is_true),
                (_, None) => true,
                (_, Some(v)) => v.is_blank(),
            })
    }

    /// Trim trailing blanks down to one, or append one if none is there.
    pub fn ensure_trailing_blank(&self, rows: &[Rc<Row>]) -> Vec<Rc<Row>> {
        let last_filled = rows.iter().rposition(|r| !self.is_row_empty(r));
        let keep = last_filled.map_or(0, |i| i + 1);

        let mut out: Vec<Rc<Row>> = rows[..keep].to_vec();
        match rows.get(keep) {
            Some(tail) if self.is_row_empty(tail) => out.push(Rc::clone(tail)),
            _ => out.push(Rc::new(self.create_row())),
        }
        out
    }
}
