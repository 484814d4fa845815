//! Column value filters
//!
//! Each column is either unfiltered or restricted to an explicit allow-set of
//! string-coerced values. While a column's menu is open, its search text
//! also narrows the rows by case-insensitive substring.
//!
//! Key invariants:
//! - An allow-set that covers the column's whole domain is stored as "unset"
//! - An empty allow-set hides every row
//! - The engine holds no rows; callers pass the current rows to every query

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::model::RowFilter;
use crate::value::Row;

// =============================================================================
// Filter state
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilters {
    /// Allow-sets by column key. Absent key = unset.
    filters: BTreeMap<String, BTreeSet<String>>,
    open_key: Option<String>,
    search: String,
}

impl ColumnFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_key(&self) -> Option<&str> {
        self.open_key.as_deref()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Is any column restricted?
    pub fn is_filtering(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Is this column restricted?
    pub fn is_active(&self, key: &str) -> bool {
        self.filters.contains_key(key)
    }

    pub fn allow_set(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.filters.get(key)
    }

    /// Drop every allow-set and close the menu.
    pub fn clear(&mut self) {
        self.filters.clear();
        self.close();
    }

    // -------------------------------------------------------------------------
    // Domain
    // -------------------------------------------------------------------------

    fn passes_others(&self, key: &str, row: &Row) -> bool {
        self.filters
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .all(|(k, set)| set.contains(&row.text(k)))
    }

    /// Sorted distinct values of `key` across rows that pass every other
    /// column's allow-set.
    pub fn domain(&self, key: &str, rows: &[Rc<Row>]) -> Vec<String> {
        rows.iter()
            .filter(|row| self.passes_others(key, row))
            .map(|row| row.text(key))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Values listed in the menu: the domain, narrowed by the search text when
    /// `key` is the open column.
    pub fn options_for(&self, key: &str, rows: &[Rc<Row>]) -> Vec<String> {
        let domain = self.domain(key, rows);
        if self.search.is_empty() || self.open_key.as_deref() != Some(key) {
            return domain;
        }
        let q = self.search.to_lowercase();
        domain.into_iter().filter(|v| v.to_lowercase().contains(&q)).collect()
    }

    pub fn is_checked(&self, key: &str, value: &str) -> bool {
        self.filters.get(key).map_or(true, |set| set.contains(value))
    }

    pub fn is_all_checked(&self, key: &str) -> bool {
        !self.filters.contains_key(key)
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Flip one value. An unset filter is first materialized to the full
    /// domain; a set that grows back over the domain collapses to unset.
    pub fn toggle_value(&mut self, key: &str, value: &str, rows: &[Rc<Row>]) {
        let domain = self.domain(key, rows);
        let mut next = match self.filters.get(key) {
            Some(set) => set.clone(),
            None => domain.iter().cloned().collect(),
        };
        if !next.remove(value) {
            next.insert(value.to_string());
        }

        if domain.iter().all(|v| next.contains(v)) {
            self.filters.remove(key);
        } else {
            self.filters.insert(key.to_string(), next);
        }
    }

    /// Flip between unset and hide-everything.
    pub fn toggle_all(&mut self, key: &str) {
        if self.filters.remove(key).is_none() {
            self.filters.insert(key.to_string(), BTreeSet::new());
        }
    }

    /// Open a column's menu, or close it if it is already open. Always clears
    /// the search text.
    pub fn open(&mut self, key: &str) {
        self.open_key = match self.open_key.take() {
            Some(k) if k == key => None,
            _ => Some(key.to_string()),
        };
        self.search.clear();
    }

    pub fn close(&mut self) {
        self.open_key = None;
        self.search.clear();
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    // -------------------------------------------------------------------------
    // Row test
    // -------------------------------------------------------------------------

    /// Conjunction of every allow-set and the open column's search.
    pub fn passes(&self, row: &Row) -> bool {
        let allowed = self.filters.iter().all(|(k, set)| set.contains(&row.text(k)));
        if !allowed {
            return false;
        }
        match &self.open_key {
            Some(key) if !self.search.trim().is_empty() => {
                row.text(key).to_lowercase().contains(&self.search.to_lowercase())
            }
            _ => true,
        }
    }

    /// Snapshot of the current state as a row test, or `None` when nothing
    /// narrows the rows.
    pub fn predicate(&self) -> Option<RowFilter> {
        let searching = self.open_key.is_some() && !self.search.trim().is_empty();
        if self.filters.is_empty() && !searching {
            return None;
        }
        let snapshot = self.clone();
        Some(Rc::new(move |row: &Row| snapshot.passes(row)))
    }
}
