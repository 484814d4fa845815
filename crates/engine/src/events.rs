//! Change notification types.
//!
//! Every committed mutation, undo and redo reaches the host through one
//! callback carrying the full row array and a [`ChangeMeta`]. This is the
//! only way row state leaves the engine.

use std::rc::Rc;

use celltable_core::CellPos;
use serde::{Deserialize, Serialize};

use crate::value::Row;

/// What produced a change. Hosts use it for audit trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Edit,
    Paste,
    Fill,
    Undo,
    Redo,
}

/// Metadata attached to every change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMeta {
    #[serde(rename = "type")]
    pub kind: MutationKind,
    /// The cell the change is about, in visible coordinates.
    pub cell: CellPos,
}

/// Callback type for receiving committed rows.
pub type ChangeCallback = Box<dyn FnMut(&[Rc<Row>], ChangeMeta)>;

/// Simple change collector for testing.
#[derive(Debug, Default)]
pub struct ChangeLog {
    entries: Vec<(Vec<Rc<Row>>, ChangeMeta)>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rows: &[Rc<Row>], meta: ChangeMeta) {
        self.entries.push((rows.to_vec(), meta));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&(Vec<Rc<Row>>, ChangeMeta)> {
        self.entries.last()
    }

    /// Kinds of every recorded change, in order.
    pub fn kinds(&self) -> Vec<MutationKind> {
        self.entries.iter().map(|(_, meta)| meta.kind).collect()
    }
}
