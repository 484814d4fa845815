//! Column groups and widths.
//!
//! Columns are partitioned into maximal contiguous runs sharing a `group`
//! label. A collapsible group can be folded into one placeholder column.
//! Widths are stored per raw column and addressed in visible space.

use std::collections::BTreeSet;
use std::rc::Rc;

use celltable_config::GridSettings;
use celltable_core::Gesture;

use crate::column::ColumnDef;
use crate::model::VisibleColumn;
use crate::value::Row;

/// Header band entry for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupHeader {
    pub key: String,
    pub label: String,
    pub width: f32,
    pub collapsible: bool,
    pub collapsed: bool,
}

#[derive(Debug, Clone)]
struct GroupInfo {
    key: String,
    label: String,
    members: Vec<usize>,
    collapsible: bool,
}

#[derive(Debug, Clone)]
pub struct ColumnLayout {
    columns: Vec<ColumnDef>,
    groups: Vec<GroupInfo>,
    collapsed: BTreeSet<String>,
    widths: Vec<f32>,
    default_width: f32,
    collapsed_width: f32,
}

impl ColumnLayout {
    pub fn new(columns: Vec<ColumnDef>, settings: &GridSettings) -> Self {
        let default_width = settings.default_column_width;
        let widths = columns.iter().map(|c| c.width.unwrap_or(default_width)).collect();
        Self {
            groups: build_groups(&columns),
            columns,
            collapsed: BTreeSet::new(),
            widths,
            default_width,
            collapsed_width: settings.collapsed_group_width,
        }
    }

    /// Replace the schema. Widths survive by position when the column count
    /// is unchanged.
    pub fn set_columns(&mut self, columns: Vec<ColumnDef>) {
        if columns.len() != self.widths.len() {
            self.widths = columns.iter().map(|c| c.width.unwrap_or(self.default_width)).collect();
        }
        self.groups = build_groups(&columns);
        self.columns = columns;
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    fn is_collapsed(&self, group: &GroupInfo) -> bool {
        group.collapsible && self.collapsed.contains(&group.key)
    }

    /// Columns in display order; a collapsed group becomes one placeholder.
    pub fn visible_columns(&self) -> Vec<VisibleColumn> {
        let mut out = Vec::with_capacity(self.columns.len());
        for group in &self.groups {
            if self.is_collapsed(group) {
                out.push(VisibleColumn { def: ColumnDef::placeholder(&group.key), raw: None });
            } else {
                out.extend(group.members.iter().map(|&i| VisibleColumn {
                    def: self.columns[i].clone(),
                    raw: Some(i),
                }));
            }
        }
        out
    }

    /// Raw index of a visible column; `None` for placeholders.
    pub fn orig_index(&self, visible: usize) -> Option<usize> {
        let mut seen = 0;
        for group in &self.groups {
            if self.is_collapsed(group) {
                if seen == visible {
                    return None;
                }
                seen += 1;
            } else if visible < seen + group.members.len() {
                return Some(group.members[visible - seen]);
            } else {
                seen += group.members.len();
            }
        }
        None
    }

    fn is_placeholder(&self, visible: usize) -> bool {
        self.orig_index(visible).is_none() && visible < self.visible_count()
    }

    pub fn visible_count(&self) -> usize {
        self.groups
            .iter()
            .map(|g| if self.is_collapsed(g) { 1 } else { g.members.len() })
            .sum()
    }

    pub fn col_width(&self, visible: usize) -> f32 {
        match self.orig_index(visible) {
            Some(i) => self.widths.get(i).copied().unwrap_or(self.default_width),
            None if self.is_placeholder(visible) => self.collapsed_width,
            None => self.default_width,
        }
    }

    /// Set a visible column's width. No-op for placeholders.
    pub fn set_col_width(&mut self, visible: usize, width: f32) {
        if let Some(i) = self.orig_index(visible) {
            if let Some(w) = self.widths.get_mut(i) {
                *w = width;
            }
        }
    }

    /// Fold or unfold a group. Non-collapsible groups ignore this.
    pub fn toggle_group(&mut self, key: &str) {
        if !self.groups.iter().any(|g| g.key == key && g.collapsible) {
            return;
        }
        if !self.collapsed.remove(key) {
            self.collapsed.insert(key.to_string());
        }
        log::debug!("group {key} collapsed: {}", self.collapsed.contains(key));
    }

    pub fn group_headers(&self) -> Vec<GroupHeader> {
        self.groups
            .iter()
            .map(|g| {
                let collapsed = self.is_collapsed(g);
                let width = if collapsed {
                    self.collapsed_width
                } else {
                    g.members
                        .iter()
                        .map(|&i| self.widths.get(i).copied().unwrap_or(self.default_width))
                        .sum()
                };
                GroupHeader {
                    key: g.key.clone(),
                    label: g.label.clone(),
                    width,
                    collapsible: g.collapsible,
                    collapsed,
                }
            })
            .collect()
    }

    /// True when at least one group has a label (a header band is needed).
    pub fn has_group_labels(&self) -> bool {
        self.groups.iter().any(|g| !g.label.is_empty())
    }
}

fn build_groups(columns: &[ColumnDef]) -> Vec<GroupInfo> {
    let mut groups: Vec<GroupInfo> = Vec::new();
    for (i, col) in columns.iter().enumerate() {
        let key = col.group.clone().unwrap_or_else(|| format!("__col_{i}"));
        let collapsible = col.group.is_some() && col.group_collapsible != Some(false);
        match groups.last_mut() {
            Some(last) if last.key == key => {
                last.members.push(i);
                last.collapsible &= collapsible;
            }
            _ => groups.push(GroupInfo {
                key,
                label: col.group.clone().unwrap_or_default(),
                members: vec![i],
                collapsible,
            }),
        }
    }
    groups
}

// ============================================================================
// Resize and auto-fit
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct ResizeDrag {
    col: usize,
    start_x: f32,
    start_width: f32,
}

/// Column-border drag. Widths never drop below the minimum.
#[derive(Debug, Clone)]
pub struct ColumnResize {
    drag: Gesture<ResizeDrag>,
    min_width: f32,
}

impl ColumnResize {
    pub fn new(min_width: f32) -> Self {
        Self { drag: Gesture::Idle, min_width }
    }

    pub fn start(&mut self, layout: &ColumnLayout, col: usize, x: f32) {
        if col >= layout.visible_count() {
            return;
        }
        self.drag.begin(ResizeDrag { col, start_x: x, start_width: layout.col_width(col) });
    }

    pub fn drag_to(&self, layout: &mut ColumnLayout, x: f32) {
        if let Some(d) = self.drag.state() {
            let width = (d.start_width + x - d.start_x).max(self.min_width);
            layout.set_col_width(d.col, width);
        }
    }

    pub fn end(&mut self) {
        self.drag.end();
    }

    pub fn is_resizing(&self) -> bool {
        self.drag.is_active()
    }
}

/// Limits for double-click auto-fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoFit {
    pub min_width: f32,
    pub max_width: f32,
    pub padding: f32,
}

impl AutoFit {
    pub fn from_settings(settings: &GridSettings) -> Self {
        Self {
            min_width: settings.min_column_width,
            max_width: settings.max_auto_fit_width,
            padding: settings.auto_fit_padding,
        }
    }

    /// Widest of the label and every value, plus padding, clamped.
    /// `measure` returns a rendered text width supplied by the host.
    pub fn fit(
        &self,
        layout: &mut ColumnLayout,
        visible: usize,
        rows: &[Rc<Row>],
        measure: impl Fn(&str) -> f32,
    ) -> Option<f32> {
        let raw = layout.orig_index(visible)?;
        let col = layout.columns.get(raw)?;
        let widest = rows
            .iter()
            .map(|row| measure(&row.text(&col.key)))
            .fold(measure(&col.label), f32::max);
        let width = (widest + self.padding).clamp(self.min_width, self.max_width);
        layout.set_col_width(visible, width);
        Some(width)
    }
}
