//! Column definitions and the per-kind behaviour table.
//!
//! The serializable half of [`ColumnDef`] is the schema a host can ship as
//! JSON; the validator and option fetcher are attached in code.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::options::OptionsFuture;
use crate::value::{CellValue, Row};

/// Custom per-column rule: `(value, row_after_edit) -> error message`.
pub type CellValidator = Rc<dyn Fn(&str, &Row) -> Option<String>>;

/// Per-row option source for select columns.
pub type OptionFetcher = Rc<dyn Fn(&Row) -> OptionsFuture>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Text,
    Number,
    Date,
    Select,
    Checkbox,
}

/// What a column kind contributes to editing: its blank value, how typed
/// input is coerced, and the built-in rule.
pub struct KindBehavior {
    pub blank: fn() -> CellValue,
    pub coerce: fn(CellValue) -> CellValue,
    pub check: fn(&CellValue) -> Option<&'static str>,
    /// Values are matched against an option list.
    pub uses_options: bool,
}

fn blank_text() -> CellValue {
    CellValue::text("")
}

fn blank_bool() -> CellValue {
    CellValue::Bool(false)
}

fn keep(value: CellValue) -> CellValue {
    value
}

fn coerce_bool(value: CellValue) -> CellValue {
    match &value {
        CellValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => CellValue::Bool(true),
            "false" => CellValue::Bool(false),
            _ => value,
        },
        _ => value,
    }
}

fn no_check(_: &CellValue) -> Option<&'static str> {
    None
}

fn check_number(value: &CellValue) -> Option<&'static str> {
    let text = value.to_string();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => None,
        _ => Some("Must be a number"),
    }
}

fn check_bool(value: &CellValue) -> Option<&'static str> {
    match value {
        CellValue::Bool(_) => None,
        other => match other.to_string().trim().to_ascii_lowercase().as_str() {
            "true" | "false" => None,
            _ => Some("Must be true or false"),
        },
    }
}

static TEXT: KindBehavior = KindBehavior { blank: blank_text, coerce: keep, check: no_check, uses_options: false };
static NUMBER: KindBehavior = KindBehavior { blank: blank_text, coerce: keep, check: check_number, uses_options: false };
static DATE: KindBehavior = KindBehavior { blank: blank_text, coerce: keep, check: no_check, uses_options: false };
static SELECT: KindBehavior = KindBehavior { blank: blank_text, coerce: keep, check: no_check, uses_options: true };
static CHECKBOX: KindBehavior = KindBehavior { blank: blank_bool, coerce: coerce_bool, check: check_bool, uses_options: false };

impl ColumnKind {
    pub fn behavior(self) -> &'static KindBehavior {
        match self {
            ColumnKind::Text => &TEXT,
            ColumnKind::Number => &NUMBER,
            ColumnKind::Date => &DATE,
            ColumnKind::Select => &SELECT,
            ColumnKind::Checkbox => &CHECKBOX,
        }
    }
}

/// One entry of a select column's domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self { value: value.into(), label: label.into() }
    }
}

fn default_editable() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub key: String,
    pub label: String,
    #[serde(default, rename = "type")]
    pub kind: ColumnKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_collapsible: Option<bool>,
    #[serde(default = "default_editable")]
    pub editable: bool,
    /// Static option domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
    /// Column whose value keys the fetched option list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(skip)]
    pub validator: Option<CellValidator>,
    #[serde(skip)]
    pub fetcher: Option<OptionFetcher>,
}

impl ColumnDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind: ColumnKind::Text,
            width: None,
            group: None,
            group_collapsible: None,
            editable: true,
            options: None,
            depends_on: None,
            validator: None,
            fetcher: None,
        }
    }

    pub fn kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn group_collapsible(mut self, collapsible: bool) -> Self {
        self.group_collapsible = Some(collapsible);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn depends_on(mut self, key: impl Into<String>) -> Self {
        self.depends_on = Some(key.into());
        self
    }

    pub fn validator(mut self, f: impl Fn(&str, &Row) -> Option<String> + 'static) -> Self {
        self.validator = Some(Rc::new(f));
        self
    }

    pub fn fetcher(mut self, f: impl Fn(&Row) -> OptionsFuture + 'static) -> Self {
        self.fetcher = Some(Rc::new(f));
        self
    }

    /// Placeholder standing in for a collapsed group.
    pub(crate) fn placeholder(group_key: &str) -> Self {
        let mut col = Self::new(format!("__group_{group_key}"), "");
        col.editable = false;
        col
    }

    pub fn behavior(&self) -> &'static KindBehavior {
        self.kind.behavior()
    }

    /// Parse a column schema from JSON.
    pub fn list_from_json(text: &str) -> Result<Vec<ColumnDef>, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("group", &self.group)
            .field("editable", &self.editable)
            .field("depends_on", &self.depends_on)
            .field("validator", &self.validator.is_some())
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}
