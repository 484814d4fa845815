//! Headless spreadsheet-style grid editing engine.
//!
//! [`Grid`] is the entry point for hosts. The pieces it composes are public
//! for hosts that want a narrower surface: [`TableModel`] owns the rows,
//! history and errors; the filter, layout, fill and clipboard modules are
//! pure state machines fed from it.

pub mod autorows;
pub mod clipboard;
pub mod column;
pub mod events;
pub mod fill;
pub mod filter;
pub mod grid;
pub mod history;
pub mod keymap;
pub mod layout;
pub mod model;
pub mod options;
pub mod validation;
pub mod value;
pub mod view;

pub use celltable_core::{Bounds, CellPos};
pub use column::{ColumnDef, ColumnKind, SelectOption};
pub use events::{ChangeMeta, MutationKind};
pub use grid::Grid;
pub use keymap::{Key, KeyInput, Modifiers};
pub use model::{CellUpdate, TableModel};
pub use options::{OptionFetchError, OptionLoad, OptionResolver};
pub use value::{CellValue, Row};
