//! Core types shared by the grid engine: positions, rectangles, range
//! selection and the pointer gesture state machine.

pub mod coord;
pub mod gesture;
pub mod selection;

pub use coord::{Bounds, CellPos};
pub use gesture::Gesture;
pub use selection::{RangeSelection, SelectionRange};
