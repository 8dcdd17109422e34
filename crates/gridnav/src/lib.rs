//! gridnav: cursor navigation over elements laid out in rows.
//!
//! - [`GridSequence`]: a linear sequence split into rows, with a (row, column) cursor that
//!   overflows between rows and wraps at the ends.
//! - [`GridNavigator`]: builds a grid from element geometry supplied by an
//!   [`ElementRectProvider`] and rebuilds it on layout changes.
//! - [`CursorMovementWasd`]: registers WASD and `\d g` / `\d l` movement hotkeys that
//!   drive a navigator.

mod error;
mod navigator;
mod sequence;
pub mod test_support;
mod wasd;
mod wrap;

pub use error::{GridError, Result};
pub use navigator::{CursorCorrection, ElementRect, ElementRectProvider, GridChange, GridNavigator};
pub use sequence::{GridRow, GridSequence, GridWrappedValue};
pub use wasd::{CursorMovementWasd, CursorPositionCallback, MovementOptions};
pub use wrap::{WrappedValue, linear_cycle_navigation_wrap};
