//! Colors handed to fragment programs.

pub mod color;

pub use color::{Color, ColorParseError};
