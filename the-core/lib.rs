//! Character and line primitives shared by the markup command layer.

pub mod chars;
pub mod line_ending;
