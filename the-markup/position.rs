use std::ops::{
  Add,
  AddAssign,
  Sub,
  SubAssign,
};

use ropey::RopeSlice;
use the_core::{
  chars::char_is_line_ending,
  line_ending::line_end_char_index,
};

use crate::range::TextRange;

/// This is a single point in a text buffer.
/// 0-indexed as all things should be. `col` counts chars.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
  pub row: usize,
  pub col: usize,
}

impl AddAssign for Position {
  fn add_assign(&mut self, rhs: Self) {
    self.row += rhs.row;
    self.col += rhs.col;
  }
}

impl SubAssign for Position {
  fn sub_assign(&mut self, rhs: Self) {
    self.row -= rhs.row;
    self.col -= rhs.col;
  }
}

impl Sub for Position {
  type Output = Position;

  fn sub(mut self, rhs: Self) -> Self::Output {
    self -= rhs;
    self
  }
}

impl Add for Position {
  type Output = Position;

  fn add(mut self, rhs: Self) -> Self::Output {
    self += rhs;
    self
  }
}

impl Position {
  pub fn new(row: usize, col: usize) -> Self {
    Self { row, col }
  }

  pub const fn zero() -> Self {
    Self { row: 0, col: 0 }
  }

  pub const fn is_zero(&self) -> bool {
    self.row == 0 && self.col == 0
  }

  /// The position reached after typing `text` starting from `self`.
  pub fn traverse(self, text: impl AsRef<str>) -> Self {
    let Self { mut row, mut col } = self;
    let mut chars = text.as_ref().chars().peekable();

    while let Some(ch) = chars.next() {
      if char_is_line_ending(ch) && !(ch == '\r' && chars.peek() == Some(&'\n')) {
        row += 1;
        col = 0;
      } else if !char_is_line_ending(ch) {
        col += 1;
      }
    }

    Self { row, col }
  }
}

impl From<(usize, usize)> for Position {
  fn from(value: (usize, usize)) -> Self {
    Position::new(value.0, value.1)
  }
}

/// A pair of line/column coordinates, the shape hosts usually use for
/// selections and edit ranges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
  pub start: Position,
  pub end:   Position,
}

/// Converts a char index into a `Position`.
///
/// Offsets past the end of the text are clamped to the end.
pub fn coords_at_pos(text: RopeSlice, pos: usize) -> Position {
  let pos = pos.min(text.len_chars());
  let line = text.char_to_line(pos);
  let line_start = text.line_to_char(line);
  Position::new(line, pos - line_start)
}

/// Convert a `(row, column)` to a char index.
///
/// If `row` exceeds the number of lines, the last line is used.
/// If `col` exceeds the length of the line, the line end is used.
pub fn char_idx_at_coords(text: RopeSlice, coords: Position) -> usize {
  let line = coords.row.min(text.len_lines().saturating_sub(1));
  let line_start = text.line_to_char(line);
  let line_end = line_end_char_index(&text, line);
  (line_start + coords.col).min(line_end)
}

pub fn text_range_to_line_range(text: RopeSlice, range: TextRange) -> LineRange {
  LineRange {
    start: coords_at_pos(text, range.start),
    end:   coords_at_pos(text, range.end),
  }
}

pub fn line_range_to_text_range(text: RopeSlice, range: LineRange) -> TextRange {
  TextRange::new(
    char_idx_at_coords(text, range.start),
    char_idx_at_coords(text, range.end),
  )
}
