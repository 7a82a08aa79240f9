//! Half-open offset ranges and the predicates every command is built on.
//!
//! A [`TextRange`] is an ordered `[start, end)` pair of char offsets into one
//! buffer snapshot. It carries no direction; use
//! [`crate::selection::Range`] when anchor and head matter.
//!
//! ```
//! use ropey::Rope;
//! use the_markup::range::{TextRange, narrow_to_non_space};
//!
//! let text = Rope::from("<p>  hi \n</p>");
//! let inner = TextRange::new(3, 9);
//! assert_eq!(narrow_to_non_space(text.slice(..), inner), TextRange::new(5, 7));
//! ```

use std::fmt;

use ropey::RopeSlice;
use the_core::chars::char_is_space;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextRange {
  pub start: usize,
  pub end:   usize,
}

impl TextRange {
  /// Builds a range, swapping the bounds if they are given in reverse.
  #[inline]
  pub fn new(start: usize, end: usize) -> Self {
    if start <= end {
      Self { start, end }
    } else {
      Self {
        start: end,
        end:   start,
      }
    }
  }

  #[inline]
  pub fn point(offset: usize) -> Self {
    Self {
      start: offset,
      end:   offset,
    }
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.end - self.start
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }

  /// `self` fully encloses `other`, bounds inclusive.
  #[inline]
  pub fn contains(&self, other: &Self) -> bool {
    self.start <= other.start && self.end >= other.end
  }

  #[inline]
  pub fn contains_offset(&self, offset: usize) -> bool {
    self.start <= offset && offset < self.end
  }

  /// `offset` lies strictly inside the range, not on either bound.
  #[inline]
  pub fn surrounds(&self, offset: usize) -> bool {
    self.start < offset && offset < self.end
  }

  #[inline]
  pub fn as_tuple(&self) -> (usize, usize) {
    (self.start, self.end)
  }

  /// The text covered by this range. Out of bounds ends are clamped.
  pub fn slice<'a>(&self, text: RopeSlice<'a>) -> RopeSlice<'a> {
    let len = text.len_chars();
    text.slice(self.start.min(len)..self.end.min(len))
  }
}

impl From<(usize, usize)> for TextRange {
  fn from((start, end): (usize, usize)) -> Self {
    Self::new(start, end)
  }
}

impl From<std::ops::Range<usize>> for TextRange {
  fn from(range: std::ops::Range<usize>) -> Self {
    Self::new(range.start, range.end)
  }
}

impl From<TextRange> for std::ops::Range<usize> {
  fn from(range: TextRange) -> Self {
    range.start..range.end
  }
}

impl fmt::Display for TextRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.start, self.end)
  }
}

/// Returns a copy of `range` that starts and ends on a non-space char.
///
/// An all-whitespace range collapses to an empty range at its own start.
pub fn narrow_to_non_space(text: RopeSlice, range: TextRange) -> TextRange {
  let range = TextRange::new(range.start.min(text.len_chars()), range.end.min(text.len_chars()));
  let mut start = range.start;
  let mut end = range.end;

  while start < end && char_is_space(text.char(start)) {
    start += 1;
  }

  while end > start && char_is_space(text.char(end - 1)) {
    end -= 1;
  }

  if start == end {
    TextRange::point(range.start)
  } else {
    TextRange::new(start, end)
  }
}
