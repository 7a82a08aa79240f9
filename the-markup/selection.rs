//! Cursor positions and multi-cursor selections.
//!
//! A [`Range`] has two positions: `anchor` and `head`. The `head` is where the
//! caret is, the `anchor` is the other end of the selection. When
//! `anchor == head` the range is a plain caret.
//!
//! ```text
//! anchor=2, head=7: "he[llo w]orld"  (forward selection)
//! anchor=7, head=2: "he]llo w[orld"  (backward selection)
//! anchor=5, head=5: "hello|world"    (caret)
//! ```
//!
//! A [`Selection`] holds one or more ranges, sorted, with overlapping ranges
//! merged, plus the index of the primary range.
//!
//! # Error Handling
//!
//! - **EmptySelection** - Selection must have at least one range
//! - **PrimaryOutOfBounds** - Primary index doesn't point at a range

use smallvec::{
  SmallVec,
  smallvec,
};
use thiserror::Error;

use crate::{
  range::TextRange,
  transaction::{
    Assoc,
    ChangeSet,
    TransactionError,
  },
};

pub type Result<T> = std::result::Result<T, SelectionError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
  #[error("selection must contain at least one range")]
  EmptySelection,
  #[error("primary index {index} out of bounds for selection of length {len}")]
  PrimaryOutOfBounds { index: usize, len: usize },
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
  pub anchor: usize,
  pub head:   usize,
}

impl Range {
  pub fn new(anchor: usize, head: usize) -> Self {
    Self { anchor, head }
  }

  #[inline]
  pub fn point(head: usize) -> Self {
    Self::new(head, head)
  }

  /// Start of the range
  #[inline]
  #[must_use]
  pub fn from(&self) -> usize {
    std::cmp::min(self.anchor, self.head)
  }

  /// End of the range
  #[inline]
  #[must_use]
  pub fn to(&self) -> usize {
    std::cmp::max(self.anchor, self.head)
  }

  /// Length of the range.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.to() - self.from()
  }

  /// When the head and anchor are in the same position, we have no range.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.anchor == self.head
  }

  /// The undirected extent of this range.
  #[inline]
  pub fn text_range(&self) -> TextRange {
    TextRange::new(self.from(), self.to())
  }

  /// Check if two `Ranges` overlap
  pub fn overlaps(&self, other: &Self) -> bool {
    // Same start, or each one ends past the other's start.
    self.from() == other.from() || (self.to() > other.from() && other.to() > self.from())
  }

  /// Returns a `Range` that encompasses both input ranges.
  pub fn merge(&self, other: Self) -> Self {
    if self.anchor > self.head && other.anchor > other.head {
      Self {
        anchor: self.anchor.max(other.anchor),
        head:   self.head.min(other.head),
      }
    } else {
      Self {
        anchor: self.from().min(other.from()),
        head:   self.to().max(other.to()),
      }
    }
  }

  /// Map a range through a set of changes. A caret sticks after text inserted
  /// at its position; a selection shrinks away from insertions at its edges.
  pub fn map(mut self, changes: &ChangeSet) -> std::result::Result<Self, TransactionError> {
    use std::cmp::Ordering;
    if changes.is_empty() {
      return Ok(self);
    }

    let (anchor_assoc, head_assoc) = match self.anchor.cmp(&self.head) {
      Ordering::Equal => (Assoc::After, Assoc::After),
      Ordering::Less => (Assoc::After, Assoc::Before),
      Ordering::Greater => (Assoc::Before, Assoc::After),
    };

    self.anchor = changes.map_pos(self.anchor, anchor_assoc)?;
    self.head = changes.map_pos(self.head, head_assoc)?;
    Ok(self)
  }
}

impl From<(usize, usize)> for Range {
  fn from(value: (usize, usize)) -> Self {
    Self::new(value.0, value.1)
  }
}

impl From<TextRange> for Range {
  /// A forward range covering `range`.
  fn from(range: TextRange) -> Self {
    Self::new(range.start, range.end)
  }
}

impl From<Range> for TextRange {
  fn from(range: Range) -> Self {
    range.text_range()
  }
}

/// A selection is one or more ranges.
/// INVARIANT: A selection can never be empty (always contain at least one
/// range).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
  ranges:        SmallVec<[Range; 1]>,
  primary_index: usize,
}

impl Selection {
  pub fn new(ranges: SmallVec<[Range; 1]>, primary_index: usize) -> Result<Self> {
    if ranges.is_empty() {
      return Err(SelectionError::EmptySelection);
    }
    if primary_index >= ranges.len() {
      return Err(SelectionError::PrimaryOutOfBounds {
        index: primary_index,
        len:   ranges.len(),
      });
    }
    Ok(
      Self {
        ranges,
        primary_index,
      }
      .normalize(),
    )
  }

  /// Builds a selection from undirected ranges, each selected forward.
  pub fn from_text_ranges(
    ranges: impl IntoIterator<Item = TextRange>,
    primary_index: usize,
  ) -> Result<Self> {
    Self::new(ranges.into_iter().map(Into::into).collect(), primary_index)
  }

  pub fn point(pos: usize) -> Self {
    Self {
      ranges:        smallvec![Range::point(pos)],
      primary_index: 0,
    }
  }

  #[must_use]
  /// Constructs a selection holding a single range.
  pub fn single(anchor: usize, head: usize) -> Self {
    Self {
      ranges:        smallvec![Range::new(anchor, head)],
      primary_index: 0,
    }
  }

  pub fn ranges(&self) -> &[Range] {
    &self.ranges
  }

  pub fn primary_index(&self) -> usize {
    self.primary_index
  }

  pub fn primary(&self) -> Range {
    self.ranges[self.primary_index]
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Range> {
    self.ranges.iter()
  }

  /// Number of ranges.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.ranges.len()
  }

  /// Check if all ranges are collapsed carets.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.ranges.iter().all(Range::is_empty)
  }

  /// Map selections over a set of changes. Useful for adjusting the selection
  /// position after applying changes to a document.
  pub fn map(mut self, changes: &ChangeSet) -> Result<Self> {
    if changes.is_empty() {
      return Ok(self);
    }
    for range in self.ranges.iter_mut() {
      *range = range.map(changes)?;
    }
    Ok(self.normalize())
  }

  /// Apply a transformation to all ranges and return a new Selection.
  pub fn transform<F>(mut self, mut f: F) -> Self
  where
    F: FnMut(Range) -> Range,
  {
    for range in self.ranges.iter_mut() {
      *range = f(*range);
    }
    self.normalize()
  }

  /// Normalizes a [Selection]
  ///
  /// Ranges are sorted by [Range::from] with overlapping ranges merged. The
  /// primary index follows its range.
  fn normalize(mut self) -> Self {
    if self.ranges.len() < 2 {
      return self;
    }

    let primary = self.ranges[self.primary_index];
    let mut sorted = std::mem::take(&mut self.ranges);
    sorted.sort_by_key(Range::from);

    let mut ranges: SmallVec<[Range; 1]> = SmallVec::with_capacity(sorted.len());
    let mut primary_index = 0;

    for range in sorted {
      if let Some(prev_range) = ranges.last_mut() {
        if prev_range.overlaps(&range) {
          *prev_range = prev_range.merge(range);
          if range == primary {
            primary_index = ranges.len() - 1;
          }
          continue;
        }
      }
      if range == primary {
        primary_index = ranges.len();
      }
      ranges.push(range);
    }

    self.ranges = ranges;
    self.primary_index = primary_index;
    self
  }
}

impl<'a> IntoIterator for &'a Selection {
  type IntoIter = std::slice::Iter<'a, Range>;
  type Item = &'a Range;

  fn into_iter(self) -> std::slice::Iter<'a, Range> {
    self.ranges().iter()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_new_empty() {
    let result = Selection::new(smallvec![], 0);
    assert_eq!(result, Err(SelectionError::EmptySelection));
  }

  #[test]
  fn test_primary_out_of_bounds() {
    let result = Selection::new(smallvec![Range::point(1)], 3);
    assert_eq!(result, Err(SelectionError::PrimaryOutOfBounds { index: 3, len: 1 }));
  }

  #[test]
  fn test_create_normalizes_and_merges() {
    let sel = Selection::new(
      smallvec![
        Range::new(10, 12),
        Range::new(6, 7),
        Range::new(4, 5),
        Range::new(3, 4),
        Range::new(0, 6),
        Range::new(7, 8),
        Range::new(9, 13),
        Range::new(13, 14),
      ],
      0,
    )
    .unwrap();

    let res = sel
      .ranges()
      .iter()
      .map(|range| format!("{}/{}", range.anchor, range.head))
      .collect::<Vec<String>>()
      .join(",");

    assert_eq!(res, "0/6,6/7,7/8,9/13,13/14");
  }

  #[test]
  fn test_primary_follows_its_range() {
    let sel = Selection::new(
      smallvec![Range::point(20), Range::point(3), Range::point(10)],
      1,
    )
    .unwrap();
    assert_eq!(sel.primary(), Range::point(3));
    assert_eq!(sel.primary_index(), 0);
  }

  #[test]
  fn test_overlaps() {
    fn overlaps(a: (usize, usize), b: (usize, usize)) -> bool {
      Range::new(a.0, a.1).overlaps(&Range::new(b.0, b.1))
    }

    // Two non-zero-width ranges, no overlap.
    assert!(!overlaps((0, 3), (3, 6)));
    assert!(!overlaps((3, 6), (0, 3)));

    // Two non-zero-width ranges, overlap.
    assert!(overlaps((0, 4), (3, 6)));
    assert!(overlaps((3, 6), (0, 4)));

    // Zero-width and non-zero-width range, no overlap.
    assert!(!overlaps((0, 3), (3, 3)));
    assert!(!overlaps((3, 3), (0, 3)));

    // Zero-width and non-zero-width range, overlap.
    assert!(overlaps((1, 4), (1, 1)));
    assert!(overlaps((2, 2), (1, 4)));

    // Two zero-width ranges, no overlap.
    assert!(!overlaps((0, 0), (1, 1)));

    // Two zero-width ranges, overlap.
    assert!(overlaps((1, 1), (1, 1)));
  }

  #[test]
  fn test_text_range_conversion() {
    let range = Range::new(9, 4);
    assert_eq!(range.text_range(), TextRange::new(4, 9));
    let range: Range = TextRange::new(4, 9).into();
    assert_eq!(range, Range::new(4, 9));
  }

  #[test]
  fn test_map_caret_after_insert() {
    use ropey::Rope;

    use crate::transaction::Transaction;

    let doc = Rope::from("abc");
    let tx = Transaction::change(&doc, vec![(1, 1, Some("xy".into()))]).unwrap();
    let sel = Selection::point(1).map(tx.changes()).unwrap();
    assert_eq!(sel.primary(), Range::point(3));
  }
}
