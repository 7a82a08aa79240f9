//! Edit operations, change sets and atomic transactions.
//!
//! Commands describe their effect as a list of [`EditOperation`]s computed
//! against one snapshot of the buffer. [`Transaction::from_edits`] turns that
//! list into a [`ChangeSet`] (a sequence of [`Operation`]s applied from the
//! start of the document) and pairs it with the selection the command wants
//! once the edits land.
//!
//! - **Retain(n)** - Keep `n` characters unchanged
//! - **Delete(n)** - Remove `n` characters
//! - **Insert(s)** - Insert string `s`
//!
//! ```
//! use ropey::Rope;
//! use the_markup::{
//!   range::TextRange,
//!   transaction::{EditOperation, Transaction},
//! };
//!
//! let mut doc = Rope::from("<b>x</b>");
//! let tx = Transaction::from_edits(&doc, vec![
//!   EditOperation::delete(TextRange::new(4, 8)),
//!   EditOperation::delete(TextRange::new(0, 3)),
//! ])
//! .unwrap();
//! tx.apply(&mut doc).unwrap();
//! assert_eq!(doc, "x");
//! ```
//!
//! # Position Mapping
//!
//! Carets computed in the old snapshot are moved into the new one with
//! [`ChangeSet::map_pos`]. [`Assoc`] decides on which side of text inserted
//! exactly at the position the caret ends up.

use std::borrow::Cow;

use ropey::{
  Rope,
  RopeBuilder,
  RopeSlice,
};
use thiserror::Error;

use crate::{
  Tendril,
  range::TextRange,
  selection::{
    Range,
    Selection,
  },
};

pub type Result<T> = std::result::Result<T, TransactionError>;

/// (from, to) replacement.
pub type Change = (usize, usize, Option<Tendril>);

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransactionError {
  #[error("changeset length mismatch: expected {expected}, got {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("invalid change range: start {from} is after end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("change range {from}..{to} is out of bounds for document length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error("change range {from}..{to} overlaps previous end {prev_end}")]
  OverlappingRange {
    prev_end: usize,
    from:     usize,
    to:       usize,
  },
  #[error("position {pos} is out of bounds for changeset length {len}")]
  PositionOutOfBounds { pos: usize, len: usize },
}

/// Replace the text of `range` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOperation {
  pub range: TextRange,
  pub text:  Tendril,
}

impl EditOperation {
  pub fn replace(range: TextRange, text: impl Into<Tendril>) -> Self {
    Self {
      range,
      text: text.into(),
    }
  }

  pub fn delete(range: TextRange) -> Self {
    Self {
      range,
      text: Tendril::new(),
    }
  }

  pub fn insert(at: usize, text: impl Into<Tendril>) -> Self {
    Self::replace(TextRange::point(at), text)
  }

  fn into_change(self) -> Change {
    let text = (!self.text.is_empty()).then_some(self.text);
    (self.range.start, self.range.end, text)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  /// Move cursor by n characters.
  Retain(usize),

  /// Delete n characters.
  Delete(usize),

  /// Insert text at position.
  Insert(Tendril),
}

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
  /// Stay in front of text inserted at the position.
  Before,
  /// Move past text inserted at the position.
  After,
}

impl Assoc {
  fn insert_offset(self, s: &str) -> usize {
    match self {
      Assoc::Before => 0,
      Assoc::After => s.chars().count(),
    }
  }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
  pub(crate) changes: Vec<Operation>,
  /// The required document length. Will refuse to apply changes unless it
  /// matches.
  len:                usize,
  len_after:          usize,
}

impl ChangeSet {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      changes:   Vec::with_capacity(capacity),
      len:       0,
      len_after: 0,
    }
  }

  #[must_use]
  pub fn new(doc: RopeSlice) -> Self {
    let len = doc.len_chars();
    Self {
      changes: Vec::new(),
      len,
      len_after: len,
    }
  }

  pub fn operations(&self) -> &[Operation] {
    &self.changes
  }

  /// Returns the expected document length for this changeset
  pub fn len(&self) -> usize {
    self.len
  }

  /// Document length once the changeset is applied.
  pub fn len_after(&self) -> usize {
    self.len_after
  }

  // Changeset builder operations: delete/insert/retain.
  //

  pub fn delete(&mut self, n: usize) {
    use Operation::*;

    if n == 0 {
      return;
    }

    self.len += n;

    if let Some(Delete(count)) = self.changes.last_mut() {
      *count += n;
    } else {
      self.changes.push(Delete(n))
    }
  }

  /// Inserts are always ordered before a trailing delete so that a
  /// replacement reads as `Insert, Delete`.
  pub fn insert(&mut self, fragment: Tendril) {
    use Operation::*;

    if fragment.is_empty() {
      return;
    }

    self.len_after += fragment.chars().count();

    let new_last = match self.changes.as_mut_slice() {
      [.., Insert(prev)] | [.., Insert(prev), Delete(_)] => {
        prev.push_str(&fragment);
        return;
      },
      [.., last @ Delete(_)] => std::mem::replace(last, Insert(fragment)),
      _ => Insert(fragment),
    };

    self.changes.push(new_last);
  }

  pub fn retain(&mut self, n: usize) {
    use Operation::*;

    if n == 0 {
      return;
    }

    self.len += n;
    self.len_after += n;

    if let Some(Retain(count)) = self.changes.last_mut() {
      *count += n;
    } else {
      self.changes.push(Retain(n))
    }
  }

  /// Returns a new changeset that reverts this one. The document parameter
  /// expects the original document before this change was applied.
  pub fn invert(&self, original_doc: &Rope) -> Result<Self> {
    self.ensure_len(original_doc.len_chars())?;

    let mut inverted = Self::with_capacity(self.changes.len());
    let mut pos = 0;

    for change in &self.changes {
      use Operation::*;
      match change {
        Retain(n) => {
          inverted.retain(*n);
          pos += n;
        },
        Delete(n) => {
          let text = Cow::from(original_doc.slice(pos..pos + *n));
          inverted.insert(Tendril::from(text.as_ref()));
          pos += n;
        },
        Insert(s) => inverted.delete(s.chars().count()),
      }
    }

    // An empty changeset still has to describe the document it applies to.
    inverted.len = self.len_after;
    inverted.len_after = self.len;
    Ok(inverted)
  }

  fn ensure_len(&self, text_len: usize) -> Result<()> {
    if text_len != self.len {
      return Err(TransactionError::LengthMismatch {
        expected: self.len,
        actual:   text_len,
      });
    }
    Ok(())
  }

  /// Apply this changeset in-place.
  pub fn apply(&self, text: &mut Rope) -> Result<()> {
    *text = self.apply_to(text)?;
    Ok(())
  }

  /// Apply this changeset to a rope and return the updated rope. The input is
  /// left untouched, so a failed application never leaves a half-edited text.
  pub fn apply_to(&self, text: &Rope) -> Result<Rope> {
    self.ensure_len(text.len_chars())?;
    if self.is_empty() {
      return Ok(text.clone());
    }

    let mut builder = RopeBuilder::new();
    let mut pos = 0;

    let append_slice = |from: usize, to: usize, builder: &mut RopeBuilder| {
      if from >= to {
        return;
      }
      for chunk in text.slice(from..to).chunks() {
        builder.append(chunk);
      }
    };

    for change in &self.changes {
      use Operation::*;
      match change {
        Retain(n) => {
          append_slice(pos, pos + *n, &mut builder);
          pos += n;
        },
        Delete(n) => pos += n,
        Insert(s) => builder.append(s.as_str()),
      }
    }

    append_slice(pos, self.len, &mut builder);

    Ok(builder.finish())
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.changes.is_empty() || self.changes == [Operation::Retain(self.len)]
  }

  /// Map a position of the old document into the new one.
  ///
  /// Positions inside deleted text collapse to the start of the deletion (or
  /// to either side of its replacement, depending on `assoc`).
  pub fn map_pos(&self, pos: usize, assoc: Assoc) -> Result<usize> {
    use Operation::*;

    if pos > self.len {
      return Err(TransactionError::PositionOutOfBounds { pos, len: self.len });
    }

    let mut old_pos = 0;
    let mut new_pos = 0;
    let mut iter = self.changes.iter().peekable();

    while let Some(change) = iter.next() {
      match change {
        Retain(n) => {
          if pos < old_pos + n {
            return Ok(new_pos + (pos - old_pos));
          }
          old_pos += n;
          new_pos += n;
        },
        Delete(n) => {
          if pos < old_pos + n {
            return Ok(new_pos);
          }
          old_pos += n;
        },
        Insert(s) => {
          let inserted = s.chars().count();
          // a subsequent delete means a replace, consume it
          if let Some(Delete(n)) = iter.peek() {
            let n = *n;
            iter.next();
            if pos < old_pos + n {
              return Ok(if pos == old_pos && assoc == Assoc::Before {
                new_pos
              } else {
                new_pos + assoc.insert_offset(s)
              });
            }
            old_pos += n;
          } else if pos == old_pos {
            return Ok(new_pos + assoc.insert_offset(s));
          }
          new_pos += inserted;
        },
      }
    }

    // `pos` is the very end of the old document.
    Ok(new_pos)
  }
}

fn validate_change_bounds(from: usize, to: usize, len: usize) -> Result<()> {
  if from > to {
    return Err(TransactionError::InvalidRange { from, to });
  }
  if to > len {
    return Err(TransactionError::RangeOutOfBounds { from, to, len });
  }
  Ok(())
}

/// Where a cursor ends up after a multi-cursor edit, in terms of the text
/// before the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
  /// Keep the cursor, mapped through the changes.
  Keep,
  /// Select `start..end`, counted from where `anchor` lands. `anchor` sticks
  /// in front of text inserted at it.
  Relative {
    anchor: usize,
    start:  usize,
    end:    usize,
  },
}

impl Placement {
  /// A caret at `pos`.
  pub fn caret(pos: usize) -> Self {
    Self::Relative {
      anchor: pos,
      start:  0,
      end:    0,
    }
  }

  /// A selection of `len` chars starting where `anchor` lands.
  pub fn select(anchor: usize, len: usize) -> Self {
    Self::Relative {
      anchor,
      start: 0,
      end: len,
    }
  }

  fn resolve(self, range: Range, changes: &ChangeSet) -> Result<Range> {
    match self {
      Placement::Keep => range.map(changes),
      Placement::Relative { anchor, start, end } => {
        let anchor = changes.map_pos(anchor, Assoc::Before)?;
        let len = changes.len_after();
        Ok(Range::new((anchor + start).min(len), (anchor + end).min(len)))
      },
    }
  }
}

impl From<ChangeSet> for Transaction {
  fn from(changes: ChangeSet) -> Self {
    Self {
      changes,
      selection: None,
    }
  }
}

/// A batch of changes plus the selection to install once they are applied.
/// Hosts apply it as one undoable step.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transaction {
  changes:   ChangeSet,
  selection: Option<Selection>,
}

impl Transaction {
  pub fn new(doc: &Rope) -> Self {
    Self {
      changes:   ChangeSet::new(doc.slice(..)),
      selection: None,
    }
  }

  /// Changes made to the buffer.
  pub fn changes(&self) -> &ChangeSet {
    &self.changes
  }

  /// When set, explicitly updates the selection.
  pub fn selection(&self) -> Option<&Selection> {
    self.selection.as_ref()
  }

  /// Apply this transaction in-place.
  pub fn apply(&self, doc: &mut Rope) -> Result<()> {
    self.changes.apply(doc)
  }

  /// Apply this transaction to a rope and return the updated rope.
  pub fn apply_to(&self, doc: &Rope) -> Result<Rope> {
    self.changes.apply_to(doc)
  }

  /// Generate a transaction that reverts this one.
  pub fn invert(&self, original: &Rope) -> Result<Self> {
    let changes = self.changes.invert(original)?;

    Ok(Self {
      changes,
      selection: None,
    })
  }

  pub fn with_selection(mut self, selection: Selection) -> Self {
    self.selection = Some(selection);
    self
  }

  /// Generate a transaction from a set of changes. Changes must be sorted and
  /// must not overlap.
  pub fn change<I>(doc: &Rope, changes: I) -> Result<Self>
  where
    I: IntoIterator<Item = Change>,
  {
    let len = doc.len_chars();
    let changes = changes.into_iter();
    let (lower, upper) = changes.size_hint();
    let size = upper.unwrap_or(lower);
    let mut changeset = ChangeSet::with_capacity(2 * size + 1); // rough estimate

    let mut last = 0;
    for (from, to, tendril) in changes {
      validate_change_bounds(from, to, len)?;
      if from < last {
        return Err(TransactionError::OverlappingRange {
          prev_end: last,
          from,
          to,
        });
      }

      // Retain from last "to" to current "from"
      changeset.retain(from - last);
      let span = to - from;
      match tendril {
        Some(text) => {
          changeset.insert(text);
          changeset.delete(span);
        },
        None => changeset.delete(span),
      }
      last = to;
    }

    changeset.retain(len - last);

    Ok(Self::from(changeset))
  }

  /// Generate a transaction from edits collected across several cursors.
  ///
  /// Edits may arrive in any order. Exact duplicates (two cursors resolving
  /// to the same tag) collapse into one; an edit overlapping an earlier one is
  /// dropped.
  pub fn from_edits<I>(doc: &Rope, edits: I) -> Result<Self>
  where
    I: IntoIterator<Item = EditOperation>,
  {
    let edits = edits.into_iter().map(|edit| (edit, 0)).collect();
    let (changes, _) = fold_edits(doc.len_chars(), edits)?;
    Self::change(doc, changes)
  }

  /// Runs `f` for every range of `selection` against the same snapshot and
  /// folds the results into one transaction.
  ///
  /// `f` returns the edits for its cursor and where the cursor should land,
  /// or `None` to leave that cursor alone. A cursor that lost an edit to an
  /// overlapping one keeps its range instead. Returns `Ok(None)` when no
  /// cursor produced an edit.
  pub fn from_cursor_edits<F>(doc: &Rope, selection: &Selection, mut f: F) -> Result<Option<Self>>
  where
    F: FnMut(&Range) -> Option<(Vec<EditOperation>, Placement)>,
  {
    let mut edits = Vec::new();
    let mut placements = Vec::with_capacity(selection.len());
    for (ix, range) in selection.iter().enumerate() {
      match f(range) {
        Some((cursor_edits, placement)) => {
          edits.extend(cursor_edits.into_iter().map(|edit| (edit, ix)));
          placements.push(placement);
        },
        None => placements.push(Placement::Keep),
      }
    }

    if edits.is_empty() {
      return Ok(None);
    }

    let (changes, dropped) = fold_edits(doc.len_chars(), edits)?;
    for ix in dropped {
      placements[ix] = Placement::Keep;
    }

    let transaction = Self::change(doc, changes)?;
    let changes = transaction.changes();
    let mut targets = Vec::with_capacity(placements.len());
    for (range, placement) in selection.iter().zip(placements) {
      targets.push(placement.resolve(*range, changes)?);
    }

    let mut targets = targets.into_iter();
    let selection = selection
      .clone()
      .transform(|range| targets.next().unwrap_or(range));
    tracing::debug!(changes = ?transaction.changes().operations(), ?selection, "built transaction");
    Ok(Some(transaction.with_selection(selection)))
  }
}

/// Sorts edits tagged with the cursor they came from into changes. Exact
/// duplicates collapse; an edit overlapping an earlier kept one is dropped
/// and its cursor reported.
fn fold_edits(len: usize, mut edits: Vec<(EditOperation, usize)>) -> Result<(Vec<Change>, Vec<usize>)> {
  edits.sort_by_key(|(edit, _)| (edit.range.start, edit.range.end));

  let mut last = 0;
  let mut kept: Vec<EditOperation> = Vec::with_capacity(edits.len());
  let mut dropped = Vec::new();
  for (edit, cursor) in edits {
    validate_change_bounds(edit.range.start, edit.range.end, len)?;
    let duplicate = kept
      .iter()
      .rev()
      .take_while(|prev| prev.range.start == edit.range.start)
      .any(|prev| *prev == edit);
    if duplicate {
      continue;
    }
    if edit.range.start < last {
      tracing::trace!(range = %edit.range, prev_end = last, cursor, "dropping overlapping edit");
      dropped.push(cursor);
      continue;
    }
    last = edit.range.end;
    kept.push(edit);
  }

  let changes = kept.into_iter().map(EditOperation::into_change).collect();
  Ok((changes, dropped))
}
