//! The host buffer seam and its in-memory implementation.
//!
//! Commands only ever talk to a [`Buffer`]: they read a snapshot of the text
//! and the selection, then hand back one [`Transaction`]. [`Document`] is the
//! in-memory buffer with an undo tree, used by tests and by hosts that keep
//! their text in a rope anyway.
//!
//! # Example
//!
//! ```
//! use ropey::Rope;
//! use the_markup::{
//!   buffer::{Buffer, Document},
//!   transaction::Transaction,
//! };
//!
//! let mut doc = Document::new(Rope::from("hello"));
//! let tx = Transaction::change(doc.text(), vec![(5, 5, Some(" world".into()))]).unwrap();
//! doc.apply(&tx).unwrap();
//! assert_eq!(doc.text(), "hello world");
//!
//! assert!(doc.undo().unwrap());
//! assert_eq!(doc.text(), "hello");
//! ```

use ropey::Rope;
use the_core::line_ending::{
  LineEnding,
  NATIVE_LINE_ENDING,
  auto_detect_line_ending,
};
use thiserror::Error;

use crate::{
  history::{
    History,
    HistoryError,
    HistoryJump,
    State,
  },
  position::{
    Position,
    char_idx_at_coords,
    coords_at_pos,
  },
  selection::{
    Selection,
    SelectionError,
  },
  transaction::{
    Transaction,
    TransactionError,
  },
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BufferError {
  #[error("buffer is readonly")]
  Readonly,
  #[error("selection position {pos} is out of bounds for document length {len}")]
  SelectionOutOfBounds { pos: usize, len: usize },
  #[error(transparent)]
  Transaction(#[from] TransactionError),
  #[error(transparent)]
  Selection(#[from] SelectionError),
  #[error(transparent)]
  History(#[from] HistoryError),
}

pub type Result<T> = std::result::Result<T, BufferError>;

/// Everything a command needs from the host editor.
pub trait Buffer {
  /// Current content.
  fn text(&self) -> &Rope;

  fn selection(&self) -> &Selection;

  fn set_selection(&mut self, selection: Selection) -> Result<()>;

  /// Applies every change of `transaction` or none of them, and records one
  /// undo step. The transaction's selection, when present, replaces the
  /// current one; otherwise the current selection is mapped through the
  /// changes.
  fn apply(&mut self, transaction: &Transaction) -> Result<()>;

  fn offset_to_position(&self, offset: usize) -> Position {
    coords_at_pos(self.text().slice(..), offset)
  }

  fn position_to_offset(&self, position: Position) -> usize {
    char_idx_at_coords(self.text().slice(..), position)
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DocumentFlags {
  pub readonly: bool,
  pub modified: bool,
}

#[derive(Debug)]
pub struct Document {
  text:        Rope,
  selection:   Selection,
  history:     History,
  line_ending: LineEnding,
  version:     u64,
  flags:       DocumentFlags,
}

impl Document {
  pub fn new(text: Rope) -> Self {
    let line_ending = auto_detect_line_ending(&text).unwrap_or(NATIVE_LINE_ENDING);
    Self {
      text,
      selection: Selection::point(0),
      history: History::default(),
      line_ending,
      version: 0,
      flags: DocumentFlags::default(),
    }
  }

  /// A document with `selection` already installed.
  pub fn with_selection(text: impl Into<Rope>, selection: Selection) -> Result<Self> {
    let mut doc = Self::new(text.into());
    doc.set_selection(selection)?;
    Ok(doc)
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  pub fn line_ending(&self) -> LineEnding {
    self.line_ending
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn flags(&self) -> DocumentFlags {
    self.flags
  }

  pub fn set_readonly(&mut self, readonly: bool) {
    self.flags.readonly = readonly;
  }

  pub fn undo(&mut self) -> Result<bool> {
    let Some(jump) = self.history.undo() else {
      return Ok(false);
    };
    self.apply_history_jump(&jump)?;
    Ok(true)
  }

  pub fn redo(&mut self) -> Result<bool> {
    let Some(jump) = self.history.redo() else {
      return Ok(false);
    };
    self.apply_history_jump(&jump)?;
    Ok(true)
  }

  fn apply_history_jump(&mut self, jump: &HistoryJump) -> Result<()> {
    let txn = &jump.transaction;
    let text = txn.apply_to(&self.text)?;
    let selection = match txn.selection() {
      Some(selection) => selection.clone(),
      None => self.selection.clone().map(txn.changes())?,
    };
    self.history.apply_jump(jump)?;

    self.text = text;
    self.selection = selection;
    self.version = self.version.saturating_add(1);
    Ok(())
  }
}

fn ensure_in_bounds(selection: &Selection, len: usize) -> Result<()> {
  match selection.iter().map(|range| range.to()).find(|&pos| pos > len) {
    Some(pos) => Err(BufferError::SelectionOutOfBounds { pos, len }),
    None => Ok(()),
  }
}

impl Buffer for Document {
  fn text(&self) -> &Rope {
    &self.text
  }

  fn selection(&self) -> &Selection {
    &self.selection
  }

  fn set_selection(&mut self, selection: Selection) -> Result<()> {
    ensure_in_bounds(&selection, self.text.len_chars())?;
    self.selection = selection;
    Ok(())
  }

  fn apply(&mut self, transaction: &Transaction) -> Result<()> {
    if self.flags.readonly {
      return Err(BufferError::Readonly);
    }

    // Everything is validated against the new text before any state changes.
    let text = transaction.apply_to(&self.text)?;
    let selection = match transaction.selection() {
      Some(selection) => selection.clone(),
      None => self.selection.clone().map(transaction.changes())?,
    };
    ensure_in_bounds(&selection, text.len_chars())?;

    if transaction.changes().is_empty() {
      self.selection = selection;
      return Ok(());
    }

    let original = State {
      doc:       self.text.clone(),
      selection: self.selection.clone(),
    };
    self.history.commit_revision(transaction, &original)?;

    self.text = text;
    self.selection = selection;
    self.flags.modified = true;
    self.version = self.version.saturating_add(1);
    Ok(())
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::selection::Range;

  #[test]
  fn apply_records_one_revision() {
    let mut doc = Document::new(Rope::from("<a></a><b></b>"));
    let tx = Transaction::change(doc.text(), vec![
      (1, 2, Some("x".into())),
      (8, 9, Some("y".into())),
    ])
    .unwrap();
    doc.apply(&tx).unwrap();

    assert_eq!(doc.text(), "<x></a><y></b>");
    assert_eq!(doc.history().len(), 2);
    assert!(doc.flags().modified);

    assert!(doc.undo().unwrap());
    assert_eq!(doc.text(), "<a></a><b></b>");
    assert!(!doc.undo().unwrap());
  }

  #[test]
  fn failed_apply_leaves_document_untouched() {
    let mut doc = Document::with_selection("abc", Selection::point(2)).unwrap();
    let stale = Transaction::change(&Rope::from("abcdef"), vec![(4, 5, None)]).unwrap();

    assert!(matches!(doc.apply(&stale), Err(BufferError::Transaction(_))));
    assert_eq!(doc.text(), "abc");
    assert_eq!(doc.selection(), &Selection::point(2));
    assert!(doc.history().is_empty());
  }

  #[test]
  fn selection_past_the_end_is_rejected() {
    let mut doc = Document::new(Rope::from("abc"));
    let tx = Transaction::change(doc.text(), vec![(0, 3, None)])
      .unwrap()
      .with_selection(Selection::point(3));

    assert!(matches!(
      doc.apply(&tx),
      Err(BufferError::SelectionOutOfBounds { pos: 3, len: 0 })
    ));
    assert_eq!(doc.text(), "abc");
  }

  #[test]
  fn selection_maps_through_transaction() {
    let mut doc = Document::with_selection("abc", Selection::point(1)).unwrap();
    let tx = Transaction::change(doc.text(), vec![(0, 0, Some("x".into()))]).unwrap();
    doc.apply(&tx).unwrap();
    assert_eq!(doc.selection().primary(), Range::point(2));
  }

  #[test]
  fn readonly_refuses_changes() {
    let mut doc = Document::new(Rope::from("abc"));
    doc.set_readonly(true);
    let tx = Transaction::change(doc.text(), vec![(0, 1, None)]).unwrap();
    assert!(matches!(doc.apply(&tx), Err(BufferError::Readonly)));
  }

  #[test]
  fn offsets_and_positions() {
    let doc = Document::new(Rope::from("<p>\n  x\n</p>"));
    assert_eq!(doc.offset_to_position(6), Position::new(1, 2));
    assert_eq!(doc.position_to_offset(Position::new(2, 1)), 9);
  }

  #[test]
  fn redo_after_undo() {
    let mut doc = Document::with_selection("ab", Selection::point(2)).unwrap();
    let tx = Transaction::change(doc.text(), vec![(2, 2, Some("c".into()))])
      .unwrap()
      .with_selection(Selection::point(3));
    doc.apply(&tx).unwrap();
    doc.undo().unwrap();
    assert_eq!(doc.selection(), &Selection::point(2));
    assert!(doc.redo().unwrap());
    assert_eq!(doc.text(), "abc");
    assert_eq!(doc.selection(), &Selection::point(3));
  }
}
