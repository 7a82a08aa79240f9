use std::num::NonZeroUsize;

use ropey::Rope;
use thiserror::Error;

use crate::{
  selection::{
    Selection,
    SelectionError,
  },
  transaction::{
    ChangeSet,
    Transaction,
    TransactionError,
  },
};

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors that can occur during history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
  #[error("transaction error: {0}")]
  Transaction(#[from] TransactionError),
  #[error("selection error: {0}")]
  Selection(#[from] SelectionError),
  #[error("revision index {index} is out of bounds (max: {max})")]
  RevisionOutOfBounds { index: usize, max: usize },
}

/// Document text and selection right before a transaction is committed.
#[derive(Debug, Clone)]
pub struct State {
  pub doc:       Rope,
  pub selection: Selection,
}

/// A pending move through history.
///
/// Navigation never mutates the history itself. The caller applies the
/// transaction to the document first and only then calls
/// [`History::apply_jump`], so a failed application leaves both untouched.
#[derive(Debug, Clone)]
pub struct HistoryJump {
  pub transaction: Transaction,
  pub target:      usize,
}

/// Stores the undo tree of a buffer.
///
/// The vector always starts with an empty root revision. Every other revision
/// knows its parent, the transaction that leads from the parent to it and the
/// inversion of that transaction. Undo applies the inversion and moves to the
/// parent; redo replays the most recent child.
///
/// Each command produces one transaction, so one undo reverts a whole
/// multi-cursor edit.
#[derive(Debug)]
pub struct History {
  revisions: Vec<Revision>,
  current:   usize,
}

#[derive(Debug, Clone)]
struct Revision {
  parent:      usize,
  last_child:  Option<NonZeroUsize>,
  transaction: Transaction,
  // Deletes don't store the text they remove.
  inversion:   Transaction,
}

impl Default for History {
  fn default() -> Self {
    Self {
      revisions: vec![Revision {
        parent:      0,
        last_child:  None,
        transaction: Transaction::from(ChangeSet::with_capacity(0)),
        inversion:   Transaction::from(ChangeSet::with_capacity(0)),
      }],
      current:   0,
    }
  }
}

impl History {
  pub fn commit_revision(&mut self, transaction: &Transaction, original: &State) -> Result<()> {
    let selection_after = match transaction.selection() {
      Some(selection) => selection.clone(),
      None => original.selection.clone().map(transaction.changes())?,
    };
    let inversion = transaction
      .invert(&original.doc)?
      .with_selection(original.selection.clone());

    let new_current = self.revisions.len();
    self.revisions[self.current].last_child = NonZeroUsize::new(new_current);
    self.revisions.push(Revision {
      parent: self.current,
      last_child: None,
      transaction: transaction.clone().with_selection(selection_after),
      inversion,
    });
    self.current = new_current;
    Ok(())
  }

  #[inline]
  pub const fn at_root(&self) -> bool {
    self.current == 0
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.revisions.len()
  }

  /// Only the root revision exists.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.revisions.len() <= 1
  }

  pub fn undo(&self) -> Option<HistoryJump> {
    if self.at_root() {
      return None;
    }

    let revision = &self.revisions[self.current];
    Some(HistoryJump {
      transaction: revision.inversion.clone(),
      target:      revision.parent,
    })
  }

  pub fn redo(&self) -> Option<HistoryJump> {
    let last_child = self.revisions[self.current].last_child?;

    Some(HistoryJump {
      transaction: self.revisions[last_child.get()].transaction.clone(),
      target:      last_child.get(),
    })
  }

  /// Moves to the jump target. Call after the jump's transaction applied.
  pub fn apply_jump(&mut self, jump: &HistoryJump) -> Result<()> {
    if jump.target >= self.revisions.len() {
      return Err(HistoryError::RevisionOutOfBounds {
        index: jump.target,
        max:   self.revisions.len().saturating_sub(1),
      });
    }
    self.current = jump.target;
    Ok(())
  }
}
