//! Direction of travel for navigation commands.
//!
//! Balance, item selection and the edit-point scanner all move either toward
//! the end of the document or toward its start:
//!
//! ```
//! use the_markup::movement::Direction;
//!
//! assert_eq!(Direction::Forward.step(), 1);
//! assert_eq!(Direction::Backward.reverse(), Direction::Forward);
//! ```

/// The direction of cursor movement or selection extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
  /// Moving toward the end of the document (increasing positions).
  Forward,
  /// Moving toward the start of the document (decreasing positions).
  Backward,
}

impl Direction {
  /// Signed offset of a single step.
  #[inline]
  pub const fn step(self) -> isize {
    match self {
      Direction::Forward => 1,
      Direction::Backward => -1,
    }
  }

  #[inline]
  #[must_use]
  pub const fn reverse(self) -> Self {
    match self {
      Direction::Forward => Direction::Backward,
      Direction::Backward => Direction::Forward,
    }
  }

  /// Moves `pos` one step, or returns `None` when that would leave `0..len`.
  #[inline]
  pub fn advance(self, pos: usize, len: usize) -> Option<usize> {
    match self {
      Direction::Forward => pos.checked_add(1).filter(|&next| next < len),
      Direction::Backward => pos.checked_sub(1).filter(|&next| next < len),
    }
  }
}
