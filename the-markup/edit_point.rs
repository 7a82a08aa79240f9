//! Jump to the next place where text is usually typed: an empty attribute
//! value, the gap between two tags, or a blank line.

use ropey::RopeSlice;
use the_core::{
  chars::{
    char_is_line_ending,
    char_is_quote,
    char_is_space,
  },
  line_ending::line_end_char_index,
};

use crate::movement::Direction;

/// Scans from `caret` in `direction` and returns the first edit point, or
/// `None` when the edge of the text is reached first.
///
/// ```
/// use ropey::Rope;
/// use the_markup::{edit_point::find_edit_point, movement::Direction};
///
/// let text = Rope::from("<div></div>");
/// assert_eq!(find_edit_point(text.slice(..), 0, Direction::Forward), Some(5));
/// ```
pub fn find_edit_point(text: RopeSlice, caret: usize, direction: Direction) -> Option<usize> {
  let len = text.len_chars();
  let mut pos = direction.advance(caret.min(len), len + 1)?;

  loop {
    if let Some(target) = edit_point_at(text, pos).filter(|&target| target != caret) {
      return Some(target);
    }
    pos = direction.advance(pos, len)?;
  }
}

fn edit_point_at(text: RopeSlice, pos: usize) -> Option<usize> {
  let cur = text.get_char(pos)?;
  let prev = pos.checked_sub(1).and_then(|prev| text.get_char(prev));
  let next = text.get_char(pos + 1);

  // ="" or =''
  if char_is_quote(cur) && next == Some(cur) && prev == Some('=') {
    return Some(pos + 1);
  }

  // ><
  if cur == '<' && prev == Some('>') {
    return Some(pos);
  }

  if char_is_line_ending(cur) {
    let line = text.char_to_line(pos);
    let start = text.line_to_char(line);
    let end = line_end_char_index(&text, line);
    if text.slice(start..end).chars().all(char_is_space) {
      return Some(end);
    }
  }

  None
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;

  fn find(text: &str, caret: usize, direction: Direction) -> Option<usize> {
    let text = Rope::from(text);
    find_edit_point(text.slice(..), caret, direction)
  }

  #[test]
  fn between_tags() {
    assert_eq!(find("<div></div>", 0, Direction::Forward), Some(5));
    assert_eq!(find("<div></div>", 5, Direction::Forward), None);
    assert_eq!(find("<div></div>", 11, Direction::Backward), Some(5));
  }

  #[test]
  fn empty_attribute_value() {
    let text = "<a href=\"\" title=''>";
    assert_eq!(find(text, 0, Direction::Forward), Some(9));
    assert_eq!(find(text, 9, Direction::Forward), Some(18));
    assert_eq!(find(text, 18, Direction::Backward), Some(9));
  }

  #[test]
  fn blank_lines() {
    let text = "<ul>\n  \n</ul>\n\nx";
    assert_eq!(find(text, 0, Direction::Forward), Some(7));
    assert_eq!(find(text, 7, Direction::Forward), Some(14));
    assert_eq!(find(text, 15, Direction::Backward), Some(14));
  }

  #[test]
  fn blank_line_with_crlf() {
    let text = "<p>\r\n\r\n</p>";
    assert_eq!(find(text, 0, Direction::Forward), Some(5));
  }

  #[test]
  fn nothing_to_find() {
    assert_eq!(find("plain text", 3, Direction::Forward), None);
    assert_eq!(find("plain text", 3, Direction::Backward), None);
    assert_eq!(find("", 0, Direction::Forward), None);
    assert_eq!(find("", 0, Direction::Backward), None);
  }
}
