//! Increment and decrement numeric literals in place.
//!
//! ```
//! use the_markup::number::update_number;
//!
//! assert_eq!(update_number("3", 1.0, 3).as_deref(), Some("4"));
//! assert_eq!(update_number(".5", -0.25, 3).as_deref(), Some(".25"));
//! assert_eq!(update_number("auto", 1.0, 3), None);
//! ```

use ropey::RopeSlice;
use the_core::{
  chars::char_is_digit,
  line_ending::line_end_char_index,
};

use crate::{
  range::TextRange,
  selection::Range,
  transaction::{
    EditOperation,
    Placement,
  },
};

/// Default number of fractional digits kept by [`update_number`].
pub const DEFAULT_PRECISION: usize = 3;

/// Finds the number around `column` in `line`: digits with at most one `.`,
/// plus a `-` right in front. Returned offsets are relative to `line`.
pub fn extract_number(line: RopeSlice, column: usize) -> Option<TextRange> {
  let len = line.len_chars();
  let column = column.min(len);
  let mut has_dot = false;
  let mut start = column;
  let mut end = column;

  while end < len {
    match line.char(end) {
      '.' if has_dot => break,
      '.' => has_dot = true,
      ch if !char_is_digit(ch) => break,
      _ => {},
    }
    end += 1;
  }

  // the dot budget is shared with the forward scan
  while start > 0 {
    match line.char(start - 1) {
      '.' if has_dot => break,
      '.' => has_dot = true,
      ch if !char_is_digit(ch) => break,
      _ => {},
    }
    start -= 1;
  }

  if start > 0 && line.char(start - 1) == '-' {
    start -= 1;
  }

  (start != end).then(|| TextRange::new(start, end))
}

/// Accepts `-?digits[.digits]` and `-?.digits`.
fn parse_number(text: &str) -> Option<f64> {
  let unsigned = text.strip_prefix('-').unwrap_or(text);
  let (int, frac) = match unsigned.split_once('.') {
    Some((int, frac)) => (int, Some(frac)),
    None => (unsigned, None),
  };
  let all_digits = |s: &str| s.chars().all(char_is_digit);
  let valid = match frac {
    None => !int.is_empty() && all_digits(int),
    Some(frac) if int.is_empty() => !frac.is_empty() && all_digits(frac),
    Some(frac) => all_digits(int) && all_digits(frac),
  };
  if !valid {
    return None;
  }
  text.parse().ok()
}

/// Adds `delta` to the number written in `text`.
///
/// The result has at most `precision` fractional digits and no trailing
/// zeros. A number written without its leading zero (`.5`) stays that way.
/// Returns `None` when `text` is not a plain decimal number.
pub fn update_number(text: &str, delta: f64, precision: usize) -> Option<String> {
  let value = parse_number(text)? + delta;
  if !value.is_finite() {
    return None;
  }

  let mut result = format!("{:.*}", precision, value.abs());
  if result.contains('.') {
    let trimmed = result.trim_end_matches('0').trim_end_matches('.').len();
    result.truncate(trimmed);
  }

  let bare_dot = text.starts_with('.') || text.starts_with("-.");
  if bare_dot && result.starts_with("0.") {
    result.remove(0);
  }

  let is_zero = result.chars().all(|ch| ch == '0' || ch == '.');
  if value < 0.0 && !is_zero {
    result.insert(0, '-');
  }
  Some(result)
}

/// Edits the number under `range` of `text`.
///
/// A caret picks the number around it on its line; a selection is taken as
/// the number itself. The new number ends up selected.
pub fn increment_number(
  text: RopeSlice,
  range: &Range,
  delta: f64,
  precision: usize,
) -> Option<(Vec<EditOperation>, Placement)> {
  let target = if range.is_empty() {
    let line = text.char_to_line(range.head);
    let line_start = text.line_to_char(line);
    let content = text.slice(line_start..line_end_char_index(&text, line));
    let found = extract_number(content, range.head - line_start)?;
    TextRange::new(line_start + found.start, line_start + found.end)
  } else {
    range.text_range()
  };

  let current = target.slice(text).to_string();
  let updated = update_number(&current, delta, precision)?;
  tracing::trace!(%target, %current, %updated, delta, "update number");

  let len = updated.chars().count();
  Some((
    vec![EditOperation::replace(target, updated)],
    Placement::select(target.start, len),
  ))
}
