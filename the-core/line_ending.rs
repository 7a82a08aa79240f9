use ropey::{
  Rope,
  RopeSlice,
};

use crate::chars::char_is_indent;

#[cfg(target_os = "windows")]
pub const NATIVE_LINE_ENDING: LineEnding = LineEnding::Crlf;

#[cfg(not(target_os = "windows"))]
pub const NATIVE_LINE_ENDING: LineEnding = LineEnding::LF;

/// The line breaks the text model recognises. These are exactly the breaks
/// `ropey` counts with its `cr_lines` feature.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LineEnding {
  /// CarriageReturn followed by LineFeed.
  Crlf,

  /// U+000A -- LineFeed
  LF,

  /// U+000D -- CarriageReturn
  CR,
}

impl LineEnding {
  #[inline]
  pub const fn len_chars(&self) -> usize {
    match self {
      Self::Crlf => 2,
      _ => 1,
    }
  }

  #[inline]
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::Crlf => "\u{000D}\u{000A}",
      Self::LF => "\u{000A}",
      Self::CR => "\u{000D}",
    }
  }

  #[inline]
  pub const fn from_char(ch: char) -> Option<LineEnding> {
    match ch {
      '\u{000A}' => Some(LineEnding::LF),
      '\u{000D}' => Some(LineEnding::CR),
      _ => None,
    }
  }

  // Same reasoning as `from_char`: a `FromStr` impl would force a different
  // return type.
  #[allow(clippy::should_implement_trait)]
  #[inline]
  pub fn from_str(g: &str) -> Option<LineEnding> {
    match g {
      "\u{000D}\u{000A}" => Some(LineEnding::Crlf),
      "\u{000A}" => Some(LineEnding::LF),
      "\u{000D}" => Some(LineEnding::CR),
      _ => None,
    }
  }
}

/// Attempts to detect what line ending the passed document uses.
pub fn auto_detect_line_ending(doc: &Rope) -> Option<LineEnding> {
  doc
    .lines()
    .take(100)
    .find_map(|line| get_line_ending(&line))
}

/// Returns the passed line's line ending, if any.
pub fn get_line_ending(line: &RopeSlice) -> Option<LineEnding> {
  let len = line.len_chars();
  let last = line.get_char(len.checked_sub(1)?)?;
  match last {
    '\u{000A}' if len >= 2 && line.char(len - 2) == '\u{000D}' => Some(LineEnding::Crlf),
    ch => LineEnding::from_char(ch),
  }
}

/// Returns the char index of the end of the given line, not including its line
/// ending.
pub fn line_end_char_index(slice: &RopeSlice, line: usize) -> usize {
  slice.line_to_char(line + 1)
    - get_line_ending(&slice.line(line))
      .map(|le| le.len_chars())
      .unwrap_or(0)
}

/// Get line `line_idx` from the passed rope slice, sans any line ending.
pub fn line_without_line_ending<'a>(slice: &'a RopeSlice, line_idx: usize) -> RopeSlice<'a> {
  let start = slice.line_to_char(line_idx);
  let end = line_end_char_index(slice, line_idx);
  slice.slice(start..end)
}

/// Number of leading indentation chars (spaces, tabs and friends) of a line.
pub fn line_indent_width(slice: &RopeSlice, line_idx: usize) -> usize {
  line_without_line_ending(slice, line_idx)
    .chars()
    .take_while(|&ch| char_is_indent(ch))
    .count()
}

/// The leading indentation of a line, as text.
pub fn line_indent(slice: &RopeSlice, line_idx: usize) -> String {
  let start = slice.line_to_char(line_idx);
  let width = line_indent_width(slice, line_idx);
  slice.slice(start..start + width).to_string()
}
