use crate::line_ending::LineEnding;

#[inline]
pub fn char_is_line_ending(ch: char) -> bool {
  LineEnding::from_char(ch).is_some()
}

/// Whitespace as understood by markup and stylesheet tooling: the ECMAScript
/// `\s` class, line terminators included.
#[inline]
pub fn char_is_space(ch: char) -> bool {
  match ch {
      '\u{0009}' | // Character Tabulation
      '\u{000A}' | // Line Feed
      '\u{000B}' | // Line Tabulation
      '\u{000C}' | // Form Feed
      '\u{000D}' | // Carriage Return
      '\u{0020}' | // Space
      '\u{00A0}' | // No-break Space
      '\u{1680}' | // Ogham Space Mark
      '\u{2028}' | // Line Separator
      '\u{2029}' | // Paragraph Separator
      '\u{202F}' | // Narrow No-break Space
      '\u{205F}' | // Medium Mathematical Space
      '\u{3000}' | // Ideographic Space
      '\u{FEFF}'   // Zero Width No-break Space
      => true,

      // En Quad through Hair Space.
      ch if ('\u{2000}' ..= '\u{200A}').contains(&ch) => true,

      _ => false,
    }
}

/// Whitespace that does not end a line, i.e. what indentation is made of.
#[inline]
pub fn char_is_indent(ch: char) -> bool {
  char_is_space(ch) && !char_is_line_ending(ch)
}

#[inline]
pub fn char_is_digit(ch: char) -> bool {
  ch.is_ascii_digit()
}

#[inline]
pub fn char_is_quote(ch: char) -> bool {
  ch == '"' || ch == '\''
}
