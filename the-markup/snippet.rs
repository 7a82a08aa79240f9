//! Tabstop fields in expanded abbreviations.
//!
//! Expansions mark the places to fill in as `${1}`, `${2:placeholder}` or
//! `$3`. The buffer gets the plain text with placeholders kept and markers
//! removed; the field ranges are kept so the first one can be selected.
//!
//! ```
//! use the_markup::snippet::Snippet;
//!
//! let snippet = Snippet::parse("<a href=\"${1}\">${2:text}</a>");
//! assert_eq!(snippet.text, "<a href=\"\">text</a>");
//! assert_eq!(snippet.first_field().map(|f| f.range.as_tuple()), Some((9, 9)));
//! ```

use crate::range::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
  pub index: usize,
  /// Char range of the placeholder in [`Snippet::text`].
  pub range: TextRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snippet {
  pub text:   String,
  pub fields: Vec<Field>,
}

impl Snippet {
  /// Flattens `source`. Malformed markers are kept as plain text.
  pub fn parse(source: &str) -> Self {
    let chars: Vec<char> = source.chars().collect();
    let mut snippet = Snippet::default();
    let mut len = 0;
    parse_into(&chars, &mut snippet, &mut len);
    snippet
  }

  /// The field to select first: the lowest positive index, `$0` only when
  /// it is the sole field.
  pub fn first_field(&self) -> Option<&Field> {
    self
      .fields
      .iter()
      .filter(|field| field.index > 0)
      .min_by_key(|field| (field.index, field.range.start))
      .or_else(|| self.fields.iter().find(|field| field.index == 0))
  }

  /// Char length of the flattened text.
  pub fn len_chars(&self) -> usize {
    self.text.chars().count()
  }
}

fn digits(chars: &[char], from: usize) -> (Option<usize>, usize) {
  let end = chars[from..]
    .iter()
    .position(|ch| !ch.is_ascii_digit())
    .map_or(chars.len(), |n| from + n);
  let index = chars[from..end]
    .iter()
    .collect::<String>()
    .parse()
    .ok();
  (index, end)
}

/// Index of the `}` closing the field that starts before `from`, skipping
/// escaped chars and nested fields.
fn closing_brace(chars: &[char], from: usize) -> Option<usize> {
  let mut depth = 0usize;
  let mut i = from;
  while i < chars.len() {
    match chars[i] {
      '\\' => i += 1,
      '$' if chars.get(i + 1) == Some(&'{') => {
        depth += 1;
        i += 1;
      },
      '}' if depth == 0 => return Some(i),
      '}' => depth -= 1,
      _ => {},
    }
    i += 1;
  }
  None
}

fn parse_into(chars: &[char], snippet: &mut Snippet, len: &mut usize) {
  let mut i = 0;
  while i < chars.len() {
    let ch = chars[i];
    if ch == '\\' {
      if let Some(&escaped) = chars.get(i + 1) {
        snippet.text.push(escaped);
        *len += 1;
        i += 2;
        continue;
      }
    }

    if ch == '$' {
      match chars.get(i + 1) {
        Some('{') => {
          let (index, after) = digits(chars, i + 2);
          let close = closing_brace(chars, after);
          let placeholder = match (index, chars.get(after), close) {
            (Some(index), Some('}'), Some(close)) => Some((index, close, after..after)),
            (Some(index), Some(':'), Some(close)) => Some((index, close, after + 1..close)),
            _ => None,
          };
          if let Some((index, close, body)) = placeholder {
            let start = *len;
            parse_into(&chars[body], snippet, len);
            snippet.fields.push(Field {
              index,
              range: TextRange::new(start, *len),
            });
            i = close + 1;
            continue;
          }
        },
        Some(next) if next.is_ascii_digit() => {
          let (index, after) = digits(chars, i + 1);
          if let Some(index) = index {
            snippet.fields.push(Field {
              index,
              range: TextRange::point(*len),
            });
            i = after;
            continue;
          }
        },
        _ => {},
      }
    }

    snippet.text.push(ch);
    *len += 1;
    i += 1;
  }
}
