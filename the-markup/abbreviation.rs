//! Abbreviation expansion and wrapping.
//!
//! The abbreviation language itself lives behind [`AbbreviationExpander`];
//! this module picks what to expand, builds the output options from the
//! [`Config`] and the surrounding text, memoizes results in an
//! [`ExpansionCache`] and turns the expanded snippet into edits.

use std::{
  collections::HashMap,
  fmt,
};

use ropey::RopeSlice;
use thiserror::Error;
use the_core::line_ending::{
  line_end_char_index,
  line_indent,
};

use crate::{
  config::{
    AttributeQuotes,
    Config,
    MarkupStyle,
  },
  matcher::{
    MatchedTag,
    TagMatcher,
    unquote_attribute,
  },
  range::{
    TextRange,
    narrow_to_non_space,
  },
  selection::Range,
  snippet::Snippet,
  syntax::{
    Syntax,
    SyntaxKind,
  },
  tag::{
    TagEdit,
    tag_context,
  },
  transaction::{
    EditOperation,
    Placement,
  },
};

/// An expansion failure, usually a syntax error in the abbreviation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExpandError {
  pub message: String,
  /// Char offset into the abbreviation where parsing failed.
  pub pos:     Option<usize>,
}

impl ExpandError {
  pub fn new(message: impl Into<String>, pos: Option<usize>) -> Self {
    Self {
      message: message.into(),
      pos,
    }
  }
}

pub type Result<T> = std::result::Result<T, ExpandError>;

/// An abbreviation found in a line. Offsets are chars into that line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAbbreviation {
  pub abbreviation: String,
  pub start:        usize,
  pub end:          usize,
}

/// The element an abbreviation is expanded inside of, with attribute values
/// unquoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagContext {
  pub name:       String,
  pub attributes: Vec<(String, Option<String>)>,
}

impl From<&MatchedTag> for TagContext {
  fn from(tag: &MatchedTag) -> Self {
    let attributes = tag
      .attributes
      .iter()
      .map(|(name, value)| {
        let value = value.as_deref().map(|value| unquote_attribute(value).to_owned());
        (name.clone(), value)
      })
      .collect();
    Self {
      name: tag.name.clone(),
      attributes,
    }
  }
}

/// Output options handed to the expander.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandOptions {
  pub syntax:             Syntax,
  pub kind:               SyntaxKind,
  /// Indentation of the line the expansion lands on.
  pub base_indent:        String,
  /// One level of indentation.
  pub indent:             String,
  /// Emit line breaks and indentation. `false` produces a single line.
  pub format:             bool,
  pub attribute_quotes:   AttributeQuotes,
  /// Only set for plain HTML.
  pub self_closing_style: Option<MarkupStyle>,
  pub compact_boolean:    bool,
  pub comments:           bool,
  pub comments_template:  Option<String>,
  /// Lines to wrap, already stripped of `base_indent`.
  pub text:               Option<Vec<String>>,
  /// The tag around a wrapped caret.
  pub context:            Option<TagContext>,
}

impl ExpandOptions {
  /// Options for an expansion landing at `offset`.
  pub fn new(text: RopeSlice, offset: usize, syntax: Syntax, config: &Config) -> Self {
    let line = text.char_to_line(offset.min(text.len_chars()));
    let markup = &config.markup;
    let html = syntax == Syntax::Html;
    let comments = syntax.is_html() && markup.comments;

    Self {
      syntax,
      kind: syntax.kind(),
      base_indent: line_indent(&text, line),
      indent: config.abbreviation.indent.clone(),
      format: !config.abbreviation.inline,
      attribute_quotes: markup.attribute_quotes,
      self_closing_style: html.then_some(markup.self_closing_style),
      compact_boolean: html && markup.self_closing_style == MarkupStyle::Html,
      comments,
      comments_template: markup.comments_template.clone().filter(|_| comments),
      text: None,
      context: None,
    }
  }
}

/// Memoized expansions keyed by abbreviation and options.
///
/// Settings changes make cached output stale; [`Config::reload`] calls
/// [`ExpansionCache::invalidate`].
#[derive(Debug, Default)]
pub struct ExpansionCache {
  entries: HashMap<(String, ExpandOptions), String>,
}

impl ExpansionCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, abbreviation: &str, options: &ExpandOptions) -> Option<&str> {
    self
      .entries
      .get(&(abbreviation.to_owned(), options.clone()))
      .map(String::as_str)
  }

  pub fn insert(&mut self, abbreviation: &str, options: &ExpandOptions, expansion: String) {
    self
      .entries
      .insert((abbreviation.to_owned(), options.clone()), expansion);
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn invalidate(&mut self) {
    tracing::trace!(entries = self.entries.len(), "invalidate expansion cache");
    self.entries.clear();
  }
}

/// The abbreviation engine.
pub trait AbbreviationExpander {
  /// Finds the abbreviation ending around `column` in `line`.
  fn extract(&self, line: &str, column: usize, kind: SyntaxKind) -> Option<ExtractedAbbreviation>;

  /// Expands `abbreviation` into snippet text with `${N}` fields. The cache
  /// is shared with nested expansions.
  fn expand(
    &self,
    abbreviation: &str,
    options: &ExpandOptions,
    cache: &mut ExpansionCache,
  ) -> Result<String>;
}

/// Expands through `cache`; failures are not cached.
pub fn expand_cached(
  expander: &dyn AbbreviationExpander,
  abbreviation: &str,
  options: &ExpandOptions,
  cache: &mut ExpansionCache,
) -> Result<String> {
  if let Some(hit) = cache.get(abbreviation, options) {
    tracing::trace!(abbreviation, "expansion cache hit");
    return Ok(hit.to_owned());
  }
  let expansion = expander.expand(abbreviation, options, cache)?;
  cache.insert(abbreviation, options, expansion.clone());
  Ok(expansion)
}

/// Replaces `target` with the flattened `expansion` and selects its first
/// field, or puts the caret after it.
fn replace_with_snippet(target: TextRange, expansion: &str) -> TagEdit {
  let snippet = Snippet::parse(expansion);
  let placement = match snippet.first_field() {
    Some(field) => Placement::Relative {
      anchor: target.start,
      start:  field.range.start,
      end:    field.range.end,
    },
    None => {
      let len = snippet.len_chars();
      Placement::Relative {
        anchor: target.start,
        start:  len,
        end:    len,
      }
    },
  };
  (vec![EditOperation::replace(target, snippet.text)], placement)
}

/// Expands the abbreviation left of the caret of `range`.
///
/// Returns `Ok(None)` when there is nothing to expand on the caret's line.
pub fn expand_abbreviation(
  text: RopeSlice,
  range: &Range,
  syntax: Syntax,
  config: &Config,
  expander: &dyn AbbreviationExpander,
  cache: &mut ExpansionCache,
) -> Result<Option<TagEdit>> {
  let caret = range.head;
  let line = text.char_to_line(caret);
  let line_start = text.line_to_char(line);
  let content = text
    .slice(line_start..line_end_char_index(&text, line))
    .to_string();

  let Some(abbr) = expander.extract(&content, caret - line_start, syntax.kind()) else {
    return Ok(None);
  };
  let options = ExpandOptions::new(text, caret, syntax, config);
  let expansion = expand_cached(expander, &abbr.abbreviation, &options, cache)?;
  tracing::trace!(abbreviation = %abbr.abbreviation, %expansion, "expand abbreviation");

  let target = TextRange::new(line_start + abbr.start, line_start + abbr.end);
  Ok(Some(replace_with_snippet(target, &expansion)))
}

/// What wrapping at `range` wraps: the selection itself, or for a caret in
/// a tag either the whole element (caret inside the open or close tag) or
/// its trimmed content.
pub fn wrap_range(text: RopeSlice, range: TextRange, context: Option<&MatchedTag>) -> TextRange {
  let Some(tag) = context.filter(|_| range.is_empty()) else {
    return range;
  };
  let pos = range.start;
  if tag.open.surrounds(pos) || tag.close.is_some_and(|close| close.surrounds(pos)) {
    return tag.outer();
  }
  match tag.close {
    Some(close) => narrow_to_non_space(text, TextRange::new(tag.open.end, close.start)),
    None => range,
  }
}

/// Lines of `range`, each with `base_indent` stripped when it starts with it.
fn wrap_content(text: RopeSlice, range: TextRange, base_indent: &str) -> Vec<String> {
  range
    .slice(text)
    .to_string()
    .split('\n')
    .map(|line| {
      let line = line.strip_suffix('\r').unwrap_or(line);
      line.strip_prefix(base_indent).unwrap_or(line).to_owned()
    })
    .collect()
}

/// Wraps the selection of `range` (or the tag around its caret) with
/// `abbreviation`.
pub fn wrap_with_abbreviation(
  text: RopeSlice,
  range: &Range,
  abbreviation: &str,
  syntax: Syntax,
  config: &Config,
  tags: &dyn TagMatcher,
  expander: &dyn AbbreviationExpander,
  cache: &mut ExpansionCache,
) -> Result<Option<TagEdit>> {
  let abbreviation = abbreviation.trim();
  if abbreviation.is_empty() {
    return Ok(None);
  }

  let selected = range.text_range();
  let context = if selected.is_empty() && syntax.is_html() {
    tag_context(text, range.head, syntax.is_xml() || config.markup.xml, tags)
  } else {
    None
  };
  let target = wrap_range(text, selected, context.as_ref());

  let mut options = ExpandOptions::new(text, target.start, syntax, config);
  options.text = Some(wrap_content(text, target, &options.base_indent));
  options.context = context.as_ref().map(TagContext::from);
  let expansion = expand_cached(expander, abbreviation, &options, cache)?;
  tracing::trace!(abbreviation, %target, %expansion, "wrap with abbreviation");

  Ok(Some(replace_with_snippet(target, &expansion)))
}

/// A user-facing rendering of an [`ExpandError`]: the first line of the
/// message and a pointer under the failing column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  pub message: String,
  pub pos:     usize,
}

impl Diagnostic {
  /// Spaces up to the failing column followed by `^`.
  pub fn pointer(&self) -> String {
    format!("{}^", " ".repeat(self.pos))
  }
}

impl From<&ExpandError> for Diagnostic {
  fn from(err: &ExpandError) -> Self {
    let first_line = err.message.lines().next().unwrap_or_default();
    Self {
      message: strip_position_suffix(first_line).to_owned(),
      pos:     err.pos.unwrap_or(0),
    }
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}\n{}", self.pointer(), self.message)
  }
}

/// Drops a trailing ` at <number>`, which the pointer already shows.
fn strip_position_suffix(message: &str) -> &str {
  let digits = message.trim_end_matches(|ch: char| ch.is_ascii_digit());
  if digits.len() == message.len() {
    return message;
  }
  let spaced = digits.trim_end();
  if spaced.len() == digits.len() {
    return message;
  }
  let Some(before_at) = spaced.strip_suffix("at") else {
    return message;
  };
  let trimmed = before_at.trim_end();
  if trimmed.len() == before_at.len() {
    return message;
  }
  trimmed
}

#[cfg(test)]
mod test {
  use std::cell::{
    Cell,
    RefCell,
  };

  use ropey::Rope;

  use super::*;
  use crate::{
    matcher::MatchOptions,
    selection::Selection,
    transaction::Transaction,
  };

  /// Expands `name` into `<name>${1}</name>`, wrapping `text` lines when
  /// given. `!` is a syntax error.
  #[derive(Default)]
  struct Tags {
    calls: Cell<usize>,
  }

  impl AbbreviationExpander for Tags {
    fn extract(&self, line: &str, column: usize, _kind: SyntaxKind) -> Option<ExtractedAbbreviation> {
      let chars: Vec<char> = line.chars().collect();
      let mut start = column;
      while start > 0 && (chars[start - 1].is_ascii_alphanumeric() || chars[start - 1] == '!') {
        start -= 1;
      }
      (start < column).then(|| ExtractedAbbreviation {
        abbreviation: chars[start..column].iter().collect(),
        start,
        end: column,
      })
    }

    fn expand(
      &self,
      abbreviation: &str,
      options: &ExpandOptions,
      _cache: &mut ExpansionCache,
    ) -> Result<String> {
      self.calls.set(self.calls.get() + 1);
      if let Some(pos) = abbreviation.find('!') {
        return Err(ExpandError::new(
          format!("Unexpected character at {pos}\nin {abbreviation}"),
          Some(pos),
        ));
      }
      match &options.text {
        Some(lines) => {
          let inner = lines
            .iter()
            .map(|line| format!("{}{}{line}", options.base_indent, options.indent))
            .collect::<Vec<_>>()
            .join("\n");
          Ok(format!("<{abbreviation}>\n{inner}\n{}</{abbreviation}>", options.base_indent))
        },
        None => Ok(format!("<{abbreviation}>${{1}}</{abbreviation}>")),
      }
    }
  }

  struct OneTag(MatchedTag);

  impl TagMatcher for OneTag {
    fn match_tag(&self, _text: RopeSlice, _offset: usize, _options: MatchOptions) -> Option<MatchedTag> {
      Some(self.0.clone())
    }

    fn balanced_inward(&self, _: RopeSlice, _: usize, _: MatchOptions) -> Vec<MatchedTag> {
      Vec::new()
    }

    fn balanced_outward(&self, _: RopeSlice, _: usize, _: MatchOptions) -> Vec<MatchedTag> {
      Vec::new()
    }
  }

  fn run(text: &str, (edits, placement): TagEdit) -> (String, (usize, usize)) {
    let doc = Rope::from(text);
    let tx = Transaction::from_cursor_edits(&doc, &Selection::point(0), |_| {
      Some((edits.clone(), placement))
    })
    .unwrap()
    .unwrap();
    let range = tx.selection().unwrap().primary();
    (tx.apply_to(&doc).unwrap().to_string(), (range.from(), range.to()))
  }

  #[test]
  fn expands_and_selects_first_field() {
    let config = Config::default();
    let text = Rope::from("  div");
    let mut cache = ExpansionCache::new();
    let edit = expand_abbreviation(
      text.slice(..),
      &Range::point(5),
      Syntax::Html,
      &config,
      &Tags::default(),
      &mut cache,
    )
    .unwrap()
    .unwrap();
    assert_eq!(run("  div", edit), ("  <div></div>".into(), (7, 7)));
  }

  #[test]
  fn nothing_to_extract() {
    let text = Rope::from("div ");
    let edit = expand_abbreviation(
      text.slice(..),
      &Range::point(4),
      Syntax::Html,
      &Config::default(),
      &Tags::default(),
      &mut ExpansionCache::new(),
    )
    .unwrap();
    assert!(edit.is_none());
  }

  #[test]
  fn cache_memoizes_until_invalidated() {
    let expander = Tags::default();
    let options = ExpandOptions::new(Rope::new().slice(..), 0, Syntax::Html, &Config::default());
    let mut cache = ExpansionCache::new();

    for _ in 0..2 {
      let out = expand_cached(&expander, "p", &options, &mut cache).unwrap();
      assert_eq!(out, "<p>${1}</p>");
    }
    assert_eq!(expander.calls.get(), 1);
    assert_eq!(cache.len(), 1);

    cache.invalidate();
    assert!(cache.is_empty());
    expand_cached(&expander, "p", &options, &mut cache).unwrap();
    assert_eq!(expander.calls.get(), 2);
  }

  #[test]
  fn errors_are_not_cached() {
    let expander = Tags::default();
    let options = ExpandOptions::new(Rope::new().slice(..), 0, Syntax::Html, &Config::default());
    let mut cache = ExpansionCache::new();
    let err = expand_cached(&expander, "a!", &options, &mut cache).unwrap_err();
    assert_eq!(err.pos, Some(1));
    assert!(cache.is_empty());
  }

  #[test]
  fn options_follow_syntax_and_line() {
    let config = Config::default();
    let text = Rope::from("a\n\t\tb");
    let html = ExpandOptions::new(text.slice(..), 4, Syntax::Html, &config);
    assert_eq!(html.base_indent, "\t\t");
    assert_eq!(html.kind, SyntaxKind::Markup);
    assert_eq!(html.self_closing_style, Some(MarkupStyle::Html));
    assert!(html.compact_boolean);
    assert!(html.format);

    let css = ExpandOptions::new(text.slice(..), 0, Syntax::Css, &config);
    assert_eq!(css.base_indent, "");
    assert_eq!(css.kind, SyntaxKind::Stylesheet);
    assert_eq!(css.self_closing_style, None);
    assert!(!css.compact_boolean);
  }

  #[test]
  fn wrap_range_policy() {
    let text = Rope::from("<p> hi </p>");
    let p = MatchedTag::new("p", (0, 3).into(), Some((7, 11).into()));
    let wrap = |pos: usize| wrap_range(text.slice(..), TextRange::point(pos), Some(&p)).as_tuple();

    assert_eq!(wrap(1), (0, 11));
    assert_eq!(wrap(9), (0, 11));
    // on the tag boundary counts as content
    assert_eq!(wrap(3), (4, 6));
    assert_eq!(wrap(5), (4, 6));
    assert_eq!(wrap(0), (4, 6));

    let selected = TextRange::new(4, 6);
    assert_eq!(wrap_range(text.slice(..), selected, Some(&p)), selected);
    assert_eq!(wrap_range(text.slice(..), TextRange::point(5), None), TextRange::point(5));
  }

  #[test]
  fn wrap_deindents_content() {
    let src = "  <ul>\n    <li>a</li>\n  </ul>";
    let text = Rope::from(src);
    let selection = Range::new(2, 29);
    let edit = wrap_with_abbreviation(
      text.slice(..),
      &selection,
      " div ",
      Syntax::Html,
      &Config::default(),
      &OneTag(MatchedTag::new("ul", (2, 6).into(), Some((24, 29).into()))),
      &Tags::default(),
      &mut ExpansionCache::new(),
    )
    .unwrap()
    .unwrap();
    let (out, _) = run(src, edit);
    assert_eq!(out, "  <div>\n  \t<ul>\n  \t  <li>a</li>\n  \t</ul>\n  </div>");
  }

  #[test]
  fn wrap_caret_in_content_wraps_inner() {
    let src = "<p> hi </p>";
    let text = Rope::from(src);
    let tags = OneTag(MatchedTag::new("p", (0, 3).into(), Some((7, 11).into())));
    let mut config = Config::default();
    config.abbreviation.inline = true;
    let edit = wrap_with_abbreviation(
      text.slice(..),
      &Range::point(5),
      "b",
      Syntax::Html,
      &config,
      &tags,
      &Tags::default(),
      &mut ExpansionCache::new(),
    )
    .unwrap()
    .unwrap();
    let (out, caret) = run(src, edit);
    assert_eq!(out, "<p> <b>\n\thi\n</b> </p>");
    assert_eq!(caret, (16, 16));
  }

  /// Keeps the options of the last expansion.
  #[derive(Default)]
  struct Recorder(RefCell<Option<ExpandOptions>>);

  impl AbbreviationExpander for Recorder {
    fn extract(&self, _line: &str, _column: usize, _kind: SyntaxKind) -> Option<ExtractedAbbreviation> {
      None
    }

    fn expand(
      &self,
      _abbreviation: &str,
      options: &ExpandOptions,
      _cache: &mut ExpansionCache,
    ) -> Result<String> {
      *self.0.borrow_mut() = Some(options.clone());
      Ok(String::new())
    }
  }

  #[test]
  fn wrap_passes_tag_context() {
    let text = Rope::from("<a href='#' hidden>x</a>");
    let a = MatchedTag::new("a", (0, 19).into(), Some((20, 24).into()))
      .with_attributes([("href".into(), Some("'#'".into())), ("hidden".into(), None)]);
    let recorder = Recorder::default();
    let wrap = |range: Range| {
      wrap_with_abbreviation(
        text.slice(..),
        &range,
        "b",
        Syntax::Html,
        &Config::default(),
        &OneTag(a.clone()),
        &recorder,
        &mut ExpansionCache::new(),
      )
      .unwrap();
      recorder.0.borrow_mut().take().and_then(|options| options.context)
    };

    assert_eq!(
      wrap(Range::point(20)),
      Some(TagContext {
        name:       "a".into(),
        attributes: vec![("href".into(), Some("#".into())), ("hidden".into(), None)],
      })
    );
    // an explicit selection is wrapped as is
    assert_eq!(wrap(Range::new(19, 20)), None);
  }

  #[test]
  fn empty_wrap_abbreviation_is_a_no_op() {
    let text = Rope::from("x");
    let out = wrap_with_abbreviation(
      text.slice(..),
      &Range::new(0, 1),
      "  ",
      Syntax::Html,
      &Config::default(),
      &OneTag(MatchedTag::new("p", (0, 1).into(), None)),
      &Tags::default(),
      &mut ExpansionCache::new(),
    )
    .unwrap();
    assert!(out.is_none());
  }

  #[test]
  fn diagnostic_rendering() {
    let err = ExpandError::new("Unexpected character at 4\nstack", Some(4));
    let diagnostic = Diagnostic::from(&err);
    assert_eq!(diagnostic.message, "Unexpected character");
    assert_eq!(diagnostic.to_string(), "    ^\nUnexpected character");

    assert_eq!(strip_position_suffix("Unexpected at"), "Unexpected at");
    assert_eq!(strip_position_suffix("at 3"), "at 3");
    assert_eq!(strip_position_suffix("Bad value 42"), "Bad value 42");
    assert_eq!(strip_position_suffix("Missing brace at  12"), "Missing brace");
    assert_eq!(Diagnostic::from(&ExpandError::new("oops", None)).pointer(), "^");
  }
}
