//! Structural matchers the commands consume, and the snapshots they return.
//!
//! Parsing markup and stylesheets happens outside this crate. A host plugs
//! its parser in through [`TagMatcher`], [`CssMatcher`] and [`ItemMatcher`];
//! every range they report is a char range into the text they were given.

use ropey::RopeSlice;
use the_core::chars::char_is_quote;

use crate::range::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOptions {
  /// Strict XML mode: no void elements, every tag must be closed.
  pub xml: bool,
}

/// A tag found around an offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedTag {
  pub name:       String,
  pub open:       TextRange,
  /// `None` for self-closing and void elements.
  pub close:      Option<TextRange>,
  /// Attributes as written, quotes included; `None` for boolean attributes.
  pub attributes: Vec<(String, Option<String>)>,
}

impl MatchedTag {
  pub fn new(name: impl Into<String>, open: TextRange, close: Option<TextRange>) -> Self {
    Self {
      name: name.into(),
      open,
      close,
      attributes: Vec::new(),
    }
  }

  pub fn with_attributes<I>(mut self, attributes: I) -> Self
  where
    I: IntoIterator<Item = (String, Option<String>)>,
  {
    self.attributes = attributes.into_iter().collect();
    self
  }

  /// Range between the open and close tags, if the tag has a close tag.
  pub fn inner(&self) -> Option<TextRange> {
    self
      .close
      .map(|close| TextRange::new(self.open.end, close.start))
  }

  /// The whole element, open tag through close tag.
  pub fn outer(&self) -> TextRange {
    match self.close {
      Some(close) => TextRange::new(self.open.start, close.end),
      None => self.open,
    }
  }
}

/// Strips one pair of matching quotes (or the braces of a JSX expression).
pub fn unquote_attribute(value: &str) -> &str {
  let mut chars = value.chars();
  let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
    return value;
  };
  let quoted = (char_is_quote(first) && first == last) || (first == '{' && last == '}');
  if quoted {
    &value[first.len_utf8()..value.len() - last.len_utf8()]
  } else {
    value
  }
}

/// A CSS rule: selector through closing brace, and its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CssSection {
  pub start:      usize,
  pub end:        usize,
  pub body_start: usize,
  pub body_end:   usize,
}

impl CssSection {
  pub fn range(&self) -> TextRange {
    TextRange::new(self.start, self.end)
  }

  pub fn body(&self) -> TextRange {
    TextRange::new(self.body_start, self.body_end)
  }
}

/// Selectable parts of one structural unit (a tag's name and attribute
/// values, a declaration's value tokens...), in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItemModel {
  pub start:  usize,
  pub end:    usize,
  pub ranges: Vec<TextRange>,
}

pub trait TagMatcher {
  /// The innermost tag at `offset`.
  fn match_tag(&self, text: RopeSlice, offset: usize, options: MatchOptions) -> Option<MatchedTag>;

  /// The tag at `offset` followed by the tags nested inside it.
  fn balanced_inward(&self, text: RopeSlice, offset: usize, options: MatchOptions)
  -> Vec<MatchedTag>;

  /// Tags enclosing `offset`, innermost first.
  fn balanced_outward(
    &self,
    text: RopeSlice,
    offset: usize,
    options: MatchOptions,
  ) -> Vec<MatchedTag>;
}

pub trait CssMatcher {
  /// Candidate ranges for inward balancing, already ordered.
  fn balanced_inward(&self, text: RopeSlice, offset: usize) -> Vec<TextRange>;

  /// Candidate ranges for outward balancing, already ordered.
  fn balanced_outward(&self, text: RopeSlice, offset: usize) -> Vec<TextRange>;

  fn section(&self, text: RopeSlice, offset: usize) -> Option<CssSection>;
}

pub trait ItemMatcher {
  /// The unit at `offset`, or the next unit after it (the previous one before
  /// it when `reverse` is set).
  fn select_item(
    &self,
    text: RopeSlice,
    offset: usize,
    is_css: bool,
    reverse: bool,
  ) -> Option<SelectItemModel>;
}
