//! Small stand-ins for the structural engines, good enough for well-formed
//! test markup.

use ropey::RopeSlice;
use the_markup::{
  abbreviation::{
    AbbreviationExpander,
    ExpandError,
    ExpandOptions,
    ExpansionCache,
    ExtractedAbbreviation,
  },
  buffer::Document,
  command::{
    Collaborators,
    Command,
    Outcome,
    Result,
    execute,
  },
  config::Config,
  matcher::{
    CssMatcher,
    CssSection,
    ItemMatcher,
    MatchOptions,
    MatchedTag,
    SelectItemModel,
    TagMatcher,
  },
  math::MathEvaluator,
  range::TextRange,
  syntax::{
    DocumentSyntax,
    SyntaxKind,
  },
};

/// Finds tags by scanning for `<...>`. Unclosed tags count as void.
pub struct Markup;

fn elements(text: RopeSlice) -> Vec<MatchedTag> {
  let chars: Vec<char> = text.chars().collect();
  let mut open: Vec<MatchedTag> = Vec::new();
  let mut done = Vec::new();
  let mut i = 0;

  while i < chars.len() {
    if chars[i] != '<' {
      i += 1;
      continue;
    }
    let Some(len) = chars[i..].iter().position(|&ch| ch == '>') else {
      break;
    };
    let end = i + len + 1;
    let body: String = chars[i + 1..end - 1].iter().collect();
    let range = TextRange::new(i, end);

    if let Some(name) = body.strip_prefix('/') {
      if let Some(ix) = open.iter().rposition(|tag| tag.name == name.trim()) {
        let mut unclosed = open.split_off(ix);
        let mut tag = unclosed.remove(0);
        tag.close = Some(range);
        done.push(tag);
        done.extend(unclosed);
      }
    } else {
      let name: String = body
        .chars()
        .take_while(|ch| !ch.is_whitespace() && *ch != '/')
        .collect();
      let tag = MatchedTag::new(name, range, None);
      if body.ends_with('/') {
        done.push(tag);
      } else {
        open.push(tag);
      }
    }
    i = end;
  }

  done.extend(open);
  done.sort_by_key(|tag| tag.open.start);
  done
}

fn touching(tag: &MatchedTag, offset: usize) -> bool {
  let outer = tag.outer();
  outer.start <= offset && offset <= outer.end
}

impl TagMatcher for Markup {
  fn match_tag(&self, text: RopeSlice, offset: usize, _options: MatchOptions) -> Option<MatchedTag> {
    elements(text)
      .into_iter()
      .filter(|tag| tag.outer().surrounds(offset))
      .min_by_key(|tag| tag.outer().len())
  }

  fn balanced_inward(&self, text: RopeSlice, offset: usize, _options: MatchOptions) -> Vec<MatchedTag> {
    let tags = elements(text);
    let Some(root) = tags
      .iter()
      .filter(|tag| touching(tag, offset))
      .min_by_key(|tag| tag.outer().len())
      .cloned()
    else {
      return Vec::new();
    };
    let nested = tags
      .into_iter()
      .filter(|tag| *tag != root && root.outer().contains(&tag.outer()));
    std::iter::once(root.clone()).chain(nested).collect()
  }

  fn balanced_outward(&self, text: RopeSlice, offset: usize, _options: MatchOptions) -> Vec<MatchedTag> {
    let mut tags: Vec<MatchedTag> = elements(text)
      .into_iter()
      .filter(|tag| touching(tag, offset))
      .collect();
    tags.sort_by_key(|tag| tag.outer().len());
    tags
  }
}

pub struct NoCss;

impl CssMatcher for NoCss {
  fn balanced_inward(&self, _text: RopeSlice, _offset: usize) -> Vec<TextRange> {
    Vec::new()
  }

  fn balanced_outward(&self, _text: RopeSlice, _offset: usize) -> Vec<TextRange> {
    Vec::new()
  }

  fn section(&self, _text: RopeSlice, _offset: usize) -> Option<CssSection> {
    None
  }
}

/// A single selectable unit, whatever the text.
pub struct OneUnit(pub SelectItemModel);

impl ItemMatcher for OneUnit {
  fn select_item(
    &self,
    _text: RopeSlice,
    offset: usize,
    _is_css: bool,
    reverse: bool,
  ) -> Option<SelectItemModel> {
    let found = if reverse {
      offset > self.0.start
    } else {
      offset < self.0.end
    };
    found.then(|| self.0.clone())
  }
}

/// `a*b`, `a+b`, `a-b` and `a/b` on integers left of the caret.
pub struct Arith;

impl MathEvaluator for Arith {
  fn extract(&self, line: &str, column: usize) -> Option<TextRange> {
    let chars: Vec<char> = line.chars().collect();
    let mut start = column;
    while start > 0 && (chars[start - 1].is_ascii_digit() || "+-*/".contains(chars[start - 1])) {
      start -= 1;
    }
    (start < column).then(|| TextRange::new(start, column))
  }

  fn evaluate(&self, expr: &str) -> Option<f64> {
    let ix = expr.find(['+', '-', '*', '/'])?;
    let a: f64 = expr[..ix].parse().ok()?;
    let b: f64 = expr[ix + 1..].parse().ok()?;
    match &expr[ix..ix + 1] {
      "+" => Some(a + b),
      "-" => Some(a - b),
      "*" => Some(a * b),
      _ => Some(a / b),
    }
  }
}

/// A word left of the caret expands to `<word>${1}</word>`; wrapping joins
/// the lines inside the tag. A `!` is a syntax error.
pub struct Words;

impl AbbreviationExpander for Words {
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
  ) -> std::result::Result<String, ExpandError> {
    if let Some(pos) = abbreviation.find('!') {
      return Err(ExpandError::new(
        format!("Unexpected character at {pos}"),
        Some(pos),
      ));
    }
    Ok(match &options.text {
      Some(lines) => format!("<{abbreviation}>{}</{abbreviation}>", lines.join("\n")),
      None => format!("<{abbreviation}>${{1}}</{abbreviation}>"),
    })
  }
}

pub fn unit(start: usize, end: usize, ranges: &[(usize, usize)]) -> SelectItemModel {
  SelectItemModel {
    start,
    end,
    ranges: ranges.iter().map(|&range| range.into()).collect(),
  }
}

/// Runs commands against a document with the mocks above.
pub struct Harness {
  pub doc:    Document,
  pub config: Config,
  pub cache:  ExpansionCache,
  pub items:  OneUnit,
  pub syntax: DocumentSyntax,
}

impl Harness {
  pub fn new(doc: Document) -> Self {
    Self::with_config(doc, Config::default())
  }

  /// The document syntax comes from `config`, as for a host that reports
  /// no language.
  pub fn with_config(doc: Document, config: Config) -> Self {
    Self {
      doc,
      syntax: DocumentSyntax::from(&config),
      config,
      cache: ExpansionCache::new(),
      items: OneUnit(unit(0, 0, &[])),
    }
  }

  pub fn run(&mut self, command: Command) -> Result<Outcome> {
    let env = Collaborators {
      tags:     &Markup,
      css:      &NoCss,
      items:    &self.items,
      math:     &Arith,
      expander: &Words,
      syntax:   &self.syntax,
    };
    execute(&mut self.doc, &command, &env, &self.config, &mut self.cache)
  }
}
