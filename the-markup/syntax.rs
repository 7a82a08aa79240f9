//! Document syntax classification.
//!
//! Commands only care about two families: markup (tags, handled through
//! [`crate::matcher::TagMatcher`]) and stylesheets (rules, handled through
//! [`crate::matcher::CssMatcher`]). XML dialects additionally switch the tag
//! matcher into strict mode.

use std::fmt;

use ropey::RopeSlice;
use serde::{
  Deserialize,
  Serialize,
};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Syntax {
  #[default]
  Html,
  Xhtml,
  Xml,
  Xsl,
  Jsx,
  Vue,
  Svelte,
  Css,
  Scss,
  Sass,
  Less,
  Sss,
  Stylus,
  /// Anything the commands have no structure for.
  Plain,
}

/// The abbreviation grammar used for a syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
  Markup,
  Stylesheet,
}

impl Syntax {
  /// Resolves a language name as hosts usually report it. Unknown names map
  /// to [`Syntax::Plain`].
  pub fn from_name(name: &str) -> Self {
    match name.trim().to_ascii_lowercase().as_str() {
      "html" | "htm" => Self::Html,
      "xhtml" => Self::Xhtml,
      "xml" => Self::Xml,
      "xsl" | "xslt" => Self::Xsl,
      "jsx" | "tsx" | "javascriptreact" | "typescriptreact" => Self::Jsx,
      "vue" => Self::Vue,
      "svelte" => Self::Svelte,
      "css" => Self::Css,
      "scss" => Self::Scss,
      "sass" => Self::Sass,
      "less" => Self::Less,
      "sss" | "sugarss" => Self::Sss,
      "stylus" | "styl" => Self::Stylus,
      _ => Self::Plain,
    }
  }

  pub const fn name(self) -> &'static str {
    match self {
      Self::Html => "html",
      Self::Xhtml => "xhtml",
      Self::Xml => "xml",
      Self::Xsl => "xsl",
      Self::Jsx => "jsx",
      Self::Vue => "vue",
      Self::Svelte => "svelte",
      Self::Css => "css",
      Self::Scss => "scss",
      Self::Sass => "sass",
      Self::Less => "less",
      Self::Sss => "sss",
      Self::Stylus => "stylus",
      Self::Plain => "plain",
    }
  }

  /// Strict tag matching: every tag must be closed explicitly.
  pub const fn is_xml(self) -> bool {
    matches!(self, Self::Xml | Self::Xsl | Self::Jsx)
  }

  /// Any markup dialect, XML included.
  pub const fn is_html(self) -> bool {
    matches!(self, Self::Html | Self::Xhtml | Self::Vue | Self::Svelte) || self.is_xml()
  }

  pub const fn is_css(self) -> bool {
    matches!(
      self,
      Self::Css | Self::Scss | Self::Sass | Self::Less | Self::Sss | Self::Stylus
    )
  }

  /// Whether structural commands have anything to work with.
  pub const fn is_supported(self) -> bool {
    self.is_html() || self.is_css()
  }

  pub const fn kind(self) -> SyntaxKind {
    if self.is_css() {
      SyntaxKind::Stylesheet
    } else {
      SyntaxKind::Markup
    }
  }
}

impl fmt::Display for Syntax {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Reports the syntax in effect at an offset, e.g. CSS inside a `<style>`
/// element of an HTML document.
pub trait SyntaxResolver {
  fn syntax_at(&self, text: RopeSlice, offset: usize) -> Syntax;
}

/// Always reports the document syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentSyntax(pub Syntax);

impl DocumentSyntax {
  /// The syntax for a document whose host language is `language`, or the
  /// configured syntax when the host reports none.
  pub fn resolve(language: Option<&str>, config: &Config) -> Self {
    Self(language.map_or(config.syntax, Syntax::from_name))
  }
}

impl From<&Config> for DocumentSyntax {
  fn from(config: &Config) -> Self {
    Self(config.syntax)
  }
}

impl SyntaxResolver for DocumentSyntax {
  fn syntax_at(&self, _text: RopeSlice, _offset: usize) -> Syntax {
    self.0
  }
}
