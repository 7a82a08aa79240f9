//! User settings for the markup commands, read from TOML.
//!
//! ```toml
//! syntax = "html"
//! number-precision = 3
//! select-item-wrap = "stop"
//!
//! [increment]
//! small = 0.1
//! normal = 1
//! large = 10
//!
//! [markup]
//! xml = false
//! self-closing-style = "xhtml"
//! attribute-quotes = "double"
//!
//! [abbreviation]
//! inline = false
//! indent = "  "
//! ```
//!
//! Every key is optional.

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::{
  abbreviation::ExpansionCache,
  number::DEFAULT_PRECISION,
  select_item::SelectItemWrap,
  syntax::Syntax,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("invalid config: {0}")]
  Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// How self-closing tags are written by expansions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkupStyle {
  /// `<br>`
  #[default]
  Html,
  /// `<br />`
  Xhtml,
  /// `<br/>`
  Xml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeQuotes {
  #[default]
  Double,
  Single,
}

/// Step sizes for the increment/decrement commands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct IncrementConfig {
  pub small:  f64,
  pub normal: f64,
  pub large:  f64,
}

impl Default for IncrementConfig {
  fn default() -> Self {
    Self {
      small:  0.1,
      normal: 1.0,
      large:  10.0,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct MarkupConfig {
  /// Match tags strictly, as XML, regardless of the document syntax.
  pub xml:                bool,
  pub self_closing_style: MarkupStyle,
  pub attribute_quotes:   AttributeQuotes,
  /// Add comments after elements with an id or class.
  pub comments:           bool,
  pub comments_template:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AbbreviationConfig {
  /// Expand on a single line.
  pub inline: bool,
  pub indent: String,
}

impl Default for AbbreviationConfig {
  fn default() -> Self {
    Self {
      inline: false,
      indent: "\t".into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
  /// Document syntax used when the host does not report one, see
  /// [`crate::syntax::DocumentSyntax::resolve`].
  pub syntax:           Syntax,
  pub number_precision: usize,
  pub increment:        IncrementConfig,
  pub select_item_wrap: SelectItemWrap,
  pub markup:           MarkupConfig,
  pub abbreviation:     AbbreviationConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      syntax:           Syntax::Html,
      number_precision: DEFAULT_PRECISION,
      increment:        IncrementConfig::default(),
      select_item_wrap: SelectItemWrap::Stop,
      markup:           MarkupConfig::default(),
      abbreviation:     AbbreviationConfig::default(),
    }
  }
}

impl Config {
  pub fn from_toml_str(src: &str) -> Result<Self> {
    Ok(toml::from_str(src)?)
  }

  /// Replaces the settings with `src` and drops expansions made with the
  /// old ones. On error nothing changes.
  pub fn reload(&mut self, src: &str, cache: &mut ExpansionCache) -> Result<()> {
    let config = Self::from_toml_str(src)?;
    if config != *self {
      tracing::debug!(?config, "reload markup config");
      *self = config;
      cache.invalidate();
    }
    Ok(())
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::abbreviation::ExpandOptions;

  #[test]
  fn defaults() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.number_precision, 3);
    assert_eq!(config.increment.small, 0.1);
    assert_eq!(config.increment.large, 10.0);
    assert_eq!(config.select_item_wrap, SelectItemWrap::Stop);
    assert_eq!(config.markup.self_closing_style, MarkupStyle::Html);
    assert_eq!(config.abbreviation.indent, "\t");
  }

  #[test]
  fn partial_tables() {
    let config = Config::from_toml_str(
      r#"
      syntax = "scss"
      select-item-wrap = "wrap"

      [increment]
      large = 100

      [markup]
      self-closing-style = "xhtml"
      "#,
    )
    .unwrap();
    assert_eq!(config.syntax, Syntax::Scss);
    assert_eq!(config.select_item_wrap, SelectItemWrap::Wrap);
    assert_eq!(config.increment.large, 100.0);
    assert_eq!(config.increment.normal, 1.0);
    assert_eq!(config.markup.self_closing_style, MarkupStyle::Xhtml);
    assert!(!config.markup.xml);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    assert!(Config::from_toml_str("precision = 2").is_err());
    assert!(Config::from_toml_str("[markup]\nstyle = \"xml\"").is_err());
    assert!(Config::from_toml_str("syntax = \"cobol\"").is_err());
  }

  #[test]
  fn reload_invalidates_cache() {
    let mut config = Config::default();
    let mut cache = ExpansionCache::new();
    let options = ExpandOptions::new(ropey::Rope::new().slice(..), 0, Syntax::Html, &config);
    cache.insert("p", &options, "<p></p>".into());

    config.reload("", &mut cache).unwrap();
    assert_eq!(cache.len(), 1);

    assert!(config.reload("number-precision = \"x\"", &mut cache).is_err());
    assert_eq!(cache.len(), 1);
    assert_eq!(config.number_precision, 3);

    config.reload("[abbreviation]\ninline = true", &mut cache).unwrap();
    assert!(cache.is_empty());
    assert!(config.abbreviation.inline);
  }
}
