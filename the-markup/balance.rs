//! Balance: grow or shrink selections along the structure around them.
//!
//! Candidates are built from the tag chain the [`TagMatcher`] reports (or
//! taken as-is from the [`CssMatcher`]) and ordered so that walking them goes
//! inward or outward one step at a time:
//!
//! ```text
//! <div><p>text</p></div>
//!      ^^^^^^^^^^^         p outer
//!         ^^^^             p inner
//! ```

use ropey::RopeSlice;

use crate::{
  matcher::{
    CssMatcher,
    MatchOptions,
    MatchedTag,
    TagMatcher,
  },
  range::TextRange,
  selection::{
    Range,
    Selection,
  },
  syntax::Syntax,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceDirection {
  Inward,
  Outward,
}

fn push_range(ranges: &mut Vec<TextRange>, range: TextRange) {
  if ranges.last() != Some(&range) {
    ranges.push(range);
  }
}

/// Flattens a tag chain into candidate ranges: inner then outer range for
/// paired tags, the open tag alone for self-closing ones. Inward candidates
/// are sorted by ascending start, outward ones by descending start.
pub fn tag_candidates(tags: &[MatchedTag], direction: BalanceDirection) -> Vec<TextRange> {
  let mut ranges = Vec::with_capacity(tags.len() * 2);
  for tag in tags {
    match tag.inner() {
      Some(inner) => {
        push_range(&mut ranges, inner);
        push_range(&mut ranges, tag.outer());
      },
      None => push_range(&mut ranges, tag.open),
    }
  }

  // stable, so equal starts keep chain order
  match direction {
    BalanceDirection::Inward => ranges.sort_by_key(|range| range.start),
    BalanceDirection::Outward => ranges.sort_by(|a, b| b.start.cmp(&a.start)),
  }
  ranges
}

/// Candidates for balancing from `offset`. Empty when `syntax` has no
/// structure.
pub fn candidates(
  text: RopeSlice,
  offset: usize,
  syntax: Syntax,
  direction: BalanceDirection,
  tags: &dyn TagMatcher,
  css: &dyn CssMatcher,
) -> Vec<TextRange> {
  let ranges = if syntax.is_css() {
    match direction {
      BalanceDirection::Inward => css.balanced_inward(text, offset),
      BalanceDirection::Outward => css.balanced_outward(text, offset),
    }
  } else if syntax.is_html() {
    let options = MatchOptions {
      xml: syntax.is_xml(),
    };
    let chain = match direction {
      BalanceDirection::Inward => tags.balanced_inward(text, offset, options),
      BalanceDirection::Outward => tags.balanced_outward(text, offset, options),
    };
    tag_candidates(&chain, direction)
  } else {
    Vec::new()
  };

  tracing::trace!(?direction, offset, candidates = ?ranges, "balance candidates");
  ranges
}

/// One step inward from `selection`.
///
/// When the selection is one of the candidates, the following candidate is
/// picked. Otherwise the closest enclosing candidate is.
pub fn step_inward(candidates: &[TextRange], selection: TextRange) -> Option<TextRange> {
  match candidates.iter().position(|range| *range == selection) {
    Some(ix) => candidates.get(ix + 1).copied(),
    None => candidates
      .iter()
      .filter(|range| range.contains(&selection))
      .min_by_key(|range| range.len())
      .copied(),
  }
}

/// One step outward: the first candidate enclosing `selection` that also
/// ends after it.
pub fn step_outward(candidates: &[TextRange], selection: TextRange) -> Option<TextRange> {
  candidates
    .iter()
    .find(|range| range.contains(&selection) && range.end > selection.end)
    .copied()
}

/// Balances every range of `selection`. Ranges with nowhere to go stay as
/// they are. Returns `None` when nothing moved.
pub fn balance(
  text: RopeSlice,
  selection: &Selection,
  syntax: Syntax,
  direction: BalanceDirection,
  tags: &dyn TagMatcher,
  css: &dyn CssMatcher,
) -> Option<Selection> {
  if !syntax.is_supported() {
    return None;
  }

  let mut changed = false;
  let next = selection.clone().transform(|range| {
    let current = range.text_range();
    let candidates = candidates(text, current.start, syntax, direction, tags, css);
    let target = match direction {
      BalanceDirection::Inward => step_inward(&candidates, current),
      BalanceDirection::Outward => step_outward(&candidates, current),
    };
    match target {
      Some(target) if target != current => {
        changed = true;
        target.into()
      },
      _ => range,
    }
  });

  changed.then_some(next)
}
