//! Select next/previous item: step through the selectable parts of tags and
//! CSS declarations (tag names, attribute values, value tokens).

use ropey::RopeSlice;
use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  matcher::{
    ItemMatcher,
    SelectItemModel,
  },
  movement::Direction,
  range::TextRange,
  selection::{
    Range,
    Selection,
  },
  syntax::Syntax,
};

/// What happens after the last item of the document (or before the first one
/// when going backward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectItemWrap {
  /// Keep the current selection.
  #[default]
  Stop,
  /// Continue from the other end of the document.
  Wrap,
}

/// Picks the range to select from one unit's `ranges`.
///
/// If `selection` is one of them the following one (in `direction`) is
/// returned, or `None` when it is the last. Otherwise the first range that
/// encloses `selection` or starts on the `direction` side of it wins.
pub fn find_range(
  selection: TextRange,
  ranges: &[TextRange],
  direction: Direction,
) -> Option<TextRange> {
  let ordered: Box<dyn Iterator<Item = &TextRange>> = match direction {
    Direction::Forward => Box::new(ranges.iter()),
    Direction::Backward => Box::new(ranges.iter().rev()),
  };

  let mut get_next = false;
  let mut candidate = None;
  for range in ordered {
    if get_next {
      return Some(*range);
    }
    if *range == selection {
      get_next = true;
    } else if candidate.is_none() {
      let ahead = match direction {
        Direction::Forward => range.start >= selection.start,
        Direction::Backward => range.start <= selection.start,
      };
      if range.contains(&selection) || ahead {
        candidate = Some(*range);
      }
    }
  }

  if get_next { None } else { candidate }
}

fn query(
  items: &dyn ItemMatcher,
  text: RopeSlice,
  offset: usize,
  syntax: Syntax,
  direction: Direction,
) -> Option<SelectItemModel> {
  let model = items.select_item(
    text,
    offset,
    syntax.is_css(),
    direction == Direction::Backward,
  );
  tracing::trace!(offset, ?direction, ?model, "select item model");
  model
}

/// The item to select after `selection`, or `None` to leave it alone.
pub fn next_item(
  text: RopeSlice,
  selection: TextRange,
  syntax: Syntax,
  direction: Direction,
  wrap: SelectItemWrap,
  items: &dyn ItemMatcher,
) -> Option<TextRange> {
  if !syntax.is_supported() {
    return None;
  }

  if let Some(model) = query(items, text, selection.start, syntax, direction) {
    if let Some(range) = find_range(selection, &model.ranges, direction) {
      return Some(range);
    }

    // out of this unit, step into the adjacent one
    let boundary = match direction {
      Direction::Forward => model.end,
      Direction::Backward => model.start,
    };
    if let Some(range) = query(items, text, boundary, syntax, direction)
      .and_then(|model| find_range(selection, &model.ranges, direction))
    {
      return Some(range);
    }
  }

  match wrap {
    SelectItemWrap::Stop => None,
    SelectItemWrap::Wrap => {
      let edge = match direction {
        Direction::Forward => 0,
        Direction::Backward => text.len_chars(),
      };
      let model = query(items, text, edge, syntax, direction)?;
      let range = match direction {
        Direction::Forward => model.ranges.first(),
        Direction::Backward => model.ranges.last(),
      };
      range.copied().filter(|range| *range != selection)
    },
  }
}

/// Moves every range of `selection` to its next item. `None` when nothing
/// moved.
pub fn select_item(
  text: RopeSlice,
  selection: &Selection,
  syntax: Syntax,
  direction: Direction,
  wrap: SelectItemWrap,
  items: &dyn ItemMatcher,
) -> Option<Selection> {
  let mut changed = false;
  let next = selection.clone().transform(|range| {
    match next_item(text, range.text_range(), syntax, direction, wrap, items) {
      Some(target) => {
        changed = true;
        target.into()
      },
      None => range,
    }
  });
  changed.then_some(next)
}
