//! Structural tag edits: split/join, remove and go-to-pair.
//!
//! Every function here works on one cursor and one [`MatchedTag`] from the
//! current snapshot and returns the edits plus the cursor [`Placement`], both
//! in pre-edit offsets. Folding several cursors into one transaction is
//! [`Transaction::from_cursor_edits`]'s job.
//!
//! [`Transaction::from_cursor_edits`]: crate::transaction::Transaction::from_cursor_edits

use ropey::RopeSlice;
use the_core::{
  chars::{
    char_is_indent,
    char_is_space,
  },
  line_ending::{
    line_end_char_index,
    line_indent,
    line_indent_width,
  },
};

use crate::{
  matcher::{
    MatchOptions,
    MatchedTag,
    TagMatcher,
  },
  range::{
    TextRange,
    narrow_to_non_space,
  },
  transaction::{
    EditOperation,
    Placement,
  },
};

pub type TagEdit = (Vec<EditOperation>, Placement);

/// The tag around `offset` if the document is markup.
pub fn tag_context(
  text: RopeSlice,
  offset: usize,
  xml: bool,
  matcher: &dyn TagMatcher,
) -> Option<MatchedTag> {
  let tag = matcher.match_tag(text, offset, MatchOptions { xml });
  tracing::trace!(offset, ?tag, "tag context");
  tag
}

fn char_at(text: RopeSlice, pos: usize) -> Option<char> {
  text.get_char(pos)
}

/// Joins a paired tag into a self-closing one, or splits a self-closing tag
/// into an empty pair.
///
/// Joining drops everything after the open tag and inserts the closing
/// slash before its `>`: `<div>text</div>` becomes `<div />`. Splitting
/// strips the slash (and one space before it) and appends `</name>`.
pub fn split_join(text: RopeSlice, tag: &MatchedTag) -> TagEdit {
  let open = tag.open;
  let gt = open.end.saturating_sub(1);

  if let Some(close) = tag.close {
    let before_gt = gt.checked_sub(1).and_then(|pos| char_at(text, pos));
    let slash = if before_gt.is_some_and(char_is_space) {
      "/"
    } else {
      " /"
    };
    let edits = vec![
      EditOperation::insert(gt, slash),
      EditOperation::delete(TextRange::new(open.end, close.end)),
    ];
    return (edits, Placement::caret(open.end));
  }

  let mut edits = vec![EditOperation::insert(open.end, format!("</{}>", tag.name))];
  if let Some(slash) = gt.checked_sub(1).filter(|&pos| char_at(text, pos) == Some('/')) {
    let start = match slash.checked_sub(1) {
      Some(pos) if char_at(text, pos).is_some_and(char_is_space) => pos,
      _ => slash,
    };
    edits.push(EditOperation::delete(TextRange::new(start, gt)));
  }
  (edits, Placement::caret(open.end))
}

/// Removes the tag but keeps its content.
///
/// Content spread over several lines is shifted back to the indentation of
/// the line the open tag was on.
pub fn remove_tag(text: RopeSlice, tag: &MatchedTag) -> TagEdit {
  let open = tag.open;
  let caret = Placement::caret(open.start);
  let Some(close) = tag.close else {
    return (vec![EditOperation::delete(open)], caret);
  };

  let inner = narrow_to_non_space(text, TextRange::new(open.end, close.start));
  if inner.is_empty() {
    return (
      vec![EditOperation::delete(TextRange::new(open.start, close.end))],
      caret,
    );
  }

  let mut edits = vec![
    EditOperation::delete(TextRange::new(open.start, inner.start)),
    EditOperation::delete(TextRange::new(inner.end, close.end)),
  ];

  let open_line = text.char_to_line(open.start);
  let close_line = text.char_to_line(close.end);
  if open_line != close_line {
    let base_indent = line_indent(&text, open_line);
    let inner_width = line_indent_width(&text, text.char_to_line(inner.start));
    edits.extend(reindent_lines(
      text,
      open_line + 2..close_line + 1,
      inner,
      inner_width,
      &base_indent,
    ));
  }

  (edits, caret)
}

/// Replaces the first `width` chars of every line in `lines` with `indent`
/// when they are all indentation. Only lines that survive the removal of
/// the tags (those inside `inner`) are touched.
fn reindent_lines(
  text: RopeSlice,
  lines: std::ops::Range<usize>,
  inner: TextRange,
  width: usize,
  indent: &str,
) -> Vec<EditOperation> {
  if width == 0 {
    return Vec::new();
  }

  let lines = lines.start.min(text.len_lines())..lines.end.min(text.len_lines());
  lines
    .filter_map(|line| {
      let start = text.line_to_char(line);
      let range = TextRange::new(start, start + width);
      let within_line = range.end <= line_end_char_index(&text, line);
      let survives = start >= inner.start && range.end <= inner.end;
      let indented = within_line && range.slice(text).chars().all(char_is_indent);
      (survives && indented).then(|| EditOperation::replace(range, indent))
    })
    .collect()
}

/// Jumps between the open and the close tag of the element at the caret.
///
/// Returns the new caret, or `None` when the tag has no close tag.
pub fn tag_pair_target(tag: &MatchedTag, caret: usize) -> Option<usize> {
  let close = tag.close?;
  if tag.open.contains_offset(caret) {
    Some(close.start)
  } else {
    Some(tag.open.start)
  }
}

/// Offset to query the tag matcher with for go-to-pair: a caret right in
/// front of `<` belongs to that tag.
pub fn tag_pair_query_offset(text: RopeSlice, caret: usize) -> usize {
  if char_at(text, caret) == Some('<') {
    caret + 1
  } else {
    caret
  }
}
