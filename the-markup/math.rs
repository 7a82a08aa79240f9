//! Evaluate the math expression left of the caret and replace it with its
//! value, e.g. `width: 100/3|` becomes `width: 33.3333|`.

use ropey::RopeSlice;
use the_core::line_ending::line_end_char_index;

use crate::{
  range::TextRange,
  selection::Range,
  transaction::{
    EditOperation,
    Placement,
  },
};

/// Finds and computes arithmetic expressions. Offsets are char offsets into
/// the line passed to [`MathEvaluator::extract`].
pub trait MathEvaluator {
  fn extract(&self, line: &str, column: usize) -> Option<TextRange>;

  fn evaluate(&self, expr: &str) -> Option<f64>;
}

/// Four fractional digits at most, no trailing zeros.
pub fn format_result(value: f64) -> String {
  let mut result = format!("{value:.4}");
  let trimmed = result.trim_end_matches('0').trim_end_matches('.').len();
  result.truncate(trimmed);
  if result == "-0" {
    result.remove(0);
  }
  result
}

/// Edits replacing the expression at the caret of `range` with its value.
/// The caret ends up after the value.
pub fn evaluate_math(
  text: RopeSlice,
  range: &Range,
  evaluator: &dyn MathEvaluator,
) -> Option<(Vec<EditOperation>, Placement)> {
  let line = text.char_to_line(range.head);
  let line_start = text.line_to_char(line);
  let content = text
    .slice(line_start..line_end_char_index(&text, line))
    .to_string();

  let expr = evaluator.extract(&content, range.head - line_start)?;
  let source: String = content
    .chars()
    .skip(expr.start)
    .take(expr.len())
    .collect();
  let value = evaluator.evaluate(&source)?;
  if !value.is_finite() {
    return None;
  }

  let result = format_result(value);
  tracing::trace!(%source, %result, "evaluate math");
  let target = TextRange::new(line_start + expr.start, line_start + expr.end);
  let len = result.chars().count();
  Some((vec![EditOperation::replace(target, result)], Placement::Relative {
    anchor: target.start,
    start:  len,
    end:    len,
  }))
}
