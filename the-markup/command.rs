//! Markup commands and their dispatch against a [`Buffer`].
//!
//! Every command reads one snapshot of the buffer, works out the result for
//! each cursor independently and then either installs a new selection or
//! applies a single transaction, which is one undo step.

use ropey::RopeSlice;
use thiserror::Error;

use crate::{
  abbreviation::{
    AbbreviationExpander,
    Diagnostic,
    ExpandError,
    ExpansionCache,
    expand_abbreviation,
    wrap_with_abbreviation,
  },
  balance::{
    BalanceDirection,
    balance,
  },
  buffer::{
    Buffer,
    BufferError,
  },
  config::Config,
  edit_point::find_edit_point,
  matcher::{
    CssMatcher,
    ItemMatcher,
    MatchedTag,
    TagMatcher,
  },
  math::{
    MathEvaluator,
    evaluate_math,
  },
  movement::Direction,
  number::increment_number,
  select_item::select_item,
  selection::{
    Range,
    Selection,
  },
  syntax::{
    Syntax,
    SyntaxResolver,
  },
  tag::{
    TagEdit,
    remove_tag,
    split_join,
    tag_context,
    tag_pair_query_offset,
    tag_pair_target,
  },
  transaction::{
    Transaction,
    TransactionError,
  },
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommandError {
  #[error(transparent)]
  Buffer(#[from] BufferError),
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

pub type Result<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementStep {
  Small,
  Normal,
  Large,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  BalanceInward,
  BalanceOutward,
  SplitJoinTag,
  RemoveTag,
  /// Add the delta to the number at each cursor.
  IncrementNumber(f64),
  GoToEditPoint(Direction),
  SelectItem(Direction),
  GoToTagPair,
  EvaluateMath,
  ExpandAbbreviation,
  WrapWithAbbreviation(String),
}

impl Command {
  /// Increment (or decrement, going backward) by a configured step.
  pub fn increment(step: IncrementStep, direction: Direction, config: &Config) -> Self {
    let amount = match step {
      IncrementStep::Small => config.increment.small,
      IncrementStep::Normal => config.increment.normal,
      IncrementStep::Large => config.increment.large,
    };
    let delta = match direction {
      Direction::Forward => amount,
      Direction::Backward => -amount,
    };
    Self::IncrementNumber(delta)
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::BalanceInward => "balance-inward",
      Self::BalanceOutward => "balance-outward",
      Self::SplitJoinTag => "split-join-tag",
      Self::RemoveTag => "remove-tag",
      Self::IncrementNumber(_) => "increment-number",
      Self::GoToEditPoint(_) => "go-to-edit-point",
      Self::SelectItem(_) => "select-item",
      Self::GoToTagPair => "go-to-tag-pair",
      Self::EvaluateMath => "evaluate-math",
      Self::ExpandAbbreviation => "expand-abbreviation",
      Self::WrapWithAbbreviation(_) => "wrap-with-abbreviation",
    }
  }
}

/// The structural engines commands delegate to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
  pub tags:     &'a dyn TagMatcher,
  pub css:      &'a dyn CssMatcher,
  pub items:    &'a dyn ItemMatcher,
  pub math:     &'a dyn MathEvaluator,
  pub expander: &'a dyn AbbreviationExpander,
  pub syntax:   &'a dyn SyntaxResolver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Nothing applied: no structure at the cursors, or nothing to do.
  Unchanged,
  Applied,
  /// The user's input could not be expanded. Nothing was applied.
  Failed(Diagnostic),
}

struct Context<'a> {
  text:   RopeSlice<'a>,
  env:    &'a Collaborators<'a>,
  config: &'a Config,
}

impl Context<'_> {
  fn syntax_at(&self, offset: usize) -> Syntax {
    self.env.syntax.syntax_at(self.text, offset)
  }

  /// The syntax tag matching runs in: markup is matched as XML when the
  /// config asks for it.
  fn matching_syntax_at(&self, offset: usize) -> Syntax {
    let syntax = self.syntax_at(offset);
    if self.config.markup.xml && syntax.is_html() && !syntax.is_xml() {
      Syntax::Xml
    } else {
      syntax
    }
  }

  fn tag_edit(&self, range: &Range, edit: fn(RopeSlice, &MatchedTag) -> TagEdit) -> Option<TagEdit> {
    let pos = range.from();
    let syntax = self.matching_syntax_at(pos);
    if !syntax.is_html() {
      return None;
    }
    let tag = tag_context(self.text, pos, syntax.is_xml(), self.env.tags)?;
    Some(edit(self.text, &tag))
  }

  fn tag_pair(&self, range: Range) -> Option<Range> {
    let pos = tag_pair_query_offset(self.text, range.head);
    let syntax = self.matching_syntax_at(pos);
    if !syntax.is_html() {
      return None;
    }
    let tag = tag_context(self.text, pos, syntax.is_xml(), self.env.tags)?;
    tag_pair_target(&tag, pos).map(Range::point)
  }
}

/// Moves every range with `f`; `None` when no range moved.
fn move_ranges(selection: &Selection, mut f: impl FnMut(Range) -> Option<Range>) -> Option<Selection> {
  let mut changed = false;
  let next = selection.clone().transform(|range| {
    match f(range).filter(|target| *target != range) {
      Some(target) => {
        changed = true;
        target
      },
      None => range,
    }
  });
  changed.then_some(next)
}

fn select<B>(buffer: &mut B, selection: Option<Selection>) -> Result<Outcome>
where
  B: Buffer + ?Sized,
{
  match selection {
    Some(selection) => {
      buffer.set_selection(selection)?;
      Ok(Outcome::Applied)
    },
    None => Ok(Outcome::Unchanged),
  }
}

fn commit<B>(buffer: &mut B, transaction: Option<Transaction>) -> Result<Outcome>
where
  B: Buffer + ?Sized,
{
  match transaction {
    Some(transaction) => {
      buffer.apply(&transaction)?;
      Ok(Outcome::Applied)
    },
    None => Ok(Outcome::Unchanged),
  }
}

/// Runs a fallible per-cursor expansion. The first error aborts the whole
/// command before anything is applied.
fn commit_expansions<B, F>(buffer: &mut B, selection: &Selection, mut f: F) -> Result<Outcome>
where
  B: Buffer + ?Sized,
  F: FnMut(&Range) -> std::result::Result<Option<TagEdit>, ExpandError>,
{
  let doc = buffer.text().clone();
  let mut failure = None;
  let transaction = Transaction::from_cursor_edits(&doc, selection, |range| {
    if failure.is_some() {
      return None;
    }
    f(range).unwrap_or_else(|err| {
      failure = Some(err);
      None
    })
  })?;

  if let Some(err) = failure {
    tracing::warn!(pos = ?err.pos, "failed to expand abbreviation: {err}");
    return Ok(Outcome::Failed(Diagnostic::from(&err)));
  }
  commit(buffer, transaction)
}

/// Runs `command` on `buffer`.
pub fn execute<B>(
  buffer: &mut B,
  command: &Command,
  env: &Collaborators<'_>,
  config: &Config,
  cache: &mut ExpansionCache,
) -> Result<Outcome>
where
  B: Buffer + ?Sized,
{
  let doc = buffer.text().clone();
  let selection = buffer.selection().clone();
  let cx = Context {
    text: doc.slice(..),
    env,
    config,
  };
  let text = cx.text;

  let outcome = match command {
    Command::BalanceInward | Command::BalanceOutward => {
      let direction = match command {
        Command::BalanceInward => BalanceDirection::Inward,
        _ => BalanceDirection::Outward,
      };
      let syntax = cx.matching_syntax_at(selection.primary().head);
      let next = balance(text, &selection, syntax, direction, env.tags, env.css);
      select(buffer, next)?
    },
    Command::SelectItem(direction) => {
      let syntax = cx.syntax_at(selection.primary().head);
      let next = select_item(
        text,
        &selection,
        syntax,
        *direction,
        config.select_item_wrap,
        env.items,
      );
      select(buffer, next)?
    },
    Command::GoToEditPoint(direction) => {
      let next = move_ranges(&selection, |range| {
        find_edit_point(text, range.head, *direction).map(Range::point)
      });
      select(buffer, next)?
    },
    Command::GoToTagPair => {
      let next = move_ranges(&selection, |range| cx.tag_pair(range));
      select(buffer, next)?
    },
    Command::SplitJoinTag => {
      let tx = Transaction::from_cursor_edits(&doc, &selection, |range| {
        cx.tag_edit(range, split_join)
      })?;
      commit(buffer, tx)?
    },
    Command::RemoveTag => {
      let tx = Transaction::from_cursor_edits(&doc, &selection, |range| {
        cx.tag_edit(range, remove_tag)
      })?;
      commit(buffer, tx)?
    },
    Command::IncrementNumber(delta) => {
      let tx = Transaction::from_cursor_edits(&doc, &selection, |range| {
        increment_number(text, range, *delta, config.number_precision)
      })?;
      commit(buffer, tx)?
    },
    Command::EvaluateMath => {
      let tx = Transaction::from_cursor_edits(&doc, &selection, |range| {
        evaluate_math(text, range, env.math)
      })?;
      commit(buffer, tx)?
    },
    Command::ExpandAbbreviation => {
      commit_expansions(buffer, &selection, |range| {
        let syntax = cx.syntax_at(range.head);
        expand_abbreviation(text, range, syntax, config, env.expander, cache)
      })?
    },
    Command::WrapWithAbbreviation(abbreviation) => {
      commit_expansions(buffer, &selection, |range| {
        let syntax = cx.syntax_at(range.from());
        wrap_with_abbreviation(
          text,
          range,
          abbreviation,
          syntax,
          config,
          env.tags,
          env.expander,
          cache,
        )
      })?
    },
  };

  tracing::debug!(command = command.name(), ?outcome, "markup command");
  Ok(outcome)
}
