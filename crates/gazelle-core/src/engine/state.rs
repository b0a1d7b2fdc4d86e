use super::callbacks::ParseCallbacks;
use super::frame::StackFrame;
use super::offset::{Offset, Terminal};
use crate::dynarray::DynArray;
use crate::grammar::Grammar;
use crate::limits::ParseLimits;

/// A grammar reference bundled with the callback set that will observe
/// any parse state built from it. Grammars are immutable and may be
/// shared by any number of bound grammars and parse states.
pub struct BoundGrammar<'g, C> {
  pub grammar: &'g Grammar,
  pub callbacks: C,
}

impl<'g, C> BoundGrammar<'g, C> {
  pub fn new(grammar: &'g Grammar, callbacks: C) -> Self {
    Self { grammar, callbacks }
  }
}

/// The live state of one parse in progress. Exclusively owned by its
/// caller; never shared across threads. Combines what the source splits
/// into `gzl_alloc_parse_state` and `gzl_init_parse_state`, since Rust
/// construction has no separate allocate-then-initialize step.
pub struct ParseState<'g, C, U> {
  pub(super) bound: BoundGrammar<'g, C>,
  pub(super) user_data: U,
  pub(super) offset: Offset,
  pub(super) open_terminal_offset: Offset,
  pub(super) prev_newline: Option<u8>,
  pub(super) stack: DynArray<StackFrame>,
  pub(super) token_buffer: DynArray<Terminal>,
  pub(super) limits: ParseLimits,
  pub(super) entered_gla: bool,
  pub(super) cancelled: bool,
}

impl<'g, C, U> ParseState<'g, C, U>
where
  C: ParseCallbacks<U>,
{
  pub fn new(bound: BoundGrammar<'g, C>, user_data: U, limits: ParseLimits) -> Self {
    Self {
      bound,
      user_data,
      offset: Offset::start(),
      open_terminal_offset: Offset::start(),
      prev_newline: None,
      stack: DynArray::new(),
      token_buffer: DynArray::new(),
      limits,
      entered_gla: false,
      cancelled: false,
    }
  }

  pub fn offset(&self) -> Offset {
    self.offset
  }

  pub fn open_terminal_offset(&self) -> Offset {
    self.open_terminal_offset
  }

  pub fn user_data(&self) -> &U {
    &self.user_data
  }

  pub fn user_data_mut(&mut self) -> &mut U {
    &mut self.user_data
  }

  pub fn grammar(&self) -> &'g Grammar {
    self.bound.grammar
  }

  /// True exactly when the parse has terminated at grammar-EOF (the
  /// stack is nonempty during any active parse).
  pub fn is_finished(&self) -> bool {
    self.stack.is_empty()
  }

  pub fn stack_depth(&self) -> usize {
    self.stack.len()
  }
}

impl<'g, C, U> ParseState<'g, C, U>
where
  C: ParseCallbacks<U> + Clone,
  U: Clone,
{
  /// Deep-copies the parse stack and token buffer so the original and the
  /// copy can diverge independently from this point on.
  pub fn try_clone(&self) -> Self {
    Self {
      bound: BoundGrammar { grammar: self.bound.grammar, callbacks: self.bound.callbacks.clone() },
      user_data: self.user_data.clone(),
      offset: self.offset,
      open_terminal_offset: self.open_terminal_offset,
      prev_newline: self.prev_newline,
      stack: self.stack.clone(),
      token_buffer: self.token_buffer.clone(),
      limits: self.limits,
      entered_gla: self.entered_gla,
      cancelled: self.cancelled,
    }
  }
}
