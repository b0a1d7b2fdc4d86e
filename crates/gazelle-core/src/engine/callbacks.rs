use super::offset::Offset;

/// A callback's verdict: keep going, or ask the engine to stop at its next
/// yield point. Stands in for the source's "distinguished sentinel"
/// return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
  Continue,
  Cancel,
}

/// A rule (RTN) entry or exit event, as seen by [`ParseCallbacks`].
#[derive(Debug, Clone, Copy)]
pub struct RuleEvent<'g> {
  pub rtn_name: &'g str,
  pub start_offset: Offset,
  /// The slot this rule fills in its caller, absent for the start rule.
  pub slot: Option<SlotRef<'g>>,
}

#[derive(Debug, Clone, Copy)]
pub struct SlotRef<'g> {
  pub slotname: &'g str,
  pub slotnum: u32,
}

/// A terminal as seen by [`ParseCallbacks::terminal`] or
/// [`ParseCallbacks::error_terminal`].
#[derive(Debug, Clone, Copy)]
pub struct TerminalEvent<'g> {
  pub name: &'g str,
  pub offset: Offset,
  pub len: u64,
  pub slot: Option<SlotRef<'g>>,
}

/// The capability record a bound grammar dispatches to. All methods are
/// no-ops by default; absent callbacks cost nothing at call sites. The
/// opaque `user_data` the source threads through a `void*` becomes the
/// generic `U` parameter here, owned by the [`super::ParseState`].
pub trait ParseCallbacks<U> {
  fn start_rule(&self, _user: &mut U, _event: &RuleEvent) -> CallbackOutcome {
    CallbackOutcome::Continue
  }

  fn end_rule(&self, _user: &mut U, _rtn_name: &str, _start_offset: Offset, _len: u64) -> CallbackOutcome {
    CallbackOutcome::Continue
  }

  fn terminal(&self, _user: &mut U, _event: &TerminalEvent) -> CallbackOutcome {
    CallbackOutcome::Continue
  }

  fn error_char(&self, _user: &mut U, _ch: u8, _offset: Offset) {}

  fn error_terminal(&self, _user: &mut U, _name: &str, _offset: Offset, _len: u64) {}
}

/// The default, silent callback set. Used when a caller does not need to
/// observe the parse at all (e.g. a pure validity check).
pub struct NoopCallbacks;

impl<U> ParseCallbacks<U> for NoopCallbacks {}
