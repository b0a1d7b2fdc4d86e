use super::offset::Offset;
use crate::grammar::{GlaId, GlaStateId, IntFaId, IntFaStateId, RtnId, RtnStateId, RtnTransition};

/// One entry of the parse stack. The source discriminates frame kinds
/// with a tag plus a union; here each variant simply carries its own
/// state, so there is no cross-variant access to guard against.
#[derive(Debug, Clone)]
pub enum StackFrame {
  IntFa { start: Offset, intfa: IntFaId, state: IntFaStateId },
  Gla { start: Offset, gla: GlaId, state: GlaStateId },
  Rtn { start: Offset, rtn: RtnId, state: RtnStateId, transition: Option<RtnTransition> },
}

impl StackFrame {
  pub fn start(&self) -> Offset {
    match self {
      StackFrame::IntFa { start, .. } => *start,
      StackFrame::Gla { start, .. } => *start,
      StackFrame::Rtn { start, .. } => *start,
    }
  }

  pub fn as_rtn(&self) -> Option<(RtnId, RtnStateId, Option<RtnTransition>)> {
    match self {
      StackFrame::Rtn { rtn, state, transition, .. } => Some((*rtn, *state, *transition)),
      _ => None,
    }
  }

  pub fn as_rtn_mut(&mut self) -> Option<(&mut RtnStateId, &mut Option<RtnTransition>)> {
    match self {
      StackFrame::Rtn { state, transition, .. } => Some((state, transition)),
      _ => None,
    }
  }

  pub fn as_gla(&self) -> Option<(GlaId, GlaStateId)> {
    match self {
      StackFrame::Gla { gla, state, .. } => Some((*gla, *state)),
      _ => None,
    }
  }

  pub fn as_gla_mut(&mut self) -> Option<&mut GlaStateId> {
    match self {
      StackFrame::Gla { state, .. } => Some(state),
      _ => None,
    }
  }

  pub fn as_intfa(&self) -> Option<(IntFaId, IntFaStateId)> {
    match self {
      StackFrame::IntFa { intfa, state, .. } => Some((*intfa, *state)),
      _ => None,
    }
  }

  pub fn as_intfa_mut(&mut self) -> Option<&mut IntFaStateId> {
    match self {
      StackFrame::IntFa { state, .. } => Some(state),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn start_reads_back_regardless_of_variant() {
    let start = Offset { byte: 7, line: 1, column: 8 };
    let rtn = StackFrame::Rtn { start, rtn: RtnId(0), state: RtnStateId(0), transition: None };
    let gla = StackFrame::Gla { start, gla: GlaId(0), state: GlaStateId(0) };
    let intfa = StackFrame::IntFa { start, intfa: IntFaId(0), state: IntFaStateId(0) };
    assert_eq!(rtn.start(), start);
    assert_eq!(gla.start(), start);
    assert_eq!(intfa.start(), start);
  }

  #[test]
  fn as_accessors_only_match_their_own_variant() {
    let mut gla = StackFrame::Gla { start: Offset::start(), gla: GlaId(3), state: GlaStateId(1) };
    assert!(gla.as_rtn().is_none());
    assert!(gla.as_intfa().is_none());
    assert_eq!(gla.as_gla(), Some((GlaId(3), GlaStateId(1))));

    if let Some(state) = gla.as_gla_mut() {
      *state = GlaStateId(5);
    }
    assert_eq!(gla.as_gla(), Some((GlaId(3), GlaStateId(5))));
  }

  #[test]
  fn rtn_transition_round_trips_through_as_rtn_mut() {
    let mut rtn = StackFrame::Rtn { start: Offset::start(), rtn: RtnId(1), state: RtnStateId(0), transition: None };
    if let Some((state, transition)) = rtn.as_rtn_mut() {
      *state = RtnStateId(2);
      *transition = None;
    }
    let (rtn_id, state_id, transition) = rtn.as_rtn().unwrap();
    assert_eq!(rtn_id, RtnId(1));
    assert_eq!(state_id, RtnStateId(2));
    assert!(transition.is_none());
  }
}
