//! The parse engine proper: frame push/pop, epsilon descent, the lexer
//! tick and terminal routing, and the top-level `parse`/`finish_parse`
//! entry points. Grounded on the control flow of the historical
//! interpreter, rewired so that every input-dependent failure path
//! returns a status instead of asserting or exiting.

use super::callbacks::{CallbackOutcome, ParseCallbacks, RuleEvent, SlotRef, TerminalEvent};
use super::frame::StackFrame;
use super::offset::{Offset, Terminal, TerminalName};
use super::state::ParseState;
use super::status::ParseStatus;
use crate::grammar::{GlaState, IntFaId, IntFaStateId, Lookahead, RtnId, RtnTransition, TerminalKey};

/// Internal control-flow signal raised by a fallible step. Folded into a
/// [`ParseStatus`] at the top of `parse`/`finish_parse`; never escapes this
/// module.
enum Signal {
  Cancelled,
  Error,
  ResourceLimitExceeded,
}

impl Signal {
  fn into_status(self) -> ParseStatus {
    match self {
      Signal::Cancelled => ParseStatus::Cancelled,
      Signal::Error => ParseStatus::Error,
      Signal::ResourceLimitExceeded => ParseStatus::ResourceLimitExceeded,
    }
  }
}

type Step<T> = Result<T, Signal>;

enum Descend {
  Continue,
  HardEof,
}

enum DoIntFa {
  Continue,
  HardEof,
}

enum ProcessTerminal {
  Continue,
  HardEof,
}

impl<'g, C, U> ParseState<'g, C, U>
where
  C: ParseCallbacks<U>,
{
  fn check_stack_limit(&self) -> Step<()> {
    if self.stack.len() >= self.limits.max_stack_depth() {
      tracing::warn!(depth = self.stack.len(), "stack depth limit exceeded");
      return Err(Signal::ResourceLimitExceeded);
    }
    Ok(())
  }

  fn check_lookahead_limit(&self) -> Step<()> {
    if self.token_buffer.len() >= self.limits.max_lookahead() {
      tracing::warn!(len = self.token_buffer.len(), "lookahead limit exceeded");
      return Err(Signal::ResourceLimitExceeded);
    }
    Ok(())
  }

  fn apply_outcome(&mut self, outcome: CallbackOutcome) -> Step<()> {
    if outcome == CallbackOutcome::Cancel {
      self.cancelled = true;
      return Err(Signal::Cancelled);
    }
    Ok(())
  }

  /// The slot this state's top frame fills in its caller: the transition
  /// recorded on the frame just below it, if any.
  fn parent_slot(&self) -> Option<SlotRef<'g>> {
    let len = self.stack.len();
    if len < 2 {
      return None;
    }
    let (_, _, transition) = self.stack.get(len - 2)?.as_rtn()?;
    let t = transition?;
    Some(SlotRef { slotname: self.grammar().string_str(t.slotname()), slotnum: t.slotnum() })
  }

  // ---- 4.3.1 frame operations ----

  fn push_intfa(&mut self, intfa: IntFaId, start: Offset) -> Step<()> {
    self.check_stack_limit()?;
    let state = self.grammar().intfa(intfa).start_state();
    self.stack.push(StackFrame::IntFa { start, intfa, state });
    Ok(())
  }

  fn push_gla(&mut self, gla: crate::grammar::GlaId, start: Offset) -> Step<()> {
    self.check_stack_limit()?;
    let state = self.grammar().gla(gla).start_state();
    self.stack.push(StackFrame::Gla { start, gla, state });
    Ok(())
  }

  fn push_rtn(&mut self, rtn: RtnId, start: Offset) -> Step<()> {
    self.check_stack_limit()?;
    let state = self.grammar().rtn(rtn).start_state();
    self.stack.push(StackFrame::Rtn { start, rtn, state, transition: None });
    self.fire_start_rule()
  }

  fn push_rtn_for_transition(&mut self, t: RtnTransition, start: Offset) -> Step<()> {
    if let Some((_, transition)) = self.stack.top_mut().and_then(StackFrame::as_rtn_mut) {
      *transition = Some(t);
    } else {
      debug_assert!(false, "push_rtn_for_transition requires an RTN frame on top");
    }
    let target = match t {
      RtnTransition::Nonterminal { target, .. } => target,
      RtnTransition::Terminal { .. } => {
        debug_assert!(false, "push_rtn_for_transition requires a nonterminal transition");
        return Ok(());
      }
    };
    self.push_rtn(target, start)
  }

  fn pop_intfa(&mut self) {
    debug_assert!(matches!(self.stack.top(), Some(StackFrame::IntFa { .. })));
    self.stack.pop();
  }

  fn pop_gla(&mut self) {
    debug_assert!(matches!(self.stack.top(), Some(StackFrame::Gla { .. })));
    self.stack.pop();
  }

  fn pop_rtn(&mut self) -> Step<()> {
    let (rtn, start) = match self.stack.top().and_then(StackFrame::as_rtn) {
      Some((rtn, _, _)) => (rtn, self.stack.top().unwrap().start()),
      None => {
        debug_assert!(false, "pop_rtn requires an RTN frame on top");
        return Ok(());
      }
    };
    let rtn_name = self.grammar().string_str(self.grammar().rtn(rtn).name);
    let len = self.offset.byte.saturating_sub(start.byte);
    let outcome = self.bound.callbacks.end_rule(&mut self.user_data, rtn_name, start, len);
    self.stack.pop();
    if let Some((state, transition)) = self.stack.top_mut().and_then(StackFrame::as_rtn_mut) {
      if let Some(t) = transition {
        *state = t.dest();
      }
    }
    self.apply_outcome(outcome)
  }

  fn fire_start_rule(&mut self) -> Step<()> {
    let (rtn, start) = match self.stack.top().and_then(StackFrame::as_rtn) {
      Some((rtn, _, _)) => (rtn, self.stack.top().unwrap().start()),
      None => unreachable!("fire_start_rule is only called right after pushing an RTN frame"),
    };
    let rtn_name = self.grammar().string_str(self.grammar().rtn(rtn).name);
    let slot = self.parent_slot();
    let event = RuleEvent { rtn_name, start_offset: start, slot };
    let outcome = self.bound.callbacks.start_rule(&mut self.user_data, &event);
    self.apply_outcome(outcome)
  }

  fn fire_error_char(&mut self, ch: u8) {
    self.bound.callbacks.error_char(&mut self.user_data, ch, self.offset);
  }

  fn fire_error_terminal(&mut self, name: crate::grammar::StringId, offset: Offset, len: u64) {
    let name_str = self.grammar().string_str(name);
    self.bound.callbacks.error_terminal(&mut self.user_data, name_str, offset, len);
  }

  // ---- 4.3.2 epsilon descent ----

  fn descend_to_gla(&mut self, start: Offset) -> Step<Descend> {
    self.entered_gla = false;
    loop {
      let (rtn, rtn_state_id) = match self.stack.top().and_then(StackFrame::as_rtn) {
        Some((rtn, state, _)) => (rtn, state),
        None => return Ok(Descend::Continue),
      };
      let rtn_state = self.grammar().rtn(rtn).state(rtn_state_id);
      match rtn_state.lookahead {
        Lookahead::HasIntFa(_) => return Ok(Descend::Continue),
        Lookahead::HasGla(gla) => {
          self.push_gla(gla, start)?;
          self.entered_gla = true;
          return Ok(Descend::Continue);
        }
        Lookahead::HasNeither => {
          debug_assert!(rtn_state.transitions.len() < 2, "a HAS_NEITHER state must have 0 or 1 transitions");
          if rtn_state.transitions.is_empty() {
            self.pop_rtn()?;
            if self.stack.is_empty() {
              return Ok(Descend::HardEof);
            }
          } else {
            let t = rtn_state.transitions[0];
            debug_assert!(matches!(t, RtnTransition::Nonterminal { .. }));
            self.push_rtn_for_transition(t, start)?;
          }
        }
      }
    }
  }

  fn push_intfa_for_current_top(&mut self, start: Offset) -> Step<()> {
    match self.stack.top() {
      Some(StackFrame::Gla { .. }) => {
        let (gla, state) = self.stack.top().and_then(StackFrame::as_gla).unwrap();
        match self.grammar().gla(gla).state(state) {
          GlaState::NonFinal { intfa, .. } => {
            let intfa = *intfa;
            self.push_intfa(intfa, start)
          }
          GlaState::Final { .. } => unreachable!("cannot lex from a final GLA state"),
        }
      }
      Some(StackFrame::Rtn { .. }) => {
        let (rtn, state, _) = self.stack.top().and_then(StackFrame::as_rtn).unwrap();
        match self.grammar().rtn(rtn).state(state).lookahead {
          Lookahead::HasIntFa(intfa) => self.push_intfa(intfa, start),
          _ => unreachable!("push_intfa_for_current_top requires a HAS_INTFA state"),
        }
      }
      _ => unreachable!("push_intfa_for_current_top requires a GLA or RTN frame on top"),
    }
  }

  // ---- 4.3.3 lexer tick ----

  fn do_intfa_transition(&mut self, ch: u8) -> Step<DoIntFa> {
    let (intfa, state_id, frame_start) = self.stack.top().and_then(StackFrame::as_intfa).map(|(intfa, state)| {
      (intfa, state, self.stack.top().unwrap().start())
    }).expect("do_intfa_transition requires an IntFA frame on top");

    let mut dest = self.grammar().intfa(intfa).find_transition(state_id, ch);

    if dest.is_none() {
      let accept = self.grammar().intfa(intfa).state(state_id).accept;
      let accept = match accept {
        Some(name) => name,
        None => {
          self.fire_error_char(ch);
          return Err(Signal::Error);
        }
      };
      let len = self.offset.byte.saturating_sub(frame_start.byte);
      match self.process_terminal(Some(accept), frame_start, len)? {
        ProcessTerminal::HardEof => return Ok(DoIntFa::HardEof),
        ProcessTerminal::Continue => {}
      }
      let (intfa2, state2) = self.stack.top().and_then(StackFrame::as_intfa).expect("process_terminal leaves an IntFA frame on top when it does not report hard EOF");
      dest = self.grammar().intfa(intfa2).find_transition(state2, ch);
    }

    let dest = match dest {
      Some(d) => d,
      None => {
        self.fire_error_char(ch);
        return Err(Signal::Error);
      }
    };

    self.offset.advance(ch, &mut self.prev_newline);

    if let Some(state) = self.stack.top_mut().and_then(StackFrame::as_intfa_mut) {
      *state = dest;
    }

    let (cur_intfa, cur_state_id, cur_start) = self
      .stack
      .top()
      .and_then(StackFrame::as_intfa)
      .map(|(intfa, state)| (intfa, state, self.stack.top().unwrap().start()))
      .unwrap();
    let cur_state = self.grammar().intfa(cur_intfa).state(cur_state_id);
    if let Some(name) = cur_state.accept {
      if cur_state.transitions.is_empty() {
        let len = self.offset.byte.saturating_sub(cur_start.byte);
        match self.process_terminal(Some(name), cur_start, len)? {
          ProcessTerminal::HardEof => return Ok(DoIntFa::HardEof),
          ProcessTerminal::Continue => {}
        }
      }
    }

    Ok(DoIntFa::Continue)
  }

  // ---- 4.3.4 terminal routing ----

  fn process_terminal(&mut self, name: Option<crate::grammar::StringId>, start: Offset, len: u64) -> Step<ProcessTerminal> {
    self.pop_intfa();
    self.check_lookahead_limit()?;

    let term_name = name.map(TerminalName::Named).unwrap_or(TerminalName::Eof);
    let gla_cursor_init = self.token_buffer.len();
    self.token_buffer.push(Terminal { name: term_name, offset: start, len, end: self.offset });

    let mut rtn_cursor = 0usize;
    let mut gla_cursor = gla_cursor_init;
    let mut hard_eof = false;

    loop {
      let rtn_active = matches!(self.stack.top(), Some(StackFrame::Rtn { .. })) && rtn_cursor < self.token_buffer.len();
      let gla_active = matches!(self.stack.top(), Some(StackFrame::Gla { .. })) && gla_cursor < self.token_buffer.len();
      if !rtn_active && !gla_active {
        break;
      }

      if rtn_active {
        let term = *self.token_buffer.get(rtn_cursor).unwrap();
        rtn_cursor += 1;
        if let TerminalName::Named(tname) = term.name {
          let (rtn, state_id, _) = self.stack.top().and_then(StackFrame::as_rtn).unwrap();
          if self.grammar().rtn(rtn).ignores(tname) {
            self.open_terminal_offset = term.end;
          } else {
            let transition = self.grammar().rtn(rtn).state(state_id).find_terminal_transition(tname).copied();
            let t = match transition {
              Some(t) => t,
              None => {
                self.fire_error_terminal(tname, term.offset, term.len);
                return Err(Signal::Error);
              }
            };
            self.do_rtn_terminal_transition(t, term)?;
            self.open_terminal_offset = term.end;
          }
        }
      } else {
        let term = *self.token_buffer.get(gla_cursor).unwrap();
        gla_cursor += 1;
        self.do_gla_transition(term, &mut rtn_cursor)?;
      }

      match self.descend_to_gla(self.offset)? {
        Descend::HardEof => {
          hard_eof = true;
        }
        Descend::Continue => {}
      }
      if self.entered_gla {
        gla_cursor = rtn_cursor;
      }
      if hard_eof {
        break;
      }
    }

    if rtn_cursor < self.token_buffer.len() && matches!(self.token_buffer.get(rtn_cursor).unwrap().name, TerminalName::Eof) {
      rtn_cursor += 1;
    }

    let remaining = self.token_buffer.len() - rtn_cursor;
    self.token_buffer.drain_before(rtn_cursor);

    if hard_eof {
      debug_assert_eq!(remaining, 0, "a hard EOF mid-replay should leave no buffered terminals behind");
      self.open_terminal_offset = self.offset;
      return Ok(ProcessTerminal::HardEof);
    }

    self.open_terminal_offset = self.token_buffer.get(0).map(|t| t.offset).unwrap_or(self.offset);

    self.push_intfa_for_current_top(self.offset)?;
    Ok(ProcessTerminal::Continue)
  }

  fn do_rtn_terminal_transition(&mut self, t: RtnTransition, term: Terminal) -> Step<()> {
    if let Some((_, transition)) = self.stack.top_mut().and_then(StackFrame::as_rtn_mut) {
      *transition = Some(t);
    }
    let name = match term.name {
      TerminalName::Named(n) => self.grammar().string_str(n),
      TerminalName::Eof => unreachable!("RTNs never consume the EOF sentinel"),
    };
    let slot = SlotRef { slotname: self.grammar().string_str(t.slotname()), slotnum: t.slotnum() };
    let event = TerminalEvent { name, offset: term.offset, len: term.len, slot: Some(slot) };
    let outcome = self.bound.callbacks.terminal(&mut self.user_data, &event);
    if let Some((state, _)) = self.stack.top_mut().and_then(StackFrame::as_rtn_mut) {
      *state = t.dest();
    }
    self.apply_outcome(outcome)
  }

  fn do_gla_transition(&mut self, term: Terminal, rtn_cursor: &mut usize) -> Step<()> {
    let (gla, state_id) = self.stack.top().and_then(StackFrame::as_gla).expect("do_gla_transition requires a GLA frame on top");
    let key = match term.name {
      TerminalName::Named(n) => TerminalKey::Named(n),
      TerminalName::Eof => TerminalKey::EndOfInput,
    };
    let dest = match self.grammar().gla(gla).state(state_id) {
      GlaState::NonFinal { transitions, .. } => transitions.iter().find(|tr| tr.terminal == key).map(|tr| tr.dest),
      GlaState::Final { .. } => unreachable!("do_gla_transition requires a nonfinal GLA state"),
    };
    let dest = dest.expect("the GLA's lookahead guarantees a transition exists for the terminal just produced");

    if let Some(state) = self.stack.top_mut().and_then(StackFrame::as_gla_mut) {
      *state = dest;
    }

    let dest_state = self.grammar().gla(gla).state(dest);
    if let GlaState::Final { transition_offset } = dest_state {
      let transition_offset = *transition_offset;
      self.pop_gla();
      if transition_offset == 0 {
        self.pop_rtn()?;
      } else {
        let t = {
          let (rtn, state_id, _) = self.stack.top().and_then(StackFrame::as_rtn).expect("a GLA final state always resumes into an RTN frame");
          *self.grammar().rtn(rtn).state(state_id).nth_transition(transition_offset).expect("the GLA's transition_offset names a transition of the current RTN state")
        };
        match t {
          RtnTransition::Terminal { name, .. } => {
            let next_term = *self.token_buffer.get(*rtn_cursor).expect("the token buffer still holds the terminal the GLA just decided on");
            *rtn_cursor += 1;
            debug_assert!(matches!(next_term.name, TerminalName::Named(n) if n == name));
            self.do_rtn_terminal_transition(t, next_term)?;
          }
          RtnTransition::Nonterminal { .. } => {
            let next_term = *self.token_buffer.get(*rtn_cursor).expect("the token buffer still holds the lookahead terminal for the nonterminal transition");
            self.push_rtn_for_transition(t, next_term.offset)?;
          }
        }
      }
    }
    Ok(())
  }

  // ---- 4.3.5 initial and final phases ----

  fn initialize(&mut self) -> Step<Descend> {
    self.push_rtn(self.grammar().start_rtn(), Offset::start())?;
    let outcome = self.descend_to_gla(Offset::start())?;
    if matches!(outcome, Descend::Continue) {
      self.push_intfa_for_current_top(self.offset)?;
    }
    Ok(outcome)
  }

  /// Feeds `bytes` to the engine, continuing any parse already in
  /// progress. Returns as soon as a terminal state (error, cancellation,
  /// resource limit, or grammar EOF) is reached; otherwise consumes the
  /// whole slice and returns `Ok`.
  pub fn parse(&mut self, bytes: &[u8]) -> ParseStatus {
    if self.cancelled {
      return ParseStatus::Cancelled;
    }
    if self.stack.is_empty() {
      if self.offset.byte != 0 {
        return ParseStatus::HardEof;
      }
      match self.initialize() {
        Ok(Descend::HardEof) => return ParseStatus::HardEof,
        Ok(Descend::Continue) => {}
        Err(sig) => return sig.into_status(),
      }
    }

    for &byte in bytes {
      match self.do_intfa_transition(byte) {
        Ok(DoIntFa::Continue) => {}
        Ok(DoIntFa::HardEof) => return ParseStatus::HardEof,
        Err(sig) => {
          tracing::debug!(offset = self.offset.byte, "parse error");
          return sig.into_status();
        }
      }
    }

    ParseStatus::Ok
  }

  /// Completes the parse at end-of-input. Returns `false` if the current
  /// state does not admit EOF (an open lexeme mid-match, an open GLA with
  /// no EOF transition, or a non-final RTN chain).
  pub fn finish_parse(&mut self) -> bool {
    match self.stack.top().cloned() {
      Some(StackFrame::IntFa { intfa, state, start }) => {
        let intfa_def = self.grammar().intfa(intfa);
        let is_start = state == intfa_def.start_state();
        let cur = intfa_def.state(state);
        if cur.is_accepting() && is_start {
          debug_assert!(false, "an IntFA state cannot be simultaneously the start state and an accept state");
          return false;
        } else if cur.is_accepting() {
          let name = cur.accept.unwrap();
          let len = self.offset.byte.saturating_sub(start.byte);
          match self.process_terminal(Some(name), start, len) {
            Ok(ProcessTerminal::Continue) => self.pop_intfa(),
            Ok(ProcessTerminal::HardEof) => {}
            Err(_) => {}
          }
        } else if is_start {
          self.pop_intfa();
        } else {
          return false;
        }
      }
      _ => {}
    }

    match self.stack.top().cloned() {
      Some(StackFrame::Gla { gla, state, .. }) => {
        let gla_def = self.grammar().gla(gla);
        if state == gla_def.start_state() {
          self.pop_gla();
        } else {
          let has_eof = match gla_def.state(state) {
            GlaState::NonFinal { transitions, .. } => transitions.iter().any(|t| t.terminal == TerminalKey::EndOfInput),
            GlaState::Final { .. } => false,
          };
          if !has_eof {
            return false;
          }
          self.stack.push(StackFrame::IntFa { start: self.offset, intfa: IntFaId(0), state: IntFaStateId(0) });
          if self.process_terminal(None, self.offset, 0).is_err() {
            return false;
          }
          loop {
            match self.stack.top() {
              Some(StackFrame::IntFa { .. }) => self.pop_intfa(),
              Some(StackFrame::Gla { .. }) => self.pop_gla(),
              _ => break,
            }
          }
        }
      }
      _ => {}
    }

    if self.stack.is_empty() {
      return true;
    }

    let len = self.stack.len();
    for i in 0..len - 1 {
      match self.stack.get(i).and_then(StackFrame::as_rtn) {
        Some((rtn, _, Some(t))) => {
          if !self.grammar().rtn(rtn).state(t.dest()).is_final {
            return false;
          }
        }
        _ => return false,
      }
    }
    match self.stack.get(len - 1).and_then(StackFrame::as_rtn) {
      Some((rtn, state, _)) if self.grammar().rtn(rtn).state(state).is_final => {}
      _ => return false,
    }

    while !self.stack.is_empty() {
      if self.pop_rtn().is_err() {
        break;
      }
    }
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::{Grammar, IntFa, IntFaId, IntFaState, IntFaStateId, IntFaTransition, Lookahead, Rtn, RtnId, RtnState, RtnTransition, RtnStateId, StringTable};
  use crate::limits::ParseLimits;

  struct Recorder;

  impl ParseCallbacks<Vec<String>> for Recorder {
    fn start_rule(&self, user: &mut Vec<String>, event: &RuleEvent) -> CallbackOutcome {
      user.push(format!("start:{}", event.rtn_name));
      CallbackOutcome::Continue
    }

    fn end_rule(&self, user: &mut Vec<String>, rtn_name: &str, _start_offset: Offset, _len: u64) -> CallbackOutcome {
      user.push(format!("end:{rtn_name}"));
      CallbackOutcome::Continue
    }
  }

  struct CancelOnFirstRule;

  impl ParseCallbacks<Vec<String>> for CancelOnFirstRule {
    fn start_rule(&self, user: &mut Vec<String>, event: &RuleEvent) -> CallbackOutcome {
      user.push(format!("start:{}", event.rtn_name));
      CallbackOutcome::Cancel
    }
  }

  /// `S := S`, an unconditional left-recursive nonterminal transition that
  /// never consumes a byte. Exercises `check_stack_limit` without needing
  /// any input.
  fn self_recursive_grammar() -> Grammar {
    let mut strings = StringTable::new();
    let s_name = strings.push(b"S".to_vec());
    let slot = strings.push(b"".to_vec());
    let s = Rtn {
      name: s_name,
      num_slots: 1,
      ignore: vec![],
      states: vec![RtnState {
        is_final: false,
        lookahead: Lookahead::HasNeither,
        transitions: vec![RtnTransition::Nonterminal { target: RtnId(0), dest: RtnStateId(0), slotname: slot, slotnum: 0 }],
      }],
    };
    Grammar { strings, intfas: vec![], glas: vec![], rtns: vec![s] }
  }

  /// `S := IDENT`, identical in shape to the integration suite's grammar of
  /// the same name but kept local so this module does not depend on the
  /// `tests/` crate-level suite.
  fn single_ident_grammar() -> Grammar {
    let mut strings = StringTable::new();
    let s_name = strings.push(b"S".to_vec());
    let ident = strings.push(b"IDENT".to_vec());
    let slot = strings.push(b"".to_vec());
    let intfa = IntFa {
      states: vec![
        IntFaState { accept: None, transitions: vec![IntFaTransition { low: b'a', high: b'z', dest: IntFaStateId(1) }] },
        IntFaState { accept: Some(ident), transitions: vec![IntFaTransition { low: b'a', high: b'z', dest: IntFaStateId(1) }] },
      ],
    };
    let s = Rtn {
      name: s_name,
      num_slots: 1,
      ignore: vec![],
      states: vec![
        RtnState {
          is_final: false,
          lookahead: Lookahead::HasIntFa(IntFaId(0)),
          transitions: vec![RtnTransition::Terminal { name: ident, dest: RtnStateId(1), slotname: slot, slotnum: 0 }],
        },
        RtnState { is_final: true, lookahead: Lookahead::HasNeither, transitions: vec![] },
      ],
    };
    Grammar { strings, intfas: vec![intfa], glas: vec![], rtns: vec![s] }
  }

  #[test]
  fn stack_depth_limit_stops_unbounded_recursive_descent() {
    let grammar = self_recursive_grammar();
    let limits = ParseLimits::builder().max_stack_depth(3).build();
    let mut state = ParseState::new(crate::engine::BoundGrammar::new(&grammar, Recorder), Vec::new(), limits);

    let status = state.parse(b"");

    assert_eq!(status, ParseStatus::ResourceLimitExceeded);
    assert_eq!(state.user_data(), &vec!["start:S".to_string(); 3]);
    assert_eq!(state.stack_depth(), 3);
  }

  #[test]
  fn a_byte_with_no_transition_from_a_non_accepting_state_is_a_lexical_error() {
    let grammar = single_ident_grammar();
    let mut state = ParseState::new(crate::engine::BoundGrammar::new(&grammar, Recorder), Vec::new(), ParseLimits::default());

    let status = state.parse(b"1");

    assert_eq!(status, ParseStatus::Error);
    assert_eq!(state.user_data(), &vec!["start:S".to_string()]);
  }

  #[test]
  fn a_cancelling_callback_stops_the_parse_without_finishing() {
    let grammar = single_ident_grammar();
    let mut state = ParseState::new(crate::engine::BoundGrammar::new(&grammar, CancelOnFirstRule), Vec::new(), ParseLimits::default());

    assert_eq!(state.parse(b"abc"), ParseStatus::Cancelled);
    assert_eq!(state.parse(b"abc"), ParseStatus::Cancelled);
    assert_eq!(state.user_data(), &vec!["start:S".to_string()]);
  }
}
