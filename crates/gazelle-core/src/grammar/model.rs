//! The immutable grammar image: strings, IntFAs, GLAs and RTNs, consumed
//! read-only by the parse engine. Built exclusively by
//! [`super::loader::load_grammar`].

use super::ids::{GlaId, GlaStateId, IntFaId, IntFaStateId, RtnId, RtnStateId, StringId};

/// A grammar-wide table of interned byte strings. Terminal names, rule
/// names and slot names are all indices into this table, so equality of
/// two names is equality of their [`StringId`], never a byte comparison.
#[derive(Debug, Default)]
pub struct StringTable {
  strings: Vec<Vec<u8>>,
}

impl StringTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, bytes: Vec<u8>) -> StringId {
    let id = StringId(self.strings.len() as u32);
    self.strings.push(bytes);
    id
  }

  pub fn get(&self, id: StringId) -> &[u8] {
    &self.strings[id.index()]
  }

  pub fn get_str(&self, id: StringId) -> &str {
    std::str::from_utf8(self.get(id)).unwrap_or("<invalid-utf8>")
  }

  pub fn len(&self) -> usize {
    self.strings.len()
  }

  pub fn is_empty(&self) -> bool {
    self.strings.is_empty()
  }
}

#[derive(Debug, Clone, Copy)]
pub struct IntFaTransition {
  pub low: u8,
  pub high: u8,
  pub dest: IntFaStateId,
}

impl IntFaTransition {
  pub fn matches(&self, byte: u8) -> bool {
    self.low <= byte && byte <= self.high
  }
}

#[derive(Debug, Clone, Default)]
pub struct IntFaState {
  /// Set iff this is an accept state; names the terminal matched here.
  pub accept: Option<StringId>,
  pub transitions: Vec<IntFaTransition>,
}

impl IntFaState {
  pub fn is_accepting(&self) -> bool {
    self.accept.is_some()
  }
}

/// A byte-level DFA recognizing one or more terminals. State 0 is always
/// the start state.
#[derive(Debug, Default)]
pub struct IntFa {
  pub states: Vec<IntFaState>,
}

impl IntFa {
  pub fn start_state(&self) -> IntFaStateId {
    IntFaStateId(0)
  }

  pub fn state(&self, id: IntFaStateId) -> &IntFaState {
    &self.states[id.index()]
  }

  pub fn find_transition(&self, id: IntFaStateId, byte: u8) -> Option<IntFaStateId> {
    self.state(id).transitions.iter().find(|t| t.matches(byte)).map(|t| t.dest)
  }
}

/// The terminal slot a GLA transition is keyed by: either a named
/// terminal or the reserved end-of-input sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKey {
  Named(StringId),
  EndOfInput,
}

#[derive(Debug, Clone, Copy)]
pub struct GlaTransition {
  pub terminal: TerminalKey,
  pub dest: GlaStateId,
}

#[derive(Debug, Clone)]
pub enum GlaState {
  /// Tokenizes lookahead input with `intfa` and dispatches on the result.
  NonFinal { intfa: IntFaId, transitions: Vec<GlaTransition> },
  /// `0` means "return from the current RTN"; `n > 0` means "take the
  /// `n`-th transition (1-based) of the current RTN state".
  Final { transition_offset: u32 },
}

/// A token-level DFA deciding which RTN transition to take when one-token
/// lookahead does not determine it.
#[derive(Debug, Default)]
pub struct Gla {
  pub states: Vec<GlaState>,
}

impl Gla {
  pub fn start_state(&self) -> GlaStateId {
    GlaStateId(0)
  }

  pub fn state(&self, id: GlaStateId) -> &GlaState {
    &self.states[id.index()]
  }
}

/// Which kind of lookahead decision an RTN state requires before any of
/// its outgoing transitions can be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookahead {
  HasIntFa(IntFaId),
  HasGla(GlaId),
  /// By construction: zero outgoing transitions (a final state) or
  /// exactly one nonterminal transition, taken unconditionally.
  HasNeither,
}

#[derive(Debug, Clone, Copy)]
pub enum RtnTransition {
  Terminal { name: StringId, dest: RtnStateId, slotname: StringId, slotnum: u32 },
  Nonterminal { target: RtnId, dest: RtnStateId, slotname: StringId, slotnum: u32 },
}

impl RtnTransition {
  pub fn dest(&self) -> RtnStateId {
    match self {
      RtnTransition::Terminal { dest, .. } => *dest,
      RtnTransition::Nonterminal { dest, .. } => *dest,
    }
  }

  pub fn slotname(&self) -> StringId {
    match self {
      RtnTransition::Terminal { slotname, .. } => *slotname,
      RtnTransition::Nonterminal { slotname, .. } => *slotname,
    }
  }

  pub fn slotnum(&self) -> u32 {
    match self {
      RtnTransition::Terminal { slotnum, .. } => *slotnum,
      RtnTransition::Nonterminal { slotnum, .. } => *slotnum,
    }
  }
}

#[derive(Debug, Clone)]
pub struct RtnState {
  pub is_final: bool,
  pub lookahead: Lookahead,
  pub transitions: Vec<RtnTransition>,
}

impl RtnState {
  pub fn find_terminal_transition(&self, name: StringId) -> Option<&RtnTransition> {
    self.transitions.iter().find(|t| matches!(t, RtnTransition::Terminal { name: n, .. } if *n == name))
  }

  pub fn nth_transition(&self, one_based: u32) -> Option<&RtnTransition> {
    self.transitions.get(one_based.checked_sub(1)? as usize)
  }
}

/// A non-deterministic pushdown component for one nonterminal.
#[derive(Debug)]
pub struct Rtn {
  pub name: StringId,
  pub num_slots: u32,
  pub ignore: Vec<StringId>,
  pub states: Vec<RtnState>,
}

impl Rtn {
  pub fn start_state(&self) -> RtnStateId {
    RtnStateId(0)
  }

  pub fn state(&self, id: RtnStateId) -> &RtnState {
    &self.states[id.index()]
  }

  pub fn ignores(&self, terminal: StringId) -> bool {
    self.ignore.contains(&terminal)
  }
}

/// The immutable grammar image produced by the loader. Shared read-only by
/// any number of parse states; never mutated after [`super::loader::load_grammar`]
/// returns.
#[derive(Debug)]
pub struct Grammar {
  pub strings: StringTable,
  pub intfas: Vec<IntFa>,
  pub glas: Vec<Gla>,
  pub rtns: Vec<Rtn>,
}

impl Grammar {
  pub fn start_rtn(&self) -> RtnId {
    RtnId(0)
  }

  pub fn intfa(&self, id: IntFaId) -> &IntFa {
    &self.intfas[id.index()]
  }

  pub fn gla(&self, id: GlaId) -> &Gla {
    &self.glas[id.index()]
  }

  pub fn rtn(&self, id: RtnId) -> &Rtn {
    &self.rtns[id.index()]
  }

  pub fn string(&self, id: StringId) -> &[u8] {
    self.strings.get(id)
  }

  pub fn string_str(&self, id: StringId) -> &str {
    self.strings.get_str(id)
  }
}
