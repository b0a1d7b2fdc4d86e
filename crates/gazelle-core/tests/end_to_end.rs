//! Drives the public `ParseState` API with hand-built, in-memory grammars
//! (no bitcode involved) to exercise the engine's steady-state behaviors:
//! empty input, plain terminal matching, ignored terminals, GLA-mediated
//! ambiguity resolution, resumption across a buffer split, and syntactic
//! error reporting.

use gazelle_core::engine::{
  BoundGrammar, CallbackOutcome, Offset, ParseCallbacks, ParseState, ParseStatus, RuleEvent, TerminalEvent,
};
use gazelle_core::grammar::{
  Gla, GlaId, GlaState, GlaStateId, GlaTransition, Grammar, IntFa, IntFaId, IntFaState, IntFaStateId,
  IntFaTransition, Lookahead, Rtn, RtnId, RtnState, RtnStateId, RtnTransition, StringTable, TerminalKey,
};
use gazelle_core::ParseLimits;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
  StartRule { name: String, offset: u64, slotnum: Option<u32> },
  EndRule { name: String, len: u64 },
  Terminal { name: String, offset: u64, len: u64, slotnum: Option<u32> },
  ErrorChar { ch: u8, offset: u64 },
  ErrorTerminal { name: String, offset: u64, len: u64 },
}

#[derive(Clone)]
struct Recorder;

impl ParseCallbacks<Vec<Event>> for Recorder {
  fn start_rule(&self, user: &mut Vec<Event>, event: &RuleEvent) -> CallbackOutcome {
    user.push(Event::StartRule {
      name: event.rtn_name.to_string(),
      offset: event.start_offset.byte,
      slotnum: event.slot.map(|s| s.slotnum),
    });
    CallbackOutcome::Continue
  }

  fn end_rule(&self, user: &mut Vec<Event>, rtn_name: &str, _start_offset: Offset, len: u64) -> CallbackOutcome {
    user.push(Event::EndRule { name: rtn_name.to_string(), len });
    CallbackOutcome::Continue
  }

  fn terminal(&self, user: &mut Vec<Event>, event: &TerminalEvent) -> CallbackOutcome {
    user.push(Event::Terminal {
      name: event.name.to_string(),
      offset: event.offset.byte,
      len: event.len,
      slotnum: event.slot.map(|s| s.slotnum),
    });
    CallbackOutcome::Continue
  }

  fn error_char(&self, user: &mut Vec<Event>, ch: u8, offset: Offset) {
    user.push(Event::ErrorChar { ch, offset: offset.byte });
  }

  fn error_terminal(&self, user: &mut Vec<Event>, name: &str, offset: Offset, len: u64) {
    user.push(Event::ErrorTerminal { name: name.to_string(), offset: offset.byte, len });
  }
}

fn new_state(grammar: &Grammar) -> ParseState<'_, Recorder, Vec<Event>> {
  ParseState::new(BoundGrammar::new(grammar, Recorder), Vec::new(), ParseLimits::default())
}

fn strings(words: &[&str]) -> StringTable {
  let mut table = StringTable::new();
  for w in words {
    table.push(w.as_bytes().to_vec());
  }
  table
}

fn range(low: u8, high: u8, dest: u32) -> IntFaTransition {
  IntFaTransition { low, high, dest: IntFaStateId(dest) }
}

/// `S := ()`, trivially accepting with no slots.
fn grammar_empty_start() -> Grammar {
  let strings = strings(&["S"]);
  let s = Rtn {
    name: gazelle_core::grammar::StringId(0),
    num_slots: 0,
    ignore: vec![],
    states: vec![RtnState { is_final: true, lookahead: Lookahead::HasNeither, transitions: vec![] }],
  };
  Grammar { strings, intfas: vec![], glas: vec![], rtns: vec![s] }
}

/// `S := IDENT`, where IDENT is `[A-Za-z_][A-Za-z0-9_]*`.
fn grammar_single_ident() -> Grammar {
  let strings = strings(&["S", "IDENT", ""]);
  let ident = gazelle_core::grammar::StringId(1);
  let slot = gazelle_core::grammar::StringId(2);

  let intfa = IntFa {
    states: vec![
      IntFaState { accept: None, transitions: vec![range(b'A', b'Z', 1), range(b'a', b'z', 1), range(b'_', b'_', 1)] },
      IntFaState {
        accept: Some(ident),
        transitions: vec![range(b'A', b'Z', 1), range(b'a', b'z', 1), range(b'0', b'9', 1), range(b'_', b'_', 1)],
      },
    ],
  };

  let s = Rtn {
    name: gazelle_core::grammar::StringId(0),
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

/// `S := IDENT IDENT`, with a single space ignored between them and a
/// one-digit INT terminal the RTN never expects (used by the error test).
fn grammar_ident_seq() -> Grammar {
  let strings = strings(&["S", "IDENT", " ", "", "INT"]);
  let ident = gazelle_core::grammar::StringId(1);
  let space = gazelle_core::grammar::StringId(2);
  let slot = gazelle_core::grammar::StringId(3);
  let int = gazelle_core::grammar::StringId(4);

  let intfa = IntFa {
    states: vec![
      IntFaState {
        accept: None,
        transitions: vec![
          range(b'A', b'Z', 1),
          range(b'a', b'z', 1),
          range(b'_', b'_', 1),
          range(b' ', b' ', 2),
          range(b'0', b'9', 3),
        ],
      },
      IntFaState {
        accept: Some(ident),
        transitions: vec![range(b'A', b'Z', 1), range(b'a', b'z', 1), range(b'0', b'9', 1), range(b'_', b'_', 1)],
      },
      IntFaState { accept: Some(space), transitions: vec![] },
      IntFaState { accept: Some(int), transitions: vec![] },
    ],
  };

  let s = Rtn {
    name: gazelle_core::grammar::StringId(0),
    num_slots: 2,
    ignore: vec![space],
    states: vec![
      RtnState {
        is_final: false,
        lookahead: Lookahead::HasIntFa(IntFaId(0)),
        transitions: vec![RtnTransition::Terminal { name: ident, dest: RtnStateId(1), slotname: slot, slotnum: 0 }],
      },
      RtnState {
        is_final: false,
        lookahead: Lookahead::HasIntFa(IntFaId(0)),
        transitions: vec![RtnTransition::Terminal { name: ident, dest: RtnStateId(2), slotname: slot, slotnum: 1 }],
      },
      RtnState { is_final: true, lookahead: Lookahead::HasNeither, transitions: vec![] },
    ],
  };

  Grammar { strings, intfas: vec![intfa], glas: vec![], rtns: vec![s] }
}

/// `S := A | B`; `A := "x" "y"`; `B := "x" "z"`. A one-token-of-lookahead
/// GLA resolves the shared "x" prefix by inspecting the second token.
fn grammar_gla_choice() -> Grammar {
  let strings = strings(&["S", "A", "B", "X", "Y", "Z", ""]);
  let (x, y, z, slot) = (
    gazelle_core::grammar::StringId(3),
    gazelle_core::grammar::StringId(4),
    gazelle_core::grammar::StringId(5),
    gazelle_core::grammar::StringId(6),
  );

  let intfa_x = IntFa {
    states: vec![
      IntFaState { accept: None, transitions: vec![range(b'x', b'x', 1)] },
      IntFaState { accept: Some(x), transitions: vec![] },
    ],
  };
  let intfa_y = IntFa {
    states: vec![
      IntFaState { accept: None, transitions: vec![range(b'y', b'y', 1)] },
      IntFaState { accept: Some(y), transitions: vec![] },
    ],
  };
  let intfa_z = IntFa {
    states: vec![
      IntFaState { accept: None, transitions: vec![range(b'z', b'z', 1)] },
      IntFaState { accept: Some(z), transitions: vec![] },
    ],
  };
  let intfa_yz = IntFa {
    states: vec![
      IntFaState { accept: None, transitions: vec![range(b'y', b'y', 1), range(b'z', b'z', 2)] },
      IntFaState { accept: Some(y), transitions: vec![] },
      IntFaState { accept: Some(z), transitions: vec![] },
    ],
  };

  let gla = Gla {
    states: vec![
      GlaState::NonFinal { intfa: IntFaId(0), transitions: vec![GlaTransition { terminal: TerminalKey::Named(x), dest: GlaStateId(1) }] },
      GlaState::NonFinal {
        intfa: IntFaId(3),
        transitions: vec![
          GlaTransition { terminal: TerminalKey::Named(y), dest: GlaStateId(2) },
          GlaTransition { terminal: TerminalKey::Named(z), dest: GlaStateId(3) },
        ],
      },
      GlaState::Final { transition_offset: 1 },
      GlaState::Final { transition_offset: 2 },
    ],
  };

  let s = Rtn {
    name: gazelle_core::grammar::StringId(0),
    num_slots: 1,
    ignore: vec![],
    states: vec![
      RtnState {
        is_final: false,
        lookahead: Lookahead::HasGla(GlaId(0)),
        transitions: vec![
          RtnTransition::Nonterminal { target: RtnId(1), dest: RtnStateId(1), slotname: slot, slotnum: 0 },
          RtnTransition::Nonterminal { target: RtnId(2), dest: RtnStateId(1), slotname: slot, slotnum: 0 },
        ],
      },
      RtnState { is_final: true, lookahead: Lookahead::HasNeither, transitions: vec![] },
    ],
  };
  let a = Rtn {
    name: gazelle_core::grammar::StringId(1),
    num_slots: 2,
    ignore: vec![],
    states: vec![
      RtnState {
        is_final: false,
        lookahead: Lookahead::HasIntFa(IntFaId(0)),
        transitions: vec![RtnTransition::Terminal { name: x, dest: RtnStateId(1), slotname: slot, slotnum: 0 }],
      },
      RtnState {
        is_final: false,
        lookahead: Lookahead::HasIntFa(IntFaId(1)),
        transitions: vec![RtnTransition::Terminal { name: y, dest: RtnStateId(2), slotname: slot, slotnum: 1 }],
      },
      RtnState { is_final: true, lookahead: Lookahead::HasNeither, transitions: vec![] },
    ],
  };
  let b = Rtn {
    name: gazelle_core::grammar::StringId(2),
    num_slots: 2,
    ignore: vec![],
    states: vec![
      RtnState {
        is_final: false,
        lookahead: Lookahead::HasIntFa(IntFaId(0)),
        transitions: vec![RtnTransition::Terminal { name: x, dest: RtnStateId(1), slotname: slot, slotnum: 0 }],
      },
      RtnState {
        is_final: false,
        lookahead: Lookahead::HasIntFa(IntFaId(2)),
        transitions: vec![RtnTransition::Terminal { name: z, dest: RtnStateId(2), slotname: slot, slotnum: 1 }],
      },
      RtnState { is_final: true, lookahead: Lookahead::HasNeither, transitions: vec![] },
    ],
  };

  Grammar { strings, intfas: vec![intfa_x, intfa_y, intfa_z, intfa_yz], glas: vec![gla], rtns: vec![s, a, b] }
}

#[test]
fn empty_input_fires_one_matching_start_and_end_rule() {
  let grammar = grammar_empty_start();
  let mut state = new_state(&grammar);

  let status = state.parse(b"");
  assert_eq!(status, ParseStatus::HardEof);
  assert!(state.finish_parse());
  assert_eq!(
    state.user_data(),
    &vec![
      Event::StartRule { name: "S".into(), offset: 0, slotnum: None },
      Event::EndRule { name: "S".into(), len: 0 },
    ]
  );
}

#[test]
fn single_terminal_is_accepted() {
  let grammar = grammar_single_ident();
  let mut state = new_state(&grammar);

  let status = state.parse(b"x1");
  assert_eq!(status, ParseStatus::Ok);
  assert!(state.finish_parse());
  assert_eq!(
    state.user_data(),
    &vec![
      Event::StartRule { name: "S".into(), offset: 0, slotnum: None },
      Event::Terminal { name: "IDENT".into(), offset: 0, len: 2, slotnum: Some(0) },
      Event::EndRule { name: "S".into(), len: 2 },
    ]
  );
}

#[test]
fn ignored_whitespace_separates_two_terminals() {
  let grammar = grammar_ident_seq();
  let mut state = new_state(&grammar);

  let status = state.parse(b"ab cd\n");
  assert_eq!(status, ParseStatus::HardEof);
  assert_eq!(state.offset(), Offset { byte: 5, line: 1, column: 6 });
  assert!(state.finish_parse());
  assert_eq!(
    state.user_data(),
    &vec![
      Event::StartRule { name: "S".into(), offset: 0, slotnum: None },
      Event::Terminal { name: "IDENT".into(), offset: 0, len: 2, slotnum: Some(0) },
      Event::Terminal { name: "IDENT".into(), offset: 3, len: 2, slotnum: Some(1) },
      Event::EndRule { name: "S".into(), len: 5 },
    ]
  );
}

#[test]
fn gla_resolves_a_shared_terminal_prefix() {
  let grammar = grammar_gla_choice();
  let mut state = new_state(&grammar);

  let status = state.parse(b"xz");
  assert_eq!(status, ParseStatus::HardEof);
  assert!(state.finish_parse());
  assert_eq!(
    state.user_data(),
    &vec![
      Event::StartRule { name: "S".into(), offset: 0, slotnum: None },
      Event::StartRule { name: "B".into(), offset: 0, slotnum: Some(0) },
      Event::Terminal { name: "X".into(), offset: 0, len: 1, slotnum: Some(0) },
      Event::Terminal { name: "Z".into(), offset: 1, len: 1, slotnum: Some(1) },
      Event::EndRule { name: "B".into(), len: 2 },
      Event::EndRule { name: "S".into(), len: 2 },
    ]
  );
}

#[test]
fn resumes_identically_across_a_buffer_split() {
  let grammar = grammar_single_ident();

  let mut joined = new_state(&grammar);
  assert_eq!(joined.parse(b"x1"), ParseStatus::Ok);
  assert!(joined.finish_parse());

  let mut split = new_state(&grammar);
  assert_eq!(split.parse(b"x"), ParseStatus::Ok);
  assert_eq!(split.parse(b"1"), ParseStatus::Ok);
  assert!(split.finish_parse());

  assert_eq!(joined.user_data(), split.user_data());
  assert_eq!(joined.offset(), split.offset());
}

#[test]
fn duplicated_state_matches_the_original_after_diverging_input() {
  let grammar = grammar_single_ident();

  let mut original = new_state(&grammar);
  assert_eq!(original.parse(b"x"), ParseStatus::Ok);

  let mut clone = original.try_clone();

  assert_eq!(original.parse(b"1"), ParseStatus::Ok);
  assert_eq!(clone.parse(b"1"), ParseStatus::Ok);
  assert!(original.finish_parse());
  assert!(clone.finish_parse());

  assert_eq!(original.user_data(), clone.user_data());
  assert_eq!(original.offset(), clone.offset());
}

#[test]
fn an_unexpected_terminal_reports_a_syntactic_error() {
  let grammar = grammar_ident_seq();
  let mut state = new_state(&grammar);

  let status = state.parse(b"ab 123");
  assert_eq!(status, ParseStatus::Error);
  assert_eq!(
    state.user_data(),
    &vec![
      Event::StartRule { name: "S".into(), offset: 0, slotnum: None },
      Event::Terminal { name: "IDENT".into(), offset: 0, len: 2, slotnum: Some(0) },
      Event::ErrorTerminal { name: "INT".into(), offset: 3, len: 1 },
    ]
  );
}
