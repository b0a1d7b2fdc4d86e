//! Consumes the bitcode record stream and materializes an immutable
//! in-memory [`Grammar`]. Each entity (IntFA, GLA, RTN) is read in two
//! passes: the first counts states so the model array can be allocated
//! with the right capacity, the second rewinds the block and populates it.

use crate::bitcode::{BitcodeReader, Entry};
use crate::error::{GazelleError, GazelleResult};
use crate::grammar::ids::{GlaId, GlaStateId, IntFaId, IntFaStateId, RtnId, RtnStateId, StringId};
use crate::grammar::model::{
  Gla, GlaState, GlaTransition, Grammar, IntFa, IntFaState, IntFaTransition, Lookahead, Rtn, RtnState, RtnTransition, StringTable, TerminalKey,
};

const BLOCK_INTFAS: u64 = 8;
const BLOCK_INTFA: u64 = 9;
const BLOCK_STRINGS: u64 = 10;
const BLOCK_RTNS: u64 = 11;
const BLOCK_RTN: u64 = 12;
const BLOCK_GLAS: u64 = 13;
const BLOCK_GLA: u64 = 14;

const STRING_RECORD: u64 = 0;

const INTFA_STATE: u64 = 0;
const INTFA_FINAL_STATE: u64 = 1;
const INTFA_TRANSITION: u64 = 2;
const INTFA_TRANSITION_RANGE: u64 = 3;

const GLA_STATE: u64 = 0;
const GLA_FINAL_STATE: u64 = 1;
const GLA_TRANSITION: u64 = 2;

const RTN_INFO: u64 = 0;
const RTN_IGNORE_TERMINAL: u64 = 1;
const RTN_STATE_WITH_INTFA: u64 = 2;
const RTN_STATE_WITH_GLA: u64 = 3;
const RTN_TRIVIAL_STATE: u64 = 4;
const RTN_TRANSITION_TERMINAL: u64 = 5;
const RTN_TRANSITION_NONTERM: u64 = 6;

fn corrupt(reason: impl Into<String>) -> GazelleError {
  GazelleError::CorruptGrammar { reason: reason.into() }
}

/// Reads a whole grammar image from an open bitcode stream. Dispatches on
/// the outermost blocks; unknown blocks are skipped.
pub fn load_grammar(reader: &mut BitcodeReader) -> GazelleResult<Grammar> {
  let mut strings = StringTable::new();
  let mut intfas = Vec::new();
  let mut glas = Vec::new();
  let mut rtns = Vec::new();

  loop {
    match reader.next_record() {
      Entry::StartBlock { id: BLOCK_STRINGS } => load_strings(reader, &mut strings)?,
      Entry::StartBlock { id: BLOCK_INTFAS } => load_intfas(reader, &mut intfas)?,
      Entry::StartBlock { id: BLOCK_GLAS } => load_glas(reader, &mut glas)?,
      Entry::StartBlock { id: BLOCK_RTNS } => load_rtns(reader, &mut rtns)?,
      Entry::StartBlock { .. } => reader.skip_current_block()?,
      Entry::Eof => break,
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      Entry::DataRecord { .. } | Entry::EndBlock => return Err(corrupt("unexpected record at top level")),
    }
  }

  if strings.is_empty() {
    return Err(corrupt("grammar has no string table"));
  }
  if intfas.is_empty() {
    return Err(corrupt("grammar defines no IntFAs"));
  }
  if rtns.is_empty() {
    return Err(corrupt("grammar defines no RTNs"));
  }

  let grammar = Grammar { strings, intfas, glas, rtns };
  validate_references(&grammar)?;
  Ok(grammar)
}

/// Checks every index recorded in the bitcode stream against the array it
/// is meant to index, now that every entity (and so every array's final
/// length) has been loaded. A bitcode stream can be structurally well
/// formed — every record the right shape, every block properly nested —
/// while still naming a string, IntFA/GLA/RTN, or state/transition index
/// past the end of its target array; nothing upstream of this check can
/// tell the difference, and the engine only ever reads these indices
/// assuming them already in range.
fn validate_references(g: &Grammar) -> GazelleResult<()> {
  let num_strings = g.strings.len() as u64;
  let num_intfas = g.intfas.len() as u64;
  let num_glas = g.glas.len() as u64;
  let num_rtns = g.rtns.len() as u64;

  let check_string = |id: StringId, what: &'static str| -> GazelleResult<()> {
    if (id.0 as u64) < num_strings {
      Ok(())
    } else {
      Err(GazelleError::BadReference { what, index: id.0 as u64 })
    }
  };

  for intfa in &g.intfas {
    let num_states = intfa.states.len() as u64;
    for state in &intfa.states {
      if let Some(accept) = state.accept {
        check_string(accept, "IntFA accept-label string")?;
      }
      for t in &state.transitions {
        if (t.dest.0 as u64) >= num_states {
          return Err(GazelleError::BadReference { what: "IntFA transition destination state", index: t.dest.0 as u64 });
        }
      }
    }
  }

  for gla in &g.glas {
    let num_states = gla.states.len() as u64;
    for state in &gla.states {
      let (intfa, transitions) = match state {
        GlaState::NonFinal { intfa, transitions } => (intfa, transitions),
        GlaState::Final { .. } => continue,
      };
      if (intfa.0 as u64) >= num_intfas {
        return Err(GazelleError::BadReference { what: "GLA state IntFA reference", index: intfa.0 as u64 });
      }
      for t in transitions {
        if let TerminalKey::Named(name) = t.terminal {
          check_string(name, "GLA transition terminal name")?;
        }
        if (t.dest.0 as u64) >= num_states {
          return Err(GazelleError::BadReference { what: "GLA transition destination state", index: t.dest.0 as u64 });
        }
      }
    }
  }

  for rtn in &g.rtns {
    check_string(rtn.name, "RTN name string")?;
    for &ignored in &rtn.ignore {
      check_string(ignored, "RTN ignore-terminal string")?;
    }
    let num_states = rtn.states.len() as u64;
    for state in &rtn.states {
      match state.lookahead {
        Lookahead::HasIntFa(id) if (id.0 as u64) >= num_intfas => {
          return Err(GazelleError::BadReference { what: "RTN state IntFA reference", index: id.0 as u64 });
        }
        Lookahead::HasGla(id) if (id.0 as u64) >= num_glas => {
          return Err(GazelleError::BadReference { what: "RTN state GLA reference", index: id.0 as u64 });
        }
        _ => {}
      }
      for t in &state.transitions {
        match *t {
          RtnTransition::Terminal { name, dest, slotname, .. } => {
            check_string(name, "RTN terminal-transition terminal name")?;
            check_string(slotname, "RTN transition slot name")?;
            if (dest.0 as u64) >= num_states {
              return Err(GazelleError::BadReference { what: "RTN transition destination state", index: dest.0 as u64 });
            }
          }
          RtnTransition::Nonterminal { target, dest, slotname, .. } => {
            if (target.0 as u64) >= num_rtns {
              return Err(GazelleError::BadReference { what: "RTN nonterminal-transition RTN reference", index: target.0 as u64 });
            }
            check_string(slotname, "RTN transition slot name")?;
            if (dest.0 as u64) >= num_states {
              return Err(GazelleError::BadReference { what: "RTN transition destination state", index: dest.0 as u64 });
            }
          }
        }
      }
    }
  }

  Ok(())
}

fn load_strings(reader: &mut BitcodeReader, strings: &mut StringTable) -> GazelleResult<()> {
  loop {
    match reader.next_record() {
      Entry::DataRecord { id: STRING_RECORD } => {
        let mut bytes = Vec::with_capacity(reader.record_len());
        for i in 0..reader.record_len() {
          bytes.push(reader.operand_u32(i)? as u8);
        }
        strings.push(bytes);
      }
      Entry::EndBlock => return Ok(()),
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      _ => return Err(corrupt("unexpected record in STRINGS block")),
    }
  }
}

fn load_intfas(reader: &mut BitcodeReader, intfas: &mut Vec<IntFa>) -> GazelleResult<()> {
  loop {
    match reader.next_record() {
      Entry::StartBlock { id: BLOCK_INTFA } => intfas.push(load_one_intfa(reader)?),
      Entry::EndBlock => return Ok(()),
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      _ => return Err(corrupt("unexpected record in INTFAS block")),
    }
  }
}

fn load_one_intfa(reader: &mut BitcodeReader) -> GazelleResult<IntFa> {
  let num_states = count_states(reader, &[INTFA_STATE, INTFA_FINAL_STATE], &[INTFA_TRANSITION, INTFA_TRANSITION_RANGE])?;
  reader.rewind_to_block_start()?;

  let mut states = Vec::with_capacity(num_states);
  loop {
    match reader.next_record() {
      Entry::DataRecord { id: INTFA_STATE } => {
        let num_transitions = reader.next_operand_u32()?;
        let transitions = read_intfa_transitions(reader, num_transitions)?;
        states.push(IntFaState { accept: None, transitions });
      }
      Entry::DataRecord { id: INTFA_FINAL_STATE } => {
        let num_transitions = reader.next_operand_u32()?;
        let accept = StringId(reader.next_operand_u32()?);
        let transitions = read_intfa_transitions(reader, num_transitions)?;
        states.push(IntFaState { accept: Some(accept), transitions });
      }
      Entry::EndBlock => return Ok(IntFa { states }),
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      _ => return Err(corrupt("unexpected record in INTFA block")),
    }
  }
}

fn read_intfa_transitions(reader: &mut BitcodeReader, count: u32) -> GazelleResult<Vec<IntFaTransition>> {
  let mut transitions = Vec::with_capacity(count as usize);
  for _ in 0..count {
    match reader.next_record() {
      Entry::DataRecord { id: INTFA_TRANSITION } => {
        let byte = reader.next_operand_u32()? as u8;
        let dest = IntFaStateId(reader.next_operand_u32()?);
        transitions.push(IntFaTransition { low: byte, high: byte, dest });
      }
      Entry::DataRecord { id: INTFA_TRANSITION_RANGE } => {
        let low = reader.next_operand_u32()? as u8;
        let high = reader.next_operand_u32()? as u8;
        let dest = IntFaStateId(reader.next_operand_u32()?);
        transitions.push(IntFaTransition { low, high, dest });
      }
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      _ => return Err(corrupt("expected IntFA transition record")),
    }
  }
  Ok(transitions)
}

fn load_glas(reader: &mut BitcodeReader, glas: &mut Vec<Gla>) -> GazelleResult<()> {
  loop {
    match reader.next_record() {
      Entry::StartBlock { id: BLOCK_GLA } => glas.push(load_one_gla(reader)?),
      Entry::EndBlock => return Ok(()),
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      _ => return Err(corrupt("unexpected record in GLAS block")),
    }
  }
}

fn load_one_gla(reader: &mut BitcodeReader) -> GazelleResult<Gla> {
  let num_states = count_states(reader, &[GLA_STATE, GLA_FINAL_STATE], &[GLA_TRANSITION])?;
  reader.rewind_to_block_start()?;

  let mut states = Vec::with_capacity(num_states);
  loop {
    match reader.next_record() {
      Entry::DataRecord { id: GLA_STATE } => {
        let intfa = IntFaId(reader.next_operand_u32()?);
        let num_transitions = reader.next_operand_u32()?;
        let mut transitions = Vec::with_capacity(num_transitions as usize);
        for _ in 0..num_transitions {
          match reader.next_record() {
            Entry::DataRecord { id: GLA_TRANSITION } => {
              let terminal_idx = reader.next_operand_u32()?;
              let dest = GlaStateId(reader.next_operand_u32()?);
              let terminal = if terminal_idx == 0 { TerminalKey::EndOfInput } else { TerminalKey::Named(StringId(terminal_idx - 1)) };
              transitions.push(GlaTransition { terminal, dest });
            }
            Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
            _ => return Err(corrupt("expected GLA transition record")),
          }
        }
        states.push(GlaState::NonFinal { intfa, transitions });
      }
      Entry::DataRecord { id: GLA_FINAL_STATE } => {
        let transition_offset = reader.next_operand_u32()?;
        states.push(GlaState::Final { transition_offset });
      }
      Entry::EndBlock => return Ok(Gla { states }),
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      _ => return Err(corrupt("unexpected record in GLA block")),
    }
  }
}

fn load_rtns(reader: &mut BitcodeReader, rtns: &mut Vec<Rtn>) -> GazelleResult<()> {
  loop {
    match reader.next_record() {
      Entry::StartBlock { id: BLOCK_RTN } => rtns.push(load_one_rtn(reader)?),
      Entry::EndBlock => return Ok(()),
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      _ => return Err(corrupt("unexpected record in RTNS block")),
    }
  }
}

fn load_one_rtn(reader: &mut BitcodeReader) -> GazelleResult<Rtn> {
  let num_states = count_states(
    reader,
    &[RTN_STATE_WITH_INTFA, RTN_STATE_WITH_GLA, RTN_TRIVIAL_STATE],
    &[RTN_TRANSITION_TERMINAL, RTN_TRANSITION_NONTERM],
  )?;
  reader.rewind_to_block_start()?;

  let mut name = None;
  let mut num_slots = 0u32;
  let mut ignore = Vec::new();
  let mut states = Vec::with_capacity(num_states);

  loop {
    match reader.next_record() {
      Entry::DataRecord { id: RTN_INFO } => {
        name = Some(StringId(reader.next_operand_u32()?));
        num_slots = reader.next_operand_u32()?;
      }
      Entry::DataRecord { id: RTN_IGNORE_TERMINAL } => {
        ignore.push(StringId(reader.next_operand_u32()?));
      }
      Entry::DataRecord { id: RTN_STATE_WITH_INTFA } => {
        let num_transitions = reader.next_operand_u32()?;
        let is_final = reader.next_operand_u32()? != 0;
        let intfa = IntFaId(reader.next_operand_u32()?);
        let transitions = read_rtn_transitions(reader, num_transitions)?;
        states.push(RtnState { is_final, lookahead: Lookahead::HasIntFa(intfa), transitions });
      }
      Entry::DataRecord { id: RTN_STATE_WITH_GLA } => {
        let num_transitions = reader.next_operand_u32()?;
        let is_final = reader.next_operand_u32()? != 0;
        let gla = GlaId(reader.next_operand_u32()?);
        let transitions = read_rtn_transitions(reader, num_transitions)?;
        states.push(RtnState { is_final, lookahead: Lookahead::HasGla(gla), transitions });
      }
      Entry::DataRecord { id: RTN_TRIVIAL_STATE } => {
        let num_transitions = reader.next_operand_u32()?;
        let is_final = reader.next_operand_u32()? != 0;
        let transitions = read_rtn_transitions(reader, num_transitions)?;
        states.push(RtnState { is_final, lookahead: Lookahead::HasNeither, transitions });
      }
      Entry::EndBlock => {
        let name = name.ok_or_else(|| corrupt("RTN block missing INFO record"))?;
        return Ok(Rtn { name, num_slots, ignore, states });
      }
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      _ => return Err(corrupt("unexpected record in RTN block")),
    }
  }
}

fn read_rtn_transitions(reader: &mut BitcodeReader, count: u32) -> GazelleResult<Vec<RtnTransition>> {
  let mut transitions = Vec::with_capacity(count as usize);
  for _ in 0..count {
    match reader.next_record() {
      Entry::DataRecord { id: RTN_TRANSITION_TERMINAL } => {
        let name = StringId(reader.next_operand_u32()?);
        let dest = RtnStateId(reader.next_operand_u32()?);
        let slotname = StringId(reader.next_operand_u32()?);
        let slotnum = reader.next_operand_u32()?.checked_sub(1).ok_or_else(|| corrupt("slotnum must be emitted 1-based"))?;
        transitions.push(RtnTransition::Terminal { name, dest, slotname, slotnum });
      }
      Entry::DataRecord { id: RTN_TRANSITION_NONTERM } => {
        let target = RtnId(reader.next_operand_u32()?);
        let dest = RtnStateId(reader.next_operand_u32()?);
        let slotname = StringId(reader.next_operand_u32()?);
        let slotnum = reader.next_operand_u32()?.checked_sub(1).ok_or_else(|| corrupt("slotnum must be emitted 1-based"))?;
        transitions.push(RtnTransition::Nonterminal { target, dest, slotname, slotnum });
      }
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      _ => return Err(corrupt("expected RTN transition record")),
    }
  }
  Ok(transitions)
}

/// First pass over an entity's sub-block: counts `STATE`-shaped records
/// while skipping over their trailing transition records, so the caller
/// can preallocate its state array before rewinding for the second pass.
fn count_states(reader: &mut BitcodeReader, state_record_ids: &[u64], transition_record_ids: &[u64]) -> GazelleResult<usize> {
  let mut count = 0usize;
  loop {
    match reader.next_record() {
      Entry::DataRecord { id } if state_record_ids.contains(&id) => count += 1,
      Entry::DataRecord { id } if transition_record_ids.contains(&id) => {}
      Entry::DataRecord { id } if id == RTN_INFO || id == RTN_IGNORE_TERMINAL => {}
      Entry::EndBlock => return Ok(count),
      Entry::Err => return Err(corrupt(format!("bitcode decode error, bits={:#x}", reader.error_bits()))),
      _ => return Err(corrupt("unexpected record while counting states")),
    }
  }
}
