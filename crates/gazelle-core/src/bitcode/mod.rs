//! A streaming decoder for the bit-packed, LLVM-bitstream-inspired
//! container that carries a compiled grammar image. See
//! [`crate::grammar::loader`] for the consumer of this module.

mod abbrev;
mod cursor;

pub use abbrev::{Abbrev, AbbrevOp};
use cursor::BitCursor;

use crate::error::{GazelleError, GazelleResult};
use std::collections::HashMap;
use std::path::Path;

const BLOCKINFO_BLOCK_ID: u64 = 0;
const BLOCKINFO_SETBID_CODE: u64 = 1;

const ABBREV_END_BLOCK: u64 = 0;
const ABBREV_ENTER_SUBBLOCK: u64 = 1;
const ABBREV_DEFINE_ABBREV: u64 = 2;
const ABBREV_UNABBREV_RECORD: u64 = 3;
const FIRST_APPLICATION_ABBREV_ID: u64 = 4;

/// OR-combination of error conditions the reader has encountered. Once any
/// bit is set the stream is not repaired; subsequent calls keep returning
/// [`Entry::Err`].
pub struct ErrorBits;

impl ErrorBits {
  pub const VALUE_TOO_LARGE: u32 = 1 << 0;
  pub const NO_SUCH_VALUE: u32 = 1 << 1;
  pub const IO: u32 = 1 << 2;
  pub const CORRUPT_INPUT: u32 = 1 << 3;
  pub const INTERNAL: u32 = 1 << 4;
  pub const PREMATURE_EOF: u32 = 1 << 5;
}

/// One decoded unit of the record stream. Records that only manage the
/// reader's own abbreviation tables (`DEFINE_ABBREV`, the `BLOCKINFO`
/// block and its `SETBID` records) are never surfaced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
  DataRecord { id: u64 },
  StartBlock { id: u64 },
  EndBlock,
  Eof,
  Err,
}

#[derive(Debug, Clone)]
struct BlockScope {
  block_id: u64,
  abbrev_width: u32,
  local_abbrevs: Vec<Abbrev>,
  is_blockinfo: bool,
  current_setbid: Option<u64>,
  content_start_bit: usize,
  num_words: u32,
}

#[derive(Debug, Clone, Default)]
struct RecordBuffer {
  id: u64,
  operands: Vec<u64>,
}

pub struct BitcodeReader {
  cursor: BitCursor,
  blocks: Vec<BlockScope>,
  blockinfo_abbrevs: HashMap<u64, Vec<Abbrev>>,
  error_bits: u32,
  current_record: Option<RecordBuffer>,
  record_cursor: usize,
}

impl BitcodeReader {
  pub fn open_path(path: impl AsRef<Path>) -> GazelleResult<Self> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| GazelleError::Io { path: path.to_path_buf(), message: e.to_string() })?;
    Self::from_bytes(data)
  }

  pub fn from_bytes(data: Vec<u8>) -> GazelleResult<Self> {
    if data.len() < 4 || data[0] != b'B' || data[1] != b'C' {
      return Err(GazelleError::BadMagic);
    }
    let mut cursor = BitCursor::new(data);
    cursor.set_bit_pos(32);
    let file_scope =
      BlockScope { block_id: u64::MAX, abbrev_width: 2, local_abbrevs: vec![], is_blockinfo: false, current_setbid: None, content_start_bit: 32, num_words: 0 };
    Ok(Self {
      cursor,
      blocks: vec![file_scope],
      blockinfo_abbrevs: HashMap::new(),
      error_bits: 0,
      current_record: None,
      record_cursor: 0,
    })
  }

  pub fn error_bits(&self) -> u32 {
    self.error_bits
  }

  pub fn has_error(&self) -> bool {
    self.error_bits != 0
  }

  /// Advances to the next visible record, block boundary, or end of
  /// stream. Internally loops past `DEFINE_ABBREV` records and the whole
  /// `BLOCKINFO` block, neither of which is ever surfaced.
  pub fn next_record(&mut self) -> Entry {
    loop {
      if self.has_error() {
        return Entry::Err;
      }

      if self.blocks.len() == 1 && self.cursor.at_eof() {
        return Entry::Eof;
      }

      let width = self.blocks.last().unwrap().abbrev_width;
      let abbrev_id = match self.cursor.read_fixed(width) {
        Some(v) => v,
        None => {
          if self.blocks.len() == 1 {
            return Entry::Eof;
          }
          self.error_bits |= ErrorBits::PREMATURE_EOF;
          return Entry::Err;
        }
      };

      match abbrev_id {
        ABBREV_END_BLOCK => match self.handle_end_block() {
          Ok(Some(entry)) => return entry,
          Ok(None) => continue,
          Err(()) => return Entry::Err,
        },
        ABBREV_ENTER_SUBBLOCK => match self.handle_enter_subblock() {
          Ok(Some(entry)) => return entry,
          Ok(None) => continue,
          Err(()) => return Entry::Err,
        },
        ABBREV_DEFINE_ABBREV => match self.handle_define_abbrev() {
          Ok(()) => continue,
          Err(()) => return Entry::Err,
        },
        ABBREV_UNABBREV_RECORD => match self.handle_unabbrev_record() {
          Ok(Some(entry)) => return entry,
          Ok(None) => continue,
          Err(()) => return Entry::Err,
        },
        id => match self.handle_abbreviated_record(id) {
          Ok(Some(entry)) => return entry,
          Ok(None) => continue,
          Err(()) => return Entry::Err,
        },
      }
    }
  }

  fn fail(&mut self, bit: u32) -> Result<Option<Entry>, ()> {
    self.error_bits |= bit;
    Err(())
  }

  fn handle_end_block(&mut self) -> Result<Option<Entry>, ()> {
    self.cursor.align32();
    if self.blocks.len() <= 1 {
      return self.fail(ErrorBits::CORRUPT_INPUT);
    }
    let finished = self.blocks.pop().unwrap();
    if finished.is_blockinfo {
      Ok(None)
    } else {
      Ok(Some(Entry::EndBlock))
    }
  }

  fn handle_enter_subblock(&mut self) -> Result<Option<Entry>, ()> {
    let block_id = self.cursor.read_vbr(8).ok_or(()).or_else(|_| self.fail(ErrorBits::PREMATURE_EOF))?;
    let new_width = self.cursor.read_vbr(4).ok_or(()).or_else(|_| self.fail(ErrorBits::PREMATURE_EOF))? as u32;
    self.cursor.align32();
    let num_words = self.cursor.read_fixed(32).ok_or(()).or_else(|_| self.fail(ErrorBits::PREMATURE_EOF))? as u32;
    let content_start_bit = self.cursor.bit_pos();
    let is_blockinfo = block_id == BLOCKINFO_BLOCK_ID;
    self.blocks.push(BlockScope {
      block_id,
      abbrev_width: new_width,
      local_abbrevs: vec![],
      is_blockinfo,
      current_setbid: None,
      content_start_bit,
      num_words,
    });
    if is_blockinfo {
      Ok(None)
    } else {
      Ok(Some(Entry::StartBlock { id: block_id }))
    }
  }

  fn handle_define_abbrev(&mut self) -> Result<(), ()> {
    let abbrev = self.read_abbrev_def()?;
    let scope = self.blocks.last_mut().unwrap();
    if scope.is_blockinfo {
      let target = match scope.current_setbid {
        Some(t) => t,
        None => {
          self.error_bits |= ErrorBits::CORRUPT_INPUT;
          return Err(());
        }
      };
      self.blockinfo_abbrevs.entry(target).or_default().push(abbrev);
    } else {
      scope.local_abbrevs.push(abbrev);
    }
    Ok(())
  }

  fn read_abbrev_def(&mut self) -> Result<Abbrev, ()> {
    let numops = self.read_vbr_or_fail(5)?;
    let mut ops = Vec::with_capacity(numops as usize);
    for _ in 0..numops {
      let is_literal = self.read_fixed_or_fail(1)? == 1;
      if is_literal {
        let v = self.read_vbr_or_fail(8)?;
        ops.push(AbbrevOp::Literal(v));
      } else {
        let encoding = self.read_fixed_or_fail(3)?;
        match abbrev::AbbrevOp::encoding_code(false, encoding) {
          Some("fixed") => ops.push(AbbrevOp::Fixed(self.read_vbr_or_fail(5)? as u32)),
          Some("vbr") => ops.push(AbbrevOp::Vbr(self.read_vbr_or_fail(5)? as u32)),
          Some("array") => ops.push(AbbrevOp::Array),
          Some("char6") => ops.push(AbbrevOp::Char6),
          _ => {
            self.error_bits |= ErrorBits::CORRUPT_INPUT;
            return Err(());
          }
        }
      }
    }
    Ok(Abbrev { ops })
  }

  fn handle_unabbrev_record(&mut self) -> Result<Option<Entry>, ()> {
    let code = self.read_vbr_or_fail(6)?;
    let numops = self.read_vbr_or_fail(6)?;
    let mut operands = Vec::with_capacity(numops as usize);
    for _ in 0..numops {
      operands.push(self.read_vbr_or_fail(6)?);
    }

    let scope = self.blocks.last_mut().unwrap();
    if scope.is_blockinfo && code == BLOCKINFO_SETBID_CODE {
      if operands.is_empty() {
        self.error_bits |= ErrorBits::CORRUPT_INPUT;
        return Err(());
      }
      scope.current_setbid = Some(operands[0]);
      return Ok(None);
    }

    self.current_record = Some(RecordBuffer { id: code, operands });
    self.record_cursor = 0;
    Ok(Some(Entry::DataRecord { id: code }))
  }

  fn handle_abbreviated_record(&mut self, abbrev_id: u64) -> Result<Option<Entry>, ()> {
    let abbrev = self.lookup_abbrev(abbrev_id)?;
    let mut values = self.read_abbrev_record(&abbrev)?;
    if values.is_empty() {
      self.error_bits |= ErrorBits::CORRUPT_INPUT;
      return Err(());
    }
    let code = values.remove(0);

    let scope = self.blocks.last_mut().unwrap();
    if scope.is_blockinfo && code == BLOCKINFO_SETBID_CODE {
      if values.is_empty() {
        self.error_bits |= ErrorBits::CORRUPT_INPUT;
        return Err(());
      }
      scope.current_setbid = Some(values[0]);
      return Ok(None);
    }

    self.current_record = Some(RecordBuffer { id: code, operands: values });
    self.record_cursor = 0;
    Ok(Some(Entry::DataRecord { id: code }))
  }

  fn lookup_abbrev(&mut self, abbrev_id: u64) -> Result<Abbrev, ()> {
    let idx = (abbrev_id - FIRST_APPLICATION_ABBREV_ID) as usize;
    let scope = self.blocks.last().unwrap();
    let blockinfo_len = self.blockinfo_abbrevs.get(&scope.block_id).map(Vec::len).unwrap_or(0);
    if idx < blockinfo_len {
      Ok(self.blockinfo_abbrevs[&scope.block_id][idx].clone())
    } else {
      let local_idx = idx - blockinfo_len;
      match scope.local_abbrevs.get(local_idx) {
        Some(a) => Ok(a.clone()),
        None => {
          self.error_bits |= ErrorBits::CORRUPT_INPUT;
          Err(())
        }
      }
    }
  }

  fn read_abbrev_record(&mut self, abbrev: &Abbrev) -> Result<Vec<u64>, ()> {
    let mut values = Vec::new();
    let mut i = 0usize;
    while i < abbrev.ops.len() {
      match abbrev.ops[i] {
        AbbrevOp::Literal(v) => {
          values.push(v);
          i += 1;
        }
        AbbrevOp::Fixed(w) => {
          values.push(self.read_fixed_or_fail(w)?);
          i += 1;
        }
        AbbrevOp::Vbr(w) => {
          values.push(self.read_vbr_or_fail(w)?);
          i += 1;
        }
        AbbrevOp::Char6 => {
          values.push(self.read_char6_or_fail()? as u64);
          i += 1;
        }
        AbbrevOp::Array => {
          let count = self.read_vbr_or_fail(6)?;
          i += 1;
          let elem = match abbrev.ops.get(i) {
            Some(op) => *op,
            None => {
              self.error_bits |= ErrorBits::CORRUPT_INPUT;
              return Err(());
            }
          };
          i += 1;
          for _ in 0..count {
            match elem {
              AbbrevOp::Literal(v) => values.push(v),
              AbbrevOp::Fixed(w) => values.push(self.read_fixed_or_fail(w)?),
              AbbrevOp::Vbr(w) => values.push(self.read_vbr_or_fail(w)?),
              AbbrevOp::Char6 => values.push(self.read_char6_or_fail()? as u64),
              AbbrevOp::Array => {
                self.error_bits |= ErrorBits::CORRUPT_INPUT;
                return Err(());
              }
            }
          }
        }
      }
    }
    Ok(values)
  }

  fn read_fixed_or_fail(&mut self, n: u32) -> Result<u64, ()> {
    match self.cursor.read_fixed(n) {
      Some(v) => Ok(v),
      None => {
        self.error_bits |= ErrorBits::PREMATURE_EOF;
        Err(())
      }
    }
  }

  fn read_vbr_or_fail(&mut self, n: u32) -> Result<u64, ()> {
    match self.cursor.read_vbr(n) {
      Some(v) => Ok(v),
      None => {
        self.error_bits |= ErrorBits::PREMATURE_EOF;
        Err(())
      }
    }
  }

  fn read_char6_or_fail(&mut self) -> Result<u8, ()> {
    match self.cursor.read_char6() {
      Some(v) => Ok(v),
      None => {
        self.error_bits |= ErrorBits::PREMATURE_EOF;
        Err(())
      }
    }
  }

  /// Discards the rest of the block whose `StartBlock` was just yielded
  /// without inspecting its contents.
  pub fn skip_current_block(&mut self) -> GazelleResult<()> {
    if self.blocks.len() <= 1 {
      return Err(GazelleError::CorruptGrammar { reason: "skip_current_block called at top level".into() });
    }
    let scope = self.blocks.pop().unwrap();
    self.cursor.set_bit_pos(scope.content_start_bit + scope.num_words as usize * 32);
    Ok(())
  }

  /// Rewinds to the start of the currently open block's content so it can
  /// be re-read from the beginning, discarding any abbreviations defined
  /// during the pass that is being rewound.
  pub fn rewind_to_block_start(&mut self) -> GazelleResult<()> {
    if self.blocks.len() <= 1 {
      return Err(GazelleError::CorruptGrammar { reason: "rewind_to_block_start called at top level".into() });
    }
    let scope = self.blocks.last_mut().unwrap();
    self.cursor.set_bit_pos(scope.content_start_bit);
    scope.local_abbrevs.clear();
    Ok(())
  }

  pub fn record_len(&self) -> usize {
    self.current_record.as_ref().map(|r| r.operands.len()).unwrap_or(0)
  }

  pub fn operand_u64(&mut self, index: usize) -> GazelleResult<u64> {
    match self.current_record.as_ref().and_then(|r| r.operands.get(index)) {
      Some(v) => Ok(*v),
      None => {
        self.error_bits |= ErrorBits::NO_SUCH_VALUE;
        Err(GazelleError::CorruptBitcode { bits: self.error_bits })
      }
    }
  }

  pub fn operand_u32(&mut self, index: usize) -> GazelleResult<u32> {
    let v = self.operand_u64(index)?;
    if v > u32::MAX as u64 {
      self.error_bits |= ErrorBits::VALUE_TOO_LARGE;
      return Err(GazelleError::CorruptBitcode { bits: self.error_bits });
    }
    Ok(v as u32)
  }

  pub fn operand_u16(&mut self, index: usize) -> GazelleResult<u16> {
    let v = self.operand_u64(index)?;
    if v > u16::MAX as u64 {
      self.error_bits |= ErrorBits::VALUE_TOO_LARGE;
      return Err(GazelleError::CorruptBitcode { bits: self.error_bits });
    }
    Ok(v as u16)
  }

  pub fn operand_u8(&mut self, index: usize) -> GazelleResult<u8> {
    let v = self.operand_u64(index)?;
    if v > u8::MAX as u64 {
      self.error_bits |= ErrorBits::VALUE_TOO_LARGE;
      return Err(GazelleError::CorruptBitcode { bits: self.error_bits });
    }
    Ok(v as u8)
  }

  /// Reads the next unread operand, advancing the record's internal
  /// cursor. Mirrors the source's sequential `bc_rs_read_*` helpers.
  pub fn next_operand_u64(&mut self) -> GazelleResult<u64> {
    let i = self.record_cursor;
    self.record_cursor += 1;
    self.operand_u64(i)
  }

  pub fn next_operand_u32(&mut self) -> GazelleResult<u32> {
    let i = self.record_cursor;
    self.record_cursor += 1;
    self.operand_u32(i)
  }
}
