/// A source position: 0-based byte offset, 1-based line and column.
/// Produced monotonically by the engine as input bytes are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
  pub byte: u64,
  pub line: u64,
  pub column: u64,
}

impl Offset {
  pub fn start() -> Self {
    Self { byte: 0, line: 1, column: 1 }
  }

  /// Advances the offset past one consumed byte, collapsing CR-LF and
  /// LF-CR pairs into a single line break while still counting LF-LF or
  /// CR-CR as two. `prev_newline` holds the newline byte half of an
  /// unpaired CR/LF seen so far, so a differing follower can be matched
  /// against it without reconstructing history from `self` alone.
  pub fn advance(&mut self, byte: u8, prev_newline: &mut Option<u8>) {
    self.byte += 1;
    let is_newline = byte == 0x0A || byte == 0x0D;
    if is_newline {
      match *prev_newline {
        Some(p) if p != byte => {
          // second half of a CR-LF/LF-CR pair: already counted.
          *prev_newline = None;
        }
        _ => {
          self.line += 1;
          self.column = 1;
          *prev_newline = Some(byte);
        }
      }
    } else {
      self.column += 1;
      *prev_newline = None;
    }
  }
}

/// The name of a terminal in the token buffer: either one of the grammar's
/// named terminals, or the synthetic end-of-input terminal that RTN
/// transitions never consume but GLA transitions and `finish_parse` do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalName {
  Named(crate::grammar::StringId),
  Eof,
}

/// The output of the lexer: a terminal spanning `[offset, end)`, where `end`
/// is recorded at lex time so later lookahead replay never has to
/// reconstruct a byte position's line/column from scratch.
#[derive(Debug, Clone, Copy)]
pub struct Terminal {
  pub name: TerminalName,
  pub offset: Offset,
  pub len: u64,
  pub end: Offset,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_bytes_only_advance_column() {
    let mut off = Offset::start();
    let mut prev_nl: Option<u8> = None;
    for &b in b"abc" {
      off.advance(b, &mut prev_nl);
    }
    assert_eq!(off, Offset { byte: 3, line: 1, column: 4 });
  }

  #[test]
  fn lf_advances_line_and_resets_column() {
    let mut off = Offset::start();
    let mut prev_nl: Option<u8> = None;
    off.advance(b'a', &mut prev_nl);
    off.advance(b'\n', &mut prev_nl);
    off.advance(b'b', &mut prev_nl);
    assert_eq!(off, Offset { byte: 3, line: 2, column: 2 });
  }

  #[test]
  fn crlf_counts_as_a_single_line_break() {
    let mut off = Offset::start();
    let mut prev_nl: Option<u8> = None;
    off.advance(b'\r', &mut prev_nl);
    off.advance(b'\n', &mut prev_nl);
    off.advance(b'x', &mut prev_nl);
    assert_eq!(off, Offset { byte: 3, line: 2, column: 2 });
  }

  #[test]
  fn consecutive_lf_each_count_as_a_break() {
    let mut off = Offset::start();
    let mut prev_nl: Option<u8> = None;
    off.advance(b'\n', &mut prev_nl);
    off.advance(b'\n', &mut prev_nl);
    assert_eq!(off, Offset { byte: 2, line: 3, column: 1 });
  }
}
