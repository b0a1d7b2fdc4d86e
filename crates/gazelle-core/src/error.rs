use std::fmt::{self, Display};
use std::path::PathBuf;

/// Every error a Gazelle function can produce while loading a bitcode stream
/// or a grammar image. Parse-time outcomes are *not* represented here; those
/// are plain status enums (see [`crate::engine::ParseStatus`]) since callers
/// branch on them rather than propagate them with `?`.
#[derive(Debug, Clone)]
pub enum GazelleError {
  /// Failed to open or read a file.
  Io { path: PathBuf, message: String },

  /// The first two bytes of a bitcode stream were not `B`, `C`.
  BadMagic,

  /// The bitcode decoder set one or more error bits while the loader was
  /// reading records; `bits` mirrors [`crate::bitcode::ErrorBits`].
  CorruptBitcode { bits: u32 },

  /// A grammar image failed a finalization check (missing strings table,
  /// zero IntFAs, or zero RTNs).
  CorruptGrammar { reason: String },

  /// An index recorded in the bitcode stream pointed outside the bounds of
  /// an array it should have indexed (string table, IntFA/GLA/RTN array,
  /// state or transition array).
  BadReference { what: &'static str, index: u64 },
}

impl Display for GazelleError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GazelleError::Io { path, message } => {
        write!(f, "io error reading {}: {}", path.display(), message)
      }
      GazelleError::BadMagic => write!(f, "not a bitcode file (bad magic prefix)"),
      GazelleError::CorruptBitcode { bits } => write!(f, "corrupt bitcode stream (error bits {bits:#x})"),
      GazelleError::CorruptGrammar { reason } => write!(f, "corrupt grammar image: {reason}"),
      GazelleError::BadReference { what, index } => write!(f, "{what} index {index} out of range"),
    }
  }
}

impl std::error::Error for GazelleError {}

impl From<std::io::Error> for GazelleError {
  fn from(err: std::io::Error) -> Self {
    GazelleError::Io { path: PathBuf::new(), message: err.to_string() }
  }
}

pub type GazelleResult<T> = Result<T, GazelleError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_messages_match_each_variant() {
    assert_eq!(GazelleError::BadMagic.to_string(), "not a bitcode file (bad magic prefix)");
    assert_eq!(
      GazelleError::CorruptBitcode { bits: 0x5 }.to_string(),
      "corrupt bitcode stream (error bits 0x5)"
    );
    assert_eq!(
      GazelleError::CorruptGrammar { reason: "no RTNs".to_string() }.to_string(),
      "corrupt grammar image: no RTNs"
    );
    assert_eq!(
      GazelleError::BadReference { what: "string table", index: 7 }.to_string(),
      "string table index 7 out of range"
    );
    assert_eq!(
      GazelleError::Io { path: PathBuf::from("grammar.gzlc"), message: "not found".to_string() }.to_string(),
      "io error reading grammar.gzlc: not found"
    );
  }

  #[test]
  fn io_error_conversion_loses_the_path_but_keeps_the_message() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
    let converted: GazelleError = io_err.into();
    match converted {
      GazelleError::Io { path, message } => {
        assert_eq!(path, PathBuf::new());
        assert!(message.contains("missing file"));
      }
      other => panic!("expected GazelleError::Io, got {other:?}"),
    }
  }
}
