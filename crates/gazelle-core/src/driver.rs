//! The buffered file driver (spec §4.4): a convenience layer over
//! [`crate::engine::ParseState::parse`] for whole-file parsing. Owns the
//! byte buffer the engine's callbacks read terminal text out of, mirroring
//! the source's `struct gzl_buffer` nesting the client's own `user_data`.

use std::io::Read;

use crate::engine::{Offset, ParseCallbacks, ParseState, ParseStatus};

/// Default minimum free space maintained at the tail of the buffer before
/// each read, matching the source's informal "a few thousand bytes" sizing.
pub const DEFAULT_MIN_FREE_SPACE: usize = 4000;

/// The parse state's `user_data` when driven by [`parse_file`]. Holds the
/// raw bytes read so far (enough of them that any terminal not yet
/// released past `open_terminal_offset` can still be sliced out) plus
/// whatever the caller's own callbacks need, nested exactly as the
/// source's `struct gzl_buffer` nests a client `void *user_data`.
pub struct FileBuffer<U> {
  buf: Vec<u8>,
  buf_offset: u64,
  pub user_data: U,
}

impl<U> FileBuffer<U> {
  pub fn new(user_data: U) -> Self {
    Self { buf: Vec::new(), buf_offset: 0, user_data }
  }

  /// The raw bytes of a terminal previously reported at `offset` with
  /// length `len`. Panics if those bytes have already been compacted away;
  /// callers must not hold onto a terminal's offset past the next
  /// `open_terminal_offset` advance.
  pub fn terminal_text(&self, offset: Offset, len: u64) -> &[u8] {
    let start = (offset.byte - self.buf_offset) as usize;
    let end = start + len as usize;
    &self.buf[start..end]
  }
}

fn ensure_free_space(buf: &mut Vec<u8>, min_free: usize) {
  let free = buf.capacity() - buf.len();
  if free < min_free {
    buf.reserve(min_free - free);
  }
}

/// Parses an entire file (or any `Read` stream), growing and compacting an
/// internal buffer as it goes. `min_free_space` bounds how much room is
/// guaranteed before each read; pass [`DEFAULT_MIN_FREE_SPACE`] unless the
/// grammar is known to need longer single reads.
pub fn parse_file<R, C, U>(state: &mut ParseState<'_, C, FileBuffer<U>>, mut file: R, min_free_space: usize) -> ParseStatus
where
  R: Read,
  C: ParseCallbacks<FileBuffer<U>>,
{
  let min_free_space = min_free_space.max(1);

  loop {
    let mut buf = std::mem::take(&mut state.user_data_mut().buf);
    ensure_free_space(&mut buf, min_free_space);

    let old_len = buf.len();
    let cap = buf.capacity();
    buf.resize(cap, 0);
    let read_result = file.read(&mut buf[old_len..]);
    let n = match read_result {
      Ok(n) => n,
      Err(e) => {
        buf.truncate(old_len);
        state.user_data_mut().buf = buf;
        return ParseStatus::IoError(e.to_string());
      }
    };
    buf.truncate(old_len + n);
    let eof = n == 0;

    state.user_data_mut().buf = buf;
    let chunk: Vec<u8> = state.user_data().buf[old_len..old_len + n].to_vec();

    let status = state.parse(&chunk);
    match status {
      ParseStatus::Error | ParseStatus::Cancelled | ParseStatus::ResourceLimitExceeded => return status,
      ParseStatus::HardEof => return ParseStatus::Ok,
      ParseStatus::IoError(_) | ParseStatus::PrematureEofError => unreachable!("parse() never returns a driver-only status"),
      ParseStatus::Ok => {
        if eof {
          return if state.finish_parse() { ParseStatus::Ok } else { ParseStatus::PrematureEofError };
        }
      }
    }

    let open = state.open_terminal_offset().byte;
    let fb = state.user_data_mut();
    let keep_from = open.saturating_sub(fb.buf_offset).min(fb.buf.len() as u64) as usize;
    if keep_from > 0 {
      fb.buf.drain(0..keep_from);
      fb.buf_offset += keep_from as u64;
    }
  }
}
