//! `gzlparse`: parse a file against a compiled Gazelle grammar, optionally
//! dumping the parse tree as JSON.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gazelle_core::bitcode::BitcodeReader;
use gazelle_core::driver::{self, FileBuffer};
use gazelle_core::engine::{
  BoundGrammar, CallbackOutcome, Offset, ParseCallbacks, ParseState, ParseStatus, RuleEvent, SlotRef, TerminalEvent,
};
use gazelle_core::grammar::load_grammar;
use gazelle_core::limits::ParseLimits;

/// The number of bytes `gzlparse` asks the buffered driver to keep free
/// before each read; matches the original tool's single-read-per-chunk
/// sizing.
const READ_CHUNK_SIZE: usize = 50 * 1024;

#[derive(Parser)]
#[command(name = "gzlparse", about = "Parse a file against a compiled Gazelle grammar.", version)]
struct Cli {
  /// Print the parse tree as JSON to standard output.
  #[arg(long = "dump-json")]
  dump_json: bool,

  /// Print the number of bytes parsed to standard error.
  #[arg(long = "dump-total")]
  dump_total: bool,

  /// The compiled grammar (a `.gzc` bitcode file).
  grammar: PathBuf,

  /// The file to parse, or `-` for standard input.
  infile: String,
}

fn main() -> ExitCode {
  tracing_subscriber::fmt::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) => {
      let _ = e.print();
      return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
    }
  };

  run(cli)
}

fn run(cli: Cli) -> ExitCode {
  let mut reader = match BitcodeReader::open_path(&cli.grammar) {
    Ok(reader) => reader,
    Err(err) => {
      eprintln!("gzlparse: couldn't load grammar '{}': {err}", cli.grammar.display());
      return ExitCode::from(1);
    }
  };

  let grammar = match load_grammar(&mut reader) {
    Ok(grammar) => grammar,
    Err(err) => {
      eprintln!("gzlparse: couldn't load grammar '{}': {err}", cli.grammar.display());
      return ExitCode::from(1);
    }
  };

  let input: Box<dyn Read> = if cli.infile == "-" {
    Box::new(io::stdin())
  } else {
    match File::open(&cli.infile) {
      Ok(f) => Box::new(f),
      Err(err) => {
        eprintln!("gzlparse: couldn't open '{}' for reading: {err}", cli.infile);
        return ExitCode::from(1);
      }
    }
  };

  let callbacks = CliCallbacks { dump_json: cli.dump_json };
  let bound = BoundGrammar::new(&grammar, callbacks);
  let user_data = FileBuffer::new(JsonWriter::new());
  let mut state = ParseState::new(bound, user_data, ParseLimits::default());

  if cli.dump_json {
    print!("{{\"parse_tree\":");
  }

  let status = driver::parse_file(&mut state, input, READ_CHUNK_SIZE);

  if cli.dump_json {
    println!("\n}}");
  }

  if cli.dump_total {
    let hit_grammar_eof = matches!(status, ParseStatus::HardEof);
    eprint!("gzlparse: {} bytes parsed", state.offset().byte);
    if hit_grammar_eof {
      eprint!(" (grammar reached EOF before the end of the file)");
    }
    eprintln!(".");
  }

  match status {
    ParseStatus::Ok | ParseStatus::HardEof => ExitCode::SUCCESS,
    ParseStatus::Error => {
      eprintln!("gzlparse: parse error, aborting.");
      ExitCode::from(1)
    }
    ParseStatus::Cancelled => {
      eprintln!("gzlparse: parse cancelled.");
      ExitCode::from(1)
    }
    ParseStatus::ResourceLimitExceeded => {
      eprintln!("gzlparse: resource limit exceeded, aborting.");
      ExitCode::from(1)
    }
    ParseStatus::IoError(msg) => {
      eprintln!("gzlparse: i/o error: {msg}");
      ExitCode::from(1)
    }
    ParseStatus::PrematureEofError => {
      eprintln!("gzlparse: file ended before the grammar reached a valid stopping point.");
      ExitCode::from(1)
    }
  }
}

/// The callback set `gzlparse` binds to the grammar. Error callbacks
/// always report to stderr; tree-dumping callbacks are gated on
/// `--dump-json` so a plain validity check pays nothing for JSON writing.
struct CliCallbacks {
  dump_json: bool,
}

impl ParseCallbacks<FileBuffer<JsonWriter>> for CliCallbacks {
  fn start_rule(&self, user: &mut FileBuffer<JsonWriter>, event: &RuleEvent) -> CallbackOutcome {
    if self.dump_json {
      user.user_data.start_rule(event);
    }
    CallbackOutcome::Continue
  }

  fn end_rule(&self, user: &mut FileBuffer<JsonWriter>, _rtn_name: &str, _start_offset: Offset, len: u64) -> CallbackOutcome {
    if self.dump_json {
      user.user_data.end_rule(len);
    }
    CallbackOutcome::Continue
  }

  fn terminal(&self, user: &mut FileBuffer<JsonWriter>, event: &TerminalEvent) -> CallbackOutcome {
    if self.dump_json {
      let text = user.terminal_text(event.offset, event.len).to_vec();
      user.user_data.terminal(event, &text);
    }
    CallbackOutcome::Continue
  }

  fn error_char(&self, _user: &mut FileBuffer<JsonWriter>, ch: u8, offset: Offset) {
    eprintln!(
      "gzlparse: unexpected character '{}' (byte {:#04x}) at line {}, column {} (byte offset {}), aborting.",
      ch as char, ch, offset.line, offset.column, offset.byte
    );
  }

  fn error_terminal(&self, user: &mut FileBuffer<JsonWriter>, name: &str, offset: Offset, len: u64) {
    eprintln!(
      "gzlparse: unexpected terminal '{name}' at line {}, column {} (byte offset {}), aborting.",
      offset.line, offset.column, offset.byte
    );
    let text = String::from_utf8_lossy(user.terminal_text(offset, len));
    eprintln!("gzlparse: terminal text is: '{text}'.");
  }
}

/// Streams the `--dump-json` parse tree straight to standard output as
/// callbacks fire, rather than building an intermediate tree structure.
/// `first_child` tracks, for each currently-open rule, whether its next
/// printed event needs a leading comma.
struct JsonWriter {
  first_child: Vec<bool>,
}

impl JsonWriter {
  fn new() -> Self {
    Self { first_child: Vec::new() }
  }

  fn print_separator(&mut self) {
    match self.first_child.last_mut() {
      Some(first) if *first => {
        *first = false;
      }
      Some(_) => print!(","),
      None => {}
    }
    if !self.first_child.is_empty() {
      println!();
      self.print_indent();
    }
  }

  fn print_indent(&self) {
    for _ in 0..self.first_child.len() {
      print!("  ");
    }
  }

  fn start_rule(&mut self, event: &RuleEvent) {
    self.print_separator();
    print!(
      "{{\"rule\": {}, \"start\": {}, \"line\": {}, \"column\": {}, ",
      json_string(event.rtn_name.as_bytes()),
      event.start_offset.byte,
      event.start_offset.line,
      event.start_offset.column
    );
    if let Some(SlotRef { slotname, slotnum }) = event.slot {
      print!("\"slotname\": {}, \"slotnum\": {}, ", json_string(slotname.as_bytes()), slotnum);
    }
    print!("\"children\": [");
    self.first_child.push(true);
  }

  fn end_rule(&mut self, len: u64) {
    self.first_child.pop();
    if !self.first_child.last().copied().unwrap_or(true) {
      println!();
      self.print_indent();
    }
    print!("], \"len\": {len}}}");
  }

  fn terminal(&mut self, event: &TerminalEvent, text: &[u8]) {
    self.print_separator();
    let SlotRef { slotname, slotnum } = event.slot.expect("terminal events always occur inside a rule");
    print!(
      "{{\"terminal\": {}, \"slotname\": {}, \"slotnum\": {}, \"byte_offset\": {}, \"line\": {}, \"column\": {}, \"len\": {}, \"text\": {}}}",
      json_string(event.name.as_bytes()),
      json_string(slotname.as_bytes()),
      slotnum,
      event.offset.byte,
      event.offset.line,
      event.offset.column,
      event.len,
      json_string(text)
    );
  }
}

/// JSON-escapes a raw byte string and wraps it in quotes. Escapes `"` and
/// `\`, maps `\n`/`\t`/`\r` to their short forms, `\u%04x`-escapes other
/// control characters, and passes every other byte through unchanged
/// (matching the grammar's byte-oriented, non-Unicode model).
fn json_string(bytes: &[u8]) -> String {
  let mut out = Vec::with_capacity(bytes.len() + 2);
  out.push(b'"');
  for &b in bytes {
    match b {
      b'"' => out.extend_from_slice(b"\\\""),
      b'\\' => out.extend_from_slice(b"\\\\"),
      b'\n' => out.extend_from_slice(b"\\n"),
      b'\t' => out.extend_from_slice(b"\\t"),
      b'\r' => out.extend_from_slice(b"\\r"),
      0..=31 => out.extend_from_slice(format!("\\u{b:04x}").as_bytes()),
      _ => out.push(b),
    }
  }
  out.push(b'"');
  String::from_utf8_lossy(&out).into_owned()
}
