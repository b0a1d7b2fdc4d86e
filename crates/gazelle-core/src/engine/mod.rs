//! The streaming parse engine: a single typed stack of IntFA/GLA/RTN
//! frames driven byte-by-byte, plus the callback contract observers hook
//! into. See [`state::ParseState::parse`] and
//! [`state::ParseState::finish_parse`] for the entry points; `logic`
//! supplies their implementation as additional inherent methods.

mod callbacks;
mod frame;
mod logic;
mod offset;
mod state;
mod status;

pub use callbacks::{CallbackOutcome, NoopCallbacks, ParseCallbacks, RuleEvent, SlotRef, TerminalEvent};
pub use frame::StackFrame;
pub use offset::{Offset, Terminal, TerminalName};
pub use state::{BoundGrammar, ParseState};
pub use status::ParseStatus;
