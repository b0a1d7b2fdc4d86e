pub mod ids;
pub mod loader;
pub mod model;

pub use ids::{GlaId, GlaStateId, IntFaId, IntFaStateId, RtnId, RtnStateId, StringId};
pub use loader::load_grammar;
pub use model::{Gla, GlaState, GlaTransition, Grammar, IntFa, IntFaState, IntFaTransition, Lookahead, Rtn, RtnState, RtnTransition, StringTable, TerminalKey};
