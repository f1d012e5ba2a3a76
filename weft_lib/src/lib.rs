pub mod builder;
pub mod context;
pub mod grammar;
pub mod helpers;
pub mod input;
pub mod listener;
pub mod rule;
pub mod run;
pub mod stack;
pub mod trie;

pub use builder::{GrammarBuilder, KeyArg, ProductionKey};
pub use context::MatchContext;
pub use grammar::Grammar;
pub use input::{Input, StrInput};
pub use listener::{Listener, ListenerError, MatchEvent, RuleStats, Stats, StatsListener, TraceListener};
pub use rule::{Rule, RuleId};
pub use run::{Config, Failure, ParseResult, ParseRun};
pub use stack::ValueStack;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    // The grammar graph could not be put together
    Construction(String),
    // Something was incorrectly indexed
    Index(String),
    // Rule invocations nested deeper than the configured limit
    Depth(usize),
    // A semantic action aborted the run
    Action(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Construction(msg) => write!(f, "Construction Error: {}", msg),
            Error::Index(msg) => write!(f, "Index Error: {}", msg),
            Error::Depth(max) => write!(f, "Depth Error: rules nested deeper than {}", max),
            Error::Action(msg) => write!(f, "Action Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
