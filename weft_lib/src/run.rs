// run.rs --- driving a grammar over an input
//
use std::fmt;
use std::mem;
use std::ops::Range;
use std::sync::Arc;

use log::debug;
use weft_value::source_map::Position;

use crate::context::{Cursor, MatchContext, RunState};
use crate::grammar::Grammar;
use crate::input::{Input, StrInput};
use crate::listener::Listener;
use crate::stack::ValueStack;
use crate::Error;

/// Nesting level used as limit unless configured otherwise.  It fits
/// with room to spare in the 2 MiB stack `std::thread::spawn` gives
/// new threads, including in unoptimized builds.  Runs on threads
/// with smaller stacks need a lower limit.
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    // Rule invocations nested deeper than this abort the run with
    // `Error::Depth`.  `None` removes the limit.
    max_depth: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl Config {
    /// No limit on nesting: deep enough inputs may overflow the
    /// native stack
    pub fn unbounded() -> Self {
        Self { max_depth: None }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }
}

/// Farthest point the run got to before giving up, and the rules
/// that failed there
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub index: usize,
    pub position: Position,
    pub expected: Vec<String>,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.expected.as_slice() {
            [] => write!(f, "{}: no match", self.position),
            [only] => write!(f, "{}: expected {}", self.position, only),
            many => write!(f, "{}: expected one of {}", self.position, many.join(", ")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParseResult<V> {
    /// The root rule matched some prefix of the input
    pub matched: bool,
    /// The root rule matched all of the input
    pub matched_entire_input: bool,
    /// Range matched by the root rule, empty when it didn't match
    pub match_range: Range<usize>,
    pub matched_text: String,
    pub rest_of_input: String,
    /// Values left on the stack by the semantic actions
    pub values: ValueStack<V>,
    /// Set when the root rule didn't match, or when it matched a
    /// prefix and some terminal rule failed further along
    pub failure: Option<Failure>,
}

impl<V: Clone> ParseResult<V> {
    fn new(matched: bool, end: usize, input: &dyn Input, state: &RunState<V>) -> Self {
        let end = if matched { end } else { 0 };
        let matched_entire_input = matched && end == input.len();
        let failure = if matched_entire_input || (matched && state.failure.expected.is_empty()) {
            None
        } else {
            let index = state.failure.index;
            Some(Failure {
                index,
                position: input.position(index),
                expected: state.failure.expected.clone(),
            })
        };
        Self {
            matched,
            matched_entire_input,
            match_range: 0..end,
            matched_text: input.text(0, end).into_owned(),
            rest_of_input: input.text(end, input.len()).into_owned(),
            values: state.stack.copy(),
            failure,
        }
    }

    /// Value on top of the stack, usually what the root rule built
    pub fn top_value(&self) -> Option<&V> {
        self.values.peek().ok()
    }
}

/// Matches a grammar against inputs, one at a time.  The grammar is
/// shared, so many runs (on many threads) can use the same one; each
/// run keeps its own value stack and listeners.
pub struct ParseRun<V> {
    grammar: Arc<Grammar<V>>,
    config: Config,
    stack: ValueStack<V>,
    listeners: Vec<Box<dyn Listener<V> + Send>>,
}

impl<V: Clone> ParseRun<V> {
    pub fn new(grammar: Arc<Grammar<V>>) -> Self {
        Self::with_config(grammar, Config::default())
    }

    pub fn with_config(grammar: Arc<Grammar<V>>, config: Config) -> Self {
        Self {
            grammar,
            config,
            stack: ValueStack::new(),
            listeners: vec![],
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar<V>> {
        &self.grammar
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: Listener<V> + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Match the root rule against the beginning of `input`.  Not
    /// matching isn't an error: errors are reserved for actions that
    /// abort the run, misuse of the value stack and nesting past the
    /// configured depth.
    pub fn run(&mut self, input: &dyn Input) -> Result<ParseResult<V>, Error> {
        let mut stack = mem::take(&mut self.stack);
        stack.reset();
        let listeners = mem::take(&mut self.listeners);
        let mut state = RunState::new(stack, listeners, self.config.max_depth);

        debug!("run over {} bytes", input.len());
        state.before_parse(input);
        let mut top = Cursor::default();
        let outcome = MatchContext::root(&self.grammar, input, &mut state, &mut top).run();
        let result = outcome.map(|matched| ParseResult::new(matched, top.current, input, &state));
        match &result {
            Ok(r) => {
                debug!(
                    "run done: matched={} entire={} range={:?} values={}",
                    r.matched,
                    r.matched_entire_input,
                    r.match_range,
                    r.values.len()
                );
                state.after_parse(r);
            }
            Err(e) => debug!("run aborted: {}", e),
        }

        let (stack, listeners) = state.into_parts();
        self.stack = stack;
        self.listeners = listeners;
        result
    }

    pub fn run_str(&mut self, text: &str) -> Result<ParseResult<V>, Error> {
        self.run(&StrInput::new(text))
    }

    /// Values left on the stack by the last run
    pub fn stack(&self) -> &ValueStack<V> {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GrammarBuilder;
    use crate::rule::RuleId;

    fn number(b: &mut GrammarBuilder<i64>) -> Result<RuleId, Error> {
        b.production("number", |b| {
            let digit = b.char_if(|c| c.is_ascii_digit());
            let digits = b.one_or_more(digit);
            let push = b.action(|ctx| {
                let n = ctx
                    .match_text()
                    .and_then(|t| t.parse::<i64>().ok())
                    .ok_or_else(|| Error::Action("bad number".to_string()))?;
                ctx.stack_mut().push(n);
                Ok(true)
            });
            Ok(b.sequence([digits, push]))
        })
    }

    #[test]
    fn values_and_ranges() {
        let grammar = Arc::new(GrammarBuilder::new().build(number).unwrap());
        let mut run = ParseRun::new(grammar);

        let result = run.run_str("123abc").unwrap();
        assert!(result.matched);
        assert!(!result.matched_entire_input);
        assert_eq!(0..3, result.match_range);
        assert_eq!("123", result.matched_text);
        assert_eq!("abc", result.rest_of_input);
        assert_eq!(Some(&123), result.top_value());
        assert_eq!(1, run.stack().len());

        let failure = result.failure.unwrap();
        assert_eq!(3, failure.index);
        assert_eq!(vec!["char"], failure.expected);
        assert_eq!("1:4: expected char", failure.to_string());
    }

    #[test]
    fn runs_do_not_see_values_of_previous_runs() {
        let grammar = Arc::new(GrammarBuilder::new().build(number).unwrap());
        let mut run = ParseRun::new(grammar);
        run.run_str("1").unwrap();
        let result = run.run_str("x").unwrap();
        assert!(!result.matched);
        assert!(result.values.is_empty());
        assert_eq!("x", result.rest_of_input);
        assert_eq!(0..0, result.match_range);
    }

    #[test]
    fn prefix_matches_without_failures_report_none() {
        let grammar = GrammarBuilder::<i64>::new()
            .build(|b| Ok(b.sequence([])))
            .unwrap();
        let mut run = ParseRun::new(Arc::new(grammar));
        let result = run.run_str("abc").unwrap();
        assert!(result.matched);
        assert!(!result.matched_entire_input);
        assert_eq!("abc", result.rest_of_input);
        assert_eq!(None, result.failure);
    }

    #[test]
    fn action_errors_abort_the_run() {
        let grammar = GrammarBuilder::<i64>::new()
            .build(|b| Ok(b.action(|_| Err(Error::Action("boom".to_string())))))
            .unwrap();
        let mut run = ParseRun::new(Arc::new(grammar));
        assert_eq!(Err(Error::Action("boom".to_string())), run.run_str(""));
    }

    #[test]
    fn depth_limit() {
        // nest <- '(' nest ')' / 'x'
        fn nest(b: &mut GrammarBuilder<()>) -> Result<RuleId, Error> {
            b.production("nest", |b| {
                let open = b.literal("(");
                let inner = nest(b)?;
                let close = b.literal(")");
                let group = b.sequence([open, inner, close]);
                let x = b.literal("x");
                Ok(b.choice([group, x]))
            })
        }
        let grammar = Arc::new(GrammarBuilder::new().build(nest).unwrap());
        let input = format!("{}x{}", "(".repeat(10), ")".repeat(10));

        let mut limited = ParseRun::with_config(grammar.clone(), Config::default().with_max_depth(8));
        assert_eq!(Err(Error::Depth(8)), limited.run_str(&input));
        // the run is still usable afterwards
        assert!(limited.run_str("(x)").unwrap().matched_entire_input);

        let mut unbounded = ParseRun::with_config(grammar, Config::unbounded());
        assert!(unbounded.run_str(&input).unwrap().matched_entire_input);
    }

    #[test]
    fn default_depth_limit_fits_spawned_threads() {
        // nest <- 'a' / '(' nest ')'
        fn nest(b: &mut GrammarBuilder<()>) -> Result<RuleId, Error> {
            b.production("nest", |b| {
                let a = b.literal("a");
                let open = b.literal("(");
                let inner = nest(b)?;
                let close = b.literal(")");
                let group = b.sequence([open, inner, close]);
                Ok(b.choice([a, group]))
            })
        }
        let grammar = Arc::new(GrammarBuilder::new().build(nest).unwrap());
        let handle = std::thread::spawn(move || {
            let mut run = ParseRun::new(grammar);
            let shallow = format!("{}a{}", "(".repeat(50), ")".repeat(50));
            let deep = format!("{}a{}", "(".repeat(5000), ")".repeat(5000));
            (run.run_str(&shallow), run.run_str(&deep))
        });
        let (shallow, deep) = handle.join().unwrap();
        assert!(shallow.unwrap().matched_entire_input);
        assert_eq!(Err(Error::Depth(DEFAULT_MAX_DEPTH)), deep);
    }

    #[test]
    fn default_config() {
        assert_eq!(Some(DEFAULT_MAX_DEPTH), Config::default().max_depth());
        assert_eq!(None, Config::unbounded().max_depth());
    }
}
