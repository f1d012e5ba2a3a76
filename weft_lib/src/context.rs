// context.rs --- rule invocations
//
// Every time a rule is tried a `MatchContext` is created for it.  The
// context tracks where the invocation started and how far it got, and
// it wraps the rule in a stack transaction: values pushed by a rule
// that ends up failing are rolled back.  A context that matches moves
// its parent forward to where it stopped.
//
use std::borrow::Cow;
use std::ops::Range;

use log::warn;
use weft_value::source_map::{Position, Span};

use crate::grammar::Grammar;
use crate::input::Input;
use crate::listener::{Listener, ListenerError, MatchEvent};
use crate::rule::RuleId;
use crate::run::ParseResult;
use crate::stack::ValueStack;
use crate::Error;

#[derive(Debug, Default)]
pub(crate) struct Cursor {
    pub(crate) start: usize,
    pub(crate) current: usize,
    // Range covered by the last child that matched
    previous_match: Option<Range<usize>>,
    // Input decoded at `current`, cleared whenever it moves
    current_char: Option<Option<u8>>,
    current_code_point: Option<Option<char>>,
}

impl Cursor {
    pub(crate) fn at(index: usize) -> Self {
        Self {
            start: index,
            current: index,
            ..Default::default()
        }
    }

    fn moved(&mut self, index: usize) {
        self.current = index;
        self.current_char = None;
        self.current_code_point = None;
    }

    pub(crate) fn set_index(&mut self, index: usize, len: usize) -> Result<(), Error> {
        if index > len {
            return Err(Error::Index(format!(
                "position {} is past the end of an input of {} bytes",
                index, len
            )));
        }
        if index >= self.current {
            self.previous_match = Some(self.current..index);
        }
        if index != self.current {
            self.moved(index);
        }
        Ok(())
    }
}

/// Farthest position where a terminal rule failed outside of
/// lookaheads, along with what was expected there
#[derive(Debug, Default)]
pub(crate) struct FarthestFailure {
    pub(crate) index: usize,
    pub(crate) expected: Vec<String>,
}

impl FarthestFailure {
    fn record(&mut self, index: usize, expected: Cow<'_, str>) {
        if index < self.index {
            return;
        }
        if index > self.index {
            self.index = index;
            self.expected.clear();
        }
        if !self.expected.iter().any(|e| e == expected.as_ref()) {
            self.expected.push(expected.into_owned());
        }
    }
}

/// State shared by all the contexts of a single run
pub(crate) struct RunState<V> {
    pub(crate) stack: ValueStack<V>,
    pub(crate) failure: FarthestFailure,
    listeners: Vec<Box<dyn Listener<V> + Send>>,
    max_depth: Option<usize>,
}

impl<V> RunState<V> {
    pub(crate) fn new(
        stack: ValueStack<V>,
        listeners: Vec<Box<dyn Listener<V> + Send>>,
        max_depth: Option<usize>,
    ) -> Self {
        Self {
            stack,
            failure: FarthestFailure::default(),
            listeners,
            max_depth,
        }
    }

    pub(crate) fn into_parts(self) -> (ValueStack<V>, Vec<Box<dyn Listener<V> + Send>>) {
        (self.stack, self.listeners)
    }

    /// Listener errors are reported and otherwise ignored, they never
    /// change the outcome of a run
    fn notify<F>(&mut self, hook: &str, mut f: F)
    where
        F: FnMut(&mut dyn Listener<V>) -> Result<(), ListenerError>,
    {
        for listener in self.listeners.iter_mut() {
            if let Err(e) = f(listener.as_mut()) {
                warn!("listener failed on {}: {}", hook, e);
            }
        }
    }

    pub(crate) fn before_parse(&mut self, input: &dyn Input) {
        self.notify("before_parse", |l| l.before_parse(input));
    }

    pub(crate) fn after_parse(&mut self, result: &ParseResult<V>) {
        self.notify("after_parse", |l| l.after_parse(result));
    }
}

enum Hook {
    Before,
    Success,
    Failure,
}

pub struct MatchContext<'c, V> {
    grammar: &'c Grammar<V>,
    input: &'c dyn Input,
    state: &'c mut RunState<V>,
    // Cursor of the invocation that created this one
    parent: Option<&'c mut Cursor>,
    rule: RuleId,
    level: usize,
    in_lookahead: bool,
    cursor: Cursor,
}

impl<'c, V: Clone> MatchContext<'c, V> {
    /// Context for the root rule of `grammar`, moving `top` forward
    /// when it matches
    pub(crate) fn root(
        grammar: &'c Grammar<V>,
        input: &'c dyn Input,
        state: &'c mut RunState<V>,
        top: &'c mut Cursor,
    ) -> Self {
        let rule = grammar.root();
        let start = top.current;
        Self {
            grammar,
            input,
            state,
            parent: Some(top),
            rule,
            level: 0,
            in_lookahead: grammar.rule(rule).is_lookahead(),
            cursor: Cursor::at(start),
        }
    }

    /// Context for `rule` starting where this one currently is
    ///
    /// # Panics
    ///
    /// Panics if `rule` doesn't belong to the grammar being run
    pub fn create_child(&mut self, rule: RuleId) -> MatchContext<'_, V> {
        let in_lookahead = self.in_lookahead || self.grammar.rule(rule).is_lookahead();
        MatchContext {
            grammar: self.grammar,
            input: self.input,
            cursor: Cursor::at(self.cursor.current),
            state: &mut *self.state,
            parent: Some(&mut self.cursor),
            rule,
            level: self.level + 1,
            in_lookahead,
        }
    }

    /// Try to match the rule of this context.  Values pushed by a rule
    /// that doesn't match are rolled back, and the parent only moves
    /// forward when it does.
    pub fn run(mut self) -> Result<bool, Error> {
        if let Some(max) = self.state.max_depth {
            if self.level > max {
                return Err(Error::Depth(max));
            }
        }
        let grammar = self.grammar;
        let rule = grammar.rule(self.rule);

        self.state.stack.take_snapshot();
        self.notify(Hook::Before);
        let matched = match rule.matches(&mut self) {
            Ok(matched) => matched,
            Err(e) => {
                // keep snapshots balanced for whoever handles the error
                self.state.stack.restore_snapshot()?;
                return Err(e);
            }
        };

        if matched {
            let (index, len) = (self.cursor.current, self.input.len());
            if let Some(parent) = self.parent.as_deref_mut() {
                parent.set_index(index, len)?;
            }
            self.notify(Hook::Success);
            self.state.stack.discard_snapshot()?;
        } else {
            if rule.is_terminal() && !self.in_lookahead {
                self.state
                    .failure
                    .record(self.cursor.current, grammar.describe(self.rule));
            }
            self.notify(Hook::Failure);
            self.state.stack.restore_snapshot()?;
        }
        Ok(matched)
    }

    fn notify(&mut self, hook: Hook) {
        if self.state.listeners.is_empty() {
            return;
        }
        let grammar = self.grammar;
        let event = MatchEvent {
            rule: self.rule,
            label: grammar.describe(self.rule),
            level: self.level,
            start_index: self.cursor.start,
            current_index: self.cursor.current,
            in_lookahead: self.in_lookahead,
        };
        match hook {
            Hook::Before => self.state.notify("before_match", |l| l.before_match(&event)),
            Hook::Success => self.state.notify("match_success", |l| l.match_success(&event)),
            Hook::Failure => self.state.notify("match_failure", |l| l.match_failure(&event)),
        }
    }

    /// Nesting level, zero for the root rule
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn rule(&self) -> RuleId {
        self.rule
    }

    pub fn label(&self) -> Cow<'c, str> {
        let grammar = self.grammar;
        grammar.describe(self.rule)
    }

    pub fn grammar(&self) -> &'c Grammar<V> {
        self.grammar
    }

    pub fn input(&self) -> &'c dyn Input {
        self.input
    }

    pub fn start_index(&self) -> usize {
        self.cursor.start
    }

    pub fn current_index(&self) -> usize {
        self.cursor.current
    }

    pub fn in_lookahead(&self) -> bool {
        self.in_lookahead
    }

    pub fn at_end(&self) -> bool {
        self.cursor.current >= self.input.len()
    }

    pub fn position(&self) -> Position {
        self.input.position(self.cursor.current)
    }

    pub fn current_char(&mut self) -> Option<u8> {
        let (input, index) = (self.input, self.cursor.current);
        *self
            .cursor
            .current_char
            .get_or_insert_with(|| input.char_at(index))
    }

    pub fn current_code_point(&mut self) -> Option<char> {
        let (input, index) = (self.input, self.cursor.current);
        *self
            .cursor
            .current_code_point
            .get_or_insert_with(|| input.code_point_at(index))
    }

    /// Move forward `delta` bytes.  Returns false, without moving, if
    /// that would go past the end of the input.
    pub fn advance_index(&mut self, delta: usize) -> bool {
        match self.cursor.current.checked_add(delta) {
            Some(index) if index <= self.input.len() => {
                if delta > 0 {
                    self.cursor.moved(index);
                }
                true
            }
            _ => false,
        }
    }

    pub fn set_current_index(&mut self, index: usize) -> Result<(), Error> {
        self.cursor.set_index(index, self.input.len())
    }

    /// Range covered by the last child of this context that matched
    pub fn previous_match(&self) -> Option<Range<usize>> {
        self.cursor.previous_match.clone()
    }

    /// Range covered by the sibling that matched right before this
    /// context was created.  Within a sequence such as `a b action`,
    /// the action sees what `b` matched.
    pub fn match_range(&self) -> Option<Range<usize>> {
        self.parent.as_ref().and_then(|p| p.previous_match.clone())
    }

    pub fn match_text(&self) -> Option<Cow<'c, str>> {
        let input = self.input;
        self.match_range().map(|r| input.text(r.start, r.end))
    }

    pub fn match_span(&self) -> Option<Span> {
        let input = self.input;
        self.match_range()
            .map(|r| Span::new(input.position(r.start), input.position(r.end)))
    }

    pub fn stack(&self) -> &ValueStack<V> {
        &self.state.stack
    }

    pub fn stack_mut(&mut self) -> &mut ValueStack<V> {
        &mut self.state.stack
    }
}
