// listener.rs --- observing runs
//
// Listeners are told when a run starts and ends and about every rule
// invocation in between.  They're meant for tracing and profiling:
// nothing a listener does changes the outcome of a run, and errors
// they return are only logged.
//
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::trace;

use crate::input::Input;
use crate::rule::RuleId;
use crate::run::ParseResult;

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Snapshot of a rule invocation handed to listeners
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchEvent<'e> {
    pub rule: RuleId,
    pub label: Cow<'e, str>,
    pub level: usize,
    pub start_index: usize,
    pub current_index: usize,
    pub in_lookahead: bool,
}

pub trait Listener<V> {
    fn before_parse(&mut self, _input: &dyn Input) -> Result<(), ListenerError> {
        Ok(())
    }

    fn before_match(&mut self, _event: &MatchEvent) -> Result<(), ListenerError> {
        Ok(())
    }

    fn match_success(&mut self, _event: &MatchEvent) -> Result<(), ListenerError> {
        Ok(())
    }

    fn match_failure(&mut self, _event: &MatchEvent) -> Result<(), ListenerError> {
        Ok(())
    }

    fn after_parse(&mut self, _result: &ParseResult<V>) -> Result<(), ListenerError> {
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Records one line per event, indented by nesting level.  Clones
/// share the same lines, so a clone can be handed to a run and the
/// first handle kept around to read them afterwards.
#[derive(Clone, Debug, Default)]
pub struct TraceListener {
    lines: Arc<Mutex<Vec<String>>>,
}

impl TraceListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn clear(&self) {
        lock(&self.lines).clear();
    }

    fn push(&self, line: String) {
        trace!("{}", line);
        lock(&self.lines).push(line);
    }
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

impl<V> Listener<V> for TraceListener {
    fn before_parse(&mut self, input: &dyn Input) -> Result<(), ListenerError> {
        self.push(format!("parse {} bytes", input.len()));
        Ok(())
    }

    fn before_match(&mut self, e: &MatchEvent) -> Result<(), ListenerError> {
        self.push(format!("{}? {} @{}", indent(e.level), e.label, e.start_index));
        Ok(())
    }

    fn match_success(&mut self, e: &MatchEvent) -> Result<(), ListenerError> {
        self.push(format!(
            "{}+ {} {}..{}",
            indent(e.level),
            e.label,
            e.start_index,
            e.current_index
        ));
        Ok(())
    }

    fn match_failure(&mut self, e: &MatchEvent) -> Result<(), ListenerError> {
        self.push(format!("{}- {} @{}", indent(e.level), e.label, e.start_index));
        Ok(())
    }

    fn after_parse(&mut self, result: &ParseResult<V>) -> Result<(), ListenerError> {
        self.push(format!(
            "matched={} end={}",
            result.matched, result.match_range.end
        ));
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleStats {
    pub attempts: usize,
    pub successes: usize,
    pub failures: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub parses: usize,
    pub max_level: usize,
    pub rules: BTreeMap<String, RuleStats>,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Parses: {}", self.parses)?;
        writeln!(f, "Max level: {}", self.max_level)?;
        let width = self.rules.keys().map(|k| k.len()).max().unwrap_or(0);
        for (label, s) in &self.rules {
            writeln!(
                f,
                "  {:width$}  {:>8} attempts {:>8} ok {:>8} failed",
                label,
                s.attempts,
                s.successes,
                s.failures,
                width = width
            )?;
        }
        Ok(())
    }
}

/// Counts attempts, successes and failures per rule label
#[derive(Clone, Debug, Default)]
pub struct StatsListener {
    stats: Arc<Mutex<Stats>>,
}

impl StatsListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Stats {
        lock(&self.stats).clone()
    }

    fn update<F: FnOnce(&mut RuleStats)>(&self, e: &MatchEvent, f: F) {
        let mut stats = lock(&self.stats);
        f(stats.rules.entry(e.label.to_string()).or_default());
    }
}

impl<V> Listener<V> for StatsListener {
    fn before_parse(&mut self, _input: &dyn Input) -> Result<(), ListenerError> {
        lock(&self.stats).parses += 1;
        Ok(())
    }

    fn before_match(&mut self, e: &MatchEvent) -> Result<(), ListenerError> {
        {
            let mut stats = lock(&self.stats);
            stats.max_level = stats.max_level.max(e.level);
        }
        self.update(e, |s| s.attempts += 1);
        Ok(())
    }

    fn match_success(&mut self, e: &MatchEvent) -> Result<(), ListenerError> {
        self.update(e, |s| s.successes += 1);
        Ok(())
    }

    fn match_failure(&mut self, e: &MatchEvent) -> Result<(), ListenerError> {
        self.update(e, |s| s.failures += 1);
        Ok(())
    }
}
