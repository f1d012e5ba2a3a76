// rule.rs --- the rule algebra
//
// Rules are the nodes of a grammar graph.  They live in the arena of
// a `Grammar` and point at each other through `RuleId`s, which is how
// a rule can end up referring to itself.  This module knows how each
// kind of rule matches; the bookkeeping around it (positions, stack
// transactions, listeners) lives in `context.rs`.
//
use std::fmt;
use std::sync::Arc;

use log::error;

use crate::builder::ProductionKey;
use crate::context::MatchContext;
use crate::trie::Trie;
use crate::Error;

/// Index of a rule within the arena of a grammar
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub(crate) usize);

impl RuleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type ActionFn<V> =
    Arc<dyn Fn(&mut MatchContext<'_, V>) -> Result<bool, Error> + Send + Sync>;
pub type PredicateFn<V> = Arc<dyn Fn(&MatchContext<'_, V>) -> bool + Send + Sync>;
pub type CharPredicate = Arc<dyn Fn(u8) -> bool + Send + Sync>;
pub type CodePointPredicate = Arc<dyn Fn(char) -> bool + Send + Sync>;

pub enum Rule<V> {
    Sequence(Vec<RuleId>),
    Choice(Vec<RuleId>),
    Repeat {
        child: RuleId,
        min: usize,
        max: Option<usize>,
    },
    Lookahead {
        child: RuleId,
        negate: bool,
    },
    Action {
        action: ActionFn<V>,
        // Succeed without running the action while inside a lookahead
        skip_in_lookahead: bool,
    },
    Conditional {
        predicate: PredicateFn<V>,
        then: RuleId,
        otherwise: Option<RuleId>,
    },
    Char(CharPredicate),
    CodePoint(CodePointPredicate),
    Literal(String),
    Regex {
        pattern: String,
        // `pattern` anchored at the start of the haystack
        regex: regex::bytes::Regex,
    },
    Trie(Trie),
    Empty,
    Never,
    EndOfInput,
    // Stands in for a production still being built
    Reference(ProductionKey),
}

impl<V> Rule<V> {
    pub fn children(&self) -> Vec<RuleId> {
        match self {
            Rule::Sequence(children) | Rule::Choice(children) => children.clone(),
            Rule::Repeat { child, .. } | Rule::Lookahead { child, .. } => vec![*child],
            Rule::Conditional {
                then, otherwise, ..
            } => {
                let mut children = vec![*then];
                children.extend(otherwise);
                children
            }
            _ => vec![],
        }
    }

    /// Rewrite every child edge with `f`
    pub(crate) fn map_children<F: Fn(RuleId) -> RuleId>(&mut self, f: F) {
        match self {
            Rule::Sequence(children) | Rule::Choice(children) => {
                for child in children.iter_mut() {
                    *child = f(*child);
                }
            }
            Rule::Repeat { child, .. } | Rule::Lookahead { child, .. } => *child = f(*child),
            Rule::Conditional {
                then, otherwise, ..
            } => {
                *then = f(*then);
                if let Some(o) = otherwise {
                    *o = f(*o);
                }
            }
            _ => {}
        }
    }

    /// Contexts created for lookahead rules, and all their
    /// descendants, are flagged as being within a lookahead
    pub fn is_lookahead(&self) -> bool {
        matches!(self, Rule::Lookahead { .. })
    }

    /// Rules that consume input by themselves, without delegating to
    /// children.  Their failures are the ones worth reporting.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Rule::Char(_)
                | Rule::CodePoint(_)
                | Rule::Literal(_)
                | Rule::Regex { .. }
                | Rule::Trie(_)
                | Rule::EndOfInput
        )
    }
}

impl<V: Clone> Rule<V> {
    pub(crate) fn matches(&self, ctx: &mut MatchContext<'_, V>) -> Result<bool, Error> {
        match self {
            Rule::Sequence(children) => {
                for child in children {
                    if !ctx.create_child(*child).run()? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Rule::Choice(children) => {
                for child in children {
                    if ctx.create_child(*child).run()? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Rule::Repeat { child, min, max } => {
                let mut count = 0;
                while max.map_or(true, |max| count < max) {
                    let before = ctx.current_index();
                    if !ctx.create_child(*child).run()? {
                        break;
                    }
                    count += 1;
                    // zero-width iterations would repeat forever
                    if ctx.current_index() == before && count >= *min {
                        break;
                    }
                }
                Ok(count >= *min)
            }
            Rule::Lookahead { child, negate } => {
                let saved = ctx.current_index();
                ctx.stack_mut().take_snapshot();
                let matched = ctx.create_child(*child).run();
                // lookaheads never contribute values, not even when
                // the child matched
                ctx.stack_mut().restore_snapshot()?;
                let matched = matched?;
                ctx.set_current_index(saved)?;
                Ok(matched != *negate)
            }
            Rule::Action {
                action,
                skip_in_lookahead,
            } => {
                if *skip_in_lookahead && ctx.in_lookahead() {
                    return Ok(true);
                }
                action(ctx)
            }
            Rule::Conditional {
                predicate,
                then,
                otherwise,
            } => {
                let branch = if predicate(&*ctx) {
                    Some(*then)
                } else {
                    *otherwise
                };
                match branch {
                    Some(rule) => ctx.create_child(rule).run(),
                    None => Ok(true),
                }
            }
            Rule::Char(predicate) => match ctx.current_char() {
                Some(c) if predicate(c) => Ok(ctx.advance_index(1)),
                _ => Ok(false),
            },
            Rule::CodePoint(predicate) => match ctx.current_code_point() {
                Some(c) if predicate(c) => Ok(ctx.advance_index(c.len_utf8())),
                _ => Ok(false),
            },
            Rule::Literal(expected) => {
                let input = ctx.input();
                let start = ctx.current_index();
                let end = start + expected.len();
                if end > input.len() || input.slice(start, end) != expected.as_bytes() {
                    return Ok(false);
                }
                Ok(ctx.advance_index(expected.len()))
            }
            Rule::Regex { regex, .. } => {
                let input = ctx.input();
                let start = ctx.current_index();
                match regex.find(input.slice(start, input.len())) {
                    Some(m) if m.start() == 0 => Ok(ctx.advance_index(m.end())),
                    _ => Ok(false),
                }
            }
            Rule::Trie(trie) => match trie.longest_match(ctx.input(), ctx.current_index()) {
                Some(len) => Ok(ctx.advance_index(len)),
                None => Ok(false),
            },
            Rule::Empty => Ok(true),
            Rule::Never => Ok(false),
            Rule::EndOfInput => Ok(ctx.at_end()),
            Rule::Reference(key) => {
                error!("unresolved reference to production {} reached", key);
                Ok(false)
            }
        }
    }
}

fn write_ids(f: &mut fmt::Formatter, name: &str, ids: &[RuleId]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", id)?;
    }
    write!(f, ")")
}

impl<V> fmt::Display for Rule<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rule::Sequence(children) => write_ids(f, "sequence", children),
            Rule::Choice(children) => write_ids(f, "choice", children),
            Rule::Repeat { child, min, max } => match max {
                Some(max) => write!(f, "repeat({}){{{},{}}}", child, min, max),
                None => write!(f, "repeat({}){{{},}}", child, min),
            },
            Rule::Lookahead { child, negate } => {
                write!(f, "{}({})", if *negate { "!" } else { "&" }, child)
            }
            Rule::Action { .. } => write!(f, "action"),
            Rule::Conditional {
                then, otherwise, ..
            } => match otherwise {
                Some(o) => write!(f, "if({}, {})", then, o),
                None => write!(f, "if({})", then),
            },
            Rule::Char(_) => write!(f, "char"),
            Rule::CodePoint(_) => write!(f, "codepoint"),
            Rule::Literal(s) => write!(f, "{:?}", s),
            Rule::Regex { pattern, .. } => write!(f, "/{}/", pattern),
            Rule::Trie(trie) => write!(f, "trie({} words)", trie.len()),
            Rule::Empty => write!(f, "empty"),
            Rule::Never => write!(f, "never"),
            Rule::EndOfInput => write!(f, "EOI"),
            Rule::Reference(key) => write!(f, "ref({})", key),
        }
    }
}

impl<V> fmt::Debug for Rule<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Rule({})", self)
    }
}
