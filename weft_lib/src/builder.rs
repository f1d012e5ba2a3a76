// builder.rs --- grammar construction
//
// Grammars are written as plain functions that call each other to
// build the rule graph.  Recursive grammars would make those calls
// recurse forever, so each production is requested through
// `GrammarBuilder::production()`.  A production requested while it is
// still being built gets a placeholder (`Rule::Reference`) instead,
// and once the outermost production (or the whole grammar) is done
// all edges pointing at placeholders are patched to point at the real
// rules.
//
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::context::MatchContext;
use crate::grammar::{Grammar, Node};
use crate::rule::{Rule, RuleId};
use crate::trie::Trie;
use crate::Error;

/// Argument of a parametrized production
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyArg {
    Int(i64),
    Char(char),
    Str(String),
    Bool(bool),
}

impl From<i64> for KeyArg {
    fn from(v: i64) -> Self {
        KeyArg::Int(v)
    }
}

impl From<i32> for KeyArg {
    fn from(v: i32) -> Self {
        KeyArg::Int(v.into())
    }
}

impl From<u32> for KeyArg {
    fn from(v: u32) -> Self {
        KeyArg::Int(v.into())
    }
}

impl From<char> for KeyArg {
    fn from(v: char) -> Self {
        KeyArg::Char(v)
    }
}

impl From<&str> for KeyArg {
    fn from(v: &str) -> Self {
        KeyArg::Str(v.to_string())
    }
}

impl From<String> for KeyArg {
    fn from(v: String) -> Self {
        KeyArg::Str(v)
    }
}

impl From<bool> for KeyArg {
    fn from(v: bool) -> Self {
        KeyArg::Bool(v)
    }
}

impl fmt::Display for KeyArg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyArg::Int(v) => write!(f, "{}", v),
            KeyArg::Char(v) => write!(f, "{:?}", v),
            KeyArg::Str(v) => write!(f, "{:?}", v),
            KeyArg::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Identity of a production: its name plus the arguments it was
/// requested with
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProductionKey {
    name: String,
    args: Vec<KeyArg>,
}

impl ProductionKey {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: vec![],
        }
    }

    pub fn arg<A: Into<KeyArg>>(mut self, arg: A) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[KeyArg] {
        &self.args
    }
}

impl From<&str> for ProductionKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for ProductionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.args.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

pub struct GrammarBuilder<V> {
    // Arena where all rules get created
    nodes: Vec<Node<V>>,
    // Map from productions to the rule they produced.  `None` marks
    // productions still being built.  Cleared once the outermost
    // production finishes.
    productions: HashMap<ProductionKey, Option<RuleId>>,
    // Placeholders handed out for productions requested while they
    // were being built.  Patched by `patch_references()`.
    references: Vec<RuleId>,
    // Number of productions currently being built
    in_flight: usize,
}

impl<V> Default for GrammarBuilder<V> {
    fn default() -> Self {
        Self {
            nodes: vec![],
            productions: HashMap::new(),
            references: vec![],
            in_flight: 0,
        }
    }
}

impl<V> GrammarBuilder<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` to build the root rule and hand out the finished
    /// grammar
    pub fn build<F>(mut self, f: F) -> Result<Grammar<V>, Error>
    where
        F: FnOnce(&mut Self) -> Result<RuleId, Error>,
    {
        // the root closure counts as an outermost production: nothing
        // gets patched until it returns
        self.in_flight += 1;
        let root = f(&mut self);
        self.in_flight -= 1;
        let root = root?;
        let targets = self.patch_references();
        self.references.clear();
        let root = targets?.get(&root).copied().unwrap_or(root);
        debug!("built grammar with {} rules, root {}", self.nodes.len(), root);
        Grammar::new(self.nodes, root)
    }

    /// Build the production identified by `key` with `f`, unless it
    /// has already been built or is being built right now.  Finished
    /// productions are remembered for as long as the builder lives.
    pub fn production<K, F>(&mut self, key: K, f: F) -> Result<RuleId, Error>
    where
        K: Into<ProductionKey>,
        F: FnOnce(&mut Self) -> Result<RuleId, Error>,
    {
        let key = key.into();
        if key.name.is_empty() {
            return Err(Error::Construction(
                "productions need a non-empty name".to_string(),
            ));
        }
        match self.productions.get(&key).copied() {
            Some(Some(id)) => return Ok(id),
            Some(None) => {
                debug!("production {} requested while being built", key);
                let id = self.push(Rule::Reference(key));
                self.references.push(id);
                return Ok(id);
            }
            None => {}
        }

        self.productions.insert(key.clone(), None);
        self.in_flight += 1;
        let built = f(self);
        self.in_flight -= 1;

        let id = match built {
            Ok(id) => id,
            Err(e) => {
                self.productions.remove(&key);
                if self.in_flight == 0 {
                    self.references.clear();
                }
                return Err(e);
            }
        };
        if let Some(node) = self.nodes.get_mut(id.0) {
            if node.label.is_none() {
                node.label = Some(key.to_string());
            }
        }
        self.productions.insert(key.clone(), Some(id));

        if self.in_flight > 0 {
            return Ok(id);
        }
        let targets = self.patch_references();
        self.references.clear();
        match targets {
            Ok(targets) => Ok(targets.get(&id).copied().unwrap_or(id)),
            Err(e) => {
                self.productions.remove(&key);
                Err(e)
            }
        }
    }

    /// Point every edge that leads to a placeholder at the rule built
    /// for its production.  Returns the map from placeholders to their
    /// targets.
    fn patch_references(&mut self) -> Result<HashMap<RuleId, RuleId>, Error> {
        let mut targets = HashMap::new();
        for reference in &self.references {
            targets.insert(*reference, self.resolve(*reference)?);
        }
        if !targets.is_empty() {
            debug!("patching {} references", targets.len());
            for node in self.nodes.iter_mut() {
                node.rule
                    .map_children(|child| targets.get(&child).copied().unwrap_or(child));
            }
            // productions that are aliases of others may have been
            // memoized as placeholders
            for id in self.productions.values_mut().flatten() {
                *id = targets.get(id).copied().unwrap_or(*id);
            }
        }
        Ok(targets)
    }

    /// Follow placeholders until reaching a rule that isn't one
    fn resolve(&self, reference: RuleId) -> Result<RuleId, Error> {
        let mut current = reference;
        let mut seen = HashSet::new();
        while let Some(Node {
            rule: Rule::Reference(key),
            ..
        }) = self.nodes.get(current.0)
        {
            if !seen.insert(current) {
                return Err(Error::Construction(format!(
                    "production {} is only defined in terms of itself",
                    key
                )));
            }
            current = match self.productions.get(key) {
                Some(Some(id)) => *id,
                _ => {
                    return Err(Error::Construction(format!(
                        "production {} was never finished",
                        key
                    )))
                }
            };
        }
        Ok(current)
    }

    pub(crate) fn push(&mut self, rule: Rule<V>) -> RuleId {
        let id = RuleId(self.nodes.len());
        self.nodes.push(Node { rule, label: None });
        id
    }

    /// Name `id` in traces, statistics and failure reports
    pub fn label(&mut self, id: RuleId, label: &str) -> RuleId {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.label = Some(label.to_string());
        }
        id
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule<V>> {
        self.nodes.get(id.0).map(|n| &n.rule)
    }

    pub fn empty(&mut self) -> RuleId {
        self.push(Rule::Empty)
    }

    pub fn never(&mut self) -> RuleId {
        self.push(Rule::Never)
    }

    pub fn end_of_input(&mut self) -> RuleId {
        self.push(Rule::EndOfInput)
    }

    pub fn char_if<F>(&mut self, predicate: F) -> RuleId
    where
        F: Fn(u8) -> bool + Send + Sync + 'static,
    {
        self.push(Rule::Char(Arc::new(predicate)))
    }

    pub fn code_point_if<F>(&mut self, predicate: F) -> RuleId
    where
        F: Fn(char) -> bool + Send + Sync + 'static,
    {
        self.push(Rule::CodePoint(Arc::new(predicate)))
    }

    pub fn literal(&mut self, s: &str) -> RuleId {
        self.push(Rule::Literal(s.to_string()))
    }

    pub fn regex(&mut self, pattern: &str) -> Result<RuleId, Error> {
        let regex = regex::bytes::Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
            Error::Construction(format!("invalid regular expression {:?}: {}", pattern, e))
        })?;
        Ok(self.push(Rule::Regex {
            pattern: pattern.to_string(),
            regex,
        }))
    }

    pub fn trie<I, S>(&mut self, words: I, case_fold: bool) -> Result<RuleId, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let trie = Trie::new(words, case_fold)?;
        Ok(self.push(Rule::Trie(trie)))
    }

    pub fn sequence<I: IntoIterator<Item = RuleId>>(&mut self, items: I) -> RuleId {
        self.push(Rule::Sequence(items.into_iter().collect()))
    }

    pub fn choice<I: IntoIterator<Item = RuleId>>(&mut self, items: I) -> RuleId {
        self.push(Rule::Choice(items.into_iter().collect()))
    }

    pub fn repeat(&mut self, child: RuleId, min: usize, max: Option<usize>) -> Result<RuleId, Error> {
        if let Some(max) = max {
            if max < min {
                return Err(Error::Construction(format!(
                    "repetition of rule {} can't match at most {} times and at least {}",
                    child, max, min
                )));
            }
        }
        Ok(self.push(Rule::Repeat { child, min, max }))
    }

    pub fn optional(&mut self, child: RuleId) -> RuleId {
        self.push(Rule::Repeat {
            child,
            min: 0,
            max: Some(1),
        })
    }

    pub fn zero_or_more(&mut self, child: RuleId) -> RuleId {
        self.push(Rule::Repeat {
            child,
            min: 0,
            max: None,
        })
    }

    pub fn one_or_more(&mut self, child: RuleId) -> RuleId {
        self.push(Rule::Repeat {
            child,
            min: 1,
            max: None,
        })
    }

    /// Positive lookahead (`&child`)
    pub fn test(&mut self, child: RuleId) -> RuleId {
        self.push(Rule::Lookahead {
            child,
            negate: false,
        })
    }

    /// Negative lookahead (`!child`)
    pub fn test_not(&mut self, child: RuleId) -> RuleId {
        self.push(Rule::Lookahead {
            child,
            negate: true,
        })
    }

    /// Semantic action, skipped while within a lookahead
    pub fn action<F>(&mut self, f: F) -> RuleId
    where
        F: Fn(&mut MatchContext<'_, V>) -> Result<bool, Error> + Send + Sync + 'static,
    {
        self.push(Rule::Action {
            action: Arc::new(f),
            skip_in_lookahead: true,
        })
    }

    /// Semantic action that also runs within lookaheads
    pub fn action_in_lookahead<F>(&mut self, f: F) -> RuleId
    where
        F: Fn(&mut MatchContext<'_, V>) -> Result<bool, Error> + Send + Sync + 'static,
    {
        self.push(Rule::Action {
            action: Arc::new(f),
            skip_in_lookahead: false,
        })
    }

    pub fn conditional<F>(&mut self, predicate: F, then: RuleId, otherwise: Option<RuleId>) -> RuleId
    where
        F: Fn(&MatchContext<'_, V>) -> bool + Send + Sync + 'static,
    {
        self.push(Rule::Conditional {
            predicate: Arc::new(predicate),
            then,
            otherwise,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Builder = GrammarBuilder<()>;

    // expr <- 'a' / '(' expr ')'
    fn expr(b: &mut Builder) -> Result<RuleId, Error> {
        b.production("expr", |b| {
            let a = b.literal("a");
            let open = b.literal("(");
            let inner = expr(b)?;
            let close = b.literal(")");
            let nested = b.sequence([open, inner, close]);
            Ok(b.choice([a, nested]))
        })
    }

    #[test]
    fn self_recursion_yields_a_cycle() {
        let g = Builder::new().build(expr).unwrap();
        let root = g.root();
        assert_eq!(Some("expr"), g.label(root));

        let alternatives = g.rule(root).children();
        assert_eq!(2, alternatives.len());
        let nested = g.rule(alternatives[1]).children();
        assert_eq!(root, nested[1]);
        assert!(!g.reachable().iter().any(|id| matches!(g.rule(*id), Rule::Reference(_))));
    }

    // a <- 'x' b / 'y'
    // b <- 'z' a
    fn a(b: &mut Builder) -> Result<RuleId, Error> {
        b.production("a", |b| {
            let x = b.literal("x");
            let rb = rule_b(b)?;
            let first = b.sequence([x, rb]);
            let y = b.literal("y");
            Ok(b.choice([first, y]))
        })
    }

    fn rule_b(b: &mut Builder) -> Result<RuleId, Error> {
        b.production("b", |b| {
            let z = b.literal("z");
            let ra = a(b)?;
            Ok(b.sequence([z, ra]))
        })
    }

    #[test]
    fn mutual_recursion_yields_a_cycle() {
        let g = Builder::new().build(a).unwrap();
        let root = g.root();
        let first = g.rule(root).children()[0];
        let b_rule = g.rule(first).children()[1];
        assert_eq!(Some("b"), g.label(b_rule));
        assert_eq!(root, g.rule(b_rule).children()[1]);
    }

    #[test]
    fn finished_productions_are_shared() {
        let g = Builder::new()
            .build(|b| {
                b.production("pair", |b| {
                    let d1 = b.production("digit", |b| Ok(b.char_if(|c| c.is_ascii_digit())))?;
                    let d2 = b.production("digit", |b| Ok(b.char_if(|c| c.is_ascii_digit())))?;
                    assert_eq!(d1, d2);
                    Ok(b.sequence([d1, d2]))
                })
            })
            .unwrap();
        let children = g.rule(g.root()).children();
        assert_eq!(children[0], children[1]);
    }

    #[test]
    fn productions_requested_from_the_root_are_shared() {
        fn digit(b: &mut Builder) -> Result<RuleId, Error> {
            b.production("digit", |b| Ok(b.char_if(|c| c.is_ascii_digit())))
        }
        let g = Builder::new()
            .build(|b| {
                let d1 = digit(b)?;
                let d2 = digit(b)?;
                assert_eq!(d1, d2);
                let e1 = expr(b)?;
                let e2 = expr(b)?;
                assert_eq!(e1, e2);
                Ok(b.sequence([d1, d2, e1]))
            })
            .unwrap();
        let children = g.rule(g.root()).children();
        assert_eq!(children[0], children[1]);
        assert_eq!(Some("expr"), g.label(children[2]));
        let nested = g.rule(children[2]).children()[1];
        assert_eq!(children[2], g.rule(nested).children()[1]);
    }

    #[test]
    fn productions_outside_of_build_are_shared() {
        let mut b = Builder::new();
        let first = expr(&mut b).unwrap();
        let second = expr(&mut b).unwrap();
        assert_eq!(first, second);
        assert!(!matches!(b.rule(first), Some(Rule::Reference(_))));
    }

    // alias <- expr
    // expr  <- 'a' / '(' alias ')'
    #[test]
    fn aliases_of_productions_in_flight_are_resolved() {
        fn alias(b: &mut Builder) -> Result<RuleId, Error> {
            b.production("alias", |b| {
                let root = b.production("expr", |b| {
                    let a = b.literal("a");
                    let open = b.literal("(");
                    let inner = alias(b)?;
                    let close = b.literal(")");
                    let nested = b.sequence([open, inner, close]);
                    Ok(b.choice([a, nested]))
                })?;
                Ok(root)
            })
        }
        let mut b = Builder::new();
        let expr = b.production("expr", |b| {
            let a = b.literal("a");
            let open = b.literal("(");
            let inner = alias(b)?;
            let close = b.literal(")");
            let nested = b.sequence([open, inner, close]);
            Ok(b.choice([a, nested]))
        });
        let expr = expr.unwrap();
        let again = alias(&mut b).unwrap();
        assert_eq!(expr, again);
        assert!(!matches!(b.rule(again), Some(Rule::Reference(_))));
    }

    #[test]
    fn arguments_tell_productions_apart() {
        fn word(b: &mut Builder, w: &str) -> Result<RuleId, Error> {
            b.production(ProductionKey::new("word").arg(w), |b| Ok(b.literal(w)))
        }
        let g = Builder::new()
            .build(|b| {
                let foo = word(b, "foo")?;
                let bar = word(b, "bar")?;
                assert_ne!(foo, bar);
                Ok(b.choice([foo, bar]))
            })
            .unwrap();
        let children = g.rule(g.root()).children();
        assert_eq!(Some("word(\"foo\")"), g.label(children[0]));
        assert_eq!(Some("word(\"bar\")"), g.label(children[1]));
    }

    #[test]
    fn productions_defined_only_through_themselves() {
        fn loop_(b: &mut Builder) -> Result<RuleId, Error> {
            b.production("loop", loop_)
        }
        let err = Builder::new().build(loop_).unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
    }

    #[test]
    fn construction_errors() {
        let mut b = Builder::new();
        assert!(matches!(
            b.production("", |b| Ok(b.empty())),
            Err(Error::Construction(_))
        ));
        let x = b.literal("x");
        assert!(matches!(b.repeat(x, 2, Some(1)), Err(Error::Construction(_))));
        assert!(b.repeat(x, 1, Some(1)).is_ok());
        assert!(matches!(b.regex("(unclosed"), Err(Error::Construction(_))));

        let foreign = Builder::new().build(|b| Ok(b.sequence([RuleId(42)])));
        assert!(matches!(foreign, Err(Error::Construction(_))));
    }

    #[test]
    fn failed_productions_leave_the_builder_usable() {
        let mut b = Builder::new();
        let failed = b.production("broken", |b| b.regex("["));
        assert!(failed.is_err());
        let fixed = b.production("broken", |b| Ok(b.literal("[")));
        assert!(fixed.is_ok());
    }

    #[test]
    fn keys_display_their_arguments() {
        let key = ProductionKey::new("number").arg(10).arg('x').arg(true);
        assert_eq!("number(10, 'x', true)", key.to_string());
        assert_eq!("digit", ProductionKey::from("digit").to_string());
    }
}
