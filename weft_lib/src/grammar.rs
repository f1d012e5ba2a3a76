use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use crate::rule::{Rule, RuleId};
use crate::Error;

pub(crate) struct Node<V> {
    pub(crate) rule: Rule<V>,
    pub(crate) label: Option<String>,
}

/// An immutable graph of rules with a designated root.  Grammars
/// don't hold any state about the runs they're used in, so they can
/// be shared (through an `Arc`) by many runs, on many threads.
pub struct Grammar<V> {
    // Arena with all the rules created while building the grammar.
    // Some of them (the placeholders used to break cycles) aren't
    // reachable from the root anymore.
    nodes: Vec<Node<V>>,
    root: RuleId,
}

impl<V> Grammar<V> {
    pub(crate) fn new(nodes: Vec<Node<V>>, root: RuleId) -> Result<Self, Error> {
        let grammar = Self { nodes, root };
        grammar.check()?;
        Ok(grammar)
    }

    /// Walk the graph from the root making sure every edge points
    /// within the arena and that no placeholder is left behind
    fn check(&self) -> Result<(), Error> {
        if self.root.0 >= self.nodes.len() {
            return Err(Error::Construction(format!(
                "root rule {} doesn't belong to this grammar",
                self.root
            )));
        }
        let mut seen = HashSet::new();
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            let rule = &self.nodes[id.0].rule;
            if let Rule::Reference(key) = rule {
                return Err(Error::Construction(format!(
                    "unresolved reference to production {}",
                    key
                )));
            }
            for child in rule.children() {
                if child.0 >= self.nodes.len() {
                    return Err(Error::Construction(format!(
                        "rule {} points at rule {}, which doesn't belong to this grammar",
                        id, child
                    )));
                }
                pending.push(child);
            }
        }
        Ok(())
    }

    pub fn root(&self) -> RuleId {
        self.root
    }

    /// # Panics
    ///
    /// Panics if `id` was handed out by the builder of another grammar
    pub fn rule(&self, id: RuleId) -> &Rule<V> {
        &self.nodes[id.0].rule
    }

    /// # Panics
    ///
    /// Panics if `id` doesn't belong to this grammar, same as `rule()`
    pub fn label(&self, id: RuleId) -> Option<&str> {
        self.nodes[id.0].label.as_deref()
    }

    /// The label of the rule if it has one, a short description of it
    /// otherwise
    pub fn describe(&self, id: RuleId) -> Cow<'_, str> {
        match self.label(id) {
            Some(label) => Cow::Borrowed(label),
            None => Cow::Owned(self.rule(id).to_string()),
        }
    }

    /// Rules reachable from the root, in depth first order
    pub fn reachable(&self) -> Vec<RuleId> {
        let mut seen = HashSet::new();
        let mut order = vec![];
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            pending.extend(self.rule(id).children().into_iter().rev());
        }
        order
    }
}

impl<V> fmt::Display for Grammar<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let reachable = self.reachable();
        writeln!(f, "Root: {}", self.root)?;
        writeln!(f, "Rules: {}", reachable.len())?;
        for id in reachable {
            write!(f, "  {:#04} ", id.0)?;
            match self.label(id) {
                Some(label) => writeln!(f, "{} <- {}", label, self.rule(id))?,
                None => writeln!(f, "{}", self.rule(id))?,
            }
        }
        write!(f, "")
    }
}

impl<V> fmt::Debug for Grammar<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
