use std::collections::BTreeMap;

use crate::input::Input;
use crate::Error;

#[derive(Clone, Debug, Default)]
struct TrieNode {
    // Index of the node reached through each code point
    children: BTreeMap<char, usize>,
    // Some word of the dictionary ends at this node
    terminal: bool,
}

/// Prefix tree over a dictionary of words, used to find the longest
/// word starting at a given position of the input
#[derive(Clone, Debug)]
pub struct Trie {
    nodes: Vec<TrieNode>,
    case_fold: bool,
    words: usize,
}

/// Lowercase `c` when that yields a single code point
fn fold(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

impl Trie {
    pub fn new<I, S>(words: I, case_fold: bool) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = Self {
            nodes: vec![TrieNode::default()],
            case_fold,
            words: 0,
        };
        for word in words {
            trie.insert(word.as_ref())?;
        }
        if trie.words == 0 {
            return Err(Error::Construction(
                "a trie needs at least one word".to_string(),
            ));
        }
        Ok(trie)
    }

    fn insert(&mut self, word: &str) -> Result<(), Error> {
        if word.is_empty() {
            return Err(Error::Construction(
                "a trie can't contain the empty string".to_string(),
            ));
        }
        let mut node = 0;
        for c in word.chars() {
            let c = self.key(c);
            node = match self.nodes[node].children.get(&c) {
                Some(next) => *next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(c, next);
                    next
                }
            };
        }
        if !self.nodes[node].terminal {
            self.nodes[node].terminal = true;
            self.words += 1;
        }
        Ok(())
    }

    fn key(&self, c: char) -> char {
        if self.case_fold {
            fold(c)
        } else {
            c
        }
    }

    /// Number of distinct words in the dictionary
    pub fn len(&self) -> usize {
        self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words == 0
    }

    pub fn case_fold(&self) -> bool {
        self.case_fold
    }

    pub fn contains(&self, word: &str) -> bool {
        let mut node = 0;
        for c in word.chars() {
            match self.nodes[node].children.get(&self.key(c)) {
                Some(next) => node = *next,
                None => return false,
            }
        }
        self.nodes[node].terminal
    }

    /// Length in bytes of the longest word of the dictionary that
    /// prefixes the input at `start`
    pub fn longest_match(&self, input: &dyn Input, start: usize) -> Option<usize> {
        let mut node = 0;
        let mut index = start;
        let mut longest = None;
        while let Some(c) = input.code_point_at(index) {
            node = match self.nodes[node].children.get(&self.key(c)) {
                Some(next) => *next,
                None => break,
            };
            index += c.len_utf8();
            if self.nodes[node].terminal {
                longest = Some(index - start);
            }
        }
        longest
    }
}
