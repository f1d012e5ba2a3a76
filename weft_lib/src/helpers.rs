// helpers.rs --- shorthands for common rules
//
// Small functions that combine the primitives of `GrammarBuilder` into
// the rules most grammars end up needing: character classes, tokens
// followed by spacing, case insensitive keywords.
//
use crate::builder::GrammarBuilder;
use crate::rule::RuleId;
use crate::Error;

/// Exactly the character `c`
pub fn ch<V>(b: &mut GrammarBuilder<V>, c: char) -> RuleId {
    let rule = if c.is_ascii() {
        let byte = c as u8;
        b.char_if(move |u| u == byte)
    } else {
        b.code_point_if(move |p| p == c)
    };
    b.label(rule, &format!("{:?}", c))
}

/// Any character within `low..=high`
pub fn char_range<V>(b: &mut GrammarBuilder<V>, low: char, high: char) -> RuleId {
    let rule = b.code_point_if(move |c| (low..=high).contains(&c));
    b.label(rule, &format!("[{}-{}]", low, high))
}

pub fn any_of<V>(b: &mut GrammarBuilder<V>, chars: &str) -> RuleId {
    let set: Vec<char> = chars.chars().collect();
    let rule = b.code_point_if(move |c| set.contains(&c));
    b.label(rule, &format!("[{}]", chars))
}

pub fn none_of<V>(b: &mut GrammarBuilder<V>, chars: &str) -> RuleId {
    let set: Vec<char> = chars.chars().collect();
    let rule = b.code_point_if(move |c| !set.contains(&c));
    b.label(rule, &format!("[^{}]", chars))
}

/// Any single code point
pub fn any_char<V>(b: &mut GrammarBuilder<V>) -> RuleId {
    let rule = b.code_point_if(|_| true);
    b.label(rule, "ANY")
}

pub fn digit<V>(b: &mut GrammarBuilder<V>) -> RuleId {
    let rule = b.char_if(|c| c.is_ascii_digit());
    b.label(rule, "DIGIT")
}

pub fn alpha<V>(b: &mut GrammarBuilder<V>) -> RuleId {
    let rule = b.code_point_if(char::is_alphabetic);
    b.label(rule, "ALPHA")
}

pub fn alphanumeric<V>(b: &mut GrammarBuilder<V>) -> RuleId {
    let rule = b.code_point_if(char::is_alphanumeric);
    b.label(rule, "ALNUM")
}

pub fn whitespace<V>(b: &mut GrammarBuilder<V>) -> RuleId {
    let rule = b.code_point_if(char::is_whitespace);
    b.label(rule, "WS")
}

/// `s`, ignoring case
pub fn ignore_case<V>(b: &mut GrammarBuilder<V>, s: &str) -> Result<RuleId, Error> {
    let rule = b.trie([s], true)?;
    Ok(b.label(rule, &format!("{:?}i", s)))
}

/// Zero or more whitespace characters
pub fn spacing<V>(b: &mut GrammarBuilder<V>) -> RuleId {
    let ws = whitespace(b);
    let rule = b.zero_or_more(ws);
    b.label(rule, "spacing")
}

/// `rule` followed by optional spacing
pub fn token<V>(b: &mut GrammarBuilder<V>, rule: RuleId) -> RuleId {
    let spacing = spacing(b);
    b.sequence([rule, spacing])
}
