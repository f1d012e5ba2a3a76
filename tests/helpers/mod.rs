#![allow(dead_code)]

use std::sync::Arc;

use weft_lib::{Error, Grammar, GrammarBuilder, ParseResult, ParseRun, RuleId};
use weft_value::{format, Value};

pub type Builder = GrammarBuilder<Value>;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn build<F>(f: F) -> Arc<Grammar<Value>>
where
    F: FnOnce(&mut Builder) -> Result<RuleId, Error>,
{
    init();
    let grammar = GrammarBuilder::new().build(f).unwrap();
    println!("GRAMMAR:\n{}", grammar);
    Arc::new(grammar)
}

pub fn run_str(grammar: &Arc<Grammar<Value>>, input: &str) -> Result<ParseResult<Value>, Error> {
    ParseRun::new(grammar.clone()).run_str(input)
}

/// The whole input matched and the value on top of the stack prints
/// out as `expected`
pub fn assert_match(expected: &str, r: Result<ParseResult<Value>, Error>) {
    assert!(r.is_ok());
    let result = r.unwrap();
    assert!(result.matched_entire_input, "{:?}", result.failure);
    let v = result.top_value();
    assert!(v.is_some());
    assert_eq!(expected.to_string(), format::compact(v.unwrap()));
}

/// A prefix of the input matched
pub fn assert_prefix(matched: &str, rest: &str, r: Result<ParseResult<Value>, Error>) {
    assert!(r.is_ok());
    let result = r.unwrap();
    assert!(result.matched);
    assert_eq!(matched, result.matched_text);
    assert_eq!(rest, result.rest_of_input);
}

pub fn assert_no_match(r: Result<ParseResult<Value>, Error>) {
    assert!(r.is_ok());
    let result = r.unwrap();
    assert!(!result.matched);
    assert!(result.values.is_empty());
    assert_eq!(0..0, result.match_range);
}

pub fn assert_err(expected: Error, r: Result<ParseResult<Value>, Error>) {
    assert!(r.is_err());
    let e = r.unwrap_err();
    assert_eq!(expected, e);
}
