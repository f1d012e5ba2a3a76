mod helpers;
use helpers::{assert_match, assert_no_match, assert_prefix, build, run_str, Builder};

use std::sync::Arc;
use std::thread;

use weft_lib::helpers::{ch, digit};
use weft_lib::{Error, GrammarBuilder, MatchContext, ParseRun, Rule, RuleId};
use weft_value::Value;

fn push(b: &mut Builder, s: &'static str) -> RuleId {
    b.action(move |ctx: &mut MatchContext<'_, Value>| {
        ctx.stack_mut().push(Value::from(s));
        Ok(true)
    })
}

#[test]
fn failed_alternatives_leave_no_trace() {
    let grammar = build(|b| {
        let x = push(b, "x");
        let a = b.literal("a");
        let bb = b.literal("b");
        let first = b.sequence([x, a, bb]);

        let untouched = b.action(|ctx: &mut MatchContext<'_, Value>| {
            if ctx.stack().is_empty() && ctx.current_index() == 0 {
                Ok(true)
            } else {
                Err(Error::Action("previous alternative leaked".to_string()))
            }
        });
        let c = b.literal("c");
        let y = push(b, "y");
        let second = b.sequence([untouched, a, c, y]);
        Ok(b.choice([first, second]))
    });
    assert_match("\"y\"", run_str(&grammar, "ac"));
}

#[test]
fn empty_sequence_and_empty_choice() {
    let seq = build(|b| Ok(b.sequence([])));
    assert_prefix("", "abc", run_str(&seq, "abc"));
    assert!(run_str(&seq, "").unwrap().matched_entire_input);

    let choice = build(|b| Ok(b.choice([])));
    assert_no_match(run_str(&choice, "abc"));
    assert_no_match(run_str(&choice, ""));
}

#[test]
fn repetition_bounds() {
    let mut b = Builder::new();
    let d = digit(&mut b);
    assert!(matches!(
        b.repeat(d, 3, Some(2)),
        Err(Error::Construction(_))
    ));

    let grammar = build(|b| {
        let d = digit(b);
        b.repeat(d, 2, Some(3))
    });
    assert_prefix("123", "45", run_str(&grammar, "12345"));
    assert_prefix("12", "", run_str(&grammar, "12"));
    assert_no_match(run_str(&grammar, "1"));
}

#[test]
fn repeating_empty_matches_terminates() {
    let grammar = build(|b| {
        let e = b.empty();
        Ok(b.zero_or_more(e))
    });
    assert_prefix("", "abc", run_str(&grammar, "abc"));
}

#[test]
fn lookaheads_do_not_consume() {
    let grammar = build(|b| {
        let ab = b.literal("ab");
        let peek = b.test(ab);
        let abc = b.literal("abc");
        Ok(b.sequence([peek, abc]))
    });
    assert_prefix("abc", "", run_str(&grammar, "abc"));
    assert_no_match(run_str(&grammar, "abd"));

    let not_x = build(|b| {
        let x = b.literal("x");
        Ok(b.test_not(x))
    });
    assert_prefix("", "abc", run_str(&not_x, "abc"));
    assert_no_match(run_str(&not_x, "xyz"));
}

#[test]
fn lookaheads_do_not_commit_values() {
    let grammar = build(|b| {
        let inside = b.action_in_lookahead(|ctx: &mut MatchContext<'_, Value>| {
            ctx.stack_mut().push(Value::from("inside"));
            Ok(true)
        });
        let a = b.literal("a");
        let body = b.sequence([inside, a]);
        let positive = b.test(body);
        let x = b.literal("x");
        let failing = b.sequence([inside, x]);
        let negative = b.test_not(failing);
        Ok(b.sequence([positive, negative, a]))
    });
    let result = run_str(&grammar, "a").unwrap();
    assert!(result.matched_entire_input);
    assert!(result.values.is_empty());
}

#[test]
fn trie_takes_the_longest_word() {
    let grammar = build(|b| b.trie(["a", "ab", "abc"], false));
    assert_prefix("abc", "d", run_str(&grammar, "abcd"));
    assert_prefix("ab", "x", run_str(&grammar, "abx"));
    assert_no_match(run_str(&grammar, "b"));
}

#[test]
fn literals() {
    let grammar = build(|b| Ok(b.literal("foo")));
    assert_prefix("foo", "bar", run_str(&grammar, "foobar"));
    assert_no_match(run_str(&grammar, "bar"));
    assert_no_match(run_str(&grammar, "fo"));
}

#[test]
fn regular_expressions_are_anchored() {
    let grammar = build(|b| b.regex("[a-z]+[0-9]*"));
    assert_prefix("abc12", "!", run_str(&grammar, "abc12!"));
    assert_no_match(run_str(&grammar, "!abc"));
}

#[test]
fn code_points_advance_by_their_width() {
    let grammar = build(|b| {
        let e = b.code_point_if(|c| c == 'é');
        let x = ch(b, 'x');
        let eoi = b.end_of_input();
        Ok(b.sequence([e, x, eoi]))
    });
    let result = run_str(&grammar, "éx").unwrap();
    assert!(result.matched_entire_input);
    assert_eq!(0..3, result.match_range);
    assert_no_match(run_str(&grammar, "éxy"));
}

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
fn recursive_productions_are_cycles() {
    let grammar = build(expr);
    let root = grammar.root();
    let nested = grammar.rule(root).children()[1];
    assert!(matches!(grammar.rule(nested), Rule::Sequence(_)));
    assert_eq!(root, grammar.rule(nested).children()[1]);

    assert_prefix("((a))", "", run_str(&grammar, "((a))"));
    assert_prefix("a", "))", run_str(&grammar, "a))"));
    assert_no_match(run_str(&grammar, "((a)"));
}

// number <- digit+ ('.' digit+)?
fn decimal(b: &mut Builder) -> Result<RuleId, Error> {
    let d = digit(b);
    let int = b.one_or_more(d);
    let dot = ch(b, '.');
    let frac = b.one_or_more(d);
    let tail = b.sequence([dot, frac]);
    let tail = b.optional(tail);
    Ok(b.sequence([int, tail]))
}

#[test]
fn decimal_numbers() {
    let grammar = build(decimal);
    let result = run_str(&grammar, "123.45").unwrap();
    assert!(result.matched_entire_input);
    assert_eq!(None, result.failure);
    assert_prefix("12", "a", run_str(&grammar, "12a"));
    assert_prefix("12", ".", run_str(&grammar, "12."));
}

#[test]
fn independent_runs_agree() {
    let grammar = build(expr);
    let first = run_str(&grammar, "((a)").unwrap();
    let second = run_str(&grammar, "((a)").unwrap();
    assert_eq!(first, second);

    let mut reused = ParseRun::new(grammar.clone());
    reused.run_str("(a)").unwrap();
    assert_eq!(first, reused.run_str("((a)").unwrap());
}

#[test]
fn concurrent_runs_agree() {
    let grammar = Arc::new(GrammarBuilder::<Value>::new().build(decimal).unwrap());
    let expected = run_str(&grammar, "3.14159 rest").unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let grammar = grammar.clone();
            thread::spawn(move || {
                let mut run = ParseRun::new(grammar);
                (0..50)
                    .map(|_| run.run_str("3.14159 rest"))
                    .collect::<Result<Vec<_>, _>>()
            })
        })
        .collect();
    for handle in handles {
        for result in handle.join().unwrap().unwrap() {
            assert_eq!(expected, result);
        }
    }
}

#[test]
fn conditionals_branch_on_the_stack() {
    let grammar = build(|b| {
        let upper = b.literal("upper");
        let lower = b.literal("lower");
        let mode_upper = push(b, "upper");
        let pick_upper = b.sequence([upper, mode_upper]);
        let pick = b.choice([pick_upper, lower]);
        let sep = ch(b, ':');
        let big = b.literal("A");
        let small = b.literal("a");
        let letter = b.conditional(
            |ctx: &MatchContext<'_, Value>| ctx.stack().peek().map_or(false, |v| v.as_str() == Some("upper")),
            big,
            Some(small),
        );
        Ok(b.sequence([pick, sep, letter]))
    });
    assert_prefix("upper:A", "", run_str(&grammar, "upper:A"));
    assert_prefix("lower:a", "", run_str(&grammar, "lower:a"));
    assert_no_match(run_str(&grammar, "lower:A"));
}

#[test]
fn conditionals_without_else_skip_when_false() {
    let grammar = build(|b| {
        let big = b.literal("A");
        let marked = push(b, "then");
        let then = b.sequence([big, marked]);
        let upper = b.conditional(
            |ctx: &MatchContext<'_, Value>| !ctx.stack().is_empty(),
            then,
            None,
        );
        let small = b.literal("a");
        Ok(b.sequence([upper, small]))
    });
    let result = run_str(&grammar, "a").unwrap();
    assert!(result.matched_entire_input);
    assert_eq!(0..1, result.match_range);
    assert!(result.values.is_empty());
    assert_no_match(run_str(&grammar, "Aa"));
}

#[test]
fn never_always_fails() {
    let grammar = build(|b| {
        let x = push(b, "x");
        let never = b.never();
        Ok(b.sequence([x, never]))
    });
    for input in ["", "abc"] {
        let result = run_str(&grammar, input).unwrap();
        assert!(!result.matched);
        assert!(result.values.is_empty());
        assert_eq!(input, result.rest_of_input);
    }

    let fallback = build(|b| {
        let never = b.never();
        let a = b.literal("a");
        Ok(b.choice([never, a]))
    });
    assert_prefix("a", "b", run_str(&fallback, "ab"));
}

#[test]
fn failures_report_what_was_expected() {
    let grammar = build(|b| {
        let kw = b.literal("let");
        let kw = b.label(kw, "'let'");
        let sp = ch(b, ' ');
        let name = b.regex("[a-z]+")?;
        let name = b.label(name, "name");
        let eq = b.literal("=");
        let eq = b.label(eq, "'='");
        Ok(b.sequence([kw, sp, name, eq]))
    });
    let result = run_str(&grammar, "let x 1").unwrap();
    assert!(!result.matched);
    let failure = result.failure.unwrap();
    assert_eq!(5, failure.index);
    assert_eq!(vec!["'='"], failure.expected);
    assert_eq!("1:6: expected '='", failure.to_string());
}
