// arith.rs --- integer calculator
//
//   calculation <- spacing expr EOI
//   expr        <- term (('+' / '-') term)*
//   term        <- factor (('*' / '/') factor)*
//   factor      <- number / '(' expr ')'
//   number      <- /-?[0-9]+/ spacing
//
// Operators are applied as soon as their right operand is matched,
// which makes them left associative.
//
use weft_lib::helpers::{ch, spacing, token};
use weft_lib::{Error, Grammar, GrammarBuilder, MatchContext, RuleId};
use weft_value::Value;

type Builder = GrammarBuilder<Value>;

pub fn grammar() -> Result<Grammar<Value>, Error> {
    GrammarBuilder::new().build(|b| {
        b.production("calculation", |b| {
            let leading = spacing(b);
            let e = expr(b)?;
            let eoi = b.end_of_input();
            Ok(b.sequence([leading, e, eoi]))
        })
    })
}

fn expr(b: &mut Builder) -> Result<RuleId, Error> {
    b.production("expr", |b| {
        let first = term(b)?;
        let add = binary(b, '+', term, "addition", i64::checked_add)?;
        let sub = binary(b, '-', term, "subtraction", i64::checked_sub)?;
        let op = b.choice([add, sub]);
        let rest = b.zero_or_more(op);
        Ok(b.sequence([first, rest]))
    })
}

fn term(b: &mut Builder) -> Result<RuleId, Error> {
    b.production("term", |b| {
        let first = factor(b)?;
        let mul = binary(b, '*', factor, "multiplication", i64::checked_mul)?;
        let div = binary(b, '/', factor, "division", i64::checked_div)?;
        let op = b.choice([mul, div]);
        let rest = b.zero_or_more(op);
        Ok(b.sequence([first, rest]))
    })
}

fn factor(b: &mut Builder) -> Result<RuleId, Error> {
    b.production("factor", |b| {
        let n = number(b)?;
        let open = ch(b, '(');
        let open = token(b, open);
        let inner = expr(b)?;
        let close = ch(b, ')');
        let close = token(b, close);
        let group = b.sequence([open, inner, close]);
        Ok(b.choice([n, group]))
    })
}

fn number(b: &mut Builder) -> Result<RuleId, Error> {
    b.production("number", |b| {
        let digits = b.regex("-?[0-9]+")?;
        let push = b.action(|ctx: &mut MatchContext<'_, Value>| {
            let text = ctx.match_text().unwrap_or_default();
            let n: i64 = text
                .parse()
                .map_err(|_| Error::Action(format!("integer {} is out of range", text)))?;
            ctx.stack_mut().push(Value::I64(n));
            Ok(true)
        });
        let sp = spacing(b);
        Ok(b.sequence([digits, push, sp]))
    })
}

/// `op operand`, replacing the two topmost values with the result of
/// `apply`
fn binary(
    b: &mut Builder,
    op: char,
    operand: fn(&mut Builder) -> Result<RuleId, Error>,
    name: &'static str,
    apply: fn(i64, i64) -> Option<i64>,
) -> Result<RuleId, Error> {
    let sign = ch(b, op);
    let sign = token(b, sign);
    let rhs = operand(b)?;
    let reduce = b.action(move |ctx: &mut MatchContext<'_, Value>| {
        let rhs = pop_int(ctx)?;
        let lhs = pop_int(ctx)?;
        let value = apply(lhs, rhs).ok_or_else(|| {
            Error::Action(format!("{} of {} and {} is undefined", name, lhs, rhs))
        })?;
        ctx.stack_mut().push(Value::I64(value));
        Ok(true)
    });
    Ok(b.sequence([sign, rhs, reduce]))
}

fn pop_int(ctx: &mut MatchContext<'_, Value>) -> Result<i64, Error> {
    let value = ctx.stack_mut().pop()?;
    value
        .as_i64()
        .ok_or_else(|| Error::Action(format!("expected an integer, got {:?}", value)))
}
