// json.rs --- JSON documents
//
// Arrays become lists, objects become `object` nodes holding one
// `member` node per key/value pair, and `null` becomes an empty node
// named after it.
//
use std::str::Chars;

use weft_lib::helpers::{ch, none_of, spacing, token};
use weft_lib::{Error, Grammar, GrammarBuilder, MatchContext, RuleId};
use weft_value::Value;

type Builder = GrammarBuilder<Value>;

pub fn grammar() -> Result<Grammar<Value>, Error> {
    GrammarBuilder::new().build(|b| {
        b.production("json", |b| {
            let leading = spacing(b);
            let v = value(b)?;
            let eoi = b.end_of_input();
            Ok(b.sequence([leading, v, eoi]))
        })
    })
}

// value <- (object / array / string / number / constant) spacing
fn value(b: &mut Builder) -> Result<RuleId, Error> {
    b.production("value", |b| {
        let object = object(b)?;
        let array = array(b)?;
        let string = string(b)?;
        let number = number(b)?;
        let t = constant(b, "true", Value::Bool(true));
        let f = constant(b, "false", Value::Bool(false));
        let null = constant(b, "null", Value::node("null", vec![]));
        let any = b.choice([object, array, string, number, t, f, null]);
        let sp = spacing(b);
        Ok(b.sequence([any, sp]))
    })
}

fn object(b: &mut Builder) -> Result<RuleId, Error> {
    b.production("object", |b| {
        let m = member(b)?;
        Ok(container(b, '{', '}', m, Value::node("object", vec![])))
    })
}

fn array(b: &mut Builder) -> Result<RuleId, Error> {
    b.production("array", |b| {
        let v = value(b)?;
        Ok(container(b, '[', ']', v, Value::List(vec![])))
    })
}

// member <- string spacing ':' spacing value
fn member(b: &mut Builder) -> Result<RuleId, Error> {
    b.production("member", |b| {
        let key = string(b)?;
        let sp = spacing(b);
        let colon = ch(b, ':');
        let colon = token(b, colon);
        let v = value(b)?;
        let pair = b.action(|ctx: &mut MatchContext<'_, Value>| {
            let v = ctx.stack_mut().pop()?;
            let k = ctx.stack_mut().pop()?;
            ctx.stack_mut().push(Value::node("member", vec![k, v]));
            Ok(true)
        });
        Ok(b.sequence([key, sp, colon, v, pair]))
    })
}

/// `open (item (',' item)*)? close`, collecting every value pushed by
/// `item` into a copy of `empty`
fn container(b: &mut Builder, open: char, close: char, item: RuleId, empty: Value) -> RuleId {
    let open = ch(b, open);
    let open = token(b, open);
    let start = b.action(move |ctx: &mut MatchContext<'_, Value>| {
        ctx.stack_mut().push(empty.clone());
        Ok(true)
    });
    let append = b.action(|ctx: &mut MatchContext<'_, Value>| {
        let item = ctx.stack_mut().pop()?;
        let mut container = ctx.stack_mut().pop()?;
        container
            .append(item)
            .map_err(|item| Error::Action(format!("can't append {:?} to a scalar", item)))?;
        ctx.stack_mut().push(container);
        Ok(true)
    });
    let first = b.sequence([item, append]);
    let comma = ch(b, ',');
    let comma = token(b, comma);
    let next = b.sequence([comma, item, append]);
    let rest = b.zero_or_more(next);
    let items = b.sequence([first, rest]);
    let items = b.optional(items);
    let close = ch(b, close);
    b.sequence([open, start, items, close])
}

fn constant(b: &mut Builder, word: &str, v: Value) -> RuleId {
    let lit = b.literal(word);
    let push = b.action(move |ctx: &mut MatchContext<'_, Value>| {
        ctx.stack_mut().push(v.clone());
        Ok(true)
    });
    let rule = b.sequence([lit, push]);
    b.label(rule, word)
}

// string <- '"' (escape / [^"\\])* '"'
fn string(b: &mut Builder) -> Result<RuleId, Error> {
    b.production("string", |b| {
        let quote = ch(b, '"');
        let escape = b.regex(r#"\\(["\\/bfnrt]|u[0-9a-fA-F]{4})"#)?;
        let plain = none_of(b, "\"\\");
        let piece = b.choice([escape, plain]);
        let body = b.zero_or_more(piece);
        let raw = b.sequence([quote, body, quote]);
        let push = b.action(|ctx: &mut MatchContext<'_, Value>| {
            let text = ctx.match_text().unwrap_or_default();
            let inner = text
                .strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .ok_or_else(|| Error::Action(format!("unquoted string {}", text)))?;
            let s = unescape(inner)?;
            ctx.stack_mut().push(Value::String(s));
            Ok(true)
        });
        Ok(b.sequence([raw, push]))
    })
}

fn number(b: &mut Builder) -> Result<RuleId, Error> {
    b.production("number", |b| {
        let raw = b.regex(r"-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?")?;
        let push = b.action(|ctx: &mut MatchContext<'_, Value>| {
            let text = ctx.match_text().unwrap_or_default();
            let is_float = text.contains(|c: char| matches!(c, '.' | 'e' | 'E'));
            let value = match text.parse::<i64>() {
                Ok(n) if !is_float => Value::I64(n),
                _ => Value::F64(
                    text.parse::<f64>()
                        .map_err(|e| Error::Action(format!("invalid number {}: {}", text, e)))?,
                ),
            };
            ctx.stack_mut().push(value);
            Ok(true)
        });
        Ok(b.sequence([raw, push]))
    })
}

fn hex4(chars: &mut Chars) -> Result<u32, Error> {
    let hex: String = chars.take(4).collect();
    u32::from_str_radix(&hex, 16)
        .map_err(|_| Error::Action(format!("invalid unicode escape \\u{}", hex)))
}

fn unescape(s: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('"') => '"',
            Some('\\') => '\\',
            Some('/') => '/',
            Some('b') => '\u{8}',
            Some('f') => '\u{c}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('u') => {
                let high = hex4(&mut chars)?;
                let code = if (0xD800..0xDC00).contains(&high) {
                    // surrogate pair
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return Err(Error::Action(format!("lone surrogate \\u{:04x}", high)));
                    }
                    let low = hex4(&mut chars)?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(Error::Action(format!("invalid low surrogate \\u{:04x}", low)));
                    }
                    0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                } else {
                    high
                };
                char::from_u32(code)
                    .ok_or_else(|| Error::Action(format!("invalid code point {:x}", code)))?
            }
            other => return Err(Error::Action(format!("invalid escape {:?}", other))),
        };
        out.push(escaped);
    }
    Ok(out)
}
