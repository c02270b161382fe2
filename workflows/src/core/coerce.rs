//! JavaScript-flavoured coercions over JSON values.
//!
//! Collections written for the runner compare values loosely (`"5" == 5`,
//! `true == 1`), so the comparison operators go through these helpers instead
//! of `Value`'s structural equality. A missing value (`None`) plays the role of
//! `undefined`.

use std::borrow::Cow;

use serde_json::{Number, Value};

/// A value reduced to the operand kinds the abstract comparison algorithms
/// distinguish.
#[derive(Debug, Clone, PartialEq)]
enum Operand<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Cow<'a, str>),
    Container,
}

fn operand(value: Option<&Value>) -> Operand<'_> {
    match value {
        None => Operand::Undefined,
        Some(Value::Null) => Operand::Null,
        Some(Value::Bool(b)) => Operand::Bool(*b),
        Some(Value::Number(n)) => Operand::Number(number_to_f64(n)),
        Some(Value::String(s)) => Operand::String(Cow::Borrowed(s.as_str())),
        Some(Value::Array(_) | Value::Object(_)) => Operand::Container,
    }
}

/// Primitive form of a value: containers become their string form, anything
/// else is unchanged.
fn primitive(value: Option<&Value>) -> Operand<'_> {
    match value {
        Some(container @ (Value::Array(_) | Value::Object(_))) => {
            Operand::String(Cow::Owned(to_js_string(container)))
        }
        other => operand(other),
    }
}

fn number_to_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

/// Format a number the way string concatenation does: integral values carry
/// no fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{n:.0}");
    }
    n.to_string()
}

fn format_json_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    format_number(number_to_f64(n))
}

/// Render a value for a ledger key or a stored variable: strings verbatim,
/// scalars in display form, containers and null as compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_json_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// `String(value)`: arrays join their elements with commas, objects collapse
/// to `[object Object]`.
pub fn to_js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
        scalar => display(scalar),
    }
}

/// `ToNumber` for a string: surrounding whitespace is ignored, the empty
/// string is zero, hex/octal/binary prefixes are honoured, anything else that
/// is not a plain decimal literal is NaN.
pub fn string_to_number(raw: &str) -> f64 {
    let s = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix)
                .map(|n| n as f64)
                .unwrap_or(f64::NAN);
        }
    }
    let decimal_chars = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !decimal_chars {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// `ToNumber` for an arbitrary (possibly missing) value.
pub fn to_number(value: Option<&Value>) -> f64 {
    operand_to_number(&primitive(value))
}

fn operand_to_number(op: &Operand<'_>) -> f64 {
    match op {
        Operand::Undefined | Operand::Container => f64::NAN,
        Operand::Null => 0.0,
        Operand::Bool(b) => f64::from(u8::from(*b)),
        Operand::Number(n) => *n,
        Operand::String(s) => string_to_number(s),
    }
}

/// Truthiness: missing, null, false, zero, NaN and the empty string are falsy.
pub fn truthy(value: Option<&Value>) -> bool {
    match operand(value) {
        Operand::Undefined | Operand::Null => false,
        Operand::Bool(b) => b,
        Operand::Number(n) => n != 0.0 && !n.is_nan(),
        Operand::String(s) => !s.is_empty(),
        Operand::Container => true,
    }
}

/// `parseInt(raw, 10)`: optional leading whitespace and sign followed by at
/// least one decimal digit; trailing garbage is ignored.
pub fn parse_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: &str = &rest[..rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len())];
    if digits.is_empty() {
        return None;
    }
    let magnitude: i64 = digits.parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Strict equality (`===`). Containers are never equal to each other because
/// the subject and the expected value are always distinct objects.
pub fn strict_eq(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (operand(left), operand(right)) {
        (Operand::Undefined, Operand::Undefined) | (Operand::Null, Operand::Null) => true,
        (Operand::Bool(a), Operand::Bool(b)) => a == b,
        (Operand::Number(a), Operand::Number(b)) => a == b,
        (Operand::String(a), Operand::String(b)) => a == b,
        _ => false,
    }
}

/// Loose equality (`==`) following the abstract equality comparison.
pub fn loose_eq(left: Option<&Value>, right: Option<&Value>) -> bool {
    let left = match left {
        Some(container @ (Value::Array(_) | Value::Object(_))) => ContainerOrOperand::Container(container),
        other => ContainerOrOperand::Operand(operand(other)),
    };
    let right = match right {
        Some(container @ (Value::Array(_) | Value::Object(_))) => ContainerOrOperand::Container(container),
        other => ContainerOrOperand::Operand(operand(other)),
    };
    loose_eq_inner(left, right)
}

enum ContainerOrOperand<'a> {
    Container(&'a Value),
    Operand(Operand<'a>),
}

fn loose_eq_inner(left: ContainerOrOperand<'_>, right: ContainerOrOperand<'_>) -> bool {
    use ContainerOrOperand::{Container, Operand as Op};

    match (left, right) {
        (Container(_), Container(_)) => false,
        (Container(c), Op(other)) | (Op(other), Container(c)) => match other {
            Operand::Undefined | Operand::Null => false,
            other => loose_eq_operands(
                Operand::String(Cow::Owned(to_js_string(c))),
                other,
            ),
        },
        (Op(a), Op(b)) => loose_eq_operands(a, b),
    }
}

fn loose_eq_operands(left: Operand<'_>, right: Operand<'_>) -> bool {
    match (left, right) {
        (Operand::Undefined | Operand::Null, Operand::Undefined | Operand::Null) => true,
        (Operand::Undefined | Operand::Null, _) | (_, Operand::Undefined | Operand::Null) => false,
        (Operand::Number(a), Operand::Number(b)) => a == b,
        (Operand::String(a), Operand::String(b)) => a == b,
        (Operand::Bool(a), Operand::Bool(b)) => a == b,
        (Operand::Number(n), Operand::String(s)) | (Operand::String(s), Operand::Number(n)) => {
            n == string_to_number(&s)
        }
        (Operand::Bool(b), other) | (other, Operand::Bool(b)) => {
            loose_eq_operands(Operand::Number(f64::from(u8::from(b))), other)
        }
        // Containers are unwrapped before reaching this point.
        (Operand::Container, _) | (_, Operand::Container) => false,
    }
}

/// Abstract relational comparison `left < right`. `None` stands for the
/// "undefined" outcome produced when either side is NaN.
fn less_than(left: Option<&Value>, right: Option<&Value>) -> Option<bool> {
    let left = primitive(left);
    let right = primitive(right);
    if let (Operand::String(a), Operand::String(b)) = (&left, &right) {
        return Some(a.encode_utf16().lt(b.encode_utf16()));
    }
    let a = operand_to_number(&left);
    let b = operand_to_number(&right);
    if a.is_nan() || b.is_nan() {
        return None;
    }
    Some(a < b)
}

pub fn lt(left: Option<&Value>, right: Option<&Value>) -> bool {
    less_than(left, right) == Some(true)
}

pub fn gt(left: Option<&Value>, right: Option<&Value>) -> bool {
    less_than(right, left) == Some(true)
}

pub fn le(left: Option<&Value>, right: Option<&Value>) -> bool {
    less_than(right, left) == Some(false)
}

pub fn ge(left: Option<&Value>, right: Option<&Value>) -> bool {
    less_than(left, right) == Some(false)
}
