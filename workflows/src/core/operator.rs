//! Comparison operators for response checks.
//!
//! The operator set is closed. Names are case-insensitive (`INCL` == `incl`).

use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::core::coerce::{ge, gt, le, loose_eq, lt, strict_eq, to_js_string};
use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    StrictEq,
    StrictNe,
    LooseEq,
    LooseNe,
    Lt,
    Le,
    Gt,
    Ge,
    Includes,
    Excludes,
    Regex,
    Length,
}

impl Operator {
    pub const ALL: [Operator; 12] = [
        Operator::StrictEq,
        Operator::StrictNe,
        Operator::LooseEq,
        Operator::LooseNe,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::Includes,
        Operator::Excludes,
        Operator::Regex,
        Operator::Length,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::StrictEq => "===",
            Operator::StrictNe => "!==",
            Operator::LooseEq => "==",
            Operator::LooseNe => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Includes => "incl",
            Operator::Excludes => "notincl",
            Operator::Regex => "regex",
            Operator::Length => "length",
        }
    }

    /// Compare `subject` (the looked-up value, `None` when the path did not
    /// resolve) against `expected`.
    ///
    /// Only `regex` can fail, when `expected` is not a valid pattern.
    pub fn apply(self, subject: Option<&Value>, expected: &Value) -> Result<bool, WorkflowError> {
        let expected_ref = Some(expected);
        let matched = match self {
            Operator::StrictEq => strict_eq(subject, expected_ref),
            Operator::StrictNe => !strict_eq(subject, expected_ref),
            Operator::LooseEq => loose_eq(subject, expected_ref),
            Operator::LooseNe => !loose_eq(subject, expected_ref),
            Operator::Lt => lt(subject, expected_ref),
            Operator::Le => le(subject, expected_ref),
            Operator::Gt => gt(subject, expected_ref),
            Operator::Ge => ge(subject, expected_ref),
            Operator::Includes => match subject {
                Some(Value::String(s)) => s.contains(to_js_string(expected).as_str()),
                Some(Value::Array(items)) => contains_strict(items, expected),
                _ => false,
            },
            Operator::Excludes => match subject {
                Some(Value::String(s)) => !s.contains(to_js_string(expected).as_str()),
                Some(Value::Array(items)) => !contains_strict(items, expected),
                _ => false,
            },
            Operator::Regex => match subject {
                Some(Value::String(s)) => compile_pattern(expected)?.is_match(s),
                _ => false,
            },
            Operator::Length => match subject {
                Some(Value::String(s)) => length_matches(s.encode_utf16().count(), expected),
                Some(Value::Array(items)) => length_matches(items.len(), expected),
                Some(Value::Object(map)) => loose_eq(map.get("length"), expected_ref),
                _ => false,
            },
        };
        Ok(matched)
    }
}

impl FromStr for Operator {
    type Err = WorkflowError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let lowered = name.to_lowercase();
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == lowered)
            .ok_or_else(|| WorkflowError::UnknownOperator(name.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_strict(items: &[Value], expected: &Value) -> bool {
    items.iter().any(|item| strict_eq(Some(item), Some(expected)))
}

fn length_matches(len: usize, expected: &Value) -> bool {
    loose_eq(Some(&Value::from(len)), Some(expected))
}

/// Build a regex from a check value. `/pattern/flags` literals are unwrapped
/// (`i`, `m` and `s` are honoured, `g`, `u` and `y` ignored); anything else is
/// used as the pattern verbatim.
pub fn compile_pattern(expected: &Value) -> Result<Regex, WorkflowError> {
    let raw = to_js_string(expected);
    let (pattern, flags) = match raw.rfind('/') {
        Some(end) if raw.starts_with('/') && end > 0 => (&raw[1..end], &raw[end + 1..]),
        _ => (raw.as_str(), ""),
    };

    let invalid = |reason: String| WorkflowError::InvalidPattern {
        pattern: raw.clone(),
        reason,
    };
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'g' | 'u' | 'y' => {}
            other => return Err(invalid(format!("unsupported flag '{other}'"))),
        }
    }
    builder.build().map_err(|err| invalid(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(op: &str, subject: Value, expected: Value) -> bool {
        op.parse::<Operator>()
            .expect("operator")
            .apply(Some(&subject), &expected)
            .expect("apply")
    }

    #[test]
    fn parses_every_name_case_insensitively() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>(), Ok(op));
        }
        assert_eq!("NOTINCL".parse::<Operator>(), Ok(Operator::Excludes));
        assert_eq!(
            "~=".parse::<Operator>(),
            Err(WorkflowError::UnknownOperator("~=".to_string()))
        );
    }

    #[test]
    fn equality_operators() {
        assert!(apply("==", json!("200"), json!(200)));
        assert!(!apply("===", json!("200"), json!(200)));
        assert!(apply("!==", json!("200"), json!(200)));
        assert!(!apply("!=", json!("200"), json!(200)));
    }

    #[test]
    fn ordering_operators() {
        assert!(apply("<", json!(1), json!(2)));
        assert!(apply("<=", json!(2), json!("2")));
        assert!(apply(">", json!("b"), json!("a")));
        assert!(!apply(">=", json!("abc"), json!(1)));
    }

    #[test]
    fn incl_and_notincl_on_strings_and_arrays() {
        assert!(apply("incl", json!("abc"), json!("b")));
        assert!(!apply("notincl", json!("abc"), json!("b")));
        assert!(apply("incl", json!(["a", 2]), json!(2)));
        assert!(!apply("incl", json!(["a", 2]), json!("2")));
        assert!(apply("notincl", json!(["a", 2]), json!("z")));
    }

    #[test]
    fn incl_and_notincl_are_false_for_other_subjects() {
        assert!(!apply("incl", json!(42), json!(4)));
        assert!(!apply("notincl", json!(42), json!(4)));
        assert!(!apply("notincl", json!({"a": 1}), json!("a")));
        assert!(!Operator::Includes.apply(None, &json!("a")).expect("apply"));
        assert!(!Operator::Excludes.apply(None, &json!("a")).expect("apply"));
    }

    #[test]
    fn regex_matches_strings_only() {
        assert!(apply("regex", json!("FINISHED"), json!("/^fin/i")));
        assert!(apply("regex", json!("v1.2.3"), json!(r"\d+\.\d+")));
        assert!(!apply("regex", json!("pending"), json!("^done$")));
        assert!(!apply("regex", json!(123), json!("1")));
    }

    #[test]
    fn regex_rejects_invalid_patterns() {
        let err = Operator::Regex
            .apply(Some(&json!("x")), &json!("/(unclosed/"))
            .expect_err("invalid pattern");
        assert!(matches!(err, WorkflowError::InvalidPattern { .. }));
    }

    #[test]
    fn length_compares_element_and_char_counts() {
        assert!(apply("length", json!([1, 2, 3]), json!(3)));
        assert!(!apply("length", json!([1, 2, 3]), json!(2)));
        assert!(apply("length", json!("abcd"), json!("4")));
        assert!(!apply("length", json!(12), json!(2)));
        assert!(!Operator::Length.apply(None, &json!(0)).expect("apply"));
    }
}
