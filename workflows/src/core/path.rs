//! Dot-notation lookup into a parsed response body.
//!
//! Paths are split on `.`; a backslash-escaped dot (`a\.b`) stays inside its
//! segment. Bracket index syntax is not translated: `items[0]` is looked up as
//! a literal key, while `items.0` addresses the first array element. Arrays
//! also answer `length` with their element count.

use std::borrow::Cow;

use serde_json::Value;

const SEPARATOR: char = '\u{000B}';

/// Split `path` into lookup segments.
///
/// A dot acts as a separator when it follows a character other than a
/// backslash; the scan is left-to-right and non-overlapping, so a leading dot
/// or the second dot of `..` sticks to the next segment.
pub fn split_path(path: &str) -> Vec<String> {
    let chars: Vec<char> = path.chars().collect();
    let mut marked = String::with_capacity(path.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '\\' && chars.get(i + 1) == Some(&'.') {
            marked.push(c);
            marked.push(SEPARATOR);
            i += 2;
        } else {
            marked.push(c);
            i += 1;
        }
    }
    marked
        .split(SEPARATOR)
        .map(|segment| segment.replace("\\.", "."))
        .collect()
}

/// Look up `key` as a member of `container`: object keys by name, array
/// elements by canonical decimal index, and `length` on arrays.
pub fn member<'a>(container: &'a Value, key: &str) -> Option<Cow<'a, Value>> {
    match container {
        Value::Object(map) => map.get(key).map(Cow::Borrowed),
        Value::Array(items) if key == "length" => Some(Cow::Owned(Value::from(items.len()))),
        Value::Array(items) => {
            let index: usize = key.parse().ok()?;
            if index.to_string() != key {
                return None;
            }
            items.get(index).map(Cow::Borrowed)
        }
        _ => None,
    }
}

/// Resolve `path` against `doc`, dropping the last `backup_levels` segments
/// first (1 = parent, 2 = grandparent). Dropping more segments than the path
/// has yields the document itself.
pub fn resolve<'a>(
    doc: Option<&'a Value>,
    path: &str,
    backup_levels: usize,
) -> Option<Cow<'a, Value>> {
    let mut current = Cow::Borrowed(doc?);
    let segments = split_path(path);
    let keep = segments.len().saturating_sub(backup_levels);
    for segment in &segments[..keep] {
        current = match current {
            Cow::Borrowed(node) => member(node, segment)?,
            // A computed `length` is a number; numbers have no members.
            Cow::Owned(_) => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_path_honours_escaped_dots() {
        assert_eq!(split_path("a.b.c"), vec!["a", "b", "c"]);
        assert_eq!(split_path(r"a\.b.c"), vec!["a.b", "c"]);
        assert_eq!(split_path("a"), vec!["a"]);
    }

    #[test]
    fn split_path_keeps_leading_and_doubled_dots_attached() {
        assert_eq!(split_path(".a"), vec![".a"]);
        assert_eq!(split_path("a..b"), vec!["a", ".b"]);
    }

    #[test]
    fn resolve_walks_objects_and_arrays() {
        let doc = json!({"items": [{"name": "first"}, {"name": "second"}], "meta": {"v.1": true}});
        assert_eq!(resolve(Some(&doc), "items.1.name", 0).as_deref(), Some(&json!("second")));
        assert_eq!(resolve(Some(&doc), r"meta.v\.1", 0).as_deref(), Some(&json!(true)));
    }

    #[test]
    fn resolve_returns_none_for_missing_segments() {
        let doc = json!({"a": {"b": 1}});
        assert_eq!(resolve(Some(&doc), "a.c", 0).as_deref(), None);
        assert_eq!(resolve(Some(&doc), "a.b.c", 0).as_deref(), None);
        assert_eq!(resolve(Some(&doc), "", 0).as_deref(), None);
        assert_eq!(resolve(None, "a", 0).as_deref(), None);
    }

    #[test]
    fn resolve_does_not_translate_bracket_indexes() {
        let doc = json!({"items": [1, 2], "items[0]": "literal"});
        assert_eq!(resolve(Some(&doc), "items[0]", 0).as_deref(), Some(&json!("literal")));
        assert_eq!(resolve(Some(&doc), "items.01", 0).as_deref(), None);
    }

    #[test]
    fn arrays_answer_length() {
        let doc = json!({"items": [1, 2], "meta": {"length": "tall"}});
        assert_eq!(resolve(Some(&doc), "items.length", 0).as_deref(), Some(&json!(2)));
        assert_eq!(resolve(Some(&doc), "meta.length", 0).as_deref(), Some(&json!("tall")));
        assert_eq!(resolve(Some(&doc), "items.length.x", 0).as_deref(), None);
        assert_eq!(resolve(Some(&doc), "items.length", 1).as_deref(), Some(&json!([1, 2])));
    }

    #[test]
    fn resolve_backs_up_to_ancestors() {
        let doc = json!({"a": {"b": {"c": 1}}});
        assert_eq!(resolve(Some(&doc), "a.b.c", 1).as_deref(), Some(&json!({"c": 1})));
        assert_eq!(resolve(Some(&doc), "a.b.c", 2).as_deref(), Some(&json!({"b": {"c": 1}})));
        assert_eq!(resolve(Some(&doc), "a.b.c", 9).as_deref(), Some(&doc));
    }
}
