//! Recursive content search over a parsed response body.
//!
//! The walk is depth-first in document order (object keys in insertion order,
//! array elements by index) and the first match wins. Only scalar leaves are
//! matched; objects and arrays are descended into, `null` is skipped.

use serde_json::Value;

use crate::core::coerce::strict_eq;
use crate::core::path::member;

pub const DEFAULT_MAX_DEPTH: usize = 15;

/// Result of a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Value of the requested attribute.
    Value(Value),
    /// Dot path from the root to the first leaf equal to the searched value.
    Path(String),
    /// The search space was exhausted without a match.
    NotFound,
    /// No match, and at least one branch was cut off at the depth limit.
    DepthLimited,
}

impl SearchOutcome {
    /// Collapse to an optional value (paths become strings).
    pub fn into_value(self) -> Option<Value> {
        match self {
            SearchOutcome::Value(value) => Some(value),
            SearchOutcome::Path(path) => Some(Value::String(path)),
            SearchOutcome::NotFound | SearchOutcome::DepthLimited => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Value(_) | SearchOutcome::Path(_))
    }
}

struct Query<'q> {
    value: Option<&'q Value>,
    attr: Option<&'q str>,
    max_depth: usize,
}

/// Search `doc` for a value, an attribute, or both.
///
/// - `value` and `attr`: in the first scope holding a leaf equal to `value`
///   that also has an `attr` member, return that member.
/// - `attr` only: return the `attr` member of the first scope that has one
///   (scopes are tested when their first scalar leaf is visited).
/// - `value` only: return the dot path to the first leaf equal to `value`.
/// - neither: nothing to search for, [`SearchOutcome::NotFound`].
///
/// Equality is strict (`"1"` does not match `1`).
pub fn search(doc: &Value, value: Option<&Value>, attr: Option<&str>, max_depth: usize) -> SearchOutcome {
    if value.is_none() && attr.is_none() {
        return SearchOutcome::NotFound;
    }
    let query = Query {
        value,
        attr,
        max_depth,
    };
    let mut path = Vec::new();
    walk(doc, &query, &mut path)
}

/// Value of `property` in the same scope as the first occurrence of `value`.
pub fn property_by_value(doc: &Value, value: &Value, property: &str) -> SearchOutcome {
    search(doc, Some(value), Some(property), DEFAULT_MAX_DEPTH)
}

/// Value of the first occurrence of `property`.
pub fn first_property_value(doc: &Value, property: &str) -> SearchOutcome {
    search(doc, None, Some(property), DEFAULT_MAX_DEPTH)
}

/// Dot path to the first occurrence of `value`.
pub fn path_by_value(doc: &Value, value: &Value) -> SearchOutcome {
    search(doc, Some(value), None, DEFAULT_MAX_DEPTH)
}

fn walk(node: &Value, query: &Query<'_>, path: &mut Vec<String>) -> SearchOutcome {
    if path.len() > query.max_depth {
        return SearchOutcome::DepthLimited;
    }

    let mut limited = false;
    for (key, child) in entries(node) {
        match child {
            Value::Object(_) | Value::Array(_) => {
                path.push(key);
                match walk(child, query, path) {
                    SearchOutcome::NotFound => {}
                    SearchOutcome::DepthLimited => limited = true,
                    found => return found,
                }
                path.pop();
            }
            Value::Null => {}
            leaf => {
                if let Some(found) = match_leaf(node, &key, leaf, query, path) {
                    return found;
                }
            }
        }
    }

    if limited {
        SearchOutcome::DepthLimited
    } else {
        SearchOutcome::NotFound
    }
}

fn match_leaf(
    scope: &Value,
    key: &str,
    leaf: &Value,
    query: &Query<'_>,
    path: &[String],
) -> Option<SearchOutcome> {
    match (query.value, query.attr) {
        (Some(value), Some(attr)) => {
            if !strict_eq(Some(leaf), Some(value)) {
                return None;
            }
            member(scope, attr).map(|found| SearchOutcome::Value(found.into_owned()))
        }
        (None, Some(attr)) => member(scope, attr).map(|found| SearchOutcome::Value(found.into_owned())),
        (Some(value), None) => {
            if !strict_eq(Some(leaf), Some(value)) {
                return None;
            }
            let mut full = path.to_vec();
            full.push(key.to_string());
            Some(SearchOutcome::Path(full.join(".")))
        }
        (None, None) => None,
    }
}

fn entries(node: &Value) -> Vec<(String, &Value)> {
    match node {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pools() -> Value {
        json!({
            "kind": "tm:ltm:pool:poolcollectionstate",
            "items": [
                {"name": "web", "id": "pool-1", "members": [{"address": "10.0.0.1", "state": "up"}]},
                {"name": "api", "id": "pool-2", "members": [{"address": "10.0.0.2", "state": "down"}]}
            ]
        })
    }

    #[test]
    fn property_by_value_returns_sibling() {
        assert_eq!(
            property_by_value(&pools(), &json!("api"), "id"),
            SearchOutcome::Value(json!("pool-2"))
        );
        assert_eq!(
            property_by_value(&pools(), &json!("10.0.0.2"), "state"),
            SearchOutcome::Value(json!("down"))
        );
    }

    #[test]
    fn first_property_value_finds_first_scope() {
        assert_eq!(
            first_property_value(&pools(), "kind"),
            SearchOutcome::Value(json!("tm:ltm:pool:poolcollectionstate"))
        );
        assert_eq!(
            first_property_value(&pools(), "address"),
            SearchOutcome::Value(json!("10.0.0.1"))
        );
    }

    #[test]
    fn path_by_value_joins_keys_and_indexes() {
        assert_eq!(
            path_by_value(&pools(), &json!("down")),
            SearchOutcome::Path("items.1.members.0.state".to_string())
        );
    }

    #[test]
    fn absent_value_is_not_found() {
        assert_eq!(path_by_value(&pools(), &json!("missing")), SearchOutcome::NotFound);
        assert_eq!(
            property_by_value(&pools(), &json!("missing"), "id"),
            SearchOutcome::NotFound
        );
    }

    #[test]
    fn matching_is_strict() {
        let doc = json!({"a": {"port": 80}});
        assert_eq!(path_by_value(&doc, &json!("80")), SearchOutcome::NotFound);
        assert_eq!(
            path_by_value(&doc, &json!(80)),
            SearchOutcome::Path("a.port".to_string())
        );
    }

    #[test]
    fn nothing_to_search_for_is_not_found() {
        assert_eq!(search(&pools(), None, None, DEFAULT_MAX_DEPTH), SearchOutcome::NotFound);
    }

    #[test]
    fn depth_limit_is_distinct_from_not_found() {
        let doc = json!({"a": {"b": {"c": {"d": "deep"}}}});
        assert_eq!(
            search(&doc, Some(&json!("deep")), None, 2),
            SearchOutcome::DepthLimited
        );
        assert_eq!(
            search(&doc, Some(&json!("deep")), None, 3),
            SearchOutcome::Path("a.b.c.d".to_string())
        );
    }

    #[test]
    fn shallow_match_wins_over_cut_branch() {
        let doc = json!({"deep": {"x": {"y": "target"}}, "flat": "target"});
        assert_eq!(
            search(&doc, Some(&json!("target")), None, 1),
            SearchOutcome::Path("flat".to_string())
        );
    }

    #[test]
    fn attribute_in_scope_without_leaves_is_not_seen() {
        let doc = json!({"outer": {"inner": {"x": 1}}});
        assert_eq!(first_property_value(&doc, "outer"), SearchOutcome::NotFound);
    }
}
