//! Boolean predicate trees over a feature's tags.
//!
//! Parsed from the nested-array style grammar (`["==", key, value]`,
//! `["all", ...]`, `["in", key, ...]`, `["has", key]`, `!`-prefixed
//! negations). Parsing is non-fatal: an unrecognized operator or a
//! malformed shape yields a node that rejects everything, which keeps a
//! broken filter from accidentally matching the whole tile.

use serde_json::Value as Json;
use tracing::warn;

use mvt_data::{TagMap, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
}

#[derive(Debug, Clone, Default)]
enum Kind {
    /// No filter configured: unconditional pass.
    #[default]
    None,
    /// Unrecognized or malformed filter: unconditional reject.
    Invalid,
    Compare(Comparison, String, Value),
    In(String, Vec<Value>),
    Has(String),
    All(Vec<Filter>),
    Any(Vec<Filter>),
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    kind: Kind,
    negated: bool,
}

impl Filter {
    /// An absent filter passes everything.
    pub fn parse(json: Option<&Json>) -> Filter {
        match json {
            Some(json) => Self::parse_node(json),
            None => Filter::default(),
        }
    }

    fn parse_node(json: &Json) -> Filter {
        let invalid = Filter {
            kind: Kind::Invalid,
            negated: false,
        };

        let Some(array) = json.as_array() else {
            warn!(filter = %json, "filter is not an array");
            return invalid;
        };
        let Some(op) = array.first().and_then(Json::as_str) else {
            warn!(filter = %json, "filter has no operator");
            return invalid;
        };

        let filter = match op {
            "==" => Self::comparison(Comparison::Eq, array),
            "!=" => Self::comparison(Comparison::Ne, array),
            ">=" => Self::comparison(Comparison::Ge, array),
            ">" => Self::comparison(Comparison::Gt, array),
            "<=" => Self::comparison(Comparison::Le, array),
            "<" => Self::comparison(Comparison::Lt, array),
            "in" | "!in" => Self::membership(array, op == "!in"),
            "has" | "!has" => Self::presence(array, op == "!has"),
            "all" => Some(Filter {
                kind: Kind::All(array[1..].iter().map(Self::parse_node).collect()),
                negated: false,
            }),
            "any" => Some(Filter {
                kind: Kind::Any(array[1..].iter().map(Self::parse_node).collect()),
                negated: false,
            }),
            other => {
                warn!(op = other, "unrecognized filter operator");
                return invalid;
            }
        };

        filter.unwrap_or_else(|| {
            warn!(filter = %json, "malformed filter");
            invalid
        })
    }

    fn comparison(op: Comparison, array: &[Json]) -> Option<Filter> {
        if array.len() != 3 {
            return None;
        }
        let key = array[1].as_str()?.to_owned();
        let value = comparison_value(&array[2])?;
        Some(Filter {
            kind: Kind::Compare(op, key, value),
            negated: false,
        })
    }

    fn membership(array: &[Json], negated: bool) -> Option<Filter> {
        if array.len() < 2 {
            return None;
        }
        let key = array[1].as_str()?.to_owned();
        let set = array[2..]
            .iter()
            .map(comparison_value)
            .collect::<Option<Vec<_>>>()?;
        Some(Filter {
            kind: Kind::In(key, set),
            negated,
        })
    }

    fn presence(array: &[Json], negated: bool) -> Option<Filter> {
        if array.len() != 2 {
            return None;
        }
        Some(Filter {
            kind: Kind::Has(array[1].as_str()?.to_owned()),
            negated,
        })
    }

    /// Evaluates the filter against a feature's tags. Negation applies
    /// after the node's own evaluation.
    pub fn matches(&self, tags: &TagMap) -> bool {
        let result = match &self.kind {
            Kind::None => true,
            Kind::Invalid => false,
            // An absent key satisfies only Ne: "absent != value".
            Kind::Compare(op, key, value) => match tags.get(key) {
                Some(tag) => compare(*op, tag, value),
                None => *op == Comparison::Ne,
            },
            Kind::In(key, set) => tags
                .get(key)
                .is_some_and(|tag| set.iter().any(|v| values_equal(tag, v))),
            Kind::Has(key) => tags.contains_key(key),
            Kind::All(children) => children.iter().all(|f| f.matches(tags)),
            Kind::Any(children) => children.iter().any(|f| f.matches(tags)),
        };
        result != self.negated
    }
}

fn comparison_value(json: &Json) -> Option<Value> {
    match json {
        Json::Bool(v) => Some(Value::Bool(*v)),
        Json::Number(n) => n.as_f64().map(Value::Float),
        Json::String(s) => Some(Value::String(s.clone())),
        _ => None,
    }
}

/// Equality with explicit coercion: numbers compare as f64, strings and
/// booleans exactly, anything cross-type never matches.
fn values_equal(tag: &Value, rhs: &Value) -> bool {
    if let (Some(a), Some(b)) = (tag.as_f64(), rhs.as_f64()) {
        return a == b;
    }
    match (tag, rhs) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

fn compare(op: Comparison, tag: &Value, rhs: &Value) -> bool {
    match op {
        Comparison::Eq => values_equal(tag, rhs),
        Comparison::Ne => !values_equal(tag, rhs),
        _ => {
            let ordering = if let (Some(a), Some(b)) = (tag.as_f64(), rhs.as_f64()) {
                a.partial_cmp(&b)
            } else if let (Value::String(a), Value::String(b)) = (tag, rhs) {
                Some(a.cmp(b))
            } else {
                None
            };
            let Some(ordering) = ordering else {
                return false;
            };
            match op {
                Comparison::Ge => ordering.is_ge(),
                Comparison::Gt => ordering.is_gt(),
                Comparison::Le => ordering.is_le(),
                Comparison::Lt => ordering.is_lt(),
                Comparison::Eq | Comparison::Ne => unreachable!(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(entries: &[(&str, Value)]) -> TagMap {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn filter(json: serde_json::Value) -> Filter {
        Filter::parse(Some(&json))
    }

    #[test]
    fn no_filter_passes() {
        assert!(Filter::parse(None).matches(&TagMap::new()));
    }

    #[test]
    fn equality() {
        let f = filter(json!(["==", "class", "primary"]));
        assert!(f.matches(&tags(&[("class", Value::String("primary".into()))])));
        assert!(!f.matches(&tags(&[("class", Value::String("secondary".into()))])));
        assert!(!f.matches(&TagMap::new()));
    }

    #[test]
    fn numeric_coercion() {
        let f = filter(json!(["==", "level", 2]));
        assert!(f.matches(&tags(&[("level", Value::Int(2))])));
        assert!(f.matches(&tags(&[("level", Value::Uint(2))])));
        assert!(f.matches(&tags(&[("level", Value::Float(2.0))])));
        // string-vs-number never matches
        assert!(!f.matches(&tags(&[("level", Value::String("2".into()))])));
    }

    #[test]
    fn absent_key_satisfies_only_ne() {
        let empty = TagMap::new();
        assert!(filter(json!(["!=", "class", "primary"])).matches(&empty));
        assert!(!filter(json!(["==", "class", "x"])).matches(&empty));
        assert!(!filter(json!([">=", "level", 1])).matches(&empty));
        assert!(!filter(json!(["<", "level", 1])).matches(&empty));
        assert!(!filter(json!(["in", "class", "a", "b"])).matches(&empty));
        assert!(!filter(json!(["has", "class"])).matches(&empty));
    }

    #[test]
    fn ordering_comparisons() {
        let t = tags(&[("level", Value::Int(5))]);
        assert!(filter(json!([">=", "level", 5])).matches(&t));
        assert!(!filter(json!([">", "level", 5])).matches(&t));
        assert!(filter(json!(["<=", "level", 5])).matches(&t));
        assert!(filter(json!(["<", "level", 6])).matches(&t));
    }

    #[test]
    fn membership() {
        let f = filter(json!(["in", "class", "motorway", "trunk"]));
        assert!(f.matches(&tags(&[("class", Value::String("trunk".into()))])));
        assert!(!f.matches(&tags(&[("class", Value::String("path".into()))])));

        let negated = filter(json!(["!in", "class", "motorway", "trunk"]));
        assert!(negated.matches(&tags(&[("class", Value::String("path".into()))])));
        assert!(!negated.matches(&tags(&[("class", Value::String("trunk".into()))])));
    }

    #[test]
    fn presence() {
        let f = filter(json!(["has", "name"]));
        assert!(f.matches(&tags(&[("name", Value::Bool(false))])));
        assert!(!f.matches(&TagMap::new()));

        let negated = filter(json!(["!has", "name"]));
        assert!(negated.matches(&TagMap::new()));
    }

    #[test]
    fn composite_identities() {
        let everything = tags(&[("class", Value::String("primary".into()))]);
        assert!(filter(json!(["all"])).matches(&everything));
        assert!(!filter(json!(["any"])).matches(&everything));
    }

    #[test]
    fn composites_combine_children() {
        let t = tags(&[
            ("class", Value::String("primary".into())),
            ("level", Value::Int(2)),
        ]);
        let all = filter(json!(["all", ["==", "class", "primary"], [">", "level", 1]]));
        assert!(all.matches(&t));
        let any = filter(json!(["any", ["==", "class", "rail"], [">", "level", 1]]));
        assert!(any.matches(&t));
        let none_match = filter(json!(["any", ["==", "class", "rail"], [">", "level", 9]]));
        assert!(!none_match.matches(&t));
    }

    #[test]
    fn type_tag_matches() {
        let f = filter(json!(["==", "$type", "LineString"]));
        assert!(f.matches(&tags(&[("$type", Value::String("LineString".into()))])));
    }

    #[test]
    fn unrecognized_or_malformed_rejects() {
        let t = tags(&[("class", Value::String("primary".into()))]);
        assert!(!filter(json!(["~=", "class", "primary"])).matches(&t));
        assert!(!filter(json!(["==", "class"])).matches(&t));
        assert!(!filter(json!("not an array")).matches(&t));
        assert!(!filter(json!(["has"])).matches(&t));
    }
}
