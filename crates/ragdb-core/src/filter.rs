//! Filter maps and their normalization into backend-neutral predicates.
//!
//! A filter map associates a field name with either one scalar (equality) or a
//! flat list of scalars (inclusion). Several fields are ANDed together. Field
//! names are sorted before composing so the output does not depend on the
//! iteration order of the input map. Unknown field names pass through; the
//! backend decides what they mean.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub type Filters = HashMap<String, FilterValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Scalar::Str(s.clone())),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n.as_i64().map(Scalar::Int).or_else(|| n.as_f64().map(Scalar::Float)),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Str(s) => Value::String(s.clone()),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Scalar::Bool(b) => Value::Bool(*b),
        }
    }

    /// Keyword-style comparison against a stored JSON value.
    pub fn matches_json(&self, value: &Value) -> bool {
        match (self, value) {
            (Scalar::Str(a), Value::String(b)) => a == b,
            (Scalar::Bool(a), Value::Bool(b)) => a == b,
            (Scalar::Int(a), Value::Number(b)) if b.is_f64() => b.as_f64() == Some(*a as f64),
            (Scalar::Int(a), Value::Number(b)) => b.as_i64() == Some(*a),
            (Scalar::Float(a), Value::Number(b)) => b.as_f64() == Some(*a),
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self { Scalar::Str(s.to_string()) }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self { Scalar::Str(s) }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self { Scalar::Int(i) }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self { Scalar::Bool(b) }
}

/// Value of one filter entry: a single literal or a set of literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum FilterValue {
    One(Scalar),
    AnyOf(Vec<Scalar>),
}

impl FilterValue {
    pub fn one(value: impl Into<Scalar>) -> Self {
        FilterValue::One(value.into())
    }

    pub fn any_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        FilterValue::AnyOf(values.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<Value> for FilterValue {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match &value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    Scalar::from_json(item).ok_or_else(|| {
                        Error::Validation(format!("filter sets may only contain scalars, got {item}"))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(FilterValue::AnyOf),
            other => Scalar::from_json(other)
                .map(FilterValue::One)
                .ok_or_else(|| Error::Validation(format!("filter value must be a scalar or a list of scalars, got {other}"))),
        }
    }
}

impl From<FilterValue> for Value {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::One(s) => s.to_json(),
            FilterValue::AnyOf(items) => Value::Array(items.iter().map(Scalar::to_json).collect()),
        }
    }
}

/// Backend-neutral predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals { field: String, value: Scalar },
    In { field: String, values: Vec<Scalar> },
    And(Vec<Predicate>),
}

pub struct FilterNormalizer;

impl FilterNormalizer {
    /// `None` means unconditional match. A single field yields its predicate
    /// directly; two or more are wrapped in `And`, ordered by field name.
    /// A field with an empty list adds no clause.
    pub fn normalize(filters: &Filters) -> Option<Predicate> {
        let mut fields: Vec<&String> = filters.keys().collect();
        fields.sort();
        let mut clauses: Vec<Predicate> = fields
            .into_iter()
            .filter_map(|field| match &filters[field] {
                FilterValue::One(value) => Some(Predicate::Equals { field: field.clone(), value: value.clone() }),
                FilterValue::AnyOf(values) if values.is_empty() => None,
                FilterValue::AnyOf(values) => Some(Predicate::In { field: field.clone(), values: values.clone() }),
            })
            .collect();
        match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(Predicate::And(clauses)),
        }
    }

    /// Parses a loosely typed JSON object and normalizes it in one step.
    pub fn from_json(raw: &serde_json::Map<String, Value>) -> Result<Option<Predicate>> {
        let mut filters = Filters::with_capacity(raw.len());
        for (field, value) in raw {
            if field.trim().is_empty() {
                return Err(Error::Validation("filter field name must not be empty".to_string()));
            }
            filters.insert(field.clone(), FilterValue::try_from(value.clone())?);
        }
        Ok(Self::normalize(&filters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_map_has_no_predicate() {
        assert_eq!(FilterNormalizer::normalize(&Filters::new()), None);
    }

    #[test]
    fn scalar_is_equality_and_list_is_inclusion() {
        let mut filters = Filters::new();
        filters.insert("category".into(), FilterValue::one("science"));
        assert_eq!(
            FilterNormalizer::normalize(&filters),
            Some(Predicate::Equals { field: "category".into(), value: Scalar::Str("science".into()) })
        );

        let mut filters = Filters::new();
        filters.insert("tags".into(), FilterValue::any_of(["ai", "ml"]));
        assert_eq!(
            FilterNormalizer::normalize(&filters),
            Some(Predicate::In { field: "tags".into(), values: vec!["ai".into(), "ml".into()] })
        );
    }

    #[test]
    fn nested_values_are_rejected() {
        let raw = json!({ "metadata": { "author": "x" } });
        let err = FilterNormalizer::from_json(raw.as_object().expect("object")).unwrap_err();
        assert_eq!(err.status_code(), 422);

        let raw = json!({ "tags": ["ok", ["nested"]] });
        assert!(FilterNormalizer::from_json(raw.as_object().expect("object")).is_err());

        let raw = json!({ "tags": null });
        assert!(FilterNormalizer::from_json(raw.as_object().expect("object")).is_err());
    }

    #[test]
    fn integer_filters_compare_exactly() {
        let big = (1i64 << 53) + 1;
        assert!(Scalar::Int(big).matches_json(&json!(big)));
        assert!(!Scalar::Int(big).matches_json(&json!(big - 1)));
        assert!(Scalar::Int(3).matches_json(&json!(3.0)));
        assert!(!Scalar::Int(3).matches_json(&json!(3.5)));
    }

    #[test]
    fn filter_value_deserializes_from_loose_json() {
        let filters: Filters = serde_json::from_value(json!({ "category": "business", "year": 2024, "tags": ["a", "b"] }))
            .expect("filters");
        assert_eq!(filters["category"], FilterValue::one("business"));
        assert_eq!(filters["year"], FilterValue::One(Scalar::Int(2024)));
        assert_eq!(filters["tags"], FilterValue::any_of(["a", "b"]));
    }
}
