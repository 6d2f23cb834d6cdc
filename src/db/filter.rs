// src/db/filter.rs
// DOCUMENTATION: Query filter shared by every data source
// PURPOSE: Parse `filter` / `where` query parameters and evaluate them in memory

use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::errors::ApiError;
use crate::models::Entity;

use super::Document;

/// Comparison applied to one property
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Neq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Inq(Vec<Value>),
    Nin(Vec<Value>),
}

/// Where clause tree
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    And(Vec<Where>),
    Or(Vec<Where>),
    Field { name: String, condition: Condition },
}

/// One `order` entry, e.g. `"text DESC"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

/// Full filter accepted by `find`
/// DOCUMENTATION: Unset `order` means ascending id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub where_: Option<Where>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
    pub skip: usize,
    pub include: Vec<String>,
}

impl Where {
    pub fn eq(name: &str, value: impl Into<Value>) -> Self {
        Where::Field {
            name: name.to_string(),
            condition: Condition::Eq(value.into()),
        }
    }

    pub fn inq(name: &str, values: Vec<Value>) -> Self {
        Where::Field {
            name: name.to_string(),
            condition: Condition::Inq(values),
        }
    }

    /// AND this clause with an optional caller-supplied clause
    pub fn and_with(self, other: Option<Where>) -> Self {
        match other {
            Some(other) => Where::And(vec![self, other]),
            None => self,
        }
    }

    /// Parse a where object, rejecting properties `E` does not have
    pub fn parse<E: Entity>(value: &Value) -> Result<Where, ApiError> {
        let object = value
            .as_object()
            .ok_or_else(|| ApiError::InvalidFilter("where must be an object".to_string()))?;

        let mut clauses = Vec::with_capacity(object.len());
        for (key, value) in object {
            let clause = match key.as_str() {
                "and" | "or" => {
                    let items = value.as_array().ok_or_else(|| {
                        ApiError::InvalidFilter(format!("`{}` expects an array", key))
                    })?;
                    let parsed = items
                        .iter()
                        .map(Where::parse::<E>)
                        .collect::<Result<Vec<_>, _>>()?;
                    if key == "and" {
                        Where::And(parsed)
                    } else {
                        Where::Or(parsed)
                    }
                }
                name => {
                    if !E::PROPERTIES.contains(&name) {
                        return Err(ApiError::InvalidFilter(format!(
                            "unknown property `{}` on {}",
                            name,
                            E::NAME
                        )));
                    }
                    Where::Field {
                        name: name.to_string(),
                        condition: parse_condition(value)?,
                    }
                }
            };
            clauses.push(clause);
        }

        Ok(match clauses.len() {
            1 => clauses.remove(0),
            _ => Where::And(clauses),
        })
    }

    /// Parse the JSON text of a `where` query parameter
    pub fn parse_str<E: Entity>(raw: &str) -> Result<Where, ApiError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ApiError::InvalidFilter(format!("where is not valid JSON: {}", e)))?;
        Where::parse::<E>(&value)
    }

    /// Evaluate against a materialized record (with `id` present)
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Where::And(items) => items.iter().all(|w| w.matches(doc)),
            Where::Or(items) => items.iter().any(|w| w.matches(doc)),
            Where::Field { name, condition } => {
                let actual = doc.get(name).unwrap_or(&Value::Null);
                condition.matches(actual)
            }
        }
    }
}

impl Condition {
    fn matches(&self, actual: &Value) -> bool {
        match self {
            Condition::Eq(expected) => values_equal(actual, expected),
            Condition::Neq(expected) => !values_equal(actual, expected),
            Condition::Gt(bound) => compare(actual, bound) == Some(Ordering::Greater),
            Condition::Gte(bound) => matches!(
                compare(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lt(bound) => compare(actual, bound) == Some(Ordering::Less),
            Condition::Lte(bound) => {
                matches!(compare(actual, bound), Some(Ordering::Less | Ordering::Equal))
            }
            Condition::Inq(options) => options.iter().any(|o| values_equal(actual, o)),
            Condition::Nin(options) => !options.iter().any(|o| values_equal(actual, o)),
        }
    }
}

fn parse_condition(value: &Value) -> Result<Condition, ApiError> {
    let operator = match value.as_object() {
        Some(object) if object.len() == 1 => object.iter().next(),
        Some(object) if !object.is_empty() => {
            return Err(ApiError::InvalidFilter(
                "a property condition takes exactly one operator".to_string(),
            ))
        }
        _ => None,
    };

    let Some((op, operand)) = operator else {
        return Ok(Condition::Eq(value.clone()));
    };

    let list = |operand: &Value| -> Result<Vec<Value>, ApiError> {
        operand
            .as_array()
            .cloned()
            .ok_or_else(|| ApiError::InvalidFilter(format!("`{}` expects an array", op)))
    };

    match op.as_str() {
        "eq" => Ok(Condition::Eq(operand.clone())),
        "neq" => Ok(Condition::Neq(operand.clone())),
        "gt" => Ok(Condition::Gt(operand.clone())),
        "gte" => Ok(Condition::Gte(operand.clone())),
        "lt" => Ok(Condition::Lt(operand.clone())),
        "lte" => Ok(Condition::Lte(operand.clone())),
        "inq" => Ok(Condition::Inq(list(operand)?)),
        "nin" => Ok(Condition::Nin(list(operand)?)),
        other => Err(ApiError::InvalidFilter(format!("unsupported operator `{}`", other))),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

impl Order {
    fn parse<E: Entity>(raw: &str) -> Result<Order, ApiError> {
        let mut parts = raw.split_whitespace();
        let field = parts
            .next()
            .ok_or_else(|| ApiError::InvalidFilter("empty order entry".to_string()))?;
        if !E::PROPERTIES.contains(&field) {
            return Err(ApiError::InvalidFilter(format!(
                "cannot order {} by unknown property `{}`",
                E::NAME,
                field
            )));
        }
        let descending = match parts.next().map(|d| d.to_ascii_uppercase()) {
            None => false,
            Some(d) if d == "ASC" => false,
            Some(d) if d == "DESC" => true,
            Some(d) => {
                return Err(ApiError::InvalidFilter(format!("invalid order direction `{}`", d)))
            }
        };
        Ok(Order {
            field: field.to_string(),
            descending,
        })
    }

    /// Compare two records on this key; missing values sort first
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let left = a.get(&self.field).unwrap_or(&Value::Null);
        let right = b.get(&self.field).unwrap_or(&Value::Null);
        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl Filter {
    pub fn with_where(where_: Where) -> Self {
        Filter {
            where_: Some(where_),
            ..Default::default()
        }
    }

    /// Parse a filter object for entity `E`
    pub fn parse<E: Entity>(value: &Value) -> Result<Filter, ApiError> {
        let object: &Map<String, Value> = value
            .as_object()
            .ok_or_else(|| ApiError::InvalidFilter("filter must be an object".to_string()))?;

        let mut filter = Filter::default();
        for (key, value) in object {
            match key.as_str() {
                "where" => filter.where_ = Some(Where::parse::<E>(value)?),
                "order" => {
                    filter.order = match value {
                        Value::String(entry) => vec![Order::parse::<E>(entry)?],
                        Value::Array(entries) => entries
                            .iter()
                            .map(|entry| {
                                entry.as_str().ok_or_else(|| {
                                    ApiError::InvalidFilter("order entries must be strings".into())
                                })
                            })
                            .map(|entry| entry.and_then(Order::parse::<E>))
                            .collect::<Result<Vec<_>, _>>()?,
                        _ => {
                            return Err(ApiError::InvalidFilter(
                                "order must be a string or an array".to_string(),
                            ))
                        }
                    }
                }
                "limit" => filter.limit = Some(parse_count(key, value)?),
                "skip" | "offset" => filter.skip = parse_count(key, value)?,
                "include" => filter.include = parse_include::<E>(value)?,
                other => {
                    return Err(ApiError::InvalidFilter(format!(
                        "unsupported filter key `{}`",
                        other
                    )))
                }
            }
        }
        Ok(filter)
    }

    /// Parse the JSON text of a `filter` query parameter
    pub fn parse_str<E: Entity>(raw: &str) -> Result<Filter, ApiError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ApiError::InvalidFilter(format!("filter is not valid JSON: {}", e)))?;
        Filter::parse::<E>(&value)
    }

    /// Apply order, skip and limit to already matched records
    pub fn arrange(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if !self.order.is_empty() {
            docs.sort_by(|a, b| {
                self.order
                    .iter()
                    .map(|order| order.compare(a, b))
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        let limit = self.limit.unwrap_or(usize::MAX);
        docs.into_iter().skip(self.skip).take(limit).collect()
    }
}

fn parse_count(key: &str, value: &Value) -> Result<usize, ApiError> {
    value
        .as_u64()
        .filter(|n| i64::try_from(*n).is_ok())
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            ApiError::InvalidFilter(format!(
                "`{}` must be a non-negative integer no larger than {}",
                key,
                i64::MAX
            ))
        })
}

fn parse_include<E: Entity>(value: &Value) -> Result<Vec<String>, ApiError> {
    let names: Vec<&str> = match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => Ok(name.as_str()),
                Value::Object(entry) => entry
                    .get("relation")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ApiError::InvalidFilter("include entry needs `relation`".into())),
                _ => Err(ApiError::InvalidFilter("invalid include entry".into())),
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(ApiError::InvalidFilter("include must be a string or an array".into())),
    };

    let mut include = Vec::with_capacity(names.len());
    for name in names {
        if !E::RELATIONS.contains(&name) {
            return Err(ApiError::InvalidFilter(format!(
                "{} has no relation `{}`",
                E::NAME,
                name
            )));
        }
        if !include.iter().any(|n: &String| n == name) {
            include.push(name.to_string());
        }
    }
    Ok(include)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, Photo};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_equality_and_operators() {
        let parsed = Where::parse::<Comment>(&json!({"text": "old", "id": {"gt": 2}})).unwrap();
        assert_eq!(
            parsed,
            Where::And(vec![
                Where::Field {
                    name: "id".into(),
                    condition: Condition::Gt(json!(2))
                },
                Where::eq("text", "old"),
            ])
        );
    }

    #[test]
    fn test_unknown_property_is_rejected() {
        let err = Where::parse::<Comment>(&json!({"link": "x"})).unwrap_err();
        assert!(matches!(err, ApiError::InvalidFilter(_)));

        let err = Where::parse::<Photo>(&json!({"link": {"like": "x"}})).unwrap_err();
        assert!(err.to_string().contains("unsupported operator"));
    }

    #[test]
    fn test_matches() {
        let record = doc(json!({"id": 4, "text": "old", "photoId": 1}));

        assert!(Where::eq("text", "old").matches(&record));
        assert!(Where::eq("photoId", 1.0).matches(&record));
        assert!(Where::eq("commentId", Value::Null).matches(&record));
        assert!(!Where::eq("text", "new").matches(&record));
        assert!(Where::inq("id", vec![json!(1), json!(4)]).matches(&record));

        let or = Where::parse::<Comment>(&json!({"or": [{"text": "new"}, {"id": {"lte": 4}}]}))
            .unwrap();
        assert!(or.matches(&record));

        let nin = Where::parse::<Comment>(&json!({"photoId": {"nin": [1, 2]}})).unwrap();
        assert!(!nin.matches(&record));
    }

    #[test]
    fn test_filter_parse_and_arrange() {
        let filter = Filter::parse_str::<Comment>(
            r#"{"where": {"photoId": 1}, "order": "text DESC", "limit": 2, "skip": 1, "include": ["parent", {"relation": "parent"}]}"#,
        )
        .unwrap();
        assert_eq!(filter.limit, Some(2));
        assert_eq!(filter.skip, 1);
        assert_eq!(filter.include, vec!["parent".to_string()]);

        let docs = vec![
            doc(json!({"id": 1, "text": "a"})),
            doc(json!({"id": 2, "text": "c"})),
            doc(json!({"id": 3, "text": "b"})),
            doc(json!({"id": 4, "text": "d"})),
        ];
        let ids: Vec<i64> = filter
            .arrange(docs)
            .iter()
            .map(|d| d["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_filter_rejects_unknown_relation_and_keys() {
        assert!(Filter::parse_str::<Photo>(r#"{"include": "comment"}"#).is_err());
        assert!(Filter::parse_str::<Photo>(r#"{"fields": ["id"]}"#).is_err());
        assert!(Filter::parse_str::<Photo>(r#"{"limit": -1}"#).is_err());
        assert!(matches!(
            Filter::parse_str::<Photo>(r#"{"limit": 9223372036854775808}"#),
            Err(ApiError::InvalidFilter(_))
        ));
        assert!(Filter::parse_str::<Photo>(r#"{"skip": 18446744073709551615}"#).is_err());
        assert_eq!(
            Filter::parse_str::<Photo>(r#"{"limit": 9223372036854775807}"#)
                .unwrap()
                .limit,
            Some(i64::MAX as usize)
        );
        assert!(Filter::parse_str::<Photo>("not json").is_err());
    }
}
