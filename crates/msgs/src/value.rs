//! Dynamic message values and scalar extraction queries.
//!
//! Plot queries address fields of messages whose layout is only known at
//! runtime. [`Value`] is the structured accessor produced by message parsing;
//! [`MessageQuery`] extracts one scalar from it by dotted path.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A parsed message as a dynamic tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn index(&self, i: usize) -> Option<&Value> {
        match self {
            Value::Seq(seq) => seq.get(i),
            _ => None,
        }
    }

    /// Numeric view of this value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::I64(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("empty query")]
    Empty,
    #[error("empty path segment in query '{0}'")]
    EmptySegment(String),
    #[error("bad index in query segment '{0}'")]
    BadIndex(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Segment {
    field: String,
    indices: Vec<usize>,
}

/// A dotted-path scalar extraction, e.g. `pose.position.x` or `ranges[3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageQuery {
    raw: String,
    segments: Vec<Segment>,
}

impl MessageQuery {
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        if raw.trim().is_empty() {
            return Err(QueryError::Empty);
        }
        let mut segments = Vec::new();
        for part in raw.split('.') {
            let part = part.trim();
            if part.is_empty() {
                return Err(QueryError::EmptySegment(raw.to_string()));
            }
            let (field, rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            let mut indices = Vec::new();
            if !rest.is_empty() {
                for chunk in rest.split('[').skip(1) {
                    let digits = chunk
                        .strip_suffix(']')
                        .ok_or_else(|| QueryError::BadIndex(part.to_string()))?;
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| QueryError::BadIndex(part.to_string()))?;
                    indices.push(index);
                }
            }
            segments.push(Segment {
                field: field.to_string(),
                indices,
            });
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Extracts the addressed scalar. Missing fields, bad indices and
    /// non-numeric leaves all yield `None`; evaluation never fails hard.
    pub fn evaluate(&self, value: &Value) -> Option<f64> {
        let mut current = value;
        for segment in &self.segments {
            if !segment.field.is_empty() {
                current = current.get(&segment.field)?;
            }
            for &index in &segment.indices {
                current = current.index(index)?;
            }
        }
        current.as_f64()
    }
}

impl fmt::Display for MessageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let mut position = BTreeMap::new();
        position.insert("x".to_string(), Value::F64(1.5));
        position.insert("y".to_string(), Value::I64(-2));
        let mut pose = BTreeMap::new();
        pose.insert("position".to_string(), Value::Map(position));
        let mut root = BTreeMap::new();
        root.insert("pose".to_string(), Value::Map(pose));
        root.insert(
            "ranges".to_string(),
            Value::Seq(vec![Value::F64(0.25), Value::F64(0.5), Value::Str("n/a".into())]),
        );
        Value::Map(root)
    }

    #[test]
    fn evaluates_nested_fields() {
        let value = sample();
        let query = MessageQuery::parse("pose.position.x").unwrap();
        assert_eq!(query.evaluate(&value), Some(1.5));
        let query = MessageQuery::parse("pose.position.y").unwrap();
        assert_eq!(query.evaluate(&value), Some(-2.0));
    }

    #[test]
    fn evaluates_sequence_indices() {
        let value = sample();
        assert_eq!(
            MessageQuery::parse("ranges[1]").unwrap().evaluate(&value),
            Some(0.5)
        );
        // Out of range and non-numeric leaves degrade to no point.
        assert_eq!(MessageQuery::parse("ranges[9]").unwrap().evaluate(&value), None);
        assert_eq!(MessageQuery::parse("ranges[2]").unwrap().evaluate(&value), None);
    }

    #[test]
    fn missing_fields_yield_none() {
        let value = sample();
        assert_eq!(
            MessageQuery::parse("pose.orientation.w").unwrap().evaluate(&value),
            None
        );
    }

    #[test]
    fn rejects_malformed_queries() {
        assert_eq!(MessageQuery::parse(""), Err(QueryError::Empty));
        assert!(matches!(
            MessageQuery::parse("a..b"),
            Err(QueryError::EmptySegment(_))
        ));
        assert!(matches!(
            MessageQuery::parse("ranges[x]"),
            Err(QueryError::BadIndex(_))
        ));
    }
}
