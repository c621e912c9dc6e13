//! The typed-value taxonomy and its wire codec.
//!
//! Every object slot of a statement holds exactly one of these kinds. The
//! wire form is `"<prefix>:<payload>"`; `none` and bare prefixes with no
//! payload are valid as-is.

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::models::blob::BlobHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Statement(Uuid),
    Blob(BlobHandle),
    Integer(i64),
    Decimal(BigDecimal),
    String(String),
    Boolean(bool),
    Datetime(DateTime<Utc>),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Statement,
    Blob,
    Integer,
    Decimal,
    String,
    Boolean,
    Datetime,
    None,
}

impl ValueKind {
    /// The storage column this kind is written to on `statement`. `None`
    /// has no column of its own: a row with every object column null *is*
    /// the `none` value.
    pub fn column(self) -> Option<&'static str> {
        match self {
            ValueKind::Statement => Some("object_statement_id"),
            ValueKind::Blob => Some("object_blob_id"),
            ValueKind::Integer => Some("object_integer"),
            ValueKind::Decimal => Some("object_decimal"),
            ValueKind::String => Some("object_string"),
            ValueKind::Boolean => Some("object_boolean"),
            ValueKind::Datetime => Some("object_datetime"),
            ValueKind::None => None,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            ValueKind::Statement => "s",
            ValueKind::Blob => "blob",
            ValueKind::Integer => "int",
            ValueKind::Decimal => "dec",
            ValueKind::String => "str",
            ValueKind::Boolean => "bool",
            ValueKind::Datetime => "dt",
            ValueKind::None => "none",
        }
    }

    /// Parses the `<kind>` half of a `"<kind>.<op>"` filter-keyword key.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "statement" => Some(ValueKind::Statement),
            "blob" => Some(ValueKind::Blob),
            "integer" => Some(ValueKind::Integer),
            "decimal" => Some(ValueKind::Decimal),
            "string" => Some(ValueKind::String),
            "boolean" => Some(ValueKind::Boolean),
            "datetime" => Some(ValueKind::Datetime),
            "none" => Some(ValueKind::None),
            _ => None,
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Statement(_) => ValueKind::Statement,
            Value::Blob(_) => ValueKind::Blob,
            Value::Integer(_) => ValueKind::Integer,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::String(_) => ValueKind::String,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Datetime(_) => ValueKind::Datetime,
            Value::None => ValueKind::None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("value `{0}` could not be parsed")]
    ParseError(String),
    #[error("value prefix `{0}` is not a known kind")]
    UnknownKind(String),
}

pub fn serialize(value: &Value) -> String {
    match value {
        Value::Statement(handle) => format!("s:{}", handle),
        Value::Blob(handle) => format!("blob:{}", handle.to_hex()),
        Value::Integer(n) => format!("int:{}", n),
        Value::Decimal(d) => format!("dec:{}", d),
        Value::String(s) => format!("str:{}", s),
        Value::Boolean(b) => format!("bool:{}", b),
        Value::Datetime(dt) => format!("dt:{}", dt.to_rfc3339_opts(SecondsFormat::Micros, true)),
        Value::None => "none".to_owned(),
    }
}

pub fn deserialize(input: &str) -> Result<Value, ValueError> {
    if input == "none" {
        return Ok(Value::None);
    }

    let (prefix, payload) = input
        .split_once(':')
        .ok_or_else(|| ValueError::ParseError(input.to_owned()))?;

    match prefix {
        "s" => Uuid::parse_str(payload)
            .map(Value::Statement)
            .map_err(|_| ValueError::ParseError(input.to_owned())),
        "blob" => BlobHandle::from_hex(payload)
            .map(Value::Blob)
            .ok_or_else(|| ValueError::ParseError(input.to_owned())),
        "int" => payload
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| ValueError::ParseError(input.to_owned())),
        "dec" => payload
            .parse::<BigDecimal>()
            .map(Value::Decimal)
            .map_err(|_| ValueError::ParseError(input.to_owned())),
        "str" => Ok(Value::String(payload.to_owned())),
        "bool" => payload
            .parse::<bool>()
            .map(Value::Boolean)
            .map_err(|_| ValueError::ParseError(input.to_owned())),
        "dt" => DateTime::parse_from_rfc3339(payload)
            .map(|dt| Value::Datetime(dt.with_timezone(&Utc)))
            .map_err(|_| ValueError::ParseError(input.to_owned())),
        other => Err(ValueError::UnknownKind(other.to_owned())),
    }
}

/// Comparison operators the query compiler can apply to a value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Contains,
    StartsWith,
    EndsWith,
}

impl Op {
    pub fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Op::Eq),
            "ne" => Some(Op::Ne),
            "lt" => Some(Op::Lt),
            "le" => Some(Op::Le),
            "gt" => Some(Op::Gt),
            "ge" => Some(Op::Ge),
            "in" => Some(Op::In),
            "contains" => Some(Op::Contains),
            "starts_with" => Some(Op::StartsWith),
            "ends_with" => Some(Op::EndsWith),
            _ => None,
        }
    }

    /// Only `eq`/`ne` make sense against a boolean column; string-shaped
    /// operators only make sense against `object_string`. The compiler
    /// rejects mismatches as `QueryShape` errors rather than sending
    /// nonsensical SQL to Postgres.
    pub fn applies_to(self, kind: ValueKind) -> bool {
        match kind {
            ValueKind::Boolean => matches!(self, Op::Eq | Op::Ne | Op::In),
            ValueKind::String => true,
            ValueKind::None => matches!(self, Op::Eq | Op::Ne),
            _ => !matches!(self, Op::Contains | Op::StartsWith | Op::EndsWith),
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::In => "= ANY",
            Op::Contains => "LIKE",
            Op::StartsWith => "LIKE",
            Op::EndsWith => "LIKE",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serialize(self))
    }
}
