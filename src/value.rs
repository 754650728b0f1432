//! Column Values
//!
//! The variant type carried between data handlers, rows, filter parameters
//! and the XML output tree.

use std::borrow::Cow;
use std::fmt;

use crate::error::{DbmsError, Result};
use crate::ordered::UNORDERED;

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form used for attribute values and text nodes
    ///
    /// Returns None for SQL NULL, which produces no node at all.
    pub fn to_xml_string(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            Value::Int(i) => Some(Cow::Owned(i.to_string())),
            Value::Float(f) => Some(Cow::Owned(f.to_string())),
            Value::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Bytes(b) => Some(Cow::Owned(to_hex(b))),
        }
    }

    /// Convert an order-column value to a sibling order value
    ///
    /// NULL maps to [`UNORDERED`]; fractional or out-of-range numbers are a
    /// data error rather than being silently truncated.
    pub fn to_order_value(&self) -> Result<i64> {
        let value = match self {
            Value::Null => return Ok(UNORDERED),
            Value::Int(i) => *i,
            Value::Float(f) => {
                if f.fract() != 0.0 || !f.is_finite() || *f < i64::MIN as f64 || *f >= i64::MAX as f64 {
                    return Err(DbmsError::Conversion(format!(
                        "order value {} cannot be narrowed to a 64-bit integer",
                        f
                    )));
                }
                *f as i64
            }
            Value::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                DbmsError::Conversion(format!("order value \"{}\" is not an integer", s))
            })?,
            Value::Bool(_) | Value::Bytes(_) => {
                return Err(DbmsError::Conversion(format!(
                    "{} cannot be used as an order value",
                    self
                )))
            }
        };

        // The sentinel is reserved for "no order"
        if value == UNORDERED {
            return Err(DbmsError::Conversion(format!(
                "order value {} is reserved",
                value
            )));
        }
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_xml_string() {
            Some(s) => f.write_str(&s),
            None => f.write_str("NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}
