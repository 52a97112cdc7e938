//! Dynamic property values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::{Error, TypeError};
use crate::record::TransferRecord;

/// Property name → value mapping used by bulk `get`/`set`.
pub type ValueMap = BTreeMap<String, Value>;

/// A dynamically-typed property value.
///
/// Scalars carry entity column data. `Record` and `Array` carry the nested
/// graph produced when a relationship is projected through a mold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Unset, or explicitly null
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    /// Exact decimal kept in its textual form
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    /// Days since the Unix epoch
    Date(i32),
    /// Microseconds since the Unix epoch
    Timestamp(i64),
    Uuid([u8; 16]),
    Json(serde_json::Value),
    /// Ordered collection; projected to-many relationships land here
    Array(Vec<Value>),
    /// A projected to-one relationship
    Record(Box<TransferRecord>),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short lowercase label of the variant, used in type errors.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
        }
    }

    /// Whether this value is part of a projected graph rather than a scalar.
    ///
    /// True for records and for arrays holding at least one record.
    pub fn is_graph(&self) -> bool {
        match self {
            Value::Record(_) => true,
            Value::Array(items) => items.iter().any(|v| matches!(v, Value::Record(_))),
            _ => false,
        }
    }

    /// Booleans, and integers read as `!= 0`.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            Value::Int(n) => Some(n != 0),
            Value::BigInt(n) => Some(n != 0),
            _ => None,
        }
    }

    /// Any integer width, widened. Booleans count as 0/1.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(n) => Some(n.into()),
            Value::BigInt(n) => Some(n),
            Value::Bool(b) => Some(i64::from(b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(x) => Some(*x),
            Value::Int(n) => Some((*n).into()),
            Value::BigInt(n) => Some(*n as f64),
            Value::Decimal(text) => text.parse().ok(),
            _ => None,
        }
    }

    /// Text and decimal values as `&str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) | Value::Decimal(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow the nested record of a projected to-one relationship.
    pub fn as_record(&self) -> Option<&TransferRecord> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Borrow the elements of an array value.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! scalar_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

scalar_conversions! {
    bool => Bool,
    i32 => Int,
    i64 => BigInt,
    f64 => Double,
    String => Text,
    Vec<u8> => Bytes,
    [u8; 16] => Uuid,
    serde_json::Value => Json,
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::BigInt(v.into())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<TransferRecord> for Value {
    fn from(v: TransferRecord) -> Self {
        Value::Record(Box::new(v))
    }
}

impl From<Vec<TransferRecord>> for Value {
    fn from(v: Vec<TransferRecord>) -> Self {
        Value::Array(v.into_iter().map(Value::from).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Checked conversion out of a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &'static str, value: &Value) -> Error {
    Error::Type(TypeError {
        expected,
        actual: value.type_name().to_string(),
        property: None,
    })
}

fn out_of_range(expected: &'static str, n: i64) -> Error {
    Error::Type(TypeError {
        expected,
        actual: format!("{} (out of range)", n),
        property: None,
    })
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch("i64", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        let n = value.as_i64().ok_or_else(|| mismatch("i32", value))?;
        i32::try_from(n).map_err(|_| out_of_range("i32", n))
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Result<Self> {
        let n = value.as_i64().ok_or_else(|| mismatch("u32", value))?;
        u32::try_from(n).map_err(|_| out_of_range("u32", n))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| mismatch("String", value))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bytes(bytes) => Ok(bytes.clone()),
            Value::Text(text) => Ok(text.clone().into_bytes()),
            _ => Err(mismatch("Vec<u8>", value)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Json(doc) => Ok(doc.clone()),
            _ => Err(mismatch("json", value)),
        }
    }
}

impl FromValue for TransferRecord {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_record()
            .cloned()
            .ok_or_else(|| mismatch("record", value))
    }
}

/// Null reads as `None`; anything else must convert to `T`.
impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! impl_from_value_for_vec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for Vec<$ty> {
                fn from_value(value: &Value) -> Result<Self> {
                    match value {
                        Value::Array(items) => items.iter().map(<$ty>::from_value).collect(),
                        _ => Err(mismatch("array", value)),
                    }
                }
            }
        )*
    };
}

// Vec<u8> decodes from Value::Bytes above.
impl_from_value_for_vec!(bool, i32, i64, f64, String, Value, TransferRecord);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_roundtrip_through_null() {
        let v = Value::from(None::<i64>);
        assert!(v.is_null());
        assert_eq!(Option::<i64>::from_value(&v).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(&Value::Int(7)).unwrap(), Some(7));
    }

    #[test]
    fn integer_narrowing_is_checked() {
        assert_eq!(i32::from_value(&Value::BigInt(42)).unwrap(), 42);
        let err = i32::from_value(&Value::BigInt(i64::MAX)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn string_rejects_numbers() {
        let err = String::from_value(&Value::BigInt(1)).unwrap_err();
        assert_eq!(err.to_string(), "Type error: expected String, found bigint");
    }

    #[test]
    fn arrays_decode_elementwise() {
        let v = Value::Array(vec![Value::Text("a".into()), Value::Text("b".into())]);
        assert_eq!(
            Vec::<String>::from_value(&v).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(!v.is_graph());
    }

    #[test]
    fn graph_detection() {
        let rec = TransferRecord::with_properties(["id"], ["id"]).unwrap();
        assert!(Value::from(rec.clone()).is_graph());
        assert!(Value::from(vec![rec]).is_graph());
        assert!(!Value::Array(vec![]).is_graph());
    }
}
