use std::fmt::Write;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::DriverError;

// Thread-local buffer for efficient timestamp formatting
thread_local! {
    static TIMESTAMP_BUF: std::cell::RefCell<String> = std::cell::RefCell::new(String::with_capacity(32));
}

/// A value supplied as a statement binding.
///
/// Legacy callers pass heterogeneous arguments, including structured data
/// nested inside named maps, so `List` and `Map` are part of the union even
/// though only scalars can ultimately be bound to a placeholder. A `Map`
/// preserves insertion order for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Real(f64),
    /// Text/string value
    Text(String),
    /// Boolean value; coerced to `Int` before any value reaches the engine
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// Binary data
    Blob(Vec<u8>),
    /// Ordered sequence of nested values
    List(Vec<BindValue>),
    /// Named map of nested values, insertion order preserved
    Map(Vec<(String, BindValue)>),
}

impl BindValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Recursively replace every boolean with its integer form
    /// (`true` -> `1`, `false` -> `0`).
    ///
    /// Recurses through arbitrarily nested lists and maps; all other values
    /// pass through unchanged. Idempotent: coercing twice yields the same
    /// structure.
    #[must_use]
    pub fn coerce_booleans(self) -> BindValue {
        match self {
            BindValue::Bool(b) => BindValue::Int(i64::from(b)),
            BindValue::List(items) => {
                BindValue::List(items.into_iter().map(BindValue::coerce_booleans).collect())
            }
            BindValue::Map(entries) => BindValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.coerce_booleans()))
                    .collect(),
            ),
            other => other,
        }
    }
}

/// Convert a single `BindValue` to a rusqlite `Value`.
///
/// # Errors
///
/// Returns `DriverError::ParameterError` for `List`/`Map` values, which
/// cannot be bound to a single placeholder.
pub fn to_sqlite_value(value: &BindValue) -> Result<rusqlite::types::Value, DriverError> {
    match value {
        BindValue::Int(i) => Ok(rusqlite::types::Value::Integer(*i)),
        BindValue::Real(f) => Ok(rusqlite::types::Value::Real(*f)),
        BindValue::Text(s) => Ok(rusqlite::types::Value::Text(s.clone())),
        BindValue::Bool(b) => Ok(rusqlite::types::Value::Integer(i64::from(*b))),
        // Format timestamps once for better performance
        BindValue::Timestamp(dt) => TIMESTAMP_BUF.with(|buf| {
            let mut borrow = buf.borrow_mut();
            borrow.clear();
            write!(borrow, "{}", dt.format("%F %T%.f"))
                .map_err(|e| DriverError::ParameterError(format!("timestamp format: {e}")))?;
            Ok(rusqlite::types::Value::Text(borrow.clone()))
        }),
        BindValue::Null => Ok(rusqlite::types::Value::Null),
        BindValue::Blob(bytes) => Ok(rusqlite::types::Value::Blob(bytes.clone())),
        BindValue::List(_) => Err(DriverError::ParameterError(
            "nested list cannot be bound to a single placeholder".into(),
        )),
        BindValue::Map(_) => Err(DriverError::ParameterError(
            "nested map cannot be bound to a single placeholder".into(),
        )),
    }
}

impl From<i64> for BindValue {
    fn from(v: i64) -> Self {
        BindValue::Int(v)
    }
}

impl From<i32> for BindValue {
    fn from(v: i32) -> Self {
        BindValue::Int(i64::from(v))
    }
}

impl From<f64> for BindValue {
    fn from(v: f64) -> Self {
        BindValue::Real(v)
    }
}

impl From<bool> for BindValue {
    fn from(v: bool) -> Self {
        BindValue::Bool(v)
    }
}

impl From<&str> for BindValue {
    fn from(v: &str) -> Self {
        BindValue::Text(v.to_string())
    }
}

impl From<String> for BindValue {
    fn from(v: String) -> Self {
        BindValue::Text(v)
    }
}

impl From<Vec<u8>> for BindValue {
    fn from(v: Vec<u8>) -> Self {
        BindValue::Blob(v)
    }
}

impl From<NaiveDateTime> for BindValue {
    fn from(v: NaiveDateTime) -> Self {
        BindValue::Timestamp(v)
    }
}

impl<T> From<Option<T>> for BindValue
where
    T: Into<BindValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => BindValue::Null,
        }
    }
}

/// Conversion for callers holding dynamic JSON-shaped arguments.
///
/// JSON numbers outside the `i64` range map to `Real`; objects map to named
/// maps in the serializer's iteration order.
impl From<JsonValue> for BindValue {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => BindValue::Null,
            JsonValue::Bool(b) => BindValue::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::Int(i)
                } else {
                    BindValue::Real(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => BindValue::Text(s),
            JsonValue::Array(items) => {
                BindValue::List(items.into_iter().map(BindValue::from).collect())
            }
            JsonValue::Object(entries) => BindValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, BindValue::from(v)))
                    .collect(),
            ),
        }
    }
}
