//! Sender request payload (JSON inside the envelope).
//!
//! `{"request": "sender data", "data": [{"host": .., "key": .., "value": ..}, ..]}`
//!
//! Only `data` is required. Extra fields (`request`, `clock`, `ns`, ..) are
//! accepted and ignored since agents of different versions add their own.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{BridgeError, Result};

/// Item value as sent on the wire, classified once at decode time.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    String(String),
    Integer(i64),
    Float(f64),
    /// Any other JSON kind (`null`, `bool`, `array`, `object`).
    Unsupported(&'static str),
}

impl From<Value> for RawValue {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => RawValue::String(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Integer(i),
                // u64 above i64::MAX still fits a float
                None => n.as_f64().map_or(RawValue::Unsupported("number"), RawValue::Float),
            },
            Value::Null => RawValue::Unsupported("null"),
            Value::Bool(_) => RawValue::Unsupported("bool"),
            Value::Array(_) => RawValue::Unsupported("array"),
            Value::Object(_) => RawValue::Unsupported("object"),
        }
    }
}

impl RawValue {
    /// Convert to the gauge value.
    ///
    /// Strings must be base-10 float literals; no trimming is applied.
    pub fn coerce(&self) -> Result<f64> {
        match self {
            RawValue::String(s) => s
                .parse::<f64>()
                .map_err(|_| BridgeError::Value(format!("cannot parse {s:?} as a number"))),
            RawValue::Integer(i) => Ok(*i as f64),
            RawValue::Float(f) => Ok(*f),
            RawValue::Unsupported(kind) => {
                Err(BridgeError::Value(format!("unsupported value type: {kind}")))
            }
        }
    }
}

/// Item key split into its base key and bracketed parameters.
///
/// `net.if.in[eth0,bytes]` => base `net.if.in`, args `["eth0", "bytes"]`.
/// Parameters are split on every comma; quoting and escaping are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeKey {
    full: String,
    base_len: usize,
    args: Vec<String>,
}

impl CompositeKey {
    pub fn parse(key: &str) -> Self {
        let Some(open) = key.find('[') else {
            return Self {
                full: key.to_string(),
                base_len: key.len(),
                args: Vec::new(),
            };
        };

        let rest = &key[open + 1..];
        // unterminated list: parameters run to the end of the key
        let inner = match rest.rfind(']') {
            Some(close) => &rest[..close],
            None => rest,
        };

        Self {
            full: key.to_string(),
            base_len: open,
            args: inner.split(',').map(str::to_string).collect(),
        }
    }

    /// Key as received.
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// Text before the first `[`.
    pub fn base(&self) -> &str {
        &self.full[..self.base_len]
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// One pushed `(host, key, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub host: String,
    pub key: CompositeKey,
    pub value: RawValue,
}

#[derive(Deserialize)]
struct WireRequest {
    // `null` is an empty request; a missing `data` is still malformed
    #[serde(deserialize_with = "null_as_default")]
    data: Vec<WireItem>,
}

#[derive(Deserialize)]
struct WireItem {
    #[serde(default, deserialize_with = "null_as_default")]
    host: String,
    #[serde(default, deserialize_with = "null_as_default")]
    key: String,
    #[serde(default)]
    value: Value,
}

fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Decode a request payload into data points, preserving arrival order.
///
/// Any structural problem fails the whole request; value problems are left
/// for the dispatcher to report per item.
pub fn parse_request(payload: &[u8]) -> Result<Vec<DataPoint>> {
    let req: WireRequest = serde_json::from_slice(payload)
        .map_err(|e| BridgeError::Decode(format!("invalid sender request: {e}")))?;

    Ok(req
        .data
        .into_iter()
        .map(|it| DataPoint {
            key: CompositeKey::parse(&it.key),
            host: it.host,
            value: RawValue::from(it.value),
        })
        .collect())
}
