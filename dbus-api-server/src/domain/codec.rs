//! Conversion between bus-native values and JSON.

use super::bus::BusValue;
use serde_json::{Map, Number, Value};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("floating point value {0} has no JSON representation")]
    NonFiniteFloat(f64),
    #[error("dictionary key of kind {0} cannot be used as a JSON object key")]
    UnsupportedKey(&'static str),
    #[error("cannot write {0} values to the bus")]
    UnsupportedWrite(&'static str),
}

/// Encodes a bus value as JSON, recursing through arrays and dictionaries.
pub fn encode(value: &BusValue) -> Result<Value, CodecError> {
    Ok(match value {
        BusValue::Bool(v) => Value::Bool(*v),
        BusValue::Byte(v) => Value::from(*v),
        BusValue::Int16(v) => Value::from(*v),
        BusValue::UInt16(v) => Value::from(*v),
        BusValue::Int32(v) => Value::from(*v),
        BusValue::UInt32(v) => Value::from(*v),
        BusValue::Int64(v) => Value::from(*v),
        BusValue::UInt64(v) => Value::from(*v),
        BusValue::Double(v) => Number::from_f64(*v)
            .map(Value::Number)
            .ok_or(CodecError::NonFiniteFloat(*v))?,
        BusValue::Str(v) => Value::String(v.clone()),
        BusValue::Array(items) => Value::Array(items.iter().map(encode).collect::<Result<_, _>>()?),
        BusValue::Dict(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(encode_key(key)?, encode(item)?);
            }
            Value::Object(map)
        }
    })
}

fn encode_key(key: &BusValue) -> Result<String, CodecError> {
    Ok(match key {
        BusValue::Str(s) => s.clone(),
        BusValue::Array(_) => return Err(CodecError::UnsupportedKey("array")),
        BusValue::Dict(_) => return Err(CodecError::UnsupportedKey("dictionary")),
        scalar => encode(scalar)?.to_string(),
    })
}

/// Maps a client-supplied JSON scalar onto the argument handed to `SetValue`.
///
/// Integers go out as 32-bit when they fit, which is what the settings daemon
/// and most device services expect; range and type checks stay with the bus.
pub fn to_write_argument(value: &Value) -> Result<BusValue, CodecError> {
    match value {
        Value::Bool(v) => Ok(BusValue::Bool(*v)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i32::try_from(i)
                    .map(BusValue::Int32)
                    .unwrap_or(BusValue::Int64(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(BusValue::UInt64(u))
            } else {
                let f = n.as_f64().ok_or(CodecError::UnsupportedWrite("number"))?;
                Ok(BusValue::Double(f))
            }
        }
        Value::String(s) => Ok(BusValue::Str(s.clone())),
        Value::Array(_) => Err(CodecError::UnsupportedWrite("array")),
        Value::Null => Err(CodecError::UnsupportedWrite("null")),
        Value::Object(_) => Err(CodecError::UnsupportedWrite("object")),
    }
}
