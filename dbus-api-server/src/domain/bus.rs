use serde::{Deserialize, Serialize};
use std::fmt;

/// One value exposed on the system bus: a well-known service name plus the
/// object path of a `com.victronenergy.BusItem`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusAddress {
    pub service: String,
    pub path: String,
}

impl BusAddress {
    pub fn new(service: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.service, self.path)
    }
}

/// Bus-native value as produced by `GetValue`/`GetItems`.
///
/// Integer variants keep the wire width so the codec can encode them without
/// a lossy detour through `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum BusValue {
    Bool(bool),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Str(String),
    Array(Vec<BusValue>),
    /// Dictionary entries in wire order. Keys are arbitrary bus values; the
    /// codec stringifies the ones that are not already strings.
    Dict(Vec<(BusValue, BusValue)>),
}

impl BusValue {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Integer view of numeric scalars. Doubles with an integral value count;
    /// everything else is `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BusValue::Byte(v) => Some(i64::from(*v)),
            BusValue::Int16(v) => Some(i64::from(*v)),
            BusValue::UInt16(v) => Some(i64::from(*v)),
            BusValue::Int32(v) => Some(i64::from(*v)),
            BusValue::UInt32(v) => Some(i64::from(*v)),
            BusValue::Int64(v) => Some(*v),
            BusValue::UInt64(v) => i64::try_from(*v).ok(),
            BusValue::Bool(v) => Some(i64::from(*v)),
            BusValue::Double(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BusValue::Str(s) => Some(s),
            _ => None,
        }
    }
}
