//! Wire form of operations.
//!
//! [`to_json`] wraps the tree produced by [`json::encode`] with a
//! `protocolVersion` field at the top level; [`from_json`] checks it when
//! present. Meta is never part of the encoding.

pub mod json;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{invalid, OtResult};
use crate::ops::Operation;

pub use json::{decode, encode};

/// Version written to, and accepted from, the top-level object.
pub const PROTOCOL_VERSION: u64 = 1;

const VERSION_FIELD: &str = "protocolVersion";

pub fn to_json(op: &Operation) -> Value {
    let mut v = encode(op);
    if let Value::Object(m) = &mut v {
        m.insert(VERSION_FIELD.into(), Value::from(PROTOCOL_VERSION));
    }
    v
}

pub fn from_json(v: &Value) -> OtResult<Operation> {
    match v.get(VERSION_FIELD) {
        None => decode(v),
        Some(version) if version.as_u64() == Some(PROTOCOL_VERSION) => {
            let mut v = v.clone();
            if let Value::Object(m) = &mut v {
                m.shift_remove(VERSION_FIELD);
            }
            decode(&v)
        }
        Some(version) => Err(invalid(format!("unsupported protocolVersion {version}"))),
    }
}

pub fn serialize(op: &Operation) -> String {
    to_json(op).to_string()
}

pub fn deserialize(text: &str) -> OtResult<Operation> {
    let v: Value = serde_json::from_str(text)?;
    from_json(&v)
}

impl Operation {
    pub fn to_json(&self) -> Value {
        to_json(self)
    }

    pub fn from_json(v: &Value) -> OtResult<Operation> {
        from_json(v)
    }

    pub fn serialize(&self) -> String {
        serialize(self)
    }

    pub fn deserialize(text: &str) -> OtResult<Operation> {
        deserialize(text)
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        from_json(&v).map_err(D::Error::custom)
    }
}
