//! Per-object state readings as they travel over the wire and sit in history

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the dynamic field that is blended along the shorter arc
pub const DIRECTION_KEY: &str = "direction";

/// A value that is carried through interpolation untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Flag(bool),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Integer(v as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Flag(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

pub type StaticFields = BTreeMap<String, FieldValue>;
pub type DynamicFields = BTreeMap<String, f64>;

/// One object's state as serialized by the server for a single tick
///
/// `last_updated` is only meaningful for independently timed objects, whose
/// position changes on their own schedule rather than every tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub id: u32,
    pub static_fields: StaticFields,
    pub dynamic_fields: DynamicFields,
    pub last_updated: Option<u64>,
}

impl EntityUpdate {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_static(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.static_fields.insert(key.to_string(), value.into());
        self
    }

    pub fn with_dynamic(mut self, key: &str, value: f64) -> Self {
        self.dynamic_fields.insert(key.to_string(), value);
        self
    }

    pub fn updated_at(mut self, time: u64) -> Self {
        self.last_updated = Some(time);
        self
    }
}

/// Anything that can be ordered on a server timeline
pub trait Timestamped {
    fn server_time(&self) -> u64;
}

/// One timestamped reading of a tracked object, immutable once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: u32,
    pub server_time: u64,
    pub static_fields: StaticFields,
    pub dynamic_fields: DynamicFields,
}

impl Snapshot {
    pub fn from_update(update: &EntityUpdate, server_time: u64) -> Self {
        Self {
            id: update.id,
            server_time,
            static_fields: update.static_fields.clone(),
            dynamic_fields: update.dynamic_fields.clone(),
        }
    }
}

impl Timestamped for Snapshot {
    fn server_time(&self) -> u64 {
        self.server_time
    }
}
