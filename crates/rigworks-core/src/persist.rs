//! Named-field save records.
//!
//! Machines persist themselves as a [`Record`]: a flat map of named scalar
//! fields (integers, doubles, booleans) plus nested records for buffers and
//! tanks. Readers always take a default, so a record written by an older or
//! newer build loads without error: absent or mistyped fields fall back to
//! the documented default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fixed::Fixed64;
use crate::pos::BlockPos;

/// Errors at the text boundary of a record.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("record is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("record root must be an object")]
    NotAnObject,
}

/// Something that saves to and loads from a [`Record`].
pub trait Persist {
    fn save(&self) -> Record;

    /// Overwrite state from `record`. Missing fields take defaults and
    /// out-of-range values are clamped; this never fails.
    fn load(&mut self, record: &Record);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn put_i64(&mut self, name: &str, value: i64) {
        self.fields.insert(name.to_owned(), Value::from(value));
    }

    pub fn put_f64(&mut self, name: &str, value: f64) {
        self.fields.insert(name.to_owned(), Value::from(value));
    }

    pub fn put_bool(&mut self, name: &str, value: bool) {
        self.fields.insert(name.to_owned(), Value::from(value));
    }

    /// Fixed-point values are stored as doubles.
    pub fn put_fixed(&mut self, name: &str, value: Fixed64) {
        self.put_f64(name, value.to_num::<f64>());
    }

    pub fn put_record(&mut self, name: &str, record: Record) {
        self.fields.insert(name.to_owned(), Value::Object(record.fields));
    }

    /// Optional positions are written as a nested `{x, y, z}` record, or
    /// omitted entirely when `None`.
    pub fn put_pos(&mut self, name: &str, pos: Option<BlockPos>) {
        match pos {
            Some(p) => {
                let mut nested = Record::new();
                nested.put_i64("x", i64::from(p.x));
                nested.put_i64("y", i64::from(p.y));
                nested.put_i64("z", i64::from(p.z));
                self.put_record(name, nested);
            }
            None => {
                self.fields.remove(name);
            }
        }
    }

    pub fn get_i64(&self, name: &str, default: i64) -> i64 {
        self.fields.get(name).and_then(Value::as_i64).unwrap_or(default)
    }

    pub fn get_f64(&self, name: &str, default: f64) -> f64 {
        self.fields
            .get(name)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.fields.get(name).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn get_fixed(&self, name: &str, default: Fixed64) -> Fixed64 {
        match self.fields.get(name).and_then(Value::as_f64) {
            Some(v) => Fixed64::checked_from_num(v).unwrap_or(default),
            None => default,
        }
    }

    /// A nested record, or an empty one when absent or not an object.
    pub fn get_record(&self, name: &str) -> Record {
        match self.fields.get(name) {
            Some(Value::Object(map)) => Record { fields: map.clone() },
            _ => Record::new(),
        }
    }

    pub fn get_pos(&self, name: &str) -> Option<BlockPos> {
        let nested = match self.fields.get(name) {
            Some(Value::Object(map)) => map,
            _ => return None,
        };
        let coord = |key: &str| {
            nested
                .get(key)
                .and_then(Value::as_i64)
                .and_then(|v| i32::try_from(v).ok())
        };
        Some(BlockPos::new(coord("x")?, coord("y")?, coord("z")?))
    }

    /// Integer fields whose name starts with `prefix`, with the prefix
    /// stripped. Non-integer values are skipped.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, i64)> + 'a {
        self.fields.iter().filter_map(move |(name, value)| {
            let rest = name.strip_prefix(prefix)?;
            Some((rest, value.as_i64()?))
        })
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }

    pub fn from_json(text: &str) -> Result<Self, PersistError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(PersistError::NotAnObject),
        }
    }
}
