// crates/trellis-rpc/src/message.rs
//
// FieldSet: the string-keyed message format of the command protocol.
//
// Every request and reply is a flat, ordered set of string fields. The
// `Message` field names the command; the remaining fields are its
// parameters. On the wire a FieldSet is a JSON object of string values.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use trellis_core::error::TrellisError;

/// Field naming the command of a request or the kind of a reply.
pub const MESSAGE: &str = "Message";

/// Ordered string-to-string message. Keys are unique; `put` overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<(String, String)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A FieldSet whose `Message` field is `name`.
    pub fn message(name: &str) -> Self {
        let mut fields = Self::new();
        fields.put(MESSAGE, name);
        fields
    }

    /// The `Message` field, if present.
    pub fn message_name(&self) -> Option<&str> {
        self.get(MESSAGE)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// A mandatory parameter. Absence is `MissingParameter`.
    pub fn require(&self, key: &str) -> Result<&str, TrellisError> {
        self.get(key)
            .ok_or_else(|| TrellisError::MissingParameter(key.to_string()))
    }

    /// An optional boolean parameter, `true`/`false` in any case.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, TrellisError> {
        self.get(key).map(|value| parse_bool(key, value)).transpose()
    }

    /// A mandatory boolean parameter.
    pub fn require_bool(&self, key: &str) -> Result<bool, TrellisError> {
        parse_bool(key, self.require(key)?)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, TrellisError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(TrellisError::InvalidParameter(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FieldSet::new();
        for (k, v) in iter {
            fields.put(k, v);
        }
        fields
    }
}

impl Serialize for FieldSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldSetVisitor;

        impl<'de> Visitor<'de> for FieldSetVisitor {
            type Value = FieldSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of string fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldSet, A::Error> {
                let mut fields = FieldSet::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    fields.put(key, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldSetVisitor)
    }
}
