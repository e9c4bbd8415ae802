//! Synthetic record identity
//!
//! Zone records have no id on the API side, so a record is identified by
//! the triple it was declared with, encoded as `name|type|value`.
//!
//! ## Escaping
//!
//! `%` and `|` inside a component are written as `%25` and `%7C`. Components
//! without those characters encode to the plain `name|type|value` form, and
//! `decode(encode(n, t, v)) == (n, t, v)` holds for every input.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const DELIMITER: char = '|';

/// Identity of one declared zone record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    name: String,
    record_type: String,
    value: String,
}

impl RecordId {
    /// Build an identity from its three components, stored as given
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            value: value.into(),
        }
    }

    /// Encode the identity into its external string form
    pub fn encode(&self) -> String {
        format!(
            "{}{DELIMITER}{}{DELIMITER}{}",
            escape(&self.name),
            escape(&self.record_type),
            escape(&self.value)
        )
    }

    /// Parse an external id back into its components
    ///
    /// # Errors
    ///
    /// `Error::MalformedId` when the id does not split into exactly three
    /// components or carries an invalid escape.
    pub fn decode(id: &str) -> Result<Self> {
        let parts: Vec<&str> = id.split(DELIMITER).collect();
        let [name, record_type, value] = parts.as_slice() else {
            return Err(Error::MalformedId(format!(
                "expected 3 '|'-separated components, got {}: {}",
                parts.len(),
                id
            )));
        };

        Ok(Self {
            name: unescape(name, id)?,
            record_type: unescape(record_type, id)?,
            value: unescape(value, id)?,
        })
    }

    /// Record name component
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record type component
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Record value component
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Split into (name, type, value)
    pub fn into_parts(self) -> (String, String, String) {
        (self.name, self.record_type, self.value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '%' => out.push_str("%25"),
            DELIMITER => out.push_str("%7C"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(component: &str, id: &str) -> Result<String> {
    let mut out = String::with_capacity(component.len());
    let mut rest = component;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = rest.get(pos..pos + 3).unwrap_or(&rest[pos..]);
        match escape.to_ascii_uppercase().as_str() {
            "%25" => out.push('%'),
            "%7C" => out.push(DELIMITER),
            _ => {
                return Err(Error::MalformedId(format!(
                    "invalid escape '{}' in {}",
                    escape, id
                )));
            }
        }
        rest = &rest[pos + escape.len()..];
    }
    out.push_str(rest);
    Ok(out)
}
