//! Declared and observed zone records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::identity::RecordId;
use crate::normalize::normalize_name;

/// TTL used when a declaration does not set one
pub const DEFAULT_RECORD_TTL: u32 = 14400;

/// Record types a declaration may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    ALIAS,
    MX,
    TXT,
    NS,
    SOA,
    SRV,
    CAA,
}

impl RecordType {
    /// Canonical upper-case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CNAME => "CNAME",
            Self::ALIAS => "ALIAS",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::NS => "NS",
            Self::SOA => "SOA",
            Self::SRV => "SRV",
            Self::CAA => "CAA",
        }
    }

    /// Whether an observed type string names this type
    pub fn matches(self, observed: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(observed)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::AAAA),
            "CNAME" => Ok(Self::CNAME),
            "ALIAS" => Ok(Self::ALIAS),
            "MX" => Ok(Self::MX),
            "TXT" => Ok(Self::TXT),
            "NS" => Ok(Self::NS),
            "SOA" => Ok(Self::SOA),
            "SRV" => Ok(Self::SRV),
            "CAA" => Ok(Self::CAA),
            _ => Err(Error::invalid_input(format!("unsupported record type '{}'", s))),
        }
    }
}

impl TryFrom<String> for RecordType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

/// A record as the user declares it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredRecord {
    /// Record name relative to the zone (`www`, `@`, ...)
    pub name: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Record content
    pub value: String,

    /// Time-to-live (in seconds)
    #[serde(default = "default_record_ttl")]
    pub ttl: u32,
}

impl DeclaredRecord {
    /// Declare a record with the default TTL
    pub fn new(name: impl Into<String>, record_type: RecordType, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type,
            value: value.into(),
            ttl: DEFAULT_RECORD_TTL,
        }
    }

    /// Override the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Identity this record gets once created
    ///
    /// Built from the normalized name and the canonical type, so two
    /// declarations that differ only in name case or a root dot share it.
    pub fn record_id(&self) -> RecordId {
        RecordId::new(
            normalize_name(&self.name),
            self.record_type.as_str(),
            self.value.clone(),
        )
    }

    /// Reject declarations the API can never accept
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_input("record name cannot be empty"));
        }
        if self.value.is_empty() {
            return Err(Error::invalid_input(format!(
                "value of {} record '{}' cannot be empty",
                self.record_type, self.name
            )));
        }
        if self.ttl == 0 {
            return Err(Error::invalid_input(format!(
                "ttl of record '{}' must be > 0",
                self.name
            )));
        }
        Ok(())
    }
}

fn default_record_ttl() -> u32 {
    DEFAULT_RECORD_TTL
}

/// A record located in a fresh zone snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedRecord {
    /// Identity the record was located by
    pub id: RecordId,
    /// Zone the record lives in
    pub zone: String,
    /// Group name as returned by the API
    pub name: String,
    /// Group type as returned by the API
    pub record_type: String,
    /// Matched content as returned by the API
    pub value: String,
    /// Observed group TTL
    pub ttl: u32,
}
