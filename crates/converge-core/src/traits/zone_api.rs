// # Zone API Trait
//
// Defines the interface for reading and writing DNS zones.
//
// ## Shape of the API
//
// A zone is returned as one unordered list of (name, type) groups, each
// holding the contents published under that group. No record carries an id,
// and writes address whole groups:
//
// - `get_zone` returns the full snapshot
// - `put_zone` adds groups (`overwrite: false`) or replaces them (`true`)
// - `delete_zone_groups` removes every record of the filtered groups
//
// There is no call that deletes a single content out of a group.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One published content inside an observed group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedContent {
    /// Record content as stored by the API
    pub content: String,
    /// Disabled contents are not served and never count as matches
    #[serde(default)]
    pub is_disabled: bool,
}

/// One (name, type) group of a zone snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecordGroup {
    /// Group name as returned (any case, maybe with a root dot)
    pub name: String,
    /// Record type as returned
    #[serde(rename = "type")]
    pub record_type: String,
    /// Time-to-live shared by the group
    pub ttl: u32,
    /// Contents in API order
    #[serde(default)]
    pub records: Vec<ObservedContent>,
}

/// Content of a group being written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEntryContent {
    /// Record content
    pub content: String,
}

/// A group being written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEntry {
    /// Group name
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: String,
    /// Time-to-live for the group
    pub ttl: u32,
    /// Contents to publish
    pub records: Vec<ZoneEntryContent>,
}

impl ZoneEntry {
    /// Build an entry from plain contents
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        ttl: u32,
        contents: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            ttl,
            records: contents
                .into_iter()
                .map(|content| ZoneEntryContent { content })
                .collect(),
        }
    }
}

/// Payload of a zone write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneUpdate {
    /// Replace the written groups instead of adding to them
    pub overwrite: bool,
    /// Groups to write
    pub entries: Vec<ZoneEntry>,
}

/// Selects one (name, type) group for deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFilter {
    /// Group name
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: String,
}

/// Trait for zone API implementations
///
/// Implementations execute exactly one API call per method and return
/// success or failure; waiting for visibility and deciding what to write
/// belong to the `ZoneReconciler`.
///
/// # Errors
///
/// - `Error::NotFound` when the zone itself does not exist
/// - `Error::Transport` for network failures
/// - `Error::Api` for any status outside the documented success set
#[async_trait]
pub trait ZoneApi: Send + Sync {
    /// Fetch the complete zone snapshot
    async fn get_zone(&self, zone: &str) -> Result<Vec<ZoneRecordGroup>, crate::Error>;

    /// Write groups into the zone
    async fn put_zone(&self, zone: &str, update: &ZoneUpdate) -> Result<(), crate::Error>;

    /// Delete every record of the filtered groups
    async fn delete_zone_groups(
        &self,
        zone: &str,
        filters: &[GroupFilter],
    ) -> Result<(), crate::Error>;
}
