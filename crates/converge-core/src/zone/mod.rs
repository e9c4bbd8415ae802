//! Zone record reconciliation
//!
//! The ZoneReconciler is responsible for:
//! - Adding a declared record to its (name, type) group
//! - Waiting until the record is visible in the zone snapshot
//! - Locating a record by its synthetic id
//! - Retracting one record without touching its siblings
//!
//! ## Retract
//!
//! The API can only delete whole groups, so removing one content from a
//! group with other live contents is a two-phase rewrite:
//!
//! ```text
//! get_zone ──▶ other live contents? ── no ──▶ delete group ──▶ GroupDeleted
//!                     │
//!                    yes
//!                     ▼
//!              delete group ──▶ wait ──▶ put kept contents ──▶ Rewritten
//!                                               │
//!                                             fails
//!                                               ▼
//!                                        PartialFailure
//! ```
//!
//! Every operation starts from a fresh snapshot. Nothing is cached between
//! calls, and two reconcilers must never write the same zone at once.

mod record;

pub use record::{DEFAULT_RECORD_TTL, DeclaredRecord, ObservedRecord, RecordType};

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ZoneConfig;
use crate::error::{Error, Result};
use crate::identity::RecordId;
use crate::normalize::{content_equals, normalize_name};
use crate::retry::{Attempt, PollOutcome, RetryDriver};
use crate::traits::{GroupFilter, ZoneApi, ZoneEntry, ZoneRecordGroup, ZoneUpdate};

/// Result of locating a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The record is live in the zone
    Found(ObservedRecord),
    /// No live content matches the id
    Absent,
}

impl ReadOutcome {
    /// The located record, if any
    pub fn found(self) -> Option<ObservedRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::Absent => None,
        }
    }
}

/// Result of a retract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetractOutcome {
    /// The group held nothing else and was deleted with one call
    GroupDeleted,
    /// The group was deleted and its other contents written back
    Rewritten {
        /// Contents written back, in snapshot order
        kept: Vec<String>,
    },
}

/// Converges declared records against a zone API
pub struct ZoneReconciler {
    api: Arc<dyn ZoneApi>,
    config: ZoneConfig,
    driver: RetryDriver,
}

impl ZoneReconciler {
    /// Create a reconciler that sleeps on the tokio timer
    pub fn new(api: Arc<dyn ZoneApi>, config: ZoneConfig) -> Self {
        Self::with_driver(api, config, RetryDriver::tokio())
    }

    /// Create a reconciler with an explicit polling driver
    pub fn with_driver(api: Arc<dyn ZoneApi>, config: ZoneConfig, driver: RetryDriver) -> Self {
        Self {
            api,
            config,
            driver,
        }
    }

    /// Effective configuration
    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// Add a declared record to the zone and wait until it is visible
    ///
    /// Issues exactly one write, then polls [`read`](Self::read) with the
    /// visibility policy. A read error aborts the wait immediately.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` for an empty zone or declaration field
    /// - `Error::PropagationTimeout` when the record never shows up
    pub async fn create(&self, zone: &str, declared: &DeclaredRecord) -> Result<ObservedRecord> {
        require_zone(zone)?;
        declared.validate()?;

        let update = ZoneUpdate {
            overwrite: self.config.write_policy.overwrite(),
            entries: vec![ZoneEntry::new(
                declared.name.clone(),
                declared.record_type.as_str(),
                declared.ttl,
                [declared.value.clone()],
            )],
        };

        info!(
            "Creating {} record {} -> {} in zone {} (overwrite: {})",
            declared.record_type, declared.name, declared.value, zone, update.overwrite
        );
        self.api.put_zone(zone, &update).await?;

        let id = declared.record_id();
        let policy = self.config.visibility_policy();
        let outcome = {
            let this = self;
            let id = &id;
            self.driver
                .poll(&policy, move || async move {
                    this.read(zone, id).await.map(|outcome| match outcome {
                        ReadOutcome::Found(record) => Attempt::Ready(record),
                        ReadOutcome::Absent => Attempt::NotYet,
                    })
                })
                .await?
        };

        match outcome {
            PollOutcome::Ready { value, attempts } => {
                debug!("Record {} visible after {} read(s)", id, attempts);
                Ok(value)
            }
            PollOutcome::Exhausted { attempts } => {
                warn!("Record {} still not visible in zone {}", id, zone);
                Err(Error::PropagationTimeout {
                    what: format!("record {} in zone {}", id, zone),
                    attempts,
                })
            }
        }
    }

    /// Locate a record in a fresh snapshot
    ///
    /// Names are compared normalized and types case-insensitively. Disabled
    /// contents never match. A miss is `ReadOutcome::Absent`, not an error.
    pub async fn read(&self, zone: &str, id: &RecordId) -> Result<ReadOutcome> {
        require_zone(zone)?;

        let groups = self.api.get_zone(zone).await?;
        debug!("Fetched {} group(s) from zone {}", groups.len(), zone);

        for group in matching_groups(&groups, id) {
            let matched = group
                .records
                .iter()
                .filter(|entry| !entry.is_disabled)
                .find(|entry| content_equals(id.record_type(), &entry.content, id.value()));

            if let Some(entry) = matched {
                return Ok(ReadOutcome::Found(ObservedRecord {
                    id: id.clone(),
                    zone: zone.to_string(),
                    name: group.name.clone(),
                    record_type: group.record_type.clone(),
                    value: entry.content.clone(),
                    ttl: group.ttl,
                }));
            }
        }

        Ok(ReadOutcome::Absent)
    }

    /// Remove one record, preserving its live siblings
    ///
    /// # Errors
    ///
    /// `Error::PartialFailure` when the group was deleted but the kept
    /// contents could not be written back. The zone is then missing those
    /// contents until the caller re-creates them.
    pub async fn retract(&self, zone: &str, id: &RecordId) -> Result<RetractOutcome> {
        require_zone(zone)?;

        let groups = self.api.get_zone(zone).await?;

        let mut kept = Vec::new();
        let mut group_ttl = None;
        let mut filter = GroupFilter {
            name: id.name().to_string(),
            record_type: id.record_type().to_string(),
        };

        for group in matching_groups(&groups, id) {
            if group_ttl.is_none() {
                group_ttl = Some(group.ttl);
                filter = GroupFilter {
                    name: group.name.clone(),
                    record_type: group.record_type.clone(),
                };
            }
            kept.extend(
                group
                    .records
                    .iter()
                    .filter(|entry| !entry.is_disabled)
                    .filter(|entry| !content_equals(id.record_type(), &entry.content, id.value()))
                    .map(|entry| entry.content.clone()),
            );
        }

        info!(
            "Deleting group {}/{} in zone {} to retract {}",
            filter.name, filter.record_type, zone, id
        );
        let filters = std::slice::from_ref(&filter);
        self.api.delete_zone_groups(zone, filters).await?;

        let Some(ttl) = group_ttl.filter(|_| !kept.is_empty()) else {
            return Ok(RetractOutcome::GroupDeleted);
        };

        self.driver.sleep(self.config.propagation_wait()).await;

        let update = ZoneUpdate {
            overwrite: false,
            entries: vec![ZoneEntry::new(
                filter.name.clone(),
                filter.record_type.clone(),
                ttl,
                kept.iter().cloned(),
            )],
        };

        info!(
            "Re-creating {} kept content(s) of {}/{} in zone {}",
            kept.len(),
            filter.name,
            filter.record_type,
            zone
        );
        if let Err(source) = self.api.put_zone(zone, &update).await {
            warn!(
                "Group {}/{} in zone {} was deleted but re-creating {:?} failed: {}",
                filter.name, filter.record_type, zone, kept, source
            );
            return Err(Error::PartialFailure {
                zone: zone.to_string(),
                name: filter.name,
                record_type: filter.record_type,
                kept,
                source: Box::new(source),
            });
        }

        Ok(RetractOutcome::Rewritten { kept })
    }
}

impl std::fmt::Debug for ZoneReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneReconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn require_zone(zone: &str) -> Result<()> {
    if zone.trim().is_empty() {
        return Err(Error::invalid_input("zone is required but was empty"));
    }
    Ok(())
}

fn matching_groups<'a>(
    groups: &'a [ZoneRecordGroup],
    id: &'a RecordId,
) -> impl Iterator<Item = &'a ZoneRecordGroup> + 'a {
    let name = normalize_name(id.name());
    groups.iter().filter(move |group| {
        normalize_name(&group.name) == name
            && group.record_type.eq_ignore_ascii_case(id.record_type())
    })
}
