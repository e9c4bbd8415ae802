//! Declared state read by the runner
//!
//! ```json
//! {
//!   "records": [{"zone": "example.com", "name": "www", "type": "A", "value": "1.2.3.4"}],
//!   "retract": [{"zone": "example.com", "id": "www|A|5.6.7.8"}],
//!   "virtual_machines": [{"spec": {"plan": "...", "data_center_id": 1, "template_id": 1002}}]
//! }
//! ```

use anyhow::{Context, Result};
use converge_core::{DeclaredRecord, RecordId, VirtualMachineSpec};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub records: Vec<ZoneRecordEntry>,

    #[serde(default)]
    pub retract: Vec<RetractEntry>,

    #[serde(default)]
    pub virtual_machines: Vec<VirtualMachineEntry>,
}

/// A record that must exist in a zone
#[derive(Debug, Deserialize)]
pub struct ZoneRecordEntry {
    pub zone: String,

    #[serde(flatten)]
    pub record: DeclaredRecord,
}

/// A previously created record that must go away
#[derive(Debug, Deserialize)]
pub struct RetractEntry {
    pub zone: String,
    pub id: String,
}

impl RetractEntry {
    pub fn record_id(&self) -> Result<RecordId> {
        self.id
            .parse()
            .with_context(|| format!("invalid record id '{}' in zone {}", self.id, self.zone))
    }
}

/// An instance to provision, or to observe when `instance_id` is set
#[derive(Debug, Deserialize)]
pub struct VirtualMachineEntry {
    #[serde(default)]
    pub instance_id: Option<u64>,

    pub spec: VirtualMachineSpec,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("failed to parse manifest {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(raw)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check every entry before any remote call is made
    fn validate(&self) -> Result<()> {
        for entry in &self.records {
            if entry.zone.trim().is_empty() {
                anyhow::bail!("record '{}' has an empty zone", entry.record.name);
            }
            entry.record.validate()?;
        }
        for entry in &self.retract {
            entry.record_id()?;
        }
        for entry in &self.virtual_machines {
            entry.spec.validate()?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.retract.is_empty() && self.virtual_machines.is_empty()
    }
}
