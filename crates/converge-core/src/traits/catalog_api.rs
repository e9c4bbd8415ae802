// # Catalog API Trait
//
// Read-only listings the orchestrator validates declared references
// against. Catalogs are fetched again for every validation and never cached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which catalog to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    /// Billing plans, identified by price id
    Plans,
    /// OS templates
    Templates,
    /// Data centers
    DataCenters,
}

impl CatalogKind {
    /// Declared field a reference into this catalog comes from
    pub fn field(self) -> &'static str {
        match self {
            Self::Plans => "plan",
            Self::Templates => "template ID",
            Self::DataCenters => "data center ID",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plans => f.write_str("plans"),
            Self::Templates => f.write_str("templates"),
            Self::DataCenters => f.write_str("data centers"),
        }
    }
}

/// One catalog entry
///
/// Numeric ids are rendered in decimal so all catalogs compare the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Entry id
    pub id: String,
    /// Display name, empty when the API has none
    #[serde(default)]
    pub name: String,
}

impl CatalogEntry {
    /// Create an entry
    pub fn new(id: impl ToString, name: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            name: name.into(),
        }
    }
}

/// A payment method on the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Payment method id
    pub id: u64,
    /// Whether the account charges this method by default
    #[serde(default)]
    pub is_default: bool,
}

/// Trait for catalog API implementations
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// List one catalog
    async fn list_catalog(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>, crate::Error>;

    /// List the account's payment methods
    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, crate::Error>;
}
