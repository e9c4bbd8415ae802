//! Remote API gateway traits
//!
//! This module defines the abstract interfaces the reconcilers call out to.
//!
//! - [`ZoneApi`]: Whole-zone snapshots and group-level writes
//! - [`VirtualMachineApi`]: Instances, subscriptions and attached credentials
//! - [`CatalogApi`]: Plans, templates, data centers and payment methods

pub mod catalog_api;
pub mod vm_api;
pub mod zone_api;

pub use catalog_api::{CatalogApi, CatalogEntry, CatalogKind, PaymentMethod};
pub use vm_api::{
    IpAddress, OrderReceipt, PurchaseRequest, PurchaseResponse, RecreateRequest, SetupRequest,
    VirtualMachineApi, VirtualMachineInstance,
};
pub use zone_api::{
    GroupFilter, ObservedContent, ZoneApi, ZoneEntry, ZoneEntryContent, ZoneRecordGroup,
    ZoneUpdate,
};
