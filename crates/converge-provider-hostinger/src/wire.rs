//! Request and response bodies of the Hostinger API
//!
//! Only the fields the gateway reads are modelled; unknown fields are
//! ignored. Nullable strings come back as `null` on some endpoints, so every
//! optional field is an `Option` here and flattened on conversion.

use converge_core::traits::{
    CatalogEntry, GroupFilter, IpAddress, OrderReceipt, PurchaseResponse, VirtualMachineInstance,
    ZoneEntry,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct PutZoneBody<'a> {
    pub overwrite: bool,
    pub zone: &'a [ZoneEntry],
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteZoneBody<'a> {
    pub filters: &'a [GroupFilter],
}

#[derive(Debug, Serialize)]
pub(crate) struct HostnameBody<'a> {
    pub hostname: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttachKeysBody<'a> {
    pub ids: &'a [u64],
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderItem<'a> {
    pub item_id: &'a str,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderBody<'a> {
    pub payment_method_id: u64,
    pub items: Vec<OrderItem<'a>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAddress {
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireInstance {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub ipv4: Option<Vec<WireAddress>>,
    #[serde(default)]
    pub ipv6: Option<Vec<WireAddress>>,
}

fn addresses(list: Option<Vec<WireAddress>>) -> Vec<IpAddress> {
    list.unwrap_or_default()
        .into_iter()
        .filter_map(|ip| ip.address)
        .filter(|address| !address.is_empty())
        .map(|address| IpAddress { address })
        .collect()
}

impl From<WireInstance> for VirtualMachineInstance {
    fn from(wire: WireInstance) -> Self {
        Self {
            id: wire.id,
            subscription_id: wire.subscription_id.unwrap_or_default(),
            hostname: wire.hostname.unwrap_or_default(),
            state: wire.state.unwrap_or_default(),
            ipv4: addresses(wire.ipv4),
            ipv6: addresses(wire.ipv6),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireOrder {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<WireOrder> for OrderReceipt {
    fn from(wire: WireOrder) -> Self {
        Self {
            id: wire.id.unwrap_or_default(),
            subscription_id: wire.subscription_id.unwrap_or_default(),
            status: wire.status.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePurchase {
    #[serde(default)]
    pub order: WireOrder,
    #[serde(default)]
    pub virtual_machine: Option<WireInstance>,
}

impl From<WirePurchase> for PurchaseResponse {
    fn from(wire: WirePurchase) -> Self {
        Self {
            order: wire.order.into(),
            // An instance without an id has not been materialized yet
            virtual_machine: wire
                .virtual_machine
                .filter(|vm| vm.id != 0)
                .map(VirtualMachineInstance::from),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePrice {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCatalogItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prices: Vec<WirePrice>,
}

/// Flatten catalog items into one entry per price id
pub(crate) fn plan_entries(items: Vec<WireCatalogItem>) -> Vec<CatalogEntry> {
    items
        .into_iter()
        .flat_map(|item| {
            let item_name = item.name.unwrap_or_default();
            item.prices.into_iter().map(move |price| {
                let name = price.name.unwrap_or_else(|| item_name.clone());
                CatalogEntry::new(price.id, name)
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireNamed {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<WireNamed> for CatalogEntry {
    fn from(wire: WireNamed) -> Self {
        CatalogEntry::new(wire.id, wire.name.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireKeyId {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireKeyPage {
    #[serde(default)]
    pub data: Vec<WireKeyId>,
}
