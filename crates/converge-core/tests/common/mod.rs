//! Test doubles and common utilities for reconciliation contract tests
//!
//! The fakes keep just enough state to behave like the remote API and count
//! every call, so tests can assert on exactly which requests were issued.

#![allow(dead_code)]

use async_trait::async_trait;
use converge_core::error::{Error, Result};
use converge_core::normalize::normalize_name;
use converge_core::traits::{
    CatalogApi, CatalogEntry, CatalogKind, GroupFilter, IpAddress, ObservedContent, PaymentMethod,
    PurchaseRequest, PurchaseResponse, OrderReceipt, RecreateRequest, SetupRequest,
    VirtualMachineApi, VirtualMachineInstance, ZoneApi, ZoneRecordGroup, ZoneUpdate,
};
use converge_core::{Clock, RetryDriver};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Clock that records sleeps instead of waiting
#[derive(Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    /// Every sleep requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// A driver over a fresh recording clock
pub fn recording_driver() -> (RetryDriver, Arc<RecordingClock>) {
    let clock = Arc::new(RecordingClock::default());
    (RetryDriver::new(clock.clone()), clock)
}

/// Build an observed group with live contents
pub fn group(name: &str, record_type: &str, ttl: u32, contents: &[&str]) -> ZoneRecordGroup {
    ZoneRecordGroup {
        name: name.to_string(),
        record_type: record_type.to_string(),
        ttl,
        records: contents
            .iter()
            .map(|content| ObservedContent {
                content: content.to_string(),
                is_disabled: false,
            })
            .collect(),
    }
}

fn same_group(group: &ZoneRecordGroup, name: &str, record_type: &str) -> bool {
    normalize_name(&group.name) == normalize_name(name)
        && group.record_type.eq_ignore_ascii_case(record_type)
}

/// In-memory zone with the API's group semantics
///
/// `put_zone` either adds to a group or replaces it, `delete_zone_groups`
/// drops whole groups. Reads can be made stale to simulate propagation lag.
#[derive(Default)]
pub struct InMemoryZoneApi {
    groups: Mutex<Vec<ZoneRecordGroup>>,
    before_last_put: Mutex<Vec<ZoneRecordGroup>>,
    stale_reads: AtomicUsize,
    fail_puts_after: Mutex<Option<usize>>,
    get_count: AtomicUsize,
    puts: Mutex<Vec<ZoneUpdate>>,
    deletes: Mutex<Vec<Vec<GroupFilter>>>,
}

impl InMemoryZoneApi {
    /// Create a zone holding `groups`
    pub fn with_groups(groups: Vec<ZoneRecordGroup>) -> Self {
        let zone = Self::default();
        *zone.groups.lock().unwrap() = groups;
        zone
    }

    /// The next `reads` snapshots show the zone as it was before the last put
    pub fn set_stale_reads(&self, reads: usize) {
        self.stale_reads.store(reads, Ordering::SeqCst);
    }

    /// Let `successful` more puts through, then fail every put
    pub fn fail_puts_after(&self, successful: usize) {
        *self.fail_puts_after.lock().unwrap() = Some(successful);
    }

    /// Current zone content
    pub fn snapshot(&self) -> Vec<ZoneRecordGroup> {
        self.groups.lock().unwrap().clone()
    }

    /// Live contents of one group, empty if the group is absent
    pub fn contents(&self, name: &str, record_type: &str) -> Vec<String> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .filter(|group| same_group(group, name, record_type))
            .flat_map(|group| group.records.iter())
            .filter(|entry| !entry.is_disabled)
            .map(|entry| entry.content.clone())
            .collect()
    }

    /// Number of get_zone calls
    pub fn get_count(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }

    /// Every put_zone payload, in call order
    pub fn puts(&self) -> Vec<ZoneUpdate> {
        self.puts.lock().unwrap().clone()
    }

    /// Every delete_zone_groups filter list, in call order
    pub fn deletes(&self) -> Vec<Vec<GroupFilter>> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ZoneApi for InMemoryZoneApi {
    async fn get_zone(&self, _zone: &str) -> Result<Vec<ZoneRecordGroup>> {
        self.get_count.fetch_add(1, Ordering::SeqCst);

        let stale = self
            .stale_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(self.before_last_put.lock().unwrap().clone());
        }
        Ok(self.snapshot())
    }

    async fn put_zone(&self, _zone: &str, update: &ZoneUpdate) -> Result<()> {
        self.puts.lock().unwrap().push(update.clone());

        {
            let mut remaining = self.fail_puts_after.lock().unwrap();
            if let Some(n) = remaining.as_mut() {
                if *n == 0 {
                    return Err(Error::api("update zone", 500, "internal error"));
                }
                *n -= 1;
            }
        }

        let mut groups = self.groups.lock().unwrap();
        *self.before_last_put.lock().unwrap() = groups.clone();

        for entry in &update.entries {
            let contents: Vec<ObservedContent> = entry
                .records
                .iter()
                .map(|record| ObservedContent {
                    content: record.content.clone(),
                    is_disabled: false,
                })
                .collect();

            match groups
                .iter_mut()
                .find(|group| same_group(group, &entry.name, &entry.record_type))
            {
                Some(group) if update.overwrite => {
                    group.ttl = entry.ttl;
                    group.records = contents;
                }
                Some(group) => {
                    for content in contents {
                        if !group.records.iter().any(|r| r.content == content.content) {
                            group.records.push(content);
                        }
                    }
                }
                None => groups.push(ZoneRecordGroup {
                    name: entry.name.clone(),
                    record_type: entry.record_type.clone(),
                    ttl: entry.ttl,
                    records: contents,
                }),
            }
        }
        Ok(())
    }

    async fn delete_zone_groups(&self, _zone: &str, filters: &[GroupFilter]) -> Result<()> {
        self.deletes.lock().unwrap().push(filters.to_vec());

        let mut groups = self.groups.lock().unwrap();
        groups.retain(|group| {
            !filters
                .iter()
                .any(|filter| same_group(group, &filter.name, &filter.record_type))
        });
        Ok(())
    }
}

/// How the fake VPS API materializes ordered instances
#[derive(Debug, Clone, Copy)]
pub enum Materialize {
    /// The purchase response already carries the instance
    InPurchaseResponse,
    /// The instance shows up in the listing on the given lookup (1-based)
    OnLookup(usize),
    /// The instance never shows up
    Never,
}

struct PendingOrder {
    subscription_id: String,
    instance_id: u64,
}

/// Fake VPS API with call recording
pub struct FakeVmApi {
    materialize: Materialize,
    instances: Mutex<Vec<VirtualMachineInstance>>,
    pending: Mutex<Option<PendingOrder>>,
    attached: Mutex<HashMap<u64, Vec<u64>>>,
    next_id: AtomicUsize,
    list_count: AtomicUsize,
    calls: Mutex<Vec<String>>,
    setups: Mutex<Vec<(u64, SetupRequest)>>,
    recreates: Mutex<Vec<(u64, RecreateRequest)>>,
    attach_calls: Mutex<Vec<(u64, Vec<u64>)>>,
    cancelled: Mutex<Vec<String>>,
}

impl FakeVmApi {
    /// Create an empty account
    pub fn new(materialize: Materialize) -> Self {
        Self {
            materialize,
            instances: Mutex::new(Vec::new()),
            pending: Mutex::new(None),
            attached: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1000),
            list_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            setups: Mutex::new(Vec::new()),
            recreates: Mutex::new(Vec::new()),
            attach_calls: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    /// Seed an existing instance
    pub fn with_instance(self, instance: VirtualMachineInstance) -> Self {
        self.instances.lock().unwrap().push(instance);
        self
    }

    /// Seed credentials already attached to an instance
    pub fn with_attached(self, id: u64, credential_ids: &[u64]) -> Self {
        self.attached
            .lock()
            .unwrap()
            .insert(id, credential_ids.to_vec());
        self
    }

    /// How many times `method` was called
    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.as_str() == method)
            .count()
    }

    /// Every call, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Setup requests received
    pub fn setups(&self) -> Vec<(u64, SetupRequest)> {
        self.setups.lock().unwrap().clone()
    }

    /// Recreate requests received
    pub fn recreates(&self) -> Vec<(u64, RecreateRequest)> {
        self.recreates.lock().unwrap().clone()
    }

    /// Attach calls received
    pub fn attach_calls(&self) -> Vec<(u64, Vec<u64>)> {
        self.attach_calls.lock().unwrap().clone()
    }

    /// Credentials currently attached to an instance
    pub fn attached(&self, id: u64) -> Vec<u64> {
        self.attached
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Subscriptions cancelled
    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    fn record(&self, method: &str) {
        self.calls.lock().unwrap().push(method.to_string());
    }

    fn place_order(&self) -> (String, u64) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
        let subscription_id = format!("sub-{}", id);
        *self.pending.lock().unwrap() = Some(PendingOrder {
            subscription_id: subscription_id.clone(),
            instance_id: id,
        });
        (subscription_id, id)
    }

    fn materialize_pending(&self) -> Option<VirtualMachineInstance> {
        let order = self.pending.lock().unwrap().take()?;
        let instance = VirtualMachineInstance {
            id: order.instance_id,
            subscription_id: order.subscription_id,
            hostname: String::new(),
            state: "initial".to_string(),
            ipv4: Vec::new(),
            ipv6: Vec::new(),
        };
        self.instances.lock().unwrap().push(instance.clone());
        Some(instance)
    }
}

/// An instance that is already running
pub fn running_instance(id: u64, subscription_id: &str, hostname: &str) -> VirtualMachineInstance {
    VirtualMachineInstance {
        id,
        subscription_id: subscription_id.to_string(),
        hostname: hostname.to_string(),
        state: "running".to_string(),
        ipv4: vec![IpAddress {
            address: "203.0.113.10".to_string(),
        }],
        ipv6: vec![IpAddress {
            address: "2001:db8::10".to_string(),
        }],
    }
}

#[async_trait]
impl VirtualMachineApi for FakeVmApi {
    async fn get_instance(&self, id: u64) -> Result<VirtualMachineInstance> {
        self.record("get_instance");
        self.instances
            .lock()
            .unwrap()
            .iter()
            .find(|instance| instance.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("virtual machine {}", id)))
    }

    async fn list_instances(&self) -> Result<Vec<VirtualMachineInstance>> {
        self.record("list_instances");
        let lookup = self.list_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Materialize::OnLookup(n) = self.materialize
            && lookup >= n
        {
            self.materialize_pending();
        }
        Ok(self.instances.lock().unwrap().clone())
    }

    async fn purchase_instance(&self, request: &PurchaseRequest) -> Result<PurchaseResponse> {
        self.record("purchase_instance");
        let (subscription_id, id) = self.place_order();

        let virtual_machine = match self.materialize {
            Materialize::InPurchaseResponse => {
                let mut instance = self.materialize_pending();
                if let Some(instance) = instance.as_mut() {
                    instance.state = "running".to_string();
                    instance.hostname = request.setup.hostname.clone().unwrap_or_default();
                    let mut instances = self.instances.lock().unwrap();
                    if let Some(stored) = instances.iter_mut().find(|i| i.id == id) {
                        *stored = instance.clone();
                    }
                }
                instance
            }
            _ => None,
        };

        Ok(PurchaseResponse {
            order: OrderReceipt {
                id: id + 1,
                subscription_id,
                status: "completed".to_string(),
            },
            virtual_machine,
        })
    }

    async fn order_instance(&self, _plan: &str, _payment_method_id: u64) -> Result<String> {
        self.record("order_instance");
        let (subscription_id, _) = self.place_order();
        Ok(subscription_id)
    }

    async fn setup_instance(&self, id: u64, request: &SetupRequest) -> Result<()> {
        self.record("setup_instance");
        self.setups.lock().unwrap().push((id, request.clone()));

        let mut instances = self.instances.lock().unwrap();
        let instance = instances
            .iter_mut()
            .find(|instance| instance.id == id)
            .ok_or_else(|| Error::not_found(format!("virtual machine {}", id)))?;
        instance.state = "running".to_string();
        instance.hostname = request.hostname.clone().unwrap_or_default();
        instance.ipv4 = vec![IpAddress {
            address: "203.0.113.10".to_string(),
        }];
        Ok(())
    }

    async fn update_hostname(&self, id: u64, hostname: &str) -> Result<()> {
        self.record("update_hostname");
        let mut instances = self.instances.lock().unwrap();
        if let Some(instance) = instances.iter_mut().find(|instance| instance.id == id) {
            instance.hostname = hostname.to_string();
        }
        Ok(())
    }

    async fn recreate_instance(&self, id: u64, request: &RecreateRequest) -> Result<()> {
        self.record("recreate_instance");
        self.recreates.lock().unwrap().push((id, request.clone()));
        Ok(())
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        self.record("cancel_subscription");
        self.cancelled
            .lock()
            .unwrap()
            .push(subscription_id.to_string());
        self.instances
            .lock()
            .unwrap()
            .retain(|instance| instance.subscription_id != subscription_id);
        Ok(())
    }

    async fn attached_credential_ids(&self, id: u64) -> Result<Vec<u64>> {
        self.record("attached_credential_ids");
        Ok(self
            .attached
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn attach_credentials(&self, id: u64, credential_ids: &[u64]) -> Result<()> {
        self.record("attach_credentials");
        self.attach_calls
            .lock()
            .unwrap()
            .push((id, credential_ids.to_vec()));
        self.attached
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .extend_from_slice(credential_ids);
        Ok(())
    }
}

/// Fake catalogs with per-kind call counters
pub struct FakeCatalog {
    plans: Vec<CatalogEntry>,
    templates: Vec<CatalogEntry>,
    data_centers: Vec<CatalogEntry>,
    payment_methods: Vec<PaymentMethod>,
    lookups: Mutex<Vec<CatalogKind>>,
    payment_lookups: AtomicUsize,
}

impl FakeCatalog {
    /// Catalogs holding exactly the given ids
    pub fn new(plans: &[&str], templates: &[u64], data_centers: &[u64]) -> Self {
        Self {
            plans: plans.iter().map(|id| CatalogEntry::new(id, "")).collect(),
            templates: templates
                .iter()
                .map(|id| CatalogEntry::new(id, format!("template {}", id)))
                .collect(),
            data_centers: data_centers
                .iter()
                .map(|id| CatalogEntry::new(id, format!("dc {}", id)))
                .collect(),
            payment_methods: vec![
                PaymentMethod {
                    id: 1,
                    is_default: false,
                },
                PaymentMethod {
                    id: 7,
                    is_default: true,
                },
            ],
            lookups: Mutex::new(Vec::new()),
            payment_lookups: AtomicUsize::new(0),
        }
    }

    /// Replace the account's payment methods
    pub fn with_payment_methods(mut self, methods: Vec<PaymentMethod>) -> Self {
        self.payment_methods = methods;
        self
    }

    /// Catalogs listed so far, in order
    pub fn lookups(&self) -> Vec<CatalogKind> {
        self.lookups.lock().unwrap().clone()
    }

    /// Number of payment method listings
    pub fn payment_lookups(&self) -> usize {
        self.payment_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn list_catalog(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>> {
        self.lookups.lock().unwrap().push(kind);
        Ok(match kind {
            CatalogKind::Plans => self.plans.clone(),
            CatalogKind::Templates => self.templates.clone(),
            CatalogKind::DataCenters => self.data_centers.clone(),
        })
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        self.payment_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.payment_methods.clone())
    }
}
