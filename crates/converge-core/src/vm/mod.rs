//! Virtual machine provisioning
//!
//! The VmOrchestrator drives one linear pipeline per create and stops at the
//! first failure:
//!
//! ```text
//! validate ──▶ catalogs ──▶ payment ──▶ order ──▶ poll by ──▶ setup ──▶ attach ──▶ observe
//!  (local)    (plan, tpl,    method              subscription        missing
//!              data center)                                          credentials
//! ```
//!
//! ## Event Flow
//!
//! 1. Reject declarations that can be judged locally
//! 2. Check plan, template and data center against fresh catalogs
//! 3. Resolve the payment method (declared, otherwise the account default)
//! 4. Order, then find the instance strictly by the returned subscription id
//! 5. Install the template if the order did not
//! 6. Attach only the credentials that are not attached yet
//! 7. Re-fetch the instance and report what is live
//!
//! Nothing before step 4 mutates the account.

mod spec;

pub use spec::VirtualMachineSpec;

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ProvisioningConfig, ProvisioningFlow};
use crate::error::{Error, Result};
use crate::retry::{Attempt, PollOutcome, RetryDriver};
use crate::traits::{
    CatalogApi, CatalogKind, PurchaseRequest, RecreateRequest, SetupRequest, VirtualMachineApi,
    VirtualMachineInstance,
};

/// Live state of a provisioned instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedInstance {
    /// Instance id
    pub id: u64,
    /// Subscription billing the instance
    pub subscription_id: String,
    /// Current hostname
    pub hostname: String,
    /// Lifecycle state as reported by the API
    pub state: String,
    /// First IPv4 address, empty if none
    pub ipv4: String,
    /// First IPv6 address, empty if none
    pub ipv6: String,
}

impl From<&VirtualMachineInstance> for ProvisionedInstance {
    fn from(instance: &VirtualMachineInstance) -> Self {
        Self {
            id: instance.id,
            subscription_id: instance.subscription_id.clone(),
            hostname: instance.hostname.clone(),
            state: instance.state.clone(),
            ipv4: instance.primary_ipv4().to_string(),
            ipv6: instance.primary_ipv6().to_string(),
        }
    }
}

/// Result of a delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The instance's subscription was cancelled
    Cancelled {
        /// Subscription that was cancelled
        subscription_id: String,
    },
    /// The instance no longer existed
    AlreadyAbsent,
}

/// Converges declared virtual machines against the VPS API
pub struct VmOrchestrator {
    vm: Arc<dyn VirtualMachineApi>,
    catalog: Arc<dyn CatalogApi>,
    config: ProvisioningConfig,
    driver: RetryDriver,
}

impl VmOrchestrator {
    /// Create an orchestrator that sleeps on the tokio timer
    pub fn new(
        vm: Arc<dyn VirtualMachineApi>,
        catalog: Arc<dyn CatalogApi>,
        config: ProvisioningConfig,
    ) -> Self {
        Self::with_driver(vm, catalog, config, RetryDriver::tokio())
    }

    /// Create an orchestrator with an explicit polling driver
    pub fn with_driver(
        vm: Arc<dyn VirtualMachineApi>,
        catalog: Arc<dyn CatalogApi>,
        config: ProvisioningConfig,
        driver: RetryDriver,
    ) -> Self {
        Self {
            vm,
            catalog,
            config,
            driver,
        }
    }

    /// Effective configuration
    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    /// Create an instance from a declaration
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` / `Error::InvalidReference` before any order
    /// - `Error::NoDefaultPaymentMethod` when none is declared or default
    /// - `Error::ProvisioningTimeout` when the instance never appears; no
    ///   setup call is made in that case
    pub async fn provision(&self, spec: &VirtualMachineSpec) -> Result<ProvisionedInstance> {
        spec.validate()?;
        self.validate_references(spec).await?;
        let payment_method_id = self.resolve_payment_method(spec).await?;

        let id = match self.config.flow {
            ProvisioningFlow::Purchase => self.purchase(spec, payment_method_id).await?,
            ProvisioningFlow::Legacy => {
                info!("Ordering plan {} (legacy flow)", spec.plan);
                let subscription_id = self.vm.order_instance(&spec.plan, payment_method_id).await?;
                let id = self.await_instance(&subscription_id).await?;
                self.setup(id, spec).await?;
                id
            }
        };

        self.attach_missing_credentials(id, &spec.credential_ids).await?;
        self.observe(id).await
    }

    /// Observe an instance; `None` once it is gone
    pub async fn read(&self, id: u64) -> Result<Option<ProvisionedInstance>> {
        match self.vm.get_instance(id).await {
            Ok(instance) => Ok(Some(ProvisionedInstance::from(&instance))),
            Err(e) if e.is_not_found() => {
                debug!("Instance {} not found", id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Apply the difference between two declarations of one instance
    ///
    /// Only changed sub-steps run: hostname, template reinstall and the
    /// credential diff. The instance is always re-observed afterwards.
    ///
    /// # Errors
    ///
    /// `Error::RequiresReplacement` when plan, data center or password
    /// changed. Nothing is mutated in that case.
    pub async fn update(
        &self,
        id: u64,
        previous: &VirtualMachineSpec,
        desired: &VirtualMachineSpec,
    ) -> Result<ProvisionedInstance> {
        desired.validate()?;

        if previous.plan != desired.plan {
            return Err(Error::RequiresReplacement {
                field: "plan".to_string(),
            });
        }
        if previous.data_center_id != desired.data_center_id {
            return Err(Error::RequiresReplacement {
                field: "data_center_id".to_string(),
            });
        }
        if previous.password != desired.password {
            return Err(Error::RequiresReplacement {
                field: "password".to_string(),
            });
        }

        if previous.hostname != desired.hostname
            && let Some(hostname) = &desired.hostname
        {
            info!("Updating hostname of instance {} to {}", id, hostname);
            self.vm.update_hostname(id, hostname).await?;
        }

        if previous.template_id != desired.template_id {
            let template_id = desired.template_id.to_string();
            self.require_in_catalog(CatalogKind::Templates, &template_id).await?;
            info!("Recreating instance {} with template {}", id, desired.template_id);
            let request = RecreateRequest {
                template_id: desired.template_id,
                password: desired.password.clone(),
                post_install_script_id: desired.post_install_script_id,
            };
            self.vm.recreate_instance(id, &request).await?;
        }

        let previous_ids: HashSet<u64> = previous.credential_ids.iter().copied().collect();
        let desired_ids: HashSet<u64> = desired.credential_ids.iter().copied().collect();
        if previous_ids != desired_ids {
            self.attach_missing_credentials(id, &desired.credential_ids).await?;
        }

        self.observe(id).await
    }

    /// Cancel the subscription billing an instance
    ///
    /// The subscription id is always resolved from the live instance.
    pub async fn delete(&self, id: u64) -> Result<DeleteOutcome> {
        let instance = match self.vm.get_instance(id).await {
            Ok(instance) => instance,
            Err(e) if e.is_not_found() => {
                info!("Instance {} already gone, nothing to cancel", id);
                return Ok(DeleteOutcome::AlreadyAbsent);
            }
            Err(e) => return Err(e),
        };

        if instance.subscription_id.is_empty() {
            return Err(Error::Other(format!(
                "subscription_id is empty for instance {}",
                id
            )));
        }

        info!(
            "Cancelling subscription {} of instance {}",
            instance.subscription_id, id
        );
        self.vm.cancel_subscription(&instance.subscription_id).await?;

        Ok(DeleteOutcome::Cancelled {
            subscription_id: instance.subscription_id,
        })
    }

    /// Attach the desired credentials that are not attached yet
    ///
    /// Returns the ids that were attached. A second call with the same
    /// desired set attaches nothing.
    pub async fn attach_missing_credentials(&self, id: u64, desired: &[u64]) -> Result<Vec<u64>> {
        if desired.is_empty() {
            return Ok(Vec::new());
        }

        let current: HashSet<u64> = self
            .vm
            .attached_credential_ids(id)
            .await?
            .into_iter()
            .collect();

        let mut seen = HashSet::new();
        let missing: Vec<u64> = desired
            .iter()
            .copied()
            .filter(|cred| !current.contains(cred) && seen.insert(*cred))
            .collect();

        if missing.is_empty() {
            debug!("Instance {} already has every declared credential", id);
            return Ok(missing);
        }

        info!("Attaching credentials {:?} to instance {}", missing, id);
        self.vm.attach_credentials(id, &missing).await?;
        Ok(missing)
    }

    async fn validate_references(&self, spec: &VirtualMachineSpec) -> Result<()> {
        self.require_in_catalog(CatalogKind::Plans, &spec.plan).await?;
        let template_id = spec.template_id.to_string();
        self.require_in_catalog(CatalogKind::Templates, &template_id).await?;
        let data_center_id = spec.data_center_id.to_string();
        self.require_in_catalog(CatalogKind::DataCenters, &data_center_id).await?;
        Ok(())
    }

    async fn require_in_catalog(&self, kind: CatalogKind, value: &str) -> Result<()> {
        let entries = self.catalog.list_catalog(kind).await?;
        debug!("Fetched {} entries from the {} catalog", entries.len(), kind);

        if entries.iter().any(|entry| entry.id == value) {
            Ok(())
        } else {
            Err(Error::invalid_reference(kind.field(), value))
        }
    }

    async fn resolve_payment_method(&self, spec: &VirtualMachineSpec) -> Result<u64> {
        if let Some(id) = spec.payment_method_id {
            return Ok(id);
        }

        self.catalog
            .list_payment_methods()
            .await?
            .into_iter()
            .find(|method| method.is_default)
            .map(|method| method.id)
            .ok_or(Error::NoDefaultPaymentMethod)
    }

    async fn purchase(&self, spec: &VirtualMachineSpec, payment_method_id: u64) -> Result<u64> {
        let request = PurchaseRequest {
            item_id: spec.plan.clone(),
            payment_method_id: Some(payment_method_id),
            setup: setup_request(spec),
        };

        info!("Purchasing plan {}", spec.plan);
        let response = self.vm.purchase_instance(&request).await?;

        match response.virtual_machine {
            Some(instance) => {
                debug!(
                    "Purchase returned instance {} (subscription {})",
                    instance.id, response.order.subscription_id
                );
                Ok(instance.id)
            }
            None => {
                let id = self.await_instance(&response.order.subscription_id).await?;
                self.setup(id, spec).await?;
                Ok(id)
            }
        }
    }

    async fn await_instance(&self, subscription_id: &str) -> Result<u64> {
        if subscription_id.is_empty() {
            return Err(Error::Other(
                "order succeeded but returned an empty subscription id".to_string(),
            ));
        }

        let policy = self.config.poll_policy();
        let vm = &self.vm;
        let outcome = self
            .driver
            .poll(&policy, move || async move {
                vm.list_instances().await.map(|instances| {
                    match instances
                        .iter()
                        .find(|instance| instance.subscription_id == subscription_id)
                    {
                        Some(instance) => Attempt::Ready(instance.id),
                        None => Attempt::NotYet,
                    }
                })
            })
            .await?;

        match outcome {
            PollOutcome::Ready { value, attempts } => {
                info!(
                    "Instance {} appeared for subscription {} after {} lookup(s)",
                    value, subscription_id, attempts
                );
                Ok(value)
            }
            PollOutcome::Exhausted { attempts } => {
                warn!("No instance appeared for subscription {}", subscription_id);
                Err(Error::ProvisioningTimeout {
                    subscription_id: subscription_id.to_string(),
                    attempts,
                })
            }
        }
    }

    async fn setup(&self, id: u64, spec: &VirtualMachineSpec) -> Result<()> {
        info!(
            "Setting up instance {} with template {} in data center {}",
            id, spec.template_id, spec.data_center_id
        );
        self.vm.setup_instance(id, &setup_request(spec)).await
    }

    async fn observe(&self, id: u64) -> Result<ProvisionedInstance> {
        let instance = self.vm.get_instance(id).await?;
        Ok(ProvisionedInstance::from(&instance))
    }
}

impl std::fmt::Debug for VmOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VmOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn setup_request(spec: &VirtualMachineSpec) -> SetupRequest {
    SetupRequest {
        data_center_id: spec.data_center_id,
        template_id: spec.template_id,
        password: spec.password.clone(),
        hostname: spec.hostname.clone(),
        post_install_script_id: spec.post_install_script_id,
    }
}
