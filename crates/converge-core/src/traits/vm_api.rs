// # Virtual Machine API Trait
//
// Defines the interface for ordering and managing VPS instances.
//
// ## Ordering flows
//
// An instance is not returned by the order itself in every flow. What comes
// back reliably is a subscription id, and the instance shows up under that
// subscription some time later:
//
// - `purchase_instance`: orders and installs in one call; the response may
//   or may not already carry the instance
// - `order_instance`: places a billing order only; the instance then has to
//   be found with `list_instances` and activated with `setup_instance`
//
// ## Usage
//
// ```rust,ignore
// use converge_core::VirtualMachineApi;
//
// let instance = vm_api.get_instance(1234).await?;
// vm_api.cancel_subscription(&instance.subscription_id).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One address of an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddress {
    /// Textual address
    pub address: String,
}

/// Observed state of one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineInstance {
    /// Instance id
    pub id: u64,
    /// Subscription that bills the instance (empty while unknown)
    #[serde(default)]
    pub subscription_id: String,
    /// Current hostname
    #[serde(default)]
    pub hostname: String,
    /// Lifecycle state as reported by the API
    #[serde(default)]
    pub state: String,
    /// IPv4 addresses in API order
    #[serde(default)]
    pub ipv4: Vec<IpAddress>,
    /// IPv6 addresses in API order
    #[serde(default)]
    pub ipv6: Vec<IpAddress>,
}

impl VirtualMachineInstance {
    /// First IPv4 address, or an empty string
    pub fn primary_ipv4(&self) -> &str {
        self.ipv4.first().map(|ip| ip.address.as_str()).unwrap_or("")
    }

    /// First IPv6 address, or an empty string
    pub fn primary_ipv6(&self) -> &str {
        self.ipv6.first().map(|ip| ip.address.as_str()).unwrap_or("")
    }
}

/// Install parameters for a new or freshly ordered instance
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupRequest {
    /// Data center to place the instance in
    pub data_center_id: u64,
    /// OS template to install
    pub template_id: u64,
    /// Root password
    /// ⚠️ NEVER log this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Hostname to assign
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Script run once after install
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_install_script_id: Option<u64>,
}

impl std::fmt::Debug for SetupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupRequest")
            .field("data_center_id", &self.data_center_id)
            .field("template_id", &self.template_id)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("hostname", &self.hostname)
            .field("post_install_script_id", &self.post_install_script_id)
            .finish()
    }
}

/// Combined order-and-install request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Catalog price id of the plan
    pub item_id: String,
    /// Payment method to charge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<u64>,
    /// Install parameters
    pub setup: SetupRequest,
}

/// Billing side of an accepted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Order id
    #[serde(default)]
    pub id: u64,
    /// Subscription created by the order
    pub subscription_id: String,
    /// Order status
    #[serde(default)]
    pub status: String,
}

/// Response of a combined purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResponse {
    /// Billing receipt
    pub order: OrderReceipt,
    /// The instance, when the API already materialized it
    #[serde(default)]
    pub virtual_machine: Option<VirtualMachineInstance>,
}

/// Reinstall request for an existing instance
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecreateRequest {
    /// OS template to install
    pub template_id: u64,
    /// Root password override
    /// ⚠️ NEVER log this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Script run once after the reinstall
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_install_script_id: Option<u64>,
}

impl std::fmt::Debug for RecreateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecreateRequest")
            .field("template_id", &self.template_id)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("post_install_script_id", &self.post_install_script_id)
            .finish()
    }
}

/// Trait for virtual machine API implementations
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Map statuses onto `Error` variants
///
/// ## Forbidden Capabilities
/// - ❌ Poll for an instance to appear (owned by `VmOrchestrator`)
/// - ❌ Retry or sleep
/// - ❌ Validate declared references (owned by `VmOrchestrator`)
/// - ❌ Cache instances or catalogs between calls
///
/// # Errors
///
/// `get_instance` returns `Error::NotFound` on 404. Every other method
/// treats a status outside its success set as `Error::Api`.
#[async_trait]
pub trait VirtualMachineApi: Send + Sync {
    /// Fetch one instance
    async fn get_instance(&self, id: u64) -> Result<VirtualMachineInstance, crate::Error>;

    /// List every instance on the account
    async fn list_instances(&self) -> Result<Vec<VirtualMachineInstance>, crate::Error>;

    /// Order and install in one call
    async fn purchase_instance(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchaseResponse, crate::Error>;

    /// Place a billing order and return the new subscription id
    async fn order_instance(
        &self,
        plan: &str,
        payment_method_id: u64,
    ) -> Result<String, crate::Error>;

    /// Activate an ordered instance
    async fn setup_instance(&self, id: u64, request: &SetupRequest) -> Result<(), crate::Error>;

    /// Change the hostname of an instance
    async fn update_hostname(&self, id: u64, hostname: &str) -> Result<(), crate::Error>;

    /// Reinstall an instance with another template
    async fn recreate_instance(
        &self,
        id: u64,
        request: &RecreateRequest,
    ) -> Result<(), crate::Error>;

    /// Cancel the subscription billing an instance
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), crate::Error>;

    /// Ids of the credentials currently attached to an instance
    async fn attached_credential_ids(&self, id: u64) -> Result<Vec<u64>, crate::Error>;

    /// Attach credentials to an instance
    async fn attach_credentials(&self, id: u64, credential_ids: &[u64])
        -> Result<(), crate::Error>;
}
