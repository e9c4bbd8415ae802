// # Hostinger API Gateway
//
// This crate implements the converge gateway traits against the Hostinger
// public API:
//
// - `ZoneApi`: DNS zone snapshots and group writes (`/api/dns/v1`)
// - `VirtualMachineApi`: VPS instances and public keys (`/api/vps/v1`),
//   orders and subscriptions (`/api/billing/v1`)
// - `CatalogApi`: plans, templates, data centers and payment methods
//
// ## Trust Level: Untrusted (Gateway)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to the configured endpoint only
// - ✅ Map HTTP statuses onto `converge_core::Error`
//
// **Forbidden Capabilities**:
// - ❌ Retry, poll or sleep (owned by the reconcilers)
// - ❌ Cache zones, instances or catalogs between calls
// - ❌ Spawn tasks or threads
//
// Every trait method is exactly one HTTP request.
//
// ## Status mapping
//
// | Status | Error |
// |---|---|
// | 401, 403 | `Error::Authentication` |
// | 404 | `Error::NotFound` |
// | 429 | `Error::RateLimited` |
// | anything else outside the success set | `Error::Api` |
// | connection failure, timeout | `Error::Transport` |
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails fast if the token is empty

mod wire;

use async_trait::async_trait;
use converge_core::traits::{
    CatalogApi, CatalogEntry, CatalogKind, GroupFilter, PaymentMethod, PurchaseRequest,
    PurchaseResponse, RecreateRequest, SetupRequest, VirtualMachineApi, VirtualMachineInstance,
    ZoneApi, ZoneRecordGroup, ZoneUpdate,
};
use converge_core::{ApiConfig, Error, Result};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

use wire::{
    AttachKeysBody, DeleteZoneBody, HostnameBody, OrderBody, OrderItem, PutZoneBody,
    WireCatalogItem, WireInstance, WireKeyPage, WireNamed, WireOrder, WirePurchase,
};

/// User agent sent with every request
pub const CLIENT_USER_AGENT: &str = concat!("converge-hostinger/", env!("CARGO_PKG_VERSION"));

/// Hostinger API client
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct HostingerClient {
    /// Bearer token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for HostingerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostingerClient")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HostingerClient {
    /// Create a client for the default endpoint
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::from_config(&ApiConfig::new(api_token))
    }

    /// Create a client from validated API settings
    ///
    /// # Errors
    ///
    /// `Error::Config` for an empty token, a non-HTTP base URL, or when the
    /// HTTP client cannot be built.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token: config.api_token.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_token)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(CONTENT_TYPE, "application/json")
    }

    /// Send one request and map its status
    async fn send(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
        success: &[u16],
    ) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("{}: HTTP request failed: {}", operation, e)))?;

        let status = response.status().as_u16();
        if success.contains(&status) {
            debug!("{} succeeded (HTTP {})", operation, status);
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(match status {
            401 | 403 => Error::auth(format!(
                "{}: invalid API token or insufficient permissions (HTTP {})",
                operation, status
            )),
            404 => Error::not_found(format!("{}: {}", operation, body)),
            429 => Error::rate_limited(format!(
                "{}: rate limit exceeded, retry later (HTTP {})",
                operation, status
            )),
            _ => Error::api(operation, status, body),
        })
    }

    /// Send one request and decode its JSON body
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = self.send(operation, request, &[200]).await?;
        let body = response
            .text()
            .await
            .map_err(|e| {
                Error::transport(format!("{}: failed to read response: {}", operation, e))
            })?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ZoneApi for HostingerClient {
    /// ```http
    /// GET /api/dns/v1/zones/{zone}
    /// ```
    async fn get_zone(&self, zone: &str) -> Result<Vec<ZoneRecordGroup>> {
        let request = self.request(Method::GET, &format!("/api/dns/v1/zones/{}", zone));
        self.send_json(&format!("get zone {}", zone), request).await
    }

    /// ```http
    /// PUT /api/dns/v1/zones/{zone}
    /// {"overwrite": false, "zone": [{"name", "type", "ttl", "records": [{"content"}]}]}
    /// ```
    async fn put_zone(&self, zone: &str, update: &ZoneUpdate) -> Result<()> {
        let body = PutZoneBody {
            overwrite: update.overwrite,
            zone: &update.entries,
        };
        let request = self
            .request(Method::PUT, &format!("/api/dns/v1/zones/{}", zone))
            .json(&body);
        self.send(&format!("update zone {}", zone), request, &[200]).await?;
        Ok(())
    }

    /// ```http
    /// DELETE /api/dns/v1/zones/{zone}
    /// {"filters": [{"name", "type"}]}
    /// ```
    async fn delete_zone_groups(&self, zone: &str, filters: &[GroupFilter]) -> Result<()> {
        let request = self
            .request(Method::DELETE, &format!("/api/dns/v1/zones/{}", zone))
            .json(&DeleteZoneBody { filters });
        let operation = format!("delete records in zone {}", zone);
        self.send(&operation, request, &[200, 202]).await?;
        Ok(())
    }
}

#[async_trait]
impl VirtualMachineApi for HostingerClient {
    async fn get_instance(&self, id: u64) -> Result<VirtualMachineInstance> {
        let request = self.request(Method::GET, &format!("/api/vps/v1/virtual-machines/{}", id));
        let operation = format!("get virtual machine {}", id);
        let wire: WireInstance = self.send_json(&operation, request).await?;
        Ok(wire.into())
    }

    async fn list_instances(&self) -> Result<Vec<VirtualMachineInstance>> {
        let request = self.request(Method::GET, "/api/vps/v1/virtual-machines");
        let wire: Vec<WireInstance> = self.send_json("list virtual machines", request).await?;
        Ok(wire.into_iter().map(VirtualMachineInstance::from).collect())
    }

    async fn purchase_instance(&self, request: &PurchaseRequest) -> Result<PurchaseResponse> {
        let http = self
            .request(Method::POST, "/api/vps/v1/virtual-machines")
            .json(request);
        let operation = format!("purchase virtual machine plan {}", request.item_id);
        let wire: WirePurchase = self.send_json(&operation, http).await?;
        Ok(wire.into())
    }

    async fn order_instance(&self, plan: &str, payment_method_id: u64) -> Result<String> {
        let body = OrderBody {
            payment_method_id,
            items: vec![OrderItem {
                item_id: plan,
                quantity: 1,
            }],
        };
        let request = self
            .request(Method::POST, "/api/billing/v1/orders")
            .json(&body);
        let operation = format!("create order for plan {}", plan);
        let order: WireOrder = self.send_json(&operation, request).await?;

        order
            .subscription_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Error::Other(format!("{}: response carried no subscription_id", operation))
            })
    }

    async fn setup_instance(&self, id: u64, request: &SetupRequest) -> Result<()> {
        let http = self
            .request(Method::POST, &format!("/api/vps/v1/virtual-machines/{}/setup", id))
            .json(request);
        self.send(&format!("setup virtual machine {}", id), http, &[200]).await?;
        Ok(())
    }

    async fn update_hostname(&self, id: u64, hostname: &str) -> Result<()> {
        let request = self
            .request(Method::PUT, &format!("/api/vps/v1/virtual-machines/{}/hostname", id))
            .json(&HostnameBody { hostname });
        let operation = format!("update hostname of virtual machine {}", id);
        self.send(&operation, request, &[200]).await?;
        Ok(())
    }

    async fn recreate_instance(&self, id: u64, request: &RecreateRequest) -> Result<()> {
        let http = self
            .request(Method::POST, &format!("/api/vps/v1/virtual-machines/{}/recreate", id))
            .json(request);
        self.send(&format!("recreate virtual machine {}", id), http, &[200]).await?;
        Ok(())
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        let request = self.request(
            Method::DELETE,
            &format!("/api/billing/v1/subscriptions/{}", subscription_id),
        );
        let operation = format!("cancel subscription {}", subscription_id);
        self.send(&operation, request, &[200, 204]).await?;
        Ok(())
    }

    async fn attached_credential_ids(&self, id: u64) -> Result<Vec<u64>> {
        let request = self.request(
            Method::GET,
            &format!("/api/vps/v1/virtual-machines/{}/public-keys", id),
        );
        let operation = format!("list public keys of virtual machine {}", id);
        let page: WireKeyPage = self.send_json(&operation, request).await?;
        Ok(page.data.into_iter().map(|key| key.id).collect())
    }

    async fn attach_credentials(&self, id: u64, credential_ids: &[u64]) -> Result<()> {
        let request = self
            .request(Method::POST, &format!("/api/vps/v1/public-keys/attach/{}", id))
            .json(&AttachKeysBody {
                ids: credential_ids,
            });
        let operation = format!(
            "attach public keys {:?} to virtual machine {}",
            credential_ids, id
        );
        self.send(&operation, request, &[200]).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for HostingerClient {
    async fn list_catalog(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>> {
        match kind {
            CatalogKind::Plans => {
                let request = self.request(Method::GET, "/api/billing/v1/catalog");
                let items: Vec<WireCatalogItem> = self.send_json("list plans", request).await?;
                Ok(wire::plan_entries(items))
            }
            CatalogKind::Templates => {
                let request = self.request(Method::GET, "/api/vps/v1/templates");
                let items: Vec<WireNamed> = self.send_json("list templates", request).await?;
                Ok(items.into_iter().map(CatalogEntry::from).collect())
            }
            CatalogKind::DataCenters => {
                let request = self.request(Method::GET, "/api/vps/v1/data-centers");
                let items: Vec<WireNamed> = self.send_json("list data centers", request).await?;
                Ok(items.into_iter().map(CatalogEntry::from).collect())
            }
        }
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let request = self.request(Method::GET, "/api/billing/v1/payment-methods");
        self.send_json("list payment methods", request).await
    }
}
