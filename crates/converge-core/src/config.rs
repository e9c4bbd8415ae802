//! Configuration types for the reconciliation system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://developers.hostinger.com";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvergeConfig {
    /// Remote API connection settings
    pub api: ApiConfig,

    /// Zone reconciler settings
    #[serde(default)]
    pub zone: ZoneConfig,

    /// VM orchestrator settings
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

impl ConvergeConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.api.validate()?;
        self.zone.validate()?;
        self.provisioning.validate()?;
        Ok(())
    }
}

/// Remote API connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bearer token
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ApiConfig {
    /// Create API settings for the default endpoint
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: default_base_url(),
            timeout_secs: default_http_timeout_secs(),
        }
    }

    /// Point the client at another endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validate the API settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.is_empty() {
            return Err(crate::Error::config("API token cannot be empty"));
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "API base URL must use HTTP or HTTPS scheme. Got: {}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("HTTP timeout must be > 0"));
        }
        Ok(())
    }

    /// HTTP timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// How a create writes into an existing (name, type) group
///
/// One policy must be used consistently per deployment; mixing them
/// against the same zone loses updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneWritePolicy {
    /// Add to the group without touching anything else (`overwrite: false`)
    #[default]
    Additive,
    /// Replace the group in one call (`overwrite: true`); only safe when the
    /// declared record is the sole member of its group
    Overwrite,
}

impl ZoneWritePolicy {
    /// Value of the `overwrite` flag sent to the API
    pub fn overwrite(self) -> bool {
        matches!(self, Self::Overwrite)
    }
}

impl std::str::FromStr for ZoneWritePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "additive" => Ok(Self::Additive),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(crate::Error::config(format!(
                "unknown zone write policy '{}'. Valid: additive, overwrite",
                other
            ))),
        }
    }
}

/// Zone reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Write policy for creates
    #[serde(default)]
    pub write_policy: ZoneWritePolicy,

    /// Reads attempted after a create before giving up
    #[serde(default = "default_visibility_attempts")]
    pub visibility_attempts: usize,

    /// Delay between visibility reads (in seconds)
    #[serde(default = "default_visibility_interval_secs")]
    pub visibility_interval_secs: u64,

    /// Wait between the delete and re-create phases of a retract (in seconds)
    #[serde(default = "default_propagation_wait_secs")]
    pub propagation_wait_secs: u64,
}

impl ZoneConfig {
    /// Validate the zone settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.visibility_attempts == 0 {
            return Err(crate::Error::config("zone visibility attempts must be > 0"));
        }
        Ok(())
    }

    /// Polling policy for post-create visibility
    pub fn visibility_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.visibility_attempts,
            Duration::from_secs(self.visibility_interval_secs),
        )
    }

    /// Wait between retract phases
    pub fn propagation_wait(&self) -> Duration {
        Duration::from_secs(self.propagation_wait_secs)
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            write_policy: ZoneWritePolicy::default(),
            visibility_attempts: default_visibility_attempts(),
            visibility_interval_secs: default_visibility_interval_secs(),
            propagation_wait_secs: default_propagation_wait_secs(),
        }
    }
}

/// Which ordering endpoint the orchestrator drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningFlow {
    /// Single purchase call that orders and installs
    #[default]
    Purchase,
    /// Billing order, poll by subscription, then a separate setup call
    Legacy,
}

impl std::str::FromStr for ProvisioningFlow {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "purchase" => Ok(Self::Purchase),
            "legacy" => Ok(Self::Legacy),
            other => Err(crate::Error::config(format!(
                "unknown provisioning flow '{}'. Valid: purchase, legacy",
                other
            ))),
        }
    }
}

/// VM orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Ordering flow
    #[serde(default)]
    pub flow: ProvisioningFlow,

    /// Instance lookups attempted after an order
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: usize,

    /// Delay between instance lookups (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl ProvisioningConfig {
    /// Validate the provisioning settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_attempts == 0 {
            return Err(crate::Error::config("provisioning poll attempts must be > 0"));
        }
        Ok(())
    }

    /// Polling policy for instance materialization
    pub fn poll_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.poll_attempts, Duration::from_secs(self.poll_interval_secs))
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            flow: ProvisioningFlow::default(),
            poll_attempts: default_poll_attempts(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

// 15 × 2s keeps the post-create wait at about 30 seconds
fn default_visibility_attempts() -> usize {
    15
}

fn default_visibility_interval_secs() -> u64 {
    2
}

fn default_propagation_wait_secs() -> u64 {
    2
}

fn default_poll_attempts() -> usize {
    10
}

fn default_poll_interval_secs() -> u64 {
    2
}
