//! Declared virtual machine shape and its local validation

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PASSWORD_CHARS: usize = 100;

/// A virtual machine as the user declares it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineSpec {
    /// Catalog price id of the plan
    pub plan: String,

    /// Data center to place the instance in
    pub data_center_id: u64,

    /// OS template to install
    pub template_id: u64,

    /// Root password
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub password: Option<String>,

    /// Fully qualified hostname
    #[serde(default)]
    pub hostname: Option<String>,

    /// Script run once after install
    #[serde(default)]
    pub post_install_script_id: Option<u64>,

    /// Payment method to charge; the account default when unset
    #[serde(default)]
    pub payment_method_id: Option<u64>,

    /// Credentials (public keys) that must be attached
    #[serde(default)]
    pub credential_ids: Vec<u64>,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for VirtualMachineSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMachineSpec")
            .field("plan", &self.plan)
            .field("data_center_id", &self.data_center_id)
            .field("template_id", &self.template_id)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("hostname", &self.hostname)
            .field("post_install_script_id", &self.post_install_script_id)
            .field("payment_method_id", &self.payment_method_id)
            .field("credential_ids", &self.credential_ids)
            .finish()
    }
}

impl VirtualMachineSpec {
    /// Declare a machine with only the required fields
    pub fn new(plan: impl Into<String>, data_center_id: u64, template_id: u64) -> Self {
        Self {
            plan: plan.into(),
            data_center_id,
            template_id,
            password: None,
            hostname: None,
            post_install_script_id: None,
            payment_method_id: None,
            credential_ids: Vec::new(),
        }
    }

    /// Validate everything that can be checked without the API
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.plan.trim().is_empty() {
            return Err(Error::invalid_input("plan cannot be empty"));
        }

        require_positive("data_center_id", self.data_center_id)?;
        require_positive("template_id", self.template_id)?;
        if let Some(id) = self.post_install_script_id {
            require_positive("post_install_script_id", id)?;
        }
        if let Some(id) = self.payment_method_id {
            require_positive("payment_method_id", id)?;
        }
        for id in &self.credential_ids {
            require_positive("credential_ids", *id)?;
        }

        if let Some(password) = &self.password {
            let chars = password.chars().count();
            if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&chars) {
                return Err(Error::invalid_input(format!(
                    "password must be between {} and {} characters. Got: {}",
                    MIN_PASSWORD_CHARS, MAX_PASSWORD_CHARS, chars
                )));
            }
        }

        if let Some(hostname) = &self.hostname {
            validate_fqdn(hostname)?;
        }

        Ok(())
    }
}

fn require_positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(Error::invalid_input(format!("{} must be >= 1", field)));
    }
    Ok(())
}

/// Check that a hostname is a fully qualified domain name
///
/// At least two labels, each alphanumeric or hyphen, not starting or ending
/// with a hyphen, and an alphabetic top-level label of two or more letters.
fn validate_fqdn(hostname: &str) -> Result<()> {
    if hostname.is_empty() {
        return Err(Error::invalid_input("hostname cannot be empty"));
    }

    // RFC 1035: 253 chars max
    if hostname.len() > 253 {
        return Err(Error::invalid_input(format!(
            "hostname too long: {} chars (max 253). Got: {}",
            hostname.len(),
            hostname
        )));
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 {
        return Err(Error::invalid_input(format!(
            "hostname must be a fully qualified domain name. Got: '{}'",
            hostname
        )));
    }

    for label in &labels {
        if label.is_empty() {
            return Err(Error::invalid_input(format!(
                "hostname has empty label: '{}'",
                hostname
            )));
        }

        if label.len() > 63 {
            return Err(Error::invalid_input(format!(
                "hostname label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::invalid_input(format!(
                "hostname label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::invalid_input(format!(
                "hostname label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::invalid_input(format!(
            "hostname top-level label must be at least 2 letters. Got: '{}'",
            tld
        )));
    }

    Ok(())
}
