// # converge - one-shot reconciliation runner
//
// This binary is a THIN integration layer:
// - DO NOT add reconciliation, matching, or polling logic here
// - All converge logic lives in converge-core
// - Configuration is via environment variables ONLY
//
// The runner is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the Hostinger gateway into the reconcilers
// 4. Applying one manifest and exiting
//
// ## Configuration
//
// ### API
// - `CONVERGE_API_TOKEN`: API token (required)
// - `CONVERGE_API_BASE_URL`: API endpoint (default: https://developers.hostinger.com)
// - `CONVERGE_HTTP_TIMEOUT_SECS`: Per-request timeout in seconds (default: 30)
//
// ### Reconcilers
// - `CONVERGE_ZONE_WRITE_POLICY`: `additive` or `overwrite` (default: additive)
// - `CONVERGE_PROVISIONING_FLOW`: `purchase` or `legacy` (default: purchase)
//
// ### Input
// - `CONVERGE_MANIFEST`: Path to the JSON manifest (required)
//
// ### Logging
// - `CONVERGE_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export CONVERGE_API_TOKEN=your_token
// export CONVERGE_MANIFEST=/etc/converge/manifest.json
//
// converge
// ```

mod manifest;

use anyhow::Result;
use converge_core::{
    ApiConfig, ConvergeConfig, ProvisioningConfig, ProvisioningFlow, ReadOutcome, VmOrchestrator,
    ZoneConfig, ZoneReconciler, ZoneWritePolicy,
};
use converge_provider_hostinger::HostingerClient;
use manifest::Manifest;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum ConvergeExitCode {
    /// Manifest applied
    Success = 0,
    /// Configuration error or invalid manifest
    ConfigError = 1,
    /// A remote operation failed
    RuntimeError = 2,
}

impl From<ConvergeExitCode> for ExitCode {
    fn from(code: ConvergeExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Runner configuration
struct Config {
    api_token: String,
    api_base_url: Option<String>,
    http_timeout_secs: Option<u64>,
    zone_write_policy: ZoneWritePolicy,
    provisioning_flow: ProvisioningFlow,
    manifest_path: PathBuf,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let http_timeout_secs = match lookup("CONVERGE_HTTP_TIMEOUT_SECS") {
            Some(raw) => Some(raw.trim().parse().map_err(|_| {
                anyhow::anyhow!(
                    "CONVERGE_HTTP_TIMEOUT_SECS must be a whole number of seconds. Got: {}",
                    raw
                )
            })?),
            None => None,
        };

        Ok(Self {
            api_token: lookup("CONVERGE_API_TOKEN").unwrap_or_default(),
            api_base_url: lookup("CONVERGE_API_BASE_URL"),
            http_timeout_secs,
            zone_write_policy: lookup("CONVERGE_ZONE_WRITE_POLICY")
                .map(|s| s.parse::<ZoneWritePolicy>())
                .transpose()?
                .unwrap_or_default(),
            provisioning_flow: lookup("CONVERGE_PROVISIONING_FLOW")
                .map(|s| s.parse::<ProvisioningFlow>())
                .transpose()?
                .unwrap_or_default(),
            manifest_path: lookup("CONVERGE_MANIFEST")
                .map(PathBuf::from)
                .unwrap_or_default(),
            log_level: lookup("CONVERGE_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            anyhow::bail!(
                "CONVERGE_API_TOKEN is required. \
                Set it via: export CONVERGE_API_TOKEN=your_token"
            );
        }

        if self.manifest_path.as_os_str().is_empty() {
            anyhow::bail!(
                "CONVERGE_MANIFEST is required. \
                Set it via: export CONVERGE_MANIFEST=/path/to/manifest.json"
            );
        }

        if let Some(timeout) = self.http_timeout_secs
            && !(1..=300).contains(&timeout)
        {
            anyhow::bail!(
                "CONVERGE_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                timeout
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "CONVERGE_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.converge_config().validate()?;
        Ok(())
    }

    fn converge_config(&self) -> ConvergeConfig {
        let mut api = ApiConfig::new(self.api_token.clone());
        if let Some(base_url) = &self.api_base_url {
            api = api.with_base_url(base_url.clone());
        }
        if let Some(timeout) = self.http_timeout_secs {
            api.timeout_secs = timeout;
        }

        ConvergeConfig {
            api,
            zone: ZoneConfig {
                write_policy: self.zone_write_policy,
                ..ZoneConfig::default()
            },
            provisioning: ProvisioningConfig {
                flow: self.provisioning_flow,
                ..ProvisioningConfig::default()
            },
        }
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ConvergeExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ConvergeExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ConvergeExitCode::ConfigError.into();
    }

    let manifest = match Manifest::load(&config.manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("Manifest error: {:#}", e);
            return ConvergeExitCode::ConfigError.into();
        }
    };

    info!(
        "Manifest loaded: {} record(s), {} retraction(s), {} virtual machine(s)",
        manifest.records.len(),
        manifest.retract.len(),
        manifest.virtual_machines.len()
    );
    if manifest.is_empty() {
        warn!("Manifest declares nothing; no API calls will be made");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ConvergeExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run(config.converge_config(), manifest).await {
            error!("Converge failed: {:#}", e);
            ConvergeExitCode::RuntimeError
        } else {
            ConvergeExitCode::Success
        }
    });

    result.into()
}

/// Apply the manifest: records first, then retractions, then instances
async fn run(config: ConvergeConfig, manifest: Manifest) -> Result<()> {
    let client = Arc::new(HostingerClient::from_config(&config.api)?);
    let zones = ZoneReconciler::new(client.clone(), config.zone);
    let vms = VmOrchestrator::new(client.clone(), client, config.provisioning);

    for entry in &manifest.records {
        let id = entry.record.record_id();
        match zones.read(&entry.zone, &id).await? {
            ReadOutcome::Found(_) => info!("Record {} already present in {}", id, entry.zone),
            ReadOutcome::Absent => {
                let observed = zones.create(&entry.zone, &entry.record).await?;
                info!(
                    "Record {} created in {} (ttl {})",
                    observed.id, observed.zone, observed.ttl
                );
            }
        }
    }

    for entry in &manifest.retract {
        let id = entry.record_id()?;
        let outcome = zones.retract(&entry.zone, &id).await?;
        info!("Record {} retracted from {}: {:?}", id, entry.zone, outcome);
    }

    for entry in &manifest.virtual_machines {
        match entry.instance_id {
            None => {
                let instance = vms.provision(&entry.spec).await?;
                info!(
                    "Instance {} provisioned (subscription {}, ipv4 {})",
                    instance.id, instance.subscription_id, instance.ipv4
                );
            }
            Some(id) => match vms.read(id).await? {
                Some(instance) => info!(
                    "Instance {} is {} (hostname {}, ipv4 {})",
                    instance.id, instance.state, instance.hostname, instance.ipv4
                ),
                None => warn!("Instance {} no longer exists", id),
            },
        }
    }

    info!("Manifest applied");
    Ok(())
}
