// # converge-core
//
// Reconciliation core for declarative DNS zone records and VPS provisioning.
//
// ## Architecture Overview
//
// The remote API exposes zones as unordered bags of records and virtual
// machines as subscriptions that materialize some time after an order. This
// library converges declared state against that API:
// - **ZoneApi / VirtualMachineApi / CatalogApi**: Traits for the remote gateway
// - **normalize**: Name canonicalization and per-type content comparison
// - **RecordId**: Synthetic identity for records the API gives no id to
// - **ZoneReconciler**: Create, locate and surgically retract zone records
// - **VmOrchestrator**: Validate, order, poll, set up and attach credentials
// - **RetryDriver**: Bounded fixed-interval polling with an injectable clock
//
// ## Design Principles
//
// 1. **Re-fetch, never cache**: every operation starts from a fresh snapshot
// 2. **Injected gateway**: API handles are constructor arguments, not globals
// 3. **Bounded waits**: every wait is attempts × interval, nothing open-ended
// 4. **Loud partial failure**: a half-applied rewrite is its own error

pub mod config;
pub mod error;
pub mod identity;
pub mod normalize;
pub mod retry;
pub mod traits;
pub mod vm;
pub mod zone;

// Re-export core types for convenience
pub use config::{
    ApiConfig, ConvergeConfig, ProvisioningConfig, ProvisioningFlow, ZoneConfig, ZoneWritePolicy,
};
pub use error::{Error, Result};
pub use identity::RecordId;
pub use retry::{Attempt, Clock, PollOutcome, RetryDriver, RetryPolicy, TokioClock};
pub use traits::{CatalogApi, VirtualMachineApi, ZoneApi};
pub use vm::{DeleteOutcome, ProvisionedInstance, VirtualMachineSpec, VmOrchestrator};
pub use zone::{
    DeclaredRecord, ObservedRecord, ReadOutcome, RecordType, RetractOutcome, ZoneReconciler,
};
