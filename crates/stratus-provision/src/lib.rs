//! Stratus provisioning core
//!
//! Stands up the cloud resources for a static site with an API backend in
//! dependency order, and unwinds them on failure. Every successful create is
//! recorded in an in-memory transaction log ([`ProvisioningStack`]); any step
//! failure hands the log to the [`RollbackEngine`], which deletes the entries
//! in strict reverse creation order and reports anything it could not undo.
//!
//! Provider specifics (auth, wire formats, upload mechanics) live behind the
//! `stratus-cloud` capability traits.

pub mod deploy;
pub mod error;
pub mod orchestrator;
pub mod rollback;
pub mod stack;

// Re-exports
pub use error::{
    DeployError, ProvisionFailure, ProvisionStep, RollbackError, RollbackFailure, StepError,
};
pub use orchestrator::{
    ApiOptions, CdnEndpointOptions, CdnProfileOptions, FunctionAppOptions, HostingPlanOptions,
    OpOverrides, Orchestrator, ProvisionConfig, ProvisionOutcome, SiteSpec, StorageAccountOptions,
};
pub use rollback::{
    BatchFailure, BatchReport, DEFAULT_DELETE_CONCURRENCY, RollbackEngine, RollbackReport,
};
pub use stack::ProvisioningStack;
