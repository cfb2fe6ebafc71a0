//! Provisioning and rollback error types

use stratus_cloud::CloudError;
use thiserror::Error;

/// One step of the dependency-ordered provisioning sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    ResourceGroup,
    HostingPlan,
    StorageAccount,
    BlobContainer,
    StorageKeys,
    FunctionApp,
    CdnProfile,
    CdnEndpoint,
    ApiGateway,
}

impl std::fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionStep::ResourceGroup => write!(f, "resource-group"),
            ProvisionStep::HostingPlan => write!(f, "hosting-plan"),
            ProvisionStep::StorageAccount => write!(f, "storage-account"),
            ProvisionStep::BlobContainer => write!(f, "blob-container"),
            ProvisionStep::StorageKeys => write!(f, "storage-keys"),
            ProvisionStep::FunctionApp => write!(f, "function-app"),
            ProvisionStep::CdnProfile => write!(f, "cdn-profile"),
            ProvisionStep::CdnEndpoint => write!(f, "cdn-endpoint"),
            ProvisionStep::ApiGateway => write!(f, "api-gateway"),
        }
    }
}

/// Why a provisioning step stopped the forward pass.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("cancelled by caller")]
    Cancelled,
}

/// A resource the rollback pass could not delete.
#[derive(Debug)]
pub struct RollbackFailure {
    pub resource_id: String,
    pub resource_type: String,
    pub error: CloudError,
}

/// Rollback completed but left resources behind. The failure list enumerates
/// every undeleted resource so an operator can intervene manually.
#[derive(Error, Debug)]
pub enum RollbackError {
    #[error("Rollback left {} resource(s) undeleted", failures.len())]
    Partial {
        /// Ids deleted successfully, in deletion order
        deleted: Vec<String>,
        failures: Vec<RollbackFailure>,
    },
}

/// Terminal outcome of a failed provisioning run: the step that stopped the
/// forward pass plus anything rollback could not undo.
#[derive(Error, Debug)]
#[error("Provisioning failed at step {step}: {error}")]
pub struct ProvisionFailure {
    pub step: ProvisionStep,
    pub error: StepError,
    pub undeleted: Vec<RollbackFailure>,
}

/// Errors from the leaf deployment helpers.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Archive read failed: {0}")]
    Archive(#[from] std::io::Error),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}
