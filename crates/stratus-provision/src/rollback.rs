//! Reverse-order rollback and tag-based bulk cleanup

use crate::error::{RollbackError, RollbackFailure};
use crate::stack::ProvisioningStack;
use futures_util::StreamExt;
use futures_util::stream;
use std::sync::Arc;
use stratus_cloud::{CachedClients, ClientKind, ClientProvider, CloudError, Resource, Result};

/// Default fan-out width for tag-based bulk deletes.
pub const DEFAULT_DELETE_CONCURRENCY: usize = 4;

/// Outcome of a rollback pass that left nothing behind.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Ids deleted, in deletion order (reverse creation order)
    pub deleted: Vec<String>,
}

/// Aggregated outcome of a bulk operation over many resources.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Ids that completed successfully
    pub succeeded: Vec<String>,

    /// Per-resource failures, never silently dropped
    pub failed: Vec<BatchFailure>,
}

/// One failed item of a bulk operation.
#[derive(Debug)]
pub struct BatchFailure {
    pub id: String,
    pub error: String,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, id: impl Into<String>) {
        self.succeeded.push(id.into());
    }

    pub fn add_failure(&mut self, id: impl Into<String>, error: impl Into<String>) {
        self.failed.push(BatchFailure {
            id: id.into(),
            error: error.into(),
        });
    }
}

/// Unwinds a [`ProvisioningStack`] and performs out-of-band cleanup.
///
/// Deletes are addressed by resource id plus an API version resolved from the
/// provider's type registry at delete time; versions are never stored.
pub struct RollbackEngine<P> {
    clients: Arc<CachedClients<P>>,
}

impl<P: ClientProvider> RollbackEngine<P> {
    pub fn new(clients: Arc<CachedClients<P>>) -> Self {
        Self { clients }
    }

    /// Resolve the API version to use when deleting `resource`.
    ///
    /// Queries the registry for the resource's namespace, matches the type
    /// name case-insensitively, and takes the first listed version. The
    /// registry orders versions newest-first, so "first" means "latest".
    pub async fn resolve_api_version(&self, resource: &Resource) -> Result<String> {
        let namespace = resource.namespace()?;
        let type_name = resource.type_name()?;

        let client = self.clients.get(ClientKind::ResourceManagement).await?;
        let registry = client.provider_type_registry(namespace).await?;

        registry
            .iter()
            .find(|entry| entry.resource_type.eq_ignore_ascii_case(type_name))
            .and_then(|entry| entry.api_versions.first().cloned())
            .ok_or_else(|| CloudError::ApiVersionNotFound {
                resource_type: resource.resource_type.clone(),
            })
    }

    /// Delete a single resource by id under its resolved API version.
    pub async fn delete_resource(&self, resource: &Resource) -> Result<()> {
        let api_version = self.resolve_api_version(resource).await?;
        tracing::info!("Deleting {} (api-version {})", resource.id, api_version);

        let client = self.clients.get(ClientKind::ResourceManagement).await?;
        client.delete_by_id(&resource.id, &api_version).await
    }

    /// Unwind the stack: delete every entry, most recent first.
    ///
    /// A failed delete never aborts the unwind; the remaining entries are
    /// still attempted and every failure is reported in
    /// [`RollbackError::Partial`] so no resource is silently leaked.
    pub async fn rollback(
        &self,
        stack: &mut ProvisioningStack,
    ) -> std::result::Result<RollbackReport, RollbackError> {
        let entries = stack.pop_all();
        tracing::info!("Rolling back {} resource(s)", entries.len());

        let mut deleted = Vec::new();
        let mut failures = Vec::new();

        for resource in entries {
            match self.delete_resource(&resource).await {
                Ok(()) => deleted.push(resource.id),
                Err(error) => {
                    tracing::warn!("Rollback delete failed for {}: {}", resource.id, error);
                    failures.push(RollbackFailure {
                        resource_id: resource.id,
                        resource_type: resource.resource_type,
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(RollbackReport { deleted })
        } else {
            Err(RollbackError::Partial { deleted, failures })
        }
    }

    /// Delete every resource carrying `tag_name`, independent of any stack.
    ///
    /// Deletes run with bounded concurrency and every outcome is collected
    /// into the report; a failed delete never drops the remaining work.
    pub async fn delete_by_tag(
        &self,
        tag_name: &str,
        max_concurrency: usize,
    ) -> Result<BatchReport> {
        let client = self.clients.get(ClientKind::ResourceManagement).await?;
        let resources = client.list_by_tag(tag_name).await?;
        tracing::info!(
            "Tag cleanup '{}': {} resource(s) to delete",
            tag_name,
            resources.len()
        );

        let outcomes: Vec<(String, Result<()>)> = stream::iter(resources.into_iter().map(
            |resource| async move {
                let outcome = self.delete_resource(&resource).await;
                (resource.id, outcome)
            },
        ))
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await;

        let mut report = BatchReport::new();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.add_success(id),
                Err(error) => {
                    tracing::warn!("Tag cleanup delete failed for {}: {}", id, error);
                    report.add_failure(id, error.to_string());
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_report_tracks_both_outcomes() {
        let mut report = BatchReport::new();
        report.add_success("/r/a");
        report.add_failure("/r/b", "boom");

        assert!(!report.is_success());
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "/r/b");
    }
}
