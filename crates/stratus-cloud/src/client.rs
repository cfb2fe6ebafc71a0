//! Client capability traits and per-kind client caching
//!
//! The provisioning core never talks to a cloud SDK directly. It asks a
//! [`ClientProvider`] for a client of a given [`ClientKind`] and drives it
//! through the [`ResourceClient`] trait. Real providers wrap their SDK here;
//! tests substitute fakes.

use crate::error::Result;
use crate::resource::{ProviderTypeEntry, Resource, StorageAccountKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The management-plane client families the orchestrator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    ResourceManagement,
    WebAppManagement,
    StorageManagement,
    CdnManagement,
    ApiManagement,
}

impl std::fmt::Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientKind::ResourceManagement => write!(f, "resource-management"),
            ClientKind::WebAppManagement => write!(f, "webapp-management"),
            ClientKind::StorageManagement => write!(f, "storage-management"),
            ClientKind::CdnManagement => write!(f, "cdn-management"),
            ClientKind::ApiManagement => write!(f, "api-management"),
        }
    }
}

/// Operations every management client exposes to the core.
///
/// `params` envelopes are provider-shaped JSON built by the orchestrator;
/// their exact schema is the provider's concern.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Create or update a named resource of `resource_type` inside a
    /// resource-group scope.
    async fn create_or_update(
        &self,
        scope: &str,
        resource_type: &str,
        name: &str,
        params: serde_json::Value,
    ) -> Result<Resource>;

    /// Delete a resource addressed by its full id and a resolved API version.
    async fn delete_by_id(&self, id: &str, api_version: &str) -> Result<()>;

    /// List resources carrying a tag (`tagName eq '<tag>'` filter).
    async fn list_by_tag(&self, tag_name: &str) -> Result<Vec<Resource>>;

    /// Fetch the type registry for a provider namespace. Entries list their
    /// API versions newest-first.
    async fn provider_type_registry(&self, namespace: &str) -> Result<Vec<ProviderTypeEntry>>;

    /// List access keys for a storage account.
    async fn list_account_keys(
        &self,
        scope: &str,
        account_name: &str,
    ) -> Result<Vec<StorageAccountKey>>;
}

/// Hands out authenticated clients per kind.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    /// Acquire a client for `kind`. Fails with
    /// [`CloudError::AuthenticationFailed`] when credential exchange fails.
    async fn get_client(&self, kind: ClientKind) -> Result<Arc<dyn ResourceClient>>;
}

/// Leaf I/O capabilities for pushing site content to already-provisioned
/// resources. These sit outside the rollback stack.
#[async_trait]
pub trait SiteHost: Send + Sync {
    /// Upload one blob into a container.
    async fn upload_blob(
        &self,
        container: &str,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<()>;

    /// Enable static-website serving on the storage account.
    async fn set_static_website(&self, index_document: &str, error_document: &str) -> Result<()>;

    /// Push a zip archive to an app's deployment endpoint.
    async fn zip_deploy(&self, app_name: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Lazily-initializing, per-kind client cache over a [`ClientProvider`].
///
/// Acquisition errors are not cached; a failed credential exchange is retried
/// on the next request for that kind.
pub struct CachedClients<P> {
    provider: P,
    clients: Mutex<HashMap<ClientKind, Arc<dyn ResourceClient>>>,
}

impl<P: ClientProvider> CachedClients<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cached client for `kind`, acquiring it on first use.
    pub async fn get(&self, kind: ClientKind) -> Result<Arc<dyn ResourceClient>> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&kind) {
            return Ok(Arc::clone(client));
        }

        tracing::debug!("Acquiring {} client", kind);
        let client = self.provider.get_client(kind).await?;
        clients.insert(kind, Arc::clone(&client));
        Ok(client)
    }
}
