//! Resource model shared between the provisioning core and provider clients

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A provider-managed entity returned by a successful create call.
///
/// The core treats `properties` as an opaque payload; only `id` and
/// `resource_type` drive rollback addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Provider-assigned unique identifier
    pub id: String,

    /// Provider namespace/type string (e.g. `"Provider.Web/sites"`)
    pub resource_type: String,

    /// Tags attached at creation time
    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Provider-specific payload, opaque to the core
    #[serde(default)]
    pub properties: serde_json::Value,

    /// When the create call succeeded
    pub created_at: DateTime<Utc>,
}

impl Resource {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            tags: HashMap::new(),
            properties: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_properties(mut self, properties: serde_json::Value) -> Self {
        self.properties = properties;
        self
    }

    /// Provider namespace, the part before the first `/`.
    pub fn namespace(&self) -> Result<&str> {
        self.split_type().map(|(ns, _)| ns)
    }

    /// Bare type name, the part after the first `/`.
    pub fn type_name(&self) -> Result<&str> {
        self.split_type().map(|(_, name)| name)
    }

    fn split_type(&self) -> Result<(&str, &str)> {
        self.resource_type
            .split_once('/')
            .filter(|(ns, name)| !ns.is_empty() && !name.is_empty())
            .ok_or_else(|| CloudError::InvalidResourceType(self.resource_type.clone()))
    }
}

/// Canonical type strings for the resource kinds the orchestrator creates.
pub mod types {
    pub const RESOURCE_GROUP: &str = "Cloud.Resources/resourceGroups";
    pub const HOSTING_PLAN: &str = "Cloud.Web/serverFarms";
    pub const STORAGE_ACCOUNT: &str = "Cloud.Storage/storageAccounts";
    pub const BLOB_CONTAINER: &str = "Cloud.Storage/storageAccounts/blobServices/containers";
    pub const WEB_APP: &str = "Cloud.Web/sites";
    pub const CDN_PROFILE: &str = "Cloud.Cdn/profiles";
    pub const CDN_ENDPOINT: &str = "Cloud.Cdn/profiles/endpoints";
    pub const API: &str = "Cloud.ApiManagement/service/apis";
}

/// One row of a provider's type registry.
///
/// `api_versions` is ordered newest-first by the provider; version resolution
/// relies on that ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTypeEntry {
    pub resource_type: String,
    pub api_versions: Vec<String>,
}

impl ProviderTypeEntry {
    pub fn new(resource_type: impl Into<String>, api_versions: Vec<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            api_versions,
        }
    }
}

/// Access key for a storage account, used to build connection strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAccountKey {
    pub name: String,
    pub value: String,
}
