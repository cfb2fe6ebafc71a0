#![allow(dead_code)]

//! Shared in-memory fake of a cloud provider for integration tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use stratus_cloud::{
    ClientKind, ClientProvider, CloudError, ProviderTypeEntry, Resource, ResourceClient, Result,
    SiteHost, StorageAccountKey,
};

#[derive(Default)]
pub struct FakeState {
    /// Provider-side resources, by id
    pub resources: HashMap<String, Resource>,
    /// Names passed to create_or_update, in call order
    pub create_calls: Vec<String>,
    /// Ids deleted, in call order
    pub deleted: Vec<String>,
    /// Create calls that should fail, by name
    pub fail_creates: HashSet<String>,
    /// Delete calls that should fail, by id
    pub fail_deletes: HashSet<String>,
    /// Type registry, by namespace
    pub registry: HashMap<String, Vec<ProviderTypeEntry>>,
    /// Keys returned by list_account_keys
    pub keys: Vec<StorageAccountKey>,
    /// When set, every get_client call fails
    pub fail_auth: bool,
    /// Cancel this token once the named create succeeds
    pub cancel_on_create: Option<(String, tokio_util::sync::CancellationToken)>,
}

/// Clonable fake provider; clones share the same state.
#[derive(Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<FakeState>>,
}

fn default_registry() -> HashMap<String, Vec<ProviderTypeEntry>> {
    let versions = vec!["2024-06-01".to_string(), "2023-05-01".to_string()];
    HashMap::from([
        (
            "Cloud.Resources".to_string(),
            vec![ProviderTypeEntry::new("resourceGroups", versions.clone())],
        ),
        (
            "Cloud.Web".to_string(),
            vec![
                ProviderTypeEntry::new("serverFarms", versions.clone()),
                ProviderTypeEntry::new("sites", versions.clone()),
            ],
        ),
        (
            "Cloud.Storage".to_string(),
            vec![
                ProviderTypeEntry::new("storageAccounts", versions.clone()),
                ProviderTypeEntry::new(
                    "storageAccounts/blobServices/containers",
                    versions.clone(),
                ),
            ],
        ),
        (
            "Cloud.Cdn".to_string(),
            vec![
                ProviderTypeEntry::new("profiles", versions.clone()),
                ProviderTypeEntry::new("profiles/endpoints", versions.clone()),
            ],
        ),
        (
            "Cloud.ApiManagement".to_string(),
            vec![ProviderTypeEntry::new("service/apis", versions)],
        ),
    ])
}

pub fn fake_id(resource_type: &str, name: &str) -> String {
    format!("/groups/test/providers/{resource_type}/{name}")
}

impl FakeCloud {
    pub fn new() -> Self {
        let cloud = Self::default();
        {
            let mut state = cloud.state.lock().unwrap();
            state.registry = default_registry();
            state.keys = vec![StorageAccountKey {
                name: "key1".to_string(),
                value: "fake-key-material".to_string(),
            }];
        }
        cloud
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn fail_create(&self, name: &str) {
        self.with_state(|s| s.fail_creates.insert(name.to_string()));
    }

    /// Cancel `token` as soon as the create of `name` has succeeded.
    pub fn cancel_on_create(&self, name: &str, token: &tokio_util::sync::CancellationToken) {
        self.with_state(|s| s.cancel_on_create = Some((name.to_string(), token.clone())));
    }

    pub fn fail_delete(&self, id: &str) {
        self.with_state(|s| s.fail_deletes.insert(id.to_string()));
    }

    /// Seed a provider-side resource without going through a create call.
    pub fn seed_resource(&self, resource: Resource) {
        self.with_state(|s| s.resources.insert(resource.id.clone(), resource));
    }

    pub fn deleted(&self) -> Vec<String> {
        self.with_state(|s| s.deleted.clone())
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.with_state(|s| s.create_calls.clone())
    }

    pub fn resource_count(&self) -> usize {
        self.with_state(|s| s.resources.len())
    }
}

struct FakeClient {
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl ResourceClient for FakeClient {
    async fn create_or_update(
        &self,
        _scope: &str,
        resource_type: &str,
        name: &str,
        params: serde_json::Value,
    ) -> Result<Resource> {
        let mut state = self.state.lock().unwrap();
        state.create_calls.push(name.to_string());

        if state.fail_creates.contains(name) {
            return Err(CloudError::provider(
                500,
                format!("create of {name} refused by fake"),
            ));
        }

        let tags: HashMap<String, String> = params
            .get("tags")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        let resource = Resource::new(fake_id(resource_type, name), resource_type)
            .with_tags(tags)
            .with_properties(params);
        // create-or-update: a repeated call overwrites in place
        state
            .resources
            .insert(resource.id.clone(), resource.clone());

        if let Some((trigger, token)) = &state.cancel_on_create {
            if trigger == name {
                token.cancel();
            }
        }
        Ok(resource)
    }

    async fn delete_by_id(&self, id: &str, _api_version: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes.contains(id) {
            return Err(CloudError::provider(
                409,
                format!("delete of {id} refused by fake"),
            ));
        }
        state.resources.remove(id);
        state.deleted.push(id.to_string());
        Ok(())
    }

    async fn list_by_tag(&self, tag_name: &str) -> Result<Vec<Resource>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .resources
            .values()
            .filter(|r| r.tags.contains_key(tag_name))
            .cloned()
            .collect())
    }

    async fn provider_type_registry(&self, namespace: &str) -> Result<Vec<ProviderTypeEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state.registry.get(namespace).cloned().unwrap_or_default())
    }

    async fn list_account_keys(
        &self,
        _scope: &str,
        _account_name: &str,
    ) -> Result<Vec<StorageAccountKey>> {
        let state = self.state.lock().unwrap();
        Ok(state.keys.clone())
    }
}

#[async_trait]
impl ClientProvider for FakeCloud {
    async fn get_client(&self, kind: ClientKind) -> Result<Arc<dyn ResourceClient>> {
        if self.with_state(|s| s.fail_auth) {
            return Err(CloudError::AuthenticationFailed(format!(
                "no credentials for {kind}"
            )));
        }
        Ok(Arc::new(FakeClient {
            state: Arc::clone(&self.state),
        }))
    }
}

/// Fake deployment target recording uploads.
#[derive(Clone, Default)]
pub struct FakeHost {
    pub uploads: Arc<Mutex<Vec<(String, String)>>>,
    pub deployed: Arc<Mutex<Vec<String>>>,
    pub static_site: Arc<Mutex<Option<(String, String)>>>,
    pub fail_uploads: Arc<Mutex<HashSet<String>>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upload(&self, name: &str) {
        self.fail_uploads.lock().unwrap().insert(name.to_string());
    }
}

#[async_trait]
impl SiteHost for FakeHost {
    async fn upload_blob(
        &self,
        _container: &str,
        name: &str,
        content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<()> {
        if self.fail_uploads.lock().unwrap().contains(name) {
            return Err(CloudError::provider(503, format!("upload of {name} refused")));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((name.to_string(), content_type.to_string()));
        Ok(())
    }

    async fn set_static_website(&self, index_document: &str, error_document: &str) -> Result<()> {
        *self.static_site.lock().unwrap() =
            Some((index_document.to_string(), error_document.to_string()));
        Ok(())
    }

    async fn zip_deploy(&self, app_name: &str, _bytes: Vec<u8>) -> Result<()> {
        self.deployed.lock().unwrap().push(app_name.to_string());
        Ok(())
    }
}
