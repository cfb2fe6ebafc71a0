//! Dependency-ordered provisioning with rollback on failure
//!
//! The orchestrator issues create-or-update calls in dependency order (group
//! → plan → storage → container → app → CDN/API), pushing every created
//! resource onto the transaction log. Any step failure triggers a reverse
//! unwind of everything created so far.

use crate::error::{ProvisionFailure, ProvisionStep, StepError};
use crate::rollback::RollbackEngine;
use crate::stack::ProvisioningStack;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use stratus_cloud::resource::types;
use stratus_cloud::{
    CachedClients, ClientKind, ClientProvider, Resource, Result, StorageAccountKey,
};
use tokio_util::sync::CancellationToken;

const DEFAULT_LOCATION: &str = "westus";
const WEB_CONTAINER: &str = "$web";

/// Orchestrator-level defaults. Every operation falls back to these when its
/// overrides leave a field unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Resource group all operations scope to by default
    pub resource_group: String,

    /// Region resources are created in
    #[serde(default = "default_location")]
    pub location: String,

    /// Tags attached to every created resource
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

impl ProvisionConfig {
    pub fn new(resource_group: impl Into<String>) -> Self {
        Self {
            resource_group: resource_group.into(),
            location: default_location(),
            tags: HashMap::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Per-call overrides of the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct OpOverrides {
    pub resource_group: Option<String>,
    pub location: Option<String>,
    pub tags: Option<HashMap<String, String>>,
}

/// Hosting plan parameters.
#[derive(Debug, Clone)]
pub struct HostingPlanOptions {
    pub name: String,
    pub sku_name: String,
    pub capacity: u32,
}

impl HostingPlanOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sku_name: "Y1".to_string(),
            capacity: 0,
        }
    }

    pub fn with_sku(mut self, sku_name: impl Into<String>) -> Self {
        self.sku_name = sku_name.into();
        self
    }
}

/// Storage account parameters.
#[derive(Debug, Clone)]
pub struct StorageAccountOptions {
    pub name: String,
    pub sku_name: String,
    pub kind: String,
    pub access_tier: String,
}

impl StorageAccountOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sku_name: "Standard_LRS".to_string(),
            kind: "StorageV2".to_string(),
            access_tier: "Hot".to_string(),
        }
    }
}

/// Function app parameters. The envelope is synthesized from these plus a
/// storage account key and handed to the generic web-app create.
#[derive(Debug, Clone)]
pub struct FunctionAppOptions {
    pub name: String,
    pub plan_name: String,
    pub storage_account: String,
    pub worker_runtime: String,
    pub extension_version: String,
}

impl FunctionAppOptions {
    pub fn new(
        name: impl Into<String>,
        plan_name: impl Into<String>,
        storage_account: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            plan_name: plan_name.into(),
            storage_account: storage_account.into(),
            worker_runtime: "node".to_string(),
            extension_version: "~4".to_string(),
        }
    }
}

/// CDN profile parameters.
#[derive(Debug, Clone)]
pub struct CdnProfileOptions {
    pub name: String,
    pub sku_name: String,
}

impl CdnProfileOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sku_name: "Standard".to_string(),
        }
    }
}

/// CDN endpoint parameters. `origin` may be a bare host or a URL; only the
/// host part is used.
#[derive(Debug, Clone)]
pub struct CdnEndpointOptions {
    pub name: String,
    pub profile_name: String,
    pub origin: String,
}

/// API gateway import parameters: a swagger document mounted under a base
/// path on an API management service.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub service_name: String,
    pub api_id: String,
    pub swagger: serde_json::Value,
    pub base_path: String,
}

impl ApiOptions {
    pub fn new(
        service_name: impl Into<String>,
        api_id: impl Into<String>,
        swagger: serde_json::Value,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            api_id: api_id.into(),
            swagger,
            base_path: "api".to_string(),
        }
    }
}

/// Everything `provision` needs to stand up a static site with an API
/// backend. CDN and API layers are optional.
#[derive(Debug, Clone)]
pub struct SiteSpec {
    pub plan: HostingPlanOptions,
    pub storage: StorageAccountOptions,
    pub app_name: String,
    pub cdn: Option<CdnProfileOptions>,
    pub api: Option<ApiOptions>,
}

/// Result of a fully successful provisioning run.
#[derive(Debug)]
pub struct ProvisionOutcome {
    /// Every resource created, in creation order
    pub created: Vec<Resource>,
}

/// Drives the create sequence against a [`ClientProvider`] and keeps the
/// transaction log. One orchestrator owns one run's stack; it must not be
/// shared across concurrent runs.
pub struct Orchestrator<P> {
    clients: Arc<CachedClients<P>>,
    config: ProvisionConfig,
    stack: ProvisioningStack,
}

impl<P: ClientProvider> Orchestrator<P> {
    pub fn new(provider: P, config: ProvisionConfig) -> Self {
        Self {
            clients: Arc::new(CachedClients::new(provider)),
            config,
            stack: ProvisioningStack::new(),
        }
    }

    /// The transaction log built so far, in creation order.
    pub fn stack(&self) -> &ProvisioningStack {
        &self.stack
    }

    /// A rollback engine sharing this orchestrator's client cache.
    pub fn rollback_engine(&self) -> RollbackEngine<P> {
        RollbackEngine::new(Arc::clone(&self.clients))
    }

    fn group<'a>(&'a self, overrides: &'a OpOverrides) -> &'a str {
        overrides
            .resource_group
            .as_deref()
            .unwrap_or(&self.config.resource_group)
    }

    fn location<'a>(&'a self, overrides: &'a OpOverrides) -> &'a str {
        overrides
            .location
            .as_deref()
            .unwrap_or(&self.config.location)
    }

    fn tags(&self, overrides: &OpOverrides) -> HashMap<String, String> {
        overrides.tags.clone().unwrap_or_else(|| self.config.tags.clone())
    }

    /// Shared create path: issue create-or-update through the right client,
    /// push the result on success, leave the stack untouched on failure.
    async fn create_stacked(
        &mut self,
        kind: ClientKind,
        scope: &str,
        resource_type: &str,
        name: &str,
        params: serde_json::Value,
    ) -> Result<Resource> {
        tracing::info!("Creating {} '{}' in {}", resource_type, name, scope);
        let client = self.clients.get(kind).await?;
        let resource = client
            .create_or_update(scope, resource_type, name, params)
            .await?;
        Ok(self.stack.push(resource))
    }

    /// Create (or update) the resource group itself. Name defaults to the
    /// configured group.
    pub async fn create_resource_group(&mut self, overrides: &OpOverrides) -> Result<Resource> {
        let name = self.group(overrides).to_string();
        let params = json!({
            "location": self.location(overrides),
            "tags": self.tags(overrides),
        });
        self.create_stacked(
            ClientKind::ResourceManagement,
            &name,
            types::RESOURCE_GROUP,
            &name,
            params,
        )
        .await
    }

    /// Create the serverless hosting plan the app runs on.
    pub async fn create_hosting_plan(
        &mut self,
        options: &HostingPlanOptions,
        overrides: &OpOverrides,
    ) -> Result<Resource> {
        let params = json!({
            "location": self.location(overrides),
            "tags": self.tags(overrides),
            "sku": {
                "name": options.sku_name,
                "capacity": options.capacity,
            },
        });
        let scope = self.group(overrides).to_string();
        self.create_stacked(
            ClientKind::WebAppManagement,
            &scope,
            types::HOSTING_PLAN,
            &options.name,
            params,
        )
        .await
    }

    /// Create the storage account backing the static site.
    pub async fn create_storage_account(
        &mut self,
        options: &StorageAccountOptions,
        overrides: &OpOverrides,
    ) -> Result<Resource> {
        let params = json!({
            "location": self.location(overrides),
            "tags": self.tags(overrides),
            "sku": { "name": options.sku_name },
            "kind": options.kind,
            "accessTier": options.access_tier,
        });
        let scope = self.group(overrides).to_string();
        self.create_stacked(
            ClientKind::StorageManagement,
            &scope,
            types::STORAGE_ACCOUNT,
            &options.name,
            params,
        )
        .await
    }

    /// Create the `$web` blob container on a storage account.
    pub async fn create_blob_container(
        &mut self,
        storage_account: &str,
        overrides: &OpOverrides,
    ) -> Result<Resource> {
        let params = json!({
            "storageAccount": storage_account,
            "tags": self.tags(overrides),
        });
        let scope = self.group(overrides).to_string();
        self.create_stacked(
            ClientKind::StorageManagement,
            &scope,
            types::BLOB_CONTAINER,
            WEB_CONTAINER,
            params,
        )
        .await
    }

    /// List the access keys of a storage account. Read-only, not stacked.
    pub async fn list_storage_account_keys(
        &self,
        storage_account: &str,
        overrides: &OpOverrides,
    ) -> Result<Vec<StorageAccountKey>> {
        let client = self.clients.get(ClientKind::StorageManagement).await?;
        client
            .list_account_keys(self.group(overrides), storage_account)
            .await
    }

    /// Create a web app from a caller-built site envelope.
    pub async fn create_web_app(
        &mut self,
        name: &str,
        envelope: serde_json::Value,
        overrides: &OpOverrides,
    ) -> Result<Resource> {
        let scope = self.group(overrides).to_string();
        self.create_stacked(
            ClientKind::WebAppManagement,
            &scope,
            types::WEB_APP,
            name,
            envelope,
        )
        .await
    }

    /// Create a function app.
    ///
    /// Synthesizes the site envelope (runtime settings plus a storage
    /// connection string built from the account name and key) and delegates
    /// to [`create_web_app`](Self::create_web_app). Pure data construction:
    /// exactly one stack entry, the delegate's.
    pub async fn create_function_app(
        &mut self,
        options: &FunctionAppOptions,
        storage_key: &StorageAccountKey,
        overrides: &OpOverrides,
    ) -> Result<Resource> {
        let envelope = function_app_envelope(
            options,
            storage_key,
            self.location(overrides),
            &self.tags(overrides),
        );
        self.create_web_app(&options.name, envelope, overrides).await
    }

    /// Create a CDN profile.
    pub async fn create_cdn_profile(
        &mut self,
        options: &CdnProfileOptions,
        overrides: &OpOverrides,
    ) -> Result<Resource> {
        let params = json!({
            "location": self.location(overrides),
            "tags": self.tags(overrides),
            "sku": { "name": options.sku_name },
        });
        let scope = self.group(overrides).to_string();
        self.create_stacked(
            ClientKind::CdnManagement,
            &scope,
            types::CDN_PROFILE,
            &options.name,
            params,
        )
        .await
    }

    /// Create a CDN endpoint pointing at an origin host.
    pub async fn create_cdn_endpoint(
        &mut self,
        options: &CdnEndpointOptions,
        overrides: &OpOverrides,
    ) -> Result<Resource> {
        let params = json!({
            "location": self.location(overrides),
            "tags": self.tags(overrides),
            "profile": options.profile_name,
            "origins": [{
                "name": "origin",
                "hostName": origin_host(&options.origin),
            }],
        });
        let scope = self.group(overrides).to_string();
        self.create_stacked(
            ClientKind::CdnManagement,
            &scope,
            types::CDN_ENDPOINT,
            &options.name,
            params,
        )
        .await
    }

    /// Import a swagger document as an API on a gateway service.
    pub async fn create_api(
        &mut self,
        options: &ApiOptions,
        overrides: &OpOverrides,
    ) -> Result<Resource> {
        let params = json!({
            "contentFormat": "swagger-json",
            "contentValue": options.swagger.to_string(),
            "path": options.base_path,
            "service": options.service_name,
            "tags": self.tags(overrides),
        });
        let scope = self.group(overrides).to_string();
        self.create_stacked(
            ClientKind::ApiManagement,
            &scope,
            types::API,
            &options.api_id,
            params,
        )
        .await
    }

    /// Remove a previously created API from its gateway service. Out-of-band
    /// deletion; does not touch the transaction log.
    pub async fn delete_api(&self, api: &Resource) -> Result<()> {
        tracing::info!("Deleting API {}", api.id);
        self.rollback_engine().delete_resource(api).await
    }

    /// Bind an API to a gateway product. Not stacked; the API itself is the
    /// rollback unit.
    pub async fn add_api_to_product(
        &self,
        service_name: &str,
        product_id: &str,
        api_id: &str,
        overrides: &OpOverrides,
    ) -> Result<Resource> {
        let params = json!({
            "service": service_name,
            "product": product_id,
            "api": api_id,
        });
        let client = self.clients.get(ClientKind::ApiManagement).await?;
        client
            .create_or_update(
                self.group(overrides),
                types::API,
                &format!("{product_id}/{api_id}"),
                params,
            )
            .await
    }

    /// List every resource carrying a tag. Read-only, not stacked.
    pub async fn list_resources_by_tag(&self, tag_name: &str) -> Result<Vec<Resource>> {
        let client = self.clients.get(ClientKind::ResourceManagement).await?;
        client.list_by_tag(tag_name).await
    }

    /// Run the full dependency-ordered sequence for `site`, rolling back
    /// everything created so far if any step fails or the caller cancels.
    ///
    /// On failure the caller learns which step stopped the run and which
    /// resources (if any) rollback could not delete.
    pub async fn provision(
        &mut self,
        site: &SiteSpec,
        cancel: &CancellationToken,
    ) -> std::result::Result<ProvisionOutcome, Box<ProvisionFailure>> {
        match self.run_sequence(site, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err((step, error)) => {
                tracing::warn!(
                    "Provisioning stopped at {} ({}), unwinding {} resource(s)",
                    step,
                    error,
                    self.stack.len()
                );
                let undeleted = match self.rollback_engine().rollback(&mut self.stack).await {
                    Ok(report) => {
                        tracing::info!("Rollback deleted {} resource(s)", report.deleted.len());
                        Vec::new()
                    }
                    Err(crate::error::RollbackError::Partial { deleted, failures }) => {
                        tracing::error!(
                            "Rollback deleted {} but left {} resource(s) undeleted",
                            deleted.len(),
                            failures.len()
                        );
                        failures
                    }
                };
                Err(Box::new(ProvisionFailure {
                    step,
                    error,
                    undeleted,
                }))
            }
        }
    }

    async fn run_sequence(
        &mut self,
        site: &SiteSpec,
        cancel: &CancellationToken,
    ) -> std::result::Result<ProvisionOutcome, (ProvisionStep, StepError)> {
        let overrides = OpOverrides::default();

        checkpoint(cancel, ProvisionStep::ResourceGroup)?;
        self.create_resource_group(&overrides)
            .await
            .map_err(|e| (ProvisionStep::ResourceGroup, e.into()))?;

        checkpoint(cancel, ProvisionStep::HostingPlan)?;
        self.create_hosting_plan(&site.plan, &overrides)
            .await
            .map_err(|e| (ProvisionStep::HostingPlan, e.into()))?;

        checkpoint(cancel, ProvisionStep::StorageAccount)?;
        self.create_storage_account(&site.storage, &overrides)
            .await
            .map_err(|e| (ProvisionStep::StorageAccount, e.into()))?;

        checkpoint(cancel, ProvisionStep::BlobContainer)?;
        self.create_blob_container(&site.storage.name, &overrides)
            .await
            .map_err(|e| (ProvisionStep::BlobContainer, e.into()))?;

        checkpoint(cancel, ProvisionStep::StorageKeys)?;
        let keys = self
            .list_storage_account_keys(&site.storage.name, &overrides)
            .await
            .map_err(|e| (ProvisionStep::StorageKeys, e.into()))?;
        let key = keys.into_iter().next().ok_or_else(|| {
            (
                ProvisionStep::StorageKeys,
                StepError::Cloud(stratus_cloud::CloudError::provider(
                    404,
                    format!("storage account {} has no access keys", site.storage.name),
                )),
            )
        })?;

        checkpoint(cancel, ProvisionStep::FunctionApp)?;
        let app_options = FunctionAppOptions::new(
            site.app_name.clone(),
            site.plan.name.clone(),
            site.storage.name.clone(),
        );
        self.create_function_app(&app_options, &key, &overrides)
            .await
            .map_err(|e| (ProvisionStep::FunctionApp, e.into()))?;

        if let Some(cdn) = &site.cdn {
            checkpoint(cancel, ProvisionStep::CdnProfile)?;
            self.create_cdn_profile(cdn, &overrides)
                .await
                .map_err(|e| (ProvisionStep::CdnProfile, e.into()))?;

            checkpoint(cancel, ProvisionStep::CdnEndpoint)?;
            let endpoint = CdnEndpointOptions {
                name: site.storage.name.clone(),
                profile_name: cdn.name.clone(),
                origin: site.storage.name.clone(),
            };
            self.create_cdn_endpoint(&endpoint, &overrides)
                .await
                .map_err(|e| (ProvisionStep::CdnEndpoint, e.into()))?;
        }

        if let Some(api) = &site.api {
            checkpoint(cancel, ProvisionStep::ApiGateway)?;
            self.create_api(api, &overrides)
                .await
                .map_err(|e| (ProvisionStep::ApiGateway, e.into()))?;
        }

        Ok(ProvisionOutcome {
            created: self.stack.iter().cloned().collect(),
        })
    }
}

fn checkpoint(
    cancel: &CancellationToken,
    step: ProvisionStep,
) -> std::result::Result<(), (ProvisionStep, StepError)> {
    if cancel.is_cancelled() {
        Err((step, StepError::Cancelled))
    } else {
        Ok(())
    }
}

/// Build the provider envelope for a function app.
fn function_app_envelope(
    options: &FunctionAppOptions,
    storage_key: &StorageAccountKey,
    location: &str,
    tags: &HashMap<String, String>,
) -> serde_json::Value {
    let connection = format!(
        "DefaultEndpointsProtocol=https;AccountName={};AccountKey={}",
        options.storage_account, storage_key.value
    );
    json!({
        "location": location,
        "tags": tags,
        "kind": "functionapp",
        "serverFarmId": options.plan_name,
        "properties": {},
        "siteConfig": {
            "appSettings": [
                { "name": "FUNCTIONS_WORKER_RUNTIME", "value": options.worker_runtime },
                { "name": "FUNCTIONS_EXTENSION_VERSION", "value": options.extension_version },
                { "name": "STORAGE_CONNECTION", "value": connection },
                { "name": "CONTENT_CONNECTION", "value": connection },
                { "name": "CONTENT_SHARE", "value": options.storage_account },
            ],
        },
    })
}

/// Host part of an origin that may be a bare host or a URL.
fn origin_host(origin: &str) -> &str {
    let stripped = origin
        .split_once("://")
        .map_or(origin, |(_, rest)| rest);
    stripped.split('/').next().unwrap_or(stripped)
}
