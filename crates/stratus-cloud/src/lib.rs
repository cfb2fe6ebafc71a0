//! Stratus cloud client abstraction
//!
//! This crate defines the seam between the provisioning core and a cloud
//! provider: the resource model, the client capability traits, and the error
//! taxonomy. The core (`stratus-provision`) is written entirely against these
//! traits, so providers and test fakes plug in the same way.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              stratus-provision                │
//! │   orchestrator · rollback · transaction log   │
//! └─────────────────┬────────────────────────────┘
//!                   │
//! ┌─────────────────▼────────────────────────────┐
//! │               stratus-cloud                   │
//! │  trait ClientProvider ──► trait ResourceClient│
//! │        (per-kind cache: CachedClients)        │
//! └─────────────────┬────────────────────────────┘
//!                   │
//!          provider SDK / test fakes
//! ```

pub mod client;
pub mod error;
pub mod resource;

// Re-exports
pub use client::{CachedClients, ClientKind, ClientProvider, ResourceClient, SiteHost};
pub use error::{CloudError, Result};
pub use resource::{ProviderTypeEntry, Resource, StorageAccountKey};
