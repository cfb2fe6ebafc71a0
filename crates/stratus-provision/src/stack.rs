//! In-memory transaction log of created resources
//!
//! The stack records every successful create in chronological order so a
//! partial failure can be undone in strict reverse. It is owned by a single
//! orchestration flow and never shared across runs, so it carries no
//! synchronization. Nothing is persisted; the log lives and dies with the run.

use stratus_cloud::Resource;

/// Ordered log of successfully created resources.
#[derive(Debug, Default)]
pub struct ProvisioningStack {
    entries: Vec<Resource>,
}

impl ProvisioningStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created resource and hand it back to the caller.
    pub fn push(&mut self, resource: Resource) -> Resource {
        tracing::debug!(
            "Stacked {} ({}), depth now {}",
            resource.id,
            resource.resource_type,
            self.entries.len() + 1
        );
        self.entries.push(resource.clone());
        resource
    }

    /// Drain the log tail-to-head: most recent creation first, oldest last.
    /// The stack is empty afterwards.
    pub fn pop_all(&mut self) -> Vec<Resource> {
        let mut drained = std::mem::take(&mut self.entries);
        drained.reverse();
        drained
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in creation order, without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.entries.iter()
    }
}
