//! The behavioral plugin contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PluginResult;

use super::{PluginContext, PluginMetadata};

/// A loaded plugin instance. At most one exists per installed id.
///
/// `initialize` is required; the remaining hooks are optional — the
/// default no-ops make a plugin without an `activate` always-ready.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called once at install time with the plugin's context. The context
    /// lives for the plugin's entire installed lifetime.
    async fn initialize(&self, context: &PluginContext) -> PluginResult<()>;

    async fn activate(&self) -> PluginResult<()> {
        Ok(())
    }

    async fn deactivate(&self) -> PluginResult<()> {
        Ok(())
    }

    /// Final teardown before sandbox cleanup. Failures here never block
    /// unregistration.
    async fn destroy(&self) -> PluginResult<()> {
        Ok(())
    }
}

/// Install-time unit: metadata plus the executable entity, as supplied by
/// the catalog. The sandbox loads the executable half via
/// [`Sandbox::execute_plugin`](crate::sandbox::Sandbox::execute_plugin).
#[derive(Clone)]
pub struct PluginBundle {
    pub metadata: PluginMetadata,
    pub plugin: Arc<dyn Plugin>,
}

impl PluginBundle {
    pub fn new(metadata: PluginMetadata, plugin: Arc<dyn Plugin>) -> Self {
        Self { metadata, plugin }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}

impl std::fmt::Debug for PluginBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginBundle")
            .field("id", &self.metadata.id)
            .field("version", &self.metadata.version)
            .finish()
    }
}
