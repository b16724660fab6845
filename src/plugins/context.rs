//! Per-plugin context created at install time.

use std::sync::Arc;

use crate::api::PluginApi;
use crate::permissions::Permission;
use crate::sandbox::{EventEmitter, PluginStorage};

/// Everything a plugin receives from the host: isolated storage, a scoped
/// event emitter, the permission snapshot it was installed with, and the
/// capability facade bound to its id.
///
/// Created once per install, owned by the manager, and destroyed together
/// with the plugin on uninstall.
pub struct PluginContext {
    plugin_id: String,
    storage: Arc<dyn PluginStorage>,
    events: Arc<dyn EventEmitter>,
    permissions: Vec<Permission>,
    api: PluginApi,
}

impl PluginContext {
    pub(crate) fn new(
        plugin_id: impl Into<String>,
        storage: Arc<dyn PluginStorage>,
        events: Arc<dyn EventEmitter>,
        permissions: Vec<Permission>,
        api: PluginApi,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            storage,
            events,
            permissions,
            api,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn storage(&self) -> &Arc<dyn PluginStorage> {
        &self.storage
    }

    pub fn events(&self) -> &Arc<dyn EventEmitter> {
        &self.events
    }

    /// Permissions held at install time. A snapshot: later grants show up
    /// through the API's live checks, not here.
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn api(&self) -> &PluginApi {
        &self.api
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.plugin_id)
            .field("permissions", &self.permissions.len())
            .finish()
    }
}
