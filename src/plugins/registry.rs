//! Installed-plugin registry.
//!
//! A single map owns every piece of per-plugin state (metadata, instance,
//! context, lifecycle state), so the "plugin present iff context present"
//! invariant holds structurally instead of by caller discipline.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{PluginError, PluginResult};

use super::{Plugin, PluginContext, PluginMetadata};

/// Lifecycle state of an installed plugin. Uninstalled plugins are simply
/// absent from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Installing,
    Inactive,
    Active,
    Uninstalling,
}

pub(crate) struct PluginEntry {
    pub metadata: PluginMetadata,
    pub plugin: Arc<dyn Plugin>,
    pub context: Arc<PluginContext>,
    pub state: PluginState,
}

#[derive(Default)]
pub struct PluginRegistry {
    entries: RwLock<HashMap<String, PluginEntry>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, plugin_id: &str) -> bool {
        self.entries.read().await.contains_key(plugin_id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn metadata(&self, plugin_id: &str) -> Option<PluginMetadata> {
        self.entries
            .read()
            .await
            .get(plugin_id)
            .map(|e| e.metadata.clone())
    }

    pub async fn state(&self, plugin_id: &str) -> Option<PluginState> {
        self.entries.read().await.get(plugin_id).map(|e| e.state)
    }

    pub async fn list(&self) -> Vec<PluginMetadata> {
        let mut all: Vec<PluginMetadata> = self
            .entries
            .read()
            .await
            .values()
            .map(|e| e.metadata.clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub(crate) async fn plugin(&self, plugin_id: &str) -> Option<Arc<dyn Plugin>> {
        self.entries
            .read()
            .await
            .get(plugin_id)
            .map(|e| e.plugin.clone())
    }

    pub async fn context(&self, plugin_id: &str) -> Option<Arc<PluginContext>> {
        self.entries
            .read()
            .await
            .get(plugin_id)
            .map(|e| e.context.clone())
    }

    pub(crate) async fn insert(&self, entry: PluginEntry) -> PluginResult<()> {
        let mut entries = self.entries.write().await;
        let id = entry.metadata.id.clone();
        if entries.contains_key(&id) {
            return Err(PluginError::AlreadyInstalled { plugin: id });
        }
        entries.insert(id, entry);
        Ok(())
    }

    pub(crate) async fn remove(&self, plugin_id: &str) -> Option<PluginEntry> {
        self.entries.write().await.remove(plugin_id)
    }

    pub(crate) async fn set_state(&self, plugin_id: &str, state: PluginState) -> PluginResult<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(plugin_id)
            .ok_or_else(|| PluginError::NotInstalled {
                plugin: plugin_id.to_string(),
            })?;
        entry.state = state;
        Ok(())
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry").finish_non_exhaustive()
    }
}
