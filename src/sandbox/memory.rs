//! In-process reference sandbox.
//!
//! Runs plugins on the host's own runtime with per-id in-memory storage
//! and event buses. There is no code isolation here; it exists for test
//! rigs and for embedders running trusted first-party plugins. Mediated
//! host calls are recorded and echoed back so callers can observe exactly
//! what crossed the boundary.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::error::{PluginError, PluginResult};
use crate::permissions::PermissionKind;
use crate::plugins::{Plugin, PluginBundle};

use super::{EventEmitter, EventListener, ListenerId, PluginStorage, Sandbox};

/// One mediated host call that crossed the boundary.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub plugin_id: String,
    pub kind: PermissionKind,
    pub method: String,
    pub args: Value,
}

#[derive(Default)]
struct MemoryStorage {
    entries: RwLock<HashMap<String, Value>>,
}

#[async_trait]
impl PluginStorage for MemoryStorage {
    async fn get(&self, key: &str) -> PluginResult<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> PluginResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> PluginResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> PluginResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
struct MemoryEventEmitter {
    listeners: std::sync::Mutex<HashMap<String, Vec<(u64, EventListener)>>>,
    next_id: AtomicU64,
}

impl EventEmitter for MemoryEventEmitter {
    fn on(&self, event: &str, listener: EventListener) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("emitter lock poisoned")
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        ListenerId(id)
    }

    fn off(&self, event: &str, listener: ListenerId) {
        if let Some(entries) = self
            .listeners
            .lock()
            .expect("emitter lock poisoned")
            .get_mut(event)
        {
            entries.retain(|(id, _)| *id != listener.0);
        }
    }

    fn emit(&self, event: &str, payload: Value) {
        // Snapshot so listeners can re-enter on/off without deadlocking.
        let snapshot: Vec<EventListener> = self
            .listeners
            .lock()
            .expect("emitter lock poisoned")
            .get(event)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();
        for listener in snapshot {
            listener(&payload);
        }
    }
}

/// In-memory [`Sandbox`] implementation.
#[derive(Default)]
pub struct InProcessSandbox {
    storages: DashMap<String, Arc<MemoryStorage>>,
    emitters: DashMap<String, Arc<MemoryEventEmitter>>,
    initialized: std::sync::Mutex<HashSet<String>>,
    calls: std::sync::Mutex<Vec<RecordedCall>>,
}

impl InProcessSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugin ids currently holding sandbox resources. Empty after every
    /// plugin has been cleaned up; tests assert on this to catch orphaned
    /// state from failed installs.
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .initialized
            .lock()
            .expect("sandbox lock poisoned")
            .iter()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Snapshot of every mediated host call so far.
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("sandbox lock poisoned").clone()
    }
}

#[async_trait]
impl Sandbox for InProcessSandbox {
    async fn initialize_plugin(&self, plugin_id: &str, _bundle: &PluginBundle) -> PluginResult<()> {
        tracing::debug!(plugin = plugin_id, "sandbox initialize");
        self.initialized
            .lock()
            .expect("sandbox lock poisoned")
            .insert(plugin_id.to_string());
        Ok(())
    }

    async fn execute_plugin(&self, bundle: &PluginBundle) -> PluginResult<Arc<dyn Plugin>> {
        Ok(bundle.plugin.clone())
    }

    async fn cleanup_plugin(&self, plugin_id: &str) -> PluginResult<()> {
        tracing::debug!(plugin = plugin_id, "sandbox cleanup");
        self.storages.remove(plugin_id);
        self.emitters.remove(plugin_id);
        self.initialized
            .lock()
            .expect("sandbox lock poisoned")
            .remove(plugin_id);
        Ok(())
    }

    fn create_storage(&self, plugin_id: &str) -> Arc<dyn PluginStorage> {
        self.storages
            .entry(plugin_id.to_string())
            .or_default()
            .clone()
    }

    fn create_event_emitter(&self, plugin_id: &str) -> Arc<dyn EventEmitter> {
        self.emitters
            .entry(plugin_id.to_string())
            .or_default()
            .clone()
    }

    async fn execute_with_permission(
        &self,
        plugin_id: &str,
        kind: PermissionKind,
        method: &str,
        args: Value,
    ) -> PluginResult<Value> {
        // Defense in depth: the permission gate already ran, but a call
        // for a plugin this sandbox never initialized is a contract
        // violation worth failing loudly on.
        let known = self
            .initialized
            .lock()
            .expect("sandbox lock poisoned")
            .contains(plugin_id);
        if !known {
            return Err(PluginError::Sandbox {
                plugin: plugin_id.to_string(),
                reason: format!("host call '{}' for uninitialized plugin", method),
            });
        }

        self.calls
            .lock()
            .expect("sandbox lock poisoned")
            .push(RecordedCall {
                plugin_id: plugin_id.to_string(),
                kind,
                method: method.to_string(),
                args: args.clone(),
            });
        Ok(json!({ "method": method, "args": args }))
    }
}
