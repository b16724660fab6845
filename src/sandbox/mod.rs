//! Isolation boundary contract.
//!
//! The host never trusts plugin code directly: every effect flows through
//! a [`Sandbox`], which executes plugin code in isolation and mediates its
//! calls onto host primitives. This module defines only the contract; the
//! concrete isolation mechanism (process, WASM, or the in-process
//! reference implementation here) is an embedder decision.
//!
//! `execute_with_permission` is invoked only after the permission gate in
//! [`PermissionsModel`](crate::permissions::PermissionsModel) has passed.
//! Implementations are expected to re-validate what they can (defense in
//! depth), but they are never the sole enforcement point.

mod memory;

pub use memory::{InProcessSandbox, RecordedCall};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PluginResult;
use crate::permissions::PermissionKind;
use crate::plugins::{Plugin, PluginBundle};

/// Async key-value store scoped to a single plugin id. Contents are never
/// visible to other ids.
#[async_trait]
pub trait PluginStorage: Send + Sync {
    async fn get(&self, key: &str) -> PluginResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> PluginResult<()>;

    async fn delete(&self, key: &str) -> PluginResult<()>;

    async fn clear(&self) -> PluginResult<()>;
}

/// Identifier returned by [`EventEmitter::on`], used to detach a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub type EventListener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Event bus scoped to a single plugin id.
pub trait EventEmitter: Send + Sync {
    fn on(&self, event: &str, listener: EventListener) -> ListenerId;

    fn off(&self, event: &str, listener: ListenerId);

    fn emit(&self, event: &str, payload: Value);
}

/// The isolation boundary consumed by the plugin manager.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Provisions isolated resources for a plugin before it is loaded.
    async fn initialize_plugin(&self, plugin_id: &str, bundle: &PluginBundle) -> PluginResult<()>;

    /// Loads the bundle's executable unit and returns the live plugin.
    async fn execute_plugin(&self, bundle: &PluginBundle) -> PluginResult<Arc<dyn Plugin>>;

    /// Tears down everything provisioned for a plugin id. Must be safe to
    /// call after a partial initialization.
    async fn cleanup_plugin(&self, plugin_id: &str) -> PluginResult<()>;

    /// Hands out the plugin's isolated storage.
    fn create_storage(&self, plugin_id: &str) -> Arc<dyn PluginStorage>;

    /// Hands out the plugin's scoped event emitter.
    fn create_event_emitter(&self, plugin_id: &str) -> Arc<dyn EventEmitter>;

    /// Performs a mediated host call on behalf of a plugin. Only reached
    /// after the permission gate has passed.
    async fn execute_with_permission(
        &self,
        plugin_id: &str,
        kind: PermissionKind,
        method: &str,
        args: Value,
    ) -> PluginResult<Value>;
}
