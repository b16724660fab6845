//! Mediated capability surface handed to plugins.
//!
//! One concrete adapter per capability family, each bound to a plugin id.
//! Every method runs the same sequence: check the permission against the
//! [`PermissionsModel`], and only then delegate the effect to
//! [`Sandbox::execute_with_permission`]. A denied permission is a typed
//! rejection raised before the sandbox is ever invoked — the sandbox is
//! defense in depth, never the sole gate.

mod chain;
mod network;
mod ui;

pub use chain::ChainApi;
pub use network::NetworkApi;
pub use ui::UiApi;

use std::sync::Arc;

use serde_json::Value;

use crate::error::{PluginError, PluginResult};
use crate::permissions::{PermissionKind, PermissionsModel};
use crate::sandbox::Sandbox;

/// Shared check-then-delegate core behind every adapter.
pub(crate) struct ApiBinding {
    plugin_id: String,
    permissions: Arc<PermissionsModel>,
    sandbox: Arc<dyn Sandbox>,
}

impl ApiBinding {
    pub(crate) async fn call(
        &self,
        kind: PermissionKind,
        scope: &[&str],
        method: &str,
        args: Value,
    ) -> PluginResult<Value> {
        if !self.permissions.check_permission(&self.plugin_id, kind, scope) {
            tracing::debug!(
                plugin = %self.plugin_id,
                %kind,
                ?scope,
                method,
                "capability call rejected"
            );
            return Err(PluginError::PermissionDenied {
                plugin: self.plugin_id.clone(),
                kind: kind.as_str().to_string(),
                scope: scope.iter().map(|s| s.to_string()).collect(),
            });
        }
        self.sandbox
            .execute_with_permission(&self.plugin_id, kind, method, args)
            .await
    }

    pub(crate) fn plugin_id(&self) -> &str {
        &self.plugin_id
    }
}

/// Capability facade bound to one plugin id. Every call implicitly carries
/// the plugin's identity for permission checks.
pub struct PluginApi {
    chain: ChainApi,
    ui: UiApi,
    network: NetworkApi,
}

impl PluginApi {
    pub fn new(
        plugin_id: impl Into<String>,
        permissions: Arc<PermissionsModel>,
        sandbox: Arc<dyn Sandbox>,
    ) -> Self {
        let binding = Arc::new(ApiBinding {
            plugin_id: plugin_id.into(),
            permissions,
            sandbox,
        });
        Self {
            chain: ChainApi::new(binding.clone()),
            ui: UiApi::new(binding.clone()),
            network: NetworkApi::new(binding),
        }
    }

    pub fn chain(&self) -> &ChainApi {
        &self.chain
    }

    pub fn ui(&self) -> &UiApi {
        &self.ui
    }

    pub fn network(&self) -> &NetworkApi {
        &self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{DenyAllPrompt, Permission};
    use crate::plugins::PluginMetadata;
    use crate::sandbox::InProcessSandbox;

    async fn rig(grant: Option<Permission>) -> (PluginApi, Arc<InProcessSandbox>) {
        let permissions = Arc::new(PermissionsModel::new(Arc::new(DenyAllPrompt)));
        if let Some(p) = grant {
            permissions.grant_permission("weather", p).unwrap();
        }
        let sandbox = Arc::new(InProcessSandbox::new());
        let bundle = crate::plugins::PluginBundle::new(
            PluginMetadata::builder("weather", "1.0.0").build(),
            Arc::new(crate::plugins::test_support::NoopPlugin),
        );
        sandbox.initialize_plugin("weather", &bundle).await.unwrap();
        (
            PluginApi::new("weather", permissions, sandbox.clone()),
            sandbox,
        )
    }

    #[tokio::test]
    async fn test_denied_call_never_reaches_sandbox() {
        let (api, sandbox) = rig(None).await;
        let err = api.chain().sign("AAAA...").await.unwrap_err();
        assert!(matches!(err, PluginError::PermissionDenied { .. }));
        assert!(sandbox.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn test_granted_call_delegates() {
        let (api, sandbox) = rig(Some(Permission::new(
            crate::permissions::PermissionKind::Chain,
            ["sign"],
            "sign transactions",
        )))
        .await;

        let out = api.chain().sign("AAAA...").await.unwrap();
        assert_eq!(out["method"], "chain.sign");
        let calls = sandbox.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].plugin_id, "weather");
    }

    #[tokio::test]
    async fn test_default_ui_notification_allowed() {
        let (api, _) = rig(None).await;
        assert!(api.ui().notify("hello").await.is_ok());
        // Modal is not part of the system baseline.
        assert!(api.ui().modal("t", "b").await.is_err());
    }
}
