//! Network capability adapter.
//!
//! Network permissions are scoped by host, so a grant can name specific
//! domains or `"*"`. The scope is derived from the request URL itself;
//! a URL the host cannot parse is rejected before any check runs.

use std::sync::Arc;

use serde_json::{Value, json};
use url::Url;

use crate::error::{PluginError, PluginResult};
use crate::permissions::PermissionKind;

use super::ApiBinding;

pub struct NetworkApi {
    binding: Arc<ApiBinding>,
}

impl NetworkApi {
    pub(crate) fn new(binding: Arc<ApiBinding>) -> Self {
        Self { binding }
    }

    pub async fn get(&self, url: &str) -> PluginResult<Value> {
        self.request("GET", url, None).await
    }

    pub async fn post(&self, url: &str, body: Value) -> PluginResult<Value> {
        self.request("POST", url, Some(body)).await
    }

    /// Performs an arbitrary HTTP request through the sandbox, gated on a
    /// network permission covering the URL's host.
    pub async fn request(&self, method: &str, url: &str, body: Option<Value>) -> PluginResult<Value> {
        let host = self.host_of(url)?;
        self.binding
            .call(
                PermissionKind::Network,
                &[host.as_str()],
                "network.request",
                json!({ "method": method, "url": url, "body": body }),
            )
            .await
    }

    fn host_of(&self, url: &str) -> PluginResult<String> {
        let parsed = Url::parse(url).map_err(|e| PluginError::Sandbox {
            plugin: self.binding.plugin_id().to_string(),
            reason: format!("unparseable request URL '{}': {}", url, e),
        })?;
        parsed
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| PluginError::Sandbox {
                plugin: self.binding.plugin_id().to_string(),
                reason: format!("request URL '{}' has no host", url),
            })
    }
}

impl std::fmt::Debug for NetworkApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkApi")
            .field("plugin", &self.binding.plugin_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{DenyAllPrompt, Permission, PermissionsModel};
    use crate::plugins::{PluginBundle, PluginMetadata, test_support::NoopPlugin};
    use crate::sandbox::{InProcessSandbox, Sandbox};
    use crate::api::PluginApi;

    async fn rig(scope: &[&str]) -> PluginApi {
        let permissions = Arc::new(PermissionsModel::new(Arc::new(DenyAllPrompt)));
        if !scope.is_empty() {
            permissions
                .grant_permission(
                    "weather",
                    Permission::new(PermissionKind::Network, scope.iter().copied(), "net"),
                )
                .unwrap();
        }
        let sandbox = Arc::new(InProcessSandbox::new());
        let bundle = PluginBundle::new(
            PluginMetadata::builder("weather", "1.0.0").build(),
            Arc::new(NoopPlugin),
        );
        sandbox.initialize_plugin("weather", &bundle).await.unwrap();
        PluginApi::new("weather", permissions, sandbox)
    }

    #[tokio::test]
    async fn test_scope_is_request_host() {
        let api = rig(&["api.example.com"]).await;
        assert!(api.network().get("https://api.example.com/v1/forecast").await.is_ok());
        let err = api.network().get("https://evil.example.com/").await.unwrap_err();
        assert!(matches!(err, PluginError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_wildcard_grant_allows_any_host() {
        let api = rig(&["*"]).await;
        assert!(api.network().get("https://anywhere.example.net/x").await.is_ok());
        assert!(api.network().post("https://other.example.org/y", json!({"a": 1})).await.is_ok());
    }

    #[tokio::test]
    async fn test_unparseable_url_rejected() {
        let api = rig(&["*"]).await;
        assert!(api.network().get("not a url").await.is_err());
    }
}
