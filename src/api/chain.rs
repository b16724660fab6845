//! Chain capability adapter: connect, account reads, signing, submission.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::error::PluginResult;
use crate::permissions::PermissionKind;

use super::ApiBinding;

/// Ledger access for a plugin. Signing and submission are the highest-risk
/// capabilities in the host; the auto-grant policy never covers them.
pub struct ChainApi {
    binding: Arc<ApiBinding>,
}

impl ChainApi {
    pub(crate) fn new(binding: Arc<ApiBinding>) -> Self {
        Self { binding }
    }

    /// Connects to a named network (e.g. "testnet", "public").
    pub async fn connect(&self, network: &str) -> PluginResult<Value> {
        self.binding
            .call(
                PermissionKind::Chain,
                &["connect"],
                "chain.connect",
                json!({ "network": network }),
            )
            .await
    }

    /// Reads account state.
    pub async fn account(&self, account_id: &str) -> PluginResult<Value> {
        self.binding
            .call(
                PermissionKind::Chain,
                &["read"],
                "chain.account",
                json!({ "account": account_id }),
            )
            .await
    }

    /// Signs a transaction envelope.
    pub async fn sign(&self, envelope: &str) -> PluginResult<Value> {
        self.binding
            .call(
                PermissionKind::Chain,
                &["sign"],
                "chain.sign",
                json!({ "envelope": envelope }),
            )
            .await
    }

    /// Submits a signed transaction envelope.
    pub async fn submit(&self, envelope: &str) -> PluginResult<Value> {
        self.binding
            .call(
                PermissionKind::Chain,
                &["submit"],
                "chain.submit",
                json!({ "envelope": envelope }),
            )
            .await
    }
}

impl std::fmt::Debug for ChainApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainApi")
            .field("plugin", &self.binding.plugin_id())
            .finish()
    }
}
