//! Consent port for interactive permission prompts.
//!
//! The decision mechanism (CLI prompt, UI dialog, policy file) is injected
//! so it stays pluggable and testable without a real user. Hosts that want
//! a bounded wait wrap their prompt future in `tokio::time::timeout` and
//! resolve to `false` on expiry.

use async_trait::async_trait;

use super::Permission;

/// Asks the human operator whether a plugin may hold a permission.
///
/// `false` means declined; a declined prompt never becomes a grant.
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    async fn request_consent(&self, plugin_id: &str, permission: &Permission) -> bool;
}

/// Declines every prompt. The safe default for headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAllPrompt;

#[async_trait]
impl ConsentPrompt for DenyAllPrompt {
    async fn request_consent(&self, plugin_id: &str, permission: &Permission) -> bool {
        tracing::debug!(
            plugin = plugin_id,
            kind = %permission.kind,
            "consent prompt declined (deny-all policy)"
        );
        false
    }
}

/// Accepts every prompt. Only for trusted-plugin test rigs.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllPrompt;

#[async_trait]
impl ConsentPrompt for AllowAllPrompt {
    async fn request_consent(&self, _plugin_id: &str, _permission: &Permission) -> bool {
        true
    }
}
