//! The sole authority on whether a plugin may invoke a capability.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

use super::{
    ConsentPrompt, Permission, PermissionKind, PermissionLevel, auto_grant_allows, system_defaults,
};

/// Per-plugin permission state. `allowed` and `denied` are disjoint by
/// invariant: a grant overlapping a denied entry is rejected, and a deny
/// strips overlapping grants. A plugin's row is materialized on first
/// mutation with `allowed` seeded from the system baseline, so deny and
/// revoke can strip baseline scopes like any other grant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginGrants {
    pub allowed: Vec<Permission>,
    pub denied: Vec<Permission>,
}

/// Lossless snapshot of the full permission table.
/// `import_permissions(export_permissions())` reproduces identical
/// `check_permission` results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionExport {
    pub plugins: BTreeMap<String, PluginGrants>,
}

/// Grant/deny/check state machine for capability permissions.
///
/// Every sensitive operation a plugin performs is gated through
/// [`check_permission`](Self::check_permission) before the sandbox is ever
/// invoked.
pub struct PermissionsModel {
    grants: DashMap<String, PluginGrants>,
    levels: DashMap<String, HashMap<PermissionKind, PermissionLevel>>,
    defaults: Vec<Permission>,
    consent: Arc<dyn ConsentPrompt>,
}

impl PermissionsModel {
    /// Creates a model seeded with [`system_defaults`].
    pub fn new(consent: Arc<dyn ConsentPrompt>) -> Self {
        Self::seeded(consent, system_defaults())
    }

    /// Creates a model with an explicit baseline. The seed is a named,
    /// inspectable argument rather than a constructor side effect.
    pub fn seeded(consent: Arc<dyn ConsentPrompt>, defaults: Vec<Permission>) -> Self {
        Self {
            grants: DashMap::new(),
            levels: DashMap::new(),
            defaults,
            consent,
        }
    }

    /// The system-level baseline applied to every plugin.
    pub fn defaults(&self) -> &[Permission] {
        &self.defaults
    }

    /// Install-time gate: every permission must be structurally valid and
    /// must not overlap an already-denied permission for this plugin.
    pub fn validate_permissions(
        &self,
        plugin_id: &str,
        permissions: &[Permission],
    ) -> PluginResult<()> {
        for permission in permissions {
            if !permission.is_well_formed() {
                return Err(PluginError::InvalidPermissions {
                    plugin: plugin_id.to_string(),
                    reason: format!(
                        "malformed {} permission (empty scope or description)",
                        permission.kind
                    ),
                });
            }
            if self.is_denied(plugin_id, permission) {
                return Err(PluginError::InvalidPermissions {
                    plugin: plugin_id.to_string(),
                    reason: format!(
                        "{} {:?} overlaps a denied permission",
                        permission.kind, permission.scope
                    ),
                });
            }
        }
        Ok(())
    }

    /// Whether every element of `scope` is covered for this plugin and
    /// kind. Partial coverage fails the whole check.
    ///
    /// A plugin with no recorded decisions is checked against the system
    /// baseline. Once any mutation has materialized its row, that row is
    /// the sole authority: a denied element fails the check even if the
    /// baseline would have covered it.
    pub fn check_permission(&self, plugin_id: &str, kind: PermissionKind, scope: &[&str]) -> bool {
        match self.grants.get(plugin_id) {
            Some(grants) => scope.iter().all(|element| {
                !grants.denied.iter().any(|p| p.covers(kind, element))
                    && grants.allowed.iter().any(|p| p.covers(kind, element))
            }),
            None => scope
                .iter()
                .all(|element| self.defaults.iter().any(|p| p.covers(kind, element))),
        }
    }

    /// Grants a permission. Idempotent: an already-covered grant is a
    /// no-op. Fails if the permission overlaps a denied entry.
    pub fn grant_permission(&self, plugin_id: &str, permission: Permission) -> PluginResult<()> {
        if !permission.is_well_formed() {
            return Err(PluginError::InvalidPermissions {
                plugin: plugin_id.to_string(),
                reason: format!("malformed {} permission", permission.kind),
            });
        }
        if self.is_denied(plugin_id, &permission) {
            return Err(PluginError::InvalidPermissions {
                plugin: plugin_id.to_string(),
                reason: format!(
                    "{} {:?} overlaps a denied permission",
                    permission.kind, permission.scope
                ),
            });
        }

        let scope_refs: Vec<&str> = permission.scope.iter().map(String::as_str).collect();
        if self.check_permission(plugin_id, permission.kind, &scope_refs) {
            return Ok(());
        }

        tracing::info!(
            plugin = plugin_id,
            kind = %permission.kind,
            scope = ?permission.scope,
            "permission granted"
        );
        self.seeded_row(plugin_id).allowed.push(permission);
        Ok(())
    }

    /// Removes overlapping scope elements from matching grants, leaving
    /// non-overlapping scopes untouched. Wildcard grants are removed
    /// outright when overlapped: a `"*"` entry cannot be narrowed, and
    /// revocation wins. Baseline scopes are revocable too, since the row
    /// starts as a copy of the baseline.
    pub fn revoke_permission(&self, plugin_id: &str, permission: &Permission) {
        let mut entry = self.seeded_row(plugin_id);
        entry.allowed.retain_mut(|granted| {
            if !granted.overlaps(permission) {
                return true;
            }
            if permission.is_unrestricted() || granted.is_unrestricted() {
                return false;
            }
            granted.scope.retain(|s| !permission.scope.contains(s));
            !granted.scope.is_empty()
        });
        tracing::info!(
            plugin = plugin_id,
            kind = %permission.kind,
            scope = ?permission.scope,
            "permission revoked"
        );
    }

    /// Denies a permission and strips any overlapping grants. A denied
    /// permission can never be granted until the table is reset.
    pub fn deny_permission(&self, plugin_id: &str, permission: Permission) {
        self.revoke_permission(plugin_id, &permission);
        let mut entry = self.seeded_row(plugin_id);
        if !entry.denied.iter().any(|d| d.overlaps(&permission)) {
            tracing::warn!(
                plugin = plugin_id,
                kind = %permission.kind,
                scope = ?permission.scope,
                "permission denied"
            );
            entry.denied.push(permission);
        }
    }

    /// Runtime permission request. Denied permissions fail immediately;
    /// low-risk permissions on the auto-grant allowlist are granted
    /// silently; everything else goes through the consent prompt. The
    /// outcome is a plain boolean: plugins routinely ask for capabilities
    /// they will not receive.
    pub async fn request_permission(&self, plugin_id: &str, permission: Permission) -> bool {
        if !permission.is_well_formed() || self.is_denied(plugin_id, &permission) {
            return false;
        }

        let scope_refs: Vec<&str> = permission.scope.iter().map(String::as_str).collect();
        if self.check_permission(plugin_id, permission.kind, &scope_refs) {
            return true;
        }

        if auto_grant_allows(&permission) {
            return self.grant_permission(plugin_id, permission).is_ok();
        }

        if self.consent.request_consent(plugin_id, &permission).await {
            self.grant_permission(plugin_id, permission).is_ok()
        } else {
            tracing::debug!(plugin = plugin_id, "permission prompt declined");
            false
        }
    }

    /// Current level held for a `(plugin, kind)` pair; `Read` is the floor.
    pub fn current_level(&self, plugin_id: &str, kind: PermissionKind) -> PermissionLevel {
        self.levels
            .get(plugin_id)
            .and_then(|m| m.get(&kind).copied())
            .unwrap_or_default()
    }

    /// Upgrade requests must move strictly upward. Sideways and downward
    /// moves are rejected; revocation is the only path down.
    pub fn can_upgrade_permission(
        &self,
        plugin_id: &str,
        kind: PermissionKind,
        target: PermissionLevel,
    ) -> bool {
        target > self.current_level(plugin_id, kind)
    }

    /// Applies a validated upgrade. Returns false when the request is not
    /// strictly higher than the current level.
    pub fn upgrade_permission(
        &self,
        plugin_id: &str,
        kind: PermissionKind,
        target: PermissionLevel,
    ) -> bool {
        if !self.can_upgrade_permission(plugin_id, kind, target) {
            return false;
        }
        self.levels
            .entry(plugin_id.to_string())
            .or_default()
            .insert(kind, target);
        true
    }

    /// Full table snapshot in deterministic order.
    pub fn export_permissions(&self) -> PermissionExport {
        PermissionExport {
            plugins: self
                .grants
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        }
    }

    /// Replaces the table with a previously exported snapshot.
    pub fn import_permissions(&self, export: PermissionExport) {
        self.grants.clear();
        for (plugin, grants) in export.plugins {
            self.grants.insert(plugin, grants);
        }
    }

    /// Clears all plugin-specific state. The system baseline survives; no
    /// plugin-granted network/chain/admin permission does.
    pub fn reset_permissions(&self) {
        self.grants.clear();
        self.levels.clear();
        tracing::info!("permission table reset to system defaults");
    }

    /// Snapshot of everything this plugin currently holds, used to
    /// populate a plugin context at install time. The baseline is part of
    /// the row once one exists, so this never double-counts it.
    pub fn granted_permissions(&self, plugin_id: &str) -> Vec<Permission> {
        match self.grants.get(plugin_id) {
            Some(grants) => grants.allowed.clone(),
            None => self.defaults.clone(),
        }
    }

    fn seeded_row(&self, plugin_id: &str) -> dashmap::mapref::one::RefMut<'_, String, PluginGrants> {
        self.grants
            .entry(plugin_id.to_string())
            .or_insert_with(|| PluginGrants {
                allowed: self.defaults.clone(),
                denied: Vec::new(),
            })
    }

    fn is_denied(&self, plugin_id: &str, permission: &Permission) -> bool {
        self.grants
            .get(plugin_id)
            .is_some_and(|g| g.denied.iter().any(|d| d.overlaps(permission)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::DenyAllPrompt;

    fn model() -> PermissionsModel {
        PermissionsModel::new(Arc::new(DenyAllPrompt))
    }

    fn network(scope: &[&str]) -> Permission {
        Permission::new(PermissionKind::Network, scope.iter().copied(), "net access")
    }

    #[test]
    fn test_defaults_cover_all_plugins() {
        let m = model();
        assert!(m.check_permission("any", PermissionKind::Ui, &["notifications"]));
        assert!(m.check_permission("any", PermissionKind::Storage, &["read", "write"]));
        assert!(m.check_permission("any", PermissionKind::Events, &["listen"]));
        assert!(!m.check_permission("any", PermissionKind::Network, &["read"]));
        assert!(!m.check_permission("any", PermissionKind::Chain, &["sign"]));
    }

    #[test]
    fn test_wildcard_grant_covers_any_scope() {
        let m = model();
        assert!(!m.check_permission("w", PermissionKind::Network, &["api.example.com"]));
        m.grant_permission("w", network(&["*"])).unwrap();
        assert!(m.check_permission("w", PermissionKind::Network, &["api.example.com"]));
        assert!(m.check_permission("w", PermissionKind::Network, &["other.host"]));
    }

    #[test]
    fn test_no_partial_credit() {
        let m = model();
        m.grant_permission("w", network(&["api.example.com"])).unwrap();
        assert!(m.check_permission("w", PermissionKind::Network, &["api.example.com"]));
        assert!(!m.check_permission(
            "w",
            PermissionKind::Network,
            &["api.example.com", "evil.example.com"]
        ));
    }

    #[test]
    fn test_grant_is_idempotent() {
        let m = model();
        m.grant_permission("w", network(&["a"])).unwrap();
        m.grant_permission("w", network(&["a"])).unwrap();
        let export = m.export_permissions();
        let network_entries = export.plugins["w"]
            .allowed
            .iter()
            .filter(|p| p.kind == PermissionKind::Network)
            .count();
        assert_eq!(network_entries, 1);
    }

    #[test]
    fn test_denied_can_never_be_granted() {
        let m = model();
        m.deny_permission("w", network(&["read"]));
        assert!(m.grant_permission("w", network(&["read"])).is_err());
        assert!(!m.check_permission("w", PermissionKind::Network, &["read"]));
    }

    #[test]
    fn test_deny_strips_existing_grant() {
        let m = model();
        m.grant_permission("w", network(&["read"])).unwrap();
        assert!(m.check_permission("w", PermissionKind::Network, &["read"]));
        m.deny_permission("w", network(&["read"]));
        assert!(!m.check_permission("w", PermissionKind::Network, &["read"]));
    }

    #[test]
    fn test_validate_rejects_malformed_and_denied() {
        let m = model();
        let malformed = Permission {
            kind: PermissionKind::Network,
            scope: vec![],
            description: "x".into(),
        };
        assert!(matches!(
            m.validate_permissions("w", std::slice::from_ref(&malformed)),
            Err(PluginError::InvalidPermissions { .. })
        ));

        m.deny_permission("w", network(&["read"]));
        assert!(m.validate_permissions("w", &[network(&["read"])]).is_err());
        assert!(m.validate_permissions("w", &[network(&["write"])]).is_ok());
    }

    #[test]
    fn test_deny_overrides_system_baseline() {
        let m = model();
        let notifications = Permission::new(PermissionKind::Ui, ["notifications"], "notify");
        m.deny_permission("w", notifications.clone());

        assert!(!m.check_permission("w", PermissionKind::Ui, &["notifications"]));
        assert!(m.grant_permission("w", notifications).is_err());
        assert!(!m.check_permission("w", PermissionKind::Ui, &["notifications"]));

        // The rest of the baseline and other plugins are untouched.
        assert!(m.check_permission("w", PermissionKind::Storage, &["read"]));
        assert!(m.check_permission("other", PermissionKind::Ui, &["notifications"]));
    }

    #[test]
    fn test_revoke_strips_baseline_scope() {
        let m = model();
        m.revoke_permission(
            "w",
            &Permission::new(PermissionKind::Storage, ["write"], "no writes"),
        );
        assert!(!m.check_permission("w", PermissionKind::Storage, &["write"]));
        assert!(m.check_permission("w", PermissionKind::Storage, &["read"]));
        assert!(m.check_permission("other", PermissionKind::Storage, &["write"]));
    }

    #[test]
    fn test_revoke_leaves_non_overlapping_scopes() {
        let m = model();
        m.grant_permission("w", network(&["a", "b"])).unwrap();
        m.revoke_permission("w", &network(&["a"]));
        assert!(!m.check_permission("w", PermissionKind::Network, &["a"]));
        assert!(m.check_permission("w", PermissionKind::Network, &["b"]));
    }

    #[test]
    fn test_revoke_removes_wildcard_entirely() {
        let m = model();
        m.grant_permission("w", network(&["*"])).unwrap();
        m.revoke_permission("w", &network(&["a"]));
        assert!(!m.check_permission("w", PermissionKind::Network, &["b"]));
    }

    #[test]
    fn test_auto_grant_skips_prompt() {
        // DenyAllPrompt would refuse, so success proves no prompt fired.
        let m = model();
        let granted = tokio_test::block_on(m.request_permission(
            "w",
            Permission::new(PermissionKind::Events, ["listen"], "listen"),
        ));
        assert!(granted);
    }

    #[tokio::test]
    async fn test_prompt_declined_leaves_no_grant() {
        let m = model();
        let granted = m.request_permission("w", network(&["read"])).await;
        assert!(!granted);
        assert!(!m.check_permission("w", PermissionKind::Network, &["read"]));
    }

    #[tokio::test]
    async fn test_prompt_accepted_grants() {
        use crate::permissions::AllowAllPrompt;
        let m = PermissionsModel::new(Arc::new(AllowAllPrompt));
        assert!(m.request_permission("w", network(&["read"])).await);
        assert!(m.check_permission("w", PermissionKind::Network, &["read"]));
    }

    #[tokio::test]
    async fn test_denied_request_fails_before_prompt() {
        use crate::permissions::AllowAllPrompt;
        let m = PermissionsModel::new(Arc::new(AllowAllPrompt));
        m.deny_permission("w", network(&["read"]));
        assert!(!m.request_permission("w", network(&["read"])).await);
    }

    #[test]
    fn test_upgrade_strictly_upward_only() {
        let m = model();
        assert_eq!(
            m.current_level("w", PermissionKind::Storage),
            PermissionLevel::Read
        );
        assert!(!m.upgrade_permission("w", PermissionKind::Storage, PermissionLevel::Read));
        assert!(m.upgrade_permission("w", PermissionKind::Storage, PermissionLevel::Write));
        assert!(!m.upgrade_permission("w", PermissionKind::Storage, PermissionLevel::Write));
        assert!(m.upgrade_permission("w", PermissionKind::Storage, PermissionLevel::Admin));
        assert!(!m.can_upgrade_permission("w", PermissionKind::Storage, PermissionLevel::Execute));
    }

    #[test]
    fn test_export_import_round_trip() {
        let m = model();
        m.grant_permission("a", network(&["host-a"])).unwrap();
        m.grant_permission(
            "b",
            Permission::new(PermissionKind::Chain, ["read"], "balances"),
        )
        .unwrap();
        m.deny_permission("b", Permission::new(PermissionKind::Chain, ["sign"], "sign"));

        let export = m.export_permissions();
        let restored = model();
        restored.import_permissions(export);

        assert!(restored.check_permission("a", PermissionKind::Network, &["host-a"]));
        assert!(!restored.check_permission("a", PermissionKind::Network, &["other"]));
        assert!(restored.check_permission("b", PermissionKind::Chain, &["read"]));
        assert!(restored.grant_permission("b", Permission::new(PermissionKind::Chain, ["sign"], "s")).is_err());
    }

    #[test]
    fn test_export_is_serde_lossless() {
        let m = model();
        m.grant_permission("a", network(&["host-a"])).unwrap();
        let export = m.export_permissions();
        let json = serde_json::to_string(&export).unwrap();
        let back: PermissionExport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.plugins["a"].allowed, export.plugins["a"].allowed);
    }

    #[test]
    fn test_reset_restores_only_defaults() {
        let m = model();
        m.grant_permission("w", network(&["*"])).unwrap();
        m.upgrade_permission("w", PermissionKind::Storage, PermissionLevel::Admin);
        m.reset_permissions();

        assert!(!m.check_permission("w", PermissionKind::Network, &["anything"]));
        assert!(m.check_permission("w", PermissionKind::Ui, &["notifications"]));
        assert_eq!(
            m.current_level("w", PermissionKind::Storage),
            PermissionLevel::Read
        );
    }

    #[test]
    fn test_granted_snapshot_includes_baseline_and_grants() {
        let m = model();
        m.grant_permission("w", network(&["api.example.com"])).unwrap();
        let snapshot = m.granted_permissions("w");
        assert!(snapshot.iter().any(|p| p.kind == PermissionKind::Ui));
        assert!(snapshot.iter().any(|p| p.kind == PermissionKind::Network));
    }
}
