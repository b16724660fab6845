//! Capability permission model for plugins.
//!
//! A permission is a `(kind, scope)` pair authorizing a class of host
//! operation. Permissions are compared by kind and scope coverage, never
//! by identity; the scope element `"*"` means unrestricted within the
//! kind.

mod consent;
mod model;

pub use consent::{AllowAllPrompt, ConsentPrompt, DenyAllPrompt};
pub use model::{PermissionExport, PermissionsModel, PluginGrants};

use serde::{Deserialize, Serialize};

/// Closed set of capability families a plugin may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Network,
    Storage,
    Filesystem,
    Chain,
    Ui,
    Events,
}

impl PermissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Filesystem => "filesystem",
            Self::Chain => "chain",
            Self::Ui => "ui",
            Self::Events => "events",
        }
    }
}

impl std::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access level used only for upgrade requests. The only way down is
/// revocation; this ordering never grants anything by itself.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    Read,
    Write,
    Execute,
    Admin,
}

/// A capability request: kind, narrowing scope, and a human-readable
/// justification shown in consent prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "type")]
    pub kind: PermissionKind,
    pub scope: Vec<String>,
    pub description: String,
}

impl Permission {
    pub fn new(
        kind: PermissionKind,
        scope: impl IntoIterator<Item = impl Into<String>>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            scope: scope.into_iter().map(Into::into).collect(),
            description: description.into(),
        }
    }

    /// Structural validity: non-empty scope of non-empty elements and a
    /// non-empty description.
    pub fn is_well_formed(&self) -> bool {
        !self.scope.is_empty()
            && self.scope.iter().all(|s| !s.trim().is_empty())
            && !self.description.trim().is_empty()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.scope.iter().any(|s| s == "*")
    }

    /// Whether this permission covers a single requested scope element of
    /// the given kind.
    pub fn covers(&self, kind: PermissionKind, scope_element: &str) -> bool {
        self.kind == kind
            && (self.is_unrestricted() || self.scope.iter().any(|s| s == scope_element))
    }

    /// Whether two permissions overlap: same kind and at least one shared
    /// scope element, with `"*"` overlapping everything.
    pub fn overlaps(&self, other: &Permission) -> bool {
        self.kind == other.kind
            && (self.is_unrestricted()
                || other.is_unrestricted()
                || self.scope.iter().any(|s| other.scope.contains(s)))
    }
}

/// Fixed system-level baseline every plugin holds: UI notifications,
/// plugin-local storage, and the scoped event bus. Seeded explicitly at
/// model creation and restored by `reset_permissions`; never includes
/// network, filesystem, chain, or admin scope.
pub fn system_defaults() -> Vec<Permission> {
    vec![
        Permission::new(
            PermissionKind::Ui,
            ["notifications"],
            "Show notifications to the user",
        ),
        Permission::new(
            PermissionKind::Storage,
            ["read", "write"],
            "Read and write plugin-local storage",
        ),
        Permission::new(
            PermissionKind::Events,
            ["listen", "emit"],
            "Listen to and emit plugin-scoped events",
        ),
    ]
}

/// Auto-grant allowlist: low-risk `(kind, scope)` combinations granted
/// without a prompt. Everything else needs interactive confirmation.
pub fn auto_grant_allows(permission: &Permission) -> bool {
    let allowed: &[&str] = match permission.kind {
        PermissionKind::Ui => &["notifications"],
        PermissionKind::Storage => &["read", "write"],
        PermissionKind::Events => &["listen", "emit"],
        PermissionKind::Network | PermissionKind::Filesystem | PermissionKind::Chain => {
            return false;
        }
    };
    permission
        .scope
        .iter()
        .all(|s| allowed.contains(&s.as_str()))
}
