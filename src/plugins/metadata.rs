//! Plugin identity and declared contract.

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};
use crate::permissions::Permission;
use crate::version::Version;

/// Immutable description of a plugin: identity, requested permissions, and
/// the host version range it supports. Replaced wholesale on update, never
/// mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    pub entry_point: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_version_constraint: Option<String>,
}

impl PluginMetadata {
    pub fn builder(id: impl Into<String>, version: impl Into<String>) -> PluginMetadataBuilder {
        PluginMetadataBuilder::new(id, version)
    }

    /// Install-time contract check. Runs before any side effect.
    pub fn validate(&self) -> PluginResult<()> {
        let fail = |reason: &str| {
            Err(PluginError::InvalidMetadata {
                plugin: self.id.clone(),
                reason: reason.to_string(),
            })
        };
        if self.id.trim().is_empty() {
            return fail("missing plugin id");
        }
        if self.name.trim().is_empty() {
            return fail("missing plugin name");
        }
        if self.entry_point.trim().is_empty() {
            return fail("missing entry point");
        }
        if !Version::is_valid(&self.version) {
            return Err(PluginError::InvalidMetadata {
                plugin: self.id.clone(),
                reason: format!("'{}' is not a valid semantic version", self.version),
            });
        }
        Ok(())
    }
}

/// Builder for [`PluginMetadata`]; name defaults to the id and the entry
/// point to `"main"`.
#[derive(Debug, Clone)]
pub struct PluginMetadataBuilder {
    metadata: PluginMetadata,
}

impl PluginMetadataBuilder {
    fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            metadata: PluginMetadata {
                name: id.clone(),
                id,
                version: version.into(),
                description: String::new(),
                author: String::new(),
                permissions: Vec::new(),
                dependencies: Vec::new(),
                entry_point: "main".into(),
                host_version_constraint: None,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.metadata.author = author.into();
        self
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.metadata.permissions.push(permission);
        self
    }

    pub fn dependency(mut self, plugin_id: impl Into<String>) -> Self {
        self.metadata.dependencies.push(plugin_id.into());
        self
    }

    pub fn entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.metadata.entry_point = entry_point.into();
        self
    }

    pub fn host_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.metadata.host_version_constraint = Some(constraint.into());
        self
    }

    pub fn build(self) -> PluginMetadata {
        self.metadata
    }
}
