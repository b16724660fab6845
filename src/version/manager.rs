//! Host-compatibility and update-eligibility decisions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::{PluginError, PluginResult};
use crate::plugins::PluginMetadata;

use super::{Version, VersionConstraint};

/// Remote registry port queried for update metadata. The concrete transport
/// (marketplace HTTP API, local mirror) is the embedder's concern.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn latest_version(&self, plugin_id: &str) -> PluginResult<Version>;

    async fn security_updates(&self, plugin_id: &str) -> PluginResult<Vec<String>>;
}

/// Cached result of a remote update lookup.
#[derive(Debug, Clone)]
pub struct UpdateInfo {
    pub plugin_id: String,
    pub latest_version: Version,
    pub security_updates: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl UpdateInfo {
    pub fn has_update(&self, current: &Version) -> bool {
        self.latest_version.compare(current) == std::cmp::Ordering::Greater
    }

    pub fn has_security_update(&self) -> bool {
        !self.security_updates.is_empty()
    }
}

/// Update gate configuration.
///
/// Major version changes are always rejected; `max_minor_jump` bounds how
/// far the minor component may advance in a single update (default 1, the
/// conservative "no breaking jump" policy).
#[derive(Debug, Clone, Copy)]
pub struct UpdatePolicy {
    pub max_minor_jump: u64,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self { max_minor_jump: 1 }
    }
}

/// Decides host compatibility and update eligibility. Versions are never
/// compared lexicographically; everything goes through [`Version`].
pub struct VersionManager {
    host_version: Version,
    policy: UpdatePolicy,
    source: Option<Arc<dyn UpdateSource>>,
    cache: DashMap<String, UpdateInfo>,
}

impl VersionManager {
    pub fn new(host_version: Version) -> Self {
        Self {
            host_version,
            policy: UpdatePolicy::default(),
            source: None,
            cache: DashMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: UpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_update_source(mut self, source: Arc<dyn UpdateSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn host_version(&self) -> &Version {
        &self.host_version
    }

    /// Evaluates the metadata's declared host constraint against the host
    /// version. No declared constraint means open compatibility. A
    /// malformed constraint is an error, never a silent pass.
    pub fn check_compatibility(&self, metadata: &PluginMetadata) -> PluginResult<bool> {
        let Some(raw) = metadata.host_version_constraint.as_deref() else {
            return Ok(true);
        };
        let constraint =
            VersionConstraint::parse(raw).map_err(|e| PluginError::IncompatibleVersion {
                plugin: metadata.id.clone(),
                reason: format!("malformed host constraint '{}': {}", raw, e),
            })?;
        Ok(constraint.matches(&self.host_version))
    }

    /// Whether `candidate` is an acceptable update over `current`.
    ///
    /// Requires a strictly newer version, host compatibility, an unchanged
    /// major, and a minor advance within the policy tolerance.
    pub fn can_update(
        &self,
        current: &PluginMetadata,
        candidate: &PluginMetadata,
    ) -> PluginResult<bool> {
        let from = Version::parse(&current.version)?;
        let to = Version::parse(&candidate.version)?;

        if to.compare(&from) != std::cmp::Ordering::Greater {
            return Ok(false);
        }
        if !self.check_compatibility(candidate)? {
            return Ok(false);
        }
        if to.major != from.major {
            return Ok(false);
        }
        if to.minor > from.minor + self.policy.max_minor_jump {
            return Ok(false);
        }
        Ok(true)
    }

    /// Queries the configured update source for the latest version and
    /// outstanding security updates. Results are cached per plugin id for
    /// the process lifetime; `Ok(None)` means no source is configured.
    pub async fn check_for_updates(&self, plugin_id: &str) -> PluginResult<Option<UpdateInfo>> {
        if let Some(info) = self.cache.get(plugin_id) {
            return Ok(Some(info.clone()));
        }
        let Some(source) = &self.source else {
            return Ok(None);
        };

        let (latest_version, security_updates) = futures::future::try_join(
            source.latest_version(plugin_id),
            source.security_updates(plugin_id),
        )
        .await?;
        let info = UpdateInfo {
            plugin_id: plugin_id.to_string(),
            latest_version,
            security_updates,
            checked_at: Utc::now(),
        };
        tracing::debug!(
            plugin = plugin_id,
            latest = %info.latest_version,
            security = info.security_updates.len(),
            "update check completed"
        );
        self.cache.insert(plugin_id.to_string(), info.clone());
        Ok(Some(info))
    }

    /// Drops every cached update lookup.
    pub fn clear_version_cache(&self) {
        self.cache.clear();
    }

    /// Drops the cached lookup for a single plugin id.
    pub fn clear_cache_for(&self, plugin_id: &str) {
        self.cache.remove(plugin_id);
    }
}
