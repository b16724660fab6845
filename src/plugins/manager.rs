//! Plugin lifecycle orchestration.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::api::PluginApi;
use crate::error::{PluginError, PluginResult};
use crate::permissions::{Permission, PermissionsModel};
use crate::sandbox::Sandbox;
use crate::version::VersionManager;

use super::registry::PluginEntry;
use super::{PluginBundle, PluginContext, PluginMetadata, PluginRegistry, PluginState};

/// Entry point of the plugin subsystem.
///
/// Lifecycle operations on the same plugin id are serialized through a
/// per-id lock; operations on different ids proceed concurrently. No
/// operation is retried automatically — a failed install, update, or
/// permission check is terminal for that call.
pub struct PluginManager {
    registry: PluginRegistry,
    permissions: Arc<PermissionsModel>,
    versions: Arc<VersionManager>,
    sandbox: Arc<dyn Sandbox>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PluginManager {
    pub fn new(
        permissions: Arc<PermissionsModel>,
        versions: Arc<VersionManager>,
        sandbox: Arc<dyn Sandbox>,
    ) -> Self {
        Self {
            registry: PluginRegistry::new(),
            permissions,
            versions,
            sandbox,
            locks: DashMap::new(),
        }
    }

    pub fn permissions(&self) -> &Arc<PermissionsModel> {
        &self.permissions
    }

    pub fn versions(&self) -> &Arc<VersionManager> {
        &self.versions
    }

    pub async fn get_plugin(&self, plugin_id: &str) -> Option<PluginMetadata> {
        self.registry.metadata(plugin_id).await
    }

    pub async fn plugin_state(&self, plugin_id: &str) -> Option<PluginState> {
        self.registry.state(plugin_id).await
    }

    pub async fn plugin_context(&self, plugin_id: &str) -> Option<Arc<PluginContext>> {
        self.registry.context(plugin_id).await
    }

    pub async fn list_plugins(&self) -> Vec<PluginMetadata> {
        self.registry.list().await
    }

    pub async fn plugin_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn is_installed(&self, plugin_id: &str) -> bool {
        self.registry.contains(plugin_id).await
    }

    /// Installs a plugin bundle.
    ///
    /// Gates run in order before any side effect: metadata validation,
    /// duplicate id, permission validation, host compatibility. After
    /// sandbox initialization every failure path cleans the sandbox up
    /// again, so no orphaned state survives a failed install.
    pub async fn install_plugin(&self, bundle: PluginBundle) -> PluginResult<()> {
        let lock = self.lock_for(bundle.id());
        let _guard = lock.lock().await;
        self.install_locked(bundle).await
    }

    /// Uninstalls a plugin: deactivate, destroy, sandbox cleanup, then
    /// unregistration. Hook failures never abort the teardown; the first
    /// one is surfaced after unregistration completes.
    pub async fn uninstall_plugin(&self, plugin_id: &str) -> PluginResult<()> {
        let lock = self.lock_for(plugin_id);
        let result = {
            let _guard = lock.lock().await;
            self.uninstall_locked(plugin_id).await
        };
        drop(lock);
        // Retire the id's lock entry once no other caller holds it, so a
        // host cycling many plugin ids does not accumulate stale locks.
        // The shard lock makes the refcount check race-free against
        // concurrent `lock_for` callers.
        self.locks
            .remove_if(plugin_id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Invokes the plugin's activate hook. A plugin without one is
    /// always-ready (the default hook is a no-op).
    pub async fn activate_plugin(&self, plugin_id: &str) -> PluginResult<()> {
        let lock = self.lock_for(plugin_id);
        let _guard = lock.lock().await;
        let plugin =
            self.registry
                .plugin(plugin_id)
                .await
                .ok_or_else(|| PluginError::NotInstalled {
                    plugin: plugin_id.to_string(),
                })?;
        plugin.activate().await?;
        self.registry.set_state(plugin_id, PluginState::Active).await
    }

    pub async fn deactivate_plugin(&self, plugin_id: &str) -> PluginResult<()> {
        let lock = self.lock_for(plugin_id);
        let _guard = lock.lock().await;
        let plugin =
            self.registry
                .plugin(plugin_id)
                .await
                .ok_or_else(|| PluginError::NotInstalled {
                    plugin: plugin_id.to_string(),
                })?;
        plugin.deactivate().await?;
        self.registry
            .set_state(plugin_id, PluginState::Inactive)
            .await
    }

    /// Replaces an installed plugin with a newer bundle: uninstall of the
    /// old version followed by install of the new, under one per-id lock
    /// so no caller observes a torn state.
    ///
    /// There is no automatic rollback — the old sandbox state is already
    /// torn down when the new install runs, so a failed install leaves the
    /// id uninstalled (at-most-once semantics).
    pub async fn update_plugin(&self, plugin_id: &str, bundle: PluginBundle) -> PluginResult<()> {
        let lock = self.lock_for(plugin_id);
        let _guard = lock.lock().await;

        let current =
            self.registry
                .metadata(plugin_id)
                .await
                .ok_or_else(|| PluginError::NotInstalled {
                    plugin: plugin_id.to_string(),
                })?;

        if bundle.metadata.id != plugin_id {
            return Err(PluginError::InvalidUpdate {
                plugin: plugin_id.to_string(),
                from: current.version,
                to: bundle.metadata.version.clone(),
                reason: format!("bundle id '{}' does not match", bundle.metadata.id),
            });
        }
        if !self.versions.can_update(&current, &bundle.metadata)? {
            return Err(PluginError::InvalidUpdate {
                plugin: plugin_id.to_string(),
                from: current.version,
                to: bundle.metadata.version.clone(),
                reason: "update policy rejected the candidate version".into(),
            });
        }

        if let Err(err) = self.uninstall_locked(plugin_id).await {
            // Teardown always completes unregistration; a hook failure in
            // the old version must not block the new one.
            tracing::warn!(plugin = plugin_id, error = %err, "old version teardown reported an error during update");
        }

        self.install_locked(bundle).await?;
        self.versions.clear_cache_for(plugin_id);
        Ok(())
    }

    /// Runtime permission request on behalf of an installed plugin. The
    /// outcome is a boolean — a declined prompt is a normal result, not an
    /// error.
    pub async fn request_permission(
        &self,
        plugin_id: &str,
        permission: Permission,
    ) -> PluginResult<bool> {
        if !self.registry.contains(plugin_id).await {
            return Err(PluginError::NotInstalled {
                plugin: plugin_id.to_string(),
            });
        }
        Ok(self
            .permissions
            .request_permission(plugin_id, permission)
            .await)
    }

    fn lock_for(&self, plugin_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(plugin_id.to_string())
            .or_default()
            .clone()
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.len()
    }

    async fn install_locked(&self, bundle: PluginBundle) -> PluginResult<()> {
        let id = bundle.metadata.id.clone();

        bundle.metadata.validate()?;
        if self.registry.contains(&id).await {
            return Err(PluginError::AlreadyInstalled { plugin: id });
        }
        self.permissions
            .validate_permissions(&id, &bundle.metadata.permissions)?;
        if !self.versions.check_compatibility(&bundle.metadata)? {
            return Err(PluginError::IncompatibleVersion {
                plugin: id,
                reason: format!(
                    "host {} does not satisfy '{}'",
                    self.versions.host_version(),
                    bundle.metadata.host_version_constraint.as_deref().unwrap_or("")
                ),
            });
        }

        self.sandbox.initialize_plugin(&id, &bundle).await?;

        let version = bundle.metadata.version.clone();
        if let Err(err) = self.finish_install(&id, bundle).await {
            self.registry.remove(&id).await;
            if let Err(cleanup_err) = self.sandbox.cleanup_plugin(&id).await {
                tracing::warn!(
                    plugin = %id,
                    error = %cleanup_err,
                    "sandbox cleanup after failed install also failed"
                );
            }
            return Err(err);
        }

        tracing::info!(plugin = %id, version = %version, "plugin installed");
        Ok(())
    }

    async fn finish_install(&self, id: &str, bundle: PluginBundle) -> PluginResult<()> {
        let plugin =
            self.sandbox
                .execute_plugin(&bundle)
                .await
                .map_err(|e| PluginError::LoadFailed {
                    plugin: id.to_string(),
                    reason: e.to_string(),
                })?;

        let context = Arc::new(PluginContext::new(
            id,
            self.sandbox.create_storage(id),
            self.sandbox.create_event_emitter(id),
            self.permissions.granted_permissions(id),
            PluginApi::new(id, self.permissions.clone(), self.sandbox.clone()),
        ));

        plugin
            .initialize(&context)
            .await
            .map_err(|e| PluginError::InstallationFailed {
                plugin: id.to_string(),
                reason: format!("initialize hook: {}", e),
            })?;

        self.registry
            .insert(PluginEntry {
                metadata: bundle.metadata,
                plugin: plugin.clone(),
                context,
                state: PluginState::Installing,
            })
            .await?;

        plugin
            .activate()
            .await
            .map_err(|e| PluginError::InstallationFailed {
                plugin: id.to_string(),
                reason: format!("activate hook: {}", e),
            })?;
        self.registry.set_state(id, PluginState::Active).await
    }

    async fn uninstall_locked(&self, plugin_id: &str) -> PluginResult<()> {
        if !self.registry.contains(plugin_id).await {
            return Err(PluginError::NotInstalled {
                plugin: plugin_id.to_string(),
            });
        }
        self.registry
            .set_state(plugin_id, PluginState::Uninstalling)
            .await?;

        let mut first_failure: Option<String> = None;

        if let Some(plugin) = self.registry.plugin(plugin_id).await {
            if let Err(e) = plugin.deactivate().await {
                tracing::warn!(plugin = plugin_id, error = %e, "deactivate hook failed during uninstall");
                first_failure.get_or_insert(format!("deactivate hook: {}", e));
            }
            if let Err(e) = plugin.destroy().await {
                tracing::warn!(plugin = plugin_id, error = %e, "destroy hook failed during uninstall");
                first_failure.get_or_insert(format!("destroy hook: {}", e));
            }
        }

        if let Err(e) = self.sandbox.cleanup_plugin(plugin_id).await {
            tracing::warn!(plugin = plugin_id, error = %e, "sandbox cleanup failed during uninstall");
            first_failure.get_or_insert(format!("sandbox cleanup: {}", e));
        }

        self.registry.remove(plugin_id).await;

        match first_failure {
            None => {
                tracing::info!(plugin = plugin_id, "plugin uninstalled");
                Ok(())
            }
            Some(reason) => Err(PluginError::UninstallationFailed {
                plugin: plugin_id.to_string(),
                reason,
            }),
        }
    }
}
