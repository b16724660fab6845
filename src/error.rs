//! Error taxonomy for the plugin host.
//!
//! Contract violations and state conflicts are typed variants carrying the
//! offending plugin id where known; policy denials (a declined prompt, a
//! failed permission check) are boolean outcomes on the relevant APIs, not
//! errors.

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Invalid metadata for plugin '{plugin}': {reason}")]
    InvalidMetadata { plugin: String, reason: String },

    #[error("Plugin '{plugin}' is already installed")]
    AlreadyInstalled { plugin: String },

    #[error("Invalid permissions for plugin '{plugin}': {reason}")]
    InvalidPermissions { plugin: String, reason: String },

    #[error("Plugin '{plugin}' is incompatible with host version: {reason}")]
    IncompatibleVersion { plugin: String, reason: String },

    #[error("Plugin '{plugin}' is not installed")]
    NotInstalled { plugin: String },

    #[error("Invalid update for plugin '{plugin}': {from} -> {to}: {reason}")]
    InvalidUpdate {
        plugin: String,
        from: String,
        to: String,
        reason: String,
    },

    #[error("Failed to load plugin '{plugin}': {reason}")]
    LoadFailed { plugin: String, reason: String },

    #[error("Installation of plugin '{plugin}' failed: {reason}")]
    InstallationFailed { plugin: String, reason: String },

    #[error("Uninstallation of plugin '{plugin}' failed: {reason}")]
    UninstallationFailed { plugin: String, reason: String },

    #[error("Invalid version string '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("Permission denied for plugin '{plugin}': {kind} {scope:?}")]
    PermissionDenied {
        plugin: String,
        kind: String,
        scope: Vec<String>,
    },

    #[error("Sandbox failure for plugin '{plugin}': {reason}")]
    Sandbox { plugin: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PluginError {
    /// The plugin id this error was raised for, when one is known.
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            Self::InvalidMetadata { plugin, .. }
            | Self::AlreadyInstalled { plugin }
            | Self::InvalidPermissions { plugin, .. }
            | Self::IncompatibleVersion { plugin, .. }
            | Self::NotInstalled { plugin }
            | Self::InvalidUpdate { plugin, .. }
            | Self::LoadFailed { plugin, .. }
            | Self::InstallationFailed { plugin, .. }
            | Self::UninstallationFailed { plugin, .. }
            | Self::PermissionDenied { plugin, .. }
            | Self::Sandbox { plugin, .. } => Some(plugin),
            Self::InvalidVersion { .. } | Self::Json(_) => None,
        }
    }
}

pub type PluginResult<T> = Result<T, PluginError>;
