//! # plugin-host
//!
//! Embeddable plugin subsystem: lifecycle management, capability-based
//! permissions, sandboxed execution, and semver-gated updates.
//!
//! Plugins are installed from bundles, run behind a [`Sandbox`] boundary,
//! and reach the host only through a permission-checked [`PluginApi`].
//! The host never trusts the sandbox alone: every capability call is
//! checked against the [`PermissionsModel`] before crossing the boundary.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use plugin_host::{
//!     DenyAllPrompt, InProcessSandbox, PermissionsModel, PluginManager,
//!     PluginBundle, PluginMetadata, Version, VersionManager,
//! };
//! # use plugin_host::{Plugin, PluginContext, PluginResult};
//! # struct Weather;
//! # #[async_trait::async_trait]
//! # impl Plugin for Weather {
//! #     async fn initialize(&self, _ctx: &PluginContext) -> PluginResult<()> { Ok(()) }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), plugin_host::PluginError> {
//!     let manager = PluginManager::new(
//!         Arc::new(PermissionsModel::new(Arc::new(DenyAllPrompt))),
//!         Arc::new(VersionManager::new(Version::new(2, 0, 0))),
//!         Arc::new(InProcessSandbox::new()),
//!     );
//!
//!     let bundle = PluginBundle::new(
//!         PluginMetadata::builder("weather", "1.0.0")
//!             .name("Weather")
//!             .host_constraint("^2.0.0")
//!             .build(),
//!         Arc::new(Weather),
//!     );
//!     manager.install_plugin(bundle).await?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod api;
pub mod error;
pub mod permissions;
pub mod plugins;
pub mod sandbox;
pub mod version;

// Re-exports for convenience
pub use api::{ChainApi, NetworkApi, PluginApi, UiApi};
pub use error::{PluginError, PluginResult};
pub use permissions::{
    AllowAllPrompt, ConsentPrompt, DenyAllPrompt, Permission, PermissionExport, PermissionKind,
    PermissionLevel, PermissionsModel, PluginGrants, auto_grant_allows, system_defaults,
};
pub use plugins::{
    Plugin, PluginBundle, PluginContext, PluginManager, PluginMetadata, PluginMetadataBuilder,
    PluginRegistry, PluginState,
};
pub use sandbox::{
    EventEmitter, EventListener, InProcessSandbox, ListenerId, PluginStorage, RecordedCall, Sandbox,
};
pub use version::{
    ConstraintOp, UpdateInfo, UpdatePolicy, UpdateSource, Version, VersionConstraint,
    VersionManager,
};
