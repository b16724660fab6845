//! Plugin lifecycle: metadata, the behavioral contract, the installed
//! registry, and the manager orchestrating installs, updates, and
//! uninstalls.

mod context;
mod manager;
mod metadata;
mod registry;
mod traits;

pub use context::PluginContext;
pub use manager::PluginManager;
pub use metadata::{PluginMetadata, PluginMetadataBuilder};
pub use registry::{PluginRegistry, PluginState};
pub use traits::{Plugin, PluginBundle};
