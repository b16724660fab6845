//! UI capability adapter: notifications, modals, menu entries.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::error::PluginResult;
use crate::permissions::PermissionKind;

use super::ApiBinding;

pub struct UiApi {
    binding: Arc<ApiBinding>,
}

impl UiApi {
    pub(crate) fn new(binding: Arc<ApiBinding>) -> Self {
        Self { binding }
    }

    /// Shows a notification. Covered by the system baseline, so this works
    /// for every installed plugin without a prompt.
    pub async fn notify(&self, message: &str) -> PluginResult<Value> {
        self.binding
            .call(
                PermissionKind::Ui,
                &["notifications"],
                "ui.notify",
                json!({ "message": message }),
            )
            .await
    }

    /// Opens a modal dialog. Requires an explicit "modal" scope grant.
    pub async fn modal(&self, title: &str, body: &str) -> PluginResult<Value> {
        self.binding
            .call(
                PermissionKind::Ui,
                &["modal"],
                "ui.modal",
                json!({ "title": title, "body": body }),
            )
            .await
    }

    /// Adds a menu item dispatching the given action id.
    pub async fn add_menu_item(&self, label: &str, action: &str) -> PluginResult<Value> {
        self.binding
            .call(
                PermissionKind::Ui,
                &["menu"],
                "ui.menu.add",
                json!({ "label": label, "action": action }),
            )
            .await
    }

    /// Removes a previously added menu item.
    pub async fn remove_menu_item(&self, action: &str) -> PluginResult<Value> {
        self.binding
            .call(
                PermissionKind::Ui,
                &["menu"],
                "ui.menu.remove",
                json!({ "action": action }),
            )
            .await
    }
}

impl std::fmt::Debug for UiApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiApi")
            .field("plugin", &self.binding.plugin_id())
            .finish()
    }
}
