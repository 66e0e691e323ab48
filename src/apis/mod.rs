//! Capability modules, one per `chrome.*` namespace.
//!
//! Each installed extension gets its own [`ApiSet`] binding every module to
//! that extension's identity, install directory and persisted state. The
//! dispatcher resolves `(namespace, member)` against the set; unknown
//! namespaces and members surface as `ApiNotFound` rather than panics.

pub mod action;
pub mod context_menus;
pub mod cookies;
pub mod extension_meta;
pub mod i18n;
pub mod management;
pub mod notifications;
pub mod permissions;
pub mod runtime;
pub mod scripting;
pub mod storage;
pub mod tabs;
pub mod web_request;
pub mod windows;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ExtensionError, ExtensionResult};
use crate::events::EventBus;
use crate::host::ShellHandles;
use crate::manifest::Manifest;

pub use action::Action;
pub use context_menus::{ContextMenus, MenuItem, MenuRegistry};
pub use cookies::Cookies;
pub use extension_meta::ExtensionMeta;
pub use i18n::I18n;
pub use management::{ExtensionInfo, Management, ManagementBridge};
pub use notifications::Notifications;
pub use permissions::Permissions;
pub use runtime::Runtime;
pub use scripting::Scripting;
pub use storage::Storage;
pub use tabs::Tabs;
pub use web_request::{
    RequestDecision, RequestDetails, RequestStage, WebRequest, WebRequestRelay,
};
pub use windows::Windows;

/// Shared infrastructure every ApiSet hangs off: the host shell, the event
/// bus and the process-wide tables that span extensions.
#[derive(Clone)]
pub struct ApiContext {
    pub shell: ShellHandles,
    pub events: Arc<EventBus>,
    pub menus: Arc<MenuRegistry>,
    pub web_request: Arc<WebRequestRelay>,
    pub management: Arc<dyn ManagementBridge>,
    /// Directory holding per-extension storage and permission files.
    pub state_dir: std::path::PathBuf,
}

/// The complete `chrome.*` surface bound to one extension.
pub struct ApiSet {
    storage: Storage,
    tabs: Tabs,
    windows: Windows,
    runtime: Runtime,
    permissions: Permissions,
    cookies: Cookies,
    notifications: Notifications,
    scripting: Scripting,
    web_request: WebRequest,
    context_menus: ContextMenus,
    i18n: I18n,
    action: Action,
    extension_meta: ExtensionMeta,
    management: Management,
}

impl ApiSet {
    pub fn new(
        extension_id: &str,
        manifest: &Manifest,
        extension_root: &Path,
        ctx: &ApiContext,
    ) -> Self {
        let permissions_path = ctx.state_dir.join(format!("{extension_id}.permissions.json"));

        Self {
            storage: Storage::new(extension_id, ctx.state_dir.clone(), ctx.events.clone()),
            tabs: Tabs::new(ctx.shell.tabs.clone()),
            windows: Windows::new(ctx.shell.windows.clone()),
            runtime: Runtime::new(
                extension_id,
                manifest.clone(),
                extension_root.to_path_buf(),
                ctx.shell.tabs.clone(),
                ctx.events.clone(),
            ),
            permissions: Permissions::load(extension_id, permissions_path, ctx.events.clone()),
            cookies: Cookies::new(ctx.shell.cookies.clone()),
            notifications: Notifications::new(
                extension_id,
                ctx.shell.notifications.clone(),
                ctx.events.clone(),
            ),
            scripting: Scripting::new(ctx.shell.scripting.clone()),
            web_request: WebRequest::new(extension_id.to_string(), ctx.web_request.clone()),
            context_menus: ContextMenus::new(extension_id.to_string(), ctx.menus.clone()),
            i18n: I18n::load(extension_root, manifest.locale()),
            action: Action::new(
                extension_id.to_string(),
                extension_root,
                manifest,
                ctx.shell.action_ui.clone(),
                ctx.shell.windows.clone(),
                ctx.events.clone(),
            ),
            extension_meta: ExtensionMeta::new(extension_root),
            management: Management::new(ctx.management.clone()),
        }
    }

    /// Route one dispatched call. `namespace` may carry a storage area
    /// suffix, e.g. `storage.local`.
    pub fn invoke(&mut self, namespace: &str, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        if let Some(area_name) = namespace.strip_prefix("storage.") {
            return match self.storage.area_mut(area_name) {
                Some(area) => area.invoke(member, args),
                None => Err(ExtensionError::ApiNotFound {
                    namespace: namespace.to_string(),
                    member: member.to_string(),
                }),
            };
        }

        match namespace {
            "runtime" => self.runtime.invoke(member, args),
            "tabs" => self.tabs.invoke(member, args),
            "windows" => self.windows.invoke(member, args),
            "permissions" => self.permissions.invoke(member, args),
            "cookies" => self.cookies.invoke(member, args),
            "notifications" => self.notifications.invoke(member, args),
            "scripting" => self.scripting.invoke(member, args),
            "webRequest" => self.web_request.invoke(member, args),
            "contextMenus" => self.context_menus.invoke(member, args),
            "i18n" => self.i18n.invoke(member, args),
            "action" => self.action.invoke(member, args),
            "extension" => self.extension_meta.invoke(member, args),
            "management" => self.management.invoke(member, args),
            other => Err(ExtensionError::ApiNotFound {
                namespace: other.to_string(),
                member: member.to_string(),
            }),
        }
    }

    /// The toolbar module, for shell-side click routing.
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Cheap handle to the management module. The dispatcher invokes
    /// management outside the extension record lock, because those calls
    /// mutate the registry and may target the calling extension itself.
    pub fn management_handle(&self) -> Management {
        self.management.clone()
    }
}
