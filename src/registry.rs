//! Extension registry: one live record per installed extension.
//!
//! Records live behind a per-extension mutex, so calls for one extension
//! serialize in arrival order while different extensions proceed in
//! parallel. The registry also owns the teardown path: removing an
//! extension drops its event listeners and menu items along with its
//! module set.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use crate::apis::{ApiContext, ApiSet, MenuRegistry};
use crate::events::EventBus;
use crate::manifest::Manifest;
use crate::ExtensionId;

/// One installed extension and its bound module set.
pub struct Extension {
    pub id: ExtensionId,
    pub manifest: Manifest,
    /// Install root on disk; `getURL` and the i18n catalog resolve here.
    pub path: PathBuf,
    pub apis: ApiSet,
    pub enabled: bool,
}

impl Extension {
    /// Bind a module set for a discovered or freshly installed extension.
    pub fn new(id: &str, manifest: Manifest, path: PathBuf, ctx: &ApiContext) -> Self {
        let apis = ApiSet::new(id, &manifest, &path, ctx);
        Self {
            id: id.to_string(),
            manifest,
            path,
            apis,
            enabled: true,
        }
    }
}

pub struct ExtensionRegistry {
    extensions: RwLock<HashMap<ExtensionId, Arc<Mutex<Extension>>>>,
    events: Arc<EventBus>,
    menus: Arc<MenuRegistry>,
}

impl ExtensionRegistry {
    pub fn new(events: Arc<EventBus>, menus: Arc<MenuRegistry>) -> Self {
        Self {
            extensions: RwLock::new(HashMap::new()),
            events,
            menus,
        }
    }

    pub fn insert(&self, extension: Extension) -> Arc<Mutex<Extension>> {
        let id = extension.id.clone();
        let record = Arc::new(Mutex::new(extension));
        self.extensions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, record.clone());
        record
    }

    pub fn get(&self, id: &str) -> Option<Arc<Mutex<Extension>>> {
        self.extensions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Unregister an extension, tearing down its listeners and menu items.
    /// Unpacked files stay on disk.
    pub fn remove(&self, id: &str) -> Option<Arc<Mutex<Extension>>> {
        let record = self
            .extensions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        if record.is_some() {
            self.events.drop_extension(id);
            self.menus.remove_all(id);
        }
        record
    }

    pub fn contains(&self, id: &str) -> bool {
        self.extensions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    pub fn ids(&self) -> Vec<ExtensionId> {
        let mut ids: Vec<ExtensionId> = self
            .extensions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.extensions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::{ExtensionInfo, ManagementBridge, WebRequestRelay};
    use crate::error::ExtensionResult;
    use crate::host::test_support::MemoryShell;
    use serde_json::Value;
    use tempfile::TempDir;

    struct NullBridge;

    impl ManagementBridge for NullBridge {
        fn install(&self, id: &str) -> ExtensionResult<ExtensionInfo> {
            Err(crate::error::ExtensionError::NotFound(id.to_string()))
        }
        fn uninstall(&self, _id: &str) -> ExtensionResult<()> {
            Ok(())
        }
        fn set_enabled(&self, _id: &str, _enabled: bool) -> ExtensionResult<()> {
            Ok(())
        }
        fn all(&self) -> Vec<ExtensionInfo> {
            Vec::new()
        }
    }

    fn context(state_dir: &TempDir) -> ApiContext {
        ApiContext {
            shell: MemoryShell::handles(),
            events: EventBus::new(),
            menus: Arc::new(MenuRegistry::new(EventBus::new())),
            web_request: Arc::new(WebRequestRelay::new(EventBus::new())),
            management: Arc::new(NullBridge),
            state_dir: state_dir.path().to_path_buf(),
        }
    }

    fn manifest(name: &str) -> Manifest {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "version": "1.0",
            "manifest_version": 3,
        }))
        .unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let state = TempDir::new().unwrap();
        let ctx = context(&state);
        let registry = ExtensionRegistry::new(ctx.events.clone(), ctx.menus.clone());

        registry.insert(Extension::new(
            "abc",
            manifest("A"),
            state.path().join("abc"),
            &ctx,
        ));
        assert!(registry.contains("abc"));
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.ids(), vec!["abc".to_string()]);
    }

    #[test]
    fn test_remove_tears_down_listeners_and_menus() {
        let state = TempDir::new().unwrap();
        let ctx = context(&state);
        let registry = ExtensionRegistry::new(ctx.events.clone(), ctx.menus.clone());

        let record = registry.insert(Extension::new(
            "abc",
            manifest("A"),
            state.path().join("abc"),
            &ctx,
        ));
        record
            .lock()
            .unwrap()
            .apis
            .invoke(
                "contextMenus",
                "create",
                &[serde_json::json!({"id": "m", "title": "M"})],
            )
            .unwrap();
        let _sub = ctx
            .events
            .subscribe("abc", "runtime.onMessage", Arc::new(|_: &[Value]| {}));
        assert_eq!(ctx.events.listener_count("abc", "runtime.onMessage"), 1);
        assert_eq!(ctx.menus.items_for("abc").len(), 1);

        registry.remove("abc");
        assert!(!registry.contains("abc"));
        assert_eq!(ctx.events.listener_count("abc", "runtime.onMessage"), 0);
        assert!(ctx.menus.items_for("abc").is_empty());
    }
}
