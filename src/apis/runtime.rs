//! `chrome.runtime` capability module.
//!
//! Holds the manifest and install root, resolves extension-local urls and
//! carries the extension's message channel. `sendMessage` publishes on the
//! process-wide bus keyed by the extension id; every `runtime.onMessage`
//! listener of that extension receives the payload plus a synthesized
//! sender descriptor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::{ExtensionError, ExtensionResult};
use crate::events::EventBus;
use crate::host::TabHost;
use crate::manifest::Manifest;
use crate::ExtensionId;

pub struct Runtime {
    extension_id: ExtensionId,
    manifest: Manifest,
    path: PathBuf,
    tabs: Arc<dyn TabHost>,
    events: Arc<EventBus>,
}

impl Runtime {
    pub fn new(
        extension_id: &str,
        manifest: Manifest,
        path: PathBuf,
        tabs: Arc<dyn TabHost>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            extension_id: extension_id.to_string(),
            manifest,
            path,
            tabs,
            events,
        }
    }

    pub fn get_manifest(&self) -> ExtensionResult<Value> {
        Ok(serde_json::to_value(&self.manifest)?)
    }

    /// Resolve a relative path against the extension's install root.
    pub fn get_url(&self, rel: &str) -> String {
        file_url(&self.path, rel)
    }

    /// Publish a message to this extension's `onMessage` listeners,
    /// with a sender descriptor carrying the id, the extension url and
    /// the originating tab when one is current.
    pub fn send_message(&self, payload: Value) -> ExtensionResult<()> {
        let mut sender = json!({
            "id": self.extension_id,
            "url": file_url(&self.path, ""),
        });
        if let Some(tab) = self.tabs.current_tab(None) {
            sender["tab"] = serde_json::to_value(tab)?;
        }

        self.events
            .publish(&self.extension_id, "runtime.onMessage", &[payload, sender]);
        Ok(())
    }

    /// Open the manifest's options page in a tab.
    pub fn open_options_page(&self) -> ExtensionResult<Value> {
        let page = self.manifest.options_page.as_deref().ok_or_else(|| {
            ExtensionError::NotFound(format!(
                "options page for extension '{}'",
                self.extension_id
            ))
        })?;

        let tab = self.tabs.create_tab(&self.get_url(page), None)?;
        Ok(serde_json::to_value(tab)?)
    }

    pub fn invoke(&self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        match member {
            "getManifest" => self.get_manifest(),
            "getURL" => {
                let rel = args.first().and_then(Value::as_str).ok_or_else(|| {
                    ExtensionError::InvalidArgument("getURL expects a path".to_string())
                })?;
                Ok(Value::String(self.get_url(rel)))
            }
            "getId" => Ok(Value::String(self.extension_id.clone())),
            "sendMessage" => {
                let payload = args.first().cloned().unwrap_or(Value::Null);
                self.send_message(payload)?;
                Ok(Value::Null)
            }
            "openOptionsPage" => self.open_options_page(),
            other => Err(ExtensionError::ApiNotFound {
                namespace: "runtime".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

/// `file://` url rooted at the install dir. Leading slashes on the
/// relative part are ignored, matching `chrome.runtime.getURL`.
pub(crate) fn file_url(root: &Path, rel: &str) -> String {
    let joined = root.join(rel.trim_start_matches('/'));
    format!("file://{}", joined.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Tab, TabDelta, TabQuery};
    use crate::{TabId, WindowId};
    use std::sync::Mutex;

    struct RecordingTabHost {
        opened: Mutex<Vec<String>>,
    }

    impl TabHost for RecordingTabHost {
        fn create_tab(&self, url: &str, _window: Option<WindowId>) -> ExtensionResult<Tab> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(Tab {
                id: 1,
                window_id: 1,
                url: url.to_string(),
                title: String::new(),
                custom_title: None,
                active: true,
                order: 0,
                history_index: 1,
                muted: false,
                thumbnail: None,
            })
        }
        fn remove_tab(&self, _id: TabId) -> ExtensionResult<()> {
            Ok(())
        }
        fn tab_by_id(&self, _id: TabId) -> Option<Tab> {
            None
        }
        fn current_tab(&self, _window: Option<WindowId>) -> Option<Tab> {
            None
        }
        fn update_tab(&self, id: TabId, _delta: TabDelta) -> ExtensionResult<Tab> {
            Err(ExtensionError::TabNotFound(id))
        }
        fn query_tabs(&self, _filter: &TabQuery) -> Vec<Tab> {
            Vec::new()
        }
    }

    fn manifest(options_page: Option<&str>) -> Manifest {
        serde_json::from_value(json!({
            "name": "X",
            "version": "1.0",
            "manifest_version": 3,
            "options_page": options_page,
        }))
        .unwrap()
    }

    fn runtime(options_page: Option<&str>) -> (Runtime, Arc<RecordingTabHost>) {
        let tabs = Arc::new(RecordingTabHost {
            opened: Mutex::new(Vec::new()),
        });
        let rt = Runtime::new(
            "abc",
            manifest(options_page),
            PathBuf::from("/ext/abc"),
            tabs.clone(),
            EventBus::new(),
        );
        (rt, tabs)
    }

    #[test]
    fn test_get_url_rooted_at_install_path() {
        let (rt, _) = runtime(None);
        assert_eq!(rt.get_url("page.html"), "file:///ext/abc/page.html");
        assert_eq!(rt.get_url("/page.html"), "file:///ext/abc/page.html");
    }

    #[test]
    fn test_open_options_page() {
        let (rt, tabs) = runtime(Some("options.html"));
        rt.open_options_page().unwrap();
        assert_eq!(
            *tabs.opened.lock().unwrap(),
            vec!["file:///ext/abc/options.html".to_string()]
        );
    }

    #[test]
    fn test_open_options_page_missing() {
        let (rt, _) = runtime(None);
        assert!(matches!(
            rt.open_options_page(),
            Err(ExtensionError::NotFound(_))
        ));
    }

    #[test]
    fn test_send_message_reaches_listeners() {
        let tabs = Arc::new(RecordingTabHost {
            opened: Mutex::new(Vec::new()),
        });
        let events = EventBus::new();
        let rt = Runtime::new(
            "abc",
            manifest(None),
            PathBuf::from("/ext/abc"),
            tabs,
            events.clone(),
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _h = events.subscribe("abc", "runtime.onMessage", Arc::new(move |args| {
            s.lock().unwrap().push(args.to_vec());
        }));

        rt.send_message(json!({"hello": true})).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0], json!({"hello": true}));
        assert_eq!(seen[0][1]["id"], "abc");
        assert_eq!(seen[0][1]["url"], "file:///ext/abc/");
    }
}
