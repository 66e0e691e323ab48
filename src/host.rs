//! Host-shell contract consumed by the capability modules.
//!
//! The shell owns the actual tab table, window table, cookie store and
//! notification tray. Capability modules only request changes and read
//! snapshots through these traits; none of the state here is owned by this
//! crate. Snapshots serialize with the field names extension code expects
//! from the `chrome.*` surface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExtensionResult;
use crate::events::NotificationSignal;
use crate::{ExtensionId, TabId, WindowId};

/// Snapshot of one tab, read-only from the module side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
    pub title: String,
    /// User-renamed title, overriding `title` in the sidebar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,
    pub active: bool,
    /// Dense integer rank used for sidebar display order.
    pub order: u32,
    /// Monotonically increasing most-recent-use counter.
    pub history_index: u64,
    #[serde(default)]
    pub muted: bool,
    /// Base64 preview, retained for a bounded set of recent tabs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Fields a tab update may change; everything else is left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDelta {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub muted: Option<bool>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Filter for `tabs.query`. Empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabQuery {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub current_window: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Mutually exclusive visual state of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
    Fullscreen,
}

/// Window type as reported to extensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    #[default]
    Normal,
    Popup,
    Panel,
}

/// Window geometry in screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// Snapshot of one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    pub focused: bool,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub state: WindowState,
    #[serde(rename = "type")]
    pub kind: WindowKind,
    /// Owned tabs, present only when the caller asked to populate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabs: Option<Vec<Tab>>,
}

/// Request shape for `windows.create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSpec {
    /// One or more urls; only the first is loaded.
    #[serde(default)]
    pub url: Option<UrlList>,
    #[serde(default)]
    pub left: Option<i32>,
    #[serde(default)]
    pub top: Option<i32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub focused: Option<bool>,
    #[serde(default)]
    pub state: Option<WindowState>,
    #[serde(rename = "type", default)]
    pub kind: Option<WindowKind>,
}

/// `chrome.windows.create` accepts a single url or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlList {
    One(String),
    Many(Vec<String>),
}

impl UrlList {
    /// First url in the request, if any. Additional urls are dropped.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(url) => Some(url),
            Self::Many(urls) => urls.first().map(String::as_str),
        }
    }
}

/// Fields a window update may change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowDelta {
    #[serde(default)]
    pub left: Option<i32>,
    #[serde(default)]
    pub top: Option<i32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub focused: Option<bool>,
    #[serde(default)]
    pub state: Option<WindowState>,
}

/// Session cookie as exposed to extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub session: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
}

/// Filter for `cookies.getAll`. Empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieFilter {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default)]
    pub session: Option<bool>,
}

/// Options accepted by `notifications.create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// Toolbar state pushed to the shell UI by the action module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

/// Tab operations owned by the shell's tab manager.
pub trait TabHost: Send + Sync {
    fn create_tab(&self, url: &str, window: Option<WindowId>) -> ExtensionResult<Tab>;
    fn remove_tab(&self, id: TabId) -> ExtensionResult<()>;
    fn tab_by_id(&self, id: TabId) -> Option<Tab>;
    /// The tab considered current for the calling context.
    fn current_tab(&self, window: Option<WindowId>) -> Option<Tab>;
    fn update_tab(&self, id: TabId, delta: TabDelta) -> ExtensionResult<Tab>;
    fn query_tabs(&self, filter: &TabQuery) -> Vec<Tab>;
}

/// Window operations owned by the shell.
pub trait WindowHost: Send + Sync {
    fn create_window(&self, spec: &WindowSpec) -> ExtensionResult<WindowInfo>;
    fn update_window(&self, id: WindowId, delta: &WindowDelta) -> ExtensionResult<WindowInfo>;
    fn close_window(&self, id: WindowId) -> ExtensionResult<()>;
    fn window_by_id(&self, id: WindowId) -> Option<WindowInfo>;
    fn focused_window(&self) -> Option<WindowInfo>;
    fn all_windows(&self) -> Vec<WindowInfo>;
    /// Tabs owned by a window, for populate-style snapshot requests.
    fn tabs_for_window(&self, id: WindowId) -> Vec<Tab>;
}

/// Session cookie store owned by the shell.
pub trait CookieHost: Send + Sync {
    fn get_cookie(&self, url: &str, name: &str) -> Option<Cookie>;
    fn get_all_cookies(&self, filter: &CookieFilter) -> Vec<Cookie>;
    fn set_cookie(&self, cookie: Cookie) -> ExtensionResult<Cookie>;
    fn remove_cookie(&self, url: &str, name: &str) -> ExtensionResult<()>;
}

/// OS notification tray owned by the shell.
///
/// The signal handle lets the shell report click/close interactions back
/// into the extension's event channels.
pub trait NotificationHost: Send + Sync {
    fn show_notification(
        &self,
        id: &str,
        options: &NotificationOptions,
        signal: NotificationSignal,
    ) -> ExtensionResult<()>;
    fn close_notification(&self, id: &str) -> ExtensionResult<()>;
}

/// JS/CSS injection into a tab's content view.
pub trait ScriptHost: Send + Sync {
    fn execute_script(&self, tab: TabId, code: &str) -> ExtensionResult<Value>;
    fn insert_css(&self, tab: TabId, css: &str) -> ExtensionResult<()>;
}

/// Toolbar surface owned by the shell UI.
pub trait ActionUiHost: Send + Sync {
    fn push_action_state(&self, extension_id: &ExtensionId, state: &ActionState);
}

/// Hidden background contexts owned by the shell.
///
/// Extensions with a manifest `background` block get one context spawned
/// at load time, running the first declared script.
pub trait BackgroundHost: Send + Sync {
    fn start_background(&self, extension_id: &ExtensionId, script_url: &str)
        -> ExtensionResult<()>;
    /// Tears down the extension's context. A no-op when none is running.
    fn stop_background(&self, extension_id: &ExtensionId);
}

/// The capability set the shell hands to the extension layer at startup.
#[derive(Clone)]
pub struct ShellHandles {
    pub tabs: Arc<dyn TabHost>,
    pub windows: Arc<dyn WindowHost>,
    pub cookies: Arc<dyn CookieHost>,
    pub notifications: Arc<dyn NotificationHost>,
    pub scripting: Arc<dyn ScriptHost>,
    pub action_ui: Arc<dyn ActionUiHost>,
    pub background: Arc<dyn BackgroundHost>,
}

impl std::fmt::Debug for ShellHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellHandles").finish_non_exhaustive()
    }
}

impl Cookie {
    /// Whether this cookie matches a getAll filter.
    pub fn matches(&self, filter: &CookieFilter) -> bool {
        if let Some(name) = &filter.name {
            if &self.name != name {
                return false;
            }
        }
        if let Some(domain) = &filter.domain {
            if !self.domain.ends_with(domain.trim_start_matches('.')) {
                return false;
            }
        }
        if let Some(path) = &filter.path {
            if &self.path != path {
                return false;
            }
        }
        if let Some(secure) = filter.secure {
            if self.secure != secure {
                return false;
            }
        }
        if let Some(session) = filter.session {
            if self.session != session {
                return false;
            }
        }
        if let Some(url) = &filter.url {
            if !url_matches_domain(url, &self.domain) {
                return false;
            }
        }
        true
    }
}

/// Loose host check: does the url's host fall under the cookie domain?
fn url_matches_domain(url: &str, domain: &str) -> bool {
    let host = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split(['/', ':'])
        .next()
        .unwrap_or("");
    let domain = domain.trim_start_matches('.');
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// In-memory shell implementing every host trait, for tests and demos.
pub mod test_support {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex, MutexGuard};

    use serde_json::Value;

    use super::{
        ActionState, ActionUiHost, BackgroundHost, Cookie, CookieFilter, CookieHost,
        NotificationHost, NotificationOptions, ScriptHost, ShellHandles, Tab, TabDelta, TabHost,
        TabQuery, WindowDelta, WindowHost, WindowInfo, WindowSpec, WindowState,
    };
    use crate::error::{ExtensionError, ExtensionResult};
    use crate::events::NotificationSignal;
    use crate::{ExtensionId, TabId, WindowId};

    #[derive(Default)]
    struct ShellState {
        next_tab: TabId,
        next_window: WindowId,
        use_counter: u64,
        tabs: BTreeMap<TabId, Tab>,
        windows: BTreeMap<WindowId, WindowInfo>,
        cookies: Vec<Cookie>,
        notification_log: Vec<String>,
        signals: HashMap<String, NotificationSignal>,
        scripts: Vec<(TabId, String)>,
        css: Vec<(TabId, String)>,
        action_states: HashMap<ExtensionId, ActionState>,
        background_log: Vec<String>,
    }

    /// Fake shell backing every host trait with plain in-memory tables.
    #[derive(Default)]
    pub struct MemoryShell {
        state: Mutex<ShellState>,
    }

    impl MemoryShell {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// A handle set where every capability points at this shell.
        pub fn handles() -> ShellHandles {
            Self::new().into_handles()
        }

        pub fn into_handles(self: Arc<Self>) -> ShellHandles {
            ShellHandles {
                tabs: self.clone(),
                windows: self.clone(),
                cookies: self.clone(),
                notifications: self.clone(),
                scripting: self.clone(),
                action_ui: self.clone(),
                background: self,
            }
        }

        fn lock(&self) -> MutexGuard<'_, ShellState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn ensure_window(state: &mut ShellState) -> WindowId {
            if let Some(id) = state.windows.keys().next().copied() {
                return id;
            }
            state.next_window += 1;
            let id = state.next_window;
            state.windows.insert(
                id,
                WindowInfo {
                    id,
                    focused: true,
                    left: 0,
                    top: 0,
                    width: 1024,
                    height: 768,
                    state: WindowState::Normal,
                    kind: Default::default(),
                    tabs: None,
                },
            );
            id
        }

        /// Ordered log of tray calls, `show:<id>` and `close:<id>`.
        pub fn notification_log(&self) -> Vec<String> {
            self.lock().notification_log.clone()
        }

        /// Signal handle for a shown notification, to simulate user clicks.
        pub fn notification_signal(&self, id: &str) -> Option<NotificationSignal> {
            self.lock().signals.get(id).cloned()
        }

        pub fn executed_scripts(&self) -> Vec<(TabId, String)> {
            self.lock().scripts.clone()
        }

        pub fn action_state(&self, extension_id: &str) -> Option<ActionState> {
            self.lock().action_states.get(extension_id).cloned()
        }

        pub fn tab_count(&self) -> usize {
            self.lock().tabs.len()
        }

        /// Background context lifecycle, as `start:{id}:{url}` and
        /// `stop:{id}` entries in order.
        pub fn background_log(&self) -> Vec<String> {
            self.lock().background_log.clone()
        }
    }

    impl TabHost for MemoryShell {
        fn create_tab(&self, url: &str, window: Option<WindowId>) -> ExtensionResult<Tab> {
            let mut state = self.lock();
            let window_id = match window {
                Some(id) if state.windows.contains_key(&id) => id,
                Some(id) => return Err(ExtensionError::WindowNotFound(id)),
                None => Self::ensure_window(&mut state),
            };
            state.next_tab += 1;
            state.use_counter += 1;
            let tab = Tab {
                id: state.next_tab,
                window_id,
                url: url.to_string(),
                title: url.to_string(),
                custom_title: None,
                active: false,
                order: state.tabs.len() as u32,
                history_index: state.use_counter,
                muted: false,
                thumbnail: None,
            };
            state.tabs.insert(tab.id, tab.clone());
            Ok(tab)
        }

        fn remove_tab(&self, id: TabId) -> ExtensionResult<()> {
            self.lock()
                .tabs
                .remove(&id)
                .map(|_| ())
                .ok_or(ExtensionError::TabNotFound(id))
        }

        fn tab_by_id(&self, id: TabId) -> Option<Tab> {
            self.lock().tabs.get(&id).cloned()
        }

        fn current_tab(&self, window: Option<WindowId>) -> Option<Tab> {
            let state = self.lock();
            state
                .tabs
                .values()
                .filter(|t| t.active && window.map_or(true, |w| t.window_id == w))
                .max_by_key(|t| t.history_index)
                .cloned()
        }

        fn update_tab(&self, id: TabId, delta: TabDelta) -> ExtensionResult<Tab> {
            let mut state = self.lock();
            if !state.tabs.contains_key(&id) {
                return Err(ExtensionError::TabNotFound(id));
            }
            if delta.active == Some(true) {
                state.use_counter += 1;
                let counter = state.use_counter;
                let window_id = state.tabs[&id].window_id;
                for tab in state.tabs.values_mut() {
                    if tab.window_id == window_id {
                        tab.active = tab.id == id;
                    }
                }
                if let Some(tab) = state.tabs.get_mut(&id) {
                    tab.history_index = counter;
                }
            }
            let tab = state.tabs.get_mut(&id).ok_or(ExtensionError::TabNotFound(id))?;
            if let Some(url) = delta.url {
                tab.url = url.clone();
                tab.title = url;
            }
            if let Some(muted) = delta.muted {
                tab.muted = muted;
            }
            if delta.active == Some(false) {
                tab.active = false;
            }
            Ok(tab.clone())
        }

        fn query_tabs(&self, filter: &TabQuery) -> Vec<Tab> {
            let state = self.lock();
            let current_window = state
                .windows
                .values()
                .find(|w| w.focused)
                .map(|w| w.id);
            state
                .tabs
                .values()
                .filter(|t| {
                    filter.active.map_or(true, |a| t.active == a)
                        && filter.url.as_ref().map_or(true, |u| {
                            u.strip_suffix('*')
                                .map_or(&t.url == u, |prefix| t.url.starts_with(prefix))
                        })
                        && (filter.current_window != Some(true)
                            || current_window == Some(t.window_id))
                })
                .cloned()
                .collect()
        }
    }

    impl WindowHost for MemoryShell {
        fn create_window(&self, spec: &WindowSpec) -> ExtensionResult<WindowInfo> {
            let mut state = self.lock();
            state.next_window += 1;
            let id = state.next_window;
            let focused = spec.focused.unwrap_or(true);
            if focused {
                for window in state.windows.values_mut() {
                    window.focused = false;
                }
            }
            let info = WindowInfo {
                id,
                focused,
                left: spec.left.unwrap_or(0),
                top: spec.top.unwrap_or(0),
                width: spec.width.unwrap_or(1024),
                height: spec.height.unwrap_or(768),
                state: spec.state.unwrap_or_default(),
                kind: spec.kind.unwrap_or_default(),
                tabs: None,
            };
            state.windows.insert(id, info.clone());
            drop(state);

            if let Some(url) = spec.url.as_ref().and_then(|u| u.first()) {
                self.create_tab(url, Some(id))?;
            }
            Ok(info)
        }

        fn update_window(&self, id: WindowId, delta: &WindowDelta) -> ExtensionResult<WindowInfo> {
            let mut state = self.lock();
            if delta.focused == Some(true) {
                for window in state.windows.values_mut() {
                    window.focused = false;
                }
            }
            let window = state
                .windows
                .get_mut(&id)
                .ok_or(ExtensionError::WindowNotFound(id))?;
            if let Some(left) = delta.left {
                window.left = left;
            }
            if let Some(top) = delta.top {
                window.top = top;
            }
            if let Some(width) = delta.width {
                window.width = width;
            }
            if let Some(height) = delta.height {
                window.height = height;
            }
            if let Some(focused) = delta.focused {
                window.focused = focused;
            }
            if let Some(window_state) = delta.state {
                window.state = window_state;
            }
            Ok(window.clone())
        }

        fn close_window(&self, id: WindowId) -> ExtensionResult<()> {
            let mut state = self.lock();
            state
                .windows
                .remove(&id)
                .ok_or(ExtensionError::WindowNotFound(id))?;
            state.tabs.retain(|_, tab| tab.window_id != id);
            Ok(())
        }

        fn window_by_id(&self, id: WindowId) -> Option<WindowInfo> {
            self.lock().windows.get(&id).cloned()
        }

        fn focused_window(&self) -> Option<WindowInfo> {
            self.lock().windows.values().find(|w| w.focused).cloned()
        }

        fn all_windows(&self) -> Vec<WindowInfo> {
            self.lock().windows.values().cloned().collect()
        }

        fn tabs_for_window(&self, id: WindowId) -> Vec<Tab> {
            self.lock()
                .tabs
                .values()
                .filter(|t| t.window_id == id)
                .cloned()
                .collect()
        }
    }

    impl CookieHost for MemoryShell {
        fn get_cookie(&self, url: &str, name: &str) -> Option<Cookie> {
            self.lock()
                .cookies
                .iter()
                .find(|c| c.name == name && super::url_matches_domain(url, &c.domain))
                .cloned()
        }

        fn get_all_cookies(&self, filter: &CookieFilter) -> Vec<Cookie> {
            self.lock()
                .cookies
                .iter()
                .filter(|c| c.matches(filter))
                .cloned()
                .collect()
        }

        fn set_cookie(&self, cookie: Cookie) -> ExtensionResult<Cookie> {
            let mut state = self.lock();
            state
                .cookies
                .retain(|c| !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path));
            state.cookies.push(cookie.clone());
            Ok(cookie)
        }

        fn remove_cookie(&self, url: &str, name: &str) -> ExtensionResult<()> {
            let mut state = self.lock();
            let before = state.cookies.len();
            state
                .cookies
                .retain(|c| !(c.name == name && super::url_matches_domain(url, &c.domain)));
            if state.cookies.len() == before {
                return Err(ExtensionError::NotFound(format!("cookie {name}")));
            }
            Ok(())
        }
    }

    impl NotificationHost for MemoryShell {
        fn show_notification(
            &self,
            id: &str,
            _options: &NotificationOptions,
            signal: NotificationSignal,
        ) -> ExtensionResult<()> {
            let mut state = self.lock();
            state.notification_log.push(format!("show:{id}"));
            state.signals.insert(id.to_string(), signal);
            Ok(())
        }

        fn close_notification(&self, id: &str) -> ExtensionResult<()> {
            let mut state = self.lock();
            state.notification_log.push(format!("close:{id}"));
            state.signals.remove(id);
            Ok(())
        }
    }

    impl ScriptHost for MemoryShell {
        fn execute_script(&self, tab: TabId, code: &str) -> ExtensionResult<Value> {
            let mut state = self.lock();
            if !state.tabs.contains_key(&tab) {
                return Err(ExtensionError::TabNotFound(tab));
            }
            state.scripts.push((tab, code.to_string()));
            Ok(Value::Null)
        }

        fn insert_css(&self, tab: TabId, css: &str) -> ExtensionResult<()> {
            let mut state = self.lock();
            if !state.tabs.contains_key(&tab) {
                return Err(ExtensionError::TabNotFound(tab));
            }
            state.css.push((tab, css.to_string()));
            Ok(())
        }
    }

    impl ActionUiHost for MemoryShell {
        fn push_action_state(&self, extension_id: &ExtensionId, state: &ActionState) {
            self.lock()
                .action_states
                .insert(extension_id.clone(), state.clone());
        }
    }

    impl BackgroundHost for MemoryShell {
        fn start_background(
            &self,
            extension_id: &ExtensionId,
            script_url: &str,
        ) -> ExtensionResult<()> {
            self.lock()
                .background_log
                .push(format!("start:{extension_id}:{script_url}"));
            Ok(())
        }

        fn stop_background(&self, extension_id: &ExtensionId) {
            self.lock().background_log.push(format!("stop:{extension_id}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_wire_shape() {
        let tab = Tab {
            id: 3,
            window_id: 1,
            url: "https://example.com".into(),
            title: "Example".into(),
            custom_title: None,
            active: true,
            order: 0,
            history_index: 9,
            muted: false,
            thumbnail: None,
        };

        let json = serde_json::to_value(&tab).unwrap();
        assert_eq!(json["windowId"], 1);
        assert_eq!(json["historyIndex"], 9);
        assert!(json.get("customTitle").is_none());
    }

    #[test]
    fn test_url_list_first_wins() {
        let spec: WindowSpec = serde_json::from_value(serde_json::json!({
            "url": ["https://a.test", "https://b.test"],
            "width": 800,
        }))
        .unwrap();
        assert_eq!(spec.url.unwrap().first(), Some("https://a.test"));
    }

    #[test]
    fn test_cookie_filter() {
        let cookie = Cookie {
            name: "sid".into(),
            value: "1".into(),
            domain: ".example.com".into(),
            path: "/".into(),
            secure: true,
            http_only: false,
            session: true,
            expiration_date: None,
        };

        assert!(cookie.matches(&CookieFilter {
            url: Some("https://app.example.com/login".into()),
            ..Default::default()
        }));
        assert!(!cookie.matches(&CookieFilter {
            name: Some("other".into()),
            ..Default::default()
        }));
    }
}
