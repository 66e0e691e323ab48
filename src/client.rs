//! Extension-side client surface.
//!
//! Instead of a dynamic catch-all proxy, the client is a set of typed
//! per-namespace stubs over one [`Transport`]. Method calls become dispatch
//! requests; `on*` surfaces hand out explicit subscription handles whose
//! drop unregisters the listener. In-process embedding uses
//! [`LocalTransport`]; a remote boundary would implement [`Transport`] over
//! its own channel.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::apis::RequestStage;
use crate::dispatch::{DispatchRequest, Dispatcher};
use crate::error::ErrorDescriptor;
use crate::events::{EventBus, EventCallback, SubscriptionHandle};
use crate::host::{
    Cookie, CookieFilter, NotificationOptions, Tab, TabDelta, TabQuery, WindowDelta, WindowInfo,
    WindowSpec,
};
use crate::manifest::Manifest;
use crate::{ExtensionId, TabId, WindowId};

/// Result type on the extension side of the boundary.
pub type ClientResult<T> = Result<T, ErrorDescriptor>;

/// Boundary carrier between client stubs and the core.
pub trait Transport: Send + Sync {
    fn invoke(&self, namespace: &str, member: &str, args: Vec<Value>) -> ClientResult<Value>;
    fn subscribe(&self, channel: &str, callback: EventCallback) -> SubscriptionHandle;
}

/// In-process transport wired straight to the dispatcher and event bus.
pub struct LocalTransport {
    extension_id: ExtensionId,
    dispatcher: Arc<Dispatcher>,
    events: Arc<EventBus>,
}

impl LocalTransport {
    pub fn new(extension_id: &str, dispatcher: Arc<Dispatcher>, events: Arc<EventBus>) -> Self {
        Self {
            extension_id: extension_id.to_string(),
            dispatcher,
            events,
        }
    }
}

impl Transport for LocalTransport {
    fn invoke(&self, namespace: &str, member: &str, args: Vec<Value>) -> ClientResult<Value> {
        let reply = self.dispatcher.handle(&DispatchRequest {
            namespace: namespace.to_string(),
            member: member.to_string(),
            extension_id: self.extension_id.clone(),
            args,
        });
        match reply.error {
            Some(error) => Err(error),
            None => Ok(reply.result.unwrap_or(Value::Null)),
        }
    }

    fn subscribe(&self, channel: &str, callback: EventCallback) -> SubscriptionHandle {
        self.events.subscribe(&self.extension_id, channel, callback)
    }
}

/// One `on*` surface. Listeners stay registered for the lifetime of the
/// returned handle.
pub struct EventStream {
    transport: Arc<dyn Transport>,
    channel: String,
}

impl EventStream {
    fn new(transport: Arc<dyn Transport>, channel: impl Into<String>) -> Self {
        Self {
            transport,
            channel: channel.into(),
        }
    }

    pub fn add_listener(&self, callback: impl Fn(&[Value]) + Send + Sync + 'static) -> SubscriptionHandle {
        self.transport.subscribe(&self.channel, Arc::new(callback))
    }
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> ClientResult<T> {
    serde_json::from_value(value).map_err(|e| ErrorDescriptor {
        kind: crate::error::ErrorKind::InvalidArgument,
        message: format!("malformed reply: {e}"),
    })
}

/// The full typed `chrome.*` client for one extension context.
#[derive(Clone)]
pub struct ChromeClient {
    transport: Arc<dyn Transport>,
}

impl ChromeClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn runtime(&self) -> RuntimeClient {
        RuntimeClient {
            transport: self.transport.clone(),
        }
    }

    pub fn storage(&self) -> StorageClient {
        StorageClient {
            transport: self.transport.clone(),
        }
    }

    pub fn tabs(&self) -> TabsClient {
        TabsClient {
            transport: self.transport.clone(),
        }
    }

    pub fn windows(&self) -> WindowsClient {
        WindowsClient {
            transport: self.transport.clone(),
        }
    }

    pub fn permissions(&self) -> PermissionsClient {
        PermissionsClient {
            transport: self.transport.clone(),
        }
    }

    pub fn cookies(&self) -> CookiesClient {
        CookiesClient {
            transport: self.transport.clone(),
        }
    }

    pub fn notifications(&self) -> NotificationsClient {
        NotificationsClient {
            transport: self.transport.clone(),
        }
    }

    pub fn scripting(&self) -> ScriptingClient {
        ScriptingClient {
            transport: self.transport.clone(),
        }
    }

    pub fn context_menus(&self) -> ContextMenusClient {
        ContextMenusClient {
            transport: self.transport.clone(),
        }
    }

    pub fn i18n(&self) -> I18nClient {
        I18nClient {
            transport: self.transport.clone(),
        }
    }

    pub fn action(&self) -> ActionClient {
        ActionClient {
            transport: self.transport.clone(),
        }
    }

    pub fn web_request(&self) -> WebRequestClient {
        WebRequestClient {
            transport: self.transport.clone(),
        }
    }

    pub fn extension(&self) -> ExtensionClient {
        ExtensionClient {
            transport: self.transport.clone(),
        }
    }

    pub fn management(&self) -> ManagementClient {
        ManagementClient {
            transport: self.transport.clone(),
        }
    }
}

pub struct RuntimeClient {
    transport: Arc<dyn Transport>,
}

impl RuntimeClient {
    pub fn get_manifest(&self) -> ClientResult<Manifest> {
        from_value(self.transport.invoke("runtime", "getManifest", vec![])?)
    }

    pub fn get_url(&self, rel: &str) -> ClientResult<String> {
        from_value(self.transport.invoke("runtime", "getURL", vec![json!(rel)])?)
    }

    pub fn send_message(&self, payload: Value) -> ClientResult<()> {
        self.transport.invoke("runtime", "sendMessage", vec![payload])?;
        Ok(())
    }

    pub fn open_options_page(&self) -> ClientResult<()> {
        self.transport.invoke("runtime", "openOptionsPage", vec![])?;
        Ok(())
    }

    pub fn on_message(&self) -> EventStream {
        EventStream::new(self.transport.clone(), "runtime.onMessage")
    }
}

pub struct StorageClient {
    transport: Arc<dyn Transport>,
}

impl StorageClient {
    pub fn local(&self) -> StorageAreaClient {
        StorageAreaClient {
            transport: self.transport.clone(),
            namespace: "storage.local",
        }
    }

    pub fn sync(&self) -> StorageAreaClient {
        StorageAreaClient {
            transport: self.transport.clone(),
            namespace: "storage.sync",
        }
    }

    pub fn managed(&self) -> StorageAreaClient {
        StorageAreaClient {
            transport: self.transport.clone(),
            namespace: "storage.managed",
        }
    }

    pub fn on_changed(&self) -> EventStream {
        EventStream::new(self.transport.clone(), "storage.onChanged")
    }
}

pub struct StorageAreaClient {
    transport: Arc<dyn Transport>,
    namespace: &'static str,
}

impl StorageAreaClient {
    /// `selector` follows the wire forms: null, a key, a key list, or a
    /// defaults object.
    pub fn get(&self, selector: Value) -> ClientResult<Value> {
        self.transport.invoke(self.namespace, "get", vec![selector])
    }

    pub fn set(&self, items: Value) -> ClientResult<()> {
        self.transport.invoke(self.namespace, "set", vec![items])?;
        Ok(())
    }

    pub fn remove(&self, keys: Value) -> ClientResult<()> {
        self.transport.invoke(self.namespace, "remove", vec![keys])?;
        Ok(())
    }

    pub fn clear(&self) -> ClientResult<()> {
        self.transport.invoke(self.namespace, "clear", vec![])?;
        Ok(())
    }
}

pub struct TabsClient {
    transport: Arc<dyn Transport>,
}

impl TabsClient {
    pub fn create(&self, properties: Value) -> ClientResult<Tab> {
        from_value(self.transport.invoke("tabs", "create", vec![properties])?)
    }

    pub fn get(&self, id: TabId) -> ClientResult<Tab> {
        from_value(self.transport.invoke("tabs", "get", vec![json!(id)])?)
    }

    pub fn get_current(&self) -> ClientResult<Tab> {
        from_value(self.transport.invoke("tabs", "getCurrent", vec![])?)
    }

    pub fn update(&self, id: TabId, delta: &TabDelta) -> ClientResult<Tab> {
        let delta = serde_json::to_value(delta).unwrap_or(Value::Null);
        from_value(self.transport.invoke("tabs", "update", vec![json!(id), delta])?)
    }

    pub fn remove(&self, id: TabId) -> ClientResult<()> {
        self.transport.invoke("tabs", "remove", vec![json!(id)])?;
        Ok(())
    }

    pub fn query(&self, filter: &TabQuery) -> ClientResult<Vec<Tab>> {
        let filter = serde_json::to_value(filter).unwrap_or(Value::Null);
        from_value(self.transport.invoke("tabs", "query", vec![filter])?)
    }
}

pub struct WindowsClient {
    transport: Arc<dyn Transport>,
}

impl WindowsClient {
    pub fn create(&self, spec: &WindowSpec) -> ClientResult<WindowInfo> {
        let spec = serde_json::to_value(spec).unwrap_or(Value::Null);
        from_value(self.transport.invoke("windows", "create", vec![spec])?)
    }

    pub fn update(&self, id: WindowId, delta: &WindowDelta) -> ClientResult<WindowInfo> {
        let delta = serde_json::to_value(delta).unwrap_or(Value::Null);
        from_value(self.transport.invoke("windows", "update", vec![json!(id), delta])?)
    }

    pub fn remove(&self, id: WindowId) -> ClientResult<()> {
        self.transport.invoke("windows", "remove", vec![json!(id)])?;
        Ok(())
    }

    pub fn get(&self, id: WindowId, populate: bool) -> ClientResult<WindowInfo> {
        from_value(self.transport.invoke(
            "windows",
            "get",
            vec![json!(id), json!({"populate": populate})],
        )?)
    }

    pub fn get_current(&self) -> ClientResult<WindowInfo> {
        from_value(self.transport.invoke("windows", "getCurrent", vec![])?)
    }

    pub fn get_all(&self, populate: bool) -> ClientResult<Vec<WindowInfo>> {
        from_value(self.transport.invoke(
            "windows",
            "getAll",
            vec![json!({"populate": populate})],
        )?)
    }
}

pub struct PermissionsClient {
    transport: Arc<dyn Transport>,
}

impl PermissionsClient {
    pub fn contains(&self, query: Value) -> ClientResult<bool> {
        from_value(self.transport.invoke("permissions", "contains", vec![query])?)
    }

    pub fn request(&self, query: Value) -> ClientResult<bool> {
        from_value(self.transport.invoke("permissions", "request", vec![query])?)
    }

    pub fn remove(&self, query: Value) -> ClientResult<bool> {
        from_value(self.transport.invoke("permissions", "remove", vec![query])?)
    }

    pub fn get_all(&self) -> ClientResult<Value> {
        self.transport.invoke("permissions", "getAll", vec![])
    }

    pub fn on_added(&self) -> EventStream {
        EventStream::new(self.transport.clone(), "permissions.onAdded")
    }

    pub fn on_removed(&self) -> EventStream {
        EventStream::new(self.transport.clone(), "permissions.onRemoved")
    }
}

pub struct CookiesClient {
    transport: Arc<dyn Transport>,
}

impl CookiesClient {
    pub fn get(&self, url: &str, name: &str) -> ClientResult<Option<Cookie>> {
        from_value(self.transport.invoke(
            "cookies",
            "get",
            vec![json!({"url": url, "name": name})],
        )?)
    }

    pub fn get_all(&self, filter: &CookieFilter) -> ClientResult<Vec<Cookie>> {
        let filter = serde_json::to_value(filter).unwrap_or(Value::Null);
        from_value(self.transport.invoke("cookies", "getAll", vec![filter])?)
    }

    pub fn set(&self, details: Value) -> ClientResult<Cookie> {
        from_value(self.transport.invoke("cookies", "set", vec![details])?)
    }

    pub fn remove(&self, url: &str, name: &str) -> ClientResult<()> {
        self.transport.invoke(
            "cookies",
            "remove",
            vec![json!({"url": url, "name": name})],
        )?;
        Ok(())
    }
}

pub struct NotificationsClient {
    transport: Arc<dyn Transport>,
}

impl NotificationsClient {
    pub fn create(&self, id: Option<&str>, options: &NotificationOptions) -> ClientResult<String> {
        let options = serde_json::to_value(options).unwrap_or(Value::Null);
        let args = match id {
            Some(id) => vec![json!(id), options],
            None => vec![options],
        };
        from_value(self.transport.invoke("notifications", "create", args)?)
    }

    pub fn update(&self, id: &str, options: &NotificationOptions) -> ClientResult<bool> {
        let options = serde_json::to_value(options).unwrap_or(Value::Null);
        from_value(self.transport.invoke("notifications", "update", vec![json!(id), options])?)
    }

    pub fn clear(&self, id: &str) -> ClientResult<bool> {
        from_value(self.transport.invoke("notifications", "clear", vec![json!(id)])?)
    }

    pub fn get_all(&self) -> ClientResult<Value> {
        self.transport.invoke("notifications", "getAll", vec![])
    }

    pub fn on_clicked(&self) -> EventStream {
        EventStream::new(self.transport.clone(), "notifications.onClicked")
    }

    pub fn on_closed(&self) -> EventStream {
        EventStream::new(self.transport.clone(), "notifications.onClosed")
    }
}

pub struct ScriptingClient {
    transport: Arc<dyn Transport>,
}

impl ScriptingClient {
    pub fn execute_script(&self, injection: Value) -> ClientResult<Value> {
        self.transport.invoke("scripting", "executeScript", vec![injection])
    }

    pub fn insert_css(&self, injection: Value) -> ClientResult<()> {
        self.transport.invoke("scripting", "insertCSS", vec![injection])?;
        Ok(())
    }
}

pub struct ContextMenusClient {
    transport: Arc<dyn Transport>,
}

impl ContextMenusClient {
    /// Returns the item id, generated when the properties carry none.
    pub fn create(&self, properties: Value) -> ClientResult<String> {
        from_value(self.transport.invoke("contextMenus", "create", vec![properties])?)
    }

    pub fn update(&self, id: &str, changes: Value) -> ClientResult<()> {
        self.transport.invoke("contextMenus", "update", vec![json!(id), changes])?;
        Ok(())
    }

    pub fn remove(&self, id: &str) -> ClientResult<()> {
        self.transport.invoke("contextMenus", "remove", vec![json!(id)])?;
        Ok(())
    }

    pub fn remove_all(&self) -> ClientResult<()> {
        self.transport.invoke("contextMenus", "removeAll", vec![])?;
        Ok(())
    }

    pub fn on_clicked(&self) -> EventStream {
        EventStream::new(self.transport.clone(), "contextMenus.onClicked")
    }
}

pub struct I18nClient {
    transport: Arc<dyn Transport>,
}

impl I18nClient {
    pub fn get_message(&self, name: &str, substitutions: &[&str]) -> ClientResult<String> {
        from_value(self.transport.invoke(
            "i18n",
            "getMessage",
            vec![json!(name), json!(substitutions)],
        )?)
    }

    pub fn get_ui_language(&self) -> ClientResult<String> {
        from_value(self.transport.invoke("i18n", "getUILanguage", vec![])?)
    }
}

pub struct ActionClient {
    transport: Arc<dyn Transport>,
}

impl ActionClient {
    pub fn set_title(&self, title: &str) -> ClientResult<()> {
        self.transport.invoke("action", "setTitle", vec![json!({"title": title})])?;
        Ok(())
    }

    pub fn set_popup(&self, popup: &str) -> ClientResult<()> {
        self.transport.invoke("action", "setPopup", vec![json!({"popup": popup})])?;
        Ok(())
    }

    pub fn open_popup(&self) -> ClientResult<WindowInfo> {
        from_value(self.transport.invoke("action", "openPopup", vec![])?)
    }

    pub fn on_clicked(&self) -> EventStream {
        EventStream::new(self.transport.clone(), "action.onClicked")
    }
}

pub struct WebRequestClient {
    transport: Arc<dyn Transport>,
}

impl WebRequestClient {
    pub fn handler_behavior_changed(&self) -> ClientResult<()> {
        self.transport.invoke("webRequest", "handlerBehaviorChanged", vec![])?;
        Ok(())
    }

    pub fn on(&self, stage: RequestStage) -> EventStream {
        EventStream::new(self.transport.clone(), stage.channel())
    }
}

pub struct ExtensionClient {
    transport: Arc<dyn Transport>,
}

impl ExtensionClient {
    pub fn get_url(&self, rel: &str) -> ClientResult<String> {
        from_value(self.transport.invoke("extension", "getURL", vec![json!(rel)])?)
    }
}

pub struct ManagementClient {
    transport: Arc<dyn Transport>,
}

impl ManagementClient {
    pub fn get_all(&self) -> ClientResult<Value> {
        self.transport.invoke("management", "getAll", vec![])
    }

    pub fn install(&self, id: &str) -> ClientResult<Value> {
        self.transport.invoke("management", "install", vec![json!(id)])
    }

    pub fn uninstall(&self, id: &str) -> ClientResult<()> {
        self.transport.invoke("management", "uninstall", vec![json!(id)])?;
        Ok(())
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> ClientResult<()> {
        self.transport.invoke("management", "setEnabled", vec![json!(id), json!(enabled)])?;
        Ok(())
    }
}
