//! `chrome.contextMenus` capability module.
//!
//! Menu items from every extension live in one process-wide
//! [`MenuRegistry`] keyed by `(extension id, item id)`, so two extensions
//! can use the same item id without colliding and removal on uninstall is a
//! single range sweep. The shell reads the table when it builds a context
//! menu and calls [`MenuRegistry::notify_clicked`] when an item is chosen.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ExtensionError, ExtensionResult};
use crate::events::EventBus;
use crate::host::Tab;
use crate::ExtensionId;

/// One registered menu item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    /// Where the item appears: "page", "selection", "link", "image", "all".
    #[serde(default = "default_contexts")]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_contexts() -> Vec<String> {
    vec!["page".to_string()]
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProperties {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default = "default_contexts")]
    contexts: Vec<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProperties {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    contexts: Option<Vec<String>>,
    #[serde(default)]
    enabled: Option<bool>,
}

/// Process-wide table of menu items across all extensions.
pub struct MenuRegistry {
    bus: Arc<EventBus>,
    inner: Mutex<MenuInner>,
}

struct MenuInner {
    items: BTreeMap<(ExtensionId, String), MenuItem>,
    next_generated_id: u64,
}

impl MenuRegistry {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            inner: Mutex::new(MenuInner {
                items: BTreeMap::new(),
                next_generated_id: 1,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MenuInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts an item, generating an id when the caller did not supply one.
    /// Re-creating an existing id replaces the item in place.
    pub fn create(&self, extension_id: &str, item: MenuItem) -> String {
        let mut inner = self.lock();
        let id = item.id.clone();
        inner.items.insert((extension_id.to_string(), id.clone()), item);
        id
    }

    fn generate_id(&self) -> String {
        let mut inner = self.lock();
        let id = inner.next_generated_id;
        inner.next_generated_id += 1;
        id.to_string()
    }

    pub fn update(
        &self,
        extension_id: &str,
        item_id: &str,
        changes: &Value,
    ) -> ExtensionResult<()> {
        let props: UpdateProperties = serde_json::from_value(changes.clone())?;
        let mut inner = self.lock();
        let key = (extension_id.to_string(), item_id.to_string());
        let item = inner
            .items
            .get_mut(&key)
            .ok_or_else(|| ExtensionError::NotFound(format!("menu item {item_id}")))?;
        if let Some(title) = props.title {
            item.title = title;
        }
        if let Some(contexts) = props.contexts {
            item.contexts = contexts;
        }
        if let Some(enabled) = props.enabled {
            item.enabled = enabled;
        }
        Ok(())
    }

    pub fn remove(&self, extension_id: &str, item_id: &str) -> ExtensionResult<()> {
        let key = (extension_id.to_string(), item_id.to_string());
        self.lock()
            .items
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| ExtensionError::NotFound(format!("menu item {item_id}")))
    }

    /// Removes every item one extension registered. Used both by the
    /// `removeAll` operation and by registry teardown on uninstall.
    pub fn remove_all(&self, extension_id: &str) {
        self.lock()
            .items
            .retain(|(owner, _), _| owner != extension_id);
    }

    /// Items one extension registered, in id order.
    pub fn items_for(&self, extension_id: &str) -> Vec<MenuItem> {
        self.lock()
            .items
            .iter()
            .filter(|((owner, _), _)| owner == extension_id)
            .map(|(_, item)| item.clone())
            .collect()
    }

    /// All items across extensions, for the shell's menu builder.
    pub fn all_items(&self) -> Vec<(ExtensionId, MenuItem)> {
        self.lock()
            .items
            .iter()
            .map(|((owner, _), item)| (owner.clone(), item.clone()))
            .collect()
    }

    /// Reports a click on an item back to only the owning extension.
    pub fn notify_clicked(&self, extension_id: &str, item_id: &str, tab: Option<&Tab>) {
        let known = self
            .lock()
            .items
            .contains_key(&(extension_id.to_string(), item_id.to_string()));
        if !known {
            log::warn!("click on unknown menu item {item_id} of {extension_id}");
            return;
        }
        let info = json!({ "menuItemId": item_id });
        let tab_value = match tab {
            Some(tab) => serde_json::to_value(tab).unwrap_or(Value::Null),
            None => Value::Null,
        };
        self.bus
            .publish(extension_id, "contextMenus.onClicked", &[info, tab_value]);
    }
}

pub struct ContextMenus {
    extension_id: ExtensionId,
    registry: Arc<MenuRegistry>,
}

impl ContextMenus {
    pub fn new(extension_id: ExtensionId, registry: Arc<MenuRegistry>) -> Self {
        Self {
            extension_id,
            registry,
        }
    }

    pub fn invoke(&self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        match member {
            "create" => {
                let props: CreateProperties = serde_json::from_value(
                    args.first().cloned().ok_or_else(|| {
                        ExtensionError::InvalidArgument("create properties required".into())
                    })?,
                )?;
                let id = props.id.unwrap_or_else(|| self.registry.generate_id());
                let item = MenuItem {
                    id,
                    title: props.title,
                    contexts: props.contexts,
                    parent_id: props.parent_id,
                    enabled: props.enabled,
                };
                let id = self.registry.create(&self.extension_id, item);
                Ok(Value::String(id))
            }
            "update" => {
                let id = item_id_arg(args)?;
                let changes = args.get(1).cloned().unwrap_or_else(|| json!({}));
                self.registry.update(&self.extension_id, &id, &changes)?;
                Ok(Value::Null)
            }
            "remove" => {
                let id = item_id_arg(args)?;
                self.registry.remove(&self.extension_id, &id)?;
                Ok(Value::Null)
            }
            "removeAll" => {
                self.registry.remove_all(&self.extension_id);
                Ok(Value::Null)
            }
            other => Err(ExtensionError::ApiNotFound {
                namespace: "contextMenus".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

fn item_id_arg(args: &[Value]) -> ExtensionResult<String> {
    match args.first() {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ExtensionError::InvalidArgument(
            "menu item id required".into(),
        )),
    }
}
