//! `chrome.storage` capability module.
//!
//! Three independent key-value areas per extension (`local`, `sync`,
//! `managed`), each backed by one JSON file. Mutations compute a diff by
//! deep value comparison first; only a non-empty diff persists and fires a
//! `storage.onChanged` event enumerating exactly the changed keys with
//! their old and new values. The `managed` area has no backing writer and
//! rejects mutation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ExtensionError, ExtensionResult};
use crate::events::EventBus;
use crate::ExtensionId;

/// Key-selection argument accepted by `get`.
pub enum KeySelector {
    /// `null`/absent: the entire map.
    All,
    Single(String),
    Many(Vec<String>),
    /// Object form: keys to read, with default values for absent keys.
    Defaults(Map<String, Value>),
}

impl KeySelector {
    /// Interpret the first wire argument of a `get` call.
    pub fn from_arg(arg: Option<&Value>) -> ExtensionResult<Self> {
        match arg {
            None | Some(Value::Null) => Ok(Self::All),
            Some(Value::String(key)) => Ok(Self::Single(key.clone())),
            Some(Value::Array(keys)) => {
                let mut list = Vec::with_capacity(keys.len());
                for key in keys {
                    match key {
                        Value::String(k) => list.push(k.clone()),
                        other => {
                            return Err(ExtensionError::InvalidArgument(format!(
                                "storage key must be a string, got {other}"
                            )))
                        }
                    }
                }
                Ok(Self::Many(list))
            }
            Some(Value::Object(defaults)) => Ok(Self::Defaults(defaults.clone())),
            Some(other) => Err(ExtensionError::InvalidArgument(format!(
                "invalid storage key selector: {other}"
            ))),
        }
    }
}

/// One storage area of one extension.
pub struct StorageArea {
    extension_id: ExtensionId,
    /// Area name carried in change events (`local`, `sync`, `managed`).
    area: &'static str,
    /// Backing file; `None` means no writer is configured (managed area).
    path: Option<PathBuf>,
    data: BTreeMap<String, Value>,
    events: Arc<EventBus>,
}

impl StorageArea {
    fn new(
        extension_id: &str,
        area: &'static str,
        path: Option<PathBuf>,
        events: Arc<EventBus>,
    ) -> Self {
        // Read failure means no prior state, never an error.
        let data = path
            .as_deref()
            .filter(|p| p.exists())
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        Self {
            extension_id: extension_id.to_string(),
            area,
            path,
            data,
            events,
        }
    }

    /// Read values per the selector. The object form seeds defaults for
    /// absent keys before overlaying stored values.
    pub fn get(&self, keys: KeySelector) -> Value {
        match keys {
            KeySelector::All => {
                Value::Object(self.data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            KeySelector::Single(key) => {
                let mut out = Map::new();
                if let Some(value) = self.data.get(&key) {
                    out.insert(key, value.clone());
                }
                Value::Object(out)
            }
            KeySelector::Many(keys) => {
                let mut out = Map::new();
                for key in keys {
                    if let Some(value) = self.data.get(&key) {
                        out.insert(key, value.clone());
                    }
                }
                Value::Object(out)
            }
            KeySelector::Defaults(defaults) => {
                let mut out = defaults;
                for (key, slot) in out.iter_mut() {
                    if let Some(value) = self.data.get(key) {
                        *slot = value.clone();
                    }
                }
                Value::Object(out)
            }
        }
    }

    /// Write values. Keys whose new value deep-equals the stored value are
    /// dropped from the diff; an empty diff writes nothing and fires
    /// nothing.
    pub fn set(&mut self, items: Map<String, Value>) -> ExtensionResult<()> {
        self.check_writable()?;

        let mut changes = Map::new();
        for (key, new_value) in items {
            let old_value = self.data.get(&key);
            if old_value == Some(&new_value) {
                continue;
            }
            changes.insert(
                key.clone(),
                change_entry(old_value.cloned(), Some(new_value.clone())),
            );
            self.data.insert(key, new_value);
        }

        self.commit(changes);
        Ok(())
    }

    /// Remove one key or a list of keys.
    pub fn remove(&mut self, keys: &Value) -> ExtensionResult<()> {
        self.check_writable()?;

        let keys = match KeySelector::from_arg(Some(keys))? {
            KeySelector::Single(key) => vec![key],
            KeySelector::Many(keys) => keys,
            _ => {
                return Err(ExtensionError::InvalidArgument(
                    "remove expects a key or a list of keys".to_string(),
                ))
            }
        };

        let mut changes = Map::new();
        for key in keys {
            if let Some(old_value) = self.data.remove(&key) {
                changes.insert(key, change_entry(Some(old_value), None));
            }
        }

        self.commit(changes);
        Ok(())
    }

    /// Drop every key.
    pub fn clear(&mut self) -> ExtensionResult<()> {
        self.check_writable()?;

        let mut changes = Map::new();
        for (key, old_value) in std::mem::take(&mut self.data) {
            changes.insert(key, change_entry(Some(old_value), None));
        }

        self.commit(changes);
        Ok(())
    }

    fn check_writable(&self) -> ExtensionResult<()> {
        if self.path.is_none() {
            return Err(ExtensionError::PermissionDenied(format!(
                "storage.{} is read-only",
                self.area
            )));
        }
        Ok(())
    }

    /// Persist then notify, in that order. A failed write is logged and
    /// the in-memory mutation stands.
    fn commit(&mut self, changes: Map<String, Value>) {
        if changes.is_empty() {
            return;
        }

        self.persist();

        self.events.publish(
            &self.extension_id,
            "storage.onChanged",
            &[Value::Object(changes), Value::String(self.area.to_string())],
        );
    }

    fn persist(&self) {
        let Some(path) = &self.path else { return };

        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(&self.data)?;
            std::fs::write(path, contents)
        };

        if let Err(e) = write() {
            log::warn!(
                "failed to persist storage.{} for extension '{}': {}",
                self.area,
                self.extension_id,
                e
            );
        }
    }

    /// Route one wire-level call to this area.
    pub fn invoke(&mut self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        match member {
            "get" => Ok(self.get(KeySelector::from_arg(args.first())?)),
            "set" => {
                let items = match args.first() {
                    Some(Value::Object(items)) => items.clone(),
                    _ => {
                        return Err(ExtensionError::InvalidArgument(
                            "set expects an object of key/value pairs".to_string(),
                        ))
                    }
                };
                self.set(items)?;
                Ok(Value::Null)
            }
            "remove" => {
                let keys = args.first().ok_or_else(|| {
                    ExtensionError::InvalidArgument("remove expects keys".to_string())
                })?;
                self.remove(keys)?;
                Ok(Value::Null)
            }
            "clear" => {
                self.clear()?;
                Ok(Value::Null)
            }
            other => Err(ExtensionError::ApiNotFound {
                namespace: format!("storage.{}", self.area),
                member: other.to_string(),
            }),
        }
    }
}

fn change_entry(old_value: Option<Value>, new_value: Option<Value>) -> Value {
    let mut entry = Map::new();
    if let Some(old) = old_value {
        entry.insert("oldValue".to_string(), old);
    }
    if let Some(new) = new_value {
        entry.insert("newValue".to_string(), new);
    }
    Value::Object(entry)
}

/// The full `chrome.storage` surface for one extension.
pub struct Storage {
    local: StorageArea,
    sync: StorageArea,
    managed: StorageArea,
}

impl Storage {
    /// Build the three areas, loading any prior state from `storage_dir`.
    ///
    /// `sync` is not actually synced anywhere; it is a second local area
    /// kept separate so data survives a future real sync backend.
    pub fn new(extension_id: &str, storage_dir: PathBuf, events: Arc<EventBus>) -> Self {
        let area_path = |area: &str| storage_dir.join(format!("{extension_id}.{area}.json"));

        Self {
            local: StorageArea::new(
                extension_id,
                "local",
                Some(area_path("local")),
                events.clone(),
            ),
            sync: StorageArea::new(extension_id, "sync", Some(area_path("sync")), events.clone()),
            managed: StorageArea::new(extension_id, "managed", None, events),
        }
    }

    pub fn area_mut(&mut self, area: &str) -> Option<&mut StorageArea> {
        match area {
            "local" => Some(&mut self.local),
            "sync" => Some(&mut self.sync),
            "managed" => Some(&mut self.managed),
            _ => None,
        }
    }

    pub fn local(&self) -> &StorageArea {
        &self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn area(temp: &TempDir, events: Arc<EventBus>) -> StorageArea {
        StorageArea::new(
            "test-ext",
            "local",
            Some(temp.path().join("test-ext.local.json")),
            events,
        )
    }

    #[test]
    fn test_read_your_write() {
        let temp = TempDir::new().unwrap();
        let mut area = area(&temp, EventBus::new());

        area.set(json!({"k": "v"}).as_object().unwrap().clone()).unwrap();
        let got = area.get(KeySelector::Single("k".into()));
        assert_eq!(got, json!({"k": "v"}));
    }

    #[test]
    fn test_change_event_payload() {
        let temp = TempDir::new().unwrap();
        let events = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        let _h = events.subscribe("test-ext", "storage.onChanged", Arc::new(move |args| {
            s.lock().unwrap().push(args.to_vec());
        }));

        let mut area = area(&temp, events);
        area.set(json!({"a": 1}).as_object().unwrap().clone()).unwrap();
        area.set(json!({"a": 2}).as_object().unwrap().clone()).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0][0], json!({"a": {"newValue": 1}}));
        assert_eq!(seen[0][1], json!("local"));
        assert_eq!(seen[1][0], json!({"a": {"oldValue": 1, "newValue": 2}}));
    }

    #[test]
    fn test_noop_write_fires_nothing_and_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let events = EventBus::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        let _h = events.subscribe("test-ext", "storage.onChanged", Arc::new(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        }));

        let mut area = area(&temp, events);
        area.set(json!({"a": 1}).as_object().unwrap().clone()).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let mtime = std::fs::metadata(temp.path().join("test-ext.local.json"))
            .unwrap()
            .modified()
            .unwrap();

        // Same value again: no event, no write.
        area.set(json!({"a": 1}).as_object().unwrap().clone()).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        let mtime2 = std::fs::metadata(temp.path().join("test-ext.local.json"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(mtime, mtime2);
    }

    #[test]
    fn test_get_selectors() {
        let temp = TempDir::new().unwrap();
        let mut area = area(&temp, EventBus::new());
        area.set(json!({"a": 1, "b": 2}).as_object().unwrap().clone())
            .unwrap();

        assert_eq!(area.get(KeySelector::All), json!({"a": 1, "b": 2}));
        assert_eq!(
            area.get(KeySelector::Many(vec!["a".into(), "missing".into()])),
            json!({"a": 1})
        );
        // Object form: defaults seed absent keys.
        let defaults = json!({"a": 0, "c": 3}).as_object().unwrap().clone();
        assert_eq!(area.get(KeySelector::Defaults(defaults)), json!({"a": 1, "c": 3}));
    }

    #[test]
    fn test_remove_and_clear() {
        let temp = TempDir::new().unwrap();
        let mut area = area(&temp, EventBus::new());
        area.set(json!({"a": 1, "b": 2}).as_object().unwrap().clone())
            .unwrap();

        area.remove(&json!("a")).unwrap();
        assert_eq!(area.get(KeySelector::All), json!({"b": 2}));

        area.clear().unwrap();
        assert_eq!(area.get(KeySelector::All), json!({}));
    }

    #[test]
    fn test_persistence_across_instances() {
        let temp = TempDir::new().unwrap();
        {
            let mut area = area(&temp, EventBus::new());
            area.set(json!({"persist": 42}).as_object().unwrap().clone())
                .unwrap();
        }
        let area = area(&temp, EventBus::new());
        assert_eq!(area.get(KeySelector::All), json!({"persist": 42}));
    }

    #[test]
    fn test_isolation_between_extensions() {
        let temp = TempDir::new().unwrap();
        let events = EventBus::new();
        let mut a = Storage::new("ext-a", temp.path().to_path_buf(), events.clone());
        let mut b = Storage::new("ext-b", temp.path().to_path_buf(), events);

        a.area_mut("local")
            .unwrap()
            .set(json!({"k": "from-a"}).as_object().unwrap().clone())
            .unwrap();
        b.area_mut("local")
            .unwrap()
            .set(json!({"k": "from-b"}).as_object().unwrap().clone())
            .unwrap();

        assert_eq!(
            a.area_mut("local").unwrap().get(KeySelector::All),
            json!({"k": "from-a"})
        );
        assert_eq!(
            b.area_mut("local").unwrap().get(KeySelector::All),
            json!({"k": "from-b"})
        );
    }

    #[test]
    fn test_managed_area_is_read_only() {
        let temp = TempDir::new().unwrap();
        let mut storage = Storage::new("ext", temp.path().to_path_buf(), EventBus::new());
        let managed = storage.area_mut("managed").unwrap();

        assert_eq!(managed.get(KeySelector::All), json!({}));
        assert!(matches!(
            managed.set(json!({"a": 1}).as_object().unwrap().clone()),
            Err(ExtensionError::PermissionDenied(_))
        ));
        assert!(managed.clear().is_err());
    }

    #[test]
    fn test_invoke_wire_routing() {
        let temp = TempDir::new().unwrap();
        let mut area = area(&temp, EventBus::new());

        area.invoke("set", &[json!({"x": true})]).unwrap();
        assert_eq!(area.invoke("get", &[json!("x")]).unwrap(), json!({"x": true}));
        assert!(matches!(
            area.invoke("explode", &[]),
            Err(ExtensionError::ApiNotFound { .. })
        ));
    }
}
