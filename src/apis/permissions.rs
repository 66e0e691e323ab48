//! `chrome.permissions` capability module.
//!
//! Granted API permissions and origin patterns persist in one JSON file
//! per extension, shaped `{ "permissions": [], "origins": [] }`. A missing
//! file means empty sets, not an error. Mutations persist before the
//! in-memory change commits, and the matching `onAdded`/`onRemoved` event
//! fires only after persistence succeeds.
//!
//! `request` currently auto-grants everything asked for. A real consent
//! prompt is a pending product decision; callers must not rely on a grant
//! ever being refused.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ExtensionError, ExtensionResult};
use crate::events::EventBus;
use crate::ExtensionId;

/// Query/grant shape used by contains, request and remove.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionQuery {
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub origins: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PermissionsFile {
    #[serde(default)]
    permissions: BTreeSet<String>,
    #[serde(default)]
    origins: BTreeSet<String>,
}

pub struct Permissions {
    extension_id: ExtensionId,
    path: PathBuf,
    permissions: BTreeSet<String>,
    origins: BTreeSet<String>,
    events: Arc<EventBus>,
}

impl Permissions {
    /// Load the granted sets from the extension's permissions file.
    pub fn load(extension_id: &str, path: PathBuf, events: Arc<EventBus>) -> Self {
        let file: PermissionsFile = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        Self {
            extension_id: extension_id.to_string(),
            path,
            permissions: file.permissions,
            origins: file.origins,
            events,
        }
    }

    /// Pure membership check: true iff every requested permission and
    /// origin is already granted.
    pub fn contains(&self, query: &PermissionQuery) -> bool {
        query.permissions.iter().all(|p| self.permissions.contains(p))
            && query.origins.iter().all(|o| self.origins.contains(o))
    }

    /// Grant everything in the query. Additive only; persists before the
    /// grant commits, then fires `permissions.onAdded`.
    pub fn request(&mut self, query: PermissionQuery) -> ExtensionResult<bool> {
        let added = PermissionQuery {
            permissions: query
                .permissions
                .iter()
                .filter(|p| !self.permissions.contains(*p))
                .cloned()
                .collect(),
            origins: query
                .origins
                .iter()
                .filter(|o| !self.origins.contains(*o))
                .cloned()
                .collect(),
        };

        if added.permissions.is_empty() && added.origins.is_empty() {
            return Ok(true);
        }

        let mut next_permissions = self.permissions.clone();
        next_permissions.extend(added.permissions.iter().cloned());
        let mut next_origins = self.origins.clone();
        next_origins.extend(added.origins.iter().cloned());

        self.persist(&next_permissions, &next_origins)?;
        self.permissions = next_permissions;
        self.origins = next_origins;

        self.events.publish(
            &self.extension_id,
            "permissions.onAdded",
            &[serde_json::to_value(&added)?],
        );
        Ok(true)
    }

    /// Subtract everything in the query. Persists and fires
    /// `permissions.onRemoved` only when something was actually removed.
    pub fn remove(&mut self, query: PermissionQuery) -> ExtensionResult<bool> {
        let removed = PermissionQuery {
            permissions: query
                .permissions
                .iter()
                .filter(|p| self.permissions.contains(*p))
                .cloned()
                .collect(),
            origins: query
                .origins
                .iter()
                .filter(|o| self.origins.contains(*o))
                .cloned()
                .collect(),
        };

        if removed.permissions.is_empty() && removed.origins.is_empty() {
            return Ok(false);
        }

        let mut next_permissions = self.permissions.clone();
        for p in &removed.permissions {
            next_permissions.remove(p);
        }
        let mut next_origins = self.origins.clone();
        for o in &removed.origins {
            next_origins.remove(o);
        }

        self.persist(&next_permissions, &next_origins)?;
        self.permissions = next_permissions;
        self.origins = next_origins;

        self.events.publish(
            &self.extension_id,
            "permissions.onRemoved",
            &[serde_json::to_value(&removed)?],
        );
        Ok(true)
    }

    /// Snapshot of everything currently granted.
    pub fn get_all(&self) -> PermissionQuery {
        PermissionQuery {
            permissions: self.permissions.iter().cloned().collect(),
            origins: self.origins.iter().cloned().collect(),
        }
    }

    fn persist(
        &self,
        permissions: &BTreeSet<String>,
        origins: &BTreeSet<String>,
    ) -> ExtensionResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = PermissionsFile {
            permissions: permissions.clone(),
            origins: origins.clone(),
        };
        let contents = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    pub fn invoke(&mut self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        let query = |args: &[Value]| -> ExtensionResult<PermissionQuery> {
            match args.first() {
                Some(v) if !v.is_null() => Ok(serde_json::from_value(v.clone())?),
                _ => Ok(PermissionQuery::default()),
            }
        };

        match member {
            "contains" => Ok(Value::Bool(self.contains(&query(args)?))),
            "request" => Ok(Value::Bool(self.request(query(args)?)?)),
            "remove" => Ok(Value::Bool(self.remove(query(args)?)?)),
            "getAll" => Ok(serde_json::to_value(self.get_all())?),
            other => Err(ExtensionError::ApiNotFound {
                namespace: "permissions".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn query(perms: &[&str]) -> PermissionQuery {
        PermissionQuery {
            permissions: perms.iter().map(|s| s.to_string()).collect(),
            origins: Vec::new(),
        }
    }

    #[test]
    fn test_missing_file_means_empty_sets() {
        let temp = TempDir::new().unwrap();
        let perms = Permissions::load("ext", temp.path().join("permissions.json"), EventBus::new());
        assert!(perms.contains(&PermissionQuery::default()));
        assert!(!perms.contains(&query(&["tabs"])));
    }

    #[test]
    fn test_request_then_contains_then_remove() {
        let temp = TempDir::new().unwrap();
        let mut perms =
            Permissions::load("ext", temp.path().join("permissions.json"), EventBus::new());

        assert!(perms.request(query(&["tabs"])).unwrap());
        assert!(perms.contains(&query(&["tabs"])));

        assert!(perms.remove(query(&["tabs"])).unwrap());
        assert!(!perms.contains(&query(&["tabs"])));
    }

    #[test]
    fn test_persisted_before_commit_and_across_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("permissions.json");

        let mut perms = Permissions::load("ext", path.clone(), EventBus::new());
        perms
            .request(PermissionQuery {
                permissions: vec!["cookies".into()],
                origins: vec!["https://*.example.com/*".into()],
            })
            .unwrap();

        // The file reflects the grant immediately.
        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["permissions"], json!(["cookies"]));
        assert_eq!(on_disk["origins"], json!(["https://*.example.com/*"]));

        let reloaded = Permissions::load("ext", path, EventBus::new());
        assert!(reloaded.contains(&query(&["cookies"])));
    }

    #[test]
    fn test_events_fire_only_on_actual_change() {
        let temp = TempDir::new().unwrap();
        let events = EventBus::new();
        let added = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));

        let a = added.clone();
        let _h1 = events.subscribe("ext", "permissions.onAdded", Arc::new(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        }));
        let r = removed.clone();
        let _h2 = events.subscribe("ext", "permissions.onRemoved", Arc::new(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        }));

        let mut perms =
            Permissions::load("ext", temp.path().join("permissions.json"), events);

        perms.request(query(&["tabs"])).unwrap();
        perms.request(query(&["tabs"])).unwrap(); // already granted
        assert_eq!(added.load(Ordering::SeqCst), 1);

        assert!(!perms.remove(query(&["other"])).unwrap()); // nothing to remove
        assert_eq!(removed.load(Ordering::SeqCst), 0);

        perms.remove(query(&["tabs"])).unwrap();
        assert_eq!(removed.load(Ordering::SeqCst), 1);
    }
}
