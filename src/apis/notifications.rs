//! `chrome.notifications` capability module.
//!
//! At most one live OS notification per id. The tray has no in-place
//! update, so `update` is defined as close-then-recreate. Click and close
//! interactions come back from the shell through the
//! [`NotificationSignal`] handed over at show time.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ExtensionError, ExtensionResult};
use crate::events::{EventBus, NotificationSignal};
use crate::host::{NotificationHost, NotificationOptions};
use crate::ExtensionId;

pub struct Notifications {
    extension_id: ExtensionId,
    host: Arc<dyn NotificationHost>,
    events: Arc<EventBus>,
    live: HashMap<String, NotificationOptions>,
    next_id: u64,
}

impl Notifications {
    pub fn new(extension_id: &str, host: Arc<dyn NotificationHost>, events: Arc<EventBus>) -> Self {
        Self {
            extension_id: extension_id.to_string(),
            host,
            events,
            live: HashMap::new(),
            next_id: 0,
        }
    }

    /// Show a notification. A caller-supplied id replaces any live
    /// notification under that id; without one an id is generated.
    pub fn create(
        &mut self,
        id: Option<String>,
        options: NotificationOptions,
    ) -> ExtensionResult<String> {
        let id = match id {
            Some(id) if !id.is_empty() => id,
            _ => {
                self.next_id += 1;
                format!("{}@{}", self.extension_id, self.next_id)
            }
        };

        if self.live.contains_key(&id) {
            self.clear(&id)?;
        }

        let signal = NotificationSignal::new(self.events.clone(), &self.extension_id, &id);
        self.host.show_notification(&id, &options, signal)?;
        self.live.insert(id.clone(), options);
        Ok(id)
    }

    /// Close-then-recreate under the same id. False when the id was not
    /// live.
    pub fn update(&mut self, id: &str, options: NotificationOptions) -> ExtensionResult<bool> {
        if !self.live.contains_key(id) {
            return Ok(false);
        }
        self.clear(id)?;
        self.create(Some(id.to_string()), options)?;
        Ok(true)
    }

    /// Dismiss a live notification. False when the id was not live.
    pub fn clear(&mut self, id: &str) -> ExtensionResult<bool> {
        if self.live.remove(id).is_none() {
            return Ok(false);
        }
        self.host.close_notification(id)?;
        Ok(true)
    }

    pub fn get_all(&self) -> ExtensionResult<Value> {
        Ok(serde_json::to_value(&self.live)?)
    }

    pub fn invoke(&mut self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        match member {
            "create" => {
                // Either (id, options) or just (options).
                let (id, options) = match (args.first(), args.get(1)) {
                    (Some(Value::String(id)), Some(opts)) => {
                        (Some(id.clone()), serde_json::from_value(opts.clone())?)
                    }
                    (Some(opts), None) => (None, serde_json::from_value(opts.clone())?),
                    _ => {
                        return Err(ExtensionError::InvalidArgument(
                            "create expects notification options".to_string(),
                        ))
                    }
                };
                Ok(Value::String(self.create(id, options)?))
            }
            "update" => {
                let id = args.first().and_then(Value::as_str).ok_or_else(|| {
                    ExtensionError::InvalidArgument("update expects a notification id".to_string())
                })?;
                let options = match args.get(1) {
                    Some(opts) => serde_json::from_value(opts.clone())?,
                    None => NotificationOptions::default(),
                };
                Ok(Value::Bool(self.update(id, options)?))
            }
            "clear" => {
                let id = args.first().and_then(Value::as_str).ok_or_else(|| {
                    ExtensionError::InvalidArgument("clear expects a notification id".to_string())
                })?;
                Ok(Value::Bool(self.clear(id)?))
            }
            "getAll" => self.get_all(),
            other => Err(ExtensionError::ApiNotFound {
                namespace: "notifications".to_string(),
                member: other.to_string(),
            }),
        }
    }
}
