//! `chrome.tabs` capability module.
//!
//! A thin translation layer over the shell's tab manager. Tab ownership
//! stays with the shell; this module validates arguments and reshapes
//! snapshots for the wire.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExtensionError, ExtensionResult};
use crate::host::{TabDelta, TabHost, TabQuery};
use crate::{TabId, WindowId};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInfo {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    window_id: Option<WindowId>,
    #[serde(default)]
    active: Option<bool>,
}

pub struct Tabs {
    host: Arc<dyn TabHost>,
}

impl Tabs {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self { host }
    }

    pub fn create(&self, info: Value) -> ExtensionResult<Value> {
        let info: CreateInfo = serde_json::from_value(info)?;

        let url = info.url.ok_or_else(|| {
            ExtensionError::InvalidArgument("url is required to create a tab".to_string())
        })?;

        let tab = self.host.create_tab(&url, info.window_id)?;

        if info.active == Some(true) && !tab.active {
            let activated = self.host.update_tab(
                tab.id,
                TabDelta {
                    active: Some(true),
                    ..Default::default()
                },
            )?;
            return Ok(serde_json::to_value(activated)?);
        }

        Ok(serde_json::to_value(tab)?)
    }

    /// Remove one tab or a list of tabs. An explicit empty list is an
    /// argument error; removal of an unknown id surfaces the host's error.
    pub fn remove(&self, ids: &Value) -> ExtensionResult<()> {
        match ids {
            Value::Number(_) => self.host.remove_tab(parse_tab_id(ids)?),
            Value::Array(list) => {
                if list.is_empty() {
                    return Err(ExtensionError::InvalidArgument(
                        "no tabs to remove".to_string(),
                    ));
                }
                for id in list {
                    self.host.remove_tab(parse_tab_id(id)?)?;
                }
                Ok(())
            }
            other => Err(ExtensionError::InvalidArgument(format!(
                "expected a tab id or list of tab ids, got {other}"
            ))),
        }
    }

    pub fn get(&self, id: TabId) -> ExtensionResult<Value> {
        let tab = self
            .host
            .tab_by_id(id)
            .ok_or(ExtensionError::TabNotFound(id))?;
        Ok(serde_json::to_value(tab)?)
    }

    pub fn get_current(&self) -> ExtensionResult<Value> {
        let tab = self
            .host
            .current_tab(None)
            .ok_or_else(|| ExtensionError::NotFound("active tab".to_string()))?;
        Ok(serde_json::to_value(tab)?)
    }

    pub fn update(&self, id: TabId, delta: TabDelta) -> ExtensionResult<Value> {
        let tab = self.host.update_tab(id, delta)?;
        Ok(serde_json::to_value(tab)?)
    }

    /// Filtered snapshot list. An empty match is a valid empty list.
    pub fn query(&self, filter: TabQuery) -> ExtensionResult<Value> {
        Ok(serde_json::to_value(self.host.query_tabs(&filter))?)
    }

    pub fn invoke(&self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        match member {
            "create" => self.create(args.first().cloned().unwrap_or(Value::Null)),
            "remove" => {
                let ids = args.first().ok_or_else(|| {
                    ExtensionError::InvalidArgument("remove expects tab ids".to_string())
                })?;
                self.remove(ids)?;
                Ok(Value::Null)
            }
            "get" => self.get(parse_tab_id(args.first().unwrap_or(&Value::Null))?),
            "getCurrent" => self.get_current(),
            "update" => {
                let id = parse_tab_id(args.first().unwrap_or(&Value::Null))?;
                let delta = match args.get(1) {
                    Some(v) => serde_json::from_value(v.clone())?,
                    None => TabDelta::default(),
                };
                self.update(id, delta)
            }
            "query" => {
                let filter = match args.first() {
                    Some(v) if !v.is_null() => serde_json::from_value(v.clone())?,
                    _ => TabQuery::default(),
                };
                self.query(filter)
            }
            other => Err(ExtensionError::ApiNotFound {
                namespace: "tabs".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

fn parse_tab_id(value: &Value) -> ExtensionResult<TabId> {
    value
        .as_u64()
        .ok_or_else(|| ExtensionError::InvalidArgument(format!("invalid tab id: {value}")))
}
