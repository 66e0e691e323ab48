//! `chrome.windows` capability module.
//!
//! Window state and geometry stay with the shell; this module validates
//! arguments, forwards deltas and optionally populates snapshots with the
//! window's tabs. Visual states are mutually exclusive: the host enters
//! the requested state and leaves the others.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExtensionError, ExtensionResult};
use crate::host::{WindowDelta, WindowHost, WindowInfo, WindowSpec};
use crate::WindowId;

#[derive(Debug, Default, Deserialize)]
struct GetInfo {
    #[serde(default)]
    populate: Option<bool>,
}

pub struct Windows {
    host: Arc<dyn WindowHost>,
}

impl Windows {
    pub fn new(host: Arc<dyn WindowHost>) -> Self {
        Self { host }
    }

    /// Create a window per the spec. When multiple urls are supplied only
    /// the first is loaded.
    pub fn create(&self, spec: WindowSpec) -> ExtensionResult<Value> {
        let info = self.host.create_window(&spec)?;
        self.snapshot(info.id, true)
    }

    /// Apply only the supplied fields, leaving the rest unchanged.
    pub fn update(&self, id: WindowId, delta: WindowDelta) -> ExtensionResult<Value> {
        let info = self.host.update_window(id, &delta)?;
        Ok(serde_json::to_value(info)?)
    }

    pub fn remove(&self, id: WindowId) -> ExtensionResult<()> {
        self.host.close_window(id)
    }

    pub fn get(&self, id: WindowId, populate: bool) -> ExtensionResult<Value> {
        self.host
            .window_by_id(id)
            .ok_or(ExtensionError::WindowNotFound(id))?;
        self.snapshot(id, populate)
    }

    /// The focused window. There is no most-recently-focused fallback;
    /// nothing focused is a not-found error.
    pub fn get_current(&self, populate: bool) -> ExtensionResult<Value> {
        let info = self
            .host
            .focused_window()
            .ok_or_else(|| ExtensionError::NotFound("focused window".to_string()))?;
        self.snapshot(info.id, populate)
    }

    pub fn get_last_focused(&self, populate: bool) -> ExtensionResult<Value> {
        self.get_current(populate)
    }

    pub fn get_all(&self, populate: bool) -> ExtensionResult<Value> {
        let mut out = Vec::new();
        for info in self.host.all_windows() {
            out.push(self.populated(info, populate)?);
        }
        Ok(Value::Array(out))
    }

    fn snapshot(&self, id: WindowId, populate: bool) -> ExtensionResult<Value> {
        let info = self
            .host
            .window_by_id(id)
            .ok_or(ExtensionError::WindowNotFound(id))?;
        self.populated(info, populate)
    }

    fn populated(&self, mut info: WindowInfo, populate: bool) -> ExtensionResult<Value> {
        if populate {
            info.tabs = Some(self.host.tabs_for_window(info.id));
        }
        Ok(serde_json::to_value(info)?)
    }

    pub fn invoke(&self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        match member {
            "create" => {
                let spec = match args.first() {
                    Some(v) if !v.is_null() => serde_json::from_value(v.clone())?,
                    _ => WindowSpec::default(),
                };
                self.create(spec)
            }
            "update" => {
                let id = parse_window_id(args.first().unwrap_or(&Value::Null))?;
                let delta = match args.get(1) {
                    Some(v) => serde_json::from_value(v.clone())?,
                    None => WindowDelta::default(),
                };
                self.update(id, delta)
            }
            "remove" => {
                let id = parse_window_id(args.first().unwrap_or(&Value::Null))?;
                self.remove(id)?;
                Ok(Value::Null)
            }
            "get" => {
                let id = parse_window_id(args.first().unwrap_or(&Value::Null))?;
                self.get(id, parse_populate(args.get(1))?)
            }
            "getCurrent" => self.get_current(parse_populate(args.first())?),
            "getLastFocused" => self.get_last_focused(parse_populate(args.first())?),
            "getAll" => self.get_all(parse_populate(args.first())?),
            other => Err(ExtensionError::ApiNotFound {
                namespace: "windows".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

fn parse_window_id(value: &Value) -> ExtensionResult<WindowId> {
    value
        .as_u64()
        .ok_or_else(|| ExtensionError::InvalidArgument(format!("invalid window id: {value}")))
}

fn parse_populate(value: Option<&Value>) -> ExtensionResult<bool> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(v) => {
            let info: GetInfo = serde_json::from_value(v.clone())?;
            Ok(info.populate.unwrap_or(false))
        }
    }
}
