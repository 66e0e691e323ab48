//! `chrome.management` capability module.
//!
//! Install, uninstall and enable/disable bridge back into the service that
//! owns the registry. The bridge trait breaks the reference cycle between
//! the per-extension module set and the registry that contains it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExtensionError, ExtensionResult};
use crate::ExtensionId;

/// Summary of one installed extension, as reported by `getAll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionInfo {
    pub id: ExtensionId,
    pub name: String,
    pub version: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Extension-loading capability owned by the service layer.
pub trait ManagementBridge: Send + Sync {
    fn install(&self, extension_id: &str) -> ExtensionResult<ExtensionInfo>;
    /// Unregisters the extension. Unpacked files may remain on disk.
    fn uninstall(&self, extension_id: &str) -> ExtensionResult<()>;
    fn set_enabled(&self, extension_id: &str, enabled: bool) -> ExtensionResult<()>;
    fn all(&self) -> Vec<ExtensionInfo>;
}

#[derive(Clone)]
pub struct Management {
    bridge: Arc<dyn ManagementBridge>,
}

impl Management {
    pub fn new(bridge: Arc<dyn ManagementBridge>) -> Self {
        Self { bridge }
    }

    pub fn invoke(&self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        match member {
            "getAll" => Ok(serde_json::to_value(self.bridge.all())?),
            "install" => {
                let info = self.bridge.install(&id_arg(args)?)?;
                Ok(serde_json::to_value(info)?)
            }
            "uninstall" => {
                self.bridge.uninstall(&id_arg(args)?)?;
                Ok(Value::Null)
            }
            "setEnabled" => {
                let id = id_arg(args)?;
                let enabled = match args.get(1) {
                    Some(Value::Bool(enabled)) => *enabled,
                    _ => {
                        return Err(ExtensionError::InvalidArgument(
                            "enabled flag required".into(),
                        ))
                    }
                };
                self.bridge.set_enabled(&id, enabled)?;
                Ok(Value::Null)
            }
            other => Err(ExtensionError::ApiNotFound {
                namespace: "management".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

fn id_arg(args: &[Value]) -> ExtensionResult<String> {
    match args.first() {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        _ => Err(ExtensionError::InvalidArgument("extension id required".into())),
    }
}
