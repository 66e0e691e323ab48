//! Extension manifest parsing.
//!
//! Each extension ships a Chromium-style `manifest.json` at its install
//! root. Only the subset the shim consumes is modeled: identity, the
//! options page, background scripts, declared permissions, the default
//! locale and toolbar-action defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtensionError, ExtensionResult};

/// Parsed `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub manifest_version: u32,

    #[serde(default)]
    pub description: Option<String>,

    /// Relative path of the options page, when the extension has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_page: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<BackgroundDescriptor>,

    /// Declared API permissions and host patterns, as listed.
    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_locale: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionDefaults>,
}

/// Background page descriptor. Scripts run in a hidden context owned by
/// the shell; only the script list matters to the shim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundDescriptor {
    #[serde(default)]
    pub scripts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
}

/// Toolbar defaults from the manifest `action` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_icon: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_popup: Option<String>,
}

impl Manifest {
    /// Load `manifest.json` from an extension's install root.
    pub fn load(extension_dir: &Path) -> ExtensionResult<Self> {
        let manifest_path = extension_dir.join("manifest.json");

        if !manifest_path.exists() {
            return Err(ExtensionError::ManifestNotFound(
                extension_dir.to_path_buf(),
            ));
        }

        let content = std::fs::read_to_string(&manifest_path)?;

        serde_json::from_str(&content).map_err(|e| ExtensionError::ManifestInvalid {
            path: manifest_path,
            message: e.to_string(),
        })
    }

    /// Validate required fields and constraints.
    pub fn validate(&self) -> ExtensionResult<()> {
        if self.name.is_empty() {
            return Err(ExtensionError::ManifestInvalid {
                path: "manifest.json".into(),
                message: "name is required".to_string(),
            });
        }

        if self.version.is_empty() {
            return Err(ExtensionError::ManifestInvalid {
                path: "manifest.json".into(),
                message: "version is required".to_string(),
            });
        }

        if self.manifest_version < 2 {
            return Err(ExtensionError::ManifestInvalid {
                path: "manifest.json".into(),
                message: format!("unsupported manifest_version {}", self.manifest_version),
            });
        }

        Ok(())
    }

    /// Locale used for the i18n catalog, defaulting to `en`.
    pub fn locale(&self) -> &str {
        self.default_locale.as_deref().unwrap_or("en")
    }
}
