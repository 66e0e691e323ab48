//! `chrome.extension` capability module.
//!
//! Legacy surface kept for extensions that predate `chrome.runtime`. Only
//! `getURL` is functional; the background-page accessor has no meaning
//! without a shared JS heap and reports itself as unimplemented.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::{ExtensionError, ExtensionResult};

pub struct ExtensionMeta {
    extension_root: PathBuf,
}

impl ExtensionMeta {
    pub fn new(extension_root: &std::path::Path) -> Self {
        Self {
            extension_root: extension_root.to_path_buf(),
        }
    }

    pub fn invoke(&self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        match member {
            "getURL" => {
                let rel = match args.first() {
                    Some(Value::String(rel)) => rel.as_str(),
                    _ => {
                        return Err(ExtensionError::InvalidArgument(
                            "relative path required".into(),
                        ))
                    }
                };
                Ok(Value::String(crate::apis::runtime::file_url(
                    &self.extension_root,
                    rel,
                )))
            }
            "getBackgroundPage" => Err(ExtensionError::Unimplemented(
                "extension.getBackgroundPage".to_string(),
            )),
            other => Err(ExtensionError::ApiNotFound {
                namespace: "extension".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn test_get_url() {
        let meta = ExtensionMeta::new(Path::new("/ext/abc"));
        assert_eq!(
            meta.invoke("getURL", &[json!("/icons/16.png")]).unwrap(),
            json!("file:///ext/abc/icons/16.png")
        );
    }

    #[test]
    fn test_background_page_unimplemented() {
        let meta = ExtensionMeta::new(Path::new("/ext/abc"));
        assert!(matches!(
            meta.invoke("getBackgroundPage", &[]),
            Err(ExtensionError::Unimplemented(_))
        ));
    }
}
