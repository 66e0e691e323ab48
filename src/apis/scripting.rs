//! `chrome.scripting` capability module.
//!
//! Injects JS or CSS into a specific tab's content view via the shell.
//! Inline code paths are supported; file-based injection needs asset
//! loading plumbing the shell does not expose yet, so those requests log a
//! warning and return a benign default.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExtensionError, ExtensionResult};
use crate::host::ScriptHost;
use crate::TabId;

#[derive(Debug, Deserialize)]
struct InjectionTarget {
    #[serde(rename = "tabId")]
    tab_id: TabId,
}

#[derive(Debug, Deserialize)]
struct ScriptInjection {
    target: InjectionTarget,
    #[serde(default)]
    code: Option<String>,
    /// Serialized function body sent by clients using the `func` form.
    #[serde(default)]
    func: Option<String>,
    #[serde(default)]
    args: Option<Vec<Value>>,
    #[serde(default)]
    files: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CssInjection {
    target: InjectionTarget,
    #[serde(default)]
    css: Option<String>,
    #[serde(default)]
    files: Option<Vec<String>>,
}

pub struct Scripting {
    host: Arc<dyn ScriptHost>,
}

impl Scripting {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self { host }
    }

    pub fn execute_script(&self, injection: ScriptInjection) -> ExtensionResult<Value> {
        if let Some(files) = &injection.files {
            log::warn!(
                "scripting.executeScript with files {:?} is not supported; skipping",
                files
            );
        }

        let source = match (injection.code, injection.func) {
            (Some(code), _) => code,
            (None, Some(func)) => {
                let args = serde_json::to_string(&injection.args.unwrap_or_default())?;
                format!("({func})(...{args})")
            }
            (None, None) => return Ok(Value::Null),
        };

        self.host.execute_script(injection.target.tab_id, &source)
    }

    pub fn insert_css(&self, injection: CssInjection) -> ExtensionResult<Value> {
        if let Some(files) = &injection.files {
            log::warn!(
                "scripting.insertCSS with files {:?} is not supported; skipping",
                files
            );
        }

        if let Some(css) = injection.css {
            self.host.insert_css(injection.target.tab_id, &css)?;
        }
        Ok(Value::Null)
    }

    pub fn invoke(&self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        let details = |args: &[Value]| {
            args.first()
                .cloned()
                .ok_or_else(|| ExtensionError::InvalidArgument("injection details required".into()))
        };

        match member {
            "executeScript" => self.execute_script(serde_json::from_value(details(args)?)?),
            "insertCSS" => self.insert_css(serde_json::from_value(details(args)?)?),
            other => Err(ExtensionError::ApiNotFound {
                namespace: "scripting".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingScriptHost {
        executed: Mutex<Vec<(TabId, String)>>,
        css: Mutex<Vec<(TabId, String)>>,
    }

    impl ScriptHost for RecordingScriptHost {
        fn execute_script(&self, tab: TabId, code: &str) -> ExtensionResult<Value> {
            if tab == 404 {
                return Err(ExtensionError::TabNotFound(tab));
            }
            self.executed.lock().unwrap().push((tab, code.to_string()));
            Ok(json!("ran"))
        }
        fn insert_css(&self, tab: TabId, css: &str) -> ExtensionResult<()> {
            if tab == 404 {
                return Err(ExtensionError::TabNotFound(tab));
            }
            self.css.lock().unwrap().push((tab, css.to_string()));
            Ok(())
        }
    }

    fn scripting() -> (Scripting, Arc<RecordingScriptHost>) {
        let host = Arc::new(RecordingScriptHost {
            executed: Mutex::new(Vec::new()),
            css: Mutex::new(Vec::new()),
        });
        (Scripting::new(host.clone()), host)
    }

    #[test]
    fn test_execute_inline_code() {
        let (scripting, host) = scripting();
        let result = scripting
            .invoke(
                "executeScript",
                &[json!({"target": {"tabId": 1}, "code": "1 + 1"})],
            )
            .unwrap();
        assert_eq!(result, json!("ran"));
        assert_eq!(host.executed.lock().unwrap()[0], (1, "1 + 1".to_string()));
    }

    #[test]
    fn test_execute_func_form_builds_call() {
        let (scripting, host) = scripting();
        scripting
            .invoke(
                "executeScript",
                &[json!({
                    "target": {"tabId": 2},
                    "func": "(x) => x * 2",
                    "args": [21],
                })],
            )
            .unwrap();
        assert_eq!(
            host.executed.lock().unwrap()[0].1,
            "((x) => x * 2)(...[21])"
        );
    }

    #[test]
    fn test_dead_tab_is_not_found() {
        let (scripting, _) = scripting();
        assert!(matches!(
            scripting.invoke(
                "executeScript",
                &[json!({"target": {"tabId": 404}, "code": "x"})],
            ),
            Err(ExtensionError::TabNotFound(404))
        ));
    }

    #[test]
    fn test_files_only_injection_is_benign() {
        let (scripting, host) = scripting();
        let result = scripting
            .invoke(
                "executeScript",
                &[json!({"target": {"tabId": 1}, "files": ["inject.js"]})],
            )
            .unwrap();
        assert_eq!(result, Value::Null);
        assert!(host.executed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_insert_css() {
        let (scripting, host) = scripting();
        scripting
            .invoke(
                "insertCSS",
                &[json!({"target": {"tabId": 3}, "css": "body { margin: 0 }"})],
            )
            .unwrap();
        assert_eq!(
            host.css.lock().unwrap()[0],
            (3, "body { margin: 0 }".to_string())
        );
    }
}
