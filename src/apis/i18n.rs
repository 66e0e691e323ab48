//! `chrome.i18n` capability module.
//!
//! Message catalogs are loaded once per extension from
//! `_locales/<locale>/messages.json` under the extension directory, using
//! the manifest's `default_locale` (falling back to `en`). Lookups never
//! fail: an unknown message name resolves to the empty string, matching
//! what extension code expects.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ExtensionError, ExtensionResult};

#[derive(Debug, Clone, Deserialize)]
struct MessageEntry {
    message: String,
    #[serde(default)]
    placeholders: HashMap<String, Placeholder>,
}

#[derive(Debug, Clone, Deserialize)]
struct Placeholder {
    content: String,
}

pub struct I18n {
    locale: String,
    messages: HashMap<String, MessageEntry>,
}

impl I18n {
    /// Loads the catalog for `locale` from the extension directory. A
    /// missing catalog is normal for extensions that do not localize, so it
    /// yields an empty table rather than an error.
    pub fn load(extension_dir: &Path, locale: &str) -> Self {
        let path = extension_dir
            .join("_locales")
            .join(locale)
            .join("messages.json");
        let messages = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    log::warn!("bad message catalog at {}: {err}", path.display());
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            locale: locale.to_string(),
            messages,
        }
    }

    pub fn get_message(&self, name: &str, substitutions: &[String]) -> String {
        let entry = match self.messages.get(name) {
            Some(entry) => entry,
            None => return String::new(),
        };

        let mut text = entry.message.clone();

        // Named placeholders first: `$NAME$` expands to the placeholder's
        // content, which may itself reference a positional substitution.
        for (name, placeholder) in &entry.placeholders {
            let marker = format!("${}$", name.to_uppercase());
            let content = substitute_positional(&placeholder.content, substitutions);
            text = text.replace(&marker, &content);
        }

        substitute_positional(&text, substitutions)
    }

    /// Object-form substitutions: each `$key$` marker in the resolved
    /// message is replaced by the matching entry.
    pub fn get_message_named(&self, name: &str, named: &Map<String, Value>) -> String {
        let mut text = self.get_message(name, &[]);
        for (key, value) in named {
            let marker = format!("${key}$");
            let replacement = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            text = text.replace(&marker, &replacement);
        }
        text
    }

    pub fn ui_language(&self) -> &str {
        &self.locale
    }

    pub fn invoke(&self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        match member {
            "getMessage" => {
                let name = match args.first() {
                    Some(Value::String(name)) => name.clone(),
                    _ => {
                        return Err(ExtensionError::InvalidArgument(
                            "message name required".into(),
                        ))
                    }
                };
                let substitutions = match args.get(1) {
                    Some(Value::Object(named)) => {
                        return Ok(Value::String(self.get_message_named(&name, named)));
                    }
                    Some(Value::String(one)) => vec![one.clone()],
                    Some(Value::Array(many)) => many
                        .iter()
                        .map(|v| match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                Ok(Value::String(self.get_message(&name, &substitutions)))
            }
            "getUILanguage" => Ok(Value::String(self.locale.clone())),
            other => Err(ExtensionError::ApiNotFound {
                namespace: "i18n".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

/// Replaces `$1`..`$9` with the matching substitution and collapses `$$`
/// to a literal dollar sign.
fn substitute_positional(text: &str, substitutions: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some(d) if d.is_ascii_digit() => {
                let index = d.to_digit(10).unwrap_or(0) as usize;
                chars.next();
                if index >= 1 {
                    if let Some(sub) = substitutions.get(index - 1) {
                        out.push_str(sub);
                    }
                }
            }
            _ => out.push('$'),
        }
    }
    out
}
