//! `chrome.cookies` capability module.
//!
//! Direct translation onto the shell's session cookie store.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExtensionError, ExtensionResult};
use crate::host::{Cookie, CookieFilter, CookieHost};

#[derive(Debug, Deserialize)]
struct GetDetails {
    url: String,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetDetails {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    secure: Option<bool>,
    #[serde(default)]
    http_only: Option<bool>,
    #[serde(default)]
    expiration_date: Option<f64>,
}

pub struct Cookies {
    host: Arc<dyn CookieHost>,
}

impl Cookies {
    pub fn new(host: Arc<dyn CookieHost>) -> Self {
        Self { host }
    }

    pub fn get(&self, url: &str, name: &str) -> ExtensionResult<Value> {
        match self.host.get_cookie(url, name) {
            Some(cookie) => Ok(serde_json::to_value(cookie)?),
            None => Ok(Value::Null),
        }
    }

    pub fn get_all(&self, filter: CookieFilter) -> ExtensionResult<Value> {
        Ok(serde_json::to_value(self.host.get_all_cookies(&filter))?)
    }

    pub fn set(&self, details: SetDetails) -> ExtensionResult<Value> {
        let name = details
            .name
            .ok_or_else(|| ExtensionError::InvalidArgument("cookie name is required".into()))?;
        let value = details
            .value
            .ok_or_else(|| ExtensionError::InvalidArgument("cookie value is required".into()))?;

        let domain = details.domain.or_else(|| {
            details
                .url
                .as_deref()
                .map(|url| host_of(url).to_string())
        });

        let cookie = Cookie {
            name,
            value,
            domain: domain.unwrap_or_default(),
            path: details.path.unwrap_or_else(|| "/".to_string()),
            secure: details.secure.unwrap_or(false),
            http_only: details.http_only.unwrap_or(false),
            session: details.expiration_date.is_none(),
            expiration_date: details.expiration_date,
        };

        let stored = self.host.set_cookie(cookie)?;
        Ok(serde_json::to_value(stored)?)
    }

    pub fn remove(&self, url: &str, name: &str) -> ExtensionResult<Value> {
        self.host.remove_cookie(url, name)?;
        Ok(serde_json::json!({ "url": url, "name": name }))
    }

    pub fn invoke(&self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        match member {
            "get" => {
                let details: GetDetails = parse_details(args)?;
                self.get(&details.url, &details.name)
            }
            "getAll" => {
                let filter = match args.first() {
                    Some(v) if !v.is_null() => serde_json::from_value(v.clone())?,
                    _ => CookieFilter::default(),
                };
                self.get_all(filter)
            }
            "set" => self.set(parse_details(args)?),
            "remove" => {
                let details: GetDetails = parse_details(args)?;
                self.remove(&details.url, &details.name)
            }
            other => Err(ExtensionError::ApiNotFound {
                namespace: "cookies".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

fn parse_details<T: serde::de::DeserializeOwned>(args: &[Value]) -> ExtensionResult<T> {
    let value = args
        .first()
        .cloned()
        .ok_or_else(|| ExtensionError::InvalidArgument("details object required".into()))?;
    Ok(serde_json::from_value(value)?)
}

fn host_of(url: &str) -> &str {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .split(['/', ':'])
        .next()
        .unwrap_or("")
}
