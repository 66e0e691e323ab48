//! `chrome.webRequest` capability module.
//!
//! The shell's network layer reports request lifecycle stages to a
//! process-wide [`WebRequestRelay`]. The relay fans each stage out to every
//! registered extension as an event; observation is fire-and-forget, and the
//! relay always answers the network layer with an allow decision. Blocking
//! handlers are not supported.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExtensionError, ExtensionResult};
use crate::events::EventBus;
use crate::{ExtensionId, TabId};

/// Lifecycle stages the shell reports for a network request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestStage {
    BeforeRequest,
    BeforeSendHeaders,
    SendHeaders,
    HeadersReceived,
    ResponseStarted,
    Completed,
    ErrorOccurred,
}

impl RequestStage {
    /// Event channel name as seen by extension listeners.
    pub fn channel(self) -> &'static str {
        match self {
            RequestStage::BeforeRequest => "webRequest.onBeforeRequest",
            RequestStage::BeforeSendHeaders => "webRequest.onBeforeSendHeaders",
            RequestStage::SendHeaders => "webRequest.onSendHeaders",
            RequestStage::HeadersReceived => "webRequest.onHeadersReceived",
            RequestStage::ResponseStarted => "webRequest.onResponseStarted",
            RequestStage::Completed => "webRequest.onCompleted",
            RequestStage::ErrorOccurred => "webRequest.onErrorOccurred",
        }
    }
}

/// What the shell reports about a request at a given stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    pub request_id: String,
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub tab_id: Option<TabId>,
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Answer handed back to the network layer after fan-out.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDecision {
    pub cancel: bool,
}

/// Fan-out point between the shell's network layer and extension listeners.
pub struct WebRequestRelay {
    bus: Arc<EventBus>,
    observers: Mutex<BTreeSet<ExtensionId>>,
}

impl WebRequestRelay {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            observers: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn register(&self, extension_id: &str) {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(extension_id.to_string());
    }

    pub fn deregister(&self, extension_id: &str) {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(extension_id);
    }

    /// Reports one request stage to every observing extension. Listener
    /// errors cannot surface here; the network layer is never blocked on
    /// extension code.
    pub fn dispatch(&self, stage: RequestStage, details: &RequestDetails) -> RequestDecision {
        let observers: Vec<ExtensionId> = self
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect();

        match serde_json::to_value(details) {
            Ok(payload) => {
                for extension_id in &observers {
                    self.bus
                        .publish(extension_id, stage.channel(), &[payload.clone()]);
                }
            }
            Err(err) => log::warn!("failed to serialize request details: {err}"),
        }

        RequestDecision::default()
    }
}

pub struct WebRequest {
    extension_id: ExtensionId,
    relay: Arc<WebRequestRelay>,
}

impl WebRequest {
    pub fn new(extension_id: ExtensionId, relay: Arc<WebRequestRelay>) -> Self {
        relay.register(&extension_id);
        Self {
            extension_id,
            relay,
        }
    }

    pub fn invoke(&self, member: &str, _args: &[Value]) -> ExtensionResult<Value> {
        match member {
            // Cache-flush hint in the upstream API; nothing to flush here.
            "handlerBehaviorChanged" => Ok(Value::Null),
            other => Err(ExtensionError::ApiNotFound {
                namespace: "webRequest".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

impl Drop for WebRequest {
    fn drop(&mut self) {
        self.relay.deregister(&self.extension_id);
    }
}
