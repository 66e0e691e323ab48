//! API dispatcher: the single entry point from the extension boundary.
//!
//! The isolated extension context sends `{namespace, member, extensionId,
//! args}`; the dispatcher resolves the extension record, locks it and routes
//! into its module set. Calls for one extension serialize on that lock, so
//! two writes from the same extension land in arrival order.
//!
//! Events fired during a call run on the calling thread while the record
//! lock is held; a listener must not synchronously issue new calls for the
//! same extension.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorDescriptor, ExtensionError, ExtensionResult};
use crate::registry::ExtensionRegistry;
use crate::ExtensionId;

/// One call as received across the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    /// Namespace, possibly dotted for storage areas (`storage.local`).
    pub namespace: String,
    pub member: String,
    pub extension_id: ExtensionId,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Reply shape sent back across the boundary. Exactly one side is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
}

pub struct Dispatcher {
    registry: Arc<ExtensionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve and invoke a call. A disabled extension is indistinguishable
    /// from an uninstalled one from the caller's side.
    pub fn dispatch(&self, request: &DispatchRequest) -> ExtensionResult<Value> {
        let record = self
            .registry
            .get(&request.extension_id)
            .ok_or_else(|| ExtensionError::ExtensionNotFound(request.extension_id.clone()))?;

        let mut extension = record.lock().unwrap_or_else(|e| e.into_inner());
        if !extension.enabled {
            return Err(ExtensionError::ExtensionNotFound(request.extension_id.clone()));
        }

        // Management mutates the registry and may target the calling
        // extension itself, so it must not run under the record lock.
        if request.namespace == "management" {
            let management = extension.apis.management_handle();
            drop(extension);
            return management.invoke(&request.member, &request.args);
        }

        extension
            .apis
            .invoke(&request.namespace, &request.member, &request.args)
    }

    /// Boundary-level entry: never fails, errors become descriptors.
    pub fn handle(&self, request: &DispatchRequest) -> DispatchReply {
        match self.dispatch(request) {
            Ok(result) => DispatchReply {
                result: Some(result),
                error: None,
            },
            Err(err) => {
                log::debug!(
                    "dispatch {}.{} for '{}' failed: {err}",
                    request.namespace,
                    request.member,
                    request.extension_id
                );
                DispatchReply {
                    result: None,
                    error: Some(err.into()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::{ApiContext, ExtensionInfo, ManagementBridge, MenuRegistry, WebRequestRelay};
    use crate::error::ErrorKind;
    use crate::events::EventBus;
    use crate::host::test_support::MemoryShell;
    use crate::registry::Extension;
    use serde_json::json;
    use tempfile::TempDir;

    struct NullBridge;

    impl ManagementBridge for NullBridge {
        fn install(&self, id: &str) -> ExtensionResult<ExtensionInfo> {
            Err(ExtensionError::NotFound(id.to_string()))
        }
        fn uninstall(&self, _id: &str) -> ExtensionResult<()> {
            Ok(())
        }
        fn set_enabled(&self, _id: &str, _enabled: bool) -> ExtensionResult<()> {
            Ok(())
        }
        fn all(&self) -> Vec<ExtensionInfo> {
            Vec::new()
        }
    }

    fn dispatcher(state: &TempDir) -> (Dispatcher, Arc<ExtensionRegistry>, ApiContext) {
        let events = EventBus::new();
        let ctx = ApiContext {
            shell: MemoryShell::handles(),
            events: events.clone(),
            menus: Arc::new(MenuRegistry::new(events.clone())),
            web_request: Arc::new(WebRequestRelay::new(events.clone())),
            management: Arc::new(NullBridge),
            state_dir: state.path().to_path_buf(),
        };
        let registry = Arc::new(ExtensionRegistry::new(ctx.events.clone(), ctx.menus.clone()));
        registry.insert(Extension::new(
            "abc",
            serde_json::from_value(json!({
                "name": "X", "version": "1.0", "manifest_version": 3,
            }))
            .unwrap(),
            state.path().join("abc"),
            &ctx,
        ));
        (Dispatcher::new(registry.clone()), registry, ctx)
    }

    fn request(namespace: &str, member: &str, args: Vec<Value>) -> DispatchRequest {
        DispatchRequest {
            namespace: namespace.to_string(),
            member: member.to_string(),
            extension_id: "abc".to_string(),
            args,
        }
    }

    #[test]
    fn test_routes_to_module() {
        let state = TempDir::new().unwrap();
        let (dispatcher, _registry, _ctx) = dispatcher(&state);

        dispatcher
            .dispatch(&request("storage.local", "set", vec![json!({"k": 1})]))
            .unwrap();
        let got = dispatcher
            .dispatch(&request("storage.local", "get", vec![json!("k")]))
            .unwrap();
        assert_eq!(got, json!({"k": 1}));
    }

    #[test]
    fn test_unknown_extension() {
        let state = TempDir::new().unwrap();
        let (dispatcher, _registry, _ctx) = dispatcher(&state);

        let mut req = request("tabs", "query", vec![]);
        req.extension_id = "ghost".to_string();
        assert!(matches!(
            dispatcher.dispatch(&req),
            Err(ExtensionError::ExtensionNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_namespace_and_member() {
        let state = TempDir::new().unwrap();
        let (dispatcher, _registry, _ctx) = dispatcher(&state);

        assert!(matches!(
            dispatcher.dispatch(&request("bogus", "call", vec![])),
            Err(ExtensionError::ApiNotFound { .. })
        ));
        assert!(matches!(
            dispatcher.dispatch(&request("tabs", "bogus", vec![])),
            Err(ExtensionError::ApiNotFound { .. })
        ));
    }

    #[test]
    fn test_disabled_extension_is_hidden() {
        let state = TempDir::new().unwrap();
        let (dispatcher, registry, _ctx) = dispatcher(&state);

        registry.get("abc").unwrap().lock().unwrap().enabled = false;
        assert!(matches!(
            dispatcher.dispatch(&request("tabs", "query", vec![])),
            Err(ExtensionError::ExtensionNotFound(_))
        ));
    }

    #[test]
    fn test_handle_wraps_errors() {
        let state = TempDir::new().unwrap();
        let (dispatcher, _registry, _ctx) = dispatcher(&state);

        let reply = dispatcher.handle(&request("bogus", "call", vec![]));
        assert!(reply.result.is_none());
        assert_eq!(reply.error.unwrap().kind, ErrorKind::ApiNotFound);

        let reply = dispatcher.handle(&request("tabs", "query", vec![json!({})]));
        assert!(reply.error.is_none());
        assert_eq!(reply.result.unwrap(), json!([]));
    }

    #[test]
    fn test_request_wire_shape() {
        let req: DispatchRequest = serde_json::from_value(json!({
            "namespace": "tabs",
            "member": "get",
            "extensionId": "abc",
            "args": [1],
        }))
        .unwrap();
        assert_eq!(req.extension_id, "abc");
        assert_eq!(req.args, vec![json!(1)]);
    }
}
