//! `chrome.action` capability module.
//!
//! Tracks the extension's toolbar icon/title/popup and pushes each change
//! to the shell UI. State is global per extension; `tabId`-scoped calls are
//! accepted but the tab scoping is ignored for now.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::error::{ExtensionError, ExtensionResult};
use crate::events::EventBus;
use crate::host::{ActionState, ActionUiHost, Tab, UrlList, WindowHost, WindowKind, WindowSpec};
use crate::manifest::Manifest;
use crate::ExtensionId;

const POPUP_WIDTH: u32 = 400;
const POPUP_HEIGHT: u32 = 300;

pub struct Action {
    extension_id: ExtensionId,
    extension_root: std::path::PathBuf,
    ui: Arc<dyn ActionUiHost>,
    windows: Arc<dyn WindowHost>,
    events: Arc<EventBus>,
    state: Mutex<ActionState>,
}

impl Action {
    /// Seeds toolbar state from the manifest's `action` block and pushes
    /// the initial state so the button renders before any API call.
    pub fn new(
        extension_id: ExtensionId,
        extension_root: &std::path::Path,
        manifest: &Manifest,
        ui: Arc<dyn ActionUiHost>,
        windows: Arc<dyn WindowHost>,
        events: Arc<EventBus>,
    ) -> Self {
        let mut state = ActionState::default();
        if let Some(defaults) = &manifest.action {
            state.title = defaults.default_title.clone();
            state.popup = defaults.default_popup.clone();
            if let Some(icon) = &defaults.default_icon {
                state.icon = Some(icon.clone());
            }
        }
        if state.title.is_none() {
            state.title = Some(manifest.name.clone());
        }
        ui.push_action_state(&extension_id, &state);
        Self {
            extension_id,
            extension_root: extension_root.to_path_buf(),
            ui,
            windows,
            events,
            state: Mutex::new(state),
        }
    }

    fn mutate(&self, apply: impl FnOnce(&mut ActionState)) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        apply(&mut state);
        self.ui.push_action_state(&self.extension_id, &state);
    }

    fn current_popup(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .popup
            .clone()
    }

    fn open_popup(&self) -> ExtensionResult<Value> {
        let popup = self
            .current_popup()
            .ok_or_else(|| ExtensionError::NotFound("action popup".to_string()))?;
        let url = crate::apis::runtime::file_url(&self.extension_root, &popup);
        let window = self.windows.create_window(&WindowSpec {
            url: Some(UrlList::One(url)),
            width: Some(POPUP_WIDTH),
            height: Some(POPUP_HEIGHT),
            focused: Some(true),
            kind: Some(WindowKind::Popup),
            ..Default::default()
        })?;
        Ok(serde_json::to_value(window)?)
    }

    /// Shell callback when the toolbar button is pressed. A configured
    /// popup wins; otherwise the click is forwarded as an event.
    pub fn handle_click(&self, tab: Option<&Tab>) -> ExtensionResult<()> {
        if self.current_popup().is_some() {
            self.open_popup()?;
            return Ok(());
        }
        let tab_value = match tab {
            Some(tab) => serde_json::to_value(tab)?,
            None => Value::Null,
        };
        self.events
            .publish(&self.extension_id, "action.onClicked", &[tab_value]);
        Ok(())
    }

    pub fn invoke(&self, member: &str, args: &[Value]) -> ExtensionResult<Value> {
        let details = args.first().cloned().unwrap_or_else(|| json!({}));
        if details.get("tabId").is_some() {
            log::warn!(
                "action.{member}: per-tab state is not supported, applying globally for {}",
                self.extension_id
            );
        }

        match member {
            "setTitle" => {
                let title = string_field(&details, "title")?;
                self.mutate(|state| state.title = Some(title));
                Ok(Value::Null)
            }
            "getTitle" => {
                let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                Ok(json!(state.title.clone().unwrap_or_default()))
            }
            "setIcon" => {
                let icon = details
                    .get("path")
                    .or_else(|| details.get("imageData"))
                    .cloned()
                    .ok_or_else(|| {
                        ExtensionError::InvalidArgument("icon path or imageData required".into())
                    })?;
                self.mutate(|state| state.icon = Some(icon));
                Ok(Value::Null)
            }
            "setPopup" => {
                let popup = string_field(&details, "popup")?;
                let popup = if popup.is_empty() { None } else { Some(popup) };
                self.mutate(|state| state.popup = popup);
                Ok(Value::Null)
            }
            "getPopup" => {
                let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                Ok(json!(state.popup.clone().unwrap_or_default()))
            }
            "openPopup" => self.open_popup(),
            other => Err(ExtensionError::ApiNotFound {
                namespace: "action".to_string(),
                member: other.to_string(),
            }),
        }
    }
}

fn string_field(details: &Value, field: &str) -> ExtensionResult<String> {
    details
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ExtensionError::InvalidArgument(format!("{field} required")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{WindowDelta, WindowInfo, WindowState};
    use crate::WindowId;
    use std::path::Path;

    struct RecordingUi {
        pushes: Mutex<Vec<ActionState>>,
    }

    impl ActionUiHost for RecordingUi {
        fn push_action_state(&self, _extension_id: &ExtensionId, state: &ActionState) {
            self.pushes.lock().unwrap().push(state.clone());
        }
    }

    struct RecordingWindows {
        created: Mutex<Vec<WindowSpec>>,
    }

    impl WindowHost for RecordingWindows {
        fn create_window(&self, spec: &WindowSpec) -> ExtensionResult<WindowInfo> {
            self.created.lock().unwrap().push(spec.clone());
            Ok(WindowInfo {
                id: 1,
                focused: true,
                left: 0,
                top: 0,
                width: spec.width.unwrap_or(0),
                height: spec.height.unwrap_or(0),
                state: WindowState::Normal,
                kind: spec.kind.unwrap_or_default(),
                tabs: None,
            })
        }
        fn update_window(&self, id: WindowId, _delta: &WindowDelta) -> ExtensionResult<WindowInfo> {
            Err(ExtensionError::WindowNotFound(id))
        }
        fn close_window(&self, _id: WindowId) -> ExtensionResult<()> {
            Ok(())
        }
        fn window_by_id(&self, _id: WindowId) -> Option<WindowInfo> {
            None
        }
        fn focused_window(&self) -> Option<WindowInfo> {
            None
        }
        fn all_windows(&self) -> Vec<WindowInfo> {
            Vec::new()
        }
        fn tabs_for_window(&self, _id: WindowId) -> Vec<Tab> {
            Vec::new()
        }
    }

    fn manifest(action: Option<crate::manifest::ActionDefaults>) -> Manifest {
        Manifest {
            name: "Demo".to_string(),
            version: "1.0".to_string(),
            manifest_version: 3,
            description: None,
            options_page: None,
            background: None,
            permissions: Vec::new(),
            default_locale: None,
            action,
        }
    }

    fn action(manifest: &Manifest) -> (Action, Arc<RecordingUi>, Arc<RecordingWindows>, Arc<EventBus>) {
        let ui = Arc::new(RecordingUi {
            pushes: Mutex::new(Vec::new()),
        });
        let windows = Arc::new(RecordingWindows {
            created: Mutex::new(Vec::new()),
        });
        let bus = EventBus::new();
        let action = Action::new(
            "demo".to_string(),
            Path::new("/ext/demo"),
            manifest,
            ui.clone(),
            windows.clone(),
            bus.clone(),
        );
        (action, ui, windows, bus)
    }

    #[test]
    fn test_seeds_defaults_from_manifest() {
        let manifest = manifest(Some(crate::manifest::ActionDefaults {
            default_title: Some("Open notes".to_string()),
            default_icon: None,
            default_popup: Some("popup.html".to_string()),
        }));
        let (_action, ui, _windows, _bus) = action(&manifest);
        let pushes = ui.pushes.lock().unwrap();
        assert_eq!(pushes[0].title.as_deref(), Some("Open notes"));
        assert_eq!(pushes[0].popup.as_deref(), Some("popup.html"));
    }

    #[test]
    fn test_set_title_pushes_state() {
        let manifest = manifest(None);
        let (action, ui, _windows, _bus) = action(&manifest);
        action
            .invoke("setTitle", &[json!({"title": "3 unread"})])
            .unwrap();
        assert_eq!(
            ui.pushes.lock().unwrap().last().unwrap().title.as_deref(),
            Some("3 unread")
        );
        assert_eq!(action.invoke("getTitle", &[]).unwrap(), json!("3 unread"));
    }

    #[test]
    fn test_open_popup_geometry() {
        let manifest = manifest(Some(crate::manifest::ActionDefaults {
            default_title: None,
            default_icon: None,
            default_popup: Some("popup.html".to_string()),
        }));
        let (action, _ui, windows, _bus) = action(&manifest);
        action.invoke("openPopup", &[]).unwrap();

        let created = windows.created.lock().unwrap();
        let spec = &created[0];
        assert_eq!(spec.width, Some(400));
        assert_eq!(spec.height, Some(300));
        assert_eq!(spec.kind, Some(WindowKind::Popup));
        assert_eq!(
            spec.url.as_ref().unwrap().first(),
            Some("file:///ext/demo/popup.html")
        );
    }

    #[test]
    fn test_click_without_popup_fires_event() {
        let manifest = manifest(None);
        let (action, _ui, windows, bus) = action(&manifest);

        let clicks = Arc::new(Mutex::new(0usize));
        let sink = clicks.clone();
        let _sub = bus.subscribe(
            "demo",
            "action.onClicked",
            Arc::new(move |_: &[Value]| *sink.lock().unwrap() += 1),
        );

        action.handle_click(None).unwrap();
        assert_eq!(*clicks.lock().unwrap(), 1);
        assert!(windows.created.lock().unwrap().is_empty());
    }

    #[test]
    fn test_set_popup_empty_clears() {
        let manifest = manifest(Some(crate::manifest::ActionDefaults {
            default_title: None,
            default_icon: None,
            default_popup: Some("popup.html".to_string()),
        }));
        let (action, _ui, _windows, _bus) = action(&manifest);
        action.invoke("setPopup", &[json!({"popup": ""})]).unwrap();
        assert_eq!(action.invoke("getPopup", &[]).unwrap(), json!(""));
        assert!(matches!(
            action.invoke("openPopup", &[]),
            Err(ExtensionError::NotFound(_))
        ));
    }
}
