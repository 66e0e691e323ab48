//! Service layer: owns the registry, the event bus and the installer, and
//! wires the shell's capability handles into per-extension module sets.
//!
//! The embedding shell builds one [`ExtensionService`] at startup, calls
//! [`ExtensionService::scan`] to pick up previously installed extensions,
//! and hands [`ExtensionService::client_for`] handles to each extension
//! context it spawns.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use crate::apis::{
    ApiContext, ExtensionInfo, ManagementBridge, MenuRegistry, WebRequestRelay,
};
use crate::client::{ChromeClient, LocalTransport};
use crate::dispatch::Dispatcher;
use crate::error::{ExtensionError, ExtensionResult};
use crate::events::EventBus;
use crate::host::ShellHandles;
use crate::install::{HttpFetcher, Installer, PackageFetcher};
use crate::manifest::Manifest;
use crate::registry::{Extension, ExtensionRegistry};

/// Filesystem and registry endpoints for the service.
#[derive(Debug, Clone)]
pub struct ExtensionServiceConfig {
    /// Where unpacked extensions live, one subdirectory per id.
    pub extensions_dir: PathBuf,
    /// Where per-extension storage and permission files live.
    pub state_dir: PathBuf,
    /// Package registry base url for `management.install`.
    pub registry_url: String,
}

impl Default for ExtensionServiceConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skiff");
        Self {
            extensions_dir: data_dir.join("extensions"),
            state_dir: data_dir.join("extension-state"),
            registry_url: "https://extensions.skiff.dev/packages".to_string(),
        }
    }
}

struct ServiceInner {
    ctx: ApiContext,
    registry: Arc<ExtensionRegistry>,
    dispatcher: Arc<Dispatcher>,
    installer: Installer,
}

/// Top-level handle over the extension layer.
#[derive(Clone)]
pub struct ExtensionService {
    inner: Arc<ServiceInner>,
}

/// `chrome.management` bridge back into the service that owns the
/// registry. Weak so the per-extension module sets do not keep the
/// service alive.
struct ServiceBridge {
    inner: Weak<ServiceInner>,
}

impl ServiceBridge {
    fn service(&self) -> ExtensionResult<Arc<ServiceInner>> {
        self.inner
            .upgrade()
            .ok_or_else(|| ExtensionError::NotFound("extension service".to_string()))
    }
}

impl ManagementBridge for ServiceBridge {
    fn install(&self, extension_id: &str) -> ExtensionResult<ExtensionInfo> {
        self.service()?.install(extension_id)
    }

    fn uninstall(&self, extension_id: &str) -> ExtensionResult<()> {
        self.service()?.uninstall(extension_id)
    }

    fn set_enabled(&self, extension_id: &str, enabled: bool) -> ExtensionResult<()> {
        self.service()?.set_enabled(extension_id, enabled)
    }

    fn all(&self) -> Vec<ExtensionInfo> {
        self.service().map(|s| s.all()).unwrap_or_default()
    }
}

impl ExtensionService {
    pub fn new(config: ExtensionServiceConfig, shell: ShellHandles) -> ExtensionResult<Self> {
        let fetcher = Box::new(HttpFetcher::new(&config.registry_url));
        Self::with_fetcher(config, shell, fetcher)
    }

    /// Build with a custom package source. Tests use this to install from
    /// in-memory packages.
    pub fn with_fetcher(
        config: ExtensionServiceConfig,
        shell: ShellHandles,
        fetcher: Box<dyn PackageFetcher>,
    ) -> ExtensionResult<Self> {
        std::fs::create_dir_all(&config.extensions_dir)?;
        std::fs::create_dir_all(&config.state_dir)?;

        let events = EventBus::new();
        let menus = Arc::new(MenuRegistry::new(events.clone()));
        let web_request = Arc::new(WebRequestRelay::new(events.clone()));
        let registry = Arc::new(ExtensionRegistry::new(events.clone(), menus.clone()));
        let dispatcher = Arc::new(Dispatcher::new(registry.clone()));
        let installer = Installer::new(config.extensions_dir.clone(), fetcher);

        let inner = Arc::new_cyclic(|weak: &Weak<ServiceInner>| ServiceInner {
            ctx: ApiContext {
                shell,
                events,
                menus,
                web_request,
                management: Arc::new(ServiceBridge {
                    inner: weak.clone(),
                }),
                state_dir: config.state_dir.clone(),
            },
            registry,
            dispatcher,
            installer,
        });

        let service = Self { inner };
        service.scan(&config.extensions_dir)?;
        Ok(service)
    }

    /// Register every extension already unpacked under `extensions_dir`.
    /// A directory with a bad manifest is skipped and logged, not fatal.
    fn scan(&self, extensions_dir: &PathBuf) -> ExtensionResult<()> {
        for entry in std::fs::read_dir(extensions_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            if let Err(err) = self.inner.load_from_dir(&id, entry.path()) {
                log::warn!("skipping extension at {}: {err}", entry.path().display());
            }
        }
        log::info!("registered {} extension(s)", self.inner.registry.len());
        Ok(())
    }

    /// Download, unpack and register an extension by id.
    pub fn install(&self, extension_id: &str) -> ExtensionResult<ExtensionInfo> {
        self.inner.install(extension_id)
    }

    pub fn uninstall(&self, extension_id: &str) -> ExtensionResult<()> {
        self.inner.uninstall(extension_id)
    }

    pub fn set_enabled(&self, extension_id: &str, enabled: bool) -> ExtensionResult<()> {
        self.inner.set_enabled(extension_id, enabled)
    }

    pub fn all(&self) -> Vec<ExtensionInfo> {
        self.inner.all()
    }

    /// Typed client bound to one extension's identity, for the context
    /// that runs its code.
    pub fn client_for(&self, extension_id: &str) -> ExtensionResult<ChromeClient> {
        if !self.inner.registry.contains(extension_id) {
            return Err(ExtensionError::ExtensionNotFound(extension_id.to_string()));
        }
        let transport = LocalTransport::new(
            extension_id,
            self.inner.dispatcher.clone(),
            self.inner.ctx.events.clone(),
        );
        Ok(ChromeClient::new(Arc::new(transport)))
    }

    /// Re-read an installed extension from disk, rebuilding its modules.
    pub fn reload(&self, extension_id: &str) -> ExtensionResult<()> {
        let record = self
            .inner
            .registry
            .get(extension_id)
            .ok_or_else(|| ExtensionError::ExtensionNotFound(extension_id.to_string()))?;
        let path = record.lock().unwrap_or_else(|e| e.into_inner()).path.clone();
        self.inner.registry.remove(extension_id);
        self.inner
            .ctx
            .shell
            .background
            .stop_background(&extension_id.to_string());
        self.inner.load_from_dir(extension_id, path)?;
        Ok(())
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.inner.dispatcher.clone()
    }

    pub fn registry(&self) -> Arc<ExtensionRegistry> {
        self.inner.registry.clone()
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.inner.ctx.events.clone()
    }

    pub fn menus(&self) -> Arc<MenuRegistry> {
        self.inner.ctx.menus.clone()
    }

    pub fn web_request(&self) -> Arc<WebRequestRelay> {
        self.inner.ctx.web_request.clone()
    }
}

impl ServiceInner {
    fn load_from_dir(&self, id: &str, path: PathBuf) -> ExtensionResult<ExtensionInfo> {
        let manifest = Manifest::load(&path)?;
        manifest.validate()?;
        let extension = Extension::new(id, manifest, path, &self.ctx);
        let info = describe(&extension);
        let background = extension
            .manifest
            .background
            .as_ref()
            .and_then(|bg| bg.scripts.first())
            .map(|script| crate::apis::runtime::file_url(&extension.path, script));
        self.registry.insert(extension);

        // The script failing to start is the shell's problem to surface;
        // the extension's api surface stays usable either way.
        if let Some(url) = background {
            if let Err(err) = self.ctx.shell.background.start_background(&id.to_string(), &url) {
                log::warn!("background context for '{id}' failed to start: {err}");
            }
        }
        Ok(info)
    }

    fn install(&self, extension_id: &str) -> ExtensionResult<ExtensionInfo> {
        // Fetch and unpack before touching the registry: a failed
        // download must leave an already-installed extension running.
        let (_manifest, path) = self.installer.install(extension_id)?;
        // Re-install replaces the record; tear the old one down so stale
        // listeners and background contexts do not survive the swap.
        if self.registry.remove(extension_id).is_some() {
            self.ctx
                .shell
                .background
                .stop_background(&extension_id.to_string());
        }
        self.load_from_dir(extension_id, path)
    }

    fn uninstall(&self, extension_id: &str) -> ExtensionResult<()> {
        self.registry
            .remove(extension_id)
            .ok_or_else(|| ExtensionError::ExtensionNotFound(extension_id.to_string()))?;
        self.ctx
            .shell
            .background
            .stop_background(&extension_id.to_string());
        Ok(())
    }

    fn set_enabled(&self, extension_id: &str, enabled: bool) -> ExtensionResult<()> {
        let record = self
            .registry
            .get(extension_id)
            .ok_or_else(|| ExtensionError::ExtensionNotFound(extension_id.to_string()))?;
        record.lock().unwrap_or_else(|e| e.into_inner()).enabled = enabled;
        Ok(())
    }

    fn all(&self) -> Vec<ExtensionInfo> {
        self.registry
            .ids()
            .into_iter()
            .filter_map(|id| self.registry.get(&id))
            .map(|record| describe(&record.lock().unwrap_or_else(|e| e.into_inner())))
            .collect()
    }
}

fn describe(extension: &Extension) -> ExtensionInfo {
    ExtensionInfo {
        id: extension.id.clone(),
        name: extension.manifest.name.clone(),
        version: extension.manifest.version.clone(),
        enabled: extension.enabled,
        description: extension.manifest.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::test_support::MemoryShell;
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> ExtensionServiceConfig {
        ExtensionServiceConfig {
            extensions_dir: temp.path().join("extensions"),
            state_dir: temp.path().join("state"),
            registry_url: "http://localhost:0".to_string(),
        }
    }

    fn seed_extension(temp: &TempDir, id: &str, manifest: &str) {
        let dir = temp.path().join("extensions").join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("manifest.json"), manifest).unwrap();
    }

    #[test]
    fn test_scan_registers_valid_and_skips_broken() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("extensions")).unwrap();
        seed_extension(
            &temp,
            "good",
            r#"{"name": "Good", "version": "1.0", "manifest_version": 3}"#,
        );
        seed_extension(&temp, "broken", "{not json");

        let service = ExtensionService::new(config(&temp), MemoryShell::handles()).unwrap();
        let all = service.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "good");
    }

    #[test]
    fn test_client_for_unknown_extension() {
        let temp = TempDir::new().unwrap();
        let service = ExtensionService::new(config(&temp), MemoryShell::handles()).unwrap();
        assert!(matches!(
            service.client_for("ghost"),
            Err(ExtensionError::ExtensionNotFound(_))
        ));
    }

    #[test]
    fn test_set_enabled_round_trip() {
        let temp = TempDir::new().unwrap();
        seed_extension(
            &temp,
            "abc",
            r#"{"name": "A", "version": "1.0", "manifest_version": 3}"#,
        );
        let service = ExtensionService::new(config(&temp), MemoryShell::handles()).unwrap();

        service.set_enabled("abc", false).unwrap();
        assert!(!service.all()[0].enabled);
        service.set_enabled("abc", true).unwrap();
        assert!(service.all()[0].enabled);
    }

    #[test]
    fn test_background_context_spawned_and_torn_down() {
        let temp = TempDir::new().unwrap();
        seed_extension(
            &temp,
            "bg",
            r#"{"name": "Bg", "version": "1.0", "manifest_version": 3,
                "background": {"scripts": ["background.js"]}}"#,
        );
        let shell = MemoryShell::new();
        let service =
            ExtensionService::new(config(&temp), shell.clone().into_handles()).unwrap();

        let log = shell.background_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("start:bg:file://"));
        assert!(log[0].ends_with("/background.js"));

        service.uninstall("bg").unwrap();
        assert_eq!(shell.background_log().last().map(String::as_str), Some("stop:bg"));
    }

    #[test]
    fn test_failed_reinstall_keeps_existing_extension() {
        struct DeadFetcher;
        impl PackageFetcher for DeadFetcher {
            fn fetch(&self, extension_id: &str) -> ExtensionResult<Vec<u8>> {
                Err(ExtensionError::InstallFailed {
                    extension: extension_id.to_string(),
                    message: "registry unreachable".to_string(),
                })
            }
        }

        let temp = TempDir::new().unwrap();
        seed_extension(
            &temp,
            "abc",
            r#"{"name": "A", "version": "1.0", "manifest_version": 3}"#,
        );
        let service =
            ExtensionService::with_fetcher(config(&temp), MemoryShell::handles(), Box::new(DeadFetcher))
                .unwrap();

        assert!(service.install("abc").is_err());
        assert_eq!(service.all().len(), 1);
        assert!(service.client_for("abc").is_ok());
    }

    #[test]
    fn test_uninstall_removes_record() {
        let temp = TempDir::new().unwrap();
        seed_extension(
            &temp,
            "abc",
            r#"{"name": "A", "version": "1.0", "manifest_version": 3}"#,
        );
        let service = ExtensionService::new(config(&temp), MemoryShell::handles()).unwrap();

        service.uninstall("abc").unwrap();
        assert!(service.all().is_empty());
        assert!(matches!(
            service.uninstall("abc"),
            Err(ExtensionError::ExtensionNotFound(_))
        ));
    }
}
