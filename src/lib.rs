//! Skiff extension layer - a `chrome.*` compatibility surface for the
//! Skiff browser shell.
//!
//! Third-party extension code runs in an isolated context and talks to the
//! shell exclusively through an asynchronous message boundary. This crate is
//! the host side of that boundary plus the typed client used on the
//! extension side.
//!
//! # Architecture
//!
//! ```text
//! ExtensionService
//! ├── ExtensionRegistry
//! │   ├── extensions: HashMap<ExtensionId, Extension>
//! │   │   └── Extension { id, manifest, path, apis: ApiSet }
//! │   ├── EventBus          (per-extension event channels)
//! │   ├── MenuRegistry      (context-menu items, keyed by extension)
//! │   └── WebRequestRelay   (per-stage fan-out to extensions)
//! ├── Dispatcher            (routes boundary calls to ApiSet methods)
//! └── Installer             (fetch + unpack + register packages)
//! ```
//!
//! Extension code holds a [`client::ChromeClient`]: typed namespace stubs
//! that forward every call through one generic [`client::Transport`] to the
//! dispatcher, and turn `addListener` into an [`events::EventBus`]
//! subscription.
//!
//! The shell supplies its tab/window/cookie/notification capabilities via
//! the trait contracts in [`host`]; this crate never owns a tab table.

pub mod apis;
pub mod client;
pub mod dispatch;
pub mod events;
pub mod host;
pub mod install;
pub mod manifest;
pub mod registry;
pub mod service;

mod error;

pub use dispatch::{DispatchReply, DispatchRequest, Dispatcher};
pub use error::{ErrorDescriptor, ErrorKind, ExtensionError, ExtensionResult};
pub use events::{EventBus, SubscriptionHandle};
pub use host::ShellHandles;
pub use manifest::Manifest;
pub use registry::{Extension, ExtensionRegistry};
pub use service::{ExtensionService, ExtensionServiceConfig};

/// Unique identifier for an installed extension.
pub type ExtensionId = String;

/// Host-assigned tab identifier, stable for the tab's lifetime.
pub type TabId = u64;

/// Host-assigned window identifier.
pub type WindowId = u64;
