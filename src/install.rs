//! Package download and unpack for `management.install`.
//!
//! Packages are gzipped tarballs fetched by extension id and unpacked into
//! a per-extension directory named after the id, so the same id always
//! lands in the same place and survives restarts. The installer only
//! touches the filesystem; registry insertion is the service's job.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{ExtensionError, ExtensionResult};
use crate::manifest::Manifest;

/// Maximum allowed package size (10 MB).
const MAX_PACKAGE_SIZE: usize = 10 * 1024 * 1024;

/// Source of extension packages, keyed by extension id.
pub trait PackageFetcher: Send + Sync {
    fn fetch(&self, extension_id: &str) -> ExtensionResult<Vec<u8>>;
}

/// Fetches `{base_url}/{id}.tar.gz` over HTTP.
pub struct HttpFetcher {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl PackageFetcher for HttpFetcher {
    fn fetch(&self, extension_id: &str) -> ExtensionResult<Vec<u8>> {
        let url = format!("{}/{}.tar.gz", self.base_url, extension_id);
        let install_err = |message: String| ExtensionError::InstallFailed {
            extension: extension_id.to_string(),
            message,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| install_err(format!("request to {url} failed: {e}")))?;
        if !response.status().is_success() {
            return Err(install_err(format!(
                "{url} returned status {}",
                response.status()
            )));
        }
        let body = response
            .bytes()
            .map_err(|e| install_err(format!("reading body from {url} failed: {e}")))?;
        Ok(body.to_vec())
    }
}

pub struct Installer {
    extensions_dir: PathBuf,
    fetcher: Box<dyn PackageFetcher>,
}

impl Installer {
    pub fn new(extensions_dir: PathBuf, fetcher: Box<dyn PackageFetcher>) -> Self {
        Self {
            extensions_dir,
            fetcher,
        }
    }

    /// Deterministic install root for one extension id.
    pub fn install_dir(&self, extension_id: &str) -> PathBuf {
        self.extensions_dir.join(extension_id)
    }

    /// Fetch, unpack and validate one extension. Returns the parsed
    /// manifest and the install root. Re-installing overwrites in place.
    pub fn install(&self, extension_id: &str) -> ExtensionResult<(Manifest, PathBuf)> {
        let package = self.fetcher.fetch(extension_id)?;
        if package.len() > MAX_PACKAGE_SIZE {
            return Err(ExtensionError::InstallFailed {
                extension: extension_id.to_string(),
                message: format!(
                    "package too large: {} bytes (max {MAX_PACKAGE_SIZE})",
                    package.len()
                ),
            });
        }

        let target = self.install_dir(extension_id);
        std::fs::create_dir_all(&target)?;
        unpack_archive(extension_id, &package, &target)?;

        let manifest = Manifest::load(&target)?;
        manifest.validate()?;
        log::info!(
            "installed extension '{extension_id}' ({} {}) at {}",
            manifest.name,
            manifest.version,
            target.display()
        );
        Ok((manifest, target))
    }
}

/// Unpack a gzipped tarball into `target`, rejecting entries that would
/// escape it.
fn unpack_archive(extension_id: &str, package: &[u8], target: &Path) -> ExtensionResult<()> {
    let install_err = |message: String| ExtensionError::InstallFailed {
        extension: extension_id.to_string(),
        message,
    };

    let mut decoder = GzDecoder::new(package);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| install_err(format!("failed to decompress package: {e}")))?;

    let mut archive = Archive::new(decompressed.as_slice());
    for entry in archive
        .entries()
        .map_err(|e| install_err(format!("invalid tar archive: {e}")))?
    {
        let mut entry = entry.map_err(|e| install_err(format!("failed to read tar entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| install_err(format!("invalid path in archive: {e}")))?
            .into_owned();
        let path_str = path.to_string_lossy();

        if path_str.starts_with('/') {
            return Err(install_err("package contains absolute paths".to_string()));
        }
        if path_str.contains("..") {
            return Err(install_err("package contains path traversal".to_string()));
        }

        let dest = target.join(&path);
        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&dest)?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| install_err(format!("failed to read {path_str}: {e}")))?;
        std::fs::write(&dest, contents)?;
    }

    Ok(())
}
