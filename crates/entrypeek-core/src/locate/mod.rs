//! Tarball locator strategies.
//!
//! Each strategy turns a [`PackageSpec`] into an archive on local disk, using
//! its own data source. The fetcher races all of them and keeps the first
//! archive that turns up.

mod npm_pack;
mod npm_view;
mod registry;

pub use npm_pack::{find_packed_archive, NpmPackLocator};
pub use npm_view::NpmViewLocator;
pub use registry::RegistryLocator;

use crate::config::FetchConfig;
use crate::pkg::{http_client, LocateError, NpmCli, PackageSpec};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a strategy left the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveLocation {
    /// Written directly by a local tool (`npm pack`).
    LocalFile(PathBuf),
    /// Downloaded from a remote tarball URL.
    DownloadedFile(PathBuf),
}

impl ArchiveLocation {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::LocalFile(path) | Self::DownloadedFile(path) => path,
        }
    }
}

/// A way of obtaining a package archive.
///
/// `dest` is a directory reserved for this strategy; it may not exist yet.
/// Implementations must only write inside it and must not return a location
/// for a file that was not completely written.
pub trait Locator: Send + Sync {
    /// Short name used in logs and error messages.
    fn label(&self) -> &str;

    fn locate<'a>(
        &'a self,
        spec: &'a PackageSpec,
        dest: &'a Path,
    ) -> BoxFuture<'a, Result<ArchiveLocation, LocateError>>;
}

/// Build the strategies described by `config`: one per registry, then the two
/// package-manager strategies if enabled.
///
/// # Errors
/// Returns an error if a registry URL is invalid or the HTTP client fails.
pub fn default_locators(config: &FetchConfig) -> Result<Vec<Arc<dyn Locator>>, LocateError> {
    let http = http_client()?;
    let mut locators: Vec<Arc<dyn Locator>> = Vec::new();

    for registry in &config.registries {
        locators.push(Arc::new(RegistryLocator::new(
            registry,
            http.clone(),
            config.max_tarball_bytes,
        )?));
    }

    if config.use_package_manager {
        let npm = NpmCli::new(&config.npm_program);
        locators.push(Arc::new(NpmViewLocator::new(
            npm.clone(),
            http,
            config.max_tarball_bytes,
        )));
        locators.push(Arc::new(NpmPackLocator::new(npm)));
    }

    Ok(locators)
}

/// Turn a label into something safe to use as a directory name.
pub(crate) fn dir_slug(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
