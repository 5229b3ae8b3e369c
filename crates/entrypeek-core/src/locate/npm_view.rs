use super::{ArchiveLocation, Locator};
use crate::pkg::{download_tarball, LocateError, NpmCli, PackageSpec};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use std::path::Path;
use tracing::debug;

/// Asks `npm view` for the tarball URL, then downloads it.
///
/// This honours whatever registry and credentials the user's npm is set up
/// with, which the plain registry strategies know nothing about.
#[derive(Debug, Clone)]
pub struct NpmViewLocator {
    npm: NpmCli,
    http: Client,
    max_bytes: u64,
}

impl NpmViewLocator {
    #[must_use]
    pub fn new(npm: NpmCli, http: Client, max_bytes: u64) -> Self {
        Self {
            npm,
            http,
            max_bytes,
        }
    }

    async fn fetch(&self, spec: &PackageSpec, dest: &Path) -> Result<ArchiveLocation, LocateError> {
        tokio::fs::create_dir_all(dest).await?;

        let url = self.npm.view_tarball_url(spec, dest).await?;
        debug!(strategy = "npm-view", %url, "Downloading tarball");

        let path = download_tarball(&self.http, &url, dest, self.max_bytes).await?;
        Ok(ArchiveLocation::DownloadedFile(path))
    }
}

impl Locator for NpmViewLocator {
    fn label(&self) -> &str {
        "npm-view"
    }

    fn locate<'a>(
        &'a self,
        spec: &'a PackageSpec,
        dest: &'a Path,
    ) -> BoxFuture<'a, Result<ArchiveLocation, LocateError>> {
        self.fetch(spec, dest).boxed()
    }
}
