use super::{ArchiveLocation, Locator};
use crate::pkg::{download_tarball, LocateError, PackageSpec, RegistryClient};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use std::path::Path;
use tracing::debug;

/// Resolves the tarball through a registry's metadata endpoint and downloads it.
#[derive(Debug, Clone)]
pub struct RegistryLocator {
    label: String,
    client: RegistryClient,
    max_bytes: u64,
}

impl RegistryLocator {
    /// # Errors
    /// Returns an error if `registry` is not a valid URL.
    pub fn new(registry: &str, http: Client, max_bytes: u64) -> Result<Self, LocateError> {
        let client = RegistryClient::new(registry, http)?;
        let label = match client.base_url().host_str() {
            Some(host) => format!("registry:{host}"),
            None => format!("registry:{}", client.base_url()),
        };
        Ok(Self {
            label,
            client,
            max_bytes,
        })
    }

    async fn fetch(&self, spec: &PackageSpec, dest: &Path) -> Result<ArchiveLocation, LocateError> {
        let url = self.client.tarball_url(spec).await?;
        debug!(strategy = %self.label, %url, "Downloading tarball");

        let path = download_tarball(self.client.http(), &url, dest, self.max_bytes).await?;
        Ok(ArchiveLocation::DownloadedFile(path))
    }
}

impl Locator for RegistryLocator {
    fn label(&self) -> &str {
        &self.label
    }

    fn locate<'a>(
        &'a self,
        spec: &'a PackageSpec,
        dest: &'a Path,
    ) -> BoxFuture<'a, Result<ArchiveLocation, LocateError>> {
        self.fetch(spec, dest).boxed()
    }
}
