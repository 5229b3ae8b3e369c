//! npm registry client.

use super::error::LocateError;
use super::spec::PackageSpec;
use super::version::resolve_version;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Public mirror raced alongside the primary registry by default.
pub const DEFAULT_MIRROR: &str = "https://registry.npmmirror.com/";

/// Build the shared HTTP client used for metadata and tarball requests.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialized.
pub fn http_client() -> Result<Client, LocateError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(15))
        .user_agent(format!("entrypeek/{}", crate::VERSION))
        .build()
        .map_err(|e| LocateError::registry(format!("Failed to create HTTP client: {e}")))
}

/// Registry client for fetching package metadata.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a registry client for `base_url`, sharing `http`.
    ///
    /// A missing trailing slash is added so that joining package names keeps
    /// any path prefix the registry lives under.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: &str, http: Client) -> Result<Self, LocateError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let base_url = Url::parse(&normalized)
            .map_err(|e| LocateError::registry(format!("Invalid registry URL '{base_url}': {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the HTTP client (for reuse in tarball downloads).
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Fetch the packument (package metadata) for a package.
    ///
    /// # Errors
    /// Returns an error if the request fails or the package is not found.
    pub async fn fetch_packument(&self, spec: &PackageSpec) -> Result<serde_json::Value, LocateError> {
        let url = self.base_url.join(&spec.url_encoded_name()).map_err(|e| {
            LocateError::registry(format!("Failed to build URL for '{}': {e}", spec.name))
        })?;

        let response = self.http.get(url.as_str()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LocateError::not_found(&spec.name));
        }

        if !response.status().is_success() {
            return Err(LocateError::registry(format!(
                "Registry returned status {} for '{}'",
                response.status(),
                spec.name
            )));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Look up the tarball URL that satisfies `spec`.
    ///
    /// # Errors
    /// Returns an error if the metadata cannot be fetched or names no tarball.
    pub async fn tarball_url(&self, spec: &PackageSpec) -> Result<String, LocateError> {
        let packument = self.fetch_packument(spec).await?;
        select_tarball_url(&packument, spec)
    }
}

/// Pick the archive URL for `spec` out of a registry metadata document.
///
/// Full packuments carry a `dist-tags` table and a `versions` map; the version
/// is resolved locally. Single-version documents (what a registry serves for
/// `name/<version>`) have no tags table and carry `dist.tarball` at top level.
///
/// # Errors
/// Returns an error if no version satisfies the range or no URL is present.
pub fn select_tarball_url(
    packument: &serde_json::Value,
    spec: &PackageSpec,
) -> Result<String, LocateError> {
    if packument.get("dist-tags").is_none() {
        return get_direct_tarball_url(packument)
            .map(String::from)
            .ok_or_else(|| LocateError::registry(format!("No tarball URL for {spec}")));
    }

    let version = resolve_version(packument, spec.range.as_deref())?;
    get_tarball_url(packument, &version)
        .map(String::from)
        .ok_or_else(|| LocateError::registry(format!("No tarball URL for {}@{version}", spec.name)))
}

/// Extract a dist-tag's version from a packument.
#[must_use]
pub fn get_dist_tag<'a>(packument: &'a serde_json::Value, tag: &str) -> Option<&'a str> {
    packument.get("dist-tags")?.get(tag)?.as_str()
}

/// Extract the tarball URL for a specific version.
#[must_use]
pub fn get_tarball_url<'a>(packument: &'a serde_json::Value, version: &str) -> Option<&'a str> {
    packument
        .get("versions")?
        .get(version)?
        .get("dist")?
        .get("tarball")?
        .as_str()
}

/// Top-level `dist.tarball` of a single-version document.
#[must_use]
pub fn get_direct_tarball_url(doc: &serde_json::Value) -> Option<&str> {
    doc.get("dist")?.get("tarball")?.as_str()
}

/// Get all available version strings from a packument.
#[must_use]
pub fn get_versions(packument: &serde_json::Value) -> Vec<&str> {
    packument
        .get("versions")
        .and_then(|v| v.as_object())
        .map(|obj| obj.keys().map(String::as_str).collect())
        .unwrap_or_default()
}
