//! Fetch orchestration: working directory, locator race, extraction, entry read.

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::locate::{default_locators, dir_slug, ArchiveLocation, Locator};
use crate::logger::{default_logger, FetchLogger};
use crate::manifest::{resolve_entry, PackageManifest, MANIFEST_FILE};
use crate::pkg::{extract_archive, LocateError, PackageSpec};
use crate::race::race_first_ok;
use crate::retry::retry;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Retry count used when a request does not specify one.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Contents written to the placeholder manifest.
const PLACEHOLDER_MANIFEST: &str = "{}\n";

/// One fetch: which package, which build variant, how hard to try.
#[derive(Clone)]
pub struct FetchRequest {
    /// Package specifier (`name`, `name@range`, `@scope/name@range`).
    pub package: String,
    /// Distribution tag selecting among exported entry points.
    pub dist_tag: Option<String>,
    /// Extra attempts for each strategy and for the race as a whole.
    pub max_retries: u32,
    pub logger: Arc<dyn FetchLogger>,
}

impl FetchRequest {
    #[must_use]
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            dist_tag: None,
            max_retries: DEFAULT_MAX_RETRIES,
            logger: default_logger(),
        }
    }

    #[must_use]
    pub fn with_dist_tag(mut self, tag: impl Into<String>) -> Self {
        self.dist_tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn FetchLogger>) -> Self {
        self.logger = logger;
        self
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("package", &self.package)
            .field("dist_tag", &self.dist_tag)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// The archive that won the race, and who produced it.
#[derive(Debug)]
struct Located {
    strategy: String,
    location: ArchiveLocation,
}

/// Fetches a package's entry file by racing the configured locators.
pub struct EntryFetcher {
    config: FetchConfig,
    locators: Vec<Arc<dyn Locator>>,
}

impl EntryFetcher {
    /// Create a fetcher with the locators `config` describes.
    ///
    /// # Errors
    /// Returns an error if a registry URL is invalid or the HTTP client fails.
    pub fn new(config: FetchConfig) -> Result<Self, LocateError> {
        let locators = default_locators(&config)?;
        Ok(Self::with_locators(config, locators))
    }

    /// Create a fetcher racing exactly `locators`.
    #[must_use]
    pub fn with_locators(config: FetchConfig, locators: Vec<Arc<dyn Locator>>) -> Self {
        Self { config, locators }
    }

    /// Fetch `request.package` and return the text of its entry file.
    ///
    /// The working directory created for the call is removed before this
    /// returns, whether it succeeds or fails.
    ///
    /// # Errors
    /// Returns the first error of the failing stage; see [`FetchError`].
    pub async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let log = request.logger.as_ref();

        let spec = match PackageSpec::parse(&request.package) {
            Ok(spec) => spec,
            Err(e) => {
                log.error(&format!("Invalid package '{}': {e}", request.package));
                return Err(e.into());
            }
        };

        log.info(&format!("Fetching {spec}"));

        let result = self.fetch_spec(&spec, request).await;

        match &result {
            Ok(_) => log.info(&format!("Fetched {spec}")),
            Err(e) => log.error(&format!("Failed to fetch {spec} ({}): {e}", e.stage().as_str())),
        }

        result
    }

    async fn fetch_spec(&self, spec: &PackageSpec, request: &FetchRequest) -> Result<String, FetchError> {
        let placeholder = self.ensure_placeholder_manifest()?;
        let work_dir = self.create_work_dir(spec)?;

        let result = self.fetch_in(spec, request, work_dir.path()).await;

        remove_work_dir(work_dir);

        if result.is_ok() && self.config.test_mode {
            if let Some(path) = placeholder {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove placeholder manifest");
                }
            }
        }

        result
    }

    async fn fetch_in(
        &self,
        spec: &PackageSpec,
        request: &FetchRequest,
        work_dir: &Path,
    ) -> Result<String, FetchError> {
        let log = request.logger.as_ref();

        let mut attempt = 0u32;
        let located = retry(
            || {
                attempt += 1;
                self.race(spec, request, work_dir.join(format!("attempt-{attempt}")))
            },
            request.max_retries,
        )
        .await?;

        log.info(&format!(
            "Located {spec} via {}: {}",
            located.strategy,
            located.location.path().display()
        ));

        let archive = located.location.path().to_path_buf();
        let extract_dir = work_dir.join("extracted");
        let package_root = {
            let source = archive.clone();
            tokio::task::spawn_blocking(move || extract_archive(&source, &extract_dir))
                .await
                .map_err(|e| FetchError::extraction(&archive, format!("Extraction task failed: {e}")))??
        };

        let manifest = PackageManifest::read(&package_root.join(MANIFEST_FILE)).await?;
        let entry = resolve_entry(&manifest, request.dist_tag.as_deref());
        debug!(package = %spec, %entry, "Resolved entry");

        read_entry(&package_root, &entry).await
    }

    /// One round of the race: every locator, each retried on its own.
    async fn race(
        &self,
        spec: &PackageSpec,
        request: &FetchRequest,
        attempt_dir: PathBuf,
    ) -> Result<Located, FetchError> {
        let attempts = self.locators.iter().enumerate().map(|(index, locator)| {
            let dest = attempt_dir.join(format!("{index}-{}", dir_slug(locator.label())));
            async move {
                let outcome = retry(
                    || self.locate_once(locator.as_ref(), spec, &dest),
                    request.max_retries,
                )
                .await;

                match outcome {
                    Ok(location) => Ok(Located {
                        strategy: locator.label().to_string(),
                        location,
                    }),
                    Err(e) => {
                        debug!(strategy = locator.label(), error = %e, "Strategy failed");
                        Err(e.with_strategy(locator.label()))
                    }
                }
            }
        });

        race_first_ok(attempts)
            .await
            .map_err(|failures| FetchError::RaceExhausted { failures })
    }

    async fn locate_once(
        &self,
        locator: &dyn Locator,
        spec: &PackageSpec,
        dest: &Path,
    ) -> Result<ArchiveLocation, LocateError> {
        let attempt = locator.locate(spec, dest);
        match self.config.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .map_err(|_| LocateError::timeout(limit))?,
            None => attempt.await,
        }
    }

    fn create_work_dir(&self, spec: &PackageSpec) -> Result<TempDir, FetchError> {
        let root = &self.config.work_root;
        std::fs::create_dir_all(root).map_err(|source| FetchError::WorkDir {
            path: root.clone(),
            source,
        })?;

        tempfile::Builder::new()
            .prefix(&format!("entrypeek-{}-", spec.tarball_stem()))
            .tempdir_in(root)
            .map_err(|source| FetchError::WorkDir {
                path: root.clone(),
                source,
            })
    }

    /// Create `<work_root>/package.json` if enabled and absent.
    ///
    /// Returns the path only when this call created the file.
    fn ensure_placeholder_manifest(&self) -> Result<Option<PathBuf>, FetchError> {
        if !self.config.placeholder_manifest {
            return Ok(None);
        }

        let root = &self.config.work_root;
        let path = root.join(MANIFEST_FILE);
        if path.exists() {
            return Ok(None);
        }

        std::fs::create_dir_all(root)
            .and_then(|()| std::fs::write(&path, PLACEHOLDER_MANIFEST))
            .map_err(|source| FetchError::WorkDir {
                path: path.clone(),
                source,
            })?;

        Ok(Some(path))
    }
}

impl fmt::Debug for EntryFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.locators.iter().map(|l| l.label()).collect();
        f.debug_struct("EntryFetcher")
            .field("config", &self.config)
            .field("locators", &labels)
            .finish()
    }
}

fn remove_work_dir(work_dir: TempDir) {
    let path = work_dir.path().to_path_buf();
    if let Err(e) = work_dir.close() {
        warn!(path = %path.display(), error = %e, "Failed to remove working directory");
    }
}

/// Read the resolved entry, refusing paths that leave the package root.
async fn read_entry(package_root: &Path, entry: &str) -> Result<String, FetchError> {
    let relative = Path::new(entry);
    let path = package_root.join(relative);

    let escapes = relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(FetchError::EntryRead {
            entry: entry.to_string(),
            path,
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "entry path leaves the package root",
            ),
        });
    }

    tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| FetchError::EntryRead {
            entry: entry.to_string(),
            path,
            source,
        })
}
