use super::{ArchiveLocation, Locator};
use crate::pkg::{LocateError, NpmCli, PackageSpec};
use futures::future::BoxFuture;
use futures::FutureExt;
use regex_lite::Regex;
use std::path::{Path, PathBuf};

/// Runs `npm pack` into the strategy directory and picks up the archive.
#[derive(Debug, Clone)]
pub struct NpmPackLocator {
    npm: NpmCli,
}

impl NpmPackLocator {
    #[must_use]
    pub fn new(npm: NpmCli) -> Self {
        Self { npm }
    }

    async fn fetch(&self, spec: &PackageSpec, dest: &Path) -> Result<ArchiveLocation, LocateError> {
        tokio::fs::create_dir_all(dest).await?;
        self.npm.pack(spec, dest).await?;

        let dir = dest.to_path_buf();
        let spec = spec.clone();
        let found = tokio::task::spawn_blocking(move || find_packed_archive(&dir, &spec))
            .await
            .map_err(|e| LocateError::no_archive(format!("Archive lookup failed: {e}")))??;

        Ok(ArchiveLocation::LocalFile(found))
    }
}

impl Locator for NpmPackLocator {
    fn label(&self) -> &str {
        "npm-pack"
    }

    fn locate<'a>(
        &'a self,
        spec: &'a PackageSpec,
        dest: &'a Path,
    ) -> BoxFuture<'a, Result<ArchiveLocation, LocateError>> {
        self.fetch(spec, dest).boxed()
    }
}

/// Find the archive `npm pack` wrote for `spec` in `dir`.
///
/// npm names it `<stem>-<version>.tgz` where the stem is the package name
/// without its leading `@` and with `/` replaced by `-`.
///
/// # Errors
/// Returns an error if the directory cannot be read or nothing matches.
pub fn find_packed_archive(dir: &Path, spec: &PackageSpec) -> Result<PathBuf, LocateError> {
    let stem = spec.tarball_stem();
    let pattern = Regex::new(&format!(r"^{}-\d[0-9A-Za-z.+-]*\.tgz$", regex_lite::escape(&stem)))
        .map_err(|e| LocateError::no_archive(format!("Bad archive pattern for '{stem}': {e}")))?;

    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| pattern.is_match(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .collect();

    matches.sort();
    matches.into_iter().next().ok_or_else(|| {
        LocateError::no_archive(format!(
            "No '{stem}-<version>.tgz' found in {}",
            dir.display()
        ))
    })
}
