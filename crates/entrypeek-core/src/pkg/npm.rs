//! Thin wrapper around the `npm` command line.
//!
//! Only the two capabilities the locators need are exposed: querying a
//! package's tarball URL and packing a package into a directory.

use super::error::LocateError;
use super::spec::PackageSpec;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Handle to an `npm` executable.
#[derive(Debug, Clone)]
pub struct NpmCli {
    program: PathBuf,
}

impl NpmCli {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Ask the package manager for the tarball URL of `spec`.
    ///
    /// # Errors
    /// Returns an error on non-zero exit or when nothing usable was printed.
    pub async fn view_tarball_url(&self, spec: &PackageSpec, cwd: &Path) -> Result<String, LocateError> {
        let spec_str = spec.to_string();
        let stdout = self
            .run(&["view", spec_str.as_str(), "dist.tarball"], cwd)
            .await?;

        parse_view_output(&stdout).ok_or_else(|| {
            LocateError::tool_failed(format!("`npm view {spec_str} dist.tarball` printed no URL"))
        })
    }

    /// Pack `spec` into `dest`, leaving a `.tgz` there.
    ///
    /// # Errors
    /// Returns an error on non-zero exit.
    pub async fn pack(&self, spec: &PackageSpec, dest: &Path) -> Result<(), LocateError> {
        let spec_str = spec.to_string();
        let dest_str = dest.to_string_lossy();
        self.run(
            &["pack", spec_str.as_str(), "--pack-destination", dest_str.as_ref()],
            dest,
        )
        .await
        .map(drop)
    }

    async fn run(&self, args: &[&str], cwd: &Path) -> Result<String, LocateError> {
        debug!(program = %self.program.display(), ?args, "Spawning package manager");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                LocateError::tool_failed(format!(
                    "Failed to run '{}': {e}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LocateError::tool_failed(format!(
                "'{} {}' exited with {}: {}",
                self.program.display(),
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for NpmCli {
    fn default() -> Self {
        Self::new("npm")
    }
}

/// Pull the URL out of `npm view ... dist.tarball` output.
///
/// A single match prints the bare URL; a range matching several versions
/// prints `name@version 'url'` lines, in which case the last one wins.
fn parse_view_output(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).rev().find(|l| !l.is_empty())?;
    let token = line.split_whitespace().next_back()?;
    let url = token.trim_matches(|c| c == '\'' || c == '"');
    (!url.is_empty()).then(|| url.to_string())
}
