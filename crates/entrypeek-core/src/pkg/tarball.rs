//! Tarball download and extraction.

use super::error::LocateError;
use crate::error::FetchError;
use flate2::read::GzDecoder;
use reqwest::Client;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tar::Archive;
use tokio::io::AsyncWriteExt;

/// Maximum tarball size (200 MB).
pub const MAX_TARBALL_SIZE: u64 = 200 * 1024 * 1024;

/// Download timeout in seconds.
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Download a tarball from `url` into `dest_dir`, streaming the body to disk.
///
/// The body is written to a `.part` file that is renamed only once the whole
/// response has arrived, so a failed download never leaves a file under the
/// final name.
///
/// # Errors
/// Returns an error if the request fails, the status is not 2xx, or the body
/// exceeds `max_bytes`.
pub async fn download_tarball(
    client: &Client,
    url: &str,
    dest_dir: &Path,
    max_bytes: u64,
) -> Result<PathBuf, LocateError> {
    tokio::fs::create_dir_all(dest_dir).await?;

    let file_name = tarball_file_name(url);
    let final_path = dest_dir.join(&file_name);
    let part_path = dest_dir.join(format!("{file_name}.part"));

    match stream_to_file(client, url, &part_path, max_bytes).await {
        Ok(()) => {
            tokio::fs::rename(&part_path, &final_path).await?;
            Ok(final_path)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&part_path).await;
            Err(e)
        }
    }
}

async fn stream_to_file(
    client: &Client,
    url: &str,
    part_path: &Path,
    max_bytes: u64,
) -> Result<(), LocateError> {
    let mut response = client
        .get(url)
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| LocateError::download_failed(format!("Failed to download '{url}': {e}")))?;

    if !response.status().is_success() {
        return Err(LocateError::download_failed(format!(
            "Download failed with status {} for '{url}'",
            response.status()
        )));
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(LocateError::download_failed(format!(
                "Tarball too large: {len} bytes (max: {max_bytes})"
            )));
        }
    }

    let mut file = tokio::fs::File::create(part_path).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| LocateError::download_failed(format!("Failed to read response body: {e}")))?
    {
        written += chunk.len() as u64;
        if written > max_bytes {
            return Err(LocateError::download_failed(format!(
                "Tarball too large: more than {max_bytes} bytes"
            )));
        }
        file.write_all(&chunk).await?;
    }

    if written == 0 {
        return Err(LocateError::download_failed(format!(
            "Empty response body for '{url}'"
        )));
    }

    file.flush().await?;
    Ok(())
}

/// Derive a local file name from a tarball URL (`.../-/left-pad-1.3.0.tgz`).
fn tarball_file_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| "package.tgz".to_string())
}

/// Extract a `.tgz` archive into `dest` and return the package root.
///
/// The package root is `package/` for regular npm tarballs, or the single
/// top-level directory for archives that use another name (`@types/*`
/// publish under the bare package name).
///
/// # Errors
/// Returns an error if the archive is unreadable, corrupt, or unsafe.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<PathBuf, FetchError> {
    let file = File::open(archive)
        .map_err(|e| FetchError::extraction(archive, format!("Failed to open archive: {e}")))?;

    fs::create_dir_all(dest)
        .map_err(|e| FetchError::extraction(archive, format!("Failed to create {}: {e}", dest.display())))?;

    extract_tgz_to(file, dest).map_err(|msg| FetchError::extraction(archive, msg))?;

    find_extracted_root(dest).map_err(|msg| FetchError::extraction(archive, msg))
}

fn extract_tgz_to(reader: impl io::Read, dest: &Path) -> Result<(), String> {
    let mut archive = Archive::new(GzDecoder::new(reader));

    let entries = archive
        .entries()
        .map_err(|e| format!("Failed to read tarball entries: {e}"))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| format!("Failed to read tarball entry: {e}"))?;

        let path = entry
            .path()
            .map_err(|e| format!("Failed to read entry path: {e}"))?
            .into_owned();
        let shown = path.to_string_lossy().into_owned();

        if path.is_absolute() {
            return Err(format!("Tarball contains absolute path: {shown}"));
        }

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(format!("Tarball contains path traversal: {shown}"));
        }

        let dest_path = dest.join(&path);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path).map_err(|e| format!("{shown}: {e}"))?;
        } else if entry_type.is_file() {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).map_err(|e| format!("{shown}: {e}"))?;
            }

            let mut file = File::create(&dest_path).map_err(|e| format!("{shown}: {e}"))?;
            io::copy(&mut entry, &mut file).map_err(|e| format!("{shown}: {e}"))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(mode) = entry.header().mode() {
                    let _ = fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode | 0o600));
                }
            }
        }
        // Symlinks and special entries are skipped.
    }

    Ok(())
}

fn find_extracted_root(dir: &Path) -> Result<PathBuf, String> {
    let package_dir = dir.join("package");
    if package_dir.is_dir() {
        return Ok(package_dir);
    }

    let dirs: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| format!("Failed to read extracted dir: {e}"))?
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_type().map(|ft| ft.is_dir()).unwrap_or(false)
                && !e.file_name().to_string_lossy().starts_with('.')
        })
        .map(|e| e.path())
        .collect();

    match dirs.as_slice() {
        [only] => Ok(only.clone()),
        [] => Err("Tarball does not contain any top-level directory".to_string()),
        many => Err(format!(
            "Tarball contains {} top-level directories, expected 1",
            many.len()
        )),
    }
}
