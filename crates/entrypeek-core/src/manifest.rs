//! `package.json` reading and entry-file selection.
//!
//! Entry selection is a heuristic keyed on a *distribution tag*: a path
//! fragment such as `dist-mjs` or `esm` naming the build variant the caller
//! wants. It looks at `main` and at the `import`/`require` targets of each
//! `exports` entry and picks the first path containing the tag.
//!
//! Known limitations: nested condition objects, wildcard subpaths and
//! `node`/`browser`/`default` conditions are not evaluated. Matching is a
//! plain substring test, so a tag occurring anywhere in a path counts.

use crate::error::FetchError;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Entry used when `main` is absent or empty.
pub const DEFAULT_ENTRY: &str = "index.js";

/// Conventional location of the manifest inside an extracted tarball.
pub const MANIFEST_FILE: &str = "package.json";

/// One `exports` entry, reduced to its plain `import`/`require` targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportEntry {
    pub key: String,
    pub import: Option<String>,
    pub require: Option<String>,
}

/// The parts of `package.json` that entry resolution looks at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageManifest {
    pub main: Option<String>,
    /// `exports` entries in document order.
    pub exports: Vec<ExportEntry>,
}

impl PackageManifest {
    /// Parse manifest JSON.
    ///
    /// Only a non-object document is rejected. Field shapes the resolver does
    /// not understand (string `exports`, array targets, nested conditions) are
    /// kept as entries without targets rather than failing the parse.
    ///
    /// # Errors
    /// Returns a message describing why the document is not a manifest.
    pub fn parse(content: &str) -> Result<Self, String> {
        let doc: Value = serde_json::from_str(content).map_err(|e| format!("Invalid JSON: {e}"))?;
        let obj = doc
            .as_object()
            .ok_or_else(|| "package.json must be a JSON object".to_string())?;

        let main = obj.get("main").and_then(Value::as_str).map(String::from);

        let exports = obj
            .get("exports")
            .and_then(Value::as_object)
            .map(|table| {
                table
                    .iter()
                    .map(|(key, target)| ExportEntry {
                        key: key.clone(),
                        import: condition(target, "import"),
                        require: condition(target, "require"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { main, exports })
    }

    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    /// Returns [`FetchError::Manifest`] if the file is missing or unparsable.
    pub async fn read(path: &Path) -> Result<Self, FetchError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FetchError::manifest(path, format!("Failed to read: {e}")))?;

        Self::parse(&content).map_err(|msg| FetchError::manifest(path, msg))
    }

    /// `main`, or [`DEFAULT_ENTRY`] when it is absent or empty.
    #[must_use]
    pub fn main_or_default(&self) -> &str {
        match self.main.as_deref() {
            Some(main) if !main.is_empty() => main,
            _ => DEFAULT_ENTRY,
        }
    }
}

fn condition(target: &Value, name: &str) -> Option<String> {
    target.get(name).and_then(Value::as_str).map(String::from)
}

/// Choose the entry path of `manifest` for `dist_tag`.
///
/// 1. Start from `main` (or `index.js`).
/// 2. Without a tag, or when `main` already contains the tag, that is the answer.
/// 3. Otherwise the first `exports` entry whose `import` contains the tag wins,
///    else its `require` if that contains the tag.
/// 4. Nothing matching falls back to step 1's value.
#[must_use]
pub fn resolve_entry(manifest: &PackageManifest, dist_tag: Option<&str>) -> String {
    let entry = manifest.main_or_default();

    let Some(tag) = dist_tag else {
        return entry.to_string();
    };

    if entry.contains(tag) {
        return entry.to_string();
    }

    manifest
        .exports
        .iter()
        .find_map(|export| {
            let target = [export.import.as_deref(), export.require.as_deref()]
                .into_iter()
                .flatten()
                .find(|target| target.contains(tag))?;
            debug!(export = %export.key, target, tag, "Entry taken from exports");
            Some(target)
        })
        .unwrap_or(entry)
        .to_string()
}
