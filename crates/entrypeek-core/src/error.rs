use crate::pkg::LocateError;
use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes for [`FetchError`].
pub mod codes {
    pub const FETCH_REQUEST_INVALID: &str = "FETCH_REQUEST_INVALID";
    pub const FETCH_WORKDIR_FAILED: &str = "FETCH_WORKDIR_FAILED";
    pub const FETCH_RACE_EXHAUSTED: &str = "FETCH_RACE_EXHAUSTED";
    pub const FETCH_EXTRACT_FAILED: &str = "FETCH_EXTRACT_FAILED";
    pub const FETCH_MANIFEST_INVALID: &str = "FETCH_MANIFEST_INVALID";
    pub const FETCH_ENTRY_READ_FAILED: &str = "FETCH_ENTRY_READ_FAILED";
}

/// Stage of a fetch at which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Request,
    Setup,
    Locate,
    Extract,
    Manifest,
    Entry,
}

impl Stage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Setup => "setup",
            Self::Locate => "locate",
            Self::Extract => "extract",
            Self::Manifest => "manifest",
            Self::Entry => "entry",
        }
    }
}

/// Error returned by [`EntryFetcher::fetch`](crate::EntryFetcher::fetch).
///
/// Only `RaceExhausted` is ever retried; everything after a successful locate
/// means the package itself is unusable.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] LocateError),

    #[error("Failed to prepare working directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("All {} locator strategies failed: {}", .failures.len(), join_failures(.failures))]
    RaceExhausted { failures: Vec<LocateError> },

    #[error("Failed to extract {archive}: {message}")]
    Extraction { archive: PathBuf, message: String },

    #[error("Invalid manifest at {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("Failed to read entry '{entry}' at {path}: {source}")]
    EntryRead {
        entry: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => codes::FETCH_REQUEST_INVALID,
            Self::WorkDir { .. } => codes::FETCH_WORKDIR_FAILED,
            Self::RaceExhausted { .. } => codes::FETCH_RACE_EXHAUSTED,
            Self::Extraction { .. } => codes::FETCH_EXTRACT_FAILED,
            Self::Manifest { .. } => codes::FETCH_MANIFEST_INVALID,
            Self::EntryRead { .. } => codes::FETCH_ENTRY_READ_FAILED,
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidRequest(_) => Stage::Request,
            Self::WorkDir { .. } => Stage::Setup,
            Self::RaceExhausted { .. } => Stage::Locate,
            Self::Extraction { .. } => Stage::Extract,
            Self::Manifest { .. } => Stage::Manifest,
            Self::EntryRead { .. } => Stage::Entry,
        }
    }

    pub fn extraction(archive: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.into(),
            message: message.into(),
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }
}

fn join_failures(failures: &[LocateError]) -> String {
    if failures.is_empty() {
        return "no strategies configured".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
