use crate::pkg::{DEFAULT_MIRROR, DEFAULT_REGISTRY, MAX_TARBALL_SIZE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the registry list (comma-separated).
pub const REGISTRY_ENV: &str = "ENTRYPEEK_NPM_REGISTRY";

/// Environment variable naming the `npm` executable.
pub const NPM_ENV: &str = "ENTRYPEEK_NPM";

/// Environment variable enabling test mode (`1` or `true`).
pub const TEST_MODE_ENV: &str = "ENTRYPEEK_TEST_MODE";

/// Configuration for an [`EntryFetcher`](crate::EntryFetcher).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Directory under which per-request working directories are created.
    pub work_root: PathBuf,

    /// Registries to race, primary first.
    pub registries: Vec<String>,

    /// `npm` executable used by the package-manager strategies.
    pub npm_program: PathBuf,

    /// Whether to race the package-manager strategies at all.
    pub use_package_manager: bool,

    /// Deadline for a single strategy attempt. `None` waits indefinitely.
    pub attempt_timeout: Option<Duration>,

    /// Largest tarball a download may produce.
    pub max_tarball_bytes: u64,

    /// Create `<work_root>/package.json` if absent, for older npm versions
    /// that refuse to run without a project manifest.
    pub placeholder_manifest: bool,

    /// Remove the placeholder manifest again after a successful fetch.
    pub test_mode: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir(),
            registries: vec![DEFAULT_REGISTRY.to_string(), DEFAULT_MIRROR.to_string()],
            npm_program: PathBuf::from("npm"),
            use_package_manager: true,
            attempt_timeout: None,
            max_tarball_bytes: MAX_TARBALL_SIZE,
            placeholder_manifest: false,
            test_mode: false,
        }
    }
}

impl FetchConfig {
    /// Default configuration with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Default configuration with overrides read through `lookup`.
    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(list) = lookup(REGISTRY_ENV) {
            let registries: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !registries.is_empty() {
                config.registries = registries;
            }
        }

        if let Some(npm) = lookup(NPM_ENV) {
            if !npm.is_empty() {
                config.npm_program = PathBuf::from(npm);
            }
        }

        if let Some(flag) = lookup(TEST_MODE_ENV) {
            config.test_mode = matches!(flag.trim(), "1" | "true" | "TRUE" | "yes");
        }

        config
    }

    #[must_use]
    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }

    /// Replace the registry list.
    #[must_use]
    pub fn with_registries<I, S>(mut self, registries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registries = registries.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_npm_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.npm_program = program.into();
        self
    }

    #[must_use]
    pub fn with_package_manager(mut self, enabled: bool) -> Self {
        self.use_package_manager = enabled;
        self
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_tarball_bytes(mut self, max: u64) -> Self {
        self.max_tarball_bytes = max;
        self
    }

    #[must_use]
    pub fn with_placeholder_manifest(mut self, enabled: bool) -> Self {
        self.placeholder_manifest = enabled;
        self
    }

    #[must_use]
    pub fn with_test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }
}
