#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod locate;
pub mod logger;
pub mod manifest;
pub mod pkg;
pub mod race;
pub mod retry;

pub use config::FetchConfig;
pub use error::{codes as fetch_codes, FetchError, Stage};
pub use fetch::{EntryFetcher, FetchRequest, DEFAULT_MAX_RETRIES};
pub use locate::{default_locators, ArchiveLocation, Locator};
pub use logger::{default_logger, FetchLogger, NoopLogger, StdStreamLogger, TracingLogger};
pub use manifest::{resolve_entry, PackageManifest};
pub use pkg::{locate_codes, LocateError, PackageSpec};
pub use race::race_first_ok;
pub use retry::retry;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fetch `package` with the environment's configuration and return its entry file.
///
/// # Errors
/// See [`EntryFetcher::fetch`].
pub async fn fetch_entry(
    package: &str,
    dist_tag: Option<&str>,
    max_retries: u32,
) -> Result<String, FetchError> {
    let fetcher = EntryFetcher::new(FetchConfig::from_env())?;
    let mut request = FetchRequest::new(package).with_max_retries(max_retries);
    if let Some(tag) = dist_tag {
        request = request.with_dist_tag(tag);
    }
    fetcher.fetch(&request).await
}
