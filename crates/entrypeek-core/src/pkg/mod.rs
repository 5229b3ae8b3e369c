//! npm data sources.
//!
//! Provides utilities for:
//! - Parsing package specifiers (name@range)
//! - Fetching package metadata from npm registries and mirrors
//! - Selecting versions using semver
//! - Streaming tarball downloads and extracting them
//! - Driving the `npm` CLI (`view`, `pack`)

pub mod error;
pub mod npm;
pub mod registry;
pub mod spec;
pub mod tarball;
pub mod version;

pub use error::{codes as locate_codes, LocateError};
pub use npm::NpmCli;
pub use registry::{
    http_client, select_tarball_url, RegistryClient, DEFAULT_MIRROR, DEFAULT_REGISTRY,
};
pub use spec::PackageSpec;
pub use tarball::{download_tarball, extract_archive, MAX_TARBALL_SIZE};
pub use version::resolve_version;
