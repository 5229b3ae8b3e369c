//! Package specifier parsing.
//!
//! Accepts the forms a caller may hand to the fetcher:
//! - `left-pad`
//! - `left-pad@1.3.0`
//! - `left-pad@^1.0.0`
//! - `@scope/name`
//! - `@scope/name@2`
//!
//! Every locator strategy consumes the parsed form, so a plain name and a name
//! with an explicit version are normalized the same way everywhere.

use super::error::LocateError;
use std::fmt;

/// A parsed package specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Full package name (e.g., "@scope/name" or "name").
    pub name: String,
    /// Scope without the @ prefix, if scoped.
    pub scope: Option<String>,
    /// Version, range or dist-tag (None means latest).
    pub range: Option<String>,
}

impl PackageSpec {
    /// Parse a package specifier string.
    ///
    /// # Errors
    /// Returns an error if the specifier is empty or malformed.
    pub fn parse(input: &str) -> Result<Self, LocateError> {
        let input = input.trim();

        if input.is_empty() {
            return Err(LocateError::spec_invalid("Empty package spec"));
        }

        match input.strip_prefix('@') {
            Some(rest) => Self::parse_scoped(input, rest),
            None => Self::parse_unscoped(input),
        }
    }

    fn parse_scoped(input: &str, rest: &str) -> Result<Self, LocateError> {
        let Some((scope, after_slash)) = rest.split_once('/') else {
            return Err(LocateError::spec_invalid(format!(
                "Invalid scoped package: missing '/' in '{input}'"
            )));
        };

        if scope.is_empty() {
            return Err(LocateError::spec_invalid(format!(
                "Invalid scoped package: empty scope in '{input}'"
            )));
        }

        let (pkg_name, range) = match after_slash.split_once('@') {
            Some((pkg_name, range)) => (pkg_name, Some(range)),
            None => (after_slash, None),
        };

        Self::validate_name(input, scope)?;
        Self::validate_name(input, pkg_name)?;

        Ok(Self {
            name: format!("@{scope}/{pkg_name}"),
            scope: Some(scope.to_string()),
            range: Self::check_range(input, range)?,
        })
    }

    fn parse_unscoped(input: &str) -> Result<Self, LocateError> {
        let (name, range) = match input.split_once('@') {
            Some((name, range)) => (name, Some(range)),
            None => (input, None),
        };

        Self::validate_name(input, name)?;

        Ok(Self {
            name: name.to_string(),
            scope: None,
            range: Self::check_range(input, range)?,
        })
    }

    fn check_range(input: &str, range: Option<&str>) -> Result<Option<String>, LocateError> {
        match range {
            Some("") => Err(LocateError::spec_invalid(format!(
                "Invalid package spec: empty version range in '{input}'"
            ))),
            Some(range) => Ok(Some(range.to_string())),
            None => Ok(None),
        }
    }

    /// Check an unscoped name, or either half of a scoped one.
    ///
    /// Names end up as URL path segments and directory names, so `.`, `..`
    /// and anything npm would refuse to publish are rejected.
    fn validate_name(input: &str, name: &str) -> Result<(), LocateError> {
        if name.is_empty() {
            return Err(LocateError::spec_invalid(format!(
                "Invalid package spec: empty name in '{input}'"
            )));
        }

        if name.starts_with('.') || name.starts_with('_') {
            return Err(LocateError::spec_invalid(format!(
                "Package name '{name}' cannot start with '.' or '_'"
            )));
        }

        if let Some(c) = name
            .chars()
            .find(|&c| !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.')
        {
            return Err(LocateError::spec_invalid(format!(
                "Invalid character '{c}' in package name '{name}'"
            )));
        }

        Ok(())
    }

    /// Check if this is a scoped package.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// URL-encode the package name for registry requests.
    ///
    /// For scoped packages, encodes the `/` as `%2F`.
    #[must_use]
    pub fn url_encoded_name(&self) -> String {
        if self.is_scoped() {
            self.name.replace('/', "%2F")
        } else {
            self.name.clone()
        }
    }

    /// File name stem `npm pack` uses for this package's archive.
    ///
    /// The leading `@` is dropped and `/` becomes `-`, so `@scope/name`
    /// packs to `scope-name-<version>.tgz`.
    #[must_use]
    pub fn tarball_stem(&self) -> String {
        self.name
            .strip_prefix('@')
            .unwrap_or(&self.name)
            .replace('/', "-")
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range {
            Some(ref range) => write!(f, "{}@{range}", self.name),
            None => f.write_str(&self.name),
        }
    }
}
