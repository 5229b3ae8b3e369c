//! Version selection against a packument using semver.

use super::error::LocateError;
use super::registry::{get_dist_tag, get_versions};
use semver::{Version, VersionReq};

/// Pick the version of a packument that `range` asks for.
///
/// # Rules
/// - `None` selects `dist-tags.latest`
/// - a dist-tag name (`next`, `legacy`, ...) selects that tag
/// - an exact version present in `versions` selects itself
/// - anything else is an npm range; the highest satisfying version wins
///
/// # Errors
/// Returns an error if the range is malformed or nothing satisfies it.
pub fn resolve_version(
    packument: &serde_json::Value,
    range: Option<&str>,
) -> Result<String, LocateError> {
    let name = packument
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    let Some(range) = range.map(str::trim) else {
        return get_dist_tag(packument, "latest")
            .map(String::from)
            .ok_or_else(|| LocateError::version_not_found(name, "latest (no dist-tags.latest)"));
    };

    if let Some(tagged) = get_dist_tag(packument, range) {
        return Ok(tagged.to_string());
    }

    let available = get_versions(packument);
    if available.contains(&range) {
        return Ok(range.to_string());
    }

    let reqs = parse_npm_range(range)?;

    let mut candidates: Vec<Version> = available
        .iter()
        .filter_map(|v| Version::parse(v).ok())
        .collect();
    candidates.sort_unstable_by(|a, b| b.cmp(a));

    candidates
        .into_iter()
        .find(|v| reqs.iter().any(|req| req.matches(v)))
        .map(|v| v.to_string())
        .ok_or_else(|| LocateError::version_not_found(name, range))
}

/// Parse an npm range into its `||` alternatives.
///
/// Malformed alternatives are dropped as long as one survives.
fn parse_npm_range(range: &str) -> Result<Vec<VersionReq>, LocateError> {
    let reqs: Vec<VersionReq> = range
        .split("||")
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .filter_map(|alt| VersionReq::parse(&to_semver_syntax(alt)).ok())
        .collect();

    if reqs.is_empty() {
        return Err(LocateError::spec_invalid(format!(
            "Invalid version range '{range}'"
        )));
    }

    Ok(reqs)
}

/// Rewrite one npm comparator set into the syntax `semver` accepts.
///
/// - `1.0.0 - 2.0.0` becomes `>=1.0.0, <=2.0.0`
/// - `1.x` / `1.2.*` / `*` / `1` / `1.2` become bounded ranges
/// - a bare `1.2.3` becomes `=1.2.3` (`semver` would read it as `^1.2.3`)
/// - `>= 2.1.2 < 3.0.0` becomes `>=2.1.2, <3.0.0`
fn to_semver_syntax(alt: &str) -> String {
    if let Some((start, end)) = alt.split_once(" - ") {
        return format!(">={}, <={}", start.trim(), end.trim());
    }

    // Glue dangling operators to the version that follows, then join the
    // comparators with commas.
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();
    for token in alt.split_whitespace() {
        if is_wild(token) || token.chars().any(|c| c.is_ascii_digit()) {
            if pending_op.is_empty() {
                comparators.push(bare_comparator(token));
            } else {
                comparators.push(format!("{pending_op}{token}"));
                pending_op.clear();
            }
        } else {
            pending_op.push_str(token);
        }
    }

    if comparators.is_empty() {
        alt.to_string()
    } else {
        comparators.join(", ")
    }
}

/// A version written without an operator.
///
/// Missing or wildcard components make it an x-range; a complete version
/// matches only itself. Anything that does not look like a version (`^1.0.0`)
/// is passed through untouched.
fn bare_comparator(token: &str) -> String {
    if let Some(expanded) = expand_x_range(token) {
        return expanded;
    }

    if token.starts_with(|c: char| c.is_ascii_digit()) {
        format!("={token}")
    } else {
        token.to_string()
    }
}

fn is_wild(s: &str) -> bool {
    matches!(s, "x" | "X" | "*")
}

fn expand_x_range(alt: &str) -> Option<String> {
    if is_wild(alt) {
        return Some(">=0.0.0".to_string());
    }

    let parts: Vec<&str> = alt.split('.').collect();
    match parts.as_slice() {
        [major] | [major, _] | [major, _, _] if parts[1..].iter().all(|p| is_wild(p)) => {
            let m: u64 = major.parse().ok()?;
            Some(format!(">={m}.0.0, <{}.0.0", m + 1))
        }
        [major, minor] | [major, minor, _] if parts[2..].iter().all(|p| is_wild(p)) => {
            let m: u64 = major.parse().ok()?;
            let n: u64 = minor.parse().ok()?;
            Some(format!(">={m}.{n}.0, <{m}.{}.0", n + 1))
        }
        _ => None,
    }
}
