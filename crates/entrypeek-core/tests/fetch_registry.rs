//! End-to-end fetches against a mock registry.
//!
//! Package-manager strategies are disabled so that no real `npm` is spawned.

mod common;

use common::{assert_empty, build_tgz, dead_registry, simple_package, MockRegistry};
use entrypeek_core::locate::RegistryLocator;
use entrypeek_core::pkg::{http_client, MAX_TARBALL_SIZE};
use entrypeek_core::{
    fetch_codes, locate_codes, EntryFetcher, FetchConfig, FetchError, FetchRequest, Locator,
    NoopLogger, PackageSpec,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn fetcher(work_root: &std::path::Path, registries: &[&str]) -> EntryFetcher {
    let config = FetchConfig::default()
        .with_work_root(work_root)
        .with_registries(registries.iter().copied())
        .with_package_manager(false);
    EntryFetcher::new(config).unwrap()
}

fn request(package: &str) -> FetchRequest {
    FetchRequest::new(package).with_logger(Arc::new(NoopLogger))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_left_pad_latest() {
    let registry = MockRegistry::start().await;
    registry.publish(
        "left-pad",
        "1.3.0",
        &[
            ("1.2.0", simple_package("left-pad", "1.2.0", "// 1.2.0")),
            ("1.3.0", simple_package("left-pad", "1.3.0", "module.exports = leftPad;")),
        ],
    );

    let root = tempdir().unwrap();
    let content = fetcher(root.path(), &[&registry.base_url])
        .fetch(&request("left-pad"))
        .await
        .unwrap();

    assert_eq!(content, "module.exports = leftPad;");
    assert_empty(root.path());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_version_range_picks_highest_match() {
    let registry = MockRegistry::start().await;
    registry.publish(
        "left-pad",
        "2.0.0",
        &[
            ("1.2.0", simple_package("left-pad", "1.2.0", "// 1.2.0")),
            ("1.3.0", simple_package("left-pad", "1.3.0", "// 1.3.0")),
            ("2.0.0", simple_package("left-pad", "2.0.0", "// 2.0.0")),
        ],
    );

    let root = tempdir().unwrap();
    let content = fetcher(root.path(), &[&registry.base_url])
        .fetch(&request("left-pad@^1.2.0"))
        .await
        .unwrap();

    assert_eq!(content, "// 1.3.0");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scoped_package_defaults_to_index() {
    let registry = MockRegistry::start().await;
    let tarball = build_tgz(&[
        ("package/package.json", r#"{"name":"@scope/name","version":"0.1.0"}"#),
        ("package/index.js", "export const scoped = true;"),
    ]);
    registry.publish("@scope/name", "0.1.0", &[("0.1.0", tarball)]);

    let root = tempdir().unwrap();
    let content = fetcher(root.path(), &[&registry.base_url])
        .fetch(&request("@scope/name"))
        .await
        .unwrap();

    assert_eq!(content, "export const scoped = true;");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dist_tag_selects_export() {
    let registry = MockRegistry::start().await;
    let tarball = build_tgz(&[
        (
            "package/package.json",
            r#"{
                "name": "dual",
                "main": "./lib/dist-cjs/index.js",
                "exports": {
                    "a": { "import": "./x/dist-mjs/foo.js" },
                    "b": { "require": "./dist-mjs/bar.js" }
                }
            }"#,
        ),
        ("package/lib/dist-cjs/index.js", "cjs"),
        ("package/x/dist-mjs/foo.js", "foo"),
        ("package/dist-mjs/bar.js", "bar"),
    ]);
    registry.publish("dual", "1.0.0", &[("1.0.0", tarball)]);

    let root = tempdir().unwrap();
    let fetcher = fetcher(root.path(), &[&registry.base_url]);

    let mjs = fetcher
        .fetch(&request("dual").with_dist_tag("dist-mjs"))
        .await
        .unwrap();
    assert_eq!(mjs, "foo");

    let cjs = fetcher
        .fetch(&request("dual").with_dist_tag("dist-cjs"))
        .await
        .unwrap();
    assert_eq!(cjs, "cjs");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_version_document() {
    let registry = MockRegistry::start().await;
    registry.publish_single("solo", "0.0.1", simple_package("solo", "0.0.1", "solo"));

    let root = tempdir().unwrap();
    let content = fetcher(root.path(), &[&registry.base_url])
        .fetch(&request("solo"))
        .await
        .unwrap();

    assert_eq!(content, "solo");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mirror_covers_dead_primary() {
    let registry = MockRegistry::start().await;
    registry.publish("left-pad", "1.3.0", &[("1.3.0", simple_package("left-pad", "1.3.0", "mirror"))]);
    let dead = dead_registry().await;

    let root = tempdir().unwrap();
    let content = fetcher(root.path(), &[&dead, &registry.base_url])
        .fetch(&request("left-pad").with_max_retries(0))
        .await
        .unwrap();

    assert_eq!(content, "mirror");
    assert_empty(root.path());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transient_registry_error_is_retried() {
    let registry = MockRegistry::start().await;
    registry.publish("left-pad", "1.3.0", &[("1.3.0", simple_package("left-pad", "1.3.0", "ok"))]);
    registry.fail_next("left-pad", 1);

    let root = tempdir().unwrap();
    let content = fetcher(root.path(), &[&registry.base_url])
        .fetch(&request("left-pad").with_max_retries(1))
        .await
        .unwrap();

    assert_eq!(content, "ok");
    assert_eq!(registry.packument_hits(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_package_exhausts_race() {
    let registry = MockRegistry::start().await;

    let root = tempdir().unwrap();
    let err = fetcher(root.path(), &[&registry.base_url])
        .fetch(&request("does-not-exist").with_max_retries(1))
        .await
        .unwrap_err();

    assert_eq!(err.code(), fetch_codes::FETCH_RACE_EXHAUSTED);
    match &err {
        FetchError::RaceExhausted { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].code(), locate_codes::LOCATE_NOT_FOUND);
        }
        other => panic!("unexpected error: {other}"),
    }

    // one inner retry per race, one outer retry
    assert_eq!(registry.packument_hits(), 4);
    assert_empty(root.path());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_corrupt_tarball_is_fatal() {
    let registry = MockRegistry::start().await;
    registry.publish("broken", "1.0.0", &[("1.0.0", b"definitely not gzip".to_vec())]);

    let root = tempdir().unwrap();
    let err = fetcher(root.path(), &[&registry.base_url])
        .fetch(&request("broken").with_max_retries(2))
        .await
        .unwrap_err();

    assert_eq!(err.code(), fetch_codes::FETCH_EXTRACT_FAILED);
    assert_eq!(registry.packument_hits(), 1);
    assert_empty(root.path());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_manifest() {
    let registry = MockRegistry::start().await;
    let tarball = build_tgz(&[("package/package.json", "[1, 2, 3]")]);
    registry.publish("weird", "1.0.0", &[("1.0.0", tarball)]);

    let root = tempdir().unwrap();
    let err = fetcher(root.path(), &[&registry.base_url])
        .fetch(&request("weird"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), fetch_codes::FETCH_MANIFEST_INVALID);
    assert_empty(root.path());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_fetches_use_separate_dirs() {
    let registry = MockRegistry::start().await;
    registry.publish("left-pad", "1.3.0", &[("1.3.0", simple_package("left-pad", "1.3.0", "lp"))]);

    let root = tempdir().unwrap();
    let fetcher = fetcher(root.path(), &[&registry.base_url]);

    let req_a = request("left-pad");
    let req_b = request("left-pad");
    let (a, b) = tokio::join!(fetcher.fetch(&req_a), fetcher.fetch(&req_b));

    assert_eq!(a.unwrap(), "lp");
    assert_eq!(b.unwrap(), "lp");
    assert_empty(root.path());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_attempt_timeout_against_silent_server() {
    // Accepts connections but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let root = tempdir().unwrap();
    let config = FetchConfig::default()
        .with_work_root(root.path())
        .with_registries([format!("http://{addr}/")])
        .with_package_manager(false)
        .with_attempt_timeout(Some(Duration::from_millis(200)));

    let err = EntryFetcher::new(config)
        .unwrap()
        .fetch(&request("left-pad").with_max_retries(0))
        .await
        .unwrap_err();

    match err {
        FetchError::RaceExhausted { failures } => {
            assert_eq!(failures[0].code(), locate_codes::LOCATE_TIMEOUT);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_empty(root.path());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tarball_server_error_leaves_dest_empty() {
    let registry = MockRegistry::start().await;
    registry.publish("left-pad", "1.3.0", &[("1.3.0", simple_package("left-pad", "1.3.0", "lp"))]);
    registry.break_tarball("left-pad-1.3.0.tgz");

    let root = tempdir().unwrap();
    let dest = root.path().join("0-registry");
    let locator = RegistryLocator::new(&registry.base_url, http_client().unwrap(), MAX_TARBALL_SIZE)
        .unwrap();
    let spec = PackageSpec::parse("left-pad").unwrap();

    let err = locator.locate(&spec, &dest).await.unwrap_err();

    assert_eq!(err.code(), locate_codes::LOCATE_DOWNLOAD_FAILED);
    assert!(err.message().contains("500"), "{err}");
    assert_empty(&dest);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_oversized_tarball_is_rejected() {
    let registry = MockRegistry::start().await;
    registry.publish("left-pad", "1.3.0", &[("1.3.0", simple_package("left-pad", "1.3.0", "lp"))]);

    let root = tempdir().unwrap();
    let config = FetchConfig::default()
        .with_work_root(root.path())
        .with_registries([registry.base_url.as_str()])
        .with_package_manager(false)
        .with_max_tarball_bytes(16);

    let err = EntryFetcher::new(config)
        .unwrap()
        .fetch(&request("left-pad").with_max_retries(0))
        .await
        .unwrap_err();

    match err {
        FetchError::RaceExhausted { failures } => {
            assert_eq!(failures[0].code(), locate_codes::LOCATE_DOWNLOAD_FAILED);
            assert!(failures[0].message().contains("too large"), "{}", failures[0]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_empty(root.path());
}
