//! Shared fixtures: a mock npm registry and tarball builders.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tar::Builder;

/// Build a gzipped tarball from `(path, content)` pairs.
pub fn build_tgz(files: &[(&str, &str)]) -> Vec<u8> {
    let mut tar_bytes = Vec::new();
    {
        let mut builder = Builder::new(&mut tar_bytes);
        for (path, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(path).unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, data.as_bytes()).unwrap();
        }
        builder.finish().unwrap();
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).unwrap();
    encoder.finish().unwrap()
}

/// A package whose `index.js` contains `content`.
pub fn simple_package(name: &str, version: &str, content: &str) -> Vec<u8> {
    let manifest = format!(r#"{{"name":"{name}","version":"{version}","main":"index.js"}}"#);
    build_tgz(&[
        ("package/package.json", manifest.as_str()),
        ("package/index.js", content),
    ])
}

#[derive(Default)]
struct Inner {
    packuments: HashMap<String, Value>,
    tarballs: HashMap<String, Vec<u8>>,
    /// Number of leading packument requests answered with 500.
    failures: HashMap<String, u32>,
    /// Tarball files always answered with 500.
    broken_tarballs: HashSet<String>,
}

#[derive(Clone)]
struct AppState {
    inner: Arc<Mutex<Inner>>,
    packument_hits: Arc<AtomicU32>,
}

/// An in-process registry on an ephemeral port.
pub struct MockRegistry {
    pub base_url: String,
    state: AppState,
}

impl MockRegistry {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let state = AppState {
            inner: Arc::new(Mutex::new(Inner::default())),
            packument_hits: Arc::new(AtomicU32::new(0)),
        };

        let app = Router::new()
            .route("/:name", get(handle_packument))
            .route("/-/tarballs/:file", get(handle_tarball))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/"),
            state,
        }
    }

    pub fn tarball_url(&self, file: &str) -> String {
        format!("{}-/tarballs/{file}", self.base_url)
    }

    /// Publish `versions` of `name`, `(version, tarball)`, with `latest` as the dist-tag.
    pub fn publish(&self, name: &str, latest: &str, versions: &[(&str, Vec<u8>)]) {
        let stem = name.trim_start_matches('@').replace('/', "-");
        let mut inner = self.state.inner.lock().unwrap();

        let mut version_docs = serde_json::Map::new();
        for (version, tarball) in versions {
            let file = format!("{stem}-{version}.tgz");
            version_docs.insert(
                (*version).to_string(),
                json!({
                    "name": name,
                    "version": version,
                    "dist": { "tarball": self.tarball_url(&file) }
                }),
            );
            inner.tarballs.insert(file, tarball.clone());
        }

        inner.packuments.insert(
            name.to_string(),
            json!({
                "name": name,
                "dist-tags": { "latest": latest },
                "versions": version_docs,
            }),
        );
    }

    /// Publish a single-version document with a top-level `dist.tarball`.
    pub fn publish_single(&self, name: &str, version: &str, tarball: Vec<u8>) {
        let file = format!("{name}-{version}.tgz");
        let mut inner = self.state.inner.lock().unwrap();
        inner.packuments.insert(
            name.to_string(),
            json!({
                "name": name,
                "version": version,
                "dist": { "tarball": self.tarball_url(&file) }
            }),
        );
        inner.tarballs.insert(file, tarball);
    }

    /// Answer the next `count` metadata requests for `name` with 500.
    pub fn fail_next(&self, name: &str, count: u32) {
        self.state
            .inner
            .lock()
            .unwrap()
            .failures
            .insert(name.to_string(), count);
    }

    /// Answer every request for tarball `file` with 500.
    pub fn break_tarball(&self, file: &str) {
        self.state
            .inner
            .lock()
            .unwrap()
            .broken_tarballs
            .insert(file.to_string());
    }

    pub fn packument_hits(&self) -> u32 {
        self.state.packument_hits.load(Ordering::SeqCst)
    }
}

async fn handle_packument(Path(name): Path<String>, State(state): State<AppState>) -> Response {
    state.packument_hits.fetch_add(1, Ordering::SeqCst);
    let mut inner = state.inner.lock().unwrap();

    if let Some(remaining) = inner.failures.get_mut(&name) {
        if *remaining > 0 {
            *remaining -= 1;
            return (StatusCode::INTERNAL_SERVER_ERROR, "flaky").into_response();
        }
    }

    match inner.packuments.get(&name) {
        Some(doc) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            doc.to_string(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn handle_tarball(Path(file): Path<String>, State(state): State<AppState>) -> Response {
    let inner = state.inner.lock().unwrap();
    if inner.broken_tarballs.contains(&file) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "tarball storage offline").into_response();
    }
    match inner.tarballs.get(&file) {
        Some(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/gzip")],
            Body::from(bytes.clone()),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// A registry URL nothing is listening on.
pub async fn dead_registry() -> String {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

/// Assert that `dir` has no entries.
pub fn assert_empty(dir: &std::path::Path) {
    let leftovers: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
}
