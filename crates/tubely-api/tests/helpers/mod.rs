//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p tubely-api`. No database is needed;
//! the metadata store is in-memory and the video object store is a local
//! directory. `ffprobe`/`ffmpeg` are replaced by shell scripts, so these tests
//! only run on unix hosts.

#![allow(dead_code)]

use axum_test::TestServer;
use chrono::Duration;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tubely_api::auth::issue_access_token;
use tubely_api::setup::routes;
use tubely_api::AppState;
use tubely_core::{BaseConfig, Config, StorageBackend, TubelyConfig};
use tubely_db::test_helpers::MockVideoStore;
use tubely_storage::LocalStorage;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";
pub const PLATFORM_URL: &str = "http://localhost:8091";
pub const DISTRIBUTION: &str = "d111111abcdef8.cloudfront.net";

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Smallest prefix that sniffs as MP4: an `ftyp` box with an `mp42` brand.
pub fn mp4_bytes() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&20u32.to_be_bytes());
    data.extend_from_slice(b"ftyp");
    data.extend_from_slice(b"mp42");
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend_from_slice(b"isom");
    data.extend_from_slice(&[0u8; 64]);
    data
}

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn fake_tools(dir: &Path, width: u32, height: u32) -> (PathBuf, PathBuf) {
    let probe = format!(
        "cat <<'EOF'\n{{\"streams\":[{{\"codec_type\":\"video\",\"width\":{},\"height\":{}}}]}}\nEOF",
        width, height
    );
    let ffprobe = write_script(dir, "ffprobe", &probe);
    let ffmpeg = write_script(dir, "ffmpeg", "for last; do :; done\ncp \"$3\" \"$last\"");
    (ffprobe, ffmpeg)
}

fn test_config(root: &Path, ffprobe: &Path, ffmpeg: &Path, distribution: Option<&str>) -> Config {
    Config(Box::new(TubelyConfig {
        base: BaseConfig {
            server_port: 8091,
            cors_origins: vec!["http://localhost:3000".to_string()],
            db_max_connections: 5,
            db_timeout_seconds: 5,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            jwt_expiry_hours: 1,
            environment: "test".to_string(),
        },
        database_url: "postgres://localhost/tubely_test".to_string(),
        assets_root: root.join("assets"),
        platform_url: PLATFORM_URL.to_string(),
        storage_backend: Some(StorageBackend::Local),
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: Some(root.join("objects").to_string_lossy().into_owned()),
        local_storage_base_url: Some("http://localhost:9000/objects".to_string()),
        cf_distribution: distribution.map(String::from),
        ffmpeg_path: ffmpeg.to_string_lossy().into_owned(),
        ffprobe_path: ffprobe.to_string_lossy().into_owned(),
        scratch_dir: root.join("scratch"),
    }))
}

/// Test application: server, in-memory store, and owned directories.
pub struct TestApp {
    pub server: TestServer,
    pub store: MockVideoStore,
    pub root: PathBuf,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    pub fn scratch_entries(&self) -> usize {
        fs::read_dir(self.root.join("scratch")).unwrap().count()
    }

    /// A fresh user id and a valid token for it.
    pub fn user(&self) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        let token = issue_access_token(user_id, TEST_JWT_SECRET, Duration::hours(1)).unwrap();
        (user_id, token)
    }
}

pub struct TestAppBuilder {
    geometry: (u32, u32),
    distribution: Option<String>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            geometry: (1920, 1080),
            distribution: Some(DISTRIBUTION.to_string()),
        }
    }

    pub fn geometry(mut self, width: u32, height: u32) -> Self {
        self.geometry = (width, height);
        self
    }

    pub fn without_distribution(mut self) -> Self {
        self.distribution = None;
        self
    }

    pub async fn build(self) -> TestApp {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let tools = root.join("bin");
        fs::create_dir_all(&tools).unwrap();
        fs::create_dir_all(root.join("scratch")).unwrap();

        let (ffprobe, ffmpeg) = fake_tools(&tools, self.geometry.0, self.geometry.1);
        let config = test_config(&root, &ffprobe, &ffmpeg, self.distribution.as_deref());

        let objects = LocalStorage::new(
            root.join("objects"),
            "http://localhost:9000/objects".to_string(),
        )
        .await
        .unwrap();
        let assets = LocalStorage::new(config.assets_root(), format!("{}/assets", PLATFORM_URL))
            .await
            .unwrap();
        let store = MockVideoStore::new();

        let state = Arc::new(
            AppState::new(
                config.clone(),
                Arc::new(store.clone()),
                Arc::new(objects),
                Arc::new(assets),
            )
            .unwrap(),
        );
        let router = routes::setup_routes(&config, state).await.unwrap();
        let server = TestServer::new(router).unwrap();

        TestApp {
            server,
            store,
            root,
            _temp_dir: temp_dir,
        }
    }
}

/// Setup a test app with default fake tools and a configured distribution.
pub async fn setup_test_app() -> TestApp {
    TestAppBuilder::new().build().await
}
