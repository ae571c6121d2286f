//! Test helpers: fake media tools and a pipeline wired to in-memory and
//! on-disk collaborators.
//!
//! The fake `ffprobe`/`ffmpeg` are shell scripts, so these tests only run on
//! unix hosts.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use tubely_core::constants::MAX_VIDEO_UPLOAD_BYTES;
use tubely_db::test_helpers::MockVideoStore;
use tubely_processing::{IngestSettings, VideoIngestPipeline};
use tubely_storage::{LocalStorage, Storage, StorageBackend, StorageError, StorageResult};

pub const DISTRIBUTION: &str = "d111111abcdef8.cloudfront.net";

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

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// ffprobe stand-in that reports a single video stream of the given size.
pub fn fake_ffprobe(dir: &Path, width: u32, height: u32) -> PathBuf {
    let body = format!(
        "cat <<'EOF'\n{{\"streams\":[{{\"codec_type\":\"audio\"}},{{\"codec_type\":\"video\",\"width\":{},\"height\":{}}}]}}\nEOF",
        width, height
    );
    write_script(dir, "ffprobe", &body)
}

pub fn failing_ffprobe(dir: &Path) -> PathBuf {
    write_script(dir, "ffprobe", "echo \"boom\" >&2\nexit 1")
}

/// ffmpeg stand-in: copies the input (third argument) to the output (last).
pub fn fake_ffmpeg(dir: &Path) -> PathBuf {
    write_script(dir, "ffmpeg", "for last; do :; done\ncp \"$3\" \"$last\"")
}

/// ffmpeg stand-in that leaves a partial output behind and exits non-zero.
pub fn failing_ffmpeg(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg",
        "for last; do :; done\necho partial > \"$last\"\necho \"moov atom not found\" >&2\nexit 1",
    )
}

/// Object store whose writes always fail.
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn put_object(&self, storage_key: &str, _: Bytes, _: &str) -> StorageResult<()> {
        Err(StorageError::UploadFailed(format!("503 for {}", storage_key)))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        Err(StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, _: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("https://unreachable.invalid/{}", storage_key)
    }
}

pub struct TestPipeline {
    pub pipeline: VideoIngestPipeline,
    pub store: MockVideoStore,
    pub objects: PathBuf,
    pub scratch: PathBuf,
    _root: TempDir,
}

impl TestPipeline {
    pub fn scratch_entries(&self) -> usize {
        fs::read_dir(&self.scratch).unwrap().count()
    }

    /// Every stored object key, relative to the object store root.
    pub fn stored_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for folder in fs::read_dir(&self.objects).unwrap() {
            let folder = folder.unwrap();
            if !folder.file_type().unwrap().is_dir() {
                continue;
            }
            for entry in fs::read_dir(folder.path()).unwrap() {
                let entry = entry.unwrap();
                keys.push(format!(
                    "{}/{}",
                    folder.file_name().to_string_lossy(),
                    entry.file_name().to_string_lossy()
                ));
            }
        }
        keys
    }
}

pub struct PipelineBuilder {
    probe: Option<(u32, u32)>,
    distribution: Option<String>,
    failing_rewrite: bool,
    failing_storage: bool,
    max_upload_bytes: u64,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            probe: Some((1920, 1080)),
            distribution: Some(DISTRIBUTION.to_string()),
            failing_rewrite: false,
            failing_storage: false,
            max_upload_bytes: MAX_VIDEO_UPLOAD_BYTES,
        }
    }

    pub fn failing_rewrite(mut self) -> Self {
        self.failing_rewrite = true;
        self
    }

    pub fn failing_storage(mut self) -> Self {
        self.failing_storage = true;
        self
    }

    pub fn max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    pub fn geometry(mut self, width: u32, height: u32) -> Self {
        self.probe = Some((width, height));
        self
    }

    pub fn failing_probe(mut self) -> Self {
        self.probe = None;
        self
    }

    pub fn without_distribution(mut self) -> Self {
        self.distribution = None;
        self
    }

    pub async fn build(self) -> TestPipeline {
        let root = TempDir::new().unwrap();
        let tools = root.path().join("bin");
        let objects = root.path().join("objects");
        let scratch = root.path().join("scratch");
        fs::create_dir_all(&tools).unwrap();
        fs::create_dir_all(&scratch).unwrap();

        let ffprobe = match self.probe {
            Some((width, height)) => fake_ffprobe(&tools, width, height),
            None => failing_ffprobe(&tools),
        };
        let ffmpeg = if self.failing_rewrite {
            failing_ffmpeg(&tools)
        } else {
            fake_ffmpeg(&tools)
        };

        fs::create_dir_all(&objects).unwrap();
        let storage: Arc<dyn Storage> = if self.failing_storage {
            Arc::new(FailingStorage)
        } else {
            Arc::new(
                LocalStorage::new(&objects, format!("file://{}", objects.display()))
                    .await
                    .unwrap(),
            )
        };
        let store = MockVideoStore::new();

        let settings = IngestSettings {
            ffprobe_path: ffprobe.to_string_lossy().into_owned(),
            ffmpeg_path: ffmpeg.to_string_lossy().into_owned(),
            scratch_dir: scratch.clone(),
            distribution_base: self.distribution,
            max_upload_bytes: self.max_upload_bytes,
        };
        let pipeline =
            VideoIngestPipeline::new(Arc::new(store.clone()), storage, settings).unwrap();

        TestPipeline {
            pipeline,
            store,
            objects,
            scratch,
            _root: root,
        }
    }
}
