//! End-to-end ingestion against fake media tools and on-disk object storage.
//!
//! Run: `cargo test -p tubely-processing --test ingest_test`

#![cfg(unix)]

mod helpers;

use helpers::{mp4_bytes, PipelineBuilder, DISTRIBUTION};
use tubely_processing::{ErrorClass, IngestError, OwnershipError, RewriteError, UploadStream};
use tubely_storage::StorageError;
use uuid::Uuid;

fn mp4_upload(data: &[u8]) -> UploadStream<&[u8]> {
    UploadStream::new(data, Some("video/mp4".to_string()))
}

#[tokio::test]
async fn test_landscape_video_ingested() {
    let harness = PipelineBuilder::new().build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "boots");
    let data = mp4_bytes();

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let updated = harness
        .pipeline
        .ingest(authorized, mp4_upload(&data))
        .await
        .unwrap();

    let url = updated.video_url.clone().unwrap();
    let prefix = format!("https://{}/landscape/", DISTRIBUTION);
    let name = url.strip_prefix(&prefix).unwrap();
    assert_eq!(name.len(), 64 + ".mp4".len());
    assert!(name.ends_with(".mp4"));

    let keys = harness.stored_keys();
    assert_eq!(keys, vec![format!("landscape/{}", name)]);
    let stored = std::fs::read(harness.objects.join(&keys[0])).unwrap();
    assert_eq!(stored, data);

    assert_eq!(harness.store.snapshot(video.id).unwrap().video_url, Some(url));
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_portrait_and_other_folders() {
    let portrait = PipelineBuilder::new().geometry(1080, 1920).build().await;
    let owner = Uuid::new_v4();
    let video = portrait.store.add_draft(owner, "tall");
    let authorized = portrait.pipeline.authorize(video.id, owner).await.unwrap();
    let updated = portrait
        .pipeline
        .ingest(authorized, mp4_upload(&mp4_bytes()))
        .await
        .unwrap();
    assert!(updated.video_url.unwrap().contains("/portrait/"));

    let square = PipelineBuilder::new().geometry(1000, 1000).build().await;
    let video = square.store.add_draft(owner, "square");
    let authorized = square.pipeline.authorize(video.id, owner).await.unwrap();
    let updated = square
        .pipeline
        .ingest(authorized, mp4_upload(&mp4_bytes()))
        .await
        .unwrap();
    assert!(updated.video_url.unwrap().contains("/other/"));
}

#[tokio::test]
async fn test_sniffed_mp4_without_declared_type() {
    let harness = PipelineBuilder::new().build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "sniffed");
    let data = mp4_bytes();

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let upload = UploadStream::new(&data[..], Some("application/octet-stream".to_string()));
    let updated = harness.pipeline.ingest(authorized, upload).await.unwrap();
    assert!(updated.video_url.is_some());
}

#[tokio::test]
async fn test_probe_failure_leaves_record_untouched() {
    let harness = PipelineBuilder::new().failing_probe().build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "broken");

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let err = harness
        .pipeline
        .ingest(authorized, mp4_upload(&mp4_bytes()))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Probe(_)));
    assert_eq!(err.class(), ErrorClass::Dependency);
    assert!(err.to_string().contains("boom"));
    assert_eq!(harness.store.snapshot(video.id).unwrap().video_url, None);
    assert!(harness.stored_keys().is_empty());
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_probe_failure_keeps_previous_url() {
    let harness = PipelineBuilder::new().failing_probe().build().await;
    let owner = Uuid::new_v4();
    let mut video = harness.store.add_draft(owner, "reupload");
    let previous = format!("https://{}/landscape/{}.mp4", DISTRIBUTION, "ab".repeat(32));
    video.video_url = Some(previous.clone());
    harness.store.insert(video.clone());

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let err = harness
        .pipeline
        .ingest(authorized, mp4_upload(&mp4_bytes()))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Probe(_)));
    assert_eq!(
        harness.store.snapshot(video.id).unwrap().video_url,
        Some(previous)
    );
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_rewrite_failure_removes_partial_output() {
    let harness = PipelineBuilder::new().failing_rewrite().build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "truncated");

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let err = harness
        .pipeline
        .ingest(authorized, mp4_upload(&mp4_bytes()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::Rewrite(RewriteError::ExecutionFailed { .. })
    ));
    assert_eq!(err.class(), ErrorClass::Dependency);
    assert!(err.to_string().contains("moov atom not found"));
    assert!(harness.stored_keys().is_empty());
    assert_eq!(harness.store.snapshot(video.id).unwrap().video_url, None);
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_storage_failure_cleans_scratch() {
    let harness = PipelineBuilder::new().failing_storage().build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "unreachable");

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let err = harness
        .pipeline
        .ingest(authorized, mp4_upload(&mp4_bytes()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::Storage(StorageError::UploadFailed(_))
    ));
    assert_eq!(err.class(), ErrorClass::Dependency);
    assert_eq!(harness.store.snapshot(video.id).unwrap().video_url, None);
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let harness = PipelineBuilder::new().max_upload_bytes(16).build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "too big");

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let err = harness
        .pipeline
        .ingest(authorized, mp4_upload(&mp4_bytes()))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::PayloadTooLarge { limit: 16 }));
    assert_eq!(err.class(), ErrorClass::Client);
    assert!(harness.stored_keys().is_empty());
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_malformed_declared_type_rejected() {
    let harness = PipelineBuilder::new().build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "mislabelled");
    let data = mp4_bytes();

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let upload = UploadStream::new(&data[..], Some("mp4video".to_string()));
    let err = harness.pipeline.ingest(authorized, upload).await.unwrap_err();

    match err {
        IngestError::UnsupportedMediaType(media_type) => assert_eq!(media_type, "mp4video"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(harness.stored_keys().is_empty());
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_non_mp4_rejected_before_staging() {
    let harness = PipelineBuilder::new().build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "picture");
    let png = b"\x89PNG\r\n\x1a\n0000000000000000";

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let upload = UploadStream::new(&png[..], Some("image/png".to_string()));
    let err = harness.pipeline.ingest(authorized, upload).await.unwrap_err();

    match err {
        IngestError::UnsupportedMediaType(media_type) => assert_eq!(media_type, "image/png"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_empty_upload_rejected() {
    let harness = PipelineBuilder::new().build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "empty");

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let err = harness
        .pipeline
        .ingest(authorized, mp4_upload(b""))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::EmptyUpload));
    assert_eq!(err.class(), ErrorClass::Client);
}

#[tokio::test]
async fn test_missing_distribution_stores_nothing() {
    let harness = PipelineBuilder::new().without_distribution().build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "nowhere");

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let err = harness
        .pipeline
        .ingest(authorized, mp4_upload(&mp4_bytes()))
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Configuration);
    assert!(harness.stored_keys().is_empty());
    assert_eq!(harness.store.snapshot(video.id).unwrap().video_url, None);
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_metadata_failure_orphans_object() {
    let harness = PipelineBuilder::new().build().await;
    let owner = Uuid::new_v4();
    let video = harness.store.add_draft(owner, "orphan");
    harness.store.fail_updates(true);

    let authorized = harness.pipeline.authorize(video.id, owner).await.unwrap();
    let err = harness
        .pipeline
        .ingest(authorized, mp4_upload(&mp4_bytes()))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::MetadataUpdate(_)));
    assert_eq!(err.class(), ErrorClass::Dependency);
    assert_eq!(harness.stored_keys().len(), 1);
    assert_eq!(harness.store.snapshot(video.id).unwrap().video_url, None);
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_not_owner_rejected() {
    let harness = PipelineBuilder::new().build().await;
    let video = harness.store.add_draft(Uuid::new_v4(), "someone else's");

    let err = harness
        .pipeline
        .authorize(video.id, Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::Ownership(OwnershipError::NotOwner { .. })
    ));
    assert_eq!(err.class(), ErrorClass::Client);
}

#[tokio::test]
async fn test_unknown_video_rejected() {
    let harness = PipelineBuilder::new().build().await;
    let missing = Uuid::new_v4();

    let err = harness
        .pipeline
        .authorize(missing, Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::Ownership(OwnershipError::NotFound(id)) if id == missing
    ));
}

#[tokio::test]
async fn test_concurrent_ingestions_get_distinct_keys() {
    let harness = PipelineBuilder::new().build().await;
    let owner = Uuid::new_v4();
    let first = harness.store.add_draft(owner, "one");
    let second = harness.store.add_draft(owner, "two");
    let data = mp4_bytes();

    let a = harness.pipeline.authorize(first.id, owner).await.unwrap();
    let b = harness.pipeline.authorize(second.id, owner).await.unwrap();
    let (ra, rb) = tokio::join!(
        harness.pipeline.ingest(a, mp4_upload(&data)),
        harness.pipeline.ingest(b, mp4_upload(&data)),
    );

    assert_ne!(ra.unwrap().video_url, rb.unwrap().video_url);
    assert_eq!(harness.stored_keys().len(), 2);
    assert_eq!(harness.scratch_entries(), 0);
}
