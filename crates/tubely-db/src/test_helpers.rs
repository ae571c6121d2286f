//! In-memory `VideoStore` for tests that should not need Postgres.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tubely_core::{models::Video, AppError};
use uuid::Uuid;

use crate::VideoStore;

/// Mock video store backed by a `HashMap`
#[derive(Clone, Default)]
pub struct MockVideoStore {
    videos: Arc<Mutex<HashMap<Uuid, Video>>>,
    fail_updates: Arc<AtomicBool>,
}

impl MockVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a draft owned by `user_id` and return it.
    pub fn add_draft(&self, user_id: Uuid, title: &str) -> Video {
        let video = Video::new_draft(user_id, title.to_string(), String::new());
        self.videos
            .lock()
            .unwrap()
            .insert(video.id, video.clone());
        video
    }

    pub fn insert(&self, video: Video) {
        self.videos.lock().unwrap().insert(video.id, video);
    }

    /// Current stored copy, bypassing the trait.
    pub fn snapshot(&self, id: Uuid) -> Option<Video> {
        self.videos.lock().unwrap().get(&id).cloned()
    }

    /// Make every subsequent `update_video` fail with a database-class error.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoStore for MockVideoStore {
    async fn get_video(&self, id: Uuid) -> Result<Video, AppError> {
        self.snapshot(id)
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
    }

    async fn update_video(&self, video: &Video) -> Result<Video, AppError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }

        let mut videos = self.videos.lock().unwrap();
        let stored = videos
            .get_mut(&video.id)
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;
        stored.title = video.title.clone();
        stored.description = video.description.clone();
        stored.thumbnail_url = video.thumbnail_url.clone();
        stored.video_url = video.video_url.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn create_video(
        &self,
        user_id: Uuid,
        title: String,
        description: String,
    ) -> Result<Video, AppError> {
        let video = Video::new_draft(user_id, title, description);
        self.insert(video.clone());
        Ok(video)
    }

    async fn list_videos_for_user(&self, user_id: Uuid) -> Result<Vec<Video>, AppError> {
        let mut videos: Vec<Video> = self
            .videos
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }
}
