use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{Feedback, GratitudePage},
};

pub mod local;
pub mod memory;
pub mod minio;
pub mod postgres;
pub mod redis;

/// Durable home of pages and their feedback.
///
/// Pages are only visible while `expires_at` lies after the supplied `now`;
/// physically removing them is left to [`PageStore::delete_expired`].
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Inserts a page. Returns `None` when `page_id` is already taken.
    async fn insert_page(&self, page: &GratitudePage) -> AppResult<Option<GratitudePage>>;

    async fn find_live_page(
        &self,
        page_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<GratitudePage>>;

    /// Inserts feedback if its page is live at `feedback.created_at`.
    /// Returns `None` when the page is missing or expired.
    async fn insert_feedback(&self, feedback: &Feedback) -> AppResult<Option<Feedback>>;

    /// All feedback for a page, newest first.
    async fn list_feedback(&self, page_id: &str) -> AppResult<Vec<Feedback>>;

    /// Deletes every page expired at `now` together with its feedback.
    /// Returns the number of pages removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// External image host. Accepts bytes, hands back a fetchable URL.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload_photo(&self, data: Bytes, content_type: &str) -> AppResult<String>;
}

pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
