use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::PageStore;
use crate::{
    error::AppResult,
    models::{Feedback, GratitudePage},
};

/// Process-local [`PageStore`] for development without Postgres.
#[derive(Default)]
pub struct MemoryPageStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    pages: HashMap<String, GratitudePage>,
    feedback: HashMap<String, Vec<Feedback>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn insert_page(&self, page: &GratitudePage) -> AppResult<Option<GratitudePage>> {
        let mut inner = self.inner.write().await;
        if inner.pages.contains_key(&page.page_id) {
            return Ok(None);
        }
        inner.pages.insert(page.page_id.clone(), page.clone());
        Ok(Some(page.clone()))
    }

    async fn find_live_page(
        &self,
        page_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<GratitudePage>> {
        let inner = self.inner.read().await;
        Ok(inner
            .pages
            .get(page_id)
            .filter(|page| !page.is_expired_at(now))
            .cloned())
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> AppResult<Option<Feedback>> {
        let mut inner = self.inner.write().await;
        let live = inner
            .pages
            .get(&feedback.page_id)
            .is_some_and(|page| !page.is_expired_at(feedback.created_at));
        if !live {
            return Ok(None);
        }

        inner
            .feedback
            .entry(feedback.page_id.clone())
            .or_default()
            .push(feedback.clone());
        Ok(Some(feedback.clone()))
    }

    async fn list_feedback(&self, page_id: &str) -> AppResult<Vec<Feedback>> {
        let inner = self.inner.read().await;
        let mut feedback = inner.feedback.get(page_id).cloned().unwrap_or_default();
        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(feedback)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let expired: Vec<String> = inner
            .pages
            .values()
            .filter(|page| page.is_expired_at(now))
            .map(|page| page.page_id.clone())
            .collect();

        for page_id in &expired {
            inner.pages.remove(page_id);
            inner.feedback.remove(page_id);
        }

        Ok(expired.len() as u64)
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::Mutex;

    use crate::{
        error::{AppError, AppResult},
        storage::{extension_for_content_type, MediaStore},
    };

    /// Media store that keeps uploads in memory and can be told to fail
    /// after a number of successful uploads.
    #[derive(Default)]
    pub struct RecordingMediaStore {
        pub uploads: Mutex<Vec<(String, usize)>>,
        fail_after: Option<usize>,
        attempts: AtomicUsize,
    }

    impl RecordingMediaStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_after(successes: usize) -> Self {
            Self {
                fail_after: Some(successes),
                ..Self::default()
            }
        }

        pub async fn upload_count(&self) -> usize {
            self.uploads.lock().await.len()
        }
    }

    #[async_trait]
    impl MediaStore for RecordingMediaStore {
        async fn upload_photo(&self, data: Bytes, content_type: &str) -> AppResult<String> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|limit| attempt >= limit) {
                return Err(AppError::Storage("upload rejected".to_string()));
            }

            let extension = extension_for_content_type(content_type).unwrap_or("bin");
            let url = format!("https://media.test/photos/{}.{}", attempt, extension);
            self.uploads.lock().await.push((url.clone(), data.len()));
            Ok(url)
        }
    }
}
