use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::PagesConfig,
    error::{AppError, AppResult},
    models::{
        canonical_emoji, generate_page_id, is_valid_page_id, AddFeedbackRequest, CreatePageInput,
        Feedback, GratitudePage, PageWithFeedback, DEFAULT_CREATOR_NAME, DEFAULT_EMOJI,
        DEFAULT_FEEDBACK_NAME, DEFAULT_THEME,
    },
    storage::{extension_for_content_type, MediaStore, PageStore},
};

/// Attempts at drawing a fresh `pageId` before giving up.
const MAX_ID_ATTEMPTS: usize = 5;

pub struct PagesService {
    store: Arc<dyn PageStore>,
    media: Arc<dyn MediaStore>,
    config: PagesConfig,
}

impl PagesService {
    pub fn new(store: Arc<dyn PageStore>, media: Arc<dyn MediaStore>, config: PagesConfig) -> Self {
        Self {
            store,
            media,
            config,
        }
    }

    /// Validate the form, push photos to the media store, then persist the page.
    ///
    /// Nothing is uploaded or stored when validation fails. Photos uploaded
    /// before a later failure are left in the media store.
    pub async fn create_page(&self, input: CreatePageInput) -> AppResult<GratitudePage> {
        let loved_one_name = required(input.loved_one_name, "lovedOneName")?;
        let message = required(input.message, "message")?;

        if input.photos.len() > self.config.max_photos {
            return Err(AppError::Validation(format!(
                "At most {} photos are allowed",
                self.config.max_photos
            )));
        }
        for photo in &input.photos {
            if extension_for_content_type(&photo.content_type).is_none() {
                return Err(AppError::Validation(format!(
                    "Unsupported image type: {}",
                    photo.content_type
                )));
            }
            if photo.data.len() > self.config.max_photo_bytes {
                return Err(AppError::Validation(format!(
                    "Photo {} exceeds {} bytes",
                    photo.file_name.as_deref().unwrap_or("upload"),
                    self.config.max_photo_bytes
                )));
            }
        }

        let mut photos = Vec::with_capacity(input.photos.len());
        for photo in input.photos {
            let url = self
                .media
                .upload_photo(photo.data, &photo.content_type)
                .await?;
            photos.push(url);
        }

        let created_at = Utc::now();
        let mut page = GratitudePage {
            page_id: String::new(),
            creator_name: optional(input.creator_name)
                .unwrap_or_else(|| DEFAULT_CREATOR_NAME.to_string()),
            loved_one_name,
            nickname: optional(input.nickname),
            message,
            wishes: input.wishes.map(|w| w.trim().to_string()).unwrap_or_default(),
            photos,
            theme: optional(input.theme).unwrap_or_else(|| DEFAULT_THEME.to_string()),
            created_at,
            expires_at: created_at + ttl(&self.config),
        };

        for _ in 0..MAX_ID_ATTEMPTS {
            page.page_id = generate_page_id();
            if let Some(stored) = self.store.insert_page(&page).await? {
                tracing::info!(
                    page_id = %stored.page_id,
                    photos = stored.photos.len(),
                    expires_at = %stored.expires_at,
                    "Gratitude page created"
                );
                return Ok(stored);
            }
            tracing::warn!(page_id = %page.page_id, "Page id collision, retrying");
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "Could not allocate a unique page id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    /// Fetch a live page with its feedback, newest first.
    pub async fn get_page(&self, page_id: &str) -> AppResult<PageWithFeedback> {
        if !is_valid_page_id(page_id) {
            return Err(AppError::PageNotFound);
        }

        let now = Utc::now();
        let page = self
            .store
            .find_live_page(page_id, now)
            .await?
            .ok_or(AppError::PageNotFound)?;

        let feedback = self.store.list_feedback(page_id).await?;
        let seconds_remaining = page.seconds_remaining(now);

        Ok(PageWithFeedback {
            page,
            feedback,
            seconds_remaining,
        })
    }

    /// Attach a reaction to a live page.
    pub async fn add_feedback(&self, page_id: &str, req: AddFeedbackRequest) -> AppResult<Feedback> {
        if !is_valid_page_id(page_id) {
            return Err(AppError::PageNotFound);
        }

        // A dead page answers 404 whatever the payload; the insert below
        // re-checks liveness atomically.
        self.store
            .find_live_page(page_id, Utc::now())
            .await?
            .ok_or(AppError::PageNotFound)?;

        let emoji = match req.emoji.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_EMOJI,
            Some(raw) => canonical_emoji(raw)
                .ok_or_else(|| AppError::Validation(format!("Unsupported emoji: {}", raw)))?,
        };

        let feedback = Feedback {
            id: Uuid::new_v4(),
            page_id: page_id.to_string(),
            name: optional(req.name).unwrap_or_else(|| DEFAULT_FEEDBACK_NAME.to_string()),
            emoji: emoji.to_string(),
            message: optional(req.message),
            created_at: Utc::now(),
        };

        let stored = self
            .store
            .insert_feedback(&feedback)
            .await?
            .ok_or(AppError::PageNotFound)?;

        tracing::info!(page_id = %page_id, feedback_id = %stored.id, "Feedback added");
        Ok(stored)
    }

    /// Remove every page whose lifetime has run out.
    pub async fn sweep_expired(&self) -> AppResult<u64> {
        self.store.delete_expired(Utc::now()).await
    }
}

fn ttl(config: &PagesConfig) -> Duration {
    Duration::from_std(config.ttl).unwrap_or_else(|_| Duration::hours(24))
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    optional(value).ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
