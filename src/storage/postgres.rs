use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::PageStore;
use crate::{
    error::{AppError, AppResult},
    models::{Feedback, GratitudePage},
};

#[derive(Clone)]
pub struct PgPageStore {
    db: PgPool,
}

impl PgPageStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PageStore for PgPageStore {
    async fn insert_page(&self, page: &GratitudePage) -> AppResult<Option<GratitudePage>> {
        let stored: Option<GratitudePage> = sqlx::query_as(
            r#"
            INSERT INTO gratitude_pages
                (page_id, creator_name, loved_one_name, nickname, message, wishes, photos, theme, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (page_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&page.page_id)
        .bind(&page.creator_name)
        .bind(&page.loved_one_name)
        .bind(&page.nickname)
        .bind(&page.message)
        .bind(&page.wishes)
        .bind(&page.photos)
        .bind(&page.theme)
        .bind(page.created_at)
        .bind(page.expires_at)
        .fetch_optional(&self.db)
        .await?;

        Ok(stored)
    }

    async fn find_live_page(
        &self,
        page_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<GratitudePage>> {
        let page: Option<GratitudePage> = sqlx::query_as(
            "SELECT * FROM gratitude_pages WHERE page_id = $1 AND expires_at > $2",
        )
        .bind(page_id)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;

        Ok(page)
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> AppResult<Option<Feedback>> {
        // Liveness check and insert share one statement so a concurrent sweep
        // cannot slip in between them.
        let result: Result<Option<Feedback>, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO feedback (id, page_id, name, emoji, message, created_at)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE EXISTS (
                SELECT 1 FROM gratitude_pages WHERE page_id = $2 AND expires_at > $6
            )
            RETURNING *
            "#,
        )
        .bind(feedback.id)
        .bind(&feedback.page_id)
        .bind(&feedback.name)
        .bind(&feedback.emoji)
        .bind(&feedback.message)
        .bind(feedback.created_at)
        .fetch_optional(&self.db)
        .await;

        match result {
            Ok(stored) => Ok(stored),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(AppError::PageNotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_feedback(&self, page_id: &str) -> AppResult<Vec<Feedback>> {
        let feedback: Vec<Feedback> = sqlx::query_as(
            "SELECT * FROM feedback WHERE page_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(page_id)
        .fetch_all(&self.db)
        .await?;

        Ok(feedback)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        // Feedback rows follow via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM gratitude_pages WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
