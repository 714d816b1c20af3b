use bytes::Bytes;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Feedback;

pub const DEFAULT_CREATOR_NAME: &str = "Someone Special";
pub const DEFAULT_THEME: &str = "default";

/// Length of a generated `pageId`.
pub const PAGE_ID_LEN: usize = 10;
const PAGE_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GratitudePage {
    pub page_id: String,
    pub creator_name: String,
    pub loved_one_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub message: String,
    pub wishes: String,
    pub photos: Vec<String>,
    /// Reserved for rendering variants; stored but not interpreted.
    pub theme: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl GratitudePage {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whole seconds left before the page expires, floored at zero.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Random URL-safe identifier drawn from a 64-symbol alphabet.
pub fn generate_page_id() -> String {
    let mut rng = rand::thread_rng();
    (0..PAGE_ID_LEN)
        .map(|_| PAGE_ID_ALPHABET[rng.gen_range(0..PAGE_ID_ALPHABET.len())] as char)
        .collect()
}

/// Cheap shape check so obviously bogus identifiers never reach the store.
pub fn is_valid_page_id(page_id: &str) -> bool {
    !page_id.is_empty()
        && page_id.len() <= 64
        && page_id.bytes().all(|b| PAGE_ID_ALPHABET.contains(&b))
}

/// An uploaded image held in memory until it is handed to the media store.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Bytes,
}

/// Raw creation form as received from the client.
#[derive(Debug, Clone, Default)]
pub struct CreatePageInput {
    pub creator_name: Option<String>,
    pub loved_one_name: Option<String>,
    pub nickname: Option<String>,
    pub message: Option<String>,
    pub wishes: Option<String>,
    pub theme: Option<String>,
    pub photos: Vec<PhotoUpload>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWithFeedback {
    pub page: GratitudePage,
    pub feedback: Vec<Feedback>,
    pub seconds_remaining: i64,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn page_created_at(created_at: DateTime<Utc>) -> GratitudePage {
        GratitudePage {
            page_id: generate_page_id(),
            creator_name: DEFAULT_CREATOR_NAME.to_string(),
            loved_one_name: "Sam".to_string(),
            nickname: None,
            message: "Thank you".to_string(),
            wishes: String::new(),
            photos: vec![],
            theme: DEFAULT_THEME.to_string(),
            created_at,
            expires_at: created_at + Duration::hours(24),
        }
    }

    #[test]
    fn generated_ids_are_url_safe() {
        for _ in 0..200 {
            let id = generate_page_id();
            assert_eq!(id.len(), PAGE_ID_LEN);
            assert!(is_valid_page_id(&id), "unexpected id {}", id);
        }
    }

    #[test]
    fn generated_ids_do_not_repeat() {
        let ids: std::collections::HashSet<String> =
            (0..1_000).map(|_| generate_page_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(!is_valid_page_id(""));
        assert!(!is_valid_page_id("abc/def"));
        assert!(!is_valid_page_id("has space"));
        assert!(!is_valid_page_id(&"a".repeat(65)));
        assert!(is_valid_page_id("V1StGXR8_Z"));
    }

    #[test]
    fn remaining_time_counts_down_to_zero() {
        let now = Utc::now();
        let page = page_created_at(now - Duration::hours(23));

        assert_eq!(page.seconds_remaining(now), 3600);
        assert!(!page.is_expired_at(now));

        let later = now + Duration::hours(2);
        assert_eq!(page.seconds_remaining(later), 0);
        assert!(page.is_expired_at(later));
    }

    #[test]
    fn serializes_camel_case_fields() {
        let page = page_created_at(Utc::now());
        let value = serde_json::to_value(&page).unwrap();

        assert_eq!(value["lovedOneName"], "Sam");
        assert_eq!(value["creatorName"], "Someone Special");
        assert!(value.get("pageId").is_some());
        assert!(value.get("expiresAt").is_some());
        assert!(value.get("nickname").is_none());
    }
}
