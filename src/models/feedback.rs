use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_FEEDBACK_NAME: &str = "Receiver";
pub const DEFAULT_EMOJI: &str = "❤️";

/// Reactions the viewer page offers.
pub const ALLOWED_EMOJIS: [&str; 5] = ["❤️", "🥹", "🥲", "🕊️", "✨"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub page_id: String,
    pub name: String,
    pub emoji: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddFeedbackRequest {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub message: Option<String>,
}

/// Maps a submitted emoji onto the offered set, ignoring variation
/// selectors so `❤` and `❤️` are the same reaction.
pub fn canonical_emoji(emoji: &str) -> Option<&'static str> {
    let wanted = strip_variation_selectors(emoji.trim());
    ALLOWED_EMOJIS
        .iter()
        .copied()
        .find(|allowed| strip_variation_selectors(allowed) == wanted)
}

fn strip_variation_selectors(s: &str) -> String {
    s.chars().filter(|c| *c != '\u{FE0F}').collect()
}
