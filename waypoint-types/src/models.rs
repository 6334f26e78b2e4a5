use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{ReactionKind, SubjectType, UserRole};

// Custom serde module for DateTime to ensure RFC3339 string format
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.to_rfc3339();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

/// One feed-visible unit of content. Ephemeral: assembled per request,
/// never persisted as its own row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: ActivityPayload,
    /// Social signals, attached by enrichment. Location submissions
    /// carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social: Option<SocialSignals>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityPayload {
    LocationCreated {
        name: String,
        description: Option<String>,
    },
    ReviewPosted {
        location_id: Uuid,
        location_name: String,
        rating: i32,
        text: String,
    },
    BadgeEarned {
        badge_name: String,
    },
}

impl ActivityItem {
    /// Which subject type this item enriches as, if any.
    pub fn subject_type(&self) -> Option<SubjectType> {
        match self.payload {
            ActivityPayload::LocationCreated { .. } => None,
            ActivityPayload::ReviewPosted { .. } => Some(SubjectType::Review),
            ActivityPayload::BadgeEarned { .. } => Some(SubjectType::BadgeNotification),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialSignals {
    pub likes: i64,
    pub dislikes: i64,
    pub user_reaction: Option<ReactionKind>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub user_id: Uuid,
    pub kind: ReactionKind,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub author_id: Uuid,
    #[serde(default)]
    pub author_username: String,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

/// A review as embedded in its parent location record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub author_id: Uuid,
    pub rating: i32,
    pub text: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// Immutable announcement written by the external badge engine when a
/// badge unlocks; read-only from the feed's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeAnnouncement {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub badge_name: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub feed: Vec<ActivityItem>,
    pub pagination: Pagination,
}

// Request/Response types for API
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub session_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}
