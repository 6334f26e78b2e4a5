use serde::{Deserialize, Serialize};

/// A like or dislike on a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "like" => Some(ReactionKind::Like),
            "dislike" => Some(ReactionKind::Dislike),
            _ => None,
        }
    }
}

/// The entity a reaction or comment attaches to.
///
/// Location submissions carry no social signals, so they are not a
/// subject type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Review,
    BadgeNotification,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Review => "review",
            SubjectType::BadgeNotification => "badge_notification",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "review" => Some(SubjectType::Review),
            "badge_notification" => Some(SubjectType::BadgeNotification),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Moderator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "moderator" => Some(UserRole::Moderator),
            _ => None,
        }
    }

    /// Moderators may delete any comment; everyone else only their own.
    pub fn is_privileged(&self) -> bool {
        matches!(self, UserRole::Moderator)
    }
}
