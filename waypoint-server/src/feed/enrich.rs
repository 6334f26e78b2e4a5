use anyhow::Result;
use std::collections::HashMap;
use uuid::Uuid;

use waypoint_types::{ActivityItem, ReactionKind, SocialSignals, SubjectType};

use crate::db::repositories::{CommentRepository, ReactionRepository};
use crate::db::DbPool;

/// Attaches social signals to review-kind and badge-kind items. All
/// fetches are batched per page, never issued per item.
pub struct EnrichmentStage {
    reactions: ReactionRepository,
    comments: CommentRepository,
}

impl EnrichmentStage {
    pub fn new(pool: DbPool) -> Self {
        Self {
            reactions: ReactionRepository::new(pool.clone()),
            comments: CommentRepository::new(pool),
        }
    }

    /// Enrich a merged page in place for the given viewer. A subject
    /// with no recorded activity gets all-zero counts and no viewer
    /// reaction; storage failures propagate, since a partial page is
    /// never returned.
    pub fn apply(&self, viewer_id: &Uuid, items: &mut [ActivityItem]) -> Result<()> {
        let mut by_type: HashMap<SubjectType, Vec<Uuid>> = HashMap::new();
        for item in items.iter() {
            if let Some(subject_type) = item.subject_type() {
                by_type.entry(subject_type).or_default().push(item.id);
            }
        }

        let mut counts = HashMap::new();
        let mut viewer_reactions: HashMap<Uuid, ReactionKind> = HashMap::new();
        let mut comment_counts = HashMap::new();

        for (subject_type, subject_ids) in &by_type {
            counts.extend(
                self.reactions
                    .counts_for_subjects(*subject_type, subject_ids)?,
            );
            viewer_reactions.extend(self.reactions.user_reactions_for_subjects(
                *subject_type,
                subject_ids,
                viewer_id,
            )?);
            comment_counts.extend(
                self.comments
                    .counts_for_subjects(*subject_type, subject_ids)?,
            );
        }

        for item in items.iter_mut() {
            if item.subject_type().is_none() {
                continue;
            }
            let (likes, dislikes) = counts.get(&item.id).copied().unwrap_or((0, 0));
            item.social = Some(SocialSignals {
                likes,
                dislikes,
                user_reaction: viewer_reactions.get(&item.id).copied(),
                comment_count: comment_counts.get(&item.id).copied().unwrap_or(0),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::Utc;
    use waypoint_types::ActivityPayload;

    fn setup() -> (Database, EnrichmentStage) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.seed_test_data().expect("Failed to seed test data");
        let stage = EnrichmentStage::new(db.pool.clone());
        (db, stage)
    }

    fn review_item(id: Uuid) -> ActivityItem {
        ActivityItem {
            id,
            author_id: Uuid::new_v4(),
            author_username: "noor".to_string(),
            created_at: Utc::now(),
            payload: ActivityPayload::ReviewPosted {
                location_id: Uuid::new_v4(),
                location_name: "Old Harbor Lighthouse".to_string(),
                rating: 5,
                text: "Stunning views".to_string(),
            },
            social: None,
        }
    }

    #[test]
    fn test_attaches_counts_and_viewer_reaction() {
        let (db, stage) = setup();
        let review = Uuid::parse_str("750e8400-e29b-41d4-a716-446655440001").unwrap();
        let maya = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap();

        // Seeded with 2 likes; add a dislike from otis
        let conn = db.connection().unwrap();
        conn.execute(
            "INSERT INTO reactions (subject_id, subject_type, user_id, kind, created_at)
             VALUES (?, 'review', '550e8400-e29b-41d4-a716-446655440004', 'dislike', ?)",
            (review.to_string(), Utc::now().to_rfc3339()),
        )
        .unwrap();

        let mut items = vec![review_item(review)];
        stage.apply(&maya, &mut items).unwrap();

        let social = items[0].social.as_ref().expect("social block attached");
        assert_eq!(social.likes, 2);
        assert_eq!(social.dislikes, 1);
        assert_eq!(social.user_reaction, Some(ReactionKind::Like));
        assert_eq!(social.comment_count, 2);
    }

    #[test]
    fn test_subject_without_activity_gets_zeroes() {
        let (_db, stage) = setup();
        let viewer = Uuid::new_v4();

        let mut items = vec![review_item(Uuid::new_v4())];
        stage.apply(&viewer, &mut items).unwrap();

        assert_eq!(items[0].social, Some(SocialSignals::default()));
    }

    #[test]
    fn test_location_items_carry_no_social_block() {
        let (_db, stage) = setup();
        let viewer = Uuid::new_v4();

        let mut items = vec![ActivityItem {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author_username: "liam".to_string(),
            created_at: Utc::now(),
            payload: ActivityPayload::LocationCreated {
                name: "Old Harbor Lighthouse".to_string(),
                description: None,
            },
            social: None,
        }];
        stage.apply(&viewer, &mut items).unwrap();

        assert!(items[0].social.is_none());
    }

    #[test]
    fn test_mixed_subject_types_enrich_in_one_pass() {
        let (_db, stage) = setup();
        let maya = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap();
        let badge = Uuid::parse_str("850e8400-e29b-41d4-a716-446655440001").unwrap();

        let mut items = vec![
            review_item(Uuid::parse_str("750e8400-e29b-41d4-a716-446655440001").unwrap()),
            ActivityItem {
                id: badge,
                author_id: Uuid::new_v4(),
                author_username: "liam".to_string(),
                created_at: Utc::now(),
                payload: ActivityPayload::BadgeEarned {
                    badge_name: "Trailblazer".to_string(),
                },
                social: None,
            },
        ];
        stage.apply(&maya, &mut items).unwrap();

        let badge_social = items[1].social.as_ref().unwrap();
        assert_eq!(badge_social.likes, 1);
        assert_eq!(badge_social.user_reaction, Some(ReactionKind::Like));
        assert_eq!(badge_social.comment_count, 1);
    }
}
