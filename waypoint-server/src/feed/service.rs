use anyhow::Result;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use waypoint_types::{
    ActivityItem, Comment, FeedResponse, Pagination, ReactionKind, SubjectType,
};

use crate::auth::{can_delete_comment, AuthContext};
use crate::db::repositories::{
    BadgeRepository, CommentRepository, FollowRepository, LocationRepository,
    ReactionOutcome, ReactionRepository,
};
use crate::db::DbPool;
use crate::feed::enrich::EnrichmentStage;
use crate::feed::merge::merge_page;
use crate::feed::sources::{BadgeAnnouncementSource, LocationCreationSource, ReviewSource};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// A reaction/comment target: a review or a badge announcement.
#[derive(Debug, Clone, Copy)]
pub struct SubjectRef {
    pub id: Uuid,
    pub subject_type: SubjectType,
}

/// Root orchestration of the feed: resolves the social graph, fans out
/// to the activity sources, merges, enriches, and owns the
/// reaction/comment mutations.
pub struct FeedService {
    follows: FollowRepository,
    locations: LocationCreationSource,
    reviews: ReviewSource,
    badges: BadgeAnnouncementSource,
    enrichment: EnrichmentStage,
    location_repo: LocationRepository,
    badge_repo: BadgeRepository,
    reaction_repo: ReactionRepository,
    comment_repo: CommentRepository,
}

impl FeedService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            follows: FollowRepository::new(pool.clone()),
            locations: LocationCreationSource::new(pool.clone()),
            reviews: ReviewSource::new(pool.clone()),
            badges: BadgeAnnouncementSource::new(pool.clone()),
            enrichment: EnrichmentStage::new(pool.clone()),
            location_repo: LocationRepository::new(pool.clone()),
            badge_repo: BadgeRepository::new(pool.clone()),
            reaction_repo: ReactionRepository::new(pool.clone()),
            comment_repo: CommentRepository::new(pool),
        }
    }

    /// Assemble one feed page for a viewer. All-or-nothing: any source
    /// failure fails the request; a partial page is never returned.
    pub async fn assemble_page(
        &self,
        viewer_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<FeedResponse, FeedError> {
        let following = self.follows.following_ids(&viewer_id)?;
        if following.is_empty() {
            // Explicit empty feed, no adapter is queried
            return Ok(FeedResponse {
                feed: Vec::new(),
                pagination: Pagination {
                    total: 0,
                    page,
                    limit,
                    pages: 0,
                },
            });
        }

        let authors: Vec<Uuid> = following.into_iter().collect();
        let skip = (page as usize - 1) * limit as usize;
        // Each source contributes its newest skip+limit items, a
        // superset of any correct cross-source page cut.
        let window = skip + limit as usize;

        let (locations, reviews, badges) = {
            let (l, la) = (self.locations.clone(), authors.clone());
            let (r, ra) = (self.reviews.clone(), authors.clone());
            let (b, ba) = (self.badges.clone(), authors);

            let (l_res, r_res, b_res) = tokio::try_join!(
                tokio::task::spawn_blocking(move || -> Result<_> {
                    Ok((l.window(&la, window)?, l.count(&la)?))
                }),
                tokio::task::spawn_blocking(move || -> Result<_> {
                    Ok((r.window(&ra, window)?, r.count(&ra)?))
                }),
                tokio::task::spawn_blocking(move || -> Result<_> {
                    Ok((b.window(&ba, window)?, b.count(&ba)?))
                }),
            )
            .map_err(anyhow::Error::from)?;
            (l_res?, r_res?, b_res?)
        };

        let total = locations.1 + reviews.1 + badges.1;
        let mut items = merge_page(
            vec![locations.0, reviews.0, badges.0],
            skip,
            limit as usize,
        );

        self.enrichment.apply(&viewer_id, &mut items)?;

        let pages = (total + limit as i64 - 1) / limit as i64;
        Ok(FeedResponse {
            feed: items,
            pagination: Pagination {
                total,
                page,
                limit,
                pages,
            },
        })
    }

    fn require_subject(&self, subject: SubjectRef) -> Result<(), FeedError> {
        let exists = match subject.subject_type {
            SubjectType::Review => self.location_repo.review_exists(&subject.id)?,
            SubjectType::BadgeNotification => self.badge_repo.exists(&subject.id)?,
        };
        if exists {
            Ok(())
        } else {
            Err(FeedError::NotFound(match subject.subject_type {
                SubjectType::Review => "Review not found".to_string(),
                SubjectType::BadgeNotification => "Badge announcement not found".to_string(),
            }))
        }
    }

    /// Record a like/dislike. Repeating the same reaction is a no-op
    /// success so client retries stay idempotent.
    pub fn react(
        &self,
        subject: SubjectRef,
        ctx: &AuthContext,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome, FeedError> {
        self.require_subject(subject)?;
        let outcome =
            self.reaction_repo
                .react(&subject.id, subject.subject_type, &ctx.user_id, kind)?;
        Ok(outcome)
    }

    pub fn unreact(&self, subject: SubjectRef, ctx: &AuthContext) -> Result<(), FeedError> {
        self.require_subject(subject)?;
        let removed =
            self.reaction_repo
                .unreact(&subject.id, subject.subject_type, &ctx.user_id)?;
        if removed == 0 {
            return Err(FeedError::NotFound("No reaction to remove".to_string()));
        }
        Ok(())
    }

    pub fn comments(&self, subject: SubjectRef) -> Result<Vec<Comment>, FeedError> {
        self.require_subject(subject)?;
        let comments = self
            .comment_repo
            .list_for_subject(&subject.id, subject.subject_type)?;
        Ok(comments)
    }

    pub fn add_comment(
        &self,
        subject: SubjectRef,
        ctx: &AuthContext,
        content: &str,
    ) -> Result<Comment, FeedError> {
        if content.trim().is_empty() {
            return Err(FeedError::InvalidInput(
                "Comment content cannot be empty".to_string(),
            ));
        }
        if content.len() > 500 {
            return Err(FeedError::InvalidInput(format!(
                "Comment exceeds 500 character limit (current: {})",
                content.len()
            )));
        }
        self.require_subject(subject)?;

        let comment = Comment {
            id: Uuid::new_v4(),
            subject_id: subject.id,
            subject_type: subject.subject_type,
            author_id: ctx.user_id,
            author_username: ctx.username.clone(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.comment_repo.create(&comment)?;
        Ok(comment)
    }

    pub fn delete_comment(
        &self,
        subject: SubjectRef,
        comment_id: &Uuid,
        ctx: &AuthContext,
    ) -> Result<(), FeedError> {
        let comment = self
            .comment_repo
            .get_by_id(comment_id)?
            .filter(|c| c.subject_id == subject.id && c.subject_type == subject.subject_type)
            .ok_or_else(|| FeedError::NotFound("Comment not found".to_string()))?;

        if !can_delete_comment(ctx, &comment.author_id) {
            return Err(FeedError::Forbidden(
                "Only the comment author or a moderator may delete this comment".to_string(),
            ));
        }

        self.comment_repo.delete(comment_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use waypoint_types::{ActivityPayload, Location, Review, User, UserRole};

    fn seeded_service() -> (Database, FeedService) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.seed_test_data().expect("Failed to seed test data");
        let service = FeedService::new(db.pool.clone());
        (db, service)
    }

    fn user(n: u32) -> Uuid {
        Uuid::parse_str(&format!("550e8400-e29b-41d4-a716-4466554400{:02}", n)).unwrap()
    }

    fn ctx(n: u32, role: UserRole) -> AuthContext {
        AuthContext {
            user_id: user(n),
            username: format!("user{n}"),
            role,
        }
    }

    fn review_subject(id: &str) -> SubjectRef {
        SubjectRef {
            id: Uuid::parse_str(id).unwrap(),
            subject_type: SubjectType::Review,
        }
    }

    #[tokio::test]
    async fn test_empty_following_short_circuits() {
        let (_db, service) = seeded_service();

        // otis follows nobody
        let response = service.assemble_page(user(4), 1, 10).await.unwrap();
        assert!(response.feed.is_empty());
        assert_eq!(response.pagination.total, 0);
        assert_eq!(response.pagination.pages, 0);
        assert_eq!(response.pagination.page, 1);
    }

    #[tokio::test]
    async fn test_feed_interleaves_sources_newest_first() {
        let (_db, service) = seeded_service();

        // maya follows liam and noor: 2 locations, 2 reviews, 2 badges
        let response = service.assemble_page(user(1), 1, 10).await.unwrap();
        assert_eq!(response.pagination.total, 6);
        assert_eq!(response.feed.len(), 6);
        for pair in response.feed.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }

        // Newest overall is liam's Trailblazer badge
        assert!(matches!(
            response.feed[0].payload,
            ActivityPayload::BadgeEarned { .. }
        ));
    }

    #[tokio::test]
    async fn test_page_boundaries_are_correct_cross_source_cuts() {
        let (_db, service) = seeded_service();

        let page1 = service.assemble_page(user(1), 1, 4).await.unwrap();
        let page2 = service.assemble_page(user(1), 2, 4).await.unwrap();

        assert_eq!(page1.feed.len(), 4);
        assert_eq!(page2.feed.len(), 2);
        assert_eq!(page1.pagination.pages, 2);

        // No overlap, no gap: page 2 continues exactly where page 1 ended
        assert!(page1.feed[3].created_at >= page2.feed[0].created_at);
        let all_ids: std::collections::HashSet<Uuid> = page1
            .feed
            .iter()
            .chain(page2.feed.iter())
            .map(|i| i.id)
            .collect();
        assert_eq!(all_ids.len(), 6);
    }

    #[tokio::test]
    async fn test_two_follow_scenario_orders_review_above_location() {
        let db = Database::in_memory().unwrap();
        let service = FeedService::new(db.pool.clone());
        let users = crate::db::repositories::UserRepository::new(db.pool.clone());
        let follows = FollowRepository::new(db.pool.clone());
        let locations = LocationRepository::new(db.pool.clone());

        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        for (id, name) in [(a, "a"), (b, "b"), (c, "c"), (d, "d")] {
            users
                .create(&User {
                    id,
                    username: name.to_string(),
                    role: UserRole::User,
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        follows.follow(&a, &b).unwrap();
        follows.follow(&a, &c).unwrap();

        // B creates location L1 at t1
        let l1 = Uuid::new_v4();
        locations
            .create(&Location {
                id: l1,
                creator_id: b,
                name: "L1".to_string(),
                description: None,
                created_at: "2024-05-01T00:00:00Z".parse().unwrap(),
                reviews: Vec::new(),
            })
            .unwrap();

        // C posts review R1 on an unrelated location (owned by d) at t2 > t1
        let unrelated = Uuid::new_v4();
        let r1 = Uuid::new_v4();
        locations
            .create(&Location {
                id: unrelated,
                creator_id: d,
                name: "Unrelated".to_string(),
                description: None,
                created_at: "2024-04-01T00:00:00Z".parse().unwrap(),
                reviews: vec![Review {
                    id: r1,
                    author_id: c,
                    rating: 4,
                    text: "solid".to_string(),
                    created_at: "2024-05-02T00:00:00Z".parse().unwrap(),
                }],
            })
            .unwrap();

        let response = service.assemble_page(a, 1, 10).await.unwrap();
        assert_eq!(response.pagination.total, 2);
        assert_eq!(response.feed.len(), 2);
        assert_eq!(response.feed[0].id, r1);
        assert_eq!(response.feed[1].id, l1);
        // The unrelated location itself is not in the feed: d is not followed
    }

    #[tokio::test]
    async fn test_feed_page_is_enriched_for_viewer() {
        let (_db, service) = seeded_service();

        let response = service.assemble_page(user(1), 1, 10).await.unwrap();
        let review = response
            .feed
            .iter()
            .find(|i| i.id == Uuid::parse_str("750e8400-e29b-41d4-a716-446655440001").unwrap())
            .expect("seeded review in feed");

        let social = review.social.as_ref().unwrap();
        assert_eq!(social.likes, 2);
        assert_eq!(social.user_reaction, Some(ReactionKind::Like));
        assert_eq!(social.comment_count, 2);
    }

    #[test]
    fn test_react_on_missing_subject_is_not_found() {
        let (_db, service) = seeded_service();
        let subject = SubjectRef {
            id: Uuid::new_v4(),
            subject_type: SubjectType::Review,
        };

        let err = service
            .react(subject, &ctx(1, UserRole::User), ReactionKind::Like)
            .unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    #[test]
    fn test_react_outcomes() {
        let (_db, service) = seeded_service();
        let subject = review_subject("750e8400-e29b-41d4-a716-446655440002");
        let maya = ctx(1, UserRole::User);

        let outcome = service
            .react(subject, &maya, ReactionKind::Like)
            .unwrap();
        assert_eq!(outcome, ReactionOutcome::Created);

        let outcome = service
            .react(subject, &maya, ReactionKind::Like)
            .unwrap();
        assert_eq!(outcome, ReactionOutcome::AlreadyReacted);

        let outcome = service
            .react(subject, &maya, ReactionKind::Dislike)
            .unwrap();
        assert_eq!(outcome, ReactionOutcome::Switched);
    }

    #[test]
    fn test_unreact_without_reaction_is_not_found() {
        let (_db, service) = seeded_service();
        let subject = review_subject("750e8400-e29b-41d4-a716-446655440002");

        let err = service
            .unreact(subject, &ctx(4, UserRole::Moderator))
            .unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    #[test]
    fn test_whitespace_comment_is_rejected() {
        let (db, service) = seeded_service();
        let subject = review_subject("750e8400-e29b-41d4-a716-446655440001");

        let err = service
            .add_comment(subject, &ctx(1, UserRole::User), "   ")
            .unwrap_err();
        assert!(matches!(err, FeedError::InvalidInput(_)));

        // No row was created
        let conn = db.connection().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM comments WHERE subject_id = ?",
                [subject.id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_delete_comment_authorization() {
        let (_db, service) = seeded_service();
        let subject = review_subject("750e8400-e29b-41d4-a716-446655440001");
        // Seeded comment authored by maya
        let comment_id = Uuid::parse_str("950e8400-e29b-41d4-a716-446655440001").unwrap();

        // noor: neither author nor privileged
        let err = service
            .delete_comment(subject, &comment_id, &ctx(3, UserRole::User))
            .unwrap_err();
        assert!(matches!(err, FeedError::Forbidden(_)));

        // The comment survived the forbidden attempt
        assert!(service.comments(subject).unwrap().iter().any(|c| c.id == comment_id));

        // otis the moderator may delete it
        service
            .delete_comment(subject, &comment_id, &ctx(4, UserRole::Moderator))
            .unwrap();
        assert!(!service.comments(subject).unwrap().iter().any(|c| c.id == comment_id));
    }

    #[test]
    fn test_delete_comment_checks_subject_pairing() {
        let (_db, service) = seeded_service();
        // Comment belongs to the badge thread, not this review
        let subject = review_subject("750e8400-e29b-41d4-a716-446655440001");
        let badge_comment = Uuid::parse_str("950e8400-e29b-41d4-a716-446655440003").unwrap();

        let err = service
            .delete_comment(subject, &badge_comment, &ctx(4, UserRole::Moderator))
            .unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }
}
