use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use waypoint_types::{ActivityItem, ActivityPayload};

use crate::db::DbPool;

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn id_params(ids: &[Uuid]) -> impl Iterator<Item = String> + '_ {
    ids.iter().map(|id| id.to_string())
}

/// One item per location created by a followed account.
#[derive(Clone)]
pub struct LocationCreationSource {
    pool: DbPool,
}

impl LocationCreationSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fetch the newest `limit` items for the given authors, ordered by
    /// `created_at` descending.
    pub fn window(&self, author_ids: &[Uuid], limit: usize) -> Result<Vec<ActivityItem>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT l.id, l.creator_id, u.username, l.created_at, l.name, l.description
             FROM locations l
             JOIN users u ON u.id = l.creator_id
             WHERE l.creator_id IN ({})
             ORDER BY l.created_at DESC
             LIMIT ?",
            placeholders(author_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;

        let params = id_params(author_ids).chain(std::iter::once(limit.to_string()));
        let items = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                Ok(ActivityItem {
                    id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                    author_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
                    author_username: row.get(2)?,
                    created_at: row.get::<_, String>(3)?.parse::<DateTime<Utc>>().unwrap(),
                    payload: ActivityPayload::LocationCreated {
                        name: row.get(4)?,
                        description: row.get(5)?,
                    },
                    social: None,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn count(&self, author_ids: &[Uuid]) -> Result<i64> {
        if author_ids.is_empty() {
            return Ok(0);
        }

        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT COUNT(*) FROM locations WHERE creator_id IN ({})",
            placeholders(author_ids.len())
        );
        let count = conn.query_row(
            &sql,
            rusqlite::params_from_iter(id_params(author_ids)),
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// One item per review by a followed account. Reviews live as JSON
/// sub-objects inside their parent location rows; this adapter unnests
/// them across all locations so the merger sees ordinary top-level
/// items.
#[derive(Clone)]
pub struct ReviewSource {
    pool: DbPool,
}

impl ReviewSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn window(&self, author_ids: &[Uuid], limit: usize) -> Result<Vec<ActivityItem>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT json_extract(r.value, '$.id'),
                    json_extract(r.value, '$.author_id'),
                    u.username,
                    json_extract(r.value, '$.created_at'),
                    l.id, l.name,
                    json_extract(r.value, '$.rating'),
                    json_extract(r.value, '$.text')
             FROM locations l, json_each(l.reviews) r
             JOIN users u ON u.id = json_extract(r.value, '$.author_id')
             WHERE json_extract(r.value, '$.author_id') IN ({})
             ORDER BY json_extract(r.value, '$.created_at') DESC
             LIMIT ?",
            placeholders(author_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;

        let params = id_params(author_ids).chain(std::iter::once(limit.to_string()));
        let items = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                Ok(ActivityItem {
                    id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                    author_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
                    author_username: row.get(2)?,
                    created_at: row.get::<_, String>(3)?.parse::<DateTime<Utc>>().unwrap(),
                    payload: ActivityPayload::ReviewPosted {
                        location_id: Uuid::parse_str(&row.get::<_, String>(4)?).unwrap(),
                        location_name: row.get(5)?,
                        rating: row.get::<_, i64>(6)? as i32,
                        text: row.get(7)?,
                    },
                    social: None,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn count(&self, author_ids: &[Uuid]) -> Result<i64> {
        if author_ids.is_empty() {
            return Ok(0);
        }

        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT COUNT(*)
             FROM locations l, json_each(l.reviews) r
             WHERE json_extract(r.value, '$.author_id') IN ({})",
            placeholders(author_ids.len())
        );
        let count = conn.query_row(
            &sql,
            rusqlite::params_from_iter(id_params(author_ids)),
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// One item per badge announcement whose recipient is followed.
#[derive(Clone)]
pub struct BadgeAnnouncementSource {
    pool: DbPool,
}

impl BadgeAnnouncementSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn window(&self, author_ids: &[Uuid], limit: usize) -> Result<Vec<ActivityItem>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT b.id, b.recipient_id, u.username, b.created_at, b.badge_name
             FROM badge_announcements b
             JOIN users u ON u.id = b.recipient_id
             WHERE b.recipient_id IN ({})
             ORDER BY b.created_at DESC
             LIMIT ?",
            placeholders(author_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;

        let params = id_params(author_ids).chain(std::iter::once(limit.to_string()));
        let items = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                Ok(ActivityItem {
                    id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                    author_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
                    author_username: row.get(2)?,
                    created_at: row.get::<_, String>(3)?.parse::<DateTime<Utc>>().unwrap(),
                    payload: ActivityPayload::BadgeEarned {
                        badge_name: row.get(4)?,
                    },
                    social: None,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn count(&self, author_ids: &[Uuid]) -> Result<i64> {
        if author_ids.is_empty() {
            return Ok(0);
        }

        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT COUNT(*) FROM badge_announcements WHERE recipient_id IN ({})",
            placeholders(author_ids.len())
        );
        let count = conn.query_row(
            &sql,
            rusqlite::params_from_iter(id_params(author_ids)),
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn seeded_pool() -> DbPool {
        let db = Database::in_memory().expect("Failed to create test database");
        db.seed_test_data().expect("Failed to seed test data");
        db.pool.clone()
    }

    fn user(n: u32) -> Uuid {
        Uuid::parse_str(&format!("550e8400-e29b-41d4-a716-4466554400{:02}", n)).unwrap()
    }

    #[test]
    fn test_location_source_filters_and_orders() {
        let source = LocationCreationSource::new(seeded_pool());
        let authors = [user(2), user(3)];

        let items = source.window(&authors, 10).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].created_at >= items[1].created_at);
        assert_eq!(source.count(&authors).unwrap(), 2);

        let items = source.window(&[user(2)], 10).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].author_username, "liam");
    }

    #[test]
    fn test_review_source_unnests_embedded_reviews() {
        let source = ReviewSource::new(seeded_pool());
        let authors = [user(1), user(2), user(3)];

        let items = source.window(&authors, 10).unwrap();
        assert_eq!(items.len(), 3);
        // Descending across both parent locations
        for pair in items.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
        assert_eq!(source.count(&authors).unwrap(), 3);

        // Filtering applies to the review author, not the parent location creator
        let items = source.window(&[user(3)], 10).unwrap();
        assert_eq!(items.len(), 1);
        match &items[0].payload {
            ActivityPayload::ReviewPosted { location_name, rating, .. } => {
                assert_eq!(location_name, "Old Harbor Lighthouse");
                assert_eq!(*rating, 5);
            }
            other => panic!("expected review payload, got {other:?}"),
        }
    }

    #[test]
    fn test_badge_source_window_and_count() {
        let source = BadgeAnnouncementSource::new(seeded_pool());
        let authors = [user(2), user(3)];

        let items = source.window(&authors, 10).unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[0].payload,
            ActivityPayload::BadgeEarned { .. }
        ));
        assert_eq!(source.count(&authors).unwrap(), 2);
    }

    #[test]
    fn test_empty_author_set_short_circuits() {
        let source = LocationCreationSource::new(seeded_pool());
        assert!(source.window(&[], 10).unwrap().is_empty());
        assert_eq!(source.count(&[]).unwrap(), 0);
    }

    #[test]
    fn test_window_limit_applies() {
        let source = ReviewSource::new(seeded_pool());
        let authors = [user(1), user(2), user(3)];

        let items = source.window(&authors, 2).unwrap();
        assert_eq!(items.len(), 2);
    }
}
