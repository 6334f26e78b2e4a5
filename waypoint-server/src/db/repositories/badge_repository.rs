use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use waypoint_types::BadgeAnnouncement;

use crate::db::DbPool;

/// Badge announcements are written once by the external badge engine;
/// the feed treats them as a read-only source. `create` exists for
/// seeding and tests.
pub struct BadgeRepository {
    pool: DbPool,
}

impl BadgeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create(&self, announcement: &BadgeAnnouncement) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO badge_announcements (id, recipient_id, badge_name, created_at)
             VALUES (?, ?, ?, ?)",
            (
                announcement.id.to_string(),
                announcement.recipient_id.to_string(),
                &announcement.badge_name,
                announcement.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to create badge announcement")?;
        Ok(())
    }

    pub fn get_by_id(&self, announcement_id: &Uuid) -> Result<Option<BadgeAnnouncement>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, recipient_id, badge_name, created_at
             FROM badge_announcements
             WHERE id = ?",
        )?;

        let announcement = stmt
            .query_row([announcement_id.to_string()], |row| {
                Ok(BadgeAnnouncement {
                    id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                    recipient_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
                    badge_name: row.get(2)?,
                    created_at: row.get::<_, String>(3)?.parse::<DateTime<Utc>>().unwrap(),
                })
            })
            .optional()?;

        Ok(announcement)
    }

    pub fn exists(&self, announcement_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM badge_announcements WHERE id = ?",
            [announcement_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_get_and_exists() {
        let db = Database::in_memory().expect("Failed to create test database");
        db.seed_test_data().expect("Failed to seed test data");
        let repo = BadgeRepository::new(db.pool.clone());

        let seeded = Uuid::parse_str("850e8400-e29b-41d4-a716-446655440001").unwrap();
        assert!(repo.exists(&seeded).unwrap());

        let announcement = repo.get_by_id(&seeded).unwrap().unwrap();
        assert_eq!(announcement.badge_name, "Trailblazer");

        assert!(!repo.exists(&Uuid::new_v4()).unwrap());
    }
}
