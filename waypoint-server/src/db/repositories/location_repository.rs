use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use waypoint_types::{Location, Review};

use crate::db::DbPool;

/// Read access to locations and their embedded reviews. The location
/// subsystem owns the writes; the feed only needs inserts for seeding
/// and tests.
pub struct LocationRepository {
    pool: DbPool,
}

impl LocationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create(&self, location: &Location) -> Result<()> {
        let conn = self.pool.get()?;
        let reviews = serde_json::to_string(&location.reviews)
            .context("Failed to serialize embedded reviews")?;

        conn.execute(
            "INSERT INTO locations (id, creator_id, name, description, created_at, reviews)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                location.id.to_string(),
                location.creator_id.to_string(),
                &location.name,
                &location.description,
                location.created_at.to_rfc3339(),
                reviews,
            ),
        )
        .context("Failed to create location")?;
        Ok(())
    }

    pub fn get_by_id(&self, location_id: &Uuid) -> Result<Option<Location>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, creator_id, name, description, created_at, reviews
             FROM locations
             WHERE id = ?",
        )?;

        let location = stmt
            .query_row([location_id.to_string()], |row| {
                let reviews_json: String = row.get(5)?;
                Ok(Location {
                    id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                    creator_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
                    name: row.get(2)?,
                    description: row.get(3)?,
                    created_at: row.get::<_, String>(4)?.parse::<DateTime<Utc>>().unwrap(),
                    reviews: serde_json::from_str::<Vec<Review>>(&reviews_json)
                        .unwrap_or_default(),
                })
            })
            .optional()?;

        Ok(location)
    }

    /// Append a review to its parent location's embedded array
    pub fn add_review(&self, location_id: &Uuid, review: &Review) -> Result<()> {
        let conn = self.pool.get()?;
        let review_json =
            serde_json::to_string(review).context("Failed to serialize review")?;

        let rows_affected = conn
            .execute(
                "UPDATE locations
                 SET reviews = json_insert(reviews, '$[#]', json(?))
                 WHERE id = ?",
                (review_json, location_id.to_string()),
            )
            .context("Failed to append review")?;

        anyhow::ensure!(rows_affected == 1, "Location not found");
        Ok(())
    }

    /// Check whether a review exists anywhere in the embedded arrays
    pub fn review_exists(&self, review_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*)
             FROM locations l, json_each(l.reviews) r
             WHERE json_extract(r.value, '$.id') = ?",
            [review_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
