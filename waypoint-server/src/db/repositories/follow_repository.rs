use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use uuid::Uuid;

use crate::db::DbPool;

/// Social graph accessor. The graph is owned by the account subsystem;
/// the feed only resolves following sets from it.
pub struct FollowRepository {
    pool: DbPool,
}

impl FollowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Resolve the set of users this user follows. An empty set is a
    /// valid result, not an error.
    pub fn following_ids(&self, user_id: &Uuid) -> Result<HashSet<Uuid>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT followee_id FROM follows WHERE follower_id = ?")?;

        let ids = stmt
            .query_map([user_id.to_string()], |row| {
                let id: String = row.get(0)?;
                Ok(Uuid::parse_str(&id).unwrap())
            })?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(ids)
    }

    /// Check if user A is following user B
    pub fn is_following(&self, follower_id: &Uuid, followee_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followee_id = ?",
            (follower_id.to_string(), followee_id.to_string()),
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Follow a user. Idempotent: re-following is a no-op.
    pub fn follow(&self, follower_id: &Uuid, followee_id: &Uuid) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)",
            (
                follower_id.to_string(),
                followee_id.to_string(),
                Utc::now().to_rfc3339(),
            ),
        )
        .context("Failed to follow user")?;
        Ok(())
    }

    /// Unfollow a user, returning the number of rows removed
    pub fn unfollow(&self, follower_id: &Uuid, followee_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows_affected = conn
            .execute(
                "DELETE FROM follows WHERE follower_id = ? AND followee_id = ?",
                (follower_id.to_string(), followee_id.to_string()),
            )
            .context("Failed to unfollow user")?;
        Ok(rows_affected)
    }

    /// Get list of users that follow this user
    pub fn follower_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT follower_id FROM follows WHERE followee_id = ? ORDER BY created_at DESC",
        )?;

        let followers = stmt
            .query_map([user_id.to_string()], |row| {
                let id: String = row.get(0)?;
                Ok(Uuid::parse_str(&id).unwrap())
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(followers)
    }
}
