use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use waypoint_types::{User, UserRole};

use crate::db::DbPool;

pub struct UserRepository {
    pool: DbPool,
}

fn map_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        username: row.get(1)?,
        role: UserRole::parse(&row.get::<_, String>(2)?).unwrap_or_default(),
        created_at: row.get::<_, String>(3)?.parse::<DateTime<Utc>>().unwrap(),
    })
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub fn get_by_id(&self, user_id: &Uuid) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, role, created_at FROM users WHERE id = ?",
        )?;

        let user = stmt
            .query_row([user_id.to_string()], map_user)
            .optional()?;

        Ok(user)
    }

    /// Get user by username
    pub fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, role, created_at FROM users WHERE username = ?",
        )?;

        let user = stmt.query_row([username], map_user).optional()?;

        Ok(user)
    }

    /// Create a new user
    pub fn create(&self, user: &User) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO users (id, username, role, created_at) VALUES (?, ?, ?, ?)",
            (
                user.id.to_string(),
                &user.username,
                user.role.as_str(),
                user.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to create user")?;
        Ok(())
    }
}
