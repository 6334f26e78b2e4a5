use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use std::collections::HashMap;
use uuid::Uuid;

use waypoint_types::{Comment, SubjectType};

use crate::db::DbPool;

pub struct CommentRepository {
    pool: DbPool,
}

fn map_comment(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        subject_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
        subject_type: SubjectType::parse(&row.get::<_, String>(2)?).unwrap(),
        author_id: Uuid::parse_str(&row.get::<_, String>(3)?).unwrap(),
        author_username: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get::<_, String>(6)?.parse::<DateTime<Utc>>().unwrap(),
    })
}

impl CommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a new comment. Content validation happens in the service
    /// layer; the 500-char CHECK is the storage backstop.
    pub fn create(&self, comment: &Comment) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO comments (id, subject_id, subject_type, author_id, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                comment.id.to_string(),
                comment.subject_id.to_string(),
                comment.subject_type.as_str(),
                comment.author_id.to_string(),
                &comment.content,
                comment.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to create comment")?;
        Ok(())
    }

    pub fn get_by_id(&self, comment_id: &Uuid) -> Result<Option<Comment>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.subject_id, c.subject_type, c.author_id, u.username, c.content, c.created_at
             FROM comments c
             JOIN users u ON u.id = c.author_id
             WHERE c.id = ?",
        )?;

        let comment = stmt
            .query_row([comment_id.to_string()], map_comment)
            .optional()?;

        Ok(comment)
    }

    /// List a subject's comment thread.
    ///
    /// Ordering is intentionally asymmetric: review threads read
    /// oldest-first, badge-announcement threads newest-first. Inherited
    /// product behavior, preserved as-is.
    pub fn list_for_subject(
        &self,
        subject_id: &Uuid,
        subject_type: SubjectType,
    ) -> Result<Vec<Comment>> {
        let order = match subject_type {
            SubjectType::Review => "ASC",
            SubjectType::BadgeNotification => "DESC",
        };

        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT c.id, c.subject_id, c.subject_type, c.author_id, u.username, c.content, c.created_at
             FROM comments c
             JOIN users u ON u.id = c.author_id
             WHERE c.subject_id = ? AND c.subject_type = ?
             ORDER BY c.created_at {order}"
        );
        let mut stmt = conn.prepare(&sql)?;

        let comments = stmt
            .query_map(
                (subject_id.to_string(), subject_type.as_str()),
                map_comment,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }

    /// Delete a comment, returning the number of rows removed.
    /// Authorization is decided by the caller's policy, not here.
    pub fn delete(&self, comment_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows_affected = conn
            .execute(
                "DELETE FROM comments WHERE id = ?",
                [comment_id.to_string()],
            )
            .context("Failed to delete comment")?;
        Ok(rows_affected)
    }

    /// Batch-fetch comment counts for a page of subjects in one query
    pub fn counts_for_subjects(
        &self,
        subject_type: SubjectType,
        subject_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>> {
        if subject_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.pool.get()?;
        let placeholders = vec!["?"; subject_ids.len()].join(",");
        let sql = format!(
            "SELECT subject_id, COUNT(*)
             FROM comments
             WHERE subject_type = ? AND subject_id IN ({placeholders})
             GROUP BY subject_id"
        );
        let mut stmt = conn.prepare(&sql)?;

        let params = std::iter::once(subject_type.as_str().to_string())
            .chain(subject_ids.iter().map(|id| id.to_string()));

        let mut counts = HashMap::new();
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            let subject_id: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((subject_id, count))
        })?;

        for row in rows {
            let (subject_id, count) = row?;
            counts.insert(Uuid::parse_str(&subject_id).unwrap(), count);
        }

        Ok(counts)
    }
}
