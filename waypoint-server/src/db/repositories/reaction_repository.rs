use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use std::collections::HashMap;
use uuid::Uuid;

use waypoint_types::{Reaction, ReactionKind, SubjectType};

use crate::db::DbPool;

/// How a `react` call resolved against the existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// No prior reaction; a row was created.
    Created,
    /// Same kind already recorded; nothing changed. Success, not an error.
    AlreadyReacted,
    /// Opposite kind existed; the single row flipped in place.
    Switched,
}

pub struct ReactionRepository {
    pool: DbPool,
}

impl ReactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Apply a like/dislike. The table's composite primary key keeps the
    /// row count per (subject, user) at 0 or 1; concurrent writers
    /// serialize through the upsert.
    pub fn react(
        &self,
        subject_id: &Uuid,
        subject_type: SubjectType,
        user_id: &Uuid,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT kind FROM reactions
                 WHERE subject_id = ? AND subject_type = ? AND user_id = ?",
                (
                    subject_id.to_string(),
                    subject_type.as_str(),
                    user_id.to_string(),
                ),
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing.as_deref().and_then(ReactionKind::parse) {
            Some(prior) if prior == kind => ReactionOutcome::AlreadyReacted,
            Some(_) => ReactionOutcome::Switched,
            None => ReactionOutcome::Created,
        };

        if outcome != ReactionOutcome::AlreadyReacted {
            tx.execute(
                "INSERT INTO reactions (subject_id, subject_type, user_id, kind, created_at)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(subject_id, subject_type, user_id)
                 DO UPDATE SET kind = excluded.kind, created_at = excluded.created_at",
                (
                    subject_id.to_string(),
                    subject_type.as_str(),
                    user_id.to_string(),
                    kind.as_str(),
                    Utc::now().to_rfc3339(),
                ),
            )
            .context("Failed to upsert reaction")?;
        }

        tx.commit()?;
        Ok(outcome)
    }

    /// Remove a user's reaction, returning the number of rows removed
    pub fn unreact(
        &self,
        subject_id: &Uuid,
        subject_type: SubjectType,
        user_id: &Uuid,
    ) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows_affected = conn
            .execute(
                "DELETE FROM reactions
                 WHERE subject_id = ? AND subject_type = ? AND user_id = ?",
                (
                    subject_id.to_string(),
                    subject_type.as_str(),
                    user_id.to_string(),
                ),
            )
            .context("Failed to delete reaction")?;
        Ok(rows_affected)
    }

    /// Get a user's reaction on a subject
    pub fn get(
        &self,
        subject_id: &Uuid,
        subject_type: SubjectType,
        user_id: &Uuid,
    ) -> Result<Option<Reaction>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT subject_id, subject_type, user_id, kind, created_at
             FROM reactions
             WHERE subject_id = ? AND subject_type = ? AND user_id = ?",
        )?;

        let reaction = stmt
            .query_row(
                (
                    subject_id.to_string(),
                    subject_type.as_str(),
                    user_id.to_string(),
                ),
                |row| {
                    Ok(Reaction {
                        subject_id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                        subject_type: SubjectType::parse(&row.get::<_, String>(1)?).unwrap(),
                        user_id: Uuid::parse_str(&row.get::<_, String>(2)?).unwrap(),
                        kind: ReactionKind::parse(&row.get::<_, String>(3)?).unwrap(),
                        created_at: row.get::<_, String>(4)?.parse::<DateTime<Utc>>().unwrap(),
                    })
                },
            )
            .optional()?;

        Ok(reaction)
    }

    /// Batch-fetch like/dislike counts for a page of subjects, grouped in
    /// one query per subject type. Subjects with no reactions are simply
    /// absent from the map.
    pub fn counts_for_subjects(
        &self,
        subject_type: SubjectType,
        subject_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, (i64, i64)>> {
        if subject_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.pool.get()?;
        let placeholders = vec!["?"; subject_ids.len()].join(",");
        let sql = format!(
            "SELECT subject_id, kind, COUNT(*)
             FROM reactions
             WHERE subject_type = ? AND subject_id IN ({placeholders})
             GROUP BY subject_id, kind"
        );
        let mut stmt = conn.prepare(&sql)?;

        let params = std::iter::once(subject_type.as_str().to_string())
            .chain(subject_ids.iter().map(|id| id.to_string()));

        let mut counts: HashMap<Uuid, (i64, i64)> = HashMap::new();
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            let subject_id: String = row.get(0)?;
            let kind: String = row.get(1)?;
            let count: i64 = row.get(2)?;
            Ok((subject_id, kind, count))
        })?;

        for row in rows {
            let (subject_id, kind, count) = row?;
            let entry = counts
                .entry(Uuid::parse_str(&subject_id).unwrap())
                .or_default();
            match ReactionKind::parse(&kind) {
                Some(ReactionKind::Like) => entry.0 = count,
                Some(ReactionKind::Dislike) => entry.1 = count,
                None => {}
            }
        }

        Ok(counts)
    }

    /// Batch-fetch the viewer's own reactions across a page of subjects
    pub fn user_reactions_for_subjects(
        &self,
        subject_type: SubjectType,
        subject_ids: &[Uuid],
        user_id: &Uuid,
    ) -> Result<HashMap<Uuid, ReactionKind>> {
        if subject_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.pool.get()?;
        let placeholders = vec!["?"; subject_ids.len()].join(",");
        let sql = format!(
            "SELECT subject_id, kind
             FROM reactions
             WHERE subject_type = ? AND user_id = ? AND subject_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;

        let params = [subject_type.as_str().to_string(), user_id.to_string()]
            .into_iter()
            .chain(subject_ids.iter().map(|id| id.to_string()));

        let mut reactions = HashMap::new();
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            let subject_id: String = row.get(0)?;
            let kind: String = row.get(1)?;
            Ok((subject_id, kind))
        })?;

        for row in rows {
            let (subject_id, kind) = row?;
            if let Some(kind) = ReactionKind::parse(&kind) {
                reactions.insert(Uuid::parse_str(&subject_id).unwrap(), kind);
            }
        }

        Ok(reactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup() -> (Database, ReactionRepository) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.seed_test_data().expect("Failed to seed test data");
        let repo = ReactionRepository::new(db.pool.clone());
        (db, repo)
    }

    fn row_count(db: &Database, subject_id: &Uuid, user_id: &Uuid) -> i64 {
        let conn = db.connection().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM reactions WHERE subject_id = ? AND user_id = ?",
            (subject_id.to_string(), user_id.to_string()),
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_react_creates_then_is_idempotent() {
        let (db, repo) = setup();
        let subject = Uuid::new_v4();
        let user = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap();

        let outcome = repo
            .react(&subject, SubjectType::Review, &user, ReactionKind::Like)
            .unwrap();
        assert_eq!(outcome, ReactionOutcome::Created);

        let outcome = repo
            .react(&subject, SubjectType::Review, &user, ReactionKind::Like)
            .unwrap();
        assert_eq!(outcome, ReactionOutcome::AlreadyReacted);

        assert_eq!(row_count(&db, &subject, &user), 1);
        let reaction = repo.get(&subject, SubjectType::Review, &user).unwrap();
        assert_eq!(reaction.unwrap().kind, ReactionKind::Like);
    }

    #[test]
    fn test_react_flips_opposite_kind_in_place() {
        let (db, repo) = setup();
        let subject = Uuid::new_v4();
        let user = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap();

        repo.react(&subject, SubjectType::Review, &user, ReactionKind::Like)
            .unwrap();
        let outcome = repo
            .react(&subject, SubjectType::Review, &user, ReactionKind::Dislike)
            .unwrap();
        assert_eq!(outcome, ReactionOutcome::Switched);

        // Never two rows
        assert_eq!(row_count(&db, &subject, &user), 1);
        let reaction = repo.get(&subject, SubjectType::Review, &user).unwrap();
        assert_eq!(reaction.unwrap().kind, ReactionKind::Dislike);
    }

    #[test]
    fn test_unreact_reports_missing_row() {
        let (_db, repo) = setup();
        let subject = Uuid::new_v4();
        let user = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440003").unwrap();

        let removed = repo.unreact(&subject, SubjectType::Review, &user).unwrap();
        assert_eq!(removed, 0);

        repo.react(&subject, SubjectType::Review, &user, ReactionKind::Dislike)
            .unwrap();
        let removed = repo.unreact(&subject, SubjectType::Review, &user).unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_counts_for_subjects_batches() {
        let (_db, repo) = setup();
        // Seeded: review ...0001 has 2 likes, review ...0002 has 1 dislike
        let liked = Uuid::parse_str("750e8400-e29b-41d4-a716-446655440001").unwrap();
        let disliked = Uuid::parse_str("750e8400-e29b-41d4-a716-446655440002").unwrap();
        let silent = Uuid::new_v4();

        let counts = repo
            .counts_for_subjects(SubjectType::Review, &[liked, disliked, silent])
            .unwrap();

        assert_eq!(counts.get(&liked), Some(&(2, 0)));
        assert_eq!(counts.get(&disliked), Some(&(0, 1)));
        assert_eq!(counts.get(&silent), None);
    }

    #[test]
    fn test_user_reactions_for_subjects() {
        let (_db, repo) = setup();
        let liked = Uuid::parse_str("750e8400-e29b-41d4-a716-446655440001").unwrap();
        let disliked = Uuid::parse_str("750e8400-e29b-41d4-a716-446655440002").unwrap();
        let maya = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap();

        let reactions = repo
            .user_reactions_for_subjects(SubjectType::Review, &[liked, disliked], &maya)
            .unwrap();

        assert_eq!(reactions.get(&liked), Some(&ReactionKind::Like));
        assert_eq!(reactions.get(&disliked), None);
    }
}
