//! Engagement store: likes (at most one per user per post, toggle
//! semantics) and comments. Every toggle runs inside one immediate
//! transaction so the like row and the post's counter commit together.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;

use crate::db::models::Comment;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// The authoritative result of a toggle: the new state and the counter as
/// read back inside the same transaction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: i64,
}

pub struct EngagementRepository {
    pool: DbPool,
}

impl EngagementRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Flip the (user, post) like state. The read-decide-write sequence is
    /// serialized by the immediate transaction, so two racing toggles on the
    /// same pair cannot both observe "no like yet". A UNIQUE collision on
    /// the insert is folded into "already liked" rather than surfaced.
    pub fn toggle_like(&self, user_id: i64, post_id: i64) -> AppResult<LikeOutcome> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.query_row("SELECT id FROM posts WHERE id = ?1", params![post_id], |_| {
            Ok(())
        })
        .optional()?
        .ok_or(AppError::NotFound)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM likes WHERE user_id = ?1 AND post_id = ?2",
                params![user_id, post_id],
                |row| row.get(0),
            )
            .optional()?;

        let liked = match existing {
            Some(like_id) => {
                tx.execute("DELETE FROM likes WHERE id = ?1", params![like_id])?;
                tx.execute(
                    "UPDATE posts SET likes = likes - 1 WHERE id = ?1",
                    params![post_id],
                )?;
                false
            }
            None => {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
                    params![user_id, post_id, Utc::now().to_rfc3339()],
                )?;
                if inserted == 1 {
                    tx.execute(
                        "UPDATE posts SET likes = likes + 1 WHERE id = ?1",
                        params![post_id],
                    )?;
                }
                true
            }
        };

        // Read back the counter before commit; the caller never trusts a
        // client-side increment
        let likes: i64 = tx.query_row(
            "SELECT likes FROM posts WHERE id = ?1",
            params![post_id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(LikeOutcome { liked, likes })
    }

    /// Attach a comment to an existing post. Content is trimmed; blank
    /// content is rejected before any write.
    pub fn add_comment(&self, post_id: i64, user_id: i64, content: &str) -> AppResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::EmptyComment);
        }

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.query_row("SELECT id FROM posts WHERE id = ?1", params![post_id], |_| {
            Ok(())
        })
        .optional()?
        .ok_or(AppError::NotFound)?;

        let created_at = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO comments (post_id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![post_id, user_id, content, created_at],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Comment {
            id,
            post_id,
            user_id,
            content: content.to_string(),
            created_at,
        })
    }

    /// A post's comments in chronological reading order (oldest first),
    /// author-resolved.
    pub fn list_comments(&self, post_id: i64) -> AppResult<Vec<(Comment, String)>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.post_id, c.user_id, c.content, c.created_at, u.username \
             FROM comments c JOIN users u ON u.id = c.user_id \
             WHERE c.post_id = ?1 ORDER BY c.created_at ASC, c.id ASC",
        )?;
        let comments = stmt
            .query_map(params![post_id], |row| {
                Ok((
                    Comment {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        user_id: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    },
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    /// Standalone cascade helper. Idempotent: deleting engagement for a post
    /// with none is a no-op.
    pub fn delete_by_post(&self, post_id: i64) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        delete_for_post(&tx, post_id)?;
        tx.commit()?;
        Ok(())
    }

    /// The set of post ids this user has liked, for feed assembly.
    pub fn liked_post_ids(&self, user_id: i64) -> AppResult<HashSet<i64>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT post_id FROM likes WHERE user_id = ?1")?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }
}

/// Delete all engagement rows referencing a post. Runs on the caller's
/// connection so the post-deletion cascade stays in a single transaction.
pub(crate) fn delete_for_post(conn: &Connection, post_id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM likes WHERE post_id = ?1", params![post_id])?;
    conn.execute("DELETE FROM comments WHERE post_id = ?1", params![post_id])?;
    Ok(())
}
