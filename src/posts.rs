//! Content store: posts and their denormalized like-counter. The counter is
//! only ever written inside the engagement store's toggle transaction.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use crate::db::models::Post;
use crate::engagement;
use crate::error::{AppError, AppResult};
use crate::media::MediaRef;
use crate::state::DbPool;

/// What remains of a post after its rows are gone: the media path the
/// caller should clean up once the transaction has committed.
#[derive(Debug)]
pub struct DeletedPost {
    pub media_path: Option<String>,
}

pub struct PostRepository {
    pool: DbPool,
}

impl PostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Publish a post. Media, if any, arrives already validated by the
    /// boundary; whitespace-only text counts as absent.
    pub fn create(
        &self,
        author_id: i64,
        text: Option<&str>,
        media: Option<MediaRef>,
    ) -> AppResult<Post> {
        let text = text.map(str::trim).filter(|t| !t.is_empty());
        if text.is_none() && media.is_none() {
            return Err(AppError::EmptyPost);
        }

        let created_at = Utc::now().to_rfc3339();
        let (media_path, media_type) = match &media {
            Some(m) => (Some(m.path.as_str()), Some(m.kind.as_str())),
            None => (None, None),
        };

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (user_id, content, media_path, media_type, created_at, likes) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![author_id, text, media_path, media_type, created_at],
        )?;

        Ok(Post {
            id: conn.last_insert_rowid(),
            user_id: author_id,
            content: text.map(str::to_string),
            media_path: media_path.map(str::to_string),
            media_type: media_type.map(str::to_string),
            created_at,
            likes: 0,
        })
    }

    pub fn get(&self, post_id: i64) -> AppResult<Post> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, user_id, content, media_path, media_type, created_at, likes \
             FROM posts WHERE id = ?1",
            params![post_id],
            row_to_post,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound,
            other => AppError::Database(other),
        })
    }

    /// Owner-only deletion. Likes, comments, and the post row go in one
    /// transaction; the physical media file is the caller's cleanup, issued
    /// after commit and never allowed to fail the deletion.
    pub fn delete(&self, post_id: i64, requester_id: i64) -> AppResult<DeletedPost> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row = tx
            .query_row(
                "SELECT user_id, media_path FROM posts WHERE id = ?1",
                params![post_id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        let (owner_id, media_path) = row.ok_or(AppError::NotFound)?;
        if owner_id != requester_id {
            return Err(AppError::Forbidden);
        }

        engagement::delete_for_post(&tx, post_id)?;
        tx.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
        tx.commit()?;

        Ok(DeletedPost { media_path })
    }

    /// A user's posts, newest first.
    pub fn list_by_author(&self, user_id: i64) -> AppResult<Vec<Post>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, content, media_path, media_type, created_at, likes \
             FROM posts WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let posts = stmt
            .query_map(params![user_id], row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// The feed query: every post joined with its author's username, newest
    /// first.
    pub fn list_all(&self) -> AppResult<Vec<(Post, String)>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.user_id, p.content, p.media_path, p.media_type, p.created_at, p.likes, \
                    u.username \
             FROM posts p JOIN users u ON u.id = p.user_id \
             ORDER BY p.created_at DESC, p.id DESC",
        )?;
        let posts = stmt
            .query_map([], |row| Ok((row_to_post(row)?, row.get::<_, String>(7)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }
}

fn row_to_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        media_path: row.get(3)?,
        media_type: row.get(4)?,
        created_at: row.get(5)?,
        likes: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::engagement::EngagementRepository;
    use crate::media::MediaKind;
    use crate::users::UserRepository;
    use tempfile::TempDir;

    fn test_env() -> (PostRepository, UserRepository, DbPool, TempDir) {
        let tmp = TempDir::new().unwrap();
        let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();
        (
            PostRepository::new(pool.clone()),
            UserRepository::new(pool.clone()),
            pool,
            tmp,
        )
    }

    #[test]
    fn create_text_post() {
        let (posts, users, _pool, _tmp) = test_env();
        let alice = users.register("alice", "pw1").unwrap();

        let post = posts.create(alice.id, Some("hello"), None).unwrap();
        assert_eq!(post.content.as_deref(), Some("hello"));
        assert_eq!(post.likes, 0);
        assert!(post.media_path.is_none());

        let fetched = posts.get(post.id).unwrap();
        assert_eq!(fetched.user_id, alice.id);
    }

    #[test]
    fn create_media_only_post() {
        let (posts, users, _pool, _tmp) = test_env();
        let alice = users.register("alice", "pw1").unwrap();

        let media = MediaRef {
            path: "abc_cat.png".to_string(),
            kind: MediaKind::Image,
        };
        let post = posts.create(alice.id, None, Some(media)).unwrap();
        assert_eq!(post.media_type.as_deref(), Some("image"));
        assert!(post.content.is_none());
    }

    #[test]
    fn empty_post_rejected() {
        let (posts, users, _pool, _tmp) = test_env();
        let alice = users.register("alice", "pw1").unwrap();

        assert!(matches!(
            posts.create(alice.id, None, None),
            Err(AppError::EmptyPost)
        ));
        // Whitespace-only text is still empty
        assert!(matches!(
            posts.create(alice.id, Some("   \n\t"), None),
            Err(AppError::EmptyPost)
        ));
    }

    #[test]
    fn text_is_trimmed() {
        let (posts, users, _pool, _tmp) = test_env();
        let alice = users.register("alice", "pw1").unwrap();
        let post = posts.create(alice.id, Some("  hello  "), None).unwrap();
        assert_eq!(post.content.as_deref(), Some("hello"));
    }

    #[test]
    fn delete_requires_ownership() {
        let (posts, users, _pool, _tmp) = test_env();
        let alice = users.register("alice", "pw1").unwrap();
        let bob = users.register("bob", "pw2").unwrap();

        let post = posts.create(alice.id, Some("mine"), None).unwrap();
        assert!(matches!(
            posts.delete(post.id, bob.id),
            Err(AppError::Forbidden)
        ));
        // Still there
        assert!(posts.get(post.id).is_ok());

        posts.delete(post.id, alice.id).unwrap();
        assert!(matches!(posts.get(post.id), Err(AppError::NotFound)));
    }

    #[test]
    fn delete_missing_post_is_not_found() {
        let (posts, users, _pool, _tmp) = test_env();
        let alice = users.register("alice", "pw1").unwrap();
        assert!(matches!(
            posts.delete(9999, alice.id),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn delete_cascades_to_likes_and_comments() {
        let (posts, users, pool, _tmp) = test_env();
        let alice = users.register("alice", "pw1").unwrap();
        let bob = users.register("bob", "pw2").unwrap();
        let engagement = EngagementRepository::new(pool.clone());

        let post = posts.create(alice.id, Some("hello"), None).unwrap();
        engagement.toggle_like(bob.id, post.id).unwrap();
        engagement.add_comment(post.id, bob.id, "nice").unwrap();

        posts.delete(post.id, alice.id).unwrap();

        let conn = pool.get().unwrap();
        let likes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
                params![post.id],
                |r| r.get(0),
            )
            .unwrap();
        let comments: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
                params![post.id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(likes, 0);
        assert_eq!(comments, 0);
        assert!(engagement.list_comments(post.id).unwrap().is_empty());
    }

    #[test]
    fn delete_returns_media_path_for_cleanup() {
        let (posts, users, _pool, _tmp) = test_env();
        let alice = users.register("alice", "pw1").unwrap();
        let media = MediaRef {
            path: "abc_cat.png".to_string(),
            kind: MediaKind::Image,
        };
        let post = posts.create(alice.id, None, Some(media)).unwrap();

        let deleted = posts.delete(post.id, alice.id).unwrap();
        assert_eq!(deleted.media_path.as_deref(), Some("abc_cat.png"));
    }

    #[test]
    fn listings_are_newest_first() {
        let (posts, users, _pool, _tmp) = test_env();
        let alice = users.register("alice", "pw1").unwrap();
        let bob = users.register("bob", "pw2").unwrap();

        let first = posts.create(alice.id, Some("first"), None).unwrap();
        let second = posts.create(alice.id, Some("second"), None).unwrap();
        let third = posts.create(bob.id, Some("third"), None).unwrap();

        let all = posts.list_all().unwrap();
        let ids: Vec<i64> = all.iter().map(|(p, _)| p.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
        assert_eq!(all[0].1, "bob");

        let mine = posts.list_by_author(alice.id).unwrap();
        let ids: Vec<i64> = mine.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
