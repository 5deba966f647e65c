//! Identity store: user records and credential verification. Accounts are
//! append-only; there is no update or delete path.

use chrono::Utc;
use rusqlite::{params, ErrorCode, Row};

use crate::auth::password;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a user with a freshly hashed credential. The username match is
    /// case-sensitive; a UNIQUE violation folds into DuplicateUsername.
    pub fn register(&self, username: &str, password: &str) -> AppResult<User> {
        let hashed = password::hash(password)?;
        let created_at = Utc::now().to_rfc3339();

        let conn = self.pool.get()?;
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, hashed, created_at],
        );

        match result {
            Ok(_) => Ok(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                password_hash: hashed,
                created_at,
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(AppError::DuplicateUsername)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify a username/password pair. Unknown usernames and wrong
    /// passwords are indistinguishable to the caller.
    pub fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => AppError::InvalidCredentials,
                other => AppError::Database(other),
            })?;

        if !password::verify(password, &user.password_hash) {
            return Err(AppError::InvalidCredentials);
        }
        Ok(user)
    }

    pub fn lookup(&self, user_id: i64) -> AppResult<User> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = ?1",
            params![user_id],
            row_to_user,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound,
            other => AppError::Database(other),
        })
    }

    pub fn find_by_username(&self, username: &str) -> AppResult<User> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound,
            other => AppError::Database(other),
        })
    }
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}
