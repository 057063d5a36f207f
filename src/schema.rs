//! SQLite layout of the follow graph, plus the ingestion helpers used by
//! the `import` command and fixtures. The search engine only reads.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::FollowPathError;

pub fn ensure_schema(conn: &Connection) -> Result<(), FollowPathError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id       INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS follows (
            follower_id INTEGER NOT NULL,
            followed_id INTEGER NOT NULL,
            PRIMARY KEY (follower_id, followed_id)
        );
        CREATE INDEX IF NOT EXISTS idx_follows_follower ON follows(follower_id);
        "#,
    )
    .map_err(|e| FollowPathError::query(e.to_string()))?;
    Ok(())
}

pub fn has_schema(conn: &Connection) -> Result<bool, FollowPathError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('profiles', 'follows')",
            [],
            |row| row.get(0),
        )
        .map_err(|e| FollowPathError::query(e.to_string()))?;
    Ok(count == 2)
}

/// Inserts a profile, returning the id already stored for `username` if any.
pub fn upsert_profile(conn: &Connection, username: &str) -> Result<i64, FollowPathError> {
    if username.trim().is_empty() {
        return Err(FollowPathError::invalid_input("username must be set"));
    }
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM profiles WHERE username=?1",
            params![username],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| FollowPathError::query(e.to_string()))?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO profiles(username) VALUES(?1)",
        params![username],
    )
    .map_err(|e| FollowPathError::query(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_profile_with_id(
    conn: &Connection,
    id: i64,
    username: &str,
) -> Result<(), FollowPathError> {
    conn.execute(
        "INSERT OR REPLACE INTO profiles(id, username) VALUES(?1, ?2)",
        params![id, username],
    )
    .map_err(|e| FollowPathError::query(e.to_string()))?;
    Ok(())
}

pub fn insert_follow(conn: &Connection, follower: i64, followed: i64) -> Result<(), FollowPathError> {
    if follower == followed {
        return Err(FollowPathError::invalid_input("accounts cannot follow themselves"));
    }
    conn.execute(
        "INSERT OR IGNORE INTO follows(follower_id, followed_id) VALUES(?1, ?2)",
        params![follower, followed],
    )
    .map_err(|e| FollowPathError::query(e.to_string()))?;
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphCounts {
    pub profiles: usize,
    pub follows: usize,
}

pub fn graph_counts(conn: &Connection) -> Result<GraphCounts, FollowPathError> {
    let count = |sql: &str| -> Result<usize, FollowPathError> {
        conn.query_row(sql, [], |row| row.get::<_, i64>(0))
            .map(|value| value as usize)
            .map_err(|e| FollowPathError::query(e.to_string()))
    };
    Ok(GraphCounts {
        profiles: count("SELECT COUNT(*) FROM profiles")?,
        follows: count("SELECT COUNT(*) FROM follows")?,
    })
}
