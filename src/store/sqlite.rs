use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params, params_from_iter};

use super::{GraphStore, StoreConnector};
use crate::{
    errors::FollowPathError,
    schema::has_schema,
    types::{NodeId, Username},
};

const FETCH_CHUNK: usize = 500;

/// Read-only store over a SQLite follow-graph file. Queries run on the
/// blocking pool so they never stall the async workers.
#[derive(Clone)]
pub struct SqliteFollowStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFollowStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FollowPathError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FollowPathError::store_unavailable(format!(
                "database {} does not exist",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| FollowPathError::store_unavailable(e.to_string()))?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, FollowPathError> {
        if !has_schema(&conn)? {
            return Err(FollowPathError::store_unavailable(
                "database has no follow-graph schema",
            ));
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, FollowPathError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, FollowPathError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await
        .map_err(|e| FollowPathError::internal(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl GraphStore for SqliteFollowStore {
    async fn ping(&self) -> Result<(), FollowPathError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(|e| FollowPathError::connection(e.to_string()))
        })
        .await
    }

    async fn lookup_id(&self, username: &str) -> Result<Option<NodeId>, FollowPathError> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id FROM profiles WHERE username=?1",
                params![username],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map(|id| id.map(NodeId))
            .map_err(|e| FollowPathError::query(e.to_string()))
        })
        .await
    }

    async fn lookup_username(&self, id: NodeId) -> Result<Option<Username>, FollowPathError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT username FROM profiles WHERE id=?1",
                params![id.0],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map(|name| name.map(Username))
            .map_err(|e| FollowPathError::query(e.to_string()))
        })
        .await
    }

    async fn fetch_following(
        &self,
        ids: &[NodeId],
    ) -> Result<Vec<(NodeId, NodeId)>, FollowPathError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
        self.with_conn(move |conn| {
            let mut rows = Vec::new();
            for chunk in ids.chunks(FETCH_CHUNK) {
                let placeholders = vec!["?"; chunk.len()].join(",");
                let sql = format!(
                    "SELECT follower_id, followed_id FROM follows WHERE follower_id IN ({placeholders}) ORDER BY follower_id, followed_id"
                );
                let mut stmt = conn
                    .prepare(&sql)
                    .map_err(|e| FollowPathError::query(e.to_string()))?;
                let mapped = stmt
                    .query_map(params_from_iter(chunk.iter()), |row| {
                        Ok((NodeId(row.get(0)?), NodeId(row.get(1)?)))
                    })
                    .map_err(|e| FollowPathError::query(e.to_string()))?;
                for row in mapped {
                    rows.push(row.map_err(|e| FollowPathError::query(e.to_string()))?);
                }
            }
            Ok(rows)
        })
        .await
    }
}

/// Opens one private read-only connection per call.
#[derive(Clone, Debug)]
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StoreConnector for SqliteConnector {
    type Store = SqliteFollowStore;

    async fn connect(&self) -> Result<Self::Store, FollowPathError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || SqliteFollowStore::open(path))
            .await
            .map_err(|e| FollowPathError::internal(format!("connect task failed: {e}")))?
    }
}
