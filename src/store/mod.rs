//! Remote store seam. The adapter talks to the graph only through
//! [`GraphStore`]; every call may suspend. Search workers obtain a private
//! store through a [`StoreConnector`] so no two tasks share a connection.

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::{
    errors::FollowPathError,
    types::{NodeId, Username},
};

pub use memory::{FollowGraph, MemoryConnector, MemoryFollowStore, StoreCounters};
pub use sqlite::{SqliteConnector, SqliteFollowStore};

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Cheap reachability probe.
    async fn ping(&self) -> Result<(), FollowPathError>;

    async fn lookup_id(&self, username: &str) -> Result<Option<NodeId>, FollowPathError>;

    async fn lookup_username(&self, id: NodeId) -> Result<Option<Username>, FollowPathError>;

    /// `(follower, followed)` rows for every follower in `ids`, in one round trip.
    async fn fetch_following(
        &self,
        ids: &[NodeId],
    ) -> Result<Vec<(NodeId, NodeId)>, FollowPathError>;
}

#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: GraphStore + 'static;

    /// Opens a connection owned by the caller alone.
    async fn connect(&self) -> Result<Self::Store, FollowPathError>;
}

#[async_trait]
impl<S> GraphStore for std::sync::Arc<S>
where
    S: GraphStore + ?Sized,
{
    async fn ping(&self) -> Result<(), FollowPathError> {
        (**self).ping().await
    }

    async fn lookup_id(&self, username: &str) -> Result<Option<NodeId>, FollowPathError> {
        (**self).lookup_id(username).await
    }

    async fn lookup_username(&self, id: NodeId) -> Result<Option<Username>, FollowPathError> {
        (**self).lookup_username(id).await
    }

    async fn fetch_following(
        &self,
        ids: &[NodeId],
    ) -> Result<Vec<(NodeId, NodeId)>, FollowPathError> {
        (**self).fetch_following(ids).await
    }
}
