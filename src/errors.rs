use thiserror::Error;

/// Error type for follow-graph path search.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FollowPathError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("cancelled: {0}")]
    Cancelled(String),
    #[error("internal search error: {0}")]
    InternalSearch(String),
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("fault injected: {0}")]
    FaultInjected(String),
}

impl FollowPathError {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        FollowPathError::NotFound(msg.into())
    }

    pub fn store_unavailable<T: Into<String>>(msg: T) -> Self {
        FollowPathError::StoreUnavailable(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        FollowPathError::Timeout(msg.into())
    }

    pub fn cancelled<T: Into<String>>(msg: T) -> Self {
        FollowPathError::Cancelled(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        FollowPathError::InternalSearch(msg.into())
    }

    pub fn connection<T: Into<String>>(msg: T) -> Self {
        FollowPathError::ConnectionError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        FollowPathError::QueryError(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        FollowPathError::InvalidInput(msg.into())
    }

    pub fn fault_injection<T: Into<String>>(msg: T) -> Self {
        FollowPathError::FaultInjected(msg.into())
    }

    /// Raw store failures that a retry may clear.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FollowPathError::ConnectionError(_)
                | FollowPathError::QueryError(_)
                | FollowPathError::FaultInjected(_)
                | FollowPathError::StoreUnavailable(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FollowPathError::Cancelled(_))
    }

    /// Human-readable text for result records. `NotFound` carries its own
    /// phrasing, everything else keeps the variant prefix.
    pub fn diagnostic(&self) -> String {
        match self {
            FollowPathError::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
