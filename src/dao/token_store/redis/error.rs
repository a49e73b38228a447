//! Error types shared by the Redis token store.

use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`RedisDaoError`] failures.
pub type RedisResult<T> = Result<T, RedisDaoError>;

/// Failures that can occur while interacting with Redis.
#[derive(Debug, Error)]
pub enum RedisDaoError {
    /// The connection URL was rejected by the client.
    #[error("invalid Redis URL")]
    InvalidUrl {
        /// Underlying error.
        #[source]
        source: redis::RedisError,
    },
    /// Establishing the managed connection failed.
    #[error("failed to connect to Redis")]
    Connect {
        /// Underlying error.
        #[source]
        source: redis::RedisError,
    },
    /// A command failed once the connection was up.
    #[error("Redis command `{command}` failed")]
    Command {
        /// Redis command that failed.
        command: &'static str,
        /// Underlying error.
        #[source]
        source: redis::RedisError,
    },
}

impl From<RedisDaoError> for StorageError {
    fn from(err: RedisDaoError) -> Self {
        let message = err.to_string();
        StorageError::unavailable(message, err)
    }
}
