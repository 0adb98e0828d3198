//! Shared state and request-scoped types for the HTTP API.

use rusqlite::Connection;

use crate::db::{DbPool, PooledConnection};
use crate::token::TokenService;

use super::error::ApiError;

/// Shared context handed to every middleware and handler.
///
/// Middleware reads it from `Extension<ApiContext>`, handlers from
/// `State<ApiContext>`. Cloning is cheap.
#[derive(Clone)]
pub struct ApiContext {
    pub db: DbPool,
    pub tokens: TokenService,
}

impl ApiContext {
    pub fn new(db: DbPool, tokens: TokenService) -> Self {
        Self { db, tokens }
    }

    /// Check out a connection, waiting at most the pool timeout.
    pub async fn conn(&self) -> Result<PooledConnection, ApiError> {
        Ok(self.db.acquire().await?)
    }

    /// Check out a connection and run `work` on the blocking thread pool.
    ///
    /// Store access and password hashing block, so they never run on the
    /// async workers.
    pub async fn blocking<T, E, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<ApiError> + Send + 'static,
    {
        let conn = self.conn().await?;
        tokio::task::spawn_blocking(move || work(&*conn))
            .await
            .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
            .map_err(Into::into)
    }
}
