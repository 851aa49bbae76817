//! Query source abstraction.
//!
//! The engine never owns a database connection; it is handed something that
//! can run SQL and return a [`QueryResult`]:
//! - Postgres via `sqlx` ([`postgres::PgQuerySource`])
//! - In-memory canned results ([`StaticQuerySource`]) for fixtures and tests

pub mod postgres;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::normalize::QueryResult;

/// Errors raised while running a query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No result registered for query: {0}")]
    UnknownQuery(String),

    #[error("Query failed: {0}")]
    Failed(String),
}

/// Something that can execute the engine's SQL.
#[async_trait]
pub trait QuerySource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &'static str;

    /// Run a query and return its columns and rows.
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError>;

    /// When the backing store last received match data.
    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>, QueryError>;
}

/// Query source answering from a fixed table of SQL → result.
#[derive(Debug, Default)]
pub struct StaticQuerySource {
    results: HashMap<String, Result<QueryResult, String>>,
    last_modified: Option<DateTime<Utc>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticQuerySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `result`.
    pub fn with_result(mut self, sql: &str, result: QueryResult) -> Self {
        self.results.insert(sql.to_string(), Ok(result));
        self
    }

    /// Make `sql` fail with `message`.
    pub fn with_failure(mut self, sql: &str, message: impl Into<String>) -> Self {
        self.results.insert(sql.to_string(), Err(message.into()));
        self
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }

    /// Sleep before answering each query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `execute` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuerySource for StaticQuerySource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        debug!("Static source answering query ({} bytes)", sql.len());
        match self.results.get(sql) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(QueryError::Failed(message.clone())),
            None => Err(QueryError::UnknownQuery(abbreviate(sql))),
        }
    }

    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>, QueryError> {
        Ok(self.last_modified)
    }
}

/// First line of a query, for error messages.
fn abbreviate(sql: &str) -> String {
    let line = sql.trim().lines().next().unwrap_or_default();
    if line.chars().count() > 80 {
        format!("{}...", line.chars().take(80).collect::<String>())
    } else {
        line.to_string()
    }
}
