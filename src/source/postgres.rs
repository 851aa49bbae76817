//! Postgres query source.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::{debug, info, warn};

use super::{QueryError, QuerySource};
use crate::builders::queries;
use crate::config::DatabaseConfig;
use crate::normalize::QueryResult;

/// Runs the engine's SQL against a Postgres pool.
pub struct PgQuerySource {
    pool: PgPool,
}

impl PgQuerySource {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, QueryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;
        info!(
            "Connected to Postgres (max {} connections)",
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuerySource for PgQuerySource {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<Value>> = rows.iter().map(row_values).collect();

        debug!("Query returned {} rows", rows.len());
        Ok(QueryResult::new(columns, rows))
    }

    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>, QueryError> {
        let at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(queries::LAST_MODIFIED)
            .fetch_one(&self.pool)
            .await?;
        Ok(at)
    }
}

fn row_values(row: &PgRow) -> Vec<Value> {
    row.columns()
        .iter()
        .map(|col| decode_cell(row, col.ordinal(), col.type_info().name()))
        .collect()
}

/// Decode one cell into JSON. Undecodable cells become null, which the
/// normalizer treats like a missing value.
fn decode_cell(row: &PgRow, i: usize, type_name: &str) -> Value {
    let value = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(i).ok().flatten().map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(i).ok().flatten().map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(i).ok().flatten().map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(i)
            .ok()
            .flatten()
            .map(|v| Value::from(v as f64)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(i).ok().flatten().map(Value::from),
        "BOOL" => row.try_get::<Option<bool>, _>(i).ok().flatten().map(Value::from),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(i)
            .ok()
            .flatten()
            .map(|d| Value::from(d.format("%Y-%m-%d").to_string())),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(i)
            .ok()
            .flatten()
            .map(|d| Value::from(d.format("%Y-%m-%dT%H:%M:%S").to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(i)
            .ok()
            .flatten()
            .map(|d| Value::from(d.to_rfc3339())),
        other => match row.try_get::<Option<String>, _>(i) {
            Ok(v) => v.map(Value::from),
            Err(e) => {
                warn!("Cannot decode column {} of type {}: {}", i, other, e);
                None
            }
        },
    };
    value.unwrap_or(Value::Null)
}
