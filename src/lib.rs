//! # CS Night Stats
//!
//! Counter-Strike community night stats and All-Stars league standings.
//!
//! ## Architecture
//!
//! - **normalize**: Result-set access by column name, ISO date keys
//! - **source**: Query sources (Postgres, static fixtures)
//! - **builders**: One pure builder per JSON artifact, plus their SQL
//! - **generate**: Single-flight generation coordinator
//! - **standings**: All-Stars league scoring and ranking
//! - **seasons**: Season starts and date windows
//! - **models**: Artifact, league and season data structures
//! - **storage**: Snapshot files and input documents in the data dir
//! - **pipeline**: Shared glue for the CLI and the API
//! - **api**: REST API endpoints
//! - **calculate**: Numeric helpers
//! - **config**: Configuration loading and validation

pub mod api;
pub mod builders;
pub mod calculate;
pub mod config;
pub mod generate;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod seasons;
pub mod source;
pub mod standings;
pub mod storage;

pub use models::*;
