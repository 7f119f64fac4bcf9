//! SQLite execution engine for alacarte.
//!
//! [`SqliteEngine`] implements [`alacarte_query::QueryEngine`] on top of
//! `tokio-rusqlite`: every statement runs on the connection's background
//! thread and result rows are materialized in projection order.
//!
//! # Example
//!
//! ```rust,no_run
//! use alacarte_sqlite::{SqliteConfig, SqliteEngine};
//!
//! # async fn run() -> Result<(), alacarte_sqlite::SqliteError> {
//! let engine = SqliteEngine::open(SqliteConfig::from_url("sqlite://./app.db")?).await?;
//! engine
//!     .execute_batch("CREATE TABLE IF NOT EXISTS authors (id INTEGER PRIMARY KEY, name TEXT)")
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

pub use config::{DatabasePath, SqliteConfig};
pub use engine::SqliteEngine;
pub use error::{SqliteError, SqliteResult};
