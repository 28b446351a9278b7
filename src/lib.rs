//! # ciniiwatch
//!
//! CiNii OpenSearch watcher: a daily backfill crawl plus a weekly
//! new-arrivals check over keyword searches, with dedup against a durable
//! CSV store and email notification of genuinely new items.
//!
//! ## Modules
//!
//! - [`feed`] - CiNii OpenSearch client (Atom)
//! - [`item`] - Candidate item model and identity normalization
//! - [`merge`] - Merge/dedup/filter/cap engine
//! - [`pipeline`] - Request-budgeted rounds and the backfill cursor
//! - [`gate`] - New-vs-historical selection
//! - [`store`] - Tabular store adapter (CSV)
//! - [`notify`] - Email notification
//! - [`schedule`] - Recurring trigger installation
//! - [`config`] / [`props`] - Per-run configuration and the property store
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```bash
//! ciniiwatch props set CINII_APP_ID your-app-id
//! ciniiwatch props set NOTIFY_EMAIL you@example.com
//! ciniiwatch props set STORE_PATH ~/papers.csv
//! ciniiwatch backfill
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod gate;
pub mod item;
pub mod merge;
pub mod notify;
pub mod pipeline;
pub mod props;
pub mod schedule;
pub mod store;

pub use error::{Result, WatchError};
