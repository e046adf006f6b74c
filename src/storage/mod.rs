//! Metric persistence
//!
//! The metrics log is the only persistent state of the monitor: a text file
//! with one JSON-encoded [`MetricRecord`] per line.
//!
//! ## Guarantees
//!
//! - **Append-only**: records are never rewritten or deleted
//! - **Time-ordered**: one append per collection tick, in tick order
//! - **Uniform**: every record carries one entry per configured instance and
//!   one value (possibly `null`) per configured stat
//!
//! ## Usage
//!
//! ```no_run
//! use instance_watch::storage::{MetricRecord, MetricsLog};
//!
//! # async fn example() -> instance_watch::storage::StorageResult<()> {
//! let log = MetricsLog::new("./metrics.jsonl");
//! log.append(&MetricRecord::new(chrono::Utc::now())).await?;
//! let history = log.read_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod log;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use log::MetricsLog;
pub use schema::{InstanceMetrics, MetricRecord};
