//! Replication applier: executes statements built by `rpl-apply-core`
//! against a `MySQL`-compatible destination.
//!
//! [`StatementExecutor`] runs single statements, atomic batches and DDL;
//! [`DdlStateTracker`] follows DDL dispatched in asynchronous mode. Both talk
//! to the destination only through the [`DataSource`] seam.

pub mod config;
pub mod datasources;
pub mod ddl_tracker;
pub mod error;
pub mod executor;
pub mod logging;
pub mod status;
pub mod traits;

pub use config::ApplierConfig;
pub use ddl_tracker::DdlStateTracker;
pub use error::ApplyError;
pub use executor::StatementExecutor;
pub use status::{ApplyContext, MemoryTaskStatus};
pub use traits::{DataSource, DbConnection, TaskStatusSink, TextRow};
