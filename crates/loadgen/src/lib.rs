//! Shopload virtual-user engine
//!
//! Simulates many concurrent shop customers against the REST API to measure
//! throughput and error rates under load.
//!
//! # Architecture
//!
//! - **Identity pool**: shared, lock-guarded registry of usernames, used to
//!   pick transfer recipients
//! - **Virtual users**: one tokio task each, owning their session state
//! - **Task scheduler**: per-user weighted random task choice with
//!   think-time pacing, reproducible from a seed
//! - **Executors**: guarded API actions that classify responses and emit
//!   outcome events
//! - **Runner**: spawns users at a fixed rate and aggregates outcomes into a
//!   report
//!
//! # Example
//!
//! ```ignore
//! use shopload_loadgen::{LoadConfig, LoadRunner};
//! use std::time::Duration;
//!
//! let config = LoadConfig::new("http://localhost:8080")
//!     .with_users(500)
//!     .with_spawn_rate(50.0);
//!
//! let runner = LoadRunner::new(config)?;
//! let report = runner.run_for(Duration::from_secs(60)).await;
//! report.print();
//! ```

pub mod client;
pub mod config;
pub mod executor;
pub mod identities;
pub mod metrics;
pub mod runner;
pub mod scheduler;
pub mod user;

#[cfg(test)]
mod testing;

pub use client::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};
pub use config::{ConfigError, HttpConfig, LoadConfig, SessionConfig, TaskWeights, ThinkTime};
pub use executor::{ActionExecutor, Execution};
pub use identities::IdentityPool;
pub use metrics::{LabelReport, MetricsCollector, RunReport, UserTotals};
pub use runner::{LoadRunner, RunError};
pub use scheduler::{Task, TaskScheduler};
pub use user::{UserState, UserSummary, VirtualUser};

pub use shopload_types::{ActionKind, Catalog, CatalogEntry, OutcomeEvent, StatusClass};
