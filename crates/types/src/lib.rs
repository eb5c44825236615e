//! Core types shared by the shopload engine.
//!
//! This crate holds the vocabulary the load generator speaks:
//!
//! - [`ActionKind`]: the API operations a virtual user can perform
//! - [`OutcomeEvent`]: one completed request, as reported to metrics
//! - [`StatusClass`]: how a response status is interpreted
//! - [`Catalog`]: the static list of purchasable items

mod action;
mod catalog;
mod outcome;

pub use action::ActionKind;
pub use catalog::{Catalog, CatalogEntry, CatalogError};
pub use outcome::{classify_status, OutcomeEvent, StatusClass, FAILURE_STATUSES, STATUS_OK};
