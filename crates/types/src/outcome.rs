//! Response classification and outcome events.

use crate::ActionKind;
use std::time::Duration;

/// The only status that triggers a local state mutation.
pub const STATUS_OK: u16 = 200;

/// Statuses that count as pipeline failures.
///
/// 500 and 504 mean the server did not process the request correctly; 401
/// means the request never reached a handler.
pub const FAILURE_STATUSES: [u16; 3] = [500, 401, 504];

/// How a response status is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200: reported as success and applied to user state.
    Ok,
    /// Any other non-failure status, e.g. a 400 for insufficient funds.
    /// Reported as success, but no state changes.
    Rejected,
    /// 500, 401 or 504. Reported as failure.
    Failure,
}

impl StatusClass {
    /// Whether the request counts as handled for reporting purposes.
    pub fn is_success(&self) -> bool {
        !matches!(self, StatusClass::Failure)
    }

    /// Whether the business outcome succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, StatusClass::Ok)
    }
}

/// Classify an HTTP status.
pub fn classify_status(status: u16) -> StatusClass {
    if status == STATUS_OK {
        StatusClass::Ok
    } else if FAILURE_STATUSES.contains(&status) {
        StatusClass::Failure
    } else {
        StatusClass::Rejected
    }
}

/// Record of one completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeEvent {
    /// Which operation was issued.
    pub kind: ActionKind,
    /// Aggregated metrics label.
    pub label: &'static str,
    /// Time from send to full response.
    pub latency: Duration,
    /// HTTP status, or `None` if the transport failed.
    pub status: Option<u16>,
    /// Reporting success (see [`StatusClass::is_success`]).
    pub success: bool,
}

impl OutcomeEvent {
    /// Event for a response that carried a status.
    pub fn from_status(kind: ActionKind, status: u16, latency: Duration) -> Self {
        Self {
            kind,
            label: kind.label(),
            latency,
            status: Some(status),
            success: classify_status(status).is_success(),
        }
    }

    /// Event for a request that never produced a response.
    pub fn transport_failure(kind: ActionKind, latency: Duration) -> Self {
        Self {
            kind,
            label: kind.label(),
            latency,
            status: None,
            success: false,
        }
    }
}
