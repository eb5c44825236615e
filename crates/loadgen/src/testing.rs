//! Scripted transport for unit tests.

use crate::client::{ApiRequest, ApiResponse, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// Transport that answers from a closure and records every request.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with `status`; a 200 login carries a token.
    pub fn always(status: u16) -> Self {
        Self::with_auth_status(status, status)
    }

    /// Answer logins with `auth` and everything else with `other`.
    pub fn with_auth_status(auth: u16, other: u16) -> Self {
        Self::new(move |request| match request {
            ApiRequest::Auth { username, .. } if auth == 200 => {
                let body = format!(r#"{{"token":"token-{}"}}"#, username);
                Ok(ApiResponse::new(200, body.into_bytes(), Duration::from_micros(50)))
            }
            ApiRequest::Auth { .. } => Ok(ApiResponse::new(auth, Vec::new(), Duration::ZERO)),
            _ => Ok(ApiResponse::new(other, Vec::new(), Duration::from_micros(50))),
        })
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let response = (self.handler)(&request);
        self.requests.lock().push(request);
        response
    }
}
