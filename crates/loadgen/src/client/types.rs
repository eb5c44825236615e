//! Types for shop API communication.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body for `POST /api/auth`.
#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response from `POST /api/auth`.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

/// Request body for `POST /api/sendCoin`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCoinRequest<'a> {
    pub to_user: &'a str,
    pub amount: u64,
}

/// One API call, independent of the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    /// Exchange credentials for a bearer token.
    Auth { username: String, password: String },

    /// Send coins to another user.
    SendCoin {
        token: String,
        to_user: String,
        amount: u64,
    },

    /// Buy one item from the catalog.
    Buy { token: String, item: String },

    /// Fetch balance, inventory and history.
    Info { token: String },
}

impl ApiRequest {
    /// HTTP path for this request.
    pub fn path(&self) -> String {
        match self {
            ApiRequest::Auth { .. } => "/api/auth".to_string(),
            ApiRequest::SendCoin { .. } => "/api/sendCoin".to_string(),
            ApiRequest::Buy { item, .. } => format!("/api/buy/{}", item),
            ApiRequest::Info { .. } => "/api/info".to_string(),
        }
    }

    /// Bearer token carried by the request, if any.
    ///
    /// An empty token means the request is sent unauthenticated.
    pub fn token(&self) -> Option<&str> {
        let token = match self {
            ApiRequest::Auth { .. } => return None,
            ApiRequest::SendCoin { token, .. }
            | ApiRequest::Buy { token, .. }
            | ApiRequest::Info { token } => token,
        };
        (!token.is_empty()).then_some(token.as_str())
    }
}

/// A response that made it back over the wire.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
    /// Time from send to full body.
    pub latency: Duration,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>, latency: Duration) -> Self {
        Self {
            status,
            body: body.into(),
            latency,
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
