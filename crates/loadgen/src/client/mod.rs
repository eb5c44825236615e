//! HTTP transport for the shop API.
//!
//! The engine only talks to the network through [`Transport`], so tests can
//! substitute a scripted implementation and the production client can be
//! swapped without touching the executors.

mod types;

pub use types::{ApiRequest, ApiResponse, AuthRequest, AuthResponse, SendCoinRequest};

use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use std::time::Instant;
use tracing::trace;

/// Capability to issue one API request and observe its response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and wait for the full response.
    ///
    /// Any status is an `Ok`; only failures to get a response at all are
    /// errors.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Failure to obtain a response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the API at `base_url`.
    pub fn new(base_url: impl Into<String>, config: &HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, request.path());

        let builder = match request {
            ApiRequest::Auth { username, password } => self.client.post(url).json(&AuthRequest {
                username,
                password,
            }),
            ApiRequest::SendCoin {
                to_user, amount, ..
            } => self.client.post(url).json(&SendCoinRequest {
                to_user,
                amount: *amount,
            }),
            ApiRequest::Buy { .. } | ApiRequest::Info { .. } => self.client.get(url),
        };

        match request.token() {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let builder = self.build(&request);

        let start = Instant::now();
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        let latency = start.elapsed();

        trace!(path = %request.path(), status, ?latency, "Request completed");

        Ok(ApiResponse::new(status, body.to_vec(), latency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let transport = HttpTransport::new("http://localhost:8080/", &HttpConfig::default()).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_bearer_header() {
        let transport = HttpTransport::new("http://localhost:8080", &HttpConfig::default()).unwrap();
        let request = transport
            .build(&ApiRequest::Info {
                token: "abc".into(),
            })
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:8080/api/info");
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer abc"
        );
    }

    #[test]
    fn test_auth_has_no_bearer() {
        let transport = HttpTransport::new("http://localhost:8080", &HttpConfig::default()).unwrap();
        let request = transport
            .build(&ApiRequest::Auth {
                username: "user1".into(),
                password: "password".into(),
            })
            .build()
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_empty_token_sends_no_bearer() {
        let transport = HttpTransport::new("http://localhost:8080", &HttpConfig::default()).unwrap();
        let request = transport
            .build(&ApiRequest::Info {
                token: String::new(),
            })
            .build()
            .unwrap();

        assert!(request.headers().get(AUTHORIZATION).is_none());
    }
}
