//! HTTP transport seam for the Books API client
//!
//! The client only needs `request(method, url, headers, body) -> (status, bytes)`.
//! [`ReqwestTransport`] is the production implementation; tests substitute a
//! deterministic fake.

use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

/// Per-request timeout applied to both connect and whole-request phases
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote client error taxonomy
///
/// Closed set: callers can match exhaustively and pick their own message per
/// kind. `HttpStatus` keeps the response body for diagnostics only.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("HTTP status {code}")]
    HttpStatus { code: u16, body: String },

    #[error("Transport completed without an HTTP response")]
    NoResponse,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unknown error ({domain}/{code}): {message}")]
    Unknown {
        domain: String,
        code: i64,
        message: String,
    },
}

impl RemoteError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteError::InvalidUrl(_) => "invalid_url",
            RemoteError::Timeout => "timeout",
            RemoteError::Cancelled => "cancelled",
            RemoteError::HttpStatus { .. } => "http_status",
            RemoteError::NoResponse => "no_response",
            RemoteError::Transport(_) => "transport",
            RemoteError::Unknown { .. } => "unknown",
        }
    }

    /// HTTP status code, for `HttpStatus` only
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RemoteError::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

// Unknown errors compare by domain and code; the message is free text.
impl PartialEq for RemoteError {
    fn eq(&self, other: &Self) -> bool {
        use RemoteError::*;
        match (self, other) {
            (InvalidUrl(a), InvalidUrl(b)) => a == b,
            (Timeout, Timeout) | (Cancelled, Cancelled) | (NoResponse, NoResponse) => true,
            (HttpStatus { code: a, body: ab }, HttpStatus { code: b, body: bb }) => {
                a == b && ab == bb
            }
            (Transport(a), Transport(b)) => a == b,
            (
                Unknown {
                    domain: ad, code: ac, ..
                },
                Unknown {
                    domain: bd, code: bc, ..
                },
            ) => ad == bd && ac == bc,
            _ => false,
        }
    }
}

impl Eq for RemoteError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value matching `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response: status code plus body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Body of a 2xx response, or the matching error
    ///
    /// A status outside the valid HTTP range means the transport did not
    /// produce a real response.
    pub fn into_success_body(self) -> Result<Vec<u8>, RemoteError> {
        if !(100..=599).contains(&self.status) {
            return Err(RemoteError::NoResponse);
        }
        if !(200..300).contains(&self.status) {
            return Err(RemoteError::HttpStatus {
                code: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            });
        }
        Ok(self.body)
    }
}

/// Generic async HTTP transport
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(map_reqwest_error)?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.http_client.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Map a reqwest failure into the taxonomy
fn map_reqwest_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else if err.is_builder() {
        RemoteError::InvalidUrl(err.to_string())
    } else if err.is_status() {
        RemoteError::HttpStatus {
            code: err.status().map(|s| s.as_u16()).unwrap_or_default(),
            body: String::new(),
        }
    } else if err.is_connect()
        || err.is_request()
        || err.is_body()
        || err.is_decode()
        || err.is_redirect()
    {
        RemoteError::Transport(err.to_string())
    } else {
        RemoteError::Unknown {
            domain: "reqwest".to_string(),
            code: 0,
            message: err.to_string(),
        }
    }
}
