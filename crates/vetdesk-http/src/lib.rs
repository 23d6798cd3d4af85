//! Reqwest-backed transport for [`vetdesk_core::ApiClient`].
//!
//! This crate owns the wire only: URL resolution against the API base,
//! the token header, JSON bodies and the request timeout. Status mapping
//! and session handling stay in the core client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use vetdesk_core::api::{ApiRequest, ApiResponse, Method, Target, TransportError};
use vetdesk_core::{ApiClient, ApiTransport, ClientConfig, SessionHolder};

/// Failures while building the transport.
#[derive(Error, Debug)]
pub enum HttpSetupError {
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("Could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type HttpSetupResult<T> = Result<T, HttpSetupError>;

/// Transport that sends requests over HTTP with one shared `reqwest` client.
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    /// `api_url` is the API root, e.g. `http://localhost:8000/api`.
    pub fn new(api_url: &str, timeout: Duration) -> HttpSetupResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base_url(api_url)?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> HttpSetupResult<Self> {
        Self::new(&config.api_url, config.request_timeout())
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn resolve(&self, target: &Target) -> Result<Url, TransportError> {
        let resolved = match target {
            Target::Path(path) => self.base.join(path.trim_start_matches('/')),
            Target::Url(url) => Url::parse(url),
        };
        resolved.map_err(|e| TransportError::InvalidUrl(format!("{}: {}", target, e)))
    }
}

/// Build an authenticated client over HTTP from configuration.
pub fn connect(config: &ClientConfig, session: &SessionHolder) -> HttpSetupResult<ApiClient> {
    let transport = HttpTransport::from_config(config)?;
    Ok(ApiClient::new(
        Arc::new(transport),
        session,
        config.on_auth_failure,
    ))
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.resolve(&request.target)?;
        debug!(
            request_id = %request.request_id,
            method = %request.method,
            %url,
            "sending request"
        );

        let mut builder = self
            .client
            .request(http_method(request.method), url)
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.token {
            builder = builder.header(AUTHORIZATION, format!("Token {}", token));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(request_id = %request.request_id, status, "response received");
        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// The base always ends in `/` so relative joins keep its last segment.
fn base_url(api_url: &str) -> Result<Url, url::ParseError> {
    let trimmed = api_url.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{}/", trimmed))
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_transport_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_builder() {
        TransportError::InvalidUrl(error.to_string())
    } else {
        TransportError::Connection(error.to_string())
    }
}
