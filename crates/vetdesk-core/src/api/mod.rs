//! Authenticated REST client.
//!
//! The wire is abstracted behind [`ApiTransport`] so the same client runs
//! over HTTP in production and over the in-memory `FakeApi` in tests (behind
//! the `test-support` feature). [`ApiClient`] adds everything above the wire:
//! the session token, JSON encoding, status mapping, page walking and the
//! 401/403 policy.

mod endpoints;
mod error;
#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use endpoints::*;
pub use error::*;
#[cfg(any(test, feature = "test-support"))]
pub use fake::*;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Entity, Page, RecordId};
use crate::session::{SessionContext, SessionHolder};

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Relative to the API base, e.g. `pets/mascotas/5/`
    Path(String),
    /// Absolute URL as returned in a page's `next` link
    Url(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Path(path) => f.write_str(path),
            Target::Url(url) => f.write_str(url),
        }
    }
}

/// A request as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Correlates log lines for one request
    pub request_id: Uuid,
    pub method: Method,
    pub target: Target,
    pub query: Vec<(String, String)>,
    /// Sent as `Authorization: Token <token>`
    pub token: Option<String>,
    /// Sent as JSON with `Content-Type: application/json`
    pub body: Option<Value>,
}

/// Raw response: status code and body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves requests over the wire.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// What to do with the session when the server answers 401 or 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailurePolicy {
    /// Report the error and keep the session
    #[default]
    #[serde(alias = "keep")]
    KeepSession,
    /// Report the error and log out
    #[serde(alias = "logout")]
    ClearSession,
}

/// Query string parameters.
pub type Query = Vec<(String, String)>;

/// Build a [`Query`] from string pairs.
pub fn query<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Query {
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Authenticated client over a transport.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
    session: SessionContext,
    /// Set only under [`AuthFailurePolicy::ClearSession`]
    expire_on_auth_failure: Option<SessionHolder>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        session: &SessionHolder,
        policy: AuthFailurePolicy,
    ) -> Self {
        let expire_on_auth_failure = match policy {
            AuthFailurePolicy::KeepSession => None,
            AuthFailurePolicy::ClearSession => Some(session.clone()),
        };
        Self {
            transport,
            session: session.context(),
            expire_on_auth_failure,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// One page of a collection.
    pub async fn list<E: Entity>(&self, query: &[(String, String)]) -> ApiResult<Page<E>> {
        let response = self
            .execute(
                Method::Get,
                Target::Path(E::RESOURCE.path().to_string()),
                query.to_vec(),
                None,
            )
            .await?;
        decode(&response)
    }

    /// Fetch the page behind a `next` link.
    pub async fn next_page<E: Entity>(&self, next: &str) -> ApiResult<Page<E>> {
        let response = self
            .execute(Method::Get, Target::Url(next.to_string()), Vec::new(), None)
            .await?;
        decode(&response)
    }

    /// Every record of a collection, following `next` links to the end.
    pub async fn list_all<E: Entity>(&self, query: &[(String, String)]) -> ApiResult<Vec<E>> {
        let mut page = self.list::<E>(query).await?;
        let mut records = std::mem::take(&mut page.results);
        let mut visited = Vec::new();

        while let Some(next) = page.next.take().filter(|n| !n.is_empty()) {
            if visited.contains(&next) {
                warn!(resource = %E::RESOURCE, next = %next, "pagination loop detected; stopping");
                break;
            }
            debug!(resource = %E::RESOURCE, next = %next, fetched = records.len(), "following next page");
            page = self.next_page::<E>(&next).await?;
            records.append(&mut page.results);
            visited.push(next);
        }

        Ok(records)
    }

    pub async fn retrieve<E: Entity>(&self, id: &RecordId) -> ApiResult<E> {
        let response = self
            .execute(
                Method::Get,
                Target::Path(E::RESOURCE.item_path(id)),
                Vec::new(),
                None,
            )
            .await?;
        decode(&response)
    }

    /// POST a new record; returns the record as stored.
    pub async fn create<E: Entity>(&self, payload: Value) -> ApiResult<E> {
        let response = self
            .execute(
                Method::Post,
                Target::Path(E::RESOURCE.path().to_string()),
                Vec::new(),
                Some(payload),
            )
            .await?;
        decode(&response)
    }

    /// PUT a full record.
    pub async fn update<E: Entity>(&self, id: &RecordId, payload: Value) -> ApiResult<E> {
        let response = self
            .execute(
                Method::Put,
                Target::Path(E::RESOURCE.item_path(id)),
                Vec::new(),
                Some(payload),
            )
            .await?;
        decode(&response)
    }

    /// PATCH selected fields.
    pub async fn patch<E: Entity>(&self, id: &RecordId, payload: Value) -> ApiResult<E> {
        let response = self
            .execute(
                Method::Patch,
                Target::Path(E::RESOURCE.item_path(id)),
                Vec::new(),
                Some(payload),
            )
            .await?;
        decode(&response)
    }

    /// DELETE a record. Any 2xx counts as success.
    pub async fn delete<E: Entity>(&self, id: &RecordId) -> ApiResult<()> {
        self.execute(
            Method::Delete,
            Target::Path(E::RESOURCE.item_path(id)),
            Vec::new(),
            None,
        )
        .await?;
        Ok(())
    }

    /// Unauthenticated credentials exchange. Status mapping is the caller's.
    pub(crate) async fn send_login(&self, body: Value) -> Result<ApiResponse, TransportError> {
        let request = ApiRequest {
            request_id: Uuid::new_v4(),
            method: Method::Post,
            target: Target::Path(LOGIN_PATH.to_string()),
            query: Vec::new(),
            token: None,
            body: Some(body),
        };
        debug!(request_id = %request.request_id, "sending login request");
        self.transport.send(request).await
    }

    async fn execute(
        &self,
        method: Method,
        target: Target,
        query: Query,
        body: Option<Value>,
    ) -> ApiResult<ApiResponse> {
        let token = self.session.require_token()?;
        let request = ApiRequest {
            request_id: Uuid::new_v4(),
            method,
            target,
            query,
            token: Some(token),
            body,
        };
        let request_id = request.request_id;
        debug!(%request_id, %method, target = %request.target, "sending request");

        let response = self.transport.send(request).await?;
        debug!(%request_id, status = response.status, bytes = response.body.len(), "response received");

        if response.is_success() {
            return Ok(response);
        }

        let err = ApiError::from_status(response.status, &response.body);
        if err.is_auth_failure() {
            if let Some(holder) = &self.expire_on_auth_failure {
                holder.expire();
            }
        }
        Err(err)
    }
}

fn decode<T: DeserializeOwned>(response: &ApiResponse) -> ApiResult<T> {
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}
