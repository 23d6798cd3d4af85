//! API error types and server error body parsing.

use serde_json::Value;
use thiserror::Error;

/// Failure below HTTP: the request never produced a status code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors from authenticated API calls.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No token; the request was never sent
    #[error("No active session")]
    NoSession,

    #[error("Connection error: {0}")]
    Transport(#[from] TransportError),

    /// Non-2xx response
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        server: Option<ServerMessage>,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Build a status error from a response body.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let server = ServerMessage::parse(body);
        let message = match &server {
            Some(parsed) => parsed.summary(),
            None => format!("Request failed with status {}", status),
        };
        ApiError::Status {
            status,
            message,
            server,
        }
    }

    /// Message for the screen's error area.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NoSession => "No active session. Please log in.".to_string(),
            ApiError::Transport(_) => "Connection error. Please try again.".to_string(),
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Decode(_) => "The server sent an unexpected response.".to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401 or 403.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// Messages for one field from a structured error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

/// A structured 4xx error body.
///
/// Recognized shapes:
/// - `{"detail": "..."}`
/// - `{"error": "..."}` and `{"error": "...", "mensaje": "..."}`
/// - `{"error": "...", "detalles": {"field": ["..."]}}`
/// - `{"field": ["...", ...], ...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Detail(String),
    Error(String),
    Fields(Vec<FieldError>),
}

impl ServerMessage {
    /// Parse a response body. Returns `None` for empty or non-object bodies.
    pub fn parse(body: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(body).ok()?;
        let object = value.as_object()?;

        if let Some(details) = object.get("detalles").and_then(Value::as_object) {
            let fields = collect_fields(details);
            if !fields.is_empty() {
                return Some(ServerMessage::Fields(fields));
            }
        }
        if let Some(message) = object.get("mensaje").and_then(Value::as_str) {
            return Some(ServerMessage::Error(message.to_string()));
        }
        if let Some(error) = object.get("error").and_then(Value::as_str) {
            return Some(ServerMessage::Error(error.to_string()));
        }
        if let Some(detail) = object.get("detail").and_then(Value::as_str) {
            return Some(ServerMessage::Detail(detail.to_string()));
        }

        let fields = collect_fields(object);
        if fields.is_empty() {
            None
        } else {
            Some(ServerMessage::Fields(fields))
        }
    }

    /// Single line for the error area.
    pub fn summary(&self) -> String {
        match self {
            ServerMessage::Detail(text) | ServerMessage::Error(text) => text.clone(),
            ServerMessage::Fields(fields) => fields
                .iter()
                .map(|f| format!("{}: {}", f.field, f.messages.join(", ")))
                .collect::<Vec<_>>()
                .join(". "),
        }
    }

    /// Messages for one field, if the body was field-scoped.
    pub fn field(&self, name: &str) -> Option<&[String]> {
        match self {
            ServerMessage::Fields(fields) => fields
                .iter()
                .find(|f| f.field == name)
                .map(|f| f.messages.as_slice()),
            _ => None,
        }
    }
}

fn collect_fields(object: &serde_json::Map<String, Value>) -> Vec<FieldError> {
    object
        .iter()
        .filter_map(|(field, value)| {
            let messages = match value {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
                _ => return None,
            };
            Some(FieldError {
                field: field.clone(),
                messages,
            })
        })
        .collect()
}
