//! Session holder: the auth token and user profile.
//!
//! [`SessionHolder`] is the only writer of session state. Everything else
//! reads it through a [`SessionContext`], which exposes the token and profile
//! but no way to change them.
//!
//! The session is persisted in a [`SessionStore`] under two keys, `token` and
//! `user`, and restored from it when the holder is created.

mod fingerprint;

pub use fingerprint::token_fingerprint;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, ServerMessage, TransportError};
use crate::db::{Database, DbResult};
use crate::form::is_valid_email;
use crate::models::Role;

/// Storage key of the auth token.
pub const TOKEN_KEY: &str = "token";
/// Storage key of the JSON profile blob.
pub const USER_KEY: &str = "user";

/// Profile of the logged-in user, persisted as `{nombre, rol, email}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "nombre")]
    pub display_name: String,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub profile: Profile,
}

/// Auth state broadcast to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Authenticated(Profile),
    Unauthenticated,
}

/// Persistent key/value storage for the session.
pub trait SessionStore: Send {
    fn get_item(&self, key: &str) -> DbResult<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> DbResult<()>;
    fn remove_item(&mut self, key: &str) -> DbResult<()>;
}

impl SessionStore for Database {
    fn get_item(&self, key: &str) -> DbResult<Option<String>> {
        Database::get_item(self, key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> DbResult<()> {
        Database::set_item(self, key, value)
    }

    fn remove_item(&mut self, key: &str) -> DbResult<()> {
        Database::remove_item(self, key).map(|_| ())
    }
}

/// Non-persistent store, used when no storage path is configured.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store prefilled with `items`.
    pub fn with_items<K: Into<String>, V: Into<String>>(
        items: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SessionStore for MemoryStore {
    fn get_item(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> DbResult<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> DbResult<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// How the user identifies at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Username(String),
    Email(String),
}

impl LoginIdentifier {
    fn field(&self) -> &'static str {
        match self {
            LoginIdentifier::Username(_) => "username",
            LoginIdentifier::Email(_) => "email",
        }
    }

    fn value(&self) -> &str {
        match self {
            LoginIdentifier::Username(v) | LoginIdentifier::Email(v) => v.trim(),
        }
    }
}

/// Login failures, each with the message shown on the login screen.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoginError {
    #[error("Username is required")]
    MissingUsername,

    #[error("Email is required")]
    MissingEmail,

    #[error("Please enter a valid email address (example@domain.com)")]
    InvalidEmail,

    #[error("Password is required")]
    MissingPassword,

    /// 400, with the server's `error` text when present
    #[error("{0}")]
    BadRequest(String),

    #[error("The credentials entered are incorrect")]
    InvalidCredentials,

    #[error("Your account has been deactivated")]
    AccountDisabled,

    #[error("Too many failed attempts. Please wait a few minutes")]
    TooManyAttempts,

    #[error("Login failed. Please try again")]
    Failed(u16),

    #[error("Connection error. Please check your internet connection")]
    Connection(TransportError),

    #[error("Unexpected login response: {0}")]
    UnexpectedResponse(String),
}

impl LoginError {
    /// Map a non-2xx login response.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        match status {
            400 => {
                let message = match ServerMessage::parse(body) {
                    Some(ServerMessage::Error(text)) => text,
                    _ => "Please fill in all fields correctly".to_string(),
                };
                LoginError::BadRequest(message)
            }
            401 => LoginError::InvalidCredentials,
            403 => LoginError::AccountDisabled,
            429 => LoginError::TooManyAttempts,
            other => LoginError::Failed(other),
        }
    }
}

#[derive(Deserialize)]
struct LoginUser {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    nombre: String,
    rol: Role,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user: LoginUser,
}

type Listener = Box<dyn Fn(&AuthState) + Send + Sync>;

struct SessionInner {
    state: RwLock<Option<Session>>,
    store: Mutex<Box<dyn SessionStore>>,
    listeners: Mutex<Vec<Listener>>,
}

/// Single writer of the session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct SessionHolder {
    inner: Arc<SessionInner>,
}

impl SessionHolder {
    /// Create a holder, restoring any session found in `store`.
    ///
    /// A token without a readable profile (or the reverse) is treated as
    /// corrupt: both keys are removed and the holder starts logged out.
    pub fn new(store: impl SessionStore + 'static) -> Self {
        let mut store: Box<dyn SessionStore> = Box::new(store);
        let restored = restore(store.as_mut());
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(restored),
                store: Mutex::new(store),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Holder backed by a [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Read-only view for consumers.
    pub fn context(&self) -> SessionContext {
        SessionContext {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn profile(&self) -> Option<Profile> {
        self.context().profile()
    }

    pub fn is_authenticated(&self) -> bool {
        self.context().token().is_some()
    }

    /// Register a listener for auth state changes.
    pub fn on_change(&self, listener: impl Fn(&AuthState) + Send + Sync + 'static) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Exchange credentials for a token and profile.
    ///
    /// Client-side checks run first; nothing is sent if they fail.
    pub async fn login(
        &self,
        api: &ApiClient,
        identifier: &LoginIdentifier,
        password: &str,
    ) -> Result<Profile, LoginError> {
        match identifier {
            LoginIdentifier::Username(v) if v.trim().is_empty() => {
                return Err(LoginError::MissingUsername)
            }
            LoginIdentifier::Email(v) if v.trim().is_empty() => {
                return Err(LoginError::MissingEmail)
            }
            LoginIdentifier::Email(v) if !is_valid_email(v.trim()) => {
                return Err(LoginError::InvalidEmail)
            }
            _ => {}
        }
        if password.is_empty() {
            return Err(LoginError::MissingPassword);
        }

        let mut body = serde_json::Map::new();
        body.insert(identifier.field().to_string(), identifier.value().into());
        body.insert("password".to_string(), password.into());
        let response = api.send_login(body.into()).await.map_err(|e| {
            warn!(error = %e, "login request failed");
            LoginError::Connection(e)
        })?;

        if !(200..300).contains(&response.status) {
            let err = LoginError::from_status(response.status, &response.body);
            warn!(status = response.status, error = %err, "login rejected");
            return Err(err);
        }

        let parsed: LoginResponse = serde_json::from_slice(&response.body)
            .map_err(|e| LoginError::UnexpectedResponse(e.to_string()))?;
        let display_name = if parsed.user.nombre.trim().is_empty() {
            parsed.user.username
        } else {
            parsed.user.nombre
        };
        let profile = Profile {
            display_name,
            role: parsed.user.rol,
            email: parsed.user.email,
        };

        self.establish(Session {
            token: parsed.token,
            profile: profile.clone(),
        });
        Ok(profile)
    }

    /// Clear the session and its persisted copy.
    pub fn logout(&self) {
        if self.clear() {
            info!("logged out");
        }
    }

    /// Clear the session after the server rejected its token.
    pub(crate) fn expire(&self) {
        if self.clear() {
            warn!("session cleared after authorization failure");
        }
    }

    fn establish(&self, session: Session) {
        {
            let mut store = self.inner.store.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = persist(store.as_mut(), &session) {
                warn!(error = %e, "could not persist session; it will not survive a restart");
            }
        }

        info!(
            token = %token_fingerprint(&session.token),
            role = session.profile.role.as_str(),
            "logged in"
        );
        let state = AuthState::Authenticated(session.profile.clone());
        *self.inner.state.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
        self.notify(&state);
    }

    /// Returns whether a session was present.
    fn clear(&self) -> bool {
        let previous = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        {
            let mut store = self.inner.store.lock().unwrap_or_else(PoisonError::into_inner);
            for key in [TOKEN_KEY, USER_KEY] {
                if let Err(e) = store.remove_item(key) {
                    warn!(key, error = %e, "could not remove persisted session key");
                }
            }
        }

        match previous {
            Some(session) => {
                info!(token = %token_fingerprint(&session.token), "session cleared");
                self.notify(&AuthState::Unauthenticated);
                true
            }
            None => false,
        }
    }

    fn notify(&self, state: &AuthState) {
        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(state);
        }
    }
}

/// Read-only view of the session, handed to every consumer.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

impl SessionContext {
    /// Current token, read synchronously before each request.
    pub fn token(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.profile.clone())
    }

    pub fn role(&self) -> Option<Role> {
        self.profile().map(|p| p.role)
    }

    /// Fail with [`ApiError::NoSession`] when logged out.
    pub fn require_token(&self) -> Result<String, ApiError> {
        self.token().ok_or(ApiError::NoSession)
    }
}

fn persist(store: &mut dyn SessionStore, session: &Session) -> Result<(), String> {
    let user = serde_json::to_string(&session.profile).map_err(|e| e.to_string())?;
    store
        .set_item(TOKEN_KEY, &session.token)
        .map_err(|e| e.to_string())?;
    store.set_item(USER_KEY, &user).map_err(|e| e.to_string())?;
    Ok(())
}

fn restore(store: &mut dyn SessionStore) -> Option<Session> {
    let token = match store.get_item(TOKEN_KEY) {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            warn!(error = %e, "could not read persisted token");
            None
        }
    };
    let user = match store.get_item(USER_KEY) {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "could not read persisted profile");
            None
        }
    };

    match (token, user) {
        (None, None) => None,
        (Some(token), Some(user)) => match serde_json::from_str::<Profile>(&user) {
            Ok(profile) => {
                info!(token = %token_fingerprint(&token), "session restored");
                Some(Session { token, profile })
            }
            Err(e) => {
                warn!(error = %e, "persisted profile is unreadable; clearing session");
                discard(store);
                None
            }
        },
        _ => {
            warn!("persisted session is incomplete; clearing session");
            discard(store);
            None
        }
    }
}

fn discard(store: &mut dyn SessionStore) {
    for key in [TOKEN_KEY, USER_KEY] {
        if let Err(e) = store.remove_item(key) {
            warn!(key, error = %e, "could not remove persisted session key");
        }
    }
}
