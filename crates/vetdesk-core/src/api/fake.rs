//! In-memory REST fake for tests and demos.
//!
//! Behaves like the clinic API closely enough to drive full screen flows:
//! assigns ids and timestamps, fills the server-computed display names,
//! filters lists by query parameters, paginates with absolute `next` links,
//! answers the login endpoint and refuses status changes out of terminal
//! appointment states. Requests are recorded, and failures can be injected
//! for the next matching request.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{
    ApiClient, ApiRequest, ApiResponse, ApiTransport, AuthFailurePolicy, Method, Resource, Target,
    TransportError, LOGIN_PATH,
};
use crate::models::{RecordId, Role};
use crate::session::{MemoryStore, SessionHolder, TOKEN_KEY, USER_KEY};

/// Base URL the fake pretends to live at.
pub const FAKE_BASE_URL: &str = "http://fake.local/api/";

const DEFAULT_PAGE_SIZE: usize = 10;

/// Server-computed name fields: (id field, name field, source collection, source name fields).
const DERIVED_NAMES: &[(&str, &str, Resource, &[&str])] = &[
    ("propietario", "propietario_nombre", Resource::Clients, &["nombre"]),
    ("cliente", "cliente_nombre", Resource::Clients, &["nombre"]),
    ("mascota", "mascota_nombre", Resource::Pets, &["nombre"]),
    ("veterinario", "veterinario_nombre", Resource::Users, &["first_name", "last_name"]),
];

enum Injected {
    Status(u16, Value),
    Disconnect,
}

struct Account {
    username: String,
    email: String,
    password: String,
    active: bool,
    user: Value,
}

#[derive(Default)]
struct FakeState {
    collections: HashMap<&'static str, Vec<Value>>,
    next_id: u64,
    requests: Vec<ApiRequest>,
    failures: VecDeque<(Option<Method>, Injected)>,
    accounts: Vec<Account>,
}

/// In-memory implementation of [`ApiTransport`].
pub struct FakeApi {
    state: Mutex<FakeState>,
    page_size: usize,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Records per list page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Store a record directly, as if created through the API.
    pub fn seed(&self, resource: Resource, record: Value) -> RecordId {
        let mut state = self.lock();
        state.insert(resource, record)
    }

    /// Current contents of a collection.
    pub fn records(&self, resource: Resource) -> Vec<Value> {
        self.lock()
            .collections
            .get(resource.path())
            .cloned()
            .unwrap_or_default()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Requests received with the given method.
    pub fn requests_with(&self, method: Method) -> Vec<ApiRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    /// Answer the next request with `method` with `status` and `body`.
    pub fn fail_next(&self, method: Method, status: u16, body: Value) {
        self.lock()
            .failures
            .push_back((Some(method), Injected::Status(status, body)));
    }

    /// Drop the next request of any kind at the transport level.
    pub fn disconnect_next(&self) {
        self.lock().failures.push_back((None, Injected::Disconnect));
    }

    /// Register a login account and return its token.
    ///
    /// `user` is the user object returned on success.
    pub fn add_account(&self, username: &str, email: &str, password: &str, user: Value) -> String {
        let mut state = self.lock();
        state.accounts.push(Account {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            active: true,
            user,
        });
        token_for(username)
    }

    /// A client already signed in as `role`, session held in memory.
    pub fn signed_in(
        self: &Arc<Self>,
        role: Role,
        policy: AuthFailurePolicy,
    ) -> (SessionHolder, ApiClient) {
        let profile = json!({"nombre": "Test User", "rol": role, "email": "test@clinic.example"});
        let store = MemoryStore::with_items([
            (TOKEN_KEY, token_for("test")),
            (USER_KEY, profile.to_string()),
        ]);
        let holder = SessionHolder::new(store);
        let api = ApiClient::new(Arc::clone(self) as Arc<dyn ApiTransport>, &holder, policy);
        (holder, api)
    }

    /// Deactivate an account; its logins answer 403.
    pub fn deactivate(&self, username: &str) {
        let mut state = self.lock();
        for account in state.accounts.iter_mut().filter(|a| a.username == username) {
            account.active = false;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.lock();
        let (path, mut query) = split_target(&request.target);
        query.extend(request.query.iter().cloned());

        if path == LOGIN_PATH {
            return state.login(request.body.as_ref());
        }

        let Some((resource, id)) = route(&path) else {
            return respond(404, json!({"detail": "Not found."}));
        };

        match (request.method, id) {
            (Method::Get, None) => state.list(resource, &path, &query, self.page_size),
            (Method::Get, Some(id)) => match state.find(resource, &id) {
                Some(record) => respond(200, record.clone()),
                None => not_found(),
            },
            (Method::Post, None) => {
                let body = request.body.clone().unwrap_or(Value::Null);
                let id = state.insert(resource, body);
                match state.find(resource, &id) {
                    Some(record) => respond(201, record.clone()),
                    None => not_found(),
                }
            }
            (Method::Put, Some(id)) => state.replace(resource, &id, request.body.as_ref(), false),
            (Method::Patch, Some(id)) => state.replace(resource, &id, request.body.as_ref(), true),
            (Method::Delete, Some(id)) => {
                let records = state.collections.entry(resource.path()).or_default();
                let before = records.len();
                records.retain(|r| record_id(r).as_ref() != Some(&id));
                if records.len() < before {
                    if resource == Resource::Users {
                        state.detach_veterinarian(&id);
                    }
                    ApiResponse {
                        status: 204,
                        body: Vec::new(),
                    }
                } else {
                    not_found()
                }
            }
            _ => respond(405, json!({"detail": "Method not allowed."})),
        }
    }
}

#[async_trait]
impl ApiTransport for FakeApi {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let injected = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            let position = state
                .failures
                .iter()
                .position(|(method, _)| method.map_or(true, |m| m == request.method));
            position.and_then(|i| state.failures.remove(i))
        };

        match injected {
            Some((_, Injected::Disconnect)) => {
                Err(TransportError::Connection("connection refused".to_string()))
            }
            Some((_, Injected::Status(status, body))) => Ok(respond(status, body)),
            None => Ok(self.handle(&request)),
        }
    }
}

impl FakeState {
    fn insert(&mut self, resource: Resource, record: Value) -> RecordId {
        self.next_id += 1;
        let id = self.next_id;
        let mut object = match record {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        object.insert("id".into(), json!(id));
        object.insert("creado_en".into(), json!(chrono::Utc::now().to_rfc3339()));
        if resource == Resource::Pets && !object.contains_key("sexo") {
            object.insert("sexo".into(), json!("Desconocido"));
        }
        if resource == Resource::Appointments && !object.contains_key("estado") {
            object.insert("estado".into(), json!("PENDIENTE"));
        }
        if resource == Resource::Users {
            object.remove("password");
            let full = format!(
                "{} {}",
                object.get("first_name").and_then(Value::as_str).unwrap_or(""),
                object.get("last_name").and_then(Value::as_str).unwrap_or("")
            );
            object.insert("nombre".into(), json!(full.trim()));
        }
        let mut value = Value::Object(object);
        self.fill_names(&mut value);
        self.collections
            .entry(resource.path())
            .or_default()
            .push(value);
        RecordId::from(id)
    }

    /// Deleted users leave `veterinario: null` behind on appointments and records.
    fn detach_veterinarian(&mut self, user: &RecordId) {
        for resource in [Resource::Appointments, Resource::MedicalRecords] {
            let Some(records) = self.collections.get_mut(resource.path()) else {
                continue;
            };
            for record in records.iter_mut() {
                let Some(object) = record.as_object_mut() else {
                    continue;
                };
                let assigned = object
                    .get("veterinario")
                    .is_some_and(|v| scalar_text(v) == user.as_str());
                if assigned {
                    object.insert("veterinario".into(), Value::Null);
                    object.insert("veterinario_nombre".into(), Value::Null);
                }
            }
        }
    }

    fn find(&self, resource: Resource, id: &RecordId) -> Option<&Value> {
        self.collections
            .get(resource.path())?
            .iter()
            .find(|r| record_id(r).as_ref() == Some(id))
    }

    fn replace(
        &mut self,
        resource: Resource,
        id: &RecordId,
        body: Option<&Value>,
        partial: bool,
    ) -> ApiResponse {
        let Some(existing) = self.find(resource, id).cloned() else {
            return not_found();
        };
        let Some(Value::Object(changes)) = body.cloned() else {
            return respond(400, json!({"detail": "Expected a JSON object."}));
        };

        if resource == Resource::Appointments && changes.contains_key("estado") {
            let current = existing.get("estado").and_then(Value::as_str).unwrap_or("");
            if matches!(current, "COMPLETADA" | "CANCELADA") {
                return respond(
                    400,
                    json!({"error": "No se puede cambiar el estado de una cita completada o cancelada"}),
                );
            }
        }

        let mut object = if partial {
            existing.as_object().cloned().unwrap_or_default()
        } else {
            let mut kept = Map::new();
            for key in ["id", "creado_en"] {
                if let Some(v) = existing.get(key) {
                    kept.insert(key.to_string(), v.clone());
                }
            }
            kept
        };
        for (key, value) in changes {
            if key != "id" && key != "creado_en" && key != "password" {
                object.insert(key, value);
            }
        }

        let mut updated = Value::Object(object);
        self.fill_names(&mut updated);
        if let Some(records) = self.collections.get_mut(resource.path()) {
            for record in records.iter_mut() {
                if record_id(record).as_ref() == Some(id) {
                    *record = updated.clone();
                }
            }
        }
        respond(200, updated)
    }

    fn list(
        &self,
        resource: Resource,
        path: &str,
        query: &[(String, String)],
        page_size: usize,
    ) -> ApiResponse {
        let page: usize = query
            .iter()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(1)
            .max(1);
        let filters: Vec<&(String, String)> = query.iter().filter(|(k, _)| k != "page").collect();

        let matching: Vec<&Value> = self
            .collections
            .get(resource.path())
            .map(|records| {
                records
                    .iter()
                    .filter(|r| {
                        filters
                            .iter()
                            .all(|(k, v)| r.get(k).map(scalar_text).as_deref() == Some(v.as_str()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let start = (page - 1) * page_size;
        let results: Vec<Value> = matching
            .iter()
            .skip(start)
            .take(page_size)
            .map(|r| (*r).clone())
            .collect();
        let link = |n: usize| {
            let mut params: Vec<String> = filters.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            params.push(format!("page={}", n));
            format!("{}{}?{}", FAKE_BASE_URL, path, params.join("&"))
        };
        let next = (start + page_size < matching.len()).then(|| link(page + 1));
        let previous = (page > 1).then(|| link(page - 1));

        respond(
            200,
            json!({
                "count": matching.len(),
                "next": next,
                "previous": previous,
                "results": results,
            }),
        )
    }

    fn login(&self, body: Option<&Value>) -> ApiResponse {
        let field = |name: &str| {
            body.and_then(|b| b.get(name))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string()
        };
        let (username, email, password) = (field("username"), field("email"), field("password"));
        if (username.is_empty() && email.is_empty()) || password.is_empty() {
            return respond(400, json!({"error": "Debe proporcionar usuario y contraseña"}));
        }

        let account = self.accounts.iter().find(|a| {
            (!username.is_empty() && a.username == username)
                || (!email.is_empty() && a.email == email)
        });
        match account {
            Some(a) if a.password != password => {
                respond(401, json!({"error": "Credenciales inválidas"}))
            }
            Some(a) if !a.active => respond(403, json!({"error": "Cuenta desactivada"})),
            Some(a) => respond(
                200,
                json!({"token": token_for(&a.username), "user": a.user.clone()}),
            ),
            None => respond(401, json!({"error": "Credenciales inválidas"})),
        }
    }

    fn fill_names(&self, record: &mut Value) {
        let Some(object) = record.as_object_mut() else {
            return;
        };
        for (id_field, name_field, source, name_fields) in DERIVED_NAMES {
            let Some(id) = object.get(*id_field).map(scalar_text) else {
                continue;
            };
            let name = self.collections.get(source.path()).and_then(|records| {
                records
                    .iter()
                    .find(|r| record_id(r).map(|rid| rid.as_str() == id).unwrap_or(false))
                    .map(|r| {
                        name_fields
                            .iter()
                            .filter_map(|f| r.get(*f).and_then(Value::as_str))
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
            });
            if let Some(name) = name {
                object.insert((*name_field).to_string(), json!(name));
            }
        }
    }
}

fn token_for(username: &str) -> String {
    format!("token-{}", username)
}

fn record_id(record: &Value) -> Option<RecordId> {
    record.get("id").map(|v| RecordId::new(scalar_text(v)))
}

/// Text form of a JSON scalar, as it would appear in a query string.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn respond(status: u16, body: Value) -> ApiResponse {
    ApiResponse {
        status,
        body: serde_json::to_vec(&body).unwrap_or_default(),
    }
}

fn not_found() -> ApiResponse {
    respond(404, json!({"detail": "Not found."}))
}

/// Split a target into a base-relative path and its query pairs.
fn split_target(target: &Target) -> (String, Vec<(String, String)>) {
    let raw = match target {
        Target::Path(path) => path.as_str(),
        Target::Url(url) => url.strip_prefix(FAKE_BASE_URL).unwrap_or(url),
    };
    let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
    let pairs = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (k, v) = p.split_once('=').unwrap_or((p, ""));
            (k.to_string(), v.to_string())
        })
        .collect();
    (path.to_string(), pairs)
}

/// Resolve a path to a collection and optional record id.
fn route(path: &str) -> Option<(Resource, Option<RecordId>)> {
    const ALL: [Resource; 7] = [
        Resource::Users,
        Resource::Clients,
        Resource::Pets,
        Resource::Appointments,
        Resource::MedicalRecords,
        Resource::Vaccines,
        Resource::Inventory,
    ];
    ALL.iter().find_map(|resource| {
        let rest = path.strip_prefix(resource.path())?;
        let id = rest.trim_end_matches('/');
        if id.is_empty() {
            Some((*resource, None))
        } else if id.contains('/') {
            None
        } else {
            Some((*resource, Some(RecordId::from(id))))
        }
    })
}
