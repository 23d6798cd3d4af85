//! VetDesk Core Library
//!
//! Front-office core for a veterinary clinic: session, resource lists,
//! filtering, create/edit forms, pickers and the screens built from them.
//!
//! # Architecture
//!
//! ```text
//!                  SessionHolder (token + profile, persisted)
//!                         │
//!                         ▼
//!   ApiTransport ◄── ApiClient ──► status mapping, page walking, 401/403 policy
//!   (reqwest | fake)      │
//!         ┌───────────────┼────────────────┬──────────────────┐
//!         ▼               ▼                ▼                  ▼
//!   ResourceList     FormController    Autocomplete      Dashboard / Reports
//!   (fetch, patch,   (validate, POST/  (keyboard +       (concurrent batch
//!    reconcile)       PUT, errors)      mouse picker)      fetches)
//!         │               │                │
//!         └───────┬───────┴────────────────┘
//!                 ▼
//!          ResourceScreen / AppointmentBoard / MedicalDesk
//!                 │
//!                 ▼
//!          FilterState (search, category, page)
//! ```
//!
//! # Modules
//!
//! - [`api`]: REST client, transport trait, endpoints and an in-memory fake
//! - [`autocomplete`]: type-ahead picker state machine
//! - [`config`]: client configuration from env vars or JSON
//! - [`db`]: SQLite key/value storage for the persisted session
//! - [`fetch`]: list fetch controller with local patches
//! - [`filter`]: client-side search, category filter and paging
//! - [`form`]: drafts, validation and the modal form controller
//! - [`models`]: domain types (Client, Pet, Appointment, etc.)
//! - [`screens`]: screen controllers and role navigation
//! - [`session`]: login, logout and session persistence

pub mod api;
pub mod autocomplete;
pub mod config;
pub mod db;
pub mod fetch;
pub mod filter;
pub mod form;
pub mod models;
pub mod screens;
pub mod session;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, ApiResult, ApiTransport, AuthFailurePolicy, Resource};
pub use autocomplete::{Autocomplete, PickerEvent, PickerItem, PickerKey, Selection};
pub use config::ClientConfig;
pub use db::Database;
pub use fetch::{FetchScope, LocalPatch, ResourceList};
pub use filter::{CategoryFilter, FilterState, Searchable};
pub use form::{FormController, FormError, SubmitOutcome, ValidationError};
pub use models::{
    Appointment, AppointmentStatus, Client, InventoryItem, MedicalRecord, Pet, RecordId, Role,
    Section, StatusAction, StockLevel, User, Vaccine,
};
pub use screens::{Dashboard, Navigator, Reports, ResourceScreen, ScreenError};
pub use session::{LoginError, LoginIdentifier, SessionHolder};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex, PoisonError};

use models::SpeciesCatalog;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum VetDeskError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for VetDeskError {
    fn from(e: db::DbError) -> Self {
        VetDeskError::StorageError(e.to_string())
    }
}

impl From<serde_json::Error> for VetDeskError {
    fn from(e: serde_json::Error) -> Self {
        VetDeskError::SerializationError(e.to_string())
    }
}

impl From<ValidationError> for VetDeskError {
    fn from(e: ValidationError) -> Self {
        VetDeskError::InvalidInput(e.to_string())
    }
}

// =========================================================================
// Validators (exported to FFI)
// =========================================================================

/// Capitalized words, e.g. "Ana María".
#[uniffi::export]
pub fn validate_name(value: String) -> bool {
    form::is_valid_name(value.trim())
}

#[uniffi::export]
pub fn validate_email(value: String) -> bool {
    form::is_valid_email(value.trim())
}

#[uniffi::export]
pub fn validate_phone(value: String) -> bool {
    form::is_valid_phone(value.trim())
}

/// Blank breeds are accepted; they are optional.
#[uniffi::export]
pub fn validate_breed(value: String) -> bool {
    let value = value.trim();
    value.is_empty() || form::is_valid_breed(value)
}

/// Check an appointment time (RFC 3339) against the allowed window.
#[uniffi::export]
pub fn validate_appointment_time(scheduled_rfc3339: String) -> Result<(), VetDeskError> {
    let scheduled = chrono::DateTime::parse_from_rfc3339(scheduled_rfc3339.trim())
        .map_err(|e| VetDeskError::InvalidInput(e.to_string()))?;
    form::validate_scheduled_at(scheduled.with_timezone(&chrono::Utc), chrono::Utc::now())?;
    Ok(())
}

// =========================================================================
// Inventory (exported to FFI)
// =========================================================================

#[uniffi::export]
pub fn classify_stock(quantity: u32, reorder_level: u32) -> FfiStockLevel {
    StockLevel::classify(quantity, reorder_level).into()
}

#[uniffi::export]
pub fn stock_label(quantity: u32, reorder_level: u32) -> String {
    StockLevel::classify(quantity, reorder_level)
        .label()
        .to_string()
}

/// Gauge fill in percent, capped at 100.
#[uniffi::export]
pub fn stock_gauge_percent(quantity: u32, reorder_level: u32) -> f64 {
    models::stock_fill_percent(quantity, reorder_level)
}

// =========================================================================
// Appointment Status (exported to FFI)
// =========================================================================

#[uniffi::export]
pub fn allowed_status_actions(status: FfiAppointmentStatus) -> Vec<FfiStatusAction> {
    AppointmentStatus::from(status)
        .allowed_actions()
        .iter()
        .map(|&a| a.into())
        .collect()
}

/// Apply an action, failing when the status does not offer it.
#[uniffi::export]
pub fn apply_status_action(
    status: FfiAppointmentStatus,
    action: FfiStatusAction,
) -> Result<FfiAppointmentStatus, VetDeskError> {
    let from = AppointmentStatus::from(status);
    let action = StatusAction::from(action);
    from.apply(action).map(Into::into).ok_or_else(|| {
        VetDeskError::InvalidInput(format!(
            "cannot {:?} an appointment that is {}",
            action,
            from.as_str()
        ))
    })
}

// =========================================================================
// Navigation and Species (exported to FFI)
// =========================================================================

/// Sections visible to a role, by its wire name (e.g. "VETERINARIO").
#[uniffi::export]
pub fn visible_sections(role: String) -> Result<Vec<String>, VetDeskError> {
    let role: Role = serde_json::from_value(serde_json::Value::String(role))?;
    let names = role
        .visible_sections()
        .iter()
        .map(|s| serde_json::to_value(s).map(|v| v.as_str().unwrap_or_default().to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Closest known species to what was typed, with `extra` added to the
/// default list.
#[uniffi::export]
pub fn suggest_species(typed: String, extra: Vec<String>) -> Option<String> {
    let mut catalog = SpeciesCatalog::new();
    for species in &extra {
        catalog.add_species(species);
    }
    catalog.suggest(&typed).map(str::to_string)
}

// =========================================================================
// Autocomplete Picker
// =========================================================================

/// Thread-safe picker wrapper for FFI.
#[derive(uniffi::Object)]
pub struct FfiAutocomplete {
    picker: Mutex<Autocomplete>,
}

impl FfiAutocomplete {
    fn with<T>(&self, f: impl FnOnce(&mut Autocomplete) -> T) -> T {
        let mut picker = self.picker.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut picker)
    }
}

#[uniffi::export]
impl FfiAutocomplete {
    #[uniffi::constructor]
    pub fn new(items: Vec<FfiPickerItem>) -> Arc<Self> {
        Arc::new(Self {
            picker: Mutex::new(Autocomplete::new(
                items.into_iter().map(PickerItem::from).collect(),
            )),
        })
    }

    pub fn set_items(&self, items: Vec<FfiPickerItem>) {
        self.with(|p| p.set_items(items.into_iter().map(PickerItem::from).collect()));
    }

    pub fn focus(&self) {
        self.with(Autocomplete::focus);
    }

    pub fn input(&self, text: String) {
        self.with(|p| p.input(&text));
    }

    /// Returns the selection when the key committed one.
    pub fn key(&self, key: FfiPickerKey) -> Option<FfiSelection> {
        self.with(|p| committed(p.key(key.into())))
    }

    pub fn click(&self, position: u32) -> Option<FfiSelection> {
        self.with(|p| committed(p.click(position as usize)))
    }

    pub fn click_outside(&self) {
        self.with(|p| {
            p.click_outside();
        });
    }

    pub fn clear(&self) {
        self.with(Autocomplete::clear);
    }

    pub fn is_open(&self) -> bool {
        self.with(|p| p.is_open())
    }

    pub fn query(&self) -> String {
        self.with(|p| p.query().to_string())
    }

    /// Labels of the current matches, in display order.
    pub fn matches(&self) -> Vec<String> {
        self.with(|p| p.matches().iter().map(|i| i.label.clone()).collect())
    }

    pub fn cursor(&self) -> Option<u32> {
        self.with(|p| p.cursor().map(|c| c as u32))
    }

    pub fn selection(&self) -> Option<FfiSelection> {
        self.with(|p| p.selection().cloned().map(Into::into))
    }
}

fn committed(event: PickerEvent) -> Option<FfiSelection> {
    match event {
        PickerEvent::Committed(selection) => Some(selection.into()),
        PickerEvent::None | PickerEvent::Closed => None,
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe picker entry. `keywords` are the texts the query matches.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPickerItem {
    pub id: String,
    pub label: String,
    pub keywords: Vec<String>,
}

impl From<FfiPickerItem> for PickerItem {
    fn from(item: FfiPickerItem) -> Self {
        let keywords: Vec<&str> = if item.keywords.is_empty() {
            vec![item.label.as_str()]
        } else {
            item.keywords.iter().map(String::as_str).collect()
        };
        PickerItem::new(RecordId::new(item.id.clone()), item.label.clone(), &keywords)
    }
}

#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiSelection {
    pub id: String,
    pub label: String,
}

impl From<Selection> for FfiSelection {
    fn from(selection: Selection) -> Self {
        Self {
            id: selection.id.as_str().to_string(),
            label: selection.label,
        }
    }
}

#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiPickerKey {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

impl From<FfiPickerKey> for PickerKey {
    fn from(key: FfiPickerKey) -> Self {
        match key {
            FfiPickerKey::ArrowDown => PickerKey::ArrowDown,
            FfiPickerKey::ArrowUp => PickerKey::ArrowUp,
            FfiPickerKey::Enter => PickerKey::Enter,
            FfiPickerKey::Escape => PickerKey::Escape,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiStockLevel {
    OutOfStock,
    Low,
    Normal,
}

impl From<StockLevel> for FfiStockLevel {
    fn from(level: StockLevel) -> Self {
        match level {
            StockLevel::OutOfStock => FfiStockLevel::OutOfStock,
            StockLevel::Low => FfiStockLevel::Low,
            StockLevel::Normal => FfiStockLevel::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiAppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl From<FfiAppointmentStatus> for AppointmentStatus {
    fn from(status: FfiAppointmentStatus) -> Self {
        match status {
            FfiAppointmentStatus::Pending => AppointmentStatus::Pending,
            FfiAppointmentStatus::Confirmed => AppointmentStatus::Confirmed,
            FfiAppointmentStatus::Completed => AppointmentStatus::Completed,
            FfiAppointmentStatus::Cancelled => AppointmentStatus::Cancelled,
        }
    }
}

impl From<AppointmentStatus> for FfiAppointmentStatus {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Pending => FfiAppointmentStatus::Pending,
            AppointmentStatus::Confirmed => FfiAppointmentStatus::Confirmed,
            AppointmentStatus::Completed => FfiAppointmentStatus::Completed,
            AppointmentStatus::Cancelled => FfiAppointmentStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiStatusAction {
    Confirm,
    Complete,
    Cancel,
}

impl From<FfiStatusAction> for StatusAction {
    fn from(action: FfiStatusAction) -> Self {
        match action {
            FfiStatusAction::Confirm => StatusAction::Confirm,
            FfiStatusAction::Complete => StatusAction::Complete,
            FfiStatusAction::Cancel => StatusAction::Cancel,
        }
    }
}

impl From<StatusAction> for FfiStatusAction {
    fn from(action: StatusAction) -> Self {
        match action {
            StatusAction::Confirm => FfiStatusAction::Confirm,
            StatusAction::Complete => FfiStatusAction::Complete,
            StatusAction::Cancel => FfiStatusAction::Cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validators() {
        assert!(validate_name("Ana María".into()));
        assert!(!validate_name("ana".into()));
        assert!(validate_breed("".into()));
        assert!(!validate_breed("labrador".into()));
        assert!(validate_phone("12345678".into()));
        assert!(!validate_email("ana@x".into()));
    }

    #[test]
    fn test_stock_exports() {
        assert_eq!(classify_stock(0, 0), FfiStockLevel::OutOfStock);
        assert_eq!(stock_label(3, 5), "Stock Bajo");
        assert_eq!(stock_gauge_percent(5, 5), 50.0);
    }

    #[test]
    fn test_status_exports() {
        assert_eq!(
            allowed_status_actions(FfiAppointmentStatus::Pending),
            vec![FfiStatusAction::Confirm, FfiStatusAction::Cancel]
        );
        assert_eq!(
            apply_status_action(FfiAppointmentStatus::Confirmed, FfiStatusAction::Complete).unwrap(),
            FfiAppointmentStatus::Completed
        );
        assert!(apply_status_action(FfiAppointmentStatus::Cancelled, FfiStatusAction::Confirm).is_err());
    }

    #[test]
    fn test_navigation_and_species() {
        assert_eq!(
            visible_sections("SYSTEM_ADMIN".into()).unwrap(),
            vec!["user_admin"]
        );
        assert_eq!(visible_sections("OTRO".into()).unwrap(), vec!["dashboard"]);
        assert_eq!(suggest_species("perrro".into(), vec![]).as_deref(), Some("Perro"));
        assert_eq!(
            suggest_species("Hamster".into(), vec!["Hámster".into()]).as_deref(),
            Some("Hámster")
        );
    }

    #[test]
    fn test_ffi_picker() {
        let picker = FfiAutocomplete::new(vec![
            FfiPickerItem {
                id: "1".into(),
                label: "Ana García".into(),
                keywords: vec![],
            },
            FfiPickerItem {
                id: "2".into(),
                label: "Luis Gómez".into(),
                keywords: vec![],
            },
        ]);
        picker.input("g".into());
        assert_eq!(picker.matches().len(), 2);
        picker.key(FfiPickerKey::ArrowDown);
        let picked = picker.key(FfiPickerKey::Enter).unwrap();
        assert_eq!(picked.label, "Luis Gómez");
        assert_eq!(picker.selection(), Some(picked));
    }
}
