//! Appointments and their status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

/// Appointment status.
///
/// ```text
/// Pending --confirm--> Confirmed --complete--> Completed
///    |                     |
///    +------cancel---------+-----cancel-----> Cancelled
/// ```
///
/// Completed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AppointmentStatus {
    #[default]
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "CONFIRMADA")]
    Confirmed,
    #[serde(rename = "COMPLETADA")]
    Completed,
    #[serde(rename = "CANCELADA")]
    Cancelled,
}

/// A user-triggered status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusAction {
    Confirm,
    Complete,
    Cancel,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDIENTE",
            AppointmentStatus::Confirmed => "CONFIRMADA",
            AppointmentStatus::Completed => "COMPLETADA",
            AppointmentStatus::Cancelled => "CANCELADA",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    /// Actions offered for an appointment in this status.
    pub fn allowed_actions(&self) -> &'static [StatusAction] {
        match self {
            AppointmentStatus::Pending => &[StatusAction::Confirm, StatusAction::Cancel],
            AppointmentStatus::Confirmed => &[StatusAction::Complete, StatusAction::Cancel],
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => &[],
        }
    }

    /// Status reached by applying `action`, or `None` if not allowed.
    pub fn apply(&self, action: StatusAction) -> Option<AppointmentStatus> {
        if !self.allowed_actions().contains(&action) {
            return None;
        }
        Some(action.target())
    }
}

impl StatusAction {
    /// Status this action moves to.
    pub fn target(&self) -> AppointmentStatus {
        match self {
            StatusAction::Confirm => AppointmentStatus::Confirmed,
            StatusAction::Complete => AppointmentStatus::Completed,
            StatusAction::Cancel => AppointmentStatus::Cancelled,
        }
    }
}

/// A scheduled visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: RecordId,
    /// Owning client of the pet, when the server sends it
    #[serde(rename = "cliente", default)]
    pub client: Option<RecordId>,
    #[serde(rename = "cliente_nombre", default)]
    pub client_name: Option<String>,
    #[serde(rename = "mascota")]
    pub pet: RecordId,
    #[serde(rename = "mascota_nombre", default)]
    pub pet_name: Option<String>,
    /// Unset once the veterinarian's account is deleted
    #[serde(rename = "veterinario", default)]
    pub veterinarian: Option<RecordId>,
    #[serde(rename = "veterinario_nombre", default)]
    pub veterinarian_name: Option<String>,
    #[serde(rename = "motivo")]
    pub reason: String,
    /// Absolute instant; edited in the user's local timezone
    #[serde(rename = "fecha_programada")]
    pub scheduled_at: DateTime<Utc>,
    #[serde(rename = "estado", default)]
    pub status: AppointmentStatus,
    #[serde(rename = "notas", default)]
    pub notes: Option<String>,
    #[serde(rename = "creado_en", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Whether the appointment still counts as upcoming work.
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}
