//! Medical records and vaccinations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

/// A consultation entry written by a veterinarian.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecord {
    pub id: RecordId,
    #[serde(rename = "mascota")]
    pub pet: RecordId,
    #[serde(rename = "mascota_nombre", default)]
    pub pet_name: Option<String>,
    /// Unset once the veterinarian's account is deleted
    #[serde(rename = "veterinario", default)]
    pub veterinarian: Option<RecordId>,
    #[serde(rename = "veterinario_nombre", default)]
    pub veterinarian_name: Option<String>,
    #[serde(rename = "sintomas", default)]
    pub symptoms: String,
    #[serde(rename = "diagnostico")]
    pub diagnosis: String,
    #[serde(rename = "tratamiento")]
    pub treatment: String,
    #[serde(rename = "medicamentos", default)]
    pub medications: Option<String>,
    #[serde(rename = "fecha_seguimiento", default)]
    pub follow_up_date: Option<NaiveDate>,
    #[serde(rename = "creado_en", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// An administered vaccine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vaccine {
    pub id: RecordId,
    #[serde(rename = "mascota")]
    pub pet: RecordId,
    #[serde(rename = "mascota_nombre", default)]
    pub pet_name: Option<String>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "fecha_administracion")]
    pub administered_date: NaiveDate,
    /// Never before `administered_date`
    #[serde(rename = "proxima_fecha", default)]
    pub next_dose_date: Option<NaiveDate>,
    #[serde(rename = "notas", default)]
    pub notes: Option<String>,
    #[serde(rename = "creado_en", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Vaccine {
    /// Whether the next dose is due on or before `today`.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_dose_date.is_some_and(|next| next <= today)
    }
}
