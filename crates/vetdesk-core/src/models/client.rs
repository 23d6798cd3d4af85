//! Client (pet owner) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

/// A pet owner registered at the clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: RecordId,
    /// Given name(s)
    #[serde(rename = "nombre")]
    pub name: String,
    /// Family name(s)
    #[serde(rename = "apellido")]
    pub surname: String,
    /// 8 to 15 digits
    #[serde(rename = "telefono")]
    pub phone: String,
    pub email: String,
    #[serde(rename = "direccion", default)]
    pub address: Option<String>,
    #[serde(rename = "creado_en", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}
