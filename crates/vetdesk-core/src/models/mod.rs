//! Domain models for the vetdesk front office.
//!
//! Field names follow the API's wire names through `serde(rename)`; the Rust
//! side uses English names throughout.

mod account;
mod appointment;
mod client;
mod id;
mod inventory;
mod medical;
mod page;
mod pet;

pub use account::*;
pub use appointment::*;
pub use client::*;
pub use id::*;
pub use inventory::*;
pub use medical::*;
pub use page::*;
pub use pet::*;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::Resource;

/// A record type served by one REST collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the records live in
    const RESOURCE: Resource;

    /// Server-assigned id.
    fn id(&self) -> &RecordId;

    /// Short human label, used in confirmation prompts and pickers.
    fn label(&self) -> String;
}

impl Entity for User {
    const RESOURCE: Resource = Resource::Users;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> String {
        User::label(self)
    }
}

impl Entity for Client {
    const RESOURCE: Resource = Resource::Clients;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> String {
        self.full_name()
    }
}

impl Entity for Pet {
    const RESOURCE: Resource = Resource::Pets;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Entity for Appointment {
    const RESOURCE: Resource = Resource::Appointments;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> String {
        format!(
            "{} ({})",
            self.pet_name.as_deref().unwrap_or(self.pet.as_str()),
            self.reason
        )
    }
}

impl Entity for MedicalRecord {
    const RESOURCE: Resource = Resource::MedicalRecords;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> String {
        self.diagnosis.clone()
    }
}

impl Entity for Vaccine {
    const RESOURCE: Resource = Resource::Vaccines;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Entity for InventoryItem {
    const RESOURCE: Resource = Resource::Inventory;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}
