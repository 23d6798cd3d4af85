//! Staff accounts, roles and role-gated navigation.

use serde::{Deserialize, Serialize};

use super::RecordId;

/// Staff role. Determines visible navigation and allowed actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "RECEPCIONISTA")]
    Receptionist,
    #[serde(rename = "VETERINARIO")]
    Veterinarian,
    #[serde(rename = "ADMINISTRADOR")]
    Administrator,
    #[serde(rename = "SYSTEM_ADMIN")]
    SystemAdmin,
    /// Any role string the client does not know about
    #[serde(other)]
    Unrecognized,
}

/// A navigable section of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Dashboard,
    Appointments,
    Clients,
    Pets,
    MedicalRecords,
    Inventory,
    Reports,
    UserAdmin,
}

impl Role {
    /// Every role the API assigns, in display order.
    pub const ALL: [Role; 4] = [
        Role::Receptionist,
        Role::Veterinarian,
        Role::Administrator,
        Role::SystemAdmin,
    ];

    /// Wire value used in `?rol=` filters and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Receptionist => "RECEPCIONISTA",
            Role::Veterinarian => "VETERINARIO",
            Role::Administrator => "ADMINISTRADOR",
            Role::SystemAdmin => "SYSTEM_ADMIN",
            Role::Unrecognized => "",
        }
    }

    /// Sections shown in the navigation for this role.
    ///
    /// System administrators only ever see the user administration panel.
    pub fn visible_sections(&self) -> &'static [Section] {
        match self {
            Role::Receptionist => &[
                Section::Dashboard,
                Section::Appointments,
                Section::Clients,
                Section::Pets,
            ],
            Role::Veterinarian => &[Section::Dashboard, Section::Pets, Section::MedicalRecords],
            Role::Administrator => &[Section::Dashboard, Section::Inventory, Section::Reports],
            Role::SystemAdmin => &[Section::UserAdmin],
            Role::Unrecognized => &[Section::Dashboard],
        }
    }

    /// Section shown right after login.
    pub fn landing_section(&self) -> Section {
        match self {
            Role::SystemAdmin => Section::UserAdmin,
            _ => Section::Dashboard,
        }
    }

    pub fn can_access(&self, section: Section) -> bool {
        self.visible_sections().contains(&section)
    }

    /// Only veterinarians carry a specialty.
    pub fn has_specialty(&self) -> bool {
        matches!(self, Role::Veterinarian)
    }
}

/// A staff account as returned by `accounts/users/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: RecordId,
    pub username: String,
    /// Server-computed "first last" display name
    #[serde(rename = "nombre", default)]
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "especialidad", default)]
    pub specialty: Option<String>,
}

impl User {
    /// Name to show in pickers and lists, falling back to first + last name.
    pub fn label(&self) -> String {
        if self.display_name.trim().is_empty() {
            format!("{} {}", self.first_name, self.last_name)
                .trim()
                .to_string()
        } else {
            self.display_name.clone()
        }
    }

    /// Label for vet selectors, e.g. "Laura Pérez - Cirugía".
    pub fn vet_label(&self) -> String {
        match self.specialty.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(specialty) => format!("{} - {}", self.label(), specialty),
            None => self.label(),
        }
    }
}
