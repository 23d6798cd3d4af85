//! REST collection paths.

use std::fmt;

use crate::models::RecordId;

/// Login endpoint, relative to the API base.
pub const LOGIN_PATH: &str = "accounts/users/login/";

/// A REST collection exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Clients,
    Pets,
    Appointments,
    MedicalRecords,
    Vaccines,
    Inventory,
}

impl Resource {
    /// Collection path relative to the API base, with trailing slash.
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Users => "accounts/users/",
            Resource::Clients => "clients/clientes/",
            Resource::Pets => "pets/mascotas/",
            Resource::Appointments => "appointments/citas/",
            Resource::MedicalRecords => "medical-records/registros-medicos/",
            Resource::Vaccines => "medical-records/vacunas/",
            Resource::Inventory => "inventory/articulos-inventario/",
        }
    }

    /// Detail path for one record.
    pub fn item_path(&self, id: &RecordId) -> String {
        format!("{}{}/", self.path(), id)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_path() {
        let id = RecordId::from(12u64);
        assert_eq!(Resource::Pets.item_path(&id), "pets/mascotas/12/");
        assert_eq!(
            Resource::Vaccines.item_path(&id),
            "medical-records/vacunas/12/"
        );
    }
}
