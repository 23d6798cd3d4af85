//! Pet model and the species suggestion catalog.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use super::RecordId;

/// Biological sex as recorded at the clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PetSex {
    #[serde(rename = "MACHO")]
    Male,
    #[serde(rename = "HEMBRA")]
    Female,
    /// The backend stores "Desconocido" when no sex is sent
    #[default]
    #[serde(rename = "DESCONOCIDO", other)]
    Unknown,
}

impl PetSex {
    pub fn as_str(&self) -> &'static str {
        match self {
            PetSex::Male => "MACHO",
            PetSex::Female => "HEMBRA",
            PetSex::Unknown => "DESCONOCIDO",
        }
    }
}

/// A patient. Always belongs to exactly one client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    pub id: RecordId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "especie")]
    pub species: String,
    #[serde(rename = "raza", default)]
    pub breed: Option<String>,
    #[serde(rename = "fecha_nacimiento", default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "sexo", default)]
    pub sex: PetSex,
    /// Owning client
    #[serde(rename = "propietario")]
    pub owner: RecordId,
    /// Owner display name, computed by the server
    #[serde(rename = "propietario_nombre", default)]
    pub owner_name: Option<String>,
    #[serde(rename = "creado_en", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Pet {
    /// Picker label, e.g. "Luna (Ana)".
    pub fn picker_label(&self) -> String {
        match self.owner_name.as_deref().filter(|n| !n.is_empty()) {
            Some(owner) => format!("{} ({})", self.name, owner),
            None => self.name.clone(),
        }
    }

    /// Whole years since birth, if the birth date is known.
    pub fn age_years(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        today.years_since(birth)
    }
}

/// Minimum similarity for a species suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Species offered in the pet form.
///
/// Starts from the clinic's default list and can be extended at runtime.
#[derive(Debug, Clone)]
pub struct SpeciesCatalog {
    species: Vec<String>,
}

impl Default for SpeciesCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeciesCatalog {
    pub const DEFAULT_SPECIES: [&'static str; 5] = ["Perro", "Gato", "Ave", "Conejo", "Otro"];

    pub fn new() -> Self {
        Self {
            species: Self::DEFAULT_SPECIES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add a species. Duplicates (case-insensitive) are ignored.
    pub fn add_species(&mut self, species: &str) {
        let species = species.trim();
        if species.is_empty() || self.contains(species) {
            return;
        }
        self.species.push(species.to_string());
    }

    pub fn contains(&self, species: &str) -> bool {
        self.species
            .iter()
            .any(|s| s.to_lowercase() == species.trim().to_lowercase())
    }

    pub fn all(&self) -> &[String] {
        &self.species
    }

    /// Closest known species for a typed value, if any is similar enough.
    pub fn suggest(&self, typed: &str) -> Option<&str> {
        let typed = typed.trim().to_lowercase();
        if typed.is_empty() {
            return None;
        }

        self.species
            .iter()
            .map(|s| (s, similarity(&typed, &s.to_lowercase())))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(s, _)| s.as_str())
    }
}

fn similarity(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pet_with_backend_default_sex() {
        let pet: Pet = serde_json::from_str(
            r#"{"id": 5, "nombre": "Luna", "especie": "Gato", "raza": null,
                "fecha_nacimiento": "2020-02-10", "sexo": "Desconocido",
                "propietario": 1, "propietario_nombre": "Ana"}"#,
        )
        .unwrap();
        assert_eq!(pet.sex, PetSex::Unknown);
        assert_eq!(pet.owner, RecordId::from("1"));
        assert_eq!(pet.picker_label(), "Luna (Ana)");
    }

    #[test]
    fn test_age_years() {
        let pet: Pet = serde_json::from_str(
            r#"{"id": 5, "nombre": "Luna", "especie": "Gato", "fecha_nacimiento": "2020-02-10",
                "sexo": "HEMBRA", "propietario": 1}"#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(pet.age_years(today), Some(3));
    }

    #[test]
    fn test_default_species() {
        let catalog = SpeciesCatalog::new();
        assert_eq!(catalog.all().len(), 5);
        assert!(catalog.contains("perro"));
    }

    #[test]
    fn test_add_species_ignores_duplicates() {
        let mut catalog = SpeciesCatalog::new();
        catalog.add_species("Hurón");
        catalog.add_species("gato");
        assert_eq!(catalog.all().len(), 6);
        assert!(catalog.contains("Hurón"));
    }

    #[test]
    fn test_suggest_close_spelling() {
        let catalog = SpeciesCatalog::new();
        assert_eq!(catalog.suggest("Pero"), Some("Perro"));
        assert_eq!(catalog.suggest("conejjo"), Some("Conejo"));
        assert_eq!(catalog.suggest("xyzzy"), None);
        assert_eq!(catalog.suggest(""), None);
    }
}
