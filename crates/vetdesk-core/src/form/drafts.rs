//! Draft types: the editable copy of each record.
//!
//! Drafts hold raw input text. Validation and payload building parse it;
//! nothing is converted until submit.

use chrono::{NaiveDate, NaiveDateTime, SecondsFormat, TimeZone};
use serde_json::{json, Value};

use super::validate::*;
use super::{FormContext, FormDraft};
use crate::autocomplete::Selection;
use crate::models::{
    Appointment, AppointmentStatus, Client, InventoryItem, MedicalRecord, Pet, PetSex, RecordId,
    Role, User, Vaccine,
};

/// Input format of the appointment date/time field.
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

fn blank_to_null(value: &str) -> Value {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        json!(trimmed)
    }
}

fn selected(field: Field, selection: &Option<Selection>) -> ValidationResult<&RecordId> {
    selection
        .as_ref()
        .map(|s| &s.id)
        .ok_or(ValidationError::Required(field))
}

fn chosen(field: Field, id: &Option<RecordId>) -> ValidationResult<&RecordId> {
    id.as_ref().ok_or(ValidationError::Required(field))
}

// =========================================================================
// Clients
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientDraft {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl FormDraft for ClientDraft {
    type Record = Client;

    fn from_record(record: &Client, _ctx: &FormContext) -> Self {
        Self {
            name: record.name.clone(),
            surname: record.surname.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            address: record.address.clone().unwrap_or_default(),
        }
    }

    fn validate(&self, _ctx: &FormContext) -> ValidationResult<()> {
        let name = require(Field::Name, &self.name)?;
        let surname = require(Field::Surname, &self.surname)?;
        let email = require(Field::Email, &self.email)?;
        let phone = require(Field::Phone, &self.phone)?;

        if !is_valid_name(name) {
            return Err(ValidationError::NameFormat(Field::Name));
        }
        if !is_valid_name(surname) {
            return Err(ValidationError::NameFormat(Field::Surname));
        }
        if !is_valid_email(email) {
            return Err(ValidationError::EmailFormat);
        }
        if !is_valid_phone(phone) {
            return Err(ValidationError::PhoneFormat);
        }
        Ok(())
    }

    fn payload(&self, _ctx: &FormContext) -> ValidationResult<Value> {
        Ok(json!({
            "nombre": self.name.trim(),
            "apellido": self.surname.trim(),
            "email": self.email.trim(),
            "telefono": self.phone.trim(),
            "direccion": blank_to_null(&self.address),
        }))
    }
}

// =========================================================================
// Pets
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetDraft {
    pub owner: Option<Selection>,
    pub name: String,
    pub species: String,
    pub breed: String,
    /// `YYYY-MM-DD`, or blank
    pub birth_date: String,
    pub sex: PetSex,
}

impl FormDraft for PetDraft {
    type Record = Pet;

    fn from_record(record: &Pet, _ctx: &FormContext) -> Self {
        Self {
            owner: Some(Selection {
                id: record.owner.clone(),
                label: record.owner_name.clone().unwrap_or_default(),
            }),
            name: record.name.clone(),
            species: record.species.clone(),
            breed: record.breed.clone().unwrap_or_default(),
            birth_date: record
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            sex: record.sex,
        }
    }

    fn validate(&self, ctx: &FormContext) -> ValidationResult<()> {
        selected(Field::Owner, &self.owner)?;
        let name = require(Field::Name, &self.name)?;
        require(Field::Species, &self.species)?;

        if !is_valid_name(name) {
            return Err(ValidationError::NameFormat(Field::Name));
        }
        let breed = self.breed.trim();
        if !breed.is_empty() && !is_valid_breed(breed) {
            return Err(ValidationError::BreedFormat);
        }
        if let Some(birth) = parse_date(Field::BirthDate, &self.birth_date)? {
            if birth > ctx.today() {
                return Err(ValidationError::DateInFuture(Field::BirthDate));
            }
        }
        Ok(())
    }

    fn payload(&self, _ctx: &FormContext) -> ValidationResult<Value> {
        let owner = selected(Field::Owner, &self.owner)?;
        let birth = parse_date(Field::BirthDate, &self.birth_date)?;
        Ok(json!({
            "nombre": self.name.trim(),
            "especie": self.species.trim(),
            "raza": blank_to_null(&self.breed),
            "fecha_nacimiento": birth.map(|d| d.format("%Y-%m-%d").to_string()),
            "sexo": self.sex.as_str(),
            "propietario": owner,
        }))
    }
}

// =========================================================================
// Appointments
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentDraft {
    /// Chosen through the client picker; drives the pet selector
    pub client: Option<Selection>,
    pub pet: Option<RecordId>,
    pub veterinarian: Option<RecordId>,
    /// `YYYY-MM-DDTHH:MM` in the user's timezone
    pub scheduled_local: String,
    pub reason: String,
    pub status: AppointmentStatus,
    pub notes: String,
}

impl AppointmentDraft {
    /// Parse the local date/time input into an absolute instant.
    pub fn scheduled_at(&self, ctx: &FormContext) -> ValidationResult<chrono::DateTime<chrono::Utc>> {
        let naive = NaiveDateTime::parse_from_str(self.scheduled_local.trim(), LOCAL_DATETIME_FORMAT)
            .map_err(|_| ValidationError::InvalidDate(Field::ScheduledAt))?;
        ctx.tz
            .from_local_datetime(&naive)
            .single()
            .map(|local| local.with_timezone(&chrono::Utc))
            .ok_or(ValidationError::InvalidDate(Field::ScheduledAt))
    }
}

impl FormDraft for AppointmentDraft {
    type Record = Appointment;

    /// The owning client is not resolved here; the appointments board looks
    /// it up through the pet before opening the form.
    fn from_record(record: &Appointment, ctx: &FormContext) -> Self {
        Self {
            client: record.client.clone().map(|id| Selection {
                id,
                label: record.client_name.clone().unwrap_or_default(),
            }),
            pet: Some(record.pet.clone()),
            veterinarian: record.veterinarian.clone(),
            scheduled_local: record
                .scheduled_at
                .with_timezone(&ctx.tz)
                .format(LOCAL_DATETIME_FORMAT)
                .to_string(),
            reason: record.reason.clone(),
            status: record.status,
            notes: record.notes.clone().unwrap_or_default(),
        }
    }

    fn validate(&self, ctx: &FormContext) -> ValidationResult<()> {
        selected(Field::Client, &self.client)?;
        chosen(Field::Pet, &self.pet)?;
        chosen(Field::Veterinarian, &self.veterinarian)?;
        require(Field::ScheduledAt, &self.scheduled_local)?;
        require(Field::Reason, &self.reason)?;

        let scheduled = self.scheduled_at(ctx)?;
        validate_scheduled_at(scheduled, ctx.now)
    }

    fn payload(&self, ctx: &FormContext) -> ValidationResult<Value> {
        let client = selected(Field::Client, &self.client)?;
        let pet = chosen(Field::Pet, &self.pet)?;
        let vet = chosen(Field::Veterinarian, &self.veterinarian)?;
        let scheduled = self.scheduled_at(ctx)?;
        Ok(json!({
            "cliente": client,
            "mascota": pet,
            "veterinario": vet,
            "motivo": self.reason.trim(),
            "fecha_programada": scheduled.to_rfc3339_opts(SecondsFormat::Secs, true),
            "estado": self.status,
            "notas": self.notes.trim(),
        }))
    }
}

// =========================================================================
// Medical records and vaccines
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicalRecordDraft {
    pub pet: Option<Selection>,
    pub veterinarian: Option<RecordId>,
    pub symptoms: String,
    pub diagnosis: String,
    pub treatment: String,
    pub medications: String,
    /// `YYYY-MM-DD`, or blank
    pub follow_up_date: String,
    /// Follow-up date already saved on the record being edited
    pub stored_follow_up: Option<NaiveDate>,
}

impl FormDraft for MedicalRecordDraft {
    type Record = MedicalRecord;

    fn from_record(record: &MedicalRecord, _ctx: &FormContext) -> Self {
        Self {
            pet: Some(Selection {
                id: record.pet.clone(),
                label: record.pet_name.clone().unwrap_or_default(),
            }),
            veterinarian: record.veterinarian.clone(),
            symptoms: record.symptoms.clone(),
            diagnosis: record.diagnosis.clone(),
            treatment: record.treatment.clone(),
            medications: record.medications.clone().unwrap_or_default(),
            follow_up_date: record
                .follow_up_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            stored_follow_up: record.follow_up_date,
        }
    }

    fn validate(&self, ctx: &FormContext) -> ValidationResult<()> {
        selected(Field::Pet, &self.pet)?;
        chosen(Field::Veterinarian, &self.veterinarian)?;
        require(Field::Diagnosis, &self.diagnosis)?;
        require(Field::Treatment, &self.treatment)?;

        // Only a newly entered date has to be in the future.
        if let Some(follow_up) = parse_date(Field::FollowUpDate, &self.follow_up_date)? {
            if follow_up < ctx.today() && Some(follow_up) != self.stored_follow_up {
                return Err(ValidationError::DateInPast(Field::FollowUpDate));
            }
        }
        Ok(())
    }

    fn payload(&self, _ctx: &FormContext) -> ValidationResult<Value> {
        let pet = selected(Field::Pet, &self.pet)?;
        let vet = chosen(Field::Veterinarian, &self.veterinarian)?;
        let follow_up = parse_date(Field::FollowUpDate, &self.follow_up_date)?;
        Ok(json!({
            "mascota": pet,
            "veterinario": vet,
            "sintomas": self.symptoms.trim(),
            "diagnostico": self.diagnosis.trim(),
            "tratamiento": self.treatment.trim(),
            "medicamentos": blank_to_null(&self.medications),
            "fecha_seguimiento": follow_up.map(|d| d.format("%Y-%m-%d").to_string()),
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaccineDraft {
    pub pet: Option<Selection>,
    pub name: String,
    /// `YYYY-MM-DD`
    pub administered_date: String,
    /// `YYYY-MM-DD`, or blank
    pub next_dose_date: String,
    pub notes: String,
}

impl FormDraft for VaccineDraft {
    type Record = Vaccine;

    fn from_record(record: &Vaccine, _ctx: &FormContext) -> Self {
        Self {
            pet: Some(Selection {
                id: record.pet.clone(),
                label: record.pet_name.clone().unwrap_or_default(),
            }),
            name: record.name.clone(),
            administered_date: record.administered_date.format("%Y-%m-%d").to_string(),
            next_dose_date: record
                .next_dose_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            notes: record.notes.clone().unwrap_or_default(),
        }
    }

    fn validate(&self, _ctx: &FormContext) -> ValidationResult<()> {
        selected(Field::Pet, &self.pet)?;
        require(Field::VaccineName, &self.name)?;
        require(Field::AdministeredDate, &self.administered_date)?;

        let administered = parse_date(Field::AdministeredDate, &self.administered_date)?;
        let next = parse_date(Field::NextDoseDate, &self.next_dose_date)?;
        if let (Some(administered), Some(next)) = (administered, next) {
            if next < administered {
                return Err(ValidationError::NextDoseBeforeAdministered);
            }
        }
        Ok(())
    }

    fn payload(&self, _ctx: &FormContext) -> ValidationResult<Value> {
        let pet = selected(Field::Pet, &self.pet)?;
        let administered = parse_date(Field::AdministeredDate, &self.administered_date)?
            .ok_or(ValidationError::Required(Field::AdministeredDate))?;
        let next = parse_date(Field::NextDoseDate, &self.next_dose_date)?;
        Ok(json!({
            "mascota": pet,
            "nombre": self.name.trim(),
            "fecha_administracion": administered.format("%Y-%m-%d").to_string(),
            "proxima_fecha": next.map(|d| d.format("%Y-%m-%d").to_string()),
            "notas": self.notes.trim(),
        }))
    }
}

// =========================================================================
// Inventory
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryDraft {
    pub name: String,
    pub description: String,
    pub quantity: String,
    pub reorder_level: String,
    /// Blank transmits as null
    pub price: String,
}

impl FormDraft for InventoryDraft {
    type Record = InventoryItem;

    fn from_record(record: &InventoryItem, _ctx: &FormContext) -> Self {
        Self {
            name: record.name.clone(),
            description: record.description.clone().unwrap_or_default(),
            quantity: record.quantity.to_string(),
            reorder_level: record.reorder_level.to_string(),
            price: record.unit_price.map(|p| p.to_string()).unwrap_or_default(),
        }
    }

    fn validate(&self, _ctx: &FormContext) -> ValidationResult<()> {
        require(Field::Name, &self.name)?;
        require(Field::Quantity, &self.quantity)?;
        require(Field::ReorderLevel, &self.reorder_level)?;

        parse_count(Field::Quantity, &self.quantity)?;
        parse_count(Field::ReorderLevel, &self.reorder_level)?;
        parse_price(&self.price)?;
        Ok(())
    }

    fn payload(&self, _ctx: &FormContext) -> ValidationResult<Value> {
        Ok(json!({
            "nombre": self.name.trim(),
            "descripcion": blank_to_null(&self.description),
            "cantidad": parse_count(Field::Quantity, &self.quantity)?,
            "nivel_reorden": parse_count(Field::ReorderLevel, &self.reorder_level)?,
            "precio": parse_price(&self.price)?,
        }))
    }
}

// =========================================================================
// Staff accounts
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    /// Sent only for veterinarians
    pub specialty: String,
    /// Blank on edit keeps the current password
    pub password: String,
    pub password_confirmation: String,
}

impl Default for UserDraft {
    fn default() -> Self {
        Self {
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            role: Role::Receptionist,
            specialty: String::new(),
            password: String::new(),
            password_confirmation: String::new(),
        }
    }
}

impl FormDraft for UserDraft {
    type Record = User;

    fn from_record(record: &User, _ctx: &FormContext) -> Self {
        Self {
            username: record.username.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone().unwrap_or_default(),
            role: record.role,
            specialty: record.specialty.clone().unwrap_or_default(),
            password: String::new(),
            password_confirmation: String::new(),
        }
    }

    fn validate(&self, ctx: &FormContext) -> ValidationResult<()> {
        require(Field::Username, &self.username)?;
        let first = require(Field::FirstName, &self.first_name)?;
        let last = require(Field::LastName, &self.last_name)?;
        let email = require(Field::Email, &self.email)?;

        if !is_valid_name(first) {
            return Err(ValidationError::NameFormat(Field::FirstName));
        }
        if !is_valid_name(last) {
            return Err(ValidationError::NameFormat(Field::LastName));
        }
        if !is_valid_email(email) {
            return Err(ValidationError::EmailFormat);
        }
        let phone = self.phone.trim();
        if !phone.is_empty() && !is_valid_phone(phone) {
            return Err(ValidationError::PhoneFormat);
        }

        if self.password != self.password_confirmation {
            return Err(ValidationError::PasswordMismatch);
        }
        if !ctx.editing && self.password.is_empty() {
            return Err(ValidationError::PasswordRequired);
        }
        Ok(())
    }

    fn payload(&self, _ctx: &FormContext) -> ValidationResult<Value> {
        let specialty = if self.role.has_specialty() {
            blank_to_null(&self.specialty)
        } else {
            Value::Null
        };
        let mut payload = json!({
            "username": self.username.trim(),
            "first_name": self.first_name.trim(),
            "last_name": self.last_name.trim(),
            "email": self.email.trim(),
            "telefono": self.phone.trim(),
            "rol": self.role,
            "especialidad": specialty,
        });
        if !self.password.is_empty() {
            payload["password"] = json!(self.password);
        }
        Ok(payload)
    }
}
