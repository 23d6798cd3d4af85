//! Field validators.
//!
//! Every check is synchronous and independent of the network. Draft types
//! compose them in a fixed order (presence, format, cross-field) and stop at
//! the first failure.

use std::fmt;

use chrono::{DateTime, DurationRound, Months, NaiveDate, TimeDelta, Utc};
use thiserror::Error;

/// A form field, with its wire name and display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Surname,
    Email,
    Phone,
    Owner,
    Species,
    Breed,
    BirthDate,
    Client,
    Pet,
    Veterinarian,
    ScheduledAt,
    Reason,
    Diagnosis,
    Treatment,
    FollowUpDate,
    VaccineName,
    AdministeredDate,
    NextDoseDate,
    Quantity,
    ReorderLevel,
    Price,
    Username,
    FirstName,
    LastName,
    Password,
    PasswordConfirmation,
}

impl Field {
    /// Name used in payloads and server error bodies.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Field::Name | Field::VaccineName => "nombre",
            Field::Surname => "apellido",
            Field::Email => "email",
            Field::Phone => "telefono",
            Field::Owner => "propietario",
            Field::Species => "especie",
            Field::Breed => "raza",
            Field::BirthDate => "fecha_nacimiento",
            Field::Client => "cliente",
            Field::Pet => "mascota",
            Field::Veterinarian => "veterinario",
            Field::ScheduledAt => "fecha_programada",
            Field::Reason => "motivo",
            Field::Diagnosis => "diagnostico",
            Field::Treatment => "tratamiento",
            Field::FollowUpDate => "fecha_seguimiento",
            Field::AdministeredDate => "fecha_administracion",
            Field::NextDoseDate => "proxima_fecha",
            Field::Quantity => "cantidad",
            Field::ReorderLevel => "nivel_reorden",
            Field::Price => "precio",
            Field::Username => "username",
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Password => "password",
            Field::PasswordConfirmation => "confirm_password",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Surname => "Surname",
            Field::Email => "Email",
            Field::Phone => "Phone",
            Field::Owner => "Owner",
            Field::Species => "Species",
            Field::Breed => "Breed",
            Field::BirthDate => "Birth date",
            Field::Client => "Client",
            Field::Pet => "Pet",
            Field::Veterinarian => "Veterinarian",
            Field::ScheduledAt => "Date and time",
            Field::Reason => "Reason",
            Field::Diagnosis => "Diagnosis",
            Field::Treatment => "Treatment",
            Field::FollowUpDate => "Follow-up date",
            Field::VaccineName => "Vaccine name",
            Field::AdministeredDate => "Administration date",
            Field::NextDoseDate => "Next dose date",
            Field::Quantity => "Quantity",
            Field::ReorderLevel => "Reorder level",
            Field::Price => "Price",
            Field::Username => "Username",
            Field::FirstName => "First name",
            Field::LastName => "Last name",
            Field::Password => "Password",
            Field::PasswordConfirmation => "Password confirmation",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A failed client-side check. Exactly one is reported per submit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(Field),

    #[error("{0} must start each word with a capital letter followed by lowercase letters")]
    NameFormat(Field),

    #[error("Breed must start with a capital letter")]
    BreedFormat,

    #[error("Email format is not valid")]
    EmailFormat,

    #[error("Phone must have between 8 and 15 digits")]
    PhoneFormat,

    #[error("{0} is not a valid date")]
    InvalidDate(Field),

    #[error("{0} cannot be in the future")]
    DateInFuture(Field),

    #[error("{0} cannot be in the past")]
    DateInPast(Field),

    #[error("Appointment date cannot be in the past")]
    ScheduleInPast,

    #[error("Appointment date must be less than one year from now")]
    ScheduleTooFar,

    #[error("Next dose date cannot be before the administration date")]
    NextDoseBeforeAdministered,

    #[error("{0} must be a whole number of 0 or more")]
    NotACount(Field),

    #[error("Price must be a number of 0 or more")]
    InvalidPrice,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password is required for new users")]
    PasswordRequired,
}

impl ValidationError {
    /// Field to highlight, when the error is tied to one.
    pub fn field(&self) -> Option<Field> {
        match self {
            ValidationError::Required(f)
            | ValidationError::NameFormat(f)
            | ValidationError::InvalidDate(f)
            | ValidationError::DateInFuture(f)
            | ValidationError::DateInPast(f)
            | ValidationError::NotACount(f) => Some(*f),
            ValidationError::BreedFormat => Some(Field::Breed),
            ValidationError::EmailFormat => Some(Field::Email),
            ValidationError::PhoneFormat => Some(Field::Phone),
            ValidationError::ScheduleInPast | ValidationError::ScheduleTooFar => {
                Some(Field::ScheduledAt)
            }
            ValidationError::NextDoseBeforeAdministered => Some(Field::NextDoseDate),
            ValidationError::InvalidPrice => Some(Field::Price),
            ValidationError::PasswordMismatch => Some(Field::PasswordConfirmation),
            ValidationError::PasswordRequired => Some(Field::Password),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

fn is_capital(c: char) -> bool {
    c.is_ascii_uppercase() || "ÁÉÍÓÚÑ".contains(c)
}

fn is_lower(c: char) -> bool {
    c.is_ascii_lowercase() || "áéíóúñ".contains(c)
}

/// Every whitespace-separated token is a capital followed by lowercase letters.
pub fn is_valid_name(value: &str) -> bool {
    let mut tokens = value.split_whitespace().peekable();
    if tokens.peek().is_none() {
        return false;
    }
    tokens.all(|token| {
        let mut chars = token.chars();
        chars.next().is_some_and(is_capital) && chars.all(is_lower)
    })
}

/// A capital letter followed by lowercase letters and spaces.
pub fn is_valid_breed(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next().is_some_and(is_capital) && chars.all(|c| is_lower(c) || c.is_whitespace())
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let chars: Vec<char> = domain.chars().collect();
    chars
        .iter()
        .enumerate()
        .any(|(i, c)| *c == '.' && i > 0 && i + 1 < chars.len())
}

/// 8 to 15 ASCII digits.
pub fn is_valid_phone(value: &str) -> bool {
    (8..=15).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit())
}

/// Accept `scheduled` iff `now <= scheduled < now + 1 year`, with `now`
/// truncated to the minute.
pub fn validate_scheduled_at(scheduled: DateTime<Utc>, now: DateTime<Utc>) -> ValidationResult<()> {
    let floor = now.duration_trunc(TimeDelta::minutes(1)).unwrap_or(now);
    let ceiling = now.checked_add_months(Months::new(12)).unwrap_or(now);
    if scheduled < floor {
        return Err(ValidationError::ScheduleInPast);
    }
    if scheduled >= ceiling {
        return Err(ValidationError::ScheduleTooFar);
    }
    Ok(())
}

/// Trimmed value, or `Required` when blank.
pub fn require(field: Field, value: &str) -> ValidationResult<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(trimmed)
    }
}

/// Parse an optional `YYYY-MM-DD` input. Blank is `None`.
pub fn parse_date(field: Field, value: &str) -> ValidationResult<Option<NaiveDate>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate(field))
}

/// Parse a non-negative integer input.
pub fn parse_count(field: Field, value: &str) -> ValidationResult<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::NotACount(field))
}

/// Parse an optional non-negative price. Blank is `None`.
pub fn parse_price(value: &str) -> ValidationResult<Option<f64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.replace(',', ".").parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Ok(Some(price)),
        _ => Err(ValidationError::InvalidPrice),
    }
}
