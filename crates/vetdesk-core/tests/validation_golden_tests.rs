//! Golden tests for form validation.
//!
//! Each case is a draft and the single error (or success) expected from it.

use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use vetdesk_core::form::{
    AppointmentDraft, ClientDraft, Field, FormContext, FormDraft, InventoryDraft,
    MedicalRecordDraft, PetDraft, UserDraft, VaccineDraft, ValidationError,
};
use vetdesk_core::{RecordId, Selection};

fn ctx(editing: bool) -> FormContext {
    FormContext {
        now: Utc.with_ymd_and_hms(2024, 5, 10, 15, 30, 45).unwrap(),
        // UTC-6
        tz: FixedOffset::east_opt(-6 * 3600).unwrap(),
        editing,
    }
}

fn pick(id: &str, label: &str) -> Option<Selection> {
    Some(Selection {
        id: RecordId::from(id),
        label: label.to_string(),
    })
}

struct GoldenCase<D> {
    id: &'static str,
    draft: D,
    expected: Result<(), ValidationError>,
}

fn check<D: FormDraft + std::fmt::Debug>(cases: Vec<GoldenCase<D>>, ctx: &FormContext) {
    for case in cases {
        assert_eq!(
            case.draft.validate(ctx),
            case.expected,
            "case {} ({:?})",
            case.id,
            case.draft
        );
    }
}

fn client() -> ClientDraft {
    ClientDraft {
        name: "Ana".into(),
        surname: "García".into(),
        email: "ana@example.com".into(),
        phone: "12345678".into(),
        address: String::new(),
    }
}

#[test]
fn test_client_golden() {
    check(
        vec![
            GoldenCase {
                id: "valid",
                draft: client(),
                expected: Ok(()),
            },
            GoldenCase {
                id: "compound-name",
                draft: ClientDraft {
                    name: "Ana María".into(),
                    ..client()
                },
                expected: Ok(()),
            },
            GoldenCase {
                id: "blank-name",
                draft: ClientDraft {
                    name: "   ".into(),
                    ..client()
                },
                expected: Err(ValidationError::Required(Field::Name)),
            },
            GoldenCase {
                id: "presence-before-format",
                draft: ClientDraft {
                    surname: String::new(),
                    email: "broken".into(),
                    ..client()
                },
                expected: Err(ValidationError::Required(Field::Surname)),
            },
            GoldenCase {
                id: "lowercase-name",
                draft: ClientDraft {
                    name: "ana".into(),
                    ..client()
                },
                expected: Err(ValidationError::NameFormat(Field::Name)),
            },
            GoldenCase {
                id: "shouting-surname",
                draft: ClientDraft {
                    surname: "GARCÍA".into(),
                    ..client()
                },
                expected: Err(ValidationError::NameFormat(Field::Surname)),
            },
            GoldenCase {
                id: "email-without-tld",
                draft: ClientDraft {
                    email: "ana@example".into(),
                    ..client()
                },
                expected: Err(ValidationError::EmailFormat),
            },
            GoldenCase {
                id: "short-phone",
                draft: ClientDraft {
                    phone: "1234567".into(),
                    ..client()
                },
                expected: Err(ValidationError::PhoneFormat),
            },
            GoldenCase {
                id: "phone-with-dashes",
                draft: ClientDraft {
                    phone: "1234-5678".into(),
                    ..client()
                },
                expected: Err(ValidationError::PhoneFormat),
            },
        ],
        &ctx(false),
    );
}

fn pet() -> PetDraft {
    PetDraft {
        owner: pick("1", "Ana García"),
        name: "Luna".into(),
        species: "Gato".into(),
        ..PetDraft::default()
    }
}

#[test]
fn test_pet_golden() {
    check(
        vec![
            GoldenCase {
                id: "valid",
                draft: pet(),
                expected: Ok(()),
            },
            GoldenCase {
                id: "no-owner",
                draft: PetDraft {
                    owner: None,
                    ..pet()
                },
                expected: Err(ValidationError::Required(Field::Owner)),
            },
            GoldenCase {
                id: "lowercase-breed",
                draft: PetDraft {
                    breed: "siamés".into(),
                    ..pet()
                },
                expected: Err(ValidationError::BreedFormat),
            },
            GoldenCase {
                id: "breed-with-spaces",
                draft: PetDraft {
                    breed: "Pastor aleman".into(),
                    ..pet()
                },
                expected: Ok(()),
            },
            GoldenCase {
                // the local date is still May 10th at UTC-6
                id: "born-today",
                draft: PetDraft {
                    birth_date: "2024-05-10".into(),
                    ..pet()
                },
                expected: Ok(()),
            },
            GoldenCase {
                id: "born-tomorrow",
                draft: PetDraft {
                    birth_date: "2024-05-11".into(),
                    ..pet()
                },
                expected: Err(ValidationError::DateInFuture(Field::BirthDate)),
            },
            GoldenCase {
                id: "garbled-birth-date",
                draft: PetDraft {
                    birth_date: "10/05/2024".into(),
                    ..pet()
                },
                expected: Err(ValidationError::InvalidDate(Field::BirthDate)),
            },
        ],
        &ctx(false),
    );
}

fn appointment(local: &str) -> AppointmentDraft {
    AppointmentDraft {
        client: pick("1", "Ana García"),
        pet: Some(RecordId::from("2")),
        veterinarian: Some(RecordId::from("9")),
        scheduled_local: local.into(),
        reason: "Vacunación".into(),
        ..AppointmentDraft::default()
    }
}

#[test]
fn test_appointment_golden() {
    // now is 09:30:45 local
    check(
        vec![
            GoldenCase {
                id: "same-minute",
                draft: appointment("2024-05-10T09:30"),
                expected: Ok(()),
            },
            GoldenCase {
                id: "one-minute-ago",
                draft: appointment("2024-05-10T09:29"),
                expected: Err(ValidationError::ScheduleInPast),
            },
            GoldenCase {
                id: "almost-a-year",
                draft: appointment("2025-05-10T09:29"),
                expected: Ok(()),
            },
            GoldenCase {
                id: "a-year-out",
                draft: appointment("2025-05-10T09:31"),
                expected: Err(ValidationError::ScheduleTooFar),
            },
            GoldenCase {
                id: "no-client",
                draft: AppointmentDraft {
                    client: None,
                    ..appointment("2024-05-11T09:00")
                },
                expected: Err(ValidationError::Required(Field::Client)),
            },
            GoldenCase {
                id: "no-vet",
                draft: AppointmentDraft {
                    veterinarian: None,
                    ..appointment("2024-05-11T09:00")
                },
                expected: Err(ValidationError::Required(Field::Veterinarian)),
            },
            GoldenCase {
                id: "blank-reason",
                draft: AppointmentDraft {
                    reason: " ".into(),
                    ..appointment("2024-05-11T09:00")
                },
                expected: Err(ValidationError::Required(Field::Reason)),
            },
        ],
        &ctx(false),
    );
}

fn vaccine(administered: &str, next: &str) -> VaccineDraft {
    VaccineDraft {
        pet: pick("2", "Luna (Ana García)"),
        name: "Rabia".into(),
        administered_date: administered.into(),
        next_dose_date: next.into(),
        notes: String::new(),
    }
}

#[test]
fn test_vaccine_golden() {
    check(
        vec![
            GoldenCase {
                id: "no-next-dose",
                draft: vaccine("2024-05-01", ""),
                expected: Ok(()),
            },
            GoldenCase {
                id: "same-day-next-dose",
                draft: vaccine("2024-05-01", "2024-05-01"),
                expected: Ok(()),
            },
            GoldenCase {
                id: "next-dose-before",
                draft: vaccine("2024-05-01", "2024-04-30"),
                expected: Err(ValidationError::NextDoseBeforeAdministered),
            },
            GoldenCase {
                id: "missing-administered",
                draft: vaccine("", "2024-06-01"),
                expected: Err(ValidationError::Required(Field::AdministeredDate)),
            },
        ],
        &ctx(false),
    );
}

fn record(follow_up: &str) -> MedicalRecordDraft {
    MedicalRecordDraft {
        pet: pick("2", "Luna (Ana García)"),
        veterinarian: Some(RecordId::from("9")),
        symptoms: "Rascado".into(),
        diagnosis: "Otitis".into(),
        treatment: "Gotas".into(),
        follow_up_date: follow_up.into(),
        ..MedicalRecordDraft::default()
    }
}

#[test]
fn test_medical_record_golden() {
    let may_1 = NaiveDate::from_ymd_opt(2024, 5, 1);
    check(
        vec![
            GoldenCase {
                id: "no-follow-up",
                draft: record(""),
                expected: Ok(()),
            },
            GoldenCase {
                id: "follow-up-today",
                draft: record("2024-05-10"),
                expected: Ok(()),
            },
            GoldenCase {
                id: "past-follow-up",
                draft: record("2024-05-01"),
                expected: Err(ValidationError::DateInPast(Field::FollowUpDate)),
            },
            GoldenCase {
                id: "no-pet",
                draft: MedicalRecordDraft {
                    pet: None,
                    ..record("2024-05-01")
                },
                expected: Err(ValidationError::Required(Field::Pet)),
            },
            GoldenCase {
                id: "no-vet",
                draft: MedicalRecordDraft {
                    veterinarian: None,
                    ..record("")
                },
                expected: Err(ValidationError::Required(Field::Veterinarian)),
            },
            GoldenCase {
                id: "blank-diagnosis",
                draft: MedicalRecordDraft {
                    diagnosis: "  ".into(),
                    ..record("")
                },
                expected: Err(ValidationError::Required(Field::Diagnosis)),
            },
            GoldenCase {
                id: "blank-treatment",
                draft: MedicalRecordDraft {
                    treatment: String::new(),
                    ..record("")
                },
                expected: Err(ValidationError::Required(Field::Treatment)),
            },
        ],
        &ctx(false),
    );

    check(
        vec![
            GoldenCase {
                id: "stored-past-follow-up",
                draft: MedicalRecordDraft {
                    stored_follow_up: may_1,
                    ..record("2024-05-01")
                },
                expected: Ok(()),
            },
            GoldenCase {
                id: "changed-to-another-past-date",
                draft: MedicalRecordDraft {
                    stored_follow_up: may_1,
                    ..record("2024-05-02")
                },
                expected: Err(ValidationError::DateInPast(Field::FollowUpDate)),
            },
            GoldenCase {
                id: "garbled-follow-up",
                draft: record("01/05/2024"),
                expected: Err(ValidationError::InvalidDate(Field::FollowUpDate)),
            },
        ],
        &ctx(true),
    );

    let payload = record("").payload(&ctx(false)).unwrap();
    assert_eq!(payload["fecha_seguimiento"], serde_json::Value::Null);
    assert_eq!(payload["diagnostico"], "Otitis");
}

fn item() -> InventoryDraft {
    InventoryDraft {
        name: "Gasas".into(),
        quantity: "10".into(),
        reorder_level: "5".into(),
        ..InventoryDraft::default()
    }
}

#[test]
fn test_inventory_golden() {
    check(
        vec![
            GoldenCase {
                id: "blank-price",
                draft: item(),
                expected: Ok(()),
            },
            GoldenCase {
                id: "comma-price",
                draft: InventoryDraft {
                    price: "2,50".into(),
                    ..item()
                },
                expected: Ok(()),
            },
            GoldenCase {
                id: "negative-quantity",
                draft: InventoryDraft {
                    quantity: "-1".into(),
                    ..item()
                },
                expected: Err(ValidationError::NotACount(Field::Quantity)),
            },
            GoldenCase {
                id: "fractional-reorder",
                draft: InventoryDraft {
                    reorder_level: "2.5".into(),
                    ..item()
                },
                expected: Err(ValidationError::NotACount(Field::ReorderLevel)),
            },
            GoldenCase {
                id: "negative-price",
                draft: InventoryDraft {
                    price: "-3".into(),
                    ..item()
                },
                expected: Err(ValidationError::InvalidPrice),
            },
        ],
        &ctx(false),
    );
}

fn user() -> UserDraft {
    UserDraft {
        username: "lperez".into(),
        first_name: "Laura".into(),
        last_name: "Pérez".into(),
        email: "laura@clinic.example".into(),
        password: "s3creta".into(),
        password_confirmation: "s3creta".into(),
        ..UserDraft::default()
    }
}

#[test]
fn test_user_golden() {
    check(
        vec![
            GoldenCase {
                id: "valid",
                draft: user(),
                expected: Ok(()),
            },
            GoldenCase {
                id: "mismatch",
                draft: UserDraft {
                    password_confirmation: "otra".into(),
                    ..user()
                },
                expected: Err(ValidationError::PasswordMismatch),
            },
            GoldenCase {
                id: "no-password-on-create",
                draft: UserDraft {
                    password: String::new(),
                    password_confirmation: String::new(),
                    ..user()
                },
                expected: Err(ValidationError::PasswordRequired),
            },
        ],
        &ctx(false),
    );

    let keep_password = UserDraft {
        password: String::new(),
        password_confirmation: String::new(),
        ..user()
    };
    assert_eq!(keep_password.validate(&ctx(true)), Ok(()));
}

#[test]
fn test_error_messages() {
    assert_eq!(
        ValidationError::NextDoseBeforeAdministered.field(),
        Some(Field::NextDoseDate)
    );
    assert_eq!(
        ValidationError::ScheduleTooFar.to_string(),
        "Appointment date must be less than one year from now"
    );
}
