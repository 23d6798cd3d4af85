//! End-to-end screen flows against the in-memory API fake.

use std::sync::Arc;

use chrono::{FixedOffset, TimeZone, Utc};
use serde_json::json;
use vetdesk_core::api::{ApiTransport, FakeApi, Method, Resource};
use vetdesk_core::filter::CategoryFilter;
use vetdesk_core::form::{ClientDraft, Clock, FormError};
use vetdesk_core::screens::{
    AppointmentBoard, ClientScreen, Dashboard, InventoryScreen, Navigator, UserAdminScreen,
};
use vetdesk_core::{
    ApiClient, AppointmentStatus, AuthFailurePolicy, ClientConfig, Database, FetchScope, LoginError,
    LoginIdentifier, PickerKey, Role, ScreenError, Section, SessionHolder, StatusAction,
    StockLevel, SubmitOutcome,
};

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn clock() -> Clock {
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
    Arc::new(move || now)
}

fn ana() -> ClientDraft {
    ClientDraft {
        name: "Ana".into(),
        surname: "García".into(),
        email: "ana@example.com".into(),
        phone: "5551234567".into(),
        address: "Calle 1".into(),
    }
}

// =========================================================================
// Session
// =========================================================================

fn vet_account(fake: &FakeApi) {
    fake.add_account(
        "lperez",
        "laura@clinic.example",
        "s3creta",
        json!({"username": "lperez", "email": "laura@clinic.example", "nombre": "Laura Pérez", "rol": "VETERINARIO"}),
    );
}

#[tokio::test]
async fn test_login_by_email_then_navigate() {
    let fake = Arc::new(FakeApi::new());
    vet_account(&fake);
    let holder = SessionHolder::in_memory();
    let api = ApiClient::new(fake.clone(), &holder, AuthFailurePolicy::KeepSession);

    let profile = holder
        .login(
            &api,
            &LoginIdentifier::Email("laura@clinic.example".into()),
            "s3creta",
        )
        .await
        .unwrap();
    assert_eq!(profile.display_name, "Laura Pérez");
    assert_eq!(profile.role, Role::Veterinarian);
    assert!(holder.is_authenticated());

    let mut nav = Navigator::new(holder.context());
    assert_eq!(nav.current(), Section::Dashboard);
    assert_eq!(
        nav.navigate(Section::MedicalRecords),
        Ok(Section::MedicalRecords)
    );
    assert_eq!(
        nav.navigate(Section::Reports),
        Err(ScreenError::Forbidden(Section::Reports))
    );
}

#[tokio::test]
async fn test_login_failures() {
    let fake = Arc::new(FakeApi::new());
    vet_account(&fake);
    let holder = SessionHolder::in_memory();
    let api = ApiClient::new(fake.clone(), &holder, AuthFailurePolicy::KeepSession);

    let bad_email = holder
        .login(&api, &LoginIdentifier::Email("laura@clinic".into()), "x")
        .await;
    assert_eq!(bad_email, Err(LoginError::InvalidEmail));
    // client-side failures never reach the server
    assert!(fake.requests().is_empty());

    let wrong = holder
        .login(&api, &LoginIdentifier::Username("lperez".into()), "nope")
        .await;
    assert_eq!(wrong, Err(LoginError::InvalidCredentials));

    fake.deactivate("lperez");
    let disabled = holder
        .login(&api, &LoginIdentifier::Username("lperez".into()), "s3creta")
        .await;
    assert_eq!(disabled, Err(LoginError::AccountDisabled));
    assert!(!holder.is_authenticated());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.db");
    let fake = Arc::new(FakeApi::new());
    vet_account(&fake);

    {
        let holder = SessionHolder::new(Database::open(&path).unwrap());
        let api = ApiClient::new(fake.clone(), &holder, AuthFailurePolicy::KeepSession);
        holder
            .login(&api, &LoginIdentifier::Username("lperez".into()), "s3creta")
            .await
            .unwrap();
    }

    let restored = SessionHolder::new(Database::open(&path).unwrap());
    assert!(restored.is_authenticated());
    assert_eq!(restored.profile().unwrap().role, Role::Veterinarian);

    restored.logout();
    let after_logout = SessionHolder::new(Database::open(&path).unwrap());
    assert!(!after_logout.is_authenticated());
}

#[tokio::test]
async fn test_clear_session_policy_logs_out_on_401() {
    let fake = Arc::new(FakeApi::new());
    let (holder, api) = fake.signed_in(Role::Receptionist, AuthFailurePolicy::ClearSession);
    let mut clients = ClientScreen::new(api, utc(), FetchScope::FirstPage);

    fake.fail_next(Method::Get, 401, json!({"detail": "Invalid token."}));
    let err = clients.load().await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid token.");
    assert!(!holder.is_authenticated());

    // the next load fails locally without a request
    let sent = fake.requests().len();
    assert!(clients.load().await.is_err());
    assert_eq!(fake.requests().len(), sent);
}

// =========================================================================
// Clients
// =========================================================================

#[tokio::test]
async fn test_client_create_appears_once() {
    let fake = Arc::new(FakeApi::new());
    let (_, api) = fake.signed_in(Role::Receptionist, AuthFailurePolicy::KeepSession);
    let mut clients = ClientScreen::new(api, utc(), FetchScope::FirstPage);
    clients.load().await.unwrap();
    assert!(clients.list().is_empty());

    clients.form_mut().open_with(ana());
    let outcome = clients.submit(&mut |_: &str| true).await.unwrap();
    let created = match outcome {
        SubmitOutcome::Created(client) => client,
        other => panic!("expected a create, got {:?}", other),
    };
    assert!(!clients.form().is_open());

    let names: Vec<String> = clients.list().items().iter().map(|c| c.full_name()).collect();
    assert_eq!(names, vec!["Ana García"]);
    assert_eq!(clients.list().items()[0].id, created.id);
    assert_eq!(fake.records(Resource::Clients).len(), 1);

    clients.filter_mut().set_search("GARC");
    assert_eq!(clients.visible().len(), 1);
    clients.filter_mut().set_search("pérez");
    assert!(clients.visible().is_empty());
}

#[tokio::test]
async fn test_unchanged_edit_succeeds() {
    let fake = Arc::new(FakeApi::new());
    fake.seed(
        Resource::Clients,
        json!({"nombre": "Ana", "apellido": "García", "email": "ana@example.com", "telefono": "5551234567"}),
    );
    let (_, api) = fake.signed_in(Role::Receptionist, AuthFailurePolicy::KeepSession);
    let mut clients = ClientScreen::new(api, utc(), FetchScope::FirstPage);
    clients.load().await.unwrap();

    let record = clients.list().items()[0].clone();
    clients.form_mut().open_edit(&record);

    let mut prompts = Vec::new();
    let outcome = clients
        .submit(&mut |p: &str| {
            prompts.push(p.to_string());
            true
        })
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Updated(ref c) if c.id == record.id));
    assert_eq!(prompts, vec!["Are you sure you want to update Ana García?"]);
    assert_eq!(fake.requests_with(Method::Put).len(), 1);
    assert_eq!(clients.list().len(), 1);
}

#[tokio::test]
async fn test_declined_edit_sends_nothing() {
    let fake = Arc::new(FakeApi::new());
    fake.seed(
        Resource::Clients,
        json!({"nombre": "Ana", "apellido": "García", "email": "ana@example.com", "telefono": "5551234567"}),
    );
    let (_, api) = fake.signed_in(Role::Receptionist, AuthFailurePolicy::KeepSession);
    let mut clients = ClientScreen::new(api, utc(), FetchScope::FirstPage);
    clients.load().await.unwrap();

    let record = clients.list().items()[0].clone();
    clients.form_mut().open_edit(&record);
    let outcome = clients.submit(&mut |_: &str| false).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Declined);
    assert!(clients.form().is_open());
    assert!(fake.requests_with(Method::Put).is_empty());
}

#[tokio::test]
async fn test_server_field_errors_stay_on_form() {
    let fake = Arc::new(FakeApi::new());
    let (_, api) = fake.signed_in(Role::Receptionist, AuthFailurePolicy::KeepSession);
    let mut clients = ClientScreen::new(api, utc(), FetchScope::FirstPage);

    clients.form_mut().open_with(ana());
    fake.fail_next(
        Method::Post,
        400,
        json!({"email": ["Ya existe un cliente con este email."]}),
    );
    let err = clients.submit(&mut |_: &str| true).await.unwrap_err();
    match &err {
        FormError::Server(message) => assert_eq!(
            message.field("email"),
            Some(&["Ya existe un cliente con este email.".to_string()][..])
        ),
        other => panic!("expected a server error, got {:?}", other),
    }
    assert_eq!(
        clients.form().error_message().as_deref(),
        Some("email: Ya existe un cliente con este email.")
    );
    assert!(clients.form().is_open());
    assert!(fake.records(Resource::Clients).is_empty());
}

#[tokio::test]
async fn test_disconnect_reports_connection_error() {
    let fake = Arc::new(FakeApi::new());
    let (_, api) = fake.signed_in(Role::Receptionist, AuthFailurePolicy::KeepSession);
    let mut clients = ClientScreen::new(api, utc(), FetchScope::FirstPage);

    fake.disconnect_next();
    assert!(clients.load().await.is_err());
    assert_eq!(
        clients.list().error_message().as_deref(),
        Some("Connection error. Please try again.")
    );
    assert!(clients.list().is_empty());
}

// =========================================================================
// Appointments
// =========================================================================

#[tokio::test]
async fn test_appointment_booking_and_lifecycle() {
    let fake = Arc::new(FakeApi::new());
    let ana = fake.seed(
        Resource::Clients,
        json!({"nombre": "Ana", "apellido": "García", "email": "ana@example.com", "telefono": "5551234567"}),
    );
    let luna = fake.seed(
        Resource::Pets,
        json!({"nombre": "Luna", "especie": "Gato", "propietario": ana.as_str().parse::<u64>().unwrap()}),
    );
    let vet = fake.seed(
        Resource::Users,
        json!({"username": "lperez", "first_name": "Laura", "last_name": "Pérez", "email": "laura@clinic.example", "rol": "VETERINARIO", "especialidad": "Cirugía"}),
    );

    let (_, api) = fake.signed_in(Role::Receptionist, AuthFailurePolicy::KeepSession);
    let mut board = AppointmentBoard::new(api, utc()).with_clock(clock());
    board.load().await.unwrap();
    assert_eq!(board.vet_options()[0].label, "Laura Pérez - Cirugía");

    board.open_create();
    board.client_picker_mut().input("ana");
    board.client_key(PickerKey::Enter).await.unwrap();
    assert_eq!(board.pet_options()[0].id, luna);

    let draft = board.screen_mut().form_mut().draft_mut().unwrap();
    assert_eq!(draft.client.as_ref().map(|c| c.id.clone()), Some(ana));
    draft.pet = Some(luna.clone());
    draft.veterinarian = Some(vet);
    draft.scheduled_local = "2024-05-11T10:00".into();
    draft.reason = "Control".into();

    let created = match board.submit(&mut |_: &str| true).await.unwrap() {
        SubmitOutcome::Created(appointment) => appointment,
        other => panic!("expected a create, got {:?}", other),
    };
    assert_eq!(created.status, AppointmentStatus::Pending);
    assert_eq!(board.visible().len(), 1);

    let confirmed = board
        .change_status(&created.id, StatusAction::Confirm)
        .await
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    let patches = fake.requests_with(Method::Patch);
    assert_eq!(patches[0].body, Some(json!({"estado": "CONFIRMADA"})));

    board
        .change_status(&created.id, StatusAction::Complete)
        .await
        .unwrap();
    assert_eq!(
        board.screen().list().find(&created.id).map(|a| a.status),
        Some(AppointmentStatus::Completed)
    );

    let err = board
        .change_status(&created.id, StatusAction::Cancel)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ScreenError::InvalidTransition {
            from: AppointmentStatus::Completed,
            action: StatusAction::Cancel,
        }
    );
    assert_eq!(fake.requests_with(Method::Patch).len(), 2);

    board
        .screen_mut()
        .filter_mut()
        .set_category(CategoryFilter::Only(AppointmentStatus::Pending));
    assert!(board.visible().is_empty());
}

#[tokio::test]
async fn test_deleting_a_vet_keeps_their_appointments_visible() {
    let fake = Arc::new(FakeApi::new());
    let ana = fake.seed(
        Resource::Clients,
        json!({"nombre": "Ana", "apellido": "García", "email": "ana@example.com", "telefono": "5551234567"}),
    );
    let luna = fake.seed(
        Resource::Pets,
        json!({"nombre": "Luna", "especie": "Gato", "propietario": ana.as_str().parse::<u64>().unwrap()}),
    );
    let vet = fake.seed(
        Resource::Users,
        json!({"username": "lperez", "first_name": "Laura", "last_name": "Pérez", "email": "laura@clinic.example", "rol": "VETERINARIO"}),
    );
    let luna_id = luna.as_str().parse::<u64>().unwrap();
    let vet_id = vet.as_str().parse::<u64>().unwrap();
    for (day, vet) in [(11, json!(vet_id)), (12, json!(null))] {
        fake.seed(
            Resource::Appointments,
            json!({"mascota": luna_id, "veterinario": vet, "motivo": "Control",
                   "fecha_programada": format!("2024-05-{}T10:00:00Z", day)}),
        );
    }

    let (_, admin) = fake.signed_in(Role::SystemAdmin, AuthFailurePolicy::KeepSession);
    let mut users = UserAdminScreen::new(admin, utc(), FetchScope::FirstPage);
    users.load().await.unwrap();
    assert!(users.delete(&vet, &mut |_: &str| true).await.unwrap());

    let (_, api) = fake.signed_in(Role::Receptionist, AuthFailurePolicy::KeepSession);
    let mut board = AppointmentBoard::new(api.clone(), utc()).with_clock(clock());
    board.load().await.unwrap();
    assert_eq!(board.visible().len(), 2);
    assert!(board.visible().iter().all(|a| a.veterinarian.is_none()));
    assert!(board.vet_options().is_empty());

    let mut dashboard = Dashboard::new(api, utc()).with_clock(clock());
    let summary = dashboard.load().await.unwrap();
    assert_eq!(summary.pending_appointments, 2);
}

// =========================================================================
// Configuration
// =========================================================================

#[tokio::test]
async fn test_configured_page_size_and_upcoming_limit() {
    let fake = Arc::new(FakeApi::new().with_page_size(50));
    for i in 0..12 {
        fake.seed(
            Resource::Clients,
            json!({"nombre": format!("Cliente{}", i), "apellido": "Ruiz", "telefono": "12345678", "email": "c@x.com"}),
        );
        fake.seed(
            Resource::Appointments,
            json!({"mascota": 1, "veterinario": 9, "motivo": "Control",
                   "fecha_programada": format!("2024-05-{}T10:00:00Z", 11 + i)}),
        );
    }
    let config = ClientConfig::from_lookup(|key| match key {
        "VETDESK_PAGE_SIZE" => Some("10".to_string()),
        "VETDESK_UPCOMING_LIMIT" => Some("3".to_string()),
        _ => None,
    })
    .unwrap();
    let (_, api) = fake.signed_in(Role::Receptionist, AuthFailurePolicy::KeepSession);

    let mut defaults = ClientScreen::new(api.clone(), utc(), FetchScope::AllPages);
    defaults.load().await.unwrap();
    assert_eq!(defaults.visible_page().rows.len(), 6);

    let mut configured =
        ClientScreen::new(api.clone(), utc(), FetchScope::AllPages).with_config(&config);
    configured.load().await.unwrap();
    assert_eq!(configured.visible_page().rows.len(), 10);
    assert_eq!(configured.visible_page().total_pages, 2);

    let mut dashboard = Dashboard::new(api, utc())
        .with_clock(clock())
        .with_config(&config);
    let summary = dashboard.load().await.unwrap();
    assert_eq!(summary.upcoming.len(), 3);
}

// =========================================================================
// Inventory
// =========================================================================

#[tokio::test]
async fn test_inventory_labels_and_gauge() {
    let fake = Arc::new(FakeApi::new());
    for (name, qty, reorder) in [("Gasas", 0, 5), ("Jeringas", 4, 5), ("Vendas", 30, 5)] {
        fake.seed(
            Resource::Inventory,
            json!({"nombre": name, "cantidad": qty, "nivel_reorden": reorder}),
        );
    }
    let (_, api) = fake.signed_in(Role::Administrator, AuthFailurePolicy::KeepSession);
    let mut inventory = InventoryScreen::new(api, utc(), FetchScope::AllPages);
    inventory.load().await.unwrap();

    let rows: Vec<(&str, &str, f64)> = inventory
        .list()
        .items()
        .iter()
        .map(|i| (i.name.as_str(), i.stock_level().label(), i.fill_percent()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Gasas", "Sin Stock", 0.0),
            ("Jeringas", "Stock Bajo", 40.0),
            ("Vendas", "Stock Normal", 100.0),
        ]
    );

    inventory
        .filter_mut()
        .set_category(CategoryFilter::Only(StockLevel::Low));
    assert_eq!(inventory.visible().len(), 1);
}

#[test]
fn test_fake_is_a_transport() {
    fn assert_transport<T: ApiTransport>() {}
    assert_transport::<FakeApi>();
}
