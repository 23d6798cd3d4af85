//! Form/modal controller.
//!
//! A [`FormController`] owns one draft at a time. `submit` runs the draft's
//! validations, asks for confirmation when editing, then POSTs or PUTs the
//! payload. Server rejections are kept in the controller so the same modal
//! can show them.
//!
//! `submit` borrows the controller mutably for the whole request, so a
//! second submit of the same form cannot start while one is in flight.

mod drafts;
mod validate;

pub use drafts::*;
pub use validate::*;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError, ServerMessage};
use crate::models::Entity;

/// Source of "now" for date rules.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Everything a draft needs besides its own fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormContext {
    pub now: DateTime<Utc>,
    /// The user's timezone for date inputs
    pub tz: FixedOffset,
    /// Editing an existing record rather than creating one
    pub editing: bool,
}

impl FormContext {
    /// Today's date in the user's timezone.
    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.tz).date_naive()
    }
}

/// An editable copy of one record type.
pub trait FormDraft: Clone + Default + Send {
    type Record: Entity;

    /// Seed a draft from an existing record.
    fn from_record(record: &Self::Record, ctx: &FormContext) -> Self;

    /// Ordered checks; the first failure wins.
    fn validate(&self, ctx: &FormContext) -> ValidationResult<()>;

    /// JSON body for create/update.
    fn payload(&self, ctx: &FormContext) -> ValidationResult<Value>;
}

/// Yes/no prompt shown before destructive or overwriting requests.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Why a submit did not go through.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Structured 4xx body from the server
    #[error("{}", .0.summary())]
    Server(ServerMessage),

    #[error("{}", .0.user_message())]
    Api(ApiError),

    #[error("No form is open")]
    NotOpen,
}

impl From<ApiError> for FormError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Status {
                status,
                server: Some(message),
                ..
            } if (400..500).contains(&status) && status != 401 && status != 403 => {
                FormError::Server(message)
            }
            other => FormError::Api(other),
        }
    }
}

/// Result of a submit that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<R> {
    Created(R),
    Updated(R),
    /// The user declined the confirmation prompt; the form stays open
    Declined,
}

struct OpenForm<D: FormDraft> {
    draft: D,
    editing: Option<D::Record>,
}

/// Owns the draft and submit lifecycle for one record type.
pub struct FormController<D: FormDraft> {
    api: ApiClient,
    clock: Clock,
    tz: FixedOffset,
    open: Option<OpenForm<D>>,
    error: Option<FormError>,
}

impl<D: FormDraft> FormController<D> {
    pub fn new(api: ApiClient, tz: FixedOffset) -> Self {
        Self {
            api,
            clock: Arc::new(Utc::now),
            tz,
            open: None,
            error: None,
        }
    }

    /// Replace the clock (tests pin "now").
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn context(&self) -> FormContext {
        FormContext {
            now: (self.clock)(),
            tz: self.tz,
            editing: self.editing().is_some(),
        }
    }

    /// Open with an empty draft.
    pub fn open_create(&mut self) {
        self.open_with(D::default());
    }

    /// Open with a prepared draft, e.g. one with a preselected owner.
    pub fn open_with(&mut self, draft: D) {
        self.open = Some(OpenForm {
            draft,
            editing: None,
        });
        self.error = None;
    }

    /// Open a copy of `record` for editing.
    pub fn open_edit(&mut self, record: &D::Record) {
        let ctx = FormContext {
            editing: true,
            ..self.context()
        };
        self.open = Some(OpenForm {
            draft: D::from_record(record, &ctx),
            editing: Some(record.clone()),
        });
        self.error = None;
    }

    /// Close and drop the draft.
    pub fn close(&mut self) {
        self.open = None;
        self.error = None;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn draft(&self) -> Option<&D> {
        self.open.as_ref().map(|o| &o.draft)
    }

    pub fn draft_mut(&mut self) -> Option<&mut D> {
        self.open.as_mut().map(|o| &mut o.draft)
    }

    /// Record being edited, if any.
    pub fn editing(&self) -> Option<&D::Record> {
        self.open.as_ref().and_then(|o| o.editing.as_ref())
    }

    /// Error from the last submit, for the modal's error area.
    pub fn error(&self) -> Option<&FormError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    /// Validate, confirm (edit only) and send the draft.
    ///
    /// On success the form is closed and the stored record returned; the
    /// caller reloads the owning collection.
    pub async fn submit(
        &mut self,
        confirm: &mut impl Confirm,
    ) -> Result<SubmitOutcome<D::Record>, FormError> {
        let ctx = self.context();
        let Some(open) = self.open.as_ref() else {
            return Err(FormError::NotOpen);
        };

        let prepared = open
            .draft
            .validate(&ctx)
            .and_then(|_| open.draft.payload(&ctx));
        let payload = match prepared {
            Ok(payload) => payload,
            Err(e) => return Err(self.fail(e.into())),
        };

        let resource = <D::Record as Entity>::RESOURCE;
        let result = match &open.editing {
            None => {
                debug!(%resource, "creating record");
                self.api
                    .create::<D::Record>(payload)
                    .await
                    .map(SubmitOutcome::Created)
            }
            Some(record) => {
                let prompt = format!("Are you sure you want to update {}?", record.label());
                if !confirm.confirm(&prompt) {
                    return Ok(SubmitOutcome::Declined);
                }
                debug!(%resource, id = %record.id(), "updating record");
                self.api
                    .update::<D::Record>(record.id(), payload)
                    .await
                    .map(SubmitOutcome::Updated)
            }
        };

        match result {
            Ok(outcome) => {
                self.close();
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    fn fail(&mut self, error: FormError) -> FormError {
        let resource = <D::Record as Entity>::RESOURCE;
        warn!(%resource, error = %error, "form submit rejected");
        self.error = Some(error.clone());
        error
    }
}
