//! Screen controllers.
//!
//! Each screen composes the fetch, filter and form controllers for one part
//! of the front office. [`ResourceScreen`] is the generic list + modal screen
//! used for clients, pets, inventory and user accounts; the appointment
//! board, pet history, dashboard and reports add their own steps on top.

mod appointments;
mod dashboard;
mod records;
mod reports;
mod resource;

pub use appointments::*;
pub use dashboard::*;
pub use records::*;
pub use reports::*;
pub use resource::*;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::ApiError;
use crate::models::{AppointmentStatus, RecordId, Role, Section, StatusAction};
use crate::session::SessionContext;

/// Screen-level failures that are not form validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScreenError {
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),

    #[error("Record {0} is not loaded")]
    NotLoaded(RecordId),

    #[error("An appointment in status {} cannot move to {}", .from.as_str(), .action.target().as_str())]
    InvalidTransition {
        from: AppointmentStatus,
        action: StatusAction,
    },

    #[error("Section {0:?} is not available for this role")]
    Forbidden(Section),
}

pub type ScreenResult<T> = Result<T, ScreenError>;

/// Role-gated navigation between sections.
pub struct Navigator {
    session: SessionContext,
    current: Section,
}

impl Navigator {
    pub fn new(session: SessionContext) -> Self {
        let current = session
            .role()
            .map_or(Section::Dashboard, |role| role.landing_section());
        Self { session, current }
    }

    pub fn current(&self) -> Section {
        self.current
    }

    /// Sections the signed-in role may open; empty when signed out.
    pub fn sections(&self) -> &'static [Section] {
        match self.session.role() {
            Some(role) => role.visible_sections(),
            None => &[],
        }
    }

    /// Move to `section` if the role allows it.
    pub fn navigate(&mut self, section: Section) -> ScreenResult<Section> {
        let role: Role = self.session.role().ok_or(ApiError::NoSession)?;
        if !role.can_access(section) {
            warn!(?role, ?section, "navigation refused");
            return Err(ScreenError::Forbidden(section));
        }
        self.current = section;
        Ok(section)
    }

    /// Back to the role's landing section, e.g. right after login.
    pub fn reset(&mut self) -> Section {
        self.current = self
            .session
            .role()
            .map_or(Section::Dashboard, |role| role.landing_section());
        info!(section = ?self.current, "navigated to landing section");
        self.current
    }
}
