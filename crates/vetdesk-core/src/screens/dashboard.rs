//! Landing dashboard.
//!
//! Four collections are fetched concurrently and the screen proceeds only
//! when all of them succeed; one failure fails the batch with one error.

use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use futures_util::future::try_join4;
use serde::Serialize;
use tracing::{debug, warn};

use super::{ScreenError, ScreenResult};
use crate::api::ApiClient;
use crate::config::{ClientConfig, DEFAULT_UPCOMING_LIMIT};
use crate::filter::{scheduled_on_day, upcoming};
use crate::form::Clock;
use crate::models::{Appointment, AppointmentStatus, Client, InventoryItem, Page, Pet, StockLevel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub appointments_today: usize,
    pub total_clients: u64,
    pub total_pets: u64,
    pub pending_appointments: usize,
    pub low_stock_items: usize,
    /// Open appointments, soonest first
    pub upcoming: Vec<Appointment>,
}

impl DashboardSummary {
    /// Compute the summary from first pages of each collection.
    pub fn compute(
        appointments: &Page<Appointment>,
        clients: &Page<Client>,
        pets: &Page<Pet>,
        inventory: &Page<InventoryItem>,
        now: chrono::DateTime<Utc>,
        tz: &FixedOffset,
        upcoming_limit: usize,
    ) -> Self {
        let rows = &appointments.results;
        Self {
            appointments_today: scheduled_on_day(rows, now, tz),
            total_clients: clients.count.max(clients.results.len() as u64),
            total_pets: pets.count.max(pets.results.len() as u64),
            pending_appointments: rows
                .iter()
                .filter(|a| a.status == AppointmentStatus::Pending)
                .count(),
            low_stock_items: inventory
                .results
                .iter()
                .filter(|item| item.stock_level() != StockLevel::Normal)
                .count(),
            upcoming: upcoming(rows, upcoming_limit).into_iter().cloned().collect(),
        }
    }

    /// Restock banner text, when anything needs reordering.
    pub fn low_stock_notice(&self) -> Option<String> {
        match self.low_stock_items {
            0 => None,
            1 => Some("There is 1 item with low stock that needs restocking.".to_string()),
            n => Some(format!(
                "There are {} items with low stock that need restocking.",
                n
            )),
        }
    }
}

pub struct Dashboard {
    api: ApiClient,
    tz: FixedOffset,
    clock: Clock,
    upcoming_limit: usize,
    summary: Option<DashboardSummary>,
    error: Option<ScreenError>,
}

impl Dashboard {
    pub fn new(api: ApiClient, tz: FixedOffset) -> Self {
        Self {
            api,
            tz,
            clock: Arc::new(Utc::now),
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
            summary: None,
            error: None,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_upcoming_limit(mut self, limit: usize) -> Self {
        self.upcoming_limit = limit;
        self
    }

    pub fn with_config(self, config: &ClientConfig) -> Self {
        self.with_upcoming_limit(config.upcoming_limit)
    }

    pub fn summary(&self) -> Option<&DashboardSummary> {
        self.summary.as_ref()
    }

    pub fn error(&self) -> Option<&ScreenError> {
        self.error.as_ref()
    }

    pub async fn load(&mut self) -> ScreenResult<&DashboardSummary> {
        debug!("loading dashboard");
        let fetched = try_join4(
            self.api.list::<Appointment>(&[]),
            self.api.list::<Client>(&[]),
            self.api.list::<Pet>(&[]),
            self.api.list::<InventoryItem>(&[]),
        )
        .await;

        match fetched {
            Ok((appointments, clients, pets, inventory)) => {
                let summary = DashboardSummary::compute(
                    &appointments,
                    &clients,
                    &pets,
                    &inventory,
                    (self.clock)(),
                    &self.tz,
                    self.upcoming_limit,
                );
                self.error = None;
                Ok(&*self.summary.insert(summary))
            }
            Err(e) => {
                warn!(error = %e, "failed to load dashboard");
                let error = ScreenError::from(e);
                self.summary = None;
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }
}
