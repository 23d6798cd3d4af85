//! Clinic reports computed over complete collections.
//!
//! Appointments, pets and vaccines are fetched with every page followed,
//! concurrently. The summary can be exported as JSON or CSV; the PDF
//! report is rendered by the server and is not handled here.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::FixedOffset;
use futures_util::future::try_join3;
use serde::Serialize;
use tracing::{debug, warn};

use super::{ScreenError, ScreenResult};
use crate::api::ApiClient;
use crate::models::{Appointment, AppointmentStatus, Pet, Vaccine};

const MONTH_FORMAT: &str = "%Y-%m";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: AppointmentStatus,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesShare {
    pub species: String,
    pub count: usize,
    pub percent: f64,
}

/// Count for one `YYYY-MM` month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_appointments: usize,
    pub total_pets: usize,
    pub total_vaccines: usize,
    /// Every status, in status-machine order
    pub appointments_by_status: Vec<StatusCount>,
    /// Most common species first
    pub species: Vec<SpeciesShare>,
    /// Oldest month first
    pub vaccines_per_month: Vec<MonthCount>,
    /// Newest month first
    pub appointments_per_month: Vec<MonthCount>,
    /// Completed appointments over all appointments, in percent
    pub completion_rate: f64,
    /// Pets per distinct owner, rounded
    pub pets_per_client: u64,
    /// Vaccines over pets, in percent
    pub vaccination_coverage: f64,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn month_counts<'a>(months: impl Iterator<Item = String> + 'a) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for month in months {
        *counts.entry(month).or_insert(0) += 1;
    }
    counts
}

impl ReportSummary {
    /// Months are bucketed in `tz` for appointments; vaccine dates are
    /// calendar dates already.
    pub fn compute(
        appointments: &[Appointment],
        pets: &[Pet],
        vaccines: &[Vaccine],
        tz: &FixedOffset,
    ) -> Self {
        let total = appointments.len();
        let appointments_by_status: Vec<StatusCount> = AppointmentStatus::ALL
            .iter()
            .map(|&status| {
                let count = appointments.iter().filter(|a| a.status == status).count();
                StatusCount {
                    status,
                    count,
                    percent: percent(count, total),
                }
            })
            .collect();

        let mut by_species: BTreeMap<&str, usize> = BTreeMap::new();
        for pet in pets {
            *by_species.entry(pet.species.as_str()).or_insert(0) += 1;
        }
        let mut species: Vec<SpeciesShare> = by_species
            .into_iter()
            .map(|(name, count)| SpeciesShare {
                species: name.to_string(),
                count,
                percent: percent(count, pets.len()),
            })
            .collect();
        // stable sort keeps alphabetical order among ties
        species.sort_by(|a, b| b.count.cmp(&a.count));

        let vaccines_per_month = month_counts(
            vaccines
                .iter()
                .map(|v| v.administered_date.format(MONTH_FORMAT).to_string()),
        )
        .into_iter()
        .map(|(month, count)| MonthCount { month, count })
        .collect();

        let appointments_per_month = month_counts(appointments.iter().map(|a| {
            a.scheduled_at
                .with_timezone(tz)
                .format(MONTH_FORMAT)
                .to_string()
        }))
        .into_iter()
        .rev()
        .map(|(month, count)| MonthCount { month, count })
        .collect();

        let completed = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Completed)
            .count();
        let owners: std::collections::BTreeSet<&str> =
            pets.iter().map(|p| p.owner.as_str()).collect();
        let pets_per_client = if owners.is_empty() {
            0
        } else {
            (pets.len() as f64 / owners.len() as f64).round() as u64
        };

        Self {
            total_appointments: total,
            total_pets: pets.len(),
            total_vaccines: vaccines.len(),
            appointments_by_status,
            species,
            vaccines_per_month,
            appointments_per_month,
            completion_rate: percent(completed, total),
            pets_per_client,
            vaccination_coverage: percent(vaccines.len(), pets.len()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Flat CSV: `section,key,count,percent`.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("section,key,count,percent\n");
        let mut row = |section: &str, key: &str, count: usize, pct: Option<f64>| {
            let pct = pct.map(|p| format!("{:.1}", p)).unwrap_or_default();
            // String writes cannot fail
            let _ = writeln!(out, "{},{},{},{}", section, csv_field(key), count, pct);
        };

        row("totals", "appointments", self.total_appointments, None);
        row("totals", "pets", self.total_pets, None);
        row("totals", "vaccines", self.total_vaccines, None);
        for s in &self.appointments_by_status {
            row("appointments_by_status", s.status.as_str(), s.count, Some(s.percent));
        }
        for s in &self.species {
            row("species", &s.species, s.count, Some(s.percent));
        }
        for m in &self.appointments_per_month {
            row("appointments_per_month", &m.month, m.count, None);
        }
        for m in &self.vaccines_per_month {
            row("vaccines_per_month", &m.month, m.count, None);
        }
        out
    }
}

/// Quote a field when it holds a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub struct Reports {
    api: ApiClient,
    tz: FixedOffset,
    summary: Option<ReportSummary>,
    error: Option<ScreenError>,
}

impl Reports {
    pub fn new(api: ApiClient, tz: FixedOffset) -> Self {
        Self {
            api,
            tz,
            summary: None,
            error: None,
        }
    }

    pub fn summary(&self) -> Option<&ReportSummary> {
        self.summary.as_ref()
    }

    pub fn error(&self) -> Option<&ScreenError> {
        self.error.as_ref()
    }

    pub async fn load(&mut self) -> ScreenResult<&ReportSummary> {
        debug!("loading report data");
        let fetched = try_join3(
            self.api.list_all::<Appointment>(&[]),
            self.api.list_all::<Pet>(&[]),
            self.api.list_all::<Vaccine>(&[]),
        )
        .await;

        match fetched {
            Ok((appointments, pets, vaccines)) => {
                let summary = ReportSummary::compute(&appointments, &pets, &vaccines, &self.tz);
                self.error = None;
                Ok(&*self.summary.insert(summary))
            }
            Err(e) => {
                warn!(error = %e, "failed to load report data");
                let error = ScreenError::from(e);
                self.summary = None;
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }
}
