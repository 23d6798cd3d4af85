//! Client-side search, categorical filters, sorting and pagination.
//!
//! Everything here is pure: the functions borrow a loaded collection and
//! return the visible subset without touching the network.

use chrono::{DateTime, Utc};

use crate::config::DEFAULT_PAGE_SIZE;
use crate::models::{
    Appointment, AppointmentStatus, Client, InventoryItem, MedicalRecord, Pet, Role, StockLevel,
    User, Vaccine,
};

/// A record that can be searched by text and narrowed by one category.
pub trait Searchable {
    /// Enumerated value a categorical filter matches against
    type Category: PartialEq + Clone;

    /// Display fields the search text is matched against.
    fn search_fields(&self) -> Vec<&str>;

    fn category(&self) -> Option<Self::Category> {
        None
    }

    /// Case-insensitive substring match over the search fields.
    fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self
                .search_fields()
                .iter()
                .any(|f| f.to_lowercase().contains(&needle))
    }
}

/// A categorical filter: everything, or one exact value.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryFilter<C> {
    All,
    Only(C),
}

impl<C> Default for CategoryFilter<C> {
    fn default() -> Self {
        CategoryFilter::All
    }
}

impl<C: PartialEq> CategoryFilter<C> {
    pub fn accepts(&self, category: Option<&C>) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => category == Some(wanted),
        }
    }
}

/// Records matching `search` and `category`, in their original order.
pub fn filter<'a, T: Searchable>(
    items: &'a [T],
    search: &str,
    category: &CategoryFilter<T::Category>,
) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| category.accepts(item.category().as_ref()) && item.matches_search(search))
        .collect()
}

/// Appointment board order: latest scheduled first.
pub fn sort_by_schedule_desc(rows: &mut [&Appointment]) {
    rows.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
}

/// The upcoming widget: open appointments, soonest first, at most `limit`.
pub fn upcoming(items: &[Appointment], limit: usize) -> Vec<&Appointment> {
    let mut rows: Vec<&Appointment> = items.iter().filter(|a| a.is_open()).collect();
    rows.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
    rows.truncate(limit);
    rows
}

/// Appointments whose scheduled date, in `tz`, equals `now`'s date there.
pub fn scheduled_on_day<Tz: chrono::TimeZone>(
    items: &[Appointment],
    now: DateTime<Utc>,
    tz: &Tz,
) -> usize {
    let today = now.with_timezone(tz).date_naive();
    items
        .iter()
        .filter(|a| a.scheduled_at.with_timezone(tz).date_naive() == today)
        .count()
}

// ============================================================================
// Pagination
// ============================================================================

/// One page of an in-memory subset.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<T> {
    pub rows: Vec<T>,
    /// 1-based, clamped to `1..=total_pages`
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

impl<T> PageView<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

pub fn paginate<T: Clone>(rows: &[T], page: usize, page_size: usize) -> PageView<T> {
    let page_size = page_size.max(1);
    let total_pages = rows.len().div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = ((page - 1) * page_size).min(rows.len());
    let end = (start + page_size).min(rows.len());
    PageView {
        rows: rows[start..end].to_vec(),
        page,
        total_pages,
        total_rows: rows.len(),
    }
}

/// Search box, category selector and page cursor of one list screen.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState<C> {
    pub search: String,
    pub category: CategoryFilter<C>,
    pub page: usize,
    pub page_size: usize,
}

impl<C> Default for FilterState<C> {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: CategoryFilter::All,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl<C: PartialEq + Clone> FilterState<C> {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Changing the search text goes back to the first page.
    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
        self.page = 1;
    }

    pub fn set_category(&mut self, category: CategoryFilter<C>) {
        self.category = category;
        self.page = 1;
    }

    /// Advance one page, stopping at the last page of `total_rows`.
    pub fn next_page(&mut self, total_rows: usize) {
        let total_pages = total_rows.div_ceil(self.page_size.max(1)).max(1);
        self.page = (self.page + 1).min(total_pages);
    }

    pub fn previous_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn apply<'a, T: Searchable<Category = C>>(&self, items: &'a [T]) -> Vec<&'a T> {
        filter(items, &self.search, &self.category)
    }

    /// The current page of already-filtered rows.
    pub fn page_of<T: Clone>(&self, rows: &[T]) -> PageView<T> {
        paginate(rows, self.page, self.page_size)
    }
}

// ============================================================================
// Per-entity search fields
// ============================================================================

impl Searchable for Client {
    type Category = ();

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.surname.as_str(),
            self.email.as_str(),
            self.phone.as_str(),
        ]
    }
}

impl Searchable for Pet {
    type Category = ();

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.species.as_str()];
        fields.extend(self.owner_name.as_deref());
        fields
    }
}

impl Searchable for Appointment {
    type Category = AppointmentStatus;

    fn search_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = [self.client_name.as_deref(), self.pet_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        fields.push(&self.reason);
        fields
    }

    fn category(&self) -> Option<AppointmentStatus> {
        Some(self.status)
    }
}

impl Searchable for MedicalRecord {
    type Category = ();

    fn search_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.pet_name.as_deref().into_iter().collect();
        fields.push(&self.diagnosis);
        fields
    }
}

impl Searchable for Vaccine {
    type Category = ();

    fn search_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.pet_name.as_deref().into_iter().collect();
        fields.push(&self.name);
        fields
    }
}

impl Searchable for InventoryItem {
    type Category = StockLevel;

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.description.as_deref());
        fields
    }

    fn category(&self) -> Option<StockLevel> {
        Some(self.stock_level())
    }
}

impl Searchable for User {
    type Category = Role;

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.email.as_str(),
        ]
    }

    fn category(&self) -> Option<Role> {
        Some(self.role)
    }
}
