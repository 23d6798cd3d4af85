//! List/fetch controller.
//!
//! A [`ResourceList`] loads one collection, either its first page or every
//! page, and keeps the result for the filter view. Failures never escape as
//! panics or unhandled errors: the list is emptied and the error recorded.
//!
//! Mutations follow one policy everywhere. The server-confirmed record is
//! patched into the local list right away ([`LocalPatch`]), then the list is
//! reloaded to reconcile with authoritative server state.

use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError, ApiResult, Query};
use crate::models::{Entity, RecordId};

/// How much of a collection to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchScope {
    /// One GET, `.results` only
    #[default]
    FirstPage,
    /// Follow `next` links to the end
    AllPages,
}

/// A local change applied ahead of the reconciliation reload.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalPatch<E> {
    Insert(E),
    Replace(E),
    Remove(RecordId),
}

/// In-memory cache of one collection.
pub struct ResourceList<E: Entity> {
    api: ApiClient,
    scope: FetchScope,
    params: Query,
    items: Vec<E>,
    /// Server-side total from the last page envelope
    total: u64,
    error: Option<ApiError>,
    loaded: bool,
}

impl<E: Entity> ResourceList<E> {
    pub fn new(api: ApiClient, scope: FetchScope) -> Self {
        Self {
            api,
            scope,
            params: Query::new(),
            items: Vec::new(),
            total: 0,
            error: None,
            loaded: false,
        }
    }

    /// Query parameters sent with every load, e.g. `?propietario=<id>`.
    pub fn with_params(mut self, params: Query) -> Self {
        self.params = params;
        self
    }

    pub fn set_params(&mut self, params: Query) {
        self.params = params;
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total reported by the server, which can exceed `len()` for first-page loads.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether at least one load has finished.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ApiError::user_message)
    }

    pub fn find(&self, id: &RecordId) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// (Re)load the collection.
    ///
    /// On failure the list is emptied and the error kept for display; the
    /// error is also returned for callers that need to branch on it.
    pub async fn load(&mut self) -> ApiResult<()> {
        let resource = E::RESOURCE;
        debug!(%resource, scope = ?self.scope, params = ?self.params, "loading collection");

        let result = match self.scope {
            FetchScope::FirstPage => self
                .api
                .list::<E>(&self.params)
                .await
                .map(|page| (page.count, page.results)),
            FetchScope::AllPages => self
                .api
                .list_all::<E>(&self.params)
                .await
                .map(|records| (records.len() as u64, records)),
        };
        self.loaded = true;

        match result {
            Ok((total, items)) => {
                self.items = items;
                self.total = total;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                warn!(%resource, error = %e, "failed to load collection");
                self.items.clear();
                self.total = 0;
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Replace the contents with records fetched elsewhere.
    pub fn set_items(&mut self, items: Vec<E>) {
        self.total = items.len() as u64;
        self.items = items;
        self.error = None;
        self.loaded = true;
    }

    /// Empty the list and record `error`.
    pub fn fail(&mut self, error: ApiError) {
        warn!(resource = %E::RESOURCE, error = %error, "collection unavailable");
        self.items.clear();
        self.total = 0;
        self.error = Some(error);
        self.loaded = true;
    }

    /// Apply a confirmed mutation locally.
    pub fn apply(&mut self, patch: LocalPatch<E>) {
        match patch {
            LocalPatch::Insert(record) => {
                if !self.items.iter().any(|item| item.id() == record.id()) {
                    self.items.push(record);
                    self.total += 1;
                }
            }
            LocalPatch::Replace(record) => {
                if let Some(slot) = self.items.iter_mut().find(|item| item.id() == record.id()) {
                    *slot = record;
                }
            }
            LocalPatch::Remove(id) => {
                let before = self.items.len();
                self.items.retain(|item| item.id() != &id);
                if self.items.len() < before {
                    self.total = self.total.saturating_sub(1);
                }
            }
        }
    }

    /// Apply `patch`, then reload to reconcile with the server.
    pub async fn reconcile(&mut self, patch: LocalPatch<E>) -> ApiResult<()> {
        self.apply(patch);
        self.load().await
    }
}
