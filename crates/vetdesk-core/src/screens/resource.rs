//! Generic list + modal screen.

use chrono::FixedOffset;
use tracing::{debug, warn};

use super::{ScreenError, ScreenResult};
use crate::api::{ApiClient, ApiResult, Query};
use crate::autocomplete::Selection;
use crate::config::ClientConfig;
use crate::fetch::{FetchScope, LocalPatch, ResourceList};
use crate::filter::{FilterState, PageView, Searchable};
use crate::form::{
    Clock, ClientDraft, Confirm, FormController, FormDraft, FormError, InventoryDraft, PetDraft,
    SubmitOutcome, UserDraft,
};
use crate::models::{partition_by_stock, Entity, InventoryItem, RecordId};

/// One collection with search, paging, a create/edit modal and delete.
pub struct ResourceScreen<D>
where
    D: FormDraft,
    D::Record: Searchable,
{
    api: ApiClient,
    list: ResourceList<D::Record>,
    form: FormController<D>,
    filter: FilterState<<D::Record as Searchable>::Category>,
    error: Option<ScreenError>,
}

pub type ClientScreen = ResourceScreen<ClientDraft>;
pub type PetScreen = ResourceScreen<PetDraft>;
pub type InventoryScreen = ResourceScreen<InventoryDraft>;
pub type UserAdminScreen = ResourceScreen<UserDraft>;

impl<D> ResourceScreen<D>
where
    D: FormDraft,
    D::Record: Searchable,
{
    pub fn new(api: ApiClient, tz: FixedOffset, scope: FetchScope) -> Self {
        Self {
            list: ResourceList::new(api.clone(), scope),
            form: FormController::new(api.clone(), tz),
            filter: FilterState::default(),
            error: None,
            api,
        }
    }

    /// Server-side list filters, e.g. `?rol=VETERINARIO`.
    pub fn with_params(mut self, params: Query) -> Self {
        self.list.set_params(params);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.filter.page_size = page_size.max(1);
        self
    }

    /// Apply the configured rows per page.
    pub fn with_config(self, config: &ClientConfig) -> Self {
        self.with_page_size(config.page_size)
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.form = self.form.with_clock(clock);
        self
    }

    pub fn list(&self) -> &ResourceList<D::Record> {
        &self.list
    }

    pub fn form(&self) -> &FormController<D> {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormController<D> {
        &mut self.form
    }

    pub fn filter(&self) -> &FilterState<<D::Record as Searchable>::Category> {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut FilterState<<D::Record as Searchable>::Category> {
        &mut self.filter
    }

    /// Last delete failure, if any.
    pub fn error(&self) -> Option<&ScreenError> {
        self.error.as_ref()
    }

    pub async fn load(&mut self) -> ApiResult<()> {
        self.list.load().await
    }

    /// Filtered rows in collection order.
    pub fn visible(&self) -> Vec<&D::Record> {
        self.filter.apply(self.list.items())
    }

    pub fn visible_page(&self) -> PageView<&D::Record> {
        self.filter.page_of(&self.visible())
    }

    pub fn next_page(&mut self) {
        let total = self.visible().len();
        self.filter.next_page(total);
    }

    pub fn previous_page(&mut self) {
        self.filter.previous_page();
    }

    /// Submit the open form and reconcile the list on success.
    pub async fn submit(
        &mut self,
        confirm: &mut impl Confirm,
    ) -> Result<SubmitOutcome<D::Record>, FormError> {
        let outcome = self.form.submit(confirm).await?;
        let patch = match &outcome {
            SubmitOutcome::Created(record) => LocalPatch::Insert(record.clone()),
            SubmitOutcome::Updated(record) => LocalPatch::Replace(record.clone()),
            SubmitOutcome::Declined => return Ok(outcome),
        };
        // A failed reload is recorded on the list
        let _ = self.list.reconcile(patch).await;
        Ok(outcome)
    }

    /// Patch the list locally, then reload it.
    pub async fn reconcile(&mut self, patch: LocalPatch<D::Record>) -> ApiResult<()> {
        self.list.reconcile(patch).await
    }

    /// Ask, then delete one loaded record.
    ///
    /// Returns `Ok(false)` when the user declines.
    pub async fn delete(&mut self, id: &RecordId, confirm: &mut impl Confirm) -> ScreenResult<bool> {
        let resource = <D::Record as Entity>::RESOURCE;
        let Some(record) = self.list.find(id) else {
            return Err(self.fail(ScreenError::NotLoaded(id.clone())));
        };
        let prompt = format!("Are you sure you want to delete {}?", record.label());
        if !confirm.confirm(&prompt) {
            return Ok(false);
        }

        debug!(%resource, %id, "deleting record");
        if let Err(e) = self.api.delete::<D::Record>(id).await {
            return Err(self.fail(e.into()));
        }
        self.error = None;
        let _ = self.list.reconcile(LocalPatch::Remove(id.clone())).await;
        Ok(true)
    }

    pub(crate) fn fail(&mut self, error: ScreenError) -> ScreenError {
        let resource = <D::Record as Entity>::RESOURCE;
        warn!(%resource, error = %error, "screen action failed");
        self.error = Some(error.clone());
        error
    }
}

impl ResourceScreen<PetDraft> {
    /// Open the create form with the owner already chosen.
    pub fn open_for_owner(&mut self, owner: Selection) {
        self.form.open_with(PetDraft {
            owner: Some(owner),
            ..PetDraft::default()
        });
    }
}

impl ResourceScreen<InventoryDraft> {
    /// Loaded items split into (needs reorder, normal).
    pub fn stock_partition(&self) -> (Vec<&InventoryItem>, Vec<&InventoryItem>) {
        partition_by_stock(self.list.items())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AuthFailurePolicy, FakeApi, Method, Resource};
    use crate::filter::CategoryFilter;
    use crate::models::{Role, StockLevel};
    use serde_json::json;
    use std::sync::Arc;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn inventory(fake: &Arc<FakeApi>) -> InventoryScreen {
        let (_, api) = fake.signed_in(Role::Administrator, AuthFailurePolicy::KeepSession);
        InventoryScreen::new(api, utc(), FetchScope::FirstPage)
    }

    fn seed_items(fake: &FakeApi) {
        for (name, qty, reorder) in [("Gasas", 3, 5), ("Jeringas", 0, 10), ("Vendas", 10, 5)] {
            fake.seed(
                Resource::Inventory,
                json!({"nombre": name, "cantidad": qty, "nivel_reorden": reorder, "precio": "2.50"}),
            );
        }
    }

    #[tokio::test]
    async fn test_delete_declined_sends_nothing() {
        let fake = Arc::new(FakeApi::new());
        seed_items(&fake);
        let mut screen = inventory(&fake);
        screen.load().await.unwrap();
        let id = screen.list().items()[0].id.clone();

        let mut prompt = String::new();
        let deleted = screen
            .delete(&id, &mut |p: &str| {
                prompt = p.to_string();
                false
            })
            .await
            .unwrap();
        assert!(!deleted);
        assert_eq!(prompt, "Are you sure you want to delete Gasas?");
        assert!(fake.requests_with(Method::Delete).is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_and_reloads() {
        let fake = Arc::new(FakeApi::new());
        seed_items(&fake);
        let mut screen = inventory(&fake);
        screen.load().await.unwrap();
        let id = screen.list().items()[1].id.clone();

        assert!(screen.delete(&id, &mut |_: &str| true).await.unwrap());
        assert_eq!(screen.list().len(), 2);
        assert!(screen.list().find(&id).is_none());
        // initial load, delete, reconciliation reload
        assert_eq!(fake.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_failure_is_kept() {
        let fake = Arc::new(FakeApi::new());
        seed_items(&fake);
        let mut screen = inventory(&fake);
        screen.load().await.unwrap();
        let id = screen.list().items()[0].id.clone();

        fake.fail_next(Method::Delete, 403, json!({"detail": "You do not have permission."}));
        let err = screen.delete(&id, &mut |_: &str| true).await.unwrap_err();
        assert_eq!(err.to_string(), "You do not have permission.");
        assert_eq!(screen.error(), Some(&err));
        assert_eq!(screen.list().len(), 3);

        let missing = RecordId::from("404");
        assert_eq!(
            screen.delete(&missing, &mut |_: &str| true).await,
            Err(ScreenError::NotLoaded(missing.clone()))
        );
    }

    #[tokio::test]
    async fn test_stock_views() {
        let fake = Arc::new(FakeApi::new());
        seed_items(&fake);
        let mut screen = inventory(&fake);
        screen.load().await.unwrap();

        let (low, normal) = screen.stock_partition();
        assert_eq!(low.len(), 2);
        assert_eq!(normal[0].name, "Vendas");

        screen
            .filter_mut()
            .set_category(CategoryFilter::Only(StockLevel::OutOfStock));
        let names: Vec<_> = screen.visible().iter().map(|i| i.name.clone()).collect();
        assert_eq!(names, vec!["Jeringas"]);
    }

    #[tokio::test]
    async fn test_visible_page() {
        let fake = Arc::new(FakeApi::new());
        for i in 0..8 {
            fake.seed(
                Resource::Clients,
                json!({"nombre": format!("Cliente{}", i), "apellido": "Ruiz", "telefono": "12345678", "email": "c@x.com"}),
            );
        }
        let (_, api) = fake.signed_in(Role::Receptionist, AuthFailurePolicy::KeepSession);
        let mut screen = ClientScreen::new(api, utc(), FetchScope::FirstPage);
        screen.load().await.unwrap();

        let first = screen.visible_page();
        assert_eq!(first.rows.len(), 6);
        assert_eq!(first.total_pages, 2);

        screen.next_page();
        let second = screen.visible_page();
        assert_eq!(second.rows.len(), 2);
        assert_eq!(second.rows[0].name, "Cliente6");

        // past the end stays on the last page, one step back is page 1
        screen.next_page();
        screen.next_page();
        assert_eq!(screen.filter().page, 2);
        screen.previous_page();
        assert_eq!(screen.visible_page().page, 1);
    }
}
