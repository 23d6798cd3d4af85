//! Appointment board: list, status actions and the appointment modal.
//!
//! The modal's pet selector depends on the chosen client. Picking a client
//! loads `pets/mascotas/?propietario=<id>`. Editing starts with an explicit
//! owner lookup: the appointment only names its pet, so the pet record is
//! fetched to find the client before the form opens.

use chrono::FixedOffset;
use futures_util::future::join3;
use serde_json::json;
use tracing::{debug, info};

use super::{ResourceScreen, ScreenError, ScreenResult};
use crate::api::{query, ApiClient, ApiResult};
use crate::autocomplete::{Autocomplete, PickerEvent, PickerItem, PickerKey, Selection};
use crate::config::ClientConfig;
use crate::fetch::{FetchScope, LocalPatch, ResourceList};
use crate::filter::{sort_by_schedule_desc, PageView};
use crate::form::{AppointmentDraft, Clock, Confirm, FormError, SubmitOutcome};
use crate::models::{Appointment, Client, Pet, RecordId, Role, StatusAction, User};

/// Veterinarians for vet selectors: `accounts/users/?rol=VETERINARIO`.
pub fn vet_list(api: ApiClient) -> ResourceList<User> {
    ResourceList::new(api, FetchScope::FirstPage)
        .with_params(query([("rol", Role::Veterinarian.as_str())]))
}

pub struct AppointmentBoard {
    api: ApiClient,
    screen: ResourceScreen<AppointmentDraft>,
    clients: ResourceList<Client>,
    vets: ResourceList<User>,
    /// Pets of the client chosen in the modal
    owner_pets: ResourceList<Pet>,
    client_picker: Autocomplete,
}

impl AppointmentBoard {
    pub fn new(api: ApiClient, tz: FixedOffset) -> Self {
        Self {
            screen: ResourceScreen::new(api.clone(), tz, FetchScope::FirstPage),
            clients: ResourceList::new(api.clone(), FetchScope::AllPages),
            vets: vet_list(api.clone()),
            owner_pets: ResourceList::new(api.clone(), FetchScope::AllPages),
            client_picker: Autocomplete::default(),
            api,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.screen = self.screen.with_clock(clock);
        self
    }

    pub fn with_config(mut self, config: &ClientConfig) -> Self {
        self.screen = self.screen.with_config(config);
        self
    }

    pub fn screen(&self) -> &ResourceScreen<AppointmentDraft> {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut ResourceScreen<AppointmentDraft> {
        &mut self.screen
    }

    pub fn clients(&self) -> &ResourceList<Client> {
        &self.clients
    }

    pub fn vets(&self) -> &ResourceList<User> {
        &self.vets
    }

    pub fn owner_pets(&self) -> &ResourceList<Pet> {
        &self.owner_pets
    }

    pub fn client_picker(&self) -> &Autocomplete {
        &self.client_picker
    }

    pub fn client_picker_mut(&mut self) -> &mut Autocomplete {
        &mut self.client_picker
    }

    /// Load appointments plus the client and vet reference lists.
    ///
    /// Each list keeps its own error; the first one is returned.
    pub async fn load(&mut self) -> ApiResult<()> {
        let (appointments, clients, vets) =
            join3(self.screen.load(), self.clients.load(), self.vets.load()).await;
        self.client_picker
            .set_items(self.clients.items().iter().map(PickerItem::from).collect());
        appointments.and(clients).and(vets)
    }

    /// Filtered rows, latest scheduled first.
    pub fn visible(&self) -> Vec<&Appointment> {
        let mut rows = self.screen.visible();
        sort_by_schedule_desc(&mut rows);
        rows
    }

    pub fn visible_page(&self) -> PageView<&Appointment> {
        self.screen.filter().page_of(&self.visible())
    }

    /// Pet choices for the selected client.
    pub fn pet_options(&self) -> Vec<Selection> {
        self.owner_pets
            .items()
            .iter()
            .map(|pet| Selection {
                id: pet.id.clone(),
                label: pet.name.clone(),
            })
            .collect()
    }

    /// Vet choices, labelled with their specialty.
    pub fn vet_options(&self) -> Vec<Selection> {
        self.vets
            .items()
            .iter()
            .map(|vet| Selection {
                id: vet.id.clone(),
                label: vet.vet_label(),
            })
            .collect()
    }

    pub fn open_create(&mut self) {
        self.screen.form_mut().open_create();
        self.owner_pets.set_items(Vec::new());
        self.client_picker.clear();
    }

    /// Open the modal for a loaded appointment.
    ///
    /// Resolves the owner through the pet, loads the owner's pets, then
    /// seeds the draft and the client picker.
    pub async fn open_edit(&mut self, id: &RecordId) -> ScreenResult<()> {
        let Some(record) = self.screen.list().find(id).cloned() else {
            return Err(self.screen.fail(ScreenError::NotLoaded(id.clone())));
        };

        debug!(appointment = %id, pet = %record.pet, "resolving appointment owner");
        let pet: Pet = match self.api.retrieve(&record.pet).await {
            Ok(pet) => pet,
            Err(e) => return Err(self.screen.fail(e.into())),
        };
        let owner = Selection {
            label: self
                .clients
                .find(&pet.owner)
                .map(Client::full_name)
                .or_else(|| pet.owner_name.clone())
                .unwrap_or_default(),
            id: pet.owner.clone(),
        };

        if let Err(e) = self.load_owner_pets(&owner.id).await {
            return Err(self.screen.fail(e.into()));
        }

        self.screen.form_mut().open_edit(&record);
        if let Some(draft) = self.screen.form_mut().draft_mut() {
            draft.client = Some(owner.clone());
        }
        self.client_picker.select(owner);
        Ok(())
    }

    /// Apply a key press to the client picker; a commit selects the client.
    pub async fn client_key(&mut self, key: PickerKey) -> ScreenResult<()> {
        match self.client_picker.key(key) {
            PickerEvent::Committed(selection) => self.select_client(selection).await,
            _ => Ok(()),
        }
    }

    /// Click on a client in the picker's match list.
    pub async fn client_click(&mut self, position: usize) -> ScreenResult<()> {
        match self.client_picker.click(position) {
            PickerEvent::Committed(selection) => self.select_client(selection).await,
            _ => Ok(()),
        }
    }

    /// Set the draft's client, clear its pet and load that client's pets.
    pub async fn select_client(&mut self, selection: Selection) -> ScreenResult<()> {
        if let Some(draft) = self.screen.form_mut().draft_mut() {
            draft.client = Some(selection.clone());
            draft.pet = None;
        }
        self.client_picker.select(selection.clone());
        self.load_owner_pets(&selection.id).await?;
        Ok(())
    }

    async fn load_owner_pets(&mut self, owner: &RecordId) -> ApiResult<()> {
        self.owner_pets
            .set_params(query([("propietario", owner.as_str())]));
        self.owner_pets.load().await
    }

    pub async fn submit(
        &mut self,
        confirm: &mut impl Confirm,
    ) -> Result<SubmitOutcome<Appointment>, FormError> {
        self.screen.submit(confirm).await
    }

    /// Move one appointment through the status machine.
    ///
    /// The transition is checked locally first. The server gets a partial
    /// update of `estado` only; the returned record is patched into the list
    /// and the list reloaded.
    pub async fn change_status(
        &mut self,
        id: &RecordId,
        action: StatusAction,
    ) -> ScreenResult<Appointment> {
        let Some(from) = self.screen.list().find(id).map(|a| a.status) else {
            return Err(self.screen.fail(ScreenError::NotLoaded(id.clone())));
        };
        let Some(target) = from.apply(action) else {
            return Err(self.screen.fail(ScreenError::InvalidTransition { from, action }));
        };

        let updated: Appointment = match self.api.patch(id, json!({ "estado": target })).await {
            Ok(updated) => updated,
            Err(e) => return Err(self.screen.fail(e.into())),
        };
        info!(appointment = %id, from = from.as_str(), to = target.as_str(), "appointment status changed");

        let _ = self
            .screen
            .reconcile(LocalPatch::Replace(updated.clone()))
            .await;
        Ok(updated)
    }
}
