//! Medical records, vaccines and per-pet history.

use chrono::{FixedOffset, NaiveDate};
use futures_util::future::{join4, try_join};
use tracing::{debug, warn};

use super::{vet_list, ResourceScreen, ScreenError, ScreenResult};
use crate::api::{query, ApiClient, ApiResult};
use crate::autocomplete::{Autocomplete, PickerEvent, PickerItem, PickerKey, Selection};
use crate::config::ClientConfig;
use crate::fetch::{FetchScope, ResourceList};
use crate::form::{Clock, MedicalRecordDraft, VaccineDraft};
use crate::models::{MedicalRecord, Pet, RecordId, User, Vaccine};

pub type MedicalRecordScreen = ResourceScreen<MedicalRecordDraft>;
pub type VaccineScreen = ResourceScreen<VaccineDraft>;

/// Everything recorded for one pet.
#[derive(Debug, Clone, PartialEq)]
pub struct PetHistory {
    pub pet: RecordId,
    pub records: Vec<MedicalRecord>,
    pub vaccines: Vec<Vaccine>,
}

impl PetHistory {
    /// Vaccines whose next dose is due on or before `today`.
    pub fn due_vaccines(&self, today: NaiveDate) -> Vec<&Vaccine> {
        self.vaccines.iter().filter(|v| v.is_due(today)).collect()
    }
}

/// Fetch a pet's records and vaccines together (`?mascota=<id>`).
///
/// Either failure fails the whole history.
pub async fn load_pet_history(api: &ApiClient, pet: &RecordId) -> ApiResult<PetHistory> {
    let params = query([("mascota", pet.as_str())]);
    debug!(%pet, "loading pet history");
    let (records, vaccines) = try_join(
        api.list_all::<MedicalRecord>(&params),
        api.list_all::<Vaccine>(&params),
    )
    .await?;
    Ok(PetHistory {
        pet: pet.clone(),
        records,
        vaccines,
    })
}

/// The veterinarian's desk: records and vaccines side by side.
pub struct MedicalDesk {
    api: ApiClient,
    records: MedicalRecordScreen,
    vaccines: VaccineScreen,
    pets: ResourceList<Pet>,
    vets: ResourceList<User>,
    pet_picker: Autocomplete,
    history: Option<PetHistory>,
    history_error: Option<ScreenError>,
}

impl MedicalDesk {
    pub fn new(api: ApiClient, tz: FixedOffset) -> Self {
        Self {
            records: ResourceScreen::new(api.clone(), tz, FetchScope::FirstPage),
            vaccines: ResourceScreen::new(api.clone(), tz, FetchScope::FirstPage),
            pets: ResourceList::new(api.clone(), FetchScope::AllPages),
            vets: vet_list(api.clone()),
            pet_picker: Autocomplete::default(),
            history: None,
            history_error: None,
            api,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.records = self.records.with_clock(clock.clone());
        self.vaccines = self.vaccines.with_clock(clock);
        self
    }

    pub fn with_config(mut self, config: &ClientConfig) -> Self {
        self.records = self.records.with_config(config);
        self.vaccines = self.vaccines.with_config(config);
        self
    }

    pub fn records(&self) -> &MedicalRecordScreen {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut MedicalRecordScreen {
        &mut self.records
    }

    pub fn vaccines(&self) -> &VaccineScreen {
        &self.vaccines
    }

    pub fn vaccines_mut(&mut self) -> &mut VaccineScreen {
        &mut self.vaccines
    }

    pub fn pets(&self) -> &ResourceList<Pet> {
        &self.pets
    }

    pub fn vets(&self) -> &ResourceList<User> {
        &self.vets
    }

    pub fn pet_picker_mut(&mut self) -> &mut Autocomplete {
        &mut self.pet_picker
    }

    pub fn history(&self) -> Option<&PetHistory> {
        self.history.as_ref()
    }

    pub fn history_error(&self) -> Option<&ScreenError> {
        self.history_error.as_ref()
    }

    /// Load records, vaccines, pets and vets concurrently.
    pub async fn load(&mut self) -> ApiResult<()> {
        let (records, vaccines, pets, vets) = join4(
            self.records.load(),
            self.vaccines.load(),
            self.pets.load(),
            self.vets.load(),
        )
        .await;
        self.pet_picker
            .set_items(self.pets.items().iter().map(PickerItem::from).collect());
        records.and(vaccines).and(pets).and(vets)
    }

    /// Route a pet-picker key press; a commit fills the open form's pet.
    pub fn pet_key(&mut self, key: PickerKey) -> Option<Selection> {
        match self.pet_picker.key(key) {
            PickerEvent::Committed(selection) => {
                self.set_pet(selection.clone());
                Some(selection)
            }
            _ => None,
        }
    }

    /// Fill the pet of whichever form is open.
    pub fn set_pet(&mut self, selection: Selection) {
        if let Some(draft) = self.records.form_mut().draft_mut() {
            draft.pet = Some(selection.clone());
        }
        if let Some(draft) = self.vaccines.form_mut().draft_mut() {
            draft.pet = Some(selection);
        }
    }

    /// Show one pet's history. On failure the history is cleared.
    pub async fn show_history(&mut self, pet: &RecordId) -> ScreenResult<&PetHistory> {
        match load_pet_history(&self.api, pet).await {
            Ok(history) => {
                self.history_error = None;
                Ok(&*self.history.insert(history))
            }
            Err(e) => {
                warn!(%pet, error = %e, "failed to load pet history");
                let error = ScreenError::from(e);
                self.history = None;
                self.history_error = Some(error.clone());
                Err(error)
            }
        }
    }
}
