//! Autocomplete picker for foreign-key fields.
//!
//! Filters a reference collection by case-insensitive substring as the user
//! types and resolves the chosen item to an id plus display label.
//!
//! Keyboard model:
//! - ArrowDown / ArrowUp move the highlight, wrapping at both ends
//! - Enter commits the highlighted item and closes
//! - Escape closes without committing
//!
//! The highlight starts on the first match every time the match list is
//! recomputed, so N presses of ArrowDown land on index `N mod len`.

use serde::{Deserialize, Serialize};

use crate::models::{Client, Pet, RecordId, User};

/// A resolved pick: foreign-key id and the label shown in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub id: RecordId,
    pub label: String,
}

/// One pickable entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerItem {
    pub id: RecordId,
    pub label: String,
    /// Lowercased texts the query is matched against
    keywords: Vec<String>,
}

impl PickerItem {
    pub fn new(id: RecordId, label: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            id,
            label: label.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.keywords.iter().any(|k| k.contains(needle))
    }

    fn selection(&self) -> Selection {
        Selection {
            id: self.id.clone(),
            label: self.label.clone(),
        }
    }
}

impl From<&Client> for PickerItem {
    fn from(client: &Client) -> Self {
        let full_name = client.full_name();
        PickerItem::new(client.id.clone(), full_name.clone(), &[&full_name])
    }
}

/// Pets match on their own name and on the owner's.
impl From<&Pet> for PickerItem {
    fn from(pet: &Pet) -> Self {
        PickerItem::new(
            pet.id.clone(),
            pet.picker_label(),
            &[&pet.name, pet.owner_name.as_deref().unwrap_or("")],
        )
    }
}

impl From<&User> for PickerItem {
    fn from(user: &User) -> Self {
        let label = user.vet_label();
        PickerItem::new(user.id.clone(), label, &[&user.label()])
    }
}

/// Keys the picker reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKey {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

/// What a key press or click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    /// Highlight moved or nothing happened
    None,
    Committed(Selection),
    Closed,
}

#[derive(Debug, Clone, Default)]
pub struct Autocomplete {
    items: Vec<PickerItem>,
    query: String,
    /// Indices into `items`
    matches: Vec<usize>,
    cursor: Option<usize>,
    open: bool,
    selection: Option<Selection>,
}

impl Autocomplete {
    pub fn new(items: Vec<PickerItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Build from any records convertible to picker items.
    pub fn from_records<'a, T: 'a>(records: impl IntoIterator<Item = &'a T>) -> Self
    where
        PickerItem: From<&'a T>,
    {
        Self::new(records.into_iter().map(PickerItem::from).collect())
    }

    /// Replace the reference collection, keeping the query.
    pub fn set_items(&mut self, items: Vec<PickerItem>) {
        self.items = items;
        self.recompute();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Highlighted position within [`Self::matches`].
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn matches(&self) -> Vec<&PickerItem> {
        self.matches.iter().map(|&i| &self.items[i]).collect()
    }

    pub fn highlighted(&self) -> Option<&PickerItem> {
        let position = self.cursor?;
        self.matches.get(position).map(|&i| &self.items[i])
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Open the list. An empty query shows everything.
    pub fn focus(&mut self) {
        self.open = true;
        self.recompute();
    }

    /// The input text changed. Clears any previous selection.
    pub fn input(&mut self, text: &str) {
        self.query = text.to_string();
        self.selection = None;
        self.open = true;
        self.recompute();
    }

    pub fn key(&mut self, key: PickerKey) -> PickerEvent {
        if !self.open {
            if key == PickerKey::ArrowDown {
                self.focus();
            }
            return PickerEvent::None;
        }

        let len = self.matches.len();
        match key {
            PickerKey::ArrowDown if len > 0 => {
                self.cursor = Some(self.cursor.map_or(0, |c| (c + 1) % len));
                PickerEvent::None
            }
            PickerKey::ArrowUp if len > 0 => {
                self.cursor = Some(self.cursor.map_or(len - 1, |c| (c + len - 1) % len));
                PickerEvent::None
            }
            PickerKey::Enter => match self.cursor {
                Some(position) => self.commit(position),
                None => PickerEvent::None,
            },
            PickerKey::Escape => {
                self.open = false;
                PickerEvent::Closed
            }
            _ => PickerEvent::None,
        }
    }

    /// Click on the item at `position` in the match list.
    pub fn click(&mut self, position: usize) -> PickerEvent {
        if !self.open || position >= self.matches.len() {
            return PickerEvent::None;
        }
        self.commit(position)
    }

    /// Click anywhere outside the picker.
    pub fn click_outside(&mut self) -> PickerEvent {
        if !self.open {
            return PickerEvent::None;
        }
        self.open = false;
        PickerEvent::Closed
    }

    /// Preset a selection, e.g. when editing an existing record.
    pub fn select(&mut self, selection: Selection) {
        self.query = selection.label.clone();
        self.selection = Some(selection);
        self.open = false;
        self.recompute();
    }

    /// Empty the input and drop the selection.
    pub fn clear(&mut self) {
        self.query.clear();
        self.selection = None;
        self.open = false;
        self.recompute();
    }

    fn commit(&mut self, position: usize) -> PickerEvent {
        let Some(&index) = self.matches.get(position) else {
            return PickerEvent::None;
        };
        let selection = self.items[index].selection();
        self.query = selection.label.clone();
        self.selection = Some(selection.clone());
        self.open = false;
        PickerEvent::Committed(selection)
    }

    fn recompute(&mut self) {
        let needle = self.query.trim().to_lowercase();
        self.matches = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| needle.is_empty() || item.matches(&needle))
            .map(|(i, _)| i)
            .collect();
        self.cursor = if self.matches.is_empty() { None } else { Some(0) };
    }
}
