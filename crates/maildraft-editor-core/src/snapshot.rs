//! The complete structured value set at one instant.
//!
//! The snapshot is the single source of truth the rendered document is
//! derived from. Equality is structural (every scalar, every item's text),
//! which is what the discard check compares.

use maildraft_api::ListItem;

use crate::identity::{Collection, FieldId, SimpleField};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSnapshot {
    pub subject: String,
    pub preheader: String,
    pub introduction: String,
    pub closing: String,
    pub hero_image: String,
    /// Display order is the source document's order; items are addressed
    /// by id, never by position.
    pub claims: Vec<ListItem>,
    pub nonclaims: Vec<ListItem>,
}

impl FormSnapshot {
    pub fn items(&self, collection: Collection) -> &[ListItem] {
        match collection {
            Collection::Claim => &self.claims,
            Collection::Nonclaim => &self.nonclaims,
        }
    }

    pub fn items_mut(&mut self, collection: Collection) -> &mut Vec<ListItem> {
        match collection {
            Collection::Claim => &mut self.claims,
            Collection::Nonclaim => &mut self.nonclaims,
        }
    }

    pub fn item_text(&self, collection: Collection, id: u64) -> Option<&str> {
        self.items(collection)
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.text.as_str())
    }

    /// Update one item's text, located by id. Returns false when the id is
    /// not in the collection (document/data skew).
    pub fn set_item_text(&mut self, collection: Collection, id: u64, text: &str) -> bool {
        match self
            .items_mut(collection)
            .iter_mut()
            .find(|item| item.id == id)
        {
            Some(item) => {
                item.text = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn scalar(&self, field: SimpleField) -> &str {
        match field {
            SimpleField::Subject => &self.subject,
            SimpleField::Preheader => &self.preheader,
            SimpleField::Introduction => &self.introduction,
            SimpleField::Closing => &self.closing,
            SimpleField::HeroImage => &self.hero_image,
        }
    }

    pub fn set_scalar(&mut self, field: SimpleField, value: &str) {
        let slot = match field {
            SimpleField::Subject => &mut self.subject,
            SimpleField::Preheader => &mut self.preheader,
            SimpleField::Introduction => &mut self.introduction,
            SimpleField::Closing => &mut self.closing,
            SimpleField::HeroImage => &mut self.hero_image,
        };
        *slot = value.to_string();
    }

    /// Current value for any field identity.
    pub fn value_of(&self, field: &FieldId) -> Option<&str> {
        match field {
            FieldId::Simple(simple) => Some(self.scalar(*simple)),
            FieldId::ListItem { collection, id } => self.item_text(*collection, *id),
        }
    }

    /// Set the value for any field identity. Returns false when a list
    /// item id is unknown.
    pub fn set_value(&mut self, field: &FieldId, value: &str) -> bool {
        match field {
            FieldId::Simple(simple) => {
                self.set_scalar(*simple, value);
                true
            }
            FieldId::ListItem { collection, id } => self.set_item_text(*collection, *id, value),
        }
    }
}
