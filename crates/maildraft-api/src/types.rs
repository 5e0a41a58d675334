//! Wire types for the asset backend.
//!
//! Member names follow the backend's existing contract, which is uneven in
//! places (`opening` carries the introduction, list-item regeneration takes
//! `nonclaim_id`/`claim_id`, apply takes `orderednonclaim_id`/
//! `orderedclaim_id`). The constructors paper over the unevenness so the
//! core never spells these out.

use serde::{Deserialize, Serialize};

/// One claim or nonclaim statement. The id is assigned by the backend and
/// is stable across edits and regenerations of the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: u64,
    pub text: String,
}

impl ListItem {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// One historical or freshly generated candidate value for a field.
///
/// Text fields carry `data`; image versions carry `url` and a null `data`.
/// Version lists are newest-first and are replaced wholesale by every
/// backend response - the client never merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: u64,
    pub field: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub created_at: String,
}

impl Version {
    /// The renderable payload: text data for text fields, the image URL
    /// for image versions.
    pub fn payload(&self) -> Option<&str> {
        self.data.as_deref().or(self.url.as_deref())
    }
}

/// Ordered version list as returned by regeneration and history calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionList {
    #[serde(default)]
    pub versions: Vec<Version>,
}

/// Complete asset payload for save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveAssetRequest {
    /// Full rendered document.
    pub asset_data: String,
    pub subject: String,
    pub preheader: String,
    /// Introduction text; the wire calls it `opening`.
    pub opening: String,
    pub closing: String,
    #[serde(default)]
    pub nonclaim: Vec<ListItem>,
    #[serde(default)]
    pub claim: Vec<ListItem>,
}

/// Regeneration request for a scalar field or the hero image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateFieldRequest {
    pub field: String,
    pub prompt: String,
}

/// Regeneration request for one claim or nonclaim item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateListItemRequest {
    pub field: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonclaim_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<u64>,
}

impl RegenerateListItemRequest {
    pub fn nonclaim(prompt: impl Into<String>, item_id: u64) -> Self {
        Self {
            field: "non_claim".to_string(),
            prompt: prompt.into(),
            nonclaim_id: Some(item_id),
            claim_id: None,
        }
    }

    pub fn claim(prompt: impl Into<String>, item_id: u64) -> Self {
        Self {
            field: "claim".to_string(),
            prompt: prompt.into(),
            nonclaim_id: None,
            claim_id: Some(item_id),
        }
    }
}

/// Apply a version of a scalar field or the hero image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyVersionRequest {
    pub field: String,
    /// Version id to apply.
    pub id: u64,
    pub order_id: u64,
}

/// Apply a version of one claim or nonclaim item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyListItemRequest {
    pub field: String,
    /// Version id to apply.
    pub id: u64,
    pub order_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderednonclaim_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderedclaim_id: Option<u64>,
}

impl ApplyListItemRequest {
    pub fn nonclaim(version_id: u64, order_id: u64, item_id: u64) -> Self {
        Self {
            field: "non_claim".to_string(),
            id: version_id,
            order_id,
            orderednonclaim_id: Some(item_id),
            orderedclaim_id: None,
        }
    }

    pub fn claim(version_id: u64, order_id: u64, item_id: u64) -> Self {
        Self {
            field: "claim".to_string(),
            id: version_id,
            order_id,
            orderednonclaim_id: None,
            orderedclaim_id: Some(item_id),
        }
    }
}

/// Acknowledgement from apply calls. Image applies return the committed
/// image URL and the updated image metadata set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyResponse {
    #[serde(default)]
    pub hero_image_url: Option<String>,
    #[serde(default)]
    pub images_data: Vec<ImageMeta>,
}

/// Image metadata forwarded to the collaborator owning image state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub id: u64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// History lookup for a field; list items add their id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_nonclaim_id: Option<u64>,
}

/// One suggested prompt for a field's regeneration affordance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSuggestion {
    pub prompt: String,
}
