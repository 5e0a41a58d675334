//! Field identity resolution.
//!
//! One logical field lives in three namespaces that must not be conflated:
//! the form namespace (`introduction`, `nonclaim_12274`), the document
//! anchor namespace (`intro`, `nonclaim_12274` + `data-nonclaim-id`), and
//! the wire namespace (`introduction`, `non_claim`). [`FieldId`] is the
//! resolved identity; the accessors map it into each namespace.

use std::fmt;

use smol_str::{SmolStr, format_smolstr};

use crate::error::EditorError;

/// Sentinel form name for the nonclaim list container itself. Selecting it
/// highlights nothing and scrolls nowhere.
pub const NONCLAIM_CONTAINER: &str = "nonclaim_container";

/// Which list a claim/nonclaim item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Claim,
    Nonclaim,
}

impl Collection {
    /// Prefix used by both the form name and the element id.
    pub fn prefix(self) -> &'static str {
        match self {
            Collection::Claim => "claim",
            Collection::Nonclaim => "nonclaim",
        }
    }

    /// The mirrored data attribute carrying the item id.
    pub fn data_attr(self) -> &'static str {
        match self {
            Collection::Claim => "data-claim-id",
            Collection::Nonclaim => "data-nonclaim-id",
        }
    }

    /// Wire-level field key. Note the underscore: the backend spells
    /// nonclaims `non_claim`.
    pub fn backend_key(self) -> &'static str {
        match self {
            Collection::Claim => "claim",
            Collection::Nonclaim => "non_claim",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Collection::Claim => "Claim",
            Collection::Nonclaim => "Nonclaim",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// The five scalar fields of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleField {
    Subject,
    Preheader,
    Introduction,
    Closing,
    HeroImage,
}

impl SimpleField {
    pub const ALL: [SimpleField; 5] = [
        SimpleField::Subject,
        SimpleField::Preheader,
        SimpleField::Introduction,
        SimpleField::Closing,
        SimpleField::HeroImage,
    ];

    /// Form-layer key.
    pub fn form_key(self) -> &'static str {
        match self {
            SimpleField::Subject => "subject",
            SimpleField::Preheader => "preheader",
            SimpleField::Introduction => "introduction",
            SimpleField::Closing => "closing",
            SimpleField::HeroImage => "hero_image",
        }
    }

    /// Element id of the document anchor. The HTML namespace differs from
    /// the form namespace for three of the five fields.
    pub fn html_id(self) -> &'static str {
        match self {
            SimpleField::Subject => "subject_line",
            SimpleField::Preheader => "preview",
            SimpleField::Introduction => "intro",
            SimpleField::Closing => "closing",
            SimpleField::HeroImage => "hero_image",
        }
    }

    /// Wire-level field key used by regeneration calls.
    pub fn backend_key(self) -> &'static str {
        self.form_key()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SimpleField::Subject => "Subject Line",
            SimpleField::Preheader => "Preheader",
            SimpleField::Introduction => "Introduction",
            SimpleField::Closing => "Closing",
            SimpleField::HeroImage => "Image",
        }
    }

    fn from_form_key(key: &str) -> Option<Self> {
        SimpleField::ALL.into_iter().find(|f| f.form_key() == key)
    }
}

/// Resolved identity of one editable field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldId {
    Simple(SimpleField),
    ListItem { collection: Collection, id: u64 },
}

/// Where a field lives in the rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSpec {
    pub html_id: SmolStr,
    /// `(attribute name, expected value)` for list items; the patcher falls
    /// back to this lookup when the element id was stripped.
    pub data_attr: Option<(&'static str, SmolStr)>,
}

impl FieldId {
    pub fn anchor_spec(&self) -> AnchorSpec {
        match self {
            FieldId::Simple(field) => AnchorSpec {
                html_id: SmolStr::new(field.html_id()),
                data_attr: None,
            },
            FieldId::ListItem { collection, id } => AnchorSpec {
                html_id: format_smolstr!("{}_{}", collection.prefix(), id),
                data_attr: Some((collection.data_attr(), format_smolstr!("{id}"))),
            },
        }
    }

    pub fn backend_key(&self) -> &'static str {
        match self {
            FieldId::Simple(field) => field.backend_key(),
            FieldId::ListItem { collection, .. } => collection.backend_key(),
        }
    }

    /// The form-layer name this identity resolves back to.
    pub fn form_name(&self) -> SmolStr {
        match self {
            FieldId::Simple(field) => SmolStr::new(field.form_key()),
            FieldId::ListItem { collection, id } => {
                format_smolstr!("{}_{}", collection.prefix(), id)
            }
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FieldId::Simple(field) => field.display_name(),
            FieldId::ListItem { collection, .. } => collection.display_name(),
        }
    }

    pub fn collection(&self) -> Option<Collection> {
        match self {
            FieldId::ListItem { collection, .. } => Some(*collection),
            FieldId::Simple(_) => None,
        }
    }

    pub fn item_id(&self) -> Option<u64> {
        match self {
            FieldId::ListItem { id, .. } => Some(*id),
            FieldId::Simple(_) => None,
        }
    }

    pub fn is_claim_item(&self) -> bool {
        matches!(
            self,
            FieldId::ListItem {
                collection: Collection::Claim,
                ..
            }
        )
    }
}

/// Map a form-layer field name to its identity.
///
/// `claim_<digits>` / `nonclaim_<digits>` become list-item identities; the
/// five scalar keys resolve through the fixed table. Anything else is an
/// [`EditorError::UnknownField`].
pub fn resolve(field_name: &str) -> Result<FieldId, EditorError> {
    let name = field_name.trim().to_ascii_lowercase();
    for collection in [Collection::Nonclaim, Collection::Claim] {
        if let Some(rest) = name
            .strip_prefix(collection.prefix())
            .and_then(|rest| rest.strip_prefix('_'))
        {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                let id = rest.parse().map_err(|_| EditorError::UnknownField {
                    name: field_name.to_string(),
                })?;
                return Ok(FieldId::ListItem { collection, id });
            }
        }
    }
    SimpleField::from_form_key(&name)
        .map(FieldId::Simple)
        .ok_or_else(|| EditorError::UnknownField {
            name: field_name.to_string(),
        })
}
