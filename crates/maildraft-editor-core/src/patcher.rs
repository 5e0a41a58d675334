//! In-place document patching.
//!
//! Every mutation of the rendered document goes through here. The patcher
//! is pure with respect to editor state: it takes a document and an
//! identity, touches only the anchors involved, and never throws across
//! its boundary - a missing anchor is a logged no-op and the caller decides
//! whether that is fatal. List-item patches always rewrite both identity
//! carriers (element id and data attribute) so the two can never drift.

use maildraft_api::ListItem;
use maildraft_dom::{Document, NodeId};

use crate::highlight::{CLAIM_MARKER_CLASS, MARKER_CLASS};
use crate::identity::{Collection, FieldId, SimpleField};
use crate::snapshot::FormSnapshot;

/// Find the anchor for a field: by element id first, falling back to the
/// data attribute for list items whose id attribute was stripped.
pub fn locate(doc: &Document, field: &FieldId) -> Option<NodeId> {
    let spec = field.anchor_spec();
    doc.element_by_id(&spec.html_id).or_else(|| {
        spec.data_attr
            .as_ref()
            .and_then(|(attr, value)| doc.query_by_attr(attr, value))
    })
}

/// Set a field's text content. Returns whether an anchor was found.
pub fn set_text(doc: &mut Document, field: &FieldId, value: &str) -> bool {
    let Some(node) = locate(doc, field) else {
        tracing::warn!(field = %field.form_name(), "anchor not found; skipping text patch");
        return false;
    };
    // Skip the write when nothing changed; redundant mutation thrashes the
    // host's layout.
    if doc.text_content(node) != value {
        doc.set_text_content(node, value);
    }
    if let FieldId::ListItem { collection, id } = field {
        reassert_identity(doc, node, *collection, *id);
        apply_item_styles(doc, node, *collection);
    }
    true
}

/// Swap the hero image source. The image element is reused, never
/// recreated, so host-side listeners and layout survive the swap.
pub fn set_image(doc: &mut Document, field: &FieldId, url: &str) -> bool {
    let Some(container) = locate(doc, field) else {
        tracing::warn!(field = %field.form_name(), "image container not found; skipping");
        return false;
    };
    let Some(img) = doc.first_descendant_with_tag(container, "img") else {
        tracing::warn!(field = %field.form_name(), "no img element under container; skipping");
        return false;
    };
    doc.set_attr(img, "src", url);
    true
}

/// Reconcile a collection's anchors with the supplied items.
///
/// Idempotent: every live item gets both identity carriers rewritten to
/// match; elements whose id carries the collection prefix but whose
/// numeric id is no longer in the collection lose their identity
/// attributes and any leftover highlight marker.
pub fn ensure_list_item_anchors(doc: &mut Document, collection: Collection, items: &[ListItem]) {
    for item in items {
        let field = FieldId::ListItem {
            collection,
            id: item.id,
        };
        if let Some(node) = locate(doc, &field) {
            reassert_identity(doc, node, collection, item.id);
            apply_item_styles(doc, node, collection);
        } else {
            tracing::warn!(
                collection = %collection,
                id = item.id,
                "list item has no anchor in the document"
            );
        }
    }

    // GC stale anchors left behind after upstream deletions.
    let prefix = format!("{}_", collection.prefix());
    for node in doc.elements_with_id_prefix(&prefix) {
        let stale = doc
            .attr(node, "id")
            .and_then(|id| id[prefix.len()..].parse::<u64>().ok())
            .is_none_or(|id| !items.iter().any(|item| item.id == id));
        if stale {
            doc.remove_attr(node, "id");
            doc.remove_attr(node, collection.data_attr());
            doc.remove_class(node, MARKER_CLASS);
            doc.remove_class(node, CLAIM_MARKER_CLASS);
        }
    }
}

/// Apply the whole snapshot to the document, field by field.
pub fn apply_snapshot(doc: &mut Document, snapshot: &FormSnapshot) {
    for field in [
        SimpleField::Subject,
        SimpleField::Preheader,
        SimpleField::Introduction,
        SimpleField::Closing,
    ] {
        set_text(doc, &FieldId::Simple(field), snapshot.scalar(field));
    }
    if !snapshot.hero_image.is_empty() {
        set_image(doc, &FieldId::Simple(SimpleField::HeroImage), &snapshot.hero_image);
    }
    for collection in [Collection::Claim, Collection::Nonclaim] {
        ensure_list_item_anchors(doc, collection, snapshot.items(collection));
        for item in snapshot.items(collection) {
            set_text(
                doc,
                &FieldId::ListItem {
                    collection,
                    id: item.id,
                },
                &item.text,
            );
        }
    }
}

/// Rewrite both identity carriers so they agree on the same numeric id.
fn reassert_identity(doc: &mut Document, node: NodeId, collection: Collection, id: u64) {
    let spec = FieldId::ListItem { collection, id }.anchor_spec();
    doc.set_attr(node, "id", &spec.html_id);
    doc.set_attr(node, collection.data_attr(), &id.to_string());
}

/// Cosmetic styles for list items. Claims are top-rounded only: they
/// visually anchor the bullet list that follows them.
fn apply_item_styles(doc: &mut Document, node: NodeId, collection: Collection) {
    doc.set_style_property(node, "cursor", "pointer");
    doc.set_style_property(node, "padding", "4px");
    match collection {
        Collection::Claim => {
            doc.set_style_property(node, "border-radius", "4px 4px 0 0");
        }
        Collection::Nonclaim => {
            doc.set_style_property(node, "border", "1px solid transparent");
            doc.set_style_property(node, "border-radius", "4px");
        }
    }
}
