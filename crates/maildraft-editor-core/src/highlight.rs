//! Highlight tracking for the selected field.
//!
//! Exactly one anchor carries a highlight marker at any time. Selection
//! sweeps the marker classes off *every* element first - concurrent
//! document replacement can leave stale markers behind, so removing only
//! the remembered previous selection is not enough. Selections issued
//! before the sandbox finishes loading are parked and retried exactly once
//! on the load-complete signal; there is no polling.

use maildraft_dom::{Document, Sandbox, ScrollBehavior, ScrollBlock};
use smol_str::SmolStr;

use crate::error::EditorError;
use crate::identity::{self, FieldId, NONCLAIM_CONTAINER};
use crate::patcher;

/// General highlight marker.
pub const MARKER_CLASS: &str = "selected_asset_field";
/// Claim variant: no bottom border, so the claim visually merges with the
/// bullet list that follows it.
pub const CLAIM_MARKER_CLASS: &str = "selected_asset_field_claim";
/// Id of the injected marker stylesheet.
pub const MARKER_STYLE_ID: &str = "custom-styles";

const MARKER_CSS: &str = "\
.selected_asset_field { border: 1px dashed #ffd1b3 !important; border-radius: 5px !important; padding: 10px !important; }\
.selected_asset_field_claim { border-top: 1px dashed #ffd1b3 !important; border-left: 1px dashed #ffd1b3 !important; border-right: 1px dashed #ffd1b3 !important; border-radius: 5px !important; padding: 10px !important; }";

#[derive(Debug, Default)]
pub struct HighlightController {
    current: Option<SmolStr>,
    /// Selection parked until the load-complete signal.
    pending: Option<SmolStr>,
}

impl HighlightController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The field currently carrying the highlight, if any.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Highlight a field and scroll it into view.
    ///
    /// The container sentinel is a no-op. Unknown field names are loud.
    /// A missing anchor clears the highlight and is logged, not raised.
    pub fn select(
        &mut self,
        sandbox: &mut impl Sandbox,
        field_name: &str,
    ) -> Result<(), EditorError> {
        if field_name == NONCLAIM_CONTAINER {
            return Ok(());
        }
        let field = identity::resolve(field_name)?;
        if !sandbox.is_loaded() {
            self.pending = Some(SmolStr::new(field_name));
            return Ok(());
        }

        let target = {
            let Some(doc) = sandbox.document_mut() else {
                return Ok(());
            };
            Self::inject_marker_styles(doc);
            Self::strip_markers(doc);
            let Some(node) = patcher::locate(doc, &field) else {
                tracing::warn!(field = field_name, "highlight target missing from document");
                self.current = None;
                return Ok(());
            };
            doc.add_class(node, marker_for(&field));
            node
        };

        sandbox.scroll_into_view(target, ScrollBehavior::Smooth, ScrollBlock::Center);
        self.current = Some(SmolStr::new(field_name));
        Ok(())
    }

    /// Re-apply the marker for the current selection without scrolling.
    /// Used after document patches that may have rebuilt the anchor.
    pub fn reassert(&mut self, sandbox: &mut impl Sandbox) {
        let Some(current) = self.current.clone() else {
            return;
        };
        let Ok(field) = identity::resolve(&current) else {
            return;
        };
        let Some(doc) = sandbox.document_mut() else {
            return;
        };
        Self::strip_markers(doc);
        if let Some(node) = patcher::locate(doc, &field) {
            doc.add_class(node, marker_for(&field));
        }
    }

    /// Remove the highlight and forget the selection.
    pub fn clear(&mut self, sandbox: &mut impl Sandbox) {
        if let Some(doc) = sandbox.document_mut() {
            Self::strip_markers(doc);
        }
        self.current = None;
        self.pending = None;
    }

    /// Forget all selection state without touching any document.
    pub fn reset(&mut self) {
        self.current = None;
        self.pending = None;
    }

    /// Retry a parked selection, exactly once.
    pub fn handle_load_complete(
        &mut self,
        sandbox: &mut impl Sandbox,
    ) -> Result<(), EditorError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        if !sandbox.is_loaded() {
            // Spurious signal; the retry is spent either way.
            return Ok(());
        }
        self.select(sandbox, &pending)
    }

    /// Install the marker stylesheet into the document head, once.
    pub fn inject_marker_styles(doc: &mut Document) {
        if doc.element_by_id(MARKER_STYLE_ID).is_some() {
            return;
        }
        let Some(head) = doc.head() else {
            return;
        };
        let style = doc.append_child_element(head, "style");
        doc.set_attr(style, "id", MARKER_STYLE_ID);
        doc.set_text_content(style, MARKER_CSS);
    }

    /// Sweep both marker classes off every element carrying them. Save
    /// runs this before serializing: persisted documents must not carry
    /// transient UI styling.
    pub fn strip_markers(doc: &mut Document) {
        for class in [MARKER_CLASS, CLAIM_MARKER_CLASS] {
            for node in doc.elements_with_class(class) {
                doc.remove_class(node, class);
            }
        }
    }
}

fn marker_for(field: &FieldId) -> &'static str {
    if field.is_claim_item() {
        CLAIM_MARKER_CLASS
    } else {
        MARKER_CLASS
    }
}
