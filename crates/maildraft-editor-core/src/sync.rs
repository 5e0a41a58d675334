//! The content synchronizer: one state machine binding form, lists, and
//! the rendered document.
//!
//! The document is a derived projection of the [`FormSnapshot`]: every
//! mutation path recomputes the full snapshot and pushes it through the
//! patcher, so the two can never hold different values for a field while
//! the document is rendered. The synchronizer owns its sandbox outright;
//! regeneration sessions get their own private clones and the two never
//! alias the same document.

use maildraft_api::{
    ApplyListItemRequest, ApplyVersionRequest, EditorBackend, ImageMeta, SaveAssetRequest,
};
use maildraft_dom::{Document, Sandbox};
use smol_str::SmolStr;

use crate::error::EditorError;
use crate::highlight::HighlightController;
use crate::identity::{self, Collection, FieldId, SimpleField};
use crate::patcher;
use crate::session::SessionOutcome;
use crate::snapshot::FormSnapshot;

/// Where the synchronizer is in its edit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    /// A patch operation is in flight against the document.
    Applying,
    /// A regeneration session owns the field; the synchronizer is inert
    /// apart from live highlight changes.
    Regenerating,
}

/// Per-collection edit lock. At most one item of a collection is editable
/// at a time; the pre-edit text is recorded so cancel can restore it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemEditState {
    #[default]
    Idle,
    Editing { id: u64, saved_text: String },
}

/// Everything a regeneration session needs at open time. The html is the
/// synchronizer's current document, serialized with all list-item anchors
/// reconciled; the session seeds both of its panes from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSeed {
    pub asset_id: u64,
    pub field: FieldId,
    pub field_name: SmolStr,
    /// The field's unmodified current value.
    pub initial_value: String,
    pub html: String,
}

/// Result of the discard pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardCheck {
    /// Nothing differs from the captured open-time snapshot; no
    /// confirmation needed.
    NoChanges,
    /// Form values or the hero image differ; confirm before resetting.
    ConfirmationRequired,
}

/// Result of applying a regeneration outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied { version_number: u64 },
    /// No version was produced or selected; informational, not an error.
    NoChange,
}

pub struct ContentSynchronizer<S: Sandbox> {
    asset_id: u64,
    order_id: u64,
    state: SyncState,
    snapshot: FormSnapshot,
    /// Captured at open time; discard resets to this.
    initial: FormSnapshot,
    sandbox: S,
    highlight: HighlightController,
    claim_edit: ItemEditState,
    nonclaim_edit: ItemEditState,
    /// Set by every patch path. Once set, re-seeding is skipped: a reload
    /// of the initial content would silently drop the user's edits.
    manually_updated: bool,
}

impl<S: Sandbox> ContentSynchronizer<S> {
    pub fn new(asset_id: u64, order_id: u64, snapshot: FormSnapshot, sandbox: S) -> Self {
        Self {
            asset_id,
            order_id,
            state: SyncState::Idle,
            initial: snapshot.clone(),
            snapshot,
            sandbox,
            highlight: HighlightController::new(),
            claim_edit: ItemEditState::Idle,
            nonclaim_edit: ItemEditState::Idle,
            manually_updated: false,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn snapshot(&self) -> &FormSnapshot {
        &self.snapshot
    }

    pub fn document(&self) -> Option<&Document> {
        self.sandbox.document()
    }

    pub fn sandbox(&self) -> &S {
        &self.sandbox
    }

    pub fn selected_field(&self) -> Option<&str> {
        self.highlight.current()
    }

    pub fn item_edit_state(&self, collection: Collection) -> &ItemEditState {
        match collection {
            Collection::Claim => &self.claim_edit,
            Collection::Nonclaim => &self.nonclaim_edit,
        }
    }

    /// Set the initial document content. Skipped once the document has
    /// been manually updated after the initial mount.
    pub fn seed(&mut self, html: &str) -> Result<(), EditorError> {
        if self.manually_updated {
            tracing::debug!("seed skipped: document already manually updated");
            return Ok(());
        }
        self.sandbox.set_content(html)?;
        Ok(())
    }

    /// Load-complete signal from the sandbox host. Reconciles anchors,
    /// projects the snapshot into the fresh document, and retries any
    /// parked highlight.
    pub fn handle_load_complete(&mut self) -> Result<(), EditorError> {
        self.sandbox.finish_load();
        if let Some(doc) = self.sandbox.document_mut() {
            patcher::apply_snapshot(doc, &self.snapshot);
            HighlightController::inject_marker_styles(doc);
        }
        let Self {
            highlight, sandbox, ..
        } = self;
        highlight.handle_load_complete(sandbox)
    }

    /// A settled form change: replace the snapshot wholesale and project
    /// it into the document. Always the complete value set, never a delta.
    pub fn apply_form_change(&mut self, snapshot: FormSnapshot) -> Result<(), EditorError> {
        self.state = SyncState::Applying;
        self.snapshot = snapshot;
        if let Some(doc) = self.sandbox.document_mut() {
            patcher::apply_snapshot(doc, &self.snapshot);
            self.manually_updated = true;
        }
        let Self {
            highlight, sandbox, ..
        } = self;
        highlight.reassert(sandbox);
        self.state = SyncState::Idle;
        Ok(())
    }

    /// Highlight a field in the live document.
    pub fn select_field(&mut self, field_name: &str) -> Result<(), EditorError> {
        let Self {
            highlight, sandbox, ..
        } = self;
        highlight.select(sandbox, field_name)
    }

    pub fn clear_selection(&mut self) {
        let Self {
            highlight, sandbox, ..
        } = self;
        highlight.clear(sandbox);
    }

    /// Enter edit mode for one item, recording its current text. Only one
    /// item per collection may be in edit mode; re-entering the active
    /// item is a no-op.
    pub fn begin_item_edit(&mut self, collection: Collection, id: u64) -> Result<(), EditorError> {
        match self.item_edit_state(collection) {
            ItemEditState::Editing { id: active, .. } if *active == id => return Ok(()),
            ItemEditState::Editing { id: active, .. } => {
                return Err(EditorError::EditLocked {
                    collection,
                    active: *active,
                });
            }
            ItemEditState::Idle => {}
        }
        let text = self
            .snapshot
            .item_text(collection, id)
            .ok_or_else(|| EditorError::AnchorNotFound {
                field: format!("{}_{}", collection.prefix(), id),
            })?
            .to_string();
        *self.edit_slot_mut(collection) = ItemEditState::Editing {
            id,
            saved_text: text,
        };
        Ok(())
    }

    /// Leave edit mode keeping the current text.
    pub fn finish_item_edit(&mut self, collection: Collection, id: u64) {
        if matches!(self.item_edit_state(collection), ItemEditState::Editing { id: active, .. } if *active == id)
        {
            *self.edit_slot_mut(collection) = ItemEditState::Idle;
        }
    }

    /// Leave edit mode restoring the recorded pre-edit text into both the
    /// snapshot and the document.
    pub fn cancel_item_edit(&mut self, collection: Collection, id: u64) {
        let slot = self.edit_slot_mut(collection);
        let ItemEditState::Editing {
            id: active,
            saved_text,
        } = std::mem::take(slot)
        else {
            return;
        };
        if active != id {
            // Not the item being edited; put the lock back.
            *self.edit_slot_mut(collection) = ItemEditState::Editing {
                id: active,
                saved_text,
            };
            return;
        }
        self.snapshot.set_item_text(collection, id, &saved_text);
        if let Some(doc) = self.sandbox.document_mut() {
            patcher::set_text(doc, &FieldId::ListItem { collection, id }, &saved_text);
            self.manually_updated = true;
        }
    }

    /// Hand the field off to a regeneration session. The synchronizer
    /// stays in `Regenerating` until the session applies or is closed.
    pub fn open_regeneration(&mut self, field_name: &str) -> Result<SessionSeed, EditorError> {
        let field = identity::resolve(field_name)?;
        let initial_value = self
            .snapshot
            .value_of(&field)
            .ok_or_else(|| EditorError::AnchorNotFound {
                field: field_name.to_string(),
            })?
            .to_string();
        let html = {
            let doc = self
                .sandbox
                .document_mut()
                .ok_or(EditorError::DocumentNotLoaded)?;
            // Sessions locate list items by anchor; hand them a document
            // with both identity carriers guaranteed in place.
            patcher::ensure_list_item_anchors(doc, Collection::Claim, &self.snapshot.claims);
            patcher::ensure_list_item_anchors(doc, Collection::Nonclaim, &self.snapshot.nonclaims);
            doc.to_html()
        };
        self.state = SyncState::Regenerating;
        Ok(SessionSeed {
            asset_id: self.asset_id,
            field,
            field_name: SmolStr::new(field_name),
            initial_value,
            html,
        })
    }

    /// Close the regeneration hand-off without applying (exit-to-editor).
    pub fn close_regeneration(&mut self) {
        if self.state == SyncState::Regenerating {
            self.state = SyncState::Idle;
        }
    }

    /// Commit a session outcome: the distinct backend apply call for the
    /// field kind, then snapshot and document together.
    ///
    /// `None` (no version produced or selected) is the informational
    /// no-change case; the session stays open. Backend failure leaves all
    /// in-memory state untouched and the session open.
    pub async fn apply_regeneration<B: EditorBackend>(
        &mut self,
        outcome: Option<SessionOutcome>,
        backend: &B,
        on_images_changed: impl FnOnce(Vec<ImageMeta>),
    ) -> Result<ApplyOutcome, EditorError> {
        let Some(outcome) = outcome else {
            return Ok(ApplyOutcome::NoChange);
        };

        match &outcome.field {
            FieldId::Simple(SimpleField::HeroImage) => {
                let req = ApplyVersionRequest {
                    field: outcome.field.backend_key().to_string(),
                    id: outcome.version_id,
                    order_id: self.order_id,
                };
                let resp = backend
                    .apply_field_version(self.asset_id, req)
                    .await
                    .map_err(|source| EditorError::Regeneration { source })?;
                self.state = SyncState::Applying;
                let url = resp
                    .hero_image_url
                    .unwrap_or_else(|| outcome.payload.clone());
                self.snapshot.hero_image = url.clone();
                if let Some(doc) = self.sandbox.document_mut() {
                    patcher::set_image(doc, &outcome.field, &url);
                    self.manually_updated = true;
                }
                on_images_changed(resp.images_data);
            }
            FieldId::Simple(field) => {
                let req = ApplyVersionRequest {
                    field: outcome.field.backend_key().to_string(),
                    id: outcome.version_id,
                    order_id: self.order_id,
                };
                backend
                    .apply_field_version(self.asset_id, req)
                    .await
                    .map_err(|source| EditorError::Regeneration { source })?;
                self.state = SyncState::Applying;
                self.snapshot.set_scalar(*field, &outcome.payload);
                if let Some(doc) = self.sandbox.document_mut() {
                    patcher::set_text(doc, &outcome.field, &outcome.payload);
                    self.manually_updated = true;
                }
            }
            FieldId::ListItem { collection, id } => {
                // Fail fast on skew: the item must exist before the
                // backend is asked to commit anything.
                if self.snapshot.item_text(*collection, *id).is_none() {
                    return Err(EditorError::AnchorNotFound {
                        field: outcome.field.form_name().to_string(),
                    });
                }
                let req = match collection {
                    Collection::Claim => {
                        ApplyListItemRequest::claim(outcome.version_id, self.order_id, *id)
                    }
                    Collection::Nonclaim => {
                        ApplyListItemRequest::nonclaim(outcome.version_id, self.order_id, *id)
                    }
                };
                backend
                    .apply_list_item_version(self.asset_id, req)
                    .await
                    .map_err(|source| EditorError::Regeneration { source })?;
                self.state = SyncState::Applying;
                self.snapshot
                    .set_item_text(*collection, *id, &outcome.payload);
                if let Some(doc) = self.sandbox.document_mut() {
                    patcher::set_text(doc, &outcome.field, &outcome.payload);
                    self.manually_updated = true;
                }
                // Bring the committed item back into view in the live
                // document.
                let field_name = outcome.field.form_name();
                let Self {
                    highlight, sandbox, ..
                } = self;
                highlight.select(sandbox, &field_name)?;
            }
        }

        self.state = SyncState::Idle;
        Ok(ApplyOutcome::Applied {
            version_number: outcome.version_number,
        })
    }

    /// Discard pre-check: compares the current snapshot (every scalar,
    /// every item text, the hero image) structurally against the captured
    /// open-time snapshot.
    pub fn check_discard(&self) -> DiscardCheck {
        if self.snapshot == self.initial {
            DiscardCheck::NoChanges
        } else {
            DiscardCheck::ConfirmationRequired
        }
    }

    /// Reset form and document to the captured open-time snapshot.
    pub fn reset_to_initial(&mut self) {
        self.snapshot = self.initial.clone();
        if let Some(doc) = self.sandbox.document_mut() {
            patcher::apply_snapshot(doc, &self.snapshot);
        }
        let Self {
            highlight, sandbox, ..
        } = self;
        highlight.reassert(sandbox);
    }

    /// Local validation: required scalars and every item text must be
    /// non-empty. Failures are reported per-field and never reach the
    /// save collaborator.
    pub fn validate(&self) -> Result<(), EditorError> {
        let mut empty = Vec::new();
        for field in [
            SimpleField::Subject,
            SimpleField::Preheader,
            SimpleField::Introduction,
            SimpleField::Closing,
        ] {
            if self.snapshot.scalar(field).trim().is_empty() {
                empty.push(field.form_key().to_string());
            }
        }
        for collection in [Collection::Claim, Collection::Nonclaim] {
            for item in self.snapshot.items(collection) {
                if item.text.trim().is_empty() {
                    empty.push(format!("{}_{}", collection.prefix(), item.id));
                }
            }
        }
        if empty.is_empty() {
            Ok(())
        } else {
            Err(EditorError::Validation { fields: empty })
        }
    }

    /// Persist the document plus structured values. The document is
    /// re-projected from the snapshot and stripped of highlight markers
    /// first; the persisted document must not carry transient UI styling.
    ///
    /// On failure all in-memory state is left intact - no partial commit.
    /// Returns the serialized document that was saved, for collaborators
    /// that mirror the asset.
    pub async fn save<B: EditorBackend>(&mut self, backend: &B) -> Result<String, EditorError> {
        self.validate()?;
        let html = {
            let doc = self
                .sandbox
                .document_mut()
                .ok_or(EditorError::DocumentNotLoaded)?;
            patcher::apply_snapshot(doc, &self.snapshot);
            HighlightController::strip_markers(doc);
            doc.to_html()
        };
        let req = SaveAssetRequest {
            asset_data: html.clone(),
            subject: self.snapshot.subject.clone(),
            preheader: self.snapshot.preheader.clone(),
            opening: self.snapshot.introduction.clone(),
            closing: self.snapshot.closing.clone(),
            nonclaim: self.snapshot.nonclaims.clone(),
            claim: self.snapshot.claims.clone(),
        };
        backend
            .save(self.asset_id, req)
            .await
            .map_err(|source| EditorError::Save { source })?;
        self.highlight.reset();
        Ok(html)
    }

    fn edit_slot_mut(&mut self, collection: Collection) -> &mut ItemEditState {
        match collection {
            Collection::Claim => &mut self.claim_edit,
            Collection::Nonclaim => &mut self.nonclaim_edit,
        }
    }
}
