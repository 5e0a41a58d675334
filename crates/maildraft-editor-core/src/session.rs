//! Per-field regeneration session.
//!
//! One session exists per open regenerate affordance. It owns two private
//! sandboxes seeded from the synchronizer's document at open time: the
//! "original" pane is never patched after seeding, the "modified" pane is
//! re-patched on every preview change so the user compares like-for-like.
//! The session never commits anything itself - apply reports the selected
//! version upstream and the synchronizer performs the backend call.

use futures::StreamExt;
use maildraft_api::{
    EditorBackend, HistoryRequest, ImageRegenEvent, PromptSuggestion, RegenerateFieldRequest,
    RegenerateListItemRequest, Version,
};
use maildraft_dom::{Document, Sandbox, ScrollBehavior, ScrollBlock};
use smol_str::SmolStr;

use crate::error::EditorError;
use crate::highlight::HighlightController;
use crate::identity::{Collection, FieldId, SimpleField};
use crate::patcher;
use crate::sync::SessionSeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoadingHistory,
    Ready,
    Submitting,
    Applying,
    Closed,
}

/// What the header UI shows next to "Apply": a version number and the
/// selected version's id. On open and after a submission the number is the
/// total count; while browsing it is the 1-based position of the selected
/// version in the newest-first order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionReport {
    pub version: u64,
    pub id: u64,
}

/// The session's result, handed upstream on apply.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub field: FieldId,
    pub version_id: u64,
    pub version_number: u64,
    /// Text data for text fields, the image URL for the hero image.
    pub payload: String,
}

struct Pane<S> {
    sandbox: S,
    highlight: HighlightController,
}

pub struct RegenSession<S: Sandbox> {
    asset_id: u64,
    field: FieldId,
    field_name: SmolStr,
    state: SessionState,
    prompt: String,
    suggestions: Vec<PromptSuggestion>,
    /// Newest-first, replaced wholesale by every backend response.
    versions: Vec<Version>,
    selected: Option<u64>,
    last_report: Option<VersionReport>,
    /// Preview payload parked while the modified pane is still loading.
    /// Overwritten by newer selections: last write wins.
    pending_preview: Option<String>,
    original: Pane<S>,
    modified: Pane<S>,
}

impl<S: Sandbox> RegenSession<S> {
    /// Open a session: seed both panes from the synchronizer's document
    /// and fetch prompt suggestions and prior history concurrently.
    ///
    /// Returns the initial version report when history exists (the newest
    /// version becomes the preview selection). Fetch failures are logged
    /// and leave the session usable with an empty history.
    pub async fn open<B: EditorBackend>(
        seed: SessionSeed,
        mut original: S,
        mut modified: S,
        backend: &B,
    ) -> Result<(Self, Option<VersionReport>), EditorError> {
        original.set_content(&seed.html)?;
        modified.set_content(&seed.html)?;

        let mut session = Self {
            asset_id: seed.asset_id,
            field: seed.field.clone(),
            field_name: seed.field_name.clone(),
            state: SessionState::LoadingHistory,
            prompt: String::new(),
            suggestions: Vec::new(),
            versions: Vec::new(),
            selected: None,
            last_report: None,
            pending_preview: None,
            original: Pane {
                sandbox: original,
                highlight: HighlightController::new(),
            },
            modified: Pane {
                sandbox: modified,
                highlight: HighlightController::new(),
            },
        };

        let history_req = HistoryRequest {
            field: seed.field.backend_key().to_string(),
            claim_nonclaim_id: seed.field.item_id(),
        };
        let (suggestions, history) = futures::join!(
            backend.fetch_prompt_suggestions(seed.field.backend_key()),
            backend.fetch_history(seed.asset_id, history_req),
        );

        match suggestions {
            Ok(list) => session.suggestions = list,
            Err(error) => {
                tracing::warn!(field = %session.field_name, %error, "prompt suggestions unavailable");
            }
        }

        let report = match history {
            Ok(list) if !list.versions.is_empty() => {
                session.versions = list.versions;
                let newest_id = session.versions[0].id;
                let payload = session.versions[0].payload().unwrap_or_default().to_string();
                session.selected = Some(newest_id);
                session.apply_preview(&payload);
                let report = VersionReport {
                    version: session.versions.len() as u64,
                    id: newest_id,
                };
                session.last_report = Some(report);
                Some(report)
            }
            Ok(_) => None,
            Err(error) => {
                tracing::warn!(field = %session.field_name, %error, "regeneration history unavailable");
                None
            }
        };

        session.state = SessionState::Ready;
        Ok((session, report))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn field(&self) -> &FieldId {
        &self.field
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
    }

    pub fn suggestions(&self) -> &[PromptSuggestion] {
        &self.suggestions
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn selected_version(&self) -> Option<u64> {
        self.selected
    }

    pub fn original_document(&self) -> Option<&Document> {
        self.original.sandbox.document()
    }

    pub fn modified_document(&self) -> Option<&Document> {
        self.modified.sandbox.document()
    }

    /// Load-complete signal for the original pane: highlight the target so
    /// the user compares the same spot in both panes. Never patched.
    pub fn handle_original_load(&mut self) -> Result<(), EditorError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.original.sandbox.finish_load();
        if let Some(doc) = self.original.sandbox.document_mut() {
            HighlightController::inject_marker_styles(doc);
        }
        self.original
            .highlight
            .select(&mut self.original.sandbox, &self.field_name)
    }

    /// Load-complete signal for the modified pane: highlight the target,
    /// then apply whatever preview was parked while loading.
    pub fn handle_modified_load(&mut self) -> Result<(), EditorError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.modified.sandbox.finish_load();
        if let Some(doc) = self.modified.sandbox.document_mut() {
            HighlightController::inject_marker_styles(doc);
        }
        self.modified
            .highlight
            .select(&mut self.modified.sandbox, &self.field_name)?;
        if let Some(payload) = self.pending_preview.take() {
            self.apply_preview(&payload);
        }
        Ok(())
    }

    /// Submit the prompt for regeneration.
    ///
    /// All call shapes converge on the same postcondition: the local
    /// version list is replaced wholesale with the server's authoritative
    /// list, the newest version is selected and previewed. On failure the
    /// prompt text is preserved so the user can retry without retyping.
    pub async fn submit<B: EditorBackend>(
        &mut self,
        backend: &B,
    ) -> Result<Option<VersionReport>, EditorError> {
        if self.state == SessionState::Closed {
            return Ok(None);
        }
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(EditorError::EmptyPrompt);
        }
        self.state = SessionState::Submitting;

        let result = match &self.field {
            FieldId::ListItem { collection, id } => {
                let req = match collection {
                    Collection::Nonclaim => RegenerateListItemRequest::nonclaim(&prompt, *id),
                    Collection::Claim => RegenerateListItemRequest::claim(&prompt, *id),
                };
                backend
                    .regenerate_list_item(self.asset_id, req)
                    .await
                    .map(|list| list.versions)
            }
            FieldId::Simple(SimpleField::HeroImage) => {
                let req = RegenerateFieldRequest {
                    field: self.field.backend_key().to_string(),
                    prompt: prompt.clone(),
                };
                let mut stream = backend.regenerate_image(self.asset_id, req);
                let mut terminal = Err(maildraft_api::BackendError::Transport(
                    "image stream ended without a terminal event".to_string(),
                ));
                while let Some(event) = stream.next().await {
                    match event {
                        ImageRegenEvent::Progress(_) => continue,
                        ImageRegenEvent::End(versions) => {
                            terminal = Ok(versions);
                            break;
                        }
                        ImageRegenEvent::Failed(message) => {
                            terminal = Err(maildraft_api::BackendError::Transport(message));
                            break;
                        }
                    }
                }
                terminal
            }
            FieldId::Simple(_) => {
                let req = RegenerateFieldRequest {
                    field: self.field.backend_key().to_string(),
                    prompt: prompt.clone(),
                };
                backend
                    .regenerate_field(self.asset_id, req)
                    .await
                    .map(|list| list.versions)
            }
        };

        match result {
            Ok(versions) if !versions.is_empty() => {
                self.versions = versions;
                let newest_id = self.versions[0].id;
                let payload = self.versions[0].payload().unwrap_or_default().to_string();
                self.selected = Some(newest_id);
                self.apply_preview(&payload);
                self.prompt.clear();
                let report = VersionReport {
                    version: self.versions.len() as u64,
                    id: newest_id,
                };
                self.last_report = Some(report);
                self.state = SessionState::Ready;
                Ok(Some(report))
            }
            Ok(_) => {
                self.state = SessionState::Ready;
                Err(EditorError::Regeneration {
                    source: maildraft_api::BackendError::Decode(
                        "backend returned no versions".to_string(),
                    ),
                })
            }
            Err(source) => {
                self.state = SessionState::Ready;
                Err(EditorError::Regeneration { source })
            }
        }
    }

    /// Browse to a version by id. Returns the report with the 1-based
    /// position of the version within the newest-first order.
    pub fn select_version(&mut self, version_id: u64) -> Option<VersionReport> {
        let position = self.versions.iter().position(|v| v.id == version_id)?;
        let payload = self.versions[position].payload().unwrap_or_default().to_string();
        self.selected = Some(version_id);
        self.apply_preview(&payload);
        let report = VersionReport {
            version: (position + 1) as u64,
            id: version_id,
        };
        self.last_report = Some(report);
        Some(report)
    }

    /// 1-based position of a version within the newest-first order.
    pub fn version_position(&self, version_id: u64) -> Option<u64> {
        self.versions
            .iter()
            .position(|v| v.id == version_id)
            .map(|i| (i + 1) as u64)
    }

    /// The content the synchronizer would commit on apply. `None` when no
    /// version has been produced or selected yet - the informational
    /// no-change case.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        let report = self.last_report?;
        if report.version == 0 {
            return None;
        }
        let selected_id = self.selected?;
        let version = self.versions.iter().find(|v| v.id == selected_id)?;
        Some(SessionOutcome {
            field: self.field.clone(),
            version_id: selected_id,
            version_number: report.version,
            payload: version.payload().unwrap_or_default().to_string(),
        })
    }

    /// Close the session and discard its scratch state. Used by both the
    /// apply path (after a successful commit) and exit-to-editor, which
    /// touches nothing upstream.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.pending_preview = None;
    }

    /// Re-patch the modified pane from the given payload, or park it if
    /// the pane has not finished loading. Parking overwrites: only the
    /// most recent selection's effect may become visible.
    fn apply_preview(&mut self, payload: &str) {
        if !self.modified.sandbox.is_loaded() {
            self.pending_preview = Some(payload.to_string());
            return;
        }
        if let Some(doc) = self.modified.sandbox.document_mut() {
            match &self.field {
                FieldId::Simple(SimpleField::HeroImage) => {
                    patcher::set_image(doc, &self.field, payload);
                }
                _ => {
                    patcher::set_text(doc, &self.field, payload);
                }
            }
        }
        // Keep both panes parked on the target so the comparison stays
        // side-by-side.
        scroll_to_field(&mut self.modified.sandbox, &self.field);
        scroll_to_field(&mut self.original.sandbox, &self.field);
    }
}

fn scroll_to_field<S: Sandbox>(sandbox: &mut S, field: &FieldId) {
    if !sandbox.is_loaded() {
        return;
    }
    let target = sandbox
        .document()
        .and_then(|doc| patcher::locate(doc, field));
    if let Some(node) = target {
        sandbox.scroll_into_view(node, ScrollBehavior::Smooth, ScrollBlock::Center);
    }
}
