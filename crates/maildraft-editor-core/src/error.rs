use maildraft_api::BackendError;
use maildraft_dom::DomError;
use miette::Diagnostic;
use thiserror::Error;

use crate::identity::Collection;

#[derive(Debug, Error, Diagnostic)]
pub enum EditorError {
    /// Identity resolution failure. A programming or configuration error:
    /// a silent miss here would leave form and document permanently
    /// diverged, so it is always loud.
    #[error("unknown field: {name}")]
    #[diagnostic(code(maildraft::editor::unknown_field))]
    UnknownField { name: String },

    /// The document is missing an expected anchor. Patch-level misses are
    /// absorbed and logged; this surfaces only where a missing anchor means
    /// the operation cannot proceed at all (e.g. the targeted list item is
    /// not in the snapshot).
    #[error("no anchor for {field} in the rendered document")]
    #[diagnostic(code(maildraft::editor::anchor_not_found))]
    AnchorNotFound { field: String },

    #[error("the rendered document has not finished loading")]
    #[diagnostic(code(maildraft::editor::document_not_loaded))]
    DocumentNotLoaded,

    #[error("prompt must not be empty")]
    #[diagnostic(code(maildraft::editor::empty_prompt))]
    EmptyPrompt,

    /// Backend failure during prompt submission. Retryable; the session
    /// keeps the prompt text so the user does not retype it.
    #[error("regeneration failed")]
    #[diagnostic(code(maildraft::editor::regeneration))]
    Regeneration {
        #[source]
        source: BackendError,
    },

    #[error("save failed")]
    #[diagnostic(code(maildraft::editor::save))]
    Save {
        #[source]
        source: BackendError,
    },

    /// Local validation failure; never reaches the save collaborator.
    #[error("required fields are empty: {}", fields.join(", "))]
    #[diagnostic(code(maildraft::editor::validation))]
    Validation { fields: Vec<String> },

    #[error("{collection} {active} is still being edited")]
    #[diagnostic(code(maildraft::editor::edit_locked))]
    EditLocked { collection: Collection, active: u64 },

    #[error("document markup error: {0}")]
    #[diagnostic(code(maildraft::editor::document))]
    Dom(#[from] DomError),
}
