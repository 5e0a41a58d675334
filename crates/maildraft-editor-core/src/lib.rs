//! maildraft-editor-core: bidirectional synchronization for the email
//! editor.
//!
//! Three representations of the same content stay consistent here:
//! structured form values, the rendered HTML document in its sandbox, and
//! per-field regeneration history. The pieces:
//!
//! - `identity` - maps field names across the form / document / wire
//!   namespaces
//! - `patcher` - mutates only the anchors involved, self-healing the
//!   list-item identity carriers
//! - `highlight` - tracks the one selected field and its marker
//! - `snapshot` - the complete structurally-comparable value set
//! - `sync` - the state machine that owns form state and the document
//! - `session` - one regeneration round-trip with side-by-side preview

pub mod error;
pub mod highlight;
pub mod identity;
pub mod patcher;
pub mod session;
pub mod snapshot;
pub mod sync;

pub use error::EditorError;
pub use highlight::{CLAIM_MARKER_CLASS, HighlightController, MARKER_CLASS, MARKER_STYLE_ID};
pub use identity::{
    AnchorSpec, Collection, FieldId, NONCLAIM_CONTAINER, SimpleField, resolve,
};
pub use session::{RegenSession, SessionOutcome, SessionState, VersionReport};
pub use snapshot::FormSnapshot;
pub use sync::{
    ApplyOutcome, ContentSynchronizer, DiscardCheck, ItemEditState, SessionSeed, SyncState,
};
