//! maildraft-api: collaborator contracts for the email editor core.
//!
//! The editor core talks to exactly one external system: the asset backend
//! that persists documents, regenerates field content, and serves
//! regeneration history. This crate holds the wire types for those calls
//! and the [`EditorBackend`] trait that transports implement. No transport
//! lives here; tests and hosts provide their own implementation.

pub mod backend;
pub mod error;
pub mod types;

pub use backend::{EditorBackend, ImageRegenEvent, ImageRegenStream};
pub use error::BackendError;
pub use types::{
    ApplyListItemRequest, ApplyResponse, ApplyVersionRequest, HistoryRequest, ImageMeta,
    ListItem, PromptSuggestion, RegenerateFieldRequest, RegenerateListItemRequest,
    SaveAssetRequest, Version, VersionList,
};
