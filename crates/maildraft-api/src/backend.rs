//! The asset backend contract.

use futures::stream::BoxStream;

use crate::error::BackendError;
use crate::types::{
    ApplyListItemRequest, ApplyResponse, ApplyVersionRequest, HistoryRequest, PromptSuggestion,
    RegenerateFieldRequest, RegenerateListItemRequest, SaveAssetRequest, VersionList,
};

/// Events emitted by the streaming hero-image regeneration call.
///
/// The stream ends after `End` or `Failed`; intermediate `Progress` events
/// carry human-readable status and may be ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRegenEvent {
    Progress(String),
    /// Terminal event carrying the authoritative newest-first version list.
    End(Vec<crate::types::Version>),
    Failed(String),
}

pub type ImageRegenStream<'a> = BoxStream<'a, ImageRegenEvent>;

/// Everything the editor core needs from the asset backend.
///
/// All request/response calls resolve on the caller's event loop; the
/// hero-image regeneration is a stream whose terminal event carries the
/// version list. Implementations decide transport; the core only relies on
/// these shapes.
pub trait EditorBackend {
    /// Persist the complete rendered document plus structured values.
    fn save(
        &self,
        asset_id: u64,
        req: SaveAssetRequest,
    ) -> impl std::future::Future<Output = Result<(), BackendError>>;

    /// Regenerate a scalar field. Returns the full newest-first list.
    fn regenerate_field(
        &self,
        asset_id: u64,
        req: RegenerateFieldRequest,
    ) -> impl std::future::Future<Output = Result<VersionList, BackendError>>;

    /// Regenerate one claim/nonclaim item. Returns the full newest-first list.
    fn regenerate_list_item(
        &self,
        asset_id: u64,
        req: RegenerateListItemRequest,
    ) -> impl std::future::Future<Output = Result<VersionList, BackendError>>;

    /// Regenerate the hero image; streaming, see [`ImageRegenEvent`].
    fn regenerate_image(
        &self,
        asset_id: u64,
        req: RegenerateFieldRequest,
    ) -> ImageRegenStream<'_>;

    /// Commit one version of a scalar field or the hero image.
    fn apply_field_version(
        &self,
        asset_id: u64,
        req: ApplyVersionRequest,
    ) -> impl std::future::Future<Output = Result<ApplyResponse, BackendError>>;

    /// Commit one version of a claim/nonclaim item.
    fn apply_list_item_version(
        &self,
        asset_id: u64,
        req: ApplyListItemRequest,
    ) -> impl std::future::Future<Output = Result<ApplyResponse, BackendError>>;

    /// Prior versions for a field (list items pass their id).
    fn fetch_history(
        &self,
        asset_id: u64,
        req: HistoryRequest,
    ) -> impl std::future::Future<Output = Result<VersionList, BackendError>>;

    /// Prompt suggestions for a backend field key.
    fn fetch_prompt_suggestions(
        &self,
        backend_field: &str,
    ) -> impl std::future::Future<Output = Result<Vec<PromptSuggestion>, BackendError>>;
}
