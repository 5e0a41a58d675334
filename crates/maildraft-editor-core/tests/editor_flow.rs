//! End-to-end editor flows against an in-memory backend: form edits,
//! regeneration round-trips, apply/discard, and save.

use std::cell::{Cell, RefCell};

use futures::StreamExt;
use maildraft_api::{
    ApplyListItemRequest, ApplyResponse, ApplyVersionRequest, BackendError, EditorBackend,
    HistoryRequest, ImageMeta, ImageRegenEvent, ImageRegenStream, ListItem, PromptSuggestion,
    RegenerateFieldRequest, RegenerateListItemRequest, SaveAssetRequest, Version, VersionList,
};
use maildraft_dom::MemorySandbox;
use maildraft_editor_core::{
    ApplyOutcome, ContentSynchronizer, DiscardCheck, Collection, EditorError, FormSnapshot,
    RegenSession, MARKER_CLASS,
};

const TEMPLATE: &str = r#"<html><head><title>Campaign</title></head><body>
<h2 id="subject_line">Old subject</h2>
<p id="preview">Old preheader</p>
<p id="intro">Old intro</p>
<div id="hero_image"><img src="https://cdn.example/hero.png"></div>
<h3 id="claim_3242" data-claim-id="3242">Claim A</h3>
<h3 id="claim_3243" data-claim-id="3243">Claim other</h3>
<ul>
<li id="nonclaim_12274" data-nonclaim-id="12274">First statement</li>
<li id="nonclaim_12275" data-nonclaim-id="12275">Second statement</li>
</ul>
<p id="closing">Old closing</p>
</body></html>"#;

fn snapshot() -> FormSnapshot {
    FormSnapshot {
        subject: "Old subject".into(),
        preheader: "Old preheader".into(),
        introduction: "Old intro".into(),
        closing: "Old closing".into(),
        hero_image: "https://cdn.example/hero.png".into(),
        claims: vec![
            ListItem::new(3242, "Claim A"),
            ListItem::new(3243, "Claim other"),
        ],
        nonclaims: vec![
            ListItem::new(12274, "First statement"),
            ListItem::new(12275, "Second statement"),
        ],
    }
}

fn version(id: u64, data: &str) -> Version {
    Version {
        id,
        field: "non_claim".into(),
        prompt: "p".into(),
        data: Some(data.into()),
        url: None,
        created_at: "2025-04-11T11:50:13".into(),
    }
}

fn image_version(id: u64, url: &str) -> Version {
    Version {
        id,
        field: "hero_image".into(),
        prompt: "p".into(),
        data: None,
        url: Some(url.into()),
        created_at: "2025-04-11T11:50:13".into(),
    }
}

/// Synchronizer with the template seeded and loaded.
fn editor() -> ContentSynchronizer<MemorySandbox> {
    let mut sync = ContentSynchronizer::new(3, 7, snapshot(), MemorySandbox::new());
    sync.seed(TEMPLATE).unwrap();
    sync.handle_load_complete().unwrap();
    sync
}

#[derive(Default)]
struct MockBackend {
    history: RefCell<Vec<Version>>,
    regen: RefCell<Vec<Version>>,
    image_events: RefCell<Vec<ImageRegenEvent>>,
    apply_response: RefCell<ApplyResponse>,
    fail_save: Cell<bool>,
    saves: RefCell<Vec<SaveAssetRequest>>,
    applied_fields: RefCell<Vec<ApplyVersionRequest>>,
    applied_items: RefCell<Vec<ApplyListItemRequest>>,
    history_requests: RefCell<Vec<HistoryRequest>>,
}

impl EditorBackend for MockBackend {
    async fn save(&self, _asset_id: u64, req: SaveAssetRequest) -> Result<(), BackendError> {
        if self.fail_save.get() {
            return Err(BackendError::Http {
                status: 500,
                message: "save exploded".into(),
            });
        }
        self.saves.borrow_mut().push(req);
        Ok(())
    }

    async fn regenerate_field(
        &self,
        _asset_id: u64,
        _req: RegenerateFieldRequest,
    ) -> Result<VersionList, BackendError> {
        Ok(VersionList {
            versions: self.regen.borrow().clone(),
        })
    }

    async fn regenerate_list_item(
        &self,
        _asset_id: u64,
        _req: RegenerateListItemRequest,
    ) -> Result<VersionList, BackendError> {
        Ok(VersionList {
            versions: self.regen.borrow().clone(),
        })
    }

    fn regenerate_image(
        &self,
        _asset_id: u64,
        _req: RegenerateFieldRequest,
    ) -> ImageRegenStream<'_> {
        futures::stream::iter(self.image_events.borrow().clone()).boxed()
    }

    async fn apply_field_version(
        &self,
        _asset_id: u64,
        req: ApplyVersionRequest,
    ) -> Result<ApplyResponse, BackendError> {
        self.applied_fields.borrow_mut().push(req);
        Ok(self.apply_response.borrow().clone())
    }

    async fn apply_list_item_version(
        &self,
        _asset_id: u64,
        req: ApplyListItemRequest,
    ) -> Result<ApplyResponse, BackendError> {
        self.applied_items.borrow_mut().push(req);
        Ok(self.apply_response.borrow().clone())
    }

    async fn fetch_history(
        &self,
        _asset_id: u64,
        req: HistoryRequest,
    ) -> Result<VersionList, BackendError> {
        self.history_requests.borrow_mut().push(req);
        Ok(VersionList {
            versions: self.history.borrow().clone(),
        })
    }

    async fn fetch_prompt_suggestions(
        &self,
        _backend_field: &str,
    ) -> Result<Vec<PromptSuggestion>, BackendError> {
        Ok(vec![PromptSuggestion {
            prompt: "Make it more concise".into(),
        }])
    }
}

#[test]
fn form_change_keeps_document_and_snapshot_equal() {
    let mut sync = editor();
    let mut changed = snapshot();
    changed.subject = "New Subject".into();
    changed.nonclaims[1].text = "Rewritten second".into();
    sync.apply_form_change(changed).unwrap();

    let doc = sync.document().unwrap();
    let subject = doc.element_by_id("subject_line").unwrap();
    assert_eq!(doc.text_content(subject), "New Subject");
    assert_eq!(sync.snapshot().subject, "New Subject");

    // Invariant: every anchor equals its snapshot value.
    for (id, expected) in [
        ("preview", "Old preheader"),
        ("intro", "Old intro"),
        ("closing", "Old closing"),
        ("claim_3242", "Claim A"),
        ("nonclaim_12274", "First statement"),
        ("nonclaim_12275", "Rewritten second"),
    ] {
        let node = doc.element_by_id(id).unwrap();
        assert_eq!(doc.text_content(node), expected, "anchor {id}");
    }
}

#[tokio::test]
async fn nonclaim_history_browse_reports_position_and_renders() {
    let mut sync = editor();
    let backend = MockBackend::default();
    *backend.history.borrow_mut() = vec![version(9, "A"), version(8, "B")];

    let seed = sync.open_regeneration("nonclaim_12274").unwrap();
    let (mut session, report) = RegenSession::open(
        seed,
        MemorySandbox::new(),
        MemorySandbox::new(),
        &backend,
    )
    .await
    .unwrap();

    // History exists: report is the count/newest-id pair.
    let report = report.unwrap();
    assert_eq!((report.version, report.id), (2, 9));
    // The history lookup carried the item id.
    assert_eq!(
        backend.history_requests.borrow()[0].claim_nonclaim_id,
        Some(12274)
    );

    session.handle_original_load().unwrap();
    session.handle_modified_load().unwrap();

    // Newest version previews on load.
    let doc = session.modified_document().unwrap();
    let target = doc.query_by_attr("data-nonclaim-id", "12274").unwrap();
    assert_eq!(doc.text_content(target), "A");
    // The original pane is never patched.
    let original = session.original_document().unwrap();
    let untouched = original.query_by_attr("data-nonclaim-id", "12274").unwrap();
    assert_eq!(original.text_content(untouched), "First statement");

    // Selecting id 8 renders "B" and reports position 2 (newest-first).
    let report = session.select_version(8).unwrap();
    assert_eq!((report.version, report.id), (2, 8));
    let doc = session.modified_document().unwrap();
    let target = doc.query_by_attr("data-nonclaim-id", "12274").unwrap();
    assert_eq!(doc.text_content(target), "B");

    // Round trip: back to 9 restores the first render exactly.
    session.select_version(9).unwrap();
    session.select_version(8).unwrap();
    let report = session.select_version(9).unwrap();
    assert_eq!((report.version, report.id), (1, 9));
    let doc = session.modified_document().unwrap();
    let target = doc.query_by_attr("data-nonclaim-id", "12274").unwrap();
    assert_eq!(doc.text_content(target), "A");
}

#[tokio::test]
async fn apply_claim_regeneration_commits_by_id() {
    let mut sync = editor();
    let backend = MockBackend::default();
    *backend.regen.borrow_mut() = vec![version(41, "Claim B")];

    let seed = sync.open_regeneration("claim_3242").unwrap();
    let (mut session, report) = RegenSession::open(
        seed,
        MemorySandbox::new(),
        MemorySandbox::new(),
        &backend,
    )
    .await
    .unwrap();
    assert!(report.is_none());
    session.handle_original_load().unwrap();
    session.handle_modified_load().unwrap();

    session.set_prompt("make it stronger");
    let report = session.submit(&backend).await.unwrap().unwrap();
    assert_eq!((report.version, report.id), (1, 41));
    assert_eq!(session.prompt(), "", "prompt clears on success");

    let outcome = session.outcome();
    let applied = sync
        .apply_regeneration(outcome, &backend, |_| {})
        .await
        .unwrap();
    assert_eq!(applied, ApplyOutcome::Applied { version_number: 1 });
    session.close();

    // Committed at the index matching id 3242, not a fixed position.
    assert_eq!(
        sync.snapshot().item_text(Collection::Claim, 3242),
        Some("Claim B")
    );
    assert_eq!(
        sync.snapshot().item_text(Collection::Claim, 3243),
        Some("Claim other")
    );
    let doc = sync.document().unwrap();
    let claim = doc.element_by_id("claim_3242").unwrap();
    assert_eq!(doc.text_content(claim), "Claim B");

    // The claim-specific apply endpoint got the item id.
    let req = &backend.applied_items.borrow()[0];
    assert_eq!(req.field, "claim");
    assert_eq!(req.id, 41);
    assert_eq!(req.orderedclaim_id, Some(3242));
    assert_eq!(req.orderednonclaim_id, None);
}

#[tokio::test]
async fn apply_with_no_versions_is_informational_noop() {
    let mut sync = editor();
    let backend = MockBackend::default();

    let seed = sync.open_regeneration("subject").unwrap();
    let (session, report) = RegenSession::open(
        seed,
        MemorySandbox::new(),
        MemorySandbox::new(),
        &backend,
    )
    .await
    .unwrap();
    assert!(report.is_none());

    let applied = sync
        .apply_regeneration(session.outcome(), &backend, |_| {})
        .await
        .unwrap();
    assert_eq!(applied, ApplyOutcome::NoChange);
    assert!(backend.applied_fields.borrow().is_empty());
}

#[tokio::test]
async fn image_regeneration_streams_and_apply_notifies() {
    let mut sync = editor();
    let backend = MockBackend::default();
    *backend.image_events.borrow_mut() = vec![
        ImageRegenEvent::Progress("rendering".into()),
        ImageRegenEvent::End(vec![image_version(17, "https://cdn.example/candidate.jpg")]),
    ];
    *backend.apply_response.borrow_mut() = ApplyResponse {
        hero_image_url: Some("https://cdn.example/final.jpg".into()),
        images_data: vec![ImageMeta {
            id: 1,
            url: "https://cdn.example/final.jpg".into(),
            alt: None,
        }],
    };

    let seed = sync.open_regeneration("hero_image").unwrap();
    assert_eq!(seed.initial_value, "https://cdn.example/hero.png");
    let (mut session, _) = RegenSession::open(
        seed,
        MemorySandbox::new(),
        MemorySandbox::new(),
        &backend,
    )
    .await
    .unwrap();
    session.handle_original_load().unwrap();
    session.handle_modified_load().unwrap();

    session.set_prompt("two people in the hero shot");
    let report = session.submit(&backend).await.unwrap().unwrap();
    assert_eq!((report.version, report.id), (1, 17));

    // The modified pane previews the candidate image.
    let doc = session.modified_document().unwrap();
    let container = doc.element_by_id("hero_image").unwrap();
    let img = doc.first_descendant_with_tag(container, "img").unwrap();
    assert_eq!(doc.attr(img, "src"), Some("https://cdn.example/candidate.jpg"));

    let notified = RefCell::new(Vec::new());
    let applied = sync
        .apply_regeneration(session.outcome(), &backend, |images| {
            *notified.borrow_mut() = images;
        })
        .await
        .unwrap();
    assert_eq!(applied, ApplyOutcome::Applied { version_number: 1 });
    session.close();

    // The backend's committed URL wins over the candidate URL.
    assert_eq!(sync.snapshot().hero_image, "https://cdn.example/final.jpg");
    let doc = sync.document().unwrap();
    let container = doc.element_by_id("hero_image").unwrap();
    let img = doc.first_descendant_with_tag(container, "img").unwrap();
    assert_eq!(doc.attr(img, "src"), Some("https://cdn.example/final.jpg"));
    assert_eq!(notified.borrow().len(), 1);
}

#[tokio::test]
async fn parked_preview_is_last_write_wins() {
    let mut sync = editor();
    let backend = MockBackend::default();
    *backend.history.borrow_mut() = vec![version(9, "A"), version(8, "B")];

    let seed = sync.open_regeneration("nonclaim_12274").unwrap();
    let (mut session, _) = RegenSession::open(
        seed,
        MemorySandbox::new(),
        MemorySandbox::new(),
        &backend,
    )
    .await
    .unwrap();

    // Selections arrive before the modified pane finishes loading; only
    // the last one's effect may become visible.
    session.select_version(8).unwrap();
    session.select_version(9).unwrap();
    session.handle_modified_load().unwrap();

    let doc = session.modified_document().unwrap();
    let target = doc.query_by_attr("data-nonclaim-id", "12274").unwrap();
    assert_eq!(doc.text_content(target), "A");
}

#[tokio::test]
async fn closed_session_ignores_late_load_signals() {
    let mut sync = editor();
    let backend = MockBackend::default();
    *backend.history.borrow_mut() = vec![version(9, "A")];

    let seed = sync.open_regeneration("nonclaim_12274").unwrap();
    let (mut session, _) = RegenSession::open(
        seed,
        MemorySandbox::new(),
        MemorySandbox::new(),
        &backend,
    )
    .await
    .unwrap();

    // Exit-to-editor before the panes ever load.
    session.close();
    sync.close_regeneration();

    session.handle_modified_load().unwrap();
    session.handle_original_load().unwrap();
    let doc = session.modified_document().unwrap();
    let target = doc.query_by_attr("data-nonclaim-id", "12274").unwrap();
    assert_eq!(doc.text_content(target), "First statement");

    // The synchronizer's own state is untouched by the cancel.
    assert_eq!(
        sync.snapshot().item_text(Collection::Nonclaim, 12274),
        Some("First statement")
    );
}

#[tokio::test]
async fn failed_submission_preserves_prompt_for_retry() {
    let mut sync = editor();
    let backend = MockBackend::default();
    // Backend replies with an empty list: a failed regeneration.

    let seed = sync.open_regeneration("nonclaim_12274").unwrap();
    let (mut session, _) = RegenSession::open(
        seed,
        MemorySandbox::new(),
        MemorySandbox::new(),
        &backend,
    )
    .await
    .unwrap();
    session.handle_modified_load().unwrap();

    assert!(matches!(
        session.submit(&backend).await,
        Err(EditorError::EmptyPrompt)
    ));

    session.set_prompt("soften the wording");
    assert!(matches!(
        session.submit(&backend).await,
        Err(EditorError::Regeneration { .. })
    ));
    assert_eq!(session.prompt(), "soften the wording");
}

#[tokio::test]
async fn save_strips_markers_and_failure_keeps_state() {
    let mut sync = editor();
    let backend = MockBackend::default();

    let mut changed = snapshot();
    changed.subject = "New Subject".into();
    sync.apply_form_change(changed).unwrap();
    sync.select_field("claim_3242").unwrap();

    let saved = sync.save(&backend).await.unwrap();
    let req = &backend.saves.borrow()[0];
    assert_eq!(req.subject, "New Subject");
    assert_eq!(req.opening, "Old intro");
    assert_eq!(req.claim.len(), 2);
    assert_eq!(req.asset_data, saved);

    // Persisted document carries no transient highlight styling.
    let persisted = maildraft_dom::Document::parse(&saved).unwrap();
    assert!(persisted.elements_with_class(MARKER_CLASS).is_empty());
    assert!(persisted
        .elements_with_class(maildraft_editor_core::CLAIM_MARKER_CLASS)
        .is_empty());

    // A failing save mutates nothing.
    backend.fail_save.set(true);
    sync.select_field("subject").unwrap();
    let before = sync.snapshot().clone();
    let result = sync.save(&backend).await;
    assert!(matches!(result, Err(EditorError::Save { .. })));
    assert_eq!(sync.snapshot(), &before);
    assert_eq!(sync.selected_field(), Some("subject"));
}

#[tokio::test]
async fn validation_blocks_save_locally() {
    let mut sync = editor();
    let backend = MockBackend::default();

    let mut changed = snapshot();
    changed.subject = "  ".into();
    changed.nonclaims[0].text = String::new();
    sync.apply_form_change(changed).unwrap();

    match sync.save(&backend).await {
        Err(EditorError::Validation { fields }) => {
            assert!(fields.contains(&"subject".to_string()));
            assert!(fields.contains(&"nonclaim_12274".to_string()));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(backend.saves.borrow().is_empty());
}

#[test]
fn edit_cancel_restores_both_representations() {
    let mut sync = editor();

    sync.begin_item_edit(Collection::Nonclaim, 12274).unwrap();
    // A sibling cannot enter edit mode while the lock is held.
    assert!(matches!(
        sync.begin_item_edit(Collection::Nonclaim, 12275),
        Err(EditorError::EditLocked { active: 12274, .. })
    ));
    // The other collection is independent.
    sync.begin_item_edit(Collection::Claim, 3242).unwrap();
    sync.finish_item_edit(Collection::Claim, 3242);

    let mut draft = snapshot();
    draft.nonclaims[0].text = "half-typed draft".into();
    sync.apply_form_change(draft).unwrap();

    sync.cancel_item_edit(Collection::Nonclaim, 12274);
    assert_eq!(
        sync.snapshot().item_text(Collection::Nonclaim, 12274),
        Some("First statement")
    );
    let doc = sync.document().unwrap();
    let node = doc.element_by_id("nonclaim_12274").unwrap();
    assert_eq!(doc.text_content(node), "First statement");

    // The lock is released; editing may start again.
    sync.begin_item_edit(Collection::Nonclaim, 12275).unwrap();
}

#[test]
fn discard_prompts_only_on_real_changes() {
    let mut sync = editor();
    assert_eq!(sync.check_discard(), DiscardCheck::NoChanges);

    let mut changed = snapshot();
    changed.closing = "Different closing".into();
    sync.apply_form_change(changed).unwrap();
    assert_eq!(sync.check_discard(), DiscardCheck::ConfirmationRequired);

    sync.reset_to_initial();
    assert_eq!(sync.check_discard(), DiscardCheck::NoChanges);
    let doc = sync.document().unwrap();
    let closing = doc.element_by_id("closing").unwrap();
    assert_eq!(doc.text_content(closing), "Old closing");

    // An image swap alone also requires confirmation.
    let mut changed = snapshot();
    changed.hero_image = "https://cdn.example/other.png".into();
    sync.apply_form_change(changed).unwrap();
    assert_eq!(sync.check_discard(), DiscardCheck::ConfirmationRequired);
}

#[test]
fn reseeding_after_manual_update_is_skipped() {
    let mut sync = editor();
    let mut changed = snapshot();
    changed.subject = "Hand-edited".into();
    sync.apply_form_change(changed).unwrap();

    // A late re-seed with the pristine template must not clobber edits.
    sync.seed(TEMPLATE).unwrap();
    let doc = sync.document().unwrap();
    let subject = doc.element_by_id("subject_line").unwrap();
    assert_eq!(doc.text_content(subject), "Hand-edited");
}
