//! The isolated browsing context the editor patches against.
//!
//! A `Sandbox` owns one rendered document and models the load lifecycle of
//! an embedded frame: setting content begins a load, and mutation/scroll
//! operations are only meaningful once the host signals load completion.
//! Callers that want to act on an unloaded sandbox park their work and
//! retry on the load-complete signal; they never poll.

use crate::node::Document;
use crate::parse::DomError;
use crate::NodeId;

/// Where the document is in its load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// No content has been set yet.
    #[default]
    Empty,
    /// Content set, load-complete signal not yet fired.
    Loading,
    /// Load finished; the document is safe to patch and scroll.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBlock {
    Start,
    Center,
}

/// One scroll-into-view request, as issued by the highlight controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub target: NodeId,
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

/// An isolated rendering context holding one document.
///
/// Implementations back this with whatever rendering engine hosts the
/// preview; [`MemorySandbox`] is the in-memory implementation used by the
/// core and its tests.
pub trait Sandbox {
    /// The current document, `None` until content has been set.
    fn document(&self) -> Option<&Document>;

    fn document_mut(&mut self) -> Option<&mut Document>;

    fn load_state(&self) -> LoadState;

    /// Replace the content wholesale. Re-enters `Loading`: replacing the
    /// document destroys any previous load state.
    fn set_content(&mut self, html: &str) -> Result<(), DomError>;

    /// Signal that the load finished. Idempotent.
    fn finish_load(&mut self);

    /// Bring an element into view.
    fn scroll_into_view(&mut self, target: NodeId, behavior: ScrollBehavior, block: ScrollBlock);

    fn is_loaded(&self) -> bool {
        self.load_state() == LoadState::Complete
    }
}

/// In-memory sandbox with an inspectable scroll log.
#[derive(Debug, Default)]
pub struct MemorySandbox {
    doc: Option<Document>,
    state: LoadState,
    scrolls: Vec<ScrollRequest>,
}

impl MemorySandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for tests and seeding: content set and load already
    /// complete.
    pub fn loaded(html: &str) -> Result<Self, DomError> {
        let mut sandbox = Self::new();
        sandbox.set_content(html)?;
        sandbox.finish_load();
        Ok(sandbox)
    }

    /// The most recent scroll request, if any.
    pub fn last_scroll(&self) -> Option<&ScrollRequest> {
        self.scrolls.last()
    }

    pub fn scroll_count(&self) -> usize {
        self.scrolls.len()
    }
}

impl Sandbox for MemorySandbox {
    fn document(&self) -> Option<&Document> {
        self.doc.as_ref()
    }

    fn document_mut(&mut self) -> Option<&mut Document> {
        self.doc.as_mut()
    }

    fn load_state(&self) -> LoadState {
        self.state
    }

    fn set_content(&mut self, html: &str) -> Result<(), DomError> {
        self.doc = Some(Document::parse(html)?);
        self.state = LoadState::Loading;
        Ok(())
    }

    fn finish_load(&mut self) {
        if self.doc.is_some() {
            self.state = LoadState::Complete;
        }
    }

    fn scroll_into_view(&mut self, target: NodeId, behavior: ScrollBehavior, block: ScrollBlock) {
        self.scrolls.push(ScrollRequest {
            target,
            behavior,
            block,
        });
    }
}
