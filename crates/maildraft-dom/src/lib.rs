//! maildraft-dom: the rendered-document sandbox.
//!
//! This crate provides:
//! - `Document` - an arena-backed HTML document for a fixed-shape email
//!   template (parse, query by id/attribute, mutate, serialize)
//! - `Sandbox` trait - the isolated embedded browsing context the editor
//!   core patches and scrolls, abstracted from any rendering engine
//! - `MemorySandbox` - in-memory implementation with an inspectable
//!   scroll log and an explicit load lifecycle
//!
//! The editor core never holds two handles to the same document: each
//! `Sandbox` owns its `Document` outright, so the no-aliasing rule for
//! rendered content is enforced by ownership.

pub mod node;
pub mod parse;
pub mod sandbox;

pub use node::{Document, NodeId};
pub use parse::DomError;
pub use sandbox::{
    LoadState, MemorySandbox, Sandbox, ScrollBehavior, ScrollBlock, ScrollRequest,
};
