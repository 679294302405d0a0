//! tabshell - multi-document text editing core
//!
//! The session core behind a tabbed plain-text editor: an ordered registry
//! of open documents with derived dirty state, per-document save
//! coordination, close protocols that never lose unsaved work without
//! asking, a bounded recent files list and a write-through session
//! snapshot. Rendering and native dialogs stay outside the core behind the
//! `StorageGateway` trait.

pub mod close;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod gateway;
pub mod registry;
pub mod save;
pub mod store;
pub mod workbench;

pub use document::{Document, DocumentId};
pub use error::{Error, Result};
pub use events::CoreEvent;
pub use gateway::{Decision, DecisionScope, GatewayReply, GatewayRequest, StorageGateway};
pub use registry::TabRegistry;
pub use workbench::Workbench;
