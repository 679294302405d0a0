//! Output events from the core to the Presentation Surface and host.

use crate::document::DocumentId;
use crate::gateway::DecisionScope;
use std::path::PathBuf;

/// Something the Presentation Surface or the host needs to react to.
///
/// Events are queued in order and drained with `take_events()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// A new document was appended to the registry
    DocumentCreated { id: DocumentId, title: String },
    /// The active document changed (`None` once the registry is empty)
    DocumentActivated { id: Option<DocumentId> },
    /// Content, dirty flag or title of a document changed
    DocumentUpdated {
        id: DocumentId,
        dirty: bool,
        title: String,
    },
    /// A document left the registry
    DocumentRemoved { id: DocumentId },
    /// The user must choose Save, Discard or Cancel
    DecisionRequested(DecisionScope),
    /// A save or save-as finished successfully
    Saved { id: DocumentId, path: PathBuf },
    /// A save or save-as failed; the document is still dirty
    SaveFailed { id: DocumentId, message: String },
    /// The user dismissed the save picker
    SaveCancelled { id: DocumentId },
    /// Opening a file failed
    OpenFailed { path: PathBuf, message: String },
    /// The last document was removed
    RegistryEmpty,
    /// The session close protocol reached `Terminated`
    SafeToTerminate,
}
