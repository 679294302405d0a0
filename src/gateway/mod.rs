//! Storage Gateway contract for tabshell
//!
//! The core never performs document I/O itself. Instead it queues
//! `GatewayRequest`s; the host hands each one to a `StorageGateway`
//! (directly or through `dispatch`) and feeds the resulting
//! `GatewayReply` back into the core. Between request and reply the
//! owning state machine stays parked, with no timeout.
//!
//! Two gateways ship with the crate:
//! - `TerminalGateway`: prompts on a line-based terminal
//! - `NativeGateway`: native dialogs through rfd (feature `native-dialogs`)

#[cfg(feature = "native-dialogs")]
pub mod native;
pub mod terminal;

use crate::document::DocumentId;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Decisions
// ─────────────────────────────────────────────────────────────────────────────

/// The three choices of every confirmation dialog.
///
/// At session scope, `Save` means "save all" and `Discard` means
/// "quit without saving".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Save,
    Discard,
    Cancel,
}

/// What a confirmation dialog is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionScope {
    /// Closing one dirty tab
    Tab { id: DocumentId, title: String },
    /// Terminating with `dirty_count` dirty documents
    Session { dirty_count: usize },
}

impl DecisionScope {
    /// Message shown in the confirmation dialog.
    pub fn message(&self) -> String {
        match self {
            DecisionScope::Tab { title, .. } => {
                format!("'{}' has unsaved changes.", title)
            }
            DecisionScope::Session { dirty_count: 1 } => {
                "1 document has unsaved changes.".to_string()
            }
            DecisionScope::Session { dirty_count } => {
                format!("{} documents have unsaved changes.", dirty_count)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests and Replies
// ─────────────────────────────────────────────────────────────────────────────

/// An operation the core needs the gateway to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayRequest {
    /// Ask the user for a file to open
    OpenPicker,
    /// Read a file's text
    ReadFile { path: PathBuf },
    /// Ask the user where to save document `id`
    SavePicker { id: DocumentId, default_name: String },
    /// Write document `id`'s content snapshot to `path`
    WriteFile {
        id: DocumentId,
        path: PathBuf,
        content: String,
    },
    /// Ask the user to Save, Discard or Cancel
    Confirm(DecisionScope),
}

/// The outcome of a `GatewayRequest`. `None` paths mean "cancelled".
#[derive(Debug)]
pub enum GatewayReply {
    OpenPicked(Option<PathBuf>),
    FileRead {
        path: PathBuf,
        result: io::Result<String>,
    },
    SavePicked {
        id: DocumentId,
        path: Option<PathBuf>,
    },
    FileWritten {
        id: DocumentId,
        result: io::Result<()>,
    },
    Decided(Decision),
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Performs file I/O and presents pickers and dialogs.
///
/// Reads and writes default to plain `std::fs` text I/O.
pub trait StorageGateway {
    /// Pick a file to open. `None` if cancelled.
    fn open_picker(&mut self) -> Option<PathBuf>;

    /// Pick a save destination. `None` if cancelled.
    fn save_picker(&mut self, default_name: &str) -> Option<PathBuf>;

    /// Ask Save / Discard / Cancel.
    fn confirm(&mut self, scope: &DecisionScope) -> Decision;

    fn read_file(&mut self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_file(&mut self, path: &Path, content: &str) -> io::Result<()> {
        fs::write(path, content)
    }
}

/// Perform one request on `gateway` and package its outcome.
pub fn dispatch<G: StorageGateway + ?Sized>(gateway: &mut G, request: GatewayRequest) -> GatewayReply {
    match request {
        GatewayRequest::OpenPicker => GatewayReply::OpenPicked(gateway.open_picker()),
        GatewayRequest::ReadFile { path } => {
            let result = gateway.read_file(&path);
            GatewayReply::FileRead { path, result }
        }
        GatewayRequest::SavePicker { id, default_name } => GatewayReply::SavePicked {
            id,
            path: gateway.save_picker(&default_name),
        },
        GatewayRequest::WriteFile { id, path, content } => GatewayReply::FileWritten {
            id,
            result: gateway.write_file(&path, &content),
        },
        GatewayRequest::Confirm(scope) => GatewayReply::Decided(gateway.confirm(&scope)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scripted Gateway (tests)
// ─────────────────────────────────────────────────────────────────────────────


// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::testing::ScriptedGateway;
    use super::*;

    #[test]
    fn test_dispatch_write_and_read() {
        let mut gateway = ScriptedGateway::default();
        let id = DocumentId::new(1);
        let reply = dispatch(
            &mut gateway,
            GatewayRequest::WriteFile {
                id,
                path: PathBuf::from("/tmp/a.txt"),
                content: "hi".to_string(),
            },
        );
        assert!(matches!(reply, GatewayReply::FileWritten { id: i, result: Ok(()) } if i == id));

        let reply = dispatch(
            &mut gateway,
            GatewayRequest::ReadFile {
                path: PathBuf::from("/tmp/a.txt"),
            },
        );
        match reply {
            GatewayReply::FileRead { result, .. } => assert_eq!(result.unwrap(), "hi"),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_cancelled_pickers() {
        let mut gateway = ScriptedGateway::default();
        assert!(matches!(
            dispatch(&mut gateway, GatewayRequest::OpenPicker),
            GatewayReply::OpenPicked(None)
        ));
        let reply = dispatch(
            &mut gateway,
            GatewayRequest::SavePicker {
                id: DocumentId::new(2),
                default_name: "untitled.txt".to_string(),
            },
        );
        assert!(matches!(reply, GatewayReply::SavePicked { path: None, .. }));
        assert_eq!(
            gateway.calls,
            vec!["open_picker", "save_picker untitled.txt"]
        );
    }

    #[test]
    fn test_decision_scope_message() {
        let tab = DecisionScope::Tab {
            id: DocumentId::new(1),
            title: "notes.txt".to_string(),
        };
        assert_eq!(tab.message(), "'notes.txt' has unsaved changes.");
        assert_eq!(
            DecisionScope::Session { dirty_count: 1 }.message(),
            "1 document has unsaved changes."
        );
        assert_eq!(
            DecisionScope::Session { dirty_count: 3 }.message(),
            "3 documents have unsaved changes."
        );
    }
}
