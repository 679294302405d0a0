//! Document model for tabshell
//!
//! A `Document` is one open unit of editable text. Its dirty status is never
//! stored: it is always recomputed from `content` and the saved baseline.

use std::fmt;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Document Identifier
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque identifier of an open document.
///
/// Assigned by the registry at creation and stable for the document's
/// lifetime in memory. Identifiers are never reused within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value (for logging and display only).
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime state for one open document.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    /// File path (None for documents never saved)
    path: Option<PathBuf>,
    /// Current in-memory text
    content: String,
    /// Text as of the last successful save, load or restore
    saved_content: String,
    /// Placeholder title used while the document has no path ("Untitled 3")
    placeholder: String,
}

impl Document {
    pub(crate) fn new(
        id: DocumentId,
        path: Option<PathBuf>,
        content: String,
        placeholder: String,
    ) -> Self {
        Self {
            id,
            path,
            saved_content: content.clone(),
            content,
            placeholder,
        }
    }

    /// Create a document whose saved baseline differs from its content.
    ///
    /// Used when restoring a session entry that was dirty at persist time.
    pub(crate) fn with_baseline(
        id: DocumentId,
        path: Option<PathBuf>,
        content: String,
        saved_content: String,
        placeholder: String,
    ) -> Self {
        Self {
            id,
            path,
            content,
            saved_content,
            placeholder,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn saved_content(&self) -> &str {
        &self.saved_content
    }

    /// Check if the document has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.content != self.saved_content
    }

    /// Get the display title: the file name if a path is set, else the placeholder.
    pub fn title(&self) -> String {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.placeholder.clone())
    }

    /// Title with a trailing `*` when the document is dirty.
    pub fn tab_label(&self) -> String {
        if self.is_dirty() {
            format!("{}*", self.title())
        } else {
            self.title()
        }
    }

    /// An untitled document that was never edited.
    ///
    /// Such placeholders carry nothing worth persisting.
    pub fn is_untouched_placeholder(&self) -> bool {
        self.path.is_none() && !self.is_dirty()
    }

    /// Replace the content. Returns `true` if it actually changed.
    pub(crate) fn set_content(&mut self, content: String) -> bool {
        if content == self.content {
            return false;
        }
        self.content = content;
        true
    }

    /// Adopt a successful write: new location and new saved baseline.
    pub(crate) fn mark_saved(&mut self, path: PathBuf, saved_content: String) {
        self.path = Some(path);
        self.saved_content = saved_content;
    }

    /// Drop unsaved edits by resetting content to the saved baseline.
    pub(crate) fn revert(&mut self) -> bool {
        if !self.is_dirty() {
            return false;
        }
        self.content = self.saved_content.clone();
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
