//! Tab registry for tabshell
//!
//! The `TabRegistry` is the single mutable source of truth for open
//! documents. It owns every `Document`, keeps them in display order and
//! tracks which one is active. Every change is reported as a `CoreEvent`
//! that the owner drains with `take_events()`.

use crate::document::{Document, DocumentId};
use crate::events::CoreEvent;
use crate::store::{SessionEntry, SessionSnapshot};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Default stem for placeholder titles ("Untitled 1", "Untitled 2", ...).
pub const DEFAULT_UNTITLED_PREFIX: &str = "Untitled";

/// Ordered collection of open documents plus the active one.
///
/// Invariants:
/// - `active` is `None` only when `docs` is empty, otherwise it names a live document
/// - no two documents share the same non-null path
#[derive(Debug)]
pub struct TabRegistry {
    docs: Vec<Document>,
    active: Option<DocumentId>,
    next_id: u64,
    untitled_count: usize,
    untitled_prefix: String,
    events: Vec<CoreEvent>,
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_UNTITLED_PREFIX)
    }
}

impl TabRegistry {
    pub fn new(untitled_prefix: impl Into<String>) -> Self {
        Self {
            docs: Vec::new(),
            active: None,
            next_id: 1,
            untitled_count: 0,
            untitled_prefix: untitled_prefix.into(),
            events: Vec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// All documents in display order.
    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.docs.iter().find(|d| d.id() == id)
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.get(id).is_some()
    }

    pub fn active_id(&self) -> Option<DocumentId> {
        self.active
    }

    pub fn active(&self) -> Option<&Document> {
        self.active.and_then(|id| self.get(id))
    }

    /// Find the document backed by `path`, if any.
    pub fn find_by_path(&self, path: &Path) -> Option<DocumentId> {
        self.docs
            .iter()
            .find(|d| d.path() == Some(path))
            .map(Document::id)
    }

    /// Check if any document has unsaved changes.
    pub fn has_unsaved_changes(&self) -> bool {
        self.docs.iter().any(Document::is_dirty)
    }

    /// Ids of dirty documents, in registry order.
    pub fn dirty_ids(&self) -> Vec<DocumentId> {
        self.docs
            .iter()
            .filter(|d| d.is_dirty())
            .map(Document::id)
            .collect()
    }

    fn position(&self, id: DocumentId) -> Option<usize> {
        self.docs.iter().position(|d| d.id() == id)
    }

    fn get_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.docs.iter_mut().find(|d| d.id() == id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a document, or activate the one already backed by `path`.
    ///
    /// A new document starts clean: its saved baseline equals `content`.
    pub fn create(&mut self, path: Option<PathBuf>, content: Option<String>) -> DocumentId {
        if let Some(existing) = path.as_deref().and_then(|p| self.find_by_path(p)) {
            debug!("Document {} already backs this path, activating it", existing);
            self.activate(existing);
            return existing;
        }

        let id = self.allocate_id();
        let placeholder = self.placeholder_for(path.as_deref());
        let doc = Document::new(id, path, content.unwrap_or_default(), placeholder);
        self.push(doc);
        id
    }

    /// Set the active document. Stale or already-active ids are no-ops.
    ///
    /// Returns `true` if the active document changed.
    pub fn activate(&mut self, id: DocumentId) -> bool {
        if self.active == Some(id) {
            return false;
        }
        if !self.contains(id) {
            debug!("Ignoring activation of stale document {}", id);
            return false;
        }
        self.active = Some(id);
        self.events
            .push(CoreEvent::DocumentActivated { id: Some(id) });
        true
    }

    /// Replace a document's content. Dirty is recomputed from the baseline.
    ///
    /// Returns `true` if the content changed.
    pub fn edit(&mut self, id: DocumentId, content: String) -> bool {
        let Some(doc) = self.get_mut(id) else {
            debug!("Ignoring edit of stale document {}", id);
            return false;
        };
        if !doc.set_content(content) {
            return false;
        }
        let event = updated_event(doc);
        self.events.push(event);
        true
    }

    /// Drop the unsaved edits of a document.
    pub fn revert(&mut self, id: DocumentId) -> bool {
        let Some(doc) = self.get_mut(id) else {
            return false;
        };
        if !doc.revert() {
            return false;
        }
        let event = updated_event(doc);
        self.events.push(event);
        true
    }

    /// Remove a document.
    ///
    /// If it was active, activation falls to the tab now at the same
    /// position, else the previous one, else nothing. Emits `RegistryEmpty`
    /// when the last document goes.
    pub fn remove(&mut self, id: DocumentId) -> Option<Document> {
        let Some(index) = self.position(id) else {
            debug!("Ignoring removal of stale document {}", id);
            return None;
        };
        let doc = self.docs.remove(index);
        self.events.push(CoreEvent::DocumentRemoved { id });

        if self.active == Some(id) {
            let next = self
                .docs
                .get(index)
                .or_else(|| index.checked_sub(1).and_then(|i| self.docs.get(i)))
                .map(Document::id);
            self.active = next;
            self.events.push(CoreEvent::DocumentActivated { id: next });
        }

        debug!("Removed document {}, active is now {:?}", id, self.active);

        if self.docs.is_empty() {
            info!("Last document closed, registry is empty");
            self.events.push(CoreEvent::RegistryEmpty);
        }
        Some(doc)
    }

    /// Adopt a successful write: new path, new saved baseline, new title.
    pub fn reconcile_saved(&mut self, id: DocumentId, path: PathBuf, saved_content: String) -> bool {
        let Some(doc) = self.get_mut(id) else {
            debug!("Save finished for stale document {}", id);
            return false;
        };
        doc.mark_saved(path, saved_content);
        let event = updated_event(doc);
        self.events.push(event);
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session Snapshot
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot of every document worth restoring, in registry order.
    ///
    /// Untitled documents that were never edited are skipped.
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut documents = Vec::new();
        let mut active_index = None;

        for doc in self.docs.iter().filter(|d| !d.is_untouched_placeholder()) {
            if self.active == Some(doc.id()) {
                active_index = Some(documents.len());
            }
            documents.push(SessionEntry {
                path: doc.path().map(Path::to_path_buf),
                content: doc.content().to_string(),
                dirty: doc.is_dirty(),
                saved_content: doc.is_dirty().then(|| doc.saved_content().to_string()),
            });
        }

        SessionSnapshot {
            documents,
            active_index,
        }
    }

    /// Re-create documents from a persisted snapshot.
    ///
    /// Entries whose path is already open are skipped. Returns the ids
    /// created, in snapshot order.
    pub fn restore(&mut self, snapshot: &SessionSnapshot) -> Vec<DocumentId> {
        let mut restored = Vec::new();

        for entry in &snapshot.documents {
            if let Some(path) = entry.path.as_deref() {
                if let Some(existing) = self.find_by_path(path) {
                    debug!(
                        "Skipping restore of {}: already open as {}",
                        path.display(),
                        existing
                    );
                    continue;
                }
            }

            let id = self.allocate_id();
            let placeholder = self.placeholder_for(entry.path.as_deref());
            let doc = if entry.dirty {
                Document::with_baseline(
                    id,
                    entry.path.clone(),
                    entry.content.clone(),
                    entry.saved_content.clone().unwrap_or_default(),
                    placeholder,
                )
            } else {
                Document::new(id, entry.path.clone(), entry.content.clone(), placeholder)
            };
            self.push(doc);
            restored.push(id);
        }

        if let Some(&id) = snapshot.active_index.and_then(|i| restored.get(i)) {
            self.activate(id);
        }

        info!("Restored {} document(s) from session", restored.len());
        restored
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Take pending events (clears the list).
    pub fn take_events(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn allocate_id(&mut self) -> DocumentId {
        let id = DocumentId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn placeholder_for(&mut self, path: Option<&Path>) -> String {
        if path.is_some() {
            return self.untitled_prefix.clone();
        }
        self.untitled_count += 1;
        format!("{} {}", self.untitled_prefix, self.untitled_count)
    }

    fn push(&mut self, doc: Document) {
        let id = doc.id();
        self.events.push(CoreEvent::DocumentCreated {
            id,
            title: doc.title(),
        });
        debug!("Created document {} ({})", id, doc.title());
        self.docs.push(doc);
        self.active = Some(id);
        self.events
            .push(CoreEvent::DocumentActivated { id: Some(id) });
    }
}

fn updated_event(doc: &Document) -> CoreEvent {
    CoreEvent::DocumentUpdated {
        id: doc.id(),
        dirty: doc.is_dirty(),
        title: doc.title(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
