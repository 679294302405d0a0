//! Session snapshot persistence.
//!
//! The snapshot is a write-through copy of the open documents: every save
//! replaces the record wholesale. Loading never fails; anything unreadable
//! is treated as "no session".

use super::json::{read_record, write_record};
use crate::error::{Result, ResultExt};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot Types
// ─────────────────────────────────────────────────────────────────────────────

/// One restorable document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    /// Backing file (None for documents never saved)
    pub path: Option<PathBuf>,
    /// Content at snapshot time
    pub content: String,
    /// Whether content differed from the saved baseline
    pub dirty: bool,
    /// Saved baseline, only written for dirty entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_content: Option<String>,
}

impl SessionEntry {
    /// An untitled, unedited document: nothing worth restoring.
    pub fn is_placeholder(&self) -> bool {
        self.path.is_none() && !self.dirty
    }
}

/// Ordered list of restorable documents plus the active one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub documents: Vec<SessionEntry>,
    /// Index into `documents` of the active document
    pub active_index: Option<usize>,
}

impl SessionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Drop placeholder entries and re-point `active_index`.
    ///
    /// If the active entry itself was a placeholder, `active_index` becomes `None`.
    pub fn pruned(&self) -> SessionSnapshot {
        let mut documents = Vec::with_capacity(self.documents.len());
        let mut active_index = None;

        for (index, entry) in self.documents.iter().enumerate() {
            if entry.is_placeholder() {
                continue;
            }
            if self.active_index == Some(index) {
                active_index = Some(documents.len());
            }
            documents.push(entry.clone());
        }

        SessionSnapshot {
            documents,
            active_index,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Store
// ─────────────────────────────────────────────────────────────────────────────

/// Reads and writes the session record at a fixed path.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the persisted snapshot.
    ///
    /// Placeholder entries are excluded before writing.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let snapshot = snapshot.pruned();
        write_record(&self.path, &snapshot)?;
        debug!(
            "Session saved with {} document(s)",
            snapshot.documents.len()
        );
        Ok(())
    }

    /// The last persisted snapshot, or an empty one.
    pub fn load(&self) -> SessionSnapshot {
        let snapshot = read_record::<SessionSnapshot>(&self.path)
            .map(Option::unwrap_or_default)
            .unwrap_or_warn_default(SessionSnapshot::default(), "Failed to load session");

        // A hand-edited record may carry an out-of-range index
        let snapshot = match snapshot.active_index {
            Some(i) if i >= snapshot.documents.len() => SessionSnapshot {
                active_index: None,
                ..snapshot
            },
            _ => snapshot,
        };

        if !snapshot.is_empty() {
            info!(
                "Loaded session with {} document(s)",
                snapshot.documents.len()
            );
        }
        snapshot
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
