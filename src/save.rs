//! Save coordination for tabshell
//!
//! The `SaveCoordinator` drives save and save-as for individual documents.
//! It allows at most one in-flight save per document and turns gateway
//! outcomes into registry updates. It holds only the document id, the
//! chosen path and the content snapshot being written; the document itself
//! stays in the registry.

use crate::document::DocumentId;
use crate::error::Error;
use crate::gateway::GatewayRequest;
use crate::registry::TabRegistry;
use crate::store::RecentFiles;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Suggested file name for documents without a path.
pub const DEFAULT_SAVE_NAME: &str = "untitled.txt";

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Plain save (reuse the path when there is one) or save-as (always pick).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Save,
    SaveAs,
}

/// A write the gateway must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub id: DocumentId,
    pub path: PathBuf,
    /// Content snapshot taken when the write was issued
    pub content: String,
}

/// How a save ended.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Written; the document's baseline and path were updated
    Saved { id: DocumentId, path: PathBuf },
    /// The user dismissed the save picker
    Cancelled { id: DocumentId },
    /// Write failed or destination refused; the document is unchanged
    Failed { id: DocumentId, error: Error },
    /// The document is gone or no save was pending; nothing happened
    Stale { id: DocumentId },
}

impl SaveOutcome {
    pub fn id(&self) -> DocumentId {
        match self {
            SaveOutcome::Saved { id, .. }
            | SaveOutcome::Cancelled { id }
            | SaveOutcome::Failed { id, .. }
            | SaveOutcome::Stale { id } => *id,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

/// What the caller must do next for a save.
#[derive(Debug)]
pub enum SaveStep {
    /// Ask the gateway for a destination
    PickDestination { id: DocumentId, default_name: String },
    /// Ask the gateway to write
    Write(WriteRequest),
    /// The save ended without further gateway work
    Finished(SaveOutcome),
}

impl SaveStep {
    /// The gateway request for this step, if any.
    pub fn request(&self) -> Option<GatewayRequest> {
        match self {
            SaveStep::PickDestination { id, default_name } => Some(GatewayRequest::SavePicker {
                id: *id,
                default_name: default_name.clone(),
            }),
            SaveStep::Write(write) => Some(GatewayRequest::WriteFile {
                id: write.id,
                path: write.path.clone(),
                content: write.content.clone(),
            }),
            SaveStep::Finished(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Save Coordinator
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Phase {
    Picking,
    Writing { path: PathBuf, content: String },
}

#[derive(Debug)]
struct PendingSave {
    kind: SaveKind,
    phase: Phase,
}

/// Serializes save requests per document.
#[derive(Debug)]
pub struct SaveCoordinator {
    pending: HashMap<DocumentId, PendingSave>,
    default_save_name: String,
}

impl Default for SaveCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_NAME)
    }
}

impl SaveCoordinator {
    pub fn new(default_save_name: impl Into<String>) -> Self {
        Self {
            pending: HashMap::new(),
            default_save_name: default_save_name.into(),
        }
    }

    /// Whether a save or save-as is in flight for `id`.
    pub fn is_pending(&self, id: DocumentId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Document whose pending write targets `path`, if any.
    pub fn writing_to(&self, path: &Path) -> Option<DocumentId> {
        self.pending.iter().find_map(|(id, pending)| match &pending.phase {
            Phase::Writing { path: target, .. } if target == path => Some(*id),
            _ => None,
        })
    }

    /// Start a save or save-as.
    ///
    /// # Errors
    ///
    /// Returns `Error::SaveInFlight` if a save for `id` is already pending.
    /// The pending save is left untouched.
    pub fn begin(
        &mut self,
        registry: &TabRegistry,
        id: DocumentId,
        kind: SaveKind,
    ) -> crate::error::Result<SaveStep> {
        if self.pending.contains_key(&id) {
            warn!("Rejecting {:?} for document {}: save already pending", kind, id);
            return Err(Error::SaveInFlight(id));
        }

        let Some(doc) = registry.get(id) else {
            debug!("Ignoring {:?} of stale document {}", kind, id);
            return Ok(SaveStep::Finished(SaveOutcome::Stale { id }));
        };

        match (kind, doc.path()) {
            (SaveKind::Save, Some(path)) => {
                let write = WriteRequest {
                    id,
                    path: path.to_path_buf(),
                    content: doc.content().to_string(),
                };
                debug!("Saving document {} to {}", id, write.path.display());
                self.pending.insert(
                    id,
                    PendingSave {
                        kind,
                        phase: Phase::Writing {
                            path: write.path.clone(),
                            content: write.content.clone(),
                        },
                    },
                );
                Ok(SaveStep::Write(write))
            }
            (_, path) => {
                let default_name = path
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| self.default_save_name.clone());
                debug!("Asking for a destination for document {}", id);
                self.pending.insert(
                    id,
                    PendingSave {
                        kind,
                        phase: Phase::Picking,
                    },
                );
                Ok(SaveStep::PickDestination { id, default_name })
            }
        }
    }

    /// Continue a save once the user picked (or cancelled) a destination.
    pub fn destination_chosen(
        &mut self,
        registry: &TabRegistry,
        id: DocumentId,
        path: Option<PathBuf>,
    ) -> SaveStep {
        let picking = matches!(
            self.pending.get(&id),
            Some(PendingSave {
                phase: Phase::Picking,
                ..
            })
        );
        if !picking {
            debug!("Unexpected destination for document {}", id);
            return SaveStep::Finished(SaveOutcome::Stale { id });
        }

        let Some(path) = path else {
            self.pending.remove(&id);
            info!("Save of document {} cancelled", id);
            return SaveStep::Finished(SaveOutcome::Cancelled { id });
        };

        let Some(doc) = registry.get(id) else {
            self.pending.remove(&id);
            return SaveStep::Finished(SaveOutcome::Stale { id });
        };

        let holder = registry
            .find_by_path(&path)
            .or_else(|| self.writing_to(&path))
            .filter(|&other| other != id);
        if let Some(other) = holder {
            self.pending.remove(&id);
            warn!(
                "Refusing to save document {} over {}: held by {}",
                id,
                path.display(),
                other
            );
            return SaveStep::Finished(SaveOutcome::Failed {
                id,
                error: Error::PathAlreadyOpen(path),
            });
        }

        let write = WriteRequest {
            id,
            path,
            content: doc.content().to_string(),
        };
        if let Some(pending) = self.pending.get_mut(&id) {
            pending.phase = Phase::Writing {
                path: write.path.clone(),
                content: write.content.clone(),
            };
        }
        debug!("Saving document {} to {}", id, write.path.display());
        SaveStep::Write(write)
    }

    /// Reconcile a finished write.
    ///
    /// On success the registry adopts the path and the written snapshot as
    /// the new baseline, and the path is recorded as recent. On failure
    /// nothing changes and the document stays dirty.
    pub fn write_finished(
        &mut self,
        registry: &mut TabRegistry,
        recent: &mut RecentFiles,
        id: DocumentId,
        result: io::Result<()>,
    ) -> SaveOutcome {
        let writing = matches!(
            self.pending.get(&id),
            Some(PendingSave {
                phase: Phase::Writing { .. },
                ..
            })
        );
        if !writing {
            debug!("Unexpected write result for document {}", id);
            return SaveOutcome::Stale { id };
        }

        let Some(PendingSave {
            kind,
            phase: Phase::Writing { path, content },
        }) = self.pending.remove(&id)
        else {
            return SaveOutcome::Stale { id };
        };

        // The path may have been claimed while the write was outstanding
        if let Some(other) = registry.find_by_path(&path).filter(|&other| other != id) {
            warn!(
                "Not adopting {} for document {}: open as {}",
                path.display(),
                id,
                other
            );
            return SaveOutcome::Failed {
                id,
                error: Error::PathAlreadyOpen(path),
            };
        }

        match result {
            Ok(()) => {
                registry.reconcile_saved(id, path.clone(), content);
                recent.record(path.clone());
                info!("{:?} of document {} to {} succeeded", kind, id, path.display());
                SaveOutcome::Saved { id, path }
            }
            Err(source) => {
                warn!("Failed to write {}: {}", path.display(), source);
                SaveOutcome::Failed {
                    id,
                    error: Error::FileWrite { path, source },
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (TabRegistry, SaveCoordinator, RecentFiles) {
        (
            TabRegistry::default(),
            SaveCoordinator::default(),
            RecentFiles::in_memory(),
        )
    }

    fn failure() -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }

    #[test]
    fn test_save_with_path_writes_directly() {
        let (mut registry, mut saves, mut recent) = setup();
        let id = registry.create(Some(PathBuf::from("/tmp/a.txt")), Some("a".to_string()));
        registry.edit(id, "a!".to_string());

        let step = saves.begin(&registry, id, SaveKind::Save).unwrap();
        let SaveStep::Write(write) = step else {
            panic!("expected a direct write, got {:?}", step);
        };
        assert_eq!(write.path, PathBuf::from("/tmp/a.txt"));
        assert_eq!(write.content, "a!");
        assert!(saves.is_pending(id));

        let outcome = saves.write_finished(&mut registry, &mut recent, id, Ok(()));
        assert!(outcome.is_saved());
        assert!(!registry.get(id).unwrap().is_dirty());
        assert!(!saves.is_pending(id));
        assert_eq!(recent.entries()[0].path, PathBuf::from("/tmp/a.txt"));
    }

    #[test]
    fn test_save_without_path_picks_destination() {
        let (mut registry, mut saves, mut recent) = setup();
        let id = registry.create(None, None);
        registry.edit(id, "hello".to_string());

        let step = saves.begin(&registry, id, SaveKind::Save).unwrap();
        assert!(matches!(
            &step,
            SaveStep::PickDestination { default_name, .. } if default_name == DEFAULT_SAVE_NAME
        ));
        assert!(matches!(
            step.request(),
            Some(GatewayRequest::SavePicker { .. })
        ));

        let step = saves.destination_chosen(&registry, id, Some(PathBuf::from("/tmp/a.txt")));
        assert!(matches!(step, SaveStep::Write(_)));

        let outcome = saves.write_finished(&mut registry, &mut recent, id, Ok(()));
        assert!(matches!(outcome, SaveOutcome::Saved { ref path, .. } if path == &PathBuf::from("/tmp/a.txt")));
        let doc = registry.get(id).unwrap();
        assert_eq!(doc.title(), "a.txt");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_save_as_always_picks_and_retargets() {
        let (mut registry, mut saves, mut recent) = setup();
        let id = registry.create(Some(PathBuf::from("/tmp/old.txt")), Some("x".to_string()));

        let step = saves.begin(&registry, id, SaveKind::SaveAs).unwrap();
        assert!(matches!(
            &step,
            SaveStep::PickDestination { default_name, .. } if default_name == "old.txt"
        ));
        saves.destination_chosen(&registry, id, Some(PathBuf::from("/tmp/new.txt")));
        saves.write_finished(&mut registry, &mut recent, id, Ok(()));

        // Plain saves now target the new destination
        let step = saves.begin(&registry, id, SaveKind::Save).unwrap();
        assert!(matches!(step, SaveStep::Write(w) if w.path == PathBuf::from("/tmp/new.txt")));
    }

    #[test]
    fn test_second_save_while_pending_is_rejected() {
        let (mut registry, mut saves, _recent) = setup();
        let id = registry.create(Some(PathBuf::from("/tmp/a.txt")), None);
        saves.begin(&registry, id, SaveKind::Save).unwrap();

        let err = saves.begin(&registry, id, SaveKind::Save).unwrap_err();
        assert!(matches!(err, Error::SaveInFlight(i) if i == id));
        let err = saves.begin(&registry, id, SaveKind::SaveAs).unwrap_err();
        assert!(matches!(err, Error::SaveInFlight(_)));
        assert_eq!(saves.pending_count(), 1);
    }

    #[test]
    fn test_saves_of_different_documents_may_overlap() {
        let (mut registry, mut saves, _recent) = setup();
        let a = registry.create(Some(PathBuf::from("/tmp/a.txt")), None);
        let b = registry.create(Some(PathBuf::from("/tmp/b.txt")), None);
        assert!(saves.begin(&registry, a, SaveKind::Save).is_ok());
        assert!(saves.begin(&registry, b, SaveKind::Save).is_ok());
        assert_eq!(saves.pending_count(), 2);
    }

    #[test]
    fn test_write_failure_leaves_document_dirty() {
        let (mut registry, mut saves, mut recent) = setup();
        let id = registry.create(Some(PathBuf::from("/tmp/a.txt")), Some("a".to_string()));
        registry.edit(id, "changed".to_string());
        saves.begin(&registry, id, SaveKind::Save).unwrap();

        let outcome = saves.write_finished(&mut registry, &mut recent, id, failure());
        assert!(matches!(outcome, SaveOutcome::Failed { error: Error::FileWrite { .. }, .. }));
        let doc = registry.get(id).unwrap();
        assert!(doc.is_dirty());
        assert_eq!(doc.content(), "changed");
        assert_eq!(doc.saved_content(), "a");
        assert!(recent.entries().is_empty());

        // Retryable
        assert!(saves.begin(&registry, id, SaveKind::Save).is_ok());
    }

    #[test]
    fn test_edit_during_write_keeps_document_dirty() {
        let (mut registry, mut saves, mut recent) = setup();
        let id = registry.create(Some(PathBuf::from("/tmp/a.txt")), None);
        registry.edit(id, "v1".to_string());
        saves.begin(&registry, id, SaveKind::Save).unwrap();
        registry.edit(id, "v2".to_string());

        saves.write_finished(&mut registry, &mut recent, id, Ok(()));
        let doc = registry.get(id).unwrap();
        assert_eq!(doc.saved_content(), "v1");
        assert!(doc.is_dirty());
    }

    #[test]
    fn test_cancelled_picker_clears_pending() {
        let (mut registry, mut saves, _recent) = setup();
        let id = registry.create(None, None);
        saves.begin(&registry, id, SaveKind::Save).unwrap();

        let step = saves.destination_chosen(&registry, id, None);
        assert!(matches!(step, SaveStep::Finished(SaveOutcome::Cancelled { .. })));
        assert!(!saves.is_pending(id));
        assert!(registry.get(id).unwrap().path().is_none());
    }

    #[test]
    fn test_destination_open_elsewhere_is_refused() {
        let (mut registry, mut saves, _recent) = setup();
        registry.create(Some(PathBuf::from("/tmp/taken.txt")), None);
        let id = registry.create(None, None);
        saves.begin(&registry, id, SaveKind::Save).unwrap();

        let step = saves.destination_chosen(&registry, id, Some(PathBuf::from("/tmp/taken.txt")));
        assert!(matches!(
            step,
            SaveStep::Finished(SaveOutcome::Failed {
                error: Error::PathAlreadyOpen(_),
                ..
            })
        ));
        assert!(!saves.is_pending(id));
    }

    #[test]
    fn test_destination_being_written_is_refused() {
        let (mut registry, mut saves, _recent) = setup();
        let a = registry.create(None, None);
        let b = registry.create(None, None);
        saves.begin(&registry, a, SaveKind::Save).unwrap();
        saves.begin(&registry, b, SaveKind::Save).unwrap();

        let target = PathBuf::from("/tmp/x.txt");
        let step = saves.destination_chosen(&registry, a, Some(target.clone()));
        assert!(matches!(step, SaveStep::Write(_)));
        assert_eq!(saves.writing_to(&target), Some(a));

        let step = saves.destination_chosen(&registry, b, Some(target.clone()));
        assert!(matches!(
            step,
            SaveStep::Finished(SaveOutcome::Failed {
                id,
                error: Error::PathAlreadyOpen(_),
            }) if id == b
        ));
        assert!(!saves.is_pending(b));
        assert_eq!(saves.writing_to(&target), Some(a));
    }

    #[test]
    fn test_write_to_path_claimed_meanwhile_is_not_adopted() {
        let (mut registry, mut saves, mut recent) = setup();
        let id = registry.create(None, None);
        registry.edit(id, "mine".to_string());
        saves.begin(&registry, id, SaveKind::Save).unwrap();
        saves.destination_chosen(&registry, id, Some(PathBuf::from("/tmp/x.txt")));

        let other = registry.create(Some(PathBuf::from("/tmp/x.txt")), Some("theirs".to_string()));
        let outcome = saves.write_finished(&mut registry, &mut recent, id, Ok(()));

        assert!(matches!(
            outcome,
            SaveOutcome::Failed {
                error: Error::PathAlreadyOpen(_),
                ..
            }
        ));
        assert!(!saves.is_pending(id));
        assert_eq!(registry.find_by_path(Path::new("/tmp/x.txt")), Some(other));
        let doc = registry.get(id).unwrap();
        assert!(doc.path().is_none());
        assert!(doc.is_dirty());
        assert!(recent.entries().is_empty());
    }

    #[test]
    fn test_stale_document_is_a_noop() {
        let (mut registry, mut saves, mut recent) = setup();
        let id = registry.create(None, None);
        registry.remove(id);

        let step = saves.begin(&registry, id, SaveKind::Save).unwrap();
        assert!(matches!(step, SaveStep::Finished(SaveOutcome::Stale { .. })));
        assert!(!saves.is_pending(id));

        let outcome = saves.write_finished(&mut registry, &mut recent, id, Ok(()));
        assert!(matches!(outcome, SaveOutcome::Stale { .. }));
    }
}
