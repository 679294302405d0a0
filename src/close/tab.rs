//! Single-tab close protocol.

use crate::document::DocumentId;
use crate::error::{Error, Result};
use crate::gateway::Decision;
use crate::registry::TabRegistry;
use log::{debug, info};

/// States of the single-tab close protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabCloseState {
    /// No close in progress (also the outcome of Cancel)
    #[default]
    Idle,
    /// Dirty tab; waiting for Save / Discard / Cancel
    AwaitingDecision(DocumentId),
    /// Save chosen; waiting for the save outcome
    Saving(DocumentId),
    /// Tab removed from the registry
    Removed(DocumentId),
}

/// What the owner must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabCloseStep {
    /// The tab was removed
    Removed(DocumentId),
    /// Ask the user to decide
    AwaitingDecision(DocumentId),
    /// Run a save for this document and report back with `save_finished`
    StartSave(DocumentId),
    /// Close aborted; the tab is untouched
    Cancelled(DocumentId),
    /// Nothing to do (stale id or no matching state)
    Ignored,
}

/// Single-tab close state machine.
#[derive(Debug, Default)]
pub struct TabClose {
    state: TabCloseState,
}

impl TabClose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TabCloseState {
        self.state
    }

    /// Whether a decision or a save is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            TabCloseState::AwaitingDecision(_) | TabCloseState::Saving(_)
        )
    }

    /// Document whose close is outstanding.
    pub fn target(&self) -> Option<DocumentId> {
        match self.state {
            TabCloseState::AwaitingDecision(id) | TabCloseState::Saving(id) => Some(id),
            _ => None,
        }
    }

    /// Request closing `id`.
    ///
    /// A clean tab is removed at once. A dirty one moves to
    /// `AwaitingDecision`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CloseInProgress` while another close is outstanding.
    pub fn request(&mut self, registry: &mut TabRegistry, id: DocumentId) -> Result<TabCloseStep> {
        if self.is_busy() {
            return Err(Error::CloseInProgress);
        }

        let Some(doc) = registry.get(id) else {
            debug!("Ignoring close of stale document {}", id);
            return Ok(TabCloseStep::Ignored);
        };

        if doc.is_dirty() {
            debug!("Document {} is dirty, awaiting decision", id);
            self.state = TabCloseState::AwaitingDecision(id);
            return Ok(TabCloseStep::AwaitingDecision(id));
        }

        Ok(self.remove(registry, id))
    }

    /// Apply the user's decision.
    pub fn decide(&mut self, registry: &mut TabRegistry, decision: Decision) -> TabCloseStep {
        let TabCloseState::AwaitingDecision(id) = self.state else {
            debug!("Ignoring {:?}: no tab close awaiting a decision", decision);
            return TabCloseStep::Ignored;
        };

        if !registry.contains(id) {
            self.state = TabCloseState::Idle;
            return TabCloseStep::Ignored;
        }

        match decision {
            Decision::Save => {
                self.state = TabCloseState::Saving(id);
                TabCloseStep::StartSave(id)
            }
            Decision::Discard => {
                info!("Discarding changes to document {}", id);
                self.remove(registry, id)
            }
            Decision::Cancel => {
                debug!("Close of document {} cancelled", id);
                self.state = TabCloseState::Idle;
                TabCloseStep::Cancelled(id)
            }
        }
    }

    /// Report the outcome of the save started for `id`.
    ///
    /// Success removes the tab. Failure or cancellation returns to
    /// `AwaitingDecision`. A tab edited while its save was in flight is
    /// still dirty after the save, so it also goes back to `AwaitingDecision`.
    pub fn save_finished(
        &mut self,
        registry: &mut TabRegistry,
        id: DocumentId,
        saved: bool,
    ) -> TabCloseStep {
        if self.state != TabCloseState::Saving(id) {
            return TabCloseStep::Ignored;
        }

        let Some(doc) = registry.get(id) else {
            self.state = TabCloseState::Idle;
            return TabCloseStep::Ignored;
        };

        if saved && !doc.is_dirty() {
            return self.remove(registry, id);
        }

        debug!("Save for closing document {} did not complete", id);
        self.state = TabCloseState::AwaitingDecision(id);
        TabCloseStep::AwaitingDecision(id)
    }

    fn remove(&mut self, registry: &mut TabRegistry, id: DocumentId) -> TabCloseStep {
        registry.remove(id);
        self.state = TabCloseState::Removed(id);
        TabCloseStep::Removed(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dirty_tab() -> (TabRegistry, DocumentId) {
        let mut registry = TabRegistry::default();
        let id = registry.create(None, None);
        registry.edit(id, "unsaved".to_string());
        (registry, id)
    }

    #[test]
    fn test_clean_tab_removed_without_decision() {
        let mut registry = TabRegistry::default();
        let id = registry.create(None, None);
        let mut close = TabClose::new();

        assert_eq!(close.request(&mut registry, id).unwrap(), TabCloseStep::Removed(id));
        assert!(registry.is_empty());
        assert_eq!(close.state(), TabCloseState::Removed(id));
        assert!(!close.is_busy());
    }

    #[test]
    fn test_dirty_tab_awaits_decision() {
        let (mut registry, id) = dirty_tab();
        let mut close = TabClose::new();

        assert_eq!(
            close.request(&mut registry, id).unwrap(),
            TabCloseStep::AwaitingDecision(id)
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(close.target(), Some(id));
    }

    #[test]
    fn test_discard_removes() {
        let (mut registry, id) = dirty_tab();
        let mut close = TabClose::new();
        close.request(&mut registry, id).unwrap();

        assert_eq!(close.decide(&mut registry, Decision::Discard), TabCloseStep::Removed(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cancel_leaves_registry_untouched() {
        let (mut registry, id) = dirty_tab();
        let mut close = TabClose::new();
        close.request(&mut registry, id).unwrap();

        assert_eq!(close.decide(&mut registry, Decision::Cancel), TabCloseStep::Cancelled(id));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(id).unwrap().is_dirty());
        assert_eq!(close.state(), TabCloseState::Idle);
    }

    #[test]
    fn test_save_success_removes() {
        let (mut registry, id) = dirty_tab();
        let mut close = TabClose::new();
        close.request(&mut registry, id).unwrap();
        assert_eq!(close.decide(&mut registry, Decision::Save), TabCloseStep::StartSave(id));
        assert_eq!(registry.len(), 1);

        registry.reconcile_saved(id, PathBuf::from("/tmp/a.txt"), "unsaved".to_string());
        assert_eq!(close.save_finished(&mut registry, id, true), TabCloseStep::Removed(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_save_failure_returns_to_decision() {
        let (mut registry, id) = dirty_tab();
        let mut close = TabClose::new();
        close.request(&mut registry, id).unwrap();
        close.decide(&mut registry, Decision::Save);

        assert_eq!(
            close.save_finished(&mut registry, id, false),
            TabCloseStep::AwaitingDecision(id)
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(close.state(), TabCloseState::AwaitingDecision(id));
    }

    #[test]
    fn test_edit_during_save_keeps_tab() {
        let (mut registry, id) = dirty_tab();
        let mut close = TabClose::new();
        close.request(&mut registry, id).unwrap();
        close.decide(&mut registry, Decision::Save);

        registry.reconcile_saved(id, PathBuf::from("/tmp/a.txt"), "older".to_string());
        assert_eq!(
            close.save_finished(&mut registry, id, true),
            TabCloseStep::AwaitingDecision(id)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_second_request_while_busy_is_rejected() {
        let (mut registry, id) = dirty_tab();
        let other = registry.create(None, None);
        let mut close = TabClose::new();
        close.request(&mut registry, id).unwrap();

        assert!(matches!(
            close.request(&mut registry, other),
            Err(Error::CloseInProgress)
        ));
        close.decide(&mut registry, Decision::Save);
        // A save already issued cannot be cancelled
        assert_eq!(close.decide(&mut registry, Decision::Cancel), TabCloseStep::Ignored);
        assert!(matches!(
            close.request(&mut registry, other),
            Err(Error::CloseInProgress)
        ));
    }

    #[test]
    fn test_stale_and_unmatched_inputs_are_ignored() {
        let mut registry = TabRegistry::default();
        let id = registry.create(None, None);
        registry.remove(id);
        let mut close = TabClose::new();

        assert_eq!(close.request(&mut registry, id).unwrap(), TabCloseStep::Ignored);
        assert_eq!(close.decide(&mut registry, Decision::Save), TabCloseStep::Ignored);
        assert_eq!(close.save_finished(&mut registry, id, true), TabCloseStep::Ignored);
        assert_eq!(close.state(), TabCloseState::Idle);
    }
}
