//! Whole-session close protocol.
//!
//! Save-all walks the dirty documents one at a time in registry order. The
//! next save starts only after the previous one succeeds; a failure or a
//! cancelled picker halts the walk and asks the user again.

use crate::document::DocumentId;
use crate::error::{Error, Result};
use crate::gateway::Decision;
use crate::registry::TabRegistry;
use log::{debug, info, warn};
use std::collections::VecDeque;

/// States of the session close protocol.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionCloseState {
    #[default]
    Idle,
    /// Transient: checking the registry for unsaved work
    Evaluating,
    /// Waiting for Save all / Quit without saving / Cancel
    AwaitingGlobalDecision,
    /// Saving dirty documents one after another
    SavingSequentially {
        current: DocumentId,
        remaining: VecDeque<DocumentId>,
    },
    /// Safe to terminate the process
    Terminated,
}

/// What the owner must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCloseStep {
    /// Termination is safe
    Terminated,
    /// Ask the user about `dirty_count` unsaved documents
    AwaitingDecision { dirty_count: usize },
    /// Save this document and report back with `save_finished`
    StartSave(DocumentId),
    /// Termination aborted; nothing was discarded
    Cancelled,
    /// Nothing to do in the current state
    Ignored,
}

/// Session close state machine.
#[derive(Debug, Default)]
pub struct SessionClose {
    state: SessionCloseState,
}

impl SessionClose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionCloseState {
        &self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionCloseState::Terminated
    }

    /// Whether a decision or a save-all is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            SessionCloseState::AwaitingGlobalDecision | SessionCloseState::SavingSequentially { .. }
        )
    }

    pub fn is_awaiting_decision(&self) -> bool {
        self.state == SessionCloseState::AwaitingGlobalDecision
    }

    /// Document currently being saved by save-all.
    pub fn current_save(&self) -> Option<DocumentId> {
        match &self.state {
            SessionCloseState::SavingSequentially { current, .. } => Some(*current),
            _ => None,
        }
    }

    /// Request session termination.
    ///
    /// Terminates at once when nothing is dirty, otherwise waits for a
    /// global decision. Requesting again after termination is a no-op that
    /// reports `Terminated`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CloseInProgress` while a decision or save-all is
    /// outstanding.
    pub fn request(&mut self, registry: &TabRegistry) -> Result<SessionCloseStep> {
        match self.state {
            SessionCloseState::Terminated => return Ok(SessionCloseStep::Terminated),
            _ if self.is_busy() => return Err(Error::CloseInProgress),
            _ => {}
        }

        self.state = SessionCloseState::Evaluating;
        let dirty_count = registry.dirty_ids().len();

        if dirty_count == 0 {
            info!("No unsaved changes, session may terminate");
            self.state = SessionCloseState::Terminated;
            return Ok(SessionCloseStep::Terminated);
        }

        debug!("{} document(s) with unsaved changes", dirty_count);
        self.state = SessionCloseState::AwaitingGlobalDecision;
        Ok(SessionCloseStep::AwaitingDecision { dirty_count })
    }

    /// Apply the user's global decision.
    ///
    /// `Discard` terminates without touching the documents. Reverting the
    /// abandoned edits is left to the owner, which knows which documents
    /// still have a write outstanding.
    pub fn decide(&mut self, registry: &TabRegistry, decision: Decision) -> SessionCloseStep {
        if self.state != SessionCloseState::AwaitingGlobalDecision {
            debug!("Ignoring {:?}: no session close awaiting a decision", decision);
            return SessionCloseStep::Ignored;
        }

        match decision {
            Decision::Save => {
                let queue: VecDeque<DocumentId> = registry.dirty_ids().into_iter().collect();
                info!("Saving {} document(s) before quitting", queue.len());
                self.advance(registry, queue)
            }
            Decision::Discard => {
                info!("Quitting without saving");
                self.state = SessionCloseState::Terminated;
                SessionCloseStep::Terminated
            }
            Decision::Cancel => {
                debug!("Quit cancelled");
                self.state = SessionCloseState::Idle;
                SessionCloseStep::Cancelled
            }
        }
    }

    /// Report the outcome of the save started for `id`.
    ///
    /// On success the next dirty document is started, or the session
    /// terminates when none remain. On failure the walk halts and the user
    /// is asked again with the documents still dirty.
    pub fn save_finished(
        &mut self,
        registry: &TabRegistry,
        id: DocumentId,
        saved: bool,
    ) -> SessionCloseStep {
        let remaining = match &mut self.state {
            SessionCloseState::SavingSequentially { current, remaining } if *current == id => {
                std::mem::take(remaining)
            }
            _ => return SessionCloseStep::Ignored,
        };

        let still_dirty = registry.get(id).is_some_and(|doc| doc.is_dirty());
        if !saved || still_dirty {
            let dirty_count = registry.dirty_ids().len();
            warn!("Save-all halted at document {}", id);
            if dirty_count == 0 {
                self.state = SessionCloseState::Terminated;
                return SessionCloseStep::Terminated;
            }
            self.state = SessionCloseState::AwaitingGlobalDecision;
            return SessionCloseStep::AwaitingDecision { dirty_count };
        }

        self.advance(registry, remaining)
    }

    /// Start the next document in `queue` that still needs saving.
    fn advance(&mut self, registry: &TabRegistry, mut queue: VecDeque<DocumentId>) -> SessionCloseStep {
        while let Some(next) = queue.pop_front() {
            // Documents may have been closed or saved since the queue was built
            if registry.get(next).is_some_and(|doc| doc.is_dirty()) {
                self.state = SessionCloseState::SavingSequentially {
                    current: next,
                    remaining: queue,
                };
                return SessionCloseStep::StartSave(next);
            }
        }

        info!("All documents saved, session may terminate");
        self.state = SessionCloseState::Terminated;
        SessionCloseStep::Terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn registry_with(dirty: usize, clean: usize) -> (TabRegistry, Vec<DocumentId>) {
        let mut registry = TabRegistry::default();
        let mut dirty_ids = Vec::new();
        for i in 0..dirty {
            let id = registry.create(None, None);
            registry.edit(id, format!("draft {}", i));
            dirty_ids.push(id);
        }
        for _ in 0..clean {
            registry.create(None, None);
        }
        (registry, dirty_ids)
    }

    fn mark_saved(registry: &mut TabRegistry, id: DocumentId) {
        let content = registry.get(id).unwrap().content().to_string();
        registry.reconcile_saved(id, PathBuf::from(format!("/tmp/{}.txt", id.get())), content);
    }

    #[test]
    fn test_clean_session_terminates_immediately() {
        let (registry, _) = registry_with(0, 2);
        let mut close = SessionClose::new();
        assert_eq!(close.request(&registry).unwrap(), SessionCloseStep::Terminated);
        assert!(close.is_terminated());
    }

    #[test]
    fn test_dirty_session_awaits_decision() {
        let (registry, _) = registry_with(2, 1);
        let mut close = SessionClose::new();
        assert_eq!(
            close.request(&registry).unwrap(),
            SessionCloseStep::AwaitingDecision { dirty_count: 2 }
        );
        assert!(close.is_awaiting_decision());
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let (registry, ids) = registry_with(1, 0);
        let mut close = SessionClose::new();
        close.request(&registry).unwrap();

        assert_eq!(close.decide(&registry, Decision::Cancel), SessionCloseStep::Cancelled);
        assert_eq!(close.state(), &SessionCloseState::Idle);
        assert!(registry.get(ids[0]).unwrap().is_dirty());
    }

    #[test]
    fn test_discard_terminates_and_leaves_documents() {
        let (registry, ids) = registry_with(2, 0);
        let mut close = SessionClose::new();
        close.request(&registry).unwrap();

        assert_eq!(close.decide(&registry, Decision::Discard), SessionCloseStep::Terminated);
        assert!(close.is_terminated());
        assert!(ids.iter().all(|id| registry.get(*id).unwrap().is_dirty()));
    }

    #[test]
    fn test_save_all_runs_strictly_in_order() {
        let (mut registry, ids) = registry_with(3, 1);
        let mut close = SessionClose::new();
        close.request(&registry).unwrap();

        assert_eq!(
            close.decide(&registry, Decision::Save),
            SessionCloseStep::StartSave(ids[0])
        );
        // Outcomes for documents other than the current one are ignored
        assert_eq!(close.save_finished(&registry, ids[1], true), SessionCloseStep::Ignored);

        mark_saved(&mut registry, ids[0]);
        assert_eq!(
            close.save_finished(&registry, ids[0], true),
            SessionCloseStep::StartSave(ids[1])
        );
        mark_saved(&mut registry, ids[1]);
        assert_eq!(
            close.save_finished(&registry, ids[1], true),
            SessionCloseStep::StartSave(ids[2])
        );
        mark_saved(&mut registry, ids[2]);
        assert_eq!(close.save_finished(&registry, ids[2], true), SessionCloseStep::Terminated);
        assert!(close.is_terminated());
    }

    #[test]
    fn test_failure_halts_and_asks_again() {
        let (mut registry, ids) = registry_with(3, 0);
        let mut close = SessionClose::new();
        close.request(&registry).unwrap();
        close.decide(&registry, Decision::Save);

        mark_saved(&mut registry, ids[0]);
        close.save_finished(&registry, ids[0], true);
        assert_eq!(
            close.save_finished(&registry, ids[1], false),
            SessionCloseStep::AwaitingDecision { dirty_count: 2 }
        );
        assert!(close.is_awaiting_decision());

        // Retrying picks up with the documents still dirty
        assert_eq!(
            close.decide(&registry, Decision::Save),
            SessionCloseStep::StartSave(ids[1])
        );
    }

    #[test]
    fn test_skips_documents_no_longer_dirty() {
        let (mut registry, ids) = registry_with(3, 0);
        let mut close = SessionClose::new();
        close.request(&registry).unwrap();
        close.decide(&registry, Decision::Save);

        registry.remove(ids[1]);
        registry.revert(ids[2]);
        mark_saved(&mut registry, ids[0]);
        assert_eq!(close.save_finished(&registry, ids[0], true), SessionCloseStep::Terminated);
    }

    #[test]
    fn test_request_while_busy_and_after_termination() {
        let (registry, _) = registry_with(1, 0);
        let mut close = SessionClose::new();
        close.request(&registry).unwrap();
        assert!(matches!(close.request(&registry), Err(Error::CloseInProgress)));

        close.decide(&registry, Decision::Discard);
        assert_eq!(close.request(&registry).unwrap(), SessionCloseStep::Terminated);
        assert_eq!(close.decide(&registry, Decision::Save), SessionCloseStep::Ignored);
    }
}
