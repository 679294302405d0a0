//! The editing session core for tabshell
//!
//! `Workbench` owns the tab registry, the save coordinator, both close
//! protocols and the two persisted stores. It is the single entry point
//! for user intents coming from the Presentation Surface.
//!
//! All storage work goes through a request queue: intents push
//! `GatewayRequest`s, the host performs them (usually via `run_requests`)
//! and feeds each `GatewayReply` back through `handle_reply`. Everything
//! the surface should render is reported as `CoreEvent`s, in order.

use crate::close::{SessionClose, SessionCloseStep, TabClose, TabCloseStep};
use crate::config::Settings;
use crate::document::DocumentId;
use crate::error::{Error, Result};
use crate::events::CoreEvent;
use crate::gateway::{dispatch, Decision, DecisionScope, GatewayReply, GatewayRequest, StorageGateway};
use crate::registry::TabRegistry;
use crate::save::{SaveCoordinator, SaveKind, SaveOutcome, SaveStep};
use crate::store::{RecentEntry, RecentFiles, SessionSnapshot, SessionStore};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// The multi-document editing session.
#[derive(Debug)]
pub struct Workbench {
    settings: Settings,
    registry: TabRegistry,
    saves: SaveCoordinator,
    tab_close: TabClose,
    session_close: SessionClose,
    recent: RecentFiles,
    session: Option<SessionStore>,
    requests: VecDeque<GatewayRequest>,
    events: Vec<CoreEvent>,
    /// Last snapshot written, to skip identical writes
    last_persisted: Option<SessionSnapshot>,
}

impl Workbench {
    /// Build a workbench. Without a `SessionStore` nothing is restored or
    /// persisted between runs.
    pub fn new(settings: Settings, session: Option<SessionStore>, recent: RecentFiles) -> Self {
        let recent = recent.with_limit(settings.max_recent_files);
        Self {
            registry: TabRegistry::new(settings.untitled_prefix.clone()),
            saves: SaveCoordinator::new(settings.default_save_name.clone()),
            tab_close: TabClose::new(),
            session_close: SessionClose::new(),
            recent,
            session,
            requests: VecDeque::new(),
            events: Vec::new(),
            last_persisted: None,
            settings,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    /// Whether the session close protocol reached `Terminated`.
    pub fn is_terminated(&self) -> bool {
        self.session_close.is_terminated()
    }

    /// Whether a save or save-as is in flight for `id`.
    pub fn is_saving(&self, id: DocumentId) -> bool {
        self.saves.is_pending(id)
    }

    /// Recent files, most recent first. Entries whose file vanished are
    /// pruned here.
    pub fn recent_files(&mut self) -> Vec<RecentEntry> {
        self.recent.list()
    }

    /// Remove a path from the recent list.
    pub fn forget_recent(&mut self, path: &Path) -> bool {
        self.recent.forget(path)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Restore the previous session (when enabled) and make sure at least
    /// one document is open.
    pub fn start(&mut self) {
        if self.settings.restore_session {
            if let Some(store) = &self.session {
                let snapshot = store.load();
                self.registry.restore(&snapshot);
            }
        }

        if self.registry.is_empty() {
            self.registry.create(None, None);
        }

        info!("Session started with {} document(s)", self.registry.len());
        self.persist_session();
    }

    /// Write the final session snapshot.
    pub fn shutdown(&mut self) {
        self.persist_session();
        info!("Session shut down");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User Intents
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an empty untitled document and activate it.
    pub fn new_document(&mut self) -> DocumentId {
        let id = self.registry.create(None, None);
        self.persist_session();
        id
    }

    /// Ask the user for a file to open.
    pub fn open(&mut self) {
        self.requests.push_back(GatewayRequest::OpenPicker);
    }

    /// Open `path`, or activate the tab already showing it.
    ///
    /// A path that a pending save is writing to belongs to the saving
    /// document, which is activated instead.
    pub fn open_path(&mut self, path: PathBuf) {
        if let Some(writer) = self.saves.writing_to(&path) {
            debug!("{} is being written by document {}", path.display(), writer);
            self.activate(writer);
            return;
        }
        if let Some(existing) = self.registry.find_by_path(&path) {
            self.registry.activate(existing);
            self.recent.record(path);
            self.persist_session();
            return;
        }
        self.requests.push_back(GatewayRequest::ReadFile { path });
    }

    pub fn activate(&mut self, id: DocumentId) -> bool {
        let changed = self.registry.activate(id);
        if changed {
            self.persist_session();
        }
        changed
    }

    /// Replace the content of `id` with what the editor now shows.
    pub fn edit(&mut self, id: DocumentId, content: String) -> bool {
        let changed = self.registry.edit(id, content);
        if changed {
            self.persist_session();
        }
        changed
    }

    /// Save `id` to its path, asking for one if it has none.
    ///
    /// # Errors
    ///
    /// Returns `Error::SaveInFlight` if a save for `id` is already pending.
    pub fn save(&mut self, id: DocumentId) -> Result<()> {
        self.start_save(id, SaveKind::Save)
    }

    /// Save `id` to a newly picked path.
    ///
    /// # Errors
    ///
    /// Returns `Error::SaveInFlight` if a save for `id` is already pending.
    pub fn save_as(&mut self, id: DocumentId) -> Result<()> {
        self.start_save(id, SaveKind::SaveAs)
    }

    /// Close one tab, asking first if it has unsaved changes.
    ///
    /// # Errors
    ///
    /// Returns `Error::CloseInProgress` while another close is waiting for
    /// a decision or a save.
    pub fn close_tab(&mut self, id: DocumentId) -> Result<()> {
        if self.session_close.is_busy() {
            return Err(Error::CloseInProgress);
        }
        let step = self.tab_close.request(&mut self.registry, id)?;
        self.follow_tab_close(step);
        Ok(())
    }

    /// Ask to end the session, asking first if anything is unsaved.
    ///
    /// # Errors
    ///
    /// Returns `Error::CloseInProgress` while another close is waiting for
    /// a decision or a save.
    pub fn request_quit(&mut self) -> Result<()> {
        if self.tab_close.is_busy() {
            return Err(Error::CloseInProgress);
        }
        let step = self.session_close.request(&self.registry)?;
        self.follow_session_close(step);
        Ok(())
    }

    /// Answer the pending confirmation dialog.
    pub fn decide(&mut self, decision: Decision) {
        if self.tab_close.is_busy() {
            let step = self.tab_close.decide(&mut self.registry, decision);
            self.follow_tab_close(step);
        } else if self.session_close.is_awaiting_decision() {
            if decision == Decision::Discard {
                self.discard_unsaved();
            }
            let step = self.session_close.decide(&self.registry, decision);
            self.follow_session_close(step);
        } else {
            debug!("Ignoring {:?}: no dialog pending", decision);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gateway Plumbing
    // ─────────────────────────────────────────────────────────────────────────

    /// Next storage request for the host to perform.
    pub fn next_request(&mut self) -> Option<GatewayRequest> {
        self.requests.pop_front()
    }

    /// Whether any storage request is waiting.
    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    /// Perform every queued request on `gateway` until the queue is empty.
    pub fn run_requests<G: StorageGateway + ?Sized>(&mut self, gateway: &mut G) {
        while let Some(request) = self.next_request() {
            let reply = dispatch(gateway, request);
            self.handle_reply(reply);
        }
    }

    /// Feed the outcome of a storage request back into the core.
    pub fn handle_reply(&mut self, reply: GatewayReply) {
        match reply {
            GatewayReply::OpenPicked(Some(path)) => self.open_path(path),
            GatewayReply::OpenPicked(None) => debug!("Open cancelled"),
            GatewayReply::FileRead { path, result } => self.file_read(path, result),
            GatewayReply::SavePicked { id, path } => {
                let step = self.saves.destination_chosen(&self.registry, id, path);
                self.follow_save(step);
            }
            GatewayReply::FileWritten { id, result } => {
                let outcome =
                    self.saves
                        .write_finished(&mut self.registry, &mut self.recent, id, result);
                self.settle_save(outcome);
            }
            GatewayReply::Decided(decision) => self.decide(decision),
        }
    }

    /// Take pending events (clears the list).
    pub fn take_events(&mut self) -> Vec<CoreEvent> {
        self.flush_registry_events();
        std::mem::take(&mut self.events)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn file_read(&mut self, path: PathBuf, result: std::io::Result<String>) {
        match result {
            Ok(_) if self.saves.writing_to(&path).is_some() => {
                // Read raced a save-as to the same path; the writer owns it
                debug!("Dropping read of {}: a save is writing it", path.display());
                self.open_path(path);
            }
            Ok(content) => {
                info!("Opened {}", path.display());
                self.registry.create(Some(path.clone()), Some(content));
                self.recent.record(path);
                self.persist_session();
            }
            Err(source) => {
                let error = Error::FileRead {
                    path: path.clone(),
                    source,
                };
                warn!("{}", error);
                if error.is_not_found() && self.recent.forget(&path) {
                    info!("Forgot missing recent file {}", path.display());
                }
                self.emit(CoreEvent::OpenFailed {
                    path,
                    message: error.to_string(),
                });
            }
        }
    }

    /// Revert dirty documents so the final snapshot drops abandoned edits.
    /// Documents with a write outstanding are left for its outcome.
    fn discard_unsaved(&mut self) {
        for id in self.registry.dirty_ids() {
            if self.saves.is_pending(id) {
                debug!("Keeping document {}: save in flight", id);
                continue;
            }
            self.registry.revert(id);
        }
    }

    fn start_save(&mut self, id: DocumentId, kind: SaveKind) -> Result<()> {
        let step = self.saves.begin(&self.registry, id, kind)?;
        self.follow_save(step);
        Ok(())
    }

    /// Save on behalf of a close protocol. An already pending save is
    /// awaited instead; its outcome reaches the protocol all the same.
    fn start_close_save(&mut self, id: DocumentId) {
        match self.start_save(id, SaveKind::Save) {
            Ok(()) => {}
            Err(Error::SaveInFlight(_)) => debug!("Waiting for pending save of document {}", id),
            Err(e) => warn!("Could not start save of document {}: {}", id, e),
        }
    }

    fn follow_save(&mut self, step: SaveStep) {
        match step {
            SaveStep::Finished(outcome) => self.settle_save(outcome),
            step => {
                if let Some(request) = step.request() {
                    self.requests.push_back(request);
                }
            }
        }
    }

    fn settle_save(&mut self, outcome: SaveOutcome) {
        let id = outcome.id();
        let saved = outcome.is_saved();

        match outcome {
            SaveOutcome::Saved { id, path } => {
                self.emit(CoreEvent::Saved { id, path });
                self.persist_session();
            }
            SaveOutcome::Cancelled { id } => self.emit(CoreEvent::SaveCancelled { id }),
            SaveOutcome::Failed { id, error } => self.emit(CoreEvent::SaveFailed {
                id,
                message: error.to_string(),
            }),
            SaveOutcome::Stale { .. } => {}
        }

        let step = self.tab_close.save_finished(&mut self.registry, id, saved);
        self.follow_tab_close(step);
        let step = self.session_close.save_finished(&self.registry, id, saved);
        self.follow_session_close(step);
    }

    fn follow_tab_close(&mut self, step: TabCloseStep) {
        match step {
            TabCloseStep::Removed(_) => self.persist_session(),
            TabCloseStep::AwaitingDecision(id) => {
                let title = self
                    .registry
                    .get(id)
                    .map(|doc| doc.title())
                    .unwrap_or_default();
                self.ask(DecisionScope::Tab { id, title });
            }
            TabCloseStep::StartSave(id) => self.start_close_save(id),
            TabCloseStep::Cancelled(_) | TabCloseStep::Ignored => {}
        }
    }

    fn follow_session_close(&mut self, step: SessionCloseStep) {
        match step {
            SessionCloseStep::Terminated => {
                self.persist_session();
                self.emit(CoreEvent::SafeToTerminate);
            }
            SessionCloseStep::AwaitingDecision { dirty_count } => {
                self.ask(DecisionScope::Session { dirty_count });
            }
            SessionCloseStep::StartSave(id) => self.start_close_save(id),
            SessionCloseStep::Cancelled | SessionCloseStep::Ignored => {}
        }
    }

    fn ask(&mut self, scope: DecisionScope) {
        self.emit(CoreEvent::DecisionRequested(scope.clone()));
        self.requests.push_back(GatewayRequest::Confirm(scope));
    }

    /// Queue an event after any registry events raised before it.
    fn emit(&mut self, event: CoreEvent) {
        self.flush_registry_events();
        self.events.push(event);
    }

    fn flush_registry_events(&mut self) {
        let raised = self.registry.take_events();
        self.events.extend(raised);
    }

    /// Write-through of the registry to the session store.
    fn persist_session(&mut self) {
        let Some(store) = &self.session else {
            return;
        };
        let snapshot = self.registry.snapshot();
        if self.last_persisted.as_ref() == Some(&snapshot) {
            return;
        }
        match store.save(&snapshot) {
            Ok(()) => self.last_persisted = Some(snapshot),
            Err(e) => warn!("Failed to persist session: {}", e),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
