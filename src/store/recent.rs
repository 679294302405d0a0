//! Recently opened files.
//!
//! A bounded list, unique by path, most recently opened first. Entries
//! whose path no longer resolves are pruned on the next `list()` rather
//! than eagerly.

use super::json::{read_record, write_record};
use crate::error::ResultExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Hard cap on the number of remembered files.
pub const MAX_RECENT_FILES: usize = 10;

const MINUTE_MILLIS: u64 = 60_000;

/// Current time as milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Recent Entry
// ─────────────────────────────────────────────────────────────────────────────

/// A remembered path and when it was last opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEntry {
    pub path: PathBuf,
    /// Milliseconds since the Unix epoch
    pub last_opened_at: u64,
}

impl RecentEntry {
    /// File name for display, falling back to the full path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Relative age such as "5 min ago", "1 hour ago" or "3 days ago".
    pub fn age_label(&self, now_millis: u64) -> String {
        let mins = now_millis.saturating_sub(self.last_opened_at) / MINUTE_MILLIS;
        if mins < 60 {
            return format!("{} min ago", mins);
        }
        let hours = mins / 60;
        if hours < 24 {
            return format!("{} hour{} ago", hours, plural(hours));
        }
        let days = hours / 24;
        format!("{} day{} ago", days, plural(days))
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recent Files Store
// ─────────────────────────────────────────────────────────────────────────────

/// The recent files list and its backing record.
///
/// Created with `in_memory()` the store never touches disk for its own
/// record; `list()` still checks that entries resolve.
#[derive(Debug, Clone)]
pub struct RecentFiles {
    backing: Option<PathBuf>,
    entries: Vec<RecentEntry>,
    limit: usize,
}

impl RecentFiles {
    /// A store with no backing record.
    pub fn in_memory() -> Self {
        Self {
            backing: None,
            entries: Vec::new(),
            limit: MAX_RECENT_FILES,
        }
    }

    /// Load the store from `path`.
    ///
    /// A missing or unreadable record yields an empty list; the error is
    /// logged and never returned.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries: Vec<RecentEntry> = read_record(&path)
            .map(Option::unwrap_or_default)
            .unwrap_or_warn_default(Vec::new(), "Failed to load recent files");

        let mut store = Self {
            backing: Some(path),
            entries,
            limit: MAX_RECENT_FILES,
        };
        store.sanitize();
        debug!("Loaded {} recent file(s)", store.entries.len());
        store
    }

    /// Lower the cap below `MAX_RECENT_FILES` (clamped to `1..=MAX_RECENT_FILES`).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_RECENT_FILES);
        self.entries.truncate(self.limit);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Raw entries without the resolvability filter.
    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    /// Record that `path` was just opened or saved.
    pub fn record(&mut self, path: PathBuf) {
        self.record_at(path, now_millis());
    }

    /// Record `path` with an explicit timestamp.
    ///
    /// Moves an existing entry to the front instead of duplicating it.
    pub fn record_at(&mut self, path: PathBuf, at_millis: u64) {
        self.entries.retain(|e| e.path != path);
        debug!("Recording recent file: {}", path.display());
        self.entries.insert(
            0,
            RecentEntry {
                path,
                last_opened_at: at_millis,
            },
        );
        self.entries.truncate(self.limit);
        self.persist();
    }

    /// Entries most recent first, limited to paths that currently resolve.
    ///
    /// If any entry was dropped, the pruned list is persisted.
    pub fn list(&mut self) -> Vec<RecentEntry> {
        let before = self.entries.len();
        self.entries.retain(|e| e.path.exists());

        let pruned = before - self.entries.len();
        if pruned > 0 {
            info!("Pruned {} unresolvable recent file(s)", pruned);
            self.persist();
        }
        self.entries.clone()
    }

    /// Remove `path` unconditionally. Returns `true` if it was present.
    pub fn forget(&mut self, path: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.path != path);
        if self.entries.len() == before {
            return false;
        }
        debug!("Forgot recent file: {}", path.display());
        self.persist();
        true
    }

    /// Drop duplicates (keeping the first) and enforce the cap.
    fn sanitize(&mut self) {
        let mut seen = Vec::with_capacity(self.entries.len());
        self.entries.retain(|e| {
            if seen.contains(&e.path) {
                false
            } else {
                seen.push(e.path.clone());
                true
            }
        });
        self.entries.truncate(self.limit);
    }

    fn persist(&self) {
        let Some(path) = &self.backing else {
            return;
        };
        if let Err(e) = write_record(path, &self.entries) {
            warn!("Failed to save recent files: {}", e);
        }
    }
}

impl Default for RecentFiles {
    fn default() -> Self {
        Self::in_memory()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
