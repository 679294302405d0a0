//! Persisted stores for tabshell
//!
//! This module holds the two flat records that survive a restart:
//! - the recent files list (bounded, most recent first, lazily pruned)
//! - the session snapshot (write-through copy of the open documents)
//!
//! Both stores fail open: a missing, empty or corrupt record reads as an
//! empty collection and never surfaces an error to the interactive flow.

mod json;
mod recent;
mod session;

pub(crate) use json::write_record;
pub use recent::{now_millis, RecentEntry, RecentFiles, MAX_RECENT_FILES};
pub use session::{SessionEntry, SessionSnapshot, SessionStore};
