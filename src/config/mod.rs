//! Configuration module for tabshell
//!
//! This module handles user preferences, their JSON serialization, and
//! the platform-specific directory holding the settings, session and
//! recent-files records.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
