//! User settings for tabshell
//!
//! This module defines the `Settings` struct that holds the user-configurable
//! options, with serde support for JSON persistence.

use crate::registry::DEFAULT_UNTITLED_PREFIX;
use crate::save::DEFAULT_SAVE_NAME;
use crate::store::MAX_RECENT_FILES;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// User preferences.
///
/// This struct is serialized to JSON and persisted to the user's config directory.
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────
    /// Whether to reopen the previous session's documents on startup
    pub restore_session: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────
    /// File name suggested when saving a document that has no path
    pub default_save_name: String,

    /// Prefix of untitled document titles ("Untitled 1", "Untitled 2", ...)
    pub untitled_prefix: String,

    // ─────────────────────────────────────────────────────────────────────────
    // Recent Files
    // ─────────────────────────────────────────────────────────────────────────
    /// Maximum number of recent files to remember
    pub max_recent_files: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            restore_session: true,
            default_save_name: DEFAULT_SAVE_NAME.to_string(),
            untitled_prefix: DEFAULT_UNTITLED_PREFIX.to_string(),
            max_recent_files: MAX_RECENT_FILES,
        }
    }
}

impl Settings {
    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// This is useful after loading settings from a file that might have
    /// been manually edited with invalid values.
    pub fn sanitize(&mut self) {
        // Recent list never grows past the store's hard cap
        self.max_recent_files = self.max_recent_files.clamp(1, MAX_RECENT_FILES);

        if self.default_save_name.trim().is_empty() {
            self.default_save_name = DEFAULT_SAVE_NAME.to_string();
        }

        if self.untitled_prefix.trim().is_empty() {
            self.untitled_prefix = DEFAULT_UNTITLED_PREFIX.to_string();
        }
    }

    /// Load settings and sanitize them to ensure validity.
    ///
    /// This is a convenience method that deserializes and then sanitizes.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.restore_session);
        assert_eq!(settings.default_save_name, "untitled.txt");
        assert_eq!(settings.untitled_prefix, "Untitled");
        assert_eq!(settings.max_recent_files, 10);
    }

    #[test]
    fn test_settings_serialization_roundtrip() {
        let settings = Settings {
            restore_session: false,
            default_save_name: "notes.txt".to_string(),
            ..Settings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, loaded);
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"restore_session": false}"#).unwrap();
        assert!(!settings.restore_session);
        assert_eq!(settings.default_save_name, "untitled.txt");
    }

    #[test]
    fn test_settings_deserialize_empty_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_sanitize_max_recent_files() {
        let mut settings = Settings {
            max_recent_files: 0,
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.max_recent_files, 1);

        settings.max_recent_files = 250;
        settings.sanitize();
        assert_eq!(settings.max_recent_files, MAX_RECENT_FILES);
    }

    #[test]
    fn test_sanitize_blank_names() {
        let mut settings = Settings {
            default_save_name: "  ".to_string(),
            untitled_prefix: String::new(),
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.default_save_name, DEFAULT_SAVE_NAME);
        assert_eq!(settings.untitled_prefix, DEFAULT_UNTITLED_PREFIX);
    }

    #[test]
    fn test_from_json_sanitized() {
        let json = r#"{"max_recent_files": 40, "untitled_prefix": ""}"#;
        let settings = Settings::from_json_sanitized(json).unwrap();
        assert_eq!(settings.max_recent_files, MAX_RECENT_FILES);
        assert_eq!(settings.untitled_prefix, "Untitled");
    }
}
