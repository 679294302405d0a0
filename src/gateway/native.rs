//! Native dialog gateway using the rfd crate
//!
//! Presents the platform's open/save pickers and a Yes/No/Cancel message
//! box for unsaved-changes decisions. File reads and writes use the
//! default `std::fs` implementations of `StorageGateway`.

use super::{Decision, DecisionScope, StorageGateway};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use std::path::PathBuf;

/// File extension filters offered by the pickers.
const TEXT_EXTENSIONS: &[&str] = &["txt", "text"];

/// Gateway backed by native dialogs.
#[derive(Debug, Default)]
pub struct NativeGateway {
    /// Directory the pickers open in (follows the last picked file)
    initial_dir: Option<PathBuf>,
}

impl NativeGateway {
    pub fn new(initial_dir: Option<PathBuf>) -> Self {
        Self { initial_dir }
    }

    fn remember_dir(&mut self, picked: &Option<PathBuf>) {
        if let Some(parent) = picked.as_ref().and_then(|p| p.parent()) {
            self.initial_dir = Some(parent.to_path_buf());
        }
    }

    fn file_dialog(&self, title: &str) -> FileDialog {
        let mut dialog = FileDialog::new()
            .set_title(title)
            .add_filter("Text Files", TEXT_EXTENSIONS)
            .add_filter("All Files", &["*"]);

        if let Some(dir) = &self.initial_dir {
            dialog = dialog.set_directory(dir);
        }
        dialog
    }
}

impl StorageGateway for NativeGateway {
    fn open_picker(&mut self) -> Option<PathBuf> {
        let picked = self.file_dialog("Open File").pick_file();
        self.remember_dir(&picked);
        picked
    }

    fn save_picker(&mut self, default_name: &str) -> Option<PathBuf> {
        let picked = self
            .file_dialog("Save As")
            .set_file_name(default_name)
            .save_file();
        self.remember_dir(&picked);
        picked
    }

    fn confirm(&mut self, scope: &DecisionScope) -> Decision {
        let hint = match scope {
            DecisionScope::Tab { .. } => "Save changes before closing?",
            DecisionScope::Session { .. } => "Save all changes before quitting?",
        };
        let result = MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title("Unsaved Changes")
            .set_description(format!("{}\n{}", scope.message(), hint))
            .set_buttons(MessageButtons::YesNoCancel)
            .show();

        match result {
            MessageDialogResult::Yes => Decision::Save,
            MessageDialogResult::No => Decision::Discard,
            _ => Decision::Cancel,
        }
    }
}
