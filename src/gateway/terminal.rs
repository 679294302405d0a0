//! Line-based terminal gateway.
//!
//! Pickers and confirmation dialogs become prompts on a text stream. The
//! reader and writer are generic so the gateway can be driven from tests.

use super::{Decision, DecisionScope, StorageGateway};
use log::warn;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Prompts on `output` and reads answers from `input`.
pub struct TerminalGateway<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalGateway<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `label` and read one line. `None` on end of input.
    pub fn prompt(&mut self, label: &str) -> Option<String> {
        self.say_inline(label);
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                warn!("Failed to read from terminal: {}", e);
                None
            }
        }
    }

    /// Print one line.
    pub fn say(&mut self, line: &str) {
        if let Err(e) = writeln!(self.output, "{}", line) {
            warn!("Failed to write to terminal: {}", e);
        }
    }

    fn say_inline(&mut self, text: &str) {
        let result = write!(self.output, "{}", text).and_then(|_| self.output.flush());
        if let Err(e) = result {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl<R: BufRead, W: Write> StorageGateway for TerminalGateway<R, W> {
    fn open_picker(&mut self) -> Option<PathBuf> {
        let answer = self.prompt("Open file (blank to cancel): ")?;
        let answer = answer.trim();
        if answer.is_empty() {
            return None;
        }
        Some(absolutize(Path::new(answer)))
    }

    fn save_picker(&mut self, default_name: &str) -> Option<PathBuf> {
        let answer = self.prompt(&format!("Save as [{}] (- to cancel): ", default_name))?;
        let answer = answer.trim();
        match answer {
            "-" => None,
            "" => Some(absolutize(Path::new(default_name))),
            name => Some(absolutize(Path::new(name))),
        }
    }

    fn confirm(&mut self, scope: &DecisionScope) -> Decision {
        let choices = match scope {
            DecisionScope::Tab { .. } => "[s]ave, [d]iscard, [c]ancel: ",
            DecisionScope::Session { .. } => "[s]ave all, [d]iscard all and quit, [c]ancel: ",
        };
        self.say(&scope.message());

        loop {
            let Some(answer) = self.prompt(choices) else {
                return Decision::Cancel;
            };
            match answer.trim().to_lowercase().as_str() {
                "s" | "save" => return Decision::Save,
                "d" | "discard" => return Decision::Discard,
                "c" | "cancel" => return Decision::Cancel,
                _ => self.say("Please answer s, d or c."),
            }
        }
    }
}

/// Resolve `path` against the working directory.
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            warn!("Could not resolve working directory: {}", e);
            path.to_path_buf()
        }
    }
}
