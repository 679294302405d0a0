//! tabshell - Main Entry Point
//!
//! A line-based host for the editing core. Every command maps to one user
//! intent; storage requests are performed by a terminal gateway (or native
//! dialogs with the `native-dialogs` feature) and events are printed as
//! they arrive.

use log::{info, warn};
use std::io::{self, StdinLock, Stdout};
use std::path::PathBuf;
use tabshell::config::{
    get_config_file_path, get_recent_file_path, get_session_file_path, load_config,
    save_config_if_missing,
};
use tabshell::gateway::terminal::TerminalGateway;
use tabshell::store::{now_millis, RecentFiles, SessionStore};
use tabshell::{CoreEvent, DocumentId, Workbench};

/// Application name constant.
const APP_NAME: &str = "tabshell";

const HELP: &str = "\
commands:
  tabs                 list open documents
  switch <n>           activate tab n
  new                  new untitled document
  open [path]          open a file (asks when no path is given)
  recent               list recent files
  reopen <n>           open recent file n
  forget <n>           remove recent file n from the list
  show                 print the active document
  set <text>           replace the active document's content
  append <text>        append a line to the active document
  save | saveas        save the active document
  close                close the active tab
  quit                 end the session";

type Terminal = TerminalGateway<StdinLock<'static>, Stdout>;

/// Terminal plus whichever gateway performs storage requests.
struct Host {
    term: Terminal,
    #[cfg(feature = "native-dialogs")]
    dialogs: tabshell::gateway::native::NativeGateway,
}

impl Host {
    fn new() -> Self {
        Self {
            term: TerminalGateway::new(io::stdin().lock(), io::stdout()),
            #[cfg(feature = "native-dialogs")]
            dialogs: tabshell::gateway::native::NativeGateway::default(),
        }
    }

    /// Perform queued storage requests and print the resulting events.
    ///
    /// Returns `true` once the session may terminate.
    fn pump(&mut self, wb: &mut Workbench) -> bool {
        loop {
            #[cfg(feature = "native-dialogs")]
            wb.run_requests(&mut self.dialogs);
            #[cfg(not(feature = "native-dialogs"))]
            wb.run_requests(&mut self.term);

            let events = wb.take_events();
            if events.is_empty() && !wb.has_requests() {
                return false;
            }

            let mut terminated = false;
            for event in events {
                match &event {
                    CoreEvent::RegistryEmpty => {
                        // Closing the last tab ends the session
                        if let Err(e) = wb.request_quit() {
                            warn!("Could not request quit: {}", e);
                        }
                    }
                    CoreEvent::SafeToTerminate => terminated = true,
                    _ => {}
                }
                if let Some(line) = describe(wb, &event) {
                    self.term.say(&line);
                }
            }

            if terminated {
                return true;
            }
        }
    }
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting {}", APP_NAME);

    let settings = load_config();
    if let Err(e) = get_config_file_path().and_then(|path| save_config_if_missing(&path, &settings)) {
        warn!("Could not write default configuration: {}", e);
    }
    let session = get_session_file_path()
        .map(SessionStore::new)
        .map_err(|e| warn!("Session will not be persisted: {}", e))
        .ok();
    let recent = match get_recent_file_path() {
        Ok(path) => RecentFiles::load(path),
        Err(e) => {
            warn!("Recent files will not be persisted: {}", e);
            RecentFiles::in_memory()
        }
    };

    let mut wb = Workbench::new(settings, session, recent);
    wb.start();
    for arg in std::env::args().skip(1) {
        wb.open_path(absolute(PathBuf::from(arg)));
    }

    let mut host = Host::new();
    if host.pump(&mut wb) {
        wb.shutdown();
        return;
    }
    host.term.say("Type 'help' for commands.");

    loop {
        let prompt = match wb.registry().active() {
            Some(doc) => format!("[{}] > ", doc.tab_label()),
            None => "> ".to_string(),
        };
        let Some(line) = host.term.prompt(&prompt) else {
            // End of input: try to quit, keep the session otherwise
            if let Err(e) = wb.request_quit() {
                warn!("Could not request quit: {}", e);
            }
            host.pump(&mut wb);
            break;
        };

        let (command, rest) = match line.trim_start().split_once(' ') {
            Some((command, rest)) => (command.to_string(), rest.to_string()),
            None => (line.trim().to_string(), String::new()),
        };

        if let Err(message) = run_command(&mut wb, &mut host.term, &command, &rest) {
            host.term.say(&message);
        }
        if host.pump(&mut wb) {
            break;
        }
    }

    wb.shutdown();
    info!("{} exited", APP_NAME);
}

/// Apply one command. `Err` carries a message for the user.
fn run_command(
    wb: &mut Workbench,
    term: &mut Terminal,
    command: &str,
    rest: &str,
) -> Result<(), String> {
    match command {
        "" => {}
        "help" => term.say(HELP),
        "tabs" => {
            let active = wb.registry().active_id();
            for (i, doc) in wb.registry().documents().iter().enumerate() {
                let marker = if Some(doc.id()) == active { '>' } else { ' ' };
                term.say(&format!("{} {}. {}", marker, i + 1, doc.tab_label()));
            }
        }
        "switch" => {
            let id = tab_at(wb, rest)?;
            wb.activate(id);
        }
        "new" => {
            wb.new_document();
        }
        "open" if rest.trim().is_empty() => wb.open(),
        "open" => wb.open_path(absolute(PathBuf::from(rest.trim()))),
        "recent" => {
            let now = now_millis();
            let entries = wb.recent_files();
            if entries.is_empty() {
                term.say("No recent files.");
            }
            for (i, entry) in entries.iter().enumerate() {
                term.say(&format!(
                    "  {}. {} ({}) {}",
                    i + 1,
                    entry.file_name(),
                    entry.path.display(),
                    entry.age_label(now)
                ));
            }
        }
        "reopen" | "forget" => {
            let index = parse_index(rest)?;
            let entry = wb
                .recent_files()
                .into_iter()
                .nth(index)
                .ok_or_else(|| format!("No recent file {}.", index + 1))?;
            if command == "reopen" {
                wb.open_path(entry.path);
            } else {
                wb.forget_recent(&entry.path);
            }
        }
        "show" => {
            let id = active(wb)?;
            if let Some(doc) = wb.registry().get(id) {
                term.say(doc.content());
            }
        }
        "set" => {
            let id = active(wb)?;
            wb.edit(id, rest.to_string());
        }
        "append" => {
            let id = active(wb)?;
            let mut content = wb
                .registry()
                .get(id)
                .map(|doc| doc.content().to_string())
                .unwrap_or_default();
            content.push_str(rest);
            content.push('\n');
            wb.edit(id, content);
        }
        "save" => {
            let id = active(wb)?;
            wb.save(id).map_err(|e| e.to_string())?;
        }
        "saveas" => {
            let id = active(wb)?;
            wb.save_as(id).map_err(|e| e.to_string())?;
        }
        "close" => {
            let id = active(wb)?;
            wb.close_tab(id).map_err(|e| e.to_string())?;
        }
        "quit" | "exit" => wb.request_quit().map_err(|e| e.to_string())?,
        other => return Err(format!("Unknown command '{}'. Type 'help'.", other)),
    }
    Ok(())
}

fn active(wb: &Workbench) -> Result<DocumentId, String> {
    wb.registry()
        .active_id()
        .ok_or_else(|| "No document is open.".to_string())
}

fn parse_index(arg: &str) -> Result<usize, String> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("Expected a number, got '{}'.", arg.trim())),
    }
}

fn tab_at(wb: &Workbench, arg: &str) -> Result<DocumentId, String> {
    let index = parse_index(arg)?;
    wb.registry()
        .documents()
        .get(index)
        .map(|doc| doc.id())
        .ok_or_else(|| format!("No tab {}.", index + 1))
}

/// User-facing line for an event, if it deserves one.
fn describe(wb: &Workbench, event: &CoreEvent) -> Option<String> {
    let title_of = |id: DocumentId| {
        wb.registry()
            .get(id)
            .map(|doc| doc.title())
            .unwrap_or_else(|| id.to_string())
    };
    match event {
        CoreEvent::DocumentCreated { title, .. } => Some(format!("Opened tab '{}'", title)),
        CoreEvent::Saved { path, .. } => Some(format!("Saved {}", path.display())),
        CoreEvent::SaveFailed { message, .. } => Some(format!("Save failed: {}", message)),
        CoreEvent::SaveCancelled { id } => Some(format!("Save of '{}' cancelled", title_of(*id))),
        CoreEvent::OpenFailed { message, .. } => Some(format!("Open failed: {}", message)),
        CoreEvent::SafeToTerminate => Some("Goodbye.".to_string()),
        _ => None,
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}
