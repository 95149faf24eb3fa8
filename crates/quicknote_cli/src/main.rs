//! Command-line shell over `quicknote_core`.
//!
//! # Responsibility
//! - Build configuration from the environment and open the chosen backend.
//! - Drive the list and editor controllers from one verb per invocation.
//! - Supply console implementations of the host window and save prompt.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use quicknote_core::events::feed::FrameOutcome;
use quicknote_core::host::{
    CommonMarkRenderer, FileFilter, HostError, LogNotificationCenter, SaveDialog, SystemClipboard,
    WindowHost,
};
use quicknote_core::view::editor::{CopyOutcome, EditorView, ExportOutcome, SaveOutcome};
use quicknote_core::{
    init_logging, open_service, AppConfig, EditorController, ListController, NoteId,
    NoteService, RemoteChangeFeed,
};
use std::io::{BufRead, Read};
use std::path::PathBuf;

/// Local notes from the terminal.
#[derive(Debug, Parser)]
#[command(name = "quicknote", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List all notes
    List,
    /// List notes containing a pattern
    Search {
        /// Substring to look for; omitted lists everything
        pattern: Option<String>,
    },
    /// Create an empty note and print its id
    Add,
    /// Delete a note
    Remove { note_id: NoteId },
    /// Print the raw text of a note
    Show { note_id: NoteId },
    /// Replace the text of a note (reads stdin when no text is given)
    Edit {
        note_id: NoteId,
        text: Vec<String>,
    },
    /// Print a note rendered as HTML
    Render { note_id: NoteId },
    /// Copy the raw text of a note to the clipboard
    Copy { note_id: NoteId },
    /// Write the raw text of a note to a file
    Export {
        note_id: NoteId,
        path: Option<PathBuf>,
    },
    /// Merge realtime frames read from stdin into the list
    Watch {
        #[arg(default_value = "notes")]
        table: String,
    },
}

/// Window host for a terminal: there is one surface, stdout.
struct ConsoleWindowHost;

impl WindowHost for ConsoleWindowHost {
    fn open_editor(&mut self, note_id: NoteId) {
        log::info!("event=editor_surface module=cli status=open note_id={note_id}");
    }

    fn close_editor(&mut self, note_id: NoteId) {
        log::info!("event=editor_surface module=cli status=close note_id={note_id}");
    }
}

/// Save prompt answered up front by a command-line argument.
struct ArgSaveDialog {
    path: Option<PathBuf>,
}

impl SaveDialog for ArgSaveDialog {
    fn pick_save_path(&mut self, filters: &[FileFilter]) -> Result<Option<PathBuf>, HostError> {
        let Some(path) = self.path.take() else {
            return Ok(None);
        };
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let accepted = filters
            .iter()
            .any(|filter| filter.extensions.iter().any(|ext| *ext == extension));
        if !accepted {
            return Err(HostError::Dialog(format!(
                "`{}` does not match any offered file type",
                path.display()
            )));
        }
        Ok(Some(path))
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("failed to read configuration")?;
    if let Some(dir) = &config.log_dir {
        init_logging(&config.log_level, &dir.to_string_lossy())
            .map_err(|err| anyhow!(err))
            .context("failed to start logging")?;
    }
    let service = open_service(&config).context("failed to open note backend")?;

    match cli.command {
        Command::List => print_list(&service, ""),
        Command::Search { pattern } => print_list(&service, pattern.as_deref().unwrap_or("")),
        Command::Add => add_note(&service),
        Command::Remove { note_id } => remove_note(&service, note_id),
        Command::Show { note_id } => show_note(&service, &config, note_id),
        Command::Edit { note_id, text } => edit_note(&service, &config, note_id, &text),
        Command::Render { note_id } => render_note(&service, &config, note_id),
        Command::Copy { note_id } => copy_note(&service, &config, note_id),
        Command::Export { note_id, path } => export_note(&service, &config, note_id, path),
        Command::Watch { table } => watch(&service, &table),
    }
}

fn print_list(service: &NoteService, pattern: &str) -> Result<()> {
    let mut list = ListController::new(service.clone());
    list.on_search_input(pattern);
    if let Some(err) = list.last_error() {
        bail!("search failed: {err}");
    }
    print_rows(&list);
    Ok(())
}

fn print_rows(list: &ListController) {
    for row in list.rows() {
        println!("{}\t{}", row.note_id, row.preview);
    }
}

fn add_note(service: &NoteService) -> Result<()> {
    let mut list = ListController::new(service.clone());
    list.mount();
    match list.add() {
        Some(note) => {
            println!("{}", note.note_id);
            Ok(())
        }
        None => match list.last_error() {
            Some(err) => bail!("add failed: {err}"),
            None => bail!("add failed"),
        },
    }
}

fn remove_note(service: &NoteService, note_id: NoteId) -> Result<()> {
    let mut list = ListController::new(service.clone());
    list.mount();
    list.remove(note_id);
    if let Some(err) = list.last_error() {
        bail!("remove failed: {err}");
    }
    Ok(())
}

fn open_editor(
    service: &NoteService,
    config: &AppConfig,
    note_id: NoteId,
) -> Result<EditorController> {
    EditorController::open(service.clone(), note_id, config.editor)
        .with_context(|| format!("failed to open note {note_id}"))
}

fn show_note(service: &NoteService, config: &AppConfig, note_id: NoteId) -> Result<()> {
    let editor = open_editor(service, config, note_id)?;
    println!("{}", editor.buffer());
    Ok(())
}

fn edit_note(
    service: &NoteService,
    config: &AppConfig,
    note_id: NoteId,
    words: &[String],
) -> Result<()> {
    let text = if words.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read note text from stdin")?;
        text
    } else {
        words.join(" ")
    };

    let mut editor = open_editor(service, config, note_id)?;
    editor.edit(text);
    if !editor.is_dirty() {
        return Ok(());
    }
    let mut host = ConsoleWindowHost;
    match editor.save(&mut host).context("save failed")? {
        SaveOutcome::Saved | SaveOutcome::SavedAndClosed => Ok(()),
    }
}

fn render_note(service: &NoteService, config: &AppConfig, note_id: NoteId) -> Result<()> {
    let mut editor = open_editor(service, config, note_id)?;
    let mut clipboard = SystemClipboard::new();
    editor.toggle_render(&CommonMarkRenderer, &mut clipboard);
    match editor.view() {
        EditorView::Rendered { html, .. } => print!("{html}"),
        EditorView::Raw(text) => println!("{text}"),
    }
    Ok(())
}

fn copy_note(service: &NoteService, config: &AppConfig, note_id: NoteId) -> Result<()> {
    let mut editor = open_editor(service, config, note_id)?;
    let mut clipboard = SystemClipboard::new();
    let mut notifications = LogNotificationCenter::new();
    match editor.copy(&mut clipboard, &mut notifications) {
        CopyOutcome::Notified | CopyOutcome::CopiedSilently => {
            println!("Note copied to clipboard.");
            Ok(())
        }
        CopyOutcome::Failed(err) => Err(err).context("copy failed"),
    }
}

fn export_note(
    service: &NoteService,
    config: &AppConfig,
    note_id: NoteId,
    path: Option<PathBuf>,
) -> Result<()> {
    let mut editor = open_editor(service, config, note_id)?;
    let mut dialog = ArgSaveDialog { path };
    match editor.export_to_file(&mut dialog) {
        ExportOutcome::Written(path) => {
            println!("{}", path.display());
            Ok(())
        }
        ExportOutcome::Cancelled => bail!("export cancelled: missing <path>"),
        ExportOutcome::Failed(err) => Err(err).context("export failed"),
    }
}

/// Mounts the list, then merges every realtime frame read from stdin and
/// reprints the rows whenever something changed.
fn watch(service: &NoteService, table: &str) -> Result<()> {
    let (feed, updates) = RemoteChangeFeed::new(table);
    let mut list = ListController::new(service.clone()).with_remote_updates(updates);
    list.mount();
    print_rows(&list);

    for line in std::io::stdin().lock().lines() {
        let line = line.context("failed to read frame from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        match feed.ingest_frame(&line) {
            FrameOutcome::Delivered => {}
            FrameOutcome::Ignored => continue,
            FrameOutcome::Malformed => {
                eprintln!("skipped malformed frame");
                continue;
            }
            FrameOutcome::Disconnected => break,
        }
        let report = list.pump_events();
        if report.remote_updates > 0 || report.reloaded {
            println!("--");
            print_rows(&list);
        }
    }
    Ok(())
}
