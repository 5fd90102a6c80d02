// proposal-pdf: Collect workshop proposals and export them as PDFs

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use clap::{Parser, Subcommand};
use log::debug;

use proposal_pdf::cache::FileCache;
use proposal_pdf::config::AppConfig;
use proposal_pdf::error::AppError;
use proposal_pdf::export::{DocumentExporter, ExportSettings, ExportedDocument};
use proposal_pdf::layout::OverflowPolicy;
use proposal_pdf::logging::init_logging;
use proposal_pdf::preview::{PreviewHandle, PreviewRegistry};
use proposal_pdf::record::{AudienceGroup, CanBeAdapted, DisabilityType, Record};
use proposal_pdf::session::{search, ProposalCard, SaveOutcome, Session, View};
use proposal_pdf::store::{LocalStore, RecordStore, StoredRecord, Subscription};
use proposal_pdf::wizard::{Step, StepKind, StepState, TextField, Wizard};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Collect workshop proposals and export them as PDFs")]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON file holding saved proposals (in-memory when omitted)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Directory for the in-progress proposal cache
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Write rotating log files here instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a proposal to PDF
    Export {
        /// Proposal JSON file
        #[arg(short, long, conflicts_with = "id")]
        input: Option<PathBuf>,

        /// Saved proposal id
        #[arg(long)]
        id: Option<String>,

        /// Output file or directory (defaults to the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Split blocks taller than a page across pages
        #[arg(long)]
        split_long_blocks: bool,
    },
    /// Save a proposal JSON file to the store
    Save {
        /// Proposal JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Update this saved proposal instead of creating one
        #[arg(long)]
        id: Option<String>,
    },
    /// List saved proposals
    List {
        /// Filter by name, responsible parties or thematic axes
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Print a saved proposal as JSON
    Show { id: String },
    /// Delete a saved proposal
    Delete { id: String },
    /// Fill in a proposal step by step from standard input
    Wizard {
        /// Directory for exported PDFs
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let args = Args::parse();
    let config = resolve_config(&args)?;
    let _logger = init_logging(&config.logging.level, config.logging.dir.as_deref())?;
    debug!("event=config_resolved config={:?}", config);

    match args.command {
        Command::Export {
            input,
            id,
            output,
            split_long_blocks,
        } => {
            let overflow = if split_long_blocks {
                OverflowPolicy::SplitLines
            } else {
                config.layout.overflow
            };
            let from_draft = input.is_none() && id.is_none();
            let session = open_session(&config, overflow, from_draft)?;
            let record = match (input, id) {
                (Some(path), _) => read_record(&config, &path)?,
                (None, Some(id)) => session.get(&id)?.record,
                (None, None) if config.storage.cache_dir.is_some() => {
                    session.wizard().record().as_ref().clone()
                }
                (None, None) => {
                    return Err(AppError::InputError(
                        "nothing to export: pass --input, --id or --cache-dir".into(),
                    ))
                }
            };
            let doc = session.exporter().build(&record)?;
            let path = write_document(&doc, output.as_deref())?;

            println!("✓ Generated: {}", path.display());
            println!("  Proposal: {}", display_name(&record));
            println!("  Pages: {}", doc.page_count());
        }
        Command::Save { input, id } => {
            let record = read_record(&config, &input)?;
            let mut session = open_session(&config, config.layout.overflow, false)?;
            if let Some(id) = &id {
                session.open(id)?;
            }
            session.wizard_mut().update(|r| *r = record);
            let outcome = session.save()?;
            match &outcome {
                SaveOutcome::Created(id) => println!("✓ Created: {}", id),
                SaveOutcome::Updated(id) => println!("✓ Updated: {}", id),
            }
        }
        Command::List { search } => {
            let session = open_session(&config, config.layout.overflow, false)?;
            let cards = session.cards(&search)?;
            if cards.is_empty() {
                println!("No saved proposals yet.");
            }
            for card in cards {
                println!("{}  {}", card.id, card.title);
                println!("    Duration: {} · Headcount: {}", card.duration, card.headcount);
                println!("    Responsible: {}", card.responsible_parties);
            }
        }
        Command::Show { id } => {
            let session = open_session(&config, config.layout.overflow, false)?;
            let stored = session.get(&id)?;
            let json = serde_json::to_string_pretty(&stored)
                .map_err(|e| AppError::InputError(e.to_string()))?;
            println!("{}", json);
        }
        Command::Delete { id } => {
            let mut session = open_session(&config, config.layout.overflow, false)?;
            session.delete(&id)?;
            println!("✓ Deleted: {}", id);
        }
        Command::Wizard { output_dir } => {
            let mut session = open_session(&config, config.layout.overflow, true)?;
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            run_wizard(&mut session, stdin.lock(), stdout.lock(), &output_dir)?;
        }
    }

    Ok(())
}

// ============================================================================
// Setup
// ============================================================================

/// Config file values, then command line overrides.
fn resolve_config(args: &Args) -> Result<AppConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(store) = &args.store {
        config.storage.store_path = Some(store.clone());
    }
    if let Some(dir) = &args.cache_dir {
        config.storage.cache_dir = Some(dir.clone());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.logging.dir = Some(dir.clone());
    }
    Ok(config)
}

/// Builds the store, wizard and exporter. The draft cache is only attached
/// when `use_cache` is set so one-shot commands never overwrite it.
fn open_session(
    config: &AppConfig,
    overflow: OverflowPolicy,
    use_cache: bool,
) -> Result<Session, AppError> {
    let store = match &config.storage.store_path {
        Some(path) => LocalStore::open(path)?,
        None => LocalStore::in_memory(),
    }
    .with_limit(config.storage.list_limit);
    let store: Arc<dyn RecordStore> = Arc::new(store);

    let mut wizard = Wizard::new(config.proposal.default_year.clone(), config.wizard.advance);
    if let Some(dir) = config.storage.cache_dir.as_ref().filter(|_| use_cache) {
        wizard = wizard.with_cache(Box::new(FileCache::new(dir)));
    }

    let exporter = DocumentExporter::new(ExportSettings::from_config(&config.proposal, overflow)?);
    Ok(Session::new(store, wizard, exporter))
}

fn read_record(config: &AppConfig, path: &Path) -> Result<Record, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::InputError(format!("{}: {}", path.display(), e)))?;
    Record::new(config.proposal.default_year.clone())
        .merged_from_json(&content)
        .map_err(|e| AppError::InputError(format!("{}: {}", path.display(), e)))
}

fn write_document(doc: &ExportedDocument, output: Option<&Path>) -> Result<PathBuf, AppError> {
    match output {
        Some(path) if path.is_dir() => doc.save_in(path),
        Some(path) => {
            doc.save_as(path)?;
            Ok(path.to_path_buf())
        }
        None => doc.save_in(Path::new(".")),
    }
}

fn display_name(record: &Record) -> &str {
    let name = record.name.trim();
    if name.is_empty() {
        "(unnamed)"
    } else {
        name
    }
}

// ============================================================================
// Interactive Wizard
// ============================================================================

type Snapshot = Arc<Mutex<Option<Vec<StoredRecord>>>>;

fn lock_snapshot(
    snapshot: &Mutex<Option<Vec<StoredRecord>>>,
) -> MutexGuard<'_, Option<Vec<StoredRecord>>> {
    snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Live list view: the store pushes every change into `snapshot`, and the
/// loop prints whatever arrived since the last command.
struct ListView {
    query: String,
    snapshot: Snapshot,
    _subscription: Subscription,
}

impl ListView {
    fn open(session: &Session, query: &str) -> Self {
        let snapshot: Snapshot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&snapshot);
        let subscription = session.subscribe_list(Box::new(move |items| {
            *lock_snapshot(&sink) = Some(items.to_vec());
        }));
        ListView {
            query: query.to_string(),
            snapshot,
            _subscription: subscription,
        }
    }

    fn print_changes<W: Write>(&self, out: &mut W) -> Result<(), AppError> {
        let Some(items) = lock_snapshot(&self.snapshot).take() else {
            return Ok(());
        };
        let cards: Vec<ProposalCard> = search(items, &self.query)
            .iter()
            .map(ProposalCard::from_stored)
            .collect();
        if cards.is_empty() {
            writeln!(out, "No saved proposals yet.")?;
        }
        for card in cards {
            writeln!(out, "{}  {}", card.id, card.title)?;
            writeln!(out, "    Duration: {} · Headcount: {}", card.duration, card.headcount)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Line-driven wizard.
///
/// Lines starting with `:` are commands, `+key` toggles an audience group or
/// disability type, and `key=value` sets a text field (or `canBeAdapted`).
/// `:list` switches to a live list of saved proposals until the next command
/// that edits or moves through the form.
fn run_wizard<R: BufRead, W: Write>(
    session: &mut Session,
    input: R,
    mut out: W,
    output_dir: &Path,
) -> Result<(), AppError> {
    let registry = PreviewRegistry::new();
    let mut preview: Option<PreviewHandle> = None;
    let mut list_view: Option<ListView> = None;

    if session.view() == View::Welcome {
        writeln!(
            out,
            "Workshop proposal wizard. Type field=value to fill a step, :list for saved proposals, :quit to leave."
        )?;
        session.show(View::Form);
    }

    print_step(session.wizard(), &mut out)?;
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let keeps_view = matches!(
            line.split_whitespace().next(),
            Some(":list" | ":save" | ":delete" | ":export" | ":preview" | ":quit" | ":q")
        );
        if !keeps_view && session.view() == View::List {
            list_view = None;
            session.show(View::Form);
        }

        if let Some(command) = line.strip_prefix(':') {
            let mut parts = command.splitn(2, ' ');
            let verb = parts.next().unwrap_or_default();
            let arg = parts.next().unwrap_or_default().trim();
            match verb {
                "next" => {
                    if !session.wizard_mut().next() {
                        let reason = if session.wizard().is_last() {
                            "Last step: use :save or :export"
                        } else {
                            "Enter a name before continuing"
                        };
                        writeln!(out, "! {}", reason)?;
                    }
                }
                "back" => {
                    session.wizard_mut().back();
                }
                "goto" => match arg.parse::<usize>() {
                    Ok(n) if n >= 1 => session.wizard_mut().go_to(n - 1),
                    _ => writeln!(out, "! Usage: :goto <1-{}>", Step::COUNT)?,
                },
                "save" => match session.save() {
                    Ok(SaveOutcome::Created(id)) => writeln!(out, "✓ Saved as {}", id)?,
                    Ok(SaveOutcome::Updated(id)) => writeln!(out, "✓ Updated {}", id)?,
                    Err(e) => writeln!(out, "! {}", e)?,
                },
                "export" => {
                    std::fs::create_dir_all(output_dir)?;
                    match session.export().and_then(|doc| {
                        let path = doc.save_in(output_dir)?;
                        Ok((path, doc.page_count()))
                    }) {
                        Ok((path, pages)) => {
                            writeln!(out, "✓ Generated: {} ({} pages)", path.display(), pages)?
                        }
                        Err(e) => writeln!(out, "! {}", e)?,
                    }
                }
                "preview" => match session.export() {
                    Ok(doc) => {
                        // Replacing the handle revokes the previous preview.
                        let handle = doc.preview(&registry);
                        writeln!(out, "✓ Preview: {} ({} pages)", handle.url(), doc.page_count())?;
                        preview = Some(handle);
                    }
                    Err(e) => writeln!(out, "! {}", e)?,
                },
                "new" => {
                    session.new_record();
                    writeln!(out, "✓ New proposal")?;
                }
                "list" => {
                    // Replacing the view drops the previous subscription.
                    list_view = Some(ListView::open(session, arg));
                    session.show(View::List);
                }
                "open" => match session.open(arg) {
                    Ok(()) => writeln!(out, "✓ Opened {}", arg)?,
                    Err(e) => writeln!(out, "! {}", e)?,
                },
                "delete" => match session.delete(arg) {
                    Ok(()) => writeln!(out, "✓ Deleted {}", arg)?,
                    Err(e) => writeln!(out, "! {}", e)?,
                },
                "quit" | "q" => break,
                other => writeln!(out, "! Unknown command :{}", other)?,
            }
        } else if let Some(key) = line.strip_prefix('+') {
            let key = key.trim();
            if let Some(group) = AudienceGroup::from_key(key) {
                session.wizard_mut().toggle_audience(group);
            } else if let Some(kind) = DisabilityType::from_key(key) {
                session.wizard_mut().toggle_disability(kind);
            } else {
                writeln!(out, "! Unknown option {}", key)?;
            }
        } else if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().replace("\\n", "\n");
            if key.eq_ignore_ascii_case("canBeAdapted") {
                match CanBeAdapted::from_key(&value) {
                    Some(choice) => session.wizard_mut().set_can_be_adapted(choice),
                    None => writeln!(out, "! canBeAdapted is yes or no")?,
                }
            } else if let Some(field) = TextField::from_key(key) {
                session.wizard_mut().set_text(field, value);
            } else {
                writeln!(out, "! Unknown field {}", key)?;
            }
        } else {
            writeln!(out, "! Expected :command, +option or field=value")?;
        }

        match (&list_view, session.view()) {
            (Some(view), View::List) => view.print_changes(&mut out)?,
            _ => print_step(session.wizard(), &mut out)?,
        }
    }

    drop(list_view);
    drop(preview);
    Ok(())
}

fn print_step<W: Write>(wizard: &Wizard, out: &mut W) -> Result<(), AppError> {
    let step = wizard.step();
    let dots: String = wizard
        .progress()
        .into_iter()
        .map(|s| match s {
            StepState::Done => '●',
            StepState::Active => '◉',
            StepState::Pending => '○',
        })
        .collect();
    writeln!(
        out,
        "[{}/{}] {}  {}",
        wizard.index() + 1,
        Step::COUNT,
        step.label(),
        dots
    )?;

    let record = wizard.record();
    match step.kind() {
        StepKind::AudienceSelection => {
            for group in AudienceGroup::ALL {
                let mark = if record.audience.is_selected(group) { "x" } else { " " };
                writeln!(out, "  [{}] +{}  {}", mark, group.key(), group.label())?;
            }
        }
        StepKind::Accessibility => {
            writeln!(
                out,
                "  canBeAdapted = {}",
                record.accessibility.can_be_adapted.label()
            )?;
            for kind in DisabilityType::ALL {
                let selected = record.accessibility.disability_types.is_selected(kind);
                let mark = if selected { "x" } else { " " };
                writeln!(out, "  [{}] +{}  {}", mark, kind.key(), kind.label())?;
            }
        }
        StepKind::Text => {}
    }
    for field in step.fields() {
        writeln!(out, "  {} = {}", field.key(), wizard.text(*field))?;
    }
    out.flush()?;
    Ok(())
}
