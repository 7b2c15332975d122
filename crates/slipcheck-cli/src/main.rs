//! slipcheck: review, correct, and file lottery tickets read from slip photos.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use slipcheck_core::notification::unread_count;
use slipcheck_core::{
    EditOp, NotificationFilter, StoredTicket, TicketCollaborator, TicketRecord, TicketView,
    validate,
};
use slipcheck_sync::{ApiClient, SpawningCollaborator, StaticSession, SyncError};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod display;

#[derive(Parser, Debug)]
#[command(name = "slipcheck", version, about, long_about = None)]
struct Cli {
    /// Backend API base URL
    #[arg(
        long,
        global = true,
        env = "SLIPCHECK_API_URL",
        default_value = "http://localhost:8000/api"
    )]
    api_url: String,

    /// Access token for the signed-in user
    #[arg(long, global = true, env = "SLIPCHECK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log filter (trace, debug, info, warn, error, or a tracing directive)
    #[arg(long, global = true, env = "SLIPCHECK_LOG", default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    // === Local ===
    /// Show a ticket as a card
    Show {
        /// Ticket JSON: an upload response, a bare record, or a history row
        file: PathBuf,
    },

    /// Check a ticket and exit non-zero if it has problems
    Validate { file: PathBuf },

    /// Apply a JSON list of edits to a ticket
    Edit {
        file: PathBuf,

        /// JSON array of edit operations, e.g. [{"op": "add_fourd_bet"}]
        ops: PathBuf,

        /// Write the edited ticket here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also send the saved edits to the backend (history rows only)
        #[arg(long)]
        push: bool,
    },

    // === Backend ===
    /// Upload a slip photo for OCR and show the extracted ticket
    Upload {
        image: PathBuf,

        /// Write the extracted ticket JSON here
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Save the ticket straight away if it has no problems
        #[arg(long)]
        confirm: bool,
    },

    /// List ticket history
    #[command(alias = "ls")]
    List,

    /// Save a reviewed ticket to history
    Save {
        file: PathBuf,

        /// Save even if the ticket has problems
        #[arg(long)]
        force: bool,
    },

    /// Delete a ticket from history
    Delete { id: String },

    /// List notifications
    Notifications {
        #[arg(long, value_enum, default_value_t = Filter::All)]
        filter: Filter,
    },

    /// Mark one notification, or all of them, as read
    NotificationsRead {
        #[arg(required_unless_present = "all")]
        id: Option<String>,

        #[arg(long, conflicts_with = "id")]
        all: bool,
    },

    /// Delete a notification
    NotificationDelete { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Filter {
    All,
    Unread,
    Read,
}

impl From<Filter> for NotificationFilter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::All => NotificationFilter::All,
            Filter::Unread => NotificationFilter::Unread,
            Filter::Read => NotificationFilter::Read,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    debug!("slipcheck v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Show { ref file } => {
            let (record, _) = load_ticket(file)?;
            display::print_ticket_card(&record, &validate(&record));
        }
        Command::Validate { ref file } => {
            let (record, _) = load_ticket(file)?;
            let report = validate(&record);
            display::print_ticket_card(&record, &report);
            if !report.is_valid() {
                bail!("{} problem(s) found", report.violations.len());
            }
            println!("\nTicket is valid.");
        }
        Command::Edit {
            ref file,
            ref ops,
            ref out,
            push,
        } => {
            let (record, stored_id) = load_ticket(file)?;
            let ops = read_ops(ops)?;
            let edited = if push {
                let id = stored_id
                    .context("--push needs a history row with an id, not a fresh upload")?;
                let collaborator = SpawningCollaborator::new(client(&cli), Some(id));
                let (edited, mut collaborator) = run_edit(record, &ops, collaborator)?;
                check_sync(collaborator.finish().await)?;
                edited
            } else {
                run_edit(record, &ops, LocalOnly)?.0
            };
            write_record(&edited, out.as_deref())?;
        }
        Command::Upload {
            ref image,
            ref out,
            confirm,
        } => {
            let bytes =
                fs::read(image).with_context(|| format!("reading {}", image.display()))?;
            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "ticket".to_string());
            let client = client(&cli);
            let record = client
                .upload_ticket(bytes, &file_name, mime_for(image))
                .await?;
            display::print_ticket_card(&record, &validate(&record));
            if let Some(path) = out {
                write_record(&record, Some(path.as_path()))?;
            }
            if confirm {
                confirm_ticket(record, client, false).await?;
            }
        }
        Command::List => {
            let rows = client(&cli).list_tickets().await?;
            display::print_history(&rows);
        }
        Command::Save { ref file, force } => {
            let (record, _) = load_ticket(file)?;
            confirm_ticket(record, client(&cli), force).await?;
        }
        Command::Delete { ref id } => {
            client(&cli).delete_ticket(id).await?;
            println!("Deleted ticket {id}.");
        }
        Command::Notifications { filter } => {
            let all = client(&cli).list_notifications().await?;
            let shown = NotificationFilter::from(filter).filter(&all);
            display::print_notifications(&shown, unread_count(&all));
        }
        Command::NotificationsRead { ref id, all } => {
            let client = client(&cli);
            match id {
                Some(id) if !all => {
                    client.mark_notification_read(id).await?;
                    println!("Marked {id} as read.");
                }
                _ => {
                    client.mark_all_notifications_read().await?;
                    println!("Marked all notifications as read.");
                }
            }
        }
        Command::NotificationDelete { ref id } => {
            client(&cli).delete_notification(id).await?;
            println!("Deleted notification {id}.");
        }
    }

    Ok(())
}

fn client(cli: &Cli) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(
        cli.api_url.clone(),
        Arc::new(StaticSession::new(cli.token.clone())),
    ))
}

/// Collaborator for edits that never leave this machine.
struct LocalOnly;

impl TicketCollaborator for LocalOnly {
    fn on_confirm(&mut self, _record: &TicketRecord) {}

    fn on_edit(&mut self, record: &TicketRecord) {
        debug!(game_type = %record.game_type, "edits kept locally");
    }
}

/// Run `ops` through an edit session and save. Returns the committed record.
fn run_edit<C: TicketCollaborator>(
    record: TicketRecord,
    ops: &[EditOp],
    collaborator: C,
) -> Result<(TicketRecord, C)> {
    let mut view = TicketView::new(record, collaborator);
    view.begin_edit()?;
    let mut changed = 0;
    for op in ops {
        if view.apply(op)? {
            changed += 1;
        }
    }
    info!(ops = ops.len(), changed, "applied edits");
    view.save()?;
    Ok(view.into_parts())
}

async fn confirm_ticket(record: TicketRecord, client: Arc<ApiClient>, force: bool) -> Result<()> {
    let mut view = TicketView::new(record, SpawningCollaborator::new(client, None));
    if force {
        view.confirm()?;
    } else {
        view.confirm_checked()?;
    }
    let (_, mut collaborator) = view.into_parts();
    check_sync(collaborator.finish().await)?;
    println!("Ticket saved.");
    Ok(())
}

/// Surface the first failed background request.
fn check_sync(results: Vec<Result<(), SyncError>>) -> Result<()> {
    let failed = results.iter().filter(|r| r.is_err()).count();
    if let Some(Err(e)) = results.into_iter().find(Result::is_err) {
        return Err(anyhow::Error::new(e).context(format!("{failed} request(s) failed")));
    }
    Ok(())
}

fn load_ticket(path: &Path) -> Result<(TicketRecord, Option<String>)> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    parse_ticket(value).with_context(|| format!("decoding ticket in {}", path.display()))
}

/// Accepts a history row (has `id` and `details`), an upload response, or a bare record.
fn parse_ticket(value: Value) -> Result<(TicketRecord, Option<String>)> {
    let is_row = value.get("id").is_some() && value.get("details").is_some();
    if is_row {
        let row: StoredTicket = serde_json::from_value(value)?;
        let record = row.record()?;
        return Ok((record, Some(row.id)));
    }
    Ok((TicketRecord::from_upload_value(value)?, None))
}

fn read_ops(path: &Path) -> Result<Vec<EditOp>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_ops(&text).with_context(|| format!("parsing edits in {}", path.display()))
}

/// A JSON array of edits, or a single edit object.
fn parse_ops(text: &str) -> Result<Vec<EditOp>> {
    let value: Value = serde_json::from_str(text)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

fn write_record(record: &TicketRecord, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    match out {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "wrote ticket");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
