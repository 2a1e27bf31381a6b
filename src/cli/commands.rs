//! Command handlers shared by one-shot commands and the shell.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use colored::Colorize;

use crate::application::export::NOTHING_TO_EXPORT;
use crate::application::{
    format_contact_detail, format_contacts_json, format_contacts_table, format_draft,
    OutputFormat, Session,
};
use crate::domain::{AppConfig, AppError, ExtractionDraft, Result};
use crate::infrastructure::{ensure_config_exists, load_image, save_config, write_export, ApiClient};

use super::{ConfigAction, EditArgs, ExportKind, ListArgs};

/// Print the pending toast once, unless it has already expired.
pub fn print_toast(session: &mut Session<ApiClient>) {
    if let Some(message) = session.toast(Instant::now()) {
        println!("{} {message}", "✓".green().bold());
    }
    session.take_toast();
}

/// Print the last request the client sent.
pub fn print_last_request(session: &Session<ApiClient>) {
    match session.api().last_request() {
        Some(log) => println!("{}\n{log}", "🔎 Last request".bold()),
        None => println!("{}", "No request sent yet".dimmed()),
    }
}

/// Ask a yes/no question on the terminal; anything but y/yes is a no.
pub fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// List contacts command.
pub fn cmd_list(session: &mut Session<ApiClient>, args: &ListArgs, format: OutputFormat) -> Result<()> {
    let now = Instant::now();
    session.set_query(args.query.as_deref().unwrap_or_default(), now);
    session.flush_query();
    session.set_sort(args.sort);

    let mut list = session.visible(now);
    let total = list.len();
    if args.limit > 0 {
        list.truncate(args.limit);
    }

    match format {
        OutputFormat::Json => {
            println!("{}", format_contacts_json(&list).map_err(AppError::json_parse)?);
        }
        OutputFormat::Table => {
            if list.is_empty() {
                println!("{}", "No contacts".dimmed());
            } else {
                println!("{}", format_contacts_table(&list));
                println!(
                    "Showing {} of {} contact(s), sorted by {}",
                    list.len().to_string().cyan(),
                    total.to_string().cyan(),
                    session.sort()
                );
            }
        }
    }
    Ok(())
}

/// Show one contact in detail.
pub fn cmd_show(session: &Session<ApiClient>, id: &str, format: OutputFormat) -> Result<()> {
    let contact = session.find(id)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            format_contacts_json(std::slice::from_ref(contact)).map_err(AppError::json_parse)?
        ),
        OutputFormat::Table => print!("{}", format_contact_detail(contact)),
    }
    Ok(())
}

/// Apply edits to the draft under review.
pub fn apply_draft_edits(session: &mut Session<ApiClient>, edits: &EditArgs) -> Result<()> {
    for a in &edits.assignments {
        session.edit_draft(a.field, &a.value)?;
    }
    if let Some(phones) = &edits.phones {
        session.edit_draft_phones(phones)?;
    }
    if let Some(links) = &edits.links {
        session.edit_draft_links(links)?;
    }
    Ok(())
}

fn current_draft(session: &Session<ApiClient>) -> ExtractionDraft {
    session.workflow().draft().cloned().unwrap_or_default()
}

/// Extract, review and save a card.
pub async fn cmd_extract(
    session: &mut Session<ApiClient>,
    image: Option<&Path>,
    edits: &EditArgs,
    yes: bool,
) -> Result<()> {
    let upload = image.map(load_image).transpose()?;

    println!("{}", "⏳ Extracting...".dimmed());
    session.extract(upload.as_ref()).await?;
    print_toast(session);

    apply_draft_edits(session, edits)?;
    println!();
    print!("{}", format_draft(&current_draft(session)));
    println!();

    if !yes && !confirm("Save this contact?") {
        session.cancel_extract();
        println!("{}", "Discarded".yellow());
        return Ok(());
    }

    session.save_draft().await?;
    print_toast(session);
    if let Some(err) = session.error() {
        eprintln!("{} {err}", "Warning:".yellow().bold());
    }
    Ok(())
}

/// Edit a saved contact.
pub async fn cmd_edit(session: &mut Session<ApiClient>, id: &str, edits: &EditArgs) -> Result<()> {
    session.edit(id, &edits.to_patch()).await?;
    print_toast(session);
    print!("{}", format_contact_detail(session.find(id)?));
    Ok(())
}

/// Delete a contact after confirmation.
pub async fn cmd_delete(session: &mut Session<ApiClient>, id: &str, yes: bool) -> Result<()> {
    let deleted = session
        .delete(id, |contact| {
            yes || confirm(&format!(
                "Delete contact {}?",
                contact.name.as_deref().unwrap_or(contact.id.as_str())
            ))
        })
        .await?;

    if deleted {
        print_toast(session);
    } else {
        println!("{}", "Cancelled".yellow());
    }
    Ok(())
}

/// Download a contact's vCard from the backend.
pub async fn cmd_vcard(session: &mut Session<ApiClient>, id: &str, dir: &Path) -> Result<()> {
    let file = session.download_vcard(id).await?;
    let path = write_export(dir, &file)?;
    print_toast(session);
    println!("  → {}", path.display());
    Ok(())
}

/// Export all contacts.
pub fn cmd_export(
    session: &mut Session<ApiClient>,
    kind: ExportKind,
    dir: &Path,
    csv: bool,
) -> Result<()> {
    let today = Utc::now().date_naive();
    let file = match kind {
        ExportKind::Vcf => session.export_all_vcards(today),
        ExportKind::Sheet => session.export_spreadsheet(today, csv)?,
    };

    let Some(file) = file else {
        println!("{}", NOTHING_TO_EXPORT.yellow());
        session.take_toast();
        return Ok(());
    };

    let path = write_export(dir, &file)?;
    print_toast(session);
    println!(
        "  → {} ({} contact(s))",
        path.display(),
        session.store().len()
    );
    Ok(())
}

/// Health check command.
pub async fn cmd_ping(session: &mut Session<ApiClient>) -> Result<()> {
    let pong = session.ping().await?;
    println!(
        "{} Ping OK — server {}",
        "✓".green().bold(),
        pong.time.unwrap_or_default()
    );
    Ok(())
}

/// Shown wherever a stored extraction key is reported.
const PLAINTEXT_KEY_NOTICE: &str =
    "The key is stored in plaintext in the config file; use `extract --api-key` to keep it out of it.";

/// How `config show` reports the extraction key; never prints the key itself.
fn api_key_status(config: &AppConfig) -> String {
    match config.backend.api_key.as_deref() {
        Some(key) if !key.is_empty() => format!(
            "{} ({})",
            "set".green(),
            "stored in plaintext in the config file".yellow()
        ),
        _ => "not set".dimmed().to_string(),
    }
}

/// Configuration command; runs without contacting the backend.
pub fn cmd_config(config: &mut AppConfig, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", "⚙ Configuration".bold());
            println!("  File:     {}", AppConfig::config_file_path().display());
            println!("  Backend:  {}", config.api_base().cyan());
            println!("  API key:  {}", api_key_status(config));
            println!("  Debounce: {} ms", config.ui.search_debounce_ms);
            println!("  Toasts:   {} s", config.ui.toast_secs);
        }
        ConfigAction::Init => {
            let path = ensure_config_exists()?;
            println!("{} Config at {}", "✓".green().bold(), path.display());
        }
        ConfigAction::SetBackend { url } => {
            config.set_api_base(url);
            save_config(config)?;
            println!("{} Backend saved: {}", "✓".green().bold(), config.api_base());
        }
        ConfigAction::SetApiKey { key } => {
            config.backend.api_key = Some(key.trim().to_string()).filter(|k| !k.is_empty());
            save_config(config)?;
            println!("{} API key saved", "✓".green().bold());
            if config.backend.api_key.is_some() {
                println!("{}", PLAINTEXT_KEY_NOTICE.yellow());
            }
        }
    }
    Ok(())
}
