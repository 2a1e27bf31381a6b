//! Interactive shell.
//!
//! Keeps one session alive so the list, the search query and an extraction
//! under review survive between commands.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use colored::Colorize;

use crate::application::{
    format_contacts_json, format_contacts_table, format_draft, OutputFormat, Session,
    SpreadsheetCapability, Tab,
};
use crate::domain::{AppError, FieldAssignment, Result, SortMode};
use crate::infrastructure::{load_image, save_config, ApiClient};

use super::commands::{
    apply_draft_edits, cmd_delete, cmd_edit, cmd_export, cmd_ping, cmd_show, cmd_vcard,
    print_last_request, print_toast,
};
use super::{EditArgs, ExportKind};

/// One line typed at the shell prompt.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
enum ShellCommand {
    /// Show the list with the current search and sort.
    #[command(alias = "ls")]
    List,

    /// Filter by name, company or email (no text clears the filter).
    #[command(alias = "s")]
    Search { text: Vec<String> },

    /// Sort order: recent, alpha or company.
    Sort { mode: SortMode },

    /// Reload contacts from the backend.
    Refresh,

    /// Show every field of one contact.
    Show { id: String },

    /// Delete a contact.
    #[command(alias = "rm")]
    Delete {
        id: String,
        #[arg(short, long)]
        yes: bool,
    },

    /// Edit a saved contact.
    Edit {
        id: String,
        #[command(flatten)]
        edits: EditArgs,
    },

    /// Upload a card image and start reviewing it.
    Extract { image: PathBuf },

    /// Set a field of the draft under review, e.g. `set name=Ada`.
    Set { assignment: FieldAssignment },

    /// Replace the draft's phone numbers (comma-separated).
    Phones { text: Vec<String> },

    /// Replace the draft's social links (comma-separated).
    Links { text: Vec<String> },

    /// Show the draft under review.
    Draft,

    /// Save the draft as a contact.
    Save,

    /// Discard the draft.
    Cancel,

    /// Export all contacts.
    Export {
        #[arg(value_enum)]
        kind: ExportKind,
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        csv: bool,
    },

    /// Download one contact's vCard from the backend.
    Vcard {
        id: String,
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Switch to another backend and remember it.
    Backend { url: String },

    /// Show the last request sent to the backend.
    Debug,

    /// Check that the backend is reachable.
    Ping,

    /// Leave the shell.
    #[command(alias = "exit", alias = "q")]
    Quit,
}

/// Run the shell until `quit` or end of input.
///
/// # Errors
/// Returns error only if the terminal cannot be read.
pub async fn run_shell(
    session: &mut Session<ApiClient>,
    format: OutputFormat,
    show_request: bool,
) -> Result<()> {
    println!("{}", "📇 cardscan shell".bold());
    println!("Backend: {}", session.api().base().cyan());
    let sheet = match session.capability() {
        SpreadsheetCapability::SpreadsheetAvailable => "xlsx",
        SpreadsheetCapability::CsvOnly => "csv",
    };
    println!("Spreadsheet export: {sheet}");
    println!("Type {} for commands.\n", "help".cyan());

    if let Err(e) = session.refresh().await {
        eprintln!("{} {e}", "Error:".red().bold());
    }
    print_view(session, format);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{}", prompt(session.tab()));
        io::stdout()
            .flush()
            .map_err(|e| AppError::io("Failed to write prompt", e))?;

        line.clear();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .map_err(|e| AppError::io("Failed to read input", e))?;
        if read == 0 {
            println!();
            break;
        }

        let args = split_args(&line);
        if args.is_empty() {
            continue;
        }

        let command = match ShellCommand::try_parse_from(&args) {
            Ok(command) => command,
            Err(e) => {
                // Covers `help` too.
                let _ = e.print();
                continue;
            }
        };

        tracing::debug!(?command, "Shell command");
        match execute(session, command, format).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => eprintln!("{} {e}", "Error:".red().bold()),
        }
        if show_request {
            print_last_request(session);
        }
    }

    Ok(())
}

enum Flow {
    Continue,
    Quit,
}

fn prompt(tab: Tab) -> String {
    match tab {
        Tab::Contacts => format!("{} ", "cardscan>".green().bold()),
        Tab::Extract => format!("{} ", "cardscan[review]>".yellow().bold()),
    }
}

async fn execute(
    session: &mut Session<ApiClient>,
    command: ShellCommand,
    format: OutputFormat,
) -> Result<Flow> {
    match command {
        ShellCommand::List => print_view(session, format),
        ShellCommand::Search { text } => {
            session.set_query(&text.join(" "), Instant::now());
            session.flush_query();
            print_view(session, format);
        }
        ShellCommand::Sort { mode } => {
            session.set_sort(mode);
            print_view(session, format);
        }
        ShellCommand::Refresh => {
            session.refresh().await?;
            print_view(session, format);
        }
        ShellCommand::Show { id } => cmd_show(session, &id, format)?,
        ShellCommand::Delete { id, yes } => cmd_delete(session, &id, yes).await?,
        ShellCommand::Edit { id, edits } => cmd_edit(session, &id, &edits).await?,
        ShellCommand::Extract { image } => {
            let upload = load_image(&image)?;
            println!("{}", "⏳ Extracting...".dimmed());
            session.extract(Some(&upload)).await?;
            print_toast(session);
            print_draft(session);
            println!(
                "Edit with {}, then {} or {}.",
                "set field=value".cyan(),
                "save".cyan(),
                "cancel".cyan()
            );
        }
        ShellCommand::Set { assignment } => {
            let edits = EditArgs {
                assignments: vec![assignment],
                ..Default::default()
            };
            apply_draft_edits(session, &edits)?;
        }
        ShellCommand::Phones { text } => session.edit_draft_phones(&text.join(" "))?,
        ShellCommand::Links { text } => session.edit_draft_links(&text.join(" "))?,
        ShellCommand::Draft => print_draft(session),
        ShellCommand::Save => {
            session.save_draft().await?;
            print_toast(session);
            if let Some(err) = session.error() {
                eprintln!("{} {err}", "Warning:".yellow().bold());
            }
            print_view(session, format);
        }
        ShellCommand::Cancel => {
            session.cancel_extract();
            println!("{}", "Discarded".yellow());
        }
        ShellCommand::Export { kind, dir, csv } => cmd_export(session, kind, &dir, csv)?,
        ShellCommand::Vcard { id, dir } => cmd_vcard(session, &id, &dir).await?,
        ShellCommand::Backend { url } => {
            session.change_backend(&url).await?;
            save_config(session.config())?;
            println!(
                "{} Backend: {} ({} contact(s))",
                "✓".green().bold(),
                session.api().base().cyan(),
                session.store().len()
            );
        }
        ShellCommand::Debug => print_last_request(session),
        ShellCommand::Ping => cmd_ping(session).await?,
        ShellCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn print_view(session: &mut Session<ApiClient>, format: OutputFormat) {
    if session.store().is_loading() {
        println!("{}", "Loading...".dimmed());
        return;
    }
    let list = session.visible(Instant::now());
    if list.is_empty() {
        println!("{}", "No contacts".dimmed());
        return;
    }
    match format {
        OutputFormat::Table => {
            println!("{}", format_contacts_table(&list));
            println!(
                "{} of {} contact(s), sorted by {}",
                list.len().to_string().cyan(),
                session.store().len().to_string().cyan(),
                session.sort()
            );
        }
        OutputFormat::Json => match format_contacts_json(&list) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("{} {e}", "Error:".red().bold()),
        },
    }
}

fn print_draft(session: &Session<ApiClient>) {
    match session.workflow().draft() {
        Some(draft) => print!("{}", format_draft(draft)),
        None => println!(
            "{}",
            format!("Nothing under review ({})", session.workflow().state().name()).dimmed()
        ),
    }
}

/// Split a shell line into words; single or double quotes group words.
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_word = false;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if in_word {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContactField;

    #[test]
    fn test_split_args_quotes() {
        assert_eq!(
            split_args(r#"set name="Ada Lovelace"  "#),
            vec!["set", "name=Ada Lovelace"]
        );
        assert_eq!(split_args("search 'acme corp'"), vec!["search", "acme corp"]);
        assert_eq!(split_args("search \"\""), vec!["search", ""]);
        assert!(split_args("   \n").is_empty());
    }

    #[test]
    fn test_parse_shell_commands() {
        let cmd = ShellCommand::try_parse_from(split_args("set company=Engines")).unwrap();
        let ShellCommand::Set { assignment } = cmd else {
            panic!("expected set");
        };
        assert_eq!(assignment.field, ContactField::Company);

        assert!(matches!(
            ShellCommand::try_parse_from(["sort", "alpha"]).unwrap(),
            ShellCommand::Sort { mode: SortMode::Alpha }
        ));
        assert!(matches!(
            ShellCommand::try_parse_from(["exit"]).unwrap(),
            ShellCommand::Quit
        ));
        assert!(ShellCommand::try_parse_from(["sort", "sideways"]).is_err());
    }

    #[test]
    fn test_prompt_follows_tab() {
        colored::control::set_override(false);
        assert_eq!(prompt(Tab::Contacts), "cardscan> ");
        assert_eq!(prompt(Tab::Extract), "cardscan[review]> ");
    }
}
