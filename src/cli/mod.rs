//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool, plus the
//! interactive shell that reuses the same command handlers.

pub mod commands;
pub mod shell;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::application::OutputFormat;
use crate::domain::{ContactPatch, FieldAssignment, SortMode};

/// cardscan - scan business cards and manage the extracted contacts.
///
/// Quick start: cardscan extract card.jpg | list -q acme | export vcf
#[derive(Parser, Debug)]
#[command(name = "cardscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: table or json.
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Backend base URL for this run (not saved).
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Print the last request sent to the backend after the command.
    #[arg(long, global = true)]
    pub show_request: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List contacts.
    List(ListArgs),

    /// Show every field of one contact.
    Show {
        /// Contact ID (full or unique prefix).
        id: String,
    },

    /// Upload a card image, review the extracted fields and save them.
    Extract {
        /// Image of the business card.
        image: Option<PathBuf>,

        /// Bearer key for the extraction service (overrides config).
        #[arg(long)]
        api_key: Option<String>,

        #[command(flatten)]
        edits: EditArgs,

        /// Save without asking for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Edit a saved contact.
    Edit {
        /// Contact ID (full or unique prefix).
        id: String,

        #[command(flatten)]
        edits: EditArgs,
    },

    /// Delete a contact.
    Delete {
        /// Contact ID (full or unique prefix).
        id: String,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Download one contact's vCard from the backend.
    Vcard {
        /// Contact ID (full or unique prefix).
        id: String,

        /// Output directory.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Export all contacts to a file.
    Export {
        /// What to export.
        #[arg(value_enum)]
        kind: ExportKind,

        /// Output directory.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Write CSV even when .xlsx is available.
        #[arg(long)]
        csv: bool,
    },

    /// Check that the backend is reachable.
    Ping,

    /// Show or change the saved configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Interactive shell over one session.
    Shell,
}

/// Filters for listing contacts.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only contacts whose name, company or email contains this text.
    #[arg(short, long)]
    pub query: Option<String>,

    /// Sort order: recent, alpha or company.
    #[arg(short, long, default_value = "recent")]
    pub sort: SortMode,

    /// Maximum number of contacts to show (0 = all).
    #[arg(short, long, default_value = "0")]
    pub limit: usize,
}

/// Field edits shared by `extract` and `edit`.
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Set a field, e.g. `--set name="Ada Lovelace"` (repeatable).
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub assignments: Vec<FieldAssignment>,

    /// Phone numbers, comma-separated.
    #[arg(long)]
    pub phones: Option<String>,

    /// Social links, comma-separated.
    #[arg(long)]
    pub links: Option<String>,
}

impl EditArgs {
    /// Build an update body from the edits.
    #[must_use]
    pub fn to_patch(&self) -> ContactPatch {
        let mut patch = ContactPatch::default();
        for a in &self.assignments {
            patch.set(a.field, &a.value);
        }
        patch.phone_numbers = self.phones.as_deref().map(crate::domain::parse_list_text);
        patch.social_links = self.links.as_deref().map(crate::domain::parse_list_text);
        patch
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// All contacts as one .vcf file.
    Vcf,
    /// Spreadsheet (.xlsx, or .csv as fallback).
    Sheet,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Write a commented default config file.
    Init,
    /// Save the backend base URL.
    SetBackend { url: String },
    /// Save the bearer key used for extraction (kept in plaintext).
    SetApiKey { key: String },
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}
