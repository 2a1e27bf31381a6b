//! Terminal rendering of contacts and drafts.
//!
//! Supports a table view and JSON for programmatic use.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{Contact, ExtractionDraft};

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compact table listing.
    #[default]
    Table,
    /// JSON format for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: table, json")),
        }
    }
}

/// Formats a table listing of contacts.
pub fn format_contacts_table(contacts: &[Contact]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "", "Name", "Company", "Phones", "Email"]);

    for c in contacts {
        let name = match (c.name.as_deref(), c.designation.as_deref()) {
            (Some(name), Some(title)) if !title.is_empty() => format!("{name} · {title}"),
            (Some(name), _) => name.to_string(),
            (None, _) => "—".to_string(),
        };
        let phones = c
            .phone_numbers
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        table.add_row(vec![
            short_id(c.id.as_str()),
            c.initials(),
            truncate(&name, 32),
            truncate(c.company.as_deref().unwrap_or_default(), 24),
            phones,
            c.email.clone().unwrap_or_default(),
        ]);
    }

    table.to_string()
}

/// Formats every field of one contact.
pub fn format_contact_detail(contact: &Contact) -> String {
    let mut out = format!(
        "{} {}\n",
        contact.name.as_deref().unwrap_or("(no name)").bold(),
        format!("[{}]", contact.id).dimmed()
    );

    let rows = [
        ("Designation", contact.designation.clone()),
        ("Company", contact.company.clone()),
        ("Phones", join_non_empty(&contact.phone_numbers)),
        ("Email", contact.email.clone()),
        ("Website", contact.website.clone()),
        ("Address", contact.address.clone()),
        ("Social", join_non_empty(&contact.social_links)),
        ("Details", contact.more_details.clone()),
        ("Notes", contact.additional_notes.clone()),
        ("Created", contact.created_at.clone()),
        ("Edited", contact.edited_at.clone()),
    ];
    for (label, value) in rows {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            out.push_str(&format!("  {:<12} {value}\n", format!("{label}:").cyan()));
        }
    }
    out
}

/// Formats an extraction draft for review; empty fields are shown as such.
pub fn format_draft(draft: &ExtractionDraft) -> String {
    let rows = [
        ("name", draft.name.clone()),
        ("designation", draft.designation.clone()),
        ("company", draft.company.clone()),
        ("phones", join_non_empty(&draft.phone_numbers)),
        ("email", draft.email.clone()),
        ("website", draft.website.clone()),
        ("address", draft.address.clone()),
        ("social", join_non_empty(&draft.social_links)),
        ("more_details", draft.more_details.clone()),
        ("notes", draft.additional_notes.clone()),
    ];

    let mut out = format!("{}\n", "📇 Extracted fields".bold());
    for (label, value) in rows {
        let value = value.map_or_else(|| "(empty)".dimmed().to_string(), |v| v);
        out.push_str(&format!("  {:<14} {value}\n", format!("{label}:")));
    }
    out
}

/// Formats contacts as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_contacts_json(contacts: &[Contact]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(contacts)
}

fn join_non_empty(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(", "))
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Truncates a string to max length (in characters) with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
