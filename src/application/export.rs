//! Export of the contact list to downloadable files.
//!
//! Everything here is a pure transformation from contacts to bytes; writing
//! the result to disk is left to the caller.

use chrono::NaiveDate;

use crate::domain::{AppError, Contact, Result};

/// Spreadsheet columns, in order.
pub const COLUMNS: [&str; 10] = [
    "Name",
    "Designation",
    "Company",
    "Phones",
    "Email",
    "Website",
    "Address",
    "CreatedAt",
    "EditedAt",
    "Notes",
];

/// Message used when there is nothing to export.
pub const NOTHING_TO_EXPORT: &str = "No contacts to export";

/// A generated file ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Which spreadsheet encoding this build can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetCapability {
    /// Native `.xlsx` workbooks.
    SpreadsheetAvailable,
    /// Plain CSV only.
    CsvOnly,
}

impl SpreadsheetCapability {
    /// Resolve the capability of this build.
    #[must_use]
    pub const fn detect() -> Self {
        if cfg!(feature = "xlsx") {
            Self::SpreadsheetAvailable
        } else {
            Self::CsvOnly
        }
    }
}

/// Encode one contact as vCard 3.0 text. Absent or empty fields are omitted.
///
/// Text values are escaped per RFC 2426 so every value stays on its own
/// property line.
#[must_use]
pub fn vcard_text(contact: &Contact) -> String {
    let mut lines = vec!["BEGIN:VCARD".to_string(), "VERSION:3.0".to_string()];

    let mut push = |prefix: &str, value: Option<&str>, escape: fn(&str) -> String| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            lines.push(format!("{prefix}{}", escape(value)));
        }
    };
    push("FN:", contact.name.as_deref(), escape_vcard_text);
    push("ORG:", contact.company.as_deref(), escape_vcard_text);
    push("TITLE:", contact.designation.as_deref(), escape_vcard_text);
    push("TEL;TYPE=WORK,VOICE:", contact.first_phone(), escape_vcard_text);
    push("EMAIL;TYPE=WORK:", contact.email.as_deref(), escape_vcard_text);
    push("URL:", contact.website.as_deref(), escape_vcard_line_breaks);
    push("ADR;TYPE=WORK:;;", contact.address.as_deref(), escape_vcard_text);

    lines.push("END:VCARD".to_string());
    lines.join("\n")
}

/// Escape a vCard text value: backslash, comma, semicolon and line breaks.
fn escape_vcard_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

/// URIs are not text-escaped, but a line break would still split the property.
fn escape_vcard_line_breaks(value: &str) -> String {
    value.replace("\r\n", "\\n").replace(['\r', '\n'], "\\n")
}

/// All contacts as one `.vcf` file, or `None` when there are none.
#[must_use]
pub fn export_all_vcards(contacts: &[Contact], date: NaiveDate) -> Option<ExportFile> {
    if contacts.is_empty() {
        return None;
    }
    let text = contacts
        .iter()
        .map(vcard_text)
        .collect::<Vec<_>>()
        .join("\n");

    Some(ExportFile {
        file_name: dated_name("vcf", date),
        mime: "text/vcard;charset=utf-8",
        bytes: text.into_bytes(),
    })
}

/// File name for a single contact's vCard.
#[must_use]
pub fn contact_vcf_filename(contact: &Contact) -> String {
    let name = contact
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(
            || "contact".to_string(),
            |n| n.split_whitespace().collect::<Vec<_>>().join("_"),
        );
    format!("{name}.vcf")
}

/// Map contacts to spreadsheet rows.
#[must_use]
pub fn spreadsheet_rows(contacts: &[Contact]) -> Vec<[String; 10]> {
    contacts
        .iter()
        .map(|c| {
            let text = |v: &Option<String>| v.clone().unwrap_or_default();
            [
                text(&c.name),
                text(&c.designation),
                text(&c.company),
                c.phone_numbers.join("; "),
                text(&c.email),
                text(&c.website),
                text(&c.address),
                text(&c.created_at),
                text(&c.edited_at),
                c.notes().to_string(),
            ]
        })
        .collect()
}

/// Export the list as a spreadsheet, or CSV when that is all we can write.
///
/// # Errors
/// Returns `Export` for an empty list, or an encoding error.
pub fn export_spreadsheet(
    contacts: &[Contact],
    capability: SpreadsheetCapability,
    date: NaiveDate,
) -> Result<ExportFile> {
    if contacts.is_empty() {
        return Err(AppError::Export {
            message: NOTHING_TO_EXPORT.to_string(),
        });
    }
    let rows = spreadsheet_rows(contacts);

    match capability {
        SpreadsheetCapability::SpreadsheetAvailable => xlsx_file(&rows, date),
        SpreadsheetCapability::CsvOnly => Ok(ExportFile {
            file_name: dated_name("csv", date),
            mime: "text/csv;charset=utf-8",
            bytes: csv_text(&rows)?.into_bytes(),
        }),
    }
}

/// Encode rows as CSV with a header line.
///
/// Fields containing a comma, quote or line break are quoted, with inner
/// quotes doubled.
///
/// # Errors
/// Returns error if the writer fails.
pub fn csv_text(rows: &[[String; 10]]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(COLUMNS).map_err(csv_error)?;
    for row in rows {
        writer.write_record(row).map_err(csv_error)?;
    }

    let bytes = writer.into_inner().map_err(|e| AppError::Export {
        message: format!("Failed to finish CSV: {e}"),
    })?;
    String::from_utf8(bytes).map_err(|e| AppError::Export {
        message: format!("CSV is not valid UTF-8: {e}"),
    })
}

fn csv_error(err: csv::Error) -> AppError {
    AppError::Export {
        message: format!("Failed to write CSV: {err}"),
    }
}

#[cfg(feature = "xlsx")]
fn xlsx_file(rows: &[[String; 10]], date: NaiveDate) -> Result<ExportFile> {
    use rust_xlsxwriter::{Format, Workbook, XlsxError};

    fn xlsx_error(err: XlsxError) -> AppError {
        AppError::Spreadsheet {
            message: err.to_string(),
        }
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Contacts").map_err(xlsx_error)?;

    for (col, title) in (0u16..).zip(COLUMNS) {
        sheet
            .write_string_with_format(0, col, title, &header)
            .map_err(xlsx_error)?;
    }
    for (row, values) in (1u32..).zip(rows) {
        for (col, value) in (0u16..).zip(values) {
            sheet
                .write_string(row, col, value.as_str())
                .map_err(xlsx_error)?;
        }
    }

    let bytes = workbook.save_to_buffer().map_err(xlsx_error)?;
    Ok(ExportFile {
        file_name: dated_name("xlsx", date),
        mime: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        bytes,
    })
}

#[cfg(not(feature = "xlsx"))]
fn xlsx_file(rows: &[[String; 10]], date: NaiveDate) -> Result<ExportFile> {
    tracing::warn!("Built without xlsx support, writing CSV instead");
    Ok(ExportFile {
        file_name: dated_name("csv", date),
        mime: "text/csv;charset=utf-8",
        bytes: csv_text(rows)?.into_bytes(),
    })
}

fn dated_name(ext: &str, date: NaiveDate) -> String {
    format!("contacts_{}.{ext}", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContactId;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn full_contact() -> Contact {
        Contact {
            id: ContactId::new("1"),
            name: Some("Ada Lovelace".into()),
            designation: Some("Analyst".into()),
            company: Some("Engines, Ltd".into()),
            phone_numbers: vec!["+44 20 0000".into(), "+44 20 0001".into()],
            email: Some("ada@example.com".into()),
            website: Some("https://example.com".into()),
            address: Some("12 St James's Sq".into()),
            additional_notes: Some("met at \"expo\"\nfollow up".into()),
            created_at: Some("2026-01-01".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_vcard_full() {
        assert_eq!(
            vcard_text(&full_contact()),
            "BEGIN:VCARD\nVERSION:3.0\nFN:Ada Lovelace\nORG:Engines\\, Ltd\nTITLE:Analyst\n\
             TEL;TYPE=WORK,VOICE:+44 20 0000\nEMAIL;TYPE=WORK:ada@example.com\n\
             URL:https://example.com\nADR;TYPE=WORK:;;12 St James's Sq\nEND:VCARD"
        );
    }

    #[test]
    fn test_vcard_omits_missing_fields() {
        let contact = Contact {
            name: Some("Solo".into()),
            email: Some(String::new()),
            phone_numbers: vec![String::new()],
            ..Default::default()
        };
        let text = vcard_text(&contact);
        assert_eq!(text, "BEGIN:VCARD\nVERSION:3.0\nFN:Solo\nEND:VCARD");
        assert!(text.lines().all(|l| !l.ends_with(':')));
    }

    #[test]
    fn test_vcard_escapes_multiline_values() {
        let contact = Contact {
            name: Some("Ada; Countess".into()),
            address: Some("12 St James's Sq\r\nLondon\nSW1".into()),
            website: Some("https://example.com/a,b\n".into()),
            ..Default::default()
        };
        let text = vcard_text(&contact);

        assert!(text.contains("FN:Ada\\; Countess\n"));
        assert!(text.contains("ADR;TYPE=WORK:;;12 St James's Sq\\nLondon\\nSW1\n"));
        assert!(text.contains("URL:https://example.com/a,b\\n\n"));
        let known = ["BEGIN:", "VERSION:", "FN:", "URL:", "ADR;", "END:"];
        assert!(text
            .lines()
            .all(|l| known.iter().any(|p| l.starts_with(p))));
    }

    #[test]
    fn test_export_all_vcards() {
        assert!(export_all_vcards(&[], date()).is_none());

        let contacts = vec![full_contact(), Contact::default()];
        let file = export_all_vcards(&contacts, date()).unwrap();
        let text = String::from_utf8(file.bytes).unwrap();

        assert_eq!(file.file_name, "contacts_2026-10-16.vcf");
        assert_eq!(text.matches("BEGIN:VCARD").count(), 2);
        assert!(text.contains("END:VCARD\nBEGIN:VCARD"));
    }

    #[test]
    fn test_contact_vcf_filename() {
        assert_eq!(contact_vcf_filename(&full_contact()), "Ada_Lovelace.vcf");
        assert_eq!(contact_vcf_filename(&Contact::default()), "contact.vcf");
    }

    #[test]
    fn test_rows_join_phones_and_pick_notes() {
        let rows = spreadsheet_rows(&[full_contact()]);
        assert_eq!(rows[0][3], "+44 20 0000; +44 20 0001");
        assert_eq!(rows[0][8], "");
        assert_eq!(rows[0][9], "met at \"expo\"\nfollow up");
    }

    #[test]
    fn test_csv_quoting_and_round_trip() {
        let rows = spreadsheet_rows(&[full_contact()]);
        let text = csv_text(&rows).unwrap();

        assert!(text.starts_with("Name,Designation,Company,Phones,"));
        assert!(text.contains("\"Engines, Ltd\""));
        assert!(text.contains("\"met at \"\"expo\"\"\nfollow up\""));
        assert!(text.contains(",Ada Lovelace,") || text.contains("\nAda Lovelace,"));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect();
        assert_eq!(headers, COLUMNS);

        let parsed: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        assert_eq!(parsed, vec![rows[0].to_vec()]);
    }

    #[test]
    fn test_spreadsheet_empty_is_export_error() {
        let err = export_spreadsheet(&[], SpreadsheetCapability::CsvOnly, date()).unwrap_err();
        assert_eq!(err.to_string(), NOTHING_TO_EXPORT);
    }

    #[test]
    fn test_csv_only_export() {
        let file =
            export_spreadsheet(&[full_contact()], SpreadsheetCapability::CsvOnly, date()).unwrap();
        assert_eq!(file.file_name, "contacts_2026-10-16.csv");
        assert!(file.mime.starts_with("text/csv"));
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_xlsx_export_is_zip() {
        assert_eq!(
            SpreadsheetCapability::detect(),
            SpreadsheetCapability::SpreadsheetAvailable
        );
        let file = export_spreadsheet(
            &[full_contact()],
            SpreadsheetCapability::SpreadsheetAvailable,
            date(),
        )
        .unwrap();
        assert_eq!(file.file_name, "contacts_2026-10-16.xlsx");
        assert_eq!(&file.bytes[..2], b"PK");
    }
}
