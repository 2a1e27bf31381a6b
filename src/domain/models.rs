//! Domain models for contacts and extraction drafts.
//!
//! These mirror the backend's JSON shapes. Incoming bodies are coerced at the
//! boundary: nulls become absent, scalar lists may arrive as one
//! comma-separated string, and unknown fields are dropped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::AppError;

/// Prefix reserved for client-side placeholder identifiers.
pub const TEMP_ID_PREFIX: &str = "tmp-";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier of a contact record.
///
/// Server identifiers are opaque strings. Placeholders created during an
/// optimistic insert always start with [`TEMP_ID_PREFIX`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ContactId(String);

impl ContactId {
    /// Wrap a server-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocate a fresh placeholder identifier.
    #[must_use]
    pub fn temporary() -> Self {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{TEMP_ID_PREFIX}{}-{n}",
            Utc::now().timestamp_millis()
        ))
    }

    /// Whether this is a client placeholder not yet confirmed by the server.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted business-card contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Contact {
    #[serde(rename = "_id", default)]
    pub id: ContactId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub designation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub phone_numbers: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub social_links: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub more_details: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub additional_notes: Option<String>,
    /// Server-assigned creation timestamp, passed through as received.
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    /// Server-assigned last-edit timestamp.
    #[serde(default, deserialize_with = "lenient_string")]
    pub edited_at: Option<String>,
}

impl Contact {
    /// Build a placeholder record for an optimistic insert.
    #[must_use]
    pub fn from_payload(id: ContactId, payload: &ContactPayload) -> Self {
        Self {
            id,
            name: payload.name.clone(),
            designation: payload.designation.clone(),
            company: payload.company.clone(),
            phone_numbers: payload.phone_numbers.clone(),
            email: payload.email.clone(),
            website: payload.website.clone(),
            address: payload.address.clone(),
            social_links: payload.social_links.clone(),
            more_details: non_empty(&payload.more_details),
            additional_notes: non_empty(&payload.additional_notes),
            created_at: None,
            edited_at: None,
        }
    }

    /// First phone number, if any non-empty one exists.
    #[must_use]
    pub fn first_phone(&self) -> Option<&str> {
        self.phone_numbers
            .first()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Notes column: additional notes, else more details.
    #[must_use]
    pub fn notes(&self) -> &str {
        present(self.additional_notes.as_deref())
            .or_else(|| present(self.more_details.as_deref()))
            .unwrap_or("")
    }

    /// Up to two uppercase initials from the name, `?` when unnamed.
    #[must_use]
    pub fn initials(&self) -> String {
        let Some(name) = present(self.name.as_deref()) else {
            return "?".to_string();
        };
        name.split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect()
    }
}

/// Scalar fields of a contact that can be edited directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Name,
    Designation,
    Company,
    Email,
    Website,
    Address,
    MoreDetails,
    AdditionalNotes,
}

impl std::str::FromStr for ContactField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "name" => Ok(Self::Name),
            "designation" | "title" => Ok(Self::Designation),
            "company" | "org" => Ok(Self::Company),
            "email" => Ok(Self::Email),
            "website" | "url" => Ok(Self::Website),
            "address" => Ok(Self::Address),
            "more_details" => Ok(Self::MoreDetails),
            "additional_notes" | "notes" => Ok(Self::AdditionalNotes),
            _ => Err(format!(
                "Unknown field: {s}. Use: name, designation, company, email, website, address, more_details, additional_notes"
            )),
        }
    }
}

/// A `field=value` assignment given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAssignment {
    pub field: ContactField,
    pub value: String,
}

impl std::str::FromStr for FieldAssignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, value) = s
            .split_once('=')
            .ok_or_else(|| format!("Expected field=value, got: {s}"))?;
        Ok(Self {
            field: field.parse()?,
            value: value.to_string(),
        })
    }
}

/// Extraction result held for review before it becomes a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExtractionDraft {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub designation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub phone_numbers: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub social_links: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub more_details: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub additional_notes: Option<String>,
}

impl ExtractionDraft {
    /// Set a scalar field; an empty value clears it.
    pub fn set(&mut self, field: ContactField, value: &str) {
        let value = non_empty(value);
        match field {
            ContactField::Name => self.name = value,
            ContactField::Designation => self.designation = value,
            ContactField::Company => self.company = value,
            ContactField::Email => self.email = value,
            ContactField::Website => self.website = value,
            ContactField::Address => self.address = value,
            ContactField::MoreDetails => self.more_details = value,
            ContactField::AdditionalNotes => self.additional_notes = value,
        }
    }

    /// Package into a creation payload with the backend's defaults.
    #[must_use]
    pub fn to_payload(&self) -> ContactPayload {
        ContactPayload {
            name: self.name.clone().filter(|s| !s.is_empty()),
            designation: self.designation.clone().filter(|s| !s.is_empty()),
            company: self.company.clone().filter(|s| !s.is_empty()),
            phone_numbers: self.phone_numbers.clone(),
            email: self.email.clone().filter(|s| !s.is_empty()),
            website: self.website.clone().filter(|s| !s.is_empty()),
            address: self.address.clone().filter(|s| !s.is_empty()),
            social_links: self.social_links.clone(),
            more_details: self.more_details.clone().unwrap_or_default(),
            additional_notes: self.additional_notes.clone().unwrap_or_default(),
        }
    }
}

/// Body of `POST /create_card`.
///
/// Absent scalars serialize as `null`, lists as `[]`, notes as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContactPayload {
    pub name: Option<String>,
    pub designation: Option<String>,
    pub company: Option<String>,
    pub phone_numbers: Vec<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub social_links: Vec<String>,
    pub more_details: String,
    pub additional_notes: String,
}

/// Body of `PATCH /update_card/{id}`. Only present fields are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ContactPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_numbers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_links: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

impl ContactPatch {
    /// Set a scalar field to a new value.
    pub fn set(&mut self, field: ContactField, value: &str) {
        let value = Some(value.to_string());
        match field {
            ContactField::Name => self.name = value,
            ContactField::Designation => self.designation = value,
            ContactField::Company => self.company = value,
            ContactField::Email => self.email = value,
            ContactField::Website => self.website = value,
            ContactField::Address => self.address = value,
            ContactField::MoreDetails => self.more_details = value,
            ContactField::AdditionalNotes => self.additional_notes = value,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Body of `POST /vcard`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VcardRequest {
    pub name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
}

impl From<&Contact> for VcardRequest {
    fn from(c: &Contact) -> Self {
        Self {
            name: c.name.clone(),
            company: c.company.clone(),
            title: c.designation.clone(),
            phone: c.first_phone().map(str::to_string),
            email: c.email.clone(),
            website: c.website.clone(),
            address: c.address.clone(),
        }
    }
}

/// Body of `GET /all_cards`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CardList {
    #[serde(default)]
    pub data: Option<Vec<Contact>>,
}

impl CardList {
    /// The records, provided every one carries a distinct `_id`.
    ///
    /// # Errors
    /// Returns `UnexpectedResponse` for a record without an id or a repeated id.
    pub fn into_contacts(self) -> super::Result<Vec<Contact>> {
        let contacts = self.data.unwrap_or_default();
        let mut seen = HashSet::with_capacity(contacts.len());
        for (index, contact) in contacts.iter().enumerate() {
            if contact.id.as_str().trim().is_empty() {
                return Err(AppError::UnexpectedResponse {
                    message: format!("card #{index} has no _id"),
                });
            }
            if !seen.insert(contact.id.as_str()) {
                return Err(AppError::UnexpectedResponse {
                    message: format!("duplicate card id {}", contact.id),
                });
            }
        }
        Ok(contacts)
    }
}

/// Body of `GET /ping`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PingResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: Option<String>,
}

/// An image selected for extraction.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Split comma-separated input into trimmed, non-empty entries.
#[must_use]
pub fn parse_list_text(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn present(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Accept a string or any JSON scalar; null, arrays and objects become absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accept a list of scalars or one comma-separated string.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => parse_list_text(&s),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_card_list_rejects_missing_ids() {
        let list: CardList =
            serde_json::from_value(json!({"data": [{"name": "a"}, {"name": "b"}]})).unwrap();
        assert!(matches!(
            list.into_contacts(),
            Err(AppError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn test_card_list_rejects_duplicate_ids() {
        let list: CardList = serde_json::from_value(
            json!({"data": [{"_id": "1", "name": "a"}, {"_id": "1", "name": "b"}]}),
        )
        .unwrap();
        assert!(list.into_contacts().is_err());

        let list: CardList =
            serde_json::from_value(json!({"data": [{"_id": "1"}, {"_id": "2"}]})).unwrap();
        assert_eq!(list.into_contacts().unwrap().len(), 2);

        let empty: CardList = serde_json::from_value(json!({})).unwrap();
        assert!(empty.into_contacts().unwrap().is_empty());
    }

    #[test]
    fn test_temporary_ids_are_distinct_and_prefixed() {
        let a = ContactId::temporary();
        let b = ContactId::temporary();
        assert_ne!(a, b);
        assert!(a.is_temporary());
        assert!(!ContactId::new("42").is_temporary());
    }

    #[test]
    fn test_contact_coerces_wire_shape() {
        let contact: Contact = serde_json::from_value(json!({
            "_id": "abc",
            "name": "Ada Lovelace",
            "company": null,
            "phone_numbers": "+1 555 0100, , +1 555 0101",
            "social_links": null,
            "unknown": {"nested": true}
        }))
        .unwrap();

        assert_eq!(contact.id.as_str(), "abc");
        assert_eq!(contact.company, None);
        assert_eq!(contact.phone_numbers, vec!["+1 555 0100", "+1 555 0101"]);
        assert!(contact.social_links.is_empty());
    }

    #[test]
    fn test_draft_coerces_scalars() {
        let draft: ExtractionDraft = serde_json::from_value(json!({
            "name": "Bob",
            "phone_numbers": [5550100, "555-0101", {"bad": 1}],
            "website": ["not", "a", "string"]
        }))
        .unwrap();

        assert_eq!(draft.phone_numbers, vec!["5550100", "555-0101"]);
        assert_eq!(draft.website, None);
    }

    #[test]
    fn test_payload_defaults() {
        let payload = ExtractionDraft::default().to_payload();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["name"], Value::Null);
        assert_eq!(value["phone_numbers"], json!([]));
        assert_eq!(value["more_details"], json!(""));
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let mut patch = ContactPatch::default();
        assert!(patch.is_empty());
        patch.set(ContactField::Email, "a@b.c");
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"email": "a@b.c"}));
    }

    #[test]
    fn test_parse_list_text() {
        assert_eq!(parse_list_text(" a ,b,, c "), vec!["a", "b", "c"]);
        assert!(parse_list_text("  ,  ").is_empty());
    }

    #[test]
    fn test_initials_and_notes() {
        let mut c = Contact {
            name: Some("grace brewster hopper".into()),
            more_details: Some("details".into()),
            ..Default::default()
        };
        assert_eq!(c.initials(), "GB");
        assert_eq!(c.notes(), "details");
        c.additional_notes = Some("notes".into());
        assert_eq!(c.notes(), "notes");
        c.name = None;
        assert_eq!(c.initials(), "?");
    }

    #[test]
    fn test_field_assignment_parse() {
        let a: FieldAssignment = "title=CTO=boss".parse().unwrap();
        assert_eq!(a.field, ContactField::Designation);
        assert_eq!(a.value, "CTO=boss");
        assert!("nope".parse::<FieldAssignment>().is_err());
        assert!("shoe=1".parse::<FieldAssignment>().is_err());
    }
}
