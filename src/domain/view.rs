//! List view model: filtered, sorted projection of the contact store.
//!
//! The projection is a pure function of the store contents and the filter
//! state; nothing here talks to the network.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::models::Contact;

/// Ordering applied to the visible list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    /// Keep the order returned by the backend.
    #[default]
    Recent,
    /// Alphabetical by name.
    Alpha,
    /// Alphabetical by company.
    Company,
}

impl std::str::FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recent" => Ok(Self::Recent),
            "alpha" | "name" => Ok(Self::Alpha),
            "company" => Ok(Self::Company),
            _ => Err(format!("Unknown sort: {s}. Use: recent, alpha, company")),
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recent => write!(f, "recent"),
            Self::Alpha => write!(f, "alpha"),
            Self::Company => write!(f, "company"),
        }
    }
}

/// Compare two strings the way a user-facing list expects.
///
/// Three levels, like a collation table: base letters with accents and case
/// folded away, then accents, then case with lowercase first. Raw code points
/// break any remaining tie so the order is total.
#[must_use]
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    base_key(a)
        .cmp(&base_key(b))
        .then_with(|| accent_key(a).cmp(accent_key(b)))
        .then_with(|| case_key(a).cmp(case_key(b)))
        .then_with(|| a.cmp(b))
}

fn base_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn accent_key(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}

fn case_key(s: &str) -> impl Iterator<Item = bool> + '_ {
    s.chars().map(char::is_uppercase)
}

fn field_or_empty(value: Option<&String>) -> &str {
    value.map_or("", String::as_str)
}

/// Whether `contact` matches a lowercased, non-empty query.
fn matches_query(contact: &Contact, query_lower: &str) -> bool {
    [&contact.name, &contact.company, &contact.email]
        .into_iter()
        .any(|field| field_or_empty(field.as_ref()).to_lowercase().contains(query_lower))
}

/// Derive the visible list from the store contents.
#[must_use]
pub fn visible(contacts: &[Contact], query: &str, sort: SortMode) -> Vec<Contact> {
    let mut list: Vec<Contact> = if query.is_empty() {
        contacts.to_vec()
    } else {
        let q = query.to_lowercase();
        contacts
            .iter()
            .filter(|c| matches_query(c, &q))
            .cloned()
            .collect()
    };

    match sort {
        SortMode::Recent => {}
        SortMode::Alpha => list.sort_by(|a, b| {
            locale_compare(field_or_empty(a.name.as_ref()), field_or_empty(b.name.as_ref()))
        }),
        SortMode::Company => list.sort_by(|a, b| {
            locale_compare(
                field_or_empty(a.company.as_ref()),
                field_or_empty(b.company.as_ref()),
            )
        }),
    }

    list
}

/// A value that only takes effect after it stops changing for an interval.
#[derive(Debug, Clone)]
pub struct Debounced<T> {
    settled: T,
    pending: Option<(T, Instant)>,
    interval: Duration,
}

impl<T: Clone> Debounced<T> {
    pub const fn new(initial: T, interval: Duration) -> Self {
        Self {
            settled: initial,
            pending: None,
            interval,
        }
    }

    /// Record a new input value observed at `now`.
    pub fn set(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Value in effect at `now`, promoting a pending value that has settled.
    pub fn get(&mut self, now: Instant) -> &T {
        if let Some((_, at)) = &self.pending {
            if now.saturating_duration_since(*at) >= self.interval {
                if let Some((value, _)) = self.pending.take() {
                    self.settled = value;
                }
            }
        }
        &self.settled
    }

    /// Apply any pending value immediately.
    pub fn flush(&mut self) -> &T {
        if let Some((value, _)) = self.pending.take() {
            self.settled = value;
        }
        &self.settled
    }
}

/// Filter state for the contact list.
#[derive(Debug, Clone)]
pub struct ListViewModel {
    query: Debounced<String>,
    sort: SortMode,
}

impl ListViewModel {
    #[must_use]
    pub const fn new(debounce: Duration) -> Self {
        Self {
            query: Debounced::new(String::new(), debounce),
            sort: SortMode::Recent,
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>, now: Instant) {
        self.query.set(query.into(), now);
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.sort = sort;
    }

    #[must_use]
    pub const fn sort(&self) -> SortMode {
        self.sort
    }

    /// Settle the query now, skipping the debounce interval.
    pub fn flush(&mut self) -> &str {
        self.query.flush()
    }

    /// Visible list using the query in effect at `now`.
    pub fn render(&mut self, contacts: &[Contact], now: Instant) -> Vec<Contact> {
        let sort = self.sort;
        visible(contacts, self.query.get(now), sort)
    }
}
