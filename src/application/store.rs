//! Client-side contact cache.
//!
//! The store is the single source of truth for the list view. It is refilled
//! wholesale from `/all_cards`; local mutations are optimistic and either
//! confirmed by the next refresh or rolled back.

use crate::domain::{AppError, Contact, ContactId, ContactPatch, ContactPayload, Result};

use super::api::CardsApi;

/// Handle for one in-flight list fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct FetchTicket {
    seq: u64,
}

/// What happened to a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result replaced the store contents.
    Applied,
    /// A newer fetch had already been applied; the result was dropped.
    Stale,
}

/// Store contents captured before an optimistic removal.
#[derive(Debug, Clone)]
#[must_use]
pub struct Snapshot {
    contacts: Vec<Contact>,
    removed: Contact,
    index: usize,
    applied_seq: u64,
}

/// Ordered in-memory list of contacts.
#[derive(Debug, Default)]
pub struct ContactStore {
    contacts: Vec<Contact>,
    next_seq: u64,
    applied_seq: u64,
    in_flight: usize,
}

impl ContactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    #[must_use]
    pub fn get(&self, id: &ContactId) -> Option<&Contact> {
        self.contacts.iter().find(|c| &c.id == id)
    }

    /// Whether a list fetch is still outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Start a list fetch and mark the store as loading.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.next_seq += 1;
        self.in_flight += 1;
        FetchTicket { seq: self.next_seq }
    }

    /// Apply the result of a fetch unless a newer one has already landed.
    ///
    /// A failed fetch empties the store.
    ///
    /// # Errors
    /// Returns the fetch error when the failure is applied.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Contact>>,
    ) -> Result<FetchOutcome> {
        self.in_flight = self.in_flight.saturating_sub(1);

        if ticket.seq <= self.applied_seq {
            tracing::debug!(
                seq = ticket.seq,
                applied = self.applied_seq,
                "Discarding stale contact list"
            );
            return Ok(FetchOutcome::Stale);
        }
        self.applied_seq = ticket.seq;

        match result {
            Ok(contacts) => {
                tracing::info!(count = contacts.len(), "Contact list refreshed");
                self.contacts = contacts;
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                self.contacts.clear();
                Err(e)
            }
        }
    }

    /// Replace the contents with the backend's current list.
    ///
    /// # Errors
    /// Returns the fetch error; the store is left empty.
    pub async fn refresh<A: CardsApi>(&mut self, api: &A) -> Result<FetchOutcome> {
        let ticket = self.begin_fetch();
        let result = api.all_cards().await;
        self.complete_fetch(ticket, result)
    }

    /// Show a just-created record before the authoritative refresh.
    pub fn insert_optimistic(&mut self, payload: &ContactPayload) -> ContactId {
        let mut id = ContactId::temporary();
        while self.get(&id).is_some() {
            id = ContactId::temporary();
        }
        self.contacts
            .insert(0, Contact::from_payload(id.clone(), payload));
        id
    }

    /// Remove a record immediately, keeping what is needed to undo it.
    pub fn remove_optimistic(&mut self, id: &ContactId) -> Option<Snapshot> {
        let index = self.contacts.iter().position(|c| &c.id == id)?;
        let contacts = self.contacts.clone();
        let removed = self.contacts.remove(index);
        Some(Snapshot {
            contacts,
            removed,
            index,
            applied_seq: self.applied_seq,
        })
    }

    /// Undo an optimistic removal.
    ///
    /// Restores the exact pre-removal list when no fetch has landed since;
    /// otherwise reinserts just the removed record into the newer list.
    pub fn rollback(&mut self, snapshot: Snapshot) {
        if snapshot.applied_seq == self.applied_seq {
            self.contacts = snapshot.contacts;
        } else if self.get(&snapshot.removed.id).is_none() {
            let index = snapshot.index.min(self.contacts.len());
            self.contacts.insert(index, snapshot.removed);
        }
    }

    /// Delete a record, optimistically; restores it if the backend refuses.
    ///
    /// # Errors
    /// Returns error if the record is unknown, unsaved, or the call fails.
    pub async fn delete<A: CardsApi>(&mut self, api: &A, id: &ContactId) -> Result<()> {
        ensure_persisted(id)?;
        let snapshot = self
            .remove_optimistic(id)
            .ok_or_else(|| AppError::validation(format!("Contact not found: {id}")))?;

        match api.delete_card(id).await {
            Ok(()) => {
                tracing::info!(id = %id, "Contact deleted");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Delete failed, restoring contact");
                self.rollback(snapshot);
                Err(e)
            }
        }
    }

    /// Send an edit and reload the list so server-computed fields show up.
    ///
    /// # Errors
    /// Returns error if the record is unsaved, the update fails, or the
    /// following refresh fails.
    pub async fn apply_edit<A: CardsApi>(
        &mut self,
        api: &A,
        id: &ContactId,
        patch: &ContactPatch,
    ) -> Result<()> {
        ensure_persisted(id)?;
        api.update_card(id, patch).await?;
        tracing::info!(id = %id, "Contact updated");
        self.refresh(api).await?;
        Ok(())
    }
}

fn ensure_persisted(id: &ContactId) -> Result<()> {
    if id.is_temporary() {
        return Err(AppError::validation(format!(
            "Contact {id} is still being saved; refresh and try again"
        )));
    }
    Ok(())
}
