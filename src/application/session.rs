//! One interactive session against a backend.
//!
//! Ties the store, the extraction workflow, the list view model and the
//! notifications together. Every user operation clears the error slot, runs,
//! and leaves its failure (if any) in the slot as a display string.

use std::time::Instant;

use chrono::NaiveDate;

use crate::domain::{
    AppConfig, AppError, Contact, ContactField, ContactId, ContactPatch, ExtractionDraft,
    ImageUpload, ListViewModel, PingResponse, Result, SortMode, VcardRequest,
};
use crate::infrastructure::ApiClient;

use super::api::CardsApi;
use super::export::{
    self, contact_vcf_filename, ExportFile, SpreadsheetCapability, NOTHING_TO_EXPORT,
};
use super::notify::{Notifications, Toast};
use super::store::ContactStore;
use super::workflow::ExtractionWorkflow;

/// Which view is in front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Contacts,
    Extract,
}

/// Client state for one backend.
pub struct Session<A> {
    config: AppConfig,
    api: A,
    store: ContactStore,
    workflow: ExtractionWorkflow,
    view: ListViewModel,
    notifications: Notifications,
    capability: SpreadsheetCapability,
    error: Option<String>,
    tab: Tab,
}

impl<A: CardsApi> Session<A> {
    #[must_use]
    pub fn new(config: AppConfig, api: A, capability: SpreadsheetCapability) -> Self {
        let view = ListViewModel::new(config.search_debounce());
        let notifications = Notifications::new(config.toast_duration());
        Self {
            config,
            api,
            store: ContactStore::new(),
            workflow: ExtractionWorkflow::new(),
            view,
            notifications,
            capability,
            error: None,
            tab: Tab::default(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub const fn store(&self) -> &ContactStore {
        &self.store
    }

    #[must_use]
    pub const fn workflow(&self) -> &ExtractionWorkflow {
        &self.workflow
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn tab(&self) -> Tab {
        self.tab
    }

    #[must_use]
    pub const fn capability(&self) -> SpreadsheetCapability {
        self.capability
    }

    /// Current toast, if it has not expired.
    pub fn toast(&mut self, now: Instant) -> Option<&str> {
        self.notifications.active(now)
    }

    /// Take the pending toast for one-shot display.
    pub fn take_toast(&mut self) -> Option<Toast> {
        self.notifications.take()
    }

    fn toast_now(&mut self, message: &str) {
        self.notifications.show(message, Instant::now());
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.error = Some(e.to_string());
        }
        result
    }

    /// Reload the contact list.
    ///
    /// # Errors
    /// Returns the fetch error; the store is then empty.
    pub async fn refresh(&mut self) -> Result<()> {
        self.error = None;
        let result = self.store.refresh(&self.api).await.map(|_| ());
        self.record(result)
    }

    /// Point the session at another backend; the old list is discarded.
    ///
    /// # Errors
    /// Returns the error of the initial fetch from the new backend.
    pub async fn replace_api(&mut self, api: A) -> Result<()> {
        self.api = api;
        self.store = ContactStore::new();
        self.refresh().await
    }

    // List view

    pub fn set_query(&mut self, query: &str, now: Instant) {
        self.view.set_query(query, now);
    }

    /// Apply the pending search query without waiting for the debounce.
    pub fn flush_query(&mut self) {
        self.view.flush();
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.view.set_sort(sort);
    }

    #[must_use]
    pub const fn sort(&self) -> SortMode {
        self.view.sort()
    }

    /// The filtered, sorted list as of `now`.
    pub fn visible(&mut self, now: Instant) -> Vec<Contact> {
        self.view.render(self.store.contacts(), now)
    }

    /// Find a contact by full id or unique id prefix.
    ///
    /// # Errors
    /// Returns a validation error for an empty id, or when nothing or more than
    /// one record matches.
    pub fn find(&self, id: &str) -> Result<&Contact> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AppError::validation("Contact id is required"));
        }
        let exact = ContactId::new(id);
        if let Some(contact) = self.store.get(&exact) {
            return Ok(contact);
        }
        let mut matches = self
            .store
            .contacts()
            .iter()
            .filter(|c| c.id.as_str().starts_with(id));
        match (matches.next(), matches.next()) {
            (Some(contact), None) => Ok(contact),
            (Some(_), Some(_)) => Err(AppError::validation(format!("Ambiguous contact id: {id}"))),
            (None, _) => Err(AppError::validation(format!("Contact not found: {id}"))),
        }
    }

    // Extraction

    /// Submit an image for extraction and switch to review.
    ///
    /// # Errors
    /// Returns a validation error when no image is given, or the service error.
    pub async fn extract(&mut self, upload: Option<&ImageUpload>) -> Result<ExtractionDraft> {
        self.error = None;
        let api_key = self.config.backend.api_key.clone();
        let result = self
            .workflow
            .submit(&self.api, upload, api_key.as_deref())
            .await
            .cloned();
        if result.is_ok() {
            self.tab = Tab::Extract;
            self.toast_now("Extraction successful — review fields before saving");
        }
        self.record(result)
    }

    /// Edit a field of the draft under review.
    ///
    /// # Errors
    /// Returns error if no draft is under review.
    pub fn edit_draft(&mut self, field: ContactField, value: &str) -> Result<()> {
        let result = self.workflow.set_field(field, value);
        self.record(result)
    }

    /// Replace the draft's phone numbers from comma-separated text.
    ///
    /// # Errors
    /// Returns error if no draft is under review.
    pub fn edit_draft_phones(&mut self, text: &str) -> Result<()> {
        let result = self.workflow.set_phone_numbers_text(text);
        self.record(result)
    }

    /// Replace the draft's social links from comma-separated text.
    ///
    /// # Errors
    /// Returns error if no draft is under review.
    pub fn edit_draft_links(&mut self, text: &str) -> Result<()> {
        let result = self.workflow.set_social_links_text(text);
        self.record(result)
    }

    pub fn cancel_extract(&mut self) {
        self.workflow.cancel();
        self.tab = Tab::Contacts;
    }

    /// Save the reviewed draft as a contact.
    ///
    /// # Errors
    /// Returns the create error; the draft is kept for a retry.
    pub async fn save_draft(&mut self) -> Result<()> {
        self.error = None;
        let saved = self.workflow.save(&self.api, &mut self.store).await;
        let saved = self.record(saved)?;

        self.tab = Tab::Contacts;
        self.toast_now("Saved");
        if let Err(e) = saved.refresh {
            self.error = Some(e.to_string());
        }
        Ok(())
    }

    // Mutations

    /// Delete a contact after `confirm` approves it.
    ///
    /// Returns `false` when the user declined and nothing was sent.
    ///
    /// # Errors
    /// Returns error if the contact is unknown or the delete fails; a failed
    /// delete restores the contact.
    pub async fn delete<F>(&mut self, id: &str, confirm: F) -> Result<bool>
    where
        F: FnOnce(&Contact) -> bool,
    {
        self.error = None;
        let found = self.find(id).map(|c| (c.id.clone(), confirm(c)));
        let (id, approved) = self.record(found)?;
        if !approved {
            return Ok(false);
        }

        let result = self.store.delete(&self.api, &id).await;
        self.record(result)?;
        self.toast_now("Deleted");
        Ok(true)
    }

    /// Send an edit for a contact and reload the list.
    ///
    /// # Errors
    /// Returns error if the contact is unknown, the patch is empty, or the
    /// update fails.
    pub async fn edit(&mut self, id: &str, patch: &ContactPatch) -> Result<()> {
        self.error = None;
        let result = match self.find(id).map(|c| c.id.clone()) {
            Ok(_) if patch.is_empty() => Err(AppError::validation("Nothing to update")),
            Ok(id) => self.store.apply_edit(&self.api, &id, patch).await,
            Err(e) => Err(e),
        };
        self.record(result)?;
        self.toast_now("Updated");
        Ok(())
    }

    // Export

    /// Download one contact's vCard from the backend.
    ///
    /// # Errors
    /// Returns error if the contact is unknown or the call fails.
    pub async fn download_vcard(&mut self, id: &str) -> Result<ExportFile> {
        self.error = None;
        let found = self.find(id).cloned();
        let contact = self.record(found)?;
        let result = self.api.vcard(&VcardRequest::from(&contact)).await;
        let bytes = self.record(result)?;
        self.toast_now("vCard downloaded");
        Ok(ExportFile {
            file_name: contact_vcf_filename(&contact),
            mime: "text/vcard",
            bytes,
        })
    }

    /// All contacts as one vCard file; `None` (with a notice) when empty.
    pub fn export_all_vcards(&mut self, date: NaiveDate) -> Option<ExportFile> {
        self.error = None;
        let file = export::export_all_vcards(self.store.contacts(), date);
        self.toast_now(if file.is_some() {
            "Exported all vCards"
        } else {
            NOTHING_TO_EXPORT
        });
        file
    }

    /// The list as a spreadsheet (or CSV); `None` (with a notice) when empty.
    ///
    /// # Errors
    /// Returns error if encoding fails.
    pub fn export_spreadsheet(&mut self, date: NaiveDate, force_csv: bool) -> Result<Option<ExportFile>> {
        self.error = None;
        if self.store.is_empty() {
            self.toast_now(NOTHING_TO_EXPORT);
            return Ok(None);
        }
        let capability = if force_csv {
            SpreadsheetCapability::CsvOnly
        } else {
            self.capability
        };
        let result = export::export_spreadsheet(self.store.contacts(), capability, date);
        let file = self.record(result)?;
        self.toast_now(if file.file_name.ends_with(".xlsx") {
            "Excel (.xlsx) exported"
        } else {
            "CSV exported (xlsx not available)"
        });
        Ok(Some(file))
    }

    /// Health check.
    ///
    /// # Errors
    /// Returns error if the backend is unreachable.
    pub async fn ping(&mut self) -> Result<PingResponse> {
        self.error = None;
        let result = self.api.ping().await;
        self.record(result)
    }
}

impl Session<ApiClient> {
    /// Switch to another backend base URL and refetch.
    ///
    /// The caller persists the updated config.
    ///
    /// # Errors
    /// Returns error if the client cannot be built or the first fetch fails.
    pub async fn change_backend(&mut self, base: &str) -> Result<()> {
        self.config.set_api_base(base);
        tracing::info!(base = %self.config.api_base(), "Backend changed");
        let api = ApiClient::from_config(&self.config)?;
        self.replace_api(api).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::api::fake::{card, FakeApi};
    use crate::application::workflow::NO_FILE_MESSAGE;

    async fn session(cards: Vec<Contact>) -> Session<FakeApi> {
        let mut s = Session::new(
            AppConfig::default(),
            FakeApi::with_cards(cards),
            SpreadsheetCapability::CsvOnly,
        );
        s.refresh().await.unwrap();
        s
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[tokio::test]
    async fn test_extract_without_file_shows_error() {
        let mut s = session(vec![]).await;

        assert!(s.extract(None).await.is_err());

        assert_eq!(s.error(), Some(NO_FILE_MESSAGE));
        assert_eq!(s.api().calls(), vec!["all_cards"]);
        assert_eq!(s.tab(), Tab::Contacts);
    }

    #[tokio::test]
    async fn test_delete_failure_restores_record() {
        let mut s = session(vec![card("41", "Ada"), card("42", "Bob")]).await;
        s.api().fail_with.set(Some(500));

        let result = s.delete("42", |_| true).await;

        assert!(result.is_err());
        assert!(s.error().unwrap().starts_with("HTTP 500"));
        assert!(s.visible(Instant::now()).iter().any(|c| c.id.as_str() == "42"));
    }

    #[tokio::test]
    async fn test_delete_declined_sends_nothing() {
        let mut s = session(vec![card("42", "Bob")]).await;

        assert!(!s.delete("42", |_| false).await.unwrap());

        assert_eq!(s.api().calls(), vec!["all_cards"]);
        assert_eq!(s.store().len(), 1);
    }

    #[tokio::test]
    async fn test_create_flow_leaves_no_temp_duplicate() {
        let mut s = session(vec![card("1", "Existing")]).await;
        *s.api().draft.borrow_mut() = Some(ExtractionDraft {
            name: Some("New Person".into()),
            ..Default::default()
        });
        let upload = ImageUpload {
            file_name: "c.jpg".into(),
            mime: "image/jpeg".into(),
            bytes: vec![1],
        };

        s.extract(Some(&upload)).await.unwrap();
        assert_eq!(s.tab(), Tab::Extract);
        s.edit_draft_phones("555-0100, 555-0101").unwrap();
        s.save_draft().await.unwrap();

        let list = s.visible(Instant::now());
        assert_eq!(s.tab(), Tab::Contacts);
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.iter().filter(|c| c.name.as_deref() == Some("New Person")).count(),
            1
        );
        assert!(list.iter().all(|c| !c.id.is_temporary()));
        assert_eq!(s.take_toast().map(|t| t.message), Some("Saved".to_string()));
    }

    #[tokio::test]
    async fn test_find_by_prefix() {
        let s = session(vec![card("abc123", "A"), card("abd456", "B")]).await;
        assert_eq!(s.find("abc").unwrap().id.as_str(), "abc123");
        assert!(s.find("ab").is_err());
        assert!(s.find("zz").is_err());
        assert!(matches!(s.find(" "), Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_edit_requires_changes() {
        let mut s = session(vec![card("7", "Old")]).await;
        assert!(s.edit("7", &ContactPatch::default()).await.is_err());
        assert_eq!(s.error(), Some("Nothing to update"));

        let mut patch = ContactPatch::default();
        patch.set(ContactField::Name, "New");
        s.edit("7", &patch).await.unwrap();
        assert!(s.error().is_none());
        assert_eq!(s.find("7").unwrap().name.as_deref(), Some("New"));
    }

    #[tokio::test]
    async fn test_replace_api_discards_store() {
        let mut s = session(vec![card("1", "Old backend")]).await;

        s.replace_api(FakeApi::with_cards(vec![card("9", "New backend")]))
            .await
            .unwrap();

        let names: Vec<_> = s
            .store()
            .contacts()
            .iter()
            .filter_map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["New backend"]);
    }

    #[tokio::test]
    async fn test_empty_exports_emit_notice() {
        let mut s = session(vec![]).await;

        assert!(s.export_all_vcards(date()).is_none());
        assert_eq!(s.take_toast().map(|t| t.message), Some(NOTHING_TO_EXPORT.to_string()));

        assert!(s.export_spreadsheet(date(), false).unwrap().is_none());
        assert_eq!(s.take_toast().map(|t| t.message), Some(NOTHING_TO_EXPORT.to_string()));
    }

    #[tokio::test]
    async fn test_search_is_debounced() {
        let mut s = session(vec![card("1", "Ada"), card("2", "Bob")]).await;
        let now = Instant::now();

        let later = now + s.config().search_debounce();

        s.set_query("bob", now);
        assert_eq!(s.visible(now).len(), 2);
        assert_eq!(s.visible(later).len(), 1);
    }

    #[tokio::test]
    async fn test_download_vcard_uses_backend() {
        let mut s = session(vec![card("1", "Ada Lovelace")]).await;
        let file = s.download_vcard("1").await.unwrap();
        assert_eq!(file.file_name, "Ada_Lovelace.vcf");
        assert_eq!(file.bytes, b"FN:Ada Lovelace");
    }
}
