//! Upload → extract → review → save lifecycle for one business card.

use crate::domain::{
    parse_list_text, AppError, ContactField, ExtractionDraft, ImageUpload, Result,
};

use super::api::CardsApi;
use super::store::{ContactStore, FetchOutcome};

/// Message shown when extraction is submitted without an image.
pub const NO_FILE_MESSAGE: &str = "Choose an image first";

/// Where the workflow currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExtractionState {
    #[default]
    Idle,
    Extracting,
    Reviewing(ExtractionDraft),
    Saving(ExtractionDraft),
}

impl ExtractionState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Reviewing(_) => "reviewing",
            Self::Saving(_) => "saving",
        }
    }
}

/// Result of a successful save.
#[derive(Debug)]
pub struct Saved {
    /// Outcome of the refresh that follows creation. The card is stored
    /// even when this failed.
    pub refresh: Result<FetchOutcome>,
}

/// State machine for one extraction.
#[derive(Debug, Default)]
pub struct ExtractionWorkflow {
    state: ExtractionState,
}

impl ExtractionWorkflow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &ExtractionState {
        &self.state
    }

    /// The draft under review, if any.
    #[must_use]
    pub const fn draft(&self) -> Option<&ExtractionDraft> {
        match &self.state {
            ExtractionState::Reviewing(draft) | ExtractionState::Saving(draft) => Some(draft),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_extracting(&self) -> bool {
        matches!(self.state, ExtractionState::Extracting)
    }

    #[must_use]
    pub const fn is_saving(&self) -> bool {
        matches!(self.state, ExtractionState::Saving(_))
    }

    /// Send the selected image to the extraction service.
    ///
    /// # Errors
    /// Returns a validation error without any request when no image is
    /// selected, or the service error (the workflow returns to idle).
    pub async fn submit<A: CardsApi>(
        &mut self,
        api: &A,
        upload: Option<&ImageUpload>,
        api_key: Option<&str>,
    ) -> Result<&ExtractionDraft> {
        if matches!(
            self.state,
            ExtractionState::Extracting | ExtractionState::Saving(_)
        ) {
            return Err(self.wrong_state("extract"));
        }
        let upload = upload.ok_or_else(|| AppError::validation(NO_FILE_MESSAGE))?;

        tracing::info!(file = %upload.file_name, bytes = upload.bytes.len(), "Extracting card");
        self.state = ExtractionState::Extracting;

        match api.extract(upload, api_key).await {
            Ok(draft) => {
                self.state = ExtractionState::Reviewing(draft);
                self.draft()
                    .ok_or_else(|| AppError::validation("Extraction produced no draft"))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Extraction failed");
                self.state = ExtractionState::Idle;
                Err(e)
            }
        }
    }

    /// Edit a scalar field of the draft.
    ///
    /// # Errors
    /// Returns error if no draft is under review.
    pub fn set_field(&mut self, field: ContactField, value: &str) -> Result<()> {
        self.reviewing_mut("edit")?.set(field, value);
        Ok(())
    }

    /// Replace the phone numbers from comma-separated text.
    ///
    /// # Errors
    /// Returns error if no draft is under review.
    pub fn set_phone_numbers_text(&mut self, text: &str) -> Result<()> {
        self.reviewing_mut("edit")?.phone_numbers = parse_list_text(text);
        Ok(())
    }

    /// Replace the social links from comma-separated text.
    ///
    /// # Errors
    /// Returns error if no draft is under review.
    pub fn set_social_links_text(&mut self, text: &str) -> Result<()> {
        self.reviewing_mut("edit")?.social_links = parse_list_text(text);
        Ok(())
    }

    /// Discard the draft.
    pub fn cancel(&mut self) {
        if !self.is_saving() {
            self.state = ExtractionState::Idle;
        }
    }

    /// Persist the draft as a new contact and reload the list.
    ///
    /// # Errors
    /// Returns error if no draft is under review or the create call fails;
    /// on failure the draft stays under review for a retry.
    pub async fn save<A: CardsApi>(&mut self, api: &A, store: &mut ContactStore) -> Result<Saved> {
        let ExtractionState::Reviewing(draft) = &self.state else {
            return Err(self.wrong_state("save"));
        };
        let payload = draft.to_payload();
        self.state = ExtractionState::Saving(draft.clone());

        if let Err(e) = api.create_card(&payload).await {
            tracing::warn!(error = %e, "Saving contact failed");
            if let ExtractionState::Saving(draft) = std::mem::take(&mut self.state) {
                self.state = ExtractionState::Reviewing(draft);
            }
            return Err(e);
        }

        let temp_id = store.insert_optimistic(&payload);
        tracing::debug!(id = %temp_id, "Inserted placeholder contact");

        let refresh = store.refresh(api).await;
        self.state = ExtractionState::Idle;
        Ok(Saved { refresh })
    }

    fn reviewing_mut(&mut self, action: &str) -> Result<&mut ExtractionDraft> {
        match &mut self.state {
            ExtractionState::Reviewing(draft) => Ok(draft),
            other => Err(AppError::validation(format!(
                "Cannot {action} while {}",
                other.name()
            ))),
        }
    }

    fn wrong_state(&self, action: &str) -> AppError {
        AppError::validation(format!(
            "Cannot {action} while {}",
            self.state.name()
        ))
    }
}
