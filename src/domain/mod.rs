//! Domain layer - core types and pure logic.
//!
//! This layer contains contact models, configuration, the list view model
//! and error types without any I/O.

pub mod config;
pub mod error;
pub mod models;
pub mod view;

pub use config::{normalize_base, AppConfig};
pub use error::{AppError, Result};
pub use models::{
    parse_list_text, CardList, Contact, ContactField, ContactId, ContactPatch, ContactPayload,
    ExtractionDraft, FieldAssignment, ImageUpload, PingResponse, VcardRequest,
};
pub use view::{ListViewModel, SortMode};
