//! Application layer - use cases and orchestration.
//!
//! This layer contains the contact store, the extraction workflow, exports
//! and the session that ties them to a backend.

pub mod api;
pub mod export;
pub mod formatter;
pub mod notify;
pub mod session;
pub mod store;
pub mod workflow;

pub use export::{ExportFile, SpreadsheetCapability};
pub use formatter::{
    format_contact_detail, format_contacts_json, format_contacts_table, format_draft,
    OutputFormat,
};
pub use session::{Session, Tab};
