//! Infrastructure layer - external adapters (HTTP, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod api_client;
pub mod config;
pub mod files;

pub use api_client::{ApiClient, RequestBody, RequestOptions};
pub use config::{ensure_config_exists, load_config, save_config};
pub use files::{load_image, write_export};
