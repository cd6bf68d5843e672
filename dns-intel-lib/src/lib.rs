//! # DNS Intel Library
//!
//! Client-side building blocks for a DNS analysis service: input validation,
//! a retrying API client, result view models, a bounded lookup history and
//! the form controller that ties them together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dns_intel_lib::{ApiClient, HistoryStore, Location, LookupController, LookupOptions, StaticChallenge};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new("https://api.example.com/analyze")?;
//!     let mut controller = LookupController::new(
//!         client,
//!         StaticChallenge::new(Some("challenge-token".to_string())),
//!         HistoryStore::open_default()?,
//!         Location::parse("https://dns.example.com/")?,
//!     );
//!
//!     let submission = controller.submit("https://www.example.com/", &LookupOptions::default()).await?;
//!     println!("{}: {} record sections", submission.domain, submission.view.records.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Validation**: normalizes pasted URLs and explains what is wrong
//! - **Retries**: bounded attempts with a fixed delay and per-attempt timeout
//! - **History**: the 20 most recent lookups, persisted as JSON
//! - **Exports**: pretty JSON and iCal certificate renewal reminders

// Re-export main public API types and functions
// This makes them available as dns_intel_lib::TypeName
pub use calendar::{certificate_reminder, parse_certificate_expiry, reminder_file_name};
pub use client::{
    attempt_timeout, interpret_response, parse_endpoint, retry_with_delay, ApiClient,
    RetryPolicy, CHALLENGE_TOKEN_HEADER, MAX_REQUEST_TIMEOUT,
};
pub use config::{
    env_config_from, load_env_config, parse_record_types, ApiConfig, ConfigManager,
    DefaultsConfig, EnvConfig, FileConfig, HistoryConfig,
};
pub use controller::{
    extract_result, ChallengeProvider, Location, LookupBackend, LookupController,
    NavigationEffect, StaticChallenge, Submission, SubmissionState, DOMAIN_PARAM,
};
pub use debounce::{DebouncedValidator, Debouncer};
pub use error::DnsIntelError;
pub use export::{export_file_name, export_json, sanitize_file_component};
pub use history::{default_history_path, format_relative, HistoryStore, MAX_HISTORY_ITEMS};
pub use progress::{
    build_loading_messages, format_elapsed, LoadingMessages, ELAPSED_TICK_INTERVAL,
    MESSAGE_ROTATION_INTERVAL,
};
pub use render::{
    render_result, EmailSecurityView, ExpirySeverity, PropagationRow, RecordRow, RecordSection,
    ReminderDescriptor, ResultView, SslView, TXT_PREVIEW_LIMIT,
};
pub use types::{
    parse_int_prefix, DomainQuery, LookupOptions, LookupRequest, LookupResult, RecordType,
    ValidationResult, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS,
};
pub use validate::{normalize_domain, require_domain, validate_domain, VALIDATION_DEBOUNCE_MS};

// The API result shape is public for callers that want the typed data
pub mod types;

// Internal modules - reachable through the re-exports above
mod calendar;
mod client;
mod config;
mod controller;
mod debounce;
mod error;
mod export;
mod history;
mod progress;
mod render;
mod validate;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DnsIntelError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        user_agent: concat!("dns-intel/", env!("CARGO_PKG_VERSION")),
    }
}

/// Information about the library build
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    /// User-Agent sent with API requests
    pub user_agent: &'static str,
}
