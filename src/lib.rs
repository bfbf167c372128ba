// Cashback Tracker - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod submission;   // Form value object + validation
pub mod bridge;       // Host bridge traits
pub mod handler;      // Send-button handler
pub mod webapp_data;  // Receiving end: parse, replies
pub mod host;         // Local bridge wired to storage
pub mod db;
pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use submission::{FormField, Submission, SubmissionResult, ValidationError};
pub use bridge::{BridgeCall, FormFields, FormSource, MainButtonStyle, RecordingBridge, WebAppBridge};
pub use handler::{HandlerOutcome, WebApp, ALERT_MESSAGE};
pub use webapp_data::{
    best_cashback_message, confirmation_message, list_message, parse_payload, parse_percent,
    CashbackEntry, START_MESSAGE,
};
pub use host::{HostMessage, LocalHost};
pub use db::{
    Event, StoredCashback,
    add_cashback, clear_cashbacks, count_cashbacks, get_all_cashbacks, get_best_cashback,
    get_events_for_entity, get_stored_cashbacks, import_entries, insert_event, load_csv,
    open_database, setup_database,
};
pub use config::Config;
pub use logging::init_logging;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
