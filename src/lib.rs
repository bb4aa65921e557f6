// SCS Packer - Extracts truck and trailer definitions from ETS2/ATS archives and repacks them
//
// This is the library crate containing the core business logic and data structures.
// The binary crate (main.rs) provides the dialog-driven entry point.

pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, StartupError};
pub use models::{GameType, PackerSettings, ScsLists};
pub use services::{PackPipeline, PipelineOptions, PixConverter, RunReport, Selection};
pub use state::{ProgressEvent, ProgressReporter, RunOutcome, RunStage};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
