//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod commands;
mod config;
mod logging;

pub use commands::{ResourceCommand, Session, display_kinds, handle_command};
pub use config::{ConfigSubcommand, handle_config_command};
pub use logging::*;
